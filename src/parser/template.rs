//! Template input: literal chunks interleaved with interpolations.

use std::sync::Arc;

use crate::errors::{CstResult, ErrorKind};
use crate::node::Node;

/// Placeholder shown for each interpolation when a template is rendered.
pub const GAP_PLACEHOLDER: &str = "<//>";

/// A value supplied between two literal chunks.
#[derive(Debug, Clone, PartialEq)]
pub enum Interpolation {
    /// A prebuilt tree spliced in place of parsing.
    Value(Arc<Node>),
    /// A deliberately unsupplied value.
    Gap,
}

impl From<Arc<Node>> for Interpolation {
    fn from(node: Arc<Node>) -> Self {
        Interpolation::Value(node)
    }
}

impl From<Node> for Interpolation {
    fn from(node: Node) -> Self {
        Interpolation::Value(Arc::new(node))
    }
}

impl From<Option<Arc<Node>>> for Interpolation {
    fn from(node: Option<Arc<Node>>) -> Self {
        node.map_or(Interpolation::Gap, Interpolation::Value)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Template {
    quasis: Vec<String>,
    expressions: Vec<Interpolation>,
}

impl Template {
    /// There must be exactly one more literal chunk than interpolations.
    pub fn new<Q, S>(quasis: Q, expressions: Vec<Interpolation>) -> CstResult<Self>
    where
        Q: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let quasis: Vec<String> = quasis.into_iter().map(Into::into).collect();
        if quasis.len() != expressions.len() + 1 {
            return Err(ErrorKind::Imbalance {
                quasis: quasis.len(),
                expressions: expressions.len(),
            }
            .into());
        }
        Ok(Self {
            quasis,
            expressions,
        })
    }

    /// A template with no interpolations.
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            quasis: vec![text.into()],
            expressions: Vec::new(),
        }
    }

    /// Splits `text` at every `<//>` and leaves a gap in each place.
    pub fn with_gaps(text: &str) -> Self {
        let quasis: Vec<String> = text.split(GAP_PLACEHOLDER).map(str::to_string).collect();
        let expressions = vec![Interpolation::Gap; quasis.len() - 1];
        Self {
            quasis,
            expressions,
        }
    }

    pub fn quasis(&self) -> &[String] {
        &self.quasis
    }

    pub fn expressions(&self) -> &[Interpolation] {
        &self.expressions
    }

    /// The template as one string, interpolations shown as `<//>`.
    pub fn render(&self) -> String {
        self.quasis.join(GAP_PLACEHOLDER)
    }

    pub(crate) fn into_parts(self) -> (Vec<String>, Vec<Interpolation>) {
        (self.quasis, self.expressions)
    }
}
