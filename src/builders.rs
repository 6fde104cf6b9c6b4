//! Programmatic construction of tags and nodes.
//!
//! Nodes built here go through the same [`NodeBuilder`] and [`Resolver`] the
//! parser uses, so they stream and print exactly like parsed trees.

use std::sync::Arc;

use crate::errors::{CstResult, ErrorKind};
use crate::languages::string::{CONTENT, NAME as STRING};
use crate::node::{Node, NodeBuilder};
use crate::resolver::Resolver;
use crate::tags::{Attributes, EmbeddedTag, NodeFlags, ReferenceTag, Tag};

pub fn lit(text: impl Into<String>) -> Tag {
    Tag::literal(text)
}

/// A reference tag from a property path (`name`, `name[]`, `[name]`).
pub fn ref_tag(path: &str) -> CstResult<Tag> {
    ReferenceTag::parse(path).map(Tag::Reference)
}

/// One piece of a node's content.
#[derive(Debug, Clone)]
pub enum Part {
    /// A child under a property path; `None` records a gap.
    Property(String, Option<Arc<Node>>),
    /// A tag that carries no property.
    Tag(Tag),
    /// A child without a reference.
    Embedded(Arc<Node>),
}

impl Part {
    pub fn property(path: impl Into<String>, node: impl Into<Arc<Node>>) -> Self {
        Part::Property(path.into(), Some(node.into()))
    }

    pub fn gap(path: impl Into<String>) -> Self {
        Part::Property(path.into(), None)
    }

    pub fn tag(tag: Tag) -> Self {
        Part::Tag(tag)
    }

    pub fn embedded(node: impl Into<Arc<Node>>) -> Self {
        Part::Embedded(node.into())
    }
}

/// Builds a node from its parts in order.
///
/// References and property storage are derived from the parts, so the result
/// always satisfies the invariants the streamer checks.
pub fn build_node<I>(
    language: &str,
    node_type: &str,
    parts: I,
    attributes: Attributes,
) -> CstResult<Node>
where
    I: IntoIterator<Item = Part>,
{
    build_flagged(language, node_type, NodeFlags::NODE, parts, attributes)
}

fn build_flagged<I>(
    language: &str,
    node_type: &str,
    flags: NodeFlags,
    parts: I,
    attributes: Attributes,
) -> CstResult<Node>
where
    I: IntoIterator<Item = Part>,
{
    let mut builder = NodeBuilder::new(language, node_type, flags);
    let mut resolver = Resolver::new(node_type);
    for part in parts {
        match part {
            Part::Property(path, value) => {
                let reference = ReferenceTag::parse(&path)?;
                let slot = resolver.consume(&reference)?;
                match value {
                    Some(node) => builder.attach(&reference, &slot, node),
                    None => builder.attach_gap(&reference, &slot),
                }
            }
            Part::Embedded(node) => builder.push(Tag::Embedded(EmbeddedTag { node })),
            Part::Tag(Tag::Array(array)) => {
                resolver.declare_array(&array.name)?;
                builder.declare_array(&array.name);
            }
            Part::Tag(Tag::Gap(gap)) if gap.reference.is_none() => builder.push(Tag::gap(None)),
            Part::Tag(tag @ (Tag::Literal(_) | Tag::Escape(_) | Tag::Trivia(_) | Tag::Null(_))) => {
                builder.push(tag)
            }
            Part::Tag(other) => {
                return Err(ErrorKind::UnexpectedTag {
                    tag: other.kind_name().to_string(),
                }
                .into())
            }
        }
    }
    builder.set_attributes(attributes);
    builder.finish()
}

/// A token node holding `text` as one literal.
pub fn build_token_node(language: &str, node_type: &str, text: &str) -> CstResult<Node> {
    build_flagged(
        language,
        node_type,
        NodeFlags::TOKEN,
        [Part::Tag(lit(text))],
        Attributes::new(),
    )
}

/// A token node whose text is implied by its type, such as a punctuator.
pub fn build_intrinsic_node(language: &str, node_type: &str, text: &str) -> CstResult<Node> {
    build_flagged(
        language,
        node_type,
        NodeFlags::INTRINSIC,
        [Part::Tag(lit(text))],
        Attributes::new(),
    )
}

pub fn build_trivia_node(language: &str, node_type: &str, text: &str) -> CstResult<Node> {
    build_flagged(
        language,
        node_type,
        NodeFlags::TRIVIA,
        [Part::Tag(lit(text))],
        Attributes::new(),
    )
}

pub fn build_escape_node(
    language: &str,
    node_type: &str,
    raw: &str,
    cooked: &str,
) -> CstResult<Node> {
    build_flagged(
        language,
        node_type,
        NodeFlags::ESCAPE,
        [Part::Tag(Tag::escape(raw, cooked))],
        Attributes::new(),
    )
}

/// A node whose only content is an unnamed gap.
pub fn build_gap_node(language: &str, node_type: &str) -> CstResult<Node> {
    build_node(language, node_type, [Part::Tag(Tag::gap(None))], Attributes::new())
}

/// The tree parsing `value` as a single-quoted string would produce.
pub fn build_string_node(value: &str) -> CstResult<Node> {
    let mut content = Vec::new();
    let mut literal = String::new();
    for c in value.chars() {
        let raw = match c {
            '\'' => "\\'",
            '\\' => "\\\\",
            '\n' => "\\n",
            '\r' => "\\r",
            '\0' => "\\0",
            c => {
                literal.push(c);
                continue;
            }
        };
        if !literal.is_empty() {
            content.push(Part::Tag(lit(std::mem::take(&mut literal))));
        }
        content.push(Part::Tag(Tag::escape(raw, c.to_string())));
    }
    if !literal.is_empty() {
        content.push(Part::Tag(lit(literal)));
    }

    let quote = build_intrinsic_node(STRING, "Punctuator", "'")?;
    let quote = Arc::new(quote);
    let mut parts = vec![Part::property("open", Arc::clone(&quote))];
    if !content.is_empty() {
        let content = build_node(STRING, CONTENT, content, Attributes::new())?;
        parts.push(Part::property("content", content));
    }
    parts.push(Part::property("close", quote));
    build_node(STRING, STRING, parts, Attributes::new())
}
