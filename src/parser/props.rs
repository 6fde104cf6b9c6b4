//! Invocation props and match patterns.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::tags::{AttrValue, Attributes};

/// The properties bag a production or token match is invoked with.
///
/// ```
/// use cstml::parser::Props;
/// let props = Props::path("open").start_span("Single").balanced("'");
/// assert_eq!(props.path.as_deref(), Some("open"));
/// assert_eq!(props.balanced.as_deref(), Some("'"));
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Props {
    /// Property path the result attaches under: `name`, `name[]` or `[name]`.
    pub path: Option<String>,
    /// Opens a span of this kind after matching.
    pub start_span: Option<String>,
    /// Closes the current span, which must be of this kind.
    pub end_span: Option<String>,
    /// Opens a span guarded by this terminator after matching.
    pub balanced: Option<String>,
    /// Matches against the unguarded input and closes the current span.
    pub balancer: bool,
    /// Free-form values passed through to the handler.
    pub attributes: Attributes,
}

impl Props {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn path(path: impl Into<String>) -> Self {
        Self {
            path: Some(path.into()),
            ..Self::default()
        }
    }

    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    pub fn start_span(mut self, kind: impl Into<String>) -> Self {
        self.start_span = Some(kind.into());
        self
    }

    pub fn end_span(mut self, kind: impl Into<String>) -> Self {
        self.end_span = Some(kind.into());
        self
    }

    pub fn balanced(mut self, guard: impl Into<String>) -> Self {
        self.balanced = Some(guard.into());
        self
    }

    pub fn balancer(mut self) -> Self {
        self.balancer = true;
        self
    }

    pub fn attribute(mut self, key: impl Into<String>, value: impl Into<AttrValue>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    /// Whether a match with these props sees past the current guard.
    pub fn is_balancer(&self) -> bool {
        self.balancer || self.end_span.is_some()
    }

    pub fn opens_span(&self) -> bool {
        self.start_span.is_some() || self.balanced.is_some()
    }
}

/// What a token match looks for at the cursor.
#[derive(Debug, Clone, Copy)]
pub enum Pattern<'a> {
    /// An exact prefix.
    Str(&'a str),
    /// A regex that must match at the cursor.
    Regex(&'a Regex),
}

impl<'a> Pattern<'a> {
    /// The matched prefix of `input`. Empty matches count as no match.
    pub fn match_at<'i>(&self, input: &'i str) -> Option<&'i str> {
        let matched = match self {
            Pattern::Str(s) => input.starts_with(s).then(|| &input[..s.len()]),
            Pattern::Regex(re) => re
                .find(input)
                .filter(|m| m.start() == 0)
                .map(|m| m.as_str()),
        }?;
        (!matched.is_empty()).then_some(matched)
    }

    pub fn is_str(&self) -> bool {
        matches!(self, Pattern::Str(_))
    }

    pub fn describe(&self) -> String {
        match self {
            Pattern::Str(s) => format!("{s:?}"),
            Pattern::Regex(re) => format!("/{}/", re.as_str()),
        }
    }
}

impl<'a> From<&'a str> for Pattern<'a> {
    fn from(value: &'a str) -> Self {
        Pattern::Str(value)
    }
}

impl<'a> From<&'a String> for Pattern<'a> {
    fn from(value: &'a String) -> Self {
        Pattern::Str(value.as_str())
    }
}

impl<'a> From<&'a Regex> for Pattern<'a> {
    fn from(value: &'a Regex) -> Self {
        Pattern::Regex(value)
    }
}

impl<'a> From<&'a Lazy<Regex>> for Pattern<'a> {
    fn from(value: &'a Lazy<Regex>) -> Self {
        Pattern::Regex(Lazy::force(value))
    }
}

/// Compiles `pattern` anchored at the start of the input.
pub fn sticky(pattern: &str) -> Result<Regex, regex::Error> {
    Regex::new(&format!(r"\A(?:{pattern})"))
}
