//! The tag vocabulary every tree is built from and linearized into.
//!
//! A [`Node`](crate::node::Node) stores its content as a sequence of tags that
//! begins with its own [`OpenNodeTag`] and ends with its own [`CloseNodeTag`].
//! Streaming a tree flattens those sequences depth-first into one tag stream.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::errors::{CstResult, ErrorKind};
use crate::node::Node;

// ============================================================================
// FLAGS
// ============================================================================

/// Per-node flags, printed as sigils in front of the node type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct NodeFlags {
    /// Content is pure literal/escape text.
    pub token: bool,
    /// Insignificant text such as whitespace or comments.
    pub trivia: bool,
    /// The node represents an escape sequence.
    pub escape: bool,
    /// Textual form is implied by the node type. Implies `token`.
    pub intrinsic: bool,
    /// The node was supplied through an interpolation.
    pub expression: bool,
}

impl NodeFlags {
    pub const NODE: NodeFlags = NodeFlags {
        token: false,
        trivia: false,
        escape: false,
        intrinsic: false,
        expression: false,
    };

    pub const TOKEN: NodeFlags = NodeFlags {
        token: true,
        ..NodeFlags::NODE
    };

    pub const INTRINSIC: NodeFlags = NodeFlags {
        token: true,
        intrinsic: true,
        ..NodeFlags::NODE
    };

    pub const TRIVIA: NodeFlags = NodeFlags {
        trivia: true,
        ..NodeFlags::NODE
    };

    pub const ESCAPE: NodeFlags = NodeFlags {
        escape: true,
        ..NodeFlags::NODE
    };

    /// Rejects flag combinations that cannot describe a real node.
    pub fn validate(&self, node_type: &str) -> CstResult<()> {
        if self.trivia && self.escape {
            return Err(ErrorKind::FlagConflict {
                node_type: node_type.to_string(),
                reason: "a node cannot be both trivia and escape",
            }
            .into());
        }
        if self.intrinsic && !self.token {
            return Err(ErrorKind::FlagConflict {
                node_type: node_type.to_string(),
                reason: "an intrinsic node must be a token",
            }
            .into());
        }
        Ok(())
    }

    /// `#` trivia, `*` token, `@` escape, `+` expression.
    pub fn sigils(&self) -> String {
        let mut out = String::new();
        if self.trivia {
            out.push('#');
        }
        if self.token {
            out.push('*');
        }
        if self.escape {
            out.push('@');
        }
        if self.expression {
            out.push('+');
        }
        out
    }
}

// ============================================================================
// ATTRIBUTE VALUES
// ============================================================================

/// Attribute map. Ordered by key, which is also the printed order.
pub type Attributes = im::OrdMap<String, AttrValue>;

/// A value a production may attach to its node as an attribute.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum AttrValue {
    Null,
    Bool(bool),
    Integer(i64),
    String(String),
    Array(Vec<AttrValue>),
    Object(im::OrdMap<String, AttrValue>),
}

impl From<bool> for AttrValue {
    fn from(value: bool) -> Self {
        AttrValue::Bool(value)
    }
}

impl From<i64> for AttrValue {
    fn from(value: i64) -> Self {
        AttrValue::Integer(value)
    }
}

impl From<i32> for AttrValue {
    fn from(value: i32) -> Self {
        AttrValue::Integer(i64::from(value))
    }
}

impl From<&str> for AttrValue {
    fn from(value: &str) -> Self {
        AttrValue::String(value.to_string())
    }
}

impl From<String> for AttrValue {
    fn from(value: String) -> Self {
        AttrValue::String(value)
    }
}

impl<T: Into<AttrValue>> From<Option<T>> for AttrValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(AttrValue::Null, Into::into)
    }
}

/// Builds an [`Attributes`] map from `(key, value)` pairs.
pub fn attributes<K, V, I>(pairs: I) -> Attributes
where
    K: Into<String>,
    V: Into<AttrValue>,
    I: IntoIterator<Item = (K, V)>,
{
    pairs
        .into_iter()
        .map(|(k, v)| (k.into(), v.into()))
        .collect()
}

// ============================================================================
// TAGS
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpenNodeTag {
    pub flags: NodeFlags,
    pub language: String,
    pub node_type: String,
    pub attributes: Attributes,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CloseNodeTag {
    pub node_type: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct OpenFragmentTag;

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CloseFragmentTag;

/// A named edge from a node to a child.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ReferenceTag {
    pub name: String,
    pub is_array: bool,
}

impl ReferenceTag {
    pub fn new(name: impl Into<String>, is_array: bool) -> Self {
        Self {
            name: name.into(),
            is_array,
        }
    }

    /// Parses a property path: `name` is singular, `name[]` and `[name]` are
    /// array-valued.
    pub fn parse(path: &str) -> CstResult<Self> {
        let trimmed = path.trim();
        let (name, is_array) = if let Some(name) = trimmed.strip_suffix("[]") {
            (name.trim(), true)
        } else if let Some(name) = trimmed
            .strip_prefix('[')
            .and_then(|rest| rest.strip_suffix(']'))
        {
            (name.trim(), true)
        } else {
            (trimmed, false)
        };

        let valid = !name.is_empty() && name.chars().all(|c| c.is_alphanumeric() || c == '_');
        if !valid {
            return Err(ErrorKind::InvalidPath {
                path: path.to_string(),
            }
            .into());
        }
        Ok(Self::new(name, is_array))
    }
}

/// Placeholder for a deliberately unsupplied interpolation.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct GapTag {
    /// The slot the gap stands in, when it was requested under a path.
    pub reference: Option<ReferenceTag>,
}

/// Declares an array-valued property, ahead of its first element.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArrayTag {
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LiteralTag {
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EscapeTag {
    pub raw: String,
    pub cooked: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TriviaTag {
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct NullTag;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DoctypeTag {
    pub doctype: String,
    pub version: u32,
    pub attributes: Attributes,
}

/// A child node attached without a reference.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmbeddedTag {
    pub node: Arc<Node>,
}

/// One element of a node's content or of a flattened tag stream.
///
/// `Embedded` only ever appears inside node content; the streamer replaces
/// it with the embedded node's own tags.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Tag {
    Doctype(DoctypeTag),
    OpenNode(OpenNodeTag),
    CloseNode(CloseNodeTag),
    OpenFragment(OpenFragmentTag),
    CloseFragment(CloseFragmentTag),
    Reference(ReferenceTag),
    Gap(GapTag),
    Array(ArrayTag),
    Literal(LiteralTag),
    Escape(EscapeTag),
    Trivia(TriviaTag),
    Null(NullTag),
    Embedded(EmbeddedTag),
}

impl Tag {
    pub fn literal(text: impl Into<String>) -> Self {
        Tag::Literal(LiteralTag { text: text.into() })
    }

    pub fn trivia(text: impl Into<String>) -> Self {
        Tag::Trivia(TriviaTag { text: text.into() })
    }

    pub fn escape(raw: impl Into<String>, cooked: impl Into<String>) -> Self {
        Tag::Escape(EscapeTag {
            raw: raw.into(),
            cooked: cooked.into(),
        })
    }

    pub fn reference(name: impl Into<String>, is_array: bool) -> Self {
        Tag::Reference(ReferenceTag::new(name, is_array))
    }

    pub fn gap(reference: Option<ReferenceTag>) -> Self {
        Tag::Gap(GapTag { reference })
    }

    pub fn kind_name(&self) -> &'static str {
        match self {
            Tag::Doctype(_) => "Doctype",
            Tag::OpenNode(_) => "OpenNode",
            Tag::CloseNode(_) => "CloseNode",
            Tag::OpenFragment(_) => "OpenFragment",
            Tag::CloseFragment(_) => "CloseFragment",
            Tag::Reference(_) => "Reference",
            Tag::Gap(_) => "Gap",
            Tag::Array(_) => "Array",
            Tag::Literal(_) => "Literal",
            Tag::Escape(_) => "Escape",
            Tag::Trivia(_) => "Trivia",
            Tag::Null(_) => "Null",
            Tag::Embedded(_) => "Embedded",
        }
    }

    /// Literal and escape tags are the content of token nodes.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Tag::Literal(_) | Tag::Escape(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_paths() {
        assert_eq!(ReferenceTag::parse("open").unwrap(), ReferenceTag::new("open", false));
        assert_eq!(ReferenceTag::parse("elements[]").unwrap(), ReferenceTag::new("elements", true));
        assert_eq!(ReferenceTag::parse("[elements]").unwrap(), ReferenceTag::new("elements", true));
        assert!(ReferenceTag::parse("").is_err());
        assert!(ReferenceTag::parse("a.b").is_err());
        assert!(ReferenceTag::parse("[]").is_err());
    }

    #[test]
    fn test_flags() {
        let conflicted = NodeFlags {
            trivia: true,
            escape: true,
            ..NodeFlags::NODE
        };
        assert!(conflicted.validate("X").is_err());

        let loose = NodeFlags {
            intrinsic: true,
            ..NodeFlags::NODE
        };
        assert!(loose.validate("X").is_err());
        assert!(NodeFlags::INTRINSIC.validate("X").is_ok());

        let all = NodeFlags {
            trivia: true,
            token: true,
            expression: true,
            ..NodeFlags::NODE
        };
        assert_eq!(all.sigils(), "#*+");
    }
}
