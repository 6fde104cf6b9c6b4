//! Printing: tree to tag stream, tag stream to text.
//!
//! [`stream`] re-derives the canonical tag stream of a tree. [`print_pretty`]
//! renders that stream in the indented CSTML form; [`print_source`] recovers
//! the exact source text the tree was parsed from.

mod pretty;
mod stream;

pub use pretty::{print_pretty, print_pretty_with, print_source};
pub use stream::{collect_tags, stream, stream_with, TagStream, DOCTYPE};

use crate::errors::{CstResult, ErrorKind};
use crate::tags::{AttrValue, Attributes, OpenNodeTag, Tag};

// ============================================================================
// STRINGS
// ============================================================================

fn escape_into(out: &mut String, text: &str, quote: char) {
    for c in text.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\r' => out.push_str("\\r"),
            '\n' => out.push_str("\\n"),
            '\0' => out.push_str("\\0"),
            c if c == quote => {
                out.push('\\');
                out.push(c);
            }
            c => out.push(c),
        }
    }
}

pub fn print_single_string(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 2);
    out.push('\'');
    escape_into(&mut out, text, '\'');
    out.push('\'');
    out
}

pub fn print_double_string(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 2);
    out.push('"');
    escape_into(&mut out, text, '"');
    out.push('"');
    out
}

/// Single quotes, except for a lone `'`, which prints as `"'"`.
pub fn print_string(text: &str) -> String {
    if text == "'" {
        print_double_string(text)
    } else {
        print_single_string(text)
    }
}

// ============================================================================
// ATTRIBUTES
// ============================================================================

pub fn print_value(value: &AttrValue) -> String {
    match value {
        AttrValue::Null => "null".to_string(),
        AttrValue::Bool(b) => b.to_string(),
        AttrValue::Integer(n) => n.to_string(),
        AttrValue::String(s) => print_string(s),
        AttrValue::Array(items) => {
            let items: Vec<String> = items.iter().map(print_value).collect();
            format!("[{}]", items.join(", "))
        }
        AttrValue::Object(entries) => {
            let entries: Vec<String> = entries
                .iter()
                .map(|(k, v)| format!("{}: {}", k, print_value(v)))
                .collect();
            format!("{{{}}}", entries.join(", "))
        }
    }
}

/// `key=value` pairs in key order; `true` prints as a bare key.
pub fn print_attributes(attributes: &Attributes) -> String {
    attributes
        .iter()
        .map(|(key, value)| match value {
            AttrValue::Bool(true) => key.clone(),
            value => format!("{}={}", key, print_value(value)),
        })
        .collect::<Vec<_>>()
        .join(" ")
}

// ============================================================================
// TAGS
// ============================================================================

fn open_head(open: &OpenNodeTag, qualified: bool) -> String {
    let mut out = String::from("<");
    out.push_str(&open.flags.sigils());
    if qualified {
        out.push_str(&open.language);
        out.push(':');
    }
    out.push_str(&open.node_type);
    if !open.attributes.is_empty() {
        out.push(' ');
        out.push_str(&print_attributes(&open.attributes));
    }
    out
}

fn print_open(open: &OpenNodeTag, qualified: bool) -> String {
    let mut out = open_head(open, qualified);
    out.push('>');
    out
}

/// An intrinsic node on one line: `<*Type 'text' />`.
fn print_intrinsic(open: &OpenNodeTag, qualified: bool, text: &str) -> String {
    format!("{} {} />", open_head(open, qualified), print_string(text))
}

/// Renders one tag on its own. Node types are always qualified here.
pub fn print_tag(tag: &Tag) -> CstResult<String> {
    Ok(match tag {
        Tag::Doctype(doctype) => {
            let mut out = format!("<!{}:{}", doctype.version, doctype.doctype);
            if !doctype.attributes.is_empty() {
                out.push(' ');
                out.push_str(&print_attributes(&doctype.attributes));
            }
            out.push('>');
            out
        }
        Tag::OpenNode(open) => print_open(open, true),
        Tag::CloseNode(_) | Tag::CloseFragment(_) => "</>".to_string(),
        Tag::OpenFragment(_) => "<>".to_string(),
        Tag::Reference(reference) => {
            format!("{}{}:", reference.name, if reference.is_array { "[]" } else { "" })
        }
        Tag::Gap(_) => "<//>".to_string(),
        Tag::Array(array) => format!("{}[]: []", array.name),
        Tag::Literal(literal) => print_string(&literal.text),
        Tag::Escape(escape) => format!(
            "!{}:{}",
            print_string(&escape.raw),
            print_string(&escape.cooked)
        ),
        Tag::Trivia(trivia) => format!("#{}", print_string(&trivia.text)),
        Tag::Null(_) => "null".to_string(),
        Tag::Embedded(_) => {
            return Err(ErrorKind::UnexpectedTag {
                tag: tag.kind_name().to_string(),
            }
            .into())
        }
    })
}
