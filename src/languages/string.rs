//! Quoted string literals.
//!
//! `String` eats an opening quote, at most one `Content` node and the
//! matching closing quote. The quote opens a span (`Single` or `Double`)
//! guarded by itself, which is what stops `Content` in front of it. Anything
//! `Content` cannot read before the closing quote, such as a raw newline, is
//! a syntax error.

use std::sync::Arc;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::errors::{CstError, CstResult};
use crate::grammar::{CoverTable, Grammar, Language, ProductionResult};
use crate::parser::{sticky, Props, Span, TemplateParser};

use super::{code_point, hex_escape, PUNCTUATOR};

pub const NAME: &str = "String";
pub const CONTENT: &str = "Content";

/// Span kinds opened by the two quote styles.
pub const SINGLE: &str = "Single";
pub const DOUBLE: &str = "Double";

crate::productions! {
    pub enum StringProduction { String, Content }
}

static QUOTE: Lazy<Regex> = Lazy::new(|| sticky(r#"['"]"#).expect("static regex"));

static SINGLE_ESCAPE: Lazy<Regex> = Lazy::new(|| {
    sticky(r"\\(?:u(?:\{[0-9a-fA-F]{1,6}\}|[0-9a-fA-F]{4})|x[0-9a-fA-F]{2}|[\\nrt0'])")
        .expect("static regex")
});
static DOUBLE_ESCAPE: Lazy<Regex> = Lazy::new(|| {
    sticky(r#"\\(?:u(?:\{[0-9a-fA-F]{1,6}\}|[0-9a-fA-F]{4})|x[0-9a-fA-F]{2}|[\\nrt0"])"#)
        .expect("static regex")
});
static SINGLE_LITERAL: Lazy<Regex> =
    Lazy::new(|| sticky(r"[^\r\n\x00\\']+").expect("static regex"));
static DOUBLE_LITERAL: Lazy<Regex> =
    Lazy::new(|| sticky(r#"[^\r\n\x00\\"]+"#).expect("static regex"));

#[derive(Debug, Clone, Copy, Default)]
pub struct StringGrammar;

impl Grammar for StringGrammar {
    type Production = StringProduction;

    fn eval(
        &self,
        production: StringProduction,
        p: &mut TemplateParser,
        _props: &Props,
    ) -> ProductionResult {
        match production {
            StringProduction::String => string_literal(p),
            StringProduction::Content => content(p),
        }
    }
}

fn string_literal(p: &mut TemplateParser) -> ProductionResult {
    let quote = p.match_pattern(&QUOTE).unwrap_or_else(|| "\"".to_string());
    let span = if quote == "'" { SINGLE } else { DOUBLE };

    p.eat(&quote, PUNCTUATOR, Props::path("open").start_span(span).balanced(&quote))?;
    if !p.done() {
        p.eat_production(CONTENT, Props::path("content"))?;
    }
    if !p.done() {
        return Err(CstError::syntax("invalid string content"));
    }
    p.eat(&quote, PUNCTUATOR, Props::path("close").end_span(span).balancer())?;
    Ok(None)
}

fn content(p: &mut TemplateParser) -> ProductionResult {
    let (escape, literal) = if p.span().kind == DOUBLE {
        (&*DOUBLE_ESCAPE, &*DOUBLE_LITERAL)
    } else {
        (&*SINGLE_ESCAPE, &*SINGLE_LITERAL)
    };

    let mut matched = false;
    loop {
        let ate_escape = p.eat_match_escape(escape)?.is_some();
        let ate_literal = p.eat_match_literal(literal)?.is_some();
        if !ate_escape && !ate_literal {
            break;
        }
        matched = true;
    }
    if !matched {
        return Err(CstError::syntax("invalid string content"));
    }
    Ok(None)
}

/// Cooks `\n \r \t \0 \\`, the span's own quote, and hex escapes.
pub fn cook_escape(raw: &str, span: &Span) -> Result<String, String> {
    let body = raw
        .strip_prefix('\\')
        .ok_or_else(|| "string escape must start with \\".to_string())?;
    if let Some(hex) = hex_escape(body) {
        return code_point(hex);
    }
    let quote = if span.kind == DOUBLE { "\"" } else { "'" };
    let cooked = match body {
        "n" => "\n",
        "r" => "\r",
        "t" => "\t",
        "0" => "\0",
        "\\" => "\\",
        q if q == quote => quote,
        _ => return Err("unable to cook string escape".to_string()),
    };
    Ok(cooked.to_string())
}

fn build() -> CstResult<Arc<Language>> {
    let covers = CoverTable::builder().nodes([NAME, CONTENT]).build();
    Language::builder(NAME, StringGrammar)
        .covers(covers)
        .cook_escape(cook_escape)
        .build()
}

static STRING: Lazy<CstResult<Arc<Language>>> = Lazy::new(build);

/// The `String` language.
pub fn string() -> CstResult<Arc<Language>> {
    STRING.clone()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ErrorKind;
    use crate::parser::parse;
    use crate::print::print_source;
    use crate::tags::Tag;

    #[test]
    fn test_cook_escape() {
        let single = Span::new(SINGLE, Some("'".into()));
        let double = Span::new(DOUBLE, Some("\"".into()));
        assert_eq!(cook_escape("\\n", &single).unwrap(), "\n");
        assert_eq!(cook_escape("\\'", &single).unwrap(), "'");
        assert_eq!(cook_escape("\\\"", &double).unwrap(), "\"");
        assert!(cook_escape("\\\"", &single).is_err());
        assert_eq!(cook_escape("\\x41", &single).unwrap(), "A");
        assert_eq!(cook_escape("\\u{e9}", &double).unwrap(), "é");
        assert!(cook_escape("n", &single).is_err());
    }

    #[test]
    fn test_double_quoted() {
        let language = string().unwrap();
        let node = parse(&language, "String", r#""say \"hi\"""#).unwrap();
        let content = node.get("content").unwrap();
        assert_eq!(content.text(), "say \"hi\"");
        assert_eq!(print_source(&node).unwrap(), r#""say \"hi\"""#);
        assert!(content.content().any(|tag| matches!(tag, Tag::Escape(_))));
    }

    #[test]
    fn test_unterminated() {
        let language = string().unwrap();
        let err = parse(&language, "String", "'abc").unwrap_err();
        assert!(matches!(err.kind, ErrorKind::Unmatched { .. }));
        assert_eq!(err.offset(), Some(4));
    }

    #[test]
    fn test_raw_newline_is_a_syntax_error() {
        let language = string().unwrap();
        for text in ["'a\nb'", "'\n'", "\"a\rb\""] {
            let err = parse(&language, "String", text).unwrap_err();
            assert!(matches!(err.kind, ErrorKind::Syntax { .. }), "{text:?}: {err}");
        }
    }
}
