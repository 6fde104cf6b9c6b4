//! Regular expression literals: `/pattern/flags`.
//!
//! The slash, group parentheses and class brackets each open a span guarded
//! by their terminator. Which characters must be escaped depends on the kind
//! of the current span (`Expression` or `CharacterClass`).
//!
//! Quantifiers are parsed after the element they apply to: `Elements` shifts
//! the element it just produced into `Quantifier`, which claims it as its
//! `element` property. An interpolated element can be quantified too.

use std::sync::Arc;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::errors::{CstError, CstResult};
use crate::grammar::{CoverTable, Grammar, Language, ProductionResult};
use crate::parser::{sticky, Props, Span, TemplateParser};
use crate::tags::{attributes, AttrValue, Attributes};

use super::{code_point, hex_escape, ESCAPE, KEYWORD, PUNCTUATOR};

pub const NAME: &str = "Regex";

/// Span kinds.
pub const EXPRESSION: &str = "Expression";
pub const CHARACTER_CLASS: &str = "CharacterClass";

crate::productions! {
    pub enum RegexProduction {
        Pattern,
        Flags,
        Flag,
        Alternatives,
        Alternative,
        Elements,
        Element,
        Group,
        CapturingGroup,
        Assertion,
        Character,
        CharacterClass,
        CharacterClassElement,
        CharacterClassRange,
        CharacterSet,
        Quantifier,
    }
}

const FLAGS: [(char, &str); 6] = [
    ('g', "global"),
    ('i', "ignoreCase"),
    ('m', "multiline"),
    ('s', "dotAll"),
    ('u', "unicode"),
    ('y', "sticky"),
];

fn re(pattern: &str) -> Regex {
    sticky(pattern).expect("static regex")
}

static FLAG_RUN: Lazy<Regex> = Lazy::new(|| re(r"[gimsuy]+"));
static FLAG: Lazy<Regex> = Lazy::new(|| re(r"[gimsuy]"));
static LOOKAROUND: Lazy<Regex> = Lazy::new(|| re(r"\(\?<?[=!]"));
static ASSERTION: Lazy<Regex> = Lazy::new(|| re(r"[$^]|\\[bB]"));
static CHARACTER_SET: Lazy<Regex> = Lazy::new(|| re(r"\.|\\[dswDSW]"));
static CLASS_SET: Lazy<Regex> = Lazy::new(|| re(r"\\[dswDSW]"));
static CLASS_RANGE: Lazy<Regex> = Lazy::new(|| re(r"(?:\\.|[^\\\]\n])-[^\]\n]"));
static QUANTIFIER: Lazy<Regex> = Lazy::new(|| re(r"[*+?]|\{\d+,?\d*\}"));
static BOUND: Lazy<Regex> = Lazy::new(|| re(r"\d{1,9}"));
static WORD_BOUNDARY: Lazy<Regex> = Lazy::new(|| re(r"[bB]"));
static ANY: Lazy<Regex> = Lazy::new(|| re(r"(?s)."));

static EXPRESSION_ESCAPE: Lazy<Regex> = Lazy::new(|| {
    re(r"\\(?:u(?:\{[0-9a-fA-F]{1,6}\}|[0-9a-fA-F]{4})|x[0-9a-fA-F]{2}|[nrt0]|[*+?{}\[\]()./^$|\\-])")
});
static EXPRESSION_SPECIAL: Lazy<Regex> = Lazy::new(|| re(r"[*+?{}\[\]().^$|\\\n]"));
static CLASS_ESCAPE: Lazy<Regex> = Lazy::new(|| {
    re(r"\\(?:u(?:\{[0-9a-fA-F]{1,6}\}|[0-9a-fA-F]{4})|x[0-9a-fA-F]{2}|[nrt0]|[\[\]\\/^.-])")
});
static CLASS_SPECIAL: Lazy<Regex> = Lazy::new(|| re(r"[\]\\\n]"));

#[derive(Debug, Clone, Copy, Default)]
pub struct RegexGrammar;

impl Grammar for RegexGrammar {
    type Production = RegexProduction;

    fn eval(
        &self,
        production: RegexProduction,
        p: &mut TemplateParser,
        props: &Props,
    ) -> ProductionResult {
        use RegexProduction::*;
        match production {
            Pattern => pattern(p),
            Flags => flags(p, props),
            Flag => flag(p),
            Alternatives => alternatives(p, props),
            Alternative => alternative(p),
            Elements => elements(p, props),
            Element => element(p),
            Group => group(p, "(?:"),
            CapturingGroup => group(p, "("),
            Assertion => assertion(p),
            Character => character(p),
            CharacterClass => character_class(p),
            CharacterClassElement => character_class_element(p),
            CharacterClassRange => character_class_range(p),
            CharacterSet => character_set(p),
            Quantifier => quantifier(p),
        }
    }
}

fn pattern(p: &mut TemplateParser) -> ProductionResult {
    p.eat("/", PUNCTUATOR, Props::path("open").start_span(EXPRESSION).balanced("/"))?;
    p.eat_production("Alternatives", Props::path("[alternatives]"))?;
    p.eat("/", PUNCTUATOR, Props::path("close").end_span(EXPRESSION).balancer())?;
    p.declare_array("[flags]")?;
    p.eat_production("Flags", Props::path("[flags]"))?;
    Ok(None)
}

fn flags(p: &mut TemplateParser, props: &Props) -> ProductionResult {
    let run = p.match_pattern(&FLAG_RUN).unwrap_or_default();
    let mut seen = String::new();
    for c in run.chars() {
        if seen.contains(c) {
            return Err(CstError::syntax("flags must be unique"));
        }
        seen.push(c);
    }
    for _ in run.chars() {
        p.eat_production("Flag", props.clone())?;
    }
    Ok(None)
}

fn flag(p: &mut TemplateParser) -> ProductionResult {
    let flag = p.eat(&FLAG, KEYWORD, Props::path("value"))?;
    let kind = FLAGS
        .iter()
        .find(|(c, _)| flag.starts_with(*c))
        .map(|(_, kind)| *kind)
        .ok_or_else(|| CstError::syntax(format!("unknown flag {flag:?}")))?;
    Ok(Some(attributes([("kind", kind)])))
}

fn alternatives(p: &mut TemplateParser, props: &Props) -> ProductionResult {
    loop {
        p.eat_production("Alternative", props.clone())?;
        if p.eat_match("|", PUNCTUATOR, Props::path("[separators]"))?.is_none() {
            return Ok(None);
        }
    }
}

fn alternative(p: &mut TemplateParser) -> ProductionResult {
    p.declare_array("[elements]")?;
    p.eat_production("Elements", Props::path("[elements]"))?;
    Ok(None)
}

/// Elements run up to the end of the enclosing span or the next `|`.
fn elements(p: &mut TemplateParser, props: &Props) -> ProductionResult {
    while !p.done() && p.match_pattern("|").is_none() {
        p.eat_production("Element", props.clone())?;
        if p.match_pattern(&QUANTIFIER).is_some() {
            p.shift_production("Quantifier", props.clone())?;
        }
    }
    Ok(None)
}

fn element(p: &mut TemplateParser) -> ProductionResult {
    if p.match_pattern("[").is_some() {
        p.eat_production("CharacterClass", Props::none())?;
    } else if p.match_pattern("(?:").is_some() {
        p.eat_production("Group", Props::none())?;
    } else if p.match_pattern(&LOOKAROUND).is_some() {
        return Err(CstError::syntax("lookahead and lookbehind are not supported"));
    } else if p.match_pattern("(").is_some() {
        p.eat_production("CapturingGroup", Props::none())?;
    } else if p.match_pattern(&ASSERTION).is_some() {
        p.eat_production("Assertion", Props::none())?;
    } else if p.match_pattern(&CHARACTER_SET).is_some() {
        p.eat_production("CharacterSet", Props::none())?;
    } else {
        p.eat_production("Character", Props::none())?;
    }
    Ok(None)
}

fn group(p: &mut TemplateParser, open: &str) -> ProductionResult {
    p.eat(open, PUNCTUATOR, Props::path("open").start_span(EXPRESSION).balanced(")"))?;
    p.eat_production("Alternatives", Props::path("[alternatives]"))?;
    p.eat(")", PUNCTUATOR, Props::path("close").end_span(EXPRESSION))?;
    Ok(None)
}

fn assertion(p: &mut TemplateParser) -> ProductionResult {
    let attrs = if p.eat_match("^", PUNCTUATOR, Props::path("value"))?.is_some() {
        attributes([("kind", "start")])
    } else if p.eat_match("$", KEYWORD, Props::path("value"))?.is_some() {
        attributes([("kind", "end")])
    } else {
        p.eat("\\", ESCAPE, Props::path("escape"))?;
        let boundary = p.eat(&WORD_BOUNDARY, KEYWORD, Props::path("value"))?;
        attributes([
            ("kind", AttrValue::from("word")),
            ("negate", AttrValue::from(boundary == "B")),
        ])
    };
    Ok(Some(attrs))
}

fn character(p: &mut TemplateParser) -> ProductionResult {
    let (escape, special) = if p.span().kind == CHARACTER_CLASS {
        (&*CLASS_ESCAPE, &*CLASS_SPECIAL)
    } else {
        (&*EXPRESSION_ESCAPE, &*EXPRESSION_SPECIAL)
    };

    if p.eat_match_escape(escape)?.is_some() {
        return Ok(None);
    }
    if let Some(found) = p.match_pattern(special) {
        return Err(CstError::syntax(format!("invalid character {found:?}")));
    }
    p.eat_literal(&ANY)?;
    Ok(None)
}

fn character_class(p: &mut TemplateParser) -> ProductionResult {
    p.eat("[", PUNCTUATOR, Props::path("open").start_span(CHARACTER_CLASS).balanced("]"))?;
    let negate = p.eat_match("^", KEYWORD, Props::path("negate"))?.is_some();
    p.declare_array("[elements]")?;
    while !p.done() {
        p.eat_production("CharacterClassElement", Props::path("[elements]"))?;
    }
    p.eat("]", PUNCTUATOR, Props::path("close").end_span(CHARACTER_CLASS).balancer())?;
    Ok(Some(attributes([("negate", negate)])))
}

fn character_class_element(p: &mut TemplateParser) -> ProductionResult {
    if p.match_pattern(&CLASS_RANGE).is_some() {
        p.eat_production("CharacterClassRange", Props::none())?;
    } else if p.match_pattern(&CLASS_SET).is_some() {
        p.eat_production("CharacterSet", Props::none())?;
    } else {
        p.eat_production("Character", Props::none())?;
    }
    Ok(None)
}

fn character_class_range(p: &mut TemplateParser) -> ProductionResult {
    p.eat_production("Character", Props::path("min"))?;
    p.eat("-", PUNCTUATOR, Props::path("rangeOperator"))?;
    p.eat_production("Character", Props::path("max"))?;
    Ok(None)
}

fn character_set(p: &mut TemplateParser) -> ProductionResult {
    if p.eat_match(".", KEYWORD, Props::path("value"))?.is_some() {
        return Ok(Some(attributes([("kind", "any")])));
    }
    p.eat("\\", PUNCTUATOR, Props::path("escape"))?;

    const SETS: [(&str, &str, bool); 6] = [
        ("d", "digit", false),
        ("D", "digit", true),
        ("s", "space", false),
        ("S", "space", true),
        ("w", "word", false),
        ("W", "word", true),
    ];
    for (letter, kind, negate) in SETS {
        if p.eat_match(letter, KEYWORD, Props::path("value"))?.is_some() {
            let mut attrs = attributes([("kind", kind)]);
            if negate {
                attrs.insert("negate".into(), AttrValue::Bool(true));
            }
            return Ok(Some(attrs));
        }
    }
    Err(CstError::syntax("unknown character set kind"))
}

fn quantifier(p: &mut TemplateParser) -> ProductionResult {
    p.eat_held_production("Element", Props::path("element"))?;

    let (min, max) = if p.eat_match("*", KEYWORD, Props::path("value"))?.is_some() {
        (0, None)
    } else if p.eat_match("+", KEYWORD, Props::path("value"))?.is_some() {
        (1, None)
    } else if p.eat_match("?", KEYWORD, Props::path("value"))?.is_some() {
        (0, Some(1))
    } else {
        p.eat("{", PUNCTUATOR, Props::path("open").balanced("}"))?;
        let min = bound(&p.eat(&BOUND, "DecimalInteger", Props::path("min"))?)?;
        let max = if p.eat_match(",", PUNCTUATOR, Props::path("separator"))?.is_some() {
            match p.eat_match(&BOUND, "DecimalInteger", Props::path("max"))? {
                Some(max) => Some(bound(&max)?),
                None => None,
            }
        } else {
            Some(min)
        };
        p.eat("}", PUNCTUATOR, Props::path("close").balancer())?;
        (min, max)
    };

    let mut attrs = Attributes::new();
    attrs.insert("min".into(), AttrValue::Integer(min));
    attrs.insert("max".into(), max.map_or(AttrValue::Null, AttrValue::Integer));
    Ok(Some(attrs))
}

fn bound(digits: &str) -> CstResult<i64> {
    digits
        .parse()
        .map_err(|_| CstError::syntax(format!("invalid quantifier bound {digits:?}")))
}

/// Cooks `\n \r \t \0`, hex escapes, and identity escapes such as `\.`.
pub fn cook_escape(raw: &str, _span: &Span) -> Result<String, String> {
    let body = raw
        .strip_prefix('\\')
        .ok_or_else(|| "regex escape must start with \\".to_string())?;
    if let Some(hex) = hex_escape(body) {
        return code_point(hex);
    }
    let cooked = match body {
        "n" => "\n",
        "r" => "\r",
        "t" => "\t",
        "0" => "\0",
        other if other.chars().count() == 1 => other,
        _ => return Err("unable to cook regex escape".to_string()),
    };
    Ok(cooked.to_string())
}

fn build() -> CstResult<Arc<Language>> {
    let covers = CoverTable::builder()
        .nodes([
            "Pattern",
            "Element",
            "Flag",
            "Alternative",
            "Group",
            "CapturingGroup",
            "Assertion",
            "Character",
            "CharacterClass",
            "CharacterClassElement",
            "CharacterClassRange",
            "CharacterSet",
            "Quantifier",
        ])
        .fragments(["Flags"])
        .cover(
            "Element",
            [
                "CharacterClass",
                "Group",
                "CapturingGroup",
                "Assertion",
                "CharacterSet",
                "Character",
                "Quantifier",
            ],
        )
        .cover(
            "CharacterClassElement",
            ["CharacterClassRange", "CharacterSet", "Character"],
        )
        .build();
    Language::builder(NAME, RegexGrammar)
        .covers(covers)
        .cook_escape(cook_escape)
        .build()
}

static LANGUAGE: Lazy<CstResult<Arc<Language>>> = Lazy::new(build);

/// The `Regex` language. Parse with `Pattern` as the root.
pub fn regex() -> CstResult<Arc<Language>> {
    LANGUAGE.clone()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ErrorKind;
    use crate::parser::{parse, parse_template, Template};
    use crate::print::print_source;

    fn parse_regex(text: &str) -> CstResult<Arc<crate::node::Node>> {
        parse(&regex()?, "Pattern", text)
    }

    #[test]
    fn test_flags() {
        let node = parse_regex("/a/gi").unwrap();
        let kinds: Vec<AttrValue> = node
            .elements("flags")
            .into_iter()
            .flatten()
            .filter_map(|flag| flag.attributes.get("kind").cloned())
            .collect();
        assert_eq!(kinds, vec![AttrValue::from("global"), AttrValue::from("ignoreCase")]);

        let err = parse_regex("/a/gg").unwrap_err();
        assert!(matches!(err.kind, ErrorKind::Syntax { .. }));
    }

    #[test]
    fn test_gap_in_flags() {
        let template = Template::with_gaps("/a/<//>");
        let node = parse_template(&regex().unwrap(), "Pattern", template).unwrap();
        assert_eq!(node.elements("flags"), vec![None]);
    }

    #[test]
    fn test_quantifier_claims_element() {
        let node = parse_regex("/ab{2,}/").unwrap();
        let alternative = node.elements("alternatives")[0].unwrap();
        let elements = alternative.elements("elements");
        assert_eq!(elements.len(), 2);
        let quantifier = elements[1].unwrap();
        assert_eq!(quantifier.node_type, "Quantifier");
        assert_eq!(quantifier.get("element").unwrap().text(), "b");
        assert_eq!(quantifier.attributes.get("min"), Some(&AttrValue::Integer(2)));
        assert_eq!(quantifier.attributes.get("max"), Some(&AttrValue::Null));
    }

    #[test]
    fn test_round_trips_source() {
        for text in [
            "/a|b/",
            "/(?:ab)+c?/m",
            "/^[^a-z\\d.]$/",
            "/(x)\\.\\u{41}/",
            r"/\bfoo\B/",
            "//",
        ] {
            let node = parse_regex(text).unwrap();
            assert_eq!(print_source(&node).unwrap(), text);
        }
    }

    #[test]
    fn test_rejects_unsupported() {
        assert!(parse_regex("/(?=a)/").is_err());
        assert!(parse_regex("/a)/").is_err());
        assert!(parse_regex("/[a/").is_err());
    }

    #[test]
    fn test_cook_escape() {
        let span = Span::new(EXPRESSION, Some("/".into()));
        assert_eq!(cook_escape("\\.", &span).unwrap(), ".");
        assert_eq!(cook_escape("\\t", &span).unwrap(), "\t");
        assert_eq!(cook_escape("\\x2f", &span).unwrap(), "/");
    }
}
