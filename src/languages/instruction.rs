//! Instructions: a verb applied to a tuple of expressions.
//!
//! `eat(<*Word 'hi'> 'word' { strict: true })` reads as a `Call` whose
//! `arguments` tuple holds a Spamex matcher, a string and an object.
//! Elements of objects, arrays and tuples are separated by whitespace.

use std::sync::Arc;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::errors::{CstError, CstResult};
use crate::grammar::{CoverTable, Grammar, Language, ProductionResult};
use crate::parser::{sticky, Props, TemplateParser};

use super::cstml::{cstml, IDENTIFIER};
use super::{regex, spamex, string, KEYWORD, PUNCTUATOR};

pub const NAME: &str = "Instruction";
pub const CANONICAL_ID: &str = "https://bablr.org/languages/core/bablr-vm-instruction";

crate::productions! {
    pub enum InstructionProduction {
        Call,
        Expression,
        Object,
        Property,
        Array,
        Tuple,
        Identifier,
        Boolean,
        Null,
    }
}

fn re(pattern: &str) -> Regex {
    sticky(pattern).expect("static regex")
}

static SPACE: Lazy<Regex> = Lazy::new(|| re(r"\s+"));
static WORD: Lazy<Regex> = Lazy::new(|| re(r"[a-zA-Z]\w*"));
static QUOTE: Lazy<Regex> = Lazy::new(|| re(r#"['"]"#));
static BOOLEAN: Lazy<Regex> = Lazy::new(|| re(r"(?:true|false)\b"));
static NULL: Lazy<Regex> = Lazy::new(|| re(r"null\b"));

#[derive(Debug, Clone, Copy, Default)]
pub struct InstructionGrammar;

impl Grammar for InstructionGrammar {
    type Production = InstructionProduction;

    fn eval(
        &self,
        production: InstructionProduction,
        p: &mut TemplateParser,
        _props: &Props,
    ) -> ProductionResult {
        use InstructionProduction::*;
        match production {
            Call => {
                p.eat(&WORD, IDENTIFIER, Props::path("verb"))?;
                p.eat_match_trivia(&SPACE)?;
                p.eat_production("Tuple", Props::path("arguments"))?;
            }
            Expression => expression(p)?,
            Object => sequence(p, ("{", "}"), "Property", "properties[]")?,
            Property => {
                p.eat(&WORD, IDENTIFIER, Props::path("key"))?;
                p.eat_match_trivia(&SPACE)?;
                p.eat(":", PUNCTUATOR, Props::path("mapOperator"))?;
                p.eat_match_trivia(&SPACE)?;
                p.eat_production("Expression", Props::path("value"))?;
            }
            Array => sequence(p, ("[", "]"), "Expression", "elements[]")?,
            Tuple => sequence(p, ("(", ")"), "Expression", "values[]")?,
            Identifier => {
                p.eat_literal(&WORD)?;
            }
            Boolean => {
                p.eat(&BOOLEAN, KEYWORD, Props::path("value"))?;
            }
            Null => {
                p.eat(&NULL, KEYWORD, Props::path("value"))?;
            }
        }
        Ok(None)
    }
}

fn expression(p: &mut TemplateParser) -> CstResult<()> {
    let name = if p.match_pattern("[").is_some() {
        "Array"
    } else if p.match_pattern("{").is_some() {
        "Object"
    } else if p.match_pattern("(").is_some() {
        "Tuple"
    } else if p.match_pattern(&QUOTE).is_some() {
        "String:String"
    } else if p.match_pattern("<//>").is_some() {
        "CSTML:Gap"
    } else if p.match_pattern("/").is_some() {
        "Regex:Pattern"
    } else if p.match_pattern(&BOOLEAN).is_some() {
        "Boolean"
    } else if p.match_pattern(&NULL).is_some() {
        "Null"
    } else if p.match_pattern(&WORD).is_some() {
        "Identifier"
    } else if p.match_pattern("<").is_some() {
        "Spamex:Matcher"
    } else {
        return Err(CstError::syntax("expected an expression"));
    };
    p.eat_production(name, Props::none())?;
    Ok(())
}

/// `open item item close`, where each `item` runs `production` under `path`.
fn sequence(
    p: &mut TemplateParser,
    (open, close): (&str, &str),
    production: &str,
    path: &str,
) -> CstResult<()> {
    p.declare_array(path)?;
    p.eat(open, PUNCTUATOR, Props::path("open").balanced(close))?;
    p.eat_match_trivia(&SPACE)?;
    while !p.done() {
        p.eat_production(production, Props::path(path))?;
        if p.eat_match_trivia(&SPACE)?.is_none() {
            break;
        }
    }
    p.eat(close, PUNCTUATOR, Props::path("close").balancer())?;
    Ok(())
}

fn build() -> CstResult<Arc<Language>> {
    let covers = CoverTable::builder()
        .nodes(["Call", "Expression", "Object", "Property", "Array", "Tuple"])
        .nodes(["Identifier", "Boolean", "Null"])
        .cover(
            "Expression",
            [
                "Object",
                "Array",
                "Tuple",
                "Identifier",
                "String:String",
                "CSTML:Gap",
                "Regex:Pattern",
                "Boolean",
                "Null",
                "Spamex:Matcher",
            ],
        )
        .build();
    Language::builder(NAME, InstructionGrammar)
        .canonical_id(CANONICAL_ID)
        .dependency(spamex()?)
        .dependency(cstml()?)
        .dependency(string()?)
        .dependency(regex()?)
        .covers(covers)
        .build()
}

static LANGUAGE: Lazy<CstResult<Arc<Language>>> = Lazy::new(build);

/// The `Instruction` language. Parse with `Call` as the root.
pub fn instruction() -> CstResult<Arc<Language>> {
    LANGUAGE.clone()
}
