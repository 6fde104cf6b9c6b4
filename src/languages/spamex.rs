//! Spamex: patterns that match nodes or strings.
//!
//! A `NodeMatcher` reads like a CSTML open tag: `<*Type 'value' attr=1>`.
//! `?` in place of the type matches any node. A `StringMatcher` is a
//! `String` string or a `Regex` pattern.

use std::sync::Arc;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::errors::{CstError, CstResult};
use crate::grammar::{CoverTable, Grammar, Language, ProductionResult};
use crate::parser::{sticky, Props, TemplateParser};

use super::cstml::{cstml, IDENTIFIER, TAG};
use super::{regex, string, PUNCTUATOR};

pub const NAME: &str = "Spamex";
pub const CANONICAL_ID: &str = "https://bablr.org/languages/core/en/spamex";

crate::productions! {
    pub enum SpamexProduction {
        Pattern,
        Matcher,
        NodeMatcher,
        StringMatcher,
        Identifier,
    }
}

fn re(pattern: &str) -> Regex {
    sticky(pattern).expect("static regex")
}

static SPACE: Lazy<Regex> = Lazy::new(|| re(r"\s+"));
static WORD: Lazy<Regex> = Lazy::new(|| re(r"\w+"));
static FLAG: Lazy<Regex> = Lazy::new(|| re(r"[#*@+]"));
static QUALIFIED: Lazy<Regex> = Lazy::new(|| re(r"\w+:"));
static NODE_START: Lazy<Regex> = Lazy::new(|| re(r"<(?:[^!/]|\z)"));
static STRING_START: Lazy<Regex> = Lazy::new(|| re(r#"['"/]"#));
static VALUE_START: Lazy<Regex> = Lazy::new(|| re(r#"\s+['"/]"#));

#[derive(Debug, Clone, Copy, Default)]
pub struct SpamexGrammar;

impl Grammar for SpamexGrammar {
    type Production = SpamexProduction;

    fn eval(
        &self,
        production: SpamexProduction,
        p: &mut TemplateParser,
        _props: &Props,
    ) -> ProductionResult {
        match production {
            SpamexProduction::Pattern => {
                p.eat_production("Matcher", Props::path("matcher"))?;
            }
            SpamexProduction::Matcher => {
                let name = if p.match_pattern(&NODE_START).is_some() {
                    "NodeMatcher"
                } else if p.match_pattern(&STRING_START).is_some() {
                    "StringMatcher"
                } else {
                    return Err(CstError::syntax("expected a node or string matcher"));
                };
                p.eat_production(name, Props::none())?;
            }
            SpamexProduction::NodeMatcher => node_matcher(p)?,
            SpamexProduction::StringMatcher => {
                if p.match_pattern("/").is_some() {
                    p.eat_production("Regex:Pattern", Props::none())?;
                } else {
                    p.eat_production("String:String", Props::none())?;
                }
            }
            SpamexProduction::Identifier => {
                p.eat_literal(&WORD)?;
            }
        }
        Ok(None)
    }
}

fn node_matcher(p: &mut TemplateParser) -> CstResult<()> {
    p.eat("<", PUNCTUATOR, Props::path("open").start_span(TAG).balanced(">"))?;
    if p.match_pattern(&FLAG).is_some() {
        p.eat_production("CSTML:Flags", Props::path("flags"))?;
    }

    if p.eat_match("?", PUNCTUATOR, Props::path("type"))?.is_none() {
        if p.match_pattern(&QUALIFIED).is_some() {
            p.eat(&WORD, IDENTIFIER, Props::path("language"))?;
            p.eat(":", PUNCTUATOR, Props::path("namespaceOperator"))?;
        }
        p.eat_production("Identifier", Props::path("type"))?;
    }

    if p.match_pattern(&VALUE_START).is_some() {
        p.eat_trivia(&SPACE)?;
        p.eat_production("StringMatcher", Props::path("value"))?;
    }
    p.eat_production("CSTML:Attributes", Props::none())?;
    p.eat_match_trivia(&SPACE)?;
    p.eat(">", PUNCTUATOR, Props::path("close").end_span(TAG).balancer())?;
    Ok(())
}

fn build() -> CstResult<Arc<Language>> {
    let covers = CoverTable::builder()
        .nodes(["Pattern", "Matcher", "NodeMatcher", "StringMatcher", "Identifier"])
        .cover("Matcher", ["NodeMatcher", "StringMatcher"])
        .cover("StringMatcher", ["String:String", "Regex:Pattern"])
        .build();
    Language::builder(NAME, SpamexGrammar)
        .canonical_id(CANONICAL_ID)
        .dependency(cstml()?)
        .dependency(string()?)
        .dependency(regex()?)
        .covers(covers)
        .build()
}

static LANGUAGE: Lazy<CstResult<Arc<Language>>> = Lazy::new(build);

/// The `Spamex` language. Parse with `Pattern` as the root.
pub fn spamex() -> CstResult<Arc<Language>> {
    LANGUAGE.clone()
}
