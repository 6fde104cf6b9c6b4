//! # Shared test grammars
//!
//! `List` is a small bracketed-list language that depends on the bundled
//! `Number` language, plus a few productions that exist only to drive the
//! parser into its error paths. `Tally` reaches `Number` through an alias.

#![allow(dead_code)]

use std::sync::Arc;

use cstml::grammar::{CoverTable, Grammar, Language, ProductionResult};
use cstml::parser::{sticky, Props, Span, TemplateParser};
use cstml::tags::attributes;
use cstml::{CstResult, Node, Template};
use once_cell::sync::Lazy;
use regex::Regex;

pub const PUNCTUATOR: &str = "Punctuator";

cstml::productions! {
    pub enum ListProduction {
        List, Item, Word, Strict, Sentence, Phrase, Words,
        Deep, Chucked, Suffix, Bang, Orphan, Unclaimed, Ignore, Twice, Guarded,
        Doubled, Pair, Any
    }
}

static ITEM: Lazy<Regex> = Lazy::new(|| sticky(r"[a-z\[\-0-9I]").expect("static regex"));
static NUMBER: Lazy<Regex> = Lazy::new(|| sticky(r"-?(?:\d|Infinity)").expect("static regex"));
static WORD: Lazy<Regex> = Lazy::new(|| sticky(r"[a-z]+").expect("static regex"));
static SPACE: Lazy<Regex> = Lazy::new(|| sticky(r" +").expect("static regex"));

pub struct ListGrammar;

impl Grammar for ListGrammar {
    type Production = ListProduction;

    fn eval(
        &self,
        production: ListProduction,
        p: &mut TemplateParser,
        _props: &Props,
    ) -> ProductionResult {
        match production {
            ListProduction::List => {
                p.declare_array("items[]")?;
                p.eat("[", PUNCTUATOR, Props::path("open").start_span("Bracket").balanced("]"))?;
                while p.match_pattern(&ITEM).is_some() || p.at_expression() {
                    p.eat_production("Item", Props::path("items[]"))?;
                    p.eat_match_trivia(&SPACE)?;
                }
                p.eat("]", PUNCTUATOR, Props::path("close").end_span("Bracket").balancer())?;
            }
            ListProduction::Item => {
                if p.match_pattern("[").is_some() {
                    p.eat_production("List", Props::none())?;
                } else if p.match_pattern(&NUMBER).is_some() {
                    p.eat_production("Number:Number", Props::none())?;
                } else {
                    p.eat_production("Word", Props::none())?;
                }
            }
            ListProduction::Word => {
                p.eat_literal(&WORD)?;
            }
            ListProduction::Strict => {
                let name = if p.match_pattern("[").is_some() { "List" } else { "Word" };
                p.eat_production(name, Props::none())?;
            }
            ListProduction::Sentence => {
                p.eat("<", PUNCTUATOR, Props::path("open"))?;
                p.eat_production("Words", Props::none())?;
                p.eat(">", PUNCTUATOR, Props::path("close"))?;
            }
            ListProduction::Phrase => {
                p.eat_production("Words", Props::none())?;
            }
            ListProduction::Words => loop {
                p.eat_production("Word", Props::path("words[]"))?;
                if p.eat_match_trivia(&SPACE)?.is_none() {
                    break;
                }
            },
            ListProduction::Deep => {
                p.eat_production("Deep", Props::none())?;
            }
            ListProduction::Chucked => {
                p.eat_literal("abc")?;
                p.chuck("c")?;
            }
            ListProduction::Suffix => {
                p.eat_production("Word", Props::path("word"))?;
                if p.match_pattern("!").is_some() {
                    p.shift_production("Bang", Props::none())?;
                }
            }
            ListProduction::Bang => {
                p.eat_held_production("Word", Props::path("target"))?;
                p.eat("!", PUNCTUATOR, Props::path("bang"))?;
            }
            ListProduction::Orphan => {
                p.eat_held_production("Word", Props::path("target"))?;
            }
            ListProduction::Unclaimed => {
                p.eat_production("Word", Props::path("word"))?;
                p.shift_production("Ignore", Props::none())?;
            }
            ListProduction::Ignore => {
                p.eat("!", PUNCTUATOR, Props::path("bang"))?;
            }
            ListProduction::Twice => {
                p.eat("a", PUNCTUATOR, Props::path("x"))?;
                p.eat("b", PUNCTUATOR, Props::path("x"))?;
            }
            ListProduction::Doubled => {
                p.eat_production("Word", Props::path("value"))?;
                p.eat_production("Word", Props::path("value"))?;
            }
            ListProduction::Pair => {
                p.eat_production("Word", Props::none())?;
                p.eat_production("List", Props::none())?;
            }
            ListProduction::Any => {
                let name = if p.match_pattern("[").is_some() { "List" } else { "Word" };
                p.eat_production(name, Props::none())?;
            }
            ListProduction::Guarded => {
                p.push_span(Span::new("Semi", Some(";".to_string())));
                let blocked = p.match_pattern(";").is_none();
                let kind = p.span().kind.clone();
                p.eat(";", PUNCTUATOR, Props::path("semi").balancer())?;
                let guard = p.span().kind.clone();
                return Ok(Some(attributes([
                    ("blocked", cstml::AttrValue::from(blocked)),
                    ("inner", kind.into()),
                    ("after", guard.into()),
                ])));
            }
        }
        Ok(None)
    }
}

/// The `List` language. `Item` covers words, nested lists and integers.
pub fn list() -> CstResult<Arc<Language>> {
    let covers = CoverTable::builder()
        .nodes([
            "List", "Item", "Word", "Sentence", "Phrase", "Deep", "Chucked", "Suffix", "Bang",
            "Orphan", "Unclaimed", "Ignore", "Twice", "Guarded", "Doubled", "Any",
        ])
        .fragments(["Words"])
        .cover("Item", ["Word", "List", "Number:Number", "Number:Integer"])
        .cover("Strict", ["Word"])
        .cover("Pair", ["Word", "List"])
        .cover("Any", Vec::<&str>::new())
        .build();
    Language::builder("List", ListGrammar)
        .dependency(cstml::languages::number()?)
        .covers(covers)
        .build()
}

cstml::productions! {
    pub enum TallyProduction { Tally, Amount }
}

pub struct TallyGrammar;

impl Grammar for TallyGrammar {
    type Production = TallyProduction;

    fn eval(
        &self,
        production: TallyProduction,
        p: &mut TemplateParser,
        _props: &Props,
    ) -> ProductionResult {
        match production {
            TallyProduction::Tally => {
                p.eat("#", PUNCTUATOR, Props::path("mark"))?;
                p.eat_production("Amount", Props::path("amount"))?;
            }
            TallyProduction::Amount => {
                p.eat_production("Num:Integer", Props::none())?;
            }
        }
        Ok(None)
    }
}

/// The `Tally` language: `#` and an integer from `Number`, imported as `Num`.
pub fn tally() -> CstResult<Arc<Language>> {
    let covers = CoverTable::builder()
        .nodes(["Tally", "Amount"])
        .cover("Amount", ["Num:Integer"])
        .build();
    Language::builder("Tally", TallyGrammar)
        .dependency_as("Num", cstml::languages::number()?)
        .covers(covers)
        .build()
}

pub fn parse_list(production: &str, text: &str) -> CstResult<Arc<Node>> {
    cstml::parse(&list()?, production, text)
}

pub fn parse_list_template(production: &str, template: Template) -> CstResult<Arc<Node>> {
    cstml::parse_template(&list()?, production, template)
}

/// Node types of the elements of `name`, `"<//>"` for gaps.
pub fn element_types(node: &Node, name: &str) -> Vec<String> {
    node.elements(name)
        .into_iter()
        .map(|element| element.map_or_else(|| "<//>".to_string(), |n| n.node_type.clone()))
        .collect()
}
