//! Integer and infinity literals.

use std::sync::Arc;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::errors::{CstError, CstResult};
use crate::grammar::{CoverTable, Grammar, Language, ProductionResult};
use crate::parser::{sticky, Props, TemplateParser};

use super::{KEYWORD, PUNCTUATOR};

pub const NAME: &str = "Number";

crate::productions! {
    pub enum NumberProduction { Number, Integer, Infinity, Digits, Digit }
}

static DIGIT: Lazy<Regex> = Lazy::new(|| sticky(r"\d").expect("static regex"));
static INFINITY: Lazy<Regex> = Lazy::new(|| sticky(r"-?Infinity").expect("static regex"));

#[derive(Debug, Clone, Copy, Default)]
pub struct NumberGrammar;

impl Grammar for NumberGrammar {
    type Production = NumberProduction;

    fn eval(
        &self,
        production: NumberProduction,
        p: &mut TemplateParser,
        props: &Props,
    ) -> ProductionResult {
        match production {
            NumberProduction::Number => {
                if p.match_pattern(&INFINITY).is_some() {
                    p.eat_production("Infinity", Props::none())?;
                } else {
                    p.eat_production("Integer", Props::none())?;
                }
            }
            NumberProduction::Integer => {
                p.eat_match("-", PUNCTUATOR, Props::path("negative"))?;
                p.eat_production("Digits", Props::path("digits[]"))?;
            }
            NumberProduction::Infinity => {
                p.eat_match("-", PUNCTUATOR, Props::path("negative"))?;
                p.eat("Infinity", KEYWORD, Props::path("value"))?;
            }
            NumberProduction::Digits => {
                if p.match_pattern(&DIGIT).is_none() && !p.at_expression() {
                    return Err(CstError::syntax("expected a digit"));
                }
                while p.match_pattern(&DIGIT).is_some() || p.at_expression() {
                    p.eat_production("Digit", props.clone())?;
                }
            }
            NumberProduction::Digit => {
                p.eat_literal(&DIGIT)?;
            }
        }
        Ok(None)
    }
}

fn build() -> CstResult<Arc<Language>> {
    let covers = CoverTable::builder()
        .nodes([NAME, "Digit"])
        .cover(NAME, ["Integer", "Infinity"])
        .build();
    Language::builder(NAME, NumberGrammar).covers(covers).build()
}

static NUMBER: Lazy<CstResult<Arc<Language>>> = Lazy::new(build);

/// The `Number` language. `Number` is a cover over `Integer` and `Infinity`.
pub fn number() -> CstResult<Arc<Language>> {
    NUMBER.clone()
}
