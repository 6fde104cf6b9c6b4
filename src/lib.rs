pub use crate::config::EngineConfig;
pub use crate::errors::{CstError, CstResult, ErrorCategory, ErrorContext, ErrorKind};
pub use crate::grammar::{CoverTable, Grammar, Language, Production, ProductionResult};
pub use crate::languages::read_tree;
pub use crate::node::{Node, Property};
pub use crate::parser::{
    parse, parse_template, parse_with_config, Interpolation, Pattern, Props, Template,
    TemplateParser,
};
pub use crate::print::{print_pretty, print_pretty_with, print_source, stream};
pub use crate::tags::{AttrValue, Attributes, NodeFlags, Tag};

pub mod builders;
pub mod config;
pub mod errors;
pub mod grammar;
pub mod languages;
pub mod node;
pub mod parser;
pub mod print;
pub mod resolver;
pub mod tags;
