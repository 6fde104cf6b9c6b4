//! Engine configuration.

use serde::{Deserialize, Serialize};

use crate::errors::{CstError, CstResult, ErrorKind};

/// Settings shared by the parser and the printer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Maximum depth of nested production calls in one parse.
    pub max_depth: usize,
    /// Indentation emitted per open node by the pretty printer.
    pub indent: String,
    /// Version written into the doctype tag.
    pub doctype_version: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_depth: 512,
            indent: "  ".to_string(),
            doctype_version: 0,
        }
    }
}

impl EngineConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn with_indent(mut self, indent: impl Into<String>) -> Self {
        self.indent = indent.into();
        self
    }

    pub fn with_doctype_version(mut self, version: u32) -> Self {
        self.doctype_version = version;
        self
    }

    /// Reads a configuration from JSON. Missing fields keep their defaults.
    pub fn from_json(text: &str) -> CstResult<Self> {
        let config: Self = serde_json::from_str(text).map_err(|e| {
            CstError::new(ErrorKind::Config {
                message: e.to_string(),
            })
        })?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> CstResult<()> {
        if self.max_depth == 0 {
            return Err(ErrorKind::Config {
                message: "max_depth must be at least 1".into(),
            }
            .into());
        }
        if self.indent.chars().any(|c| !c.is_whitespace()) {
            return Err(ErrorKind::Config {
                message: format!("indent must be whitespace, got {:?}", self.indent),
            }
            .into());
        }
        Ok(())
    }
}
