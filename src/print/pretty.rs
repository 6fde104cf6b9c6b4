//! Tag stream to text.

use crate::config::EngineConfig;
use crate::errors::{CstResult, ErrorKind};
use crate::node::Node;
use crate::tags::{OpenNodeTag, Tag};

use super::stream::{stream_with, TagStream};
use super::{print_intrinsic, print_open, print_tag};

/// Renders `root` in the indented CSTML form with the default config.
pub fn print_pretty(root: &Node) -> CstResult<String> {
    print_pretty_with(root, &EngineConfig::default())
}

/// Renders one tag per line, indented one level per open node or fragment.
///
/// A reference prefixes the line of the tag it points at (`open: <...>`).
/// Node types are qualified only where the language changes.
pub fn print_pretty_with(root: &Node, config: &EngineConfig) -> CstResult<String> {
    let mut printer = Pretty {
        indent: &config.indent,
        depth: 0,
        languages: vec![root.language.clone()],
        prefix: None,
        lines: Vec::new(),
    };
    let mut tags = stream_with(root, config);
    while let Some(tag) = tags.next() {
        printer.tag(tag?, &mut tags)?;
    }
    Ok(printer.lines.join("\n"))
}

struct Pretty<'c> {
    indent: &'c str,
    depth: usize,
    languages: Vec<String>,
    prefix: Option<String>,
    lines: Vec<String>,
}

impl Pretty<'_> {
    fn line(&mut self, text: String) {
        let mut line = self.indent.repeat(self.depth);
        if let Some(prefix) = self.prefix.take() {
            line.push_str(&prefix);
            line.push(' ');
        }
        line.push_str(&text);
        self.lines.push(line);
    }

    fn qualified(&self, open: &OpenNodeTag) -> bool {
        self.languages.last() != Some(&open.language)
    }

    fn tag(&mut self, tag: Tag, tags: &mut TagStream<'_>) -> CstResult<()> {
        match tag {
            Tag::Reference(_) => {
                self.prefix = Some(print_tag(&tag)?);
            }
            Tag::Gap(ref gap) => {
                if let Some(reference) = &gap.reference {
                    self.prefix = Some(print_tag(&Tag::Reference(reference.clone()))?);
                }
                self.line(print_tag(&tag)?);
            }
            Tag::OpenNode(open) if open.flags.intrinsic => {
                let text = intrinsic_text(tags)?;
                let qualified = self.qualified(&open);
                self.line(print_intrinsic(&open, qualified, &text));
            }
            Tag::OpenNode(open) => {
                let qualified = self.qualified(&open);
                self.line(print_open(&open, qualified));
                self.languages.push(open.language);
                self.depth += 1;
            }
            Tag::OpenFragment(_) => {
                self.line(print_tag(&tag)?);
                self.depth += 1;
            }
            Tag::CloseNode(_) => {
                self.languages.pop();
                self.close()?;
            }
            Tag::CloseFragment(_) => self.close()?,
            other => self.line(print_tag(&other)?),
        }
        Ok(())
    }

    fn close(&mut self) -> CstResult<()> {
        self.depth = self.depth.checked_sub(1).ok_or_else(|| ErrorKind::UnexpectedTag {
            tag: "CloseNode".to_string(),
        })?;
        self.line("</>".to_string());
        Ok(())
    }
}

/// Reads the literal content of an intrinsic node through its close tag.
fn intrinsic_text(tags: &mut TagStream<'_>) -> CstResult<String> {
    let mut text = String::new();
    for tag in tags {
        match tag? {
            Tag::Literal(literal) => text.push_str(&literal.text),
            Tag::CloseNode(_) => return Ok(text),
            other => {
                return Err(ErrorKind::UnexpectedTag {
                    tag: other.kind_name().to_string(),
                }
                .into())
            }
        }
    }
    Err(ErrorKind::UnexpectedTag {
        tag: "end of stream".to_string(),
    }
    .into())
}

/// Re-linearizes `root` to the exact source text it was parsed from.
pub fn print_source(root: &Node) -> CstResult<String> {
    let mut out = String::new();
    for tag in stream_with(root, &EngineConfig::default()) {
        match tag? {
            Tag::Literal(literal) => out.push_str(&literal.text),
            Tag::Escape(escape) => out.push_str(&escape.raw),
            Tag::Trivia(trivia) => out.push_str(&trivia.text),
            Tag::Gap(_) => return Err(ErrorKind::GapInSource.into()),
            _ => {}
        }
    }
    Ok(out)
}
