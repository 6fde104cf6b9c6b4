//! Tree to tag stream.
//!
//! The streamer walks a finished tree depth-first with an explicit frame
//! stack. Each frame owns a fresh [`Resolver`] for its node, so the `n`th
//! occurrence of an array reference resolves to the `n`th stored element
//! exactly as it did during construction.

use crate::config::EngineConfig;
use crate::errors::{CstError, CstResult, ErrorKind};
use crate::node::Node;
use crate::resolver::Resolver;
use crate::tags::{
    attributes, CloseFragmentTag, DoctypeTag, NullTag, OpenFragmentTag, Tag,
};

/// The doctype every stream starts with.
pub const DOCTYPE: &str = "cstml";

struct Frame<'a> {
    node: &'a Node,
    resolver: Resolver,
    idx: usize,
}

impl<'a> Frame<'a> {
    fn new(node: &'a Node) -> Self {
        Self {
            node,
            resolver: Resolver::new(node.node_type.as_str()),
            idx: 0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Doctype,
    OpenFragment,
    Body,
    Done,
}

/// Iterator over the canonical tag stream of a tree.
///
/// Yields an error and stops if the tree violates its construction
/// invariants.
pub struct TagStream<'a> {
    root: &'a Node,
    version: u32,
    phase: Phase,
    frames: Vec<Frame<'a>>,
    pending: Option<Tag>,
}

/// Streams `root` with the default doctype version.
pub fn stream(root: &Node) -> TagStream<'_> {
    stream_with(root, &EngineConfig::default())
}

pub fn stream_with<'a>(root: &'a Node, config: &EngineConfig) -> TagStream<'a> {
    TagStream {
        root,
        version: config.doctype_version,
        phase: Phase::Doctype,
        frames: Vec::new(),
        pending: None,
    }
}

/// Collects the whole stream, failing on the first defect.
pub fn collect_tags(root: &Node) -> CstResult<Vec<Tag>> {
    stream(root).collect()
}

impl<'a> TagStream<'a> {
    fn fail(&mut self, kind: ErrorKind) -> Option<CstResult<Tag>> {
        self.phase = Phase::Done;
        Some(Err(CstError::new(kind)))
    }

    fn step(&mut self) -> Option<CstResult<Tag>> {
        loop {
            let Some(frame) = self.frames.last_mut() else {
                self.phase = Phase::Done;
                return Some(Ok(Tag::CloseFragment(CloseFragmentTag)));
            };
            let node = frame.node;
            let Some(tag) = node.children.get(frame.idx) else {
                self.frames.pop();
                continue;
            };
            frame.idx += 1;

            match tag {
                Tag::Reference(reference) => {
                    let slot = match frame.resolver.consume(reference) {
                        Ok(slot) => slot,
                        Err(err) => {
                            self.phase = Phase::Done;
                            return Some(Err(err));
                        }
                    };
                    match node.resolve(&slot) {
                        Some(Some(child)) => self.frames.push(Frame::new(child)),
                        Some(None) => self.pending = Some(Tag::Null(NullTag)),
                        None => {
                            return self.fail(ErrorKind::UnpopulatedReference {
                                name: slot.to_string(),
                            })
                        }
                    }
                    return Some(Ok(tag.clone()));
                }
                Tag::Gap(gap) => {
                    if let Some(reference) = &gap.reference {
                        if let Err(err) = frame.resolver.consume(reference) {
                            self.phase = Phase::Done;
                            return Some(Err(err));
                        }
                    }
                    return Some(Ok(tag.clone()));
                }
                Tag::Embedded(embedded) => {
                    self.frames.push(Frame::new(&embedded.node));
                }
                Tag::Doctype(_) | Tag::OpenFragment(_) | Tag::CloseFragment(_) => {
                    return self.fail(ErrorKind::UnexpectedTag {
                        tag: tag.kind_name().to_string(),
                    });
                }
                other => return Some(Ok(other.clone())),
            }
        }
    }
}

impl<'a> Iterator for TagStream<'a> {
    type Item = CstResult<Tag>;

    fn next(&mut self) -> Option<Self::Item> {
        if let Some(tag) = self.pending.take() {
            return Some(Ok(tag));
        }
        match self.phase {
            Phase::Doctype => {
                self.phase = Phase::OpenFragment;
                Some(Ok(Tag::Doctype(DoctypeTag {
                    doctype: DOCTYPE.to_string(),
                    version: self.version,
                    attributes: attributes([("language", self.root.language.as_str())]),
                })))
            }
            Phase::OpenFragment => {
                self.phase = Phase::Body;
                self.frames.push(Frame::new(self.root));
                Some(Ok(Tag::OpenFragment(OpenFragmentTag)))
            }
            Phase::Body => self.step(),
            Phase::Done => None,
        }
    }
}
