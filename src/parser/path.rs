//! The path stack: one frame per node under construction.
//!
//! Only node productions open a frame. Cover and fragment productions build
//! into the nearest enclosing frame.

use crate::grammar::ProductionId;
use crate::node::NodeBuilder;
use crate::resolver::{Resolver, Slot};
use crate::tags::ReferenceTag;

#[derive(Debug)]
pub struct PathFrame {
    pub production: ProductionId,
    pub builder: NodeBuilder,
    /// Slots of this node's own properties.
    pub resolver: Resolver,
    /// Where the finished node attaches in its parent, reserved before the
    /// node is parsed.
    pub attachment: Option<(ReferenceTag, Slot)>,
}

#[derive(Debug, Default)]
pub struct PathStack {
    frames: Vec<PathFrame>,
}

impl PathStack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn current(&self) -> Option<&PathFrame> {
        self.frames.last()
    }

    pub fn current_mut(&mut self) -> Option<&mut PathFrame> {
        self.frames.last_mut()
    }

    pub fn push(&mut self, frame: PathFrame) -> usize {
        self.frames.push(frame);
        self.frames.len() - 1
    }

    pub fn pop(&mut self) -> Option<PathFrame> {
        self.frames.pop()
    }
}
