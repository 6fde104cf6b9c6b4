//! The match stack: one frame per production invocation.
//!
//! A frame records which language governs parsing for the invocation. Frames
//! whose language is the same object as their parent's share the parent's
//! handler scope; crossing into another language opens a fresh scope, so
//! state held by one grammar is never visible to another.

use std::sync::Arc;

use crate::grammar::{Language, ProductionId, ProductionKind};
use crate::node::Node;
use crate::tags::ReferenceTag;

/// Identifies the handler scope a frame belongs to.
pub type ScopeId = usize;

#[derive(Debug)]
pub struct MatchFrame {
    pub language: Arc<Language>,
    pub production: ProductionId,
    pub kind: ProductionKind,
    /// The effective property path, explicit or inherited from a cover.
    pub path: Option<ReferenceTag>,
    pub scope: ScopeId,
    /// Index of the node frame this invocation builds into.
    pub path_idx: Option<usize>,
    /// The last node produced through a cover frame.
    pub produced: Option<Arc<Node>>,
}

#[derive(Debug, Default)]
pub struct MatchStack {
    frames: Vec<MatchFrame>,
    next_scope: ScopeId,
}

impl MatchStack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    pub fn current(&self) -> Option<&MatchFrame> {
        self.frames.last()
    }

    pub fn current_mut(&mut self) -> Option<&mut MatchFrame> {
        self.frames.last_mut()
    }

    /// The scope a child frame for `language` runs in.
    pub fn scope_for(&mut self, language: &Arc<Language>) -> ScopeId {
        match self.frames.last() {
            Some(parent) if Arc::ptr_eq(&parent.language, language) => parent.scope,
            _ => {
                let scope = self.next_scope;
                self.next_scope += 1;
                scope
            }
        }
    }

    pub fn push(&mut self, frame: MatchFrame) {
        log::trace!(
            "enter {} ({}) scope={} depth={}",
            frame.production,
            frame.kind.as_str(),
            frame.scope,
            self.frames.len() + 1
        );
        self.frames.push(frame);
    }

    pub fn pop(&mut self) -> Option<MatchFrame> {
        let frame = self.frames.pop()?;
        log::trace!("leave {}", frame.production);
        Some(frame)
    }

    /// The node the outermost frame has produced so far, if it is a cover.
    pub fn root_produced(&self) -> Option<&Arc<Node>> {
        self.frames.first()?.produced.as_ref()
    }

    /// Records `node` on the enclosing chain of cover frames.
    pub fn record_produced(&mut self, node: &Arc<Node>) {
        for frame in self.frames.iter_mut().rev() {
            if frame.kind != ProductionKind::Cover {
                break;
            }
            frame.produced = Some(Arc::clone(node));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::CstResult;
    use crate::grammar::{CoverTable, Grammar, ProductionResult};
    use crate::parser::{Props, TemplateParser};

    crate::productions! {
        enum Only { Only }
    }

    struct Empty;

    impl Grammar for Empty {
        type Production = Only;

        fn eval(&self, _: Only, _: &mut TemplateParser, _: &Props) -> ProductionResult {
            Ok(None)
        }
    }

    fn language(name: &str) -> CstResult<Arc<Language>> {
        Language::builder(name, Empty)
            .covers(CoverTable::builder().nodes(["Only"]).build())
            .build()
    }

    fn frame(language: &Arc<Language>, scope: ScopeId) -> MatchFrame {
        MatchFrame {
            language: Arc::clone(language),
            production: ProductionId::new(language.name(), "Only"),
            kind: ProductionKind::Node,
            path: None,
            scope,
            path_idx: None,
            produced: None,
        }
    }

    #[test]
    fn test_scopes_follow_language_identity() {
        let a = language("A").unwrap();
        let twin = language("A").unwrap();
        let mut stack = MatchStack::new();

        let root = stack.scope_for(&a);
        stack.push(frame(&a, root));
        assert_eq!(stack.scope_for(&a), root);

        // Same name, different object.
        let other = stack.scope_for(&twin);
        assert_ne!(other, root);
        stack.push(frame(&twin, other));

        let back = stack.scope_for(&a);
        assert_ne!(back, root);
        assert_ne!(back, other);
    }
}
