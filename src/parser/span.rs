//! Span/balance tracking.
//!
//! The parser keeps a stack of lexical regions. The top span's guard caps how
//! far an ordinary pattern may match: while the guard sits at the cursor, the
//! guarded view of the input is empty, so a construct nested inside the span
//! cannot swallow the text that closes it.

use serde::{Deserialize, Serialize};

use crate::errors::{CstResult, ErrorKind};

/// The kind of the span every parse starts in.
pub const BARE: &str = "Bare";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Span {
    pub kind: String,
    /// The terminator of the region, when it is balanced.
    pub guard: Option<String>,
}

impl Span {
    pub fn new(kind: impl Into<String>, guard: Option<String>) -> Self {
        Self {
            kind: kind.into(),
            guard,
        }
    }

    pub fn bare() -> Self {
        Self::new(BARE, None)
    }

    /// Whether the guard occurs at the start of `input`.
    pub fn guards(&self, input: &str) -> bool {
        self.guard
            .as_deref()
            .is_some_and(|guard| input.starts_with(guard))
    }
}

/// A stack of spans that is never empty.
#[derive(Debug, Clone)]
pub struct SpanStack {
    spans: Vec<Span>,
}

impl Default for SpanStack {
    fn default() -> Self {
        Self::new()
    }
}

impl SpanStack {
    pub fn new() -> Self {
        Self {
            spans: vec![Span::bare()],
        }
    }

    pub fn current(&self) -> &Span {
        // The base span is never popped.
        &self.spans[self.spans.len() - 1]
    }

    pub fn depth(&self) -> usize {
        self.spans.len()
    }

    pub fn push(&mut self, span: Span) {
        log::trace!("push span {} guard={:?}", span.kind, span.guard);
        self.spans.push(span);
    }

    pub fn pop(&mut self) -> CstResult<Span> {
        if self.spans.len() <= 1 {
            return Err(ErrorKind::SpanUnderflow.into());
        }
        let span = self.spans.pop().ok_or(ErrorKind::SpanUnderflow)?;
        log::trace!("pop span {}", span.kind);
        Ok(span)
    }

    /// Swaps the top span. The base span can be replaced but not removed.
    pub fn replace(&mut self, span: Span) {
        let last = self.spans.len() - 1;
        self.spans[last] = span;
    }

    /// Validates and pops the top span for a match that closes it.
    ///
    /// `kind`, when given, must equal the top span's kind. `text` is the
    /// matched closing text and must end with the span's guard.
    pub fn close(&mut self, kind: Option<&str>, text: &str) -> CstResult<Span> {
        let current = self.current();
        let guard = current
            .guard
            .clone()
            .ok_or_else(|| ErrorKind::UnguardedSpanClose {
                kind: current.kind.clone(),
            })?;
        if let Some(kind) = kind {
            if kind != current.kind {
                return Err(ErrorKind::SpanMismatch {
                    kind: current.kind.clone(),
                    guard,
                    found: kind.to_string(),
                }
                .into());
            }
        }
        if !text.ends_with(guard.as_str()) {
            return Err(ErrorKind::SpanMismatch {
                kind: current.kind.clone(),
                guard,
                found: text.to_string(),
            }
            .into());
        }
        self.pop()
    }
}
