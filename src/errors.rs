//! Error handling for the engine.
//!
//! Every failure is fatal to the parse that raised it; there is no recovery.
//! An error is a typed [`ErrorKind`] plus, when it was raised while a cursor
//! existed, an [`ErrorContext`] locating the cursor inside the rendered
//! template so `miette` can point at it.

use std::fmt;
use std::sync::Arc;

use miette::{Diagnostic, LabeledSpan, NamedSource, SourceSpan};
use thiserror::Error;

/// Result alias used throughout the crate.
pub type CstResult<T> = Result<T, CstError>;

// ============================================================================
// ERROR CONTEXT
// ============================================================================

/// Where an error happened.
#[derive(Debug, Clone)]
pub struct ErrorContext {
    /// The template rendered as text, interpolations shown as `<//>`.
    pub source: Arc<NamedSource<String>>,
    /// Cursor location inside `source`.
    pub span: SourceSpan,
    /// Qualified name of the production that was running, if any.
    pub production: Option<String>,
}

impl ErrorContext {
    pub fn new(
        source: Arc<NamedSource<String>>,
        offset: usize,
        production: Option<String>,
    ) -> Self {
        Self {
            source,
            span: SourceSpan::from(offset..offset),
            production,
        }
    }
}

// ============================================================================
// ERROR KINDS
// ============================================================================

/// Everything that can go wrong, grouped the same way as [`ErrorCategory`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ErrorKind {
    // Grammar resolution
    #[error("cannot resolve language `{name}` from `{from}`")]
    UnresolvedLanguage { name: String, from: String },
    #[error("language `{language}` has no production `{production}`")]
    UnknownProduction { language: String, production: String },
    #[error("cyclic language dependency: {cycle}")]
    CyclicDependency { cycle: String },
    #[error("invalid cover table for `{language}`: {message}")]
    InvalidCovers { language: String, message: String },
    #[error("invalid property path `{path}`")]
    InvalidPath { path: String },

    // Structural
    #[error("expected {expected}")]
    Unmatched { expected: String },
    #[error("there must be one more literal chunk than interpolations (got {quasis} chunks for {expressions} interpolations)")]
    Imbalance { quasis: usize, expressions: usize },
    #[error("unexpected input after the root production: {remaining:?}")]
    TrailingInput { remaining: String },
    #[error("node `{node_type}` mixes token and structural children")]
    MixedChildren { node_type: String },
    #[error("property `{name}` of `{node_type}` was written twice")]
    DuplicateProperty { name: String, node_type: String },
    #[error("property `{name}` of `{node_type}` is {declared} and cannot be used as {requested}")]
    PropertyKindConflict {
        name: String,
        node_type: String,
        declared: &'static str,
        requested: &'static str,
    },
    #[error("there is no held value to claim")]
    NothingHeld,
    #[error("the held value must be claimed before {action}")]
    UnclaimedHeld { action: String },
    #[error("the last child of `{node_type}` is not a reference or gap and cannot be shifted")]
    NothingToShift { node_type: String },
    #[error("there is no span to pop")]
    SpanUnderflow,
    #[error("span `{kind}` has no guard and cannot be closed")]
    UnguardedSpanClose { kind: String },
    #[error("cannot close span `{kind}` guarded by {guard:?} with {found:?}")]
    SpanMismatch {
        kind: String,
        guard: String,
        found: String,
    },
    #[error("`{production}` does not produce a node and cannot report attributes")]
    AttributesOnCover { production: String },
    #[error("`{cover}` does not cover `{production}`")]
    NotCovered { cover: String, production: String },
    #[error("an interpolated `{found}` cannot stand for `{expected}`")]
    InterpolationMismatch { expected: String, found: String },
    #[error("root production `{production}` is not a node production")]
    RootNotNode { production: String },
    #[error("a gap cannot stand for the root production `{production}`")]
    RootGap { production: String },
    #[error("root production `{production}` produced more than one node")]
    MultipleRoots { production: String },
    #[error("language `{language}` does not cook escapes")]
    NoEscapeCooker { language: String },
    #[error("cannot cook escape {raw:?}: {message}")]
    EscapeCooking { raw: String, message: String },
    #[error("cannot chuck {chars:?}: {reason}")]
    Chuck { chars: String, reason: &'static str },
    #[error("production nesting exceeded the limit of {limit}")]
    RecursionLimit { limit: usize },
    #[error("{message}")]
    Syntax { message: String },

    // Flag consistency
    #[error("inconsistent flags on `{node_type}`: {reason}")]
    FlagConflict {
        node_type: String,
        reason: &'static str,
    },

    // Printer defects
    #[error("reference `{name}` does not resolve to a populated property")]
    UnpopulatedReference { name: String },
    #[error("unexpected {tag} tag")]
    UnexpectedTag { tag: String },
    #[error("a gap has no source text")]
    GapInSource,

    #[error("invalid configuration: {message}")]
    Config { message: String },
}

/// Coarse classification, used by callers that only care about the family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Unresolvable names, bad cover tables, dependency cycles.
    Grammar,
    /// Input or handler behaviour that violates a parse invariant.
    Structural,
    /// Mutually exclusive node flags.
    Flags,
    /// A tree that violates its construction invariants, found while printing.
    Printer,
}

impl ErrorCategory {
    pub const fn as_str(&self) -> &'static str {
        match self {
            ErrorCategory::Grammar => "grammar",
            ErrorCategory::Structural => "structural",
            ErrorCategory::Flags => "flags",
            ErrorCategory::Printer => "printer",
        }
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl ErrorKind {
    pub const fn category(&self) -> ErrorCategory {
        match self {
            Self::UnresolvedLanguage { .. }
            | Self::UnknownProduction { .. }
            | Self::CyclicDependency { .. }
            | Self::InvalidCovers { .. }
            | Self::InvalidPath { .. }
            | Self::Config { .. } => ErrorCategory::Grammar,

            Self::FlagConflict { .. } => ErrorCategory::Flags,

            Self::UnpopulatedReference { .. } | Self::UnexpectedTag { .. } | Self::GapInSource => {
                ErrorCategory::Printer
            }

            _ => ErrorCategory::Structural,
        }
    }

    pub const fn code_suffix(&self) -> &'static str {
        match self {
            Self::UnresolvedLanguage { .. } => "unresolved_language",
            Self::UnknownProduction { .. } => "unknown_production",
            Self::CyclicDependency { .. } => "cyclic_dependency",
            Self::InvalidCovers { .. } => "invalid_covers",
            Self::InvalidPath { .. } => "invalid_path",
            Self::Unmatched { .. } => "unmatched",
            Self::Imbalance { .. } => "imbalance",
            Self::TrailingInput { .. } => "trailing_input",
            Self::MixedChildren { .. } => "mixed_children",
            Self::DuplicateProperty { .. } => "duplicate_property",
            Self::PropertyKindConflict { .. } => "property_kind_conflict",
            Self::NothingHeld => "nothing_held",
            Self::UnclaimedHeld { .. } => "unclaimed_held",
            Self::NothingToShift { .. } => "nothing_to_shift",
            Self::SpanUnderflow => "span_underflow",
            Self::UnguardedSpanClose { .. } => "unguarded_span_close",
            Self::SpanMismatch { .. } => "span_mismatch",
            Self::AttributesOnCover { .. } => "attributes_on_cover",
            Self::NotCovered { .. } => "not_covered",
            Self::InterpolationMismatch { .. } => "interpolation_mismatch",
            Self::RootNotNode { .. } => "root_not_node",
            Self::RootGap { .. } => "root_gap",
            Self::MultipleRoots { .. } => "multiple_roots",
            Self::NoEscapeCooker { .. } => "no_escape_cooker",
            Self::EscapeCooking { .. } => "escape_cooking",
            Self::Chuck { .. } => "chuck",
            Self::RecursionLimit { .. } => "recursion_limit",
            Self::Syntax { .. } => "syntax",
            Self::FlagConflict { .. } => "flag_conflict",
            Self::UnpopulatedReference { .. } => "unpopulated_reference",
            Self::UnexpectedTag { .. } => "unexpected_tag",
            Self::GapInSource => "gap_in_source",
            Self::Config { .. } => "config",
        }
    }

    fn label(&self) -> &'static str {
        match self {
            Self::Unmatched { .. } => "no match here",
            Self::TrailingInput { .. } => "input continues here",
            Self::Imbalance { .. } => "ran out of literal chunks here",
            Self::SpanMismatch { .. } | Self::UnguardedSpanClose { .. } => "span closed here",
            _ => "while parsing here",
        }
    }

    fn help(&self) -> Option<&'static str> {
        match self {
            Self::Imbalance { .. } => {
                Some("every interpolation must sit between two literal chunks")
            }
            Self::AttributesOnCover { .. } => {
                Some("only productions listed as nodes in the cover table may return attributes")
            }
            Self::UnclaimedHeld { .. } => {
                Some("a production invoked through shift_production must call eat_held_production first")
            }
            Self::UnpopulatedReference { .. } | Self::UnexpectedTag { .. } => {
                Some("the tree violates its construction invariants; this is an engine defect")
            }
            _ => None,
        }
    }
}

// ============================================================================
// PUBLIC ERROR TYPE
// ============================================================================

/// The single error type produced by the engine.
#[derive(Debug, Clone)]
pub struct CstError {
    pub kind: ErrorKind,
    pub context: Option<ErrorContext>,
}

impl CstError {
    pub fn new(kind: ErrorKind) -> Self {
        Self {
            kind,
            context: None,
        }
    }

    /// A grammar-specific rejection raised from a production handler.
    pub fn syntax(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Syntax {
            message: message.into(),
        })
    }

    /// Attaches a context unless one is already present.
    pub fn with_context(mut self, context: ErrorContext) -> Self {
        if self.context.is_none() {
            self.context = Some(context);
        }
        self
    }

    pub fn category(&self) -> ErrorCategory {
        self.kind.category()
    }

    /// The diagnostic code, e.g. `cstml::structural::duplicate_property`.
    pub fn code(&self) -> String {
        format!(
            "cstml::{}::{}",
            self.kind.category().as_str(),
            self.kind.code_suffix()
        )
    }

    /// The production that was running when the error was raised.
    pub fn production(&self) -> Option<&str> {
        self.context.as_ref()?.production.as_deref()
    }

    /// Byte offset of the cursor inside the rendered template.
    pub fn offset(&self) -> Option<usize> {
        self.context.as_ref().map(|ctx| ctx.span.offset())
    }
}

impl From<ErrorKind> for CstError {
    fn from(kind: ErrorKind) -> Self {
        Self::new(kind)
    }
}

impl fmt::Display for CstError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.production() {
            Some(production) => write!(f, "{}: {}", production, self.kind),
            None => write!(f, "{}", self.kind),
        }
    }
}

impl std::error::Error for CstError {}

impl Diagnostic for CstError {
    fn code<'a>(&'a self) -> Option<Box<dyn fmt::Display + 'a>> {
        Some(Box::new(self.code()))
    }

    fn help<'a>(&'a self) -> Option<Box<dyn fmt::Display + 'a>> {
        self.kind
            .help()
            .map(|h| Box::new(h) as Box<dyn fmt::Display>)
    }

    fn source_code(&self) -> Option<&dyn miette::SourceCode> {
        self.context
            .as_ref()
            .map(|ctx| &*ctx.source as &dyn miette::SourceCode)
    }

    fn labels(&self) -> Option<Box<dyn Iterator<Item = LabeledSpan> + '_>> {
        let ctx = self.context.as_ref()?;
        let label = LabeledSpan::new_with_span(Some(self.kind.label().to_string()), ctx.span);
        Some(Box::new(std::iter::once(label)))
    }
}
