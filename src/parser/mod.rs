//! The template parser.
//!
//! A [`TemplateParser`] drives a cursor through the literal chunks of a
//! [`Template`], dispatching to production handlers and splicing interpolated
//! values. Productions are strictly nested: each call pushes a match frame
//! (and, for node productions, a path frame) and pops it on return.
//!
//! Every failure is fatal. A parser that returned an error must be dropped.

pub mod matching;
pub mod path;
pub mod props;
pub mod span;
pub mod template;

use std::sync::Arc;

use miette::NamedSource;

use crate::config::EngineConfig;
use crate::errors::{CstError, CstResult, ErrorContext, ErrorKind};
use crate::grammar::{Language, ProductionId, ProductionKind};
use crate::node::{Node, NodeBuilder};
use crate::resolver::{Resolver, Slot};
use crate::tags::{EmbeddedTag, NodeFlags, ReferenceTag, Tag};

use matching::{MatchFrame, MatchStack, ScopeId};
use path::{PathFrame, PathStack};

pub use props::{sticky, Pattern, Props};
pub use span::{Span, SpanStack};
pub use template::{Interpolation, Template, GAP_PLACEHOLDER};

/// A detached child waiting to be claimed by the production it was shifted
/// into.
#[derive(Debug, Clone)]
struct HeldChild {
    /// `None` when the detached child was a gap.
    value: Option<Arc<Node>>,
    scope: ScopeId,
}

/// The parse engine handed to every production handler.
///
/// Owns the template cursor and the match, path and span stacks of one parse.
#[derive(Debug)]
pub struct TemplateParser {
    root: Arc<Language>,
    quasis: Vec<String>,
    expressions: Vec<Interpolation>,
    quasi_idx: usize,
    expression_idx: usize,
    idx: usize,
    spans: SpanStack,
    matches: MatchStack,
    paths: PathStack,
    held: Option<HeldChild>,
    config: EngineConfig,
    source: Arc<NamedSource<String>>,
}

// ============================================================================
// PUBLIC API: ENTRY POINTS
// ============================================================================

/// Parses plain text with `production` of `language` as the root.
pub fn parse(language: &Arc<Language>, production: &str, text: &str) -> CstResult<Arc<Node>> {
    parse_template(language, production, Template::text(text))
}

/// Parses a template; interpolations fill the productions they stand at.
pub fn parse_template(
    language: &Arc<Language>,
    production: &str,
    template: Template,
) -> CstResult<Arc<Node>> {
    parse_with_config(language, production, template, EngineConfig::default())
}

/// [`parse_template`] with explicit engine settings.
pub fn parse_with_config(
    language: &Arc<Language>,
    production: &str,
    template: Template,
    config: EngineConfig,
) -> CstResult<Arc<Node>> {
    TemplateParser::new(Arc::clone(language), template)
        .with_config(config)
        .parse(production)
}

impl TemplateParser {
    /// A parser over `template` rooted at `language`, with default settings.
    pub fn new(language: Arc<Language>, template: Template) -> Self {
        let source = Arc::new(NamedSource::new(language.name(), template.render()));
        let (quasis, expressions) = template.into_parts();
        Self {
            root: language,
            quasis,
            expressions,
            quasi_idx: 0,
            expression_idx: 0,
            idx: 0,
            spans: SpanStack::new(),
            matches: MatchStack::new(),
            paths: PathStack::new(),
            held: None,
            config: EngineConfig::default(),
            source,
        }
    }

    /// Replaces the default [`EngineConfig`].
    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    /// Parses the whole template with `production` as the root.
    ///
    /// The root must produce a node. When the template starts at an
    /// interpolation the supplied value is returned as the root.
    pub fn parse(mut self, production: &str) -> CstResult<Arc<Node>> {
        log::debug!(
            "parsing {} with {} ({} chunks)",
            production,
            self.root.name(),
            self.quasis.len()
        );
        let root = Arc::clone(&self.root);
        let (language, id) = self.check(root.resolve_production(production))?;

        if language.kind(&id.production) == ProductionKind::Fragment {
            return Err(self.fail(ErrorKind::RootNotNode {
                production: id.to_string(),
            }));
        }

        let node = if self.at_expression() && language.covers().is_interpolable(&id.production) {
            match self.consume_interpolation()? {
                Interpolation::Gap => {
                    return Err(self.fail(ErrorKind::RootGap {
                        production: id.to_string(),
                    }))
                }
                Interpolation::Value(node) => {
                    self.check_accepts(&language, &id, &node)?;
                    node
                }
            }
        } else {
            let node = self.eval(production, Props::none())?;
            node.ok_or_else(|| {
                self.fail(ErrorKind::RootNotNode {
                    production: id.to_string(),
                })
            })?
        };

        if !self.fully_consumed() {
            return Err(self.fail(ErrorKind::TrailingInput {
                remaining: self.rest(),
            }));
        }
        log::debug!("parsed {} into {}", id, node.node_type);
        Ok(node)
    }
}

// ============================================================================
// PUBLIC API: CURSOR
// ============================================================================

impl TemplateParser {
    fn quasi(&self) -> &str {
        self.quasis.get(self.quasi_idx).map_or("", String::as_str)
    }

    /// The rest of the current literal chunk.
    fn sliced(&self) -> &str {
        self.quasi().get(self.idx..).unwrap_or("")
    }

    /// The rest of the current chunk as seen by an ordinary match: empty while
    /// the current span's guard is at the cursor.
    fn guarded(&self) -> &str {
        let sliced = self.sliced();
        if self.spans.current().guards(sliced) {
            ""
        } else {
            sliced
        }
    }

    /// The current chunk is exhausted and an interpolation follows.
    pub fn at_expression(&self) -> bool {
        self.sliced().is_empty() && self.expression_idx < self.expressions.len()
    }

    /// Nothing an ordinary match could consume remains before the guard or
    /// the next interpolation.
    pub fn done(&self) -> bool {
        self.guarded().is_empty() && !self.at_expression()
    }

    /// All literal text has been consumed.
    pub fn quasis_done(&self) -> bool {
        self.quasi_idx + 1 >= self.quasis.len() && self.sliced().is_empty()
    }

    /// The character at the cursor.
    pub fn chr(&self) -> Option<char> {
        self.sliced().chars().next()
    }

    pub fn span(&self) -> &Span {
        self.spans.current()
    }

    /// The language governing the running production.
    pub fn language(&self) -> &Arc<Language> {
        self.matches.current().map_or(&self.root, |frame| &frame.language)
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Peeks at the guarded input; nothing is consumed.
    pub fn match_pattern<'p>(&self, pattern: impl Into<Pattern<'p>>) -> Option<String> {
        self.match_with(pattern, &Props::none())
    }

    /// Peeks with `props` deciding the view: balancers see past the guard.
    pub fn match_with<'p>(&self, pattern: impl Into<Pattern<'p>>, props: &Props) -> Option<String> {
        let input = if props.is_balancer() {
            self.sliced()
        } else {
            self.guarded()
        };
        pattern.into().match_at(input).map(str::to_string)
    }

    pub fn push_span(&mut self, span: Span) {
        self.spans.push(span);
    }

    pub fn pop_span(&mut self) -> CstResult<Span> {
        let result = self.spans.pop();
        self.check(result)
    }

    pub fn replace_span(&mut self, span: Span) {
        self.spans.replace(span);
    }

    fn fully_consumed(&self) -> bool {
        self.expression_idx >= self.expressions.len() && self.sliced().is_empty()
    }

    fn rest(&self) -> String {
        let mut rest = self.sliced().to_string();
        for quasi in self.quasis.iter().skip(self.quasi_idx + 1) {
            rest.push_str(GAP_PLACEHOLDER);
            rest.push_str(quasi);
        }
        rest
    }

    fn consume_interpolation(&mut self) -> CstResult<Interpolation> {
        let value = match self.expressions.get(self.expression_idx) {
            Some(value) if self.quasi_idx + 1 < self.quasis.len() => value.clone(),
            _ => {
                return Err(self.fail(ErrorKind::Imbalance {
                    quasis: self.quasis.len(),
                    expressions: self.expressions.len(),
                }))
            }
        };
        self.expression_idx += 1;
        self.quasi_idx += 1;
        self.idx = 0;
        Ok(value)
    }
}

// ============================================================================
// PUBLIC API: TOKENS
// ============================================================================

impl TemplateParser {
    /// Consumes a token and attaches it as a token node of type `node_type`.
    pub fn eat<'p>(
        &mut self,
        pattern: impl Into<Pattern<'p>>,
        node_type: &str,
        props: Props,
    ) -> CstResult<String> {
        let pattern = pattern.into();
        let found = self.eat_token(pattern, node_type, &props)?;
        self.require(found, pattern)
    }

    pub fn eat_match<'p>(
        &mut self,
        pattern: impl Into<Pattern<'p>>,
        node_type: &str,
        props: Props,
    ) -> CstResult<Option<String>> {
        self.eat_token(pattern.into(), node_type, &props)
    }

    pub fn eat_literal<'p>(&mut self, pattern: impl Into<Pattern<'p>>) -> CstResult<String> {
        let pattern = pattern.into();
        let found = self.eat_match_literal(pattern)?;
        self.require(found, pattern)
    }

    /// Consumes text into the current node as a literal tag.
    pub fn eat_match_literal<'p>(
        &mut self,
        pattern: impl Into<Pattern<'p>>,
    ) -> CstResult<Option<String>> {
        let Some(text) = self.match_pattern(pattern) else {
            return Ok(None);
        };
        self.push_tag(Tag::literal(text.as_str()), "eating a literal")?;
        self.idx += text.len();
        Ok(Some(text))
    }

    pub fn eat_trivia<'p>(&mut self, pattern: impl Into<Pattern<'p>>) -> CstResult<String> {
        let pattern = pattern.into();
        let found = self.eat_match_trivia(pattern)?;
        self.require(found, pattern)
    }

    pub fn eat_match_trivia<'p>(
        &mut self,
        pattern: impl Into<Pattern<'p>>,
    ) -> CstResult<Option<String>> {
        let Some(text) = self.match_pattern(pattern) else {
            return Ok(None);
        };
        self.push_tag(Tag::trivia(text.as_str()), "eating trivia")?;
        self.idx += text.len();
        Ok(Some(text))
    }

    pub fn eat_escape<'p>(&mut self, pattern: impl Into<Pattern<'p>>) -> CstResult<String> {
        let pattern = pattern.into();
        let found = self.eat_match_escape(pattern)?;
        self.require(found, pattern)
    }

    /// Consumes an escape sequence, cooked by the governing language.
    pub fn eat_match_escape<'p>(
        &mut self,
        pattern: impl Into<Pattern<'p>>,
    ) -> CstResult<Option<String>> {
        let Some(raw) = self.match_pattern(pattern) else {
            return Ok(None);
        };
        let language = Arc::clone(self.language());
        let cooked = language.cook_escape(&raw, self.spans.current());
        let cooked = self.check(cooked)?;
        self.push_tag(Tag::escape(raw.as_str(), cooked), "eating an escape")?;
        self.idx += raw.len();
        Ok(Some(raw))
    }

    /// Gives back trailing characters of the last literal or trivia tag of
    /// the current node.
    pub fn chuck(&mut self, chars: &str) -> CstResult<()> {
        self.ensure_unheld("chucking text")?;
        let idx = self.idx;
        let result = self.node_frame().and_then(|frame| {
            let chuck = |reason| -> CstError {
                ErrorKind::Chuck {
                    chars: chars.to_string(),
                    reason,
                }
                .into()
            };
            let text = match frame.builder.last_mut() {
                Some(Tag::Literal(literal)) => &mut literal.text,
                Some(Tag::Trivia(trivia)) => &mut trivia.text,
                _ => return Err(chuck("the last child is not literal text or trivia")),
            };
            if chars.is_empty() || chars.len() > idx {
                return Err(chuck("the text was not consumed from the current chunk"));
            }
            if !text.ends_with(chars) {
                return Err(chuck("the last child does not end with these characters"));
            }
            text.truncate(text.len() - chars.len());
            if text.is_empty() {
                frame.builder.pop();
            }
            Ok(())
        });
        self.check(result)?;
        self.idx -= chars.len();
        Ok(())
    }

    fn eat_token(
        &mut self,
        pattern: Pattern<'_>,
        node_type: &str,
        props: &Props,
    ) -> CstResult<Option<String>> {
        let Some(text) = self.match_with(pattern, props) else {
            return Ok(None);
        };
        let reference = self.reference(props)?;
        self.ensure_unheld("eating a token")?;
        self.update_spans(props, &text)?;
        self.idx += text.len();

        let flags = if pattern.is_str() {
            NodeFlags::INTRINSIC
        } else {
            NodeFlags::TOKEN
        };
        let mut builder = NodeBuilder::new(self.language().canonical_id(), node_type, flags);
        builder.push(Tag::literal(text.as_str()));
        let node = Arc::new(self.check(builder.finish())?);
        log::trace!("token {} {:?}", node_type, text);

        self.attach_child(reference.as_ref(), node)?;
        Ok(Some(text))
    }

    /// Closes and opens spans as `props` ask, after `text` matched.
    fn update_spans(&mut self, props: &Props, text: &str) -> CstResult<()> {
        if props.is_balancer() {
            let result = self.spans.close(props.end_span.as_deref(), text);
            self.check(result)?;
        }
        if props.opens_span() {
            let kind = props
                .start_span
                .clone()
                .unwrap_or_else(|| self.spans.current().kind.clone());
            self.spans.push(Span::new(kind, props.balanced.clone()));
        }
        Ok(())
    }

    fn require(&self, found: Option<String>, pattern: Pattern<'_>) -> CstResult<String> {
        found.ok_or_else(|| {
            self.fail(ErrorKind::Unmatched {
                expected: pattern.describe(),
            })
        })
    }
}

// ============================================================================
// PUBLIC API: PRODUCTIONS
// ============================================================================

impl TemplateParser {
    /// Runs the production `name` (optionally `Language:Production`).
    ///
    /// Returns the node it produced: the built or interpolated node of a node
    /// production, or the last node produced through a cover. Gaps and
    /// fragments return `None`.
    pub fn eat_production(&mut self, name: &str, props: Props) -> CstResult<Option<Arc<Node>>> {
        self.eval(name, props)
    }

    /// Detaches the last child of the current node and runs `name`, which
    /// must claim it with [`eat_held_production`](Self::eat_held_production).
    pub fn shift_production(&mut self, name: &str, props: Props) -> CstResult<Option<Arc<Node>>> {
        self.ensure_unheld("shifting a production")?;
        let scope = self.matches.current().map_or(0, |frame| frame.scope);
        let result = self.node_frame().and_then(|frame| {
            let (reference, value) = frame.builder.detach_last()?;
            frame.resolver.release(&reference);
            Ok(value)
        });
        let value = self.check(result)?;
        log::trace!("holding {:?} for {}", value.as_ref().map(|n| &n.node_type), name);
        self.held = Some(HeldChild { value, scope });

        let produced = self.eval(name, props)?;
        if self.held.take().is_some() {
            return Err(self.fail(ErrorKind::UnclaimedHeld {
                action: format!("`{name}` returns"),
            }));
        }
        Ok(produced)
    }

    /// Attaches the held child to the current node. `production` names what
    /// the held node must be (or be covered by).
    pub fn eat_held_production(
        &mut self,
        production: &str,
        props: Props,
    ) -> CstResult<Option<Arc<Node>>> {
        let scope = self.matches.current().map(|frame| frame.scope);
        let held = match self.held.take() {
            Some(held) if Some(held.scope) == scope => held,
            _ => return Err(self.fail(ErrorKind::NothingHeld)),
        };
        let reference = self.reference(&props)?;

        match &held.value {
            Some(node) => {
                let language = Arc::clone(self.language());
                let (language, id) = self.check(language.resolve_production(production))?;
                self.check_accepts(&language, &id, node)?;
                self.attach_child(reference.as_ref(), Arc::clone(node))?;
            }
            None => self.attach_gap(reference.as_ref())?,
        }
        Ok(held.value)
    }

    /// Declares an array-valued property on the current node, even if it
    /// never receives an element.
    pub fn declare_array(&mut self, path: &str) -> CstResult<()> {
        self.ensure_unheld("declaring an array")?;
        let reference = self.check(ReferenceTag::parse(path))?;
        let result = self.node_frame().and_then(|frame| {
            frame.resolver.declare_array(&reference.name)?;
            frame.builder.declare_array(&reference.name);
            Ok(())
        });
        self.check(result)
    }

    fn eval(&mut self, name: &str, props: Props) -> CstResult<Option<Arc<Node>>> {
        if self.matches.depth() >= self.config.max_depth {
            return Err(self.fail(ErrorKind::RecursionLimit {
                limit: self.config.max_depth,
            }));
        }

        let current = Arc::clone(self.language());
        let (language, id) = self.check(current.resolve_production(name))?;
        let kind = language.kind(&id.production);
        let explicit = self.reference(&props)?;

        let mut path = explicit;
        if let Some(cover) = self.matches.current().filter(|f| f.kind == ProductionKind::Cover) {
            let cover_name = &cover.production.production;
            let excluded = kind != ProductionKind::Fragment
                && !cover.language.covers().is_open_cover(cover_name)
                && !cover.language.cover_includes(cover_name, &id);
            if excluded {
                return Err(self.fail(ErrorKind::NotCovered {
                    cover: cover.production.to_string(),
                    production: id.to_string(),
                }));
            }
            if path.is_none() {
                path = cover.path.clone();
            }
        }

        if language.covers().is_interpolable(&id.production) && self.at_expression() {
            return self.eval_interpolation(&language, &id, kind, path.as_ref());
        }

        let path_idx = if kind == ProductionKind::Node {
            let attachment = match &path {
                Some(reference) => {
                    let slot = self
                        .node_frame()
                        .and_then(|frame| frame.resolver.consume(reference));
                    Some((reference.clone(), self.check(slot)?))
                }
                None => None,
            };
            let builder =
                NodeBuilder::new(language.canonical_id(), &id.production, NodeFlags::NODE);
            Some(self.paths.push(PathFrame {
                production: id.clone(),
                builder,
                resolver: Resolver::new(&id.production),
                attachment,
            }))
        } else {
            None
        };

        let scope = self.matches.scope_for(&language);
        self.matches.push(MatchFrame {
            language: Arc::clone(&language),
            production: id.clone(),
            kind,
            path,
            scope,
            path_idx,
            produced: None,
        });

        let result = language.eval(&id.production, self, &props);
        let attributes = self.check(result)?;
        let produced = self.matches.pop().and_then(|frame| frame.produced);

        if kind != ProductionKind::Node {
            if attributes.is_some_and(|attrs| !attrs.is_empty()) {
                return Err(self.fail(ErrorKind::AttributesOnCover {
                    production: id.to_string(),
                }));
            }
            return Ok(produced);
        }

        let Some(frame) = self.paths.pop() else {
            return Err(self.fail(ErrorKind::RootNotNode {
                production: id.to_string(),
            }));
        };
        let mut builder = frame.builder;
        if let Some(attributes) = attributes {
            builder.set_attributes(attributes);
        }
        let node = Arc::new(self.check(builder.finish())?);
        self.finish_node(frame.attachment, Arc::clone(&node))?;
        Ok(Some(node))
    }

    /// Consumes one interpolation in place of running `id`.
    fn eval_interpolation(
        &mut self,
        language: &Arc<Language>,
        id: &ProductionId,
        kind: ProductionKind,
        path: Option<&ReferenceTag>,
    ) -> CstResult<Option<Arc<Node>>> {
        let interpolation = self.consume_interpolation()?;
        self.ensure_unheld("splicing an interpolation")?;

        match interpolation {
            Interpolation::Gap => {
                log::trace!("gap for {}", id);
                self.attach_gap(path)?;
                Ok(None)
            }
            Interpolation::Value(node) if kind == ProductionKind::Fragment => {
                self.check_splice(language, id, &node)?;
                log::trace!("splicing {} into {}", node.node_type, id);
                self.splice(&node)?;
                Ok(None)
            }
            Interpolation::Value(node) => {
                self.check_accepts(language, id, &node)?;
                log::trace!("interpolating {} for {}", node.node_type, id);
                let flags = NodeFlags {
                    expression: true,
                    ..node.flags
                };
                let node = Arc::new(node.with_flags(flags));
                self.matches.record_produced(&node);
                self.attach_child(path, Arc::clone(&node))?;
                Ok(Some(node))
            }
        }
    }

    /// Copies the content of `source` into the current node.
    fn splice(&mut self, source: &Node) -> CstResult<()> {
        let mut resolver = Resolver::new(&source.node_type);
        for tag in source.content() {
            match tag {
                Tag::Reference(reference) => {
                    let slot = self.check(resolver.consume(reference))?;
                    match source.resolve(&slot) {
                        Some(Some(child)) => self.attach_child(Some(reference), Arc::clone(child))?,
                        Some(None) => self.attach_gap(Some(reference))?,
                        None => {
                            return Err(self.fail(ErrorKind::UnpopulatedReference {
                                name: slot.to_string(),
                            }))
                        }
                    }
                }
                Tag::Gap(gap) => {
                    if let Some(reference) = &gap.reference {
                        self.check(resolver.consume(reference))?;
                    }
                    self.attach_gap(gap.reference.as_ref())?;
                }
                Tag::Array(array) => self.declare_array(&array.name)?,
                other => self.push_tag(other.clone(), "splicing an interpolation")?,
            }
        }
        Ok(())
    }

    fn finish_node(
        &mut self,
        attachment: Option<(ReferenceTag, Slot)>,
        node: Arc<Node>,
    ) -> CstResult<()> {
        if self.paths.is_empty() {
            if self.matches.root_produced().is_some() {
                let production = self
                    .matches
                    .current()
                    .map(|frame| frame.production.to_string())
                    .unwrap_or_default();
                return Err(self.fail(ErrorKind::MultipleRoots { production }));
            }
            self.matches.record_produced(&node);
            return Ok(());
        }
        self.matches.record_produced(&node);
        self.ensure_unheld("attaching a finished node")?;
        let result = self.node_frame().map(|frame| match attachment {
            Some((reference, slot)) => frame.builder.attach(&reference, &slot, node),
            None => frame.builder.push(Tag::Embedded(EmbeddedTag { node })),
        });
        self.check(result)
    }

    /// A fragment takes the content of a node its own language built.
    fn check_splice(&self, language: &Language, id: &ProductionId, node: &Node) -> CstResult<()> {
        if node.language == language.canonical_id() {
            return Ok(());
        }
        Err(self.fail(ErrorKind::InterpolationMismatch {
            expected: id.to_string(),
            found: format!("{}:{}", node.language, node.node_type),
        }))
    }

    fn check_accepts(&self, language: &Language, id: &ProductionId, node: &Node) -> CstResult<()> {
        if language.accepts(&id.production, &node.language, &node.node_type) {
            return Ok(());
        }
        Err(self.fail(ErrorKind::InterpolationMismatch {
            expected: id.to_string(),
            found: format!("{}:{}", node.language, node.node_type),
        }))
    }
}

// ============================================================================
// TREE MUTATION
// ============================================================================

impl TemplateParser {
    fn node_frame(&mut self) -> CstResult<&mut PathFrame> {
        let production = self
            .matches
            .current()
            .map(|frame| frame.production.to_string())
            .unwrap_or_default();
        self.paths
            .current_mut()
            .ok_or_else(|| ErrorKind::RootNotNode { production }.into())
    }

    fn reference(&self, props: &Props) -> CstResult<Option<ReferenceTag>> {
        props
            .path
            .as_deref()
            .map(ReferenceTag::parse)
            .transpose()
            .map_err(|e| self.locate(e))
    }

    fn ensure_unheld(&self, action: &str) -> CstResult<()> {
        if self.held.is_some() {
            return Err(self.fail(ErrorKind::UnclaimedHeld {
                action: action.to_string(),
            }));
        }
        Ok(())
    }

    fn push_tag(&mut self, tag: Tag, action: &str) -> CstResult<()> {
        self.ensure_unheld(action)?;
        let result = self.node_frame().map(|frame| frame.builder.push(tag));
        self.check(result)
    }

    /// Attaches a finished child under `reference`, or embeds it.
    fn attach_child(&mut self, reference: Option<&ReferenceTag>, node: Arc<Node>) -> CstResult<()> {
        self.ensure_unheld("attaching a child")?;
        let result = self.node_frame().and_then(|frame| {
            match reference {
                Some(reference) => {
                    let slot = frame.resolver.consume(reference)?;
                    frame.builder.attach(reference, &slot, node);
                }
                None => frame.builder.push(Tag::Embedded(EmbeddedTag { node })),
            }
            Ok(())
        });
        self.check(result)
    }

    fn attach_gap(&mut self, reference: Option<&ReferenceTag>) -> CstResult<()> {
        self.ensure_unheld("attaching a gap")?;
        let result = self.node_frame().and_then(|frame| {
            match reference {
                Some(reference) => {
                    let slot = frame.resolver.consume(reference)?;
                    frame.builder.attach_gap(reference, &slot);
                }
                None => frame.builder.push(Tag::gap(None)),
            }
            Ok(())
        });
        self.check(result)
    }

    // ------------------------------------------------------------------
    // Error location
    // ------------------------------------------------------------------

    /// Byte offset of the cursor in the rendered template.
    fn offset(&self) -> usize {
        let before: usize = self
            .quasis
            .iter()
            .take(self.quasi_idx)
            .map(|quasi| quasi.len() + GAP_PLACEHOLDER.len())
            .sum();
        before + self.idx
    }

    fn locate(&self, err: CstError) -> CstError {
        let production = self.matches.current().map(|frame| frame.production.to_string());
        err.with_context(ErrorContext::new(
            Arc::clone(&self.source),
            self.offset(),
            production,
        ))
    }

    fn fail(&self, kind: ErrorKind) -> CstError {
        self.locate(kind.into())
    }

    fn check<T>(&self, result: CstResult<T>) -> CstResult<T> {
        result.map_err(|e| self.locate(e))
    }
}
