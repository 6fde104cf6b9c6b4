//! Grammars and languages.
//!
//! A [`Grammar`] is a closed set of productions (an enum implementing
//! [`Production`]) plus a handler for each. A [`Language`] wraps a grammar with
//! its name, canonical id, cover table, escape cooker and dependencies. Every
//! name a language mentions is validated once by [`LanguageBuilder::build`];
//! parsing never re-validates.

pub mod covers;

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use crate::errors::{CstResult, ErrorKind};
use crate::parser::span::Span;
use crate::parser::{Props, TemplateParser};
use crate::tags::Attributes;

pub use covers::{CoverKey, CoverTable, CoverTableBuilder, ProductionKind};

/// What a production handler returns: attributes for the node it closed, if
/// it is a node production.
pub type ProductionResult = CstResult<Option<Attributes>>;

/// Converts a raw escape sequence into its cooked value.
pub type EscapeCooker = fn(&str, &Span) -> Result<String, String>;

// ============================================================================
// PRODUCTIONS
// ============================================================================

/// The closed set of productions of one grammar.
pub trait Production: Copy + fmt::Debug + Send + Sync + 'static {
    const ALL: &'static [Self];

    fn name(self) -> &'static str;

    fn from_name(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|p| p.name() == name)
    }
}

/// Declares a production enum and its [`Production`] impl.
///
/// ```
/// cstml::productions! {
///     pub enum Toy { Word, Words }
/// }
/// use cstml::grammar::Production;
/// assert_eq!(Toy::from_name("Words").map(Production::name), Some("Words"));
/// ```
#[macro_export]
macro_rules! productions {
    ($(#[$meta:meta])* $vis:vis enum $name:ident { $($variant:ident),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        $vis enum $name {
            $($variant),+
        }

        impl $crate::grammar::Production for $name {
            const ALL: &'static [Self] = &[$($name::$variant),+];

            fn name(self) -> &'static str {
                match self {
                    $($name::$variant => stringify!($variant)),+
                }
            }
        }
    };
}

/// A grammar: one handler per production.
///
/// Handlers receive the live parser and the props they were invoked with.
pub trait Grammar: Send + Sync + 'static {
    type Production: Production;

    fn eval(
        &self,
        production: Self::Production,
        p: &mut TemplateParser,
        props: &Props,
    ) -> ProductionResult;
}

/// Name-based dispatch over a [`Grammar`].
pub trait ErasedGrammar: Send + Sync {
    fn has_production(&self, name: &str) -> bool;

    fn production_names(&self) -> Vec<&'static str>;

    /// `None` when the grammar has no production called `name`.
    fn eval_named(
        &self,
        name: &str,
        p: &mut TemplateParser,
        props: &Props,
    ) -> Option<ProductionResult>;
}

impl<G: Grammar> ErasedGrammar for G {
    fn has_production(&self, name: &str) -> bool {
        G::Production::from_name(name).is_some()
    }

    fn production_names(&self) -> Vec<&'static str> {
        G::Production::ALL.iter().map(|p| p.name()).collect()
    }

    fn eval_named(
        &self,
        name: &str,
        p: &mut TemplateParser,
        props: &Props,
    ) -> Option<ProductionResult> {
        let production = G::Production::from_name(name)?;
        Some(self.eval(production, p, props))
    }
}

// ============================================================================
// PRODUCTION IDS
// ============================================================================

/// A production qualified by the name of the language that defines it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ProductionId {
    pub language: String,
    pub production: String,
}

impl ProductionId {
    pub fn new(language: impl Into<String>, production: impl Into<String>) -> Self {
        Self {
            language: language.into(),
            production: production.into(),
        }
    }

    /// Parses `Production` or `Language:Production`. Unqualified names belong
    /// to `default_language`.
    pub fn parse(name: &str, default_language: &str) -> CstResult<Self> {
        let (language, production) = match name.split_once(':') {
            Some((language, production)) => (language.trim(), production.trim()),
            None => (default_language, name.trim()),
        };
        if language.is_empty() || production.is_empty() || production.contains(':') {
            return Err(ErrorKind::UnknownProduction {
                language: default_language.to_string(),
                production: name.to_string(),
            }
            .into());
        }
        Ok(Self::new(language, production))
    }

    /// The name as seen from `language`: bare when it is local.
    pub fn relative_to(&self, language: &str) -> String {
        if self.language == language {
            self.production.clone()
        } else {
            self.to_string()
        }
    }
}

impl fmt::Display for ProductionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.language, self.production)
    }
}

// ============================================================================
// LANGUAGES
// ============================================================================

/// An immutable, validated grammar together with its metadata.
pub struct Language {
    name: String,
    canonical_id: String,
    dependencies: BTreeMap<String, Arc<Language>>,
    covers: CoverTable,
    grammar: Box<dyn ErasedGrammar>,
    cook_escape: Option<EscapeCooker>,
}

impl fmt::Debug for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Language")
            .field("name", &self.name)
            .field("canonical_id", &self.canonical_id)
            .field("dependencies", &self.dependencies.keys().collect::<Vec<_>>())
            .field("productions", &self.grammar.production_names())
            .finish()
    }
}

impl Language {
    pub fn builder<G: Grammar>(name: impl Into<String>, grammar: G) -> LanguageBuilder {
        LanguageBuilder::new(name, grammar)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The id written into nodes built by this language.
    pub fn canonical_id(&self) -> &str {
        &self.canonical_id
    }

    pub fn covers(&self) -> &CoverTable {
        &self.covers
    }

    pub fn dependencies(&self) -> impl Iterator<Item = (&str, &Arc<Language>)> {
        self.dependencies.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn has_production(&self, name: &str) -> bool {
        self.grammar.has_production(name)
    }

    pub fn production_names(&self) -> Vec<&'static str> {
        self.grammar.production_names()
    }

    /// Resolves a language name as seen from this language: itself, or one
    /// of its declared dependencies.
    pub fn resolve(self: &Arc<Self>, name: &str) -> CstResult<Arc<Language>> {
        if name == self.name {
            return Ok(Arc::clone(self));
        }
        self.dependencies.get(name).cloned().ok_or_else(|| {
            ErrorKind::UnresolvedLanguage {
                name: name.to_string(),
                from: self.name.clone(),
            }
            .into()
        })
    }

    /// Resolves a possibly qualified production name to its language.
    pub fn resolve_production(
        self: &Arc<Self>,
        name: &str,
    ) -> CstResult<(Arc<Language>, ProductionId)> {
        let id = ProductionId::parse(name, &self.name)?;
        let language = self.resolve(&id.language)?;
        if !language.has_production(&id.production) {
            return Err(ErrorKind::UnknownProduction {
                language: language.name.clone(),
                production: id.production,
            }
            .into());
        }
        Ok((language, id))
    }

    pub fn kind(&self, production: &str) -> ProductionKind {
        self.covers.kind(production)
    }

    /// Whether `cover` stands for the production `id`.
    pub fn cover_includes(&self, cover: &str, id: &ProductionId) -> bool {
        self.covers.covers(cover, &id.relative_to(&self.name))
    }

    /// Whether a node built by `canonical_id`/`node_type` can stand where this
    /// language's `production` is expected. An open cover accepts any node.
    pub fn accepts(&self, production: &str, canonical_id: &str, node_type: &str) -> bool {
        if canonical_id == self.canonical_id && node_type == production {
            return true;
        }
        if !self.covers.is_cover(production) {
            return false;
        }
        if self.covers.is_open_cover(production) {
            return true;
        }
        if canonical_id == self.canonical_id {
            return self.covers.covers(production, node_type);
        }
        self.dependencies
            .iter()
            .filter(|(_, dep)| dep.canonical_id == canonical_id)
            .any(|(alias, _)| {
                self.covers
                    .covers(production, &format!("{}:{}", alias, node_type))
            })
    }

    pub(crate) fn eval(
        &self,
        production: &str,
        p: &mut TemplateParser,
        props: &Props,
    ) -> ProductionResult {
        self.grammar
            .eval_named(production, p, props)
            .unwrap_or_else(|| {
                Err(ErrorKind::UnknownProduction {
                    language: self.name.clone(),
                    production: production.to_string(),
                }
                .into())
            })
    }

    pub fn cook_escape(&self, raw: &str, span: &Span) -> CstResult<String> {
        let cook = self.cook_escape.ok_or_else(|| ErrorKind::NoEscapeCooker {
            language: self.name.clone(),
        })?;
        cook(raw, span).map_err(|message| {
            ErrorKind::EscapeCooking {
                raw: raw.to_string(),
                message,
            }
            .into()
        })
    }
}

/// Collects the parts of a [`Language`] and validates them together.
pub struct LanguageBuilder {
    name: String,
    canonical_id: Option<String>,
    dependencies: BTreeMap<String, Arc<Language>>,
    covers: CoverTable,
    grammar: Box<dyn ErasedGrammar>,
    cook_escape: Option<EscapeCooker>,
}

impl LanguageBuilder {
    pub fn new<G: Grammar>(name: impl Into<String>, grammar: G) -> Self {
        Self {
            name: name.into(),
            canonical_id: None,
            dependencies: BTreeMap::new(),
            covers: CoverTable::empty(),
            grammar: Box::new(grammar),
            cook_escape: None,
        }
    }

    /// Defaults to the language name.
    pub fn canonical_id(mut self, id: impl Into<String>) -> Self {
        self.canonical_id = Some(id.into());
        self
    }

    /// Adds a dependency under its own name.
    pub fn dependency(self, language: Arc<Language>) -> Self {
        let alias = language.name.clone();
        self.dependency_as(alias, language)
    }

    /// Adds a dependency under a local alias.
    pub fn dependency_as(mut self, alias: impl Into<String>, language: Arc<Language>) -> Self {
        self.dependencies.insert(alias.into(), language);
        self
    }

    pub fn covers(mut self, covers: CoverTable) -> Self {
        self.covers = covers;
        self
    }

    pub fn cook_escape(mut self, cook: EscapeCooker) -> Self {
        self.cook_escape = Some(cook);
        self
    }

    pub fn build(self) -> CstResult<Arc<Language>> {
        self.check_cycles()?;
        self.check_covers()?;

        let canonical_id = self.canonical_id.unwrap_or_else(|| self.name.clone());
        log::debug!(
            "built language {} ({}) with {} productions and {} dependencies",
            self.name,
            canonical_id,
            self.grammar.production_names().len(),
            self.dependencies.len()
        );
        Ok(Arc::new(Language {
            name: self.name,
            canonical_id,
            dependencies: self.dependencies,
            covers: self.covers,
            grammar: self.grammar,
            cook_escape: self.cook_escape,
        }))
    }

    fn check_covers(&self) -> CstResult<()> {
        for name in self.covers.names() {
            let id = ProductionId::parse(name, &self.name).map_err(|_| self.invalid(name))?;
            let known = if id.language == self.name {
                self.grammar.has_production(&id.production)
            } else {
                self.dependencies
                    .get(&id.language)
                    .is_some_and(|dep| dep.has_production(&id.production))
            };
            if !known {
                return Err(self.invalid(name).into());
            }
        }
        Ok(())
    }

    fn invalid(&self, name: &str) -> ErrorKind {
        ErrorKind::InvalidCovers {
            language: self.name.clone(),
            message: format!("`{name}` does not name a known production"),
        }
    }

    /// A language may not be reachable from its own dependencies.
    fn check_cycles(&self) -> CstResult<()> {
        let mut trail = vec![self.name.clone()];
        for dep in self.dependencies.values() {
            visit_dependencies(dep, &self.name, &mut trail)?;
        }
        Ok(())
    }
}

fn visit_dependencies(language: &Language, root: &str, trail: &mut Vec<String>) -> CstResult<()> {
    trail.push(language.name.clone());
    if language.name == root {
        return Err(ErrorKind::CyclicDependency {
            cycle: trail.join(" -> "),
        }
        .into());
    }
    for dep in language.dependencies.values() {
        visit_dependencies(dep, root, trail)?;
    }
    trail.pop();
    Ok(())
}
