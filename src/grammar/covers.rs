//! Cover tables.
//!
//! A cover table maps each abstract production (and the two universal
//! markers) to the set of production names it may stand for. The set is closed
//! transitively when the table is built: if `A` covers `B` and `B` covers `C`,
//! then `A` covers `C`.
//!
//! Names are interned once; membership queries work on dense ids.

use std::collections::{HashMap, HashSet};

/// A cover table key: one of the universal markers, or a production name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CoverKey {
    /// Every production listed here builds a tree node.
    Node,
    /// Every production listed here splices into its parent.
    Fragment,
    Production(String),
}

/// How a production takes part in tree construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProductionKind {
    /// Opens a node frame and builds one node.
    Node,
    /// Abstract alias; shares the enclosing node frame.
    Cover,
    /// Shares the enclosing node frame and builds no node of its own.
    Fragment,
}

impl ProductionKind {
    pub const fn as_str(&self) -> &'static str {
        match self {
            ProductionKind::Node => "node",
            ProductionKind::Cover => "cover",
            ProductionKind::Fragment => "fragment",
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct CoverTableBuilder {
    entries: Vec<(CoverKey, Vec<String>)>,
}

impl CoverTableBuilder {
    /// Lists productions under the node marker.
    pub fn nodes<I, S>(self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.entry(CoverKey::Node, names)
    }

    /// Lists productions under the fragment marker.
    pub fn fragments<I, S>(self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.entry(CoverKey::Fragment, names)
    }

    /// Declares `cover` as an abstract production standing for `names`.
    pub fn cover<I, S>(self, cover: impl Into<String>, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.entry(CoverKey::Production(cover.into()), names)
    }

    fn entry<I, S>(mut self, key: CoverKey, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let names: Vec<String> = names.into_iter().map(Into::into).collect();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some((_, existing)) => existing.extend(names),
            None => self.entries.push((key, names)),
        }
        self
    }

    pub fn build(self) -> CoverTable {
        let mut table = CoverTable::default();

        let mut direct: HashMap<usize, HashSet<usize>> = HashMap::new();
        for (key, names) in &self.entries {
            let key_id = table.intern_key(key);
            let members = direct.entry(key_id).or_default();
            for name in names {
                members.insert(table.intern(name));
            }
        }

        // Production names resolve to their key ids so a member can be
        // expanded through its own cover entry.
        let key_of_name: HashMap<usize, usize> = table
            .keys
            .iter()
            .filter_map(|(key, &key_id)| match key {
                CoverKey::Production(name) => table.ids.get(name).map(|&id| (id, key_id)),
                _ => None,
            })
            .collect();

        for (&key_id, members) in &direct {
            let mut closed: HashSet<usize> = HashSet::new();
            let mut pending: Vec<usize> = members.iter().copied().collect();
            while let Some(id) = pending.pop() {
                if !closed.insert(id) {
                    continue;
                }
                if let Some(nested) = key_of_name.get(&id).and_then(|k| direct.get(k)) {
                    pending.extend(nested.iter().copied());
                }
            }
            table.closure.insert(key_id, closed);
        }

        log::debug!(
            "built cover table with {} keys over {} names",
            table.keys.len(),
            table.names.len()
        );
        table
    }
}

/// A transitively closed cover table.
#[derive(Debug, Clone, Default)]
pub struct CoverTable {
    names: Vec<String>,
    ids: HashMap<String, usize>,
    keys: HashMap<CoverKey, usize>,
    closure: HashMap<usize, HashSet<usize>>,
}

impl CoverTable {
    pub fn builder() -> CoverTableBuilder {
        CoverTableBuilder::default()
    }

    /// An empty table: every production is an unlisted fragment.
    pub fn empty() -> Self {
        Self::default()
    }

    fn intern(&mut self, name: &str) -> usize {
        if let Some(&id) = self.ids.get(name) {
            return id;
        }
        let id = self.names.len();
        self.names.push(name.to_string());
        self.ids.insert(name.to_string(), id);
        id
    }

    fn intern_key(&mut self, key: &CoverKey) -> usize {
        if let Some(&id) = self.keys.get(key) {
            return id;
        }
        let id = self.keys.len();
        self.keys.insert(key.clone(), id);
        id
    }

    fn members(&self, key: &CoverKey) -> Option<&HashSet<usize>> {
        self.closure.get(self.keys.get(key)?)
    }

    fn lists(&self, key: &CoverKey, name: &str) -> bool {
        match (self.members(key), self.ids.get(name)) {
            (Some(members), Some(id)) => members.contains(id),
            _ => false,
        }
    }

    /// Whether `name` is a cover key.
    pub fn is_cover(&self, name: &str) -> bool {
        self.keys
            .contains_key(&CoverKey::Production(name.to_string()))
    }

    /// Whether `cover` stands for `name`, directly or transitively.
    pub fn covers(&self, cover: &str, name: &str) -> bool {
        self.lists(&CoverKey::Production(cover.to_string()), name)
    }

    /// Whether the closed set of `cover` is empty (an unrestricted cover).
    pub fn is_open_cover(&self, cover: &str) -> bool {
        self.members(&CoverKey::Production(cover.to_string()))
            .map_or(true, HashSet::is_empty)
    }

    /// The closed set of names `key` stands for, sorted.
    pub fn covered(&self, key: &CoverKey) -> Vec<&str> {
        let mut names: Vec<&str> = self
            .members(key)
            .map(|members| members.iter().map(|&id| self.names[id].as_str()).collect())
            .unwrap_or_default();
        names.sort_unstable();
        names
    }

    pub fn is_node(&self, name: &str) -> bool {
        self.lists(&CoverKey::Node, name) && !self.is_cover(name)
    }

    /// Listed under a marker, so the production consumes an interpolation
    /// when the cursor sits at one.
    pub fn is_interpolable(&self, name: &str) -> bool {
        self.lists(&CoverKey::Node, name) || self.lists(&CoverKey::Fragment, name)
    }

    pub fn kind(&self, name: &str) -> ProductionKind {
        if self.is_cover(name) {
            ProductionKind::Cover
        } else if self.lists(&CoverKey::Node, name) {
            ProductionKind::Node
        } else {
            ProductionKind::Fragment
        }
    }

    /// Every production name the table mentions, as key or member.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(String::as_str).chain(
            self.keys.keys().filter_map(|key| match key {
                CoverKey::Production(name) => Some(name.as_str()),
                _ => None,
            }),
        )
    }
}
