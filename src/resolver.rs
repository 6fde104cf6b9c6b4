//! Per-node property slot resolution.
//!
//! A [`Resolver`] belongs to exactly one node. Construction and streaming
//! each run their own instance over the same sequence of references, so the
//! `n`th `elements[]` reference always lands on `elements.n`.

use std::collections::HashMap;
use std::fmt;

use crate::errors::{CstResult, ErrorKind};
use crate::tags::ReferenceTag;

/// A concrete storage location: `name` for singular properties, `name.index`
/// for array elements.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Slot {
    pub name: String,
    pub index: Option<usize>,
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.index {
            Some(index) => write!(f, "{}.{}", self.name, index),
            None => f.write_str(&self.name),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Shape {
    Singular,
    Array,
}

impl Shape {
    const fn describe(self) -> &'static str {
        match self {
            Shape::Singular => "singular",
            Shape::Array => "an array",
        }
    }

    const fn of(reference: &ReferenceTag) -> Self {
        if reference.is_array {
            Shape::Array
        } else {
            Shape::Singular
        }
    }
}

#[derive(Debug, Clone)]
pub struct Resolver {
    node_type: String,
    counters: HashMap<String, usize>,
    shapes: HashMap<String, Shape>,
}

impl Resolver {
    pub fn new(node_type: impl Into<String>) -> Self {
        Self {
            node_type: node_type.into(),
            counters: HashMap::new(),
            shapes: HashMap::new(),
        }
    }

    /// Claims the next slot for `reference`.
    ///
    /// Fails when a singular name is claimed twice or when a name is used
    /// both as singular and as array.
    pub fn consume(&mut self, reference: &ReferenceTag) -> CstResult<Slot> {
        self.check_shape(reference)?;
        let count = self.counters.entry(reference.name.clone()).or_insert(0);

        if reference.is_array {
            let index = *count;
            *count += 1;
            Ok(Slot {
                name: reference.name.clone(),
                index: Some(index),
            })
        } else {
            if *count > 0 {
                return Err(ErrorKind::DuplicateProperty {
                    name: reference.name.clone(),
                    node_type: self.node_type.clone(),
                }
                .into());
            }
            *count = 1;
            Ok(Slot {
                name: reference.name.clone(),
                index: None,
            })
        }
    }

    /// The slot the next [`consume`](Self::consume) would return, without
    /// claiming it.
    pub fn resolve(&self, reference: &ReferenceTag) -> Slot {
        let count = self.counters.get(&reference.name).copied().unwrap_or(0);
        Slot {
            name: reference.name.clone(),
            index: reference.is_array.then_some(count),
        }
    }

    /// Gives back the most recently consumed slot for `reference`.
    pub fn release(&mut self, reference: &ReferenceTag) {
        if let Some(count) = self.counters.get_mut(&reference.name) {
            *count = count.saturating_sub(1);
        }
    }

    /// Marks `name` as array-valued without claiming an element.
    pub fn declare_array(&mut self, name: &str) -> CstResult<()> {
        self.check_shape(&ReferenceTag::new(name, true))
    }

    fn check_shape(&mut self, reference: &ReferenceTag) -> CstResult<()> {
        let requested = Shape::of(reference);
        let declared = *self
            .shapes
            .entry(reference.name.clone())
            .or_insert(requested);
        if declared != requested {
            return Err(ErrorKind::PropertyKindConflict {
                name: reference.name.clone(),
                node_type: self.node_type.clone(),
                declared: declared.describe(),
                requested: requested.describe(),
            }
            .into());
        }
        Ok(())
    }
}
