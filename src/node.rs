//! Tree nodes and the builder that produces them.
//!
//! A [`NodeBuilder`] is mutable while its production runs; [`NodeBuilder::finish`]
//! freezes it into an immutable [`Node`] whose children are bracketed by its own
//! open and close tags.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::errors::{CstError, CstResult, ErrorKind};
use crate::resolver::Slot;
use crate::tags::{
    ArrayTag, Attributes, CloseNodeTag, NodeFlags, OpenNodeTag, ReferenceTag, Tag,
};

/// The value stored under a property name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Property {
    /// A singular property that holds no node (a gap).
    Null,
    Node(Arc<Node>),
    /// Array elements in input order; `None` marks a gap.
    Array(im::Vector<Option<Arc<Node>>>),
}

impl Property {
    pub fn as_node(&self) -> Option<&Arc<Node>> {
        match self {
            Property::Node(node) => Some(node),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&im::Vector<Option<Arc<Node>>>> {
        match self {
            Property::Array(items) => Some(items),
            _ => None,
        }
    }
}

/// An immutable tree node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    /// Canonical id of the language that defines `node_type`.
    pub language: String,
    pub node_type: String,
    pub flags: NodeFlags,
    /// Open tag, content, close tag.
    pub children: im::Vector<Tag>,
    pub properties: im::OrdMap<String, Property>,
    pub attributes: Attributes,
}

impl Node {
    /// Content tags, without the bracketing open and close tags.
    pub fn content(&self) -> impl Iterator<Item = &Tag> {
        let len = self.children.len();
        self.children
            .iter()
            .skip(1)
            .take(len.saturating_sub(2))
    }

    pub fn property(&self, name: &str) -> Option<&Property> {
        self.properties.get(name)
    }

    /// The node stored under a singular property.
    pub fn get(&self, name: &str) -> Option<&Arc<Node>> {
        self.properties.get(name)?.as_node()
    }

    /// The elements of an array-valued property.
    pub fn elements(&self, name: &str) -> Vec<Option<&Arc<Node>>> {
        match self.properties.get(name) {
            Some(Property::Array(items)) => items.iter().map(Option::as_ref).collect(),
            _ => Vec::new(),
        }
    }

    /// Looks up a slot computed by a [`Resolver`](crate::resolver::Resolver).
    ///
    /// `None` means the slot does not exist; `Some(None)` means it holds a gap.
    pub fn resolve(&self, slot: &Slot) -> Option<Option<&Arc<Node>>> {
        match (self.properties.get(&slot.name)?, slot.index) {
            (Property::Node(node), None) => Some(Some(node)),
            (Property::Null, None) => Some(None),
            (Property::Array(items), Some(index)) => items.get(index).map(Option::as_ref),
            _ => None,
        }
    }

    /// Concatenated literal text of a token node; escapes contribute their
    /// cooked value.
    pub fn text(&self) -> String {
        self.content()
            .filter_map(|tag| match tag {
                Tag::Literal(lit) => Some(lit.text.as_str()),
                Tag::Escape(esc) => Some(esc.cooked.as_str()),
                _ => None,
            })
            .collect()
    }

    /// A copy with different flags; the open tag is rewritten to match.
    pub fn with_flags(&self, flags: NodeFlags) -> Node {
        let mut node = self.clone();
        node.flags = flags;
        if let Some(Tag::OpenNode(open)) = node.children.front_mut() {
            open.flags = flags;
        }
        node
    }

    pub fn to_json(&self) -> CstResult<String> {
        serde_json::to_string(self).map_err(|e| {
            CstError::new(ErrorKind::Config {
                message: format!("cannot serialize node: {e}"),
            })
        })
    }

    pub fn from_json(text: &str) -> CstResult<Node> {
        serde_json::from_str(text).map_err(|e| {
            CstError::new(ErrorKind::Config {
                message: format!("cannot deserialize node: {e}"),
            })
        })
    }
}

// ============================================================================
// BUILDER
// ============================================================================

/// The mutable node under construction.
///
/// The builder keeps `children` and `properties` consistent: every reference
/// or named gap it records has a matching property entry.
#[derive(Debug, Clone)]
pub struct NodeBuilder {
    language: String,
    node_type: String,
    flags: NodeFlags,
    children: im::Vector<Tag>,
    properties: im::OrdMap<String, Property>,
    attributes: Attributes,
}

impl NodeBuilder {
    pub fn new(
        language: impl Into<String>,
        node_type: impl Into<String>,
        flags: NodeFlags,
    ) -> Self {
        Self {
            language: language.into(),
            node_type: node_type.into(),
            flags,
            children: im::Vector::new(),
            properties: im::OrdMap::new(),
            attributes: Attributes::new(),
        }
    }

    pub fn language(&self) -> &str {
        &self.language
    }

    pub fn node_type(&self) -> &str {
        &self.node_type
    }

    pub fn children(&self) -> &im::Vector<Tag> {
        &self.children
    }

    pub fn properties(&self) -> &im::OrdMap<String, Property> {
        &self.properties
    }

    pub fn set_flags(&mut self, flags: NodeFlags) {
        self.flags = flags;
    }

    pub fn set_attributes(&mut self, attributes: Attributes) {
        self.attributes = attributes;
    }

    /// Appends a tag that carries no property (literal, escape, trivia,
    /// embedded node, unnamed gap).
    pub fn push(&mut self, tag: Tag) {
        self.children.push_back(tag);
    }

    pub fn last_mut(&mut self) -> Option<&mut Tag> {
        self.children.back_mut()
    }

    /// Removes the last child. Property entries are left untouched, so this
    /// is only for tags that carry none.
    pub fn pop(&mut self) -> Option<Tag> {
        self.children.pop_back()
    }

    /// Declares `name` as an array property with no elements yet.
    pub fn declare_array(&mut self, name: &str) {
        if !self.properties.contains_key(name) {
            self.children.push_back(Tag::Array(ArrayTag {
                name: name.to_string(),
            }));
            self.properties
                .insert(name.to_string(), Property::Array(im::Vector::new()));
        }
    }

    /// Records `value` under `slot` behind a reference tag.
    pub fn attach(&mut self, reference: &ReferenceTag, slot: &Slot, value: Arc<Node>) {
        self.prepare(reference);
        self.children.push_back(Tag::Reference(reference.clone()));
        self.store(slot, Some(value));
    }

    /// Records a gap under `slot`.
    pub fn attach_gap(&mut self, reference: &ReferenceTag, slot: &Slot) {
        self.prepare(reference);
        self.children.push_back(Tag::gap(Some(reference.clone())));
        self.store(slot, None);
    }

    /// Records an empty value under `slot` behind a reference tag.
    pub fn attach_null(&mut self, reference: &ReferenceTag, slot: &Slot) {
        self.prepare(reference);
        self.children.push_back(Tag::Reference(reference.clone()));
        self.store(slot, None);
    }

    /// Removes the last child, which must be a reference or a named gap, along
    /// with its stored value.
    pub fn detach_last(&mut self) -> CstResult<(ReferenceTag, Option<Arc<Node>>)> {
        let reference = match self.children.back() {
            Some(Tag::Reference(reference)) => Some(reference.clone()),
            Some(Tag::Gap(gap)) => gap.reference.clone(),
            _ => None,
        }
        .ok_or_else(|| ErrorKind::NothingToShift {
            node_type: self.node_type.clone(),
        })?;
        self.children.pop_back();

        let value = if reference.is_array {
            match self.properties.get_mut(&reference.name) {
                Some(Property::Array(items)) => items.pop_back().flatten(),
                _ => None,
            }
        } else {
            match self.properties.remove(&reference.name) {
                Some(Property::Node(node)) => Some(node),
                _ => None,
            }
        };
        Ok((reference, value))
    }

    fn prepare(&mut self, reference: &ReferenceTag) {
        if reference.is_array {
            self.declare_array(&reference.name);
        }
    }

    fn store(&mut self, slot: &Slot, value: Option<Arc<Node>>) {
        match slot.index {
            None => {
                let property = value.map_or(Property::Null, Property::Node);
                self.properties.insert(slot.name.clone(), property);
            }
            Some(index) => {
                let entry = self
                    .properties
                    .entry(slot.name.clone())
                    .or_insert_with(|| Property::Array(im::Vector::new()));
                if let Property::Array(items) = entry {
                    while items.len() < index {
                        items.push_back(None);
                    }
                    if index < items.len() {
                        items.set(index, value);
                    } else {
                        items.push_back(value);
                    }
                }
            }
        }
    }

    /// Freezes the builder.
    ///
    /// A node whose content contains literal or escape tags becomes a token;
    /// such a node may not contain anything else.
    pub fn finish(self) -> CstResult<Node> {
        let has_terminal = self.children.iter().any(Tag::is_terminal);
        if has_terminal && !self.children.iter().all(Tag::is_terminal) {
            return Err(ErrorKind::MixedChildren {
                node_type: self.node_type,
            }
            .into());
        }

        let mut flags = self.flags;
        if has_terminal {
            flags.token = true;
        }
        flags.validate(&self.node_type)?;

        let mut children = self.children;
        children.push_front(Tag::OpenNode(OpenNodeTag {
            flags,
            language: self.language.clone(),
            node_type: self.node_type.clone(),
            attributes: self.attributes.clone(),
        }));
        children.push_back(Tag::CloseNode(CloseNodeTag {
            node_type: self.node_type.clone(),
        }));

        Ok(Node {
            language: self.language,
            node_type: self.node_type,
            flags,
            children,
            properties: self.properties,
            attributes: self.attributes,
        })
    }
}
