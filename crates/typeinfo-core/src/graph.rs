//! The type graph arena.
//!
//! A [`TypeGraph`] owns every named descriptor produced for a unit (or a
//! merged set of units), keyed by name in insertion order. All cross
//! references between named descriptors go through [`TypeRef::Named`], so
//! mutually referencing aggregates need no structural nesting.

use std::fmt;

use indexmap::IndexMap;
use log::debug;
use serde::{Deserialize, Serialize};

use crate::{
    descriptor::{TypeDescriptor, TypeRef},
    identifier::Id,
};

/// Source location a named type was declared at.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Origin {
    pub file: String,
    pub line: u32,
    pub column: u32,
}

impl Origin {
    pub fn new(file: impl Into<String>, line: u32, column: u32) -> Self {
        Self {
            file: file.into(),
            line,
            column,
        }
    }
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.file, self.line, self.column)
    }
}

/// A named descriptor together with where it was declared.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphEntry {
    pub descriptor: TypeDescriptor,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub origin: Option<Origin>,
}

/// Insertion-ordered collection of named descriptors.
///
/// A name is present at most once: [`TypeGraph::insert`] keeps the first
/// descriptor registered under a name.
///
/// # Examples
///
/// ```
/// use typeinfo_core::{
///     builtin::Builtin,
///     descriptor::{Aggregate, Layout, TypeDescriptor, TypeKind},
///     graph::TypeGraph,
///     identifier::Id,
/// };
///
/// let mut graph = TypeGraph::new();
/// let empty = TypeDescriptor::new(Layout::new(0, 1), TypeKind::Struct(Aggregate {
///     name: "Empty".to_string(),
///     ..Aggregate::default()
/// }));
/// assert!(graph.insert(Id::new("Empty"), empty, None));
/// assert!(graph.get_by_name("Empty").is_some());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TypeGraph {
    entries: IndexMap<Id, GraphEntry>,
}

impl TypeGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a named descriptor.
    ///
    /// Returns `false` and leaves the graph unchanged if `name` is already
    /// present.
    pub fn insert(&mut self, name: Id, descriptor: TypeDescriptor, origin: Option<Origin>) -> bool {
        if self.entries.contains_key(&name) {
            return false;
        }
        self.entries.insert(name, GraphEntry { descriptor, origin });
        true
    }

    pub fn contains(&self, name: Id) -> bool {
        self.entries.contains_key(&name)
    }

    pub fn get(&self, name: Id) -> Option<&GraphEntry> {
        self.entries.get(&name)
    }

    pub fn get_by_name(&self, name: &str) -> Option<&GraphEntry> {
        self.get(Id::new(name))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (Id, &GraphEntry)> {
        self.entries.iter().map(|(name, entry)| (*name, entry))
    }

    /// Resolves a reference to the descriptor it denotes.
    ///
    /// Built-ins resolve to their singleton, inline references to their
    /// owned descriptor, and by-name references through this graph. Returns
    /// `None` for a name that is not registered.
    pub fn resolve<'a>(&'a self, ty: &'a TypeRef) -> Option<&'a TypeDescriptor> {
        match ty {
            TypeRef::Builtin(builtin) => Some(builtin.descriptor()),
            TypeRef::Named(name) => self.get(*name).map(|entry| &entry.descriptor),
            TypeRef::Inline(descriptor) => Some(descriptor),
        }
    }

    /// Appends every entry of `other` whose name is not yet present.
    ///
    /// Returns the names that were dropped because an earlier entry already
    /// used them.
    pub fn merge(&mut self, other: TypeGraph) -> Vec<Id> {
        let mut dropped = Vec::new();
        for (name, entry) in other.entries {
            if !self.insert(name, entry.descriptor, entry.origin) {
                debug!(name:% = name; "Dropping duplicate named type");
                dropped.push(name);
            }
        }
        dropped
    }

    /// Serializes the graph as pretty-printed JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Loads a graph previously written by [`TypeGraph::to_json`].
    ///
    /// # Errors
    ///
    /// Returns an error if `json` is not a valid graph document.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}
