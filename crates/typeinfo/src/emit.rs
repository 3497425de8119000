//! Serialization of extracted type graphs.
//!
//! This module provides the [`Emitter`] trait implemented by every output
//! backend, and [`Generation`], which merges the graphs of several units
//! into the single graph that is emitted.
//!
//! # Pipeline Position
//!
//! ```text
//! C source
//!     ↓ parse (typeinfo-parser)
//! Unit
//!     ↓ extract
//! TypeGraph (per unit)
//!     ↓ Generation::add_unit
//! TypeGraph (merged)
//!     ↓ emit (this module)
//! Output files
//! ```
//!
//! # Available Backends
//!
//! - [`c`]: a header/source pair linked into the inspected program
//! - [`json`]: a JSON document loaded back with [`TypeGraph::from_json`]

/// C header and source backend.
pub mod c;
/// JSON backend.
pub mod json;

use log::warn;
use thiserror::Error;

use typeinfo_core::{
    graph::{GraphEntry, TypeGraph},
    identifier::Id,
};

/// Bundled runtime header declaring the `Type_Info` structures the generated
/// C code initializes.
pub const RUNTIME_HEADER: &str = include_str!("../include/typeinfo.h");

/// File name generated code includes the runtime header by.
pub const RUNTIME_HEADER_NAME: &str = "typeinfo.h";

/// Abstraction for output backends.
///
/// Named types are handed over one at a time in graph order, then
/// [`Emitter::finish`] produces the backend's output.
pub trait Emitter {
    type Output;

    /// Emits one top-level named type.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Format`] if the type cannot be expressed in the
    /// output format.
    fn emit_type(&mut self, name: Id, entry: &GraphEntry) -> Result<(), Error>;

    /// Completes the output.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Json`] if serialization of the collected types fails.
    fn finish(self) -> Result<Self::Output, Error>;
}

/// Errors that can occur during emission.
#[derive(Debug, Error)]
pub enum Error {
    #[error("format error: {0}")]
    Format(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Feeds every entry of `graph` to `emitter` and finishes it.
///
/// # Errors
///
/// Propagates the first error reported by the emitter.
pub fn emit_graph<E: Emitter>(mut emitter: E, graph: &TypeGraph) -> Result<E::Output, Error> {
    for (name, entry) in graph.iter() {
        emitter.emit_type(name, entry)?;
    }
    emitter.finish()
}

/// Accumulates the graphs of all units processed in one run.
///
/// Units are merged in the order they are added. A named type emitted by an
/// earlier unit wins; later units' entries with the same name are dropped.
#[derive(Debug, Default)]
pub struct Generation {
    graph: TypeGraph,
    units: usize,
    failed_units: Vec<String>,
}

impl Generation {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merges the graph extracted from `file`.
    ///
    /// Returns the names dropped as duplicates.
    pub fn add_unit(&mut self, file: &str, graph: TypeGraph) -> Vec<Id> {
        self.units += 1;
        let dropped = self.graph.merge(graph);
        for name in &dropped {
            warn!(file, name:% = name; "Type already emitted by an earlier unit, dropping");
        }
        dropped
    }

    /// Records a unit that produced no graph.
    pub fn add_failure(&mut self, file: impl Into<String>) {
        self.units += 1;
        self.failed_units.push(file.into());
    }

    pub fn graph(&self) -> &TypeGraph {
        &self.graph
    }

    pub fn into_graph(self) -> TypeGraph {
        self.graph
    }

    /// Number of units added, including failed ones.
    pub fn units(&self) -> usize {
        self.units
    }

    pub fn failed_units(&self) -> &[String] {
        &self.failed_units
    }

    /// Returns `true` if every unit produced a graph.
    pub fn is_success(&self) -> bool {
        self.failed_units.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use typeinfo_core::descriptor::{Aggregate, Layout, TypeDescriptor, TypeKind};

    fn empty_struct(name: &str, size: u64) -> TypeDescriptor {
        TypeDescriptor::new(
            Layout::new(size, 1),
            TypeKind::Struct(Aggregate {
                name: name.to_string(),
                ..Aggregate::default()
            }),
        )
    }

    fn unit(names: &[(&str, u64)]) -> TypeGraph {
        let mut graph = TypeGraph::new();
        for (name, size) in names {
            graph.insert(Id::new(name), empty_struct(name, *size), None);
        }
        graph
    }

    #[test]
    fn test_generation_keeps_first_definition() {
        let mut generation = Generation::new();
        assert!(generation.add_unit("a.h", unit(&[("A", 1), ("Shared", 1)])).is_empty());

        let dropped = generation.add_unit("b.h", unit(&[("Shared", 2), ("B", 1)]));
        assert_eq!(dropped, vec![Id::new("Shared")]);

        let names: Vec<String> = generation.graph().iter().map(|(id, _)| id.to_name()).collect();
        assert_eq!(names, ["A", "Shared", "B"]);
        assert_eq!(generation.graph().get_by_name("Shared").map(|e| e.descriptor.size()), Some(1));
        assert_eq!(generation.units(), 2);
        assert!(generation.is_success());
    }

    #[test]
    fn test_generation_records_failures() {
        let mut generation = Generation::new();
        generation.add_unit("ok.h", unit(&[("A", 1)]));
        generation.add_failure("broken.h");

        assert!(!generation.is_success());
        assert_eq!(generation.failed_units(), ["broken.h"]);
        assert_eq!(generation.units(), 2);
        assert_eq!(generation.into_graph().len(), 1);
    }

    #[test]
    fn test_runtime_header_declares_descriptors() {
        assert!(RUNTIME_HEADER.contains("Type_Info_Struct"));
        assert!(RUNTIME_HEADER.contains("TYPE_INFO_QUALIFIER_RESTRICT"));
        assert!(RUNTIME_HEADER.contains("TYPEINFO_ALIGNOF"));
    }
}
