//! JSON backend.
//!
//! The document is the serde form of a [`TypeGraph`]: an object keyed by
//! type name in emission order. [`TypeGraph::from_json`] reads it back for
//! the value renderer.

use log::debug;

use typeinfo_core::{
    graph::{GraphEntry, TypeGraph},
    identifier::Id,
};

use super::{Emitter, Error};

/// Collects named types into a graph document.
#[derive(Debug, Default)]
pub struct JsonEmitter {
    graph: TypeGraph,
}

impl JsonEmitter {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Emitter for JsonEmitter {
    type Output = String;

    fn emit_type(&mut self, name: Id, entry: &GraphEntry) -> Result<(), Error> {
        self.graph
            .insert(name, entry.descriptor.clone(), entry.origin.clone());
        Ok(())
    }

    fn finish(self) -> Result<String, Error> {
        let json = self.graph.to_json()?;
        debug!(types = self.graph.len(), bytes = json.len(); "JSON graph generated");
        Ok(json)
    }
}
