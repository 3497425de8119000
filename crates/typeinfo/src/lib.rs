//! Typeinfo - reflection descriptors for C types.
//!
//! Extracts the type graph reachable from C declarations marked as roots,
//! emits it as C definitions or JSON, and renders values from raw memory
//! through it.

pub mod config;
pub mod emit;
pub mod extract;

mod error;

pub use typeinfo_core::{builtin, descriptor, graph, identifier, memory, provider, qualifier, render};

pub use error::{ExtractError, TypeInfoError};

use std::{
    fs,
    io::Write,
    path::{Path, PathBuf},
};

use log::{debug, info, trace, warn};

use typeinfo_core::{graph::TypeGraph, memory::MemorySource, render::Renderer};
use typeinfo_parser::Unit;

use config::AppConfig;
use emit::{Generation, c::CEmitter, emit_graph, json::JsonEmitter};
use extract::ExtractConfig;

/// Builder for extracting, emitting, and rendering type descriptors.
///
/// # Examples
///
/// ```rust,no_run
/// use typeinfo::{Generator, config::AppConfig};
///
/// let source = "typedef struct TI_ROOT { int x; int y; } Point;";
///
/// let generator = Generator::new(AppConfig::default());
///
/// // Extract the graph of one unit
/// let graph = generator.extract(source, "point.h")
///     .expect("Failed to extract");
///
/// // Emit it as C
/// let sources = generator.emit_c(&graph, "point_typeinfo.h")
///     .expect("Failed to emit");
///
/// // Or use default config
/// let generator = Generator::default();
/// ```
#[derive(Default)]
pub struct Generator {
    config: AppConfig,
}

impl Generator {
    /// Create a new generator with the given configuration.
    pub fn new(config: AppConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Parse C source into an elaborated unit.
    ///
    /// Front end warnings are logged and otherwise ignored.
    ///
    /// # Errors
    ///
    /// Returns `TypeInfoError::Parse` for syntax and elaboration errors, or
    /// `TypeInfoError::Config` if the configured target is invalid.
    pub fn parse(&self, source: &str, file: &str) -> Result<Unit, TypeInfoError> {
        info!(file; "Parsing unit");

        let target = self
            .config
            .target()
            .target_config()
            .map_err(TypeInfoError::Config)?;

        let unit = typeinfo_parser::parse(source, file, target)
            .map_err(|err| TypeInfoError::new_parse_error(err, file, source))?;

        for warning in unit.warnings() {
            warn!(file, code:? = warning.code(); "{}", warning.message());
        }
        debug!(file, warnings = unit.warnings().len(); "Unit parsed successfully");

        Ok(unit)
    }

    /// Extract the type graph of one unit.
    ///
    /// # Errors
    ///
    /// Returns the parse errors of [`Generator::parse`], or
    /// `TypeInfoError::Extract` if a reachable type cannot be described.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use typeinfo::Generator;
    ///
    /// let graph = Generator::default()
    ///     .extract("struct TI_ROOT Pair { int a; long b; };", "pair.h")
    ///     .expect("Failed to extract");
    /// assert!(graph.get_by_name("Pair").is_some());
    /// ```
    pub fn extract(&self, source: &str, file: &str) -> Result<TypeGraph, TypeInfoError> {
        let unit = self.parse(source, file)?;

        let config = ExtractConfig {
            root_marker: self.config.markers().root().to_string(),
        };
        let graph = extract::extract(&unit, &config)
            .map_err(|err| TypeInfoError::new_extract_error(err, file))?;

        info!(file, types = graph.len(); "Unit extracted");
        trace!(graph:?; "Extracted graph");
        Ok(graph)
    }

    /// Extract one unit and merge it into `generation`.
    ///
    /// A failing unit is recorded in `generation` so later units can still
    /// be processed.
    ///
    /// # Errors
    ///
    /// Returns the error that made the unit fail.
    pub fn add_unit(
        &self,
        generation: &mut Generation,
        source: &str,
        file: &str,
    ) -> Result<(), TypeInfoError> {
        match self.extract(source, file) {
            Ok(graph) => {
                generation.add_unit(file, graph);
                Ok(())
            }
            Err(err) => {
                generation.add_failure(file);
                Err(err)
            }
        }
    }

    /// Emit `graph` as a C header and source pair.
    ///
    /// `header_path` names the header; only its file name appears in the
    /// output.
    ///
    /// # Errors
    ///
    /// Returns `TypeInfoError::Emit` if the graph holds an entry that is not
    /// an aggregate or enum.
    pub fn emit_c(
        &self,
        graph: &TypeGraph,
        header_path: &str,
    ) -> Result<emit::c::CSources, TypeInfoError> {
        let emitter = CEmitter::with_builtin_types(header_path, self.config.output().builtin_types());
        Ok(emit_graph(emitter, graph)?)
    }

    /// Emit `graph` as a JSON document.
    ///
    /// # Errors
    ///
    /// Returns `TypeInfoError::Emit` if serialization fails.
    pub fn emit_json(&self, graph: &TypeGraph) -> Result<String, TypeInfoError> {
        Ok(emit_graph(JsonEmitter::new(), graph)?)
    }

    /// Write all configured outputs for `graph` next to `out_base`.
    ///
    /// Always writes `<out_base>.h` and `<out_base>.c`; `<out_base>.json`
    /// and the runtime `typeinfo.h` when enabled in the output config.
    /// Each file is written to a temporary file first and then moved into
    /// place.
    ///
    /// # Errors
    ///
    /// Returns an error if emission or writing any file fails.
    pub fn write_outputs(&self, graph: &TypeGraph, out_base: &Path) -> Result<Vec<PathBuf>, TypeInfoError> {
        let header_path = out_base.with_extension("h");
        let source_path = out_base.with_extension("c");

        let sources = self.emit_c(graph, &header_path.to_string_lossy())?;
        let mut written = vec![
            write_file(&header_path, &sources.header)?,
            write_file(&source_path, &sources.source)?,
        ];

        if self.config.output().json() {
            let json = self.emit_json(graph)?;
            written.push(write_file(&out_base.with_extension("json"), &json)?);
        }

        if self.config.output().runtime_header() {
            let runtime = header_path.with_file_name(emit::RUNTIME_HEADER_NAME);
            written.push(write_file(&runtime, emit::RUNTIME_HEADER)?);
        }

        info!(files = written.len(), types = graph.len(); "Outputs written");
        Ok(written)
    }

    /// Render the value of the named type at `addr`.
    ///
    /// # Errors
    ///
    /// Returns `TypeInfoError::UnknownType` if `type_name` is not in `graph`.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use typeinfo::{Generator, memory::ByteImage};
    ///
    /// let generator = Generator::default();
    /// let graph = generator
    ///     .extract("struct TI_ROOT Pair { int a; int b; };", "pair.h")
    ///     .expect("Failed to extract");
    ///
    /// let mut bytes = 7i32.to_ne_bytes().to_vec();
    /// bytes.extend(9i32.to_ne_bytes());
    /// let text = generator
    ///     .render(&graph, "Pair", ByteImage::new(0x1000, bytes), 0x1000)
    ///     .expect("Failed to render");
    /// assert_eq!(text, "struct Pair {\n  a = 7\n  b = 9\n}\n");
    /// ```
    pub fn render<M: MemorySource>(
        &self,
        graph: &TypeGraph,
        type_name: &str,
        memory: M,
        addr: u64,
    ) -> Result<String, TypeInfoError> {
        let entry = graph
            .get_by_name(type_name)
            .ok_or_else(|| TypeInfoError::UnknownType(type_name.to_string()))?;

        debug!(type_name, addr; "Rendering value");
        let renderer = Renderer::new(graph, memory)
            .with_text_annotation(self.config.markers().text())
            .with_char_signed(self.config.target().char_signed());
        Ok(renderer.render_descriptor(addr, &entry.descriptor, 0))
    }
}

/// Writes `contents` to `path` through a temporary file in the same
/// directory, so an interrupted run never leaves a truncated output behind.
fn write_file(path: &Path, contents: &str) -> Result<PathBuf, TypeInfoError> {
    let persist_error = |err| TypeInfoError::Persist {
        path: path.to_path_buf(),
        err,
    };

    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    fs::create_dir_all(&dir).map_err(persist_error)?;

    let mut temp_file = tempfile::NamedTempFile::new_in(&dir).map_err(persist_error)?;
    temp_file
        .write_all(contents.as_bytes())
        .map_err(persist_error)?;
    temp_file
        .persist(path)
        .map_err(|err| persist_error(err.error))?;

    debug!(path = path.display().to_string(), bytes = contents.len(); "File written");
    Ok(path.to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_file_replaces_contents() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("nested").join("out.h");

        write_file(&path, "first").expect("first write");
        write_file(&path, "second").expect("second write");

        assert_eq!(fs::read_to_string(&path).expect("readable"), "second");
    }
}
