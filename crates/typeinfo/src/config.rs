//! Configuration types for descriptor generation.
//!
//! This module provides configuration structures that control how sources are
//! laid out and which outputs are written. All types implement
//! [`serde::Deserialize`] for loading from external sources.
//!
//! # Overview
//!
//! - [`AppConfig`] - Top-level configuration combining the sections below.
//! - [`TargetConfig`] - Data model and `char` signedness used for layout.
//! - [`MarkerConfig`] - Annotation names recognized by extraction and rendering.
//! - [`OutputConfig`] - Which files `generate` writes.
//!
//! # Example
//!
//! ```
//! # use typeinfo::config::AppConfig;
//! // Use default configuration
//! let config = AppConfig::default();
//! assert!(config.target().target_config().is_ok());
//! assert_eq!(config.markers().root(), "__TypeInfoRoot");
//! ```

use serde::Deserialize;

use typeinfo_core::{builtin::CHAR_IS_SIGNED, provider::ROOT_MARKER, render::DEFAULT_TEXT_ANNOTATION};
use typeinfo_parser::{DataModel, TargetConfig as ParserTarget};

/// Top-level configuration combining target, marker, and output settings.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    /// Target configuration section.
    #[serde(default)]
    target: TargetConfig,

    /// Marker configuration section.
    #[serde(default)]
    markers: MarkerConfig,

    /// Output configuration section.
    #[serde(default)]
    output: OutputConfig,
}

impl AppConfig {
    /// Creates a new [`AppConfig`] from its sections.
    pub fn new(target: TargetConfig, markers: MarkerConfig, output: OutputConfig) -> Self {
        Self {
            target,
            markers,
            output,
        }
    }

    /// Returns the target configuration.
    pub fn target(&self) -> &TargetConfig {
        &self.target
    }

    /// Returns the marker configuration.
    pub fn markers(&self) -> &MarkerConfig {
        &self.markers
    }

    /// Returns the output configuration.
    pub fn output(&self) -> &OutputConfig {
        &self.output
    }

    pub fn target_mut(&mut self) -> &mut TargetConfig {
        &mut self.target
    }

    pub fn markers_mut(&mut self) -> &mut MarkerConfig {
        &mut self.markers
    }

    pub fn output_mut(&mut self) -> &mut OutputConfig {
        &mut self.output
    }
}

/// Layout target for the bundled front end.
///
/// Unset fields fall back to the host.
#[derive(Debug, Default, Clone, Deserialize)]
pub struct TargetConfig {
    /// Data model name: `lp64`, `llp64`, or `ilp32`.
    #[serde(default)]
    data_model: Option<String>,

    /// Whether plain `char` is signed.
    #[serde(default)]
    char_signed: Option<bool>,
}

impl TargetConfig {
    pub fn set_data_model(&mut self, data_model: impl Into<String>) {
        self.data_model = Some(data_model.into());
    }

    pub fn set_char_signed(&mut self, char_signed: bool) {
        self.char_signed = Some(char_signed);
    }

    /// Returns the parsed [`DataModel`], or the host's if none is configured.
    ///
    /// # Errors
    ///
    /// Returns an error if the configured name is not a known data model.
    pub fn data_model(&self) -> Result<DataModel, String> {
        self.data_model
            .as_deref()
            .map(str::parse::<DataModel>)
            .transpose()
            .map(|model| model.unwrap_or(DataModel::host()))
            .map_err(|err| format!("Invalid data model in config: {err}"))
    }

    pub fn char_signed(&self) -> bool {
        self.char_signed.unwrap_or(CHAR_IS_SIGNED)
    }

    /// Returns the front end configuration for this target.
    ///
    /// # Errors
    ///
    /// Returns an error if the configured data model is invalid.
    pub fn target_config(&self) -> Result<ParserTarget, String> {
        Ok(ParserTarget::new(self.data_model()?, self.char_signed()))
    }
}

/// Annotation names.
#[derive(Debug, Clone, Deserialize)]
pub struct MarkerConfig {
    /// Annotation selecting extraction roots.
    #[serde(default = "default_root_marker")]
    root: String,

    /// Annotation rendering `char` arrays and pointers as text.
    #[serde(default = "default_text_marker")]
    text: String,
}

fn default_root_marker() -> String {
    ROOT_MARKER.to_string()
}

fn default_text_marker() -> String {
    DEFAULT_TEXT_ANNOTATION.to_string()
}

impl Default for MarkerConfig {
    fn default() -> Self {
        Self {
            root: default_root_marker(),
            text: default_text_marker(),
        }
    }
}

impl MarkerConfig {
    pub fn root(&self) -> &str {
        &self.root
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn set_root(&mut self, root: impl Into<String>) {
        self.root = root.into();
    }
}

/// Output selection for `generate`.
#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    /// Emit the built-in scalar descriptors.
    #[serde(default = "default_true")]
    builtin_types: bool,

    /// Also write `<out>.json`.
    #[serde(default)]
    json: bool,

    /// Copy the runtime `typeinfo.h` next to the generated files.
    #[serde(default)]
    runtime_header: bool,
}

fn default_true() -> bool {
    true
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            builtin_types: true,
            json: false,
            runtime_header: false,
        }
    }
}

impl OutputConfig {
    pub fn builtin_types(&self) -> bool {
        self.builtin_types
    }

    pub fn json(&self) -> bool {
        self.json
    }

    pub fn runtime_header(&self) -> bool {
        self.runtime_header
    }

    pub fn set_builtin_types(&mut self, builtin_types: bool) {
        self.builtin_types = builtin_types;
    }

    pub fn set_json(&mut self, json: bool) {
        self.json = json;
    }

    pub fn set_runtime_header(&mut self, runtime_header: bool) {
        self.runtime_header = runtime_header;
    }
}
