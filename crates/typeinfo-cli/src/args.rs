//! Command-line argument definitions for the typeinfo CLI.
//!
//! This module defines the [`Args`] structure parsed from the command line
//! using [`clap`]. The `generate` subcommand turns C sources into descriptor
//! files; `render` prints a value from a raw memory image through a graph
//! written by `generate --json`.

use clap::{Parser, Subcommand};

/// Command-line arguments for the typeinfo tool
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,

    /// Path to configuration file (TOML)
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    /// Log level (off, error, warn, info, debug, trace)
    #[arg(long, default_value = "info", global = true)]
    pub log_level: String,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Generate type descriptors for the marked types of C sources
    Generate(GenerateArgs),
    /// Render a value from a memory image
    Render(RenderArgs),
}

#[derive(clap::Args, Debug)]
pub struct GenerateArgs {
    /// Source files (.h, .c) or directories
    #[arg(required = true)]
    pub paths: Vec<String>,

    /// Output path without extension; writes `<output>.h` and `<output>.c`
    #[arg(short, long)]
    pub output: String,

    /// Descend into directories
    #[arg(short = 'R', long)]
    pub recursive: bool,

    /// Do not emit the built-in scalar descriptors
    #[arg(long)]
    pub no_builtin_types: bool,

    /// Also write `<output>.json`
    #[arg(long)]
    pub json: bool,

    /// Copy the runtime `typeinfo.h` next to the outputs
    #[arg(long)]
    pub runtime_header: bool,

    /// Target data model (lp64, llp64, ilp32)
    #[arg(long)]
    pub data_model: Option<String>,

    /// Annotation marking extraction roots
    #[arg(long)]
    pub root_marker: Option<String>,
}

#[derive(clap::Args, Debug)]
pub struct RenderArgs {
    /// Graph document written by `generate --json`
    pub graph: String,

    /// Name of the type to render
    pub type_name: String,

    /// Raw memory image file
    pub image: String,

    /// Address the first byte of the image is mapped at
    #[arg(long, default_value = "0", value_parser = parse_address)]
    pub base: u64,

    /// Address of the value; defaults to the base address
    #[arg(long, value_parser = parse_address)]
    pub address: Option<u64>,
}

/// Parses a decimal or `0x`-prefixed hexadecimal address.
fn parse_address(text: &str) -> Result<u64, String> {
    let parsed = match text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
        Some(hex) => u64::from_str_radix(hex, 16),
        None => text.parse(),
    };
    parsed.map_err(|err| format!("invalid address `{text}`: {err}"))
}
