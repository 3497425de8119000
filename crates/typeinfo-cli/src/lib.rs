//! CLI logic for the typeinfo tool.
//!
//! `generate` extracts the marked types of C sources and writes their
//! descriptors; `render` prints a value from a memory image through a graph
//! written by `generate --json`.

pub mod error_adapter;

mod args;
mod config;
mod sources;

pub use args::{Args, Command, GenerateArgs, RenderArgs};

use std::{fs, path::Path};

use log::{error, info};

use typeinfo::{
    Generator, TypeInfoError, config::AppConfig, emit::Generation, graph::TypeGraph,
    memory::ByteImage,
};

/// Run the typeinfo CLI application
///
/// # Errors
///
/// Returns `TypeInfoError` for:
/// - Configuration loading errors
/// - File I/O errors
/// - `TypeInfoError::UnitsFailed` if `generate` could not process every
///   unit; the outputs of the remaining units are written first
/// - Rendering a type that is not in the graph
pub fn run(args: &Args) -> Result<(), TypeInfoError> {
    let app_config = config::load_config(args.config.as_ref())?;

    match &args.command {
        Command::Generate(generate_args) => generate(generate_args, app_config),
        Command::Render(render_args) => render(render_args, app_config),
    }
}

fn generate(args: &GenerateArgs, mut app_config: AppConfig) -> Result<(), TypeInfoError> {
    if let Some(data_model) = &args.data_model {
        app_config.target_mut().set_data_model(data_model.as_str());
    }
    if let Some(root_marker) = &args.root_marker {
        app_config.markers_mut().set_root(root_marker.as_str());
    }
    let output = app_config.output_mut();
    if args.no_builtin_types {
        output.set_builtin_types(false);
    }
    if args.json {
        output.set_json(true);
    }
    if args.runtime_header {
        output.set_runtime_header(true);
    }

    info!(output = args.output, paths:? = args.paths; "Generating type descriptors");

    let generator = Generator::new(app_config);
    let mut generation = Generation::new();
    let mut failures = Vec::new();

    for path in &args.paths {
        let files = match sources::collect_sources(Path::new(path), args.recursive) {
            Ok(files) => files,
            Err(err) => {
                error!(path; "Cannot expand path");
                generation.add_failure(path.as_str());
                failures.push(err);
                continue;
            }
        };

        for file in files {
            let name = file.to_string_lossy().into_owned();
            let source = match fs::read_to_string(&file) {
                Ok(source) => source,
                Err(err) => {
                    error!(file = name; "Cannot read unit");
                    generation.add_failure(name);
                    failures.push(TypeInfoError::Read { path: file, err });
                    continue;
                }
            };

            // A failing unit is already recorded in the generation.
            if let Err(err) = generator.add_unit(&mut generation, &source, &name) {
                error!(file = name; "Unit failed");
                failures.push(err);
            }
        }
    }

    let written = generator.write_outputs(generation.graph(), Path::new(&args.output))?;
    for path in &written {
        info!(path = path.display().to_string(); "Generated");
    }
    info!(
        units = generation.units(),
        failed = generation.failed_units().len(),
        types = generation.graph().len();
        "Generation finished"
    );

    if failures.is_empty() {
        Ok(())
    } else {
        Err(TypeInfoError::UnitsFailed {
            failed: failures,
            total: generation.units(),
        })
    }
}

fn render(args: &RenderArgs, app_config: AppConfig) -> Result<(), TypeInfoError> {
    info!(graph = args.graph, type_name = args.type_name, image = args.image; "Rendering value");

    let json = fs::read_to_string(&args.graph).map_err(|err| TypeInfoError::Read {
        path: args.graph.clone().into(),
        err,
    })?;
    let graph = TypeGraph::from_json(&json)?;

    let bytes = fs::read(&args.image).map_err(|err| TypeInfoError::Read {
        path: args.image.clone().into(),
        err,
    })?;
    let image = ByteImage::new(args.base, bytes);

    let generator = Generator::new(app_config);
    let text = generator.render(&graph, &args.type_name, image, args.address.unwrap_or(args.base))?;
    print!("{text}");

    Ok(())
}
