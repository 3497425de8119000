use std::{
    fs,
    path::{Path, PathBuf},
};

use tempfile::tempdir;

use typeinfo::{TypeInfoError, graph::TypeGraph};
use typeinfo_cli::{Args, Command, GenerateArgs, RenderArgs, run};

/// Demo headers live at the workspace root, not in the crate
fn demos_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .parent()
        .unwrap()
        .parent()
        .unwrap()
        .join("demos")
}

/// Collects all .h files from a directory
fn collect_headers(dir: PathBuf) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = fs::read_dir(&dir)
        .map(|entries| {
            entries
                .flatten()
                .map(|entry| entry.path())
                .filter(|path| path.is_file() && path.extension().and_then(|s| s.to_str()) == Some("h"))
                .collect()
        })
        .unwrap_or_default();

    files.sort();
    files
}

fn generate_args(paths: Vec<String>, output: &Path) -> GenerateArgs {
    GenerateArgs {
        paths,
        output: output.to_string_lossy().to_string(),
        recursive: false,
        no_builtin_types: false,
        json: true,
        runtime_header: false,
        data_model: None,
        root_marker: None,
    }
}

fn args(command: Command) -> Args {
    Args {
        command,
        config: None,
        log_level: "off".to_string(),
    }
}

fn load_graph(output: &Path) -> TypeGraph {
    let json = fs::read_to_string(output.with_extension("json")).expect("JSON output written");
    TypeGraph::from_json(&json).expect("JSON output reloads")
}

#[test]
fn e2e_smoke_test_valid_demos() {
    let temp_dir = tempdir().expect("Failed to create temp directory");

    let demos = collect_headers(demos_dir());
    assert!(!demos.is_empty(), "No demo headers found in demos/");

    let mut failed_demos = Vec::new();

    for demo_path in &demos {
        let output = temp_dir
            .path()
            .join(format!("{}_typeinfo", demo_path.file_stem().unwrap().to_string_lossy()));
        let generate = generate_args(vec![demo_path.to_string_lossy().to_string()], &output);

        match run(&args(Command::Generate(generate))) {
            Ok(()) => {
                assert!(output.with_extension("h").is_file());
                assert!(output.with_extension("c").is_file());
                assert!(!load_graph(&output).is_empty(), "{} produced no types", demo_path.display());
            }
            Err(e) => failed_demos.push((demo_path.clone(), e)),
        }
    }

    if !failed_demos.is_empty() {
        eprintln!("\nDemos that failed:");
        for (path, err) in &failed_demos {
            eprintln!("  - {}: {}", path.display(), err);
        }
        panic!("{} demo(s) failed unexpectedly", failed_demos.len());
    }
}

#[test]
fn e2e_smoke_test_error_demos() {
    let temp_dir = tempdir().expect("Failed to create temp directory");

    let error_demos = collect_headers(demos_dir().join("errors"));
    assert!(!error_demos.is_empty(), "No error demos found in demos/errors/");

    for demo_path in &error_demos {
        let output = temp_dir.path().join("out");
        let generate = generate_args(vec![demo_path.to_string_lossy().to_string()], &output);

        match run(&args(Command::Generate(generate))) {
            Err(TypeInfoError::UnitsFailed { failed, total }) => {
                assert_eq!(failed.len(), 1);
                assert_eq!(total, 1);
            }
            other => panic!("{} should fail its unit, got {other:?}", demo_path.display()),
        }

        // Outputs are still written, just empty of the failed unit's types
        assert!(load_graph(&output).is_empty());
    }
}

#[test]
fn e2e_recursive_run_keeps_successful_units() {
    let temp_dir = tempdir().expect("Failed to create temp directory");
    let output = temp_dir.path().join("all");

    let mut generate = generate_args(vec![demos_dir().to_string_lossy().to_string()], &output);
    generate.recursive = true;
    generate.runtime_header = true;

    let Err(TypeInfoError::UnitsFailed { failed, total }) = run(&args(Command::Generate(generate))) else {
        panic!("error demos should make the run fail");
    };
    assert_eq!(failed.len(), 2);
    assert_eq!(total, collect_headers(demos_dir()).len() + 2);

    let graph = load_graph(&output);
    for name in ["Item", "Word", "Handler"] {
        assert!(graph.get_by_name(name).is_some(), "missing {name}");
    }
    assert!(graph.get_by_name("Flags").is_none());

    let source = fs::read_to_string(output.with_extension("c")).expect("source written");
    assert!(source.contains("#include \"all.h\""));
    assert!(temp_dir.path().join("typeinfo.h").is_file());
}

#[test]
fn e2e_directory_without_recursion_is_skipped() {
    let temp_dir = tempdir().expect("Failed to create temp directory");
    let output = temp_dir.path().join("none");

    let generate = generate_args(vec![demos_dir().to_string_lossy().to_string()], &output);
    run(&args(Command::Generate(generate))).expect("skipping is not an error");

    assert!(load_graph(&output).is_empty());
}

#[test]
fn e2e_render_memory_image() {
    let temp_dir = tempdir().expect("Failed to create temp directory");
    let output = temp_dir.path().join("inventory");

    let demo = demos_dir().join("inventory.h");
    let generate = generate_args(vec![demo.to_string_lossy().to_string()], &output);
    run(&args(Command::Generate(generate))).expect("inventory demo generates");

    // Every byte set to one reads the same in either byte order
    let image = temp_dir.path().join("word.bin");
    fs::write(&image, [1u8; 4]).expect("write image");

    let render = RenderArgs {
        graph: output.with_extension("json").to_string_lossy().to_string(),
        type_name: "Word".to_string(),
        image: image.to_string_lossy().to_string(),
        base: 0x1000,
        address: None,
    };
    run(&args(Command::Render(render))).expect("Word renders");

    let graph = load_graph(&output);
    let text = typeinfo::Generator::default()
        .render(
            &graph,
            "Word",
            typeinfo::memory::ByteImage::new(0x1000, vec![1; 4]),
            0x1000,
        )
        .expect("Word renders");
    assert_eq!(
        text,
        "union Word {\n  raw = 16843009\n  as_float = 0.000000\n  bytes = [\n    1\n    1\n    1\n    1\n  ]\n  \
         halves = struct  {\n    low = 257\n    high = 257\n  }\n}\n"
    );
}

#[test]
fn e2e_render_unknown_type() {
    let temp_dir = tempdir().expect("Failed to create temp directory");
    let output = temp_dir.path().join("inventory");

    let demo = demos_dir().join("inventory.h");
    run(&args(Command::Generate(generate_args(
        vec![demo.to_string_lossy().to_string()],
        &output,
    ))))
    .expect("inventory demo generates");

    let image = temp_dir.path().join("empty.bin");
    fs::write(&image, []).expect("write image");

    let render = RenderArgs {
        graph: output.with_extension("json").to_string_lossy().to_string(),
        type_name: "Missing".to_string(),
        image: image.to_string_lossy().to_string(),
        base: 0,
        address: None,
    };
    let err = run(&args(Command::Render(render))).unwrap_err();
    assert!(matches!(err, TypeInfoError::UnknownType(name) if name == "Missing"));
}
