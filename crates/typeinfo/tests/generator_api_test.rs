//! Integration tests for the Generator API
//!
//! These tests drive whole units through extraction, emission, and rendering.

use std::fs;

use typeinfo::{
    Generator, TypeInfoError,
    builtin::Builtin,
    config::AppConfig,
    descriptor::{TypeKind, TypeRef},
    emit::{Generation, RUNTIME_HEADER},
    graph::TypeGraph,
    memory::ByteImage,
};

const TYPES: &str = r#"
#include "typeinfo.h"

typedef struct {
    unsigned long x;
    unsigned long y;
} Bar;

typedef struct TI_ROOT {
    const char name[256] TI_ANN(CStr);
    int test;
    Bar* bar;
} Foo;

typedef enum TI_ROOT {
    COLOR_RED TI_ANN(Primary),
    COLOR_GREEN,
    COLOR_BLUE,
} Color;
"#;

fn lp64_generator(extra: &str) -> Generator {
    let config: AppConfig = toml::from_str(&format!(
        "[target]\ndata_model = \"lp64\"\nchar_signed = true\n{extra}"
    ))
    .expect("valid config");
    Generator::new(config)
}

fn target_generator(data_model: &str, char_signed: bool) -> Generator {
    let mut config = AppConfig::default();
    config.target_mut().set_data_model(data_model);
    config.target_mut().set_char_signed(char_signed);
    Generator::new(config)
}

#[test]
fn test_default_generator_uses_host_layouts() {
    let graph = Generator::default()
        .extract("struct TI_ROOT Pair { long a; char c; };", "pair.h")
        .expect("Failed to extract");

    let entry = graph.get_by_name("Pair").expect("Pair extracted");
    let TypeKind::Struct(pair) = &entry.descriptor.kind else {
        panic!("Pair is a struct");
    };
    assert_eq!(pair.members[0].ty, TypeRef::Builtin(Builtin::Long));
    assert_eq!(pair.members[1].ty, TypeRef::Builtin(Builtin::Char));
    assert_eq!(pair.members[1].offset, Builtin::Long.descriptor().size());
}

#[cfg(all(target_pointer_width = "64", unix))]
#[test]
fn test_render_ilp32_longs() {
    let generator = target_generator("ilp32", true);
    let graph = generator
        .extract("struct TI_ROOT Pair { long a; long b; };", "pair.h")
        .expect("Failed to extract");
    assert_eq!(graph.get_by_name("Pair").map(|entry| entry.descriptor.size()), Some(8));

    let mut bytes = 1i32.to_ne_bytes().to_vec();
    bytes.extend(2i32.to_ne_bytes());
    let text = generator
        .render(&graph, "Pair", ByteImage::new(0x1000, bytes), 0x1000)
        .expect("Failed to render");
    assert_eq!(text, "struct Pair {\n  a = 1\n  b = 2\n}\n");
}

#[test]
fn test_render_follows_target_char_signedness() {
    let source = "struct TI_ROOT Byte { char c; char name[3] TI_ANN(CStr); };";
    let image = || ByteImage::new(0x1000, vec![0xFF, b'o', b'k', 0]);

    for (char_signed, value) in [(false, "255"), (true, "-1")] {
        let generator = target_generator("lp64", char_signed);
        let graph = generator.extract(source, "byte.h").expect("Failed to extract");
        let text = generator
            .render(&graph, "Byte", image(), 0x1000)
            .expect("Failed to render");
        assert_eq!(text, format!("struct Byte {{\n  c = {value}\n  name = \"ok\"\n}}\n"));
    }
}

#[test]
fn test_extract_reaches_referenced_types() {
    let graph = lp64_generator("")
        .extract(TYPES, "types.h")
        .expect("Failed to extract");

    let names: Vec<String> = graph.iter().map(|(name, _)| name.to_name()).collect();
    assert_eq!(names, ["Foo", "Color", "Bar"]);
}

#[test]
fn test_generation_continues_after_failed_unit() {
    let generator = lp64_generator("");
    let mut generation = Generation::new();

    generator
        .add_unit(&mut generation, TYPES, "types.h")
        .expect("first unit extracts");

    let err = generator
        .add_unit(&mut generation, "struct TI_ROOT Broken { int x }", "broken.h")
        .unwrap_err();
    assert!(matches!(err, TypeInfoError::Parse { ref file, .. } if file == "broken.h"));

    let err = generator
        .add_unit(
            &mut generation,
            "struct TI_ROOT Flags { unsigned ready : 1; };",
            "flags.h",
        )
        .unwrap_err();
    assert!(err.to_string().contains("`ready`"), "{err}");

    generator
        .add_unit(
            &mut generation,
            "typedef struct { long y; } Bar; struct TI_ROOT Extra { Bar bar; };",
            "extra.h",
        )
        .expect("last unit extracts");

    assert!(!generation.is_success());
    assert_eq!(generation.failed_units(), ["broken.h", "flags.h"]);
    assert_eq!(generation.units(), 4);

    // `Bar` from extra.h is dropped in favor of the one from types.h.
    let graph = generation.into_graph();
    let names: Vec<String> = graph.iter().map(|(name, _)| name.to_name()).collect();
    assert_eq!(names, ["Foo", "Color", "Bar", "Extra"]);
    assert_eq!(graph.get_by_name("Bar").map(|entry| entry.descriptor.size()), Some(16));
}

#[test]
fn test_emitted_c_lists_each_type_once() {
    let generator = lp64_generator("");
    let graph = generator.extract(TYPES, "types.h").expect("Failed to extract");
    let sources = generator
        .emit_c(&graph, "out/types_typeinfo.h")
        .expect("Failed to emit");

    for name in ["Foo", "Color", "Bar"] {
        let declaration = format!(" typeinfo_{name}; // types.h:");
        assert_eq!(sources.header.matches(&declaration).count(), 1, "{name}");
    }
    assert!(sources.source.contains("(Type_Info*)&typeinfo_Bar"));
    assert!(sources.source.contains("(Type_Info*)&typeinfo_int,"));
    assert!(sources.source.contains("{ (char*[]){ \"Primary\", NULL }, \"COLOR_RED\", 0 },"));
    assert!(sources.source.contains("Type_Info_Integer typeinfo_int = "));
}

#[test]
fn test_write_outputs() {
    let dir = tempfile::tempdir().expect("temp dir");
    let generator = lp64_generator("[output]\njson = true\nruntime_header = true\n");
    let graph = generator.extract(TYPES, "types.h").expect("Failed to extract");

    let written = generator
        .write_outputs(&graph, &dir.path().join("types_typeinfo"))
        .expect("Failed to write");

    let names: Vec<String> = written
        .iter()
        .map(|path| path.file_name().unwrap().to_string_lossy().into_owned())
        .collect();
    assert_eq!(
        names,
        ["types_typeinfo.h", "types_typeinfo.c", "types_typeinfo.json", "typeinfo.h"]
    );

    let header = fs::read_to_string(dir.path().join("types_typeinfo.h")).unwrap();
    assert!(header.starts_with("#ifndef TYPES_TYPEINFO_H_\n"));
    let runtime = fs::read_to_string(dir.path().join("typeinfo.h")).unwrap();
    assert_eq!(runtime, RUNTIME_HEADER);

    let json = fs::read_to_string(dir.path().join("types_typeinfo.json")).unwrap();
    assert_eq!(TypeGraph::from_json(&json).expect("reloads"), graph);
}

#[cfg(all(target_pointer_width = "64", not(windows)))]
#[test]
fn test_render_through_reloaded_graph() {
    let generator = lp64_generator("");
    let graph = generator.extract(TYPES, "types.h").expect("Failed to extract");
    let graph = TypeGraph::from_json(&generator.emit_json(&graph).unwrap()).unwrap();

    let mut foo = vec![0u8; 272];
    foo[..4].copy_from_slice(b"ciao");
    foo[256..260].copy_from_slice(&2i32.to_ne_bytes());
    foo[264..272].copy_from_slice(&0x2000u64.to_ne_bytes());
    let mut bar = 5u64.to_ne_bytes().to_vec();
    bar.extend(6u64.to_ne_bytes());
    let image = ByteImage::new(0x1000, foo).with_region(0x2000, bar);

    let text = generator
        .render(&graph, "Foo", image, 0x1000)
        .expect("Failed to render");
    assert_eq!(
        text,
        "struct Foo {\n  const name = \"ciao\"\n  test = 2\n  bar = 0x2000 -> struct Bar {\n    x = 5\n    y = 6\n  }\n}\n"
    );

    let color = generator
        .render(&graph, "Color", ByteImage::new(0x3000, 2i32.to_ne_bytes().to_vec()), 0x3000)
        .unwrap();
    assert_eq!(color, "enum Color { COLOR_BLUE (2) }\n");
}

#[test]
fn test_render_unknown_type() {
    let err = Generator::default()
        .render(&TypeGraph::new(), "Missing", ByteImage::default(), 0x1000)
        .unwrap_err();
    assert_eq!(err.to_string(), "type `Missing` not found in graph");
}

#[test]
fn test_invalid_target_is_reported() {
    let config: AppConfig = toml::from_str("[target]\ndata_model = \"pdp11\"\n").unwrap();
    let err = Generator::new(config).extract(TYPES, "types.h").unwrap_err();
    assert!(matches!(err, TypeInfoError::Config(_)));
}

#[test]
fn test_oversized_record_is_a_parse_error() {
    let err = lp64_generator("")
        .extract("struct TI_ROOT Big { char a[0x2000000000000000]; };", "big.h")
        .unwrap_err();
    assert!(matches!(err, TypeInfoError::Parse { ref file, .. } if file == "big.h"), "{err:?}");
}
