//! Import expansion through the public entry point, against real files.

use facet::{canonize, CanonizeOptions, ErrorCode};
use serde_json::json;
use std::path::Path;

fn write(dir: &Path, name: &str, contents: &str) {
    let path = dir.join(name);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(path, contents).unwrap();
}

fn options_for(dir: &Path) -> CanonizeOptions {
    CanonizeOptions {
        import_roots: vec![dir.to_path_buf()],
        ..CanonizeOptions::default()
    }
}

#[test]
fn imported_vars_participate_in_scope() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "defaults.fct", "@vars\n  tone: \"calm\"\n");
    let src = "@import \"defaults.fct\"\n@out\n  t: $tone\n";
    let out = canonize(src.as_bytes(), &options_for(dir.path())).unwrap();
    assert_eq!(out["out"]["t"], json!("calm"));
}

#[test]
fn local_vars_override_imported_ones() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "defaults.fct", "@vars\n  tone: \"calm\"\n");
    let src = "@import \"defaults.fct\"\n@vars\n  tone: \"sharp\"\n@out\n  t: $tone\n";
    let out = canonize(src.as_bytes(), &options_for(dir.path())).unwrap();
    assert_eq!(out["out"]["t"], json!("sharp"));
}

#[test]
fn subdirectory_imports_resolve() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "shared/base.fct", "@base\n  level: 1\n");
    let src = "@import \"shared/base.fct\"\n";
    let out = canonize(src.as_bytes(), &options_for(dir.path())).unwrap();
    assert_eq!(out["base"]["level"], json!(1));
}

#[test]
fn later_roots_are_fallbacks() {
    let first = tempfile::tempdir().unwrap();
    let second = tempfile::tempdir().unwrap();
    write(second.path(), "only_here.fct", "@found\n  at: \"second\"\n");
    let options = CanonizeOptions {
        import_roots: vec![first.path().to_path_buf(), second.path().to_path_buf()],
        ..CanonizeOptions::default()
    };
    let out = canonize(b"@import \"only_here.fct\"\n", &options).unwrap();
    assert_eq!(out["found"]["at"], json!("second"));
}

#[test]
fn list_bodies_concatenate_in_load_order() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "steps.fct", "@plan\n  - \"imported\"\n");
    let src = "@import \"steps.fct\"\n@plan\n  - \"local\"\n";
    let out = canonize(src.as_bytes(), &options_for(dir.path())).unwrap();
    assert_eq!(out["plan"]["items"], json!(["imported", "local"]));
}

#[test]
fn replace_strategy_discards_earlier_definition() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "fresh.fct", "@plan\n  - \"fresh\"\n");
    let src = concat!(
        "@plan\n  - \"stale\"\n",
        "@import(path=\"fresh.fct\", strategy=\"replace\")\n",
    );
    let out = canonize(src.as_bytes(), &options_for(dir.path())).unwrap();
    assert_eq!(out["plan"]["items"], json!(["fresh"]));
}

#[test]
fn strict_merge_rejects_shape_conflicts() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "listy.fct", "@mixed\n  - \"item\"\n");
    let src = "@import \"listy.fct\"\n@mixed\n  key: 1\n";
    let options = CanonizeOptions {
        import_roots: vec![dir.path().to_path_buf()],
        strict_merge: true,
        ..CanonizeOptions::default()
    };
    let err = canonize(src.as_bytes(), &options).unwrap_err();
    assert_eq!(err[0].code, ErrorCode::F605);
}

#[test]
fn escaping_paths_are_rejected_before_io() {
    let dir = tempfile::tempdir().unwrap();
    for bad in ["../up.fct", "/abs.fct", "https://x/y.fct"] {
        let src = format!("@import \"{}\"\n", bad);
        let err = canonize(src.as_bytes(), &options_for(dir.path())).unwrap_err();
        assert_eq!(err[0].code, ErrorCode::F601, "path {:?}", bad);
    }
}

#[test]
fn deep_import_chains_hit_the_depth_ceiling() {
    let dir = tempfile::tempdir().unwrap();
    let depth = facet::limits::MAX_IMPORT_DEPTH + 2;
    for i in 0..depth {
        let body = if i + 1 < depth {
            format!("@import \"f{}.fct\"\n", i + 1)
        } else {
            "@leaf\n  done: true\n".to_string()
        };
        write(dir.path(), &format!("f{}.fct", i), &body);
    }
    let err = canonize(b"@import \"f0.fct\"\n", &options_for(dir.path())).unwrap_err();
    assert_eq!(err[0].code, ErrorCode::F602);
}

#[test]
fn diamond_imports_load_once_and_merge() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "shared.fct", "@common\n  - \"entry\"\n");
    write(dir.path(), "a.fct", "@import \"shared.fct\"\n");
    write(dir.path(), "b.fct", "@import \"shared.fct\"\n");
    let src = "@import \"a.fct\"\n@import \"b.fct\"\n";
    let out = canonize(src.as_bytes(), &options_for(dir.path())).unwrap();
    // Both arms splice the shared facet; merge concatenates the lists.
    assert_eq!(out["common"]["items"], json!(["entry", "entry"]));
}

#[test]
fn errors_inside_imported_files_name_the_import() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "broken.fct", "@bad\n\tk: 1\n");
    let err = canonize(
        b"@import \"broken.fct\"\n",
        &options_for(dir.path()),
    )
    .unwrap_err();
    assert_eq!(err[0].code, ErrorCode::F002);
    assert!(err[0].message.contains("broken.fct"));
}
