use psbshell::context::ShellContext;
use psbshell::extract::{ExtractOptions, Extractor};
use psbshell::shell::{Registry, ShellKind};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

const KEY: &str = "5fWhAHhxlXclLf";
const MANIFEST_NAME: &str = "sample_info.psb.m";

/// Build a manifest + blob pair under `dir`.
///
/// Each payload is wrapped in an MZS shell with its entry key
/// (caller key + entry name + suffix); the manifest document is wrapped in
/// an MDF shell with the archive key (caller key + manifest file name).
fn build_archive(dir: &Path, entries: &[(&str, &[u8])], suffix: &str) -> PathBuf {
    let registry = Registry::new();

    let mut blob = Vec::new();
    let mut file_info = serde_json::Map::new();
    for (name, payload) in entries {
        let mut ctx = ShellContext::with_key(format!("{KEY}{name}{suffix}"));
        let wrapped = registry.wrap(ShellKind::Mzs, payload, &mut ctx).unwrap();
        file_info.insert(
            name.to_string(),
            serde_json::json!([blob.len() as u64, wrapped.len() as u64]),
        );
        blob.extend_from_slice(&wrapped);
    }

    let directory = serde_json::json!({
        "expire_suffix_list": [suffix],
        "file_info": file_info,
    });
    let mut ctx = ShellContext::with_key(format!("{KEY}{MANIFEST_NAME}"));
    let manifest = registry
        .wrap(ShellKind::Mdf, directory.to_string().as_bytes(), &mut ctx)
        .unwrap();

    let manifest_path = dir.join(MANIFEST_NAME);
    fs::write(&manifest_path, manifest).unwrap();
    fs::write(dir.join("sample_body.bin"), blob).unwrap();
    manifest_path
}

fn entry_payloads() -> Vec<(&'static str, Vec<u8>)> {
    vec![
        ("chara01", b"chara01 animation payload bytes".to_vec()),
        ("chara02", (0..4096u32).flat_map(|i| (i % 256).to_le_bytes()).collect()),
        ("effect", b"short".to_vec()),
    ]
}

#[test]
fn extracts_all_entries_raw() {
    let tmp = TempDir::new().unwrap();
    let payloads = entry_payloads();
    let refs: Vec<(&str, &[u8])> = payloads.iter().map(|(n, p)| (*n, p.as_slice())).collect();
    let manifest = build_archive(tmp.path(), &refs, ".psb");

    let out = tmp.path().join("out");
    let opts = ExtractOptions {
        raw: true,
        out_dir: Some(out.clone()),
        ..Default::default()
    };
    let summary = Extractor::default().extract(&manifest, KEY, &opts).unwrap();

    assert_eq!(summary.succeeded, 3);
    assert_eq!(summary.total, 3);
    assert!(!summary.directory_only);
    for (name, payload) in &payloads {
        let written = fs::read(out.join(format!("{name}.psb"))).unwrap();
        assert_eq!(&written, payload, "mismatch for entry {name}");
    }
}

#[test]
fn parallel_and_sequential_outputs_are_identical() {
    let tmp = TempDir::new().unwrap();
    let payloads = entry_payloads();
    let refs: Vec<(&str, &[u8])> = payloads.iter().map(|(n, p)| (*n, p.as_slice())).collect();
    let manifest = build_archive(tmp.path(), &refs, ".psb");

    let extractor = Extractor::default();
    let mut outputs = Vec::new();
    for parallel in [false, true] {
        let out = tmp.path().join(if parallel { "par" } else { "seq" });
        let opts = ExtractOptions {
            parallel,
            raw: true,
            out_dir: Some(out.clone()),
            ..Default::default()
        };
        let summary = extractor.extract(&manifest, KEY, &opts).unwrap();
        assert_eq!(summary.succeeded, summary.total);

        let mut files: Vec<(String, Vec<u8>)> = fs::read_dir(&out)
            .unwrap()
            .map(|e| {
                let e = e.unwrap();
                (e.file_name().to_string_lossy().into_owned(), fs::read(e.path()).unwrap())
            })
            .collect();
        files.sort();
        outputs.push(files);
    }
    assert_eq!(outputs[0], outputs[1]);
}

#[test]
fn bare_entries_reconstruct_blob_slices() {
    // Two bare (shell-less) entries over a 24-byte blob: extraction must
    // reproduce the exact slices.
    let tmp = TempDir::new().unwrap();
    let registry = Registry::new();

    let blob = vec![0xABu8; 24];
    let directory = serde_json::json!({
        "expire_suffix_list": [""],
        "file_info": { "a": [0, 16], "b": [16, 8] },
    });
    let mut ctx = ShellContext::with_key(format!("{KEY}{MANIFEST_NAME}"));
    let manifest = registry
        .wrap(ShellKind::Mdf, directory.to_string().as_bytes(), &mut ctx)
        .unwrap();
    let manifest_path = tmp.path().join(MANIFEST_NAME);
    fs::write(&manifest_path, manifest).unwrap();
    fs::write(tmp.path().join("sample_body.bin"), &blob).unwrap();

    let out = tmp.path().join("out");
    let opts = ExtractOptions {
        raw: true,
        out_dir: Some(out.clone()),
        ..Default::default()
    };
    let summary = Extractor::default().extract(&manifest_path, KEY, &opts).unwrap();
    assert_eq!(summary.succeeded, 2);

    assert_eq!(fs::read(out.join("a")).unwrap(), blob[..16]);
    assert_eq!(fs::read(out.join("b")).unwrap(), blob[16..24]);
}

#[test]
fn one_bad_entry_does_not_stop_the_batch() {
    let tmp = TempDir::new().unwrap();
    let registry = Registry::new();

    let blob = vec![0x55u8; 24];
    // Entry "b" claims 9999 bytes — far past the end of the blob.
    let directory = serde_json::json!({
        "expire_suffix_list": [""],
        "file_info": { "a": [0, 16], "b": [16, 9999] },
    });
    let mut ctx = ShellContext::with_key(format!("{KEY}{MANIFEST_NAME}"));
    let manifest = registry
        .wrap(ShellKind::Mdf, directory.to_string().as_bytes(), &mut ctx)
        .unwrap();
    let manifest_path = tmp.path().join(MANIFEST_NAME);
    fs::write(&manifest_path, manifest).unwrap();
    fs::write(tmp.path().join("sample_body.bin"), &blob).unwrap();

    let out = tmp.path().join("out");
    let opts = ExtractOptions {
        raw: true,
        out_dir: Some(out.clone()),
        ..Default::default()
    };
    let summary = Extractor::default().extract(&manifest_path, KEY, &opts).unwrap();

    assert_eq!(summary.succeeded, 1);
    assert_eq!(summary.total, 2);
    assert_eq!(summary.errors.len(), 1);
    assert_eq!(summary.errors[0].name, "b");
    assert_eq!(fs::read(out.join("a")).unwrap(), blob[..16]);
    assert!(!out.join("b").exists());
}

#[test]
fn missing_blob_degrades_to_directory_only() {
    let tmp = TempDir::new().unwrap();
    let registry = Registry::new();

    let directory = serde_json::json!({
        "expire_suffix_list": [".psb"],
        "file_info": { "a": [0, 16] },
    });
    let mut ctx = ShellContext::with_key(format!("{KEY}{MANIFEST_NAME}"));
    let manifest = registry
        .wrap(ShellKind::Mdf, directory.to_string().as_bytes(), &mut ctx)
        .unwrap();
    let manifest_path = tmp.path().join(MANIFEST_NAME);
    fs::write(&manifest_path, manifest).unwrap();
    // No sample_body.bin on purpose.

    let out = tmp.path().join("out");
    let opts = ExtractOptions {
        out_dir: Some(out.clone()),
        ..Default::default()
    };
    let summary = Extractor::default().extract(&manifest_path, KEY, &opts).unwrap();

    assert!(summary.directory_only);
    assert_eq!(summary.succeeded, 0);
    assert_eq!(summary.total, 1);
    // The resx summary is still written on any successful manifest parse.
    assert!(out.join(format!("{MANIFEST_NAME}.resx.json")).exists());
}

#[test]
fn decompiled_mode_writes_json_with_raw_fallback() {
    let tmp = TempDir::new().unwrap();
    let json_payload = br#"{"width": 640, "height": 480}"#.to_vec();
    let binary_payload = vec![0x00u8, 0xFF, 0x12, 0x34, 0x56];
    let payloads: Vec<(&str, &[u8])> =
        vec![("scene", &json_payload), ("texture", &binary_payload)];
    let manifest = build_archive(tmp.path(), &payloads, ".psb");

    let out = tmp.path().join("out");
    let opts = ExtractOptions {
        out_dir: Some(out.clone()),
        ..Default::default()
    };
    let summary = Extractor::default().extract(&manifest, KEY, &opts).unwrap();
    assert_eq!(summary.succeeded, 2);

    // "scene" decompiles; "texture" falls back to the unwrapped bytes.
    let decompiled = fs::read_to_string(out.join("scene.psb.json")).unwrap();
    let value: serde_json::Value = serde_json::from_str(&decompiled).unwrap();
    assert_eq!(value["width"], 640);
    assert_eq!(fs::read(out.join("texture.psb")).unwrap(), binary_payload);
}

#[test]
fn wrong_archive_key_is_fatal_at_manifest_stage() {
    let tmp = TempDir::new().unwrap();
    let payloads = entry_payloads();
    let refs: Vec<(&str, &[u8])> = payloads.iter().map(|(n, p)| (*n, p.as_slice())).collect();
    let manifest = build_archive(tmp.path(), &refs, ".psb");

    let opts = ExtractOptions {
        out_dir: Some(tmp.path().join("out")),
        ..Default::default()
    };
    assert!(Extractor::default().extract(&manifest, "wrong-key", &opts).is_err());
}

#[test]
fn resx_summary_records_key_material() {
    let tmp = TempDir::new().unwrap();
    let payloads = entry_payloads();
    let refs: Vec<(&str, &[u8])> = payloads.iter().map(|(n, p)| (*n, p.as_slice())).collect();
    let manifest = build_archive(tmp.path(), &refs, ".psb");

    let out = tmp.path().join("out");
    let opts = ExtractOptions {
        raw: true,
        out_dir: Some(out.clone()),
        ..Default::default()
    };
    Extractor::default().extract(&manifest, KEY, &opts).unwrap();

    let resx: serde_json::Value = serde_json::from_str(
        &fs::read_to_string(out.join(format!("{MANIFEST_NAME}.resx.json"))).unwrap(),
    )
    .unwrap();
    assert_eq!(resx["source"], MANIFEST_NAME);
    assert_eq!(resx["key"], KEY);
    assert_eq!(resx["suffix"], ".psb");
    assert_eq!(resx["entry_count"], 3);
}
