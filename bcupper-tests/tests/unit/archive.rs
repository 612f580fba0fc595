//! Unit tests for archive production

use bcupper::utils::archive::{parse_artifact_timestamp, produce_archive};
use flate2::read::GzDecoder;
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use tar::Archive;
use test_utils::{artifact_name, sample_tree, TestContext};
use walkdir::WalkDir;

fn relative_files(root: &Path) -> Vec<PathBuf> {
    let mut files: Vec<_> = WalkDir::new(root)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .map(|e| e.path().strip_prefix(root).unwrap().to_path_buf())
        .collect();
    files.sort();
    files
}

#[test]
fn test_archive_extracts_to_source_tree() {
    let ctx = TestContext::new();
    let source = sample_tree(&ctx.temp_dir().join("photos"));
    let output = ctx.temp_dir().join("out").join(artifact_name(1, "photos"));
    fs::create_dir_all(output.parent().unwrap()).unwrap();

    let handle = produce_archive(&source, &output).unwrap();
    assert_eq!(handle.path, output);
    assert_eq!(handle.size, fs::metadata(&output).unwrap().len());

    let restore = ctx.create_subdir("restore");
    Archive::new(GzDecoder::new(File::open(&output).unwrap()))
        .unpack(&restore)
        .unwrap();

    let restored = restore.join("photos");
    assert_eq!(relative_files(&restored), relative_files(&source));
    assert!(restored.join("empty").is_dir());
    assert_eq!(
        fs::read(restored.join("albums/2024/beach.jpg")).unwrap(),
        fs::read(source.join("albums/2024/beach.jpg")).unwrap()
    );
}

#[test]
fn test_archive_of_missing_source_leaves_nothing() {
    let ctx = TestContext::new();
    let out_dir = ctx.create_subdir("out");
    let output = out_dir.join(artifact_name(1, "gone"));

    assert!(produce_archive(&ctx.temp_dir().join("gone"), &output).is_err());
    assert!(ctx.list_dir(&out_dir).unwrap().is_empty());
}

#[test]
fn test_fixture_names_carry_their_timestamp() {
    let first = parse_artifact_timestamp(&artifact_name(1, "photos")).unwrap();
    let second = parse_artifact_timestamp(&artifact_name(2, "photos")).unwrap();
    assert_eq!((second - first).num_hours(), 24);
}
