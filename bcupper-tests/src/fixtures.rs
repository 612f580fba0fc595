//! Test fixtures and sample data

use bcupper::transport::ArtifactMetadata;
use chrono::{Local, TimeZone, Utc};
use std::fs;
use std::path::{Path, PathBuf};

/// Populate `root` with a small nested tree and return it
pub fn sample_tree(root: &Path) -> PathBuf {
    fs::create_dir_all(root.join("albums/2024")).expect("Failed to create tree");
    fs::create_dir_all(root.join("empty")).expect("Failed to create tree");
    fs::write(root.join("readme.txt"), "sample tree").expect("Failed to write file");
    fs::write(root.join("albums/cover.jpg"), vec![0xAB; 1024]).expect("Failed to write file");
    fs::write(root.join("albums/2024/beach.jpg"), vec![0xCD; 4096]).expect("Failed to write file");
    root.to_path_buf()
}

/// Artifact name for `source` as if taken at noon (local time) on 2024-01-`day`
pub fn artifact_name(day: u32, source: &str) -> String {
    let taken = Local
        .with_ymd_and_hms(2024, 1, day, 12, 0, 0)
        .single()
        .expect("Unambiguous fixture time");
    bcupper::utils::archive_name(&taken, Path::new(source))
}

/// Artifact metadata at noon UTC on 2024-01-`day`
pub fn artifact_at(name: &str, day: u32) -> ArtifactMetadata {
    ArtifactMetadata::new(name, Utc.with_ymd_and_hms(2024, 1, day, 12, 0, 0).unwrap())
}

/// `count` artifacts for `source`, one per day starting 2024-01-01, oldest first
pub fn sample_artifacts(count: u32, source: &str) -> Vec<ArtifactMetadata> {
    (1..=count)
        .map(|day| artifact_at(&artifact_name(day, source), day))
        .collect()
}

/// Create existing backups in a local destination, one per day, oldest first
pub fn seed_local_backups(destination: &Path, count: u32, source: &str) -> Vec<String> {
    fs::create_dir_all(destination).expect("Failed to create destination");
    (1..=count)
        .map(|day| {
            let name = artifact_name(day, source);
            fs::write(destination.join(&name), format!("old backup {}", day))
                .expect("Failed to seed backup");
            name
        })
        .collect()
}

/// Config as deployed before bcupper gained TOML support
pub fn deployed_config_json(source: &Path, destination: &Path) -> String {
    format!(
        r#"{{
    "directories": [
        {{
            "source": "{}",
            "destination": "{}",
            "max_backups": 2
        }}
    ]
}}"#,
        source.display().to_string().replace('\\', "/"),
        destination.display().to_string().replace('\\', "/")
    )
}
