//! Local destination rotation through the real local transport

use bcupper::config::resolve_jobs;
use bcupper::managers::backup::{BackupManager, BackupSettings};
use bcupper::transport::DefaultTransportFactory;
use test_utils::{seed_local_backups, ConfigBuilder, MockSpaceProbe, TestContext};
use std::path::Path;

fn local_manager(ctx: &TestContext) -> BackupManager {
    let config = ctx.config().unwrap();
    BackupManager::with_components(
        BackupSettings::from_global(&config.global),
        resolve_jobs(config),
        Box::new(DefaultTransportFactory::from_global(&config.global)),
        Box::new(MockSpaceProbe::roomy()),
    )
}

#[test]
fn test_rotation_keeps_newest_two() {
    let builder = ConfigBuilder::new().add_local_directory("photos", Some(2));
    let destination = builder.destination_path("photos");
    let ctx = TestContext::from_builder(builder);
    let seeded = seed_local_backups(&destination, 2, "photos");

    let report = local_manager(&ctx).backup_all().reports.remove(0);

    let artifact = match &report.outcome {
        test_utils::JobOutcome::Success { artifact } => artifact.clone(),
        other => panic!("Expected success, got {:?}", other),
    };
    assert_eq!(report.evicted, vec![seeded[0].clone()]);
    assert_eq!(
        ctx.list_dir(&destination).unwrap(),
        vec![seeded[1].clone(), artifact]
    );
    assert!(ctx.staging_is_empty());
}

#[test]
fn test_unbounded_retention_keeps_everything() {
    let builder = ConfigBuilder::new().add_local_directory("photos", None);
    let destination = builder.destination_path("photos");
    let ctx = TestContext::from_builder(builder);
    seed_local_backups(&destination, 5, "photos");

    let summary = local_manager(&ctx).backup_all();

    assert_eq!(summary.succeeded(), 1);
    assert!(summary.reports[0].evicted.is_empty());
    assert_eq!(ctx.list_dir(&destination).unwrap().len(), 6);
}

#[test]
fn test_foreign_files_are_never_evicted() {
    let builder = ConfigBuilder::new().add_local_directory("photos", Some(1));
    let destination = builder.destination_path("photos");
    let ctx = TestContext::from_builder(builder);
    let seeded = seed_local_backups(&destination, 1, "photos");
    std::fs::write(destination.join("notes.txt"), "keep me").unwrap();

    let report = local_manager(&ctx).backup_all().reports.remove(0);

    assert_eq!(report.evicted, seeded);
    assert!(Path::new(&destination).join("notes.txt").exists());
}

#[test]
fn test_destination_is_created() {
    let builder = ConfigBuilder::new().add_local_directory("docs", Some(3));
    let destination = builder.destination_path("docs");
    let ctx = TestContext::from_builder(builder);
    assert!(!destination.exists());

    let summary = local_manager(&ctx).backup_all();

    assert_eq!(summary.succeeded(), 1);
    assert_eq!(ctx.list_dir(&destination).unwrap().len(), 1);
}
