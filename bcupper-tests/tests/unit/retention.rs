//! Unit tests for the retention decision

use bcupper::config::RetentionMode;
use bcupper::strategies::{decide, oldest, plan};
use rstest::rstest;
use std::num::NonZeroUsize;
use test_utils::{artifact_at, sample_artifacts};

#[rstest]
#[case(0, Some(3), false)]
#[case(2, Some(3), false)]
#[case(3, Some(3), false)]
#[case(4, Some(3), true)]
#[case(10, None, false)]
fn test_decide_evicts_only_above_limit(
    #[case] existing: u32,
    #[case] max_backups: Option<usize>,
    #[case] evict: bool,
) {
    let listing = sample_artifacts(existing, "photos");
    let decision = decide(&listing, max_backups.and_then(NonZeroUsize::new));
    assert_eq!(decision.evict, evict);
    if evict {
        assert_eq!(decision.victim.unwrap().name, listing[0].name);
    } else {
        assert!(decision.victim.is_none());
    }
}

#[test]
fn test_oldest_ignores_listing_order() {
    let mut listing = sample_artifacts(4, "photos");
    listing.reverse();
    assert_eq!(oldest(&listing).unwrap(), &listing[3]);
}

#[test]
fn test_oldest_tie_keeps_first_listed() {
    let listing = vec![artifact_at("b.tar.gz", 1), artifact_at("a.tar.gz", 1)];
    assert_eq!(oldest(&listing).unwrap().name, "b.tar.gz");
}

#[test]
fn test_single_eviction_removes_one_even_when_far_over() {
    let listing = sample_artifacts(6, "photos");
    let victims = plan(&listing, NonZeroUsize::new(2), RetentionMode::SingleEviction);
    assert_eq!(victims.len(), 1);
    assert_eq!(victims[0].name, listing[0].name);
}

#[test]
fn test_drain_to_limit_removes_oldest_first() {
    let listing = sample_artifacts(6, "photos");
    let victims = plan(&listing, NonZeroUsize::new(2), RetentionMode::DrainToLimit);
    let names: Vec<_> = victims.iter().map(|v| v.name.clone()).collect();
    let expected: Vec<_> = listing[..4].iter().map(|a| a.name.clone()).collect();
    assert_eq!(names, expected);
}
