//! Count-based retention: decide which artifacts to evict

use crate::config::RetentionMode;
use crate::transport::ArtifactMetadata;
use std::num::NonZeroUsize;

/// Outcome of one retention decision
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetentionDecision {
    pub evict: bool,
    pub victim: Option<ArtifactMetadata>,
}

impl RetentionDecision {
    pub fn keep() -> Self {
        Self {
            evict: false,
            victim: None,
        }
    }

    pub fn evict(victim: ArtifactMetadata) -> Self {
        Self {
            evict: true,
            victim: Some(victim),
        }
    }
}

/// Oldest artifact by modification time; ties go to the earliest listed
pub fn oldest(existing: &[ArtifactMetadata]) -> Option<&ArtifactMetadata> {
    // min_by_key returns the first of equal minima
    existing.iter().min_by_key(|a| a.modified)
}

/// Evict one artifact iff there are more than `max_backups`
///
/// `None` means unlimited retention and never evicts.
pub fn decide(existing: &[ArtifactMetadata], max_backups: Option<NonZeroUsize>) -> RetentionDecision {
    let Some(max) = max_backups else {
        return RetentionDecision::keep();
    };

    if existing.len() <= max.get() {
        return RetentionDecision::keep();
    }

    match oldest(existing) {
        Some(victim) => RetentionDecision::evict(victim.clone()),
        None => RetentionDecision::keep(),
    }
}

/// Artifacts to evict in one pass, oldest first
///
/// `SingleEviction` removes at most one artifact even when the backlog is
/// larger; `DrainToLimit` repeats the decision until the limit holds.
pub fn plan(
    existing: &[ArtifactMetadata],
    max_backups: Option<NonZeroUsize>,
    mode: RetentionMode,
) -> Vec<ArtifactMetadata> {
    let mut remaining = existing.to_vec();
    let mut victims = Vec::new();

    while let Some(victim) = decide(&remaining, max_backups).victim {
        remaining.retain(|a| a.name != victim.name);
        victims.push(victim);

        if mode == RetentionMode::SingleEviction {
            break;
        }
    }

    victims
}
