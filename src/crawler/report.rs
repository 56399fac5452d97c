use crate::artifacts::{ArtifactCategory, ArtifactEntry, FormRecord};
use crate::url::Target;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;

/// Final output of a crawl
#[derive(Debug, Clone, Serialize)]
pub struct CrawlReport {
    /// The locked target
    pub target: Target,

    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,

    /// SHA-256 of the configuration file, when one was loaded
    #[serde(skip_serializing_if = "Option::is_none")]
    pub config_hash: Option<String>,

    /// Entries fetched (any HTTP status)
    pub processed: u64,

    /// Entries whose fetch failed at the transport level
    pub failed: u64,

    /// URLs admitted to the frontier
    pub enqueued: u64,

    /// Distinct URLs withheld by robots.txt
    pub disallowed: u64,

    /// Every artifact category, each sorted by value
    pub artifacts: BTreeMap<ArtifactCategory, Vec<ArtifactEntry>>,

    /// Forms with their inputs
    pub forms: Vec<FormRecord>,
}

impl CrawlReport {
    /// Values recorded under a category
    pub fn values(&self, category: ArtifactCategory) -> Vec<&str> {
        self.artifacts
            .get(&category)
            .map(|entries| entries.iter().map(|e| e.value.as_str()).collect())
            .unwrap_or_default()
    }

    /// Number of values recorded under a category
    pub fn count(&self, category: ArtifactCategory) -> usize {
        self.artifacts.get(&category).map_or(0, Vec::len)
    }

    /// Total number of artifacts across categories
    pub fn total_artifacts(&self) -> usize {
        self.artifacts.values().map(Vec::len).sum()
    }

    /// Returns true if any category holds `value`
    pub fn contains_anywhere(&self, value: &str) -> bool {
        self.artifacts
            .values()
            .flatten()
            .any(|entry| entry.value == value)
    }

    /// Wall-clock duration of the crawl in seconds
    pub fn duration_seconds(&self) -> i64 {
        (self.finished_at - self.started_at).num_seconds()
    }
}
