//! Crawl statistics for the terminal

use crate::artifacts::ArtifactCategory;
use crate::crawler::CrawlReport;

/// Counters derived from a report
#[derive(Debug, Clone, PartialEq)]
pub struct CrawlStatistics {
    pub processed: u64,
    pub failed: u64,
    pub enqueued: u64,
    pub disallowed: u64,

    /// Non-empty categories, largest first
    pub by_category: Vec<(ArtifactCategory, usize)>,

    pub total_artifacts: usize,
}

impl CrawlStatistics {
    pub fn from_report(report: &CrawlReport) -> Self {
        let mut by_category: Vec<_> = ArtifactCategory::ALL
            .iter()
            .map(|category| (*category, report.count(*category)))
            .filter(|(_, count)| *count > 0)
            .collect();
        by_category.sort_by(|a, b| b.1.cmp(&a.1));

        Self {
            processed: report.processed,
            failed: report.failed,
            enqueued: report.enqueued,
            disallowed: report.disallowed,
            by_category,
            total_artifacts: report.total_artifacts(),
        }
    }

    /// Share of fetch attempts that reached the server, as a percentage
    pub fn success_rate(&self) -> f64 {
        let attempts = self.processed + self.failed;
        if attempts == 0 {
            return 0.0;
        }
        (self.processed as f64 / attempts as f64) * 100.0
    }
}

/// Prints statistics to stdout in a formatted manner
///
/// # Arguments
///
/// * `report` - The finished crawl report
pub fn print_statistics(report: &CrawlReport) {
    let stats = CrawlStatistics::from_report(report);

    println!("=== Crawl Statistics ===\n");

    println!("Overview:");
    println!("  Target: {}", report.target.entry_url);
    println!("  Scope: *.{}", report.target.root_domain);
    println!("  Duration: {}s", report.duration_seconds());
    println!();

    println!("Fetching:");
    println!("  Processed: {}", stats.processed);
    println!("  Failed: {}", stats.failed);
    println!("  Enqueued: {}", stats.enqueued);
    println!("  Disallowed by robots.txt: {}", stats.disallowed);
    println!();

    println!("Artifacts ({}):", stats.total_artifacts);
    for (category, count) in &stats.by_category {
        println!("  {}: {}", category, count);
    }
    println!();

    println!(
        "Success Rate: {:.1}% ({} / {} fetches completed)",
        stats.success_rate(),
        stats.processed,
        stats.processed + stats.failed
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artifacts::ArtifactEntry;
    use crate::url::Target;
    use chrono::Utc;
    use std::collections::BTreeMap;
    use url::Url;

    fn entries(n: usize) -> Vec<ArtifactEntry> {
        (0..n)
            .map(|i| ArtifactEntry {
                value: format!("https://example.com/{}", i),
                source: "https://example.com/".to_string(),
                context: "a[href]".to_string(),
            })
            .collect()
    }

    #[test]
    fn test_statistics_from_report() {
        let mut artifacts = BTreeMap::new();
        artifacts.insert(ArtifactCategory::Pages, entries(3));
        artifacts.insert(ArtifactCategory::Files, entries(5));
        artifacts.insert(ArtifactCategory::Emails, Vec::new());

        let report = CrawlReport {
            target: Target::from_effective_url(Url::parse("https://example.com/").unwrap()).unwrap(),
            started_at: Utc::now(),
            finished_at: Utc::now(),
            config_hash: None,
            processed: 3,
            failed: 1,
            enqueued: 4,
            disallowed: 2,
            artifacts,
            forms: Vec::new(),
        };

        let stats = CrawlStatistics::from_report(&report);
        assert_eq!(
            stats.by_category,
            vec![(ArtifactCategory::Files, 5), (ArtifactCategory::Pages, 3)]
        );
        assert_eq!(stats.total_artifacts, 8);
        assert!((stats.success_rate() - 75.0).abs() < f64::EPSILON);
    }
}
