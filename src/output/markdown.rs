//! Markdown summary generation
//!
//! This module generates human-readable markdown summaries of a crawl report,
//! including counters, per-category artifact listings and discovered forms.

use crate::artifacts::ArtifactCategory;
use crate::crawler::CrawlReport;
use crate::RippleError;
use std::fs::File;
use std::io::Write;
use std::path::Path;

/// Entries listed per category before the remainder is summarized
const MAX_LISTED: usize = 50;

/// Generates a markdown summary from a crawl report
///
/// # Arguments
///
/// * `report` - The finished crawl report
/// * `output_path` - Path where the markdown file should be written
///
/// # Returns
///
/// * `Ok(())` - Successfully wrote markdown summary
/// * `Err(RippleError)` - Failed to write summary
pub fn generate_markdown_summary(report: &CrawlReport, output_path: &Path) -> Result<(), RippleError> {
    let markdown = format_markdown_summary(report);

    let mut file = File::create(output_path)?;
    file.write_all(markdown.as_bytes())?;

    tracing::info!("Summary written to {}", output_path.display());
    Ok(())
}

/// Formats a crawl report as markdown
///
/// Empty categories are left out of the listings but still appear in the
/// overview table.
pub fn format_markdown_summary(report: &CrawlReport) -> String {
    let mut md = String::new();

    md.push_str("# Surface-Ripple Crawl Summary\n\n");

    // Run metadata
    md.push_str("## Run Information\n\n");
    md.push_str(&format!("- **Target**: {}\n", report.target.entry_url));
    md.push_str(&format!("- **Scope**: *.{}\n", report.target.root_domain));
    md.push_str(&format!("- **Started**: {}\n", report.started_at.to_rfc3339()));
    md.push_str(&format!("- **Finished**: {}\n", report.finished_at.to_rfc3339()));
    md.push_str(&format!(
        "- **Duration**: {} seconds\n",
        report.duration_seconds()
    ));
    if let Some(hash) = &report.config_hash {
        md.push_str(&format!("- **Config Hash**: {}\n", hash));
    }
    md.push('\n');

    // Counters
    md.push_str("## Crawl Statistics\n\n");
    md.push_str(&format!("- **Processed**: {}\n", report.processed));
    md.push_str(&format!("- **Failed**: {}\n", report.failed));
    md.push_str(&format!("- **Enqueued**: {}\n", report.enqueued));
    md.push_str(&format!("- **Disallowed by robots.txt**: {}\n", report.disallowed));
    md.push_str(&format!(
        "- **Total Artifacts**: {}\n\n",
        report.total_artifacts()
    ));

    // Category overview
    md.push_str("## Artifacts by Category\n\n");
    md.push_str("| Category | Count |\n");
    md.push_str("|----------|-------|\n");
    for category in ArtifactCategory::ALL {
        md.push_str(&format!("| {} | {} |\n", category, report.count(category)));
    }
    md.push('\n');

    // Listings
    for category in ArtifactCategory::ALL {
        // Forms get their own section with inputs
        if category == ArtifactCategory::Forms {
            continue;
        }

        let values = report.values(category);
        if values.is_empty() {
            continue;
        }

        md.push_str(&format!("## {} ({})\n\n", category, values.len()));
        for value in values.iter().take(MAX_LISTED) {
            md.push_str(&format!("- {}\n", value));
        }
        if values.len() > MAX_LISTED {
            md.push_str(&format!("\n... and {} more\n", values.len() - MAX_LISTED));
        }
        md.push('\n');
    }

    if !report.forms.is_empty() {
        md.push_str(&format!("## forms ({})\n\n", report.forms.len()));
        for form in &report.forms {
            md.push_str(&format!("### {} {}\n\n", form.method, form.action));
            if form.inputs.is_empty() {
                md.push_str("_no named inputs_\n\n");
                continue;
            }

            md.push_str("| Element | Name | Type |\n");
            md.push_str("|---------|------|------|\n");
            for input in &form.inputs {
                md.push_str(&format!(
                    "| {} | {} | {} |\n",
                    input.element, input.name, input.input_type
                ));
            }
            md.push('\n');
        }
    }

    md
}
