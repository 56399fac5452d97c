//! Output module for crawl reports
//!
//! This module handles:
//! - Writing the full report as JSON
//! - Generating a markdown summary of the discovered attack surface
//! - Printing crawl statistics to stdout

mod markdown;
pub mod stats;

pub use markdown::{format_markdown_summary, generate_markdown_summary};
pub use stats::print_statistics;

use crate::crawler::CrawlReport;
use crate::RippleError;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// Writes the report as pretty-printed JSON
///
/// # Arguments
///
/// * `report` - The finished crawl report
/// * `output_path` - Destination file; created or truncated
///
/// # Returns
///
/// * `Ok(())` - Report written
/// * `Err(RippleError)` - The file could not be created or written
pub fn write_json_report(report: &CrawlReport, output_path: &Path) -> Result<(), RippleError> {
    let mut writer = BufWriter::new(File::create(output_path)?);
    serde_json::to_writer_pretty(&mut writer, report)?;
    writer.write_all(b"\n")?;
    writer.flush()?;

    tracing::info!("Report written to {}", output_path.display());
    Ok(())
}
