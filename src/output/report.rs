//! Run summary rendering
//!
//! This module renders the end-of-run summary as markdown and writes it
//! to the configured summary path.

use std::fs;
use std::path::Path;

use chrono::Utc;

use crate::output::stats::RunSummary;

/// Formats a run summary as markdown
///
/// # Arguments
///
/// * `summary` - The end-of-run totals
///
/// # Returns
///
/// A formatted markdown string
pub fn format_summary(summary: &RunSummary) -> String {
    let mut md = String::new();

    md.push_str("# Tidepool Crawl Summary\n\n");

    md.push_str("## Run Information\n\n");
    md.push_str(&format!("- **Written**: {}\n", Utc::now().to_rfc3339()));
    md.push_str(&format!(
        "- **Duration**: {:.1} seconds\n",
        summary.duration.as_secs_f64()
    ));
    let status = if summary.interrupted {
        "interrupted"
    } else {
        "completed"
    };
    md.push_str(&format!("- **Status**: {}\n\n", status));

    md.push_str("## Overall Totals\n\n");
    md.push_str(&format!("- **Pages Stored**: {}\n", summary.pages_stored));
    md.push_str(&format!("- **Assets Stored**: {}\n", summary.assets_stored));
    md.push_str(&format!("- **Duplicates Dropped**: {}\n", summary.duplicates));
    md.push_str(&format!("- **Oversize Dropped**: {}\n", summary.oversize));
    md.push_str(&format!("- **Retries Scheduled**: {}\n", summary.retries));
    md.push_str(&format!("- **Terminal Failures**: {}\n", summary.failures.len()));
    md.push_str(&format!(
        "- **Admission Rejections**: {}\n\n",
        summary.total_rejections()
    ));

    if !summary.domains.is_empty() {
        md.push_str("## Per-Domain Breakdown\n\n");
        md.push_str("| Domain | Pages | Assets | Duplicates | Oversize | Retries | Failures | Rejected |\n");
        md.push_str("|--------|-------|--------|------------|----------|---------|----------|----------|\n");
        for (domain, counters) in &summary.domains {
            md.push_str(&format!(
                "| {} | {} | {} | {} | {} | {} | {} | {} |\n",
                domain,
                counters.pages_stored,
                counters.assets_stored,
                counters.duplicates,
                counters.oversize,
                counters.retries,
                counters.failures,
                counters.rejected
            ));
        }
        md.push('\n');
    }

    if !summary.rejections.is_empty() {
        md.push_str("## Rejections by Check\n\n");
        md.push_str("| Check | Count |\n");
        md.push_str("|-------|-------|\n");
        for (label, count) in &summary.rejections {
            md.push_str(&format!("| {} | {} |\n", label, count));
        }
        md.push('\n');
    }

    if !summary.failures.is_empty() {
        md.push_str("## Failed URLs\n\n");
        for failure in &summary.failures {
            md.push_str(&format!("- {} ({})\n", failure.url, failure.reason));
        }
        md.push('\n');
    }

    md
}

/// Writes the formatted summary to `path`, creating parent directories
///
/// # Arguments
///
/// * `summary` - The end-of-run totals
/// * `path` - Destination of the summary file
pub fn write_summary(summary: &RunSummary, path: &Path) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    fs::write(path, format_summary(summary))
}
