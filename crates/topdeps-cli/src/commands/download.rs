//! Download command - fetch the most depended-upon packages

use console::style;
use std::path::Path;

use topdeps_registry::{DownloadReport, Downloader, Settings, Stage};

use crate::error::{CliError, Result};
use crate::util::preview_list;

/// Names listed per warning line
const PREVIEW: usize = 10;

/// Run the download pipeline on a single-threaded runtime
pub fn run(settings: Settings, count: usize, dest: &Path) -> Result<()> {
    let downloader = Downloader::new(settings)?;

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|e| CliError::internal(format!("Failed to start runtime: {}", e)))?;

    println!(
        "{} {} packages into {}",
        style("Downloading").cyan().bold(),
        count,
        dest.display()
    );

    let report = runtime.block_on(downloader.run(count, dest));

    println!();
    print_summary(&report);
    Ok(())
}

fn print_summary(report: &DownloadReport) {
    println!("{}:", style("Summary").bold());
    println!("  Requested:    {}", report.requested);
    if report.short_pages > 0 {
        println!(
            "  Pages:        {} ({} short)",
            report.pages_fetched, report.short_pages
        );
    } else {
        println!("  Pages:        {}", report.pages_fetched);
    }
    println!("  Names listed: {}", report.names_listed);
    println!("  Selected:     {}", report.selected.len());
    println!("  Resolved:     {}", report.resolved);
    println!("  Downloaded:   {}", report.downloaded());
    if !report.normalize.flattened.is_empty() {
        println!(
            "  Flattened:    {} scoped package(s) from {} scope(s)",
            report.normalize.flattened.len(),
            report.normalize.removed_scopes.len()
        );
    }
    println!();

    for stage in [Stage::Listing, Stage::Resolving, Stage::Fetching] {
        let failed: Vec<&str> = report
            .failures
            .iter()
            .filter(|f| f.stage == stage)
            .map(|f| f.message.as_str())
            .collect();
        if failed.is_empty() {
            continue;
        }

        println!(
            "  {} {} item(s) dropped while {}",
            style("[WARN]").yellow().bold(),
            failed.len(),
            stage
        );
        for message in failed.iter().take(PREVIEW) {
            println!("    {} {}", style("-").yellow(), message);
        }
    }

    if report.normalize.anomalies > 0 {
        println!(
            "  {} {} filesystem operation(s) skipped while flattening",
            style("[WARN]").yellow().bold(),
            report.normalize.anomalies
        );
    }

    if report.selected.len() < report.requested {
        println!(
            "  {} Only {} unique names listed",
            style("[WARN]").yellow().bold(),
            report.selected.len()
        );
    }

    if !report.missing.is_empty() {
        println!(
            "  {} Missing: {}",
            style("[WARN]").yellow().bold(),
            preview_list(&report.missing, PREVIEW)
        );
    }

    if report.is_complete() {
        println!(
            "  {} All {} packages downloaded",
            style("[OK]").green().bold(),
            report.requested
        );
    }
}
