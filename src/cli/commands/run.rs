//! End-to-end run command.

use console::style;

use crate::cli::helpers::{close_pipeline, open_pipeline};
use crate::config::Settings;

/// Run every stage under the configured retry and timeout policy.
pub async fn cmd_run(settings: &Settings, limit: Option<usize>) -> anyhow::Result<()> {
    let pipeline = open_pipeline(settings).await?;
    let result = pipeline.run(limit).await;
    close_pipeline(&pipeline).await;

    let summary = result?;
    println!("\n{}", style("Run Summary").bold());
    println!("{}", "-".repeat(40));
    println!(
        "{:<20} {}",
        "Started:",
        summary.started_at.format("%Y-%m-%d %H:%M:%S UTC")
    );
    println!("{:<20} {}", "Candidates:", summary.candidates);
    println!("{:<20} {}", "Raw records:", summary.raw);
    println!("{:<20} {}", "Validated:", summary.validated);
    println!("{:<20} {}", "Dropped:", summary.dropped);
    println!("{:<20} {}", "Duplicates:", summary.duplicates);
    println!("{:<20} {}", "Inserted:", summary.inserted);
    println!("{:<20} {}", "Updated:", summary.updated);
    println!("{:<20} {}", "Failed:", summary.failed);
    println!("{:<20} {}", "Attempts:", summary.attempts);
    println!("{:<20} {:.1}s", "Elapsed:", summary.elapsed.as_secs_f64());
    Ok(())
}
