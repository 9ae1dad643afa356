//! Scrape stage commands.

use console::style;

use crate::cli::helpers::{close_pipeline, open_pipeline, print_ok};
use crate::config::Settings;

/// Scrape listing pages into the raw candidates file.
pub async fn cmd_scrape_list(settings: &Settings) -> anyhow::Result<()> {
    let pipeline = open_pipeline(settings).await?;
    let result = pipeline.scrape_list().await;
    close_pipeline(&pipeline).await;

    let count = result?;
    print_ok(format!(
        "{} candidates written to {}",
        count,
        settings.raw_path().display()
    ));
    Ok(())
}

/// Scrape detail pages, clean them, and write the clean records file.
pub async fn cmd_scrape_details(settings: &Settings, limit: Option<usize>) -> anyhow::Result<()> {
    let pipeline = open_pipeline(settings).await?;
    let result = pipeline.scrape_details(limit).await;
    close_pipeline(&pipeline).await;

    let stage = result?;
    let report = &stage.report;
    print_ok(format!(
        "{} records written to {}",
        report.output,
        settings.clean_path().display()
    ));
    println!("{:<20} {}", "Scraped:", stage.scraped);
    println!("{:<20} {}", "Dropped:", report.dropped);
    println!("{:<20} {}", "Duplicates:", report.duplicates);
    println!("{:<20} {}", "Fields cleared:", report.invalid_fields);
    if report.empty > 0 {
        println!(
            "{} {} records have no metadata",
            style("!").yellow(),
            report.empty
        );
    }
    Ok(())
}
