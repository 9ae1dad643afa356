//! Load stage command.

use console::style;

use crate::cli::helpers::print_ok;
use crate::config::Settings;
use crate::pipeline::load_stage;

/// Upsert the clean records file into the database.
pub async fn cmd_load(settings: &Settings) -> anyhow::Result<()> {
    let settings = settings.clone();
    let summary = tokio::task::spawn_blocking(move || load_stage(&settings)).await??;

    print_ok(format!(
        "{} inserted, {} updated ({} rows)",
        summary.inserted, summary.updated, summary.rows_after
    ));
    if summary.failed > 0 {
        println!("{} {} rows rejected", style("!").yellow(), summary.failed);
    }
    Ok(())
}
