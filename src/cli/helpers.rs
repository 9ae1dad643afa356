//! Shared helper functions for CLI commands.

use console::{style, Term};
use tracing::info;

use crate::config::Settings;
use crate::pipeline::Pipeline;
use crate::scrapers::create_renderer;

/// Truncate a string to `max` characters, marking the cut with an ellipsis.
pub fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}

/// `part` as a percentage of `total`, one decimal.
pub fn percent(part: u64, total: u64) -> String {
    if total == 0 {
        "-".to_string()
    } else {
        format!("{:.1}%", part as f64 * 100.0 / total as f64)
    }
}

/// Launch the configured page renderer and wrap it in a pipeline.
pub async fn open_pipeline(settings: &Settings) -> anyhow::Result<Pipeline> {
    let engine = settings.scraper.browser.to_engine_config(&settings.user_agent);
    info!(engine = engine.engine.as_str(), "Starting page renderer");
    let renderer = create_renderer(&engine).await?;
    let show_progress = Term::stderr().is_term();
    Ok(Pipeline::new(settings.clone(), renderer).with_progress(show_progress))
}

/// Shut the pipeline's renderer down.
pub async fn close_pipeline(pipeline: &Pipeline) {
    pipeline.renderer().close().await;
}

pub fn print_ok(message: impl std::fmt::Display) {
    println!("{} {}", style("✓").green(), message);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("Heat", 10), "Heat");
        assert_eq!(truncate("Crouching Tiger, Hidden Dragon", 10), "Crouchi...");
        assert_eq!(truncate("Amélie Poulain", 9), "Amélie...");
    }

    #[test]
    fn test_percent() {
        assert_eq!(percent(1, 4), "25.0%");
        assert_eq!(percent(0, 0), "-");
    }
}
