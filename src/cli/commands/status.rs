//! Status command for showing database state.

use console::style;

use crate::cli::helpers::{percent, truncate};
use crate::config::Settings;
use crate::repository::MovieRepository;

/// Show row count, field coverage, and the top-rated movies.
pub async fn cmd_status(settings: &Settings, top: usize) -> anyhow::Result<()> {
    let db_path = settings.database_path();
    if !db_path.exists() {
        println!(
            "{} No database yet. Run 'moviepipe run' or 'moviepipe load' first.",
            style("!").yellow()
        );
        return Ok(());
    }

    let repo = MovieRepository::new(&db_path)?;
    let stats = repo.stats()?;

    println!("\n{}", style("moviepipe Status").bold());
    println!("{}", "-".repeat(40));
    println!("{:<20} {}", "Data Directory:", settings.data_dir.display());
    println!("{:<20} {}", "Movies:", stats.rows);
    for (column, populated) in stats.coverage() {
        println!(
            "{:<20} {:>6} {:>7}",
            format!("  {}:", column),
            populated,
            percent(populated, stats.rows)
        );
    }
    if let Some(avg) = stats.avg_tomatometer {
        println!("{:<20} {:.1}", "Avg tomatometer:", avg);
    }
    if let Some(avg) = stats.avg_audience {
        println!("{:<20} {:.1}", "Avg audience:", avg);
    }

    if top > 0 {
        let movies = repo.top_rated(top)?;
        if !movies.is_empty() {
            println!("\n{}", style("Top Rated").bold());
            println!("{}", "-".repeat(60));
            println!("{:<40} {:>8} {:>8}", "Title", "Critics", "Audience");
            for movie in movies {
                let score = |s: Option<u8>| s.map(|v| v.to_string()).unwrap_or_else(|| "-".to_string());
                println!(
                    "{:<40} {:>8} {:>8}",
                    truncate(&movie.title, 39),
                    score(movie.tomatometer_score),
                    score(movie.audience_score)
                );
            }
        }
    }

    Ok(())
}
