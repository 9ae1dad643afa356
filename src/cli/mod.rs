//! Command line interface.

mod commands;
mod helpers;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::config::{load_settings_with_options, LoadOptions};

#[derive(Parser)]
#[command(name = "moviepipe")]
#[command(about = "Scrape, clean, and load movie metadata into SQLite")]
#[command(version)]
pub struct Cli {
    /// Config file (JSON or TOML); discovered automatically when omitted
    #[arg(long, global = true, env = "MOVIEPIPE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Data directory for the CSV hand-off files and the database
    #[arg(long, global = true, env = "MOVIEPIPE_DATA_DIR")]
    pub data_dir: Option<PathBuf>,

    /// Resolve relative config paths against the current directory
    #[arg(long, global = true)]
    pub cwd: bool,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Scrape listing pages into movies_raw.csv
    ScrapeList,

    /// Scrape detail pages for movies_raw.csv and write movies_clean.csv
    ScrapeDetails {
        /// Only process the first N candidates
        #[arg(long)]
        limit: Option<usize>,
    },

    /// Upsert movies_clean.csv into the database
    Load,

    /// Run all stages with retries and timeouts
    Run {
        /// Only process the first N candidates in the detail stage
        #[arg(long)]
        limit: Option<usize>,
    },

    /// Show row counts and field coverage
    Status {
        /// Number of top-rated movies to list
        #[arg(long, default_value_t = 10)]
        top: usize,
    },
}

impl Cli {
    /// Default log filter for the chosen verbosity.
    pub fn log_filter(&self) -> String {
        let level = match self.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        };
        format!("warn,moviepipe={}", level)
    }
}

/// Execute the parsed command line.
pub async fn run(cli: Cli) -> anyhow::Result<()> {
    let settings = load_settings_with_options(LoadOptions {
        config_path: cli.config.clone(),
        use_cwd: cli.cwd,
        data_dir: cli.data_dir.clone(),
    })
    .await?;
    settings.ensure_directories()?;

    match cli.command {
        Commands::ScrapeList => commands::scrape::cmd_scrape_list(&settings).await,
        Commands::ScrapeDetails { limit } => {
            commands::scrape::cmd_scrape_details(&settings, limit).await
        }
        Commands::Load => commands::load::cmd_load(&settings).await,
        Commands::Run { limit } => commands::run::cmd_run(&settings, limit).await,
        Commands::Status { top } => commands::status::cmd_status(&settings, top).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_subcommands() {
        let cli = Cli::try_parse_from(["moviepipe", "-vv", "scrape-details", "--limit", "5"]).unwrap();
        assert_eq!(cli.verbose, 2);
        assert!(matches!(cli.command, Commands::ScrapeDetails { limit: Some(5) }));
        assert_eq!(cli.log_filter(), "warn,moviepipe=trace");

        let cli = Cli::try_parse_from(["moviepipe", "status", "--data-dir", "/tmp/m"]).unwrap();
        assert_eq!(cli.data_dir, Some(PathBuf::from("/tmp/m")));
        assert!(matches!(cli.command, Commands::Status { top: 10 }));
    }

    #[test]
    fn test_clap_definition() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
