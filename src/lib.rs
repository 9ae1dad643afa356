//! moviepipe: a scheduled ETL pipeline for movie metadata.
//!
//! Listing pages are rendered and scraped into candidates, each candidate's
//! detail page is scraped into a raw record, raw records are cleaned and
//! validated, and the result is upserted into a SQLite `movies` table.
//!
//! Stages hand off through CSV files so each one can be run on its own.

pub mod cleaning;
pub mod cli;
pub mod config;
pub mod intermediate;
pub mod models;
pub mod pipeline;
pub mod repository;
pub mod scrapers;
