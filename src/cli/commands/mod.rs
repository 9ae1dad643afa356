//! CLI command implementations.

pub mod load;
pub mod run;
pub mod scrape;
pub mod status;
