//! Domain models for the movie pipeline.

mod candidate;
mod movie;

pub use candidate::Candidate;
pub use movie::{MovieRow, RawRecord, ValidatedRecord, MOVIE_COLUMNS};
