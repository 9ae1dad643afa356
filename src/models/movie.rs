//! Movie records before and after cleaning.

use serde::{Deserialize, Serialize};

use super::Candidate;

/// Column order shared by `movies_clean.csv` and the `movies` table.
pub const MOVIE_COLUMNS: [&str; 12] = [
    "title",
    "url",
    "tomatometer_score",
    "audience_score",
    "genre",
    "rating",
    "duration",
    "release_date",
    "director",
    "original_language",
    "box_office",
    "distributor",
];

/// Metadata for one movie exactly as extracted from its detail page.
///
/// Every metadata field is optional; an absent field is an extraction miss,
/// never an error. Scores keep their raw text (e.g. `"98%"`) so that range
/// validation happens in one place, the cleaner.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawRecord {
    pub title: String,
    pub detail_url: String,
    pub tomatometer_score: Option<String>,
    pub audience_score: Option<String>,
    pub genre: Option<String>,
    pub rating: Option<String>,
    pub duration: Option<String>,
    pub release_date: Option<String>,
    pub director: Option<String>,
    pub original_language: Option<String>,
    pub box_office: Option<String>,
    pub distributor: Option<String>,
}

impl RawRecord {
    /// A record carrying only the candidate's identity, every metadata field absent.
    pub fn from_candidate(candidate: &Candidate) -> Self {
        Self {
            title: candidate.title.clone(),
            detail_url: candidate.detail_url.clone(),
            ..Default::default()
        }
    }

    /// Number of metadata fields that were extracted.
    pub fn populated_fields(&self) -> usize {
        [
            &self.tomatometer_score,
            &self.audience_score,
            &self.genre,
            &self.rating,
            &self.duration,
            &self.release_date,
            &self.director,
            &self.original_language,
            &self.box_office,
            &self.distributor,
        ]
        .iter()
        .filter(|f| f.is_some())
        .count()
    }
}

/// A cleaned record satisfying all field invariants; one row of `movies`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidatedRecord {
    pub title: String,
    #[serde(rename = "url")]
    pub detail_url: String,
    pub tomatometer_score: Option<u8>,
    pub audience_score: Option<u8>,
    pub genre: Option<String>,
    pub rating: Option<String>,
    pub duration: Option<String>,
    pub release_date: Option<String>,
    pub director: Option<String>,
    pub original_language: Option<String>,
    pub box_office: Option<String>,
    pub distributor: Option<String>,
}

impl ValidatedRecord {
    /// Number of absent metadata fields (title and url are never absent).
    pub fn absent_fields(&self) -> usize {
        let scores = [self.tomatometer_score, self.audience_score]
            .iter()
            .filter(|s| s.is_none())
            .count();
        let text = [
            &self.genre,
            &self.rating,
            &self.duration,
            &self.release_date,
            &self.director,
            &self.original_language,
            &self.box_office,
            &self.distributor,
        ]
        .iter()
        .filter(|f| f.is_none())
        .count();
        scores + text
    }

    /// True when no metadata field beyond title/url is populated.
    pub fn is_empty(&self) -> bool {
        self.absent_fields() == 10
    }
}

/// One row of `movies_clean.csv` as read back for loading.
///
/// Scores are kept as text and parsed per row by the loader, so a malformed
/// score rejects only the row it is on.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MovieRow {
    pub title: String,
    #[serde(rename = "url")]
    pub detail_url: String,
    pub tomatometer_score: Option<String>,
    pub audience_score: Option<String>,
    pub genre: Option<String>,
    pub rating: Option<String>,
    pub duration: Option<String>,
    pub release_date: Option<String>,
    pub director: Option<String>,
    pub original_language: Option<String>,
    pub box_office: Option<String>,
    pub distributor: Option<String>,
}

impl From<&ValidatedRecord> for MovieRow {
    fn from(record: &ValidatedRecord) -> Self {
        Self {
            title: record.title.clone(),
            detail_url: record.detail_url.clone(),
            tomatometer_score: record.tomatometer_score.map(|s| s.to_string()),
            audience_score: record.audience_score.map(|s| s.to_string()),
            genre: record.genre.clone(),
            rating: record.rating.clone(),
            duration: record.duration.clone(),
            release_date: record.release_date.clone(),
            director: record.director.clone(),
            original_language: record.original_language.clone(),
            box_office: record.box_office.clone(),
            distributor: record.distributor.clone(),
        }
    }
}
