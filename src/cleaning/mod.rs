//! Cleaning and validation of raw detail records.
//!
//! Each raw record is normalized field by field. A field that fails
//! validation becomes absent and the record is kept; only a record without a
//! url is dropped. Records sharing a url are then collapsed to the most
//! complete one.

mod normalize;

use std::collections::HashMap;

use thiserror::Error;
use tracing::{info, warn};

use crate::models::{RawRecord, ValidatedRecord};

pub use normalize::{clean_title, collapse_whitespace, normalize_duration, normalize_text, parse_score};

/// A single field failed validation.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("{field}: {value} is outside 0..=100")]
    ScoreOutOfRange { field: &'static str, value: i64 },

    #[error("{field}: {value:?} is not a number")]
    NotNumeric { field: &'static str, value: String },

    #[error("duration: {value:?} is not a runtime")]
    BadDuration { value: String },

    #[error("url is empty")]
    MissingUrl,
}

impl ValidationError {
    /// Name of the field that failed.
    pub fn field(&self) -> &'static str {
        match self {
            Self::ScoreOutOfRange { field, .. } | Self::NotNumeric { field, .. } => field,
            Self::BadDuration { .. } => "duration",
            Self::MissingUrl => "url",
        }
    }
}

/// How many validated records carry each headline field.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FieldCompleteness {
    pub tomatometer_score: usize,
    pub audience_score: usize,
    pub genre: usize,
    pub rating: usize,
    pub duration: usize,
}

impl FieldCompleteness {
    fn count(records: &[ValidatedRecord]) -> Self {
        let mut counts = Self::default();
        for r in records {
            counts.tomatometer_score += r.tomatometer_score.is_some() as usize;
            counts.audience_score += r.audience_score.is_some() as usize;
            counts.genre += r.genre.is_some() as usize;
            counts.rating += r.rating.is_some() as usize;
            counts.duration += r.duration.is_some() as usize;
        }
        counts
    }

    /// `(column, populated)` pairs in table order.
    pub fn entries(&self) -> [(&'static str, usize); 5] {
        [
            ("tomatometer_score", self.tomatometer_score),
            ("audience_score", self.audience_score),
            ("genre", self.genre),
            ("rating", self.rating),
            ("duration", self.duration),
        ]
    }
}

/// Outcome counters for one `clean` pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CleanReport {
    /// Raw records received.
    pub input: usize,
    /// Validated records emitted.
    pub output: usize,
    /// Records dropped for lacking a url.
    pub dropped: usize,
    /// Records merged away because another record had the same url.
    pub duplicates: usize,
    /// Individual fields cleared by validation.
    pub invalid_fields: usize,
    /// Records with no metadata beyond title and url (kept).
    pub empty: usize,
    pub completeness: FieldCompleteness,
}

/// Clean `records`, discarding the report.
pub fn clean(records: &[RawRecord]) -> Vec<ValidatedRecord> {
    clean_with_report(records).0
}

/// Clean `records` and report what was dropped, merged, and cleared.
pub fn clean_with_report(records: &[RawRecord]) -> (Vec<ValidatedRecord>, CleanReport) {
    let mut report = CleanReport {
        input: records.len(),
        ..Default::default()
    };

    let mut cleaned = Vec::with_capacity(records.len());
    for raw in records {
        match clean_record(raw, &mut report.invalid_fields) {
            Ok(record) => cleaned.push(record),
            Err(e) => {
                report.dropped += 1;
                warn!(title = %raw.title, field = e.field(), reason = %e, "[CLEAN] Record dropped");
            }
        }
    }

    let before = cleaned.len();
    let records = dedup_by_url(cleaned);
    report.duplicates = before - records.len();
    report.output = records.len();
    report.empty = records.iter().filter(|r| r.is_empty()).count();
    report.completeness = FieldCompleteness::count(&records);

    info!(
        "[CLEAN] {} raw -> {} validated ({} dropped, {} duplicates, {} fields cleared, {} empty)",
        report.input, report.output, report.dropped, report.duplicates, report.invalid_fields, report.empty
    );
    (records, report)
}

/// Normalize one record. Invalid fields are logged, counted in `invalid`,
/// and left absent; only a missing url fails the record.
pub fn clean_record(raw: &RawRecord, invalid: &mut usize) -> Result<ValidatedRecord, ValidationError> {
    let url = raw.detail_url.trim();
    if url.is_empty() {
        return Err(ValidationError::MissingUrl);
    }

    let mut reject = |e: ValidationError| {
        *invalid += 1;
        warn!(url = %url, field = e.field(), reason = %e, "[CLEAN] Field cleared");
    };

    let mut score = |field: &'static str, value: &Option<String>| -> Option<u8> {
        let value = value.as_deref()?;
        if value.trim().is_empty() {
            return None;
        }
        parse_score(field, value).map_err(&mut reject).ok()
    };
    let tomatometer_score = score("tomatometer_score", &raw.tomatometer_score);
    let audience_score = score("audience_score", &raw.audience_score);

    let duration = match raw.duration.as_deref().map(str::trim) {
        None | Some("") => None,
        Some(value) => normalize_duration(value).map_err(&mut reject).ok(),
    };

    let text = |value: &Option<String>| value.as_deref().and_then(normalize_text);

    Ok(ValidatedRecord {
        title: clean_title(&raw.title),
        detail_url: url.to_string(),
        tomatometer_score,
        audience_score,
        genre: text(&raw.genre),
        rating: text(&raw.rating),
        duration,
        release_date: text(&raw.release_date),
        director: text(&raw.director),
        original_language: text(&raw.original_language),
        box_office: text(&raw.box_office),
        distributor: text(&raw.distributor),
    })
}

/// Keep one record per url: the one with the fewest absent fields, the
/// earliest on a tie. Output follows the first appearance of each url.
pub fn dedup_by_url(records: Vec<ValidatedRecord>) -> Vec<ValidatedRecord> {
    let mut slots: HashMap<String, usize> = HashMap::new();
    let mut kept: Vec<ValidatedRecord> = Vec::with_capacity(records.len());

    for record in records {
        match slots.get(&record.detail_url) {
            Some(&index) => {
                if record.absent_fields() < kept[index].absent_fields() {
                    kept[index] = record;
                }
            }
            None => {
                slots.insert(record.detail_url.clone(), kept.len());
                kept.push(record);
            }
        }
    }

    kept
}
