//! Listing-page candidates.

use serde::{Deserialize, Serialize};

/// A (title, detail url) pair discovered on a listing page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Candidate {
    /// Title as displayed on the listing page (trimmed).
    pub title: String,
    /// Normalized absolute detail page URL. Unique within a run.
    #[serde(rename = "url")]
    pub detail_url: String,
}

impl Candidate {
    pub fn new(title: impl Into<String>, detail_url: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            detail_url: detail_url.into(),
        }
    }
}
