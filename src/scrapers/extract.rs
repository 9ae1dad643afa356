//! Field extraction from rendered listing and detail pages.
//!
//! Extraction never fails: a missing element or empty text leaves the field
//! absent and the rest of the page is still read.

use std::sync::LazyLock;

use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use tracing::debug;
use url::Url;

use super::browser::PageContent;
use super::url::normalize_url;
use crate::cleaning::collapse_whitespace;
use crate::models::{Candidate, RawRecord};

/// Link to a movie detail page.
pub const MOVIE_LINK: &str = "a[href*='/m/']";
const LINK_TITLE: &str = "span.p--small";
const FALLBACK_LINK: &str = "[data-qa='discovery-media-list'] a[href*='/m/']";

/// Rendered once the score widgets have loaded.
pub const SCORECARD: &str = "media-scorecard";
const CRITICS_SCORE: &str = r#"rt-text[slot="criticsScore"]"#;
const AUDIENCE_SCORE: &str = r#"rt-text[slot="audienceScore"]"#;
const ANY_RT_TEXT: &str = "rt-text";

const INFO_ITEM: &str = r#"section.media-info [data-qa="item"]"#;
const INFO_LABEL: &str = r#"[data-qa="item-label"]"#;
const INFO_VALUE: &str = r#"[data-qa="item-value"]"#;

static BARE_SCORE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d{1,3})%?$").expect("valid regex"));
static WIDE_RELEASE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s*,\s*Wide$").expect("valid regex"));

/// Link texts on listing pages that are score widgets, not titles.
const SCORE_LABELS: [&str; 4] = ["tomatometer", "audience score", "popcornmeter", "score"];

fn selector(css: &str) -> Option<Selector> {
    Selector::parse(css).ok()
}

fn select_all<'a>(scope: ElementRef<'a>, css: &str) -> Vec<ElementRef<'a>> {
    match selector(css) {
        Some(sel) => scope.select(&sel).collect(),
        None => Vec::new(),
    }
}

fn element_text(element: ElementRef<'_>) -> Option<String> {
    let text = collapse_whitespace(&element.text().collect::<String>());
    if text.is_empty() {
        None
    } else {
        Some(text)
    }
}

fn first_text(scope: ElementRef<'_>, css: &str) -> Option<String> {
    select_all(scope, css).into_iter().find_map(element_text)
}

/// Extract (title, url) candidates from a listing page, in page order.
///
/// Links without a usable title or href are skipped. No deduplication
/// happens here; that is the list scraper's job.
pub fn extract_candidates(page: &PageContent) -> Vec<Candidate> {
    let document = Html::parse_document(&page.html);
    let root = document.root_element();
    let base = Url::parse(&page.url).ok();

    let mut links: Vec<(ElementRef<'_>, bool)> = select_all(root, MOVIE_LINK)
        .into_iter()
        .filter(|link| !select_all(*link, LINK_TITLE).is_empty())
        .map(|link| (link, false))
        .collect();

    if links.is_empty() {
        links = select_all(root, FALLBACK_LINK)
            .into_iter()
            .map(|link| (link, true))
            .collect();
    }

    let mut candidates = Vec::new();
    for (index, (link, fallback)) in links.into_iter().enumerate() {
        let title = first_text(link, LINK_TITLE).or_else(|| {
            if fallback {
                element_text(link)
            } else {
                None
            }
        });
        let Some(title) = title else {
            debug!(url = %page.url, index, "Link without title skipped");
            continue;
        };

        if SCORE_LABELS.contains(&title.to_lowercase().as_str()) {
            continue;
        }

        let Some(href) = link.value().attr("href") else {
            continue;
        };
        let Some(detail_url) = normalize_url(href, base.as_ref()) else {
            debug!(url = %page.url, href, "Unusable link skipped");
            continue;
        };

        candidates.push(Candidate::new(title, detail_url));
    }

    candidates
}

/// Extract a detail page into a raw record for `candidate`.
pub fn extract_record(page: &PageContent, candidate: &Candidate) -> RawRecord {
    let document = Html::parse_document(&page.html);
    let root = document.root_element();
    let mut record = RawRecord::from_candidate(candidate);

    record.tomatometer_score = slotted_score(root, CRITICS_SCORE);
    record.audience_score = slotted_score(root, AUDIENCE_SCORE);

    if record.tomatometer_score.is_none() || record.audience_score.is_none() {
        fill_scores_from_bare_values(root, &mut record);
    }

    for item in select_all(root, INFO_ITEM) {
        let Some(label) = first_text(item, INFO_LABEL) else {
            continue;
        };
        let Some(field) = InfoField::from_label(&label) else {
            continue;
        };

        let values: Vec<String> = select_all(item, INFO_VALUE)
            .into_iter()
            .filter_map(element_text)
            .collect();
        if values.is_empty() {
            continue;
        }

        field.assign(&mut record, values);
    }

    record
}

/// Text of a slotted score element, if it holds any digits. Placeholders
/// such as `--` count as missing so the bare-value fallback can fill them.
fn slotted_score(root: ElementRef<'_>, css: &str) -> Option<String> {
    first_text(root, css).filter(|text| text.chars().any(|c| c.is_ascii_digit()))
}

/// Fallback when the slotted score elements are missing: if the page holds
/// exactly two bare percentages in `rt-text` elements, the higher is taken as
/// the tomatometer and the lower as the audience score. Only missing slots
/// are filled.
fn fill_scores_from_bare_values(root: ElementRef<'_>, record: &mut RawRecord) {
    let mut scores: Vec<u32> = select_all(root, ANY_RT_TEXT)
        .into_iter()
        .filter_map(element_text)
        .filter_map(|text| {
            BARE_SCORE
                .captures(&text)
                .and_then(|c| c.get(1))
                .and_then(|m| m.as_str().parse::<u32>().ok())
        })
        .filter(|score| *score <= 100)
        .collect();

    if scores.len() != 2 {
        return;
    }
    scores.sort_unstable_by(|a, b| b.cmp(a));

    if record.tomatometer_score.is_none() {
        record.tomatometer_score = Some(scores[0].to_string());
    }
    if record.audience_score.is_none() {
        record.audience_score = Some(scores[1].to_string());
    }
}

/// Metadata rows in the media-info section, matched by label substring.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum InfoField {
    Genre,
    Rating,
    Runtime,
    ReleaseDate,
    Director,
    OriginalLanguage,
    BoxOffice,
    Distributor,
}

impl InfoField {
    const ALL: [(Self, &'static str); 8] = [
        (Self::Genre, "genre"),
        (Self::Rating, "rating"),
        (Self::Runtime, "runtime"),
        (Self::ReleaseDate, "release date"),
        (Self::Director, "director"),
        (Self::OriginalLanguage, "original language"),
        (Self::BoxOffice, "box office"),
        (Self::Distributor, "distributor"),
    ];

    fn from_label(label: &str) -> Option<Self> {
        let label = label.to_lowercase();
        Self::ALL
            .iter()
            .find(|(_, keyword)| label.contains(keyword))
            .map(|(field, _)| *field)
    }

    fn assign(self, record: &mut RawRecord, values: Vec<String>) {
        let joined = || values.join(", ");
        let first = || values.first().cloned();
        match self {
            Self::Genre => record.genre = Some(joined()),
            Self::Director => record.director = Some(joined()),
            Self::Rating => record.rating = first(),
            Self::Runtime => record.duration = first(),
            Self::ReleaseDate => record.release_date = first().map(|d| strip_release_suffix(&d)),
            Self::OriginalLanguage => record.original_language = first(),
            Self::BoxOffice => record.box_office = first(),
            Self::Distributor => record.distributor = first(),
        }
    }
}

/// "Mar 4, 2016, Wide" -> "Mar 4, 2016"
fn strip_release_suffix(date: &str) -> String {
    WIDE_RELEASE.replace(date, "").into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    const LIST_PAGE: &str = r#"
        <html><body>
          <div data-qa="discovery-media-list">
            <a href="/m/zootopia?from=browse"><span class="p--small"> Zootopia </span></a>
            <a href="/m/zootopia"><span class="p--small">Tomatometer</span></a>
            <a href="https://www.rottentomatoes.com/m/heat_1995/"><span class="p--small">Heat</span></a>
            <a href="/m/no_title"><img src="x.png"></a>
            <a href="/tv/not_a_movie"><span class="p--small">Some Show</span></a>
          </div>
        </body></html>
    "#;

    const DETAIL_PAGE: &str = r#"
        <html><body>
          <media-scorecard>
            <rt-text slot="criticsScore"> 98% </rt-text>
            <rt-text slot="audienceScore">92%</rt-text>
          </media-scorecard>
          <section class="media-info">
            <dl>
              <div data-qa="item">
                <dt data-qa="item-label">Director</dt>
                <dd><span data-qa="item-value">Byron Howard</span><span data-qa="item-value">Rich Moore</span></dd>
              </div>
              <div data-qa="item">
                <dt data-qa="item-label">Genre</dt>
                <dd><span data-qa="item-value">Animation</span><span data-qa="item-value">Comedy</span></dd>
              </div>
              <div data-qa="item">
                <dt data-qa="item-label">Rating</dt>
                <dd><span data-qa="item-value">PG (Some Thematic Elements)</span></dd>
              </div>
              <div data-qa="item">
                <dt data-qa="item-label">Runtime</dt>
                <dd><span data-qa="item-value">1h 48m</span></dd>
              </div>
              <div data-qa="item">
                <dt data-qa="item-label">Release Date (Theaters)</dt>
                <dd><span data-qa="item-value">Mar 4, 2016, Wide</span></dd>
              </div>
              <div data-qa="item">
                <dt data-qa="item-label">Original Language</dt>
                <dd><span data-qa="item-value">English</span></dd>
              </div>
              <div data-qa="item">
                <dt data-qa="item-label">Box Office (Gross USA)</dt>
                <dd><span data-qa="item-value">$341.3M</span></dd>
              </div>
              <div data-qa="item">
                <dt data-qa="item-label">Distributor</dt>
                <dd><span data-qa="item-value">   </span></dd>
              </div>
            </dl>
          </section>
        </body></html>
    "#;

    fn zootopia() -> Candidate {
        Candidate::new("Zootopia", "https://www.rottentomatoes.com/m/zootopia")
    }

    #[test]
    fn test_extract_candidates() {
        let page = PageContent::new(
            "https://www.rottentomatoes.com/browse/movies_at_home/?page=0",
            LIST_PAGE,
        );
        let candidates = extract_candidates(&page);

        assert_eq!(
            candidates,
            vec![
                Candidate::new("Zootopia", "https://www.rottentomatoes.com/m/zootopia"),
                Candidate::new("Heat", "https://www.rottentomatoes.com/m/heat_1995"),
            ]
        );
    }

    #[test]
    fn test_extract_candidates_fallback_uses_link_text() {
        let html = r#"<div data-qa="discovery-media-list"><a href="/m/alien">  Alien </a></div>"#;
        let page = PageContent::new("https://www.rottentomatoes.com/browse/x", html);
        let candidates = extract_candidates(&page);
        assert_eq!(
            candidates,
            vec![Candidate::new("Alien", "https://www.rottentomatoes.com/m/alien")]
        );
    }

    #[test]
    fn test_extract_candidates_empty_page() {
        let page = PageContent::new("https://example.com/browse", "<html></html>");
        assert!(extract_candidates(&page).is_empty());
    }

    #[test]
    fn test_extract_record_full_page() {
        let page = PageContent::new(zootopia().detail_url, DETAIL_PAGE);
        let record = extract_record(&page, &zootopia());

        assert_eq!(record.title, "Zootopia");
        assert_eq!(record.tomatometer_score.as_deref(), Some("98%"));
        assert_eq!(record.audience_score.as_deref(), Some("92%"));
        assert_eq!(record.genre.as_deref(), Some("Animation, Comedy"));
        assert_eq!(record.director.as_deref(), Some("Byron Howard, Rich Moore"));
        assert_eq!(record.rating.as_deref(), Some("PG (Some Thematic Elements)"));
        assert_eq!(record.duration.as_deref(), Some("1h 48m"));
        assert_eq!(record.release_date.as_deref(), Some("Mar 4, 2016"));
        assert_eq!(record.original_language.as_deref(), Some("English"));
        assert_eq!(record.box_office.as_deref(), Some("$341.3M"));
        // blank value stays absent
        assert_eq!(record.distributor, None);
    }

    #[test]
    fn test_extract_record_missing_everything() {
        let page = PageContent::new(zootopia().detail_url, "<html><body>Access denied</body></html>");
        let record = extract_record(&page, &zootopia());
        assert_eq!(record, RawRecord::from_candidate(&zootopia()));
    }

    #[test]
    fn test_bare_score_fallback_requires_exactly_two() {
        let two = r#"<rt-text>71%</rt-text><rt-text>Reviews</rt-text><rt-text>88</rt-text>"#;
        let record = extract_record(&PageContent::new("u", two), &zootopia());
        assert_eq!(record.tomatometer_score.as_deref(), Some("88"));
        assert_eq!(record.audience_score.as_deref(), Some("71"));

        let three = r#"<rt-text>71%</rt-text><rt-text>88</rt-text><rt-text>12</rt-text>"#;
        let record = extract_record(&PageContent::new("u", three), &zootopia());
        assert_eq!(record.tomatometer_score, None);
        assert_eq!(record.audience_score, None);
    }

    #[test]
    fn test_bare_score_fallback_fills_only_missing_slot() {
        let html = r#"<rt-text slot="audienceScore">60%</rt-text><rt-text>90%</rt-text>"#;
        let record = extract_record(&PageContent::new("u", html), &zootopia());
        assert_eq!(record.tomatometer_score.as_deref(), Some("90"));
        assert_eq!(record.audience_score.as_deref(), Some("60%"));
    }

    #[test]
    fn test_placeholder_slot_score_is_filled_from_bare_values() {
        let html = r#"<rt-text slot="criticsScore">--</rt-text><rt-text>90%</rt-text><rt-text>60%</rt-text>"#;
        let record = extract_record(&PageContent::new("u", html), &zootopia());
        assert_eq!(record.tomatometer_score.as_deref(), Some("90"));
        assert_eq!(record.audience_score.as_deref(), Some("60"));

        let cleaned = crate::cleaning::clean(&[record]);
        assert_eq!(cleaned[0].tomatometer_score, Some(90));
        assert_eq!(cleaned[0].audience_score, Some(60));
    }

    #[test]
    fn test_negative_slot_score_is_kept_for_the_cleaner() {
        let html = r#"<rt-text slot="criticsScore">-5</rt-text><rt-text slot="audienceScore">80%</rt-text>"#;
        let record = extract_record(&PageContent::new("u", html), &zootopia());
        assert_eq!(record.tomatometer_score.as_deref(), Some("-5"));
        assert_eq!(record.audience_score.as_deref(), Some("80%"));
    }

    #[test]
    fn test_info_field_from_label() {
        assert_eq!(InfoField::from_label("Genre"), Some(InfoField::Genre));
        assert_eq!(
            InfoField::from_label("Release Date (Streaming)"),
            Some(InfoField::ReleaseDate)
        );
        assert_eq!(InfoField::from_label("Producer"), None);
    }
}
