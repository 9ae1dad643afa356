//! Per-field normalization rules.

use std::sync::LazyLock;

use regex::Regex;

use super::ValidationError;

static COMMA_SPACING: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s*,\s*").expect("valid regex"));

static DURATION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^(?:(\d+)\s*(?:h|hr|hrs|hour|hours)\.?)?\s*(?:(\d+)\s*(?:m|min|mins|minute|minutes)\.?)?$",
    )
    .expect("valid regex")
});

/// Collapse every run of whitespace (including non-breaking spaces) into a
/// single space and trim the ends.
pub fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Title rule: trimmed, whitespace-collapsed, lowercased. Punctuation is kept.
pub fn clean_title(title: &str) -> String {
    collapse_whitespace(title).to_lowercase()
}

fn fold_punctuation(c: char) -> char {
    match c {
        '\u{2018}' | '\u{2019}' | '\u{201B}' | '\u{2032}' => '\'',
        '\u{201C}' | '\u{201D}' | '\u{201F}' | '\u{2033}' => '"',
        '\u{2010}' | '\u{2011}' | '\u{2012}' | '\u{2013}' | '\u{2014}' | '\u{2212}' => '-',
        '\u{2026}' => '.',
        other => other,
    }
}

/// Text rule for metadata fields.
///
/// Typographic quotes and dashes fold to ASCII, commas get exactly one
/// trailing space, trailing separators are dropped, and the result is
/// whitespace-collapsed and lowercased. Returns `None` when nothing is left.
pub fn normalize_text(value: &str) -> Option<String> {
    let folded: String = value.chars().map(fold_punctuation).collect();
    let collapsed = collapse_whitespace(&folded);
    let spaced = COMMA_SPACING.replace_all(&collapsed, ", ");
    let trimmed = spaced.trim_end_matches(|c: char| matches!(c, ',' | ';' | ':' | '|' | '-') || c.is_whitespace());
    let trimmed = trimmed.trim_start_matches(|c: char| matches!(c, ',' | ';' | '|') || c.is_whitespace());

    let normalized = trimmed.to_lowercase();
    if normalized.is_empty() {
        None
    } else {
        Some(normalized)
    }
}

/// Parse a raw score such as `"98%"` into an integer in `[0, 100]`.
pub fn parse_score(field: &'static str, raw: &str) -> Result<u8, ValidationError> {
    let text = raw.trim();
    let digits = text.strip_suffix('%').unwrap_or(text).trim();

    let value: i64 = digits.parse().map_err(|_| ValidationError::NotNumeric {
        field,
        value: raw.to_string(),
    })?;

    if (0..=100).contains(&value) {
        Ok(value as u8)
    } else {
        Err(ValidationError::ScoreOutOfRange { field, value })
    }
}

/// Normalize a runtime to `"<h>h <m>m"`.
///
/// Accepts `1h 48m`, `1 hr 48 min`, `2 hours`, `108 min` and bare minute
/// counts; minutes above 59 carry into hours. A zero runtime is rejected.
pub fn normalize_duration(raw: &str) -> Result<String, ValidationError> {
    let invalid = || ValidationError::BadDuration {
        value: raw.to_string(),
    };

    let text = collapse_whitespace(raw).to_lowercase();
    let total_minutes: u64 = if !text.is_empty() && text.bytes().all(|b| b.is_ascii_digit()) {
        text.parse().map_err(|_| invalid())?
    } else {
        let caps = DURATION.captures(&text).ok_or_else(invalid)?;
        let hours = caps.get(1).map(|m| m.as_str().parse::<u64>());
        let minutes = caps.get(2).map(|m| m.as_str().parse::<u64>());
        if hours.is_none() && minutes.is_none() {
            return Err(invalid());
        }
        let hours = hours.transpose().map_err(|_| invalid())?.unwrap_or(0);
        let minutes = minutes.transpose().map_err(|_| invalid())?.unwrap_or(0);
        hours
            .checked_mul(60)
            .and_then(|h| h.checked_add(minutes))
            .ok_or_else(invalid)?
    };

    if total_minutes == 0 {
        return Err(invalid());
    }
    Ok(format!("{}h {}m", total_minutes / 60, total_minutes % 60))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collapse_whitespace() {
        assert_eq!(collapse_whitespace("  a \t b\u{00A0}\u{00A0}c\n"), "a b c");
        assert_eq!(collapse_whitespace("   "), "");
    }

    #[test]
    fn test_clean_title_keeps_punctuation() {
        assert_eq!(clean_title("  Zootopia "), "zootopia");
        assert_eq!(clean_title("Spider-Man:   No Way Home"), "spider-man: no way home");
    }

    #[test]
    fn test_normalize_text() {
        assert_eq!(
            normalize_text("Animation ,Comedy,  Family").as_deref(),
            Some("animation, comedy, family")
        );
        assert_eq!(
            normalize_text("Walt Disney Studios \u{2013} Motion Pictures,").as_deref(),
            Some("walt disney studios - motion pictures")
        );
        assert_eq!(normalize_text("Director\u{2019}s Cut").as_deref(), Some("director's cut"));
        assert_eq!(normalize_text("$341.3M").as_deref(), Some("$341.3m"));
        assert_eq!(normalize_text(" , \u{00A0} "), None);
        assert_eq!(normalize_text(""), None);
    }

    #[test]
    fn test_parse_score() {
        assert_eq!(parse_score("tomatometer_score", "98%").unwrap(), 98);
        assert_eq!(parse_score("tomatometer_score", " 0 ").unwrap(), 0);
        assert_eq!(parse_score("audience_score", "100").unwrap(), 100);
        assert!(matches!(
            parse_score("audience_score", "101"),
            Err(ValidationError::ScoreOutOfRange { value: 101, .. })
        ));
        assert!(matches!(
            parse_score("audience_score", "-5"),
            Err(ValidationError::ScoreOutOfRange { value: -5, .. })
        ));
        assert!(matches!(
            parse_score("audience_score", "--"),
            Err(ValidationError::NotNumeric { .. })
        ));
    }

    #[test]
    fn test_normalize_duration_forms() {
        assert_eq!(normalize_duration("1 hr 48 min").unwrap(), "1h 48m");
        assert_eq!(normalize_duration("1h 48m").unwrap(), "1h 48m");
        assert_eq!(normalize_duration("1h48m").unwrap(), "1h 48m");
        assert_eq!(normalize_duration("2 hours").unwrap(), "2h 0m");
        assert_eq!(normalize_duration("45 minutes").unwrap(), "0h 45m");
        assert_eq!(normalize_duration("108 min").unwrap(), "1h 48m");
        assert_eq!(normalize_duration("108").unwrap(), "1h 48m");
        assert_eq!(normalize_duration(" 1H  5M ").unwrap(), "1h 5m");
    }

    #[test]
    fn test_normalize_duration_rejects() {
        for raw in ["", "   ", "soon", "0", "0h 0m", "1h 48m extended", "h m"] {
            assert!(normalize_duration(raw).is_err(), "accepted {:?}", raw);
        }
    }
}
