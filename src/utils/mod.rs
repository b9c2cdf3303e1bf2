use chrono::{DateTime, Utc};

use crate::error::IngestError;

/// Pull an entity id out of a provider reference URL.
///
/// The provider hands back `$ref` strings instead of flat ids, e.g.
/// `.../seasons/2024/teams/19?lang=en`. Given the path keyword ("teams",
/// "events", …) this returns the integer that follows it. Negative ids are
/// unusual but legal. A missing keyword or a keyword with no parseable
/// integer is a hard error: a defaulted id would corrupt the reconciliation
/// key downstream.
pub fn extract_ref_id(reference: &str, keyword: &str) -> Result<i64, IngestError> {
    let needle = format!("{}/", keyword);
    let mut from = 0usize;

    while let Some(rel) = reference[from..].find(&needle) {
        let start = from + rel + needle.len();
        let rest = &reference[start..];
        let bytes = rest.as_bytes();

        let mut end = 0usize;
        if bytes.first() == Some(&b'-') {
            end = 1;
        }
        while end < bytes.len() && bytes[end].is_ascii_digit() {
            end += 1;
        }

        if let Ok(id) = rest[..end].parse::<i64>() {
            return Ok(id);
        }
        from = start;
    }

    Err(IngestError::IdentifierExtraction {
        keyword: keyword.to_string(),
        reference: reference.to_string(),
    })
}

/// Kickoff display format used by the read API, e.g. "Sep 15, 1:00 PM".
pub fn format_kickoff(dt: DateTime<Utc>) -> String {
    dt.format("%b %-d, %-I:%M %p").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_id_after_keyword() {
        let r = "http://sports.core.api.example.com/v2/seasons/2024/teams/19?lang=en";
        assert_eq!(extract_ref_id(r, "teams").unwrap(), 19);
    }

    #[test]
    fn tolerates_negative_ids() {
        assert_eq!(extract_ref_id(".../teams/-1", "teams").unwrap(), -1);
    }

    #[test]
    fn fails_on_missing_keyword() {
        let err = extract_ref_id(".../events/5", "teams").unwrap_err();
        assert!(matches!(err, IngestError::IdentifierExtraction { .. }));
    }

    #[test]
    fn fails_when_keyword_has_no_integer() {
        let err = extract_ref_id(".../teams/?limit=50", "teams").unwrap_err();
        assert!(matches!(err, IngestError::IdentifierExtraction { .. }));
    }

    #[test]
    fn skips_a_bare_keyword_and_finds_a_later_match() {
        let r = ".../teams/all/seasons/2024/teams/7";
        assert_eq!(extract_ref_id(r, "teams").unwrap(), 7);
    }

    #[test]
    fn does_not_match_the_season_segment() {
        // "seasons/2024" must not satisfy a lookup for "teams"
        let err = extract_ref_id(".../seasons/2024", "teams").unwrap_err();
        assert!(matches!(err, IngestError::IdentifierExtraction { .. }));
    }
}
