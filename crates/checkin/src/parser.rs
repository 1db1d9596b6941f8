//! Parsing of decoded QR payloads and bulk guest lists.
//!
//! The canonical payload is plain text, `name,phone`. Fields are split on
//! commas and trimmed; empty fields are discarded and the first two
//! remaining fields become the name and phone. Anything past the second
//! field is ignored.

use thiserror::Error;
use tracing::trace;

use crate::guest::Candidate;

/// Errors produced when decoded text is not a guest code.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    /// Fewer than two non-empty fields were present.
    #[error("unreadable or malformed code: expected `name,phone`, found {found} usable field(s)")]
    MissingFields {
        /// Number of non-empty fields found.
        found: usize,
    },
}

/// Parse a single decoded payload into a candidate.
///
/// # Errors
///
/// Returns [`ParseError::MissingFields`] when fewer than two non-empty
/// comma-separated fields are present.
pub fn parse_candidate(text: &str) -> Result<Candidate, ParseError> {
    let mut fields = text.split(',').map(str::trim).filter(|f| !f.is_empty());

    match (fields.next(), fields.next()) {
        (Some(name), Some(phone)) => Ok(Candidate::new(name, phone)),
        (first, _) => Err(ParseError::MissingFields {
            found: usize::from(first.is_some()),
        }),
    }
}

/// Result of parsing a bulk guest list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BulkParse {
    /// Candidates in input order.
    pub candidates: Vec<Candidate>,
    /// Number of non-blank lines that were not guest rows.
    pub skipped: usize,
}

impl BulkParse {
    /// Check whether no usable rows were found.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }
}

/// Parse newline-delimited `name,phone` rows.
///
/// Blank lines are skipped. Malformed lines are skipped silently and only
/// counted.
#[must_use]
pub fn parse_bulk(text: &str) -> BulkParse {
    let mut parsed = BulkParse::default();

    for (index, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        match parse_candidate(line) {
            Ok(candidate) => parsed.candidates.push(candidate),
            Err(e) => {
                trace!(line = index + 1, error = %e, "Skipping malformed row");
                parsed.skipped += 1;
            }
        }
    }

    parsed
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_two_fields() {
        let candidate = parse_candidate("Alex,555-1234").unwrap();
        assert_eq!(candidate, Candidate::new("Alex", "555-1234"));
    }

    #[test]
    fn test_parse_trims_whitespace() {
        let candidate = parse_candidate("  Jane Doe ,  +1 555 0100 \n").unwrap();
        assert_eq!(candidate.name, "Jane Doe");
        assert_eq!(candidate.phone, "+1 555 0100");
    }

    #[test]
    fn test_parse_ignores_extra_fields() {
        let candidate = parse_candidate("Alex,555,VIP,extra").unwrap();
        assert_eq!(candidate, Candidate::new("Alex", "555"));
    }

    #[test]
    fn test_parse_skips_empty_fields() {
        let candidate = parse_candidate("Alex,,555").unwrap();
        assert_eq!(candidate, Candidate::new("Alex", "555"));
    }

    #[test]
    fn test_parse_phone_not_validated() {
        let candidate = parse_candidate("Alex,not-a-number").unwrap();
        assert_eq!(candidate.phone, "not-a-number");
    }

    #[test]
    fn test_parse_rejects_single_field() {
        assert_eq!(
            parse_candidate("Alex"),
            Err(ParseError::MissingFields { found: 1 })
        );
        assert_eq!(
            parse_candidate("Alex,"),
            Err(ParseError::MissingFields { found: 1 })
        );
        assert_eq!(
            parse_candidate(" ,555"),
            Err(ParseError::MissingFields { found: 1 })
        );
    }

    #[test]
    fn test_parse_rejects_empty() {
        assert_eq!(
            parse_candidate(""),
            Err(ParseError::MissingFields { found: 0 })
        );
        assert_eq!(
            parse_candidate(" , , "),
            Err(ParseError::MissingFields { found: 0 })
        );
    }

    #[test]
    fn test_parse_rejects_json_payload() {
        // Single JSON object without commas outside of the object is one field.
        assert!(parse_candidate(r#"{"id":"GUEST-001"}"#).is_err());
    }

    #[test]
    fn test_bulk_skips_blank_lines() {
        let parsed = parse_bulk("A,1\nB,2\n\nC,3");
        assert_eq!(parsed.candidates.len(), 3);
        assert_eq!(parsed.skipped, 0);
        assert_eq!(parsed.candidates[2], Candidate::new("C", "3"));
    }

    #[test]
    fn test_bulk_counts_malformed_lines() {
        let parsed = parse_bulk("Jane Doe,555\nbad\n   \nJohn,\n");
        assert_eq!(parsed.candidates, vec![Candidate::new("Jane Doe", "555")]);
        assert_eq!(parsed.skipped, 2);
    }

    #[test]
    fn test_bulk_handles_crlf() {
        let parsed = parse_bulk("A,1\r\nB,2\r\n");
        assert_eq!(parsed.candidates.len(), 2);
        assert_eq!(parsed.candidates[1].phone, "2");
    }

    #[test]
    fn test_bulk_empty_input() {
        assert!(parse_bulk("").is_empty());
        assert!(parse_bulk("\n\n  \n").is_empty());
    }
}
