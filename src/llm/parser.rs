//! Extraction of structured fields from free-text model responses

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;
use thiserror::Error;

/// Placeholder for a contact field the model did not report
pub const NOT_AVAILABLE: &str = "N/A";

static DIGIT_RUN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[0-9]+").expect("Invalid digit regex"));
static NAME_LINE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"Name:\s*(.*)").expect("Invalid name regex"));
static EMAIL_LINE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"Email:\s*(.*)").expect("Invalid email regex"));
static PHONE_LINE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"Phone:\s*(.*)").expect("Invalid phone regex"));

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScoreParseError {
    #[error("response contains no number: {0:?}")]
    NoDigits(String),

    #[error("{0} is not a valid percentage")]
    OutOfRange(String),
}

/// Read the match percentage from the first run of ASCII digits in `response`
pub fn parse_match_percentage(response: &str) -> Result<u8, ScoreParseError> {
    let digits = DIGIT_RUN
        .find(response)
        .ok_or_else(|| ScoreParseError::NoDigits(response.trim().to_string()))?
        .as_str();

    match digits.parse::<u32>() {
        Ok(value) if value <= 100 => Ok(value as u8),
        _ => Err(ScoreParseError::OutOfRange(digits.to_string())),
    }
}

/// Contact fields as reported by the model. Values are untrusted display strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactDetails {
    pub name: String,
    pub email: String,
    pub phone: String,
}

impl ContactDetails {
    pub fn parse(response: &str) -> Self {
        Self {
            name: labelled_value(&NAME_LINE, response),
            email: labelled_value(&EMAIL_LINE, response),
            phone: labelled_value(&PHONE_LINE, response),
        }
    }
}

impl Default for ContactDetails {
    fn default() -> Self {
        Self {
            name: NOT_AVAILABLE.to_string(),
            email: NOT_AVAILABLE.to_string(),
            phone: NOT_AVAILABLE.to_string(),
        }
    }
}

fn labelled_value(pattern: &Regex, response: &str) -> String {
    pattern
        .captures(response)
        .and_then(|captures| captures.get(1))
        .map(|value| value.as_str().trim().to_string())
        .unwrap_or_else(|| NOT_AVAILABLE.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_percentage_from_bare_number() {
        assert_eq!(parse_match_percentage("85"), Ok(85));
        assert_eq!(parse_match_percentage(" 100\n"), Ok(100));
        assert_eq!(parse_match_percentage("0"), Ok(0));
    }

    #[test]
    fn test_percentage_takes_first_digit_run() {
        assert_eq!(parse_match_percentage("Match: 92%"), Ok(92));
        assert_eq!(parse_match_percentage("About 41% (out of 100)"), Ok(41));
    }

    #[test]
    fn test_percentage_ignores_non_ascii_digits() {
        assert_eq!(parse_match_percentage("Score: ٨٥ (85%)"), Ok(85));
        assert!(matches!(parse_match_percentage("٨٥"), Err(ScoreParseError::NoDigits(_))));
    }

    #[test]
    fn test_percentage_parsing_is_idempotent() {
        let response = "The candidate is a 73% match.";
        let first = parse_match_percentage(response);
        let second = parse_match_percentage(response);
        assert_eq!(first, second);
        assert_eq!(first, Ok(73));
    }

    #[test]
    fn test_percentage_missing_is_explicit() {
        assert!(matches!(
            parse_match_percentage("I cannot evaluate this resume."),
            Err(ScoreParseError::NoDigits(_))
        ));
        assert!(matches!(parse_match_percentage(""), Err(ScoreParseError::NoDigits(_))));
    }

    #[test]
    fn test_percentage_out_of_range() {
        assert_eq!(
            parse_match_percentage("150"),
            Err(ScoreParseError::OutOfRange("150".to_string()))
        );
        assert!(matches!(
            parse_match_percentage("99999999999999999999"),
            Err(ScoreParseError::OutOfRange(_))
        ));
    }

    #[test]
    fn test_contact_all_fields_present() {
        let contact = ContactDetails::parse("Name:  Jane Doe \nEmail: jane@example.com\nPhone: +1 555 0100");
        assert_eq!(contact.name, "Jane Doe");
        assert_eq!(contact.email, "jane@example.com");
        assert_eq!(contact.phone, "+1 555 0100");
    }

    #[test]
    fn test_contact_missing_fields_become_placeholder() {
        let none = ContactDetails::parse("I could not find any contact details.");
        assert_eq!(none, ContactDetails::default());

        let one = ContactDetails::parse("Email: a@b.co");
        assert_eq!(one.name, NOT_AVAILABLE);
        assert_eq!(one.email, "a@b.co");
        assert_eq!(one.phone, NOT_AVAILABLE);

        let two = ContactDetails::parse("Name: Sam Lee\nPhone: 0123");
        assert_eq!(two.name, "Sam Lee");
        assert_eq!(two.email, NOT_AVAILABLE);
        assert_eq!(two.phone, "0123");
    }

    #[test]
    fn test_contact_values_are_not_validated() {
        let contact = ContactDetails::parse("Name: ???\nEmail: not-an-email\nPhone: call me");
        assert_eq!(contact.email, "not-an-email");
        assert_eq!(contact.phone, "call me");
    }
}
