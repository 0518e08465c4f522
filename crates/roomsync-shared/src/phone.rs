//! Phone number normalization used for contact de-duplication and for
//! linking contacts to registered accounts.

use crate::constants::MIN_PHONE_DIGITS;
use crate::error::ValidationError;

/// Reduce a free-text phone number to its digits, keeping a leading `+`.
///
/// `"999 999 9999"`, `"(999) 999-9999"` and `"9999999999"` all normalize to
/// `"9999999999"`.
pub fn normalize(raw: &str) -> String {
    let trimmed = raw.trim();
    let digits: String = trimmed.chars().filter(char::is_ascii_digit).collect();
    if trimmed.starts_with('+') {
        format!("+{digits}")
    } else {
        digits
    }
}

/// Whether `query` is written like a phone number: at least one digit and
/// nothing but digits, spaces and `+-().`.
pub fn is_phone_pattern(query: &str) -> bool {
    let query = query.trim();
    query.chars().any(|c| c.is_ascii_digit())
        && query
            .chars()
            .all(|c| c.is_ascii_digit() || matches!(c, ' ' | '+' | '-' | '(' | ')' | '.'))
}

/// Normalize and check that enough digits remain to be a dialable number.
pub fn normalize_checked(raw: &str) -> Result<String, ValidationError> {
    let normalized = normalize(raw);
    let digit_count = normalized.trim_start_matches('+').len();
    if digit_count < MIN_PHONE_DIGITS {
        return Err(ValidationError::InvalidPhone(raw.trim().to_string()));
    }
    Ok(normalized)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn phone_patterns_exclude_letters() {
        assert!(is_phone_pattern("999 9"));
        assert!(is_phone_pattern("+1 (555) 010-2030"));
        assert!(!is_phone_pattern("zed9"));
        assert!(!is_phone_pattern("anna 9"));
        assert!(!is_phone_pattern("--"));
    }

    #[test]
    fn whitespace_and_punctuation_are_ignored() {
        assert_eq!(normalize("999 999 9999"), "9999999999");
        assert_eq!(normalize("(999) 999-9999"), "9999999999");
        assert_eq!(normalize(" 9999999999 "), "9999999999");
    }

    #[test]
    fn leading_plus_is_kept() {
        assert_eq!(normalize("+91 99999 99999"), "+919999999999");
        assert_eq!(normalize("91+999"), "91999");
    }

    #[test]
    fn short_numbers_are_rejected() {
        assert!(matches!(
            normalize_checked("12 34"),
            Err(ValidationError::InvalidPhone(_))
        ));
        assert!(normalize_checked("+").is_err());
        assert_eq!(normalize_checked("555-1234").unwrap(), "5551234");
    }
}
