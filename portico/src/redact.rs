//! Masking of sensitive substrings in log messages.
//!
//! [`mask`] runs every pattern of [`SENSITIVE_PATTERNS`] over a message, in
//! order, replacing each match with [`REDACTED`]. The patterns are broad on
//! purpose: any free-standing run of three or four digits is treated as a
//! possible CVN, so `"order 123"` is logged as `"order [REDACTED]"`.
//!
//! The placeholder contains no digits and passes repeat until nothing changes,
//! so masking an already masked message is a no-op.
//!
//! # Example
//!
//! ```rust
//! use portico::redact::mask;
//!
//! assert_eq!(mask("card 4111111111111111 declined"), "card [REDACTED] declined");
//! assert_eq!(mask(&mask("ssn 123-45-6789")), mask("ssn 123-45-6789"));
//! ```

use std::sync::LazyLock;

use regex::Regex;

/// Replacement text for every sensitive match.
pub const REDACTED: &str = "[REDACTED]";

/// Version of [`SENSITIVE_PATTERNS`]. Bump on any change to the list.
pub const PATTERN_SET_VERSION: u32 = 1;

/// A named sensitive-data pattern.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SensitivePattern {
    /// Short label of the data shape.
    pub name: &'static str,
    /// Regular expression source.
    pub pattern: &'static str,
}

const fn pattern(name: &'static str, pattern: &'static str) -> SensitivePattern {
    SensitivePattern { name, pattern }
}

/// Ordered pattern set applied by [`mask`].
pub const SENSITIVE_PATTERNS: [SensitivePattern; 17] = [
    pattern("cvn-3", r"\b\d{3}\b"),
    pattern("cvn-4", r"\b\d{4}\b"),
    pattern("card-16", r"\b\d{16}\b"),
    pattern("card-15", r"\b\d{15}\b"),
    pattern("ssn-9", r"\b\d{9}\b"),
    pattern("ssn-formatted", r"\b\d{3}-\d{2}-\d{4}\b"),
    pattern("card-dashed", r"\b\d{4}-\d{4}-\d{4}-\d{4}\b"),
    pattern("card-dashed-embedded", r"\d{4}-\d{4}-\d{4}-\d{4}"),
    pattern("card-spaced", r"\b\d{4} \d{4} \d{4} \d{4}\b"),
    pattern("card-spaced-embedded", r"\d{4} \d{4} \d{4} \d{4}"),
    pattern("card-grouped", r"\b\d{4}\d{4}\d{4}\d{4}\b"),
    pattern("card-grouped-embedded", r"\d{4}\d{4}\d{4}\d{4}"),
    pattern("amex", r"\b^3[47][0-9]{13}$\b"),
    pattern("visa", r"\b^4[0-9]{12}(?:[0-9]{3})?$\b"),
    pattern("mastercard", r"\b^5[1-5][0-9]{14}$\b"),
    pattern("discover", r"\b^6(?:011|5[0-9]{2})[0-9]{12}$\b"),
    pattern("maestro", r"\b^(?:5[0678]\d\d|6304|6390|67\d\d)\d{8,15}$\b"),
];

#[allow(clippy::expect_used)] // the pattern list is a compile-time constant covered by tests
static COMPILED: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    SENSITIVE_PATTERNS
        .iter()
        .map(|p| Regex::new(p.pattern).expect("sensitive pattern must compile"))
        .collect()
});

/// Returns `message` with every sensitive substring replaced by [`REDACTED`].
///
/// Passes over the pattern set repeat until the message stops changing, so a
/// digit run left behind by a partial replacement is caught as well.
#[must_use]
pub fn mask(message: &str) -> String {
    let mut current = mask_once(message);
    loop {
        let next = mask_once(&current);
        if next == current {
            return current;
        }
        current = next;
    }
}

fn mask_once(message: &str) -> String {
    let mut current = message.to_owned();
    for regex in COMPILED.iter() {
        if regex.is_match(&current) {
            let replaced = regex.replace_all(&current, REDACTED).into_owned();
            current = replaced;
        }
    }
    current
}

#[cfg(test)]
mod tests {
    use super::*;

    fn longest_digit_run(text: &str) -> usize {
        text.split(|c: char| !c.is_ascii_digit())
            .map(str::len)
            .max()
            .unwrap_or(0)
    }

    #[test]
    fn test_all_patterns_compile() {
        assert_eq!(COMPILED.len(), SENSITIVE_PATTERNS.len());
    }

    #[test]
    fn test_plain_card_number() {
        let masked = mask("4111111111111111");
        assert!(masked.contains(REDACTED));
        assert!(longest_digit_run(&masked) < 13);
    }

    #[test]
    fn test_dashed_card_number() {
        let masked = mask("4111-1111-1111-1111");
        assert!(masked.contains(REDACTED));
        assert!(longest_digit_run(&masked) < 13);
    }

    #[test]
    fn test_spaced_card_number_in_sentence() {
        let masked = mask("charging 4111 1111 1111 1111 now");
        assert!(!masked.contains("1111"));
        assert!(masked.starts_with("charging "));
    }

    #[test]
    fn test_short_run_is_a_false_positive() {
        assert_eq!(mask("order 123"), "order [REDACTED]");
    }

    #[test]
    fn test_ssn_shapes() {
        assert_eq!(mask("ssn 123-45-6789"), "ssn [REDACTED]-45-[REDACTED]");
        assert_eq!(mask("ssn 123456789"), "ssn [REDACTED]");
    }

    #[test]
    fn test_amex_fifteen_digits() {
        assert_eq!(mask("378282246310005"), REDACTED);
    }

    #[test]
    fn test_thirteen_digit_visa_whole_message() {
        assert_eq!(mask("4222222222222"), REDACTED);
    }

    #[test]
    fn test_card_embedded_in_longer_run() {
        let masked = mask("x41111111111111119");
        assert!(masked.contains(REDACTED));
        assert!(longest_digit_run(&masked) < 13);
    }

    #[test]
    fn test_tail_of_long_run_is_caught() {
        assert_eq!(mask("x41111111111111119123"), "x[REDACTED][REDACTED]");
    }

    #[test]
    fn test_two_digit_and_text_untouched() {
        assert_eq!(mask("response code 00 APPROVAL"), "response code 00 APPROVAL");
    }

    #[test]
    fn test_idempotent() {
        let samples = [
            "",
            "order 123",
            "4111-1111-1111-1111",
            "card 5555555555554444 cvn 737 exp 12/30",
            "void failed for 0123456789, batch 42 closed",
            "[REDACTED] already",
            "x41111111111111119123",
            "ref 12345678901234567890123",
        ];
        for sample in samples {
            let once = mask(sample);
            assert_eq!(mask(&once), once, "not idempotent for {sample:?}");
        }
    }
}
