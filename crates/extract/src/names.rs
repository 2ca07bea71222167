//! Release names as they appear in the security index.

use crate::consts::{PRODUCT_VERSION_REGEX, RAPID_RESPONSE_LETTER_REGEX, UPDATE_NAME_REGEX};

const RAPID_RESPONSE: &str = "Rapid Security Response";
const UNKNOWN_VERSION: &str = "Unknown";

/// Extracts the OS release name a security index row starts with.
///
/// Recognizes desktop releases ("macOS Sonoma 14.4"), mobile releases
/// including paired ones ("iOS 17.4 and iPadOS 17.4") and Rapid Security
/// Responses of either. Rows for anything else (Safari, watchOS, ...) give
/// an empty string.
pub fn update_name(text: &str) -> String {
    let Some(captures) = UPDATE_NAME_REGEX.captures(text) else {
        return String::new();
    };
    let part = |index: usize| captures.get(index).map(|m| m.as_str().trim()).filter(|s| !s.is_empty());

    let mut name = String::new();
    if part(1).is_some() {
        name.push_str(RAPID_RESPONSE);
        name.push(' ');
    }
    if let Some(desktop) = part(2) {
        name.push_str(desktop);
        name.push(' ');
    }
    if let Some(first) = part(3) {
        name.push_str(first);
        name.push(' ');
    }
    if let Some(second) = part(7) {
        name.push_str("and ");
        name.push_str(second);
    }
    name.trim().to_string()
}

/// First dotted version number in `text`, or "Unknown".
pub fn product_version(text: &str) -> String {
    PRODUCT_VERSION_REGEX
        .find(text)
        .map(|m| m.as_str().to_string())
        .unwrap_or_else(|| UNKNOWN_VERSION.to_string())
}

/// Letter of a Rapid Security Response, e.g. `c` for "iOS 16.5.1 (c)".
pub fn rapid_response_letter(update_name: &str) -> Option<char> {
    if !update_name.contains(RAPID_RESPONSE) {
        return None;
    }
    RAPID_RESPONSE_LETTER_REGEX
        .captures(update_name)
        .and_then(|captures| captures.get(1))
        .and_then(|m| m.as_str().chars().next())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("macOS Sonoma 14.4", "macOS Sonoma 14.4")]
    #[case("macOS Sonoma 14.4.1 ", "macOS Sonoma 14.4.1")]
    #[case("iOS 17.4 and iPadOS 17.4", "iOS 17.4 and iPadOS 17.4")]
    #[case("iOS 16.7.6 and iPadOS 16.7.6", "iOS 16.7.6 and iPadOS 16.7.6")]
    #[case("Rapid Security Response iOS 16.5.1 (c)", "Rapid Security Response iOS 16.5.1 (c)")]
    #[case("Rapid Security Response macOS Ventura 13.4.1 (c)", "Rapid Security Response macOS Ventura 13.4.1 (c)")]
    #[case("iPadOS 17.4", "iPadOS 17.4")]
    #[case("Safari 17.4", "")]
    #[case("watchOS 10.4", "")]
    #[case("", "")]
    fn update_names_are_detected(#[case] text: &str, #[case] expected: &str) {
        assert_eq!(update_name(text), expected);
    }

    #[rstest]
    #[case("macOS Sonoma 14.4.1", "14.4.1")]
    #[case("Rapid Security Response iOS 16.5.1 (c)", "16.5.1")]
    #[case("AirPort Base Station Firmware Update", "Unknown")]
    fn product_versions_are_extracted(#[case] text: &str, #[case] expected: &str) {
        assert_eq!(product_version(text), expected);
    }

    #[rstest]
    #[case("Rapid Security Response iOS 16.5.1 (c)", Some('c'))]
    #[case("Rapid Security Response macOS Ventura 13.4.1 (a)", Some('a'))]
    #[case("iOS 17.4 (note)", None)]
    #[case("macOS Sonoma 14.4", None)]
    fn rapid_response_letters(#[case] name: &str, #[case] expected: Option<char>) {
        assert_eq!(rapid_response_letter(name), expected);
    }
}
