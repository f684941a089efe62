//! HTTP status metadata
//!
//! Real HTTP codes live in 100..=599. Codes below 100 are reserved for outcomes
//! produced by the engine itself.

/// Page excluded by policy, no HTTP status involved
pub const STATUS_EXCLUDED: u16 = 0;

/// Response was not a document the scanner understands
pub const STATUS_UNSUPPORTED: u16 = 1;

/// The crawler itself failed on this page
pub const STATUS_CRAWLER_ERROR: u16 = 2;

/// Catch-all for HTTP codes outside the documented table
pub const STATUS_UNCOMMON: u16 = 599;

const DESCRIPTIONS: &[(u16, &str)] = &[
    (STATUS_EXCLUDED, "Page excluded"),
    (STATUS_UNSUPPORTED, "Not a supported document"),
    (STATUS_CRAWLER_ERROR, "Web crawler errored"),
    (200, "OK"),
    (204, "No content"),
    (300, "Multiple choices"),
    (301, "Moved permanently"),
    (302, "Found"),
    (303, "See other"),
    (304, "Not modified"),
    (307, "Temporary redirect"),
    (308, "Permanent redirect"),
    (400, "Bad request"),
    (401, "Unauthorized"),
    (403, "Forbidden"),
    (404, "Not found"),
    (405, "Method not allowed"),
    (408, "Request timeout"),
    (410, "Gone"),
    (429, "Too many requests"),
    (500, "Internal server error"),
    (501, "Not implemented"),
    (502, "Bad gateway"),
    (503, "Service unavailable"),
    (504, "Gateway timeout"),
    (STATUS_UNCOMMON, "Uncommon response status code received"),
];

/// Human-readable text for a status code
pub fn describe(code: u16) -> &'static str {
    DESCRIPTIONS
        .iter()
        .find(|(c, _)| *c == code)
        .map(|(_, text)| *text)
        .unwrap_or_else(|| describe(STATUS_UNCOMMON))
}

/// Returns true if the code has its own entry in the table
pub fn is_documented(code: u16) -> bool {
    DESCRIPTIONS.iter().any(|(c, _)| *c == code)
}

/// Maps undocumented codes onto [`STATUS_UNCOMMON`]
pub fn normalize(code: u16) -> u16 {
    if is_documented(code) {
        code
    } else {
        STATUS_UNCOMMON
    }
}
