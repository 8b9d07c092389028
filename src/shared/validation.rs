use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    /// Characters that never survive safe-name generation
    /// - Kept: lowercase ascii letters, digits, underscore, hyphen
    pub static ref UNSAFE_NAME_CHARS: Regex = Regex::new(r"[^a-z0-9_-]+").unwrap();

    /// Regex for validating file and folder names in the catalog
    /// Must not contain path separators, control characters, or be a dot segment
    /// - Valid: "report.pdf", "Photos 2024", "a-b_c"
    /// - Invalid: "a/b", "a\\b", ".", ".."
    pub static ref ENTRY_NAME_REGEX: Regex =
        Regex::new(r"^(?:[^/\\\x00-\x1f.][^/\\\x00-\x1f]*|\.[^/\\\x00-\x1f.][^/\\\x00-\x1f]*|\.\.[^/\\\x00-\x1f]+)$").unwrap();
}
