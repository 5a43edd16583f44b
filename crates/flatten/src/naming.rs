//! Flattened key derivation.

use once_cell::sync::Lazy;
use regex::Regex;

static LAST_WORD: Lazy<Regex> = Lazy::new(|| Regex::new(r"(\w+)$").unwrap());

/// `SystemName` -> `system name`, `bodies_by_type` -> `bodies by type`.
///
/// A space goes before every upper-case letter that follows a character which is
/// neither upper-case nor a space; underscores become spaces; the result is lower-cased.
pub fn spaced_words(raw: &str) -> String {
    if raw.trim().is_empty() { return String::new(); }
    let mut out = String::with_capacity(raw.len() * 2);
    let mut prev: Option<char> = None;
    for c in raw.chars() {
        if let Some(p) = prev {
            if c.is_uppercase() && p != ' ' && !p.is_uppercase() { out.push(' '); }
        }
        out.push(c);
        prev = Some(c);
    }
    out.replace('_', " ").to_lowercase()
}

/// Trailing word of a prefix, empty when the prefix does not end in a word character.
pub fn last_word(prefix: &str) -> &str {
    LAST_WORD.find(prefix).map(|m| m.as_str()).unwrap_or("")
}

/// Candidate key for `raw_field` under `prefix`.
///
/// A child whose name repeats the prefix's trailing word collapses onto the prefix
/// ("system" + `System` stays "system", never "system system").
pub fn resolve(prefix: &str, raw_field: &str) -> String {
    let child = spaced_words(raw_field);
    if child.is_empty() { return prefix.to_string(); }
    if prefix.is_empty() { return child; }
    if last_word(prefix).to_lowercase() == child { return prefix.to_string(); }
    format!("{} {}", prefix, child)
}

/// Key of a structural child (list index, map key, `entries`): appended verbatim.
pub fn child_key(prefix: &str, segment: impl std::fmt::Display) -> String {
    if prefix.is_empty() { segment.to_string() } else { format!("{} {}", prefix, segment) }
}
