use regex::Regex;
use std::collections::BTreeSet;

/// Returns the distinct, non-overlapping matches of `pattern` in `text`.
pub fn extract(text: &str, pattern: &Regex) -> BTreeSet<String> {
    pattern
        .find_iter(text)
        .map(|m| m.as_str().to_string())
        .collect()
}
