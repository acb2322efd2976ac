/*!
 * Placeholder protection for translatable strings.
 *
 * Strings such as `User {id} logged in` carry named placeholders that must
 * survive translation untouched. Before a string goes to a provider each
 * placeholder is swapped for an opaque `__PH<n>__` token, and the tokens are
 * swapped back afterwards.
 */

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::{BTreeSet, HashMap};

/// Named placeholder: `{name}` with an identifier inside
static PLACEHOLDER_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\{[a-zA-Z_][a-zA-Z0-9_]*\}").unwrap()
});

/// Opaque token, tolerating the spacing and case changes some backends introduce
static TOKEN_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"__\s?[Pp][Hh]\s?(\d+)\s?__").unwrap()
});

/// Token standing in for the placeholder at `index`
pub fn token(index: usize) -> String {
    format!("__PH{}__", index)
}

/// Replace every placeholder with an opaque token
///
/// Returns the protected text and the token -> placeholder mapping.
pub fn protect(text: &str) -> (String, HashMap<String, String>) {
    let mut mapping = HashMap::new();
    let mut counter = 0usize;

    let protected = PLACEHOLDER_REGEX.replace_all(text, |caps: &regex::Captures| {
        let token = token(counter);
        counter += 1;
        mapping.insert(token.clone(), caps[0].to_string());
        token
    });

    (protected.into_owned(), mapping)
}

/// Put the original placeholders back in place of their tokens
///
/// Tokens without a mapping entry are left as they are.
pub fn restore(text: &str, mapping: &HashMap<String, String>) -> String {
    if mapping.is_empty() {
        return text.to_string();
    }

    TOKEN_REGEX
        .replace_all(text, |caps: &regex::Captures| {
            let canonical = format!("__PH{}__", &caps[1]);
            mapping
                .get(&canonical)
                .cloned()
                .unwrap_or_else(|| caps[0].to_string())
        })
        .into_owned()
}

/// Set of distinct placeholders in a text
pub fn placeholder_set(text: &str) -> BTreeSet<String> {
    PLACEHOLDER_REGEX
        .find_iter(text)
        .map(|m| m.as_str().to_string())
        .collect()
}

/// Whether both texts carry the same set of placeholders
pub fn placeholders_match(source: &str, output: &str) -> bool {
    placeholder_set(source) == placeholder_set(output)
}
