//! Language utilities for language tag handling
//!
//! Configuration and jobs use short tags such as `en`, `pt-br` or `zh-TW`.
//! Each backend spells them differently, so this module validates the tag
//! once and maps it to the form each provider expects.

use anyhow::{Result, anyhow};
use isolang::Language;

/// Language code type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LanguageCodeType {
    /// ISO 639-1 (2-letter) code
    Part1,
    /// ISO 639-3 / 639-2/T (3-letter) code
    Part2T,
}

/// Validate if a language code is a valid ISO 639-1 or ISO 639-3 code
pub fn validate_language_code(code: &str) -> Result<LanguageCodeType> {
    let normalized_code = code.trim().to_lowercase();

    if normalized_code.len() == 2 && Language::from_639_1(&normalized_code).is_some() {
        return Ok(LanguageCodeType::Part1);
    }
    if normalized_code.len() == 3 && Language::from_639_3(&normalized_code).is_some() {
        return Ok(LanguageCodeType::Part2T);
    }

    Err(anyhow!("Invalid language code: {}", code))
}

/// Split a tag like `pt-BR` or `pt_br` into its lowercase language and region parts
fn split_tag(tag: &str) -> (String, Option<String>) {
    let normalized = tag.trim().to_lowercase().replace('_', "-");
    match normalized.split_once('-') {
        Some((base, region)) if !region.is_empty() => (base.to_string(), Some(region.to_string())),
        Some((base, _)) => (base.to_string(), None),
        None => (normalized, None),
    }
}

/// Validate a language tag: the language part must be a known ISO code
pub fn validate_language_tag(tag: &str) -> Result<()> {
    let (base, region) = split_tag(tag);
    validate_language_code(&base)?;
    if let Some(region) = region {
        if !(2..=4).contains(&region.len()) || !region.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(anyhow!("Invalid region in language tag: {}", tag));
        }
    }
    Ok(())
}

/// Lowercase language part of a tag (`pt-br` -> `pt`)
pub fn base_code(tag: &str) -> String {
    split_tag(tag).0
}

/// Get the English language name from a tag
pub fn get_language_name(tag: &str) -> Result<String> {
    let base = base_code(tag);
    let lang = match base.len() {
        2 => Language::from_639_1(&base),
        3 => Language::from_639_3(&base),
        _ => None,
    }
    .ok_or_else(|| anyhow!("Failed to get language from code: {}", tag))?;

    Ok(lang.to_name().to_string())
}

/// Tag as the Google web endpoint expects it: bare language, except Chinese scripts
pub fn to_google_code(tag: &str) -> String {
    match split_tag(tag) {
        (base, Some(region)) if base == "zh" => format!("zh-{}", region.to_uppercase()),
        (base, _) => base,
    }
}

/// Tag as DeepL expects it: uppercase, region only for target languages
pub fn to_deepl_code(tag: &str, is_target: bool) -> String {
    match split_tag(tag) {
        (base, Some(region)) if is_target => format!("{}-{}", base, region).to_uppercase(),
        (base, _) => base.to_uppercase(),
    }
}

/// Tag as MyMemory and translate-shell expect it: lowercase with region
pub fn to_lowercase_tag(tag: &str) -> String {
    match split_tag(tag) {
        (base, Some(region)) => format!("{}-{}", base, region),
        (base, None) => base,
    }
}
