use anyhow::{Result, anyhow};
use isolang::Language;

/// Language utilities for ISO language code handling
///
/// Annotation documents usually tag tiers with ISO 639-3 codes while people
/// tend to write ISO 639-1 codes or plain language names in configuration.
/// These helpers normalize codes so both can be compared and displayed.

// @const: ISO 639-2/B codes that differ from their ISO 639-2/T counterpart
const BIBLIOGRAPHIC_CODES: &[(&str, &str)] = &[
    ("fre", "fra"),
    ("ger", "deu"),
    ("dut", "nld"),
    ("gre", "ell"),
    ("chi", "zho"),
    ("cze", "ces"),
    ("ice", "isl"),
    ("alb", "sqi"),
    ("arm", "hye"),
    ("baq", "eus"),
    ("bur", "mya"),
    ("per", "fas"),
    ("geo", "kat"),
    ("may", "msa"),
    ("mac", "mkd"),
    ("rum", "ron"),
    ("slo", "slk"),
    ("wel", "cym"),
];

/// Normalize a language code to ISO 639-2/T (3-letter) format
pub fn normalize_to_part2t(code: &str) -> Result<String> {
    let normalized_code = code.trim().to_lowercase();

    if normalized_code.len() == 2 {
        if let Some(lang) = Language::from_639_1(&normalized_code) {
            return Ok(lang.to_639_3().to_string());
        }
    } else if normalized_code.len() == 3 {
        if Language::from_639_3(&normalized_code).is_some() {
            return Ok(normalized_code);
        }
        if let Some((_, terminology)) = BIBLIOGRAPHIC_CODES
            .iter()
            .find(|(bibliographic, _)| *bibliographic == normalized_code)
        {
            return Ok((*terminology).to_string());
        }
    }

    Err(anyhow!("Cannot normalize invalid language code: {}", code))
}

/// Check if two language codes match (represent the same language)
pub fn language_codes_match(code1: &str, code2: &str) -> bool {
    match (normalize_to_part2t(code1), normalize_to_part2t(code2)) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

/// Get the English language name from a code
pub fn get_language_name(code: &str) -> Result<String> {
    let normalized = normalize_to_part2t(code)?;
    let lang = Language::from_639_3(&normalized)
        .ok_or_else(|| anyhow!("Failed to get language from code: {}", normalized))?;

    Ok(lang.to_name().to_string())
}

/// Render a configured language for the manifest.
///
/// ISO codes become their English name, anything else (a free-form name
/// such as "Kaurna") is kept as written.
pub fn display_language(value: &str) -> String {
    let trimmed = value.trim();
    get_language_name(trimmed).unwrap_or_else(|_| trimmed.to_string())
}

/// Whether a configured language (code or name) refers to the given tier language
pub fn matches_language(configured: &str, tier_language: &str) -> bool {
    let configured = configured.trim();
    if configured.is_empty() {
        return false;
    }
    language_codes_match(configured, tier_language)
        || configured.eq_ignore_ascii_case(tier_language.trim())
        || configured.eq_ignore_ascii_case(&display_language(tier_language))
}
