//! Textual region matching for the region mode.
//!
//! No geometry is involved: a configured region matches a record when one of its keywords
//! appears, case-insensitively, in the record's visibility text. The supported regions carry
//! the keywords the catalogs use for them (country names, abbreviations such as `"N. America"`);
//! any other name is matched literally.

/// Regions offered to the user. `"Global"` matches every record with a visibility text.
pub const SUPPORTED_REGIONS: [&str; 8] = [
    "Global",
    "Africa",
    "Asia",
    "Europe",
    "North America",
    "South America",
    "Oceania",
    "Antarctica",
];

const REGION_KEYWORDS: &[(&str, &[&str])] = &[
    ("africa", &["africa"]),
    ("asia", &["asia"]),
    ("europe", &["europe"]),
    (
        "north america",
        &["north america", "n. america", "usa", "united states", "canada", "mexico", "alaska"],
    ),
    (
        "south america",
        &["south america", "s. america", "argentina", "chile", "brazil"],
    ),
    (
        "oceania",
        &["oceania", "oceana", "australia", "new zealand", "n.z."],
    ),
    ("antarctica", &["antarctica"]),
];

/// Keywords searched for a configured region, lower case.
pub fn region_keywords(region: &str) -> Vec<String> {
    let region = region.trim().to_lowercase();
    REGION_KEYWORDS
        .iter()
        .find(|(name, _)| *name == region)
        .map(|(_, keywords)| keywords.iter().map(|k| k.to_string()).collect())
        .unwrap_or_else(|| vec![region])
}

/// Whether a record's visibility text matches the configured region.
///
/// Arguments
/// ---------
/// * `region_text`: the record's free-text visibility regions
/// * `configured_region`: the region chosen by the user
///
/// Return
/// ------
/// * `false` for a missing or blank text, whatever the region
pub fn matches(region_text: Option<&str>, configured_region: &str) -> bool {
    let Some(text) = region_text.map(str::trim).filter(|t| !t.is_empty()) else {
        return false;
    };
    let configured = configured_region.trim();
    if configured.is_empty() {
        return false;
    }
    if configured.eq_ignore_ascii_case("global") {
        return true;
    }

    let text = text.to_lowercase();
    region_keywords(configured)
        .iter()
        .any(|keyword| text.contains(keyword.as_str()))
}

/// Canonical spelling of a supported region, if `name` is one.
pub fn canonical_region(name: &str) -> Option<&'static str> {
    SUPPORTED_REGIONS
        .iter()
        .copied()
        .find(|region| region.eq_ignore_ascii_case(name.trim()))
}
