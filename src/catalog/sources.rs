//! Descriptions of the remote catalog documents.
//!
//! A [`SourceDescriptor`] says where a document lives, how to read it, and how much it is trusted
//! when two documents disagree about the same date.
use std::fmt;

use crate::constants::JSEX_BASE_URL;

/// Prefix of the identifiers of regional listings (`jsex:europe`).
pub const REGION_PAGE_ID_PREFIX: &str = "jsex:";

/// Layout of a catalog document, which selects the parser.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SourceKind {
    /// NASA decade table: one `<tr>` per eclipse with times, type, saros and regions.
    DecadeTable,
    /// JSEX index listing the regional pages.
    RegionIndex,
    /// JSEX regional listing; every eclipse named on it is visible from `region`.
    RegionPage { region: String },
}

/// A remote document and its trust level.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SourceDescriptor {
    pub id: String,
    pub url: String,
    pub kind: SourceKind,
    /// Higher wins when two sources describe the same date.
    pub precedence: u8,
}

impl SourceDescriptor {
    pub const DECADE_PRECEDENCE: u8 = 20;
    pub const REGION_PRECEDENCE: u8 = 10;

    /// A decade table, identified by its file stem (e.g. `SEdecade2021`).
    pub fn decade_table(url: &str) -> Self {
        SourceDescriptor {
            id: file_stem(url),
            url: url.to_string(),
            kind: SourceKind::DecadeTable,
            precedence: Self::DECADE_PRECEDENCE,
        }
    }

    /// The regional index page. It carries no eclipse itself.
    pub fn region_index(url: &str) -> Self {
        SourceDescriptor {
            id: file_stem(url),
            url: url.to_string(),
            kind: SourceKind::RegionIndex,
            precedence: 0,
        }
    }

    /// A regional listing discovered on the index; relative links are resolved against the
    /// JSEX directory.
    pub fn region_page(region: &str, href: &str) -> Self {
        let url = if href.starts_with("http://") || href.starts_with("https://") {
            href.to_string()
        } else {
            format!("{JSEX_BASE_URL}{}", href.trim_start_matches("./").trim_start_matches('/'))
        };
        SourceDescriptor {
            id: format!(
                "{REGION_PAGE_ID_PREFIX}{}",
                region.to_lowercase().replace(' ', "-")
            ),
            url,
            kind: SourceKind::RegionPage {
                region: region.to_string(),
            },
            precedence: Self::REGION_PRECEDENCE,
        }
    }
}

impl fmt::Display for SourceDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.id, self.url)
    }
}

fn file_stem(url: &str) -> String {
    let last = url.rsplit('/').find(|s| !s.is_empty()).unwrap_or(url);
    last.split('.').next().unwrap_or(last).to_string()
}

#[cfg(test)]
mod sources_test {
    use super::*;
    use crate::constants::{JSEX_INDEX_URL, NASA_DECADE_URLS};

    #[test]
    fn test_descriptor_ids() {
        let decade = SourceDescriptor::decade_table(NASA_DECADE_URLS[0]);
        assert_eq!(decade.id, "SEdecade2021");
        assert_eq!(decade.kind, SourceKind::DecadeTable);

        let index = SourceDescriptor::region_index(JSEX_INDEX_URL);
        assert_eq!(index.id, "JSEX-index");
    }

    #[test]
    fn test_region_page_links_are_resolved() {
        let page = SourceDescriptor::region_page("North America", "./JSEX-NA.html");
        assert_eq!(page.url, "https://eclipse.gsfc.nasa.gov/JSEX/JSEX-NA.html");
        assert_eq!(page.id, "jsex:north-america");

        let absolute = SourceDescriptor::region_page("Europe", "https://example.org/eu.html");
        assert_eq!(absolute.url, "https://example.org/eu.html");
        assert!(absolute.precedence < SourceDescriptor::DECADE_PRECEDENCE);
    }
}
