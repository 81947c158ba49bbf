//! # Catalog document parsing
//!
//! Each remote layout has its own reader; all of them produce canonical [`EclipseRecord`]s (or,
//! for the regional index, the regional pages to fetch next).
//!
//! ## Layouts
//!
//! - **Decade table** (`SEdecade*.html`): one `<tr>` per eclipse with the cells
//!
//! ```text
//! | Calendar date | TD of greatest | Type | Saros | Magnitude | Central duration | Regions |
//! | 2027 Aug 02   | 10:07:50       | T    | 136   | 1.0790    | 06m23s           | Africa, Europe, ... |
//! ```
//!
//! - **Region index** (`JSEX-index.html`): anchors whose label names one of the
//!   [`JSEX_REGION_LABELS`].
//! - **Region page**: free text where each line mentioning an eclipse starts with its date,
//!   written `2027 Aug 02` or `02 Aug 2027`.
//!
//! ## Failure policy
//!
//! Optional cells that cannot be read become `None`. A row that is recognisably an eclipse but
//! whose date cannot be read fails the whole document with [`EngineError::Parse`], as does a
//! document with no eclipse at all. Records whose event is already over at `now` are dropped.
use chrono::NaiveDate;
use hifitime::{Epoch, TimeScale};
use once_cell::sync::Lazy;
use regex::Regex;

use super::{
    sources::{SourceDescriptor, SourceKind},
    EclipseKind, EclipseRecord,
};
use crate::{constants::JSEX_REGION_LABELS, engine_errors::EngineError, time::epoch_from_clock};

static ROW_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?is)<tr[^>]*>(.*?)</tr>").unwrap());
static CELL_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?is)<td[^>]*>(.*?)</td>").unwrap());
static TAG_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)<[^>]*>").unwrap());
static BREAK_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)<br\s*/?>|</tr>|</p>|</li>|</div>").unwrap());
static LINK_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?is)<a\s[^>]*href\s*=\s*["']([^"']+)["'][^>]*>(.*?)</a>"#).unwrap()
});
static CELL_DATE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d{4})\s+([A-Za-z]{3})[A-Za-z]*\.?\s+(\d{1,2})$").unwrap());
static YMD_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(\d{4})\s+(jan|feb|mar|apr|may|jun|jul|aug|sep|oct|nov|dec)[a-z]*\.?\s+(\d{1,2})\b")
        .unwrap()
});
static DMY_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(\d{1,2})\s+(jan|feb|mar|apr|may|jun|jul|aug|sep|oct|nov|dec)[a-z]*\.?\s+(\d{4})\b")
        .unwrap()
});
static KIND_WORD_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b(total|annular|partial|hybrid)\b").unwrap());
static DURATION_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(?:(\d+)\s*m)?\s*(\d+)\s*s$").unwrap());

/// Outcome of parsing one document.
#[derive(Debug, Clone, PartialEq)]
pub enum ParsedDocument {
    /// Future eclipses described by the document.
    Records(Vec<EclipseRecord>),
    /// Regional pages linked from the index.
    RegionLinks(Vec<SourceDescriptor>),
}

/// Parse a raw document according to the layout of its source.
///
/// Arguments
/// ---------
/// * `raw`: the document text
/// * `source`: where it came from, which selects the reader
/// * `now`: records of events already over at this instant are discarded
///
/// Return
/// ------
/// * The parsed content, or [`EngineError::Parse`] naming the source
pub fn parse_document(
    raw: &str,
    source: &SourceDescriptor,
    now: &Epoch,
) -> Result<ParsedDocument, EngineError> {
    match &source.kind {
        SourceKind::DecadeTable => parse_decade_table(raw, source)
            .map(|records| ParsedDocument::Records(retain_future(records, now))),
        SourceKind::RegionPage { region } => parse_region_page(raw, source, region)
            .map(|records| ParsedDocument::Records(retain_future(records, now))),
        SourceKind::RegionIndex => parse_region_index(raw, source).map(ParsedDocument::RegionLinks),
    }
}

fn retain_future(records: Vec<EclipseRecord>, now: &Epoch) -> Vec<EclipseRecord> {
    records.into_iter().filter(|r| r.is_future(now)).collect()
}

fn parse_error(source: &SourceDescriptor, reason: impl Into<String>) -> EngineError {
    EngineError::Parse {
        source_id: source.id.clone(),
        reason: reason.into(),
    }
}

/// Plain text of an HTML fragment: tags removed, common entities decoded, whitespace collapsed.
pub(crate) fn cell_text(html: &str) -> String {
    let text = TAG_RE.replace_all(html, " ");
    let text = decode_entities(&text);
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn decode_entities(text: &str) -> String {
    text.replace("&nbsp;", " ")
        .replace("&#160;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&amp;", "&")
}

fn month_number(name: &str) -> Option<u32> {
    let month = match name.get(..3)?.to_ascii_lowercase().as_str() {
        "jan" => 1,
        "feb" => 2,
        "mar" => 3,
        "apr" => 4,
        "may" => 5,
        "jun" => 6,
        "jul" => 7,
        "aug" => 8,
        "sep" => 9,
        "oct" => 10,
        "nov" => 11,
        "dec" => 12,
        _ => return None,
    };
    Some(month)
}

fn make_date(year: &str, month: &str, day: &str) -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(year.parse().ok()?, month_number(month)?, day.parse().ok()?)
}

/// `"02m18s"` or `"45s"` to seconds; `"-"` and blanks are absent.
fn parse_duration(text: &str) -> Option<f64> {
    let caps = DURATION_RE.captures(text.trim())?;
    let minutes: f64 = caps.get(1).map_or(Some(0.0), |m| m.as_str().parse().ok())?;
    let seconds: f64 = caps.get(2)?.as_str().parse().ok()?;
    Some(minutes * 60.0 + seconds)
}

fn non_empty(text: String) -> Option<String> {
    let trimmed = text.trim();
    if trimmed.is_empty() || trimmed == "-" {
        None
    } else {
        Some(trimmed.to_string())
    }
}

fn parse_decade_table(raw: &str, source: &SourceDescriptor) -> Result<Vec<EclipseRecord>, EngineError> {
    let mut records = Vec::new();

    for row in ROW_RE.captures_iter(raw) {
        let cells: Vec<String> = CELL_RE
            .captures_iter(&row[1])
            .map(|cell| cell_text(&cell[1]))
            .collect();

        // an eclipse row is recognised by its type cell
        let Some(kind) = cells.get(2).and_then(|c| EclipseKind::from_label(c)) else {
            continue;
        };

        let date = CELL_DATE_RE
            .captures(&cells[0])
            .and_then(|caps| make_date(&caps[1], &caps[2], &caps[3]))
            .ok_or_else(|| {
                parse_error(source, format!("unreadable eclipse date '{}'", cells[0]))
            })?;

        let mut record = EclipseRecord::new(date, kind, source);
        record.maximum_utc = cells
            .get(1)
            .and_then(|clock| epoch_from_clock(date, clock, TimeScale::TT));
        record.saros = cells.get(3).and_then(|c| c.parse().ok());
        record.magnitude = cells.get(4).and_then(|c| c.parse().ok());
        record.central_duration = cells.get(5).and_then(|c| parse_duration(c));
        record.global_region_text = cells.get(6).cloned().and_then(non_empty);

        records.push(record);
    }

    if records.is_empty() {
        return Err(parse_error(source, "no eclipse rows found"));
    }
    log::debug!("{} eclipse rows read from {source}", records.len());
    Ok(records)
}

fn parse_region_index(raw: &str, source: &SourceDescriptor) -> Result<Vec<SourceDescriptor>, EngineError> {
    let mut pages: Vec<SourceDescriptor> = Vec::new();

    for link in LINK_RE.captures_iter(raw) {
        let label = cell_text(&link[2]);
        let Some((region, _)) = JSEX_REGION_LABELS
            .iter()
            .find(|(_, jsex_label)| jsex_label.eq_ignore_ascii_case(&label))
        else {
            continue;
        };

        let page = SourceDescriptor::region_page(region, &link[1]);
        if !pages.iter().any(|known| known.kind == page.kind) {
            pages.push(page);
        }
    }

    if pages.is_empty() {
        return Err(parse_error(source, "no regional listing links found"));
    }
    Ok(pages)
}

fn parse_region_page(
    raw: &str,
    source: &SourceDescriptor,
    region: &str,
) -> Result<Vec<EclipseRecord>, EngineError> {
    let text = decode_entities(&TAG_RE.replace_all(&BREAK_RE.replace_all(raw, "\n"), " "));
    let mut records: Vec<EclipseRecord> = Vec::new();
    let mut dated_lines = 0;

    for line in text.lines() {
        let date_caps = YMD_RE
            .captures(line)
            .map(|c| (c[1].to_string(), c[2].to_string(), c[3].to_string()))
            .or_else(|| {
                DMY_RE
                    .captures(line)
                    .map(|c| (c[3].to_string(), c[2].to_string(), c[1].to_string()))
            });
        let Some((year, month, day)) = date_caps else {
            continue;
        };
        dated_lines += 1;

        let date = make_date(&year, &month, &day).ok_or_else(|| {
            parse_error(source, format!("unreadable eclipse date '{year} {month} {day}'"))
        })?;

        let Some(kind) = KIND_WORD_RE
            .captures(line)
            .and_then(|c| EclipseKind::from_label(&c[1]))
        else {
            log::debug!("{source}: no eclipse type on the line for {date}, skipped");
            continue;
        };

        if records.iter().any(|r| r.date_utc == date) {
            continue;
        }
        let mut record = EclipseRecord::new(date, kind, source);
        record.global_region_text = Some(region.to_string());
        records.push(record);
    }

    if dated_lines == 0 {
        return Err(parse_error(source, "no eclipse dates found"));
    }
    Ok(records)
}

#[cfg(test)]
mod parser_test {
    use super::*;
    use crate::time::date_to_epoch;

    const DECADE: &str = r#"
<table>
<tr><th>Calendar Date</th><th>TD of Greatest Eclipse</th><th>Eclipse Type</th></tr>
<tr><td><a href="SEplot/SE2026Aug12T.GIF">2026 Aug 12</a></td><td>17:47:06</td><td>Total</td>
    <td>126</td><td>1.0386</td><td>02m18s</td><td>n N. America, w Africa, Europe<br>[Total: Greenland, Iceland, Spain]</td></tr>
<tr><td>2027&nbsp;Feb&nbsp;06</td><td>16:00:48</td><td>A</td><td>131</td><td>0.9281</td><td>07m51s</td><td>S. America, Antarctica, w &amp; s Africa</td></tr>
<tr><td>2027 Aug 02</td><td>10:07:50</td><td>T</td><td>136</td><td>1.0790</td><td>06m23s</td><td>Africa, Europe, Mid East, w &amp; s Asia</td></tr>
<tr><td>2029 Jan 14</td><td>17:13:48</td><td>Partial</td><td>151</td><td>0.8714</td><td>-</td><td></td></tr>
</table>"#;

    fn decade_source() -> SourceDescriptor {
        SourceDescriptor::decade_table("https://host/SEdecade2021.html")
    }

    fn records(parsed: ParsedDocument) -> Vec<EclipseRecord> {
        match parsed {
            ParsedDocument::Records(records) => records,
            other => panic!("expected records, got {other:?}"),
        }
    }

    #[test]
    fn test_decade_table_rows() {
        let now = date_to_epoch(NaiveDate::from_ymd_opt(2026, 1, 1).unwrap());
        let records = records(parse_document(DECADE, &decade_source(), &now).unwrap());
        assert_eq!(records.len(), 4);

        let aug = &records[0];
        assert_eq!(aug.date_utc, NaiveDate::from_ymd_opt(2026, 8, 12).unwrap());
        assert_eq!(aug.kind, EclipseKind::Total);
        assert_eq!(aug.saros, Some(126));
        assert_eq!(aug.central_duration, Some(138.0));
        assert_eq!(
            aug.global_region_text.as_deref(),
            Some("n N. America, w Africa, Europe [Total: Greenland, Iceland, Spain]")
        );
        assert_eq!(aug.source_id, "SEdecade2021");
        let max = aug.maximum_utc.unwrap();
        assert_eq!(max, Epoch::from_gregorian(2026, 8, 12, 17, 47, 6, 0, TimeScale::TT));

        assert_eq!(records[1].kind, EclipseKind::Annular);
        assert_eq!(
            records[1].global_region_text.as_deref(),
            Some("S. America, Antarctica, w & s Africa")
        );

        let partial = &records[3];
        assert_eq!(partial.kind, EclipseKind::Partial);
        assert_eq!(partial.central_duration, None);
        assert_eq!(partial.global_region_text, None);
        assert_eq!(partial.magnitude, Some(0.8714));
    }

    #[test]
    fn test_past_rows_are_discarded() {
        let now = Epoch::from_gregorian_utc_hms(2027, 3, 1, 0, 0, 0);
        let records = records(parse_document(DECADE, &decade_source(), &now).unwrap());
        let dates: Vec<String> = records.iter().map(|r| r.date_utc.to_string()).collect();
        assert_eq!(dates, vec!["2027-08-02", "2029-01-14"]);
    }

    #[test]
    fn test_unreadable_date_fails_document() {
        let raw = "<tr><td>2027 Foo 02</td><td>10:07:50</td><td>Total</td></tr>";
        let now = Epoch::from_gregorian_utc_hms(2026, 1, 1, 0, 0, 0);
        let err = parse_document(raw, &decade_source(), &now).unwrap_err();
        assert!(matches!(err, EngineError::Parse { ref source_id, .. } if source_id == "SEdecade2021"));
    }

    #[test]
    fn test_document_without_rows_fails() {
        let now = Epoch::from_gregorian_utc_hms(2026, 1, 1, 0, 0, 0);
        let err = parse_document("<html>Service unavailable</html>", &decade_source(), &now);
        assert!(matches!(err, Err(EngineError::Parse { .. })));
    }

    #[test]
    fn test_missing_time_is_tolerated() {
        let raw = "<tr><td>2030 Jun 01</td><td>n/a</td><td>Annular</td></tr>";
        let now = Epoch::from_gregorian_utc_hms(2026, 1, 1, 0, 0, 0);
        let records = records(parse_document(raw, &decade_source(), &now).unwrap());
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].maximum_utc, None);
        assert_eq!(records[0].saros, None);
    }

    #[test]
    fn test_region_index_links() {
        let raw = r#"<ul>
            <li><a href="./JSEX-EU.html">Europe</a></li>
            <li><a href='JSEX-AS.html'> Asia and Asia Minor </a></li>
            <li><a href="JSEX-OC.html">Southeast Asia, Australia &amp; Oceana</a></li>
            <li><a href="about.html">About</a></li>
        </ul>"#;
        let index = SourceDescriptor::region_index("https://host/JSEX-index.html");
        let now = Epoch::from_gregorian_utc_hms(2026, 1, 1, 0, 0, 0);
        let ParsedDocument::RegionLinks(pages) = parse_document(raw, &index, &now).unwrap() else {
            panic!("expected links");
        };
        let regions: Vec<&SourceKind> = pages.iter().map(|p| &p.kind).collect();
        assert_eq!(
            regions,
            vec![
                &SourceKind::RegionPage { region: "Europe".into() },
                &SourceKind::RegionPage { region: "Asia".into() },
                &SourceKind::RegionPage { region: "Oceania".into() },
            ]
        );
        assert_eq!(pages[0].url, "https://eclipse.gsfc.nasa.gov/JSEX/JSEX-EU.html");
    }

    #[test]
    fn test_region_page_lines() {
        let raw = "<pre>2027 Aug 02  Total   Spain\n\
                   12 Aug 2026 Total eclipse<br>\
                   2030 Jun 01 Annular\n\
                   2030 Jun 01 Annular (repeated)\n\
                   2031 May 21 (type unknown)</pre>";
        let page = SourceDescriptor::region_page("Europe", "JSEX-EU.html");
        let now = Epoch::from_gregorian_utc_hms(2026, 1, 1, 0, 0, 0);
        let records = records(parse_document(raw, &page, &now).unwrap());

        let dates: Vec<String> = records.iter().map(|r| r.date_utc.to_string()).collect();
        assert_eq!(dates, vec!["2027-08-02", "2026-08-12", "2030-06-01"]);
        assert!(records
            .iter()
            .all(|r| r.global_region_text.as_deref() == Some("Europe")));
        assert_eq!(records[0].source_id, "jsex:europe");
    }

    #[test]
    fn test_duration_cells() {
        assert_eq!(parse_duration("06m23s"), Some(383.0));
        assert_eq!(parse_duration("45s"), Some(45.0));
        assert_eq!(parse_duration("-"), None);
        assert_eq!(parse_duration(""), None);
    }
}
