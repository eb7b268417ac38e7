// src/parse/row.rs

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{debug, warn};

use super::types::{BitRange, Dimension, Extent, FieldRecord, NAME};

static NAME_BRIEF_VERBOSE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?P<brief>.+?)\((?P<name>.+?)\):(?P<verbose>.+)").expect("valid regex")
});
static BRIEF_VERBOSE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(?P<brief>.+?):(?P<verbose>.+)").expect("valid regex"));
static WORD_RANGE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d+) to (\d+)").expect("valid regex"));
static STRAY_HEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d+h").expect("valid regex"));

/// Positions at or above this are extraction noise, not a register layout.
pub const MAX_POSITION: u32 = 4096;

/// Parse one raw row into a [`FieldRecord`].
///
/// `offset` is the index of the cell that lines up with `headings[0]`: zero
/// for top-level rows, the parent heading count for nested rows whose leading
/// cells are blank. Cells missing from a short row read as empty.
pub fn parse_row(row: &[String], headings: &[String], offset: usize) -> FieldRecord {
    let mut record = FieldRecord::new();

    for (i, heading) in headings.iter().enumerate() {
        let cell = row.get(offset + i).map(String::as_str).unwrap_or("");

        if let Some(dim) = Dimension::from_heading(heading) {
            if let Some(extent) = parse_extent(dim, cell) {
                record.set_extent(dim, extent);
            }
            continue;
        }

        let flat = cell.replace('\n', "");
        if let Some(caps) = NAME_BRIEF_VERBOSE.captures(&flat) {
            record.set_text(NAME, caps["name"].trim().to_lowercase());
            record.set_text("brief", caps["brief"].trim());
            record.set_text("verbose", caps["verbose"].trim());
        } else if let Some(caps) = BRIEF_VERBOSE.captures(&flat) {
            record.set_text("brief", caps["brief"].trim());
            record.set_text("verbose", caps["verbose"].trim());
        } else {
            record.set_text(heading, cell);
        }
    }

    record
}

/// Read a `bits`/`bytes` cell. `None` means the cell contributes nothing.
pub fn parse_extent(dim: Dimension, cell: &str) -> Option<Extent> {
    if cell.is_empty() {
        debug!("{dim} value is an empty string");
        return None;
    }

    let parts: Result<Vec<u32>, _> = cell.split(':').map(|p| p.trim().parse::<u32>()).collect();
    match parts.as_deref() {
        Ok([n]) => return Some(bounded(dim, cell, BitRange::single(*n))),
        Ok([a, b]) => {
            if a < b {
                warn!("{dim} range is in wrong order: {cell}");
            }
            return Some(bounded(dim, cell, BitRange::new(*a, *b)));
        }
        Ok(_) => debug!("{dim} value has too many parts: {cell}"),
        Err(e) => debug!("{dim} value {cell:?} is not an integer range: {e}"),
    }

    if let Some(caps) = WORD_RANGE.captures(cell) {
        warn!("{dim} range is of the wrong format: {cell}");
        let a = caps[1].parse::<u32>().ok()?;
        let b = caps[2].parse::<u32>().ok()?;
        return Some(bounded(dim, cell, BitRange::new(a, b)));
    }

    if STRAY_HEX.is_match(cell) {
        warn!("{dim} value is of the wrong type: {cell}");
        return None;
    }

    Some(Extent::Malformed(
        cell.split(':').map(str::to_string).collect(),
    ))
}

fn bounded(dim: Dimension, cell: &str, range: BitRange) -> Extent {
    if range.hi < MAX_POSITION {
        return Extent::Range(range);
    }
    debug!("{dim} value {cell:?} is beyond position {MAX_POSITION}");
    Extent::Malformed(cell.split(':').map(str::to_string).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cells(raw: &[&str]) -> Vec<String> {
        raw.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn bit_ranges() {
        assert_eq!(
            parse_extent(Dimension::Bits, "31:16"),
            Some(Extent::Range(BitRange { hi: 31, lo: 16 }))
        );
        assert_eq!(
            parse_extent(Dimension::Bits, "7"),
            Some(Extent::Range(BitRange::single(7)))
        );
        // ascending pairs are flipped
        assert_eq!(
            parse_extent(Dimension::Bytes, "0:3"),
            Some(Extent::Range(BitRange { hi: 3, lo: 0 }))
        );
    }

    #[test]
    fn bit_fallbacks() {
        assert_eq!(
            parse_extent(Dimension::Bytes, "4 to 7"),
            Some(Extent::Range(BitRange { hi: 7, lo: 4 }))
        );
        assert_eq!(parse_extent(Dimension::Bits, "10h"), None);
        assert_eq!(parse_extent(Dimension::Bits, ""), None);
        assert_eq!(
            parse_extent(Dimension::Bits, "n:0"),
            Some(Extent::Malformed(vec!["n".into(), "0".into()]))
        );
    }

    #[test]
    fn huge_positions_are_malformed() {
        assert_eq!(
            parse_extent(Dimension::Bits, "4294967295:0"),
            Some(Extent::Malformed(vec!["4294967295".into(), "0".into()]))
        );
        assert_eq!(
            parse_extent(Dimension::Bytes, "4096"),
            Some(Extent::Malformed(vec!["4096".into()]))
        );
        assert_eq!(
            parse_extent(Dimension::Bytes, "4095:4000"),
            Some(Extent::Range(BitRange { hi: 4095, lo: 4000 }))
        );
        assert!(matches!(
            parse_extent(Dimension::Bytes, "0 to 99999"),
            Some(Extent::Malformed(_))
        ));
    }

    #[test]
    fn name_brief_verbose_cell() {
        let headings = cells(&["bits", "description"]);
        let row = cells(&[
            "15:00",
            "Command Identifier (CID):\nThis field specifies a unique identifier.",
        ]);
        let rec = parse_row(&row, &headings, 0);
        assert_eq!(rec.bits, Some(Extent::Range(BitRange { hi: 15, lo: 0 })));
        assert_eq!(rec.name.as_deref(), Some("cid"));
        assert_eq!(rec.text("brief"), Some("Command Identifier"));
        assert_eq!(
            rec.text("verbose"),
            Some("This field specifies a unique identifier.")
        );
        assert!(rec.text("description").is_none());
        assert_eq!(rec.children, Some(vec![]));
    }

    #[test]
    fn brief_verbose_and_plain_cells() {
        let headings = cells(&["value", "definition"]);
        let rec = parse_row(&cells(&["00h", "Deallocate: Free the range"]), &headings, 0);
        assert_eq!(rec.text("value"), Some("00h"));
        assert_eq!(rec.text("brief"), Some("Deallocate"));
        assert_eq!(rec.text("verbose"), Some("Free the range"));
        assert!(rec.name.is_none());

        let rec = parse_row(&cells(&["01h", "Reserved"]), &headings, 0);
        assert_eq!(rec.text("definition"), Some("Reserved"));
    }

    #[test]
    fn offset_rows_and_short_rows() {
        let headings = cells(&["value", "description"]);
        let row = cells(&["", "", "1h", "Enabled"]);
        let rec = parse_row(&row, &headings, 2);
        assert_eq!(rec.text("value"), Some("1h"));
        assert_eq!(rec.text("description"), Some("Enabled"));

        let rec = parse_row(&cells(&["2h"]), &headings, 0);
        assert_eq!(rec.text("description"), Some(""));
    }
}
