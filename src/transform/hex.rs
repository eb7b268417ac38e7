// src/transform/hex.rs

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

use super::{Table, TransformOptions};
use crate::error::LintResult;
use crate::parse::types::{BITS, BYTES, CHILDREN, NAME};

static HEX_VALUE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[0-9A-F]+h$").expect("valid regex"));
static HEX_RANGE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[0-9A-F]+h to [0-9A-F]+h$").expect("valid regex"));

pub const HEX_PREFIX: &str = "hex-";

fn is_hex(value: &str) -> bool {
    HEX_VALUE.is_match(value) || HEX_RANGE.is_match(value)
}

/// Rename every column holding at least one hex value to `hex-<heading>`,
/// in the heading list and in every row. Returns the new headings.
pub fn detect_hex_columns(table: &mut Table) -> Vec<String> {
    let mut detected = Vec::new();

    for idx in 0..table.headings.len() {
        let heading = table.headings[idx].clone();
        if heading.starts_with(HEX_PREFIX) || [BITS, BYTES, CHILDREN, NAME].contains(&heading.as_str())
        {
            continue;
        }
        let has_hex = table
            .rows
            .iter()
            .any(|row| row.text(&heading).is_some_and(is_hex));
        if !has_hex {
            continue;
        }

        let renamed = format!("{HEX_PREFIX}{heading}");
        for row in &mut table.rows {
            row.rename_text(&heading, &renamed);
        }
        debug!("{}: '{heading}' holds hex values", table.title);
        table.headings[idx] = renamed.clone();
        detected.push(renamed);
    }

    detected
}

/// `"20h"` → `"0x20"`. Anything else is not a single hex value.
pub fn change_hex_format(value: &str) -> Option<String> {
    if !HEX_VALUE.is_match(value) {
        return None;
    }
    value.strip_suffix('h').map(|digits| format!("0x{digits}"))
}

/// Keep only rows with a single hex value in each hex column and rewrite
/// those values in `0x` form. Value ranges are not supported and dropped.
pub fn clean_hex(table: &mut Table, _: &TransformOptions) -> LintResult<()> {
    for heading in detect_hex_columns(table) {
        let before = table.rows.len();
        table
            .rows
            .retain(|row| row.text(&heading).is_some_and(is_hex));
        let non_hex = before - table.rows.len();

        let before = table.rows.len();
        table
            .rows
            .retain(|row| !row.text(&heading).is_some_and(|v| HEX_RANGE.is_match(v)));
        let ranges = before - table.rows.len();

        if non_hex + ranges > 0 {
            debug!(
                "{}: dropped {non_hex} non-hex and {ranges} ranged rows under '{heading}'",
                table.title
            );
        }

        for row in &mut table.rows {
            if let Some(formatted) = row.text(&heading).and_then(change_hex_format) {
                row.set_text(&heading, formatted);
            }
        }
    }
    Ok(())
}
