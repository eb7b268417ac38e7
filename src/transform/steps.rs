// src/transform/steps.rs

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

use super::{CType, SpecType, Table, TransformOptions};
use crate::error::{LintError, LintResult};
use crate::parse::types::{Dimension, CHILDREN};

static NUMBER_GROUP_TITLE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^Figure (?P<number>\d+): (?P<group>.+) \u{2013} (?P<title>.+)").expect("valid regex")
});
static NUMBER_TITLE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^Figure (?P<number>\d+): (?P<title>.+)").expect("valid regex"));

/// Drop empty child lists, and the `children` heading if no row keeps one.
pub fn remove_empty_children(table: &mut Table, _: &TransformOptions) -> LintResult<()> {
    for row in &mut table.rows {
        if row.children.as_ref().is_some_and(Vec::is_empty) {
            row.children = None;
        }
    }
    if table.rows.iter().all(|row| row.children.is_none()) {
        table.headings.retain(|h| h != CHILDREN);
    }
    Ok(())
}

/// Keep only rows that carry a value for the table's positional column.
pub fn enforce_headings(table: &mut Table, _: &TransformOptions) -> LintResult<()> {
    if let Some(dim) = table.dimension() {
        let before = table.rows.len();
        table
            .rows
            .retain(|row| row.extent(dim).is_some_and(|e| !e.is_falsy()));
        if table.rows.len() != before {
            debug!(
                "{}: dropped {} rows without {dim}",
                table.title,
                before - table.rows.len()
            );
        }
    }
    Ok(())
}

/// Bit tables are authored high-to-low but consumed low-to-high.
pub fn reverse_bits_rows(table: &mut Table, _: &TransformOptions) -> LintResult<()> {
    if table.dimension() == Some(Dimension::Bits) {
        table.rows.reverse();
    }
    Ok(())
}

fn to_identifier(text: &str) -> String {
    text.to_lowercase().replace(' ', "_")
}

/// Fill in `name` for rows that lack one.
pub fn generate_name(table: &mut Table, _: &TransformOptions) -> LintResult<()> {
    for row in &mut table.rows {
        if row.name.is_some() {
            continue;
        }
        let name = if row.is_reserved() {
            "rsvd".to_string()
        } else if let Some(brief) = row.text("brief") {
            if row.bits.is_some() || row.bytes.is_some() {
                debug!("{}: field {brief} is missing name", table.title);
            }
            to_identifier(brief)
        } else {
            let source = row
                .text("definition")
                .or_else(|| row.text("description"))
                .unwrap_or("skip");
            to_identifier(source)
        };
        row.name = Some(name);
    }
    Ok(())
}

/// Split `Figure N: Group – Title` into number, group key and title.
pub fn process_title(table: &mut Table, _: &TransformOptions) -> LintResult<()> {
    let (number, group, title) = if let Some(caps) = NUMBER_GROUP_TITLE.captures(&table.title) {
        (
            caps["number"].to_string(),
            Some(to_identifier(&caps["group"])),
            caps["title"].to_lowercase(),
        )
    } else if let Some(caps) = NUMBER_TITLE.captures(&table.title) {
        (caps["number"].to_string(), None, caps["title"].to_lowercase())
    } else {
        return Ok(());
    };

    table.number = number
        .parse()
        .map_err(|e| LintError::step("process_title", format!("figure number {number}: {e}")))?;
    if let Some(group) = group {
        table.group = group;
    }
    table.title = title;
    Ok(())
}

pub fn determine_spec_type(table: &mut Table, _: &TransformOptions) -> LintResult<()> {
    if table.title.contains("command dword") {
        table.spec_type = SpecType::Command;
    } else if table.title.contains("data pointer") {
        table.spec_type = SpecType::DataPointer;
    }
    Ok(())
}

/// Tables keyed by hex values become enums, everything else a struct.
pub fn determine_c_type(table: &mut Table, _: &TransformOptions) -> LintResult<()> {
    table.c_type = if table.headings.iter().any(|h| h.starts_with("hex-")) {
        CType::Enum
    } else {
        CType::Struct
    };
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse::types::{BitRange, Extent, FieldRecord};

    fn opts() -> TransformOptions {
        TransformOptions::default()
    }

    #[test]
    fn title_with_group() -> LintResult<()> {
        let mut table = Table::new(
            "Figure 12: Admin Commands \u{2013} Create I/O Submission Queue Command Dword 10",
            vec![],
        );
        process_title(&mut table, &opts())?;
        determine_spec_type(&mut table, &opts())?;
        assert_eq!(table.number, 12);
        assert_eq!(table.group, "admin_commands");
        assert_eq!(table.title, "create i/o submission queue command dword 10");
        assert_eq!(table.spec_type, SpecType::Command);
        Ok(())
    }

    #[test]
    fn title_without_group() -> LintResult<()> {
        let mut table = Table::new("Figure 7: Data Pointer", vec![]);
        process_title(&mut table, &opts())?;
        determine_spec_type(&mut table, &opts())?;
        assert_eq!((table.number, table.group.as_str()), (7, ""));
        assert_eq!(table.spec_type, SpecType::DataPointer);

        let mut table = Table::new("Table of contents", vec![]);
        process_title(&mut table, &opts())?;
        assert_eq!((table.number, table.title.as_str()), (0, "Table of contents"));
        Ok(())
    }

    #[test]
    fn oversized_figure_number_fails() {
        let mut table = Table::new("Figure 99999999999: X", vec![]);
        assert!(process_title(&mut table, &opts()).is_err());
    }

    #[test]
    fn names_are_generated() -> LintResult<()> {
        let rows = vec![
            FieldRecord::new().with_text("description", "Reserved"),
            FieldRecord::new().with_text("brief", "Namespace Identifier"),
            FieldRecord::new().with_text("definition", "Write Zeroes"),
            FieldRecord::new().with_text("description", "Some Field"),
            FieldRecord::new().with_text("other", "x"),
            FieldRecord::new().with_text("name", "kept"),
        ];
        let mut table = Table::new("t", rows);
        generate_name(&mut table, &opts())?;
        let names: Vec<_> = table.rows.iter().filter_map(|r| r.name.as_deref()).collect();
        assert_eq!(
            names,
            ["rsvd", "namespace_identifier", "write_zeroes", "some_field", "skip", "kept"]
        );
        Ok(())
    }

    #[test]
    fn empty_children_and_blank_extents_are_removed() -> LintResult<()> {
        let bits = |hi, lo| Extent::Range(BitRange::new(hi, lo));
        let rows = vec![
            FieldRecord::new().with_extent(Dimension::Bits, bits(7, 0)),
            FieldRecord::new().with_text("description", "continued"),
            FieldRecord::new().with_extent(Dimension::Bits, bits(15, 8)),
        ];
        let mut table = Table::new("t", rows);
        remove_empty_children(&mut table, &opts())?;
        enforce_headings(&mut table, &opts())?;
        assert!(!table.has_heading(CHILDREN));
        assert_eq!(table.rows.len(), 2);
        assert!(table.rows.iter().all(|r| r.children.is_none()));

        reverse_bits_rows(&mut table, &opts())?;
        assert_eq!(table.rows[0].bits, Some(bits(15, 8)));
        Ok(())
    }

    #[test]
    fn c_type_follows_hex_headings() -> LintResult<()> {
        let mut table = Table::new("t", vec![FieldRecord::new().with_text("hex-value", "0x1")]);
        determine_c_type(&mut table, &opts())?;
        assert_eq!(table.c_type, CType::Enum);

        let mut table = Table::new("t", vec![FieldRecord::new().with_text("value", "1")]);
        determine_c_type(&mut table, &opts())?;
        assert_eq!(table.c_type, CType::Struct);
        Ok(())
    }
}
