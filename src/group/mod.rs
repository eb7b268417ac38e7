//! Cross-page merging, grouping by caption key and type reconciliation.

pub mod commands;

use indexmap::IndexMap;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use tracing::{debug, info, warn};

use crate::parse::{FieldRecord, PageTables};
use crate::transform::{CType, Pipeline, SpecType, Table, TransformOptions};

pub use commands::{process_commands, CommandSlot, COMMAND_SLOTS};

/// Parsed tables per page number.
pub type Pages = BTreeMap<u32, PageTables>;

/// Final output: group key → group.
pub type Groups = IndexMap<String, Group>;

/// A table as emitted inside a group, stripped of its own type tags.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupTable {
    pub title: String,
    pub number: i64,
    pub rows: Vec<FieldRecord>,
    pub headings: Vec<String>,
    /// Dword width for slots of a command group.
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
}

impl From<Table> for GroupTable {
    fn from(table: Table) -> Self {
        GroupTable {
            title: table.title,
            number: i64::from(table.number),
            rows: table.rows,
            headings: table.headings,
            width: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Group {
    pub tables: Vec<GroupTable>,
    pub spec_type: SpecType,
    pub c_type: CType,
}

/// Merge every page into one caption → rows map. A caption seen on several
/// pages is treated as a table continued across them and its rows are
/// concatenated in page order.
pub fn flatten_pages(pages: Pages) -> IndexMap<String, Vec<FieldRecord>> {
    let mut tables: IndexMap<String, Vec<FieldRecord>> = IndexMap::new();
    let mut last_seen: HashMap<String, u32> = HashMap::new();

    for (page_number, page) in pages {
        for (caption, rows) in page {
            if let Some(previous) = last_seen.insert(caption.clone(), page_number) {
                if previous.checked_add(1) != Some(page_number) {
                    warn!(
                        "{caption}: caption reused on non-adjacent pages {previous} and {page_number}, rows merged"
                    );
                } else {
                    debug!("{caption}: continued on page {page_number}");
                }
            }
            tables.entry(caption).or_default().extend(rows);
        }
    }

    tables
}

/// Run the pipeline over every table and bucket the results by group key.
pub fn transform_tables(
    tables: IndexMap<String, Vec<FieldRecord>>,
    pipeline: &Pipeline,
) -> IndexMap<String, Vec<Table>> {
    let mut groups: IndexMap<String, Vec<Table>> = IndexMap::new();
    for (title, rows) in tables {
        let table = pipeline.transform(&title, rows);
        groups.entry(table.group.clone()).or_default().push(table);
    }
    groups
}

/// Settle each group's spec and c types from its members.
pub fn collect_types(groups: IndexMap<String, Vec<Table>>) -> Groups {
    groups
        .into_iter()
        .map(|(name, tables)| {
            let spec_type = if tables.iter().any(|t| t.title.contains("command dword")) {
                SpecType::Command
            } else {
                SpecType::Unknown
            };

            let c_type = if tables.iter().all(|t| t.c_type == CType::Enum) {
                CType::Enum
            } else if tables.iter().all(|t| t.c_type == CType::Struct) {
                CType::Struct
            } else {
                debug!("{name} is a mix of enums and structs and will be skipped");
                CType::Skip
            };

            let group = Group {
                tables: tables.into_iter().map(GroupTable::from).collect(),
                spec_type,
                c_type,
            };
            (name, group)
        })
        .collect()
}

/// Everything after page parsing: flatten, transform, group, rebuild commands.
pub fn process(pages: Pages, options: TransformOptions) -> Groups {
    let tables = flatten_pages(pages);
    info!("transforming {} tables", tables.len());
    let pipeline = Pipeline::new(options);
    let mut groups = collect_types(transform_tables(tables, &pipeline));
    process_commands(&mut groups);
    info!("collected {} groups", groups.len());
    groups
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse::{BitRange, Dimension, Extent};

    fn bits_rows(ranges: &[(u32, u32)]) -> Vec<FieldRecord> {
        ranges
            .iter()
            .map(|&(hi, lo)| {
                FieldRecord::new()
                    .with_extent(Dimension::Bits, Extent::Range(BitRange::new(hi, lo)))
                    .with_text("description", "Field")
            })
            .collect()
    }

    fn page(tables: Vec<(&str, Vec<FieldRecord>)>) -> PageTables {
        tables
            .into_iter()
            .map(|(caption, rows)| (caption.to_string(), rows))
            .collect()
    }

    #[test]
    fn continuation_rows_are_concatenated() {
        let mut pages = Pages::new();
        pages.insert(3, page(vec![("Figure 1: A", bits_rows(&[(31, 16)]))]));
        pages.insert(
            4,
            page(vec![
                ("Figure 1: A", bits_rows(&[(15, 0)])),
                ("Figure 2: B", bits_rows(&[(7, 0)])),
            ]),
        );
        let tables = flatten_pages(pages);
        assert_eq!(tables.keys().collect::<Vec<_>>(), ["Figure 1: A", "Figure 2: B"]);
        assert_eq!(tables["Figure 1: A"].len(), 2);
        assert_eq!(
            tables["Figure 1: A"][1].bits,
            Some(Extent::Range(BitRange::new(15, 0)))
        );
    }

    #[test]
    fn group_types_are_reconciled() {
        let mut struct_table = Table::new("a", vec![]);
        struct_table.c_type = CType::Struct;
        let mut enum_table = Table::new("b command dword 0", vec![]);
        enum_table.c_type = CType::Enum;

        let mut groups = IndexMap::new();
        groups.insert("mixed".to_string(), vec![struct_table.clone(), enum_table.clone()]);
        groups.insert("structs".to_string(), vec![struct_table.clone(), struct_table]);
        groups.insert("enums".to_string(), vec![enum_table]);

        let groups = collect_types(groups);
        assert_eq!(groups["mixed"].c_type, CType::Skip);
        assert_eq!(groups["mixed"].spec_type, SpecType::Command);
        assert_eq!(groups["structs"].c_type, CType::Struct);
        assert_eq!(groups["structs"].spec_type, SpecType::Unknown);
        assert_eq!(groups["enums"].c_type, CType::Enum);
    }

    #[test]
    fn end_to_end_grouping() -> anyhow::Result<()> {
        let mut pages = Pages::new();
        pages.insert(
            10,
            page(vec![
                (
                    "Figure 20: Identify \u{2013} Controller Capabilities",
                    bits_rows(&[(31, 16), (15, 0)]),
                ),
                (
                    "Figure 21: Identify \u{2013} Namespace Capabilities",
                    bits_rows(&[(7, 0)]),
                ),
                ("Figure 22: Standalone", bits_rows(&[(3, 0)])),
            ]),
        );
        let groups = process(pages, TransformOptions::default());
        assert_eq!(groups.keys().collect::<Vec<_>>(), ["identify", ""]);

        let identify = &groups["identify"];
        assert_eq!(identify.c_type, CType::Struct);
        assert_eq!(identify.tables[0].title, "controller capabilities");
        assert_eq!(identify.tables[0].number, 20);
        assert_eq!(identify.tables[0].rows[0].bits, Some(Extent::Width(16)));

        let yaml = serde_yaml::to_string(&groups)?;
        assert!(yaml.contains("controller capabilities"));
        assert!(!yaml.contains("spec_type: command"));
        Ok(())
    }
}
