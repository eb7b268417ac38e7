// src/parse/table.rs

use indexmap::IndexMap;
use tracing::{debug, warn};

use super::row::parse_row;
use super::types::FieldRecord;

/// A raw cell grid as handed over by the table extractor.
pub type RawGrid = Vec<Vec<String>>;

/// Caption → parsed rows for one page, in extraction order.
pub type PageTables = IndexMap<String, Vec<FieldRecord>>;

/// Parse every captioned grid on a page. Tables without any rows are left out.
pub fn parse_page(page_number: u32, tables: &IndexMap<String, RawGrid>) -> PageTables {
    let mut page = PageTables::new();
    for (caption, grid) in tables {
        if let Some(rows) = parse_table(caption, grid) {
            page.insert(caption.clone(), rows);
        }
    }
    debug!(page = page_number, "page successfully parsed");
    page
}

/// Turn one grid into field records: headings from the first row, a
/// trailing NOTES row dropped, nested sub-tables folded into `children`.
pub fn parse_table(caption: &str, grid: &[Vec<String>]) -> Option<Vec<FieldRecord>> {
    let (first, mut body) = grid.split_first()?;
    let headings = parse_headings(first);

    if let Some(last) = body.last() {
        let first_word = last
            .first()
            .map(|cell| cell.split(':').next().unwrap_or(""))
            .unwrap_or("");
        if first_word.contains("NOTE") || first_word.contains("Note") {
            if first_word != "NOTES" {
                warn!("'{first_word}' should be 'NOTES'");
            }
            body = &body[..body.len() - 1];
        }
    }

    let content = parse_content(&headings, body);
    if content.is_empty() {
        debug!("{caption}: no rows left after parsing");
        None
    } else {
        Some(content)
    }
}

/// Canonicalize a heading row: lowercase, no line breaks, blanks dropped.
pub fn parse_headings(row: &[String]) -> Vec<String> {
    row.iter()
        .filter(|h| !h.is_empty())
        .map(|h| {
            let heading = h.to_lowercase().replace('\n', "");
            match heading.as_str() {
                "bit" => {
                    warn!("'{heading}' instead of 'bits'");
                    "bits".to_string()
                }
                "byte" => {
                    warn!("'{heading}' instead of 'bytes'");
                    "bytes".to_string()
                }
                h if h != "value" && h.contains("value") => {
                    debug!("Normalized '{heading}' to 'value'");
                    "value".to_string()
                }
                _ => heading,
            }
        })
        .collect()
}

/// Walk the body rows, attaching blank-leading rows to the last top-level row.
pub fn parse_content(headings: &[String], rows: &[Vec<String>]) -> Vec<FieldRecord> {
    let mut output: Vec<FieldRecord> = Vec::new();
    let mut subheadings: Option<Vec<String>> = None;

    for row in rows {
        if row.iter().all(|cell| cell.is_empty()) {
            continue;
        }

        let leading_blank = row
            .iter()
            .take(headings.len())
            .all(|cell| cell.is_empty());

        if leading_blank {
            if subheadings.is_none() {
                subheadings = Some(parse_headings(row));
                continue;
            }
            let active = match subheadings.as_deref() {
                Some(sub) if !sub.is_empty() => sub,
                _ => headings,
            };
            match output.last_mut() {
                Some(parent) => parent
                    .children
                    .get_or_insert_with(Vec::new)
                    .push(parse_row(row, active, headings.len())),
                None => debug!("nested row without a parent row, skipped"),
            }
        } else {
            output.push(parse_row(row, headings, 0));
            subheadings = None;
        }
    }

    output
}
