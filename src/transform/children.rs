// src/transform/children.rs

use tracing::debug;

use super::{Pipeline, Table, TransformOptions};
use crate::error::LintResult;
use crate::parse::types::FieldRecord;

/// Run the row-level steps over every nested child table.
///
/// Children are walked depth-first up to `max_child_depth` levels; deeper
/// lists are left exactly as parsed.
pub fn process_children(table: &mut Table, options: &TransformOptions) -> LintResult<()> {
    // Children carry no caption; warnings are labelled with the parent's number.
    let child_title = format!("Figure {}:children", table.number);
    let pipeline = Pipeline::for_children(*options);
    for row in &mut table.rows {
        walk(row, &child_title, &pipeline, 1);
    }
    Ok(())
}

fn walk(row: &mut FieldRecord, title: &str, pipeline: &Pipeline, depth: usize) {
    let Some(children) = row.children.take() else {
        return;
    };
    if depth > pipeline.options().max_child_depth {
        debug!("{title}: children nested deeper than {depth} levels left untouched");
        row.children = Some(children);
        return;
    }

    let mut child = Table::new(title, children);
    pipeline.run(&mut child);
    for grandchild in &mut child.rows {
        walk(grandchild, title, pipeline, depth + 1);
    }
    row.children = Some(child.rows);
}
