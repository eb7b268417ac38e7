//! The table transformation pipeline.
//!
//! A [`Table`] is built from a caption and its parsed rows and then pushed
//! through a fixed, ordered list of [`Step`]s. Each step runs against a
//! working copy; if it fails the copy is thrown away, the failure is logged,
//! and the next step carries on from the last good state.

pub mod bits;
pub mod children;
pub mod hex;
pub mod steps;

use serde::Serialize;
use tracing::debug;

use crate::error::LintResult;
use crate::parse::types::{Dimension, FieldRecord, BITS, BYTES};

/// How the specification uses a table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum SpecType {
    #[default]
    #[serde(rename = "")]
    Unknown,
    #[serde(rename = "command")]
    Command,
    #[serde(rename = "data pointer")]
    DataPointer,
}

/// What a downstream generator should emit for a table or group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CType {
    #[default]
    #[serde(rename = "")]
    Unknown,
    Enum,
    Struct,
    /// Groups mixing enums and structs.
    Skip,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    pub title: String,
    pub number: u32,
    pub group: String,
    pub rows: Vec<FieldRecord>,
    pub spec_type: SpecType,
    pub c_type: CType,
    pub headings: Vec<String>,
}

impl Table {
    /// Headings come from the first row, or the second one when the first is
    /// a reserved filler row.
    pub fn new(title: impl Into<String>, rows: Vec<FieldRecord>) -> Self {
        let source = match rows.as_slice() {
            [first, second, ..] if first.is_reserved() => Some(second),
            [first, ..] => Some(first),
            [] => None,
        };
        let headings = source.map(FieldRecord::keys).unwrap_or_default();

        Table {
            title: title.into(),
            number: 0,
            group: String::new(),
            rows,
            spec_type: SpecType::default(),
            c_type: CType::default(),
            headings,
        }
    }

    pub fn has_heading(&self, heading: &str) -> bool {
        self.headings.iter().any(|h| h == heading)
    }

    /// The positional column the table is checked by, `bits` winning over `bytes`.
    pub fn dimension(&self) -> Option<Dimension> {
        if self.has_heading(BITS) {
            Some(Dimension::Bits)
        } else if self.has_heading(BYTES) {
            Some(Dimension::Bytes)
        } else {
            None
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransformOptions {
    /// How many levels of nested child tables are walked.
    pub max_child_depth: usize,
}

impl Default for TransformOptions {
    fn default() -> Self {
        TransformOptions { max_child_depth: 4 }
    }
}

pub type StepFn = fn(&mut Table, &TransformOptions) -> LintResult<()>;

#[derive(Clone, Copy)]
pub struct Step {
    pub name: &'static str,
    pub run: StepFn,
}

const fn step(name: &'static str, run: StepFn) -> Step {
    Step { name, run }
}

/// Steps applied to every captioned table, in order.
pub const TABLE_STEPS: &[Step] = &[
    step("remove_empty_children", steps::remove_empty_children),
    step("enforce_headings", steps::enforce_headings),
    step("clean_bits_and_bytes", bits::clean_bits_and_bytes),
    step("clean_hex", hex::clean_hex),
    step("reverse_bits_rows", steps::reverse_bits_rows),
    step("generate_name", steps::generate_name),
    step("process_title", steps::process_title),
    step("determine_spec_type", steps::determine_spec_type),
    step("determine_c_type", steps::determine_c_type),
    step("process_children", children::process_children),
];

/// Children carry no caption, so only the row-level cleanup applies.
pub const CHILD_STEPS: &[Step] = &[
    step("remove_empty_children", steps::remove_empty_children),
    step("enforce_headings", steps::enforce_headings),
    step("clean_bits_and_bytes", bits::clean_bits_and_bytes),
    step("clean_hex", hex::clean_hex),
    step("reverse_bits_rows", steps::reverse_bits_rows),
];

pub struct Pipeline {
    steps: &'static [Step],
    options: TransformOptions,
}

impl Pipeline {
    pub fn new(options: TransformOptions) -> Self {
        Pipeline {
            steps: TABLE_STEPS,
            options,
        }
    }

    pub fn for_children(options: TransformOptions) -> Self {
        Pipeline {
            steps: CHILD_STEPS,
            options,
        }
    }

    pub fn options(&self) -> &TransformOptions {
        &self.options
    }

    pub fn run(&self, table: &mut Table) {
        for step in self.steps {
            let mut working = table.clone();
            match (step.run)(&mut working, &self.options) {
                Ok(()) => *table = working,
                Err(e) => debug!("{}: Method {} failed: {}", table.title, step.name, e),
            }
        }
    }

    /// Build a table from a caption and its rows and run every step on it.
    pub fn transform(&self, title: &str, rows: Vec<FieldRecord>) -> Table {
        let mut table = Table::new(title, rows);
        self.run(&mut table);
        table
    }
}
