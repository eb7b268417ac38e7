// src/group/commands.rs
//
// Command groups are re-laid out as the sixteen dwords of a submission queue
// entry. Tables that describe a dword (or a pair of dwords) take their slot,
// every other slot is filled with a plain 32-bit placeholder.

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{debug, warn};

use super::{GroupTable, Groups};
use crate::error::{LintError, LintResult};
use crate::parse::types::{Dimension, Extent, FieldRecord, BITS, NAME};
use crate::transform::SpecType;

pub const COMMAND_SLOTS: usize = 16;

static DWORD: Lazy<Regex> = Lazy::new(|| Regex::new(r"dword (\d+)").expect("valid regex"));

#[derive(Debug, Clone, PartialEq)]
pub enum CommandSlot {
    /// No table describes this dword.
    Placeholder(usize),
    /// Upper half of a 64-bit table stored at the previous index.
    Suppressed(usize),
    Table(GroupTable),
}

impl CommandSlot {
    fn placeholder_table(index: usize, title: &str) -> GroupTable {
        let row = FieldRecord::default()
            .with_extent(Dimension::Bits, Extent::Width(32))
            .with_text(NAME, format!("cdw{index}"));
        GroupTable {
            title: title.to_string(),
            number: -1,
            rows: vec![row],
            headings: vec![BITS.to_string(), NAME.to_string()],
            width: Some(32),
        }
    }

    fn suppress(&mut self) {
        match self {
            CommandSlot::Placeholder(index) => *self = CommandSlot::Suppressed(*index),
            CommandSlot::Table(table) => table.title = "skip".to_string(),
            CommandSlot::Suppressed(_) => {}
        }
    }

    pub fn into_table(self) -> GroupTable {
        match self {
            CommandSlot::Placeholder(index) => Self::placeholder_table(index, ""),
            CommandSlot::Suppressed(index) => Self::placeholder_table(index, "skip"),
            CommandSlot::Table(table) => table,
        }
    }
}

fn bit_width(table: &GroupTable) -> u64 {
    table
        .rows
        .iter()
        .filter_map(|row| row.bits.as_ref().and_then(Extent::width))
        .map(u64::from)
        .sum()
}

/// Dword indices named in a title, e.g. `"... command dword 10"`.
pub fn dword_indices(title: &str) -> Vec<usize> {
    DWORD
        .captures_iter(title)
        .filter_map(|caps| caps[1].parse().ok())
        .collect()
}

fn place(slots: &mut [CommandSlot], mut table: GroupTable) -> LintResult<()> {
    let indices = dword_indices(&table.title);
    let expected = match indices.len() {
        1 => 32,
        2 => 64,
        n => {
            debug!("{}: names {n} dwords, not a command dword table", table.title);
            return Ok(());
        }
    };

    let found = bit_width(&table);
    if found != u64::from(expected) {
        return Err(LintError::ReconstructionMismatch {
            title: format!("Figure {}: {}", table.number, table.title),
            expected,
            found,
        });
    }
    if let Some(&index) = indices.iter().find(|&&i| i >= slots.len()) {
        warn!("{}: dword {index} is outside the command", table.title);
        return Ok(());
    }

    table.width = Some(expected);
    slots[indices[0]] = CommandSlot::Table(table);
    if let Some(&upper) = indices.get(1) {
        slots[upper].suppress();
    }
    Ok(())
}

/// Replace the tables of every command group with its sixteen dword slots.
pub fn process_commands(groups: &mut Groups) {
    for (name, group) in groups.iter_mut() {
        if group.spec_type != SpecType::Command {
            continue;
        }

        let mut slots: Vec<CommandSlot> = (0..COMMAND_SLOTS).map(CommandSlot::Placeholder).collect();
        for table in std::mem::take(&mut group.tables) {
            if let Err(e) = place(&mut slots, table) {
                warn!("{name}: {e}");
            }
        }
        group.tables = slots.into_iter().map(CommandSlot::into_table).collect();
    }
}
