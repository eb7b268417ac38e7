// src/transform/bits.rs
//
// Consolidation of `bits`/`bytes` ranges into widths, together with the
// layout checks that only make sense while the ranges are still intact.

use tracing::{debug, warn};

use super::{Table, TransformOptions};
use crate::error::LintResult;
use crate::parse::types::{BitRange, Dimension, Extent, FieldRecord};

/// Run every layout check, collapse ranges to widths and drop rows whose
/// value never became a width.
pub fn clean_bits_and_bytes(table: &mut Table, _: &TransformOptions) -> LintResult<()> {
    let Some(dim) = table.dimension() else {
        return Ok(());
    };

    check_order(table, dim);
    check_for_holes(table, dim);
    check_overlap(table, dim);
    calculate_bits_and_bytes(table, dim);
    check_sum(table, dim);

    table
        .rows
        .retain(|row| matches!(row.extent(dim), Some(Extent::Width(_))));
    Ok(())
}

fn ranges(table: &Table, dim: Dimension) -> Vec<BitRange> {
    table
        .rows
        .iter()
        .filter_map(|row| row.extent(dim).and_then(Extent::range))
        .collect()
}

/// Walk the ranges by ascending low end and report whether `test` holds for
/// any range, given the highest position covered before it and its low end.
fn any_against_covered(table: &Table, dim: Dimension, test: impl Fn(u64, u64) -> bool) -> bool {
    let mut sorted = ranges(table, dim);
    sorted.sort_unstable_by_key(|r| (r.lo, r.hi));

    let mut covered: Option<u64> = None;
    for range in sorted {
        let (lo, hi) = (u64::from(range.lo), u64::from(range.hi));
        if covered.is_some_and(|top| test(top, lo)) {
            return true;
        }
        covered = Some(covered.map_or(hi, |top| top.max(hi)));
    }
    false
}

/// Bits run high-to-low, bytes low-to-high. A table laid out the other way
/// round is reported and re-sorted. Returns whether it was out of order.
pub fn check_order(table: &mut Table, dim: Dimension) -> bool {
    if table.rows.len() < 2 {
        return false;
    }
    let keys: Vec<u32> = ranges(table, dim).iter().map(|r| r.hi).collect();
    if keys.len() != table.rows.len() {
        debug!("{}: order of {dim} not checked, some rows have no range", table.title);
        return false;
    }

    let reversed = |a: u32, b: u32| match dim {
        Dimension::Bits => a <= b,
        Dimension::Bytes => a >= b,
    };
    let wrong = keys.windows(2).all(|w| reversed(w[0], w[1]))
        && keys.windows(2).any(|w| w[0] != w[1]);
    if !wrong {
        return false;
    }

    warn!("{}: {dim} are in wrong order", table.title);
    let hi = |row: &FieldRecord| {
        row.extent(dim).and_then(Extent::range).map_or(0, |r| r.hi)
    };
    match dim {
        Dimension::Bits => table.rows.sort_by(|a, b| hi(b).cmp(&hi(a))),
        Dimension::Bytes => table.rows.sort_by_key(|row| hi(row)),
    }
    true
}

/// Returns whether some position between the lowest and highest is uncovered.
pub fn check_for_holes(table: &Table, dim: Dimension) -> bool {
    let hole = any_against_covered(table, dim, |top, lo| lo > top + 1);
    if hole {
        warn!("{}: hole in {dim}", table.title);
    }
    hole
}

/// Returns whether any position is claimed by more than one row.
pub fn check_overlap(table: &Table, dim: Dimension) -> bool {
    let overlap = any_against_covered(table, dim, |top, lo| lo <= top);
    if overlap {
        warn!("{}: overlap of {dim}", table.title);
    }
    overlap
}

/// Replace every range with its width. Malformed cells are left as they are.
pub fn calculate_bits_and_bytes(table: &mut Table, dim: Dimension) {
    for row in &mut table.rows {
        let width = match row.extent(dim) {
            Some(Extent::Range(r)) => r.width(),
            Some(Extent::Malformed(_)) => {
                debug!("{} contains non integer values in {dim} column", table.title);
                continue;
            }
            _ => continue,
        };
        *row.extent_mut(dim) = Some(Extent::Width(width));
    }
}

/// Returns whether the widths fail to add up to a power of two.
pub fn check_sum(table: &Table, dim: Dimension) -> bool {
    let total: u64 = table
        .rows
        .iter()
        .filter_map(|row| row.extent(dim).and_then(Extent::width))
        .map(u64::from)
        .sum();
    let power_of_two = total != 0 && total.is_power_of_two();
    if !power_of_two {
        warn!("{}: sum of {dim} is not a power of 2", table.title);
    }
    !power_of_two
}
