//! Grid rewrites for the mutating operations.
//!
//! Everything here works on an already fetched grid. Matching produces row
//! indices, rewrites then index into an owned grid, so the view used for
//! matching is never the one being modified.

use tracing::warn;

use crate::filter::Filter;
use crate::grid::Grid;
use crate::record::{Record, record_to_row};

/// Where new rows go when they don't take over a blank row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placement {
    /// Always after the last data row. Blank rows are left alone.
    Append,
    /// First blank data row, else after the last data row.
    Insert,
    /// First blank data row, else directly beneath the header.
    Prepend,
}

impl Placement {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Append => "append",
            Self::Insert => "insert",
            Self::Prepend => "prepend",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PlacementStats {
    /// Records written over a blank row.
    pub filled_blank: usize,
    /// Records that grew the grid.
    pub added: usize,
}

/// Lay out records into the grid. The grid must have a header.
pub fn place_records(grid: &mut Grid, records: &[Record], placement: Placement) -> PlacementStats {
    let mut stats = PlacementStats::default();

    if placement == Placement::Append {
        for record in records {
            let row = record_to_row(grid.header(), record);
            grid.push_row(row);
            stats.added += 1;
        }
        return stats;
    }

    // Blank rows before the cursor have already been filled by an earlier
    // record of this call.
    let mut cursor = 0;
    let mut top = Vec::new();

    for record in records {
        let row = record_to_row(grid.header(), record);
        match grid.find_blank_row(cursor) {
            Some(idx) => {
                grid.set_row(idx, row);
                cursor = idx + 1;
                stats.filled_blank += 1;
            }
            None if placement == Placement::Prepend => {
                top.push(row);
                stats.added += 1;
            }
            None => {
                grid.push_row(row);
                cursor = grid.num_rows();
                stats.added += 1;
            }
        }
    }

    if !top.is_empty() {
        grid.insert_rows_at_top(top);
    }

    stats
}

/// Indices of data rows in `view` matching the filter, using loose
/// equality for plain keys.
///
/// An empty filter matches nothing here. Mutations need at least one
/// predicate.
pub fn matching_rows(view: &Grid, filter: &Filter) -> Vec<usize> {
    if filter.is_empty() {
        return Vec::new();
    }

    let index = view.header_index();
    view.rows()
        .iter()
        .enumerate()
        .filter(|(_, row)| filter.matches_row(&index, row))
        .map(|(idx, _)| idx)
        .collect()
}

/// Overwrite the `fields` columns of the given rows of `target`.
///
/// Column positions are resolved against `view`'s header, which must
/// describe the same range as `target`. Other cells are left as is. Returns
/// the number of rows touched.
pub fn apply_update(target: &mut Grid, view: &Grid, rows: &[usize], fields: &Record) -> usize {
    let index = view.header_index();

    let mut columns = Vec::with_capacity(fields.len());
    for (column, value) in fields {
        match index.position(column) {
            Some(pos) => columns.push((pos, value)),
            None => warn!(%column, "ignoring update of column not present in header"),
        }
    }

    let mut touched = 0;
    for &row in rows {
        if row >= target.num_rows() {
            continue;
        }
        for (pos, value) in &columns {
            target.set_cell(row, *pos, (*value).clone());
        }
        touched += 1;
    }
    touched
}

/// Blank out the given rows without removing them.
pub fn apply_delete(target: &mut Grid, rows: &[usize]) -> usize {
    let mut cleared = 0;
    for &row in rows {
        if row >= target.num_rows() {
            continue;
        }
        let blank = target.blank_row();
        target.set_row(row, blank);
        cleared += 1;
    }
    cleared
}
