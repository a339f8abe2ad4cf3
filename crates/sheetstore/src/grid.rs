use std::collections::HashMap;

use tracing::trace;

use crate::errors::{Result, SheetStoreError};
use crate::transport::{GridTransport, InputOption, RenderMode, SheetRange};

pub type Row = Vec<String>;

/// A header row plus data rows, all of header width.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Grid {
    header: Row,
    rows: Vec<Row>,
}

impl Grid {
    /// Build a grid from raw rows as returned by a transport.
    ///
    /// The first row is the header. Every following row is padded with empty
    /// strings or truncated to the header width.
    pub fn from_values(values: Vec<Row>) -> Self {
        let mut iter = values.into_iter();
        let header = match iter.next() {
            Some(header) => header,
            None => return Self::default(),
        };
        Self::new(header, iter.collect())
    }

    pub fn new(header: Row, rows: Vec<Row>) -> Self {
        let width = header.len();
        let rows = rows
            .into_iter()
            .map(|row| normalize_row(row, width))
            .collect();
        Grid { header, rows }
    }

    /// True when there's no header to work with.
    pub fn is_empty(&self) -> bool {
        self.header.is_empty()
    }

    pub fn header(&self) -> &[String] {
        &self.header
    }

    pub fn width(&self) -> usize {
        self.header.len()
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn num_rows(&self) -> usize {
        self.rows.len()
    }

    pub fn header_index(&self) -> HeaderIndex {
        HeaderIndex::new(&self.header)
    }

    /// Errors with `MissingHeader` if there's no header row.
    pub fn require_header(&self) -> Result<()> {
        if self.is_empty() {
            return Err(SheetStoreError::MissingHeader);
        }
        Ok(())
    }

    /// An all-empty row of header width.
    pub fn blank_row(&self) -> Row {
        vec![String::new(); self.width()]
    }

    /// Index of the first blank data row at or after `start`.
    pub fn find_blank_row(&self, start: usize) -> Option<usize> {
        self.rows
            .iter()
            .enumerate()
            .skip(start)
            .find(|(_, row)| is_blank_row(row))
            .map(|(idx, _)| idx)
    }

    pub(crate) fn set_row(&mut self, idx: usize, row: Row) {
        self.rows[idx] = normalize_row(row, self.header.len());
    }

    pub(crate) fn set_cell(&mut self, row: usize, col: usize, value: String) {
        if let Some(cell) = self.rows.get_mut(row).and_then(|r| r.get_mut(col)) {
            *cell = value;
        }
    }

    pub(crate) fn push_row(&mut self, row: Row) {
        let row = normalize_row(row, self.header.len());
        self.rows.push(row);
    }

    /// Insert rows directly beneath the header, keeping their order.
    pub(crate) fn insert_rows_at_top(&mut self, rows: Vec<Row>) {
        let width = self.header.len();
        let rows = rows.into_iter().map(|row| normalize_row(row, width));
        self.rows.splice(0..0, rows);
    }

    /// Header followed by data rows, ready to be written.
    pub fn into_values(self) -> Vec<Row> {
        if self.header.is_empty() {
            return Vec::new();
        }
        let mut values = Vec::with_capacity(self.rows.len() + 1);
        values.push(self.header);
        values.extend(self.rows);
        values
    }
}

/// Column name to position lookup. The first occurrence of a duplicated name
/// wins.
#[derive(Debug, Clone, Default)]
pub struct HeaderIndex {
    columns: HashMap<String, usize>,
}

impl HeaderIndex {
    pub fn new(header: &[String]) -> Self {
        let mut columns = HashMap::with_capacity(header.len());
        for (idx, name) in header.iter().enumerate() {
            columns.entry(name.clone()).or_insert(idx);
        }
        HeaderIndex { columns }
    }

    pub fn position(&self, column: &str) -> Option<usize> {
        self.columns.get(column).copied()
    }
}

/// A row with no non-empty cell.
pub fn is_blank_row(row: &[String]) -> bool {
    row.iter().all(|cell| cell.is_empty())
}

fn normalize_row(mut row: Row, width: usize) -> Row {
    row.resize(width, String::new());
    row
}

/// Fetch and normalize a grid.
pub async fn fetch_grid(
    transport: &dyn GridTransport,
    target: &SheetRange,
    render: RenderMode,
) -> Result<Grid> {
    let values = transport.fetch_grid(target, render).await?;
    trace!(%target, %render, rows = values.len(), "fetched grid");
    Ok(Grid::from_values(values))
}

/// Write the whole grid, header included, back to the range.
pub async fn write_grid(
    transport: &dyn GridTransport,
    target: &SheetRange,
    grid: Grid,
    input: InputOption,
) -> Result<()> {
    let values = grid.into_values();
    trace!(%target, %input, rows = values.len(), "writing grid");
    transport.write_grid(target, values, input).await
}
