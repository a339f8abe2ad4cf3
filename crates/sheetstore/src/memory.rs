//! An in-memory `GridTransport`.
//!
//! Cells keep the text they were entered with plus an optional display
//! value, so a test can seed a formula together with its computed result.
//! Fetches drop trailing empty cells and rows the way the remote service
//! does, which keeps callers honest about normalizing.

use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::errors::{Result, SheetStoreError};
use crate::transport::{GridTransport, InputOption, RenderMode, SheetRange};

#[derive(Debug, thiserror::Error)]
pub enum MemoryTransportError {
    #[error("Injected failure: {0}")]
    Injected(String),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemoryCell {
    /// Text as entered, formulas included.
    pub input: String,
    /// Computed value shown for formatted renders. Falls back to `input`.
    pub display: Option<String>,
}

impl MemoryCell {
    fn render(&self, render: RenderMode) -> &str {
        match render {
            RenderMode::Formula => &self.input,
            RenderMode::Formatted | RenderMode::Unformatted => {
                self.display.as_deref().unwrap_or(&self.input)
            }
        }
    }
}

/// A write observed by the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteLog {
    pub target: SheetRange,
    pub input: InputOption,
    pub rows: usize,
}

#[derive(Debug, Default)]
struct MemoryState {
    grids: HashMap<SheetRange, Vec<Vec<MemoryCell>>>,
    fetches: Vec<(SheetRange, RenderMode)>,
    writes: Vec<WriteLog>,
    fail_next_fetch: Option<String>,
    fail_next_write: Option<String>,
}

#[derive(Debug, Default)]
pub struct MemoryTransport {
    state: Mutex<MemoryState>,
}

impl MemoryTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the contents of a range with plain entered values.
    pub fn set_values<R, C>(&self, target: &SheetRange, values: R)
    where
        R: IntoIterator<Item = C>,
        C: IntoIterator,
        C::Item: Into<String>,
    {
        let grid = values
            .into_iter()
            .map(|row| {
                row.into_iter()
                    .map(|cell| MemoryCell {
                        input: cell.into(),
                        display: None,
                    })
                    .collect()
            })
            .collect();
        self.state.lock().grids.insert(target.clone(), grid);
    }

    /// Set the computed value shown for a cell, growing the grid as needed.
    pub fn set_display(&self, target: &SheetRange, row: usize, col: usize, display: &str) {
        let mut state = self.state.lock();
        let grid = state.grids.entry(target.clone()).or_default();
        if grid.len() <= row {
            grid.resize_with(row + 1, Vec::new);
        }
        let cells = &mut grid[row];
        if cells.len() <= col {
            cells.resize_with(col + 1, MemoryCell::default);
        }
        cells[col].display = Some(display.to_string());
    }

    /// Entered text for every stored cell, without trimming.
    pub fn values(&self, target: &SheetRange) -> Vec<Vec<String>> {
        self.rendered(target, RenderMode::Formula)
    }

    /// Displayed text for every stored cell, without trimming.
    pub fn displayed(&self, target: &SheetRange) -> Vec<Vec<String>> {
        self.rendered(target, RenderMode::Formatted)
    }

    fn rendered(&self, target: &SheetRange, render: RenderMode) -> Vec<Vec<String>> {
        let state = self.state.lock();
        state
            .grids
            .get(target)
            .map(|grid| {
                grid.iter()
                    .map(|row| row.iter().map(|c| c.render(render).to_string()).collect())
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn fetches(&self) -> Vec<(SheetRange, RenderMode)> {
        self.state.lock().fetches.clone()
    }

    pub fn writes(&self) -> Vec<WriteLog> {
        self.state.lock().writes.clone()
    }

    /// Fail the next fetch with the given message.
    pub fn fail_next_fetch(&self, message: &str) {
        self.state.lock().fail_next_fetch = Some(message.to_string());
    }

    /// Fail the next write with the given message.
    pub fn fail_next_write(&self, message: &str) {
        self.state.lock().fail_next_write = Some(message.to_string());
    }
}

#[async_trait]
impl GridTransport for MemoryTransport {
    async fn fetch_grid(
        &self,
        target: &SheetRange,
        render: RenderMode,
    ) -> Result<Vec<Vec<String>>> {
        let mut state = self.state.lock();
        if let Some(msg) = state.fail_next_fetch.take() {
            return Err(SheetStoreError::transport(MemoryTransportError::Injected(
                msg,
            )));
        }
        state.fetches.push((target.clone(), render));

        let mut values: Vec<Vec<String>> = match state.grids.get(target) {
            Some(grid) => grid
                .iter()
                .map(|row| {
                    let mut cells: Vec<String> =
                        row.iter().map(|c| c.render(render).to_string()).collect();
                    while cells.last().is_some_and(|c| c.is_empty()) {
                        cells.pop();
                    }
                    cells
                })
                .collect(),
            None => Vec::new(),
        };
        while values.last().is_some_and(|row| row.is_empty()) {
            values.pop();
        }

        Ok(values)
    }

    /// Cells covered by `values` are overwritten, everything outside is left
    /// alone.
    async fn write_grid(
        &self,
        target: &SheetRange,
        values: Vec<Vec<String>>,
        input: InputOption,
    ) -> Result<()> {
        let mut state = self.state.lock();
        if let Some(msg) = state.fail_next_write.take() {
            return Err(SheetStoreError::transport(MemoryTransportError::Injected(
                msg,
            )));
        }

        let rows = values.len();
        let grid = state.grids.entry(target.clone()).or_default();
        if grid.len() < rows {
            grid.resize_with(rows, Vec::new);
        }
        for (row, cells) in grid.iter_mut().zip(values) {
            if row.len() < cells.len() {
                row.resize_with(cells.len(), MemoryCell::default);
            }
            for (cell, value) in row.iter_mut().zip(cells) {
                *cell = MemoryCell {
                    input: value,
                    display: None,
                };
            }
        }

        state.writes.push(WriteLog {
            target: target.clone(),
            input,
            rows,
        });
        Ok(())
    }
}
