use std::sync::Arc;

use tracing::debug;

use crate::errors::Result;
use crate::filter::Filter;
use crate::grid::{fetch_grid, write_grid};
use crate::mutation::{
    Placement,
    PlacementStats,
    apply_delete,
    apply_update,
    matching_rows,
    place_records,
};
use crate::record::{Record, grid_to_records};
use crate::transport::{GridTransport, InputOption, RenderMode, SheetRange};

/// Record style access to spreadsheet ranges.
///
/// Every call fetches the range fresh and, for mutations, writes the whole
/// grid back. There's no locking; concurrent writers race and the last one
/// wins.
#[derive(Clone)]
pub struct SheetStore {
    transport: Arc<dyn GridTransport>,
    overwrite_input: InputOption,
}

impl std::fmt::Debug for SheetStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SheetStore")
            .field("overwrite_input", &self.overwrite_input)
            .finish_non_exhaustive()
    }
}

impl SheetStore {
    pub fn new(transport: Arc<dyn GridTransport>) -> Self {
        SheetStore {
            transport,
            overwrite_input: InputOption::UserEntered,
        }
    }

    /// Input option used when update and delete write back.
    ///
    /// Defaults to `UserEntered` so that formula text read back from the
    /// range stays a formula.
    pub fn with_overwrite_input(mut self, input: InputOption) -> Self {
        self.overwrite_input = input;
        self
    }

    /// Records of the range matching the filter, in row order.
    pub async fn select(
        &self,
        spreadsheet_id: &str,
        range: &str,
        filter: Option<&Filter>,
    ) -> Result<Vec<Record>> {
        let target = SheetRange::new(spreadsheet_id, range);
        let grid = fetch_grid(self.transport.as_ref(), &target, RenderMode::Formatted).await?;

        let records = grid_to_records(&grid);
        let total = records.len();
        let records: Vec<_> = match filter {
            Some(filter) => records
                .into_iter()
                .filter(|r| filter.matches_record(r))
                .collect(),
            None => records,
        };

        debug!(%target, total, matched = records.len(), "select");
        Ok(records)
    }

    pub async fn append(&self, spreadsheet_id: &str, range: &str, records: &[Record]) -> Result<()> {
        self.place(spreadsheet_id, range, records, Placement::Append)
            .await
            .map(|_| ())
    }

    /// Like append, but reuses blank rows first.
    pub async fn insert(&self, spreadsheet_id: &str, range: &str, records: &[Record]) -> Result<()> {
        self.place(spreadsheet_id, range, records, Placement::Insert)
            .await
            .map(|_| ())
    }

    /// Like insert, but rows that don't fill a blank row go directly beneath
    /// the header.
    pub async fn prepend(
        &self,
        spreadsheet_id: &str,
        range: &str,
        records: &[Record],
    ) -> Result<()> {
        self.place(spreadsheet_id, range, records, Placement::Prepend)
            .await
            .map(|_| ())
    }

    async fn place(
        &self,
        spreadsheet_id: &str,
        range: &str,
        records: &[Record],
        placement: Placement,
    ) -> Result<PlacementStats> {
        let target = SheetRange::new(spreadsheet_id, range);
        // Entered text, so existing formulas are written back unchanged. A
        // row is only blank if nothing was entered in it.
        let mut grid = fetch_grid(self.transport.as_ref(), &target, RenderMode::Formula).await?;
        grid.require_header()?;

        let stats = place_records(&mut grid, records, placement);
        debug!(
            %target,
            op = placement.as_str(),
            filled_blank = stats.filled_blank,
            added = stats.added,
            "placing records"
        );

        write_grid(
            self.transport.as_ref(),
            &target,
            grid,
            InputOption::UserEntered,
        )
        .await?;
        Ok(stats)
    }

    /// Overwrite `fields` on every row matching the filter.
    ///
    /// Matching runs against formatted values while the write starts from
    /// the formula view, so untouched formulas survive. Returns the number
    /// of rows updated.
    pub async fn update(
        &self,
        spreadsheet_id: &str,
        range: &str,
        filter: &Filter,
        fields: &Record,
    ) -> Result<usize> {
        let target = SheetRange::new(spreadsheet_id, range);
        let view = fetch_grid(self.transport.as_ref(), &target, RenderMode::Formatted).await?;
        view.require_header()?;
        if view.num_rows() == 0 {
            debug!(%target, "update on range without data rows");
            return Ok(0);
        }

        let mut grid = fetch_grid(self.transport.as_ref(), &target, RenderMode::Formula).await?;
        grid.require_header()?;

        let rows = matching_rows(&view, filter);
        let updated = apply_update(&mut grid, &view, &rows, fields);
        debug!(%target, %filter, updated, "update");

        write_grid(self.transport.as_ref(), &target, grid, self.overwrite_input).await?;
        Ok(updated)
    }

    /// Clear every row matching the filter. Cleared rows stay in place as
    /// blank rows. Returns the number of rows cleared.
    pub async fn delete(&self, spreadsheet_id: &str, range: &str, filter: &Filter) -> Result<usize> {
        let target = SheetRange::new(spreadsheet_id, range);
        let view = fetch_grid(self.transport.as_ref(), &target, RenderMode::Formatted).await?;
        view.require_header()?;
        if view.num_rows() == 0 {
            debug!(%target, "delete on range without data rows");
            return Ok(0);
        }

        let mut grid = fetch_grid(self.transport.as_ref(), &target, RenderMode::Formula).await?;
        grid.require_header()?;

        let rows = matching_rows(&view, filter);
        let cleared = apply_delete(&mut grid, &rows);
        debug!(%target, %filter, cleared, "delete");

        write_grid(self.transport.as_ref(), &target, grid, self.overwrite_input).await?;
        Ok(cleared)
    }
}
