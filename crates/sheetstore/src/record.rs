use indexmap::IndexMap;
use serde_json::Value;
use tracing::debug;

use crate::errors::{Result, SheetStoreError};
use crate::grid::{Grid, Row};

/// A data row keyed by column name, in header order.
pub type Record = IndexMap<String, String>;

/// Zip every data row with the header.
pub fn grid_to_records(grid: &Grid) -> Vec<Record> {
    grid.rows()
        .iter()
        .map(|row| row_to_record(grid.header(), row))
        .collect()
}

/// Cells beyond the header are ignored, missing cells become empty strings.
pub fn row_to_record(header: &[String], row: &[String]) -> Record {
    header
        .iter()
        .enumerate()
        .map(|(idx, column)| {
            let cell = row.get(idx).cloned().unwrap_or_default();
            (column.clone(), cell)
        })
        .collect()
}

/// Lay a record out in header order, empty string for absent columns.
pub fn record_to_row(header: &[String], record: &Record) -> Row {
    for column in record.keys() {
        if !header.contains(column) {
            debug!(%column, "ignoring field not present in header");
        }
    }

    header
        .iter()
        .map(|column| record.get(column).cloned().unwrap_or_default())
        .collect()
}

/// Cell text for a json scalar.
///
/// Null becomes an empty cell and booleans are rendered the way the remote
/// displays them. Arrays and objects have no cell representation.
pub fn json_scalar_to_cell(value: &Value) -> Option<String> {
    match value {
        Value::Null => Some(String::new()),
        Value::Bool(true) => Some("TRUE".to_string()),
        Value::Bool(false) => Some("FALSE".to_string()),
        Value::Number(n) => Some(n.to_string()),
        Value::String(s) => Some(s.clone()),
        Value::Array(_) | Value::Object(_) => None,
    }
}

pub fn record_from_json(value: &Value) -> Result<Record> {
    let obj = value.as_object().ok_or_else(|| {
        SheetStoreError::InvalidJson(format!("expected record object, got: {value}"))
    })?;

    obj.iter()
        .map(|(column, value)| {
            let cell = json_scalar_to_cell(value).ok_or_else(|| {
                SheetStoreError::InvalidJson(format!(
                    "unsupported value for column '{column}': {value}"
                ))
            })?;
            Ok((column.clone(), cell))
        })
        .collect()
}

/// Accepts either a single object or an array of objects.
pub fn records_from_json(value: &Value) -> Result<Vec<Record>> {
    match value {
        Value::Array(values) => values.iter().map(record_from_json).collect(),
        other => Ok(vec![record_from_json(other)?]),
    }
}

pub fn record_to_json(record: &Record) -> Value {
    Value::Object(
        record
            .iter()
            .map(|(k, v)| (k.clone(), Value::String(v.clone())))
            .collect(),
    )
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn strings(cells: &[&str]) -> Vec<String> {
        cells.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn projects_rows_in_order() {
        let grid = Grid::from_values(vec![
            strings(&["id", "name"]),
            strings(&["1", "a"]),
            strings(&["2"]),
        ]);

        let records = grid_to_records(&grid);
        assert_eq!(2, records.len());
        assert_eq!("a", records[0]["name"]);
        assert_eq!("2", records[1]["id"]);
        assert_eq!("", records[1]["name"]);
    }

    #[test]
    fn row_to_record_ignores_extra_cells() {
        let header = strings(&["id"]);
        let record = row_to_record(&header, &strings(&["1", "extra"]));
        assert_eq!(1, record.len());
        assert_eq!("1", record["id"]);
    }

    #[test]
    fn record_to_row_header_order() {
        let header = strings(&["id", "name", "status"]);
        let mut record = Record::new();
        record.insert("status".to_string(), "open".to_string());
        record.insert("id".to_string(), "7".to_string());
        record.insert("unknown".to_string(), "x".to_string());

        assert_eq!(strings(&["7", "", "open"]), record_to_row(&header, &record));
    }

    #[test]
    fn round_trip_through_header() {
        let header = strings(&["id", "name", "status"]);
        let rows = vec![strings(&["1", "a", ""]), strings(&["2", "b"])];
        let grid = Grid::new(header.clone(), rows);

        for (record, row) in grid_to_records(&grid).iter().zip(grid.rows()) {
            assert_eq!(row, &record_to_row(&header, record));
        }
    }

    #[test]
    fn records_from_json_values() {
        let records = records_from_json(&json!([
            {"id": 1, "name": "a", "note": null},
            {"id": "2", "done": false},
        ]))
        .unwrap();

        assert_eq!(2, records.len());
        assert_eq!("1", records[0]["id"]);
        assert_eq!("", records[0]["note"]);
        assert_eq!("FALSE", records[1]["done"]);

        let single = records_from_json(&json!({"id": 3})).unwrap();
        assert_eq!(1, single.len());

        assert!(records_from_json(&json!([{"id": [1]}])).is_err());
        assert!(records_from_json(&json!("id")).is_err());
    }

    #[test]
    fn record_to_json_strings() {
        let mut record = Record::new();
        record.insert("id".to_string(), "1".to_string());
        assert_eq!(json!({"id": "1"}), record_to_json(&record));
    }
}
