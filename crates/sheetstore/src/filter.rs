//! Filter predicates over records and raw rows.
//!
//! A filter is built from `key -> value` pairs where the key names a column
//! and optionally carries an operator suffix:
//!
//! - `col` equality. Strict for records, loose for raw rows.
//! - `col__not` cell does not loosely equal the value.
//! - `col__is` cell strictly equals the value.
//! - `col__has` cell contains the value.
//! - `col__iHas` cell contains the value, ignoring case.
//! - `a__or__b` any column loosely equals its positional value. With a
//!   trailing `__not`, any column loosely differs from its value.
//!
//! All predicates in a filter must hold for a row to match.

use std::fmt;

use serde_json::Value;

use crate::errors::{Result, SheetStoreError, invalid_filter};
use crate::grid::HeaderIndex;
use crate::record::{Record, json_scalar_to_cell};

const OR_SEPARATOR: &str = "__or__";
const NOT_SUFFIX: &str = "__not";
const IS_SUFFIX: &str = "__is";
const HAS_SUFFIX: &str = "__has";
const IHAS_SUFFIX: &str = "__iHas";

/// Target of a filter key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterValue {
    One(String),
    /// Positional values for `__or__` keys.
    Many(Vec<String>),
}

impl From<&str> for FilterValue {
    fn from(value: &str) -> Self {
        Self::One(value.to_string())
    }
}

impl From<String> for FilterValue {
    fn from(value: String) -> Self {
        Self::One(value)
    }
}

impl From<Vec<String>> for FilterValue {
    fn from(value: Vec<String>) -> Self {
        Self::Many(value)
    }
}

impl From<Vec<&str>> for FilterValue {
    fn from(value: Vec<&str>) -> Self {
        Self::Many(value.into_iter().map(|s| s.to_string()).collect())
    }
}

impl<const N: usize> From<[&str; N]> for FilterValue {
    fn from(value: [&str; N]) -> Self {
        Self::Many(value.into_iter().map(|s| s.to_string()).collect())
    }
}

/// How plain `col` keys compare.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EqualityMode {
    /// Byte equality. Used when filtering projected records.
    Strict,
    /// Numeric-tolerant equality. Used when matching raw rows, since the
    /// remote may render `3` and `3.0` differently.
    Loose,
}

/// Cell access by column name.
pub trait CellLookup {
    /// `None` if the column doesn't exist.
    fn cell(&self, column: &str) -> Option<&str>;
}

impl CellLookup for Record {
    fn cell(&self, column: &str) -> Option<&str> {
        self.get(column).map(String::as_str)
    }
}

/// A raw row viewed through its header.
#[derive(Debug, Clone, Copy)]
pub struct RowCells<'a> {
    index: &'a HeaderIndex,
    row: &'a [String],
}

impl<'a> RowCells<'a> {
    pub fn new(index: &'a HeaderIndex, row: &'a [String]) -> Self {
        RowCells { index, row }
    }
}

impl CellLookup for RowCells<'_> {
    fn cell(&self, column: &str) -> Option<&str> {
        self.index
            .position(column)
            .and_then(|idx| self.row.get(idx))
            .map(String::as_str)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Predicate {
    Eq {
        column: String,
        value: String,
    },
    Not {
        column: String,
        value: String,
    },
    Is {
        column: String,
        value: String,
    },
    Has {
        column: String,
        needle: String,
    },
    IHas {
        column: String,
        /// Stored upper-cased.
        needle: String,
    },
    AnyOf {
        /// (column, value) pairs.
        branches: Vec<(String, String)>,
        negated: bool,
    },
}

impl Predicate {
    /// Parse a single filter key and its target.
    pub fn parse(key: &str, value: FilterValue) -> Result<Self> {
        if key.contains(OR_SEPARATOR) {
            return Self::parse_any_of(key, value);
        }

        let value = match value {
            FilterValue::One(value) => value,
            FilterValue::Many(values) => {
                return Err(invalid_filter!(
                    key,
                    "expected a single value, got a list of {}",
                    values.len()
                ));
            }
        };

        let pred = if let Some(column) = key.strip_suffix(NOT_SUFFIX) {
            Predicate::Not {
                column: non_empty_column(key, column)?,
                value,
            }
        } else if let Some(column) = key.strip_suffix(IS_SUFFIX) {
            Predicate::Is {
                column: non_empty_column(key, column)?,
                value,
            }
        } else if let Some(column) = key.strip_suffix(IHAS_SUFFIX) {
            Predicate::IHas {
                column: non_empty_column(key, column)?,
                needle: value.to_uppercase(),
            }
        } else if let Some(column) = key.strip_suffix(HAS_SUFFIX) {
            Predicate::Has {
                column: non_empty_column(key, column)?,
                needle: value,
            }
        } else {
            Predicate::Eq {
                column: non_empty_column(key, key)?,
                value,
            }
        };

        Ok(pred)
    }

    fn parse_any_of(key: &str, value: FilterValue) -> Result<Self> {
        let (base, negated) = match key.strip_suffix(NOT_SUFFIX) {
            Some(base) => (base, true),
            None => (key, false),
        };

        let columns = base
            .split(OR_SEPARATOR)
            .map(|column| non_empty_column(key, column))
            .collect::<Result<Vec<_>>>()?;

        let values = match value {
            FilterValue::Many(values) => values,
            FilterValue::One(_) => {
                return Err(invalid_filter!(
                    key,
                    "expected a list of {} values",
                    columns.len()
                ));
            }
        };

        if values.len() != columns.len() {
            return Err(invalid_filter!(
                key,
                "expected {} values, got {}",
                columns.len(),
                values.len()
            ));
        }

        Ok(Predicate::AnyOf {
            branches: columns.into_iter().zip(values).collect(),
            negated,
        })
    }

    /// Evaluate against a record or row.
    ///
    /// A missing column never equals or contains anything, so negative
    /// predicates hold for it.
    pub fn evaluate<C>(&self, cells: &C, mode: EqualityMode) -> bool
    where
        C: CellLookup + ?Sized,
    {
        match self {
            Self::Eq { column, value } => match (cells.cell(column), mode) {
                (Some(cell), EqualityMode::Strict) => cell == value,
                (Some(cell), EqualityMode::Loose) => loose_eq(cell, value),
                (None, _) => false,
            },
            Self::Not { column, value } => cells
                .cell(column)
                .is_none_or(|cell| !loose_eq(cell, value)),
            Self::Is { column, value } => cells.cell(column) == Some(value.as_str()),
            Self::Has { column, needle } => cells
                .cell(column)
                .is_some_and(|cell| cell.contains(needle.as_str())),
            Self::IHas { column, needle } => cells
                .cell(column)
                .is_some_and(|cell| cell.to_uppercase().contains(needle.as_str())),
            // No branch holding means no match, negated or not.
            Self::AnyOf { branches, negated } => branches.iter().any(|(column, value)| {
                let cell = cells.cell(column);
                if *negated {
                    cell.is_none_or(|cell| !loose_eq(cell, value))
                } else {
                    cell.is_some_and(|cell| loose_eq(cell, value))
                }
            }),
        }
    }
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Eq { column, value } => write!(f, "{column} = '{value}'"),
            Self::Not { column, value } => write!(f, "{column} != '{value}'"),
            Self::Is { column, value } => write!(f, "{column} IS '{value}'"),
            Self::Has { column, needle } => write!(f, "{column} HAS '{needle}'"),
            Self::IHas { column, needle } => write!(f, "{column} IHAS '{needle}'"),
            Self::AnyOf { branches, negated } => {
                let op = if *negated { "!=" } else { "=" };
                for (idx, (column, value)) in branches.iter().enumerate() {
                    if idx > 0 {
                        write!(f, " OR ")?;
                    }
                    write!(f, "{column} {op} '{value}'")?;
                }
                Ok(())
            }
        }
    }
}

fn non_empty_column(key: &str, column: &str) -> Result<String> {
    if column.is_empty() {
        return Err(invalid_filter!(key, "missing column name"));
    }
    Ok(column.to_string())
}

/// Equality that tolerates numeric formatting differences.
///
/// Two cells are loosely equal if they're identical, or if both parse as
/// finite numbers with the same value (`"3"`, `"3.0"`, `" 3 "`).
pub fn loose_eq(a: &str, b: &str) -> bool {
    if a == b {
        return true;
    }
    match (parse_number(a), parse_number(b)) {
        (Some(a), Some(b)) => a == b,
        _ => false,
    }
}

fn parse_number(s: &str) -> Option<f64> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }
    s.parse::<f64>().ok().filter(|n| n.is_finite())
}

/// A conjunction of predicates.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Filter {
    predicates: Vec<Predicate>,
}

impl Filter {
    /// Filter that matches everything.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn parse<I, K, V>(entries: I) -> Result<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<FilterValue>,
    {
        let predicates = entries
            .into_iter()
            .map(|(key, value)| Predicate::parse(key.as_ref(), value.into()))
            .collect::<Result<Vec<_>>>()?;
        Ok(Filter { predicates })
    }

    /// Build a filter from a json object.
    ///
    /// Values may be strings, numbers, booleans or null. Arrays are accepted
    /// as targets for `__or__` keys.
    pub fn from_json(value: &Value) -> Result<Self> {
        let obj = value.as_object().ok_or_else(|| {
            SheetStoreError::InvalidJson(format!("expected filter object, got: {value}"))
        })?;

        let mut predicates = Vec::with_capacity(obj.len());
        for (key, value) in obj {
            let target = match value {
                Value::Array(values) => FilterValue::Many(
                    values
                        .iter()
                        .map(|v| {
                            json_scalar_to_cell(v).ok_or_else(|| {
                                invalid_filter!(key, "unsupported list element: {v}")
                            })
                        })
                        .collect::<Result<Vec<_>>>()?,
                ),
                other => FilterValue::One(
                    json_scalar_to_cell(other)
                        .ok_or_else(|| invalid_filter!(key, "unsupported value: {other}"))?,
                ),
            };
            predicates.push(Predicate::parse(key, target)?);
        }

        Ok(Filter { predicates })
    }

    pub fn is_empty(&self) -> bool {
        self.predicates.is_empty()
    }

    pub fn predicates(&self) -> &[Predicate] {
        &self.predicates
    }

    pub fn matches<C>(&self, cells: &C, mode: EqualityMode) -> bool
    where
        C: CellLookup + ?Sized,
    {
        self.predicates.iter().all(|p| p.evaluate(cells, mode))
    }

    /// Select path matching, strict equality for plain keys.
    pub fn matches_record(&self, record: &Record) -> bool {
        self.matches(record, EqualityMode::Strict)
    }

    /// Update/delete path matching, loose equality for plain keys.
    pub fn matches_row(&self, index: &HeaderIndex, row: &[String]) -> bool {
        self.matches(&RowCells::new(index, row), EqualityMode::Loose)
    }
}

impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.predicates.is_empty() {
            return write!(f, "TRUE");
        }
        for (idx, pred) in self.predicates.iter().enumerate() {
            if idx > 0 {
                write!(f, " AND ")?;
            }
            if matches!(pred, Predicate::AnyOf { .. }) {
                write!(f, "({pred})")?;
            } else {
                write!(f, "{pred}")?;
            }
        }
        Ok(())
    }
}
