use std::fmt;

use async_trait::async_trait;

use crate::errors::Result;

/// How the remote service renders cell content on fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RenderMode {
    /// Values as displayed, after number/date formatting.
    Formatted,
    /// Evaluated values without formatting.
    Unformatted,
    /// Formula text for formula cells, values otherwise.
    Formula,
}

impl RenderMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Formatted => "FORMATTED_VALUE",
            Self::Unformatted => "UNFORMATTED_VALUE",
            Self::Formula => "FORMULA",
        }
    }
}

impl fmt::Display for RenderMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// How the remote service interprets written cell content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InputOption {
    /// Stored exactly as given.
    Raw,
    /// Parsed as if typed into the UI, so `=...` becomes a formula.
    UserEntered,
}

impl InputOption {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Raw => "RAW",
            Self::UserEntered => "USER_ENTERED",
        }
    }
}

impl fmt::Display for InputOption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A spreadsheet plus a range inside of it (e.g. `Sheet1!A1:F`).
///
/// The range is opaque and handed to the transport untouched.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SheetRange {
    pub spreadsheet_id: String,
    pub range: String,
}

impl SheetRange {
    pub fn new(spreadsheet_id: impl Into<String>, range: impl Into<String>) -> Self {
        Self {
            spreadsheet_id: spreadsheet_id.into(),
            range: range.into(),
        }
    }
}

impl fmt::Display for SheetRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.spreadsheet_id, self.range)
    }
}

/// Remote access to a spreadsheet range.
///
/// Implementations should return rows exactly as the service does; ragged
/// rows are fine, callers normalize them.
#[async_trait]
pub trait GridTransport: Send + Sync {
    async fn fetch_grid(&self, target: &SheetRange, render: RenderMode)
    -> Result<Vec<Vec<String>>>;

    async fn write_grid(
        &self,
        target: &SheetRange,
        values: Vec<Vec<String>>,
        input: InputOption,
    ) -> Result<()>;
}
