use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Parser, ValueEnum};
use sheets_connector::Connection;
use sheets_connector::auth::{CREDENTIALS_ENV_VAR, DEFAULT_CREDENTIALS_PATH};
use sheets_connector::req::DEFAULT_BASE_URL;
use sheetstore::InputOption;

use crate::commands::Commands;

#[derive(Debug, Clone, Copy, ValueEnum, Default)]
pub enum LoggingMode {
    #[default]
    Pretty,
    Json,
}

impl From<LoggingMode> for logutil::LogFormat {
    fn from(mode: LoggingMode) -> Self {
        match mode {
            LoggingMode::Pretty => logutil::LogFormat::HumanReadable,
            LoggingMode::Json => logutil::LogFormat::Json,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum, Default, PartialEq, Eq)]
pub enum OverwriteInput {
    /// Written values are parsed as if typed in, formulas stay formulas.
    #[default]
    UserEntered,
    /// Written values are stored verbatim.
    Raw,
}

impl From<OverwriteInput> for InputOption {
    fn from(value: OverwriteInput) -> Self {
        match value {
            OverwriteInput::UserEntered => InputOption::UserEntered,
            OverwriteInput::Raw => InputOption::Raw,
        }
    }
}

#[derive(Debug, Parser)]
#[clap(name = "sheetctl")]
#[clap(version)]
#[clap(about = "Query and modify a spreadsheet range as records", long_about = None)]
pub struct Cli {
    /// Log verbosity.
    #[clap(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Log output format.
    #[clap(long, global = true, value_enum, default_value_t)]
    pub log_mode: LoggingMode,

    #[clap(flatten)]
    pub connection: ConnectionArgs,

    #[clap(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Args)]
pub struct ConnectionArgs {
    /// Path to a service account json key.
    #[arg(
        long,
        global = true,
        env = CREDENTIALS_ENV_VAR,
        default_value = DEFAULT_CREDENTIALS_PATH
    )]
    pub credentials: PathBuf,

    /// Bearer token to use instead of a service account key.
    #[arg(long, global = true, env = "GSHEETS_ACCESS_TOKEN", hide_env_values = true)]
    pub access_token: Option<String>,

    /// Sheets api base url.
    #[arg(long, global = true, hide = true, default_value = DEFAULT_BASE_URL)]
    pub base_url: String,

    /// Request timeout in seconds.
    #[arg(long, global = true, default_value_t = 30)]
    pub timeout_secs: u64,

    /// How update and delete write cells back.
    #[arg(long, global = true, value_enum, default_value_t)]
    pub overwrite_input: OverwriteInput,
}

impl ConnectionArgs {
    pub fn connect(&self) -> anyhow::Result<Connection> {
        let mut builder = Connection::builder()
            .base_url(self.base_url.clone())
            .credentials_path(self.credentials.clone())
            .timeout(Duration::from_secs(self.timeout_secs));
        if let Some(token) = &self.access_token {
            builder = builder.access_token(token.clone());
        }
        Ok(builder.build()?)
    }
}

/// Spreadsheet and range an operation applies to.
#[derive(Debug, Args)]
pub struct TargetArgs {
    /// Spreadsheet id, as found in the spreadsheet's url.
    pub spreadsheet_id: String,

    /// Range including the header row, e.g. `Sheet1!A1:F`.
    pub range: String,
}
