use sheetstore::SheetStoreError;

#[derive(Debug, thiserror::Error)]
pub enum SheetsError {
    #[error(transparent)]
    ReqwestError(#[from] reqwest::Error),

    #[error(transparent)]
    SerdeJsonError(#[from] serde_json::Error),

    #[error(transparent)]
    IoError(#[from] std::io::Error),

    #[error(transparent)]
    Base64DecodeError(#[from] base64::DecodeError),

    #[error("Invalid URL: {0}")]
    UrlParseError(String),

    #[error("Request errored with status code {status}: {body}")]
    HttpError {
        status: reqwest::StatusCode,
        body: String,
    },

    #[error("Invalid credentials: {0}")]
    InvalidCredentials(String),

    #[error("Private key rejected: {0}")]
    KeyRejected(String),

    #[error("Failed to sign token request")]
    SigningFailed,

    #[error("Unexpected cell value: {0}")]
    UnexpectedCellValue(String),
}

impl From<SheetsError> for SheetStoreError {
    fn from(value: SheetsError) -> Self {
        Self::Transport(Box::new(value))
    }
}

pub type Result<T, E = SheetsError> = std::result::Result<T, E>;
