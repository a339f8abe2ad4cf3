pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Debug, thiserror::Error)]
pub enum SheetStoreError {
    /// Error returned by the grid transport, passed through as is.
    #[error(transparent)]
    Transport(BoxError),

    #[error("No header found.")]
    MissingHeader,

    #[error("Invalid filter key '{key}': {reason}")]
    InvalidFilter { key: String, reason: String },

    #[error("Invalid json input: {0}")]
    InvalidJson(String),
}

impl SheetStoreError {
    pub fn transport(err: impl Into<BoxError>) -> Self {
        Self::Transport(err.into())
    }
}

pub type Result<T, E = SheetStoreError> = std::result::Result<T, E>;

macro_rules! invalid_filter {
    ($key:expr, $($arg:tt)*) => {
        crate::errors::SheetStoreError::InvalidFilter {
            key: $key.to_string(),
            reason: std::format!($($arg)*),
        }
    };
}
pub(crate) use invalid_filter;
