use thiserror::Error;

/// Dispatch engine errors
///
/// Routing itself never surfaces these to the caller: every component turns a
/// failed read into "this source produced nothing". They are returned from
/// store operations and from start-up (configuration, database connection).
#[derive(Error, Debug)]
pub enum DispatchError {
    /// Database errors
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Stored JSON could not be encoded or decoded
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Configuration source could not be read or deserialized
    #[error("Configuration load error: {0}")]
    ConfigLoad(#[from] config::ConfigError),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// A data source could not be read
    #[error("Data unavailable: {0}")]
    DataUnavailable(String),

    /// Not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl DispatchError {
    /// Create a new Config error
    pub fn config<S: Into<String>>(msg: S) -> Self {
        Self::Config(msg.into())
    }

    /// Create a new DataUnavailable error
    pub fn data_unavailable<S: Into<String>>(msg: S) -> Self {
        Self::DataUnavailable(msg.into())
    }

    /// Create a new NotFound error
    pub fn not_found<S: Into<String>>(msg: S) -> Self {
        Self::NotFound(msg.into())
    }

    /// Create a new InvalidInput error
    pub fn invalid_input<S: Into<String>>(msg: S) -> Self {
        Self::InvalidInput(msg.into())
    }
}

/// Result type for dispatch operations
pub type Result<T> = std::result::Result<T, DispatchError>;
