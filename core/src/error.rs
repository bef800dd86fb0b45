use thiserror::Error;

#[derive(Error, Debug)]
pub enum DriverError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Unable to connect to backend '{driver}': {reason}")]
    Connection { driver: String, reason: String },

    /// TPC-C requires ~1% of New-Orders to reference an unused item id
    /// and roll back. This is an expected outcome, not a backend fault.
    #[error("New-Order referenced a nonexistent item, rolling back")]
    BadItemRollback,

    #[error("No customer matched the given id or last name")]
    CustomerNotFound,

    #[error("Customer has no orders in this district")]
    OrderNotFound,

    #[error("No {table} row matched")]
    NotFound { table: &'static str },

    #[error("Short read on {table}: expected {expected} rows, got {actual}")]
    ShortRead {
        table: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("Backend does not support {0}")]
    Unsupported(&'static str),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl DriverError {
    /// Business aborts that the workload produces on purpose or that a
    /// lookup legitimately yields. They count as failed transactions but
    /// never indicate a broken backend.
    pub fn is_expected_abort(&self) -> bool {
        matches!(
            self,
            Self::BadItemRollback | Self::CustomerNotFound | Self::OrderNotFound
        )
    }
}

pub type DriverResult<T> = Result<T, DriverError>;
