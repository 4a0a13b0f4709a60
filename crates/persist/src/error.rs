/// Result type for [`crate::Repository`] operations.
pub type Result<T> = std::result::Result<T, StoreError>;

/// Errors returned by a [`crate::Repository`] implementation.
#[derive(thiserror::Error, Debug)]
pub enum StoreError {
    /// The underlying database driver returned an error.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A stored field failed to decode back into its typed representation
    /// (e.g. a corrupt hex string in a legacy row).
    #[error("failed to decode stored row: {0}")]
    Decode(String),
}
