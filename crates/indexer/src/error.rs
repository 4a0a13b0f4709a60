/// Result type for block-processing and aggregation operations.
pub type Result<T> = std::result::Result<T, ProcessError>;

/// Errors raised by the block processor, stats store, and aggregation
/// engine.
#[derive(thiserror::Error, Debug)]
pub enum ProcessError {
    /// The upstream node could not be reached or returned a malformed
    /// response.
    #[error(transparent)]
    Upstream(#[from] feeindex_rpc::UpstreamError),

    /// The persistent store could not be read or written.
    #[error(transparent)]
    Store(#[from] feeindex_persist::StoreError),

    /// A block invariant was violated (e.g. an uncle's hash did not match
    /// the including block's uncle list). The block is not persisted.
    #[error("invariant violated for block {block_number}: {message}")]
    InvariantViolation {
        /// The block number that failed validation.
        block_number: u64,
        /// What invariant was violated.
        message: String,
    },

    /// A requested block or totals window was not found in the in-memory
    /// store.
    #[error("not found: {0}")]
    NotFound(String),

    /// `getTotalsTimeDelta`-style range is invalid, e.g. `end <= start`.
    #[error("invalid range: {0}")]
    InvalidRange(String),
}
