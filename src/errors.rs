use thiserror::Error;

/// Failures of the bulk operations. Variants deliberately wrap plain
/// strings so no reqwest/serde types leak into the UI layer.
#[derive(Debug, Error)]
pub enum BulkError {
    /// An action that needs a selection was invoked with none.
    #[error("no users selected")]
    EmptySelection,

    /// The backend answered, but refused the operation. The message is
    /// shown to the user verbatim.
    #[error("{0}")]
    Rejected(String),

    /// The request never produced a usable answer (connection, timeout,
    /// or a body that was not the expected JSON).
    #[error("request failed: {0}")]
    Transport(String),

    /// Writing a downloaded export to disk failed.
    #[error("i/o error: {0}")]
    Io(String),
}

impl From<reqwest::Error> for BulkError {
    fn from(err: reqwest::Error) -> Self {
        BulkError::Transport(err.to_string())
    }
}

impl From<std::io::Error> for BulkError {
    fn from(err: std::io::Error) -> Self {
        BulkError::Io(err.to_string())
    }
}
