use placement_db::is_constraint_violation;

/// Failure of an engine operation. Ineligibility is not an error; see
/// [`crate::applications::ApplyOutcome`].
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Malformed input, rejected before storage is touched.
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    NotFound(String),

    /// A rule or constraint refused the write.
    #[error("{0}")]
    Conflict(String),

    /// Storage failed or timed out. Safe to retry.
    #[error("storage error: {0:#}")]
    Storage(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, EngineError>;

impl EngineError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn not_found(what: &str) -> Self {
        Self::NotFound(format!("{what} not found"))
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict(message.into())
    }

    /// Map a storage error, surfacing UNIQUE/CHECK/FK violations as conflicts.
    pub(crate) fn from_write(err: anyhow::Error) -> Self {
        if is_constraint_violation(&err) {
            Self::Conflict(format!("{err:#}"))
        } else {
            Self::Storage(err)
        }
    }
}
