use chrono::NaiveDate;

/// Result type for store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Result type for game operations
pub type GameResult<T> = Result<T, GameError>;

/// Failures reading or writing a persisted document.
///
/// A failed write never replaces the previous contents of the document.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Failed to read {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },

    #[error("Failed to write {path}: {source}")]
    Write {
        path: String,
        source: std::io::Error,
    },

    #[error("Malformed JSON in {path}: {source}")]
    Parse {
        path: String,
        source: serde_json::Error,
    },

    #[error("Failed to encode {path}: {source}")]
    Encode {
        path: String,
        source: serde_json::Error,
    },
}

/// Errors surfaced to the presentation layer
#[derive(Debug, thiserror::Error)]
pub enum GameError {
    #[error("No unused questions remain")]
    ExhaustedPool,

    #[error("{voter} has already voted today")]
    AlreadyVoted { voter: String },

    #[error("Invalid voter: {0}")]
    InvalidVoter(String),

    #[error("Invalid target: {0}")]
    InvalidTarget(String),

    #[error("No question has been chosen for {0}")]
    NoQuestionToday(NaiveDate),

    #[error("Storage failure: {0}")]
    Storage(#[from] StoreError),
}

impl GameError {
    /// Stable machine-readable name for the error kind
    pub fn kind(&self) -> &'static str {
        match self {
            GameError::ExhaustedPool => "exhausted_pool",
            GameError::AlreadyVoted { .. } => "already_voted",
            GameError::InvalidVoter(_) => "invalid_voter",
            GameError::InvalidTarget(_) => "invalid_target",
            GameError::NoQuestionToday(_) => "no_question_today",
            GameError::Storage(_) => "storage_failure",
        }
    }
}
