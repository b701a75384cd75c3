use quiz_core::engine::GameError;
use quiz_core::model::{QuestionSetError, SessionError};
use storage::repository::StorageError;
use thiserror::Error;

/// Failures while reading or writing the score ledger.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum LedgerError {
    #[error(transparent)]
    Session(#[from] SessionError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Failures while loading question bank files.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum IngestError {
    #[error("failed to read bank file {path}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Failures while driving a game from start to finish.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum GameFlowError {
    #[error(transparent)]
    Game(#[from] GameError),
    #[error(transparent)]
    Questions(#[from] QuestionSetError),
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error(transparent)]
    Ledger(#[from] LedgerError),
}
