use std::error::Error;

use futures::future::BoxFuture;
use thiserror::Error;
use uuid::Uuid;

use crate::dao::models::{AnswerRow, GameRecord, NewGameSettings, ParticipantRow, QuestionRecord};

/// Result alias for repository operations.
pub type RepositoryResult<T> = Result<T, RepositoryError>;

/// Error raised by repository backends regardless of the underlying storage.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// The backend could not serve the request.
    #[error("repository unavailable: {message}")]
    Unavailable {
        /// Human-readable context for the failure.
        message: String,
        /// Underlying backend failure.
        #[source]
        source: Box<dyn Error + Send + Sync>,
    },
    /// No unique join code could be allocated for a new game.
    #[error("could not allocate a unique game code")]
    CodeAllocation,
}

impl RepositoryError {
    /// Construct an unavailable error from any backend failure.
    pub fn unavailable(message: String, source: impl Error + Send + Sync + 'static) -> Self {
        RepositoryError::Unavailable {
            message,
            source: Box::new(source),
        }
    }
}

/// Abstraction over game metadata, the question bank, and gameplay history.
///
/// Gameplay history methods (`record_answer`, `record_participants`) are
/// best-effort collaborators: callers log failures and keep playing.
pub trait GameRepository: Send + Sync {
    /// Persist a new game definition and allocate its join code.
    fn create_game(
        &self,
        settings: NewGameSettings,
    ) -> BoxFuture<'static, RepositoryResult<GameRecord>>;
    /// Look up a game by its normalized join code.
    fn find_game_by_code(
        &self,
        code: String,
    ) -> BoxFuture<'static, RepositoryResult<Option<GameRecord>>>;
    /// Look up a game by its identifier.
    fn find_game(&self, id: Uuid) -> BoxFuture<'static, RepositoryResult<Option<GameRecord>>>;
    /// Draw a random ordered set of questions from the bank.
    fn random_questions(
        &self,
        count: u32,
    ) -> BoxFuture<'static, RepositoryResult<Vec<QuestionRecord>>>;
    /// Append one answer to the per-question history.
    fn record_answer(&self, row: AnswerRow) -> BoxFuture<'static, RepositoryResult<()>>;
    /// Append the final participant records for a finished run.
    fn record_participants(
        &self,
        game_id: Uuid,
        rows: Vec<ParticipantRow>,
    ) -> BoxFuture<'static, RepositoryResult<()>>;
    /// Probe the backend for liveness.
    fn health_check(&self) -> BoxFuture<'static, RepositoryResult<()>>;
}
