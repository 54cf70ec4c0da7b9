use crate::{
    dto::game::{CreateGameRequest, GameCreated, QuestionView},
    error::ServiceError,
    state::SharedState,
};

/// Bootstrap a new game definition with a freshly-allocated join code.
///
/// The room itself is created lazily by the first `join_game` over the
/// WebSocket; creation only persists the definition and hands the host the
/// code to share.
pub async fn create_game(
    state: &SharedState,
    request: CreateGameRequest,
) -> Result<GameCreated, ServiceError> {
    let game = state.repository().create_game(request.into()).await?;
    Ok(game.into())
}

/// Draw up to `count` random questions from the bank.
///
/// Hosts use this to preview material; the draw for an actual run happens
/// when the game starts and never goes through this path.
pub async fn random_questions(
    state: &SharedState,
    count: u32,
) -> Result<Vec<QuestionView>, ServiceError> {
    if count == 0 {
        return Err(ServiceError::InvalidInput(
            "count must be a positive number".to_string(),
        ));
    }
    let questions = state.repository().random_questions(count).await?;
    Ok(questions.into_iter().map(QuestionView::from).collect())
}
