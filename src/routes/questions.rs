use axum::{
    Json, Router,
    extract::{Query, State},
    routing::get,
};

use crate::{
    dto::game::{QuestionView, RandomQuestionsParams},
    error::AppError,
    services::game_service,
    state::SharedState,
};

/// How many questions a sample returns when the caller does not say.
const DEFAULT_SAMPLE_SIZE: u32 = 10;

/// Routes exposing the question bank.
pub fn router() -> Router<SharedState> {
    Router::new().route("/api/questions/random", get(random_questions))
}

/// Draw a random sample from the question bank.
#[utoipa::path(
    get,
    path = "/api/questions/random",
    tag = "games",
    params(RandomQuestionsParams),
    responses(
        (status = 200, description = "Random questions, answer key included", body = [QuestionView]),
        (status = 400, description = "count is not a positive number")
    )
)]
pub async fn random_questions(
    State(state): State<SharedState>,
    Query(params): Query<RandomQuestionsParams>,
) -> Result<Json<Vec<QuestionView>>, AppError> {
    let count = params.count.unwrap_or(DEFAULT_SAMPLE_SIZE);
    let questions = game_service::random_questions(&state, count).await?;
    Ok(Json(questions))
}
