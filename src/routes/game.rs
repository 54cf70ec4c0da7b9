use axum::{Json, Router, extract::State, routing::post};
use validator::Validate;

use crate::{
    dto::game::{CreateGameRequest, GameCreated},
    error::AppError,
    services::game_service,
    state::SharedState,
};

/// Routes handling game bootstrap operations.
pub fn router() -> Router<SharedState> {
    Router::new().route("/api/games", post(create_game))
}

/// Create a fresh game definition and hand back its join code.
#[utoipa::path(
    post,
    path = "/api/games",
    tag = "games",
    request_body = CreateGameRequest,
    responses(
        (status = 200, description = "Game created", body = GameCreated),
        (status = 400, description = "Invalid game settings")
    )
)]
pub async fn create_game(
    State(state): State<SharedState>,
    Json(payload): Json<CreateGameRequest>,
) -> Result<Json<GameCreated>, AppError> {
    payload.validate()?;
    let created = game_service::create_game(&state, payload).await?;
    Ok(Json(created))
}
