use utoipa::OpenApi;

#[derive(OpenApi)]
/// Aggregated OpenAPI specification for the trivia game server.
#[openapi(
    paths(
        crate::routes::health::healthcheck,
        crate::routes::game::create_game,
        crate::routes::questions::random_questions,
        crate::routes::websocket::ws_handler,
    ),
    components(
        schemas(
            crate::dto::health::HealthResponse,
            crate::dto::game::CreateGameRequest,
            crate::dto::game::GameCreated,
            crate::dto::game::QuestionView,
            crate::dto::ws::ClientCommand,
            crate::dto::ws::JoinAck,
            crate::dto::ws::SubmitAck,
            crate::dto::ws::RoomBroadcast,
            crate::dao::models::GameMode,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "games", description = "Game definition management"),
        (name = "play", description = "WebSocket operations for hosts and players"),
    )
)]
pub struct ApiDoc;
