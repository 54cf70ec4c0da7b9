/// OpenAPI documentation generation.
pub mod documentation;
/// Game definition bootstrap operations.
pub mod game_service;
/// Health check service.
pub mod health_service;
/// WebSocket connection and message handling service.
pub mod websocket_service;
