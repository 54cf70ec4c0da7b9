use tracing::warn;

use crate::{dto::health::HealthResponse, state::SharedState};

/// Probe the repository and report liveness plus the live-room count.
pub async fn health_status(state: &SharedState) -> HealthResponse {
    let active_rooms = state.rooms().len();
    match state.repository().health_check().await {
        Ok(()) => HealthResponse::ok(active_rooms),
        Err(err) => {
            warn!(error = %err, "repository health check failed");
            HealthResponse::degraded(active_rooms)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{config::AppConfig, dao::memory::InMemoryRepository, state::AppState};
    use std::sync::Arc;

    #[tokio::test]
    async fn a_healthy_repository_reports_ok() {
        let state = AppState::new(
            Arc::new(InMemoryRepository::with_default_bank()),
            AppConfig::with_timings(5, 5, 100),
        );

        let response = health_status(&state).await;
        assert_eq!(response.status, "ok");
        assert_eq!(response.active_rooms, 0);
    }
}
