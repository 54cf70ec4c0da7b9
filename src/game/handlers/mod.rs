//! Per-command room handlers.
//!
//! Each handler takes the shared state, the caller's [`Session`], and the
//! command's fields; it validates against the room under the room lock,
//! mutates, and returns either an ack payload or a [`ServiceError`] whose
//! message is sent to the client verbatim. Broadcasts always happen after the
//! lock is dropped.

mod disconnect;
mod join;
mod move_team;
mod start;
mod submit;

pub use disconnect::handle_disconnect;
pub use join::{JoinGameInput, handle_join_game};
pub use move_team::handle_move_player_team;
pub use start::handle_start_game;
pub use submit::handle_submit_answer;

use uuid::Uuid;

use crate::error::ServiceError;

/// Mutable per-connection context, owned by the socket task.
///
/// One WebSocket connection is one session; the room stores players keyed by
/// `connection_id`, so nothing here needs to be globally registered.
#[derive(Debug)]
pub struct Session {
    /// Stable identifier of this connection, the room's player key.
    pub connection_id: Uuid,
    /// Room the connection has joined, if any.
    pub game_code: Option<String>,
    /// Username accepted at join time.
    pub username: Option<String>,
    /// Whether this connection holds the host seat of its room.
    pub is_host: bool,
}

impl Session {
    /// Fresh session for a newly-accepted connection.
    pub fn new() -> Self {
        Self {
            connection_id: Uuid::new_v4(),
            game_code: None,
            username: None,
            is_host: false,
        }
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

/// Resolve the room code a command targets: explicit code wins, otherwise the
/// session's joined room.
fn resolve_code(
    explicit: Option<String>,
    session: &Session,
) -> Result<String, ServiceError> {
    explicit
        .filter(|code| !code.trim().is_empty())
        .map(|code| crate::dto::validation::normalize_game_code(&code))
        .or_else(|| session.game_code.clone())
        .ok_or_else(|| ServiceError::InvalidInput("Game code is required".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_code_prefers_the_explicit_code() {
        let mut session = Session::new();
        session.game_code = Some("AAAAAA".into());

        let code = resolve_code(Some(" bb2cc3 ".into()), &session).unwrap();
        assert_eq!(code, "BB2CC3");
    }

    #[test]
    fn resolve_code_falls_back_to_the_session() {
        let mut session = Session::new();
        session.game_code = Some("AAAAAA".into());

        assert_eq!(resolve_code(None, &session).unwrap(), "AAAAAA");
        assert_eq!(resolve_code(Some("  ".into()), &session).unwrap(), "AAAAAA");
    }

    #[test]
    fn resolve_code_requires_some_code() {
        let session = Session::new();
        assert!(matches!(
            resolve_code(None, &session),
            Err(ServiceError::InvalidInput(_))
        ));
    }
}
