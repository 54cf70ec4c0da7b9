//! `start_game`: host-only transition from lobby to a running game.

use std::collections::HashMap;

use tracing::{info, warn};

use crate::{
    dao::models::GameMode,
    dto::ws::RoomBroadcast,
    error::ServiceError,
    game::{flow, handlers::Session},
    state::{SharedState, room::RoomStatus},
};

const MIN_ACTIVE_PLAYERS: usize = 2;
const MIN_TEAM_MEMBERS: usize = 2;

/// Start a run: validate the lobby, claim the room, load questions, and
/// schedule the first question after the countdown.
///
/// The room is marked `InProgress` before the question fetch so a concurrent
/// `start_game` is rejected rather than racing; the claim is rolled back if
/// the fetch fails. Room state is re-validated after the await since a host
/// disconnect may have torn the run down in the meantime.
pub async fn handle_start_game(
    state: &SharedState,
    session: &Session,
    game_code: Option<String>,
) -> Result<(), ServiceError> {
    let code = super::resolve_code(game_code, session)?;
    let handle = state
        .rooms()
        .get(&code)
        .ok_or_else(|| ServiceError::NotFound("No room for this game code".to_string()))?;

    let game_id = {
        let mut room = handle.room().lock().await;

        if room.host_connection != Some(session.connection_id) {
            return Err(ServiceError::Unauthorized(
                "Only the host can start the game".to_string(),
            ));
        }
        if room.status == RoomStatus::InProgress {
            return Err(ServiceError::InvalidState(
                "Game is already in progress".to_string(),
            ));
        }
        if room.active_player_count() < MIN_ACTIVE_PLAYERS {
            return Err(ServiceError::InvalidState(format!(
                "At least {MIN_ACTIVE_PLAYERS} players are required to start"
            )));
        }
        if room.mode == GameMode::Team {
            let Some(team_count) = room.team_count else {
                return Err(ServiceError::InvalidState(
                    "Team count has not been set for this game".to_string(),
                ));
            };
            let mut members: HashMap<u8, usize> = HashMap::new();
            for player in room.players.values().filter(|p| !p.disconnected) {
                if let Some(team_id) = player.team_id {
                    *members.entry(team_id).or_default() += 1;
                }
            }
            let undermanned = (1..=team_count)
                .any(|team_id| members.get(&team_id).copied().unwrap_or(0) < MIN_TEAM_MEMBERS);
            if undermanned {
                return Err(ServiceError::InvalidState(format!(
                    "Each team needs at least {MIN_TEAM_MEMBERS} players to start"
                )));
            }
        }

        // Claim the run before awaiting the repository so a second start
        // observes `InProgress` and bails.
        room.reset_for_run();
        room.status = RoomStatus::InProgress;
        room.game_id
    };

    let loaded = load_questions(state, game_id).await;

    // The room may have been ended or torn down while we were fetching.
    let Some(handle) = state.rooms().get(&code) else {
        warn!(code, "room disappeared while loading questions");
        return Err(ServiceError::NotFound(
            "Room no longer exists".to_string(),
        ));
    };
    let mut room = handle.room().lock().await;
    if room.status != RoomStatus::InProgress {
        warn!(code, status = ?room.status, "run was ended while loading questions");
        return Err(ServiceError::InvalidState(
            "Game is no longer starting".to_string(),
        ));
    }

    let questions = match loaded {
        Ok(questions) => questions,
        Err(err) => {
            room.status = RoomStatus::Waiting;
            return Err(err);
        }
    };

    room.questions = questions;
    room.cancel_pending_timer();

    let countdown_seconds = state.config().countdown_seconds();
    let countdown = std::time::Duration::from_secs(countdown_seconds);
    room.pending_timer = Some(flow::schedule_first_question(
        state.clone(),
        code.clone(),
        countdown,
    ));

    info!(
        code,
        question_count = room.questions.len(),
        countdown_seconds,
        "game starting"
    );
    drop(room);

    handle.broadcast(RoomBroadcast::GameStarting {
        game_code: code,
        countdown: countdown_seconds,
    });

    Ok(())
}

/// Fetch and materialize this run's question sequence.
async fn load_questions(
    state: &SharedState,
    game_id: uuid::Uuid,
) -> Result<Vec<crate::state::room::Question>, ServiceError> {
    let game = state
        .repository()
        .find_game(game_id)
        .await?
        .ok_or_else(|| ServiceError::NotFound("Game definition missing".to_string()))?;

    let records = state
        .repository()
        .random_questions(game.question_count)
        .await?;
    if records.is_empty() {
        return Err(ServiceError::InvalidState(
            "No questions are available for this game".to_string(),
        ));
    }

    Ok(records.into_iter().map(Into::into).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        config::AppConfig,
        dao::{
            memory::InMemoryRepository,
            models::NewGameSettings,
            repository::GameRepository,
        },
        game::handlers::{JoinGameInput, handle_join_game},
        state::AppState,
    };
    use std::sync::Arc;

    async fn lobby(
        mode: GameMode,
        config: AppConfig,
    ) -> (SharedState, String, Session, Session) {
        let repository = Arc::new(InMemoryRepository::with_default_bank());
        let game = repository
            .create_game(NewGameSettings {
                mode,
                question_count: 3,
                time_per_question: 20,
            })
            .await
            .unwrap();
        let state = AppState::new(repository, config);

        let team = |id: u8| (mode == GameMode::Team).then_some(id);
        let mut host = Session::new();
        handle_join_game(
            &state,
            &mut host,
            JoinGameInput {
                game_code: game.code.clone(),
                username: "ada".into(),
                is_host: true,
                team_id: team(1),
                team_count: (mode == GameMode::Team).then_some(2),
            },
        )
        .await
        .unwrap();
        let mut player = Session::new();
        handle_join_game(
            &state,
            &mut player,
            JoinGameInput {
                game_code: game.code.clone(),
                username: "bob".into(),
                is_host: false,
                team_id: team(1),
                team_count: None,
            },
        )
        .await
        .unwrap();

        (state, game.code, host, player)
    }

    #[tokio::test(start_paused = true)]
    async fn host_start_broadcasts_countdown_then_first_question() {
        let (state, code, host, _player) =
            lobby(GameMode::Classic, AppConfig::with_timings(5, 5, 100)).await;
        let mut events = state.rooms().get(&code).unwrap().subscribe();

        handle_start_game(&state, &host, None).await.unwrap();

        let starting = events.recv().await.unwrap();
        let RoomBroadcast::GameStarting { countdown, .. } = starting else {
            panic!("expected game_starting, got {starting:?}");
        };
        assert_eq!(countdown, 5);

        let question = events.recv().await.unwrap();
        assert!(matches!(
            question,
            RoomBroadcast::Question { question_number: 1, .. }
        ));
    }

    #[tokio::test]
    async fn only_the_host_can_start() {
        let (state, _code, _host, player) =
            lobby(GameMode::Classic, AppConfig::with_timings(5, 5, 100)).await;

        let err = handle_start_game(&state, &player, None).await.unwrap_err();
        assert!(matches!(err, ServiceError::Unauthorized(_)));
    }

    #[tokio::test]
    async fn starting_twice_is_rejected() {
        let (state, _code, host, _player) =
            lobby(GameMode::Classic, AppConfig::with_timings(5, 5, 100)).await;

        handle_start_game(&state, &host, None).await.unwrap();
        let err = handle_start_game(&state, &host, None).await.unwrap_err();
        assert!(matches!(err, ServiceError::InvalidState(_)));
    }

    #[tokio::test]
    async fn a_lone_player_cannot_start() {
        let repository = Arc::new(InMemoryRepository::with_default_bank());
        let game = repository
            .create_game(NewGameSettings {
                mode: GameMode::Classic,
                question_count: 3,
                time_per_question: 20,
            })
            .await
            .unwrap();
        let state = AppState::new(repository, AppConfig::with_timings(5, 5, 100));

        let mut host = Session::new();
        handle_join_game(
            &state,
            &mut host,
            JoinGameInput {
                game_code: game.code.clone(),
                username: "ada".into(),
                is_host: true,
                team_id: None,
                team_count: None,
            },
        )
        .await
        .unwrap();

        let err = handle_start_game(&state, &host, None).await.unwrap_err();
        assert!(matches!(err, ServiceError::InvalidState(_)));
    }

    #[tokio::test]
    async fn every_team_needs_two_members() {
        let (state, code, host, _player) =
            lobby(GameMode::Team, AppConfig::with_timings(5, 5, 100)).await;

        // Both joiners are on team 1; team 2 is empty.
        let err = handle_start_game(&state, &host, Some(code)).await.unwrap_err();
        assert!(matches!(err, ServiceError::InvalidState(_)));
    }
}
