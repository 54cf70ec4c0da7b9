//! `move_player_team`: host rebalances the lobby before a run starts.

use tracing::info;

use crate::{
    dao::models::GameMode,
    dto::ws::RoomBroadcast,
    error::ServiceError,
    game::{handlers::Session, leaderboard::build_player_list},
    state::{SharedState, room::RoomStatus},
};

/// Reassign a player to another declared team; host only, lobby only.
pub async fn handle_move_player_team(
    state: &SharedState,
    session: &Session,
    game_code: Option<String>,
    username: String,
    target_team_id: u8,
) -> Result<(), ServiceError> {
    let code = super::resolve_code(game_code, session)?;
    let handle = state
        .rooms()
        .get(&code)
        .ok_or_else(|| ServiceError::NotFound("No room for this game code".to_string()))?;

    let broadcast = {
        let mut room = handle.room().lock().await;

        if room.host_connection != Some(session.connection_id) {
            return Err(ServiceError::Unauthorized(
                "Only the host can move players between teams".to_string(),
            ));
        }
        if room.mode != GameMode::Team {
            return Err(ServiceError::InvalidState(
                "Team reassignment is only available in team mode".to_string(),
            ));
        }
        if room.status != RoomStatus::Waiting {
            return Err(ServiceError::InvalidState(
                "Players cannot change teams after the game has started".to_string(),
            ));
        }
        let team_count = room.team_count.ok_or_else(|| {
            ServiceError::InvalidState("Team count has not been set for this game".to_string())
        })?;
        if target_team_id < 1 || target_team_id > team_count {
            return Err(ServiceError::InvalidInput(format!(
                "targetTeamId must be between 1 and {team_count}"
            )));
        }

        let player = room
            .players
            .values_mut()
            .find(|player| player.username == username)
            .ok_or_else(|| {
                ServiceError::NotFound("Player not found in this lobby".to_string())
            })?;
        player.team_id = Some(target_team_id);

        info!(code, username = %username, target_team_id, "player moved to another team");

        let players = build_player_list(&room);
        let player_count = players.len();
        RoomBroadcast::PlayerList {
            game_code: room.code.clone(),
            players,
            player_count,
        }
    };

    handle.broadcast(broadcast);
    Ok(())
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

    async fn team_lobby() -> (SharedState, String, Session, Session) {
        let repository = Arc::new(InMemoryRepository::with_default_bank());
        let game = repository
            .create_game(NewGameSettings {
                mode: GameMode::Team,
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
                team_id: Some(1),
                team_count: Some(2),
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
                team_id: Some(1),
                team_count: None,
            },
        )
        .await
        .unwrap();

        (state, game.code, host, player)
    }

    #[tokio::test]
    async fn host_moves_a_player_and_the_roster_is_rebroadcast() {
        let (state, code, host, _player) = team_lobby().await;
        let handle = state.rooms().get(&code).unwrap();
        let mut events = handle.subscribe();

        handle_move_player_team(&state, &host, None, "bob".into(), 2)
            .await
            .unwrap();

        let room = handle.room().lock().await;
        let bob = room.players.values().find(|p| p.username == "bob").unwrap();
        assert_eq!(bob.team_id, Some(2));
        drop(room);

        let roster = events.recv().await.unwrap();
        let RoomBroadcast::PlayerList { players, .. } = roster else {
            panic!("expected player_list, got {roster:?}");
        };
        let bob = players.iter().find(|p| p.username == "bob").unwrap();
        assert_eq!(bob.team_id, Some(2));
        assert_eq!(bob.team_name.as_deref(), Some("Team 2"));
    }

    #[tokio::test]
    async fn non_hosts_cannot_move_players() {
        let (state, _code, _host, player) = team_lobby().await;

        let err = handle_move_player_team(&state, &player, None, "ada".into(), 2)
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Unauthorized(_)));
    }

    #[tokio::test]
    async fn the_target_team_must_be_declared() {
        let (state, _code, host, _player) = team_lobby().await;

        let err = handle_move_player_team(&state, &host, None, "bob".into(), 3)
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn players_stay_on_their_team_once_the_game_has_started() {
        let (state, code, host, _player) = team_lobby().await;
        let handle = state.rooms().get(&code).unwrap();
        handle.room().lock().await.status = RoomStatus::InProgress;

        let err = handle_move_player_team(&state, &host, None, "bob".into(), 2)
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::InvalidState(_)));

        let room = handle.room().lock().await;
        let bob = room.players.values().find(|p| p.username == "bob").unwrap();
        assert_eq!(bob.team_id, Some(1));
    }

    #[tokio::test]
    async fn unknown_players_are_reported() {
        let (state, _code, host, _player) = team_lobby().await;

        let err = handle_move_player_team(&state, &host, None, "cyd".into(), 2)
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::NotFound(_)));
    }
}
