//! Connection teardown: mark the player, dissolve lobbies the host abandons,
//! and force-end runs that drop below two active players.

use tracing::info;

use crate::{
    dto::ws::RoomBroadcast,
    game::{flow, handlers::Session, leaderboard::build_player_list},
    state::{SharedState, room::RoomStatus},
};

/// What a disconnect resolved to, decided under the room lock.
enum DisconnectOutcome {
    /// Roster update only.
    RosterChanged,
    /// Host left the lobby: broadcast and drop the room.
    TeardownLobby,
    /// Too few active players remain mid-run.
    ForceEndGame,
}

/// Handle a closed connection. Idempotent: a second call for the same
/// connection is a no-op, so transport-level double closes are harmless.
pub async fn handle_disconnect(state: &SharedState, session: &Session) {
    let Some(code) = session.game_code.clone() else {
        return;
    };
    let Some(handle) = state.rooms().get(&code) else {
        return;
    };

    let outcome = {
        let mut room = handle.room().lock().await;

        let Some(player) = room.players.get_mut(&session.connection_id) else {
            return;
        };
        if player.disconnected {
            return;
        }
        player.disconnected = true;
        let username = player.username.clone();

        let was_host = room.host_connection == Some(session.connection_id);
        if was_host {
            room.host_connection = None;
        }

        let active = room.active_player_count();
        info!(code, username = %username, was_host, active, "player disconnected");

        if was_host && room.status == RoomStatus::Waiting {
            room.cancel_pending_timer();
            DisconnectOutcome::TeardownLobby
        } else if room.status == RoomStatus::InProgress && active < 2 {
            DisconnectOutcome::ForceEndGame
        } else {
            DisconnectOutcome::RosterChanged
        }
    };

    match outcome {
        DisconnectOutcome::TeardownLobby => {
            info!(code, "host left the lobby, dissolving room");
            handle.broadcast(RoomBroadcast::HostLeft {
                game_code: code.clone(),
            });
            state.rooms().remove(&code);
        }
        DisconnectOutcome::RosterChanged => {
            let roster = {
                let room = handle.room().lock().await;
                let players = build_player_list(&room);
                let player_count = players.len();
                RoomBroadcast::PlayerList {
                    game_code: code.clone(),
                    players,
                    player_count,
                }
            };
            handle.broadcast(roster);
        }
        DisconnectOutcome::ForceEndGame => {
            let roster = {
                let room = handle.room().lock().await;
                let players = build_player_list(&room);
                let player_count = players.len();
                RoomBroadcast::PlayerList {
                    game_code: code.clone(),
                    players,
                    player_count,
                }
            };
            handle.broadcast(roster);
            info!(code, "fewer than two active players remain, ending game");
            flow::force_game_end(state, &code).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        config::AppConfig,
        dao::{
            memory::InMemoryRepository,
            models::{GameMode, NewGameSettings},
            repository::GameRepository,
        },
        game::handlers::{JoinGameInput, handle_join_game, handle_start_game},
        state::AppState,
    };
    use std::sync::Arc;

    async fn lobby_of(count: usize) -> (SharedState, String, Vec<Session>) {
        let repository = Arc::new(InMemoryRepository::with_default_bank());
        let game = repository
            .create_game(NewGameSettings {
                mode: GameMode::Classic,
                question_count: 2,
                time_per_question: 20,
            })
            .await
            .unwrap();
        let state = AppState::new(repository, AppConfig::with_timings(0, 5, 100));

        let mut sessions = Vec::new();
        for i in 0..count {
            let mut session = Session::new();
            handle_join_game(
                &state,
                &mut session,
                JoinGameInput {
                    game_code: game.code.clone(),
                    username: format!("p{i}"),
                    is_host: i == 0,
                    team_id: None,
                    team_count: None,
                },
            )
            .await
            .unwrap();
            sessions.push(session);
        }
        (state, game.code, sessions)
    }

    #[tokio::test]
    async fn host_leaving_the_lobby_dissolves_the_room() {
        let (state, code, sessions) = lobby_of(2).await;
        let mut events = state.rooms().get(&code).unwrap().subscribe();

        handle_disconnect(&state, &sessions[0]).await;

        assert!(matches!(
            events.recv().await.unwrap(),
            RoomBroadcast::HostLeft { .. }
        ));
        assert!(state.rooms().get(&code).is_none());
    }

    #[tokio::test]
    async fn a_player_leaving_the_lobby_only_updates_the_roster() {
        let (state, code, sessions) = lobby_of(3).await;
        let mut events = state.rooms().get(&code).unwrap().subscribe();

        handle_disconnect(&state, &sessions[2]).await;

        let roster = events.recv().await.unwrap();
        let RoomBroadcast::PlayerList { player_count, .. } = roster else {
            panic!("expected player_list, got {roster:?}");
        };
        assert_eq!(player_count, 2);
        assert!(state.rooms().get(&code).is_some());
    }

    #[tokio::test]
    async fn disconnect_is_idempotent() {
        let (state, code, sessions) = lobby_of(3).await;
        let mut events = state.rooms().get(&code).unwrap().subscribe();

        handle_disconnect(&state, &sessions[2]).await;
        handle_disconnect(&state, &sessions[2]).await;

        assert!(matches!(
            events.recv().await.unwrap(),
            RoomBroadcast::PlayerList { .. }
        ));
        assert!(events.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn dropping_below_two_active_players_ends_the_run() {
        let (state, code, sessions) = lobby_of(2).await;
        let handle = state.rooms().get(&code).unwrap();
        let mut events = handle.subscribe();

        handle_start_game(&state, &sessions[0], None).await.unwrap();
        loop {
            if matches!(events.recv().await.unwrap(), RoomBroadcast::Question { .. }) {
                break;
            }
        }

        handle_disconnect(&state, &sessions[1]).await;

        // Roster update, then the forced end of the live question and the
        // final rankings scoped to what was actually played.
        assert!(matches!(
            events.recv().await.unwrap(),
            RoomBroadcast::PlayerList { player_count: 1, .. }
        ));
        assert!(matches!(
            events.recv().await.unwrap(),
            RoomBroadcast::QuestionEnded { .. }
        ));
        let RoomBroadcast::GameEnded { total_questions, .. } = events.recv().await.unwrap()
        else {
            panic!("expected game_ended");
        };
        assert_eq!(total_questions, 1);

        let room = handle.room().lock().await;
        assert_eq!(room.status, crate::state::room::RoomStatus::Completed);
    }

    #[tokio::test]
    async fn host_leaving_mid_run_does_not_dissolve_the_room() {
        let (state, code, sessions) = lobby_of(3).await;
        let handle = state.rooms().get(&code).unwrap();

        handle_start_game(&state, &sessions[0], None).await.unwrap();
        handle_disconnect(&state, &sessions[0]).await;

        assert!(state.rooms().get(&code).is_some());
        let room = handle.room().lock().await;
        assert_eq!(room.host_connection, None);
        assert_eq!(room.active_player_count(), 2);
    }
}
