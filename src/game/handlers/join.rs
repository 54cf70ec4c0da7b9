//! `join_game`: attach a connection to a room, creating the room on first
//! join.

use tracing::info;

use crate::{
    dao::models::GameMode,
    dto::{
        validation::{normalize_game_code, validate_username},
        ws::{JoinAck, JoinedPlayer, RoomBroadcast, TeamSummary},
    },
    error::ServiceError,
    game::{handlers::Session, leaderboard::build_player_list},
    state::{
        SharedState,
        room::{MAX_ACTIVE_PLAYERS, Player, Room, TEAM_COUNT_RANGE},
    },
};

/// Fields of a `join_game` command.
#[derive(Debug)]
pub struct JoinGameInput {
    /// Join code as sent by the client; normalized before lookup.
    pub game_code: String,
    /// Requested display name.
    pub username: String,
    /// Whether this connection claims the host seat.
    pub is_host: bool,
    /// Requested team (team mode).
    pub team_id: Option<u8>,
    /// Requested number of teams (team mode, first joiner only).
    pub team_count: Option<u8>,
}

/// Join a room, creating it if this is the first connection for the code.
pub async fn handle_join_game(
    state: &SharedState,
    session: &mut Session,
    input: JoinGameInput,
) -> Result<JoinAck, ServiceError> {
    validate_username(&input.username).map_err(|err| {
        ServiceError::InvalidInput(
            err.message
                .map(|m| m.into_owned())
                .unwrap_or_else(|| "Invalid username".to_string()),
        )
    })?;

    let code = normalize_game_code(&input.game_code);
    if code.is_empty() {
        return Err(ServiceError::InvalidInput(
            "Game code is required".to_string(),
        ));
    }

    let game = state
        .repository()
        .find_game_by_code(code.clone())
        .await?
        .ok_or_else(|| ServiceError::NotFound("Invalid game code".to_string()))?;

    let handle = state
        .rooms()
        .get_or_create(&code, || Room::new(&game, code.clone()));

    let (ack, broadcast) = {
        let mut room = handle.room().lock().await;

        let team_id = match room.mode {
            GameMode::Classic => None,
            GameMode::Team => {
                let count = match room.team_count {
                    None => {
                        let requested = input.team_count.ok_or_else(|| {
                            ServiceError::InvalidInput(
                                "Team games require a team count (2-5)".to_string(),
                            )
                        })?;
                        if !TEAM_COUNT_RANGE.contains(&requested) {
                            return Err(ServiceError::InvalidInput(format!(
                                "Team count must be between {} and {}",
                                TEAM_COUNT_RANGE.start(),
                                TEAM_COUNT_RANGE.end()
                            )));
                        }
                        room.declare_teams(requested);
                        requested
                    }
                    Some(fixed) => {
                        if input.team_count.is_some_and(|req| req != fixed) {
                            return Err(ServiceError::InvalidState(format!(
                                "Team count is already set to {fixed}"
                            )));
                        }
                        fixed
                    }
                };

                let team_id = input.team_id.ok_or_else(|| {
                    ServiceError::InvalidInput("Select a team to join".to_string())
                })?;
                if team_id < 1 || team_id > count {
                    return Err(ServiceError::InvalidInput(format!(
                        "teamId must be between 1 and {count}"
                    )));
                }
                Some(team_id)
            }
        };

        if room.active_player_count() >= MAX_ACTIVE_PLAYERS {
            return Err(ServiceError::InvalidState(format!(
                "Game room is full (max {MAX_ACTIVE_PLAYERS} players)"
            )));
        }

        room.players.insert(
            session.connection_id,
            Player::new(input.username.clone(), input.is_host, team_id),
        );
        if input.is_host {
            room.host_connection = Some(session.connection_id);
        }

        let players = build_player_list(&room);
        let player_count = players.len();
        let teams = (room.mode == GameMode::Team).then(|| {
            room.teams
                .iter()
                .map(|team| TeamSummary {
                    id: team.id,
                    name: team.name.clone(),
                })
                .collect::<Vec<_>>()
        });

        info!(
            code,
            username = %input.username,
            is_host = input.is_host,
            ?team_id,
            player_count,
            "player joined room"
        );

        let ack = JoinAck {
            game_id: room.game_id,
            game_code: code.clone(),
            username: input.username.clone(),
            is_host: input.is_host,
            players: players.clone(),
            player_count,
            teams: teams.clone(),
            team_count: room.team_count,
            mode: room.mode,
        };
        let broadcast = RoomBroadcast::PlayerJoined {
            game_code: code.clone(),
            players,
            player_count,
            joined: JoinedPlayer {
                username: input.username.clone(),
                is_host: input.is_host,
            },
            teams,
            team_count: room.team_count,
            mode: room.mode,
        };
        (ack, broadcast)
    };

    handle.broadcast(broadcast);

    session.game_code = Some(code);
    session.username = Some(input.username);
    session.is_host = input.is_host;

    Ok(ack)
}
