use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    dao::models::GameMode,
    game::leaderboard::{Leaderboard, PlayerSummary},
};

/// Commands accepted from WebSocket clients.
#[derive(Debug, Deserialize, ToSchema)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientCommand {
    /// Join a room by game code, creating the room on first join.
    #[serde(rename_all = "camelCase")]
    JoinGame {
        /// 6-character join code.
        game_code: String,
        /// Display name (1-15 alphanumeric characters).
        username: String,
        /// Whether this connection claims the host seat.
        #[serde(default)]
        is_host: bool,
        /// Team to join (team mode, 1-based).
        #[serde(default)]
        team_id: Option<u8>,
        /// Number of teams; only honored from the first team-mode joiner.
        #[serde(default)]
        team_count: Option<u8>,
    },
    /// Begin a run; host only.
    #[serde(rename_all = "camelCase")]
    StartGame {
        /// Join code; defaults to the session's current room.
        #[serde(default)]
        game_code: Option<String>,
    },
    /// Answer the currently-active question.
    #[serde(rename_all = "camelCase")]
    SubmitAnswer {
        /// Join code; defaults to the session's current room.
        #[serde(default)]
        game_code: Option<String>,
        /// Identifier of the question being answered.
        question_id: u32,
        /// Chosen option letter.
        answer: String,
    },
    /// Reassign a player to another team; host only, lobby only.
    #[serde(rename_all = "camelCase")]
    MovePlayerTeam {
        /// Join code; defaults to the session's current room.
        #[serde(default)]
        game_code: Option<String>,
        /// Display name of the player to move.
        username: String,
        /// 1-based target team id.
        target_team_id: u8,
    },
    /// Anything unrecognized; nacked without closing the connection.
    #[serde(other)]
    Unknown,
}

/// Synchronous acknowledgment returned for every inbound command.
#[derive(Debug, Serialize)]
pub struct CommandAck<T: Serialize> {
    /// Ack event name, e.g. `join_ack`.
    #[serde(rename = "type")]
    pub kind: &'static str,
    /// Whether the command was applied.
    pub ok: bool,
    /// Failure description when `ok` is false.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Success payload, flattened into the envelope.
    #[serde(flatten)]
    pub data: Option<T>,
}

impl<T: Serialize> CommandAck<T> {
    /// Positive acknowledgment carrying a payload.
    pub fn ok(kind: &'static str, data: T) -> Self {
        Self {
            kind,
            ok: true,
            error: None,
            data: Some(data),
        }
    }

    /// Positive acknowledgment without a payload.
    pub fn ok_empty(kind: &'static str) -> Self {
        Self {
            kind,
            ok: true,
            error: None,
            data: None,
        }
    }

    /// Negative acknowledgment; no state was mutated.
    pub fn err(kind: &'static str, error: impl ToString) -> Self {
        Self {
            kind,
            ok: false,
            error: Some(error.to_string()),
            data: None,
        }
    }
}

/// Payload of a successful `join_game` acknowledgment.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct JoinAck {
    /// Identifier of the joined game definition.
    pub game_id: Uuid,
    /// Normalized join code.
    pub game_code: String,
    /// Echo of the accepted username.
    pub username: String,
    /// Whether the connection holds the host seat.
    pub is_host: bool,
    /// Roster snapshot of connected players.
    pub players: Vec<PlayerSummary>,
    /// Connected-player count.
    pub player_count: usize,
    /// Declared team slots (team mode only).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub teams: Option<Vec<TeamSummary>>,
    /// Declared team count (team mode only).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub team_count: Option<u8>,
    /// Scoring mode of the game.
    pub mode: GameMode,
}

/// Payload of a successful `submit_answer` acknowledgment.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SubmitAck {
    /// Total points awarded for this answer.
    pub points_awarded: u32,
    /// Correctness component.
    pub base_points: u32,
    /// Speed component.
    pub speed_bonus: u32,
    /// Server-measured response time in milliseconds.
    pub elapsed_ms: u64,
    /// Whether the answer was correct.
    pub is_correct: bool,
    /// Latency heuristic flag for UI display.
    pub suspicious: bool,
    /// Player's running total after this answer.
    pub total_score: u32,
}

/// Public projection of a team slot.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TeamSummary {
    /// 1-based team identifier.
    pub id: u8,
    /// Display name.
    pub name: String,
}

/// The player whose join triggered a `player_joined` broadcast.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct JoinedPlayer {
    /// Display name of the joiner.
    pub username: String,
    /// Whether the joiner took the host seat.
    pub is_host: bool,
}

/// The four options of a question as broadcast to clients.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct QuestionOptions {
    /// Option labelled A.
    #[serde(rename = "A")]
    pub a: String,
    /// Option labelled B.
    #[serde(rename = "B")]
    pub b: String,
    /// Option labelled C.
    #[serde(rename = "C")]
    pub c: String,
    /// Option labelled D.
    #[serde(rename = "D")]
    pub d: String,
}

/// Events fanned out to every subscriber of a room.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RoomBroadcast {
    /// Roster update after a successful join.
    #[serde(rename_all = "camelCase")]
    PlayerJoined {
        /// Join code of the room.
        game_code: String,
        /// Connected players.
        players: Vec<PlayerSummary>,
        /// Connected-player count.
        player_count: usize,
        /// Who just joined.
        joined: JoinedPlayer,
        /// Declared team slots (team mode only).
        #[serde(skip_serializing_if = "Option::is_none")]
        teams: Option<Vec<TeamSummary>>,
        /// Declared team count (team mode only).
        #[serde(skip_serializing_if = "Option::is_none")]
        team_count: Option<u8>,
        /// Scoring mode of the game.
        mode: GameMode,
    },
    /// Roster update after a disconnect or team move.
    #[serde(rename_all = "camelCase")]
    PlayerList {
        /// Join code of the room.
        game_code: String,
        /// Connected players.
        players: Vec<PlayerSummary>,
        /// Connected-player count.
        player_count: usize,
    },
    /// Countdown notice before the first question of a run.
    #[serde(rename_all = "camelCase")]
    GameStarting {
        /// Join code of the room.
        game_code: String,
        /// Seconds until the first question broadcast.
        countdown: u64,
    },
    /// A question went live.
    #[serde(rename_all = "camelCase")]
    Question {
        /// Bank identifier of the question.
        id: u32,
        /// Question text.
        text: String,
        /// The four options.
        options: QuestionOptions,
        /// 1-based position within the run.
        question_number: usize,
        /// Number of questions in the run.
        total_questions: usize,
        /// Time limit in seconds.
        time_limit: u32,
        /// Authoritative epoch-milliseconds broadcast timestamp; clients
        /// derive their countdown display from this, never their own clock.
        server_start_time: u64,
    },
    /// A round finished, by timeout or early end.
    #[serde(rename_all = "camelCase")]
    QuestionEnded {
        /// Join code of the room.
        game_code: String,
        /// Question that just ended.
        question_id: u32,
        /// Letter of the correct option.
        correct_answer: String,
        /// Explanation to display alongside the answer.
        explanation: String,
        /// Standings after this round.
        leaderboard: Leaderboard,
    },
    /// The run finished.
    #[serde(rename_all = "camelCase")]
    GameEnded {
        /// Join code of the room.
        game_code: String,
        /// Questions actually played this run (may be fewer than configured
        /// when the game was force-ended).
        total_questions: usize,
        /// Final standings.
        final_rankings: Leaderboard,
    },
    /// The host left the lobby; the room is being torn down.
    #[serde(rename_all = "camelCase")]
    HostLeft {
        /// Join code of the dissolved room.
        game_code: String,
    },
}
