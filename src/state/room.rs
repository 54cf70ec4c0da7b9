use std::{
    collections::HashMap,
    time::{SystemTime, UNIX_EPOCH},
};

use indexmap::IndexMap;
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::dao::models::{GameMode, GameRecord, QuestionRecord};

/// Hard cap on simultaneously-active players per room.
pub const MAX_ACTIVE_PLAYERS: usize = 10;
/// Bounds on the number of teams a team-mode room may declare.
pub const TEAM_COUNT_RANGE: std::ops::RangeInclusive<u8> = 2..=5;

/// Current milliseconds since the Unix epoch, the server-side clock for
/// question timing. Client-reported timestamps are never trusted.
pub fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_millis() as u64)
        .unwrap_or(0)
}

/// Lifecycle of a room across game runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoomStatus {
    /// Lobby: players joining, no run active.
    Waiting,
    /// A run is active (countdown, questions, or inter-round pauses).
    InProgress,
    /// The last run finished; a new start resets back through `InProgress`.
    Completed,
}

/// A fixed team slot declared at the first team-mode join.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Team {
    /// 1-based team identifier referenced by `Player::team_id`.
    pub id: u8,
    /// Display name ("Team 1"..).
    pub name: String,
}

/// Runtime representation of a question within the current run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Question {
    /// Bank identifier, echoed in broadcasts and answer submissions.
    pub id: u32,
    /// The question text shown to players.
    pub text: String,
    /// Option labelled A.
    pub option_a: String,
    /// Option labelled B.
    pub option_b: String,
    /// Option labelled C.
    pub option_c: String,
    /// Option labelled D.
    pub option_d: String,
    /// Letter of the correct option.
    pub correct_option: String,
    /// Shown to players once the question ends.
    pub explanation: String,
}

impl From<QuestionRecord> for Question {
    fn from(value: QuestionRecord) -> Self {
        Self {
            id: value.id,
            text: value.text,
            option_a: value.option_a,
            option_b: value.option_b,
            option_c: value.option_c,
            option_d: value.option_d,
            correct_option: value.correct_option,
            explanation: value.explanation,
        }
    }
}

/// One player's scored answer to one question. Immutable once written:
/// a second submission for the same question is rejected, not overwritten.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnswerRecord {
    /// Raw option letter the player chose.
    pub chosen_option: String,
    /// Whether the normalized choice matched the correct option.
    pub is_correct: bool,
    /// Total points awarded (base + speed bonus).
    pub points_awarded: u32,
    /// Correctness component of the score.
    pub base_points: u32,
    /// Speed component of the score.
    pub speed_bonus: u32,
    /// Server-measured response time, clamped to the question window.
    pub elapsed_ms: u64,
    /// Latency heuristic flag; display-only, never affects scoring.
    pub suspicious: bool,
}

/// Player info tracked for the lifetime of a room.
///
/// Players are keyed by connection id, not username: a username does not
/// uniquely persist across reconnects. Disconnected players are marked, never
/// removed, so their final-leaderboard rows survive.
#[derive(Debug, Clone)]
pub struct Player {
    /// Display name (1-15 alphanumeric characters).
    pub username: String,
    /// Whether this connection created the room as host.
    pub is_host: bool,
    /// Assigned team, only meaningful in team mode.
    pub team_id: Option<u8>,
    /// Running sum of awarded points for the current run.
    pub total_score: u32,
    /// At most one scored answer per question id.
    pub answers: HashMap<u32, AnswerRecord>,
    /// Epoch milliseconds at join time.
    pub join_time_ms: u64,
    /// Set on disconnect; the player row is retained for history.
    pub disconnected: bool,
}

impl Player {
    /// Build a fresh player entry joining right now.
    pub fn new(username: String, is_host: bool, team_id: Option<u8>) -> Self {
        Self {
            username,
            is_host,
            team_id,
            total_score: 0,
            answers: HashMap::new(),
            join_time_ms: now_ms(),
            disconnected: false,
        }
    }
}

/// In-memory state for one game code's lifetime.
#[derive(Debug)]
pub struct Room {
    /// Identifier of the externally-persisted game definition.
    pub game_id: Uuid,
    /// Join code this room is registered under.
    pub code: String,
    /// Scoring mode inherited from the game definition.
    pub mode: GameMode,
    /// Lifecycle status; transitions are monotonic within a run.
    pub status: RoomStatus,
    /// Seconds allowed per question.
    pub time_per_question: u32,
    /// Question sequence for the current run; reloaded fresh on every start.
    pub questions: Vec<Question>,
    /// 0-based cursor into `questions`.
    pub current_question_index: usize,
    /// True between a question broadcast and its end-of-round.
    pub current_question_active: bool,
    /// Server clock snapshot at broadcast time; the single source of truth
    /// for elapsed-time computation.
    pub current_question_start_ms: Option<u64>,
    /// Cancellable handle for the pending autonomous transition (deadline
    /// timer, inter-round pause, or start countdown).
    pub pending_timer: Option<JoinHandle<()>>,
    /// Answers received per question id this run, active players only.
    pub answers_received: HashMap<u32, usize>,
    /// Connection currently recognized as host; cleared when the host drops.
    pub host_connection: Option<Uuid>,
    /// Players keyed by connection id, in join order.
    pub players: IndexMap<Uuid, Player>,
    /// Number of teams, fixed by the first team-mode joiner.
    pub team_count: Option<u8>,
    /// Team slots; fixed once set, never resized afterward.
    pub teams: Vec<Team>,
}

impl Room {
    /// Create a lobby for a known game definition.
    pub fn new(game: &GameRecord, code: String) -> Self {
        Self {
            game_id: game.id,
            code,
            mode: game.mode,
            status: RoomStatus::Waiting,
            time_per_question: game.time_per_question,
            questions: Vec::new(),
            current_question_index: 0,
            current_question_active: false,
            current_question_start_ms: None,
            pending_timer: None,
            answers_received: HashMap::new(),
            host_connection: None,
            players: IndexMap::new(),
            team_count: None,
            teams: Vec::new(),
        }
    }

    /// Number of players not marked disconnected.
    pub fn active_player_count(&self) -> usize {
        self.players.values().filter(|p| !p.disconnected).count()
    }

    /// Question currently at the cursor, if the run still has one.
    pub fn current_question(&self) -> Option<&Question> {
        self.questions.get(self.current_question_index)
    }

    /// Abort whichever autonomous transition is pending, if any.
    ///
    /// Every transition that supersedes a scheduled one must call this so a
    /// stale timer can never fire twice. The deadline task itself calls this
    /// while ending its own round; aborting the current task would kill that
    /// transition at its next suspension point, so the own handle is only
    /// dropped, never aborted.
    pub fn cancel_pending_timer(&mut self) {
        if let Some(handle) = self.pending_timer.take()
            && tokio::task::try_id() != Some(handle.id())
        {
            handle.abort();
        }
    }

    /// Reset per-run state so the same roster can play again.
    pub fn reset_for_run(&mut self) {
        self.cancel_pending_timer();
        self.current_question_index = 0;
        self.current_question_active = false;
        self.current_question_start_ms = None;
        self.answers_received.clear();
        self.questions.clear();
        for player in self.players.values_mut() {
            player.total_score = 0;
            player.answers.clear();
            player.disconnected = false;
        }
    }

    /// Declare the fixed team slots for a team-mode room.
    pub fn declare_teams(&mut self, count: u8) {
        self.team_count = Some(count);
        self.teams = (1..=count)
            .map(|id| Team {
                id,
                name: format!("Team {id}"),
            })
            .collect();
    }

    /// Display name for a team id, if declared.
    pub fn team_name(&self, team_id: u8) -> Option<&str> {
        self.teams
            .iter()
            .find(|team| team.id == team_id)
            .map(|team| team.name.as_str())
    }
}
