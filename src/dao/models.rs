use std::time::SystemTime;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// Whether scores are tallied per player or aggregated per team.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum GameMode {
    /// Every player competes for themselves.
    Classic,
    /// Players are grouped into fixed teams and scores aggregate per team.
    Team,
}

/// Game definition persisted at creation time and looked up by join code.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GameRecord {
    /// Primary key of the game.
    pub id: Uuid,
    /// Human-shareable join code (6 characters, unambiguous alphabet).
    pub code: String,
    /// Scoring mode selected at creation.
    pub mode: GameMode,
    /// Number of questions a run of this game consists of.
    pub question_count: u32,
    /// Time limit per question, in seconds.
    pub time_per_question: u32,
    /// Creation timestamp for auditing/debugging.
    pub created_at: SystemTime,
}

/// Settings supplied when persisting a new game.
#[derive(Debug, Clone)]
pub struct NewGameSettings {
    /// Scoring mode for the game.
    pub mode: GameMode,
    /// Number of questions each run draws from the bank.
    pub question_count: u32,
    /// Time limit per question, in seconds.
    pub time_per_question: u32,
}

/// A multiple-choice question as stored in the question bank.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct QuestionRecord {
    /// Stable identifier within the bank.
    pub id: u32,
    /// Topic bucket (e.g. "Geography").
    pub category: String,
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
    /// Letter of the correct option ("A".."D").
    pub correct_option: String,
    /// Shown to players once the question ends.
    pub explanation: String,
    /// Rough difficulty from 1 (easy) to 5 (hard).
    pub difficulty: u8,
}

/// Per-question answer history row, written best-effort during gameplay.
#[derive(Debug, Clone)]
pub struct AnswerRow {
    /// Game the answer belongs to.
    pub game_id: Uuid,
    /// Display name of the submitting player.
    pub username: String,
    /// Question the answer was for.
    pub question_id: u32,
    /// Raw option letter the player chose.
    pub chosen_option: String,
    /// Whether the answer matched the correct option.
    pub is_correct: bool,
    /// Server-measured response time in milliseconds.
    pub response_time_ms: u64,
    /// Write timestamp.
    pub created_at: SystemTime,
}

/// End-of-game participant row, written best-effort when a run finishes.
#[derive(Debug, Clone)]
pub struct ParticipantRow {
    /// Display name of the participant.
    pub username: String,
    /// Epoch milliseconds at which the participant joined the room.
    pub join_time_ms: u64,
    /// Final score for the finished run.
    pub final_score: u32,
}
