use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

use crate::dao::models::{GameMode, GameRecord, NewGameSettings, QuestionRecord};

/// Payload used to create a brand-new game definition.
#[derive(Debug, Deserialize, ToSchema, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateGameRequest {
    /// Scoring mode for the game.
    pub mode: GameMode,
    /// Number of questions each run draws from the bank.
    #[validate(range(min = 1, max = 50, message = "questionCount must be between 1 and 50"))]
    pub question_count: u32,
    /// Time limit per question, in seconds.
    #[validate(range(min = 5, max = 120, message = "timePerQuestion must be between 5 and 120"))]
    pub time_per_question: u32,
}

impl From<CreateGameRequest> for NewGameSettings {
    fn from(value: CreateGameRequest) -> Self {
        Self {
            mode: value.mode,
            question_count: value.question_count,
            time_per_question: value.time_per_question,
        }
    }
}

/// Summary returned once a game definition has been created.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct GameCreated {
    /// Identifier of the new game.
    pub id: Uuid,
    /// Join code players use to enter the room.
    pub code: String,
    /// Scoring mode.
    pub mode: GameMode,
    /// Questions per run.
    pub question_count: u32,
    /// Time limit per question, in seconds.
    pub time_per_question: u32,
}

impl From<GameRecord> for GameCreated {
    fn from(value: GameRecord) -> Self {
        Self {
            id: value.id,
            code: value.code,
            mode: value.mode,
            question_count: value.question_count,
            time_per_question: value.time_per_question,
        }
    }
}

/// Query parameters for sampling the question bank.
#[derive(Debug, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct RandomQuestionsParams {
    /// How many questions to draw; defaults to 10 when omitted.
    pub count: Option<u32>,
}

/// A question bank row as served to API clients, answer key included.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct QuestionView {
    /// Bank identifier of the question.
    pub id: u32,
    /// Topic the question belongs to.
    pub category: String,
    /// The question text itself.
    pub text: String,
    /// Choice A.
    pub option_a: String,
    /// Choice B.
    pub option_b: String,
    /// Choice C.
    pub option_c: String,
    /// Choice D.
    pub option_d: String,
    /// Letter of the correct choice.
    pub correct_option: String,
    /// Short rationale shown after the round.
    pub explanation: String,
    /// Difficulty rating from 1 (easy) upwards.
    pub difficulty: u8,
}

impl From<QuestionRecord> for QuestionView {
    fn from(value: QuestionRecord) -> Self {
        Self {
            id: value.id,
            category: value.category,
            text: value.text,
            option_a: value.option_a,
            option_b: value.option_b,
            option_c: value.option_c,
            option_d: value.option_d,
            correct_option: value.correct_option,
            explanation: value.explanation,
            difficulty: value.difficulty,
        }
    }
}
