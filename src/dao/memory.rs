//! In-memory repository backend with a seeded question bank.
//!
//! Durable persistence is a non-goal for gameplay: answer and participant
//! history is best-effort, so an in-process store keyed the same way as the
//! original tables is sufficient to back the repository seam.

use std::{
    sync::{Arc, Mutex},
    time::SystemTime,
};

use dashmap::DashMap;
use futures::future::BoxFuture;
use rand::{Rng, seq::SliceRandom};
use uuid::Uuid;

use crate::dao::{
    models::{AnswerRow, GameRecord, NewGameSettings, ParticipantRow, QuestionRecord},
    repository::{GameRepository, RepositoryError, RepositoryResult},
};

/// Join-code alphabet avoiding easily-confused characters (no I/O/0/1).
const CODE_ALPHABET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";
/// Length of generated join codes.
const CODE_LENGTH: usize = 6;
/// Attempts before giving up on finding an unused code.
const CODE_ALLOCATION_ATTEMPTS: usize = 64;

/// Repository backend holding every table in process memory.
#[derive(Clone)]
pub struct InMemoryRepository {
    inner: Arc<Inner>,
}

struct Inner {
    games: DashMap<Uuid, GameRecord>,
    codes: DashMap<String, Uuid>,
    bank: Vec<QuestionRecord>,
    answers: Mutex<Vec<AnswerRow>>,
    participants: Mutex<Vec<ParticipantRow>>,
}

impl InMemoryRepository {
    /// Build a repository around an explicit question bank.
    pub fn new(bank: Vec<QuestionRecord>) -> Self {
        Self {
            inner: Arc::new(Inner {
                games: DashMap::new(),
                codes: DashMap::new(),
                bank,
                answers: Mutex::new(Vec::new()),
                participants: Mutex::new(Vec::new()),
            }),
        }
    }

    /// Build a repository seeded with the built-in general-knowledge bank.
    pub fn with_default_bank() -> Self {
        Self::new(default_question_bank())
    }

    /// Number of answer rows recorded so far (used by tests and health logs).
    pub fn recorded_answers(&self) -> usize {
        self.inner.answers.lock().map(|rows| rows.len()).unwrap_or(0)
    }

    /// Number of participant rows recorded so far.
    pub fn recorded_participants(&self) -> usize {
        self.inner
            .participants
            .lock()
            .map(|rows| rows.len())
            .unwrap_or(0)
    }
}

impl GameRepository for InMemoryRepository {
    fn create_game(
        &self,
        settings: NewGameSettings,
    ) -> BoxFuture<'static, RepositoryResult<GameRecord>> {
        let inner = self.inner.clone();
        Box::pin(async move {
            let code = allocate_code(&inner)?;
            let record = GameRecord {
                id: Uuid::new_v4(),
                code: code.clone(),
                mode: settings.mode,
                question_count: settings.question_count,
                time_per_question: settings.time_per_question,
                created_at: SystemTime::now(),
            };
            inner.codes.insert(code, record.id);
            inner.games.insert(record.id, record.clone());
            Ok(record)
        })
    }

    fn find_game_by_code(
        &self,
        code: String,
    ) -> BoxFuture<'static, RepositoryResult<Option<GameRecord>>> {
        let inner = self.inner.clone();
        Box::pin(async move {
            let record = inner
                .codes
                .get(&code)
                .and_then(|id| inner.games.get(&id).map(|entry| entry.clone()));
            Ok(record)
        })
    }

    fn find_game(&self, id: Uuid) -> BoxFuture<'static, RepositoryResult<Option<GameRecord>>> {
        let inner = self.inner.clone();
        Box::pin(async move { Ok(inner.games.get(&id).map(|entry| entry.clone())) })
    }

    fn random_questions(
        &self,
        count: u32,
    ) -> BoxFuture<'static, RepositoryResult<Vec<QuestionRecord>>> {
        let inner = self.inner.clone();
        Box::pin(async move {
            let mut drawn = inner.bank.clone();
            drawn.shuffle(&mut rand::rng());
            drawn.truncate(count as usize);
            Ok(drawn)
        })
    }

    fn record_answer(&self, row: AnswerRow) -> BoxFuture<'static, RepositoryResult<()>> {
        let inner = self.inner.clone();
        Box::pin(async move {
            if let Ok(mut rows) = inner.answers.lock() {
                rows.push(row);
            }
            Ok(())
        })
    }

    fn record_participants(
        &self,
        _game_id: Uuid,
        rows: Vec<ParticipantRow>,
    ) -> BoxFuture<'static, RepositoryResult<()>> {
        let inner = self.inner.clone();
        Box::pin(async move {
            if let Ok(mut table) = inner.participants.lock() {
                table.extend(rows);
            }
            Ok(())
        })
    }

    fn health_check(&self) -> BoxFuture<'static, RepositoryResult<()>> {
        Box::pin(async { Ok(()) })
    }
}

/// Draw random codes until one is unused.
fn allocate_code(inner: &Inner) -> RepositoryResult<String> {
    let mut rng = rand::rng();
    for _ in 0..CODE_ALLOCATION_ATTEMPTS {
        let code: String = (0..CODE_LENGTH)
            .map(|_| CODE_ALPHABET[rng.random_range(0..CODE_ALPHABET.len())] as char)
            .collect();
        if !inner.codes.contains_key(&code) {
            return Ok(code);
        }
    }
    Err(RepositoryError::CodeAllocation)
}

/// Built-in question bank used when no external bank is wired in.
fn default_question_bank() -> Vec<QuestionRecord> {
    let seed: [(&str, &str, [&str; 4], &str, &str, u8); 12] = [
        (
            "Geography",
            "Which is the largest ocean on Earth?",
            ["Atlantic", "Pacific", "Indian", "Arctic"],
            "B",
            "The Pacific covers about a third of the planet's surface.",
            1,
        ),
        (
            "Science",
            "What gas do plants primarily absorb for photosynthesis?",
            ["Oxygen", "Nitrogen", "Carbon dioxide", "Hydrogen"],
            "C",
            "Plants fix carbon from CO2 into sugars.",
            1,
        ),
        (
            "History",
            "In which year did the Berlin Wall fall?",
            ["1987", "1989", "1991", "1993"],
            "B",
            "The wall was opened on 9 November 1989.",
            2,
        ),
        (
            "Geography",
            "What is the capital of Australia?",
            ["Sydney", "Melbourne", "Canberra", "Perth"],
            "C",
            "Canberra was purpose-built as the capital in 1913.",
            2,
        ),
        (
            "Science",
            "Which planet has the most moons confirmed to date?",
            ["Jupiter", "Saturn", "Uranus", "Neptune"],
            "B",
            "Saturn overtook Jupiter with over 140 confirmed moons.",
            3,
        ),
        (
            "Arts",
            "Who painted 'The Starry Night'?",
            ["Claude Monet", "Vincent van Gogh", "Pablo Picasso", "Salvador Dali"],
            "B",
            "Van Gogh painted it in 1889 from his asylum room.",
            1,
        ),
        (
            "Sports",
            "How many players does a volleyball team field at once?",
            ["5", "6", "7", "11"],
            "B",
            "Six on court, typically three front row and three back row.",
            1,
        ),
        (
            "Technology",
            "What does 'HTTP' stand for?",
            [
                "HyperText Transfer Protocol",
                "High Throughput Transport Protocol",
                "Hyperlink Text Transmission Process",
                "Host Transfer Text Protocol",
            ],
            "A",
            "The protocol underpinning the web since 1991.",
            1,
        ),
        (
            "History",
            "Which civilization built Machu Picchu?",
            ["Aztec", "Maya", "Inca", "Olmec"],
            "C",
            "The Inca built it in the 15th century in the Andes.",
            2,
        ),
        (
            "Science",
            "What is the chemical symbol for gold?",
            ["Go", "Gd", "Au", "Ag"],
            "C",
            "From the Latin 'aurum'.",
            1,
        ),
        (
            "Geography",
            "Which river is the longest in the world by most measurements?",
            ["Amazon", "Nile", "Yangtze", "Mississippi"],
            "B",
            "The Nile at roughly 6,650 km, though the Amazon is disputed.",
            3,
        ),
        (
            "Arts",
            "Which instrument has 47 strings and 7 pedals?",
            ["Harp", "Grand piano", "Sitar", "Cello"],
            "A",
            "The concert harp uses pedals to re-tune strings by semitones.",
            4,
        ),
    ];

    seed.into_iter()
        .enumerate()
        .map(
            |(index, (category, text, options, correct, explanation, difficulty))| QuestionRecord {
                id: index as u32 + 1,
                category: category.to_string(),
                text: text.to_string(),
                option_a: options[0].to_string(),
                option_b: options[1].to_string(),
                option_c: options[2].to_string(),
                option_d: options[3].to_string(),
                correct_option: correct.to_string(),
                explanation: explanation.to_string(),
                difficulty,
            },
        )
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dao::models::GameMode;

    #[tokio::test]
    async fn created_game_is_found_by_code() {
        let repo = InMemoryRepository::with_default_bank();
        let record = repo
            .create_game(NewGameSettings {
                mode: GameMode::Classic,
                question_count: 5,
                time_per_question: 20,
            })
            .await
            .unwrap();

        assert_eq!(record.code.len(), CODE_LENGTH);
        assert!(
            record
                .code
                .bytes()
                .all(|b| CODE_ALPHABET.contains(&b))
        );

        let found = repo.find_game_by_code(record.code.clone()).await.unwrap();
        assert_eq!(found, Some(record));
    }

    #[tokio::test]
    async fn unknown_code_resolves_to_none() {
        let repo = InMemoryRepository::with_default_bank();
        let found = repo.find_game_by_code("ZZZZZZ".into()).await.unwrap();
        assert!(found.is_none());
    }

    #[tokio::test]
    async fn random_questions_respects_count_and_bank_size() {
        let repo = InMemoryRepository::with_default_bank();

        let five = repo.random_questions(5).await.unwrap();
        assert_eq!(five.len(), 5);

        // Asking for more than the bank holds returns the whole bank.
        let all = repo.random_questions(500).await.unwrap();
        assert_eq!(all.len(), default_question_bank().len());
    }

    #[tokio::test]
    async fn history_rows_accumulate() {
        let repo = InMemoryRepository::with_default_bank();
        let game_id = Uuid::new_v4();

        repo.record_answer(AnswerRow {
            game_id,
            username: "ada".into(),
            question_id: 1,
            chosen_option: "A".into(),
            is_correct: true,
            response_time_ms: 1234,
            created_at: SystemTime::now(),
        })
        .await
        .unwrap();

        repo.record_participants(
            game_id,
            vec![ParticipantRow {
                username: "ada".into(),
                join_time_ms: 0,
                final_score: 150,
            }],
        )
        .await
        .unwrap();

        assert_eq!(repo.recorded_answers(), 1);
        assert_eq!(repo.recorded_participants(), 1);
    }
}
