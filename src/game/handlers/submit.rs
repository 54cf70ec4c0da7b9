//! `submit_answer`: score an answer against the active question.

use tracing::{error, info, warn};

use crate::{
    dao::models::AnswerRow,
    dto::ws::SubmitAck,
    error::ServiceError,
    game::{flow, handlers::Session, scoring::compute_score},
    state::{
        SharedState,
        room::{AnswerRecord, RoomStatus, now_ms},
    },
};

/// Score and record one answer; at most one per player per question.
///
/// Elapsed time is measured from the room's broadcast timestamp, never from
/// anything the client reports. When the last active player answers, the
/// round is ended early on a spawned task so the ack is not held up.
pub async fn handle_submit_answer(
    state: &SharedState,
    session: &Session,
    game_code: Option<String>,
    question_id: u32,
    answer: String,
) -> Result<SubmitAck, ServiceError> {
    let code = super::resolve_code(game_code, session)?;
    let handle = state
        .rooms()
        .get(&code)
        .ok_or_else(|| ServiceError::InvalidState("Game is not active".to_string()))?;

    let (ack, row, all_answered) = {
        let mut room = handle.room().lock().await;

        if room.status != RoomStatus::InProgress {
            return Err(ServiceError::InvalidState(
                "Game is not active".to_string(),
            ));
        }
        let question = room
            .current_question()
            .filter(|q| room.current_question_active && q.id == question_id)
            .cloned()
            .ok_or_else(|| {
                ServiceError::InvalidState("Question is not currently active".to_string())
            })?;
        let Some(start_ms) = room.current_question_start_ms else {
            error!(code, question_id, "active question has no start timestamp");
            return Err(ServiceError::Internal);
        };

        let game_id = room.game_id;
        let time_limit = room.time_per_question;
        let player = room
            .players
            .get_mut(&session.connection_id)
            .ok_or_else(|| {
                ServiceError::NotFound("Player is not registered in this game room".to_string())
            })?;
        if player.answers.contains_key(&question_id) {
            return Err(ServiceError::InvalidState(
                "Answer already submitted for this question".to_string(),
            ));
        }

        let score = compute_score(
            &answer,
            &question.correct_option,
            time_limit,
            start_ms,
            now_ms(),
        );
        if score.suspicious {
            warn!(
                code,
                question_id,
                username = %player.username,
                elapsed_ms = score.elapsed_ms,
                "suspiciously fast answer"
            );
        }

        player.answers.insert(
            question_id,
            AnswerRecord {
                chosen_option: answer.clone(),
                is_correct: score.is_correct,
                points_awarded: score.points_awarded,
                base_points: score.base_points,
                speed_bonus: score.speed_bonus,
                elapsed_ms: score.elapsed_ms,
                suspicious: score.suspicious,
            },
        );
        player.total_score += score.points_awarded;

        let username = player.username.clone();
        let total_score = player.total_score;

        let received = room.answers_received.entry(question_id).or_insert(0);
        *received += 1;
        let received = *received;
        let active = room.active_player_count();
        let all_answered = active > 0 && received >= active;

        info!(
            code,
            question_id,
            username = %username,
            is_correct = score.is_correct,
            points = score.points_awarded,
            received,
            active,
            "answer recorded"
        );

        let ack = SubmitAck {
            points_awarded: score.points_awarded,
            base_points: score.base_points,
            speed_bonus: score.speed_bonus,
            elapsed_ms: score.elapsed_ms,
            is_correct: score.is_correct,
            suspicious: score.suspicious,
            total_score,
        };
        let row = AnswerRow {
            game_id,
            username,
            question_id,
            chosen_option: answer,
            is_correct: score.is_correct,
            response_time_ms: score.elapsed_ms,
            created_at: std::time::SystemTime::now(),
        };
        (ack, row, all_answered)
    };

    // Answer history is best-effort; a storage failure never voids the score.
    let repository = state.repository().clone();
    let log_code = code.clone();
    tokio::spawn(async move {
        if let Err(err) = repository.record_answer(row).await {
            error!(code = %log_code, error = %err, "failed to persist answer");
        }
    });

    if all_answered {
        // End on a separate task so the submitter's ack goes out first.
        let state = state.clone();
        tokio::spawn(async move {
            flow::end_question(state, code, false).await;
        });
    }

    Ok(ack)
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
        dto::ws::RoomBroadcast,
        game::handlers::{JoinGameInput, handle_join_game, handle_start_game},
        state::AppState,
    };
    use std::sync::Arc;

    /// Join two players, start the game, and wait for the first question.
    async fn running_game() -> (
        SharedState,
        String,
        Session,
        Session,
        u32,
        Arc<InMemoryRepository>,
    ) {
        let repository = Arc::new(InMemoryRepository::with_default_bank());
        let game = repository
            .create_game(NewGameSettings {
                mode: GameMode::Classic,
                question_count: 2,
                time_per_question: 20,
            })
            .await
            .unwrap();
        let state = AppState::new(repository.clone(), AppConfig::with_timings(0, 5, 100));

        let mut host = Session::new();
        let mut player = Session::new();
        for (session, name, is_host) in
            [(&mut host, "ada", true), (&mut player, "bob", false)]
        {
            handle_join_game(
                &state,
                session,
                JoinGameInput {
                    game_code: game.code.clone(),
                    username: name.into(),
                    is_host,
                    team_id: None,
                    team_count: None,
                },
            )
            .await
            .unwrap();
        }

        let mut events = state.rooms().get(&game.code).unwrap().subscribe();
        handle_start_game(&state, &host, None).await.unwrap();

        let question_id = loop {
            match events.recv().await.unwrap() {
                RoomBroadcast::Question { id, .. } => break id,
                _ => continue,
            }
        };

        (state, game.code, host, player, question_id, repository)
    }

    #[tokio::test(start_paused = true)]
    async fn a_correct_answer_scores_and_acks() {
        let (state, code, _host, player, question_id, _repo) = running_game().await;

        let handle = state.rooms().get(&code).unwrap();
        let correct_option = {
            let room = handle.room().lock().await;
            room.current_question().unwrap().correct_option.clone()
        };

        let ack = handle_submit_answer(&state, &player, None, question_id, correct_option)
            .await
            .unwrap();

        assert!(ack.is_correct);
        assert_eq!(ack.base_points, 100);
        assert_eq!(ack.points_awarded, ack.base_points + ack.speed_bonus);
        assert_eq!(ack.total_score, ack.points_awarded);
    }

    #[tokio::test(start_paused = true)]
    async fn a_second_answer_to_the_same_question_is_rejected() {
        let (state, _code, _host, player, question_id, _repo) = running_game().await;

        handle_submit_answer(&state, &player, None, question_id, "A".into())
            .await
            .unwrap();
        let err = handle_submit_answer(&state, &player, None, question_id, "B".into())
            .await
            .unwrap_err();

        assert!(matches!(err, ServiceError::InvalidState(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn a_stale_question_id_is_rejected() {
        let (state, _code, _host, player, question_id, _repo) = running_game().await;

        let err = handle_submit_answer(&state, &player, None, question_id + 999, "A".into())
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::InvalidState(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn the_last_active_answer_ends_the_round_early() {
        let (state, code, host, player, question_id, _repo) = running_game().await;
        let mut events = state.rooms().get(&code).unwrap().subscribe();

        handle_submit_answer(&state, &host, None, question_id, "A".into())
            .await
            .unwrap();
        handle_submit_answer(&state, &player, None, question_id, "B".into())
            .await
            .unwrap();

        let ended = events.recv().await.unwrap();
        assert!(matches!(
            ended,
            RoomBroadcast::QuestionEnded { question_id: id, .. } if id == question_id
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn answers_are_persisted_for_history() {
        let (state, _code, _host, player, question_id, repository) = running_game().await;

        handle_submit_answer(&state, &player, None, question_id, "C".into())
            .await
            .unwrap();
        // Persistence runs on a spawned task; yield until it lands.
        tokio::task::yield_now().await;
        tokio::task::yield_now().await;

        assert_eq!(repository.recorded_answers(), 1);
    }
}
