//! Question lifecycle: broadcast, deadline, end-of-round, advance, game end.
//!
//! Rounds advance through exactly three autonomous transitions, all owned
//! here as cancellable spawned tasks stored in the room: the start countdown,
//! the per-question deadline, and the inter-round pause. Everything else is
//! driven by client commands through the handlers.

use std::{collections::HashSet, time::Duration};

use futures::future::BoxFuture;
use tokio::{task::JoinHandle, time::sleep};
use tracing::{error, info, warn};

use crate::{
    dto::ws::{QuestionOptions, RoomBroadcast},
    game::leaderboard::{Leaderboard, build_leaderboard},
    state::{SharedState, room::now_ms},
};

/// Schedule the first question broadcast after the start countdown.
///
/// The caller stores the returned handle as the room's pending timer so a
/// replayed `start` or a lobby teardown can abort it.
pub fn schedule_first_question(
    state: SharedState,
    code: String,
    countdown: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        sleep(countdown).await;
        broadcast_next_question(state, code).await;
    })
}

/// Broadcast the question at the cursor and arm its deadline timer.
///
/// Boxed because this and [`end_question`] recurse into each other through
/// the timers they spawn; the type erasure breaks that cycle the same way
/// the repository trait erases its futures.
pub fn broadcast_next_question(state: SharedState, code: String) -> BoxFuture<'static, ()> {
    Box::pin(async move {
        let Some(handle) = state.rooms().get(&code) else {
            warn!(code, "attempted to broadcast question for unknown room");
            return;
        };

        let payload = {
            let mut room = handle.room().lock().await;

            if room.status != crate::state::room::RoomStatus::InProgress {
                warn!(code, status = ?room.status, "room is not running; skipping question broadcast");
                return;
            }
            if room.questions.is_empty() {
                warn!(code, "no questions loaded for room");
                return;
            }
            if room.current_question_index >= room.questions.len() {
                info!(code, "all questions have been used for this run");
                return;
            }

            let question = room.questions[room.current_question_index].clone();
            let start_ms = now_ms();
            room.current_question_start_ms = Some(start_ms);
            room.current_question_active = true;
            room.answers_received.insert(question.id, 0);

            room.cancel_pending_timer();
            let deadline = state.config().question_deadline(room.time_per_question);
            let timer_state = state.clone();
            let timer_code = code.clone();
            let question_id = question.id;
            room.pending_timer = Some(tokio::spawn(async move {
                sleep(deadline).await;
                info!(code = %timer_code, question_id, "question time expired, auto-ending question");
                end_question(timer_state, timer_code, false).await;
            }));

            info!(
                code,
                question_id = question.id,
                question_number = room.current_question_index + 1,
                "broadcasting question to room"
            );

            RoomBroadcast::Question {
                id: question.id,
                text: question.text,
                options: QuestionOptions {
                    a: question.option_a,
                    b: question.option_b,
                    c: question.option_c,
                    d: question.option_d,
                },
                question_number: room.current_question_index + 1,
                total_questions: room.questions.len(),
                time_limit: room.time_per_question,
                server_start_time: start_ms,
            }
        };

        handle.broadcast(payload);
    })
}

/// Outcome of ending a round, decided while the room lock is held.
enum AfterQuestion {
    /// Another question follows after the inter-round pause.
    NextScheduled,
    /// The run is over; carries how many questions were actually played.
    GameOver {
        total_questions: usize,
        final_rankings: Leaderboard,
    },
}

/// End the active question, by timeout, early completion, or forced game end.
///
/// Idempotent: a deadline timer firing after an early end (or vice versa)
/// observes `current_question_active == false` and does nothing, so a round
/// can never end twice.
pub fn end_question(
    state: SharedState,
    code: String,
    force_game_end: bool,
) -> BoxFuture<'static, ()> {
    Box::pin(async move {
        let Some(handle) = state.rooms().get(&code) else {
            warn!(code, "attempted to end question for unknown room");
            return;
        };

        let (ended, after) = {
            let mut room = handle.room().lock().await;

            if !room.current_question_active {
                return;
            }
            room.current_question_active = false;
            room.cancel_pending_timer();
            room.current_question_start_ms = None;

            let Some(question) = room.current_question().cloned() else {
                warn!(
                    code,
                    index = room.current_question_index,
                    "no current question found when ending round"
                );
                return;
            };

            let questions_played = room.current_question_index + 1;
            let is_last = room.current_question_index >= room.questions.len() - 1;

            // A forced end reports and ranks only the questions that actually ran.
            let allowed: Option<HashSet<u32>> = force_game_end.then(|| {
                room.questions[..questions_played]
                    .iter()
                    .map(|q| q.id)
                    .collect()
            });
            let leaderboard = build_leaderboard(&room, allowed.as_ref());

            info!(
                code,
                question_id = question.id,
                leaderboard_size = leaderboard.len(),
                force_game_end,
                "ending question"
            );

            let ended = RoomBroadcast::QuestionEnded {
                game_code: room.code.clone(),
                question_id: question.id,
                correct_answer: question.correct_option.clone(),
                explanation: question.explanation.clone(),
                leaderboard: leaderboard.clone(),
            };

            let after = if force_game_end {
                AfterQuestion::GameOver {
                    total_questions: questions_played,
                    final_rankings: leaderboard,
                }
            } else if is_last {
                AfterQuestion::GameOver {
                    total_questions: room.questions.len(),
                    final_rankings: leaderboard,
                }
            } else {
                room.current_question_index += 1;
                let pause = state.config().inter_round_pause();
                let timer_state = state.clone();
                let timer_code = code.clone();
                room.pending_timer = Some(tokio::spawn(async move {
                    sleep(pause).await;
                    broadcast_next_question(timer_state, timer_code).await;
                }));
                AfterQuestion::NextScheduled
            };

            (ended, after)
        };

        handle.broadcast(ended);

        if let AfterQuestion::GameOver {
            total_questions,
            final_rankings,
        } = after
        {
            end_game(&state, &code, total_questions, final_rankings).await;
        }
    })
}

/// End the run prematurely because too few active players remain.
///
/// If a question is live it is ended first (scoped to the questions actually
/// played); during an inter-round pause the game ends immediately with the
/// count of completed questions.
pub async fn force_game_end(state: &SharedState, code: &str) {
    let Some(handle) = state.rooms().get(code) else {
        return;
    };

    // The deadline timer can race this and end the live round normally,
    // scheduling another question behind our back. Re-observe the room under
    // the lock until it is seen either finished or between rounds.
    loop {
        let mid_question = {
            let mut room = handle.room().lock().await;
            if room.status != crate::state::room::RoomStatus::InProgress {
                return;
            }
            if room.current_question_active {
                true
            } else {
                // Between rounds: the cursor already points at the next,
                // unplayed question, so the completed count is the cursor.
                room.cancel_pending_timer();
                false
            }
        };

        if !mid_question {
            break;
        }
        end_question(state.clone(), code.to_string(), true).await;
    }

    let (total_questions, final_rankings) = {
        let room = handle.room().lock().await;
        let played = room.current_question_index;
        let allowed: HashSet<u32> = room.questions[..played.min(room.questions.len())]
            .iter()
            .map(|q| q.id)
            .collect();
        (played, build_leaderboard(&room, Some(&allowed)))
    };
    end_game(state, code, total_questions, final_rankings).await;
}

/// Mark the run completed, broadcast the final rankings, and persist the
/// participant records best-effort.
async fn end_game(
    state: &SharedState,
    code: &str,
    total_questions: usize,
    final_rankings: Leaderboard,
) {
    let Some(handle) = state.rooms().get(code) else {
        warn!(code, "attempted to end game for unknown room");
        return;
    };

    let (game_id, participants) = {
        let mut room = handle.room().lock().await;
        room.status = crate::state::room::RoomStatus::Completed;
        room.current_question_active = false;
        room.cancel_pending_timer();

        let participants: Vec<crate::dao::models::ParticipantRow> = room
            .players
            .values()
            .map(|player| crate::dao::models::ParticipantRow {
                username: player.username.clone(),
                join_time_ms: player.join_time_ms,
                final_score: player.total_score,
            })
            .collect();
        (room.game_id, participants)
    };

    info!(code, total_questions, "emitting game_ended");
    handle.broadcast(RoomBroadcast::GameEnded {
        game_code: code.to_string(),
        total_questions,
        final_rankings,
    });

    // History keeping must never stall or fail the end-of-game broadcast.
    let repository = state.repository().clone();
    let participant_count = participants.len();
    let log_code = code.to_string();
    tokio::spawn(async move {
        match repository.record_participants(game_id, participants).await {
            Ok(()) => info!(
                code = %log_code,
                %game_id,
                participant_count,
                "persisted game participants"
            ),
            Err(err) => error!(code = %log_code, error = %err, "failed to persist game participants"),
        }
    });
}
