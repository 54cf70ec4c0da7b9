//! Player/host WebSocket session lifecycle.
//!
//! Each connection gets a dedicated writer task fed by an unbounded channel,
//! so room broadcasts keep flowing while we await inbound frames. On a
//! successful join the session subscribes to the room's broadcast channel and
//! a forwarder task copies events onto the writer. Every inbound command is
//! answered with a typed ack envelope; a failed command never closes the
//! connection.

use axum::extract::ws::{Message, WebSocket};
use futures::{SinkExt, StreamExt};
use tokio::{sync::mpsc, task::JoinHandle};
use tracing::{info, warn};

use crate::{
    dto::ws::{ClientCommand, CommandAck, JoinAck, SubmitAck},
    game::handlers::{
        JoinGameInput, Session, handle_disconnect, handle_join_game, handle_move_player_team,
        handle_start_game, handle_submit_answer,
    },
    state::SharedState,
};

/// Handle the full lifecycle of one player or host connection.
pub async fn handle_socket(state: SharedState, socket: WebSocket) {
    let (mut sender, mut receiver) = socket.split();
    let (outbound_tx, mut outbound_rx) = mpsc::unbounded_channel::<Message>();

    // Dedicated writer task keeps outbound messages flowing even while we
    // await inbound frames.
    let writer_task = tokio::spawn(async move {
        while let Some(message) = outbound_rx.recv().await {
            if sender.send(message).await.is_err() {
                break;
            }
        }
    });

    let mut session = Session::new();
    let mut room_forwarder: Option<JoinHandle<()>> = None;

    info!(connection_id = %session.connection_id, "websocket connected");

    while let Some(message) = receiver.next().await {
        match message {
            Ok(Message::Text(text)) => {
                let command = match serde_json::from_str::<ClientCommand>(&text) {
                    Ok(command) => command,
                    Err(err) => {
                        warn!(
                            connection_id = %session.connection_id,
                            error = %err,
                            "failed to parse client command"
                        );
                        let _ = send_json(
                            &outbound_tx,
                            &CommandAck::<()>::err("error", "Malformed command"),
                        );
                        continue;
                    }
                };
                dispatch_command(
                    &state,
                    &mut session,
                    &outbound_tx,
                    &mut room_forwarder,
                    command,
                )
                .await;
            }
            Ok(Message::Ping(payload)) => {
                let _ = outbound_tx.send(Message::Pong(payload));
            }
            Ok(Message::Close(frame)) => {
                info!(connection_id = %session.connection_id, "client closed websocket");
                let _ = outbound_tx.send(Message::Close(frame));
                break;
            }
            Ok(Message::Binary(_)) => {}
            Ok(Message::Pong(_)) => {}
            Err(err) => {
                warn!(connection_id = %session.connection_id, error = %err, "websocket error");
                break;
            }
        }
    }

    if let Some(forwarder) = room_forwarder.take() {
        forwarder.abort();
    }
    handle_disconnect(&state, &session).await;
    info!(connection_id = %session.connection_id, "websocket disconnected");

    finalize(writer_task, outbound_tx).await;
}

/// Route one parsed command to its handler and ack the result.
async fn dispatch_command(
    state: &SharedState,
    session: &mut Session,
    outbound_tx: &mpsc::UnboundedSender<Message>,
    room_forwarder: &mut Option<JoinHandle<()>>,
    command: ClientCommand,
) {
    match command {
        ClientCommand::JoinGame {
            game_code,
            username,
            is_host,
            team_id,
            team_count,
        } => {
            let result = handle_join_game(
                state,
                session,
                JoinGameInput {
                    game_code,
                    username,
                    is_host,
                    team_id,
                    team_count,
                },
            )
            .await;
            let ack = match result {
                Ok(ack) => {
                    subscribe_to_room(state, session, outbound_tx, room_forwarder);
                    CommandAck::ok("join_game_ack", ack)
                }
                Err(err) => CommandAck::<JoinAck>::err("join_game_ack", err),
            };
            let _ = send_json(outbound_tx, &ack);
        }
        ClientCommand::StartGame { game_code } => {
            let ack = match handle_start_game(state, session, game_code).await {
                Ok(()) => CommandAck::<()>::ok_empty("start_game_ack"),
                Err(err) => CommandAck::err("start_game_ack", err),
            };
            let _ = send_json(outbound_tx, &ack);
        }
        ClientCommand::SubmitAnswer {
            game_code,
            question_id,
            answer,
        } => {
            let result =
                handle_submit_answer(state, session, game_code, question_id, answer).await;
            let ack = match result {
                Ok(ack) => CommandAck::ok("submit_answer_ack", ack),
                Err(err) => CommandAck::<SubmitAck>::err("submit_answer_ack", err),
            };
            let _ = send_json(outbound_tx, &ack);
        }
        ClientCommand::MovePlayerTeam {
            game_code,
            username,
            target_team_id,
        } => {
            let result =
                handle_move_player_team(state, session, game_code, username, target_team_id)
                    .await;
            let ack = match result {
                Ok(()) => CommandAck::<()>::ok_empty("move_player_team_ack"),
                Err(err) => CommandAck::err("move_player_team_ack", err),
            };
            let _ = send_json(outbound_tx, &ack);
        }
        ClientCommand::Unknown => {
            warn!(connection_id = %session.connection_id, "unrecognized command type");
            let _ = send_json(
                outbound_tx,
                &CommandAck::<()>::err("error", "Unknown command type"),
            );
        }
    }
}

/// Attach the connection's writer to its room's broadcast channel.
///
/// A rejoin (same connection joining another room) replaces the previous
/// forwarder.
fn subscribe_to_room(
    state: &SharedState,
    session: &Session,
    outbound_tx: &mpsc::UnboundedSender<Message>,
    room_forwarder: &mut Option<JoinHandle<()>>,
) {
    let Some(code) = session.game_code.as_ref() else {
        return;
    };
    let Some(handle) = state.rooms().get(code) else {
        warn!(code, "joined room vanished before subscription");
        return;
    };

    if let Some(previous) = room_forwarder.take() {
        previous.abort();
    }

    let mut events = handle.subscribe();
    let tx = outbound_tx.clone();
    let code = code.clone();
    let connection_id = session.connection_id;
    *room_forwarder = Some(tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(event) => {
                    if send_json(&tx, &event).is_err() {
                        break;
                    }
                }
                Err(tokio::sync::broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(code, %connection_id, skipped, "room event stream lagged");
                }
                Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
            }
        }
    }));
}

/// Serialize a payload and push it onto the writer channel.
///
/// A serialization failure is logged and swallowed (permanent error, no point
/// retrying); a closed writer is reported so callers can stop forwarding.
fn send_json<T>(tx: &mpsc::UnboundedSender<Message>, value: &T) -> Result<(), ()>
where
    T: ?Sized + serde::Serialize,
{
    let payload = match serde_json::to_string(value) {
        Ok(payload) => payload,
        Err(err) => {
            warn!(error = %err, "failed to serialize outbound message");
            return Ok(());
        }
    };
    tx.send(Message::Text(payload.into())).map_err(|_| ())
}

/// Ensure the writer task winds down before we return from the socket handler.
async fn finalize(writer_task: JoinHandle<()>, outbound_tx: mpsc::UnboundedSender<Message>) {
    drop(outbound_tx);
    let _ = writer_task.await;
}
