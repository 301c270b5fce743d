use crate::interface_adapters::protocol::{encode, parse_command, parse_username};
use crate::interface_adapters::state::AppState;
use crate::use_cases::{ConnId, GameEvent, Outbound};

use axum::{
    Error,
    extract::{
        State,
        ws::{CloseFrame, Message, WebSocket, WebSocketUpgrade, close_code},
    },
    response::IntoResponse,
};
use futures::SinkExt;
use std::{
    sync::Arc,
    time::{Duration, Instant},
};
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::time::timeout;
use tracing::{Instrument, debug, error, info, info_span, warn};

#[derive(Debug)]
enum NetError {
    // Categorizes connection lifecycle failures so callers can decide policy.
    #[allow(dead_code)]
    Ws(axum::Error),
    InputClosed,
    JoinTimeout,
    InvalidUsername,
    UnsupportedFrame,
    ClosedBeforeJoin,
}

impl From<axum::Error> for NetError {
    fn from(e: axum::Error) -> Self {
        NetError::Ws(e)
    }
}

enum LoopControl {
    Continue,
    Disconnect,
}

const LOG_THROTTLE: Duration = Duration::from_secs(2);
const JOIN_HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(5);

pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| {
        // Separate connection id for correlating logs before/after a username exists.
        let conn_id = state.next_conn_id();
        let span = info_span!("conn", conn_id, username = tracing::field::Empty);
        handle_socket(socket, state, conn_id).instrument(span)
    })
}

async fn handle_socket(mut socket: WebSocket, state: Arc<AppState>, conn_id: ConnId) {
    let mut ctx = match bootstrap_connection(&mut socket, &state, conn_id).await {
        Ok(ctx) => ctx,
        Err(NetError::ClosedBeforeJoin) => {
            info!("client disconnected before username handshake");
            return;
        }
        Err(e) => {
            warn!(error = ?e, "failed to bootstrap connection");
            return;
        }
    };

    tracing::Span::current().record("username", ctx.username.as_str());
    info!(username = %ctx.username, "client connected");

    if let Err(e) = run_client_loop(&mut socket, &mut ctx).await {
        warn!(error = ?e, "client loop exited with error");
    }
}

struct ConnCtx {
    pub username: String,
    pub conn_id: ConnId,
    pub state: Arc<AppState>,
    // Messages routed to this connection by the world task.
    pub outbound_rx: mpsc::Receiver<Outbound>,

    pub msgs_in: u64,
    pub msgs_out: u64,
    pub bytes_in: u64,
    pub bytes_out: u64,

    pub invalid_messages: u32,

    pub last_input_full_log: Instant,
    pub last_invalid_input_log: Instant,

    pub close_frame: Option<CloseFrame>,
}

async fn bootstrap_connection(
    socket: &mut WebSocket,
    state: &Arc<AppState>,
    conn_id: ConnId,
) -> Result<ConnCtx, NetError> {
    let username = match timeout(JOIN_HANDSHAKE_TIMEOUT, read_join_handshake(socket)).await {
        Ok(result) => result?,
        Err(_) => {
            let _ = send_close_with_reason(socket, close_code::POLICY, "join timeout").await;
            return Err(NetError::JoinTimeout);
        }
    };

    // The world task owns the sender; it is dropped when a newer connection takes the username.
    let (outbound_tx, outbound_rx) = mpsc::channel(state.outbound_capacity);
    if state
        .input_tx
        .send(GameEvent::Join {
            username: username.clone(),
            conn_id,
            outbound_tx,
        })
        .await
        .is_err()
    {
        let _ = send_close_with_reason(socket, close_code::ERROR, "server unavailable").await;
        return Err(NetError::InputClosed);
    }

    let now = Instant::now() - LOG_THROTTLE;
    Ok(ConnCtx {
        username,
        conn_id,
        state: Arc::clone(state),
        outbound_rx,

        msgs_in: 1,
        msgs_out: 0,
        bytes_in: 0,
        bytes_out: 0,

        invalid_messages: 0,

        last_input_full_log: now,
        last_invalid_input_log: now,

        close_frame: None,
    })
}

async fn send_close_with_reason(
    socket: &mut WebSocket,
    code: u16,
    reason: &'static str,
) -> Result<(), NetError> {
    socket
        .send(Message::Close(Some(CloseFrame {
            code,
            reason: reason.into(),
        })))
        .await
        .map_err(NetError::Ws)?;
    socket.close().await.map_err(NetError::Ws)
}

// The first text frame is the bare username.
async fn read_join_handshake(socket: &mut WebSocket) -> Result<String, NetError> {
    loop {
        let Some(incoming) = socket.recv().await else {
            return Err(NetError::ClosedBeforeJoin);
        };

        let message = incoming.map_err(NetError::Ws)?;
        match message {
            Message::Text(text) => {
                return match parse_username(&text) {
                    Ok(username) => Ok(username.to_string()),
                    Err(e) => {
                        debug!(error = %e, "rejected username");
                        let _ =
                            send_close_with_reason(socket, close_code::POLICY, "invalid username")
                                .await;
                        Err(NetError::InvalidUsername)
                    }
                };
            }
            Message::Binary(_) => {
                let _ = send_close_with_reason(
                    socket,
                    close_code::UNSUPPORTED,
                    "binary messages not supported",
                )
                .await;
                return Err(NetError::UnsupportedFrame);
            }
            Message::Ping(_) | Message::Pong(_) => {}
            Message::Close(_) => return Err(NetError::ClosedBeforeJoin),
        }
    }
}

fn should_log(last: &mut Instant) -> bool {
    if last.elapsed() >= LOG_THROTTLE {
        *last = Instant::now();
        true
    } else {
        false
    }
}

async fn run_client_loop(socket: &mut WebSocket, ctx: &mut ConnCtx) -> Result<(), NetError> {
    let mut fatal: Option<NetError> = None;

    loop {
        // disconnect becomes true on error
        let disconnect: bool = tokio::select! {
            // Incoming Message from Client
            incoming = socket.recv() => {
                match handle_incoming_ws(incoming, ctx) {
                    Ok(LoopControl::Continue) => false,
                    Ok(LoopControl::Disconnect) => true,
                    Err(e) => {
                        fatal = Some(e);
                        true
                    }
                }
            }

            // Outgoing messages from the world task
            outbound = ctx.outbound_rx.recv() => {
                match outbound {
                    Some(message) => match forward_outbound(&message, socket, ctx).await {
                        LoopControl::Continue => false,
                        LoopControl::Disconnect => true,
                    },
                    None => {
                        // Ask the client to close; a newer connection took ownership.
                        ctx.close_frame = Some(CloseFrame {
                            code: close_code::POLICY,
                            reason: "connection replaced".into(),
                        });
                        info!(username = %ctx.username, "connection replaced by newer session");
                        true
                    }
                }
            }
        };

        if disconnect {
            if let Some(frame) = ctx.close_frame.take() {
                let _ = socket.send(Message::Close(Some(frame))).await;
            }
            if let Err(err) = socket.close().await.map_err(NetError::Ws) {
                debug!(error = ?err, "socket close error");
            }
            break;
        }
    }

    if let Err(e) = disconnect_cleanup(ctx).await {
        warn!(error = ?e, "error during disconnect cleanup");
        if fatal.is_none() {
            fatal = Some(e);
        }
    }

    if let Some(err) = fatal {
        Err(err)
    } else {
        Ok(())
    }
}

fn handle_incoming_ws(
    incoming: Option<Result<Message, Error>>,
    ctx: &mut ConnCtx,
) -> Result<LoopControl, NetError> {
    match incoming {
        Some(Ok(msg)) => match msg {
            Message::Text(text) => {
                ctx.msgs_in += 1;
                ctx.bytes_in += text.len() as u64;

                match parse_command(&text) {
                    Ok(command) => {
                        let event = GameEvent::Command {
                            username: ctx.username.clone(),
                            conn_id: ctx.conn_id,
                            command,
                        };
                        match ctx.state.input_tx.try_send(event) {
                            Ok(()) => Ok(LoopControl::Continue),
                            Err(TrySendError::Full(_evt)) => {
                                if should_log(&mut ctx.last_input_full_log) {
                                    warn!(username = %ctx.username, "input channel full; dropping command");
                                }
                                Ok(LoopControl::Continue)
                            }
                            Err(TrySendError::Closed(_evt)) => Err(NetError::InputClosed),
                        }
                    }
                    Err(parse_err) => {
                        ctx.invalid_messages += 1;
                        if should_log(&mut ctx.last_invalid_input_log) {
                            warn!(
                                username = %ctx.username,
                                bytes = text.len(),
                                error = %parse_err,
                                "failed to parse client message"
                            );
                        }

                        // Malformed commands are dropped; the connection stays open.
                        Ok(LoopControl::Continue)
                    }
                }
            }
            Message::Binary(_) => {
                ctx.close_frame = Some(CloseFrame {
                    code: close_code::UNSUPPORTED,
                    reason: "binary messages not supported".into(),
                });
                Ok(LoopControl::Disconnect)
            }
            Message::Ping(_) | Message::Pong(_) => Ok(LoopControl::Continue),
            Message::Close(_) => Ok(LoopControl::Disconnect),
        },
        Some(Err(e)) => {
            warn!(username = %ctx.username, error = %e, "websocket recv error");
            Ok(LoopControl::Disconnect)
        }
        None => {
            info!(username = %ctx.username, "websocket closed");
            Ok(LoopControl::Disconnect)
        }
    }
}

async fn forward_outbound(
    message: &Outbound,
    socket: &mut WebSocket,
    ctx: &mut ConnCtx,
) -> LoopControl {
    let frame = match encode(message, &ctx.state.registries) {
        Ok(frame) => frame,
        Err(e) => {
            // A message we cannot render is dropped; the connection stays usable.
            error!(error = %e, "failed to encode outbound message");
            return LoopControl::Continue;
        }
    };
    let bytes_len = frame.len();
    match socket
        .send(Message::Text(frame.into()))
        .await
        .map_err(NetError::Ws)
    {
        Ok(()) => {
            ctx.msgs_out += 1;
            ctx.bytes_out += bytes_len as u64;
            LoopControl::Continue
        }
        Err(err) => {
            // Log unexpected send failures; disconnect will follow immediately.
            warn!(error = ?err, "failed to send outbound message");
            LoopControl::Disconnect
        }
    }
}

async fn disconnect_cleanup(ctx: &ConnCtx) -> Result<(), NetError> {
    debug!(
        username = %ctx.username,
        msgs_in = ctx.msgs_in,
        msgs_out = ctx.msgs_out,
        bytes_in = ctx.bytes_in,
        bytes_out = ctx.bytes_out,
        invalid_messages = ctx.invalid_messages,
        "connection stats"
    );

    // The world task ignores this if a newer connection already owns the username.
    ctx.state
        .input_tx
        .send(GameEvent::Leave {
            username: ctx.username.clone(),
            conn_id: ctx.conn_id,
        })
        .await
        .map_err(|_| NetError::InputClosed)
}
