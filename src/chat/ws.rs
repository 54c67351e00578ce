use std::time::Duration;

use axum::{
    debug_handler,
    extract::{State, WebSocketUpgrade, ws::{CloseFrame, Message, WebSocket}},
    response::IntoResponse,
};
use futures_util::{SinkExt, StreamExt, stream::SplitSink};
use tokio::{sync::{mpsc, oneshot}, time::Instant};

use crate::{
    chat::{Relay, Session, frame::ServerFrame},
    error::Error,
    presence::ConnectionHandle,
};

const CLOSE_SUPERSEDED: u16 = 4000;
const CLOSE_AUTH_TIMEOUT: u16 = 4001;

#[derive(Debug, Clone, Copy)]
pub struct ConnectionSettings {
    pub outbound_capacity: usize,
    pub auth_timeout: Option<Duration>,
}

#[debug_handler(state = crate::AppState)]
pub(crate) async fn chat_ws(
    State(relay): State<Relay>,
    State(settings): State<ConnectionSettings>,
    ws: WebSocketUpgrade,
) -> impl IntoResponse {
    ws.on_upgrade(async move |socket| run_connection(socket, relay, settings).await)
}

/// Drives one socket until it closes, is superseded or fails to authenticate
/// in time. Inbound frames are handled one at a time, in arrival order.
pub async fn run_connection(socket: WebSocket, relay: Relay, settings: ConnectionSettings) {
    let (sink, mut stream) = socket.split();
    let (connection, outbound) = ConnectionHandle::new(settings.outbound_capacity);
    let (stop_tx, stop_rx) = oneshot::channel();
    let writer = tokio::spawn(writer_task(sink, outbound, stop_rx));

    let mut session = Session::new(connection.clone(), relay);
    let auth_deadline = settings.auth_timeout.map(|timeout| Instant::now() + timeout);
    tracing::info!(connection = %connection.id(), "connection opened");

    let close_frame = loop {
        let unauthenticated = session.identity().is_none();
        let next = tokio::select! {
            next = stream.next() => next,
            _ = connection.closed() => {
                break Some(CloseFrame { code: CLOSE_SUPERSEDED, reason: "superseded by a newer connection".into() });
            }
            _ = expire(auth_deadline), if unauthenticated => {
                tracing::info!(connection = %connection.id(), "authentication timed out");
                break Some(CloseFrame { code: CLOSE_AUTH_TIMEOUT, reason: "authentication timeout".into() });
            }
        };

        // handled outside the select so an accepted frame is never cancelled
        match next {
            Some(Ok(Message::Text(text))) => {
                if let Err(err) = session.handle(text.as_str()).await {
                    reject(&connection, session.identity(), err);
                }
            }
            Some(Ok(Message::Binary(_))) => {
                reject(&connection, session.identity(), Error::validation("binary frames are not supported"));
            }
            Some(Ok(Message::Ping(_) | Message::Pong(_))) => {}
            Some(Ok(Message::Close(_))) | None => break None,
            Some(Err(err)) => {
                tracing::warn!(connection = %connection.id(), error = %err, "socket receive error");
                break None;
            }
        }
    };

    let identity = session.identity().map(str::to_owned);
    session.close();
    drop(session);

    let _ = stop_tx.send(close_frame);
    let _ = writer.await;
    tracing::info!(connection = %connection.id(), identity, "connection closed");
}

fn reject(connection: &ConnectionHandle, identity: Option<&str>, err: Error) {
    let message = match &err {
        Error::Store(source) => {
            tracing::error!(connection = %connection.id(), identity, error = %source, "store failure while handling frame");
            "server error".to_owned()
        }
        _ => {
            tracing::debug!(connection = %connection.id(), identity, error = %err, "frame rejected");
            err.to_string()
        }
    };
    let _ = connection.try_send(ServerFrame::error(message));
}

async fn expire(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

/// Owns the socket sink. Writes queued frames until told to stop, then
/// flushes what is left and sends the close frame.
async fn writer_task(
    mut sink: SplitSink<WebSocket, Message>,
    mut outbound: mpsc::Receiver<ServerFrame>,
    mut stop: oneshot::Receiver<Option<CloseFrame>>,
) {
    let close_frame = loop {
        tokio::select! {
            frame = outbound.recv() => match frame {
                Some(frame) => {
                    if sink.send(Message::Text(frame.to_json().into())).await.is_err() {
                        return;
                    }
                }
                None => break None,
            },
            close_frame = &mut stop => break close_frame.ok().flatten(),
        }
    };

    outbound.close();
    while let Ok(frame) = outbound.try_recv() {
        if sink.send(Message::Text(frame.to_json().into())).await.is_err() {
            return;
        }
    }
    let _ = sink.send(Message::Close(close_frame)).await;
    let _ = sink.close().await;
}
