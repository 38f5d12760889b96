//! The push-channel client: an explicit connection-state machine around a
//! WebSocket to the authoritative backend.
//!
//! `DISCONNECTED -> CONNECTING -> CONNECTED` on open, `* -> DISCONNECTED` on
//! any close or error, with exponential-backoff reconnects while down. Sends
//! go through an owned bounded queue and are flushed in original order once
//! the channel is up; echoes of our own sends are recognized by their
//! idempotency token and not applied twice.

use crate::backoff::Backoff;
use crate::convergence::ConvergenceClient;
use crate::message::{ClientMessage, ServerMessage};
use crate::queue::SendQueue;
use anyhow::{Context, Result};
use futures::{SinkExt, StreamExt};
use kardia_core::config::KardiaConfig;
use kardia_store::{LimbicStore, UpdateSource};
use std::collections::VecDeque;
use std::sync::Arc;
use tokio::net::TcpStream;
use tokio::sync::{watch, Mutex, Notify};
use tokio_tungstenite::{
    connect_async, tungstenite::protocol::Message, MaybeTlsStream, WebSocketStream,
};
use url::Url;
use uuid::Uuid;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Connection state of the push channel, exposed to observers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connecting,
    Connected,
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            ConnectionState::Disconnected => "DISCONNECTED",
            ConnectionState::Connecting => "CONNECTING",
            ConnectionState::Connected => "CONNECTED",
        };
        f.write_str(label)
    }
}

/// Bounded ring of recently-sent idempotency tokens, used to recognize the
/// backend echoing our own outbound messages back as deltas.
#[derive(Debug, Default)]
pub struct TokenRing {
    items: VecDeque<Uuid>,
    cap: usize,
}

impl TokenRing {
    pub fn new(cap: usize) -> Self {
        Self {
            items: VecDeque::new(),
            cap: cap.max(1),
        }
    }

    pub fn remember(&mut self, token: Uuid) {
        if self.items.len() >= self.cap {
            self.items.pop_front();
        }
        self.items.push_back(token);
    }

    /// Remove the token if present; true means "this was ours, already
    /// applied locally by the backend's echo contract".
    pub fn take(&mut self, token: &Uuid) -> bool {
        if let Some(pos) = self.items.iter().position(|t| t == token) {
            self.items.remove(pos);
            true
        } else {
            false
        }
    }
}

/// Reconcile one incoming push-channel message into the store.
pub async fn apply_server_message(store: &LimbicStore, msg: ServerMessage, seen: &mut TokenRing) {
    match msg {
        ServerMessage::StateReplace { state } => store.replace(state).await,
        ServerMessage::StateDelta { delta, token } => {
            if let Some(t) = token {
                if seen.take(&t) {
                    tracing::debug!(token = %t, "Suppressed echo of our own send");
                    return;
                }
            }
            store.apply_delta(delta, UpdateSource::ServerDelta).await;
        }
    }
}

struct Outbound {
    queue: Mutex<SendQueue>,
    notify: Notify,
}

enum Closed {
    Remote,
    Shutdown,
}

/// Handle to the running sync machinery. Cheap to clone; `shutdown` tears
/// down the reconnect loop and abandons whatever is still queued.
#[derive(Clone)]
pub struct SyncClient {
    outbound: Arc<Outbound>,
    conn_rx: watch::Receiver<ConnectionState>,
    shutdown_tx: Arc<watch::Sender<bool>>,
    convergence: ConvergenceClient,
}

impl SyncClient {
    /// Spawn the push-channel task and return the handle.
    pub fn start(config: &KardiaConfig, store: Arc<LimbicStore>) -> Result<Self> {
        let ws_url = Url::parse(&config.backend.ws_url()).context("Invalid push channel URL")?;
        let (conn_tx, conn_rx) = watch::channel(ConnectionState::Disconnected);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let outbound = Arc::new(Outbound {
            queue: Mutex::new(SendQueue::new(config.sync.queue_depth)),
            notify: Notify::new(),
        });

        let backoff = Backoff::from_config(&config.sync);
        tokio::spawn(run_loop(
            ws_url,
            store,
            Arc::clone(&outbound),
            conn_tx,
            shutdown_rx,
            backoff,
        ));

        Ok(Self {
            outbound,
            conn_rx,
            shutdown_tx: Arc::new(shutdown_tx),
            convergence: ConvergenceClient::new(&config.backend.base_url),
        })
    }

    /// Queue an outbound message. Never blocks on the network: while
    /// disconnected the message waits (bounded) for the next reconnect.
    pub async fn send(&self, msg: ClientMessage) {
        self.outbound.queue.lock().await.push(msg);
        self.outbound.notify.notify_one();
    }

    /// Convenience: send a user-triggered interaction with a fresh token.
    pub async fn send_interaction(&self, kind: &str) {
        self.send(ClientMessage::interaction(kind)).await;
    }

    pub fn connection_state(&self) -> ConnectionState {
        *self.conn_rx.borrow()
    }

    /// Subscribe to connection-state transitions.
    pub fn watch_connection(&self) -> watch::Receiver<ConnectionState> {
        self.conn_rx.clone()
    }

    /// One-shot request/response surface.
    pub fn convergence(&self) -> &ConvergenceClient {
        &self.convergence
    }

    /// Tear down: cancels pending reconnect attempts and abandons the queue.
    pub fn shutdown(&self) {
        let _ = self.shutdown_tx.send(true);
    }
}

/// Resolves once shutdown is requested (or the handle is gone).
async fn wait_shutdown(rx: &mut watch::Receiver<bool>) {
    loop {
        if *rx.borrow() {
            return;
        }
        if rx.changed().await.is_err() {
            return;
        }
    }
}

async fn run_loop(
    ws_url: Url,
    store: Arc<LimbicStore>,
    outbound: Arc<Outbound>,
    conn_tx: watch::Sender<ConnectionState>,
    mut shutdown_rx: watch::Receiver<bool>,
    mut backoff: Backoff,
) {
    let mut seen = TokenRing::new(64);

    loop {
        if *shutdown_rx.borrow() {
            break;
        }

        let _ = conn_tx.send(ConnectionState::Connecting);
        tracing::info!("Connecting to limbic backend at {}...", ws_url);

        let connected = tokio::select! {
            res = connect_async(ws_url.as_str()) => res,
            _ = wait_shutdown(&mut shutdown_rx) => break,
        };

        match connected {
            Ok((ws_stream, _)) => {
                tracing::info!("Push channel connected");
                let _ = conn_tx.send(ConnectionState::Connected);
                backoff.reset();

                let closed = handle_connection(
                    ws_stream,
                    &store,
                    &outbound,
                    &mut seen,
                    &mut shutdown_rx,
                )
                .await;
                let _ = conn_tx.send(ConnectionState::Disconnected);

                match closed {
                    Ok(Closed::Shutdown) => break,
                    Ok(Closed::Remote) => tracing::warn!("Push channel closed by backend"),
                    Err(e) => tracing::warn!("Push channel error: {}", e),
                }
            }
            Err(e) => {
                let _ = conn_tx.send(ConnectionState::Disconnected);
                tracing::warn!("Failed to connect to limbic backend: {}", e);
            }
        }

        let delay = backoff.next_delay();
        tracing::info!("Reconnecting in {:.1}s...", delay.as_secs_f64());
        tokio::select! {
            _ = tokio::time::sleep(delay) => {}
            _ = wait_shutdown(&mut shutdown_rx) => break,
        }
    }

    let _ = conn_tx.send(ConnectionState::Disconnected);
    tracing::info!("Sync client stopped");
}

async fn handle_connection(
    stream: WsStream,
    store: &LimbicStore,
    outbound: &Outbound,
    seen: &mut TokenRing,
    shutdown_rx: &mut watch::Receiver<bool>,
) -> Result<Closed> {
    let (mut write, mut read) = stream.split();

    // Flush sends queued while we were down, in original order.
    flush_queue(&mut write, outbound, seen).await?;

    loop {
        tokio::select! {
            msg = read.next() => {
                match msg {
                    None => return Ok(Closed::Remote),
                    Some(Err(e)) => return Err(e.into()),
                    Some(Ok(Message::Text(text))) => {
                        match serde_json::from_str::<ServerMessage>(&text) {
                            Ok(server_msg) => apply_server_message(store, server_msg, seen).await,
                            Err(_) => tracing::debug!("Ignored unparseable push frame"),
                        }
                    }
                    Some(Ok(Message::Close(_))) => return Ok(Closed::Remote),
                    Some(Ok(_)) => {} // ping/pong/binary: nothing to do
                }
            }

            _ = outbound.notify.notified() => {
                flush_queue(&mut write, outbound, seen).await?;
            }

            _ = wait_shutdown(shutdown_rx) => {
                let _ = write.send(Message::Close(None)).await;
                return Ok(Closed::Shutdown);
            }
        }
    }
}

async fn flush_queue<S, E>(write: &mut S, outbound: &Outbound, seen: &mut TokenRing) -> Result<()>
where
    S: futures::Sink<Message, Error = E> + Unpin,
    E: std::error::Error + Send + Sync + 'static,
{
    let pending = outbound.queue.lock().await.drain();
    for msg in pending {
        let json = serde_json::to_string(&msg).context("Failed to serialize outbound message")?;
        seen.remember(msg.token());
        write
            .send(Message::Text(json))
            .await
            .context("Failed to send outbound message")?;
    }
    Ok(())
}
