//! Queue push channel.
//!
//! A WebSocket subscription to `/ws/queue/{department}/`. Every inbound
//! frame is an opaque "something changed" signal: payloads are never
//! parsed, each one just triggers a full re-pull through the listener.
//! One pull is spawned per signal, so a burst of messages produces a
//! burst of pulls. There is no reconnect; a dropped channel stays down
//! until the next mount.

use std::future::Future;
use std::sync::Arc;
use std::time::Instant;

use futures_util::{SinkExt, StreamExt};
use thiserror::Error;
use tokio::net::TcpStream;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};

use super::controller::QueueController;
use crate::api::{paths, QueueService};
use crate::config::{ClientConfig, ConfigError};

type Socket = WebSocketStream<MaybeTlsStream<TcpStream>>;

#[derive(Debug, Error)]
pub enum PushError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Invalid channel URL: {0}")]
    Url(String),

    #[error("Push channel connection failed: {0}")]
    Connect(#[from] tokio_tungstenite::tungstenite::Error),
}

/// "The queue changed somewhere." Carries no payload on purpose.
#[derive(Debug, Clone, Copy)]
pub struct ChangeSignal {
    received_at: Instant,
}

impl ChangeSignal {
    fn now() -> Self {
        Self {
            received_at: Instant::now(),
        }
    }

    pub fn received_at(&self) -> Instant {
        self.received_at
    }
}

/// Whoever re-pulls state when the channel signals a change.
pub trait ChangeListener: Send + Sync + 'static {
    fn on_change(&self, signal: ChangeSignal) -> impl Future<Output = ()> + Send;
}

impl<S: QueueService> ChangeListener for QueueController<S> {
    async fn on_change(&self, signal: ChangeSignal) {
        tracing::debug!(
            waited_ms = signal.received_at().elapsed().as_millis() as u64,
            "Queue changed, re-pulling"
        );
        self.refresh_all().await;
    }
}

/// `ws(s)://host/ws/queue/{department}/?token=...`
pub fn channel_url(
    config: &ClientConfig,
    department: &str,
    token: Option<&str>,
) -> Result<String, PushError> {
    let raw = format!("{}{}", config.ws_base_url()?, paths::queue_channel(department));
    let mut url = reqwest::Url::parse(&raw).map_err(|e| PushError::Url(e.to_string()))?;
    if let Some(token) = token.filter(|t| !t.is_empty()) {
        url.query_pairs_mut().append_pair("token", token);
    }
    Ok(url.into())
}

/// URL without its query string, for logs.
fn redact(url: &str) -> &str {
    url.split_once('?').map(|(head, _)| head).unwrap_or(url)
}

// ═══════════════════════════════════════════════════════════
// PushChannel
// ═══════════════════════════════════════════════════════════

/// An open subscription. Closing or dropping it stops the reader task.
pub struct PushChannel {
    shutdown: Option<oneshot::Sender<()>>,
    reader: Option<JoinHandle<()>>,
}

impl PushChannel {
    pub async fn open<L: ChangeListener>(url: &str, listener: Arc<L>) -> Result<Self, PushError> {
        let (socket, _) = tokio_tungstenite::connect_async(url).await?;
        tracing::info!(url = %redact(url), "Queue push channel open");

        let (tx, rx) = oneshot::channel();
        let reader = tokio::spawn(read_loop(socket, rx, listener));
        Ok(Self {
            shutdown: Some(tx),
            reader: Some(reader),
        })
    }

    /// False once the server hung up or the channel was closed.
    pub fn is_open(&self) -> bool {
        self.reader.as_ref().is_some_and(|h| !h.is_finished())
    }

    /// Send a close frame and wait for the reader to stop.
    pub async fn close(mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        if let Some(reader) = self.reader.take() {
            let _ = reader.await;
        }
    }
}

impl Drop for PushChannel {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
    }
}

async fn read_loop<L: ChangeListener>(
    socket: Socket,
    mut shutdown: oneshot::Receiver<()>,
    listener: Arc<L>,
) {
    let (mut sink, mut stream) = socket.split();

    loop {
        tokio::select! {
            _ = &mut shutdown => {
                let _ = sink.send(Message::Close(None)).await;
                break;
            }
            msg = stream.next() => match msg {
                Some(Ok(Message::Text(_) | Message::Binary(_))) => {
                    let listener = Arc::clone(&listener);
                    let signal = ChangeSignal::now();
                    tokio::spawn(async move { listener.on_change(signal).await });
                }
                Some(Ok(Message::Close(_))) | None => break,
                Some(Err(e)) => {
                    tracing::warn!(error = %e, "Queue push channel error");
                    break;
                }
                _ => {} // Ping/Pong handled by tungstenite
            }
        }
    }

    tracing::info!("Queue push channel closed");
}

// ═══════════════════════════════════════════════════════════
// Test server
// ═══════════════════════════════════════════════════════════

/// What the fake queue channel saw on upgrade: department and token.
#[cfg(test)]
pub(crate) type SeenUpgrades = Arc<std::sync::Mutex<Vec<(String, Option<String>)>>>;

/// Serve `/ws/queue/{department}/` on an ephemeral port. Each connection
/// receives `frames` then stays open until the client leaves. Returns
/// the server root URL.
#[cfg(test)]
pub(crate) async fn spawn_queue_channel(frames: Vec<String>, seen: SeenUpgrades) -> String {
    use std::collections::HashMap;

    use axum::extract::ws::{Message as WsMessage, WebSocketUpgrade};
    use axum::extract::{Path, Query};
    use axum::routing::get;
    use axum::Router;
    use tokio::net::TcpListener;

    let app = Router::new().route(
        "/ws/queue/:department/",
        get(
            move |ws: WebSocketUpgrade,
                  Path(department): Path<String>,
                  Query(query): Query<HashMap<String, String>>| {
                let frames = frames.clone();
                let seen = seen.clone();
                async move {
                    seen.lock()
                        .unwrap()
                        .push((department, query.get("token").cloned()));
                    ws.on_upgrade(move |mut socket| async move {
                        for frame in frames {
                            if socket.send(WsMessage::Text(frame)).await.is_err() {
                                return;
                            }
                        }
                        while let Some(Ok(_)) = socket.recv().await {}
                    })
                }
            },
        ),
    );

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://127.0.0.1:{}", addr.port())
}
