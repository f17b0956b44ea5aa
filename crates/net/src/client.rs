use futures::{SinkExt, StreamExt};
use serde::Deserialize;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use twinsim_common::{BodySnapshot, InputEvent};

use crate::config::NetworkConfig;
use crate::error::NetError;
use crate::protocol::{ClientMessage, ServerMessage};

type Socket = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Health endpoint response. Only `ws` matters.
#[derive(Debug, Deserialize)]
struct HealthStatus {
    #[serde(default)]
    ws: bool,
}

/// Link state shared between the client and its link task.
#[derive(Debug, Default)]
struct LinkFlags {
    available: AtomicBool,
    gave_up: AtomicBool,
    notice_logged: AtomicBool,
    notices: AtomicUsize,
}

impl LinkFlags {
    fn give_up(&self, reason: &NetError) {
        self.available.store(false, Ordering::SeqCst);
        self.gave_up.store(true, Ordering::SeqCst);
        if !self.notice_logged.swap(true, Ordering::SeqCst) {
            self.notices.fetch_add(1, Ordering::SeqCst);
            tracing::info!(error = %reason, "authoritative server unavailable, running single-node");
        }
    }
}

/// Optional link to an authoritative simulation server.
///
/// Failure at any point degrades silently to single-node operation.
#[derive(Debug)]
pub struct NetworkClient {
    config: NetworkConfig,
    flags: Arc<LinkFlags>,
    attempted: bool,
    outbound: Option<mpsc::UnboundedSender<ClientMessage>>,
    snapshots: Option<mpsc::Receiver<Vec<BodySnapshot>>>,
    shutdown: Option<oneshot::Sender<()>>,
}

impl NetworkClient {
    pub fn new(config: NetworkConfig) -> Self {
        Self {
            config,
            flags: Arc::default(),
            attempted: false,
            outbound: None,
            snapshots: None,
            shutdown: None,
        }
    }

    /// Endpoints this client was built with.
    pub fn config(&self) -> &NetworkConfig {
        &self.config
    }

    /// Whether the link is currently open.
    pub fn available(&self) -> bool {
        self.flags.available.load(Ordering::SeqCst)
    }

    /// Whether the link failed and no retry has been requested since.
    pub fn gave_up(&self) -> bool {
        self.flags.gave_up.load(Ordering::SeqCst)
    }

    /// Unavailability notices emitted so far.
    pub fn notices(&self) -> usize {
        self.flags.notices.load(Ordering::SeqCst)
    }

    /// Start the single permitted connection attempt on the ambient tokio
    /// runtime. Returns the link task, or `None` if an attempt was already
    /// made or no runtime is available.
    pub fn connect(&mut self) -> Option<JoinHandle<()>> {
        if self.attempted {
            tracing::debug!("connection already attempted; reset_and_retry() to try again");
            return None;
        }
        self.attempted = true;

        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            self.flags.give_up(&NetError::NoRuntime);
            return None;
        };
        let (out_tx, out_rx) = mpsc::unbounded_channel();
        let (snap_tx, snap_rx) = mpsc::channel(self.config.snapshot_capacity.max(1));
        let (stop_tx, stop_rx) = oneshot::channel();
        self.outbound = Some(out_tx);
        self.snapshots = Some(snap_rx);
        self.shutdown = Some(stop_tx);

        let link = Link {
            config: self.config.clone(),
            flags: Arc::clone(&self.flags),
            outbound: out_rx,
            snapshots: snap_tx,
            stop: stop_rx,
        };
        Some(runtime.spawn(link.run()))
    }

    /// Drop any give-up state and make exactly one more attempt.
    pub fn reset_and_retry(&mut self) -> Option<JoinHandle<()>> {
        self.close();
        self.flags.gave_up.store(false, Ordering::SeqCst);
        self.flags.notice_logged.store(false, Ordering::SeqCst);
        self.attempted = false;
        self.connect()
    }

    /// Forward one controller input. Dropped silently when unavailable.
    pub fn send_input(&self, event: InputEvent) -> bool {
        if !self.available() {
            return false;
        }
        match &self.outbound {
            Some(tx) => tx.send(ClientMessage::Input(event)).is_ok(),
            None => false,
        }
    }

    /// Every snapshot received since the last call, oldest first. At most
    /// `snapshot_capacity` batches are held between calls.
    pub fn drain_snapshots(&mut self) -> Vec<BodySnapshot> {
        let mut out = Vec::new();
        if let Some(rx) = self.snapshots.as_mut() {
            while let Ok(batch) = rx.try_recv() {
                out.extend(batch);
            }
        }
        out
    }

    /// Wait for the next snapshot. `None` once the link has ended and the
    /// queue is empty.
    pub async fn recv_snapshot(&mut self) -> Option<Vec<BodySnapshot>> {
        self.snapshots.as_mut()?.recv().await
    }

    /// End the link without reporting it as a failure.
    pub fn close(&mut self) {
        if let Some(stop) = self.shutdown.take() {
            let _ = stop.send(());
        }
        self.outbound = None;
        self.flags.available.store(false, Ordering::SeqCst);
    }
}

/// The link task: probe, connect, then pump messages both ways.
struct Link {
    config: NetworkConfig,
    flags: Arc<LinkFlags>,
    outbound: mpsc::UnboundedReceiver<ClientMessage>,
    snapshots: mpsc::Sender<Vec<BodySnapshot>>,
    stop: oneshot::Receiver<()>,
}

impl Link {
    async fn run(mut self) {
        let socket = tokio::select! {
            _ = &mut self.stop => return,
            opened = open(&self.config) => match opened {
                Ok(socket) => socket,
                Err(err) => {
                    self.flags.give_up(&err);
                    return;
                }
            },
        };
        self.flags.available.store(true, Ordering::SeqCst);
        tracing::info!(url = %self.config.url, "connected to authoritative server");

        let (mut write, mut read) = socket.split();
        loop {
            tokio::select! {
                _ = &mut self.stop => {
                    self.flags.available.store(false, Ordering::SeqCst);
                    let _ = write.close().await;
                    tracing::debug!("link closed by host");
                    return;
                }
                outgoing = self.outbound.recv() => {
                    let Some(msg) = outgoing else {
                        return;
                    };
                    let text = match serde_json::to_string(&msg) {
                        Ok(text) => text,
                        Err(err) => {
                            tracing::warn!(error = %err, "failed to encode outbound message");
                            continue;
                        }
                    };
                    if let Err(err) = write.send(Message::text(text)).await {
                        self.flags.give_up(&NetError::WebSocket(err.to_string()));
                        return;
                    }
                }
                incoming = read.next() => match incoming {
                    Some(Ok(Message::Text(text))) => match ServerMessage::decode(text.as_str()) {
                        Ok(msg) => {
                            if let Err(mpsc::error::TrySendError::Full(_)) =
                                self.snapshots.try_send(msg.into_snapshots())
                            {
                                tracing::debug!("snapshot queue full, batch dropped");
                            }
                        }
                        Err(err) => tracing::warn!(error = %err, "malformed server message skipped"),
                    },
                    Some(Ok(Message::Close(_))) | None => {
                        self.flags.give_up(&NetError::Closed);
                        return;
                    }
                    Some(Ok(_)) => {}
                    Some(Err(err)) => {
                        self.flags.give_up(&NetError::WebSocket(err.to_string()));
                        return;
                    }
                },
            }
        }
    }
}

/// Probe the health endpoint, then open the websocket.
async fn open(config: &NetworkConfig) -> Result<Socket, NetError> {
    let limit = Duration::from_millis(config.probe_timeout_ms);
    let http = reqwest::Client::builder()
        .timeout(limit)
        .build()
        .map_err(|e| NetError::Probe(e.to_string()))?;

    let probe = async {
        let resp = http.get(&config.health_url).send().await?.error_for_status()?;
        Ok::<HealthStatus, reqwest::Error>(resp.json::<HealthStatus>().await?)
    };
    let health = match tokio::time::timeout(limit, probe).await {
        Err(_) => return Err(NetError::ProbeTimeout(limit)),
        Ok(Err(err)) if err.is_timeout() => return Err(NetError::ProbeTimeout(limit)),
        Ok(Err(err)) => return Err(NetError::Probe(err.to_string())),
        Ok(Ok(health)) => health,
    };
    if !health.ws {
        return Err(NetError::NoWebSocket);
    }

    let (socket, _response) = tokio_tungstenite::connect_async(config.url.as_str())
        .await
        .map_err(|e| NetError::WebSocket(e.to_string()))?;
    Ok(socket)
}
