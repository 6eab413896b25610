//! Relay client
//!
//! Maintains a long-lived WebSocket connection to a relay server.
//! Handles reconnection automatically with exponential backoff and
//! re-subscribes every live path once the link is back.
//!
//! A background task owns the socket. [`RemoteStore`] calls never block:
//! they register locally and hand a command to the task. Writes made while
//! offline are queued and sent after the next handshake.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard, Weak};
use std::time::Duration;

use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, info, warn};

use super::message::{ClientMessage, PeerId, ServerMessage};
use super::{ConnectionStatus, RemoteEvent, RemoteStore, Subscription, SubscriptionId};
use crate::error::SyncError;
use crate::inventory::InventoryChange;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;
type WsWrite = SplitSink<WsStream, Message>;
type WsRead = SplitStream<WsStream>;

/// Commands sent to the relay task
#[derive(Debug)]
enum Command {
    Subscribe { id: SubscriptionId, path: String },
    Unsubscribe { id: SubscriptionId },
    Write { path: String, change: InventoryChange },
    Shutdown,
}

/// Configuration for the relay connection
#[derive(Debug, Clone)]
pub struct RelayConfig {
    /// WebSocket URL, e.g. `ws://127.0.0.1:3030`
    pub url: String,
    /// Initial reconnect delay
    pub initial_reconnect_delay: Duration,
    /// Maximum reconnect delay
    pub max_reconnect_delay: Duration,
    /// How long to wait for the relay's welcome
    pub handshake_timeout: Duration,
}

impl RelayConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Self::default()
        }
    }
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            initial_reconnect_delay: Duration::from_secs(1),
            max_reconnect_delay: Duration::from_secs(30),
            handshake_timeout: Duration::from_secs(10),
        }
    }
}

/// Live subscriptions, shared between the handle and the task
#[derive(Default)]
struct Registry {
    subscriptions: HashMap<SubscriptionId, (String, mpsc::UnboundedSender<RemoteEvent>)>,
    next_id: SubscriptionId,
}

impl Registry {
    fn deliver(&mut self, id: SubscriptionId, event: RemoteEvent) {
        if let Some((_, tx)) = self.subscriptions.get(&id) {
            let _ = tx.send(event);
        }
    }

    fn broadcast(&mut self, event: RemoteEvent) {
        for (_, tx) in self.subscriptions.values() {
            let _ = tx.send(event.clone());
        }
    }
}

fn lock(registry: &Mutex<Registry>) -> MutexGuard<'_, Registry> {
    registry.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// [`RemoteStore`] backed by a relay server
///
/// Must be created inside a tokio runtime.
pub struct RelayClient {
    url: String,
    commands: mpsc::UnboundedSender<Command>,
    registry: Arc<Mutex<Registry>>,
    status_rx: watch::Receiver<ConnectionStatus>,
    task: Mutex<Option<JoinHandle<usize>>>,
}

impl RelayClient {
    /// Connect to `url` with default reconnect settings
    pub fn connect(url: &str) -> Self {
        Self::spawn(RelayConfig::new(url))
    }

    /// Spawn the background task for `config`
    pub fn spawn(config: RelayConfig) -> Self {
        let (commands, command_rx) = mpsc::unbounded_channel();
        let (status_tx, status_rx) = watch::channel(ConnectionStatus::Disconnected);
        let registry = Arc::new(Mutex::new(Registry::default()));

        let url = config.url.clone();
        let task = tokio::spawn(relay_task(config, registry.clone(), command_rx, status_tx));

        Self {
            url,
            commands,
            registry,
            status_rx,
            task: Mutex::new(Some(task)),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Wait until the handshake completes, up to `timeout`
    pub async fn wait_connected(&self, timeout: Duration) -> bool {
        let mut status_rx = self.status_rx.clone();
        let connected = status_rx.wait_for(|status| *status == ConnectionStatus::Connected);
        let reached = matches!(tokio::time::timeout(timeout, connected).await, Ok(Ok(_)));
        reached
    }

    /// Flush queued writes and close the connection
    ///
    /// Returns how many writes were still queued for an unreachable relay
    /// and had to be dropped.
    pub async fn shutdown(&self) -> usize {
        let _ = self.commands.send(Command::Shutdown);

        let task = self
            .task
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .take();
        match task {
            Some(task) => task.await.unwrap_or(0),
            None => 0,
        }
    }
}

impl Drop for RelayClient {
    fn drop(&mut self) {
        let _ = self.commands.send(Command::Shutdown);
    }
}

impl RemoteStore for RelayClient {
    fn subscribe(&self, path: &str) -> Result<Subscription, SyncError> {
        let (tx, rx) = mpsc::unbounded_channel();

        let id = {
            let mut registry = lock(&self.registry);
            let id = registry.next_id;
            registry.next_id += 1;
            registry.subscriptions.insert(id, (path.to_string(), tx));
            id
        };

        let subscribe = Command::Subscribe {
            id,
            path: path.to_string(),
        };
        if self.commands.send(subscribe).is_err() {
            lock(&self.registry).subscriptions.remove(&id);
            return Err(SyncError::Closed);
        }

        let registry: Weak<Mutex<Registry>> = Arc::downgrade(&self.registry);
        let commands = self.commands.clone();
        Ok(Subscription::new(id, path, rx, move |id| {
            if let Some(registry) = registry.upgrade() {
                lock(&registry).subscriptions.remove(&id);
            }
            let _ = commands.send(Command::Unsubscribe { id });
        }))
    }

    fn write(&self, path: &str, change: &InventoryChange) -> Result<(), SyncError> {
        self.commands
            .send(Command::Write {
                path: path.to_string(),
                change: change.clone(),
            })
            .map_err(|_| SyncError::Closed)
    }

    fn status(&self) -> ConnectionStatus {
        *self.status_rx.borrow()
    }
}

fn set_status(
    registry: &Mutex<Registry>,
    status_tx: &watch::Sender<ConnectionStatus>,
    status: ConnectionStatus,
) {
    let previous = status_tx.send_replace(status);
    if previous != status {
        debug!(%status, "Relay status changed");
        lock(registry).broadcast(RemoteEvent::Status(status));
    }
}

/// Main relay task loop with reconnection
///
/// Returns the number of queued writes dropped at shutdown.
async fn relay_task(
    config: RelayConfig,
    registry: Arc<Mutex<Registry>>,
    mut commands: mpsc::UnboundedReceiver<Command>,
    status_tx: watch::Sender<ConnectionStatus>,
) -> usize {
    let peer_id: PeerId = format!("catch-{}", &uuid::Uuid::new_v4().to_string()[..8]);
    let mut reconnect_delay = config.initial_reconnect_delay;
    let mut pending: Vec<(String, InventoryChange)> = Vec::new();

    loop {
        set_status(&registry, &status_tx, ConnectionStatus::Connecting);

        match connect_and_run(
            &config,
            &peer_id,
            &registry,
            &mut commands,
            &mut pending,
            &status_tx,
        )
        .await
        {
            Ok(true) => {
                set_status(&registry, &status_tx, ConnectionStatus::Disconnected);
                return 0;
            }
            Ok(false) => {
                info!(url = %config.url, "Relay closed the connection");
                reconnect_delay = config.initial_reconnect_delay;
            }
            Err(e) => {
                warn!(url = %config.url, error = %e, "Relay connection failed");
                lock(&registry).broadcast(RemoteEvent::Error(e.to_string()));
            }
        }

        set_status(&registry, &status_tx, ConnectionStatus::Disconnected);

        // Wait before reconnecting, queueing writes and watching for shutdown
        let backoff = tokio::time::sleep(reconnect_delay);
        tokio::pin!(backoff);
        loop {
            tokio::select! {
                _ = &mut backoff => break,
                cmd = commands.recv() => match cmd {
                    Some(Command::Shutdown) | None => {
                        if !pending.is_empty() {
                            warn!(count = pending.len(), "Dropping writes queued while offline");
                        }
                        return pending.len();
                    }
                    Some(Command::Write { path, change }) => pending.push((path, change)),
                    // The registry is replayed on reconnect
                    Some(Command::Subscribe { .. }) | Some(Command::Unsubscribe { .. }) => {}
                }
            }
        }
        reconnect_delay = (reconnect_delay * 2).min(config.max_reconnect_delay);
    }
}

/// Connect and pump messages until disconnection or shutdown
///
/// Returns `Ok(true)` when shutdown was requested.
async fn connect_and_run(
    config: &RelayConfig,
    peer_id: &str,
    registry: &Mutex<Registry>,
    commands: &mut mpsc::UnboundedReceiver<Command>,
    pending: &mut Vec<(String, InventoryChange)>,
    status_tx: &watch::Sender<ConnectionStatus>,
) -> Result<bool, SyncError> {
    let (ws_stream, _) =
        connect_async(config.url.as_str())
            .await
            .map_err(|e| SyncError::Connect {
                url: config.url.clone(),
                reason: e.to_string(),
            })?;
    let (mut write, mut read) = ws_stream.split();

    send(&mut write, &ClientMessage::hello(peer_id)).await?;
    wait_for_welcome(&mut read, config).await?;

    // Replay live subscriptions; the relay answers each with a snapshot.
    // Subscribe commands still queued for these ids are skipped below.
    let live: Vec<(SubscriptionId, String)> = lock(registry)
        .subscriptions
        .iter()
        .map(|(id, (path, _))| (*id, path.clone()))
        .collect();
    let mut sent: HashSet<SubscriptionId> = HashSet::new();
    for (id, path) in live {
        send(&mut write, &ClientMessage::Subscribe { id, path }).await?;
        sent.insert(id);
    }

    while !pending.is_empty() {
        let (path, change) = pending.remove(0);
        push_write(&mut write, path, change, pending).await?;
    }

    set_status(registry, status_tx, ConnectionStatus::Connected);

    loop {
        tokio::select! {
            cmd = commands.recv() => {
                match cmd {
                    Some(Command::Subscribe { id, path }) => {
                        if sent.insert(id) {
                            send(&mut write, &ClientMessage::Subscribe { id, path }).await?;
                        }
                    }
                    Some(Command::Unsubscribe { id }) => {
                        if sent.remove(&id) {
                            send(&mut write, &ClientMessage::Unsubscribe { id }).await?;
                        }
                    }
                    Some(Command::Write { path, change }) => {
                        push_write(&mut write, path, change, pending).await?;
                    }
                    Some(Command::Shutdown) | None => {
                        write.close().await.ok();
                        return Ok(true);
                    }
                }
            }

            msg = read.next() => {
                match msg {
                    Some(Ok(Message::Binary(data))) => handle_server_message(registry, &data),
                    Some(Ok(Message::Close(_))) | None => return Ok(false),
                    Some(Err(e)) => return Err(e.into()),
                    _ => {}
                }
            }
        }
    }
}

/// Send a write, keeping it queued if the link drops first
async fn push_write(
    write: &mut WsWrite,
    path: String,
    change: InventoryChange,
    pending: &mut Vec<(String, InventoryChange)>,
) -> Result<(), SyncError> {
    let msg = ClientMessage::Write { path, change };
    match send(write, &msg).await {
        Ok(()) => Ok(()),
        Err(e) => {
            if let ClientMessage::Write { path, change } = msg {
                pending.insert(0, (path, change));
            }
            Err(e)
        }
    }
}

async fn send(write: &mut WsWrite, msg: &ClientMessage) -> Result<(), SyncError> {
    write.send(Message::Binary(msg.encode()?)).await?;
    Ok(())
}

/// Route one server frame to its subscription
fn handle_server_message(registry: &Mutex<Registry>, data: &[u8]) {
    match ServerMessage::decode(data) {
        Ok(ServerMessage::Error { message }) => {
            warn!(%message, "Relay reported an error");
            lock(registry).broadcast(RemoteEvent::Error(message));
        }
        Ok(msg) => {
            if let Some((id, event)) = msg.into_event() {
                lock(registry).deliver(id, event);
            }
        }
        Err(e) => warn!(error = %e, "Ignoring undecodable relay frame"),
    }
}

/// Wait for the relay's handshake response
async fn wait_for_welcome(read: &mut WsRead, config: &RelayConfig) -> Result<PeerId, SyncError> {
    let timed_out = || SyncError::Connect {
        url: config.url.clone(),
        reason: "timeout waiting for relay. Check that the server is running.".to_string(),
    };

    let handshake = async {
        loop {
            match read.next().await {
                Some(Ok(Message::Binary(data))) => {
                    if let Ok(ServerMessage::Welcome { server_id, .. }) = ServerMessage::decode(&data)
                    {
                        debug!(%server_id, "Relay handshake complete");
                        return Ok(server_id);
                    }
                }
                Some(Ok(Message::Close(_))) | None => {
                    return Err(SyncError::Connect {
                        url: config.url.clone(),
                        reason: "relay closed connection during handshake".to_string(),
                    });
                }
                Some(Err(e)) => return Err(e.into()),
                _ => {}
            }
        }
    };

    tokio::time::timeout(config.handshake_timeout, handshake)
        .await
        .map_err(|_| timed_out())?
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = RelayConfig::new("ws://127.0.0.1:3030");
        assert_eq!(config.url, "ws://127.0.0.1:3030");
        assert_eq!(config.initial_reconnect_delay, Duration::from_secs(1));
        assert_eq!(config.max_reconnect_delay, Duration::from_secs(30));
    }

    #[test]
    fn test_registry_routes_by_id() {
        let mut registry = Registry::default();
        let (tx_a, mut rx_a) = mpsc::unbounded_channel();
        let (tx_b, mut rx_b) = mpsc::unbounded_channel();
        registry.subscriptions.insert(0, ("a/fishes".to_string(), tx_a));
        registry.subscriptions.insert(1, ("b/fishes".to_string(), tx_b));

        registry.deliver(1, RemoteEvent::Error("x".to_string()));
        assert!(rx_a.try_recv().is_err());
        assert!(rx_b.try_recv().is_ok());

        registry.broadcast(RemoteEvent::Status(ConnectionStatus::Connected));
        assert!(rx_a.try_recv().is_ok());
        assert!(rx_b.try_recv().is_ok());
    }

    #[tokio::test]
    async fn test_offline_client_keeps_working() {
        // Grab a free port, then close it so nothing is listening
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let client = RelayClient::connect(&format!("ws://{}", addr));
        let sub = client.subscribe("a/fishes").unwrap();

        let change = InventoryChange::Remove {
            key: crate::models::FishKey::new("fish1"),
        };
        assert!(client.write("a/fishes", &change).is_ok());
        assert!(!client.wait_connected(Duration::from_millis(200)).await);
        assert_ne!(client.status(), ConnectionStatus::Connected);

        drop(sub);
        let dropped = tokio::time::timeout(Duration::from_secs(5), client.shutdown())
            .await
            .unwrap();
        assert_eq!(dropped, 1);
        assert_eq!(client.shutdown().await, 0);
    }
}
