//! Relay server
//!
//! Exposes a [`MemoryRemote`] tree to [`RelayClient`](super::RelayClient)s
//! over WebSocket. Each connection gets its own task; each subscription a
//! connection opens gets a forwarding task that turns tree events into
//! server messages. Closing the connection aborts the forwarders, which
//! drops their subscriptions and deregisters them from the tree.

use std::collections::HashMap;
use std::io;
use std::net::SocketAddr;

use futures_util::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::accept_async;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, info, warn};

use super::memory::MemoryRemote;
use super::message::{ClientMessage, ServerMessage};
use super::{RemoteStore, Subscription, SubscriptionId};
use crate::error::SyncError;

/// Default bind address for `catch relay`
pub const DEFAULT_RELAY_BIND: &str = "127.0.0.1:3030";

/// Accept connections on `listener` forever, serving `tree`
pub async fn serve(listener: TcpListener, tree: MemoryRemote) -> io::Result<()> {
    let server_id = format!("relay-{}", &uuid::Uuid::new_v4().to_string()[..8]);
    info!(addr = ?listener.local_addr().ok(), %server_id, "Relay listening");

    loop {
        let (stream, addr) = listener.accept().await?;
        let tree = tree.clone();
        let server_id = server_id.clone();

        tokio::spawn(async move {
            debug!(%addr, "Relay connection opened");
            match handle_connection(stream, addr, tree, &server_id).await {
                Ok(()) => debug!(%addr, "Relay connection closed"),
                Err(e) => warn!(%addr, error = %e, "Relay connection ended with error"),
            }
        });
    }
}

/// Bridge one WebSocket connection to the tree
async fn handle_connection(
    stream: TcpStream,
    addr: SocketAddr,
    tree: MemoryRemote,
    server_id: &str,
) -> Result<(), SyncError> {
    let ws_stream = accept_async(stream).await?;
    let (mut write, mut read) = ws_stream.split();

    let (out_tx, mut out_rx) = mpsc::unbounded_channel::<ServerMessage>();
    let mut forwarders: HashMap<SubscriptionId, JoinHandle<()>> = HashMap::new();

    let result = loop {
        tokio::select! {
            outgoing = out_rx.recv() => {
                // out_tx lives in this scope, so the channel never closes here
                let Some(msg) = outgoing else { break Ok(()) };
                let bytes = match msg.encode() {
                    Ok(bytes) => bytes,
                    Err(e) => break Err(e),
                };
                if let Err(e) = write.send(Message::Binary(bytes)).await {
                    break Err(e.into());
                }
            }

            incoming = read.next() => {
                match incoming {
                    Some(Ok(Message::Binary(data))) => match ClientMessage::decode(&data) {
                        Ok(msg) => handle_client_message(msg, addr, &tree, server_id, &out_tx, &mut forwarders),
                        Err(e) => {
                            warn!(%addr, error = %e, "Undecodable client frame");
                            let _ = out_tx.send(ServerMessage::Error { message: e.to_string() });
                        }
                    },
                    Some(Ok(Message::Close(_))) | None => break Ok(()),
                    Some(Err(e)) => break Err(e.into()),
                    _ => {}
                }
            }
        }
    };

    for (_, forwarder) in forwarders {
        forwarder.abort();
    }

    result
}

fn handle_client_message(
    msg: ClientMessage,
    addr: SocketAddr,
    tree: &MemoryRemote,
    server_id: &str,
    out_tx: &mpsc::UnboundedSender<ServerMessage>,
    forwarders: &mut HashMap<SubscriptionId, JoinHandle<()>>,
) {
    match msg {
        ClientMessage::Hello { peer_id, version } => {
            info!(%addr, %peer_id, %version, "Peer joined");
            let _ = out_tx.send(ServerMessage::welcome(server_id));
        }
        ClientMessage::Subscribe { id, path } => match tree.subscribe(&path) {
            Ok(sub) => {
                debug!(%addr, id, %path, "Peer subscribed");
                let forwarder = tokio::spawn(forward(id, sub, out_tx.clone()));
                if let Some(previous) = forwarders.insert(id, forwarder) {
                    previous.abort();
                }
            }
            Err(e) => {
                let _ = out_tx.send(ServerMessage::Error {
                    message: e.to_string(),
                });
            }
        },
        ClientMessage::Unsubscribe { id } => {
            if let Some(forwarder) = forwarders.remove(&id) {
                debug!(%addr, id, "Peer unsubscribed");
                forwarder.abort();
            }
        }
        ClientMessage::Write { path, change } => {
            debug!(%addr, %path, op = change.kind(), "Peer write");
            if let Err(e) = tree.write(&path, &change) {
                let _ = out_tx.send(ServerMessage::Error {
                    message: e.to_string(),
                });
            }
        }
    }
}

/// Pump one subscription's events onto the connection
async fn forward(
    id: SubscriptionId,
    mut sub: Subscription,
    out_tx: mpsc::UnboundedSender<ServerMessage>,
) {
    while let Some(event) = sub.next().await {
        if let Some(msg) = ServerMessage::from_event(id, event) {
            if out_tx.send(msg).is_err() {
                break;
            }
        }
    }
}
