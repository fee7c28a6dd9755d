use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use axum::extract::ws::{Message, WebSocket};
use dashmap::DashMap;
use futures_util::{SinkExt, StreamExt};
use tokio::sync::{mpsc, watch};
use tracing::{debug, info, warn};
use crate::config::TrackingConfig;
use crate::handlers::events::{ServerMessage, SocketMessage};
use crate::handlers::session_actor::TrackingSession;
use crate::map_view::{CommandMapView, MapCommand};
use crate::models::coordinate::Coordinate;
use crate::models::error::{PositionError, TrackerError};
use crate::storage::kv::SharedStore;
use crate::tracking::live_source::{LocationPlatform, WatchHandle, WatchOptions};
use crate::tracking::source::PositionSink;
use crate::tracking::task::AutoCancelTask;

/// Location sensing performed by the connected browser.
///
/// `watch` asks the client to start a geolocation watch. The fixes it streams
/// back are reported by the session, in socket order, to the sink of that
/// watch. Once cancelled, a watch's reports are dropped here.
pub struct BrowserGeolocation {
    supported: bool,
    outbound: mpsc::UnboundedSender<ServerMessage>,
    watches: DashMap<WatchHandle, PositionSink>,
    next_watch: AtomicU64,
}

impl BrowserGeolocation {
    pub fn new(supported: bool, outbound: mpsc::UnboundedSender<ServerMessage>) -> Self {
        Self { supported, outbound, watches: DashMap::new(), next_watch: AtomicU64::new(1) }
    }
}

impl LocationPlatform for BrowserGeolocation {
    fn watch(&self, options: WatchOptions, sink: PositionSink) -> Result<WatchHandle, TrackerError> {
        if !self.supported {
            return Err(TrackerError::PlatformUnsupported);
        }
        let watch_id = WatchHandle(self.next_watch.fetch_add(1, Ordering::Relaxed));
        self.watches.insert(watch_id, sink);
        self.outbound.send(ServerMessage::Watch { watch_id, options }).ok();
        Ok(watch_id)
    }

    fn cancel(&self, handle: WatchHandle) {
        if self.watches.remove(&handle).is_some() {
            self.outbound.send(ServerMessage::ClearWatch { watch_id: handle }).ok();
        }
    }

    fn report(&self, handle: WatchHandle, report: Result<Coordinate, PositionError>) {
        let Some(sink) = self.watches.get(&handle) else {
            debug!("Dropping report for closed watch {:?}", handle);
            return;
        };
        match report {
            Ok(position) => sink.update(position),
            Err(error) => sink.error(error),
        };
    }
}

/// Runs one websocket connection: a session actor plus the socket bridge.
/// Whichever side finishes first ends the connection and cancels the other.
pub async fn run_connection(socket: WebSocket, config: TrackingConfig, store: SharedStore, geolocation: bool) {
    let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
    let (status_tx, status_rx) = watch::channel(String::new());
    let (inbound_tx, inbound_rx) = mpsc::channel(64);

    let platform = Arc::new(BrowserGeolocation::new(geolocation, outbound_tx.clone()));
    let map_outbound = outbound_tx.clone();
    let map = CommandMapView::new(move |command: MapCommand| {
        map_outbound.send(ServerMessage::Map { command }).ok();
    });
    let (session, source_events) =
        TrackingSession::new(&config, platform.clone(), store, map, status_tx, outbound_tx.clone());

    let mut session_task = AutoCancelTask(tokio::spawn(session.run_actor(inbound_rx, source_events)));
    let socket_actor = WebsocketActor::new(socket, inbound_tx, outbound_tx, outbound_rx, status_rx);

    tokio::select! {
        _ = &mut session_task.0 => info!("Session ended"),
        _ = socket_actor.run_actor() => info!("Socket closed"),
    }
}

struct WebsocketActor {
    send_task: AutoCancelTask<()>,
    recv_task: AutoCancelTask<()>,
}

impl WebsocketActor {
    pub fn new(socket: WebSocket,
               inbound: mpsc::Sender<SocketMessage>,
               replies: mpsc::UnboundedSender<ServerMessage>,
               mut outbound: mpsc::UnboundedReceiver<ServerMessage>,
               mut status: watch::Receiver<String>) -> Self {
        let (mut ws_sender, mut ws_receiver) = socket.split();

        let inbound_task = tokio::spawn(async move {
            while let Some(Ok(msg)) = ws_receiver.next().await {
                let Message::Text(text) = msg else { continue };
                debug!("Received message from client: {}", text);
                match serde_json::from_str::<SocketMessage>(&text) {
                    Ok(message) => {
                        if inbound.send(message).await.is_err() {
                            break;
                        }
                    }
                    Err(e) => {
                        warn!("Rejecting client message: {}", e);
                        replies.send(ServerMessage::Rejected { reason: format!("Error deserializing message: {}", e) }).ok();
                    }
                }
            }
        });

        let outbound_task = tokio::spawn(async move {
            loop {
                let message = tokio::select! {
                    message = outbound.recv() => match message {
                        Some(message) => message,
                        None => break,
                    },
                    changed = status.changed() => match changed {
                        Ok(()) => ServerMessage::Status { text: status.borrow().clone() },
                        Err(_) => break,
                    },
                };
                let text = match serde_json::to_string(&message) {
                    Ok(text) => text,
                    Err(e) => {
                        warn!("Failed to encode {:?}: {}", message, e);
                        continue;
                    }
                };
                debug!("Sending message to client: {}", text);
                if ws_sender.send(Message::Text(text)).await.is_err() {
                    return;
                }
            }
            ws_sender.send(Message::Close(None)).await.ok();
        });

        Self {
            send_task: AutoCancelTask(outbound_task),
            recv_task: AutoCancelTask(inbound_task),
        }
    }

    pub async fn run_actor(mut self) {
        tokio::select! {
            _ = &mut self.send_task.0 => (),
            _ = &mut self.recv_task.0 => ()
        }
    }
}
