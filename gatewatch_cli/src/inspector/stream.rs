//! Live capture feed: shared request store + reconnecting stream consumer
//!
//! The store owns the capture list and broadcasts every change to
//! subscribers. The consumer is an explicitly lifetimed task: `start()`
//! fetches the snapshot and opens the one stream connection for this
//! consumer, `stop()` tears it down deterministically — nothing fires after
//! `stop()` returns.

use super::list::CaptureList;
use crate::api::ApiClient;
use futures_util::StreamExt;
use gatewatch_common::{constants, CapturedRequest, StreamEvent};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::sync::{broadcast, watch, RwLock};
use tokio::task::JoinHandle;
use tokio_tungstenite::{connect_async, tungstenite::Message, MaybeTlsStream, WebSocketStream};

/// Changes broadcast to store subscribers
#[derive(Debug, Clone)]
pub enum StoreEvent {
    /// The snapshot fetch completed and was merged into the list
    SnapshotMerged { total: usize },

    /// A streamed capture was new and went to the front of the list
    NewRequest(CapturedRequest),

    /// A streamed capture re-emitted a known id and was updated in place
    Updated(CapturedRequest),
}

/// Store for the capture list with broadcast capability
pub struct RequestStore {
    list: RwLock<CaptureList>,
    broadcast_tx: broadcast::Sender<StoreEvent>,
}

impl RequestStore {
    pub fn new() -> Self {
        let (broadcast_tx, _) = broadcast::channel(100);
        Self {
            list: RwLock::new(CaptureList::new()),
            broadcast_tx,
        }
    }

    /// Merge the snapshot fetch and notify subscribers
    pub async fn merge_snapshot(&self, snapshot: Vec<CapturedRequest>) {
        let mut list = self.list.write().await;
        list.merge_snapshot(snapshot);
        let _ = self.broadcast_tx.send(StoreEvent::SnapshotMerged { total: list.len() });
    }

    /// Apply one streamed capture and notify subscribers
    pub async fn apply(&self, request: CapturedRequest) {
        let fresh = self.list.write().await.upsert(request.clone());
        let event = if fresh {
            StoreEvent::NewRequest(request)
        } else {
            StoreEvent::Updated(request)
        };
        let _ = self.broadcast_tx.send(event);
    }

    /// Get a copy of the current list, newest first
    pub async fn entries(&self) -> Vec<CapturedRequest> {
        self.list.read().await.entries().to_vec()
    }

    /// Find an entry by id or id prefix
    pub async fn find(&self, id: &str) -> Option<CapturedRequest> {
        self.list.read().await.find(id).cloned()
    }

    pub async fn len(&self) -> usize {
        self.list.read().await.len()
    }

    /// Subscribe to store changes
    pub fn subscribe(&self) -> broadcast::Receiver<StoreEvent> {
        self.broadcast_tx.subscribe()
    }
}

impl Default for RequestStore {
    fn default() -> Self {
        Self::new()
    }
}

/// Owned, explicitly lifetimed consumer of the capture feed
pub struct StreamConsumer {
    shutdown_tx: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl StreamConsumer {
    /// Fetch the snapshot and follow the live feed into `store`
    pub fn start(api: ApiClient, ws_url: String, store: Arc<RequestStore>) -> Self {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let task = tokio::spawn(run(api, ws_url, store, shutdown_rx));
        Self { shutdown_tx, task }
    }

    /// Tear the consumer down. The run loop observes the signal at its next
    /// suspension point and exits; by the time this returns no handler can
    /// fire anymore.
    pub async fn stop(self) {
        let _ = self.shutdown_tx.send(true);
        let _ = self.task.await;
    }
}

#[derive(Debug, PartialEq, Eq)]
enum StreamExit {
    Shutdown,
    Disconnected,
}

async fn run(
    api: ApiClient,
    ws_url: String,
    store: Arc<RequestStore>,
    mut shutdown: watch::Receiver<bool>,
) {
    // Snapshot first. A failure is logged and leaves the list unchanged;
    // the live feed still runs.
    tokio::select! {
        _ = shutdown.changed() => return,
        snapshot = api.pending_requests() => match snapshot {
            Ok(entries) => store.merge_snapshot(entries).await,
            Err(e) => tracing::warn!("Failed to fetch capture snapshot: {}", e),
        }
    }

    let mut attempts: u32 = 0;
    loop {
        if *shutdown.borrow() {
            return;
        }

        let connection = tokio::select! {
            _ = shutdown.changed() => return,
            connection = connect_async(ws_url.as_str()) => connection,
        };

        match connection {
            Ok((ws_stream, _)) => {
                tracing::debug!("Capture stream connected");
                attempts = 0;
                if read_stream(ws_stream, &store, &mut shutdown).await == StreamExit::Shutdown {
                    return;
                }
                tracing::debug!("Capture stream disconnected");
            }
            Err(e) => tracing::warn!("Capture stream connect failed: {}", e),
        }

        attempts += 1;
        if attempts >= constants::MAX_RECONNECT_ATTEMPTS {
            // Give up quietly; the analyst keeps whatever is in the list.
            tracing::warn!("Capture stream gave up after {} attempts", attempts);
            return;
        }

        tokio::select! {
            _ = shutdown.changed() => return,
            _ = tokio::time::sleep(Duration::from_millis(constants::RECONNECT_DELAY_MS)) => {}
        }
    }
}

async fn read_stream(
    ws_stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
    store: &RequestStore,
    shutdown: &mut watch::Receiver<bool>,
) -> StreamExit {
    let (_, mut read) = ws_stream.split();
    loop {
        tokio::select! {
            _ = shutdown.changed() => return StreamExit::Shutdown,
            message = read.next() => match message {
                Some(Ok(Message::Text(text))) => handle_message(text.as_str(), store).await,
                Some(Ok(Message::Close(_))) | None => return StreamExit::Disconnected,
                Some(Ok(_)) => {} // control frames are not part of the feed
                Some(Err(e)) => {
                    tracing::warn!("Capture stream error: {}", e);
                    return StreamExit::Disconnected;
                }
            }
        }
    }
}

/// Apply one feed message. Unrecognized events and malformed payloads are
/// dropped with a log line; neither can take the consumer down.
async fn handle_message(text: &str, store: &RequestStore) {
    match StreamEvent::parse(text) {
        Ok(StreamEvent::NewRequest(request)) => store.apply(request).await,
        Ok(StreamEvent::Ignored { event }) => tracing::debug!("Ignoring feed event: {}", event),
        Err(e) => tracing::warn!("Dropping malformed feed message: {}", e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message(id: u64, url: &str) -> String {
        format!(
            r#"{{"event":"new_request","data":{{"id":{},"method":"GET","url":"{}"}}}}"#,
            id, url
        )
    }

    #[tokio::test]
    async fn test_stream_messages_prepend_newest_first() {
        let store = RequestStore::new();
        store
            .merge_snapshot(vec![serde_json::from_str(
                r#"{"id":"old","method":"GET","url":"/old"}"#,
            )
            .unwrap()])
            .await;

        handle_message(&message(1, "/a"), &store).await;
        handle_message(&message(2, "/b"), &store).await;

        let ids: Vec<String> = store.entries().await.iter().map(|e| e.id.clone()).collect();
        assert_eq!(ids, ["2", "1", "old"]);
    }

    #[tokio::test]
    async fn test_unknown_event_leaves_list_unchanged() {
        let store = RequestStore::new();
        handle_message(&message(1, "/a"), &store).await;

        handle_message(r#"{"event":"ping"}"#, &store).await;
        handle_message("definitely not json", &store).await;

        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn test_reemitted_id_updates_in_place() {
        let store = RequestStore::new();
        let mut events = store.subscribe();

        handle_message(&message(1, "/a"), &store).await;
        handle_message(&message(1, "/a-rescored"), &store).await;

        assert_eq!(store.len().await, 1);
        assert_eq!(store.find("1").await.unwrap().url, "/a-rescored");

        assert!(matches!(events.recv().await, Ok(StoreEvent::NewRequest(_))));
        assert!(matches!(events.recv().await, Ok(StoreEvent::Updated(_))));
    }

    #[tokio::test]
    async fn test_stop_is_deterministic_without_a_backend() {
        let api = ApiClient::new("http://127.0.0.1:1");
        let store = Arc::new(RequestStore::new());
        let consumer = StreamConsumer::start(api, "ws://127.0.0.1:1/ws".to_string(), store.clone());

        consumer.stop().await;
        assert_eq!(store.len().await, 0);
    }
}
