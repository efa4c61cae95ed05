use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{RwLock, broadcast, mpsc};
use uuid::Uuid;

use murmur_types::events::GatewayEvent;

/// Presence registry and event fan-out for all connected clients.
///
/// The identity -> connection map lives in this single process; a
/// multi-instance deployment would need it moved behind a shared external
/// store. Constructed once in main and handed to every consumer by clone
/// (cheap: one Arc).
#[derive(Clone)]
pub struct Dispatcher {
    inner: Arc<DispatcherInner>,
}

struct DispatcherInner {
    /// Global events (online snapshots, reaction fan-out) — every connected
    /// client receives every broadcast.
    broadcast_tx: broadcast::Sender<GatewayEvent>,

    /// Identity -> (conn_id, targeted sender). At most one live connection
    /// per identity; a reconnect overwrites the previous entry.
    connections: RwLock<HashMap<Uuid, (Uuid, mpsc::UnboundedSender<GatewayEvent>)>>,
}

impl Dispatcher {
    pub fn new() -> Self {
        let (broadcast_tx, _) = broadcast::channel(1024);
        Self {
            inner: Arc::new(DispatcherInner {
                broadcast_tx,
                connections: RwLock::new(HashMap::new()),
            }),
        }
    }

    /// Subscribe to global events. Returns a broadcast receiver.
    pub fn subscribe(&self) -> broadcast::Receiver<GatewayEvent> {
        self.inner.broadcast_tx.subscribe()
    }

    /// Broadcast an event to all connected clients.
    pub fn broadcast(&self, event: GatewayEvent) {
        let _ = self.inner.broadcast_tx.send(event);
    }

    /// Register an identity as online. Overwrites any previous connection for
    /// the same identity and broadcasts the refreshed online snapshot.
    /// Returns (conn_id, targeted receiver); the conn_id must be passed back
    /// to `disconnect` so a stale socket can never evict its replacement.
    pub async fn connect(&self, user_id: Uuid) -> (Uuid, mpsc::UnboundedReceiver<GatewayEvent>) {
        let conn_id = Uuid::new_v4();
        let (tx, rx) = mpsc::unbounded_channel();
        self.inner
            .connections
            .write()
            .await
            .insert(user_id, (conn_id, tx));

        self.broadcast_online_snapshot().await;
        (conn_id, rx)
    }

    /// Remove the identity's entry, but only if `conn_id` still owns it — a
    /// disconnect racing behind a reconnect must not delete the newer
    /// connection. Rebroadcasts the snapshot when an entry was removed.
    pub async fn disconnect(&self, user_id: Uuid, conn_id: Uuid) {
        let removed = {
            let mut connections = self.inner.connections.write().await;
            match connections.get(&user_id) {
                Some((stored, _)) if *stored == conn_id => {
                    connections.remove(&user_id);
                    true
                }
                _ => false,
            }
        };

        if removed {
            self.broadcast_online_snapshot().await;
        }
    }

    /// Targeted delivery. An absent or closed connection means the recipient
    /// will catch up on their next fetch — a no-op, never an error. Returns
    /// whether a live connection accepted the event.
    pub async fn send_to_user(&self, user_id: Uuid, event: GatewayEvent) -> bool {
        let connections = self.inner.connections.read().await;
        match connections.get(&user_id) {
            Some((_, tx)) => tx.send(event).is_ok(),
            None => false,
        }
    }

    /// Current snapshot of online identities.
    pub async fn online_users(&self) -> Vec<Uuid> {
        self.inner.connections.read().await.keys().copied().collect()
    }

    async fn broadcast_online_snapshot(&self) {
        let user_ids = self.online_users().await;
        self.broadcast(GatewayEvent::OnlineUsers { user_ids });
    }
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn snapshot_tracks_connects_and_disconnects() {
        let dispatcher = Dispatcher::new();
        let mut rx = dispatcher.subscribe();

        let x = Uuid::new_v4();
        let y = Uuid::new_v4();

        let (x_conn, _x_rx) = dispatcher.connect(x).await;
        let (_y_conn, _y_rx) = dispatcher.connect(y).await;
        dispatcher.disconnect(x, x_conn).await;

        // Three lifecycle events, each carrying the full snapshot.
        let snapshots: Vec<Vec<Uuid>> = (0..3)
            .map(|_| match rx.try_recv().unwrap() {
                GatewayEvent::OnlineUsers { user_ids } => user_ids,
                other => panic!("unexpected event: {other:?}"),
            })
            .collect();

        assert_eq!(snapshots[0], vec![x]);
        assert!(snapshots[1].contains(&x) && snapshots[1].contains(&y));
        assert_eq!(snapshots[2], vec![y], "x must be gone after its disconnect");
    }

    #[tokio::test]
    async fn stale_disconnect_does_not_evict_reconnect() {
        let dispatcher = Dispatcher::new();
        let user = Uuid::new_v4();

        let (old_conn, _old_rx) = dispatcher.connect(user).await;
        let (_new_conn, mut new_rx) = dispatcher.connect(user).await;

        // The old socket's teardown arrives after the reconnect.
        dispatcher.disconnect(user, old_conn).await;

        assert_eq!(dispatcher.online_users().await, vec![user]);

        // The surviving connection still receives targeted events.
        let delivered = dispatcher
            .send_to_user(
                user,
                GatewayEvent::MessagesSeen {
                    conversation_id: Uuid::new_v4(),
                },
            )
            .await;
        assert!(delivered);
        assert!(matches!(
            new_rx.recv().await,
            Some(GatewayEvent::MessagesSeen { .. })
        ));
    }

    #[tokio::test]
    async fn send_to_absent_user_is_a_noop() {
        let dispatcher = Dispatcher::new();
        let delivered = dispatcher
            .send_to_user(
                Uuid::new_v4(),
                GatewayEvent::Typing {
                    sender_id: Uuid::new_v4(),
                    is_typing: true,
                },
            )
            .await;
        assert!(!delivered);
    }
}
