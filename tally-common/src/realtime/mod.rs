use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{broadcast, RwLock};
use uuid::Uuid;

/// Events queued per subscriber before the slowest listener starts losing
/// the oldest ones
const ROOM_CHANNEL_CAPACITY: usize = 64;

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum RoomId {
    /// Shared by every member of a joint account
    Account(Uuid),
    /// Private to a single user, for invites and other personal notices
    User(Uuid),
}

#[derive(Clone, Debug, Serialize)]
pub struct RoomEvent {
    pub event: &'static str,
    pub payload: serde_json::Value,
}

/// In-process registry of broadcast channels, one per active room. Rooms are
/// created lazily on first subscription and events published to rooms with no
/// listeners are dropped.
#[derive(Clone, Default)]
pub struct RoomRegistry {
    rooms: Arc<RwLock<HashMap<RoomId, broadcast::Sender<RoomEvent>>>>,
}

impl RoomRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn subscribe(&self, room: RoomId) -> broadcast::Receiver<RoomEvent> {
        if let Some(sender) = self.rooms.read().await.get(&room) {
            return sender.subscribe();
        }

        self.rooms
            .write()
            .await
            .entry(room)
            .or_insert_with(|| broadcast::channel(ROOM_CHANNEL_CAPACITY).0)
            .subscribe()
    }

    /// Returns the number of listeners the event reached.
    pub async fn publish(&self, room: RoomId, event: RoomEvent) -> usize {
        match self.rooms.read().await.get(&room) {
            Some(sender) => sender.send(event).unwrap_or(0),
            None => 0,
        }
    }

    /// Removes rooms whose last listener has disconnected. Returns the number
    /// of rooms dropped.
    pub async fn prune(&self) -> usize {
        let mut rooms = self.rooms.write().await;

        let room_count_before = rooms.len();
        rooms.retain(|_, sender| sender.receiver_count() != 0);

        room_count_before - rooms.len()
    }
}
