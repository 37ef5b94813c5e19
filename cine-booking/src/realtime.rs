use std::collections::HashMap;
use std::sync::Mutex;
use tokio::sync::broadcast;
use tracing::debug;
use uuid::Uuid;

use cine_domain::events::SeatsChanged;

const ROOM_CAPACITY: usize = 100;

/// Per-showing broadcast rooms for live seat-state deltas.
///
/// A room exists while it has watchers; viewers joining after an event do
/// not receive it retroactively and are expected to fetch authoritative
/// occupancy on join. Delivery is best-effort.
pub struct RoomHub {
    rooms: Mutex<HashMap<Uuid, broadcast::Sender<SeatsChanged>>>,
}

impl RoomHub {
    pub fn new() -> Self {
        Self {
            rooms: Mutex::new(HashMap::new()),
        }
    }

    /// Joins the room for a showing, creating it on first join.
    pub fn join(&self, showing_id: Uuid) -> broadcast::Receiver<SeatsChanged> {
        let mut rooms = self.rooms.lock().expect("room registry poisoned");
        let sender = rooms
            .entry(showing_id)
            .or_insert_with(|| broadcast::channel(ROOM_CAPACITY).0);
        debug!(%showing_id, watchers = sender.receiver_count() + 1, "watcher joined room");
        sender.subscribe()
    }

    /// Drops the room once its last receiver is gone. Receivers themselves
    /// are released by dropping them on the caller's side.
    pub fn leave(&self, showing_id: Uuid) {
        let mut rooms = self.rooms.lock().expect("room registry poisoned");
        if let Some(sender) = rooms.get(&showing_id) {
            if sender.receiver_count() == 0 {
                rooms.remove(&showing_id);
                debug!(%showing_id, "room emptied");
            }
        }
    }

    /// Fire-and-forget publish to current watchers of the showing. Returns
    /// how many watchers were reached; zero when nobody is watching.
    pub fn publish(&self, event: SeatsChanged) -> usize {
        let mut rooms = self.rooms.lock().expect("room registry poisoned");
        let Some(sender) = rooms.get(&event.showing_id) else {
            return 0;
        };

        match sender.send(event.clone()) {
            Ok(delivered) => delivered,
            Err(_) => {
                // No receivers left; reap the room
                rooms.remove(&event.showing_id);
                0
            }
        }
    }

    pub fn watcher_count(&self, showing_id: Uuid) -> usize {
        let rooms = self.rooms.lock().expect("room registry poisoned");
        rooms
            .get(&showing_id)
            .map(broadcast::Sender::receiver_count)
            .unwrap_or(0)
    }
}

impl Default for RoomHub {
    fn default() -> Self {
        Self::new()
    }
}
