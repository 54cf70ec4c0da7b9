use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{Mutex, broadcast};
use tracing::debug;

use crate::{dto::ws::RoomBroadcast, state::room::Room};

/// Broadcast channel capacity per room; slow subscribers lag, never block.
const ROOM_CHANNEL_CAPACITY: usize = 64;

/// One live room: its state behind a mutex and its fan-out channel.
///
/// The mutex serializes event dispatch per room: a handler completes its
/// synchronous mutation inside one lock scope, so room state never needs
/// finer-grained locking. Repository calls are made outside the lock.
pub struct RoomHandle {
    room: Mutex<Room>,
    events: broadcast::Sender<RoomBroadcast>,
}

impl RoomHandle {
    fn new(room: Room) -> Arc<Self> {
        let (events, _receiver) = broadcast::channel(ROOM_CHANNEL_CAPACITY);
        Arc::new(Self {
            room: Mutex::new(room),
            events,
        })
    }

    /// The serialized room state.
    pub fn room(&self) -> &Mutex<Room> {
        &self.room
    }

    /// Register a new subscriber receiving subsequent room events.
    pub fn subscribe(&self) -> broadcast::Receiver<RoomBroadcast> {
        self.events.subscribe()
    }

    /// Send an event to all current subscribers, ignoring delivery errors.
    pub fn broadcast(&self, event: RoomBroadcast) {
        let _ = self.events.send(event);
    }
}

/// Registry of live rooms keyed by normalized game code.
///
/// An explicit, injectable component rather than a process-wide static so
/// tests construct isolated instances.
#[derive(Default)]
pub struct RoomStore {
    rooms: DashMap<String, Arc<RoomHandle>>,
}

impl RoomStore {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Fetch the room registered under `code`, if live.
    pub fn get(&self, code: &str) -> Option<Arc<RoomHandle>> {
        self.rooms.get(code).map(|entry| entry.clone())
    }

    /// Fetch the room under `code`, creating it from `init` on first join.
    pub fn get_or_create(&self, code: &str, init: impl FnOnce() -> Room) -> Arc<RoomHandle> {
        self.rooms
            .entry(code.to_string())
            .or_insert_with(|| {
                debug!(code, "creating room");
                RoomHandle::new(init())
            })
            .clone()
    }

    /// Tear a room down, dropping its registry entry.
    ///
    /// Subscribers holding the `Arc` keep receiving until they observe the
    /// teardown broadcast and drop their receivers.
    pub fn remove(&self, code: &str) -> Option<Arc<RoomHandle>> {
        self.rooms.remove(code).map(|(_, handle)| handle)
    }

    /// Number of currently-live rooms.
    pub fn len(&self) -> usize {
        self.rooms.len()
    }

    /// Whether no rooms are live.
    pub fn is_empty(&self) -> bool {
        self.rooms.is_empty()
    }
}
