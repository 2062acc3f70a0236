//! Registry of live rooms.

use dashmap::DashMap;
use settlers_core::{GameConfig, GameState};
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

use crate::archive::GameArchive;
use crate::room::{Registry, RoomError, RoomHandle, RoomId};

/// Default bounded queue per room
pub const DEFAULT_QUEUE_DEPTH: usize = 32;

/// Creates, finds and destroys rooms
pub struct RoomManager {
    rooms: Registry,
    archive: Arc<dyn GameArchive>,
    queue_depth: usize,
}

impl RoomManager {
    pub fn new(archive: Arc<dyn GameArchive>) -> Self {
        Self {
            rooms: Arc::new(DashMap::new()),
            archive,
            queue_depth: DEFAULT_QUEUE_DEPTH,
        }
    }

    pub fn with_queue_depth(mut self, queue_depth: usize) -> Self {
        self.queue_depth = queue_depth;
        self
    }

    /// Open a lobby with the given rules. Must be called inside a tokio runtime.
    pub fn create(&self, config: GameConfig) -> Result<RoomId, RoomError> {
        let game = GameState::new(config)?;
        let id = Uuid::new_v4();
        let handle = RoomHandle::spawn(
            id,
            game,
            Arc::clone(&self.archive),
            self.queue_depth,
            Arc::clone(&self.rooms),
        );
        self.rooms.insert(id, handle);
        Ok(id)
    }

    pub fn get(&self, id: RoomId) -> Result<RoomHandle, RoomError> {
        self.rooms
            .get(&id)
            .map(|entry| entry.value().clone())
            .ok_or(RoomError::NotFound(id))
    }

    /// Stop a room and forget it
    pub async fn destroy(&self, id: RoomId) -> Result<(), RoomError> {
        let (_, handle) = self.rooms.remove(&id).ok_or(RoomError::NotFound(id))?;
        handle.close().await;
        info!(room = %id, "Room destroyed");
        Ok(())
    }

    pub fn room_ids(&self) -> Vec<RoomId> {
        self.rooms.iter().map(|entry| *entry.key()).collect()
    }

    pub fn len(&self) -> usize {
        self.rooms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rooms.is_empty()
    }
}
