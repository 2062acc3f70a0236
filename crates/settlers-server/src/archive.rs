//! Where finished games go.

use serde::{Deserialize, Serialize};
use settlers_core::{PlayerId, Standing};
use std::sync::{Arc, Mutex};
use tracing::info;

use crate::room::RoomId;

/// Record of one finished game
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletedGame {
    pub room: RoomId,
    pub winner: Option<PlayerId>,
    pub turns: u32,
    pub seed: Option<u64>,
    pub standings: Vec<Standing>,
}

/// Receives every finished game exactly once
pub trait GameArchive: Send + Sync {
    fn record(&self, game: CompletedGame);
}

/// Writes finished games to the log
#[derive(Debug, Default, Clone, Copy)]
pub struct LogArchive;

impl GameArchive for LogArchive {
    fn record(&self, game: CompletedGame) {
        let standings = serde_json::to_string(&game.standings).unwrap_or_default();
        info!(
            room = %game.room,
            winner = ?game.winner,
            turns = game.turns,
            %standings,
            "Game archived"
        );
    }
}

/// Keeps finished games in memory
#[derive(Debug, Default, Clone)]
pub struct MemoryArchive {
    games: Arc<Mutex<Vec<CompletedGame>>>,
}

impl MemoryArchive {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn games(&self) -> Vec<CompletedGame> {
        self.games.lock().map(|g| g.clone()).unwrap_or_default()
    }
}

impl GameArchive for MemoryArchive {
    fn record(&self, game: CompletedGame) {
        if let Ok(mut games) = self.games.lock() {
            games.push(game);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn test_memory_archive_shares_records() {
        let archive = MemoryArchive::new();
        let writer: Arc<dyn GameArchive> = Arc::new(archive.clone());
        writer.record(CompletedGame {
            room: Uuid::new_v4(),
            winner: Some(1),
            turns: 40,
            seed: Some(3),
            standings: Vec::new(),
        });

        let games = archive.games();
        assert_eq!(games.len(), 1);
        assert_eq!(games[0].winner, Some(1));
    }
}
