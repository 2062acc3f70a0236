//! Settlers room host.
//!
//! Runs each game as a serialized actor behind a `RoomHandle`, keeps the live
//! rooms in a `RoomManager` and hands finished games to a `GameArchive`.

pub mod archive;
pub mod config;
pub mod manager;
pub mod room;
pub mod sim;

pub use archive::{CompletedGame, GameArchive, LogArchive, MemoryArchive};
pub use config::{ServerConfig, ServerConfigError};
pub use manager::{RoomManager, DEFAULT_QUEUE_DEPTH};
pub use room::{Registry, RoomCommand, RoomError, RoomHandle, RoomId, Seat};
pub use sim::{run_simulation, SimulationError, SimulationReport};
