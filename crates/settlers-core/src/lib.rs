//! Settlers - rule engine for a hex-tile settlement building game
//!
//! This crate provides the core game logic, including:
//! - Hex coordinate system and canonical corner/side keys
//! - Board generation with tiles, harbors, vertices and edges
//! - Player state and resource management
//! - Game state machine with full rule enforcement
//!
//! # Architecture
//!
//! The engine is synchronous and transport-agnostic. Every operation is a
//! `&mut GameState` method that validates before it mutates; hosting,
//! concurrency and persistence live in `settlers-server`.
//!
//! # Modules
//!
//! - [`hex`]: Coordinate system for hex tiles, vertices, and edges
//! - [`board`]: Game board, placement rules, production, longest road
//! - [`player`]: Player state, hands and development cards
//! - [`game`]: Game state machine
//! - [`actions`]: Serializable actions, events and outcomes
//! - [`snapshot`]: Read-only views and final standings
//! - [`bot`]: Simple automated players
//! - [`config`]: Game configuration

pub mod actions;
pub mod board;
pub mod bot;
pub mod config;
pub mod game;
pub mod hex;
pub mod player;
pub mod snapshot;

// Re-export commonly used types
pub use actions::{ActionOutcome, GameAction, GameEvent, TradeOffer};
pub use board::{
    Board, Building, BuildingKind, EdgeId, Harbor, PlayerId, Resource, Tile, TileType, VertexId,
};
pub use bot::{bot_discard, Bot, BotDifficulty};
pub use config::{ConfigError, GameConfig};
pub use game::{ErrorKind, GameError, GamePhase, GameState, SetupPlacing};
pub use hex::{EdgeKey, HexCoord, VertexKey};
pub use player::{DevelopmentCard, Player, PlayerColor, ResourceHand};
pub use snapshot::{GameSnapshot, Standing};
