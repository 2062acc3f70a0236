//! Bot-only games driven through a room.

use serde::Serialize;
use settlers_core::{Bot, BotDifficulty, GamePhase, PlayerColor, PlayerId, Standing};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::config::{ServerConfig, ServerConfigError};
use crate::manager::RoomManager;
use crate::room::{RoomError, RoomId};

#[derive(Debug, Error)]
pub enum SimulationError {
    #[error(transparent)]
    Config(#[from] ServerConfigError),

    #[error(transparent)]
    Room(#[from] RoomError),

    #[error("No color left for seat {0}")]
    TooManyPlayers(u8),

    #[error("Bot for player {0} has no action")]
    Stalled(PlayerId),
}

/// Outcome of one simulated game
#[derive(Debug, Clone, Serialize)]
pub struct SimulationReport {
    pub room: RoomId,
    pub seed: u64,
    /// None when the turn limit ran out first
    pub winner: Option<PlayerId>,
    pub turns: u32,
    pub actions: u64,
    pub standings: Vec<Standing>,
}

/// Seat `config.players` builder bots in a fresh room and play until someone
/// wins or `config.max_turns` passes. The room is destroyed afterwards.
pub async fn run_simulation(
    manager: &RoomManager,
    config: &ServerConfig,
) -> Result<SimulationReport, SimulationError> {
    let mut game_config = config.load_game_config()?;
    let seed = game_config.seed.unwrap_or_else(rand::random);
    game_config.seed = Some(seed);

    let room_id = manager.create(game_config)?;
    let room = manager.get(room_id)?;
    info!(room = %room_id, seed, players = config.players, "Simulation starting");

    let mut seats = Vec::with_capacity(config.players as usize);
    let mut bots = Vec::with_capacity(config.players as usize);
    for seat in 0..config.players {
        let color = *PlayerColor::ALL
            .get(seat as usize)
            .ok_or(SimulationError::TooManyPlayers(seat))?;
        let joined = room.join(format!("Bot {}", seat + 1), color).await?;
        bots.push(Bot::with_seed(
            joined.player,
            BotDifficulty::Builder,
            seed.wrapping_add(u64::from(seat) + 1),
        ));
        seats.push(joined);
    }
    room.start().await?;

    let mut actions = 0u64;
    let (winner, turns) = loop {
        let snapshot = room.snapshot().await?;
        if let GamePhase::Finished { winner } = snapshot.phase {
            break (Some(winner), snapshot.turn_number);
        }
        if snapshot.turn_number > config.max_turns {
            warn!(room = %room_id, turns = snapshot.turn_number, "Turn limit reached");
            break (None, snapshot.turn_number);
        }

        let player = match &snapshot.phase {
            GamePhase::Discard { pending } => pending
                .keys()
                .next()
                .copied()
                .unwrap_or(snapshot.current_player),
            _ => snapshot.current_player,
        };
        let seat = player as usize;
        let (bot, action) = room.decide(seats[seat].session, bots[seat].clone()).await?;
        bots[seat] = bot;

        let action = action.ok_or(SimulationError::Stalled(player))?;
        debug!(room = %room_id, player, ?action, "Bot move");
        room.act(seats[seat].session, action).await?;
        actions += 1;
    };

    let standings = room.standings().await?;
    manager.destroy(room_id).await?;
    info!(room = %room_id, ?winner, turns, actions, "Simulation finished");

    Ok(SimulationReport {
        room: room_id,
        seed,
        winner,
        turns,
        actions,
        standings,
    })
}
