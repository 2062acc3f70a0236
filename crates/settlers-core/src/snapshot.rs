//! Read-only, serializable views of a game.
//!
//! The board keeps its graph behind precomputed indices; these types flatten
//! it into plain maps keyed by dense ids so a client can render it from JSON.

use crate::actions::TradeOffer;
use crate::board::{Building, BuildingKind, EdgeId, HarborPlacement, PlayerId, Tile, VertexId};
use crate::game::{GamePhase, GameState};
use crate::hex::HexCoord;
use crate::player::{PlayerColor, ResourceHand};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Everything a client needs to draw the table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameSnapshot {
    pub tiles: Vec<Tile>,
    pub vertices: BTreeMap<VertexId, VertexView>,
    pub edges: BTreeMap<EdgeId, EdgeView>,
    pub harbors: Vec<HarborPlacement>,
    pub robber: HexCoord,
    pub players: Vec<PlayerView>,
    pub phase: GamePhase,
    pub current_player: PlayerId,
    pub trade_offer: Option<TradeOffer>,
    pub dice_roll: Option<(u8, u8)>,
    pub turn_number: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VertexView {
    /// On-board cells around the corner
    pub tiles: Vec<HexCoord>,
    pub building: Option<BuildingView>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BuildingView {
    pub kind: BuildingKind,
    pub owner: PlayerId,
    pub color: PlayerColor,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EdgeView {
    /// The two cells the edge separates, including any off the board
    pub tiles: Vec<HexCoord>,
    pub endpoints: [VertexId; 2],
    pub road: Option<RoadView>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RoadView {
    pub owner: PlayerId,
    pub color: PlayerColor,
}

/// Public view of one seat. Hidden victory point cards are not counted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerView {
    pub id: PlayerId,
    pub name: String,
    pub color: PlayerColor,
    pub resources: ResourceHand,
    pub dev_cards: usize,
    pub played_knights: u32,
    pub settlements_remaining: u32,
    pub cities_remaining: u32,
    pub roads_remaining: u32,
    pub victory_points: u32,
    pub has_longest_road: bool,
    pub has_largest_army: bool,
}

/// Final result for one seat
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Standing {
    pub player: PlayerId,
    pub name: String,
    pub color: PlayerColor,
    /// Total points, hidden cards included
    pub victory_points: u32,
    pub settlements: u32,
    pub cities: u32,
    pub roads: u32,
    pub resources: ResourceHand,
}

impl GameState {
    /// Capture the current state for rendering or transport
    pub fn snapshot(&self) -> GameSnapshot {
        let color_of = |owner: PlayerId| {
            self.players
                .get(owner as usize)
                .map(|p| p.color)
                .unwrap_or(PlayerColor::Red)
        };

        let vertices = self
            .board
            .vertices()
            .iter()
            .map(|v| {
                let building = v.building.map(|Building { kind, owner }| BuildingView {
                    kind,
                    owner,
                    color: color_of(owner),
                });
                (
                    v.id,
                    VertexView {
                        tiles: v.tiles.clone(),
                        building,
                    },
                )
            })
            .collect();

        let edges = self
            .board
            .edges()
            .iter()
            .map(|e| {
                let road = e.road.map(|r| RoadView {
                    owner: r.owner,
                    color: color_of(r.owner),
                });
                (
                    e.id,
                    EdgeView {
                        tiles: e.key.cells().to_vec(),
                        endpoints: e.endpoints,
                        road,
                    },
                )
            })
            .collect();

        let players = self
            .players
            .iter()
            .map(|p| PlayerView {
                id: p.id,
                name: p.name.clone(),
                color: p.color,
                resources: p.resources.clone(),
                dev_cards: p.dev_cards.len() + p.dev_cards_bought_this_turn.len(),
                played_knights: p.played_knights,
                settlements_remaining: p.settlements_remaining,
                cities_remaining: p.cities_remaining,
                roads_remaining: p.roads_remaining,
                victory_points: p.visible_victory_points(),
                has_longest_road: p.has_longest_road,
                has_largest_army: p.has_largest_army,
            })
            .collect();

        GameSnapshot {
            tiles: self.board.tiles().to_vec(),
            vertices,
            edges,
            harbors: self.board.harbors().to_vec(),
            robber: self.board.robber(),
            players,
            phase: self.phase.clone(),
            current_player: self.current_player,
            trade_offer: self.trade_offer.clone(),
            dice_roll: self.dice_roll,
            turn_number: self.turn_number,
        }
    }

    /// Standings ordered by total points, ties broken by seat
    pub fn final_standings(&self) -> Vec<Standing> {
        let mut standings: Vec<Standing> = self
            .players
            .iter()
            .map(|p| Standing {
                player: p.id,
                name: p.name.clone(),
                color: p.color,
                victory_points: p.victory_points(),
                settlements: p.settlements_on_board(),
                cities: p.cities_built(),
                roads: p.roads_built(),
                resources: p.resources.clone(),
            })
            .collect();
        standings.sort_by(|a, b| {
            b.victory_points
                .cmp(&a.victory_points)
                .then(a.player.cmp(&b.player))
        });
        standings
    }
}

impl GamePhase {
    /// Short label for logs and archives
    pub fn label(&self) -> &'static str {
        match self {
            GamePhase::Lobby => "lobby",
            GamePhase::Setup { .. } => "setup",
            GamePhase::RollDice => "roll",
            GamePhase::Discard { .. } => "discard",
            GamePhase::MoveRobber => "robber",
            GamePhase::Main => "main",
            GamePhase::Trade => "trade",
            GamePhase::EndTurn => "end_turn",
            GamePhase::Finished { .. } => "finished",
        }
    }
}
