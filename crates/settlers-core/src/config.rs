//! Game configuration.
//!
//! `GameConfig::default()` describes the standard game. Every field can be
//! overridden from JSON; missing fields fall back to the standard values.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::board::{Resource, TileType, BOARD_RADIUS};
use crate::hex::HexCoord;
use crate::player::DevelopmentCard;

/// Problems found while loading or validating a configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Malformed game config: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Tile counts add up to {found}, the board has {expected} cells")]
    TileCount { expected: usize, found: usize },

    #[error("Board needs exactly one desert, found {0}")]
    DesertCount(u32),

    #[error("Number token pool has {found} tokens for {expected} producing tiles")]
    TokenCount { expected: usize, found: usize },

    #[error("Number token {0} is not a valid dice total")]
    InvalidToken(u8),

    #[error("Player limits {min}..={max} are invalid")]
    PlayerLimits { min: u8, max: u8 },

    #[error("Victory point target must be at least 1")]
    VictoryTarget,

    #[error("{0} counts are too large")]
    CountOverflow(&'static str),

    #[error("Development deck holds {found} cards, at most {max} allowed")]
    DeckSize { max: u32, found: u32 },
}

/// Upper bound on the development deck size
pub const MAX_DEV_CARDS: u32 = 100;

/// How many tiles of each type go into the bag
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TileCounts {
    pub wood: u32,
    pub brick: u32,
    pub sheep: u32,
    pub wheat: u32,
    pub ore: u32,
    pub desert: u32,
}

impl Default for TileCounts {
    fn default() -> Self {
        Self {
            wood: 4,
            brick: 3,
            sheep: 4,
            wheat: 4,
            ore: 3,
            desert: 1,
        }
    }
}

impl TileCounts {
    /// Total number of tiles in the bag, None on overflow
    pub fn total(&self) -> Option<u32> {
        [self.wood, self.brick, self.sheep, self.wheat, self.ore, self.desert]
            .into_iter()
            .try_fold(0u32, |sum, n| sum.checked_add(n))
    }

    /// Number of tiles that will carry a dice number
    pub fn producing(&self) -> Option<u32> {
        self.total().map(|total| total - self.desert)
    }

    /// The unshuffled bag of tiles
    pub fn bag(&self) -> Vec<TileType> {
        let mut bag = Vec::with_capacity(self.total().unwrap_or_default() as usize);
        for (resource, count) in [
            (Resource::Wood, self.wood),
            (Resource::Brick, self.brick),
            (Resource::Sheep, self.sheep),
            (Resource::Wheat, self.wheat),
            (Resource::Ore, self.ore),
        ] {
            bag.extend(std::iter::repeat(TileType::Resource(resource)).take(count as usize));
        }
        bag.extend(std::iter::repeat(TileType::Desert).take(self.desert as usize));
        bag
    }
}

/// How many of each development card the deck holds
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DevCardCounts {
    pub knight: u32,
    pub victory_point: u32,
    pub road_building: u32,
    pub year_of_plenty: u32,
    pub monopoly: u32,
}

impl Default for DevCardCounts {
    fn default() -> Self {
        Self {
            knight: 14,
            victory_point: 5,
            road_building: 2,
            year_of_plenty: 2,
            monopoly: 2,
        }
    }
}

impl DevCardCounts {
    /// Cards in the deck, None on overflow
    pub fn total(&self) -> Option<u32> {
        [
            self.knight,
            self.victory_point,
            self.road_building,
            self.year_of_plenty,
            self.monopoly,
        ]
        .into_iter()
        .try_fold(0u32, |sum, n| sum.checked_add(n))
    }

    /// The unshuffled deck
    pub fn deck(&self) -> Vec<DevelopmentCard> {
        let mut deck = Vec::new();
        for (card, count) in [
            (DevelopmentCard::Knight, self.knight),
            (DevelopmentCard::VictoryPoint, self.victory_point),
            (DevelopmentCard::RoadBuilding, self.road_building),
            (DevelopmentCard::YearOfPlenty, self.year_of_plenty),
            (DevelopmentCard::Monopoly, self.monopoly),
        ] {
            deck.extend(std::iter::repeat(card).take(count as usize));
        }
        deck
    }
}

/// Everything that parameterizes a single game
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    /// Tile bag composition
    pub tile_counts: TileCounts,
    /// Number tokens, one per producing tile
    pub number_tokens: Vec<u8>,
    /// Development deck composition
    pub dev_cards: DevCardCounts,
    /// Points needed to win
    pub victory_points_to_win: u32,
    /// Seats available in the room
    pub max_players: u8,
    /// Seats that must be filled before the game can start
    pub min_players: u8,
    /// Hands strictly larger than this must discard on a 7
    pub discard_limit: u32,
    /// Fixed seed for every random decision in the game
    pub seed: Option<u64>,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            tile_counts: TileCounts::default(),
            number_tokens: vec![2, 3, 3, 4, 4, 5, 5, 6, 6, 8, 8, 9, 9, 10, 10, 11, 11, 12],
            dev_cards: DevCardCounts::default(),
            victory_points_to_win: 10,
            max_players: 4,
            min_players: 2,
            discard_limit: 7,
            seed: None,
        }
    }
}

impl GameConfig {
    /// Standard game with a fixed seed
    pub fn seeded(seed: u64) -> Self {
        Self {
            seed: Some(seed),
            ..Self::default()
        }
    }

    /// Parse and validate a JSON config
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: GameConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Check that the config describes a buildable game
    pub fn validate(&self) -> Result<(), ConfigError> {
        let cells = HexCoord::cells_within(BOARD_RADIUS).len();
        let found = self
            .tile_counts
            .total()
            .ok_or(ConfigError::CountOverflow("Tile"))? as usize;
        if found != cells {
            return Err(ConfigError::TileCount {
                expected: cells,
                found,
            });
        }
        if self.tile_counts.desert != 1 {
            return Err(ConfigError::DesertCount(self.tile_counts.desert));
        }

        let producing = self.tile_counts.producing().unwrap_or_default() as usize;
        if self.number_tokens.len() != producing {
            return Err(ConfigError::TokenCount {
                expected: producing,
                found: self.number_tokens.len(),
            });
        }
        if let Some(&bad) = self
            .number_tokens
            .iter()
            .find(|&&n| !(2..=12).contains(&n) || n == 7)
        {
            return Err(ConfigError::InvalidToken(bad));
        }

        // Four seat colors exist
        if self.min_players < 2 || self.min_players > self.max_players || self.max_players > 4 {
            return Err(ConfigError::PlayerLimits {
                min: self.min_players,
                max: self.max_players,
            });
        }
        if self.victory_points_to_win == 0 {
            return Err(ConfigError::VictoryTarget);
        }

        let deck = self
            .dev_cards
            .total()
            .ok_or(ConfigError::CountOverflow("Development card"))?;
        if deck > MAX_DEV_CARDS {
            return Err(ConfigError::DeckSize {
                max: MAX_DEV_CARDS,
                found: deck,
            });
        }
        Ok(())
    }
}
