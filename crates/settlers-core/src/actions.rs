//! Game actions that players can take.
//!
//! This module defines all possible actions in the game, the events
//! that result from those actions, and the accepted/rejected outcome
//! handed back to whoever submitted them.

use crate::board::{EdgeId, PlayerId, Resource, VertexId};
use crate::game::GameError;
use crate::hex::HexCoord;
use crate::player::ResourceHand;
use serde::{Deserialize, Serialize};

/// All possible actions a player can take
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum GameAction {
    // ==================== Building ====================
    /// Place a settlement (free during setup)
    PlaceSettlement(VertexId),
    /// Place a road (free during setup, where it must touch this round's settlement)
    PlaceRoad(EdgeId),
    /// Upgrade a settlement to a city
    UpgradeToCity(VertexId),

    // ==================== Turn Actions ====================
    /// Roll the dice (must be done at start of turn)
    RollDice,

    // ==================== Robber Actions ====================
    /// Discard cards owed after a 7
    Discard(ResourceHand),
    /// Move the robber after a 7, optionally stealing from a player on the tile
    MoveRobber {
        tile: HexCoord,
        victim: Option<PlayerId>,
    },

    // ==================== Trading Actions ====================
    /// Offer resources to other players
    ProposeTrade(TradeOffer),
    /// Accept the outstanding offer
    AcceptTrade,
    /// Withdraw your own offer
    CancelTrade,
    /// Trade with the bank at the best owned harbor rate
    MaritimeTrade { give: Resource, receive: Resource },

    // ==================== Development Cards ====================
    /// Buy a development card from the deck
    BuyDevCard,
    /// Play a knight: move the robber, optionally steal
    PlayKnight {
        tile: HexCoord,
        victim: Option<PlayerId>,
    },
    /// Play road building (second road may be omitted with one road token left)
    PlayRoadBuilding(EdgeId, Option<EdgeId>),
    /// Play year of plenty (take 2 resources from bank)
    PlayYearOfPlenty(Resource, Resource),
    /// Play monopoly (take all of one resource from all players)
    PlayMonopoly(Resource),

    // ==================== Turn Management ====================
    /// End your turn
    EndTurn,
}

/// A trade offer between players
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TradeOffer {
    /// Player making the offer (filled in by the engine)
    pub from: PlayerId,
    /// Specific player to trade with, or None for open offer
    pub to: Option<PlayerId>,
    /// Resources being offered
    pub offering: ResourceHand,
    /// Resources being requested
    pub requesting: ResourceHand,
}

impl TradeOffer {
    /// Create a new trade offer
    pub fn new(
        from: PlayerId,
        to: Option<PlayerId>,
        offering: ResourceHand,
        requesting: ResourceHand,
    ) -> Self {
        Self {
            from,
            to,
            offering,
            requesting,
        }
    }

    /// Check if offer is valid (non-empty on both sides)
    pub fn is_valid(&self) -> bool {
        !self.offering.is_empty() && !self.requesting.is_empty()
    }

    /// Whether `player` is allowed to take this offer
    pub fn addressed_to(&self, player: PlayerId) -> bool {
        player != self.from && self.to.map_or(true, |to| to == player)
    }
}

/// Events that occur as a result of actions
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum GameEvent {
    /// Seats are locked and setup begins
    GameStarted { players: usize },

    /// Setup finished, regular turns begin
    SetupCompleted,

    /// Dice were rolled
    DiceRolled {
        player: PlayerId,
        roll: (u8, u8),
        total: u8,
    },

    /// Resources were handed out after a dice roll
    ResourcesDistributed {
        grants: Vec<(PlayerId, ResourceHand)>,
    },

    /// Second setup settlement paid out its neighbours
    SetupBonus {
        player: PlayerId,
        resources: ResourceHand,
    },

    /// A 7 was rolled and these players owe cards
    DiscardRequired { owed: Vec<(PlayerId, u32)> },

    /// Player had to discard cards
    CardsDiscarded { player: PlayerId, count: u32 },

    /// A settlement was built
    SettlementBuilt { player: PlayerId, vertex: VertexId },

    /// A settlement was upgraded to a city
    CityBuilt { player: PlayerId, vertex: VertexId },

    /// A road was built
    RoadBuilt { player: PlayerId, edge: EdgeId },

    /// The robber was moved
    RobberMoved {
        player: PlayerId,
        from: HexCoord,
        to: HexCoord,
    },

    /// A resource was stolen
    ResourceStolen {
        thief: PlayerId,
        victim: PlayerId,
        resource: Option<Resource>,
    },

    /// A development card was purchased
    DevelopmentCardPurchased { player: PlayerId },

    /// A knight was played
    KnightPlayed { player: PlayerId },

    /// Road building card was played
    RoadBuildingPlayed { player: PlayerId },

    /// Year of plenty card was played
    YearOfPlentyPlayed {
        player: PlayerId,
        resources: (Resource, Resource),
    },

    /// Monopoly card was played
    MonopolyPlayed {
        player: PlayerId,
        resource: Resource,
        total_stolen: u32,
    },

    /// A trade was proposed
    TradeProposed { offer: TradeOffer },

    /// A trade was completed
    TradeCompleted { proposer: PlayerId, acceptor: PlayerId },

    /// A trade was withdrawn or dropped at end of turn
    TradeCancelled { proposer: PlayerId },

    /// Maritime trade completed
    MaritimeTradeCompleted {
        player: PlayerId,
        gave: Resource,
        gave_count: u32,
        received: Resource,
    },

    /// Longest road changed hands
    LongestRoadChanged {
        previous: Option<PlayerId>,
        current: Option<PlayerId>,
        length: u32,
    },

    /// Largest army changed hands
    LargestArmyChanged {
        previous: Option<PlayerId>,
        current: Option<PlayerId>,
        knights: u32,
    },

    /// Turn ended
    TurnEnded {
        player: PlayerId,
        next_player: PlayerId,
    },

    /// A player won the game
    GameWon {
        player: PlayerId,
        victory_points: u32,
    },
}

/// Accepted/rejected verdict for one submitted action
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionOutcome {
    pub accepted: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl ActionOutcome {
    pub fn accepted() -> Self {
        Self {
            accepted: true,
            reason: None,
        }
    }

    pub fn rejected(error: &GameError) -> Self {
        Self {
            accepted: false,
            reason: Some(error.to_string()),
        }
    }
}

impl<T> From<&Result<T, GameError>> for ActionOutcome {
    fn from(result: &Result<T, GameError>) -> Self {
        match result {
            Ok(_) => Self::accepted(),
            Err(error) => Self::rejected(error),
        }
    }
}
