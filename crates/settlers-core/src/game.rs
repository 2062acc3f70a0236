//! Core game state machine.
//!
//! This module contains the main `GameState` struct and all game logic.
//! Every operation validates fully before it mutates anything, so a
//! rejected action leaves the state exactly as it was.

use crate::actions::{GameAction, GameEvent, TradeOffer};
use crate::board::{Board, EdgeId, PlayerId, Resource, VertexId};
use crate::config::{ConfigError, GameConfig};
use crate::hex::HexCoord;
use crate::player::{DevelopmentCard, DevelopmentDeck, Player, PlayerColor, ResourceHand};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use thiserror::Error;
use tracing::debug;

/// Minimum road length for Longest Road
pub const MIN_LONGEST_ROAD: u32 = 5;

/// Minimum knights for Largest Army
pub const MIN_LARGEST_ARMY: u32 = 3;

/// Game phase
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum GamePhase {
    /// Seats are still being filled
    Lobby,

    /// Initial placement phase
    Setup {
        /// Which round of setup (1 or 2)
        round: u8,
        /// What we're currently placing
        placing: SetupPlacing,
    },

    /// Before rolling dice at start of turn
    RollDice,

    /// Players must discard half their cards (rolled 7)
    Discard {
        /// Cards each player still owes
        pending: BTreeMap<PlayerId, u32>,
    },

    /// After a 7, the roller must move the robber
    MoveRobber,

    /// Main phase - can trade, build, buy dev cards, end turn
    Main,

    /// A trade offer is outstanding
    Trade,

    /// Turn is being handed over
    EndTurn,

    /// Game is over
    Finished { winner: PlayerId },
}

/// What we're placing during setup
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SetupPlacing {
    Settlement,
    Road,
}

/// Errors that can occur when applying actions
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum GameError {
    #[error("Not your turn")]
    NotYourTurn,

    #[error("Action not allowed in the current phase")]
    WrongPhase,

    #[error("Invalid placement location")]
    InvalidLocation,

    #[error("Cannot afford this")]
    CannotAfford,

    #[error("No pieces remaining")]
    NoPiecesRemaining,

    #[error("No development cards left in deck")]
    EmptyDeck,

    #[error("Don't have that card")]
    NoSuchCard,

    #[error("Card was bought this turn")]
    CardNotPlayable,

    #[error("Already played a development card this turn")]
    DevCardAlreadyPlayed,

    #[error("Invalid trade")]
    InvalidTrade,

    #[error("No active trade")]
    NoActiveTrade,

    #[error("A trade offer is already pending")]
    TradeAlreadyPending,

    #[error("Invalid discard")]
    InvalidDiscard,

    #[error("Cannot steal from that player")]
    InvalidVictim,

    #[error("Room is full")]
    RoomFull,

    #[error("Color already taken")]
    ColorTaken,

    #[error("Not enough players to start")]
    NotEnoughPlayers,

    #[error("Unknown reference: {0}")]
    InvalidReference(String),

    #[error("Game has not started")]
    NotStarted,

    #[error("Game is over")]
    GameOver,
}

/// Coarse grouping of `GameError` for callers that only care about the category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorKind {
    IllegalAction,
    NotYourTurn,
    WrongPhase,
    EmptyDeck,
    InvalidReference,
    Contract,
}

impl GameError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            GameError::NotYourTurn => ErrorKind::NotYourTurn,
            GameError::WrongPhase => ErrorKind::WrongPhase,
            GameError::EmptyDeck => ErrorKind::EmptyDeck,
            GameError::InvalidReference(_) => ErrorKind::InvalidReference,
            GameError::NotStarted | GameError::GameOver => ErrorKind::Contract,
            _ => ErrorKind::IllegalAction,
        }
    }
}

/// Per-player setup placements
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SetupProgress {
    pub settlements: u8,
    pub roads: u8,
    /// Settlement placed in the current setup round
    pub last_settlement: Option<VertexId>,
}

/// The complete game state
#[derive(Debug, Clone)]
pub struct GameState {
    /// Rules this game was created with
    pub config: GameConfig,
    /// The game board
    pub board: Board,
    /// All players, indexed by seat
    pub players: Vec<Player>,
    /// Current player index
    pub current_player: PlayerId,
    /// Current game phase
    pub phase: GamePhase,
    /// Setup placements per seat
    pub setup: Vec<SetupProgress>,
    /// Outstanding peer trade
    pub trade_offer: Option<TradeOffer>,
    /// Turn number (1 once setup completes)
    pub turn_number: u32,
    /// Completed passes around the table (1 once setup completes)
    pub round: u32,
    /// Last dice roll this turn
    pub dice_roll: Option<(u8, u8)>,
    /// Development card deck
    pub dev_deck: DevelopmentDeck,
    rng: StdRng,
}

impl GameState {
    /// Create a game in the lobby. The RNG is seeded from `config.seed` if set.
    pub fn new(config: GameConfig) -> Result<Self, ConfigError> {
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self::with_rng(config, rng)
    }

    /// Create a game in the lobby driven by the given RNG
    pub fn with_rng(config: GameConfig, mut rng: StdRng) -> Result<Self, ConfigError> {
        config.validate()?;
        let board = Board::generate(&config, &mut rng);
        let dev_deck = DevelopmentDeck::new(config.dev_cards.deck());

        Ok(Self {
            config,
            board,
            players: Vec::new(),
            current_player: 0,
            phase: GamePhase::Lobby,
            setup: Vec::new(),
            trade_offer: None,
            turn_number: 0,
            round: 0,
            dice_roll: None,
            dev_deck,
            rng,
        })
    }

    /// Get the number of players
    pub fn player_count(&self) -> usize {
        self.players.len()
    }

    /// Get a player by ID
    pub fn get_player(&self, id: PlayerId) -> Option<&Player> {
        self.players.get(id as usize)
    }

    /// Get the winner if the game is finished
    pub fn winner(&self) -> Option<PlayerId> {
        if let GamePhase::Finished { winner } = self.phase {
            Some(winner)
        } else {
            None
        }
    }

    /// True once the game is finished or anyone has reached the target
    pub fn is_game_over(&self) -> bool {
        matches!(self.phase, GamePhase::Finished { .. })
            || self
                .players
                .iter()
                .any(|p| p.victory_points() >= self.config.victory_points_to_win)
    }

    // ==================== Lobby ====================

    /// Seat a new player. Returns the seat index.
    pub fn add_player(&mut self, name: String, color: PlayerColor) -> Result<PlayerId, GameError> {
        if self.phase != GamePhase::Lobby {
            return Err(GameError::WrongPhase);
        }
        if self.players.len() >= self.config.max_players as usize {
            return Err(GameError::RoomFull);
        }
        if self.players.iter().any(|p| p.color == color) {
            return Err(GameError::ColorTaken);
        }

        let id = self.players.len() as PlayerId;
        debug!(player = id, %name, ?color, "Player joined");
        self.players.push(Player::new(id, name, color));
        Ok(id)
    }

    /// Remove a player before the game starts; later seats move up
    pub fn remove_player(&mut self, id: PlayerId) -> Result<(), GameError> {
        if self.phase != GamePhase::Lobby {
            return Err(GameError::WrongPhase);
        }
        self.ensure_seat(id)?;

        self.players.remove(id as usize);
        for (seat, player) in self.players.iter_mut().enumerate() {
            player.id = seat as PlayerId;
        }
        debug!(player = id, remaining = self.players.len(), "Player left");
        Ok(())
    }

    /// Close the lobby, shuffle the deck and begin setup
    pub fn start(&mut self) -> Result<Vec<GameEvent>, GameError> {
        if self.phase != GamePhase::Lobby {
            return Err(GameError::WrongPhase);
        }
        if self.players.len() < self.config.min_players as usize {
            return Err(GameError::NotEnoughPlayers);
        }

        self.dev_deck.shuffle(&mut self.rng);
        self.setup = vec![SetupProgress::default(); self.players.len()];
        self.current_player = 0;
        self.phase = GamePhase::Setup {
            round: 1,
            placing: SetupPlacing::Settlement,
        };
        debug!(players = self.players.len(), "Game started");
        Ok(vec![GameEvent::GameStarted {
            players: self.players.len(),
        }])
    }

    // ==================== Building ====================

    /// Place a settlement: free during setup, paid in the main phase
    pub fn place_settlement(
        &mut self,
        player: PlayerId,
        vertex: VertexId,
    ) -> Result<Vec<GameEvent>, GameError> {
        self.ensure_running()?;
        self.ensure_seat(player)?;
        self.board.vertex(vertex)?;
        self.ensure_current(player)?;

        let seat = player as usize;
        let mut events = Vec::new();
        match self.phase {
            GamePhase::Setup {
                round,
                placing: SetupPlacing::Settlement,
            } => {
                if !self.board.can_place_settlement(vertex, player, true) {
                    return Err(GameError::InvalidLocation);
                }
                if !self.players[seat].build_settlement(true) {
                    return Err(GameError::NoPiecesRemaining);
                }
                self.board.place_settlement(vertex, player);
                events.push(GameEvent::SettlementBuilt { player, vertex });

                let progress = &mut self.setup[seat];
                progress.settlements += 1;
                progress.last_settlement = Some(vertex);
                if progress.settlements == 2 {
                    let bonus = self.board.setup_bonus(vertex);
                    self.players[seat].resources.add_hand(&bonus);
                    events.push(GameEvent::SetupBonus {
                        player,
                        resources: bonus,
                    });
                }

                self.phase = GamePhase::Setup {
                    round,
                    placing: SetupPlacing::Road,
                };
            }
            GamePhase::Main => {
                if !self.board.can_place_settlement(vertex, player, false) {
                    return Err(GameError::InvalidLocation);
                }
                let p = &self.players[seat];
                if p.settlements_remaining == 0 {
                    return Err(GameError::NoPiecesRemaining);
                }
                if !p.can_afford_settlement() {
                    return Err(GameError::CannotAfford);
                }
                self.players[seat].build_settlement(false);
                self.board.place_settlement(vertex, player);
                events.push(GameEvent::SettlementBuilt { player, vertex });
            }
            _ => return Err(GameError::WrongPhase),
        }

        // A new settlement can cut an opponent's road
        self.check_longest_road(&mut events);
        Ok(self.finish_action(player, events))
    }

    /// Place a road: free during setup (touching this round's settlement), paid in the main phase
    pub fn place_road(&mut self, player: PlayerId, edge: EdgeId) -> Result<Vec<GameEvent>, GameError> {
        self.ensure_running()?;
        self.ensure_seat(player)?;
        let endpoints = self.board.edge(edge)?.endpoints;
        self.ensure_current(player)?;

        let seat = player as usize;
        let mut events = Vec::new();
        match self.phase {
            GamePhase::Setup {
                round,
                placing: SetupPlacing::Road,
            } => {
                let anchored = self.setup[seat]
                    .last_settlement
                    .is_some_and(|v| endpoints.contains(&v));
                if !anchored || !self.board.can_place_road(edge, player, true) {
                    return Err(GameError::InvalidLocation);
                }
                if !self.players[seat].build_road(true) {
                    return Err(GameError::NoPiecesRemaining);
                }
                self.board.place_road(edge, player);
                self.setup[seat].roads += 1;
                events.push(GameEvent::RoadBuilt { player, edge });
                self.advance_setup(round, &mut events);
            }
            GamePhase::Main => {
                if !self.board.can_place_road(edge, player, false) {
                    return Err(GameError::InvalidLocation);
                }
                let p = &self.players[seat];
                if p.roads_remaining == 0 {
                    return Err(GameError::NoPiecesRemaining);
                }
                if !p.can_afford_road() {
                    return Err(GameError::CannotAfford);
                }
                self.players[seat].build_road(false);
                self.board.place_road(edge, player);
                events.push(GameEvent::RoadBuilt { player, edge });
            }
            _ => return Err(GameError::WrongPhase),
        }

        self.check_longest_road(&mut events);
        Ok(self.finish_action(player, events))
    }

    /// Upgrade one of the player's settlements to a city
    pub fn upgrade_to_city(
        &mut self,
        player: PlayerId,
        vertex: VertexId,
    ) -> Result<Vec<GameEvent>, GameError> {
        self.ensure_running()?;
        self.ensure_seat(player)?;
        self.board.vertex(vertex)?;
        self.ensure_current(player)?;
        self.ensure_phase(GamePhase::Main)?;

        if !self.board.can_upgrade_to_city(vertex, player) {
            return Err(GameError::InvalidLocation);
        }
        let p = &self.players[player as usize];
        if p.cities_remaining == 0 {
            return Err(GameError::NoPiecesRemaining);
        }
        if !p.can_afford_city() {
            return Err(GameError::CannotAfford);
        }

        self.players[player as usize].build_city();
        self.board.upgrade_to_city(vertex);
        let events = vec![GameEvent::CityBuilt { player, vertex }];
        Ok(self.finish_action(player, events))
    }

    // ==================== Dice and Robber ====================

    /// Roll two dice with the game RNG
    pub fn roll_dice(&mut self, player: PlayerId) -> Result<Vec<GameEvent>, GameError> {
        self.ensure_running()?;
        self.ensure_seat(player)?;
        self.ensure_current(player)?;
        self.ensure_phase(GamePhase::RollDice)?;

        let d1 = self.rng.gen_range(1..=6);
        let d2 = self.rng.gen_range(1..=6);
        let events = self.resolve_roll(player, d1, d2);
        Ok(self.finish_action(player, events))
    }

    /// Apply the outcome of a roll
    fn resolve_roll(&mut self, player: PlayerId, d1: u8, d2: u8) -> Vec<GameEvent> {
        let total = d1 + d2;
        self.players[player as usize].has_rolled = true;
        self.dice_roll = Some((d1, d2));

        let mut events = vec![GameEvent::DiceRolled {
            player,
            roll: (d1, d2),
            total,
        }];

        if total == 7 {
            let limit = self.config.discard_limit;
            let pending: BTreeMap<PlayerId, u32> = self
                .players
                .iter()
                .filter(|p| p.resources.total() > limit)
                .map(|p| (p.id, p.resources.total() / 2))
                .collect();

            if pending.is_empty() {
                self.phase = GamePhase::MoveRobber;
            } else {
                events.push(GameEvent::DiscardRequired {
                    owed: pending.iter().map(|(&p, &n)| (p, n)).collect(),
                });
                self.phase = GamePhase::Discard { pending };
            }
        } else {
            let grants = self.board.distribute(total);
            for (&owner, hand) in &grants {
                self.players[owner as usize].resources.add_hand(hand);
            }
            if !grants.is_empty() {
                events.push(GameEvent::ResourcesDistributed {
                    grants: grants.into_iter().collect(),
                });
            }
            self.phase = GamePhase::Main;
        }

        debug!(player, total, phase = ?self.phase, "Dice rolled");
        events
    }

    /// Give back the cards owed after a 7
    pub fn discard(
        &mut self,
        player: PlayerId,
        hand: ResourceHand,
    ) -> Result<Vec<GameEvent>, GameError> {
        self.ensure_running()?;
        self.ensure_seat(player)?;

        let GamePhase::Discard { pending } = &mut self.phase else {
            return Err(GameError::WrongPhase);
        };
        let Some(&owed) = pending.get(&player) else {
            return Err(GameError::NotYourTurn);
        };
        let resources = &mut self.players[player as usize].resources;
        if hand.total() != owed || !resources.try_pay(&hand) {
            return Err(GameError::InvalidDiscard);
        }

        pending.remove(&player);
        if pending.is_empty() {
            self.phase = GamePhase::MoveRobber;
        }

        let events = vec![GameEvent::CardsDiscarded {
            player,
            count: owed,
        }];
        Ok(self.finish_action(player, events))
    }

    /// Move the robber after a 7, optionally stealing from a player on the tile
    pub fn move_robber(
        &mut self,
        player: PlayerId,
        tile: HexCoord,
        victim: Option<PlayerId>,
    ) -> Result<Vec<GameEvent>, GameError> {
        self.ensure_running()?;
        self.ensure_seat(player)?;
        self.board.tile(tile)?;
        if let Some(v) = victim {
            self.ensure_seat(v)?;
        }
        self.ensure_current(player)?;
        self.ensure_phase(GamePhase::MoveRobber)?;
        self.validate_robber_target(player, tile, victim)?;

        let events = self.relocate_robber(player, tile, victim);
        self.phase = GamePhase::Main;
        Ok(self.finish_action(player, events))
    }

    fn validate_robber_target(
        &self,
        player: PlayerId,
        tile: HexCoord,
        victim: Option<PlayerId>,
    ) -> Result<(), GameError> {
        if tile == self.board.robber() {
            return Err(GameError::InvalidLocation);
        }
        if let Some(v) = victim {
            if v == player || !self.board.players_adjacent_to_tile(tile).contains(&v) {
                return Err(GameError::InvalidVictim);
            }
        }
        Ok(())
    }

    fn relocate_robber(
        &mut self,
        player: PlayerId,
        tile: HexCoord,
        victim: Option<PlayerId>,
    ) -> Vec<GameEvent> {
        let from = self.board.robber();
        self.board.move_robber(tile);
        let mut events = vec![GameEvent::RobberMoved {
            player,
            from,
            to: tile,
        }];

        if let Some(victim) = victim {
            let stolen = self.players[victim as usize]
                .resources
                .steal_random(&mut self.rng);
            if let Some(resource) = stolen {
                self.players[player as usize].resources.add(resource, 1);
            }
            events.push(GameEvent::ResourceStolen {
                thief: player,
                victim,
                resource: stolen,
            });
        }
        events
    }

    // ==================== Trading ====================

    /// Put an offer on the table. The proposer is always the caller.
    pub fn propose_trade(
        &mut self,
        player: PlayerId,
        mut offer: TradeOffer,
    ) -> Result<Vec<GameEvent>, GameError> {
        self.ensure_running()?;
        self.ensure_seat(player)?;
        if let Some(to) = offer.to {
            self.ensure_seat(to)?;
        }
        self.ensure_current(player)?;
        match self.phase {
            GamePhase::Main => {}
            GamePhase::Trade => return Err(GameError::TradeAlreadyPending),
            _ => return Err(GameError::WrongPhase),
        }

        if !offer.is_valid() || offer.to == Some(player) {
            return Err(GameError::InvalidTrade);
        }
        if !self.players[player as usize].resources.can_afford(&offer.offering) {
            return Err(GameError::CannotAfford);
        }

        offer.from = player;
        self.trade_offer = Some(offer.clone());
        self.phase = GamePhase::Trade;
        Ok(self.finish_action(player, vec![GameEvent::TradeProposed { offer }]))
    }

    /// Take the outstanding offer
    pub fn accept_trade(&mut self, player: PlayerId) -> Result<Vec<GameEvent>, GameError> {
        self.ensure_running()?;
        self.ensure_seat(player)?;
        let offer = match (&self.phase, &self.trade_offer) {
            (GamePhase::Trade, Some(offer)) => offer.clone(),
            _ => return Err(GameError::NoActiveTrade),
        };
        if !offer.addressed_to(player) {
            return Err(GameError::InvalidTrade);
        }
        if !self.players[player as usize]
            .resources
            .can_afford(&offer.requesting)
            || !self.players[offer.from as usize]
                .resources
                .can_afford(&offer.offering)
        {
            return Err(GameError::CannotAfford);
        }

        // Both hands were checked above
        let proposer = &mut self.players[offer.from as usize].resources;
        let paid = proposer.try_pay(&offer.offering);
        debug_assert!(paid, "proposer can no longer cover the offer");
        proposer.add_hand(&offer.requesting);
        let acceptor = &mut self.players[player as usize].resources;
        let paid = acceptor.try_pay(&offer.requesting);
        debug_assert!(paid, "acceptor can no longer cover the request");
        acceptor.add_hand(&offer.offering);

        self.trade_offer = None;
        self.phase = GamePhase::Main;
        let events = vec![GameEvent::TradeCompleted {
            proposer: offer.from,
            acceptor: player,
        }];
        Ok(self.finish_action(player, events))
    }

    /// Withdraw the caller's own offer
    pub fn cancel_trade(&mut self, player: PlayerId) -> Result<Vec<GameEvent>, GameError> {
        self.ensure_running()?;
        self.ensure_seat(player)?;
        let proposer = match (&self.phase, &self.trade_offer) {
            (GamePhase::Trade, Some(offer)) => offer.from,
            _ => return Err(GameError::NoActiveTrade),
        };
        if proposer != player {
            return Err(GameError::NotYourTurn);
        }

        self.trade_offer = None;
        self.phase = GamePhase::Main;
        Ok(self.finish_action(player, vec![GameEvent::TradeCancelled { proposer }]))
    }

    /// Trade with the bank at the best rate the player's harbors allow
    pub fn maritime_trade(
        &mut self,
        player: PlayerId,
        give: Resource,
        receive: Resource,
    ) -> Result<Vec<GameEvent>, GameError> {
        self.ensure_running()?;
        self.ensure_seat(player)?;
        self.ensure_current(player)?;
        self.ensure_phase(GamePhase::Main)?;

        if give == receive {
            return Err(GameError::InvalidTrade);
        }
        let rate = self.board.maritime_rate(player, give);
        let resources = &mut self.players[player as usize].resources;
        if !resources.try_pay(&ResourceHand::single(give, rate)) {
            return Err(GameError::CannotAfford);
        }
        resources.add(receive, 1);

        let events = vec![GameEvent::MaritimeTradeCompleted {
            player,
            gave: give,
            gave_count: rate,
            received: receive,
        }];
        Ok(self.finish_action(player, events))
    }

    // ==================== Development Cards ====================

    /// Buy the top card of the deck
    pub fn buy_dev_card(&mut self, player: PlayerId) -> Result<Vec<GameEvent>, GameError> {
        self.ensure_running()?;
        self.ensure_seat(player)?;
        self.ensure_current(player)?;
        self.ensure_phase(GamePhase::Main)?;

        if !self.players[player as usize].can_afford_dev_card() {
            return Err(GameError::CannotAfford);
        }
        let Some(card) = self.dev_deck.draw() else {
            return Err(GameError::EmptyDeck);
        };
        self.players[player as usize].buy_dev_card(card);

        let events = vec![GameEvent::DevelopmentCardPurchased { player }];
        Ok(self.finish_action(player, events))
    }

    /// Play a knight, before the roll or in the main phase
    pub fn play_knight(
        &mut self,
        player: PlayerId,
        tile: HexCoord,
        victim: Option<PlayerId>,
    ) -> Result<Vec<GameEvent>, GameError> {
        self.ensure_running()?;
        self.ensure_seat(player)?;
        self.board.tile(tile)?;
        if let Some(v) = victim {
            self.ensure_seat(v)?;
        }
        self.ensure_current(player)?;
        if !matches!(self.phase, GamePhase::RollDice | GamePhase::Main) {
            return Err(GameError::WrongPhase);
        }
        self.ensure_dev_card(player, DevelopmentCard::Knight)?;
        self.validate_robber_target(player, tile, victim)?;

        self.players[player as usize].play_dev_card(DevelopmentCard::Knight);
        let mut events = vec![GameEvent::KnightPlayed { player }];
        events.extend(self.relocate_robber(player, tile, victim));
        self.check_largest_army(player, &mut events);
        Ok(self.finish_action(player, events))
    }

    /// Build up to two roads for free
    pub fn play_road_building(
        &mut self,
        player: PlayerId,
        first: EdgeId,
        second: Option<EdgeId>,
    ) -> Result<Vec<GameEvent>, GameError> {
        self.ensure_running()?;
        self.ensure_seat(player)?;
        self.board.edge(first)?;
        if let Some(e) = second {
            self.board.edge(e)?;
        }
        self.ensure_current(player)?;
        self.ensure_phase(GamePhase::Main)?;
        self.ensure_dev_card(player, DevelopmentCard::RoadBuilding)?;

        let remaining = self.players[player as usize].roads_remaining;
        let needed = if second.is_some() { 2 } else { 1 };
        if remaining < needed {
            return Err(GameError::NoPiecesRemaining);
        }
        // Only a player down to their last road may build just one
        if second.is_none() && remaining > 1 {
            return Err(GameError::InvalidLocation);
        }

        let board = &self.board;
        let legal = match second {
            None => board.can_place_road(first, player, false),
            Some(second) => {
                second != first
                    && ((board.can_place_road(first, player, false)
                        && board.can_place_road_with(second, player, false, &[first]))
                        || (board.can_place_road(second, player, false)
                            && board.can_place_road_with(first, player, false, &[second])))
            }
        };
        if !legal {
            return Err(GameError::InvalidLocation);
        }

        self.players[player as usize].play_dev_card(DevelopmentCard::RoadBuilding);
        let mut events = vec![GameEvent::RoadBuildingPlayed { player }];
        for edge in std::iter::once(first).chain(second) {
            self.players[player as usize].build_road(true);
            self.board.place_road(edge, player);
            events.push(GameEvent::RoadBuilt { player, edge });
        }
        self.check_longest_road(&mut events);
        Ok(self.finish_action(player, events))
    }

    /// Take any two resources from the bank
    pub fn play_year_of_plenty(
        &mut self,
        player: PlayerId,
        first: Resource,
        second: Resource,
    ) -> Result<Vec<GameEvent>, GameError> {
        self.ensure_running()?;
        self.ensure_seat(player)?;
        self.ensure_current(player)?;
        self.ensure_phase(GamePhase::Main)?;
        self.ensure_dev_card(player, DevelopmentCard::YearOfPlenty)?;

        let p = &mut self.players[player as usize];
        p.play_dev_card(DevelopmentCard::YearOfPlenty);
        p.resources.add(first, 1);
        p.resources.add(second, 1);

        let events = vec![GameEvent::YearOfPlentyPlayed {
            player,
            resources: (first, second),
        }];
        Ok(self.finish_action(player, events))
    }

    /// Collect every opponent's units of one resource
    pub fn play_monopoly(
        &mut self,
        player: PlayerId,
        resource: Resource,
    ) -> Result<Vec<GameEvent>, GameError> {
        self.ensure_running()?;
        self.ensure_seat(player)?;
        self.ensure_current(player)?;
        self.ensure_phase(GamePhase::Main)?;
        self.ensure_dev_card(player, DevelopmentCard::Monopoly)?;

        self.players[player as usize].play_dev_card(DevelopmentCard::Monopoly);
        let total_stolen: u32 = self
            .players
            .iter_mut()
            .filter(|p| p.id != player)
            .map(|p| p.resources.take_all(resource))
            .sum();
        self.players[player as usize]
            .resources
            .add(resource, total_stolen);

        let events = vec![GameEvent::MonopolyPlayed {
            player,
            resource,
            total_stolen,
        }];
        Ok(self.finish_action(player, events))
    }

    // ==================== Turn Management ====================

    /// Hand the turn to the next seat
    pub fn end_turn(&mut self, player: PlayerId) -> Result<Vec<GameEvent>, GameError> {
        self.ensure_running()?;
        self.ensure_seat(player)?;
        self.ensure_current(player)?;
        if !matches!(self.phase, GamePhase::Main | GamePhase::Trade) {
            return Err(GameError::WrongPhase);
        }

        let mut events = Vec::new();
        if let Some(offer) = self.trade_offer.take() {
            events.push(GameEvent::TradeCancelled {
                proposer: offer.from,
            });
        }

        self.phase = GamePhase::EndTurn;
        self.players[player as usize].end_turn();

        let next = ((player as usize + 1) % self.players.len()) as PlayerId;
        if next == 0 {
            self.round += 1;
        }
        self.turn_number += 1;
        self.current_player = next;
        self.dice_roll = None;
        self.phase = GamePhase::RollDice;

        events.push(GameEvent::TurnEnded {
            player,
            next_player: next,
        });
        debug!(player, next_player = next, turn = self.turn_number, "Turn ended");
        Ok(self.finish_action(player, events))
    }

    /// Apply an action to the game state
    pub fn apply_action(
        &mut self,
        player: PlayerId,
        action: GameAction,
    ) -> Result<Vec<GameEvent>, GameError> {
        let result = match action.clone() {
            GameAction::PlaceSettlement(vertex) => self.place_settlement(player, vertex),
            GameAction::PlaceRoad(edge) => self.place_road(player, edge),
            GameAction::UpgradeToCity(vertex) => self.upgrade_to_city(player, vertex),
            GameAction::RollDice => self.roll_dice(player),
            GameAction::Discard(hand) => self.discard(player, hand),
            GameAction::MoveRobber { tile, victim } => self.move_robber(player, tile, victim),
            GameAction::ProposeTrade(offer) => self.propose_trade(player, offer),
            GameAction::AcceptTrade => self.accept_trade(player),
            GameAction::CancelTrade => self.cancel_trade(player),
            GameAction::MaritimeTrade { give, receive } => {
                self.maritime_trade(player, give, receive)
            }
            GameAction::BuyDevCard => self.buy_dev_card(player),
            GameAction::PlayKnight { tile, victim } => self.play_knight(player, tile, victim),
            GameAction::PlayRoadBuilding(first, second) => {
                self.play_road_building(player, first, second)
            }
            GameAction::PlayYearOfPlenty(a, b) => self.play_year_of_plenty(player, a, b),
            GameAction::PlayMonopoly(resource) => self.play_monopoly(player, resource),
            GameAction::EndTurn => self.end_turn(player),
        };

        if let Err(error) = &result {
            debug!(player, ?action, %error, "Action rejected");
        }
        result
    }

    /// Get all currently valid actions for a player.
    ///
    /// Trade proposals are open-ended and never listed. Discards list a single
    /// largest-piles-first choice.
    pub fn valid_actions(&self, player: PlayerId) -> Vec<GameAction> {
        let mut actions = Vec::new();
        let Some(p) = self.get_player(player) else {
            return actions;
        };
        let is_current = player == self.current_player;

        match &self.phase {
            GamePhase::Lobby | GamePhase::EndTurn | GamePhase::Finished { .. } => {}

            GamePhase::Setup { placing, .. } => {
                if !is_current {
                    return actions;
                }
                match placing {
                    SetupPlacing::Settlement => {
                        for vertex in self.board.valid_settlement_spots(player, true) {
                            actions.push(GameAction::PlaceSettlement(vertex));
                        }
                    }
                    SetupPlacing::Road => {
                        if let Some(settlement) = self.setup[player as usize].last_settlement {
                            for &edge in &self.board.vertices()[settlement.0].edges {
                                if self.board.can_place_road(edge, player, true) {
                                    actions.push(GameAction::PlaceRoad(edge));
                                }
                            }
                        }
                    }
                }
            }

            GamePhase::RollDice => {
                if !is_current {
                    return actions;
                }
                actions.push(GameAction::RollDice);
                if self.dev_card_ready(p, DevelopmentCard::Knight) {
                    for (tile, victim) in self.robber_targets(player) {
                        actions.push(GameAction::PlayKnight { tile, victim });
                    }
                }
            }

            GamePhase::Discard { pending } => {
                if let Some(&owed) = pending.get(&player) {
                    actions.push(GameAction::Discard(p.resources.largest_first(owed)));
                }
            }

            GamePhase::MoveRobber => {
                if is_current {
                    for (tile, victim) in self.robber_targets(player) {
                        actions.push(GameAction::MoveRobber { tile, victim });
                    }
                }
            }

            GamePhase::Main => {
                if !is_current {
                    return actions;
                }
                self.push_main_actions(p, &mut actions);
                actions.push(GameAction::EndTurn);
            }

            GamePhase::Trade => {
                if let Some(offer) = &self.trade_offer {
                    if offer.from == player {
                        actions.push(GameAction::CancelTrade);
                        actions.push(GameAction::EndTurn);
                    } else if offer.addressed_to(player)
                        && p.resources.can_afford(&offer.requesting)
                    {
                        actions.push(GameAction::AcceptTrade);
                    }
                }
            }
        }

        actions
    }

    fn push_main_actions(&self, p: &Player, actions: &mut Vec<GameAction>) {
        let player = p.id;

        if p.can_afford_settlement() {
            for vertex in self.board.valid_settlement_spots(player, false) {
                actions.push(GameAction::PlaceSettlement(vertex));
            }
        }
        if p.can_afford_city() {
            for vertex in self.board.valid_city_spots(player) {
                actions.push(GameAction::UpgradeToCity(vertex));
            }
        }
        let road_spots = self.board.valid_road_spots(player);
        if p.can_afford_road() {
            for &edge in &road_spots {
                actions.push(GameAction::PlaceRoad(edge));
            }
        }
        if p.can_afford_dev_card() && !self.dev_deck.is_empty() {
            actions.push(GameAction::BuyDevCard);
        }

        for give in Resource::ALL {
            if p.resources.get(give) >= self.board.maritime_rate(player, give) {
                for receive in Resource::ALL.into_iter().filter(|&r| r != give) {
                    actions.push(GameAction::MaritimeTrade { give, receive });
                }
            }
        }

        if self.dev_card_ready(p, DevelopmentCard::Knight) {
            for (tile, victim) in self.robber_targets(player) {
                actions.push(GameAction::PlayKnight { tile, victim });
            }
        }
        if self.dev_card_ready(p, DevelopmentCard::RoadBuilding) {
            if p.roads_remaining == 1 {
                for &edge in &road_spots {
                    actions.push(GameAction::PlayRoadBuilding(edge, None));
                }
            } else if p.roads_remaining >= 2 {
                let mut pairs = BTreeSet::new();
                for &first in &road_spots {
                    for edge in self.board.edges() {
                        if self.board.can_place_road_with(edge.id, player, false, &[first]) {
                            pairs.insert((first.min(edge.id), first.max(edge.id)));
                        }
                    }
                }
                for (a, b) in pairs {
                    actions.push(GameAction::PlayRoadBuilding(a, Some(b)));
                }
            }
        }
        if self.dev_card_ready(p, DevelopmentCard::YearOfPlenty) {
            for (i, &a) in Resource::ALL.iter().enumerate() {
                for &b in &Resource::ALL[i..] {
                    actions.push(GameAction::PlayYearOfPlenty(a, b));
                }
            }
        }
        if self.dev_card_ready(p, DevelopmentCard::Monopoly) {
            for resource in Resource::ALL {
                actions.push(GameAction::PlayMonopoly(resource));
            }
        }
    }

    /// Every legal robber destination, one entry per possible victim
    fn robber_targets(&self, player: PlayerId) -> Vec<(HexCoord, Option<PlayerId>)> {
        let mut targets = Vec::new();
        for tile in self.board.tiles() {
            if tile.coord == self.board.robber() {
                continue;
            }
            let victims: Vec<PlayerId> = self
                .board
                .players_adjacent_to_tile(tile.coord)
                .into_iter()
                .filter(|&v| v != player)
                .collect();
            if victims.is_empty() {
                targets.push((tile.coord, None));
            } else {
                targets.extend(victims.into_iter().map(|v| (tile.coord, Some(v))));
            }
        }
        targets
    }

    fn dev_card_ready(&self, p: &Player, card: DevelopmentCard) -> bool {
        !p.dev_card_played && p.has_playable_dev_card(card)
    }

    // ==================== Helper Methods ====================

    fn ensure_running(&self) -> Result<(), GameError> {
        match self.phase {
            GamePhase::Lobby => Err(GameError::NotStarted),
            GamePhase::Finished { .. } => Err(GameError::GameOver),
            _ => Ok(()),
        }
    }

    fn ensure_seat(&self, player: PlayerId) -> Result<(), GameError> {
        if (player as usize) < self.players.len() {
            Ok(())
        } else {
            Err(GameError::InvalidReference(format!("no player {player}")))
        }
    }

    fn ensure_current(&self, player: PlayerId) -> Result<(), GameError> {
        if player == self.current_player {
            Ok(())
        } else {
            Err(GameError::NotYourTurn)
        }
    }

    fn ensure_phase(&self, phase: GamePhase) -> Result<(), GameError> {
        if self.phase == phase {
            Ok(())
        } else {
            Err(GameError::WrongPhase)
        }
    }

    fn ensure_dev_card(&self, player: PlayerId, card: DevelopmentCard) -> Result<(), GameError> {
        let p = &self.players[player as usize];
        if p.dev_card_played {
            Err(GameError::DevCardAlreadyPlayed)
        } else if p.has_playable_dev_card(card) {
            Ok(())
        } else if p.holds_fresh_dev_card(card) {
            Err(GameError::CardNotPlayable)
        } else {
            Err(GameError::NoSuchCard)
        }
    }

    /// Move to the next setup placement once this seat has placed its quota for the round
    fn advance_setup(&mut self, round: u8, events: &mut Vec<GameEvent>) {
        let player_count = self.players.len() as PlayerId;
        let progress = &self.setup[self.current_player as usize];
        let settlement = GamePhase::Setup {
            round,
            placing: SetupPlacing::Settlement,
        };

        if progress.settlements < round || progress.roads < round {
            self.phase = settlement;
            return;
        }

        // Snake order: 0,1,2,...,n-1 then n-1,...,1,0
        self.phase = if round == 1 {
            if self.current_player + 1 < player_count {
                self.current_player += 1;
                settlement
            } else {
                GamePhase::Setup {
                    round: 2,
                    placing: SetupPlacing::Settlement,
                }
            }
        } else if self.current_player > 0 {
            self.current_player -= 1;
            settlement
        } else {
            self.turn_number = 1;
            self.round = 1;
            events.push(GameEvent::SetupCompleted);
            GamePhase::RollDice
        };
        debug!(phase = ?self.phase, current_player = self.current_player, "Setup advanced");
    }

    fn check_longest_road(&mut self, events: &mut Vec<GameEvent>) {
        let lengths: Vec<u32> = self
            .players
            .iter()
            .map(|p| self.board.longest_road(p.id))
            .collect();
        let longest = lengths.iter().copied().max().unwrap_or(0);
        let current_holder = self.players.iter().find(|p| p.has_longest_road).map(|p| p.id);

        let new_holder = if longest < MIN_LONGEST_ROAD {
            None
        } else {
            let leaders: Vec<PlayerId> = self
                .players
                .iter()
                .filter(|p| lengths[p.id as usize] == longest)
                .map(|p| p.id)
                .collect();
            match current_holder {
                // Ties keep current holder
                Some(holder) if leaders.contains(&holder) => Some(holder),
                _ if leaders.len() == 1 => Some(leaders[0]),
                // Multiple tied, no current holder - no one gets it
                _ => None,
            }
        };

        if new_holder != current_holder {
            for player in &mut self.players {
                player.has_longest_road = Some(player.id) == new_holder;
            }
            debug!(previous = ?current_holder, current = ?new_holder, longest, "Longest road changed");
            events.push(GameEvent::LongestRoadChanged {
                previous: current_holder,
                current: new_holder,
                length: longest,
            });
        }
    }

    fn check_largest_army(&mut self, player: PlayerId, events: &mut Vec<GameEvent>) {
        let knights = self.players[player as usize].played_knights;
        let current_holder = self.players.iter().find(|p| p.has_largest_army);
        let previous = current_holder.map(|p| p.id);

        let claims = match current_holder {
            Some(holder) => holder.id != player && knights > holder.played_knights,
            None => knights >= MIN_LARGEST_ARMY,
        };
        if !claims {
            return;
        }

        for p in &mut self.players {
            p.has_largest_army = p.id == player;
        }
        events.push(GameEvent::LargestArmyChanged {
            previous,
            current: Some(player),
            knights,
        });
    }

    /// Declare a winner the moment anyone reaches the target, current player first
    fn check_win_condition(&mut self, events: &mut Vec<GameEvent>) {
        if matches!(self.phase, GamePhase::Lobby | GamePhase::Finished { .. }) {
            return;
        }
        let target = self.config.victory_points_to_win;
        let count = self.players.len();
        let start = self.current_player as usize;

        let winner = (0..count)
            .map(|offset| &self.players[(start + offset) % count])
            .find(|p| p.victory_points() >= target)
            .map(|p| (p.id, p.victory_points()));

        if let Some((winner, victory_points)) = winner {
            self.phase = GamePhase::Finished { winner };
            debug!(winner, victory_points, "Game won");
            events.push(GameEvent::GameWon {
                player: winner,
                victory_points,
            });
        }
    }

    fn finish_action(&mut self, player: PlayerId, mut events: Vec<GameEvent>) -> Vec<GameEvent> {
        self.check_win_condition(&mut events);
        debug!(player, events = events.len(), phase = ?self.phase, "Action accepted");
        events
    }
}
