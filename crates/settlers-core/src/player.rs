//! Player state and resource management.
//!
//! This module contains:
//! - Player struct with resources, development cards, tokens and awards
//! - ResourceHand for managing resource counts
//! - Development card types
//! - Building costs

use crate::board::{PlayerId, Resource};
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Settlements each player starts with
pub const SETTLEMENT_TOKENS: u32 = 5;
/// Cities each player starts with
pub const CITY_TOKENS: u32 = 4;
/// Roads each player starts with
pub const ROAD_TOKENS: u32 = 15;

/// Player color for UI rendering
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PlayerColor {
    Red,
    Blue,
    Orange,
    White,
}

impl PlayerColor {
    /// All seat colors
    pub const ALL: [PlayerColor; 4] = [
        PlayerColor::Red,
        PlayerColor::Blue,
        PlayerColor::Orange,
        PlayerColor::White,
    ];
}

/// Development card types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DevelopmentCard {
    /// Move robber and steal, counts toward Largest Army
    Knight,
    /// Immediately worth 1 hidden VP
    VictoryPoint,
    /// Build 2 roads for free
    RoadBuilding,
    /// Take any 2 resources from the bank
    YearOfPlenty,
    /// All players must give you all of one resource type
    Monopoly,
}

impl DevelopmentCard {
    /// Whether this card can be played (VP cards are never "played")
    pub fn is_playable(&self) -> bool {
        !matches!(self, DevelopmentCard::VictoryPoint)
    }
}

/// The face-down development card pile
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DevelopmentDeck {
    cards: Vec<DevelopmentCard>,
}

impl DevelopmentDeck {
    /// An unshuffled deck with the given cards
    pub fn new(cards: Vec<DevelopmentCard>) -> Self {
        Self { cards }
    }

    /// Shuffle the deck in place
    pub fn shuffle<R: Rng>(&mut self, rng: &mut R) {
        self.cards.shuffle(rng);
    }

    /// Pop the top card
    pub fn draw(&mut self) -> Option<DevelopmentCard> {
        self.cards.pop()
    }

    /// Cards left
    pub fn len(&self) -> usize {
        self.cards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }
}

/// A hand of resources
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceHand {
    pub wood: u32,
    pub brick: u32,
    pub sheep: u32,
    pub wheat: u32,
    pub ore: u32,
}

impl ResourceHand {
    /// Create an empty hand
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a hand with specific amounts
    pub fn with_amounts(wood: u32, brick: u32, sheep: u32, wheat: u32, ore: u32) -> Self {
        Self {
            wood,
            brick,
            sheep,
            wheat,
            ore,
        }
    }

    /// Create a hand with a single resource
    pub fn single(resource: Resource, amount: u32) -> Self {
        let mut hand = Self::new();
        hand.add(resource, amount);
        hand
    }

    /// Total number of resource cards
    pub fn total(&self) -> u32 {
        self.wood + self.brick + self.sheep + self.wheat + self.ore
    }

    /// Check if hand is empty
    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }

    /// Get count of a specific resource
    pub fn get(&self, resource: Resource) -> u32 {
        match resource {
            Resource::Wood => self.wood,
            Resource::Brick => self.brick,
            Resource::Sheep => self.sheep,
            Resource::Wheat => self.wheat,
            Resource::Ore => self.ore,
        }
    }

    fn slot(&mut self, resource: Resource) -> &mut u32 {
        match resource {
            Resource::Wood => &mut self.wood,
            Resource::Brick => &mut self.brick,
            Resource::Sheep => &mut self.sheep,
            Resource::Wheat => &mut self.wheat,
            Resource::Ore => &mut self.ore,
        }
    }

    /// Add resources to hand
    pub fn add(&mut self, resource: Resource, amount: u32) {
        *self.slot(resource) += amount;
    }

    /// Add another hand to this one
    pub fn add_hand(&mut self, other: &ResourceHand) {
        for resource in Resource::ALL {
            self.add(resource, other.get(resource));
        }
    }

    /// Check if can afford a cost
    pub fn can_afford(&self, cost: &ResourceHand) -> bool {
        Resource::ALL
            .iter()
            .all(|&resource| self.get(resource) >= cost.get(resource))
    }

    /// Pay a cost in one step, or change nothing and return false
    pub fn try_pay(&mut self, cost: &ResourceHand) -> bool {
        if !self.can_afford(cost) {
            return false;
        }
        for resource in Resource::ALL {
            *self.slot(resource) -= cost.get(resource);
        }
        true
    }

    /// Remove every unit of one resource, returning how many were taken
    pub fn take_all(&mut self, resource: Resource) -> u32 {
        std::mem::take(self.slot(resource))
    }

    /// Remove a random resource unit (for robber stealing)
    pub fn steal_random<R: Rng>(&mut self, rng: &mut R) -> Option<Resource> {
        let total = self.total();
        if total == 0 {
            return None;
        }

        // Every unit is equally likely
        let mut pick = rng.gen_range(0..total);
        for resource in Resource::ALL {
            let held = self.get(resource);
            if pick < held {
                *self.slot(resource) -= 1;
                return Some(resource);
            }
            pick -= held;
        }
        None
    }

    /// A discard of `count` cards taken from the largest piles first
    pub fn largest_first(&self, count: u32) -> ResourceHand {
        let mut remaining = self.clone();
        let mut discard = ResourceHand::new();
        for _ in 0..count.min(self.total()) {
            let Some(resource) = Resource::ALL
                .into_iter()
                .filter(|&r| remaining.get(r) > 0)
                .max_by_key(|&r| remaining.get(r))
            else {
                break;
            };
            *remaining.slot(resource) -= 1;
            discard.add(resource, 1);
        }
        discard
    }

    /// Iterate over non-zero entries
    pub fn iter(&self) -> impl Iterator<Item = (Resource, u32)> + '_ {
        Resource::ALL
            .into_iter()
            .map(|r| (r, self.get(r)))
            .filter(|(_, n)| *n > 0)
    }
}

/// Building costs
pub mod costs {
    use super::ResourceHand;

    /// Cost to build a road: 1 wood, 1 brick
    pub fn road() -> ResourceHand {
        ResourceHand::with_amounts(1, 1, 0, 0, 0)
    }

    /// Cost to build a settlement: 1 wood, 1 brick, 1 sheep, 1 wheat
    pub fn settlement() -> ResourceHand {
        ResourceHand::with_amounts(1, 1, 1, 1, 0)
    }

    /// Cost to upgrade to city: 2 wheat, 3 ore
    pub fn city() -> ResourceHand {
        ResourceHand::with_amounts(0, 0, 0, 2, 3)
    }

    /// Cost to buy a development card: 1 sheep, 1 wheat, 1 ore
    pub fn development_card() -> ResourceHand {
        ResourceHand::with_amounts(0, 0, 1, 1, 1)
    }
}

/// A single player's state
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Player {
    /// Seat index
    pub id: PlayerId,
    /// Display name
    pub name: String,
    /// Player color
    pub color: PlayerColor,
    /// Current resources
    pub resources: ResourceHand,
    /// Development cards that can be played
    pub dev_cards: Vec<DevelopmentCard>,
    /// Development cards bought this turn (can't be played same turn)
    pub dev_cards_bought_this_turn: Vec<DevelopmentCard>,
    /// Number of knights played (for Largest Army)
    pub played_knights: u32,
    /// Whether this player has the Longest Road card
    pub has_longest_road: bool,
    /// Whether this player has the Largest Army card
    pub has_largest_army: bool,
    /// Number of settlements remaining to build
    pub settlements_remaining: u32,
    /// Number of cities remaining to build
    pub cities_remaining: u32,
    /// Number of roads remaining to build
    pub roads_remaining: u32,
    /// Points from buildings on the board
    pub public_victory_points: u32,
    /// Points from victory point cards, revealed at game end
    pub hidden_victory_points: u32,
    /// Dice rolled this turn
    pub has_rolled: bool,
    /// A development card was played this turn
    pub dev_card_played: bool,
}

impl Player {
    /// Create a new player
    pub fn new(id: PlayerId, name: String, color: PlayerColor) -> Self {
        Self {
            id,
            name,
            color,
            resources: ResourceHand::new(),
            dev_cards: Vec::new(),
            dev_cards_bought_this_turn: Vec::new(),
            played_knights: 0,
            has_longest_road: false,
            has_largest_army: false,
            settlements_remaining: SETTLEMENT_TOKENS,
            cities_remaining: CITY_TOKENS,
            roads_remaining: ROAD_TOKENS,
            public_victory_points: 0,
            hidden_victory_points: 0,
            has_rolled: false,
            dev_card_played: false,
        }
    }

    /// Points everyone can see: buildings plus awards
    pub fn visible_victory_points(&self) -> u32 {
        let mut vp = self.public_victory_points;
        if self.has_longest_road {
            vp += 2;
        }
        if self.has_largest_army {
            vp += 2;
        }
        vp
    }

    /// All points, including hidden victory point cards
    pub fn victory_points(&self) -> u32 {
        self.visible_victory_points() + self.hidden_victory_points
    }

    /// Can this player afford a road?
    pub fn can_afford_road(&self) -> bool {
        self.resources.can_afford(&costs::road()) && self.roads_remaining > 0
    }

    /// Can this player afford a settlement?
    pub fn can_afford_settlement(&self) -> bool {
        self.resources.can_afford(&costs::settlement()) && self.settlements_remaining > 0
    }

    /// Can this player afford a city upgrade?
    pub fn can_afford_city(&self) -> bool {
        self.resources.can_afford(&costs::city()) && self.cities_remaining > 0
    }

    /// Can this player afford a development card?
    pub fn can_afford_dev_card(&self) -> bool {
        self.resources.can_afford(&costs::development_card())
    }

    /// Take a road token, paying for it unless it is free
    pub fn build_road(&mut self, free: bool) -> bool {
        if self.roads_remaining == 0 || (!free && !self.resources.try_pay(&costs::road())) {
            return false;
        }
        self.roads_remaining -= 1;
        true
    }

    /// Take a settlement token, paying for it unless it is free
    pub fn build_settlement(&mut self, free: bool) -> bool {
        if self.settlements_remaining == 0
            || (!free && !self.resources.try_pay(&costs::settlement()))
        {
            return false;
        }
        self.settlements_remaining -= 1;
        self.public_victory_points += 1;
        true
    }

    /// Swap a settlement for a city (the settlement token comes back)
    pub fn build_city(&mut self) -> bool {
        if self.cities_remaining == 0 || !self.resources.try_pay(&costs::city()) {
            return false;
        }
        self.cities_remaining -= 1;
        self.settlements_remaining += 1;
        self.public_victory_points += 1;
        true
    }

    /// Pay for a development card and take it.
    ///
    /// Victory point cards count immediately and never enter the hand.
    pub fn buy_dev_card(&mut self, card: DevelopmentCard) -> bool {
        if !self.resources.try_pay(&costs::development_card()) {
            return false;
        }
        if card.is_playable() {
            self.dev_cards_bought_this_turn.push(card);
        } else {
            self.hidden_victory_points += 1;
        }
        true
    }

    /// Called at end of turn - move bought cards to playable pile, reset flags
    pub fn end_turn(&mut self) {
        self.dev_cards.append(&mut self.dev_cards_bought_this_turn);
        self.has_rolled = false;
        self.dev_card_played = false;
    }

    /// Check if player has a playable development card of given type
    pub fn has_playable_dev_card(&self, card_type: DevelopmentCard) -> bool {
        self.dev_cards.iter().any(|c| *c == card_type)
    }

    /// Whether the card is held but was bought this turn
    pub fn holds_fresh_dev_card(&self, card_type: DevelopmentCard) -> bool {
        self.dev_cards_bought_this_turn.iter().any(|c| *c == card_type)
    }

    /// Play a development card (removes it from hand)
    pub fn play_dev_card(&mut self, card_type: DevelopmentCard) -> bool {
        if let Some(pos) = self.dev_cards.iter().position(|c| *c == card_type) {
            self.dev_cards.remove(pos);
            if matches!(card_type, DevelopmentCard::Knight) {
                self.played_knights += 1;
            }
            self.dev_card_played = true;
            true
        } else {
            false
        }
    }

    /// Settlements currently on the board
    pub fn settlements_on_board(&self) -> u32 {
        // Upgrading hands the settlement token back
        SETTLEMENT_TOKENS - self.settlements_remaining
    }

    /// Cities currently on the board
    pub fn cities_built(&self) -> u32 {
        CITY_TOKENS - self.cities_remaining
    }

    /// Roads currently on the board
    pub fn roads_built(&self) -> u32 {
        ROAD_TOKENS - self.roads_remaining
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn test_player() -> Player {
        Player::new(0, "Test".to_string(), PlayerColor::Red)
    }

    #[test]
    fn test_resource_hand_total() {
        let hand = ResourceHand::with_amounts(1, 2, 3, 4, 5);
        assert_eq!(hand.total(), 15);
    }

    #[test]
    fn test_resource_hand_can_afford() {
        let hand = ResourceHand::with_amounts(2, 2, 2, 2, 2);
        let cost = ResourceHand::with_amounts(1, 1, 1, 1, 1);
        assert!(hand.can_afford(&cost));

        let expensive = ResourceHand::with_amounts(3, 0, 0, 0, 0);
        assert!(!hand.can_afford(&expensive));
    }

    #[test]
    fn test_try_pay_is_all_or_nothing() {
        let mut hand = ResourceHand::with_amounts(1, 0, 1, 1, 0);
        assert!(!hand.try_pay(&costs::settlement()));
        assert_eq!(hand, ResourceHand::with_amounts(1, 0, 1, 1, 0));

        hand.add(Resource::Brick, 1);
        assert!(hand.try_pay(&costs::settlement()));
        assert!(hand.is_empty());
    }

    #[test]
    fn test_building_costs() {
        assert_eq!(costs::road().total(), 2);
        assert_eq!(costs::settlement().total(), 4);
        assert_eq!(costs::city().total(), 5);
        assert_eq!(costs::city().ore, 3);
        assert_eq!(costs::development_card().total(), 3);
    }

    #[test]
    fn test_player_victory_points() {
        let mut player = test_player();
        assert_eq!(player.victory_points(), 0);

        player.public_victory_points = 5;
        player.has_longest_road = true;
        player.has_largest_army = true;
        assert_eq!(player.victory_points(), 9);

        player.hidden_victory_points = 1;
        assert_eq!(player.victory_points(), 10);
        assert_eq!(player.visible_victory_points(), 9);
    }

    #[test]
    fn test_player_build_road() {
        let mut player = test_player();
        player.resources = ResourceHand::with_amounts(5, 5, 5, 5, 5);

        assert!(player.can_afford_road());
        assert!(player.build_road(false));
        assert_eq!(player.roads_remaining, 14);
        assert_eq!(player.resources.wood, 4);
        assert_eq!(player.resources.brick, 4);
    }

    #[test]
    fn test_free_road_costs_nothing() {
        let mut player = test_player();
        assert!(player.build_road(true));
        assert_eq!(player.roads_remaining, 14);
        assert!(!player.build_road(false));
    }

    #[test]
    fn test_player_build_city() {
        let mut player = test_player();
        player.resources = ResourceHand::with_amounts(5, 5, 5, 5, 5);
        assert!(player.build_settlement(true));
        assert!(player.build_settlement(true));

        assert!(player.build_city());
        assert_eq!(player.cities_remaining, 3);
        assert_eq!(player.settlements_remaining, 4); // Got one back
        assert_eq!(player.public_victory_points, 3);
        assert_eq!(player.settlements_on_board(), 1);
        assert_eq!(player.cities_built(), 1);
    }

    #[test]
    fn test_dev_card_bought_this_turn() {
        let mut player = test_player();
        player.resources = ResourceHand::with_amounts(5, 5, 5, 5, 5);

        assert!(player.buy_dev_card(DevelopmentCard::Knight));

        // Card is in bought_this_turn, not playable yet
        assert!(!player.has_playable_dev_card(DevelopmentCard::Knight));
        assert!(player.holds_fresh_dev_card(DevelopmentCard::Knight));

        player.end_turn();

        assert!(player.has_playable_dev_card(DevelopmentCard::Knight));
        assert!(player.dev_cards_bought_this_turn.is_empty());
    }

    #[test]
    fn test_victory_point_card_counts_on_draw() {
        let mut player = test_player();
        player.resources = ResourceHand::with_amounts(0, 0, 1, 1, 1);
        assert!(player.buy_dev_card(DevelopmentCard::VictoryPoint));
        assert_eq!(player.hidden_victory_points, 1);
        assert!(player.dev_cards_bought_this_turn.is_empty());
    }

    #[test]
    fn test_steal_random() {
        let mut hand = ResourceHand::with_amounts(0, 0, 0, 1, 0);
        let mut rng = StdRng::seed_from_u64(3);

        let stolen = hand.steal_random(&mut rng);
        assert_eq!(stolen, Some(Resource::Wheat));
        assert!(hand.is_empty());
        assert_eq!(hand.steal_random(&mut rng), None);
    }

    #[test]
    fn test_deck_draws_until_empty() {
        let mut deck = DevelopmentDeck::new(vec![DevelopmentCard::Knight, DevelopmentCard::Monopoly]);
        deck.shuffle(&mut StdRng::seed_from_u64(1));
        assert_eq!(deck.len(), 2);
        assert!(deck.draw().is_some());
        assert!(deck.draw().is_some());
        assert!(deck.is_empty());
        assert_eq!(deck.draw(), None);
    }

    #[test]
    fn test_largest_first_discard() {
        let hand = ResourceHand::with_amounts(5, 0, 2, 1, 0);
        let discard = hand.largest_first(4);
        assert_eq!(discard.total(), 4);
        assert!(hand.can_afford(&discard));
        assert_eq!(discard.wood, 3);
    }
}
