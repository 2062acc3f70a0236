//! AI Bot players.
//!
//! Bots only ever pick from `GameState::valid_actions`, so every choice they
//! make is legal. Two difficulty levels are provided:
//! - Random: uniformly random valid moves
//! - Builder: greedy heuristics (good corners, cities first, hurt the leader)

use crate::actions::GameAction;
use crate::board::{EdgeId, PlayerId, Resource, VertexId};
use crate::game::{GamePhase, GameState};
use crate::hex::HexCoord;
use crate::player::ResourceHand;
use rand::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Bot difficulty level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BotDifficulty {
    Random,
    Builder,
}

/// A bot player that can decide on actions
#[derive(Debug, Clone)]
pub struct Bot {
    pub player_id: PlayerId,
    pub difficulty: BotDifficulty,
    rng: StdRng,
}

impl Bot {
    pub fn new(player_id: PlayerId, difficulty: BotDifficulty) -> Self {
        Self {
            player_id,
            difficulty,
            rng: StdRng::from_entropy(),
        }
    }

    pub fn with_seed(player_id: PlayerId, difficulty: BotDifficulty, seed: u64) -> Self {
        Self {
            player_id,
            difficulty,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Choose an action from the valid actions
    pub fn choose_action(&mut self, game: &GameState) -> Option<GameAction> {
        let valid_actions = game.valid_actions(self.player_id);
        if valid_actions.is_empty() {
            return None;
        }

        match self.difficulty {
            BotDifficulty::Random => self.choose_random(&valid_actions),
            BotDifficulty::Builder => self.choose_builder(game, &valid_actions),
        }
    }

    /// Random: Just pick a random valid action
    fn choose_random(&mut self, actions: &[GameAction]) -> Option<GameAction> {
        actions.choose(&mut self.rng).cloned()
    }

    /// Builder: greedy priorities, cities before settlements before roads
    fn choose_builder(&mut self, game: &GameState, actions: &[GameAction]) -> Option<GameAction> {
        if let GamePhase::Discard { .. } = game.phase {
            return Some(GameAction::Discard(bot_discard(game, self.player_id)));
        }

        // Roll dice
        if actions.contains(&GameAction::RollDice) {
            return Some(GameAction::RollDice);
        }

        // Setup: pick good corners, then the road with most room to grow
        if matches!(game.phase, GamePhase::Setup { .. }) {
            let settlements = filter(actions, |a| matches!(a, GameAction::PlaceSettlement(_)));
            if !settlements.is_empty() {
                return self.rank_settlement_spots(game, &settlements).cloned();
            }
            let roads = filter(actions, |a| matches!(a, GameAction::PlaceRoad(_)));
            return self.rank_road_spots(game, &roads).cloned();
        }

        // Robber after a 7
        let robber_actions = filter(actions, |a| matches!(a, GameAction::MoveRobber { .. }));
        if !robber_actions.is_empty() {
            return self.rank_robber_spots(game, &robber_actions).cloned();
        }

        let player = game.get_player(self.player_id)?;

        let city_actions = filter(actions, |a| matches!(a, GameAction::UpgradeToCity(_)));
        if let Some(city) = city_actions.choose(&mut self.rng) {
            return Some((*city).clone());
        }

        let settlement_actions = filter(actions, |a| matches!(a, GameAction::PlaceSettlement(_)));
        if !settlement_actions.is_empty() {
            return self.rank_settlement_spots(game, &settlement_actions).cloned();
        }

        // Knights when the robber sits on us or the army is in reach
        let knight_actions = filter(actions, |a| matches!(a, GameAction::PlayKnight { .. }));
        let robbed = game
            .board
            .players_adjacent_to_tile(game.board.robber())
            .contains(&self.player_id);
        if !knight_actions.is_empty() && (robbed || player.played_knights >= 2) {
            return self.rank_robber_spots(game, &knight_actions).cloned();
        }

        if let Some(action) = self.choose_progress_card(game, actions) {
            return Some(action);
        }

        // Roads only while there is still room to expand
        let road_actions = filter(actions, |a| matches!(a, GameAction::PlaceRoad(_)));
        if !road_actions.is_empty() && player.roads_remaining >= 8 {
            return self.rank_road_spots(game, &road_actions).cloned();
        }

        // Buy dev cards with controlled probability
        if actions.contains(&GameAction::BuyDevCard) && self.rng.gen_bool(0.35) {
            return Some(GameAction::BuyDevCard);
        }

        if let Some(trade) = choose_maritime_trade(game, self.player_id, actions) {
            return Some(trade);
        }

        // End turn
        if actions.contains(&GameAction::EndTurn) {
            return Some(GameAction::EndTurn);
        }

        actions.choose(&mut self.rng).cloned()
    }

    /// Road building, year of plenty and monopoly, when they are worth it
    fn choose_progress_card(&mut self, game: &GameState, actions: &[GameAction]) -> Option<GameAction> {
        let player = game.get_player(self.player_id)?;

        let road_building = filter(actions, |a| matches!(a, GameAction::PlayRoadBuilding(..)));
        if let Some(action) = road_building.choose(&mut self.rng) {
            return Some((*action).clone());
        }

        // Year of plenty: fill whatever a city is missing
        if actions
            .iter()
            .any(|a| matches!(a, GameAction::PlayYearOfPlenty(..)))
        {
            let missing = missing_for_city(&player.resources);
            let pick = match missing.as_slice() {
                [] => (Resource::Ore, Resource::Wheat),
                [only] => (*only, *only),
                [first, second, ..] => (*first, *second),
            };
            let action = GameAction::PlayYearOfPlenty(pick.0.min(pick.1), pick.0.max(pick.1));
            if actions.contains(&action) {
                return Some(action);
            }
        }

        // Monopoly on whatever the opponents hold most of
        if actions.iter().any(|a| matches!(a, GameAction::PlayMonopoly(_))) {
            let (resource, held) = Resource::ALL
                .into_iter()
                .map(|r| {
                    let held: u32 = game
                        .players
                        .iter()
                        .filter(|p| p.id != self.player_id)
                        .map(|p| p.resources.get(r))
                        .sum();
                    (r, held)
                })
                .max_by_key(|(_, held)| *held)?;
            if held >= 3 {
                return Some(GameAction::PlayMonopoly(resource));
            }
        }

        None
    }

    /// Rank settlement spots by production, diversity and what we lack
    fn rank_settlement_spots<'a>(
        &mut self,
        game: &GameState,
        actions: &[&'a GameAction],
    ) -> Option<&'a GameAction> {
        let player = game.get_player(self.player_id)?;

        let mut scored: Vec<_> = actions
            .iter()
            .map(|action| {
                let score = match action {
                    GameAction::PlaceSettlement(v) => {
                        let mut base_score = score_vertex(game, *v);

                        // Bonus for resource diversity
                        let resources = vertex_resources(game, *v);
                        let unique_resources: HashSet<_> = resources.iter().collect();
                        base_score += (unique_resources.len() as i32) * 3;

                        // Bonus for resources we're lacking
                        for res in &resources {
                            if player.resources.get(*res) == 0 {
                                base_score += 2;
                            }
                        }

                        // Harbor access
                        if game.board.vertex_harbor(*v).is_some() {
                            base_score += 2;
                        }

                        base_score
                    }
                    _ => 0,
                };
                (*action, score)
            })
            .collect();

        scored.sort_by(|a, b| b.1.cmp(&a.1));

        // Pick best with small chance for second best
        if scored.len() >= 2 && self.rng.gen_bool(0.1) {
            Some(scored[1].0)
        } else {
            scored.first().map(|(a, _)| *a)
        }
    }

    /// Rank road spots for expansion potential
    fn rank_road_spots<'a>(
        &mut self,
        game: &GameState,
        actions: &[&'a GameAction],
    ) -> Option<&'a GameAction> {
        let mut scored: Vec<_> = actions
            .iter()
            .map(|action| {
                let score = match action {
                    GameAction::PlaceRoad(e) => score_edge_expansion(game, *e),
                    _ => 0,
                };
                (*action, score)
            })
            .collect();

        // Shuffle first so equal scores don't always pick the lowest id
        scored.shuffle(&mut self.rng);
        scored.sort_by(|a, b| b.1.cmp(&a.1));
        scored.first().map(|(a, _)| *a)
    }

    /// Rank robber moves (plain or by knight) to hurt the leader
    fn rank_robber_spots<'a>(
        &mut self,
        game: &GameState,
        actions: &[&'a GameAction],
    ) -> Option<&'a GameAction> {
        let mut scored: Vec<_> = actions
            .iter()
            .map(|action| {
                let score = match action {
                    GameAction::MoveRobber { tile, victim }
                    | GameAction::PlayKnight { tile, victim } => {
                        self.score_robber_spot(game, *tile, *victim)
                    }
                    _ => 0,
                };
                (*action, score)
            })
            .collect();

        scored.sort_by(|a, b| b.1.cmp(&a.1));
        scored.first().map(|(a, _)| *a)
    }

    /// Score robber placement
    fn score_robber_spot(&self, game: &GameState, hex: HexCoord, victim: Option<PlayerId>) -> i32 {
        let Ok(tile) = game.board.tile(hex) else {
            return -100;
        };

        let mut score = tile.dice_number.map_or(0, |dice| 2 * pip_weight(dice));

        // Prefer tiles with opponent buildings, avoid our own
        for player_id in game.board.players_adjacent_to_tile(hex) {
            if player_id == self.player_id {
                score -= 20; // Don't hurt ourselves
            } else {
                score += 5;
            }
        }

        // Steal from the leader, then the richest
        if let Some(player) = victim.and_then(|v| game.get_player(v)) {
            score += (player.visible_victory_points() as i32) * 3 + player.resources.total() as i32;
        }

        score
    }
}

fn filter(actions: &[GameAction], pred: impl Fn(&GameAction) -> bool) -> Vec<&GameAction> {
    actions.iter().filter(|&a| pred(a)).collect()
}

/// Likelihood weight of a dice number: 6 and 8 best, 2 and 12 worst
fn pip_weight(dice: u8) -> i32 {
    match dice {
        6 | 8 => 5,
        5 | 9 => 4,
        4 | 10 => 3,
        3 | 11 => 2,
        2 | 12 => 1,
        _ => 0,
    }
}

/// Score a vertex based on adjacent tiles
pub fn score_vertex(game: &GameState, vertex: VertexId) -> i32 {
    let Ok(v) = game.board.vertex(vertex) else {
        return 0;
    };
    v.tiles
        .iter()
        .filter_map(|&coord| game.board.tile(coord).ok())
        .filter_map(|tile| tile.dice_number)
        .map(pip_weight)
        .sum()
}

/// Get resources at a vertex
fn vertex_resources(game: &GameState, vertex: VertexId) -> Vec<Resource> {
    let Ok(v) = game.board.vertex(vertex) else {
        return Vec::new();
    };
    v.tiles
        .iter()
        .filter_map(|&coord| game.board.tile(coord).ok())
        .filter_map(|t| t.resource())
        .collect()
}

/// Best settlement value reachable through the far end of an edge
fn score_edge_expansion(game: &GameState, edge: EdgeId) -> i32 {
    let Ok(e) = game.board.edge(edge) else {
        return 0;
    };
    e.endpoints
        .iter()
        .filter(|&&v| game.board.satisfies_distance_rule(v))
        .map(|&v| score_vertex(game, v))
        .max()
        .unwrap_or(0)
}

fn missing_for_city(hand: &ResourceHand) -> Vec<Resource> {
    let mut missing = Vec::new();
    for _ in hand.wheat..2 {
        missing.push(Resource::Wheat);
    }
    for _ in hand.ore..3 {
        missing.push(Resource::Ore);
    }
    missing
}

/// Swap a surplus resource for one we have none of
fn choose_maritime_trade(
    game: &GameState,
    player_id: PlayerId,
    actions: &[GameAction],
) -> Option<GameAction> {
    let player = game.get_player(player_id)?;
    actions
        .iter()
        .filter(|a| match a {
            GameAction::MaritimeTrade { give, receive } => {
                player.resources.get(*give) > game.board.maritime_rate(player_id, *give)
                    && player.resources.get(*receive) == 0
            }
            _ => false,
        })
        .max_by_key(|a| match a {
            GameAction::MaritimeTrade { give, .. } => player.resources.get(*give),
            _ => 0,
        })
        .cloned()
}

/// Discard for the bot: half its hand, largest piles first
pub fn bot_discard(game: &GameState, player_id: PlayerId) -> ResourceHand {
    let Some(player) = game.get_player(player_id) else {
        return ResourceHand::new();
    };

    let owed = match &game.phase {
        GamePhase::Discard { pending } => pending.get(&player_id).copied().unwrap_or(0),
        _ if player.resources.total() > game.config.discard_limit => player.resources.total() / 2,
        _ => 0,
    };

    // Discard resources we have the most of
    player.resources.largest_first(owed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GameConfig;
    use crate::player::PlayerColor;

    fn new_game(players: usize) -> GameState {
        let mut game = GameState::new(GameConfig::seeded(11)).unwrap();
        for (i, color) in PlayerColor::ALL.iter().take(players).enumerate() {
            game.add_player(format!("Bot {i}"), *color).unwrap();
        }
        game.start().unwrap();
        game
    }

    fn complete_setup(game: &mut GameState, bots: &mut [Bot]) {
        while matches!(game.phase, GamePhase::Setup { .. }) {
            let player = game.current_player;
            let action = bots[player as usize].choose_action(game).unwrap();
            game.apply_action(player, action).unwrap();
        }
    }

    #[test]
    fn test_bot_creation() {
        let bot = Bot::new(0, BotDifficulty::Random);
        assert_eq!(bot.player_id, 0);
        assert_eq!(bot.difficulty, BotDifficulty::Random);
    }

    #[test]
    fn test_random_bot_chooses_action() {
        let game = new_game(2);
        let mut bot = Bot::with_seed(game.current_player, BotDifficulty::Random, 1);
        let action = bot.choose_action(&game);
        assert!(matches!(action, Some(GameAction::PlaceSettlement(_))));
    }

    #[test]
    fn test_bot_off_turn_has_nothing_to_do() {
        let game = new_game(2);
        let mut bot = Bot::with_seed(1, BotDifficulty::Builder, 1);
        assert_eq!(bot.choose_action(&game), None);
    }

    #[test]
    fn test_builder_bot_prioritizes_roll() {
        let mut game = new_game(2);
        let mut bots = vec![
            Bot::with_seed(0, BotDifficulty::Builder, 1),
            Bot::with_seed(1, BotDifficulty::Builder, 2),
        ];
        complete_setup(&mut game, &mut bots);

        let action = bots[game.current_player as usize].choose_action(&game);
        assert!(matches!(action, Some(GameAction::RollDice)));
    }

    #[test]
    fn test_builder_prefers_productive_corner() {
        let game = new_game(2);
        let mut bot = Bot::with_seed(0, BotDifficulty::Builder, 5);
        let Some(GameAction::PlaceSettlement(v)) = bot.choose_action(&game) else {
            panic!("expected a settlement");
        };
        assert!(game.board.can_place_settlement(v, 0, true));
        assert!(score_vertex(&game, v) > 0);
    }

    #[test]
    fn test_discard_logic() {
        let mut game = new_game(2);
        assert_eq!(bot_discard(&game, 0).total(), 0);

        game.players[0].resources = ResourceHand::with_amounts(6, 2, 1, 0, 0);
        let discard = bot_discard(&game, 0);
        assert_eq!(discard.total(), 4);
        assert_eq!(discard.wood, 4);
    }

    #[test]
    fn test_missing_for_city() {
        let hand = ResourceHand::with_amounts(0, 0, 0, 1, 2);
        assert_eq!(missing_for_city(&hand), vec![Resource::Wheat, Resource::Ore]);
        assert!(missing_for_city(&ResourceHand::with_amounts(0, 0, 0, 2, 3)).is_empty());
    }
}
