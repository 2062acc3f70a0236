//! Integration tests for the settlers rule engine.
//!
//! These tests verify complete game flows from setup through to victory.

use pretty_assertions::assert_eq;
use settlers_core::board::BuildingKind;
use settlers_core::*;

fn new_game(players: usize, seed: u64) -> GameState {
    let mut game = GameState::new(GameConfig::seeded(seed)).unwrap();
    for (i, color) in PlayerColor::ALL.iter().take(players).enumerate() {
        game.add_player(format!("Player{i}"), *color).unwrap();
    }
    game.start().unwrap();
    game
}

/// Helper to get any valid action of a specific type
fn find_action<F>(game: &GameState, player: PlayerId, filter: F) -> Option<GameAction>
where
    F: Fn(&GameAction) -> bool,
{
    game.valid_actions(player).into_iter().find(filter)
}

/// Run through complete setup phase with valid placements
fn complete_setup(game: &mut GameState) {
    let mut iterations = 0;
    let max_iterations = 100;

    while matches!(game.phase, GamePhase::Setup { .. }) && iterations < max_iterations {
        let player = game.current_player;
        let action = game.valid_actions(player).into_iter().next().unwrap();
        game.apply_action(player, action).unwrap();
        iterations += 1;
    }

    assert!(
        !matches!(game.phase, GamePhase::Setup { .. }),
        "Game should complete setup within {} iterations",
        max_iterations
    );
}

/// Resolve discards and the robber until we're back in the main phase
fn handle_special_phases(game: &mut GameState) {
    loop {
        match &game.phase {
            GamePhase::Discard { pending } => {
                let player = *pending.keys().next().unwrap();
                let discard = bot_discard(game, player);
                game.apply_action(player, GameAction::Discard(discard)).unwrap();
            }
            GamePhase::MoveRobber => {
                let player = game.current_player;
                let action = find_action(game, player, |a| {
                    matches!(a, GameAction::MoveRobber { .. })
                })
                .unwrap();
                game.apply_action(player, action).unwrap();
            }
            _ => break,
        }
    }
}

/// Roll for the current player and settle any 7
fn roll_into_main(game: &mut GameState) -> PlayerId {
    let player = game.current_player;
    game.apply_action(player, GameAction::RollDice).unwrap();
    handle_special_phases(game);
    assert_eq!(game.phase, GamePhase::Main);
    player
}

/// Piece counts, points and the robber agree with the board
fn assert_consistent(game: &GameState) {
    for player in &game.players {
        let mut settlements = 0;
        let mut cities = 0;
        for vertex in game.board.vertices() {
            match vertex.building {
                Some(b) if b.owner == player.id && b.kind == BuildingKind::Settlement => {
                    settlements += 1
                }
                Some(b) if b.owner == player.id => cities += 1,
                _ => {}
            }
        }
        let roads = game
            .board
            .edges()
            .iter()
            .filter(|e| e.road.is_some_and(|r| r.owner == player.id))
            .count() as u32;

        assert_eq!(player.settlements_on_board(), settlements, "{}", player.name);
        assert_eq!(player.cities_built(), cities, "{}", player.name);
        assert_eq!(player.roads_built(), roads, "{}", player.name);
        assert_eq!(player.public_victory_points, settlements + 2 * cities);
    }

    let robbed: Vec<_> = game.board.tiles().iter().filter(|t| t.has_robber).collect();
    assert_eq!(robbed.len(), 1);
    assert_eq!(robbed[0].coord, game.board.robber());

    assert!(game.players.iter().filter(|p| p.has_longest_road).count() <= 1);
    assert!(game.players.iter().filter(|p| p.has_largest_army).count() <= 1);
}

/// Let bots play until someone wins or the action budget runs out
fn play_bot_game(game: &mut GameState, bots: &mut [Bot], max_actions: usize) -> usize {
    let mut actions = 0;
    while !matches!(game.phase, GamePhase::Finished { .. }) && actions < max_actions {
        let player = match &game.phase {
            GamePhase::Discard { pending } => *pending.keys().next().unwrap(),
            _ => game.current_player,
        };
        let action = bots[player as usize]
            .choose_action(game)
            .expect("bot always has an action");
        game.apply_action(player, action).unwrap();
        actions += 1;
    }
    actions
}

#[test]
fn test_setup_phase_completes() {
    let mut game = new_game(4, 1);
    complete_setup(&mut game);

    // Verify each player has placed 2 settlements and 2 roads
    for player in &game.players {
        assert_eq!(
            player.settlements_remaining, 3,
            "Each player should have 3 settlements left (placed 2)"
        );
        assert_eq!(
            player.roads_remaining, 13,
            "Each player should have 13 roads left (placed 2)"
        );
        assert_eq!(player.public_victory_points, 2);
    }

    assert_eq!(game.phase, GamePhase::RollDice);
    assert_eq!(game.current_player, 0);
    assert_consistent(&game);
}

#[test]
fn test_normal_turn_flow() {
    let mut game = new_game(2, 2);
    complete_setup(&mut game);

    let player = game.current_player;
    assert!(find_action(&game, player, |a| matches!(a, GameAction::RollDice)).is_some());

    let events = game.apply_action(player, GameAction::RollDice).unwrap();
    assert!(
        events
            .iter()
            .any(|e| matches!(e, GameEvent::DiceRolled { .. })),
        "Should have dice roll event"
    );

    handle_special_phases(&mut game);
    assert!(find_action(&game, player, |a| matches!(a, GameAction::EndTurn)).is_some());

    game.apply_action(player, GameAction::EndTurn).unwrap();
    assert_ne!(game.current_player, player, "Turn should advance");
    assert_eq!(game.phase, GamePhase::RollDice);
    assert_eq!(game.turn_number, 2);
}

#[test]
fn test_building_requires_resources() {
    let mut game = new_game(2, 3);
    complete_setup(&mut game);
    let player = roll_into_main(&mut game);

    game.players[player as usize].resources = ResourceHand::new();

    assert!(
        find_action(&game, player, |a| matches!(a, GameAction::PlaceRoad(_))).is_none(),
        "Should not have road build action without resources"
    );
    assert!(
        find_action(&game, player, |a| matches!(a, GameAction::PlaceSettlement(_))).is_none(),
        "Should not have settlement build action without resources"
    );

    let edge = game.board.valid_road_spots(player)[0];
    assert_eq!(
        game.apply_action(player, GameAction::PlaceRoad(edge)),
        Err(GameError::CannotAfford)
    );
}

#[test]
fn test_building_with_resources() {
    let mut game = new_game(2, 4);
    complete_setup(&mut game);
    let player = roll_into_main(&mut game);

    game.players[player as usize].resources = ResourceHand::with_amounts(5, 5, 5, 5, 5);

    let road_action =
        find_action(&game, player, |a| matches!(a, GameAction::PlaceRoad(_))).unwrap();
    game.apply_action(player, road_action).unwrap();
    assert_eq!(
        game.players[player as usize].roads_remaining,
        12,
        "Road count should decrease"
    );

    let city_action =
        find_action(&game, player, |a| matches!(a, GameAction::UpgradeToCity(_))).unwrap();
    let events = game.apply_action(player, city_action).unwrap();
    assert!(events
        .iter()
        .any(|e| matches!(e, GameEvent::CityBuilt { .. })));
    assert_eq!(game.players[player as usize].public_victory_points, 3);
    assert_consistent(&game);
}

#[test]
fn test_maritime_trade() {
    let mut game = new_game(2, 5);
    complete_setup(&mut game);
    let player = roll_into_main(&mut game);

    game.players[player as usize].resources = ResourceHand::with_amounts(0, 4, 0, 0, 0);

    let rate = game.board.maritime_rate(player, Resource::Brick);
    assert!((2..=4).contains(&rate), "Rate should be between 2:1 and 4:1");

    let events = game
        .apply_action(
            player,
            GameAction::MaritimeTrade {
                give: Resource::Brick,
                receive: Resource::Ore,
            },
        )
        .unwrap();
    assert_eq!(
        events,
        vec![GameEvent::MaritimeTradeCompleted {
            player,
            gave: Resource::Brick,
            gave_count: rate,
            received: Resource::Ore,
        }]
    );
    assert_eq!(game.players[player as usize].resources.brick, 4 - rate);
    assert_eq!(game.players[player as usize].resources.ore, 1);
}

#[test]
fn test_development_card_purchase() {
    let mut game = new_game(2, 6);
    complete_setup(&mut game);
    let player = roll_into_main(&mut game);
    let initial_deck_size = game.dev_deck.len();

    game.players[player as usize].resources = ResourceHand::with_amounts(0, 0, 1, 1, 1);
    assert!(find_action(&game, player, |a| matches!(a, GameAction::BuyDevCard)).is_some());

    game.apply_action(player, GameAction::BuyDevCard).unwrap();
    assert_eq!(game.dev_deck.len(), initial_deck_size - 1);
    assert!(game.players[player as usize].resources.is_empty());

    // Either a fresh card or a hidden point
    let p = &game.players[player as usize];
    assert_eq!(
        p.dev_cards_bought_this_turn.len() as u32 + p.hidden_victory_points,
        1
    );
}

#[test]
fn test_trade_between_players() {
    let mut game = new_game(3, 7);
    complete_setup(&mut game);
    let proposer = roll_into_main(&mut game);
    let partner = (proposer + 1) % 3;

    game.players[proposer as usize].resources = ResourceHand::single(Resource::Wheat, 2);
    game.players[partner as usize].resources = ResourceHand::single(Resource::Sheep, 1);

    let offer = TradeOffer::new(
        proposer,
        Some(partner),
        ResourceHand::single(Resource::Wheat, 2),
        ResourceHand::single(Resource::Sheep, 1),
    );
    game.apply_action(proposer, GameAction::ProposeTrade(offer))
        .unwrap();
    assert_eq!(game.valid_actions(partner), vec![GameAction::AcceptTrade]);
    assert!(game.valid_actions((partner + 1) % 3).is_empty());

    game.apply_action(partner, GameAction::AcceptTrade).unwrap();
    assert_eq!(
        game.players[proposer as usize].resources,
        ResourceHand::single(Resource::Sheep, 1)
    );
    assert_eq!(
        game.players[partner as usize].resources,
        ResourceHand::single(Resource::Wheat, 2)
    );
}

#[test]
fn test_actions_from_json() {
    let mut game = new_game(2, 8);
    complete_setup(&mut game);

    let action: GameAction = serde_json::from_str(r#""RollDice""#).unwrap();
    let result = game.apply_action(1, action.clone());
    assert_eq!(
        ActionOutcome::from(&result),
        ActionOutcome {
            accepted: false,
            reason: Some("Not your turn".into()),
        }
    );
    assert!(ActionOutcome::from(&game.apply_action(0, action)).accepted);
}

#[test]
fn test_random_game_simulation() {
    // Run multiple random games to verify engine never rejects a listed action
    for seed in 0..5u64 {
        let player_count = 2 + (seed % 3) as usize;
        let mut game = new_game(player_count, seed);
        let mut bots: Vec<Bot> = (0..player_count)
            .map(|p| Bot::with_seed(p as PlayerId, BotDifficulty::Random, seed * 10 + p as u64))
            .collect();

        let actions = play_bot_game(&mut game, &mut bots, 2_000);
        assert!(actions > 0, "Game {} should have run some actions", seed);
        assert_consistent(&game);
    }
}

#[test]
fn test_builder_bots_reach_a_winner() {
    let mut game = new_game(4, 42);
    let mut bots: Vec<Bot> = (0..4)
        .map(|p| Bot::with_seed(p, BotDifficulty::Builder, 100 + p as u64))
        .collect();

    play_bot_game(&mut game, &mut bots, 20_000);
    assert_consistent(&game);

    if let Some(winner) = game.winner() {
        assert!(game.players[winner as usize].victory_points() >= 10);
        let standings = game.final_standings();
        assert_eq!(standings[0].player, winner);
        assert!(game.is_game_over());
    }
}

#[test]
fn test_seeded_games_are_reproducible() {
    let run = |seed: u64| {
        let mut game = new_game(3, seed);
        let mut bots: Vec<Bot> = (0..3)
            .map(|p| Bot::with_seed(p, BotDifficulty::Builder, p as u64))
            .collect();
        play_bot_game(&mut game, &mut bots, 500);
        game.snapshot()
    };

    assert_eq!(run(9), run(9));
}

#[test]
fn test_victory_points_from_buildings() {
    let mut game = new_game(2, 10);
    complete_setup(&mut game);

    // After setup, each player has 2 settlements = 2 VP
    for player in &game.players {
        assert_eq!(player.victory_points(), 2, "{} should have 2 VP", player.name);
    }
}

#[test]
fn test_longest_road_minimum() {
    let mut game = new_game(2, 11);
    complete_setup(&mut game);

    // Setup only gives 2 roads per player
    for player in &game.players {
        assert!(game.board.longest_road(player.id) < 5);
        assert!(!player.has_longest_road);
    }
}
