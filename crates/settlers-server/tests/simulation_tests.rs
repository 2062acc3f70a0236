//! End-to-end runs through the room host.

use pretty_assertions::assert_eq;
use settlers_core::{GameAction, GameConfig, GameError, GamePhase, PlayerColor};
use settlers_server::{
    run_simulation, GameArchive, MemoryArchive, RoomError, RoomManager, ServerConfig,
};
use std::sync::Arc;

fn init_logging() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

fn manager(archive: &MemoryArchive) -> RoomManager {
    let archive: Arc<dyn GameArchive> = Arc::new(archive.clone());
    RoomManager::new(archive).with_queue_depth(8)
}

#[tokio::test]
async fn test_seeded_simulation_archives_once() {
    init_logging();
    let archive = MemoryArchive::new();
    let manager = manager(&archive);
    let config = ServerConfig {
        seed: Some(2024),
        players: 3,
        max_turns: 1_000,
        ..ServerConfig::default()
    };

    let report = run_simulation(&manager, &config).await.unwrap();
    assert_eq!(report.seed, 2024);
    assert_eq!(report.standings.len(), 3);
    assert!(report.actions > 0);
    assert!(manager.is_empty(), "simulation cleans up its room");

    let winner = report.winner.expect("builder bots finish within the turn limit");
    let games = archive.games();
    assert_eq!(games.len(), 1);
    assert_eq!(games[0].room, report.room);
    assert_eq!(games[0].winner, Some(winner));
    assert_eq!(games[0].seed, Some(2024));
    assert_eq!(games[0].standings, report.standings);
    let standing = report
        .standings
        .iter()
        .find(|s| s.player == winner)
        .unwrap();
    assert!(standing.victory_points >= 10);
}

#[tokio::test]
async fn test_same_seed_same_game() {
    init_logging();
    let config = ServerConfig {
        seed: Some(77),
        players: 2,
        max_turns: 60,
        ..ServerConfig::default()
    };

    let first = run_simulation(&manager(&MemoryArchive::new()), &config)
        .await
        .unwrap();
    let second = run_simulation(&manager(&MemoryArchive::new()), &config)
        .await
        .unwrap();

    assert_eq!(first.winner, second.winner);
    assert_eq!(first.turns, second.turns);
    assert_eq!(first.actions, second.actions);
    assert_eq!(first.standings, second.standings);
}

#[tokio::test]
async fn test_manual_room_lifecycle() {
    init_logging();
    let archive = MemoryArchive::new();
    let manager = manager(&archive);

    let id = manager.create(GameConfig::seeded(5)).unwrap();
    let room = manager.get(id).unwrap();
    let ana = room.join("Ana", PlayerColor::Red).await.unwrap();
    let bo = room.join("Bo", PlayerColor::White).await.unwrap();
    room.start().await.unwrap();

    // Bo cannot act during Ana's setup placement
    let snapshot = room.snapshot().await.unwrap();
    let vertex = *snapshot.vertices.keys().next().unwrap();
    assert!(matches!(
        room.act(bo.session, GameAction::PlaceSettlement(vertex)).await,
        Err(RoomError::Game(GameError::NotYourTurn))
    ));
    room.act(ana.session, GameAction::PlaceSettlement(vertex))
        .await
        .unwrap();

    let snapshot = room.snapshot().await.unwrap();
    assert!(snapshot.vertices[&vertex].building.is_some());
    assert!(matches!(snapshot.phase, GamePhase::Setup { .. }));

    manager.destroy(id).await.unwrap();
    assert!(manager.get(id).is_err());
    assert!(archive.games().is_empty());
}
