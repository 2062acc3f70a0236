//! Game rooms.
//!
//! Each room owns one `GameState` inside a tokio task. Callers talk to it
//! through a cloneable `RoomHandle`; commands queue on a bounded channel and
//! are applied one at a time, with the answer coming back on a oneshot.

use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use settlers_core::{
    Bot, ConfigError, GameAction, GameError, GameEvent, GamePhase, GameSnapshot, GameState,
    PlayerColor, PlayerId, Standing,
};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::archive::{CompletedGame, GameArchive};

pub type RoomId = Uuid;

/// Live rooms, shared between the manager and the room tasks
pub type Registry = Arc<DashMap<RoomId, RoomHandle>>;

#[derive(Debug, Error)]
pub enum RoomError {
    #[error(transparent)]
    Game(#[from] GameError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Unknown session {0}")]
    UnknownSession(Uuid),

    #[error("Room {0} not found")]
    NotFound(RoomId),

    #[error("Room {0} is closed")]
    Closed(RoomId),
}

/// A joined seat. The session id stays valid while seats shift in the lobby.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Seat {
    pub session: Uuid,
    pub player: PlayerId,
}

type Reply<T> = oneshot::Sender<Result<T, RoomError>>;

/// Messages handled by a room task
#[derive(Debug)]
pub enum RoomCommand {
    Join {
        name: String,
        color: PlayerColor,
        reply: Reply<Seat>,
    },
    Leave {
        session: Uuid,
        reply: Reply<()>,
    },
    Start {
        reply: Reply<Vec<GameEvent>>,
    },
    Act {
        session: Uuid,
        action: GameAction,
        reply: Reply<Vec<GameEvent>>,
    },
    /// Let a bot pick an action against the live state
    Decide {
        session: Uuid,
        bot: Box<Bot>,
        reply: Reply<(Box<Bot>, Option<GameAction>)>,
    },
    Snapshot {
        reply: Reply<GameSnapshot>,
    },
    Standings {
        reply: Reply<Vec<Standing>>,
    },
    Seats {
        reply: Reply<Vec<Seat>>,
    },
    Close,
}

/// Cloneable sender side of a room
#[derive(Debug, Clone)]
pub struct RoomHandle {
    id: RoomId,
    sender: mpsc::Sender<RoomCommand>,
}

impl RoomHandle {
    /// Spawn the room task. Must be called inside a tokio runtime.
    pub fn spawn(
        id: RoomId,
        game: GameState,
        archive: Arc<dyn GameArchive>,
        queue_depth: usize,
        registry: Registry,
    ) -> Self {
        let (sender, receiver) = mpsc::channel(queue_depth.max(1));
        let actor = RoomActor {
            id,
            game,
            sessions: Vec::new(),
            archive,
            archived: false,
            registry,
            receiver,
        };
        tokio::spawn(actor.run());
        info!(room = %id, "Room created");
        Self { id, sender }
    }

    pub fn id(&self) -> RoomId {
        self.id
    }

    async fn request<T>(
        &self,
        command: impl FnOnce(Reply<T>) -> RoomCommand,
    ) -> Result<T, RoomError> {
        let (reply, response) = oneshot::channel();
        self.sender
            .send(command(reply))
            .await
            .map_err(|_| RoomError::Closed(self.id))?;
        response.await.map_err(|_| RoomError::Closed(self.id))?
    }

    pub async fn join(&self, name: impl Into<String>, color: PlayerColor) -> Result<Seat, RoomError> {
        let name = name.into();
        self.request(|reply| RoomCommand::Join { name, color, reply })
            .await
    }

    pub async fn leave(&self, session: Uuid) -> Result<(), RoomError> {
        self.request(|reply| RoomCommand::Leave { session, reply })
            .await
    }

    pub async fn start(&self) -> Result<Vec<GameEvent>, RoomError> {
        self.request(|reply| RoomCommand::Start { reply }).await
    }

    pub async fn act(&self, session: Uuid, action: GameAction) -> Result<Vec<GameEvent>, RoomError> {
        self.request(|reply| RoomCommand::Act {
            session,
            action,
            reply,
        })
        .await
    }

    /// Ask `bot` for its next move; the bot comes back with its RNG advanced
    pub async fn decide(&self, session: Uuid, bot: Bot) -> Result<(Bot, Option<GameAction>), RoomError> {
        let bot = Box::new(bot);
        let (bot, action) = self
            .request(|reply| RoomCommand::Decide {
                session,
                bot,
                reply,
            })
            .await?;
        Ok((*bot, action))
    }

    pub async fn snapshot(&self) -> Result<GameSnapshot, RoomError> {
        self.request(|reply| RoomCommand::Snapshot { reply }).await
    }

    pub async fn standings(&self) -> Result<Vec<Standing>, RoomError> {
        self.request(|reply| RoomCommand::Standings { reply }).await
    }

    pub async fn seats(&self) -> Result<Vec<Seat>, RoomError> {
        self.request(|reply| RoomCommand::Seats { reply }).await
    }

    /// Stop the room task. Commands sent afterwards fail with `Closed`.
    pub async fn close(&self) {
        let _ = self.sender.send(RoomCommand::Close).await;
    }
}

struct RoomActor {
    id: RoomId,
    game: GameState,
    /// Session per seat, in seat order
    sessions: Vec<Uuid>,
    archive: Arc<dyn GameArchive>,
    archived: bool,
    registry: Registry,
    receiver: mpsc::Receiver<RoomCommand>,
}

impl RoomActor {
    async fn run(mut self) {
        while let Some(command) = self.receiver.recv().await {
            match command {
                RoomCommand::Join { name, color, reply } => {
                    let result = self.join(name, color);
                    let _ = reply.send(result);
                }
                RoomCommand::Leave { session, reply } => {
                    let result = self.leave(session);
                    let teardown = result.is_ok()
                        && self.sessions.is_empty()
                        && self.game.phase == GamePhase::Lobby;
                    if teardown {
                        info!(room = %self.id, "Last seat left, closing room");
                        self.registry.remove(&self.id);
                    }
                    let _ = reply.send(result);
                    if teardown {
                        break;
                    }
                }
                RoomCommand::Start { reply } => {
                    let result = self.game.start().map_err(RoomError::from);
                    match &result {
                        Ok(_) => info!(room = %self.id, players = self.sessions.len(), "Game started"),
                        Err(error) => warn!(room = %self.id, %error, "Start rejected"),
                    }
                    let _ = reply.send(result);
                }
                RoomCommand::Act {
                    session,
                    action,
                    reply,
                } => {
                    let result = self.act(session, action);
                    let _ = reply.send(result);
                }
                RoomCommand::Decide {
                    session,
                    mut bot,
                    reply,
                } => {
                    let result = self.seat_of(session).map(|player| {
                        bot.player_id = player;
                        let action = bot.choose_action(&self.game);
                        (bot, action)
                    });
                    let _ = reply.send(result);
                }
                RoomCommand::Snapshot { reply } => {
                    let _ = reply.send(Ok(self.game.snapshot()));
                }
                RoomCommand::Standings { reply } => {
                    let _ = reply.send(Ok(self.game.final_standings()));
                }
                RoomCommand::Seats { reply } => {
                    let seats = self
                        .sessions
                        .iter()
                        .enumerate()
                        .map(|(seat, &session)| Seat {
                            session,
                            player: seat as PlayerId,
                        })
                        .collect();
                    let _ = reply.send(Ok(seats));
                }
                RoomCommand::Close => {
                    info!(room = %self.id, "Room closed");
                    break;
                }
            }
        }
    }

    fn seat_of(&self, session: Uuid) -> Result<PlayerId, RoomError> {
        self.sessions
            .iter()
            .position(|&s| s == session)
            .map(|seat| seat as PlayerId)
            .ok_or(RoomError::UnknownSession(session))
    }

    fn join(&mut self, name: String, color: PlayerColor) -> Result<Seat, RoomError> {
        let player = self.game.add_player(name.clone(), color).map_err(|error| {
            warn!(room = %self.id, %error, "Join rejected");
            error
        })?;
        let session = Uuid::new_v4();
        self.sessions.push(session);
        info!(room = %self.id, player, %name, "Player joined");
        Ok(Seat { session, player })
    }

    fn leave(&mut self, session: Uuid) -> Result<(), RoomError> {
        let player = self.seat_of(session)?;
        self.game.remove_player(player)?;
        self.sessions.remove(player as usize);
        info!(room = %self.id, player, "Player left");
        Ok(())
    }

    fn act(&mut self, session: Uuid, action: GameAction) -> Result<Vec<GameEvent>, RoomError> {
        let player = self.seat_of(session)?;
        let events = self.game.apply_action(player, action).map_err(|error| {
            warn!(room = %self.id, player, %error, "Action rejected");
            error
        })?;
        debug!(room = %self.id, player, events = events.len(), "Action applied");

        if self.game.is_game_over() && !self.archived {
            self.archive_game();
        }
        Ok(events)
    }

    fn archive_game(&mut self) {
        self.archived = true;
        let completed = CompletedGame {
            room: self.id,
            winner: self.game.winner(),
            turns: self.game.turn_number,
            seed: self.game.config.seed,
            standings: self.game.final_standings(),
        };
        info!(room = %self.id, winner = ?completed.winner, turns = completed.turns, "Game finished");
        self.archive.record(completed);
    }
}
