// Copyright (C) 2025 Vince Vasta
// SPDX-License-Identifier: Apache-2.0

//! Room actor types.
//!
//! Every room runs one task that applies commands to its state one at a
//! time: external client commands and internal timer ticks both arrive
//! here, so all state transitions and event emissions for a room are
//! serialized. Rooms share nothing with each other.
use ahash::AHashMap;
use log::info;
use rand::{rngs::StdRng, SeedableRng};
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::{
    sync::{broadcast, mpsc, oneshot},
    time,
};

use tablestakes_core::{
    message::{ClientCommand, CommandReply, ServerFrame},
    poker::{Chips, RoomId, SessionId},
};

use crate::rooms::RoomsRegistry;

pub mod player;
pub mod pot;
pub mod rig;
pub mod state;

use state::RoomState;

/// Creation options for a room.
#[derive(Debug, Clone)]
pub struct RoomOptions {
    /// The room display name.
    pub name: String,
    /// Seats at the table, 2 to 10.
    pub max_seats: usize,
    /// The small blind.
    pub small_blind: Chips,
    /// The big blind.
    pub big_blind: Chips,
    /// The privileged mode shared secret, None disables the hooks.
    pub secret: Option<String>,
}

/// An outbound item emitted by the room state machine.
///
/// The state machine holds no reference to the transport; the actor
/// drains these after every command and fans them out to the member
/// connections.
#[derive(Debug)]
pub enum Outbound {
    /// A frame for every member connection.
    Broadcast(ServerFrame),
    /// A frame for one session.
    To(SessionId, ServerFrame),
    /// The empty room grace window elapsed, the actor retires.
    Reap,
}

/// Command failures returned on the acknowledgment, state is unchanged.
#[derive(Debug, Error)]
pub enum ActionError {
    /// The connection did not join a room.
    #[error("not in a room")]
    NotInRoom,
    /// The session already joined this room, from this or another tab.
    #[error("already in this room")]
    AlreadyJoined,
    /// Display names are 1 to 15 characters.
    #[error("name must be 1 to 15 characters")]
    InvalidName,
    /// The action came out of turn.
    #[error("not your turn")]
    NotYourTurn,
    /// The player already holds a seat.
    #[error("already seated")]
    AlreadySeated,
    /// The seat index is out of range.
    #[error("invalid seat")]
    InvalidSeat,
    /// The seat is occupied.
    #[error("seat taken")]
    SeatTaken,
    /// The buy-in is below ten big blinds.
    #[error("minimum buy-in is {0}")]
    MinBuyIn(Chips),
    /// The raise increment is below the minimum raise.
    #[error("minimum raise is {0}")]
    MinRaise(Chips),
    /// There is a bet to match.
    #[error("cannot check, must call or raise")]
    MustCall,
    /// Raising is closed for a seat that already acted this round.
    #[error("raising is not open to you")]
    RaiseNotOpen,
    /// The show or muck window is not open.
    #[error("not at showdown")]
    NotAtShowdown,
    /// Winners and the last aggressor cannot muck.
    #[error("you must show your cards")]
    MustShow,
    /// A host-only control.
    #[error("only the host can {0}")]
    HostOnly(&'static str),
    /// Privileged hooks used without enabling them.
    #[error("god mode not enabled")]
    GodModeDisabled,
    /// Wrong privileged mode secret.
    #[error("nice try")]
    BadSecret,
    /// The game is paused.
    #[error("game is paused")]
    Paused,
    /// Resume without a pause.
    #[error("game is not paused")]
    NotPaused,
    /// No betting street is running.
    #[error("no hand in progress")]
    NoHand,
    /// Start while already running.
    #[error("game already running")]
    AlreadyRunning,
    /// Game session controls while stopped.
    #[error("game is not running")]
    NotRunning,
    /// Starting needs two seated players.
    #[error("need at least two seated players")]
    NotEnoughPlayers,
    /// The sender has no pending seat request.
    #[error("no pending seat request")]
    NoRequest,
    /// The request id does not match a pending request.
    #[error("unknown seat request")]
    UnknownRequest,
    /// One pending seat request per player.
    #[error("seat request already pending")]
    RequestPending,
    /// The sender holds no seat.
    #[error("not seated")]
    NotSeated,
    /// No run-it-twice offer is open for the sender.
    #[error("no run-it-twice offer to vote on")]
    NoVote,
    /// The sender already cast its run-it-twice vote.
    #[error("already voted")]
    AlreadyVoted,
}

/// Handle to a room actor shared by the registry and the connections.
#[derive(Debug, Clone)]
pub struct Room {
    commands_tx: mpsc::Sender<RoomCommand>,
    room_id: RoomId,
}

/// Command for the room task.
#[derive(Debug)]
enum RoomCommand {
    /// Join this room.
    Join {
        session_id: SessionId,
        name: String,
        frames_tx: mpsc::Sender<ServerFrame>,
        reply_tx: oneshot::Sender<CommandReply>,
    },
    /// Apply a client command.
    Command {
        session_id: SessionId,
        cmd: ClientCommand,
    },
    /// The session connection dropped.
    Disconnect { session_id: SessionId },
}

impl Room {
    /// Creates a new room and spawns its actor task.
    pub fn new(
        room_id: RoomId,
        opts: RoomOptions,
        registry: RoomsRegistry,
        shutdown_broadcast_rx: broadcast::Receiver<()>,
        shutdown_complete_tx: mpsc::Sender<()>,
    ) -> Self {
        let (commands_tx, commands_rx) = mpsc::channel(128);

        let state = RoomState::new(room_id.clone(), opts, StdRng::from_os_rng());
        let mut task = RoomTask {
            room_id: room_id.clone(),
            state,
            commands_rx,
            conns: AHashMap::new(),
            registry,
            shutdown_broadcast_rx,
            _shutdown_complete_tx: shutdown_complete_tx,
        };

        tokio::spawn(async move {
            task.run().await;
            info!("Room task for room {} stopped", task.room_id);
        });

        Self {
            commands_tx,
            room_id,
        }
    }

    /// This room identifier.
    pub fn room_id(&self) -> &RoomId {
        &self.room_id
    }

    /// A session joins this room with its outbound frames channel.
    pub async fn join(
        &self,
        session_id: SessionId,
        name: String,
        frames_tx: mpsc::Sender<ServerFrame>,
    ) -> CommandReply {
        let (reply_tx, reply_rx) = oneshot::channel();

        let cmd = RoomCommand::Join {
            session_id,
            name,
            frames_tx,
            reply_tx,
        };

        if self.commands_tx.send(cmd).await.is_err() {
            return CommandReply::err("room is closed");
        }

        reply_rx
            .await
            .unwrap_or_else(|_| CommandReply::err("room is closed"))
    }

    /// Routes a client command to the actor.
    pub async fn command(&self, session_id: SessionId, cmd: ClientCommand) {
        let _ = self
            .commands_tx
            .send(RoomCommand::Command { session_id, cmd })
            .await;
    }

    /// A session connection dropped.
    pub async fn disconnect(&self, session_id: SessionId) {
        let _ = self
            .commands_tx
            .send(RoomCommand::Disconnect { session_id })
            .await;
    }
}

struct RoomTask {
    /// This room identifier.
    room_id: RoomId,
    /// The room state machine.
    state: RoomState,
    /// Channel for receiving room commands.
    commands_rx: mpsc::Receiver<RoomCommand>,
    /// Member outbound channels by session.
    conns: AHashMap<SessionId, mpsc::Sender<ServerFrame>>,
    /// The registry this room removes itself from when reaped.
    registry: RoomsRegistry,
    /// Channel for listening shutdown notification.
    shutdown_broadcast_rx: broadcast::Receiver<()>,
    /// Sender that drops when this room task is done.
    _shutdown_complete_tx: mpsc::Sender<()>,
}

impl RoomTask {
    /// Timer tick driving state deadlines.
    const TICK: Duration = Duration::from_millis(250);

    async fn run(&mut self) {
        let mut ticker = time::interval(Self::TICK);

        loop {
            tokio::select! {
                // Server is shutting down, exit this task.
                _ = self.shutdown_broadcast_rx.recv() => break,
                // Timers fire as commands into the actor.
                _ = ticker.tick() => {
                    self.state.tick(Instant::now());
                    if self.flush().await {
                        break;
                    }
                }
                res = self.commands_rx.recv() => match res {
                    Some(RoomCommand::Join { session_id, name, frames_tx, reply_tx }) => {
                        let reply = match self.state.join(&session_id, &name, Instant::now()) {
                            Ok(()) => {
                                self.conns.insert(session_id, frames_tx);
                                CommandReply::ok_room(self.room_id.clone())
                            }
                            Err(e) => CommandReply::err(e.to_string()),
                        };
                        let _ = reply_tx.send(reply);

                        if self.flush().await {
                            break;
                        }
                    }
                    Some(RoomCommand::Command { session_id, cmd }) => {
                        self.state.apply(&session_id, cmd, Instant::now());
                        if self.flush().await {
                            break;
                        }
                    }
                    Some(RoomCommand::Disconnect { session_id }) => {
                        self.conns.remove(&session_id);
                        self.state.remove(&session_id, Instant::now());
                        if self.flush().await {
                            break;
                        }
                    }
                    None => break,
                },
            }
        }
    }

    /// Drains the state outbox to the member connections.
    ///
    /// Sends never block the room: a member whose channel is full or
    /// closed is dropped from the room rather than backpressuring it.
    /// Returns true when the empty room reaped itself.
    async fn flush(&mut self) -> bool {
        let mut reap = false;

        loop {
            let outbox = self.state.take_outbox();
            if outbox.is_empty() {
                break;
            }

            let mut dropped = Vec::new();
            for item in outbox {
                match item {
                    Outbound::Broadcast(frame) => {
                        for (session_id, tx) in &self.conns {
                            if tx.try_send(frame.clone()).is_err() {
                                dropped.push(session_id.clone());
                            }
                        }
                    }
                    Outbound::To(session_id, frame) => {
                        if let Some(tx) = self.conns.get(&session_id) {
                            if tx.try_send(frame).is_err() {
                                dropped.push(session_id);
                            }
                        }
                    }
                    Outbound::Reap => reap = true,
                }
            }

            // Removing a dropped member emits more outbound frames, keep
            // draining until the outbox stays empty.
            dropped.sort_unstable();
            dropped.dedup();
            for session_id in dropped {
                if self.conns.remove(&session_id).is_some() {
                    info!("Dropping slow connection for {session_id}");
                    self.state.remove(&session_id, Instant::now());
                }
            }
        }

        if reap {
            self.registry.remove(&self.room_id).await;
            info!("Room {} reaped", self.room_id);
        }

        reap
    }
}
