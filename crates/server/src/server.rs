// Copyright (C) 2025 Vince Vasta
// SPDX-License-Identifier: Apache-2.0

//! Tablestakes Poker server entry point.
use anyhow::{anyhow, Result};
use log::{error, info};
use std::net::SocketAddr;
use tokio::{
    net::{TcpListener, TcpStream},
    signal,
    sync::{broadcast, mpsc},
    time::{self, Duration},
};

use tablestakes_core::{
    message::{ClientCommand, CommandReply, ServerFrame},
    poker::{Chips, SessionId},
};

use crate::{
    connection::{self, Connection},
    room::{Room, RoomOptions},
    rooms::RoomsRegistry,
};

/// Networking config.
#[derive(Debug)]
pub struct Config {
    /// The server listening address.
    pub address: String,
    /// The server listening port.
    pub port: u16,
    /// The privileged mode shared secret, None disables the hooks.
    pub secret: Option<String>,
}

/// The server that handles client connections and the rooms table.
#[derive(Debug)]
struct Server {
    /// The rooms on this server.
    rooms: RoomsRegistry,
    /// The privileged mode shared secret.
    secret: Option<String>,
    /// The server listener.
    listener: TcpListener,
    /// Shutdown notification channel.
    shutdown_broadcast_tx: broadcast::Sender<()>,
    /// Shutdown sender cloned by each connection.
    shutdown_complete_tx: mpsc::Sender<()>,
}

/// Client connection handler.
struct Handler {
    /// The room and session this connection joined.
    room: Option<(Room, SessionId)>,
    /// The rooms on this server.
    rooms: RoomsRegistry,
    /// The privileged mode shared secret for new rooms.
    secret: Option<String>,
    /// Outbound frames enqueued by the joined room actor.
    frames_tx: mpsc::Sender<ServerFrame>,
    /// Channel for listening shutdown notification.
    shutdown_broadcast_rx: broadcast::Receiver<()>,
    /// Sender that drops when this connection is done.
    _shutdown_complete_tx: mpsc::Sender<()>,
}

impl Handler {
    /// Per-connection outbound buffer; the room drops the connection
    /// rather than block when it fills up.
    const FRAMES_BUFFER: usize = 64;
}

/// Server entry point.
pub async fn run(config: Config) -> Result<()> {
    let addr = format!("{}:{}", config.address, config.port);
    info!("Starting server listening on {}", addr);

    let listener = TcpListener::bind(&addr)
        .await
        .map_err(|e| anyhow!("Tcp listener bind error: {e}"))?;

    let shutdown_signal = signal::ctrl_c();
    let (shutdown_broadcast_tx, _) = broadcast::channel(1);
    let (shutdown_complete_tx, mut shutdown_complete_rx) = mpsc::channel(1);

    let mut server = Server {
        rooms: RoomsRegistry::new(&shutdown_broadcast_tx, &shutdown_complete_tx),
        secret: config.secret,
        listener,
        shutdown_broadcast_tx,
        shutdown_complete_tx,
    };

    tokio::select! {
        res = server.run() => {
            res.map_err(|e| anyhow!("Tcp listener accept error: {e}"))?;
        }
        _ = shutdown_signal => {
            info!("Received shutdown signal...");
        }
    }

    // Wait for all connections and rooms to shutdown.
    let Server {
        shutdown_broadcast_tx,
        shutdown_complete_tx,
        ..
    } = server;

    // Notify all tasks to start shutdown then wait for them to terminate
    // and drop their shutdown channel.
    drop(shutdown_broadcast_tx);
    drop(shutdown_complete_tx);
    let _ = shutdown_complete_rx.recv().await;

    Ok(())
}

impl Server {
    /// Runs the server.
    async fn run(&mut self) -> Result<()> {
        loop {
            let (socket, addr) = self.accept_with_retry().await?;
            info!("Accepted connection from {addr}");

            let (frames_tx, frames_rx) = mpsc::channel(Handler::FRAMES_BUFFER);
            let mut handler = Handler {
                room: None,
                rooms: self.rooms.clone(),
                secret: self.secret.clone(),
                frames_tx,
                shutdown_broadcast_rx: self.shutdown_broadcast_tx.subscribe(),
                _shutdown_complete_tx: self.shutdown_complete_tx.clone(),
            };

            // Spawn a task to handle connection messages.
            tokio::spawn(async move {
                if let Err(err) = handler.run(socket, addr, frames_rx).await {
                    error!("Connection to {addr} {err}");
                }

                info!("Connection to {addr} closed");
            });
        }
    }

    /// Accepts a connection with retries.
    async fn accept_with_retry(&self) -> Result<(TcpStream, SocketAddr)> {
        let mut retry = 0;
        loop {
            match self.listener.accept().await {
                Ok((socket, addr)) => {
                    return Ok((socket, addr));
                }
                Err(err) => {
                    if retry == 5 {
                        return Err(err.into());
                    }
                }
            }

            time::sleep(Duration::from_secs(1 << retry)).await;
            retry += 1;
        }
    }
}

impl Handler {
    /// Handle connection messages.
    async fn run(
        &mut self,
        socket: TcpStream,
        addr: SocketAddr,
        mut frames_rx: mpsc::Receiver<ServerFrame>,
    ) -> Result<()> {
        let mut conn = connection::accept_async(socket).await?;

        let res = loop {
            tokio::select! {
                _ = self.shutdown_broadcast_rx.recv() => {
                    break Ok(());
                }
                // Frames the joined room actor enqueued for this member.
                Some(frame) = frames_rx.recv() => {
                    if let Err(err) = conn.send(&frame).await {
                        break Err(err);
                    }
                }
                res = conn.recv::<ClientCommand>() => match res {
                    Some(Ok(cmd)) => {
                        let res = self.handle_command(&mut conn, cmd).await;
                        if res.is_err() {
                            break res;
                        }
                    },
                    // A malformed payload terminates the connection, the
                    // room itself is untouched.
                    Some(Err(err)) => break Err(err),
                    None => break Ok(()),
                },
            }
        };

        conn.close().await;

        if let Some((room, session_id)) = &self.room {
            info!("Connection to {addr} left room {}", room.room_id());
            room.disconnect(session_id.clone()).await;
        }

        res
    }

    async fn handle_command(&mut self, conn: &mut Connection, cmd: ClientCommand) -> Result<()> {
        match cmd {
            ClientCommand::CreateRoom {
                name,
                username,
                session_id,
                small_blind,
                big_blind,
                max_seats,
            } if self.room.is_none() => {
                let valid = (2..=10).contains(&max_seats)
                    && small_blind > Chips::ZERO
                    && big_blind >= small_blind
                    && !name.is_empty()
                    && session_id.is_valid();
                if !valid {
                    let reply = CommandReply::err("invalid room options");
                    conn.send(&ServerFrame::Reply(reply)).await?;
                    return Ok(());
                }

                let opts = RoomOptions {
                    name,
                    max_seats,
                    small_blind,
                    big_blind,
                    secret: self.secret.clone(),
                };
                let room = self.rooms.create(opts).await;

                let reply = room
                    .join(session_id.clone(), username, self.frames_tx.clone())
                    .await;
                if reply.success {
                    self.room = Some((room, session_id));
                }
                conn.send(&ServerFrame::Reply(reply)).await?;
            }
            ClientCommand::JoinRoom {
                room_id,
                username,
                session_id,
            } if self.room.is_none() => {
                if !session_id.is_valid() {
                    let reply = CommandReply::err("invalid session id");
                    conn.send(&ServerFrame::Reply(reply)).await?;
                    return Ok(());
                }

                let reply = match self.rooms.lookup(&room_id).await {
                    Some(room) => {
                        let reply = room
                            .join(session_id.clone(), username, self.frames_tx.clone())
                            .await;
                        if reply.success {
                            self.room = Some((room, session_id));
                        }
                        reply
                    }
                    None => CommandReply::err("room not found"),
                };
                conn.send(&ServerFrame::Reply(reply)).await?;
            }
            cmd => {
                // In-room commands are acknowledged by the room actor on
                // this connection's frames channel, in command order.
                if let Some((room, session_id)) = &self.room {
                    room.command(session_id.clone(), cmd).await;
                } else {
                    let reply = CommandReply::err("not in a room");
                    conn.send(&ServerFrame::Reply(reply)).await?;
                }
            }
        }

        Ok(())
    }
}
