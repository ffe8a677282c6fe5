// Copyright (C) 2025 Vince Vasta
// SPDX-License-Identifier: Apache-2.0

//! Rooms registry.
//!
//! The registry is the only structure shared across rooms; it holds the
//! public room table behind a short mutex for insert, lookup, and the
//! removal a room performs on itself when its empty grace window elapses.
use ahash::AHashMap;
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc, Mutex};

use tablestakes_core::poker::RoomId;

use crate::room::{Room, RoomOptions};

/// The room table shared by the connection handlers and the room actors.
#[derive(Debug, Clone)]
pub struct RoomsRegistry {
    rooms: Arc<Mutex<AHashMap<RoomId, Room>>>,
    shutdown_broadcast_tx: broadcast::Sender<()>,
    shutdown_complete_tx: mpsc::Sender<()>,
}

impl RoomsRegistry {
    /// Creates an empty registry whose rooms listen for shutdown.
    pub fn new(
        shutdown_broadcast_tx: &broadcast::Sender<()>,
        shutdown_complete_tx: &mpsc::Sender<()>,
    ) -> Self {
        Self {
            rooms: Arc::new(Mutex::new(AHashMap::new())),
            shutdown_broadcast_tx: shutdown_broadcast_tx.clone(),
            shutdown_complete_tx: shutdown_complete_tx.clone(),
        }
    }

    /// Creates a room with a fresh join code and spawns its actor.
    pub async fn create(&self, opts: RoomOptions) -> Room {
        let mut rooms = self.rooms.lock().await;

        let mut rng = rand::rng();
        let room_id = loop {
            let id = RoomId::new_id(&mut rng);
            if !rooms.contains_key(&id) {
                break id;
            }
        };

        let room = Room::new(
            room_id.clone(),
            opts,
            self.clone(),
            self.shutdown_broadcast_tx.subscribe(),
            self.shutdown_complete_tx.clone(),
        );
        rooms.insert(room_id, room.clone());

        room
    }

    /// Looks a room up by its join code.
    pub async fn lookup(&self, room_id: &RoomId) -> Option<Room> {
        self.rooms.lock().await.get(room_id).cloned()
    }

    /// Removes a room, called by its actor when the reap timer fires.
    pub async fn remove(&self, room_id: &RoomId) {
        self.rooms.lock().await.remove(room_id);
    }
}
