// Copyright (C) 2025  Vince Vasta.
// SPDX-License-Identifier: Apache-2.0

//! WebSocket connection types.
//!
//! Connections carry bincode encoded frames as binary WebSocket
//! messages. The connect side exists for clients and tests.
use anyhow::{anyhow, Result};
use futures_util::{SinkExt, StreamExt};
use serde::{de::DeserializeOwned, Serialize};
use tokio::net::TcpStream;
use tokio_tungstenite::{
    self as websocket,
    tungstenite::{protocol::WebSocketConfig, Message as WsMessage},
    MaybeTlsStream, WebSocketStream,
};

use tablestakes_core::message;

/// Maximum message length.
const MAX_MSG_LEN: usize = 16384;

/// A WebSocket connection for typed frames.
pub struct Connection {
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

impl Connection {
    /// Creates a new connection.
    fn new(stream: WebSocketStream<MaybeTlsStream<TcpStream>>) -> Self {
        Self { stream }
    }

    /// Sends a frame.
    pub async fn send<T: Serialize>(&mut self, msg: &T) -> Result<()> {
        self.stream
            .send(WsMessage::binary(message::encode(msg)))
            .await?;

        Ok(())
    }

    /// Waits for a frame.
    ///
    /// Returns None when the peer closed the stream; a malformed payload
    /// is an error the caller terminates the connection on.
    pub async fn recv<T: DeserializeOwned>(&mut self) -> Option<Result<T>> {
        loop {
            match self.stream.next().await {
                Some(Ok(WsMessage::Binary(payload))) => break Some(message::decode(&payload)),
                Some(Ok(WsMessage::Close(_))) => break None,
                Some(Ok(_)) => continue,
                Some(Err(e)) => break Some(Err(anyhow!("Connection error: {e}"))),
                None => break None,
            }
        }
    }

    /// Closes this connection.
    pub async fn close(&mut self) {
        let _ = self.stream.close(None).await;
    }
}

/// Creates a [Connection] from a server stream.
pub async fn accept_async(stream: TcpStream) -> Result<Connection> {
    let config = WebSocketConfig::default().max_message_size(Some(MAX_MSG_LEN));

    let stream =
        websocket::accept_async_with_config(MaybeTlsStream::Plain(stream), Some(config)).await?;

    Ok(Connection::new(stream))
}

/// Connects to a server and returns a [Connection] if successful.
pub async fn connect_async(addr: &str) -> Result<Connection> {
    let config = WebSocketConfig::default().max_message_size(Some(MAX_MSG_LEN));

    let url = format!("ws://{addr}");
    let (stream, _) = websocket::connect_async_with_config(&url, Some(config), false).await?;

    Ok(Connection::new(stream))
}
