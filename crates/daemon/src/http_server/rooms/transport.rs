use async_trait::async_trait;
use axum::extract::ws::{Message, WebSocket};
use bytes::Bytes;
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};

use common::sync::{Transport, TransportError};

/// Sync transport over an upgraded WebSocket. Frames travel as binary
/// messages; text and control frames are not part of the protocol.
pub struct WsTransport {
    sink: SplitSink<WebSocket, Message>,
    stream: SplitStream<WebSocket>,
}

impl WsTransport {
    pub fn new(socket: WebSocket) -> Self {
        let (sink, stream) = socket.split();
        Self { sink, stream }
    }
}

#[async_trait]
impl Transport for WsTransport {
    async fn send(&mut self, frame: Bytes) -> Result<(), TransportError> {
        self.sink
            .send(Message::Binary(frame.to_vec()))
            .await
            .map_err(|e| TransportError::Failed(e.to_string()))
    }

    async fn recv(&mut self) -> Result<Option<Bytes>, TransportError> {
        loop {
            match self.stream.next().await {
                None => return Ok(None),
                Some(Err(e)) => return Err(TransportError::Failed(e.to_string())),
                Some(Ok(message)) => match message {
                    Message::Binary(frame) => return Ok(Some(Bytes::from(frame))),
                    Message::Close(_) => return Ok(None),
                    // pings are answered by the websocket layer itself
                    Message::Text(_) | Message::Ping(_) | Message::Pong(_) => continue,
                },
            }
        }
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        self.sink
            .close()
            .await
            .map_err(|e| TransportError::Failed(e.to_string()))
    }
}
