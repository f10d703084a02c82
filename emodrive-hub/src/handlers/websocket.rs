//! Viewer WebSocket handler
//!
//! Each connection at `/live2d` becomes one forwarder session. Viewers only
//! listen; anything they send is ignored.

use std::net::SocketAddr;
use std::sync::Arc;

use async_trait::async_trait;
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use tracing::{debug, warn};
use warp::ws::{Message, WebSocket};
use warp::Filter;

use emodrive_core::{EmoError, EmoResult};

use crate::forwarder::{MessageForwarder, Transport};

/// WebSocket route at /live2d
pub fn route(
    forwarder: Arc<MessageForwarder>,
) -> impl Filter<Extract = (impl warp::Reply,), Error = warp::Rejection> + Clone {
    warp::path("live2d")
        .and(warp::path::end())
        .and(warp::ws())
        .and(warp::addr::remote())
        .map(move |ws: warp::ws::Ws, addr: Option<SocketAddr>| {
            let forwarder = forwarder.clone();
            ws.on_upgrade(move |socket| handle_connection(socket, addr, forwarder))
        })
}

/// Register a session and drain it into the socket until either side quits
async fn handle_connection(
    socket: WebSocket,
    addr: Option<SocketAddr>,
    forwarder: Arc<MessageForwarder>,
) {
    let session = forwarder.register().await;
    let transport = WsTransport::new(socket, addr);
    forwarder.deliver(session, transport).await;
}

/// A warp WebSocket as a forwarder transport
pub struct WsTransport {
    sink: SplitSink<WebSocket, Message>,
    stream: SplitStream<WebSocket>,
    peer: String,
}

impl WsTransport {
    pub fn new(socket: WebSocket, addr: Option<SocketAddr>) -> Self {
        let (sink, stream) = socket.split();
        Self {
            sink,
            stream,
            peer: addr
                .map(|a| a.to_string())
                .unwrap_or_else(|| "unknown".to_string()),
        }
    }
}

#[async_trait]
impl Transport for WsTransport {
    async fn write(&mut self, payload: &str) -> EmoResult<()> {
        self.sink
            .send(Message::text(payload))
            .await
            .map_err(|e| EmoError::session_write(e.to_string()))
    }

    async fn closed(&mut self) {
        while let Some(frame) = self.stream.next().await {
            match frame {
                Ok(msg) if msg.is_close() => return,
                Ok(_) => debug!("ignoring message from viewer {}", self.peer),
                Err(e) => {
                    warn!("WebSocket error from {}: {}", self.peer, e);
                    return;
                }
            }
        }
    }

    async fn close(&mut self) {
        let _ = self.sink.close().await;
    }

    fn peer(&self) -> String {
        self.peer.clone()
    }
}
