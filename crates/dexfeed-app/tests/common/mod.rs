//! Shared fixtures for pipeline integration tests.

#![allow(dead_code)]

use futures_util::{SinkExt, StreamExt};
use std::net::SocketAddr;
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::{accept_async, tungstenite::Message};

/// Feed server that plays the same messages to every client.
///
/// An empty script closes right after the handshake.
pub struct MockFeed {
    addr: SocketAddr,
}

impl MockFeed {
    pub async fn start(messages: Vec<Message>) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                tokio::spawn(serve(stream, messages.clone()));
            }
        });

        Self { addr }
    }

    pub fn url(&self) -> String {
        format!("ws://{}/dex/screener/pairs/h24/1", self.addr)
    }
}

async fn serve(stream: TcpStream, messages: Vec<Message>) {
    let Ok(ws) = accept_async(stream).await else {
        return;
    };
    let (mut write, mut read) = ws.split();

    if messages.is_empty() {
        let _ = write.send(Message::Close(None)).await;
    }
    for message in messages {
        if write.send(message).await.is_err() {
            return;
        }
    }

    while let Some(msg) = read.next().await {
        match msg {
            Ok(Message::Ping(data)) => {
                let _ = write.send(Message::Pong(data)).await;
            }
            Ok(Message::Close(_)) | Err(_) => break,
            _ => {}
        }
    }
}
