//! Mock feed server for integration tests.
//!
//! Accepts websocket connections, records handshake headers and plays a
//! fixed script of messages to every client. Can reject handshakes that
//! lack a given header, the way an anti-bot filter would.

#![allow(dead_code)]

use futures_util::{SinkExt, StreamExt};
use parking_lot::Mutex;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};
use tokio_tungstenite::tungstenite::http::{HeaderMap, StatusCode};
use tokio_tungstenite::{accept_hdr_async, tungstenite::Message};

/// What the server does after the handshake.
#[derive(Debug, Clone)]
pub enum Script {
    /// Send the messages in order, then wait for the client to close.
    Send(Vec<Message>),
    /// Close right after the handshake.
    CloseImmediately,
}

/// A mock feed server.
pub struct MockFeedServer {
    addr: SocketAddr,
    shutdown_tx: mpsc::Sender<()>,
    handshakes: Arc<Mutex<Vec<HeaderMap>>>,
}

impl MockFeedServer {
    /// Start a server on an available port.
    pub async fn start(script: Script) -> Self {
        Self::start_inner(script, None).await
    }

    /// Start a server that answers 403 to handshakes without `header`.
    pub async fn start_requiring(script: Script, header: &'static str) -> Self {
        Self::start_inner(script, Some(header)).await
    }

    async fn start_inner(script: Script, required: Option<&'static str>) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let handshakes: Arc<Mutex<Vec<HeaderMap>>> = Arc::new(Mutex::new(Vec::new()));
        let (shutdown_tx, mut shutdown_rx) = mpsc::channel::<()>(1);

        let handshakes_clone = handshakes.clone();
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    Ok((stream, _)) = listener.accept() => {
                        let handshakes = handshakes_clone.clone();
                        tokio::spawn(handle_connection(stream, script.clone(), required, handshakes));
                    }
                    _ = shutdown_rx.recv() => {
                        break;
                    }
                }
            }
        });

        Self {
            addr,
            shutdown_tx,
            handshakes,
        }
    }

    /// Websocket URL of the server.
    pub fn url(&self) -> String {
        format!("ws://{}/dex/screener/pairs", self.addr)
    }

    /// Headers of every completed handshake.
    pub fn handshakes(&self) -> Vec<HeaderMap> {
        self.handshakes.lock().clone()
    }

    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(()).await;
    }
}

async fn handle_connection(
    stream: TcpStream,
    script: Script,
    required: Option<&'static str>,
    handshakes: Arc<Mutex<Vec<HeaderMap>>>,
) {
    let record = |request: &Request, response: Response| -> Result<Response, ErrorResponse> {
        if let Some(name) = required {
            if !request.headers().contains_key(name) {
                let mut rejection = ErrorResponse::new(Some(format!("missing {name}")));
                *rejection.status_mut() = StatusCode::FORBIDDEN;
                return Err(rejection);
            }
        }
        handshakes.lock().push(request.headers().clone());
        Ok(response)
    };

    let ws_stream = match accept_hdr_async(stream, record).await {
        Ok(ws) => ws,
        Err(e) => {
            eprintln!("WebSocket handshake failed: {}", e);
            return;
        }
    };

    let (mut write, mut read) = ws_stream.split();

    match script {
        Script::CloseImmediately => {
            let _ = write.send(Message::Close(None)).await;
        }
        Script::Send(messages) => {
            for message in messages {
                if write.send(message).await.is_err() {
                    return;
                }
            }
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
