// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Connection layer (§4.3, C3).
//!
//! Accepts both plain line-oriented TCP clients and browser clients that
//! open a WebSocket handshake on the same port, framing each into a
//! [`Frame`] and forwarding it to the single-threaded dispatch loop over a
//! channel — `DriverState` itself is never touched from these tasks (§5).
//! Outbound frames flow the other way over a per-session channel the
//! orchestrator drains from each session's `OutboundQueue`.

use futures_util::{SinkExt, StreamExt};
use mud_core::SessionId;
use mud_wire::{Frame, FrameCodec, WireError};
use std::net::SocketAddr;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tokio_util::codec::Framed;
use tracing::{debug, info, warn};

/// One event the orchestrator's run loop reacts to (§4.9 "running").
#[derive(Debug)]
pub enum ConnectionEvent {
    Accepted { session_id: SessionId, remote_host: Option<String>, outbound: mpsc::UnboundedSender<Frame> },
    Frame { session_id: SessionId, frame: Frame },
    Closed { session_id: SessionId },
}

/// Accept loop for `addr` (§4.9 bullet "open listening sockets"). Every
/// accepted connection is handed its own pumped I/O task; this function
/// only returns on a bind/accept failure.
pub async fn run(addr: SocketAddr, events: mpsc::UnboundedSender<ConnectionEvent>) -> std::io::Result<()> {
    let listener = TcpListener::bind(addr).await?;
    info!(%addr, "listening");
    loop {
        let (stream, remote) = listener.accept().await?;
        let events = events.clone();
        tokio::spawn(async move {
            handle_connection(stream, remote, events).await;
        });
    }
}

/// First three bytes of an HTTP/1.1 request line, used to distinguish a
/// WebSocket upgrade from a raw line-oriented client sharing the same port
/// (§4.3 "(added) Optional WebSocket upgrade").
const HTTP_PROBE_LEN: usize = 3;
const HTTP_PROBE: &[u8; HTTP_PROBE_LEN] = b"GET";

async fn handle_connection(stream: TcpStream, remote: SocketAddr, events: mpsc::UnboundedSender<ConnectionEvent>) {
    let session_id = SessionId::new(uuid::Uuid::new_v4().to_string());
    let mut probe = [0u8; HTTP_PROBE_LEN];
    let is_websocket = matches!(stream.peek(&mut probe).await, Ok(n) if n == HTTP_PROBE_LEN && &probe == HTTP_PROBE);

    let (outbound_tx, outbound_rx) = mpsc::unbounded_channel::<Frame>();
    if events
        .send(ConnectionEvent::Accepted {
            session_id: session_id.clone(),
            remote_host: Some(remote.to_string()),
            outbound: outbound_tx,
        })
        .is_err()
    {
        return;
    }

    let result = if is_websocket {
        run_websocket(stream, session_id.clone(), &events, outbound_rx).await
    } else {
        run_plain(stream, session_id.clone(), &events, outbound_rx).await
    };

    if let Err(err) = result {
        debug!(%session_id, error = %err, "connection closed");
    }
    let _ = events.send(ConnectionEvent::Closed { session_id });
}

async fn run_plain(
    stream: TcpStream,
    session_id: SessionId,
    events: &mpsc::UnboundedSender<ConnectionEvent>,
    mut outbound_rx: mpsc::UnboundedReceiver<Frame>,
) -> Result<(), WireError> {
    let mut framed = Framed::new(stream, FrameCodec::new());
    loop {
        tokio::select! {
            incoming = framed.next() => {
                match incoming {
                    Some(Ok(frame)) => {
                        if events.send(ConnectionEvent::Frame { session_id: session_id.clone(), frame }).is_err() {
                            return Ok(());
                        }
                    }
                    Some(Err(WireError::FrameTooLong | WireError::UnknownTag(_) | WireError::UnterminatedTag | WireError::InvalidJson(_))) => {
                        // Malformed, not fatal (§7): drop the frame and keep the session open.
                        continue;
                    }
                    Some(Err(err)) => return Err(err),
                    None => return Ok(()),
                }
            }
            outgoing = outbound_rx.recv() => {
                match outgoing {
                    Some(frame) => framed.send(frame).await?,
                    None => return Ok(()),
                }
            }
        }
    }
}

async fn run_websocket(
    stream: TcpStream,
    session_id: SessionId,
    events: &mpsc::UnboundedSender<ConnectionEvent>,
    mut outbound_rx: mpsc::UnboundedReceiver<Frame>,
) -> Result<(), WireError> {
    let ws = tokio_tungstenite::accept_async(stream).await.map_err(|err| {
        warn!(%session_id, %err, "websocket handshake failed");
        WireError::UnterminatedTag
    })?;
    let (mut write, mut read) = ws.split();
    loop {
        tokio::select! {
            incoming = read.next() => {
                match incoming {
                    Some(Ok(WsMessage::Text(text))) => {
                        match Frame::decode(&text) {
                            Ok(frame) => {
                                if events.send(ConnectionEvent::Frame { session_id: session_id.clone(), frame }).is_err() {
                                    return Ok(());
                                }
                            }
                            Err(_) => continue,
                        }
                    }
                    Some(Ok(WsMessage::Close(_))) | None => return Ok(()),
                    Some(Ok(_)) => continue,
                    Some(Err(_)) => return Ok(()),
                }
            }
            outgoing = outbound_rx.recv() => {
                match outgoing {
                    Some(frame) => {
                        let line = frame.encode()?;
                        if write.send(WsMessage::Text(line.into())).await.is_err() {
                            return Ok(());
                        }
                    }
                    None => return Ok(()),
                }
            }
        }
    }
}
