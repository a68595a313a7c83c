//! One connected client, from upgrade through disconnect.

use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::extract::ws::{Message, WebSocket};
use futures::{SinkExt, StreamExt};
use herald_core::errors::INVALID_PAYLOAD;
use metrics::{counter, gauge, histogram};
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, debug, error, info, instrument, warn};

use crate::config::ServerConfig;
use crate::dispatcher::Dispatcher;
use crate::protocol::Response;
use crate::session::Session;

use super::codec;
use super::liveness::Liveness;

/// Per-connection tunables.
#[derive(Clone, Copy, Debug)]
pub struct SessionOptions {
    /// Capacity of the session's outbound queue.
    pub outbound_capacity: usize,
    /// Interval between server Ping frames.
    pub heartbeat_interval: Duration,
    /// Disconnect after this much silence from the client.
    pub heartbeat_timeout: Duration,
}

impl From<&ServerConfig> for SessionOptions {
    fn from(config: &ServerConfig) -> Self {
        Self {
            outbound_capacity: config.outbound_capacity,
            heartbeat_interval: config.heartbeat_interval(),
            heartbeat_timeout: config.heartbeat_timeout(),
        }
    }
}

/// Run a WebSocket session for a connected client.
///
/// 1. Registers a new [`Session`] and sends `connection.established`
/// 2. Decodes each inbound frame and hands it to the dispatcher, one at a
///    time, so a session's commands run in issue order
/// 3. Forwards responses and published messages from the session's queue
/// 4. Pings periodically and drops clients that stay silent too long
/// 5. Purges the session from the hub on exit
#[instrument(skip_all, fields(session_id))]
pub async fn run_ws_session(
    ws: WebSocket,
    dispatcher: Dispatcher,
    options: SessionOptions,
    shutdown: CancellationToken,
) {
    let (mut ws_tx, mut ws_rx) = ws.split();

    let (session, mut outbound_rx) = Session::channel(options.outbound_capacity);
    let session_id = session.id().clone();
    let _ = tracing::Span::current().record("session_id", session_id.as_str());

    dispatcher.on_connect(session.clone());
    counter!("ws_connections_total").increment(1);
    gauge!("ws_connections_active").increment(1.0);
    let connection_start = Instant::now();

    let greeting = codec::connection_established(&session_id);
    let _ = ws_tx.send(Message::Text(greeting.into())).await;

    let liveness = Arc::new(Liveness::new());
    let outbound_liveness = liveness.clone();
    let mut outbound = tokio::spawn(
        async move {
            let mut ping_interval = tokio::time::interval(options.heartbeat_interval);
            // Skip the immediate first tick
            let _ = ping_interval.tick().await;

            loop {
                tokio::select! {
                    item = outbound_rx.recv() => {
                        let Some(item) = item else { break };
                        let text = match codec::encode(&item) {
                            Ok(text) => text,
                            Err(e) => {
                                error!(error = %e, "failed to encode outbound item");
                                continue;
                            }
                        };
                        if ws_tx.send(Message::Text(text.into())).await.is_err() {
                            break;
                        }
                    }
                    _ = ping_interval.tick() => {
                        if outbound_liveness.is_expired(options.heartbeat_timeout) {
                            warn!(
                                silent_secs = outbound_liveness.silent_for().as_secs(),
                                "client unresponsive, disconnecting"
                            );
                            break;
                        }
                        if ws_tx.send(Message::Ping(Vec::new().into())).await.is_err() {
                            break;
                        }
                    }
                }
            }
            let _ = ws_tx.close().await;
        }
        .in_current_span(),
    );

    loop {
        let frame = tokio::select! {
            frame = ws_rx.next() => frame,
            _ = &mut outbound => {
                debug!("outbound writer finished");
                break;
            }
            () = shutdown.cancelled() => {
                info!("server shutting down, closing session");
                break;
            }
        };

        let msg = match frame {
            Some(Ok(msg)) => msg,
            Some(Err(e)) => {
                debug!(error = %e, "websocket read failed");
                break;
            }
            None => break,
        };
        liveness.mark_alive();

        let decoded = match msg {
            Message::Text(text) => codec::decode(text.as_str()),
            Message::Binary(data) => codec::decode_bytes(&data),
            Message::Close(_) => {
                info!("client sent close frame");
                break;
            }
            Message::Ping(_) | Message::Pong(_) => continue,
        };

        match decoded {
            Ok(parts) => {
                let _ = dispatcher.handle(&session, parts).await;
            }
            Err(e) => {
                counter!("ws_invalid_frames_total").increment(1);
                warn!(error = %e, "malformed frame");
                if !session.respond(Response::rejected(INVALID_PAYLOAD, e.to_string())) {
                    warn!("failed to enqueue rejection (channel full or closed)");
                }
            }
        }
    }

    outbound.abort();
    let _ = dispatcher.on_disconnect(&session_id);
    info!(
        dropped_messages = session.drop_count(),
        "client disconnected"
    );
    counter!("ws_disconnections_total").increment(1);
    gauge!("ws_connections_active").decrement(1.0);
    histogram!("ws_connection_duration_seconds")
        .record(connection_start.elapsed().as_secs_f64());
}

#[cfg(test)]
mod tests {
    // The socket loop itself is driven end to end in tests/integration.rs.
    use super::*;

    #[test]
    fn options_follow_config() {
        let config = ServerConfig {
            outbound_capacity: 4,
            heartbeat_interval_secs: 5,
            heartbeat_timeout_secs: 15,
            ..ServerConfig::default()
        };
        let options = SessionOptions::from(&config);
        assert_eq!(options.outbound_capacity, 4);
        assert_eq!(options.heartbeat_interval, Duration::from_secs(5));
        assert_eq!(options.heartbeat_timeout, Duration::from_secs(15));
    }
}
