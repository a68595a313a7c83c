//! Server configuration.

use std::time::Duration;

use herald_settings::HeraldSettings;
use serde::{Deserialize, Serialize};

/// Runtime configuration of the gateway.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Host to bind (default `"127.0.0.1"`).
    pub host: String,
    /// Port to bind (`0` for auto-assign).
    pub port: u16,
    /// Capacity of each session's outbound queue.
    pub outbound_capacity: usize,
    /// Largest accepted WebSocket frame in bytes.
    pub max_frame_bytes: usize,
    /// Interval between server Ping frames, in seconds.
    pub heartbeat_interval_secs: u64,
    /// Disconnect a client silent for this many seconds.
    pub heartbeat_timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".into(),
            port: 0,
            outbound_capacity: 256,
            max_frame_bytes: 64 * 1024,
            heartbeat_interval_secs: 30,
            heartbeat_timeout_secs: 60,
        }
    }
}

impl ServerConfig {
    /// Take the `server` section of loaded settings.
    pub fn from_settings(settings: &HeraldSettings) -> Self {
        let server = &settings.server;
        Self {
            host: server.host.clone(),
            port: server.port,
            outbound_capacity: server.outbound_capacity,
            max_frame_bytes: server.max_frame_bytes,
            ..Self::default()
        }
    }

    /// Ping interval as a `Duration`.
    pub fn heartbeat_interval(&self) -> Duration {
        Duration::from_secs(self.heartbeat_interval_secs)
    }

    /// Silence timeout as a `Duration`.
    pub fn heartbeat_timeout(&self) -> Duration {
        Duration::from_secs(self.heartbeat_timeout_secs)
    }

    /// `host:port` for binding.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
