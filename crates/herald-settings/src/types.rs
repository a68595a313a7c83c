//! Settings types.
//!
//! All structs use camelCase JSON keys and `#[serde(default)]`, so a settings
//! file only needs to name the values it overrides.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Root settings object.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct HeraldSettings {
    /// Network and session-channel settings.
    pub server: ServerSettings,
    /// Fan-out behaviour of `PUB`.
    pub publish: PublishSettings,
    /// Token table for the static authenticator.
    pub auth: AuthSettings,
    /// Log output.
    pub logging: LoggingSettings,
}

/// Server network and runtime settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ServerSettings {
    /// Bind address.
    pub host: String,
    /// Bind port (`0` for auto-assign).
    pub port: u16,
    /// Capacity of each session's outbound queue. Messages beyond it are dropped.
    pub outbound_capacity: usize,
    /// Largest accepted WebSocket frame in bytes.
    pub max_frame_bytes: usize,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 7878,
            outbound_capacity: 256,
            max_frame_bytes: 64 * 1024,
        }
    }
}

/// Publish settings.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PublishSettings {
    /// Whether a publisher that follows the topic receives its own message.
    pub echo_to_sender: bool,
}

/// Authentication settings.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AuthSettings {
    /// Accepted tokens mapped to the principal they authenticate as.
    pub tokens: BTreeMap<String, String>,
}

/// Logging settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LoggingSettings {
    /// `EnvFilter` directive used when `RUST_LOG` is unset.
    pub level: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}
