//! JSON framing for the WebSocket transport.
//!
//! Inbound frames are JSON arrays of strings (`["PUB","room1","hello"]`).
//! Outbound items are tagged objects, see [`Outbound`].

use herald_core::SessionId;
use serde_json::json;

use crate::protocol::Outbound;

/// Why an inbound frame could not become a payload.
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    /// Binary frame that is not UTF-8 text.
    #[error("frame is not valid UTF-8")]
    NotUtf8,
    /// Text that is not an array of strings.
    #[error("frame must be a JSON array of strings: {0}")]
    Json(#[from] serde_json::Error),
}

/// Decode a text frame into payload parts.
pub fn decode(text: &str) -> Result<Vec<String>, CodecError> {
    Ok(serde_json::from_str(text)?)
}

/// Decode a binary frame holding UTF-8 JSON.
pub fn decode_bytes(data: &[u8]) -> Result<Vec<String>, CodecError> {
    let text = std::str::from_utf8(data).map_err(|_| CodecError::NotUtf8)?;
    decode(text)
}

/// Encode an outbound item as JSON text.
pub fn encode(item: &Outbound) -> Result<String, serde_json::Error> {
    serde_json::to_string(item)
}

/// The greeting sent right after the upgrade.
pub fn connection_established(id: &SessionId) -> String {
    json!({
        "type": "connection.established",
        "sessionId": id,
        "timestamp": chrono::Utc::now().to_rfc3339(),
    })
    .to_string()
}
