//! WebSocket gateway: frame codec, liveness tracking, and the per-connection
//! session loop.

pub mod codec;
pub mod liveness;
pub mod session;
