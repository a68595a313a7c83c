//! # herald-server
//!
//! Command dispatch and pub/sub fan-out, plus the axum gateway that feeds it.
//!
//! - [`Hub`]: connected sessions and the follower table behind one lock order
//! - [`Command`] trait, the built-in [`commands`], and the [`CommandRegistry`]
//! - [`Dispatcher`]: arity check, authorization, execution, response
//! - `WebSocket` gateway: JSON framing, heartbeat, per-connection session loop
//! - Graceful shutdown via `CancellationToken`

#![deny(unsafe_code)]

pub mod auth;
pub mod command;
pub mod commands;
pub mod config;
pub mod dispatcher;
pub mod followers;
pub mod health;
pub mod hub;
pub mod protocol;
pub mod registry;
pub mod server;
pub mod session;
pub mod sessions;
pub mod shutdown;
pub mod websocket;

pub use auth::{Authenticator, StaticTokenAuthenticator};
pub use command::{Command, CommandKind, Payload, is_permitted};
pub use commands::FanOut;
pub use config::ServerConfig;
pub use dispatcher::{Dispatcher, Outcome};
pub use hub::Hub;
pub use protocol::{Outbound, Response};
pub use registry::CommandRegistry;
pub use server::HeraldServer;
pub use session::Session;
