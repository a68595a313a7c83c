//! # herald-core
//!
//! Foundation types shared by every Herald crate:
//!
//! - **Session IDs**: [`SessionId`] newtype over a UUID v7 string
//! - **Errors**: [`CommandError`] taxonomy for command dispatch, with wire codes
//! - **Logging**: `tracing` subscriber setup and in-memory capture for tests

#![deny(unsafe_code)]

pub mod errors;
pub mod ids;
pub mod logging;

pub use errors::{CommandError, ErrorBody};
pub use ids::SessionId;
