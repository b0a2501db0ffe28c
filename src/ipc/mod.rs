//! IPC communication module
//!
//! JSON-lines control protocol over stdin/stdout.

mod protocol;
mod server;

pub use protocol::*;
pub use server::{forward_events, IpcServer};
