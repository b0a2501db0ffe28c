//! Configuration module
//!
//! Contains the player configuration loaded from JSON.

mod player_config;

pub use player_config::*;
