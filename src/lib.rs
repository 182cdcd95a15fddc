//! Whirlbird - obstacle engine and score/leaderboard server
//!
//! The `game` module holds the runner's obstacle waves, gate judging and
//! session flow. The remaining modules form the HTTP API that stores scores,
//! serves the leaderboard and publishes results to the social platform.

pub mod app;
pub mod config;
pub mod game;
pub mod http;
pub mod service;
pub mod social;
pub mod store;
pub mod util;
