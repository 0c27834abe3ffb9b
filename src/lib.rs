//! Flappy Server Library
//!
//! Runs an isolated side-scrolling simulation for every connected player,
//! each ticking on its own task and expiring when the client stops polling.
//!
//! # Features
//!
//! - `metrics_endpoint` - Prometheus/JSON status endpoint (enabled by default)

pub mod config;
pub mod game;
pub mod metrics;
pub mod session;
