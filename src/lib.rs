//! Demon Dash gameplay core
//!
//! Headless simulation of a top-down survival arena: enemies spawn off
//! screen from a recycled pool and chase the player, and the player fights
//! back by dashing through them.
//!
//! # Features
//!
//! - `slow_motion` - Idle slow motion: the clock slows while the player stands still (enabled by default)
//! - `minimal` - Build without optional features for testing/debugging

pub mod config;
pub mod game;
pub mod util;
