//! PM Relay Hub server library.
//! This crate exposes internal modules for integration testing.
//! The binary entry point is in main.rs.

pub mod blocklist;
pub mod config;
pub mod correlate;
pub mod counters;
pub mod dispatch;
pub mod fraud;
pub mod platform;
pub mod registry;
pub mod routes;
pub mod state;
pub mod store;
pub mod telegram;
pub mod verify;
