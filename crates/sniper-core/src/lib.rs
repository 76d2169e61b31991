//! Core domain + cache logic for the sniper bot.
//!
//! This crate is intentionally platform-agnostic. Discord lives behind ports
//! (traits) implemented in the adapter crate; the core only knows about
//! tracked message versions, their expiry, and how a snipe is selected.

pub mod cache;
pub mod config;
pub mod domain;
pub mod errors;
pub mod expiry;
pub mod logging;
pub mod pruner;
pub mod query;
pub mod render;
pub mod tracker;

#[cfg(test)]
pub(crate) mod test_support;

pub use errors::{Error, Result};
