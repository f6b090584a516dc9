//! Core domain + pipeline for the channel backup bot.
//!
//! This crate is platform-agnostic. Discord lives behind ports
//! (traits) implemented in adapter crates.

pub mod config;
pub mod domain;
pub mod errors;
pub mod logging;
pub mod messaging;
pub mod migration;

pub use errors::{Error, Result};
