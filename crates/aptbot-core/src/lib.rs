//! Core domain + application logic for the apartment-registry bot.
//!
//! This crate is intentionally framework-agnostic. Telegram and SQLite live
//! behind ports (traits) implemented in adapter crates.

pub mod batch;
pub mod catalog;
pub mod commands;
pub mod config;
pub mod dispatch;
pub mod domain;
pub mod errors;
pub mod logging;
pub mod messaging;
pub mod parse;
pub mod registry;
pub mod render;

pub use errors::{Error, Result};
