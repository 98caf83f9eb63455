//! # sonicsim common library
//!
//! Shared code for the sonicsim crates:
//! - Error type and `Result` alias
//! - Config file helpers and data folder resolution
//! - SQLite pool opening

pub mod config;
pub mod db;
pub mod error;

pub use error::{Error, Result};
