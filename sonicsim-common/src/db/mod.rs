//! SQLite pool opening shared by the sonicsim crates

pub mod init;

pub use init::{open_database, open_in_memory};
