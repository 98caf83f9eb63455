//! Test Helper Utilities
//!
//! Shared utilities for testing sonicsim-fp

#![allow(dead_code)]

pub mod audio_generator;
pub mod db_utils;

pub use audio_generator::{
    generate_test_wav, melody, silence, sweep, write_wav, AudioConfig, Signal, TEST_RATE,
};
pub use db_utils::{create_test_store, small_batch_store};

/// Install a test subscriber once; honours `RUST_LOG`
pub fn init_test_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("sonicsim_fp=debug")),
        )
        .with_test_writer()
        .try_init();
}
