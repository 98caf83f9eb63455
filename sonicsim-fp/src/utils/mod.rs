//! Utility modules for sonicsim-fp

pub mod audio_decoder;
pub mod db_retry;
pub mod resample;

pub use audio_decoder::{decode_audio_file, DecodedAudio};
pub use db_retry::retry_on_lock;
pub use resample::resample_mono;
