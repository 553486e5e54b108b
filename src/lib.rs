pub mod config;
pub mod dsp;
pub mod error;
pub mod graph; // Audio-thread renderer and its command queue
pub mod io; // MIDI decoding and device binding
pub mod synth; // Control plane: notes, modulation routing, settings

pub use config::EngineConfig;
pub use error::{EngineError, Result};
pub use synth::SynthEngine;

pub const MAX_BLOCK_SIZE: usize = 2048;
