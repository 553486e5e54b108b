//! Engine construction parameters and control defaults.

/// Master output volume on start-up and in a default snapshot.
pub const DEFAULT_MASTER_VOLUME: f32 = 0.7;
/// Lowpass cutoff on start-up (Hz).
pub const DEFAULT_CUTOFF_HZ: f32 = 5_000.0;
/// Lowpass resonance on start-up (Q in dB).
pub const DEFAULT_RESONANCE: f32 = 1.0;
/// Modulation source rate on start-up (Hz).
pub const DEFAULT_SOURCE_RATE_HZ: f32 = 5.0;

/// Upper end of the cutoff range offered to the user and reached by CC74.
pub const MAX_CUTOFF_HZ: f32 = 15_000.0;

#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    pub sample_rate: f32,
    /// Slots in the control → audio command ring open to parameter updates.
    /// Voice and routing commands get a few more on top.
    pub command_capacity: usize,
    /// Slots in the audio → scope sample ring.
    pub scope_capacity: usize,
    /// Samples kept by the scope tap for display.
    pub scope_len: usize,
    /// Preallocated voice chains. Only one is ever sounding; the rest hold
    /// release tails of stolen notes.
    pub max_voices: usize,
    /// Number of independent modulation sources.
    pub modulation_sources: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            sample_rate: 48_000.0,
            command_capacity: 256,
            scope_capacity: 8_192,
            scope_len: 2_048,
            max_voices: 4,
            modulation_sources: 2,
        }
    }
}

impl EngineConfig {
    pub fn with_sample_rate(sample_rate: f32) -> Self {
        Self {
            sample_rate,
            ..Self::default()
        }
    }
}
