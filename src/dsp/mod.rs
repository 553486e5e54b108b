//! Low-level DSP primitives used by the audio graph.
//!
//! These components are allocation-free and realtime-safe, making them safe to
//! embed directly inside voice structs. They stay focused on the
//! signal-processing math; the graph layer owns scheduling and routing.

/// Resonant lowpass state-variable filter.
pub mod filter;
/// Modulation-source rate conventions.
pub mod lfo;
/// Oscillator waveforms.
pub mod oscillator;
/// Click-free parameter ramps.
pub mod ramp;

pub use oscillator::Waveform;
pub use ramp::AudioParam;
