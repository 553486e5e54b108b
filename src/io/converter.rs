use crate::{
    config::MAX_CUTOFF_HZ,
    dsp::filter::{MAX_RESONANCE_DB, MIN_CUTOFF_HZ},
    io::midi::MidiEvent,
    synth::message::SynthCommand,
};

/// Controller numbers the engine responds to.
pub const CC_MASTER_VOLUME: u8 = 7;
pub const CC_RESONANCE: u8 = 71;
pub const CC_CUTOFF: u8 = 74;

/// Map a decoded MIDI event to the engine command it stands for.
///
/// The channel is not used for filtering: every channel drives the one voice.
/// Controllers other than 7, 71 and 74 map to nothing.
pub fn midi_to_command(midi: MidiEvent) -> Option<SynthCommand> {
    match midi {
        MidiEvent::NoteOn { key, velocity, .. } => Some(SynthCommand::MidiNoteOn {
            note: key,
            velocity,
        }),
        MidiEvent::NoteOff { key, .. } => Some(SynthCommand::MidiNoteOff { note: key }),
        MidiEvent::ControlChange {
            controller, value, ..
        } => match controller {
            CC_MASTER_VOLUME => Some(SynthCommand::SetMasterVolume(cc_to_master_volume(value))),
            CC_CUTOFF => Some(SynthCommand::SetCutoff(cc_to_cutoff(value))),
            CC_RESONANCE => Some(SynthCommand::SetResonance(cc_to_resonance(value))),
            _ => None,
        },
    }
}

pub fn midi_note_to_freq(note: u8) -> f32 {
    440.0 * 2.0_f32.powf((note as f32 - 69.0) / 12.0)
}

/// Clamp `value` into the 7-bit range and normalize to 0.0..=1.0.
#[inline]
fn normalize(value: u8) -> f32 {
    f32::from(value.min(127)) / 127.0
}

/// Note-on velocity → initial amplitude-stage gain, linear.
pub fn velocity_to_gain(velocity: u8) -> f32 {
    normalize(velocity)
}

/// CC7, linear 0.0–1.0.
pub fn cc_to_master_volume(value: u8) -> f32 {
    normalize(value)
}

/// CC74, exponential across the audible cutoff range:
///
/// ```text
/// freq = 20 · (15000 / 20)^(value / 127)
/// ```
///
/// Equal CC steps give equal musical intervals.
pub fn cc_to_cutoff(value: u8) -> f32 {
    MIN_CUTOFF_HZ * (MAX_CUTOFF_HZ / MIN_CUTOFF_HZ).powf(normalize(value))
}

/// CC71, linear 0–30 (Q in dB).
pub fn cc_to_resonance(value: u8) -> f32 {
    normalize(value) * MAX_RESONANCE_DB
}
