use crate::{
    dsp::oscillator::Waveform,
    graph::command::SourceIndex,
    io::connection::MidiStatus,
    synth::{
        modulation::ModTarget,
        orchestrator::{InputSource, NoteIdentity},
    },
};

/// One command per UI or MIDI callback. Each is processed to completion
/// before the next one starts.
#[derive(Debug, Clone, PartialEq)]
pub enum SynthCommand {
    /// Pointer or computer-keyboard press on a named key.
    PressNote { name: String, source: InputSource },
    /// Pointer or computer-keyboard release of a named key.
    ReleaseNote { name: String, source: InputSource },
    /// Pointer released anywhere.
    PointerReleased,
    MidiNoteOn { note: u8, velocity: u8 },
    MidiNoteOff { note: u8 },
    SetMasterVolume(f32),
    SetWaveform(Waveform),
    SetCutoff(f32),
    SetResonance(f32),
    SetSourceRate { source: SourceIndex, rate: f32 },
    SetSourceWaveform { source: SourceIndex, waveform: Waveform },
    SetSourceDepth { source: SourceIndex, depth: f32 },
    SetSourceTarget { source: SourceIndex, target: ModTarget },
    ToggleSourcePause { source: SourceIndex },
}

/// Controls that MIDI can move behind the front end's back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Control {
    MasterVolume,
    Cutoff,
    Resonance,
}

/// Observable engine output, drained by the front end.
#[derive(Debug, Clone, PartialEq)]
pub enum SynthEvent {
    NoteOn(NoteIdentity),
    NoteOff(NoteIdentity),
    ControlChanged { control: Control, value: f32 },
    Midi(MidiStatus),
}
