use std::{fmt, io};

/// Failures the engine can report to its front end.
///
/// Only `AudioUnavailable` is fatal. The MIDI variants are one-shot status
/// reports; the engine keeps running on pointer and keyboard input.
#[derive(Debug)]
pub enum EngineError {
    /// No audio output could be opened.
    AudioUnavailable(String),
    /// No MIDI input device is present.
    NoMidiInput,
    /// The bound MIDI input went away mid-session.
    MidiDisconnected { device: String },
    /// A settings document that is not JSON at all.
    MalformedSnapshot(String),
    Io(io::Error),
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EngineError::AudioUnavailable(reason) => {
                write!(f, "audio output unavailable: {reason}")
            }
            EngineError::NoMidiInput => f.write_str("No MIDI input devices found."),
            EngineError::MidiDisconnected { device } => {
                write!(f, "MIDI Disconnected: {device}")
            }
            EngineError::MalformedSnapshot(reason) => {
                write!(f, "malformed settings snapshot: {reason}")
            }
            EngineError::Io(err) => write!(f, "i/o error: {err}"),
        }
    }
}

impl std::error::Error for EngineError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            EngineError::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<io::Error> for EngineError {
    fn from(err: io::Error) -> Self {
        EngineError::Io(err)
    }
}

pub type Result<T, E = EngineError> = std::result::Result<T, E>;
