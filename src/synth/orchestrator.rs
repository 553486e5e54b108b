use std::fmt;

/*
Note Orchestrator
=================

Monophonic, last-note priority:

    Silent ──note-on──→ Sounding(identity)
       ↑                   │  │
       └────note-off───────┘  └──note-on (new identity)──→ stop current, Sounding(new)

Every note-on stops whatever is sounding first, whatever its origin, so at
most one voice is ever the current note.

A note is identified by its on-screen name and its MIDI number together.
Releases must match the tracked identity:

  name release     matches by name (pointer and computer keyboard)
  MIDI note-off    matches by MIDI number
  pointer release  anywhere: stops the note unless MIDI started it

Key-repeat from the same pointer or keyboard for the note already sounding
is swallowed. MIDI note-ons always restrike.
*/

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputSource {
    Pointer,
    Keyboard,
    Midi,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct NoteIdentity {
    /// On-screen key name, when the keyboard has one for this note.
    pub name: Option<String>,
    pub midi: Option<u8>,
}

impl NoteIdentity {
    pub fn new(name: Option<String>, midi: Option<u8>) -> Self {
        Self { name, midi }
    }
}

impl fmt::Display for NoteIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.name, self.midi) {
            (Some(name), Some(midi)) => write!(f, "{name} ({midi})"),
            (Some(name), None) => f.write_str(name),
            (None, Some(midi)) => write!(f, "MIDI {midi}"),
            (None, None) => f.write_str("-"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum NoteState {
    #[default]
    Silent,
    Sounding {
        identity: NoteIdentity,
        source: InputSource,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoteOnDecision {
    /// Stop whatever sounds and start the new note.
    Start,
    /// Repeat of the sounding note from the same input; do nothing.
    Ignore,
}

#[derive(Debug, Default)]
pub struct NoteOrchestrator {
    state: NoteState,
}

impl NoteOrchestrator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> Option<&NoteIdentity> {
        match &self.state {
            NoteState::Silent => None,
            NoteState::Sounding { identity, .. } => Some(identity),
        }
    }

    pub fn decide_note_on(&self, identity: &NoteIdentity, source: InputSource) -> NoteOnDecision {
        match &self.state {
            NoteState::Sounding {
                identity: current,
                source: current_source,
            } if source != InputSource::Midi && *current_source == source && current == identity => {
                NoteOnDecision::Ignore
            }
            _ => NoteOnDecision::Start,
        }
    }

    pub fn note_started(&mut self, identity: NoteIdentity, source: InputSource) {
        self.state = NoteState::Sounding { identity, source };
    }

    /// Return to Silent, handing back the identity that was sounding.
    pub fn clear(&mut self) -> Option<NoteIdentity> {
        match std::mem::take(&mut self.state) {
            NoteState::Silent => None,
            NoteState::Sounding { identity, .. } => Some(identity),
        }
    }

    pub fn matches_name(&self, name: &str) -> bool {
        self.current()
            .is_some_and(|identity| identity.name.as_deref() == Some(name))
    }

    pub fn matches_midi(&self, note: u8) -> bool {
        self.current()
            .is_some_and(|identity| identity.midi == Some(note))
    }

    /// Whether a global pointer release should stop the current note.
    pub fn stops_on_pointer_release(&self) -> bool {
        matches!(&self.state, NoteState::Sounding { source, .. } if *source != InputSource::Midi)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn c4() -> NoteIdentity {
        NoteIdentity::new(Some("C4".into()), Some(60))
    }

    fn e4() -> NoteIdentity {
        NoteIdentity::new(Some("E4".into()), Some(64))
    }

    #[test]
    fn test_repeat_from_same_input_is_ignored() {
        let mut notes = NoteOrchestrator::new();
        notes.note_started(c4(), InputSource::Keyboard);
        assert_eq!(
            notes.decide_note_on(&c4(), InputSource::Keyboard),
            NoteOnDecision::Ignore
        );
        assert_eq!(
            notes.decide_note_on(&c4(), InputSource::Pointer),
            NoteOnDecision::Start
        );
        assert_eq!(
            notes.decide_note_on(&e4(), InputSource::Keyboard),
            NoteOnDecision::Start
        );
    }

    #[test]
    fn test_midi_always_restrikes() {
        let mut notes = NoteOrchestrator::new();
        notes.note_started(c4(), InputSource::Midi);
        assert_eq!(
            notes.decide_note_on(&c4(), InputSource::Midi),
            NoteOnDecision::Start
        );
    }

    #[test]
    fn test_release_matching() {
        let mut notes = NoteOrchestrator::new();
        assert!(!notes.matches_name("C4"));
        notes.note_started(c4(), InputSource::Pointer);
        assert!(notes.matches_name("C4"));
        assert!(!notes.matches_name("E4"));
        assert!(notes.matches_midi(60));
        assert!(!notes.matches_midi(64));
    }

    #[test]
    fn test_pointer_release_respects_midi() {
        let mut notes = NoteOrchestrator::new();
        assert!(!notes.stops_on_pointer_release());
        notes.note_started(c4(), InputSource::Midi);
        assert!(!notes.stops_on_pointer_release());
        notes.note_started(c4(), InputSource::Keyboard);
        assert!(notes.stops_on_pointer_release());
    }

    #[test]
    fn test_clear_returns_identity_once() {
        let mut notes = NoteOrchestrator::new();
        notes.note_started(e4(), InputSource::Pointer);
        assert_eq!(notes.clear(), Some(e4()));
        assert_eq!(notes.clear(), None);
        assert_eq!(notes.current(), None);
        assert!(!notes.stops_on_pointer_release());
    }
}
