// Purpose: control plane. Notes, modulation routing, MIDI dispatch and
// settings, all owned by one `SynthEngine` context object.

pub mod engine;
pub mod message;
pub mod modulation;
pub mod notes;
pub mod orchestrator;
pub mod router;
pub mod settings;
pub mod voice;

pub use engine::{Controls, SynthEngine};
pub use message::{Control, SynthCommand, SynthEvent};
pub use modulation::{ModTarget, ModulationSource};
pub use orchestrator::{InputSource, NoteIdentity};
pub use settings::{SettingsSnapshot, SourceSettings};
pub use voice::VoiceState;
