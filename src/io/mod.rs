// Purpose - external interfaces: MIDI decoding, CC curves, device binding

pub mod connection;
pub mod converter;
pub mod midi;

pub use connection::{DeliveryToken, MidiConnection, MidiPort, MidiStatus, PortState};
pub use midi::{MidiEvent, MidiMessage, MidiStreamParser};
