use std::{
    fmt,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
};

use crate::error::{EngineError, Result};

/*
MIDI Connection
===============

At most one input device is bound at a time. Binding hands the transport a
`DeliveryToken`; the transport checks it before delivering each message.
Releasing the binding revokes the token, so a reader thread that is still
draining its device stops feeding the engine without any further
coordination.

    unbound ──bind_first──→ bound(port, token)
       ↑                         │
       └──── release / port disconnected (token revoked)

No device is a valid, non-fatal state.
*/

/// Identity of an input port as reported by the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MidiPort {
    pub id: String,
    pub name: String,
}

impl MidiPort {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PortState {
    Connected,
    Disconnected,
}

/// One-shot status reports for the front end.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MidiStatus {
    Connected { device: String },
    NoInput,
    Disconnected { device: String },
    /// A new input appeared while nothing is bound.
    Available { device: String },
}

impl fmt::Display for MidiStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MidiStatus::Connected { device } => write!(f, "MIDI Connected: {device}"),
            MidiStatus::NoInput => f.write_str("No MIDI input devices found."),
            MidiStatus::Disconnected { .. } => f.write_str("MIDI Disconnected"),
            MidiStatus::Available { device } => write!(f, "New MIDI input available: {device}"),
        }
    }
}

/// Revocable permission for a transport to deliver messages.
#[derive(Debug, Clone)]
pub struct DeliveryToken {
    live: Arc<AtomicBool>,
}

impl DeliveryToken {
    fn new() -> Self {
        Self {
            live: Arc::new(AtomicBool::new(true)),
        }
    }

    #[inline]
    pub fn is_live(&self) -> bool {
        self.live.load(Ordering::Acquire)
    }

    fn revoke(&self) {
        self.live.store(false, Ordering::Release);
    }
}

#[derive(Debug, Default)]
pub struct MidiConnection {
    bound: Option<(MidiPort, DeliveryToken)>,
}

impl MidiConnection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind the first available input. Binding again while bound returns the
    /// existing token.
    pub fn bind_first(&mut self, ports: &[MidiPort]) -> Result<DeliveryToken> {
        if let Some((_, token)) = &self.bound {
            return Ok(token.clone());
        }
        let port = ports.first().ok_or(EngineError::NoMidiInput)?;
        let token = DeliveryToken::new();
        log::info!("bound MIDI input {} ({})", port.name, port.id);
        self.bound = Some((port.clone(), token.clone()));
        Ok(token)
    }

    /// Drop the binding and revoke its token.
    pub fn release(&mut self) -> Option<MidiPort> {
        let (port, token) = self.bound.take()?;
        token.revoke();
        log::info!("released MIDI input {}", port.name);
        Some(port)
    }

    /// React to a port appearing or disappearing.
    pub fn port_changed(&mut self, port: &MidiPort, state: PortState) -> Option<MidiStatus> {
        match state {
            PortState::Disconnected if self.is_bound_to(port) => {
                self.release().map(|released| MidiStatus::Disconnected {
                    device: released.name,
                })
            }
            PortState::Connected if self.bound.is_none() => {
                log::info!("new MIDI input available: {}", port.name);
                Some(MidiStatus::Available {
                    device: port.name.clone(),
                })
            }
            _ => None,
        }
    }

    pub fn device(&self) -> Option<&MidiPort> {
        self.bound.as_ref().map(|(port, _)| port)
    }

    pub fn is_bound(&self) -> bool {
        self.bound.is_some()
    }

    fn is_bound_to(&self, port: &MidiPort) -> bool {
        self.device().is_some_and(|bound| bound.id == port.id)
    }
}
