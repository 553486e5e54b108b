use std::collections::VecDeque;

use rtrb::{Consumer, Producer, RingBuffer};

use crate::dsp::oscillator::Waveform;

/// Identifies one voice for its whole life, across both threads.
pub type VoiceId = u64;

/// Index of a modulation source (0-based, fixed at engine construction).
pub type SourceIndex = usize;

/// Per-voice parameters that can be ramped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoiceParam {
    /// Generator detune in cents.
    Detune,
    /// Lowpass cutoff in Hz.
    Cutoff,
    /// Lowpass resonance (Q in dB).
    Resonance,
    /// Amplitude stage gain.
    Gain,
}

/// Parameters shared by every voice, living after the post-voice bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SharedParam {
    /// Amplitude-modulation multiplier stage (neutral = 1).
    Tremolo,
    /// Master output volume.
    Master,
}

/// Per-source parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceParam {
    /// Generator frequency in Hz.
    Rate,
    /// Scaled output (depth already converted to physical units).
    Depth,
}

/// Where a modulation source's signal lands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Destination {
    /// Oscillator detune of the given voice (cents).
    Pitch(VoiceId),
    /// Filter cutoff of the given voice (Hz).
    FilterCutoff(VoiceId),
    /// The shared amplitude-modulation stage.
    Tremolo,
}

/// Everything needed to allocate a voice chain.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VoiceSpec {
    pub frequency: f32,
    pub gain: f32,
    pub waveform: Waveform,
    pub cutoff: f32,
    pub resonance: f32,
}

/// Schedule requests from the control plane to the renderer.
///
/// Each command is applied at the start of the next rendered block; durations
/// are relative to that moment. Commands are `Copy` so that pushing them
/// through the ring never allocates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GraphCommand {
    StartVoice { id: VoiceId, spec: VoiceSpec },
    /// Fade the amplitude stage out and stop the generator after `stop_after`.
    StopVoice { id: VoiceId, fade: f32, stop_after: f32 },
    SetVoiceWaveform { id: VoiceId, waveform: Waveform },
    RampVoice { id: VoiceId, param: VoiceParam, target: f32, duration: f32 },
    RampShared { param: SharedParam, target: f32, duration: f32 },
    SetSourceWaveform { source: SourceIndex, waveform: Waveform },
    RampSource { source: SourceIndex, param: SourceParam, target: f32, duration: f32 },
    /// Route a source to a destination, replacing any previous route.
    Connect { source: SourceIndex, destination: Destination },
    /// Fade the source's route out over `fade` and then drop it.
    Disconnect { source: SourceIndex, fade: f32 },
}

impl GraphCommand {
    /// Voice lifecycle and routing changes. These are never merged or
    /// dropped and keep their order relative to each other.
    pub fn is_structural(&self) -> bool {
        matches!(
            self,
            GraphCommand::StartVoice { .. }
                | GraphCommand::StopVoice { .. }
                | GraphCommand::Connect { .. }
                | GraphCommand::Disconnect { .. }
        )
    }

    /// True when `self` sets the same value as `earlier`, so the earlier
    /// request can be forgotten.
    fn supersedes(&self, earlier: &GraphCommand) -> bool {
        use GraphCommand::*;

        match (self, earlier) {
            (RampVoice { id, param, .. }, RampVoice { id: i, param: p, .. }) => id == i && param == p,
            (RampShared { param, .. }, RampShared { param: p, .. }) => param == p,
            (RampSource { source, param, .. }, RampSource { source: s, param: p, .. }) => {
                source == s && param == p
            }
            (SetVoiceWaveform { id, .. }, SetVoiceWaveform { id: i, .. }) => id == i,
            (SetSourceWaveform { source, .. }, SetSourceWaveform { source: s, .. }) => source == s,
            _ => false,
        }
    }
}

/// Ring slots only structural commands may use.
pub const RESERVED_SLOTS: usize = 8;

/*
Backpressure
============

`send` never blocks and never loses a voice or a route. When the renderer
has fallen behind:

  parameter updates   may fill the ring up to `capacity`. Past that they
                      wait in a control-side backlog, where a newer update
                      of the same parameter replaces the older one.

  structural          may also take the reserved slots, and overtake
                      waiting parameter updates. Only when the whole ring
                      is full do they join the backlog, in order.

The backlog is moved into the ring on every `send` and on `flush`.
*/

/// Control-plane end of the command ring.
pub struct CommandSender {
    tx: Producer<GraphCommand>,
    backlog: VecDeque<GraphCommand>,
    merged: u64,
}

impl CommandSender {
    pub fn send(&mut self, command: GraphCommand) {
        self.flush();

        let room = if command.is_structural() {
            !self.backlog.iter().any(GraphCommand::is_structural) && self.tx.slots() > 0
        } else {
            self.backlog.is_empty() && self.tx.slots() > RESERVED_SLOTS
        };
        if room && self.tx.push(command).is_ok() {
            return;
        }
        self.defer(command);
    }

    /// Move as much of the backlog into the ring as it has room for.
    pub fn flush(&mut self) {
        if self.backlog.is_empty() {
            return;
        }

        // Structural commands first, in order.
        while self.tx.slots() > 0 {
            let Some(idx) = self.backlog.iter().position(GraphCommand::is_structural) else {
                break;
            };
            if let Some(command) = self.backlog.remove(idx) {
                self.push(command);
            }
        }
        if self.backlog.iter().any(GraphCommand::is_structural) {
            return;
        }

        while self.tx.slots() > RESERVED_SLOTS {
            let Some(command) = self.backlog.pop_front() else {
                break;
            };
            self.push(command);
        }
        if self.backlog.is_empty() {
            log::debug!("command backlog cleared, {} updates merged", self.merged);
            self.merged = 0;
        }
    }

    fn push(&mut self, command: GraphCommand) {
        if let Err(rtrb::PushError::Full(command)) = self.tx.push(command) {
            self.backlog.push_front(command);
        }
    }

    fn defer(&mut self, command: GraphCommand) {
        if self.backlog.is_empty() {
            log::warn!("command ring full, holding commands until the renderer catches up");
        }
        if let Some(idx) = self.backlog.iter().position(|earlier| command.supersedes(earlier)) {
            self.backlog.remove(idx);
            self.merged += 1;
        }
        self.backlog.push_back(command);
    }

    /// Commands waiting for room in the ring.
    pub fn deferred(&self) -> usize {
        self.backlog.len()
    }
}

/// Build a ring with room for `capacity` parameter updates plus the
/// reserved structural slots.
pub fn command_channel(capacity: usize) -> (CommandSender, Consumer<GraphCommand>) {
    let (tx, rx) = RingBuffer::new(capacity.max(1) + RESERVED_SLOTS);
    let sender = CommandSender {
        tx,
        backlog: VecDeque::new(),
        merged: 0,
    };
    (sender, rx)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn drain(rx: &mut Consumer<GraphCommand>) -> Vec<GraphCommand> {
        std::iter::from_fn(|| rx.pop().ok()).collect()
    }

    fn master(target: f32) -> GraphCommand {
        GraphCommand::RampShared {
            param: SharedParam::Master,
            target,
            duration: 0.01,
        }
    }

    fn stop(id: VoiceId) -> GraphCommand {
        GraphCommand::StopVoice {
            id,
            fade: 0.02,
            stop_after: 0.03,
        }
    }

    #[test]
    fn test_updates_past_capacity_are_merged() {
        let (mut tx, mut rx) = command_channel(2);
        for i in 0..5 {
            tx.send(master(i as f32));
        }
        assert_eq!(tx.deferred(), 1);
        assert_eq!(drain(&mut rx), vec![master(0.0), master(1.0)]);

        tx.flush();
        assert_eq!(tx.deferred(), 0);
        assert_eq!(drain(&mut rx), vec![master(4.0)]);
    }

    #[test]
    fn test_structural_commands_use_reserved_slots() {
        let (mut tx, mut rx) = command_channel(2);
        for i in 0..4 {
            tx.send(master(i as f32));
        }
        tx.send(stop(1));
        tx.send(GraphCommand::Disconnect { source: 0, fade: 0.01 });

        let received = drain(&mut rx);
        assert_eq!(received.len(), 4);
        assert_eq!(received[2], stop(1));
        assert_eq!(tx.deferred(), 1);
    }

    #[test]
    fn test_structural_commands_wait_in_order_when_ring_is_full() {
        let (mut tx, mut rx) = command_channel(1);
        for id in 0..(1 + RESERVED_SLOTS as u64 + 3) {
            tx.send(stop(id));
        }
        assert_eq!(tx.deferred(), 3);

        let first = drain(&mut rx);
        assert_eq!(first.len(), 1 + RESERVED_SLOTS);
        tx.flush();
        let rest = drain(&mut rx);
        let expected: Vec<_> = (first.len() as u64..first.len() as u64 + 3).map(stop).collect();
        assert_eq!(rest, expected);
    }

    #[test]
    fn test_different_parameters_are_not_merged() {
        let (mut tx, _rx) = command_channel(1);
        tx.send(master(0.5));
        tx.send(master(0.6));
        tx.send(GraphCommand::RampShared {
            param: SharedParam::Tremolo,
            target: 1.0,
            duration: 0.01,
        });
        tx.send(GraphCommand::SetSourceWaveform {
            source: 1,
            waveform: Waveform::Square,
        });
        assert_eq!(tx.deferred(), 3);
    }
}
