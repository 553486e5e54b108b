use crate::{
    dsp::{
        filter::MAX_RESONANCE_DB,
        oscillator::Waveform,
        ramp::{seconds_to_samples, ATTACK_RAMP, CONTROL_RAMP, RELEASE_RAMP, STOP_DELAY},
    },
    graph::command::{CommandSender, GraphCommand, VoiceId, VoiceParam, VoiceSpec},
    synth::router::ModulationRouter,
};

/// Lifecycle of one note, as seen from the control plane.
///
/// States are derived from the audio clock rather than stored, so they stay
/// correct without any message from the audio thread:
///
/// ```text
/// Idle ──start──→ Starting ──attack done──→ Sounding
///                    │                          │
///                    └──────────stop────────────┴──→ Releasing ──stop delay──→ Stopped
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoiceState {
    Idle,
    Starting,
    Sounding,
    Releasing,
    Stopped,
}

impl VoiceState {
    /// Starting or Sounding: the voice is the one the player hears as "the note".
    pub fn is_sounding(&self) -> bool {
        matches!(self, VoiceState::Starting | VoiceState::Sounding)
    }
}

/// Control-plane handle for one voice chain on the renderer.
pub struct Voice {
    id: VoiceId,
    spec: VoiceSpec,
    attack_samples: u64,
    stop_samples: u64,
    started_at: Option<u64>,
    stopped_at: Option<u64>,
}

impl Voice {
    pub fn new(id: VoiceId, spec: VoiceSpec, sample_rate: f32) -> Self {
        Self {
            id,
            spec,
            attack_samples: seconds_to_samples(ATTACK_RAMP, sample_rate),
            stop_samples: seconds_to_samples(STOP_DELAY, sample_rate),
            started_at: None,
            stopped_at: None,
        }
    }

    pub fn id(&self) -> VoiceId {
        self.id
    }

    pub fn spec(&self) -> &VoiceSpec {
        &self.spec
    }

    pub fn state(&self, now: u64) -> VoiceState {
        let Some(started_at) = self.started_at else {
            return VoiceState::Idle;
        };
        match self.stopped_at {
            Some(stopped_at) if now >= stopped_at + self.stop_samples => VoiceState::Stopped,
            Some(_) => VoiceState::Releasing,
            None if now < started_at + self.attack_samples => VoiceState::Starting,
            None => VoiceState::Sounding,
        }
    }

    /// Allocate the chain on the renderer. The gain starts at 0 and ramps to
    /// the requested gain over the attack. Starting twice is ignored.
    pub fn start(&mut self, tx: &mut CommandSender, now: u64) {
        if self.started_at.is_some() {
            return;
        }
        tx.send(GraphCommand::StartVoice {
            id: self.id,
            spec: self.spec,
        });
        self.started_at = Some(now);
    }

    pub fn set_waveform(&mut self, waveform: Waveform, tx: &mut CommandSender, now: u64) {
        if !self.state(now).is_sounding() {
            return;
        }
        self.spec.waveform = waveform;
        tx.send(GraphCommand::SetVoiceWaveform {
            id: self.id,
            waveform,
        });
    }

    pub fn set_cutoff(&mut self, cutoff_hz: f32, tx: &mut CommandSender, now: u64) {
        self.ramp(VoiceParam::Cutoff, cutoff_hz, tx, now);
    }

    pub fn set_resonance(&mut self, q_db: f32, tx: &mut CommandSender, now: u64) {
        self.ramp(VoiceParam::Resonance, q_db.clamp(0.0, MAX_RESONANCE_DB), tx, now);
    }

    fn ramp(&mut self, param: VoiceParam, target: f32, tx: &mut CommandSender, now: u64) {
        if !self.state(now).is_sounding() {
            return;
        }
        match param {
            VoiceParam::Cutoff => self.spec.cutoff = target,
            VoiceParam::Resonance => self.spec.resonance = target,
            VoiceParam::Gain => self.spec.gain = target,
            VoiceParam::Detune => {}
        }
        tx.send(GraphCommand::RampVoice {
            id: self.id,
            param,
            target,
            duration: CONTROL_RAMP,
        });
    }

    /// Release the note: fade the amplitude stage out, stop the generator
    /// after the fade, and detach every modulation source routed here.
    ///
    /// Returns false (and does nothing) for a voice that was never started or
    /// is already stopping.
    pub fn stop(&mut self, router: &mut ModulationRouter, tx: &mut CommandSender, now: u64) -> bool {
        if self.started_at.is_none() || self.stopped_at.is_some() {
            return false;
        }
        tx.send(GraphCommand::StopVoice {
            id: self.id,
            fade: RELEASE_RAMP,
            stop_after: STOP_DELAY,
        });
        router.release_voice(self.id, tx);
        self.stopped_at = Some(now);
        true
    }
}
