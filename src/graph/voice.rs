use crate::{
    dsp::{
        filter::SVFilter,
        oscillator::{Oscillator, Waveform},
        ramp::AudioParam,
    },
    graph::command::{VoiceId, VoiceParam, VoiceSpec},
};

/*
Voice Chain
===========

One sounding note is a fixed three-stage chain:

    generator ──→ lowpass ──→ amplitude stage ──→ post-voice bus
     (pitch,        (cutoff,     (gain)
      detune)        Q)

Every stage parameter is an `AudioParam`, so control changes arrive as short
ramps. Modulation sources do not write into these params; their signal is
added on top at render time (detune + pitch modulation, cutoff + filter
modulation). That keeps the "manual" value of each param intact, which is
what lets a filter modulation route be removed without touching the cutoff
the user dialled in.

Lifecycle on the audio thread
-----------------------------

    Free ──start──→ Running ──stop──→ Stopping(stop_at) ──t ≥ stop_at──→ Free

stop() fades the amplitude stage to 0 (from whatever value it has at that
moment) and schedules the generator to stop a little later, after the fade
has completed, so the waveform is never truncated mid-cycle at full level.
*/

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChainState {
    Free,
    Running,
    Stopping { stop_at: u64 },
}

pub struct VoiceChain {
    id: VoiceId,
    state: ChainState,
    started_at: u64,
    osc: Oscillator,
    filter: SVFilter,
    frequency: f32,
    detune: AudioParam,
    cutoff: AudioParam,
    resonance: AudioParam,
    gain: AudioParam,
}

impl VoiceChain {
    /// A free slot. Nothing is allocated when a note starts.
    pub fn new() -> Self {
        Self {
            id: 0,
            state: ChainState::Free,
            started_at: 0,
            osc: Oscillator::new(Waveform::Sine),
            filter: SVFilter::new(),
            frequency: 440.0,
            detune: AudioParam::new(0.0),
            cutoff: AudioParam::new(5_000.0),
            resonance: AudioParam::new(0.0),
            gain: AudioParam::new(0.0),
        }
    }

    /// Allocate the chain for a new note and schedule the attack.
    pub fn start(&mut self, id: VoiceId, spec: &VoiceSpec, now: u64, attack_samples: u64) {
        self.id = id;
        self.state = ChainState::Running;
        self.started_at = now;

        self.osc = Oscillator::new(spec.waveform);
        self.filter.reset();
        self.frequency = spec.frequency;

        // Creation-time values: nothing scheduled yet, nothing to cancel.
        self.detune = AudioParam::new(0.0);
        self.cutoff = AudioParam::new(spec.cutoff);
        self.resonance = AudioParam::new(spec.resonance);
        self.gain = AudioParam::new(0.0);

        self.gain.ramp_to(now, spec.gain, attack_samples);
    }

    /// Fade out and schedule the generator stop. Repeated calls are ignored.
    pub fn stop(&mut self, now: u64, fade_samples: u64, stop_samples: u64) {
        if self.state != ChainState::Running {
            return;
        }
        self.gain.ramp_to(now, 0.0, fade_samples);
        self.state = ChainState::Stopping {
            stop_at: now + stop_samples.max(fade_samples),
        };
    }

    pub fn ramp(&mut self, param: VoiceParam, now: u64, target: f32, duration_samples: u64) {
        if self.state == ChainState::Free {
            return;
        }
        self.param_mut(param).ramp_to(now, target, duration_samples);
    }

    pub fn set_waveform(&mut self, waveform: Waveform) {
        self.osc.set_waveform(waveform);
    }

    /// Render one sample.
    ///
    /// `pitch_mod` is extra detune in cents, `cutoff_mod` extra cutoff in Hz.
    /// Frees the slot once the scheduled stop time is reached.
    #[inline]
    pub fn render_sample(&mut self, t: u64, pitch_mod: f32, cutoff_mod: f32, sample_rate: f32) -> f32 {
        match self.state {
            ChainState::Free => return 0.0,
            ChainState::Stopping { stop_at } if t >= stop_at => {
                self.state = ChainState::Free;
                return 0.0;
            }
            _ => {}
        }

        let cents = self.detune.value_at(t) + pitch_mod;
        let frequency = self.frequency * 2.0_f32.powf(cents / 1200.0);
        let raw = self.osc.next_sample(frequency, sample_rate);

        let cutoff = self.cutoff.value_at(t) + cutoff_mod;
        let filtered = self
            .filter
            .process(raw, cutoff, self.resonance.value_at(t), sample_rate);

        filtered * self.gain.value_at(t)
    }

    pub fn id(&self) -> VoiceId {
        self.id
    }

    pub fn state(&self) -> ChainState {
        self.state
    }

    pub fn started_at(&self) -> u64 {
        self.started_at
    }

    pub fn is_free(&self) -> bool {
        self.state == ChainState::Free
    }

    pub fn is_stopping(&self) -> bool {
        matches!(self.state, ChainState::Stopping { .. })
    }

    /// Holds `id` and has not been freed yet.
    pub fn is_live(&self, id: VoiceId) -> bool {
        self.id == id && self.state != ChainState::Free
    }

    pub fn waveform(&self) -> Waveform {
        self.osc.waveform()
    }

    pub fn param(&self, param: VoiceParam) -> &AudioParam {
        match param {
            VoiceParam::Detune => &self.detune,
            VoiceParam::Cutoff => &self.cutoff,
            VoiceParam::Resonance => &self.resonance,
            VoiceParam::Gain => &self.gain,
        }
    }

    fn param_mut(&mut self, param: VoiceParam) -> &mut AudioParam {
        match param {
            VoiceParam::Detune => &mut self.detune,
            VoiceParam::Cutoff => &mut self.cutoff,
            VoiceParam::Resonance => &mut self.resonance,
            VoiceParam::Gain => &mut self.gain,
        }
    }
}

impl Default for VoiceChain {
    fn default() -> Self {
        Self::new()
    }
}
