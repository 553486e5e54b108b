use rtrb::Consumer;

use crate::{
    config::{EngineConfig, DEFAULT_MASTER_VOLUME, DEFAULT_SOURCE_RATE_HZ},
    dsp::{
        oscillator::Waveform,
        ramp::{seconds_to_samples, AudioParam, ATTACK_RAMP, CONTROL_RAMP},
    },
    graph::{
        clock::AudioClock,
        command::{Destination, GraphCommand, SharedParam, SourceIndex, SourceParam, VoiceId, VoiceParam},
        lfo::ModGenerator,
        scope::ScopeWriter,
        voice::VoiceChain,
    },
};

/*
Renderer
========

Everything the audio thread owns. Built once, then driven block by block
from the audio callback:

    voice slots ──┐
                  ├─→ bus ──→ × tremolo ──→ scope tap ──→ × master ──→ out
    (stopping) ───┘            ↑
                               └── amplitude-modulation sources (added)

    pitch / filter sources ──→ added to a voice's detune / cutoff at render time

At the top of each block all pending `GraphCommand`s are applied, stamped
with the block start time. Then each sample:

  1. every modulation source ticks (even unrouted ones, so their phase runs)
  2. every non-free voice renders with its summed pitch and cutoff offsets
  3. the bus is multiplied by tremolo + amplitude-modulation offsets
  4. the result is pushed to the scope tap
  5. the result is multiplied by master

Finally the shared clock advances by the block length.


Voice Slots
-----------

Only one voice is ever "the" note, but a stolen note still needs 30 ms to
fade and stop. Slots are preallocated so that stealing never allocates:

  1. a free slot
  2. the oldest slot that is already stopping
  3. the oldest slot
*/

pub struct Renderer {
    sample_rate: f32,
    now: u64,
    clock: AudioClock,
    rx: Consumer<GraphCommand>,
    voices: Vec<VoiceChain>,
    sources: Vec<ModGenerator>,
    tremolo: AudioParam,
    master: AudioParam,
    scope: ScopeWriter,
}

impl Renderer {
    pub fn new(
        config: &EngineConfig,
        rx: Consumer<GraphCommand>,
        clock: AudioClock,
        scope: ScopeWriter,
    ) -> Self {
        let voices = (0..config.max_voices.max(1)).map(|_| VoiceChain::new()).collect();
        let sources = (0..config.modulation_sources)
            .map(|_| ModGenerator::new(DEFAULT_SOURCE_RATE_HZ, Waveform::Sine))
            .collect();

        Self {
            sample_rate: config.sample_rate,
            now: clock.now(),
            clock,
            rx,
            voices,
            sources,
            tremolo: AudioParam::new(1.0),
            master: AudioParam::new(DEFAULT_MASTER_VOLUME),
            scope,
        }
    }

    pub fn sample_rate(&self) -> f32 {
        self.sample_rate
    }

    /// Apply pending commands and render one mono block.
    pub fn render_block(&mut self, out: &mut [f32]) {
        while let Ok(command) = self.rx.pop() {
            self.apply(command);
        }

        let sr = self.sample_rate;
        for (i, sample) in out.iter_mut().enumerate() {
            let t = self.now + i as u64;

            for source in &mut self.sources {
                source.tick(t, sr);
            }

            let mut bus = 0.0;
            for voice in &mut self.voices {
                if voice.is_free() {
                    continue;
                }
                let id = voice.id();
                let pitch: f32 = self
                    .sources
                    .iter()
                    .map(|s| s.contribution(Destination::Pitch(id), t))
                    .sum();
                let cutoff: f32 = self
                    .sources
                    .iter()
                    .map(|s| s.contribution(Destination::FilterCutoff(id), t))
                    .sum();
                bus += voice.render_sample(t, pitch, cutoff, sr);
            }

            let amplitude: f32 = self
                .sources
                .iter()
                .map(|s| s.contribution(Destination::Tremolo, t))
                .sum();
            let mixed = bus * (self.tremolo.value_at(t) + amplitude);

            self.scope.push(mixed);
            *sample = mixed * self.master.value_at(t);
        }

        self.now += out.len() as u64;
        for source in &mut self.sources {
            source.collect_faded(self.now);
        }
        self.clock.advance(out.len() as u64);
    }

    fn apply(&mut self, command: GraphCommand) {
        let now = self.now;
        let sr = self.sample_rate;

        match command {
            GraphCommand::StartVoice { id, spec } => {
                let attack = seconds_to_samples(ATTACK_RAMP, sr);
                let slot = self.allocate_voice();
                self.voices[slot].start(id, &spec, now, attack);
            }
            GraphCommand::StopVoice { id, fade, stop_after } => {
                if let Some(voice) = self.find_voice(id) {
                    voice.stop(
                        now,
                        seconds_to_samples(fade, sr),
                        seconds_to_samples(stop_after, sr),
                    );
                }
            }
            GraphCommand::SetVoiceWaveform { id, waveform } => {
                if let Some(voice) = self.find_voice(id) {
                    voice.set_waveform(waveform);
                }
            }
            GraphCommand::RampVoice {
                id,
                param,
                target,
                duration,
            } => {
                if let Some(voice) = self.find_voice(id) {
                    voice.ramp(param, now, target, seconds_to_samples(duration, sr));
                }
            }
            GraphCommand::RampShared {
                param,
                target,
                duration,
            } => {
                let samples = seconds_to_samples(duration, sr);
                match param {
                    SharedParam::Tremolo => self.tremolo.ramp_to(now, target, samples),
                    SharedParam::Master => self.master.ramp_to(now, target, samples),
                }
            }
            GraphCommand::SetSourceWaveform { source, waveform } => {
                if let Some(generator) = self.sources.get_mut(source) {
                    generator.set_waveform(waveform);
                }
            }
            GraphCommand::RampSource {
                source,
                param,
                target,
                duration,
            } => {
                if let Some(generator) = self.sources.get_mut(source) {
                    generator.ramp(param, now, target, seconds_to_samples(duration, sr));
                }
            }
            GraphCommand::Connect {
                source,
                destination,
            } => {
                let fade = seconds_to_samples(CONTROL_RAMP, sr);
                if let Some(generator) = self.sources.get_mut(source) {
                    generator.connect(destination, now, fade);
                }
            }
            GraphCommand::Disconnect { source, fade } => {
                if let Some(generator) = self.sources.get_mut(source) {
                    generator.disconnect(now, seconds_to_samples(fade, sr));
                }
            }
        }
    }

    fn allocate_voice(&mut self) -> usize {
        // First pass: a free slot
        if let Some(idx) = self.voices.iter().position(|v| v.is_free()) {
            return idx;
        }

        // Second pass: steal the oldest stopping slot, else the oldest of all
        let oldest_stopping = self
            .voices
            .iter()
            .enumerate()
            .filter(|(_, v)| v.is_stopping())
            .min_by_key(|(_, v)| v.started_at())
            .map(|(idx, _)| idx);

        oldest_stopping.unwrap_or_else(|| {
            self.voices
                .iter()
                .enumerate()
                .min_by_key(|(_, v)| v.started_at())
                .map_or(0, |(idx, _)| idx)
        })
    }

    fn find_voice(&mut self, id: VoiceId) -> Option<&mut VoiceChain> {
        self.voices.iter_mut().find(|v| v.is_live(id))
    }

    /* Inspection, used by front ends and tests */

    /// Current block-start time in samples.
    pub fn now(&self) -> u64 {
        self.now
    }

    /// Voices that have not been freed yet (sounding or fading out).
    pub fn active_voices(&self) -> usize {
        self.voices.iter().filter(|v| !v.is_free()).count()
    }

    pub fn voice_is_live(&self, id: VoiceId) -> bool {
        self.voices.iter().any(|v| v.is_live(id))
    }

    pub fn voice_waveform(&self, id: VoiceId) -> Option<Waveform> {
        self.voices.iter().find(|v| v.is_live(id)).map(|v| v.waveform())
    }

    /// Value of a voice parameter at the current time, if the voice is live.
    pub fn voice_param(&self, id: VoiceId, param: VoiceParam) -> Option<f32> {
        self.voices
            .iter()
            .find(|v| v.is_live(id))
            .map(|v| v.param(param).value_at(self.now))
    }

    pub fn shared_param(&self, param: SharedParam) -> f32 {
        match param {
            SharedParam::Tremolo => self.tremolo.value_at(self.now),
            SharedParam::Master => self.master.value_at(self.now),
        }
    }

    pub fn source_param(&self, source: SourceIndex, param: SourceParam) -> Option<f32> {
        self.sources
            .get(source)
            .map(|s| s.param(param).value_at(self.now))
    }

    pub fn source_waveform(&self, source: SourceIndex) -> Option<Waveform> {
        self.sources.get(source).map(|s| s.waveform())
    }

    /// Live route of a source, ignoring any route still fading out.
    pub fn route(&self, source: SourceIndex) -> Option<Destination> {
        self.sources.get(source).and_then(|s| s.destination())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{command::VoiceSpec, scope::scope_channel};
    use rtrb::{Producer, RingBuffer};

    const SR: f32 = 48_000.0;
    const BLOCK: usize = 480; // 10 ms

    fn setup() -> (Producer<GraphCommand>, Renderer) {
        let config = EngineConfig::default();
        let (tx, rx) = RingBuffer::new(64);
        let (writer, _tap) = scope_channel(16, 16);
        let renderer = Renderer::new(&config, rx, AudioClock::new(), writer);
        (tx, renderer)
    }

    fn spec(frequency: f32) -> VoiceSpec {
        VoiceSpec {
            frequency,
            gain: 0.8,
            waveform: Waveform::Sawtooth,
            cutoff: 5_000.0,
            resonance: 1.0,
        }
    }

    fn run(renderer: &mut Renderer, blocks: usize) -> Vec<f32> {
        let mut out = vec![0.0; BLOCK];
        let mut all = Vec::new();
        for _ in 0..blocks {
            renderer.render_block(&mut out);
            all.extend_from_slice(&out);
        }
        all
    }

    #[test]
    fn test_silent_without_voices() {
        let (_tx, mut renderer) = setup();
        let out = run(&mut renderer, 4);
        assert!(out.iter().all(|&s| s == 0.0));
        assert_eq!(renderer.now(), 4 * BLOCK as u64);
    }

    #[test]
    fn test_start_and_stop_voice() {
        let (mut tx, mut renderer) = setup();
        tx.push(GraphCommand::StartVoice { id: 1, spec: spec(220.0) }).unwrap();
        let out = run(&mut renderer, 4);
        assert!(out.iter().any(|s| s.abs() > 0.05));
        assert!(renderer.voice_is_live(1));

        tx.push(GraphCommand::StopVoice { id: 1, fade: 0.020, stop_after: 0.030 })
            .unwrap();
        run(&mut renderer, 4);
        assert!(!renderer.voice_is_live(1));
        assert_eq!(renderer.active_voices(), 0);
    }

    #[test]
    fn test_steal_prefers_stopping_slot() {
        let config = EngineConfig {
            max_voices: 2,
            ..EngineConfig::default()
        };
        let (mut tx, rx) = RingBuffer::new(64);
        let (writer, _tap) = scope_channel(16, 16);
        let mut renderer = Renderer::new(&config, rx, AudioClock::new(), writer);

        tx.push(GraphCommand::StartVoice { id: 1, spec: spec(220.0) }).unwrap();
        run(&mut renderer, 1);
        tx.push(GraphCommand::StartVoice { id: 2, spec: spec(330.0) }).unwrap();
        run(&mut renderer, 1);
        tx.push(GraphCommand::StopVoice { id: 2, fade: 0.020, stop_after: 0.030 })
            .unwrap();
        tx.push(GraphCommand::StartVoice { id: 3, spec: spec(440.0) }).unwrap();
        run(&mut renderer, 1);

        // Voice 1 is older but still running; the stopping voice 2 was taken.
        assert!(renderer.voice_is_live(1));
        assert!(!renderer.voice_is_live(2));
        assert!(renderer.voice_is_live(3));
    }

    #[test]
    fn test_commands_for_unknown_voice_are_ignored() {
        let (mut tx, mut renderer) = setup();
        tx.push(GraphCommand::StopVoice { id: 9, fade: 0.020, stop_after: 0.030 })
            .unwrap();
        tx.push(GraphCommand::RampVoice {
            id: 9,
            param: VoiceParam::Cutoff,
            target: 100.0,
            duration: 0.010,
        })
        .unwrap();
        run(&mut renderer, 1);
        assert_eq!(renderer.active_voices(), 0);
    }

    #[test]
    fn test_master_ramp() {
        let (mut tx, mut renderer) = setup();
        assert!((renderer.shared_param(SharedParam::Master) - DEFAULT_MASTER_VOLUME).abs() < 1e-6);
        tx.push(GraphCommand::RampShared {
            param: SharedParam::Master,
            target: 0.2,
            duration: 0.010,
        })
        .unwrap();
        run(&mut renderer, 2);
        assert!((renderer.shared_param(SharedParam::Master) - 0.2).abs() < 1e-6);
    }

    #[test]
    fn test_pitch_route_moves_with_voice_id() {
        let (mut tx, mut renderer) = setup();
        tx.push(GraphCommand::StartVoice { id: 1, spec: spec(220.0) }).unwrap();
        tx.push(GraphCommand::RampSource {
            source: 0,
            param: SourceParam::Depth,
            target: 600.0,
            duration: 0.010,
        })
        .unwrap();
        tx.push(GraphCommand::Connect {
            source: 0,
            destination: Destination::Pitch(1),
        })
        .unwrap();
        run(&mut renderer, 2);
        assert_eq!(renderer.route(0), Some(Destination::Pitch(1)));

        tx.push(GraphCommand::Disconnect { source: 0, fade: 0.010 }).unwrap();
        run(&mut renderer, 2);
        assert_eq!(renderer.route(0), None);
    }

    #[test]
    fn test_scope_sees_pre_master_signal() {
        let config = EngineConfig::default();
        let (mut tx, rx) = RingBuffer::new(64);
        let (writer, mut tap) = scope_channel(8_192, BLOCK);
        let mut renderer = Renderer::new(&config, rx, AudioClock::new(), writer);

        tx.push(GraphCommand::StartVoice { id: 1, spec: spec(220.0) }).unwrap();
        tx.push(GraphCommand::RampShared {
            param: SharedParam::Master,
            target: 0.0,
            duration: 0.001,
        })
        .unwrap();
        let out = run(&mut renderer, 4);
        tap.poll();

        // Master is muted, the tap still sees the voice.
        assert!(out[BLOCK * 3..].iter().all(|&s| s == 0.0));
        assert!(tap.samples().iter().any(|s| s.abs() > 0.05));
    }

    #[test]
    fn test_source_waveform_switches_without_restarting() {
        let (mut tx, mut renderer) = setup();
        tx.push(GraphCommand::RampSource {
            source: 0,
            param: SourceParam::Depth,
            target: 1.0,
            duration: 0.001,
        })
        .unwrap();
        run(&mut renderer, 1);
        assert_eq!(renderer.source_waveform(0), Some(Waveform::Sine));

        tx.push(GraphCommand::SetSourceWaveform {
            source: 0,
            waveform: Waveform::Square,
        })
        .unwrap();
        tx.push(GraphCommand::SetSourceWaveform {
            source: 7,
            waveform: Waveform::Square,
        })
        .unwrap();
        run(&mut renderer, 1);

        assert_eq!(renderer.source_waveform(0), Some(Waveform::Square));
        assert_eq!(renderer.source_waveform(1), Some(Waveform::Sine));
        assert_eq!(renderer.source_param(0, SourceParam::Depth), Some(1.0));
    }

    #[test]
    fn test_voice_waveform_follows_live_voice() {
        let (mut tx, mut renderer) = setup();
        tx.push(GraphCommand::StartVoice { id: 4, spec: spec(220.0) }).unwrap();
        run(&mut renderer, 1);
        assert_eq!(renderer.voice_waveform(4), Some(Waveform::Sawtooth));

        tx.push(GraphCommand::SetVoiceWaveform {
            id: 4,
            waveform: Waveform::Triangle,
        })
        .unwrap();
        run(&mut renderer, 1);
        assert_eq!(renderer.voice_waveform(4), Some(Waveform::Triangle));
        assert_eq!(renderer.voice_waveform(5), None);
    }
}
