use crate::{
    dsp::{
        oscillator::{Oscillator, Waveform},
        ramp::AudioParam,
    },
    graph::command::{Destination, SourceParam},
};

/*
Modulation Generator
====================

The audio-thread half of a modulation source. It is created once when the
renderer is built and runs for the whole process lifetime:

    LFO oscillator (rate) ──→ depth scaler ──→ send ──→ destination param
                                                 │
                                                 └──→ fading send (detached route)

Only the *route* changes while playing. The generator and depth scaler are
never rebuilt, so the LFO phase keeps running between notes.

Depth is already in physical units here (cents, Hz, or a gain multiplier);
the control plane applies the per-target scale before it schedules the ramp.


Sends
-----

Connecting or disconnecting a control signal is itself a parameter change:
if the LFO happens to be at +1 when the route is cut, the destination jumps
by the full depth. So each route carries its own send gain:

  connect     send is created at 0 and ramps to 1
  disconnect  the live route moves to a fading slot and its send ramps
              to 0; it is dropped once it has settled

A quick retarget or a steal can detach again while an earlier route is
still fading. Each fade keeps its own slot until it settles. A second fade
towards the same destination is folded into the first: both sends scale
the same output, so one send carrying their sum is identical.
*/

/// Routes that can fade out at the same time.
const FADE_SLOTS: usize = 4;

#[derive(Debug, Clone, Copy)]
pub struct Route {
    pub destination: Destination,
    pub send: AudioParam,
}

impl Route {
    #[inline]
    fn contribution(&self, destination: Destination, output: f32, t: u64) -> f32 {
        if self.destination == destination {
            output * self.send.value_at(t)
        } else {
            0.0
        }
    }
}

pub struct ModGenerator {
    osc: Oscillator,
    rate: AudioParam,
    depth: AudioParam,
    route: Option<Route>,
    fading: [Option<Route>; FADE_SLOTS],
    output: f32,
}

impl ModGenerator {
    pub fn new(rate_hz: f32, waveform: Waveform) -> Self {
        Self {
            osc: Oscillator::new(waveform),
            rate: AudioParam::new(rate_hz),
            // Sources start with no effect until a route and depth are set.
            depth: AudioParam::new(0.0),
            route: None,
            fading: [None; FADE_SLOTS],
            output: 0.0,
        }
    }

    /// Advance the generator by one sample and cache the scaled output.
    #[inline]
    pub fn tick(&mut self, t: u64, sample_rate: f32) -> f32 {
        let raw = self.osc.next_sample(self.rate.value_at(t), sample_rate);
        self.output = raw * self.depth.value_at(t);
        self.output
    }

    /// The cached output's share for `destination` at time `t`.
    #[inline]
    pub fn contribution(&self, destination: Destination, t: u64) -> f32 {
        let live = self
            .route
            .as_ref()
            .map_or(0.0, |r| r.contribution(destination, self.output, t));
        let fading: f32 = self
            .fading
            .iter()
            .flatten()
            .map(|r| r.contribution(destination, self.output, t))
            .sum();
        live + fading
    }

    pub fn ramp(&mut self, param: SourceParam, now: u64, target: f32, duration_samples: u64) {
        self.param_mut(param).ramp_to(now, target, duration_samples);
    }

    pub fn set_waveform(&mut self, waveform: Waveform) {
        self.osc.set_waveform(waveform);
    }

    /// Route to `destination`. Reconnecting to the current destination is a no-op.
    pub fn connect(&mut self, destination: Destination, now: u64, fade_samples: u64) {
        if self.route.map(|r| r.destination) == Some(destination) {
            return;
        }
        if let Some(previous) = self.route.take() {
            self.begin_fade(previous, now, fade_samples);
        }
        let mut send = AudioParam::new(0.0);
        send.ramp_to(now, 1.0, fade_samples);
        self.route = Some(Route { destination, send });
    }

    /// Fade the live route out. Without a live route this does nothing.
    pub fn disconnect(&mut self, now: u64, fade_samples: u64) {
        if let Some(route) = self.route.take() {
            self.begin_fade(route, now, fade_samples);
        }
    }

    fn begin_fade(&mut self, mut route: Route, now: u64, fade_samples: u64) {
        let same = self
            .fading
            .iter_mut()
            .flatten()
            .find(|r| r.destination == route.destination);
        if let Some(earlier) = same {
            let sum = earlier.send.value_at(now) + route.send.value_at(now);
            earlier.send = AudioParam::new(sum);
            earlier.send.ramp_to(now, 0.0, fade_samples);
            return;
        }

        route.send.ramp_to(now, 0.0, fade_samples);
        // No free slot: the fade closest to silence gives way.
        let slot = self.fading.iter().position(Option::is_none).unwrap_or_else(|| {
            self.fading
                .iter()
                .enumerate()
                .min_by(|(_, a), (_, b)| {
                    let a = a.map_or(0.0, |r| r.send.value_at(now));
                    let b = b.map_or(0.0, |r| r.send.value_at(now));
                    a.total_cmp(&b)
                })
                .map_or(0, |(idx, _)| idx)
        });
        self.fading[slot] = Some(route);
    }

    /// Drop fading routes whose send has reached zero.
    pub fn collect_faded(&mut self, t: u64) {
        for slot in &mut self.fading {
            if slot.is_some_and(|r| !r.send.is_ramping(t)) {
                *slot = None;
            }
        }
    }

    pub fn destination(&self) -> Option<Destination> {
        self.route.map(|r| r.destination)
    }

    /// Routes still fading out.
    pub fn fading(&self) -> usize {
        self.fading.iter().flatten().count()
    }

    pub fn waveform(&self) -> Waveform {
        self.osc.waveform()
    }

    pub fn param(&self, param: SourceParam) -> &AudioParam {
        match param {
            SourceParam::Rate => &self.rate,
            SourceParam::Depth => &self.depth,
        }
    }

    fn param_mut(&mut self, param: SourceParam) -> &mut AudioParam {
        match param {
            SourceParam::Rate => &mut self.rate,
            SourceParam::Depth => &mut self.depth,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SR: f32 = 48_000.0;

    /// Run a few samples up to `t` so the oscillator is past its first
    /// band-limited edge, and return the output at `t`.
    fn tick_to(generator: &mut ModGenerator, t: u64) -> f32 {
        for s in t.saturating_sub(4)..t {
            generator.tick(s, SR);
        }
        generator.tick(t, SR)
    }

    fn square_at_full_depth() -> ModGenerator {
        let mut generator = ModGenerator::new(5.0, Waveform::Square);
        generator.ramp(SourceParam::Depth, 0, 1.0, 1);
        generator
    }

    #[test]
    fn test_zero_depth_outputs_exact_zero() {
        let mut generator = ModGenerator::new(5.0, Waveform::Square);
        for t in 0..4800 {
            assert_eq!(generator.tick(t, SR), 0.0);
        }
    }

    #[test]
    fn test_output_scaled_by_depth() {
        let mut generator = ModGenerator::new(5.0, Waveform::Square);
        generator.ramp(SourceParam::Depth, 0, 1200.0, 1);
        // Square LFO sits at +1 through the first half-cycle
        let out = tick_to(&mut generator, 10);
        assert!((out - 1200.0).abs() < 1e-3, "got {out}");
    }

    #[test]
    fn test_contribution_only_for_routed_destination() {
        let mut generator = ModGenerator::new(5.0, Waveform::Square);
        generator.ramp(SourceParam::Depth, 0, 100.0, 1);
        generator.connect(Destination::FilterCutoff(3), 0, 480);
        tick_to(&mut generator, 1000);

        assert!(generator.contribution(Destination::FilterCutoff(3), 1000) > 99.0);
        assert_eq!(generator.contribution(Destination::FilterCutoff(4), 1000), 0.0);
        assert_eq!(generator.contribution(Destination::Tremolo, 1000), 0.0);
    }

    #[test]
    fn test_connect_ramps_send_in() {
        let mut generator = square_at_full_depth();
        generator.connect(Destination::Tremolo, 0, 480);
        tick_to(&mut generator, 240);

        let half = generator.contribution(Destination::Tremolo, 240);
        assert!((half - 0.5).abs() < 1e-3, "send should be half-way in, got {half}");
    }

    #[test]
    fn test_disconnect_fades_then_drops() {
        let mut generator = square_at_full_depth();
        generator.connect(Destination::Pitch(1), 0, 480);
        generator.disconnect(1000, 480);

        assert_eq!(generator.destination(), None);
        assert_eq!(generator.fading(), 1);

        tick_to(&mut generator, 1240);
        let fading = generator.contribution(Destination::Pitch(1), 1240);
        assert!(fading > 0.0 && fading < 1.0, "got {fading}");

        generator.collect_faded(1480);
        assert_eq!(generator.fading(), 0);
        tick_to(&mut generator, 1500);
        assert_eq!(generator.contribution(Destination::Pitch(1), 1500), 0.0);
    }

    #[test]
    fn test_reconnect_same_destination_keeps_send() {
        let mut generator = ModGenerator::new(5.0, Waveform::Sine);
        generator.connect(Destination::Tremolo, 0, 480);
        generator.connect(Destination::Tremolo, 1000, 480);
        assert_eq!(generator.fading(), 0);
        assert_eq!(generator.destination(), Some(Destination::Tremolo));
    }

    #[test]
    fn test_second_detach_keeps_the_first_fade() {
        let mut generator = square_at_full_depth();
        generator.connect(Destination::Pitch(1), 0, 480);
        // Retarget, then cut the new route 100 samples later
        generator.connect(Destination::FilterCutoff(1), 1000, 480);
        generator.disconnect(1100, 480);
        assert_eq!(generator.fading(), 2);

        tick_to(&mut generator, 1200);
        let pitch = generator.contribution(Destination::Pitch(1), 1200);
        let cutoff = generator.contribution(Destination::FilterCutoff(1), 1200);
        assert!((pitch - (1.0 - 200.0 / 480.0)).abs() < 1e-3, "got {pitch}");
        assert!(cutoff > 0.0, "got {cutoff}");

        generator.collect_faded(1580);
        assert_eq!(generator.fading(), 0);
    }

    #[test]
    fn test_fades_to_one_destination_are_folded() {
        let mut generator = square_at_full_depth();
        generator.connect(Destination::Tremolo, 0, 480);
        generator.disconnect(1000, 480);
        // Back on half-way through the fade, off again soon after
        generator.connect(Destination::Tremolo, 1240, 480);
        tick_to(&mut generator, 1360);
        let before = generator.contribution(Destination::Tremolo, 1360);
        generator.disconnect(1360, 480);
        assert_eq!(generator.fading(), 1);

        let after = generator.contribution(Destination::Tremolo, 1360);
        assert!((before - 0.5).abs() < 1e-3, "got {before}");
        assert!((before - after).abs() < 1e-6, "{before} vs {after}");
    }
}
