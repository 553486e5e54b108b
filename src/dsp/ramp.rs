//! Click-free parameter transitions.

/*
Parameter Ramps
===============

A parameter that jumps from one value to another between two samples produces
a step in the signal. A step contains energy at every frequency, so we hear
it as a click. Every audio-rate parameter in this crate therefore moves
through a short linear ramp instead of being assigned directly.

Vocabulary
----------

  anchor      The (time, value) pair a ramp starts from. Always the value the
              parameter has *right now*, even if it is halfway through an
              earlier ramp.

  target      The value the ramp arrives at.

  segment     One linear piece of automation: anchor -> target over N samples.

  cancel      Dropping whatever was scheduled but not yet reached.


Why a Single Segment
--------------------

Browser-style automation keeps a whole timeline of scheduled events. Two
overlapping ramps on the same parameter then race: the second one is queued
behind the first, and the final value depends on who scheduled what when.

Here each parameter holds exactly one segment. Scheduling a ramp evaluates the
current value first, then replaces the segment:

    value
      1.0 ┤        ╱‾‾‾‾ (old target, never reached)
          │      ╱
      0.6 ┤    ●───────╲            ● = anchor taken at "now"
          │  ╱           ╲
      0.0 ┤╱               ╲_______  new target
          └──────────────────────→ time
               now     now + duration

So cancellation always happens before the new ramp, and the new ramp starts
from the value that was actually sounding. This is what keeps a note-off
during the attack click-free.


Standard Durations
------------------

  CONTROL_RAMP   10 ms   knob/CC/modulation-depth updates, attack
  RELEASE_RAMP   20 ms   amplitude fade on note-off
  STOP_DELAY     30 ms   generator stop, after the release fade is done

The only write that bypasses a ramp is the very first value of a freshly
created parameter (`AudioParam::new`), when there is nothing to cancel.
*/

/// Control-driven updates (knobs, CC, modulation depth) and the note attack.
pub const CONTROL_RAMP: f32 = 0.010;
/// Attack ramp from silence to the note's initial gain.
pub const ATTACK_RAMP: f32 = 0.010;
/// Amplitude fade when a note is released.
pub const RELEASE_RAMP: f32 = 0.020;
/// Delay before the generator is stopped, measured from note-off.
pub const STOP_DELAY: f32 = 0.030;

/// Convert seconds to a whole number of samples (at least one).
#[inline]
pub fn seconds_to_samples(seconds: f32, sample_rate: f32) -> u64 {
    (seconds * sample_rate).round().max(1.0) as u64
}

/// A scalar audio parameter with one linear automation segment.
///
/// Times are absolute sample positions on the audio clock.
#[derive(Debug, Clone, Copy)]
pub struct AudioParam {
    start_time: u64,
    start_value: f32,
    end_time: u64,
    end_value: f32,
}

impl AudioParam {
    /// Create a parameter holding `value`. This is the creation-time write.
    pub fn new(value: f32) -> Self {
        Self {
            start_time: 0,
            start_value: value,
            end_time: 0,
            end_value: value,
        }
    }

    /// Evaluate the parameter at sample time `t`.
    #[inline]
    pub fn value_at(&self, t: u64) -> f32 {
        if t >= self.end_time {
            return self.end_value;
        }
        if t <= self.start_time {
            return self.start_value;
        }
        let span = (self.end_time - self.start_time) as f32;
        let progress = (t - self.start_time) as f32 / span;
        self.start_value + (self.end_value - self.start_value) * progress
    }

    /// Schedule a linear ramp from the value at `now` to `target`.
    ///
    /// Anything scheduled after `now` is cancelled first.
    pub fn ramp_to(&mut self, now: u64, target: f32, duration_samples: u64) {
        let anchor = self.value_at(now);
        self.start_time = now;
        self.start_value = anchor;
        self.end_time = now + duration_samples.max(1);
        self.end_value = target;
    }

    /// The value the parameter settles on once the current segment ends.
    pub fn target(&self) -> f32 {
        self.end_value
    }

    /// True while a ramp is still in flight at time `t`.
    pub fn is_ramping(&self, t: u64) -> bool {
        t < self.end_time && self.start_value != self.end_value
    }

    /// Sample time at which the current segment completes.
    pub fn settles_at(&self) -> u64 {
        self.end_time
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_param_is_constant() {
        let param = AudioParam::new(0.7);
        assert_eq!(param.value_at(0), 0.7);
        assert_eq!(param.value_at(1_000_000), 0.7);
        assert!(!param.is_ramping(0));
    }

    #[test]
    fn test_linear_ramp_midpoint() {
        let mut param = AudioParam::new(0.0);
        param.ramp_to(100, 1.0, 480);

        assert_eq!(param.value_at(100), 0.0);
        assert!((param.value_at(340) - 0.5).abs() < 1e-6);
        assert_eq!(param.value_at(580), 1.0);
        assert_eq!(param.value_at(10_000), 1.0);
    }

    #[test]
    fn test_ramp_anchors_at_current_value_mid_ramp() {
        // Attack 0 -> 1 over 480 samples, interrupted halfway by a release
        let mut param = AudioParam::new(0.0);
        param.ramp_to(0, 1.0, 480);
        param.ramp_to(240, 0.0, 960);

        // The release must start at 0.5 (the sounding value), not 1.0
        assert!((param.value_at(240) - 0.5).abs() < 1e-6);
        assert!((param.value_at(720) - 0.25).abs() < 1e-6);
        assert_eq!(param.value_at(1200), 0.0);
    }

    #[test]
    fn test_second_ramp_replaces_first() {
        let mut param = AudioParam::new(100.0);
        param.ramp_to(0, 200.0, 1000);
        param.ramp_to(0, 50.0, 1000);

        // Only the latest ramp survives: the final value is deterministic
        assert_eq!(param.value_at(5000), 50.0);
        assert_eq!(param.target(), 50.0);
    }

    #[test]
    fn test_ramping_only_while_moving() {
        let mut param = AudioParam::new(0.0);
        param.ramp_to(0, 1.0, 100);
        assert!(param.is_ramping(50));
        assert!(!param.is_ramping(100));

        // A ramp to the value already held never moves
        let mut idle = AudioParam::new(0.0);
        idle.ramp_to(0, 0.0, 100);
        assert!(!idle.is_ramping(50));
    }

    #[test]
    fn test_zero_duration_still_ramps_one_sample() {
        let mut param = AudioParam::new(0.0);
        param.ramp_to(10, 1.0, 0);
        assert_eq!(param.value_at(10), 0.0);
        assert_eq!(param.value_at(11), 1.0);
    }

    #[test]
    fn test_seconds_to_samples() {
        assert_eq!(seconds_to_samples(CONTROL_RAMP, 48_000.0), 480);
        assert_eq!(seconds_to_samples(RELEASE_RAMP, 48_000.0), 960);
        assert_eq!(seconds_to_samples(STOP_DELAY, 44_100.0), 1323);
        assert_eq!(seconds_to_samples(0.0, 48_000.0), 1);
    }
}
