//! Control-rate conventions for the modulation sources.

/*
Modulation Rates
================

A modulation source is the same oscillator as the voice, run below the
audible range so its output moves a parameter instead of being heard:

  audio-rate      ~20 Hz and up. The voice generator.
  control-rate    0.1 Hz to 20 Hz. Every modulation source.

What the range sounds like on each target:

    pitch       0.1 - 1 Hz slow drift, 4 - 7 Hz vibrato
    filter      0.1 - 2 Hz sweeps, faster rates turn into a wah
    amplitude   2 - 10 Hz tremolo, above 15 Hz a rough AM buzz

Sources are free-running: each generator starts with the engine and is
never reset, so consecutive notes catch it at different phases.
*/

/// Lowest rate a modulation source accepts.
pub const MIN_RATE_HZ: f32 = 0.1;
/// Highest rate a modulation source accepts.
pub const MAX_RATE_HZ: f32 = 20.0;

/// Clamp a requested rate to the control-rate range. NaN reads as the floor.
#[inline]
pub fn clamp_rate(rate_hz: f32) -> f32 {
    if rate_hz.is_nan() {
        return MIN_RATE_HZ;
    }
    rate_hz.clamp(MIN_RATE_HZ, MAX_RATE_HZ)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clamp_rate() {
        assert_eq!(clamp_rate(5.0), 5.0);
        assert_eq!(clamp_rate(0.0), MIN_RATE_HZ);
        assert_eq!(clamp_rate(500.0), MAX_RATE_HZ);
        assert_eq!(clamp_rate(f32::NAN), MIN_RATE_HZ);
    }
}
