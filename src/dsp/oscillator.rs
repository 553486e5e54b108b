use std::{f32::consts::TAU, fmt, str::FromStr};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/*
Oscillator Waveforms
====================

The same four shapes drive both the audible generator and the modulation
sources. Only the frequency range differs (20 Hz - 20 kHz vs 0.1 - 20 Hz).

    sine      ∿   fundamental only
    square    ⊓⊔  odd harmonics, 1/n
    sawtooth  ╱│  all harmonics, 1/n
    triangle  ╱╲  odd harmonics, 1/n²

Phase runs from 0.0 to 1.0 and wraps. One sample advances the phase by
`frequency / sample_rate`.


Aliasing
--------

Square and sawtooth jump instantly. A jump sampled at 48 kHz contains
harmonics far above Nyquist that fold back as inharmonic whine. PolyBLEP
(polynomial band-limited step) smooths the two samples around each jump with
a small polynomial correction, which removes most of the folding at almost
no cost. At LFO rates the correction only touches a handful of samples per
second and is inaudible in the control signal.
*/

/// Generator shape, shared by the voice oscillator and the modulation sources.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Waveform {
    #[default]
    Sine,
    Square,
    Sawtooth,
    Triangle,
}

impl Waveform {
    pub const ALL: [Waveform; 4] = [
        Waveform::Sine,
        Waveform::Square,
        Waveform::Sawtooth,
        Waveform::Triangle,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Waveform::Sine => "sine",
            Waveform::Square => "square",
            Waveform::Sawtooth => "sawtooth",
            Waveform::Triangle => "triangle",
        }
    }

    /// Next shape in `ALL`, wrapping. Used by front ends that cycle through shapes.
    pub fn next(&self) -> Waveform {
        let idx = Self::ALL.iter().position(|w| w == self).unwrap_or(0);
        Self::ALL[(idx + 1) % Self::ALL.len()]
    }

    /// Naive (non band-limited) value at `phase` in [0, 1).
    #[inline]
    pub fn naive(&self, phase: f32) -> f32 {
        match self {
            Waveform::Sine => (TAU * phase).sin(),
            Waveform::Square => {
                if phase < 0.5 {
                    1.0
                } else {
                    -1.0
                }
            }
            Waveform::Sawtooth => 2.0 * phase - 1.0,
            Waveform::Triangle => 1.0 - 4.0 * (phase - 0.5).abs(),
        }
    }
}

impl fmt::Display for Waveform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownWaveform(pub String);

impl fmt::Display for UnknownWaveform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown waveform '{}'", self.0)
    }
}

impl std::error::Error for UnknownWaveform {}

impl FromStr for Waveform {
    type Err = UnknownWaveform;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sine" => Ok(Waveform::Sine),
            "square" => Ok(Waveform::Square),
            "sawtooth" | "saw" => Ok(Waveform::Sawtooth),
            "triangle" => Ok(Waveform::Triangle),
            other => Err(UnknownWaveform(other.to_string())),
        }
    }
}

/// Polynomial correction around a unit step at phase 0.
#[inline]
fn poly_blep(t: f32, dt: f32) -> f32 {
    if t < dt {
        let x = t / dt;
        x + x - x * x - 1.0
    } else if t > 1.0 - dt {
        let x = (t - 1.0) / dt;
        x * x + x + x + 1.0
    } else {
        0.0
    }
}

/// Phase-accumulating oscillator. Frequency is supplied per sample so that
/// ramps and modulation apply without extra state.
#[derive(Debug, Clone)]
pub struct Oscillator {
    waveform: Waveform,
    phase: f32,
}

impl Oscillator {
    pub fn new(waveform: Waveform) -> Self {
        Self { waveform, phase: 0.0 }
    }

    pub fn waveform(&self) -> Waveform {
        self.waveform
    }

    /// Switch shape immediately. Phase is kept so the switch does not restart the cycle.
    pub fn set_waveform(&mut self, waveform: Waveform) {
        self.waveform = waveform;
    }

    /// Produce one sample at `frequency` Hz and advance the phase.
    #[inline]
    pub fn next_sample(&mut self, frequency: f32, sample_rate: f32) -> f32 {
        let dt = (frequency / sample_rate).clamp(0.0, 0.5);
        let t = self.phase;

        let value = match self.waveform {
            Waveform::Sawtooth => self.waveform.naive(t) - poly_blep(t, dt),
            Waveform::Square => {
                self.waveform.naive(t) + poly_blep(t, dt) - poly_blep((t + 0.5).fract(), dt)
            }
            Waveform::Sine | Waveform::Triangle => self.waveform.naive(t),
        };

        self.phase = (self.phase + dt).fract();
        value
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_sine() {
        let sample_rate = 48_000.0;
        let frequency = 440.0;
        let mut osc = Oscillator::new(Waveform::Sine);

        let samples: Vec<f32> = (0..64).map(|_| osc.next_sample(frequency, sample_rate)).collect();

        // sample n should be sin(2pi f n / sr)
        let n = 12;
        let expected = (TAU * frequency * n as f32 / sample_rate).sin();
        assert!(
            (samples[n] - expected).abs() < 1e-4,
            "expected {expected}, got {}",
            samples[n]
        );
    }

    #[test]
    fn test_all_waveforms_stay_in_range() {
        for waveform in Waveform::ALL {
            let mut osc = Oscillator::new(waveform);
            for _ in 0..4800 {
                let sample = osc.next_sample(1234.5, 48_000.0);
                assert!(
                    (-1.1..=1.1).contains(&sample),
                    "{waveform} sample {sample} out of range"
                );
            }
        }
    }

    #[test]
    fn test_waveform_switch_keeps_phase() {
        let mut osc = Oscillator::new(Waveform::Sine);
        for _ in 0..100 {
            osc.next_sample(100.0, 48_000.0);
        }
        let phase_before = osc.phase;
        osc.set_waveform(Waveform::Square);
        assert_eq!(osc.phase, phase_before);
        assert_eq!(osc.waveform(), Waveform::Square);
    }

    #[test]
    fn test_waveform_parse_and_display() {
        assert_eq!("sine".parse::<Waveform>(), Ok(Waveform::Sine));
        assert_eq!("Sawtooth".parse::<Waveform>(), Ok(Waveform::Sawtooth));
        assert_eq!(" triangle ".parse::<Waveform>(), Ok(Waveform::Triangle));
        assert!("noise".parse::<Waveform>().is_err());
        for waveform in Waveform::ALL {
            assert_eq!(waveform.to_string().parse::<Waveform>(), Ok(waveform));
        }
    }

    #[test]
    fn test_waveform_next_cycles() {
        let mut w = Waveform::Sine;
        for _ in 0..Waveform::ALL.len() {
            w = w.next();
        }
        assert_eq!(w, Waveform::Sine);
    }
}
