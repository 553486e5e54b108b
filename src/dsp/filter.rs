use std::f32::consts::PI;

/*
Lowpass State-Variable Filter
=============================

The voice runs its generator through a resonant lowpass. We use the
topology-preserving-transform (TPT) state-variable filter: two trapezoidal
integrators in a loop. It stays stable while cutoff and resonance move every
sample, which is exactly what modulation does to it.

Parameters
----------

  cutoff     Hz. Clamped to [20 Hz, 0.49 × sample_rate]. Above Nyquist the
             prewarp (tan) blows up, so the clamp is not optional.

  Q (dB)     Resonance expressed the way a biquad lowpass expresses it: the
             peak height at the cutoff, in dB. 0 dB is a flat, gently rounded
             corner; 30 dB is a sharp, whistling peak.

             The SVF damping term is k = 1 / Q_linear, and
             Q_linear = 10^(Q_dB / 20), so:

                 k = 10^(-Q_dB / 20)

                 Q_dB    Q_linear    k
                  0        1.0      1.0
                  6        2.0      0.5
                 20       10.0      0.1
                 30       31.6      0.032


Per-sample Coefficients
-----------------------

    g = tan(π · cutoff / sample_rate)
    h = 1 / (1 + g·(g + k))

    v3 = x - ic2
    v1 = h·(ic1 + g·v3)        bandpass
    v2 = ic2 + g·v1            lowpass
    ic1 = 2·v1 - ic1
    ic2 = 2·v2 - ic2
*/

pub const MIN_CUTOFF_HZ: f32 = 20.0;
pub const MAX_RESONANCE_DB: f32 = 30.0;

/// Clamp a cutoff frequency to the range the filter can realise at `sample_rate`.
#[inline]
pub fn clamp_cutoff(cutoff_hz: f32, sample_rate: f32) -> f32 {
    cutoff_hz.clamp(MIN_CUTOFF_HZ, sample_rate * 0.49)
}

/// Damping term for a resonance given in dB.
#[inline]
pub fn damping_from_q_db(q_db: f32) -> f32 {
    10.0_f32.powf(-q_db.clamp(0.0, MAX_RESONANCE_DB) / 20.0)
}

#[derive(Debug, Clone, Default)]
pub struct SVFilter {
    ic1eq: f32, // First integrator's memory
    ic2eq: f32, // Second integrator's memory
}

impl SVFilter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Filter one sample with the given cutoff (Hz) and resonance (Q in dB).
    #[inline]
    pub fn process(&mut self, input: f32, cutoff_hz: f32, q_db: f32, sample_rate: f32) -> f32 {
        let cutoff = clamp_cutoff(cutoff_hz, sample_rate);
        let g = (PI * cutoff / sample_rate).tan();
        let k = damping_from_q_db(q_db);
        let h = 1.0 / (1.0 + g * (g + k));

        let v3 = input - self.ic2eq;
        let v1 = h * (self.ic1eq + g * v3);
        let v2 = self.ic2eq + g * v1;

        self.ic1eq = 2.0 * v1 - self.ic1eq;
        self.ic2eq = 2.0 * v2 - self.ic2eq;

        v2
    }

    pub fn reset(&mut self) {
        self.ic1eq = 0.0;
        self.ic2eq = 0.0;
    }
}
