//! Serializable snapshot of every user-facing control value.
//!
//! The snapshot deliberately has no pause flags: sources always come back
//! unpaused. Reading and writing files is the front end's job.

#[cfg(feature = "serde")]
use serde::{Deserialize, Deserializer, Serialize};
#[cfg(feature = "serde")]
use serde_json::Value;

use crate::{
    config::{
        DEFAULT_CUTOFF_HZ, DEFAULT_MASTER_VOLUME, DEFAULT_RESONANCE, DEFAULT_SOURCE_RATE_HZ,
    },
    dsp::oscillator::Waveform,
    synth::modulation::ModTarget,
};

#[cfg(feature = "serde")]
use crate::error::{EngineError, Result};

#[cfg_attr(feature = "serde", derive(Serialize))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SourceSettings {
    pub rate: f32,
    pub depth: f32,
    pub waveform: Waveform,
    pub target: ModTarget,
}

impl Default for SourceSettings {
    fn default() -> Self {
        Self {
            rate: DEFAULT_SOURCE_RATE_HZ,
            depth: 0.0,
            waveform: Waveform::Sine,
            target: ModTarget::None,
        }
    }
}

#[cfg_attr(feature = "serde", derive(Serialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
#[derive(Debug, Clone, PartialEq)]
pub struct SettingsSnapshot {
    pub master_volume: f32,
    pub osc_waveform: Waveform,
    pub filter_cutoff: f32,
    pub filter_resonance: f32,
    pub lfos: Vec<SourceSettings>,
}

impl SettingsSnapshot {
    /// Defaults for an engine with `sources` modulation sources.
    pub fn with_sources(sources: usize) -> Self {
        Self {
            master_volume: DEFAULT_MASTER_VOLUME,
            osc_waveform: Waveform::Sine,
            filter_cutoff: DEFAULT_CUTOFF_HZ,
            filter_resonance: DEFAULT_RESONANCE,
            lfos: vec![SourceSettings::default(); sources],
        }
    }

    /// Settings for source `index`, defaulted when the snapshot has none.
    pub fn source(&self, index: usize) -> SourceSettings {
        self.lfos.get(index).copied().unwrap_or_default()
    }
}

impl Default for SettingsSnapshot {
    fn default() -> Self {
        Self::with_sources(2)
    }
}

/*
Lenient decoding
----------------

Snapshots come from files people edit by hand and from older front ends
that stored every slider value as a string. Each field is decoded on its
own:

  missing            → default, silently
  wrong type / junk  → default, with a warning
  "0.5" or 0.5       → 0.5

A document that is not JSON at all is the only hard error, and callers are
expected to fall back to `SettingsSnapshot::default()` in that case.
*/

#[cfg(feature = "serde")]
impl SettingsSnapshot {
    pub fn from_json(text: &str) -> Result<Self> {
        let value: Value =
            serde_json::from_str(text).map_err(|err| EngineError::MalformedSnapshot(err.to_string()))?;
        Ok(Self::from_value(&value))
    }

    pub fn from_value(value: &Value) -> Self {
        let defaults = SettingsSnapshot::with_sources(0);
        let lfos = match value.get("lfos") {
            Some(Value::Array(entries)) => entries.iter().map(SourceSettings::from_value).collect(),
            Some(other) => {
                log::warn!("settings: ignoring malformed 'lfos' field: {other}");
                Vec::new()
            }
            None => Vec::new(),
        };

        Self {
            master_volume: field(value, "masterVolume", defaults.master_volume, number),
            osc_waveform: field(value, "oscWaveform", defaults.osc_waveform, parsed),
            filter_cutoff: field(value, "filterCutoff", defaults.filter_cutoff, number),
            filter_resonance: field(value, "filterResonance", defaults.filter_resonance, number),
            lfos,
        }
    }

    pub fn to_json_pretty(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

#[cfg(feature = "serde")]
impl SourceSettings {
    pub fn from_value(value: &Value) -> Self {
        let defaults = SourceSettings::default();
        Self {
            rate: field(value, "rate", defaults.rate, number),
            depth: field(value, "depth", defaults.depth, number),
            waveform: field(value, "waveform", defaults.waveform, parsed),
            target: field(value, "target", defaults.target, parsed),
        }
    }
}

#[cfg(feature = "serde")]
impl<'de> Deserialize<'de> for SettingsSnapshot {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Ok(Self::from_value(&value))
    }
}

#[cfg(feature = "serde")]
fn field<T>(value: &Value, key: &str, default: T, decode: fn(&Value) -> Option<T>) -> T {
    match value.get(key) {
        None | Some(Value::Null) => default,
        Some(raw) => decode(raw).unwrap_or_else(|| {
            log::warn!("settings: ignoring malformed '{key}' field: {raw}");
            default
        }),
    }
}

#[cfg(feature = "serde")]
fn number(raw: &Value) -> Option<f32> {
    let parsed = match raw {
        Value::Number(n) => n.as_f64().map(|x| x as f32),
        Value::String(s) => s.trim().parse::<f32>().ok(),
        _ => None,
    };
    parsed.filter(|x| x.is_finite())
}

#[cfg(feature = "serde")]
fn parsed<T: std::str::FromStr>(raw: &Value) -> Option<T> {
    raw.as_str().and_then(|s| s.parse().ok())
}

#[cfg(all(test, feature = "serde"))]
mod tests {
    use super::*;

    #[test]
    fn test_string_values_are_accepted() {
        let json = r#"{
            "masterVolume": "0.5",
            "oscWaveform": "square",
            "filterCutoff": "1200",
            "filterResonance": 4,
            "lfos": [{ "rate": "2.5", "depth": "0.3", "waveform": "triangle", "target": "filter" }]
        }"#;
        let snapshot = SettingsSnapshot::from_json(json).unwrap();
        assert_eq!(snapshot.master_volume, 0.5);
        assert_eq!(snapshot.osc_waveform, Waveform::Square);
        assert_eq!(snapshot.filter_cutoff, 1200.0);
        assert_eq!(snapshot.filter_resonance, 4.0);
        assert_eq!(
            snapshot.source(0),
            SourceSettings {
                rate: 2.5,
                depth: 0.3,
                waveform: Waveform::Triangle,
                target: ModTarget::Filter,
            }
        );
    }

    #[test]
    fn test_each_field_falls_back_on_its_own() {
        let json = r#"{
            "masterVolume": "loud",
            "oscWaveform": "noise",
            "filterCutoff": 800,
            "lfos": [{ "rate": 3, "target": "wobble" }]
        }"#;
        let snapshot = SettingsSnapshot::from_json(json).unwrap();
        assert_eq!(snapshot.master_volume, DEFAULT_MASTER_VOLUME);
        assert_eq!(snapshot.osc_waveform, Waveform::Sine);
        assert_eq!(snapshot.filter_cutoff, 800.0);
        assert_eq!(snapshot.filter_resonance, DEFAULT_RESONANCE);

        let lfo = snapshot.source(0);
        assert_eq!(lfo.rate, 3.0);
        assert_eq!(lfo.depth, 0.0);
        assert_eq!(lfo.target, ModTarget::None);
        // Missing entries default as a whole
        assert_eq!(snapshot.source(1), SourceSettings::default());
    }

    #[test]
    fn test_not_json_is_an_error() {
        assert!(matches!(
            SettingsSnapshot::from_json("not json"),
            Err(EngineError::MalformedSnapshot(_))
        ));
        // Valid JSON of the wrong shape still decodes to defaults
        let snapshot = SettingsSnapshot::from_json("[1, 2, 3]").unwrap();
        assert_eq!(snapshot.master_volume, DEFAULT_MASTER_VOLUME);
        assert!(snapshot.lfos.is_empty());
    }

    #[test]
    fn test_export_format() {
        let json = SettingsSnapshot::default().to_json_pretty().unwrap();
        let value: Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["oscWaveform"], "sine");
        assert_eq!(value["lfos"][1]["target"], "none");
        assert!(value.get("paused").is_none());
        assert_eq!(SettingsSnapshot::from_json(&json).unwrap(), SettingsSnapshot::default());
    }
}
