#![cfg(feature = "serde")]

use monosynth::{
    dsp::Waveform,
    synth::{ModTarget, SettingsSnapshot, SourceSettings, SynthCommand, SynthEngine},
    EngineConfig,
};

fn engine() -> SynthEngine {
    let (engine, _renderer, _scope) = SynthEngine::new(&EngineConfig::default());
    engine
}

#[test]
fn export_import_round_trip_without_pause_state() {
    let mut source = engine();
    source.dispatch(SynthCommand::SetMasterVolume(0.4));
    source.dispatch(SynthCommand::SetWaveform(Waveform::Sawtooth));
    source.dispatch(SynthCommand::SetCutoff(1_200.0));
    source.dispatch(SynthCommand::SetResonance(8.0));
    source.dispatch(SynthCommand::SetSourceRate { source: 1, rate: 2.5 });
    source.dispatch(SynthCommand::SetSourceTarget {
        source: 1,
        target: ModTarget::Filter,
    });
    source.dispatch(SynthCommand::SetSourceDepth {
        source: 1,
        depth: 0.3,
    });
    source.dispatch(SynthCommand::ToggleSourcePause { source: 1 });

    let json = source.gather_snapshot().to_json_pretty().unwrap();
    assert!(!json.contains("paused"));

    let mut restored = engine();
    restored.apply_snapshot(&SettingsSnapshot::from_json(&json).unwrap());

    assert_eq!(restored.gather_snapshot(), source.gather_snapshot());
    assert_eq!(restored.controls().waveform, Waveform::Sawtooth);
    let lfo = &restored.sources()[1];
    assert!(!lfo.is_paused());
    assert_eq!(lfo.target(), ModTarget::Filter);
}

#[test]
fn applying_a_snapshot_unpauses_every_source() {
    let mut engine = engine();
    engine.dispatch(SynthCommand::ToggleSourcePause { source: 0 });
    assert!(engine.sources()[0].is_paused());

    engine.apply_snapshot(&engine.gather_snapshot());
    assert!(engine.sources().iter().all(|s| !s.is_paused()));
}

#[test]
fn short_lfo_list_defaults_the_rest() {
    let json = r#"{ "masterVolume": 0.5, "lfos": [{ "rate": 9, "depth": 1, "target": "pitch" }] }"#;
    let mut engine = engine();
    engine.dispatch(SynthCommand::SetSourceDepth {
        source: 1,
        depth: 0.9,
    });
    engine.apply_snapshot(&SettingsSnapshot::from_json(json).unwrap());

    let snapshot = engine.gather_snapshot();
    assert_eq!(snapshot.master_volume, 0.5);
    assert_eq!(snapshot.source(0).rate, 9.0);
    assert_eq!(snapshot.source(0).target, ModTarget::Pitch);
    assert_eq!(snapshot.source(1), SourceSettings::default());
}

#[test]
fn serde_deserialize_is_lenient_too() {
    let snapshot: SettingsSnapshot =
        serde_json::from_str(r#"{ "filterCutoff": "900", "oscWaveform": 3 }"#).unwrap();
    assert_eq!(snapshot.filter_cutoff, 900.0);
    assert_eq!(snapshot.osc_waveform, Waveform::Sine);
}
