use std::collections::VecDeque;

use crate::{
    config::{EngineConfig, MAX_CUTOFF_HZ},
    dsp::{
        filter::{MAX_RESONANCE_DB, MIN_CUTOFF_HZ},
        oscillator::Waveform,
        ramp::CONTROL_RAMP,
    },
    error::EngineError,
    graph::{
        clock::AudioClock,
        command::{command_channel, CommandSender, GraphCommand, SharedParam, SourceIndex, VoiceId, VoiceSpec},
        renderer::Renderer,
        scope::{scope_channel, ScopeTap},
    },
    io::{
        connection::{DeliveryToken, MidiConnection, MidiPort, MidiStatus, PortState},
        converter::{midi_note_to_freq, midi_to_command, velocity_to_gain},
        midi::MidiEvent,
    },
    synth::{
        message::{Control, SynthCommand, SynthEvent},
        modulation::{ModTarget, ModulationSource},
        notes::{frequency_of, keyboard_name, note_name, parse_note_name},
        orchestrator::{InputSource, NoteIdentity, NoteOnDecision, NoteOrchestrator},
        router::ModulationRouter,
        settings::{SettingsSnapshot, SourceSettings},
        voice::{Voice, VoiceState},
    },
};

/*
Synth Engine
============

The explicit context object for the control plane. It owns everything that
would otherwise be global state:

    command sender ──rtrb──→ Renderer (audio thread)
    audio clock    ←─atomic── Renderer
    current voice, last released voice
    modulation router (sources + routing table)
    note orchestrator
    control values (master, waveform, cutoff, resonance)
    MIDI binding
    outgoing events for the front end

Every UI or MIDI callback becomes one `SynthCommand`, handled to completion
by `dispatch` before the next one. Nothing here blocks: each operation turns
into schedule requests that the renderer applies at its next block.
*/

/// Control values that are not owned by a modulation source.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Controls {
    pub master_volume: f32,
    pub waveform: Waveform,
    pub cutoff: f32,
    pub resonance: f32,
}

impl Default for Controls {
    fn default() -> Self {
        let defaults = SettingsSnapshot::default();
        Self {
            master_volume: defaults.master_volume,
            waveform: defaults.osc_waveform,
            cutoff: defaults.filter_cutoff,
            resonance: defaults.filter_resonance,
        }
    }
}

pub struct SynthEngine {
    sample_rate: f32,
    tx: CommandSender,
    clock: AudioClock,
    next_voice_id: VoiceId,
    voice: Option<Voice>,
    released: Option<Voice>,
    router: ModulationRouter,
    notes: NoteOrchestrator,
    controls: Controls,
    midi: MidiConnection,
    midi_missing_reported: bool,
    events: VecDeque<SynthEvent>,
}

impl SynthEngine {
    /// Build the engine together with the renderer it drives and the scope
    /// tap that observes it. The renderer goes to the audio thread.
    pub fn new(config: &EngineConfig) -> (SynthEngine, Renderer, ScopeTap) {
        let (tx, rx) = command_channel(config.command_capacity);
        let (scope_writer, scope_tap) = scope_channel(config.scope_capacity, config.scope_len);
        let clock = AudioClock::new();
        let renderer = Renderer::new(config, rx, clock.clone(), scope_writer);

        let engine = SynthEngine {
            sample_rate: config.sample_rate,
            tx,
            clock,
            next_voice_id: 1,
            voice: None,
            released: None,
            router: ModulationRouter::new(config.modulation_sources),
            notes: NoteOrchestrator::new(),
            controls: Controls::default(),
            midi: MidiConnection::new(),
            midi_missing_reported: false,
            events: VecDeque::new(),
        };
        (engine, renderer, scope_tap)
    }

    pub fn dispatch(&mut self, command: SynthCommand) {
        self.tx.flush();
        match command {
            SynthCommand::PressNote { name, source } => self.note_on(&name, source),
            SynthCommand::ReleaseNote { name, .. } => self.note_off(&name),
            SynthCommand::PointerReleased => self.pointer_released(),
            SynthCommand::MidiNoteOn { note, velocity } => self.midi_note_on(note, velocity),
            SynthCommand::MidiNoteOff { note } => self.midi_note_off(note),
            SynthCommand::SetMasterVolume(volume) => self.set_master_volume(volume),
            SynthCommand::SetWaveform(waveform) => self.set_waveform(waveform),
            SynthCommand::SetCutoff(cutoff) => self.set_cutoff(cutoff),
            SynthCommand::SetResonance(q) => self.set_resonance(q),
            SynthCommand::SetSourceRate { source, rate } => self.set_source_rate(source, rate),
            SynthCommand::SetSourceWaveform { source, waveform } => {
                self.set_source_waveform(source, waveform)
            }
            SynthCommand::SetSourceDepth { source, depth } => self.set_source_depth(source, depth),
            SynthCommand::SetSourceTarget { source, target } => {
                self.set_source_target(source, target)
            }
            SynthCommand::ToggleSourcePause { source } => self.toggle_source_pause(source),
        }
    }

    /// Everything observable since the last call, oldest first.
    pub fn drain_events(&mut self) -> Vec<SynthEvent> {
        self.events.drain(..).collect()
    }

    /* Notes */

    /// Name-based note-on from the pointer or computer keyboard. Names that
    /// are not on the on-screen keyboard are ignored. Spellings of the same
    /// pitch ("Db4", "C#4") are one note.
    pub fn note_on(&mut self, name: &str, source: InputSource) {
        let Some(midi) = parse_note_name(name) else {
            log::debug!("ignoring note-on for unknown note '{name}'");
            return;
        };
        let canonical = note_name(midi);
        let Some(frequency) = frequency_of(&canonical) else {
            log::debug!("ignoring note-on for '{name}', not on the keyboard");
            return;
        };
        let identity = NoteIdentity::new(Some(canonical), Some(midi));
        self.start_note(identity, frequency, 1.0, source);
    }

    /// Name-based note-off. Only stops the note if it is the one sounding.
    pub fn note_off(&mut self, name: &str) {
        let Some(canonical) = parse_note_name(name).map(note_name) else {
            return;
        };
        if self.notes.matches_name(&canonical) {
            self.stop_current();
        }
    }

    /// Pointer released anywhere: stops the current note unless MIDI owns it.
    pub fn pointer_released(&mut self) {
        if self.notes.stops_on_pointer_release() {
            self.stop_current();
        }
    }

    pub fn midi_note_on(&mut self, note: u8, velocity: u8) {
        if velocity == 0 {
            self.midi_note_off(note);
            return;
        }
        let identity = NoteIdentity::new(keyboard_name(note), Some(note));
        self.start_note(
            identity,
            midi_note_to_freq(note),
            velocity_to_gain(velocity),
            InputSource::Midi,
        );
    }

    /// Stops the voice only when `note` is the MIDI number being tracked.
    pub fn midi_note_off(&mut self, note: u8) {
        if self.notes.matches_midi(note) {
            self.stop_current();
        }
    }

    fn start_note(&mut self, identity: NoteIdentity, frequency: f32, gain: f32, source: InputSource) {
        if self.notes.decide_note_on(&identity, source) == NoteOnDecision::Ignore {
            log::debug!("retrigger of {identity} ignored");
            return;
        }

        // Monophonic: whatever sounds is stopped first, unconditionally.
        self.stop_current();

        let id = self.next_voice_id;
        self.next_voice_id += 1;
        let spec = VoiceSpec {
            frequency,
            gain,
            waveform: self.controls.waveform,
            cutoff: self.controls.cutoff,
            resonance: self.controls.resonance,
        };

        let now = self.clock.now();
        let mut voice = Voice::new(id, spec, self.sample_rate);
        voice.start(&mut self.tx, now);
        self.router.bind_voice(id, &mut self.tx);

        log::debug!("note on {identity} as voice {id} ({frequency:.2} Hz, gain {gain:.2})");
        self.notes.note_started(identity.clone(), source);
        self.events.push_back(SynthEvent::NoteOn(identity));
        self.voice = Some(voice);
    }

    fn stop_current(&mut self) {
        let now = self.clock.now();
        if let Some(mut voice) = self.voice.take() {
            voice.stop(&mut self.router, &mut self.tx, now);
            self.released = Some(voice);
        }
        if let Some(identity) = self.notes.clear() {
            log::debug!("note off {identity}");
            self.events.push_back(SynthEvent::NoteOff(identity));
        }
    }

    /* Global controls */

    pub fn set_master_volume(&mut self, volume: f32) {
        self.controls.master_volume = volume.clamp(0.0, 1.0);
        self.tx.send(GraphCommand::RampShared {
            param: SharedParam::Master,
            target: self.controls.master_volume,
            duration: CONTROL_RAMP,
        });
    }

    /// Applies to the next note, and to the current one at once.
    pub fn set_waveform(&mut self, waveform: Waveform) {
        self.controls.waveform = waveform;
        let now = self.clock.now();
        if let Some(voice) = &mut self.voice {
            voice.set_waveform(waveform, &mut self.tx, now);
        }
    }

    pub fn set_cutoff(&mut self, cutoff_hz: f32) {
        self.controls.cutoff = cutoff_hz.clamp(MIN_CUTOFF_HZ, MAX_CUTOFF_HZ);
        let now = self.clock.now();
        if let Some(voice) = &mut self.voice {
            voice.set_cutoff(self.controls.cutoff, &mut self.tx, now);
        }
    }

    pub fn set_resonance(&mut self, q_db: f32) {
        self.controls.resonance = q_db.clamp(0.0, MAX_RESONANCE_DB);
        let now = self.clock.now();
        if let Some(voice) = &mut self.voice {
            voice.set_resonance(self.controls.resonance, &mut self.tx, now);
        }
    }

    /* Modulation sources */

    pub fn set_source_rate(&mut self, source: SourceIndex, rate: f32) {
        self.router.set_rate(source, rate, &mut self.tx);
    }

    pub fn set_source_waveform(&mut self, source: SourceIndex, waveform: Waveform) {
        self.router.set_waveform(source, waveform, &mut self.tx);
    }

    pub fn set_source_depth(&mut self, source: SourceIndex, depth: f32) {
        let voice = self.sounding_voice();
        self.router.set_depth(source, depth, voice, &mut self.tx);
    }

    pub fn set_source_target(&mut self, source: SourceIndex, target: ModTarget) {
        let voice = self.sounding_voice();
        self.router.set_target(source, target, voice, &mut self.tx);
    }

    pub fn toggle_source_pause(&mut self, source: SourceIndex) {
        self.router.toggle_pause(source, &mut self.tx);
    }

    fn sounding_voice(&self) -> Option<VoiceId> {
        self.voice.as_ref().map(Voice::id)
    }

    /* MIDI */

    /// Decode one 1-3 byte MIDI message and act on it.
    pub fn handle_midi(&mut self, bytes: &[u8]) {
        let Some(event) = MidiEvent::decode(bytes) else {
            return;
        };
        let Some(command) = midi_to_command(event) else {
            return;
        };
        log::debug!("MIDI {event:?}");

        let echo = match command {
            SynthCommand::SetMasterVolume(_) => Some(Control::MasterVolume),
            SynthCommand::SetCutoff(_) => Some(Control::Cutoff),
            SynthCommand::SetResonance(_) => Some(Control::Resonance),
            _ => None,
        };
        self.dispatch(command);

        if let Some(control) = echo {
            let value = match control {
                Control::MasterVolume => self.controls.master_volume,
                Control::Cutoff => self.controls.cutoff,
                Control::Resonance => self.controls.resonance,
            };
            self.events
                .push_back(SynthEvent::ControlChanged { control, value });
        }
    }

    /// Bind the first available MIDI input. The returned token must be
    /// checked by the transport before delivering each message.
    pub fn enable_midi(&mut self, ports: &[MidiPort]) -> Option<DeliveryToken> {
        match self.midi.bind_first(ports) {
            Ok(token) => {
                if let Some(port) = self.midi.device() {
                    let status = MidiStatus::Connected {
                        device: port.name.clone(),
                    };
                    self.events.push_back(SynthEvent::Midi(status));
                }
                Some(token)
            }
            Err(EngineError::NoMidiInput) => {
                if !self.midi_missing_reported {
                    log::warn!("{}", EngineError::NoMidiInput);
                    self.midi_missing_reported = true;
                    self.events.push_back(SynthEvent::Midi(MidiStatus::NoInput));
                }
                None
            }
            Err(err) => {
                log::warn!("MIDI binding failed: {err}");
                None
            }
        }
    }

    pub fn midi_port_changed(&mut self, port: &MidiPort, state: PortState) {
        if let Some(status) = self.midi.port_changed(port, state) {
            if let MidiStatus::Disconnected { device } = &status {
                log::warn!("{}", EngineError::MidiDisconnected { device: device.clone() });
                self.midi_missing_reported = false;
            }
            self.events.push_back(SynthEvent::Midi(status));
        }
    }

    pub fn midi_device(&self) -> Option<&MidiPort> {
        self.midi.device()
    }

    /* Settings */

    pub fn gather_snapshot(&self) -> SettingsSnapshot {
        SettingsSnapshot {
            master_volume: self.controls.master_volume,
            osc_waveform: self.controls.waveform,
            filter_cutoff: self.controls.cutoff,
            filter_resonance: self.controls.resonance,
            lfos: self
                .router
                .sources()
                .iter()
                .map(|s| SourceSettings {
                    rate: s.rate(),
                    depth: s.depth(),
                    waveform: s.waveform(),
                    target: s.target(),
                })
                .collect(),
        }
    }

    /// Apply every field through the regular ramped setters. Sources without
    /// an entry get defaults; every source comes back unpaused.
    pub fn apply_snapshot(&mut self, snapshot: &SettingsSnapshot) {
        self.set_master_volume(snapshot.master_volume);
        self.set_waveform(snapshot.osc_waveform);
        self.set_cutoff(snapshot.filter_cutoff);
        self.set_resonance(snapshot.filter_resonance);

        let voice = self.sounding_voice();
        for index in 0..self.router.sources().len() {
            let settings = snapshot.source(index);
            self.router.set_rate(index, settings.rate, &mut self.tx);
            self.router.set_waveform(index, settings.waveform, &mut self.tx);
            self.router.set_paused(index, false, &mut self.tx);
            self.router.set_target(index, settings.target, voice, &mut self.tx);
            self.router.set_depth(index, settings.depth, voice, &mut self.tx);
        }
        log::debug!("settings applied");
    }

    /* Inspection */

    pub fn controls(&self) -> &Controls {
        &self.controls
    }

    pub fn sources(&self) -> &[ModulationSource] {
        self.router.sources()
    }

    pub fn current_note(&self) -> Option<&NoteIdentity> {
        self.notes.current()
    }

    /// Id of the voice that is the current note, if any.
    pub fn current_voice(&self) -> Option<VoiceId> {
        self.sounding_voice()
    }

    /// Lifecycle of `id` as of the audio clock. Voices older than the last
    /// released one read as Stopped.
    pub fn voice_state(&self, id: VoiceId) -> VoiceState {
        let now = self.clock.now();
        [&self.voice, &self.released]
            .into_iter()
            .flatten()
            .find(|v| v.id() == id)
            .map_or(VoiceState::Stopped, |v| v.state(now))
    }

    pub fn clock(&self) -> &AudioClock {
        &self.clock
    }

    pub fn sample_rate(&self) -> f32 {
        self.sample_rate
    }

    /// Hand commands held back by a full ring to the renderer. Call this
    /// periodically; `dispatch` also does it before each command.
    pub fn flush_commands(&mut self) {
        self.tx.flush();
    }

    /// Commands waiting because the renderer was not draining the ring.
    pub fn deferred_commands(&self) -> usize {
        self.tx.deferred()
    }
}
