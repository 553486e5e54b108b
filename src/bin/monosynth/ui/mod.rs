//! TUI for monosynth
//!
//! Computer keys and the mouse play notes, the remaining keys move the
//! controls. Every input becomes one `SynthCommand`; the engine's events
//! drive the status line and the key highlight.

mod keyboard;
mod panels;
mod waveform;

use std::{fs, io, path::PathBuf, time::Duration};

use color_eyre::eyre::{Result as EyreResult, WrapErr};
use crossterm::{
    event::{
        self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEvent, KeyEventKind,
        KeyboardEnhancementFlags, MouseButton, MouseEvent, MouseEventKind,
        PopKeyboardEnhancementFlags, PushKeyboardEnhancementFlags,
    },
    execute,
    terminal::supports_keyboard_enhancement,
};
use ratatui::{
    layout::{Constraint, Direction, Layout},
    style::{Color, Style},
    widgets::Paragraph,
    DefaultTerminal, Frame,
};

use monosynth::{
    graph::ScopeTap,
    synth::{
        notes::note_for_key, InputSource, SettingsSnapshot, SynthCommand, SynthEngine, SynthEvent,
    },
};

use super::midi_device::MidiInput;

use keyboard::{render_keyboard, KeyboardLayout};
use panels::{render_controls, render_sources, render_status, AudioStats, Status};
use waveform::{render_waveform, silent_view};

const MASTER_STEP: f32 = 0.05;
const DEPTH_STEP: f32 = 0.05;
const RATE_STEP_HZ: f32 = 0.5;
const RESONANCE_STEP_DB: f32 = 1.0;
/// Cutoff moves a third of an octave per key press.
const CUTOFF_STEP: f32 = 1.259_921;

pub struct UiApp {
    engine: SynthEngine,
    scope: ScopeTap,
    midi: MidiInput,
    settings_path: PathBuf,
    /// Latest 8-bit scope view.
    view: Vec<u8>,
    keyboard: KeyboardLayout,
    /// Modulation source the rate/depth/target keys act on.
    selected: usize,
    /// Note started by the computer keyboard, for terminals without key
    /// release events.
    held_key: Option<&'static str>,
    pointer_note: Option<String>,
    active_midi: Option<u8>,
    midi_status: String,
    message: String,
    should_quit: bool,
}

impl UiApp {
    pub fn new(engine: SynthEngine, scope: ScopeTap, midi: MidiInput, settings_path: PathBuf) -> Self {
        Self {
            engine,
            scope,
            midi,
            settings_path,
            view: silent_view(),
            keyboard: KeyboardLayout::default(),
            selected: 0,
            held_key: None,
            pointer_note: None,
            active_midi: None,
            midi_status: String::new(),
            message: String::new(),
            should_quit: false,
        }
    }

    pub fn run(&mut self, terminal: &mut DefaultTerminal) -> EyreResult<()> {
        let key_releases = supports_keyboard_enhancement().unwrap_or(false);
        if key_releases {
            execute!(
                io::stdout(),
                PushKeyboardEnhancementFlags(KeyboardEnhancementFlags::REPORT_EVENT_TYPES)
            )?;
        }
        execute!(io::stdout(), EnableMouseCapture)?;

        self.midi.connect(&mut self.engine);
        let result = self.event_loop(terminal);

        execute!(io::stdout(), DisableMouseCapture)?;
        if key_releases {
            execute!(io::stdout(), PopKeyboardEnhancementFlags)?;
        }
        result
    }

    fn event_loop(&mut self, terminal: &mut DefaultTerminal) -> EyreResult<()> {
        while !self.should_quit {
            self.midi.poll(&mut self.engine);
            self.engine.flush_commands();
            self.poll_events();

            if self.scope.poll() > 0 {
                self.scope.bytes(&mut self.view);
            }

            terminal.draw(|frame| self.render(frame))?;

            // ~60fps
            if event::poll(Duration::from_millis(16))? {
                match event::read()? {
                    Event::Key(key) => self.handle_key(key),
                    Event::Mouse(mouse) => self.handle_mouse(mouse),
                    _ => {}
                }
            }
        }
        Ok(())
    }

    fn poll_events(&mut self) {
        for event in self.engine.drain_events() {
            match event {
                SynthEvent::NoteOn(identity) => self.active_midi = identity.midi,
                SynthEvent::NoteOff(identity) => {
                    if self.active_midi == identity.midi {
                        self.active_midi = None;
                    }
                }
                SynthEvent::ControlChanged { control, value } => {
                    self.message = format!("MIDI: {control:?} {value:.2}");
                }
                SynthEvent::Midi(status) => self.midi_status = status.to_string(),
            }
        }
    }

    fn handle_key(&mut self, key: KeyEvent) {
        let note = match key.code {
            KeyCode::Char(c) => note_for_key(c),
            _ => None,
        };

        if key.kind == KeyEventKind::Release {
            if let Some(name) = note {
                if self.held_key == Some(name) {
                    self.held_key = None;
                }
                self.engine.dispatch(SynthCommand::ReleaseNote {
                    name: name.to_string(),
                    source: InputSource::Keyboard,
                });
            }
            return;
        }

        if let Some(name) = note {
            self.held_key = Some(name);
            self.engine.dispatch(SynthCommand::PressNote {
                name: name.to_string(),
                source: InputSource::Keyboard,
            });
            return;
        }

        // Key repeat only matters for notes
        if key.kind == KeyEventKind::Repeat {
            return;
        }

        let controls = *self.engine.controls();
        let source = self.engine.sources().get(self.selected);
        let command = match key.code {
            KeyCode::Char('q') | KeyCode::Esc => {
                self.should_quit = true;
                None
            }
            KeyCode::Char(' ') => self.held_key.take().map(|name| SynthCommand::ReleaseNote {
                name: name.to_string(),
                source: InputSource::Keyboard,
            }),
            KeyCode::Char('z') => Some(SynthCommand::SetMasterVolume(controls.master_volume - MASTER_STEP)),
            KeyCode::Char('x') => Some(SynthCommand::SetMasterVolume(controls.master_volume + MASTER_STEP)),
            KeyCode::Char('c') => Some(SynthCommand::SetCutoff(controls.cutoff / CUTOFF_STEP)),
            KeyCode::Char('v') => Some(SynthCommand::SetCutoff(controls.cutoff * CUTOFF_STEP)),
            KeyCode::Char('b') => Some(SynthCommand::SetResonance(controls.resonance - RESONANCE_STEP_DB)),
            KeyCode::Char('n') => Some(SynthCommand::SetResonance(controls.resonance + RESONANCE_STEP_DB)),
            KeyCode::Char('o') => Some(SynthCommand::SetWaveform(controls.waveform.next())),
            KeyCode::Tab => {
                let count = self.engine.sources().len().max(1);
                self.selected = (self.selected + 1) % count;
                None
            }
            KeyCode::Char('[') => source.map(|s| SynthCommand::SetSourceRate {
                source: self.selected,
                rate: s.rate() - RATE_STEP_HZ,
            }),
            KeyCode::Char(']') => source.map(|s| SynthCommand::SetSourceRate {
                source: self.selected,
                rate: s.rate() + RATE_STEP_HZ,
            }),
            KeyCode::Char('-') => source.map(|s| SynthCommand::SetSourceDepth {
                source: self.selected,
                depth: s.depth() - DEPTH_STEP,
            }),
            KeyCode::Char('=') => source.map(|s| SynthCommand::SetSourceDepth {
                source: self.selected,
                depth: s.depth() + DEPTH_STEP,
            }),
            KeyCode::Char('m') => source.map(|s| SynthCommand::SetSourceTarget {
                source: self.selected,
                target: s.target().next(),
            }),
            KeyCode::Char('l') => source.map(|s| SynthCommand::SetSourceWaveform {
                source: self.selected,
                waveform: s.waveform().next(),
            }),
            KeyCode::Char('p') => Some(SynthCommand::ToggleSourcePause {
                source: self.selected,
            }),
            KeyCode::Char('i') => {
                self.midi.connect(&mut self.engine);
                None
            }
            KeyCode::F(2) => {
                self.message = match self.export_settings() {
                    Ok(()) => format!("Settings saved to {}", self.settings_path.display()),
                    Err(err) => format!("{err:#}"),
                };
                None
            }
            KeyCode::F(3) => {
                self.message = match self.import_settings() {
                    Ok(()) => format!("Settings loaded from {}", self.settings_path.display()),
                    Err(err) => format!("{err:#}"),
                };
                None
            }
            _ => None,
        };

        if let Some(command) = command {
            self.engine.dispatch(command);
        }
    }

    fn handle_mouse(&mut self, mouse: MouseEvent) {
        match mouse.kind {
            MouseEventKind::Down(MouseButton::Left) | MouseEventKind::Drag(MouseButton::Left) => {
                let Some(name) = self.keyboard.note_at(mouse.column, mouse.row) else {
                    return;
                };
                if self.pointer_note.as_deref() == Some(name.as_str()) {
                    return;
                }
                self.pointer_note = Some(name.clone());
                self.engine.dispatch(SynthCommand::PressNote {
                    name,
                    source: InputSource::Pointer,
                });
            }
            MouseEventKind::Up(MouseButton::Left) => {
                self.pointer_note = None;
                self.engine.dispatch(SynthCommand::PointerReleased);
            }
            _ => {}
        }
    }

    fn export_settings(&self) -> EyreResult<()> {
        let json = self
            .engine
            .gather_snapshot()
            .to_json_pretty()
            .wrap_err("failed to encode settings")?;
        fs::write(&self.settings_path, json)
            .wrap_err_with(|| format!("failed to write {}", self.settings_path.display()))?;
        Ok(())
    }

    /// A file that is not JSON at all resets everything to defaults.
    fn import_settings(&mut self) -> EyreResult<()> {
        let text = fs::read_to_string(&self.settings_path)
            .wrap_err_with(|| format!("failed to read {}", self.settings_path.display()))?;
        let snapshot = SettingsSnapshot::from_json(&text).unwrap_or_else(|err| {
            log::warn!("{err}; using defaults");
            SettingsSnapshot::with_sources(self.engine.sources().len())
        });
        self.engine.apply_snapshot(&snapshot);
        Ok(())
    }

    fn render(&mut self, frame: &mut Frame) {
        let area = frame.area();
        let samples = self.scope.samples();

        let rows = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3), // Status bar
                Constraint::Length(6), // Voice + sources
                Constraint::Min(8),    // Scope
                Constraint::Length(4), // Keys
                Constraint::Length(1), // Help / messages
            ])
            .split(area);

        let status = Status {
            note: self.engine.current_note().map(ToString::to_string),
            voice: self.engine.current_voice().map(|id| self.engine.voice_state(id)),
            midi: &self.midi_status,
            sample_rate: self.engine.sample_rate(),
            stats: AudioStats::from_samples(&samples),
            backlog: self.engine.deferred_commands(),
        };
        render_status(frame, rows[0], &status);

        let controls_row = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Length(22), Constraint::Min(20)])
            .split(rows[1]);
        render_controls(frame, controls_row[0], self.engine.controls());
        render_sources(frame, controls_row[1], self.engine.sources(), self.selected);

        render_waveform(frame, rows[2], &self.view);

        self.keyboard = render_keyboard(frame, rows[3], self.active_midi);

        let help = if self.message.is_empty() {
            " [a-k] Play  [Space] Release  [z/x] Vol  [c/v] Cutoff  [b/n] Q  [o] Wave  \
             [Tab] LFO  [[/]] Rate  [-/=] Depth  [m] Target  [l] Shape  [p] Pause  \
             [F2/F3] Save/Load  [q] Quit"
                .to_string()
        } else {
            format!(" {}", self.message)
        };
        frame.render_widget(
            Paragraph::new(help).style(Style::default().fg(Color::DarkGray)),
            rows[4],
        );
    }
}
