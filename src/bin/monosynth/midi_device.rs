//! Raw MIDI input from ALSA character devices (`/dev/snd/midiC*D*`).
//!
//! One reader thread per bound device parses the byte stream and hands
//! complete messages to the UI thread over a ring. The engine's delivery
//! token gates both ends, so a device that was unbound stops feeding the
//! engine even while its thread is still blocked in `read`.

use std::{
    fs::{self, File},
    io::{self, Read},
    thread,
    time::{Duration, Instant},
};

use rtrb::{Consumer, RingBuffer};

use monosynth::{
    io::{DeliveryToken, MidiMessage, MidiPort, MidiStreamParser, PortState},
    SynthEngine,
};

const DEVICE_DIR: &str = "/dev/snd";
const MESSAGE_CAPACITY: usize = 512;
const RESCAN_INTERVAL: Duration = Duration::from_secs(1);

struct Reader {
    port_id: String,
    token: DeliveryToken,
    rx: Consumer<MidiMessage>,
}

pub struct MidiInput {
    known: Vec<MidiPort>,
    reader: Option<Reader>,
    last_scan: Instant,
}

impl MidiInput {
    pub fn new() -> Self {
        Self {
            known: Vec::new(),
            reader: None,
            last_scan: Instant::now(),
        }
    }

    /// Bind the first input the system offers and start reading from it.
    pub fn connect(&mut self, engine: &mut SynthEngine) {
        self.known = scan_ports();
        self.last_scan = Instant::now();

        let Some(token) = engine.enable_midi(&self.known) else {
            return;
        };
        let Some(port) = engine.midi_device().cloned() else {
            return;
        };
        if self.reader.as_ref().is_some_and(|r| r.port_id == port.id) {
            return;
        }
        match spawn_reader(&port, token) {
            Ok(reader) => self.reader = Some(reader),
            Err(err) => {
                log::warn!("failed to open MIDI input {}: {err}", port.id);
                engine.midi_port_changed(&port, PortState::Disconnected);
            }
        }
    }

    /// Deliver pending messages to the engine and watch for hot-plugging.
    pub fn poll(&mut self, engine: &mut SynthEngine) {
        if let Some(reader) = &mut self.reader {
            while let Ok(message) = reader.rx.pop() {
                if !reader.token.is_live() {
                    break;
                }
                engine.handle_midi(message.as_bytes());
            }
        }

        if self.last_scan.elapsed() >= RESCAN_INTERVAL {
            self.rescan(engine);
        }
    }

    fn rescan(&mut self, engine: &mut SynthEngine) {
        self.last_scan = Instant::now();
        let current = scan_ports();

        for port in self.known.iter().filter(|p| !current.contains(p)) {
            engine.midi_port_changed(port, PortState::Disconnected);
            if self.reader.as_ref().is_some_and(|r| r.port_id == port.id) {
                self.reader = None;
            }
        }
        for port in current.iter().filter(|p| !self.known.contains(p)) {
            engine.midi_port_changed(port, PortState::Connected);
        }

        self.known = current;
    }
}

impl Default for MidiInput {
    fn default() -> Self {
        Self::new()
    }
}

fn spawn_reader(port: &MidiPort, token: DeliveryToken) -> monosynth::Result<Reader> {
    let mut file = File::open(&port.id)?;
    let (mut tx, rx) = RingBuffer::<MidiMessage>::new(MESSAGE_CAPACITY);
    let thread_token = token.clone();
    let name = port.name.clone();

    thread::Builder::new()
        .name("midi-in".into())
        .spawn(move || {
            let mut parser = MidiStreamParser::new();
            let mut buf = [0u8; 64];
            while thread_token.is_live() {
                match file.read(&mut buf) {
                    Ok(0) => break,
                    Ok(n) => parser.feed(&buf[..n], |message| {
                        if thread_token.is_live() {
                            let _ = tx.push(message);
                        }
                    }),
                    Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
                    Err(err) => {
                        log::warn!("MIDI input {name} closed: {err}");
                        break;
                    }
                }
            }
        })?;

    Ok(Reader {
        port_id: port.id.clone(),
        token,
        rx,
    })
}

/// Raw MIDI devices, sorted by path. Empty when the platform has none.
fn scan_ports() -> Vec<MidiPort> {
    let Ok(entries) = fs::read_dir(DEVICE_DIR) else {
        return Vec::new();
    };

    let mut ports: Vec<MidiPort> = entries
        .filter_map(|entry| entry.ok())
        .filter_map(|entry| {
            let file_name = entry.file_name().into_string().ok()?;
            let (card, _device) = file_name.strip_prefix("midiC")?.split_once('D')?;
            let name = card_name(card).unwrap_or_else(|| file_name.clone());
            Some(MidiPort::new(entry.path().display().to_string(), name))
        })
        .collect();
    ports.sort_by(|a, b| a.id.cmp(&b.id));
    ports
}

fn card_name(card: &str) -> Option<String> {
    fs::read_to_string(format!("/proc/asound/card{card}/id"))
        .ok()
        .map(|id| id.trim().to_string())
        .filter(|id| !id.is_empty())
}
