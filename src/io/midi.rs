/*
MIDI Decoding
=============

A channel voice message is one status byte followed by one or two data
bytes:

    status      1sss cccc     s = command nibble, c = channel (0-15)
    data        0ddd dddd     7-bit values

    command  8  note-off        key, velocity
             9  note-on         key, velocity (velocity 0 means note-off)
            11  control change  controller, value

Everything else is recognised but not acted on.


Byte Streams
------------

Raw transports (a serial port, a Linux rawmidi device) deliver a byte stream,
not framed messages. `MidiStreamParser` frames it:

  running status   a sender may omit a repeated status byte; data bytes
                   then reuse the last channel status
  realtime         0xF8-0xFF may appear anywhere, even mid-message; they
                   are skipped without disturbing the message in progress
  SysEx            0xF0 ... 0xF7 is skipped entirely
  system common    0xF1-0xF6 cancel running status
*/

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MidiEvent {
    NoteOn { channel: u8, key: u8, velocity: u8 },
    NoteOff { channel: u8, key: u8, velocity: u8 },
    ControlChange { channel: u8, controller: u8, value: u8 },
}

impl MidiEvent {
    /// Decode a 1-3 byte message. Missing data bytes read as 0.
    pub fn decode(bytes: &[u8]) -> Option<MidiEvent> {
        let status = *bytes.first()?;
        let command = status >> 4;
        let channel = status & 0x0F;
        let data1 = bytes.get(1).copied().unwrap_or(0);
        let data2 = bytes.get(2).copied().unwrap_or(0);

        match command {
            0x9 if data2 > 0 => Some(MidiEvent::NoteOn {
                channel,
                key: data1,
                velocity: data2,
            }),
            // Note-on with velocity 0 is a note-off
            0x9 | 0x8 => Some(MidiEvent::NoteOff {
                channel,
                key: data1,
                velocity: data2,
            }),
            0xB => Some(MidiEvent::ControlChange {
                channel,
                controller: data1,
                value: data2,
            }),
            _ => None,
        }
    }
}

/// One complete message framed from a byte stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MidiMessage {
    bytes: [u8; 3],
    len: u8,
}

impl MidiMessage {
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes[..usize::from(self.len)]
    }
}

#[derive(Debug, Default)]
pub struct MidiStreamParser {
    running_status: Option<u8>,
    data: [u8; 2],
    len: usize,
    in_sysex: bool,
}

impl MidiStreamParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one byte. Returns a message when this byte completes one.
    pub fn push(&mut self, byte: u8) -> Option<MidiMessage> {
        match byte {
            0xF8..=0xFF => None,
            0xF0 => {
                self.in_sysex = true;
                self.running_status = None;
                None
            }
            0xF7 => {
                self.in_sysex = false;
                None
            }
            0xF1..=0xF6 => {
                self.in_sysex = false;
                self.running_status = None;
                self.len = 0;
                None
            }
            0x80..=0xEF => {
                self.in_sysex = false;
                self.running_status = Some(byte);
                self.len = 0;
                None
            }
            _ => self.push_data(byte),
        }
    }

    /// Feed a buffer, calling `on_message` for every completed message.
    pub fn feed(&mut self, bytes: &[u8], mut on_message: impl FnMut(MidiMessage)) {
        for &byte in bytes {
            if let Some(message) = self.push(byte) {
                on_message(message);
            }
        }
    }

    fn push_data(&mut self, byte: u8) -> Option<MidiMessage> {
        if self.in_sysex {
            return None;
        }
        let status = self.running_status?;

        self.data[self.len] = byte;
        self.len += 1;
        if self.len < data_len(status) {
            return None;
        }

        let len = self.len;
        self.len = 0;
        Some(MidiMessage {
            bytes: [status, self.data[0], if len > 1 { self.data[1] } else { 0 }],
            len: 1 + len as u8,
        })
    }
}

/// Data bytes that follow a channel status byte.
fn data_len(status: u8) -> usize {
    match status >> 4 {
        0xC | 0xD => 1,
        _ => 2,
    }
}
