//! Note names, the on-screen keyboard range and the computer-keyboard map.

use crate::io::converter::midi_note_to_freq;

/// Lowest key on the on-screen keyboard (C3).
pub const KEYBOARD_LOW: u8 = 48;
/// Highest key on the on-screen keyboard (C5).
pub const KEYBOARD_HIGH: u8 = 72;

const NAMES: [&str; 12] = [
    "C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B",
];

/// Computer keys laid out like one octave of a piano, starting at C4.
pub const KEY_MAP: [(char, &str); 13] = [
    ('a', "C4"),
    ('w', "C#4"),
    ('s', "D4"),
    ('e', "D#4"),
    ('d', "E4"),
    ('f', "F4"),
    ('t', "F#4"),
    ('g', "G4"),
    ('y', "G#4"),
    ('h', "A4"),
    ('u', "A#4"),
    ('j', "B4"),
    ('k', "C5"),
];

/// Note name for a computer key, case-insensitive.
pub fn note_for_key(key: char) -> Option<&'static str> {
    let key = key.to_ascii_lowercase();
    KEY_MAP
        .iter()
        .find(|(k, _)| *k == key)
        .map(|(_, name)| *name)
}

/// Parse a note name such as `"C4"`, `"F#3"` or `"Bb4"` into a MIDI number.
pub fn parse_note_name(name: &str) -> Option<u8> {
    let name = name.trim();
    let mut chars = name.chars();
    let letter = chars.next()?.to_ascii_uppercase();
    let base: i32 = match letter {
        'C' => 0,
        'D' => 2,
        'E' => 4,
        'F' => 5,
        'G' => 7,
        'A' => 9,
        'B' => 11,
        _ => return None,
    };

    let rest = chars.as_str();
    let (offset, octave) = if let Some(octave) = rest.strip_prefix('#') {
        (1, octave)
    } else if let Some(octave) = rest.strip_prefix('b') {
        (-1, octave)
    } else {
        (0, rest)
    };

    let octave: i32 = octave.parse().ok()?;
    let midi = (octave + 1) * 12 + base + offset;
    u8::try_from(midi).ok().filter(|&n| n <= 127)
}

/// Canonical (sharp) name of a MIDI note, e.g. 61 → `"C#4"`.
pub fn note_name(midi: u8) -> String {
    let octave = i32::from(midi / 12) - 1;
    format!("{}{}", NAMES[usize::from(midi % 12)], octave)
}

/// Name of the on-screen key for a MIDI note, if the keyboard has one.
pub fn keyboard_name(midi: u8) -> Option<String> {
    (KEYBOARD_LOW..=KEYBOARD_HIGH)
        .contains(&midi)
        .then(|| note_name(midi))
}

/// Frequency of a playable note name. Names outside the on-screen keyboard
/// are not playable by name.
pub fn frequency_of(name: &str) -> Option<f32> {
    parse_note_name(name)
        .filter(|n| (KEYBOARD_LOW..=KEYBOARD_HIGH).contains(n))
        .map(midi_note_to_freq)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_note_names() {
        assert_eq!(parse_note_name("C4"), Some(60));
        assert_eq!(parse_note_name("C#4"), Some(61));
        assert_eq!(parse_note_name("Db4"), Some(61));
        assert_eq!(parse_note_name("A4"), Some(69));
        assert_eq!(parse_note_name("C-1"), Some(0));
        assert_eq!(parse_note_name("H4"), None);
        assert_eq!(parse_note_name("C"), None);
        assert_eq!(parse_note_name(""), None);
    }

    #[test]
    fn test_name_round_trip() {
        for midi in 0..=127u8 {
            assert_eq!(parse_note_name(&note_name(midi)), Some(midi));
        }
    }

    #[test]
    fn test_keyboard_range() {
        assert_eq!(keyboard_name(60).as_deref(), Some("C4"));
        assert_eq!(keyboard_name(47), None);
        assert_eq!(keyboard_name(73), None);
        assert!(frequency_of("C3").is_some());
        assert!(frequency_of("C6").is_none());
        assert!((frequency_of("A4").unwrap_or(0.0) - 440.0).abs() < 1e-3);
    }

    #[test]
    fn test_key_map() {
        assert_eq!(note_for_key('a'), Some("C4"));
        assert_eq!(note_for_key('K'), Some("C5"));
        assert_eq!(note_for_key('z'), None);
        for (_, name) in KEY_MAP {
            assert!(frequency_of(name).is_some(), "{name} should be playable");
        }
    }
}
