//! On-screen keyboard: C3 to C5, clickable

use ratatui::{
    layout::Rect,
    style::{Color, Style},
    widgets::{Block, Borders, Paragraph},
    Frame,
};

use monosynth::synth::notes::{keyboard_name, KEYBOARD_HIGH, KEYBOARD_LOW};

const KEYS: u16 = (KEYBOARD_HIGH - KEYBOARD_LOW + 1) as u16;

/// Where the keys were last drawn, for mouse hit-testing.
#[derive(Debug, Default, Clone, Copy)]
pub struct KeyboardLayout {
    inner: Rect,
}

impl KeyboardLayout {
    fn key_width(&self) -> u16 {
        (self.inner.width / KEYS).max(1)
    }

    /// Name of the key under a terminal cell.
    pub fn note_at(&self, column: u16, row: u16) -> Option<String> {
        let inner = self.inner;
        if row < inner.y || row >= inner.y + inner.height || column < inner.x {
            return None;
        }
        let index = (column - inner.x) / self.key_width();
        let midi = KEYBOARD_LOW.checked_add(u8::try_from(index).ok()?)?;
        if midi > KEYBOARD_HIGH {
            return None;
        }
        keyboard_name(midi)
    }
}

fn is_black(midi: u8) -> bool {
    matches!(midi % 12, 1 | 3 | 6 | 8 | 10)
}

pub fn render_keyboard(frame: &mut Frame, area: Rect, active: Option<u8>) -> KeyboardLayout {
    let block = Block::default().title(" Keys ").borders(Borders::ALL);
    let layout = KeyboardLayout {
        inner: block.inner(area),
    };
    frame.render_widget(block, area);

    let width = layout.key_width();
    for (i, midi) in (KEYBOARD_LOW..=KEYBOARD_HIGH).enumerate() {
        let x = layout.inner.x + i as u16 * width;
        if x + width > layout.inner.x + layout.inner.width {
            break;
        }
        let style = if active == Some(midi) {
            Style::default().bg(Color::Yellow).fg(Color::Black)
        } else if is_black(midi) {
            Style::default().bg(Color::DarkGray).fg(Color::White)
        } else {
            Style::default().bg(Color::White).fg(Color::Black)
        };
        let label = keyboard_name(midi).unwrap_or_default();
        let key = Rect::new(x, layout.inner.y, width.saturating_sub(1).max(1), layout.inner.height);
        frame.render_widget(Paragraph::new(label).style(style), key);
    }

    layout
}
