//! Oscilloscope over the tap's 8-bit view: 128 is the centre line.

use ratatui::{
    layout::Rect,
    style::Color,
    symbols::Marker,
    widgets::{
        canvas::{Canvas, Line},
        Block, Borders,
    },
    Frame,
};

/// Bytes requested from the tap per frame.
const VIEW_LEN: usize = 512;

const SILENCE: u8 = 128;

pub fn render_waveform(frame: &mut Frame, area: Rect, view: &[u8]) {
    let width = view.len().max(1) as f64;

    let canvas = Canvas::default()
        .block(Block::default().title(" Scope ").borders(Borders::ALL))
        .marker(Marker::Braille)
        .x_bounds([0.0, width])
        .y_bounds([0.0, 255.0])
        .paint(|ctx| {
            ctx.draw(&Line {
                x1: 0.0,
                y1: f64::from(SILENCE),
                x2: width,
                y2: f64::from(SILENCE),
                color: Color::DarkGray,
            });
            for (i, pair) in view.windows(2).enumerate() {
                ctx.draw(&Line {
                    x1: i as f64,
                    y1: f64::from(pair[0]),
                    x2: (i + 1) as f64,
                    y2: f64::from(pair[1]),
                    color: Color::Cyan,
                });
            }
        });

    frame.render_widget(canvas, area);
}

/// Flat when the tap has nothing yet.
pub fn silent_view() -> Vec<u8> {
    vec![SILENCE; VIEW_LEN]
}
