//! Status bar, control readouts and modulation source panels

use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};

use monosynth::synth::{Controls, ModTarget, ModulationSource, VoiceState};

/// Peak and RMS of the scope window.
pub struct AudioStats {
    pub peak: f32,
    pub rms: f32,
}

impl AudioStats {
    pub fn from_samples(samples: &[f32]) -> Self {
        if samples.is_empty() {
            return Self { peak: 0.0, rms: 0.0 };
        }
        let peak = samples.iter().fold(0.0f32, |acc, &x| acc.max(x.abs()));
        let rms = (samples.iter().map(|&x| x * x).sum::<f32>() / samples.len() as f32).sqrt();
        Self { peak, rms }
    }
}

/// Everything the status bar shows.
pub struct Status<'a> {
    pub note: Option<String>,
    pub voice: Option<VoiceState>,
    pub midi: &'a str,
    pub sample_rate: f32,
    pub stats: AudioStats,
    pub backlog: usize,
}

pub fn render_status(frame: &mut Frame, area: Rect, status: &Status) {
    let block = Block::default().title(" monosynth ").borders(Borders::ALL);

    let (note, note_color) = match (&status.note, status.voice) {
        (Some(note), Some(state)) => (format!("♪ {note} {state:?}  "), Color::Green),
        _ => ("♪ -  ".to_string(), Color::DarkGray),
    };

    let mut spans = vec![
        Span::styled(note, Style::default().fg(note_color)),
        Span::styled(format!("{}  ", status.midi), Style::default().fg(Color::Cyan)),
        Span::styled(
            format!("{:.1}kHz  ", status.sample_rate / 1000.0),
            Style::default().fg(Color::DarkGray),
        ),
        Span::styled(
            format!("Peak: {:.2}  RMS: {:.2}", status.stats.peak, status.stats.rms),
            Style::default().fg(Color::Magenta),
        ),
    ];
    if status.backlog > 0 {
        spans.push(Span::styled(
            format!("  backlog: {}", status.backlog),
            Style::default().fg(Color::Yellow),
        ));
    }

    frame.render_widget(Paragraph::new(Line::from(spans)).block(block), area);
}

pub fn render_controls(frame: &mut Frame, area: Rect, controls: &Controls) {
    let block = Block::default().title(" Voice ").borders(Borders::ALL);
    let label = Style::default().fg(Color::DarkGray);

    let lines = vec![
        Line::from(vec![
            Span::styled("Wave   ", label),
            Span::raw(controls.waveform.to_string()),
        ]),
        Line::from(vec![
            Span::styled("Master ", label),
            Span::raw(format!("{:.2}", controls.master_volume)),
        ]),
        Line::from(vec![
            Span::styled("Cutoff ", label),
            Span::raw(format!("{:.0} Hz", controls.cutoff)),
        ]),
        Line::from(vec![
            Span::styled("Q      ", label),
            Span::raw(format!("{:.1} dB", controls.resonance)),
        ]),
    ];

    frame.render_widget(Paragraph::new(lines).block(block), area);
}

pub fn render_sources(frame: &mut Frame, area: Rect, sources: &[ModulationSource], selected: usize) {
    if sources.is_empty() {
        return;
    }
    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints(vec![Constraint::Ratio(1, sources.len() as u32); sources.len()])
        .split(area);

    for (source, column) in sources.iter().zip(columns.iter()) {
        let mut block = Block::default()
            .title(format!(" LFO {} ", source.index() + 1))
            .borders(Borders::ALL);
        if source.index() == selected {
            block = block.border_style(Style::default().fg(Color::Yellow));
        }

        let routed = match source.attachment() {
            Some(route) => format!("→ voice {}", route.voice),
            None => "idle".to_string(),
        };
        let target_color = match source.target() {
            ModTarget::None => Color::DarkGray,
            _ => Color::White,
        };
        let paused = if source.is_paused() {
            Span::styled(" paused", Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD))
        } else {
            Span::raw("")
        };

        let lines = vec![
            Line::from(vec![
                Span::styled(source.target().to_string(), Style::default().fg(target_color)),
                paused,
            ]),
            Line::from(format!("{} {:.1} Hz", source.waveform(), source.rate())),
            Line::from(format!("depth {:.2}", source.depth())),
            Line::from(Span::styled(routed, Style::default().fg(Color::DarkGray))),
        ];
        frame.render_widget(Paragraph::new(lines).block(block), *column);
    }
}
