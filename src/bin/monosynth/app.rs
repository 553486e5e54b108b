//! Audio device setup and the run loop

use std::path::PathBuf;

use color_eyre::eyre::{Result as EyreResult, WrapErr};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};

use monosynth::{graph::Renderer, EngineConfig, EngineError, SynthEngine, MAX_BLOCK_SIZE};

use super::{midi_device::MidiInput, ui::UiApp};

pub struct Monosynth {
    config: EngineConfig,
    settings_path: PathBuf,
}

impl Monosynth {
    pub fn new() -> Self {
        Self {
            config: EngineConfig::default(),
            settings_path: PathBuf::from("monosynth-settings.json"),
        }
    }

    /// File used by the settings export and import keys.
    pub fn settings_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.settings_path = path.into();
        self
    }

    /// Open the output device, start rendering and hand the terminal to the UI.
    pub fn run(self) -> EyreResult<()> {
        let host = cpal::default_host();
        let device = host
            .default_output_device()
            .ok_or_else(|| EngineError::AudioUnavailable("no default output device".into()))?;
        let stream_config = device
            .default_output_config()
            .map_err(|err| EngineError::AudioUnavailable(err.to_string()))
            .wrap_err("failed to fetch default output config")?;

        let sample_rate = stream_config.sample_rate().0 as f32;
        let channels = stream_config.channels() as usize;
        let config = EngineConfig {
            sample_rate,
            ..self.config
        };

        let (engine, renderer, scope) = SynthEngine::new(&config);
        let stream = build_stream(&device, &stream_config.into(), channels, renderer)?;
        stream.play().wrap_err("failed to start output stream")?;

        let midi = MidiInput::new();

        let mut terminal = ratatui::init();
        let result = UiApp::new(engine, scope, midi, self.settings_path).run(&mut terminal);
        ratatui::restore();

        drop(stream);
        result
    }
}

impl Default for Monosynth {
    fn default() -> Self {
        Self::new()
    }
}

/// The renderer moves into the callback; nothing else is shared with the
/// audio thread except the rings and the clock it already owns.
fn build_stream(
    device: &cpal::Device,
    config: &cpal::StreamConfig,
    channels: usize,
    mut renderer: Renderer,
) -> EyreResult<cpal::Stream> {
    let mut render_buf = vec![0.0f32; MAX_BLOCK_SIZE];

    let stream = device.build_output_stream(
        config,
        move |data: &mut [f32], _| {
            let total_frames = data.len() / channels;
            let mut frames_written = 0;

            while frames_written < total_frames {
                let frames_to_render = (total_frames - frames_written).min(MAX_BLOCK_SIZE);
                let block = &mut render_buf[..frames_to_render];
                renderer.render_block(block);

                // Mono to all channels
                let out_off = frames_written * channels;
                for (i, &s) in block.iter().enumerate() {
                    for ch in 0..channels {
                        data[out_off + i * channels + ch] = s;
                    }
                }

                frames_written += frames_to_render;
            }
        },
        |err| log::error!("audio stream error: {err}"),
        None,
    )?;

    Ok(stream)
}
