//! monosynth - terminal front end for the monophonic engine
//!
//! Run with: cargo run -- [settings.json]

mod app;
mod midi_device;
mod ui;

use app::Monosynth;

fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;

    let settings_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "monosynth-settings.json".to_string());

    Monosynth::new().settings_path(settings_path).run()
}
