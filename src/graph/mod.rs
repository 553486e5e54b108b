//! Audio-thread side: voice chains, modulation generators and the renderer
//! that mixes them. Driven by `GraphCommand`s from the control plane.

pub mod clock;
pub mod command;
pub mod lfo;
pub mod renderer;
pub mod scope;
pub mod voice;

pub use clock::AudioClock;
pub use command::{
    command_channel, CommandSender, Destination, GraphCommand, SharedParam, SourceParam, VoiceId,
    VoiceParam,
};
pub use renderer::Renderer;
pub use scope::{scope_channel, ScopeTap};
