use std::{fmt, str::FromStr};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::{
    config::DEFAULT_SOURCE_RATE_HZ,
    dsp::{lfo::clamp_rate, oscillator::Waveform, ramp::CONTROL_RAMP},
    graph::command::{
        CommandSender, Destination, GraphCommand, SharedParam, SourceIndex, SourceParam, VoiceId,
        VoiceParam,
    },
};

/*
Modulation Source
=================

The control-plane half of an LFO. The audio half (`graph::lfo::ModGenerator`)
runs for the whole process; this side decides what its scaled output is and
where it is routed.

    state      {Unpaused, Paused} × {Detached, Attached(voice, target)}

    effective output = 0                     if paused, target none, or depth 0
                     = raw depth × scale     otherwise

Target scale (raw depth 0..1 → physical units):

    pitch       × 1200   cents   (±1 octave)
    filter      × 5000   Hz
    amplitude   × 1      gain offset on the shared tremolo stage

Neutral policy on detach:

    pitch       detune ramps back to 0
    filter      cutoff is left alone (the user's manual value stays)
    amplitude   shared tremolo stage ramps back to 1
*/

/// Parameter category a source can modulate.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ModTarget {
    #[default]
    None,
    Pitch,
    Filter,
    Amplitude,
}

impl ModTarget {
    pub const ALL: [ModTarget; 4] = [
        ModTarget::None,
        ModTarget::Pitch,
        ModTarget::Filter,
        ModTarget::Amplitude,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            ModTarget::None => "none",
            ModTarget::Pitch => "pitch",
            ModTarget::Filter => "filter",
            ModTarget::Amplitude => "amplitude",
        }
    }

    pub fn next(&self) -> ModTarget {
        let idx = Self::ALL.iter().position(|t| t == self).unwrap_or(0);
        Self::ALL[(idx + 1) % Self::ALL.len()]
    }

    /// Physical units per unit of raw depth.
    pub fn scale(&self) -> f32 {
        match self {
            ModTarget::None => 0.0,
            ModTarget::Pitch => 1200.0,
            ModTarget::Filter => 5000.0,
            ModTarget::Amplitude => 1.0,
        }
    }

    /// The parameter this target lands on for `voice`.
    pub fn destination(&self, voice: VoiceId) -> Option<Destination> {
        match self {
            ModTarget::None => None,
            ModTarget::Pitch => Some(Destination::Pitch(voice)),
            ModTarget::Filter => Some(Destination::FilterCutoff(voice)),
            ModTarget::Amplitude => Some(Destination::Tremolo),
        }
    }

    /// Ramp that restores the destination's neutral value, if the target has one.
    pub fn neutral_reset(&self, voice: VoiceId) -> Option<GraphCommand> {
        match self {
            ModTarget::Pitch => Some(GraphCommand::RampVoice {
                id: voice,
                param: VoiceParam::Detune,
                target: 0.0,
                duration: CONTROL_RAMP,
            }),
            ModTarget::Amplitude => Some(GraphCommand::RampShared {
                param: SharedParam::Tremolo,
                target: 1.0,
                duration: CONTROL_RAMP,
            }),
            ModTarget::Filter | ModTarget::None => None,
        }
    }
}

impl fmt::Display for ModTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownTarget(pub String);

impl fmt::Display for UnknownTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown modulation target '{}'", self.0)
    }
}

impl std::error::Error for UnknownTarget {}

impl FromStr for ModTarget {
    type Err = UnknownTarget;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "none" => Ok(ModTarget::None),
            "pitch" => Ok(ModTarget::Pitch),
            "filter" => Ok(ModTarget::Filter),
            "amplitude" => Ok(ModTarget::Amplitude),
            other => Err(UnknownTarget(other.to_string())),
        }
    }
}

/// Where a source is currently routed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Route {
    pub voice: VoiceId,
    pub target: ModTarget,
}

pub struct ModulationSource {
    index: SourceIndex,
    rate: f32,
    waveform: Waveform,
    depth: f32,
    target: ModTarget,
    paused: bool,
    attachment: Option<Route>,
}

impl ModulationSource {
    pub fn new(index: SourceIndex) -> Self {
        Self {
            index,
            rate: DEFAULT_SOURCE_RATE_HZ,
            waveform: Waveform::Sine,
            depth: 0.0,
            target: ModTarget::None,
            paused: false,
            attachment: None,
        }
    }

    pub fn index(&self) -> SourceIndex {
        self.index
    }

    pub fn rate(&self) -> f32 {
        self.rate
    }

    pub fn waveform(&self) -> Waveform {
        self.waveform
    }

    /// Raw, UI-facing depth (0..1).
    pub fn depth(&self) -> f32 {
        self.depth
    }

    pub fn target(&self) -> ModTarget {
        self.target
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn attachment(&self) -> Option<Route> {
        self.attachment
    }

    /// Scaled output magnitude in the target's units.
    pub fn effective_output(&self) -> f32 {
        if self.paused {
            return 0.0;
        }
        self.depth * self.target.scale()
    }

    /// True when attaching would create a route with no effect.
    pub fn is_inert(&self) -> bool {
        self.target == ModTarget::None || self.depth == 0.0
    }

    pub fn set_rate(&mut self, rate_hz: f32, tx: &mut CommandSender) {
        self.rate = clamp_rate(rate_hz);
        tx.send(GraphCommand::RampSource {
            source: self.index,
            param: SourceParam::Rate,
            target: self.rate,
            duration: CONTROL_RAMP,
        });
    }

    /// Shape changes are instant; they are not scalar and are not ramped.
    pub fn set_waveform(&mut self, waveform: Waveform, tx: &mut CommandSender) {
        self.waveform = waveform;
        tx.send(GraphCommand::SetSourceWaveform {
            source: self.index,
            waveform,
        });
    }

    /// Store a new raw depth and ramp the scaled output to match.
    ///
    /// Routing is not touched; the router decides whether a depth change
    /// attaches or detaches.
    pub fn set_depth(&mut self, depth: f32, tx: &mut CommandSender) {
        self.depth = if depth.is_nan() { 0.0 } else { depth.clamp(0.0, 1.0) };
        self.sync_output(tx);
    }

    /// Store a new target and rescale the output. Routing is left to the router.
    pub fn set_target(&mut self, target: ModTarget, tx: &mut CommandSender) {
        self.target = target;
        self.sync_output(tx);
    }

    pub fn toggle_pause(&mut self, tx: &mut CommandSender) {
        self.set_paused(!self.paused, tx);
    }

    pub fn set_paused(&mut self, paused: bool, tx: &mut CommandSender) {
        if self.paused == paused {
            return;
        }
        self.paused = paused;
        log::debug!(
            "source {} {}",
            self.index,
            if paused { "paused" } else { "resumed" }
        );
        self.sync_output(tx);
    }

    /// Route this source to `voice` according to its target.
    ///
    /// Inert requests (target none or depth 0) are a logged no-op. An
    /// existing route is detached first. Returns whether a route now exists.
    pub fn attach(&mut self, voice: VoiceId, tx: &mut CommandSender) -> bool {
        let Some(destination) = self.target.destination(voice) else {
            log::debug!("source {}: no target, attach ignored", self.index);
            return false;
        };
        if self.depth == 0.0 {
            log::debug!("source {}: zero depth, attach ignored", self.index);
            return false;
        }

        self.detach(tx);
        tx.send(GraphCommand::Connect {
            source: self.index,
            destination,
        });
        self.attachment = Some(Route {
            voice,
            target: self.target,
        });
        self.sync_output(tx);
        log::debug!("source {} → {} of voice {voice}", self.index, self.target);
        true
    }

    /// Remove the route and restore the destination's neutral value.
    /// Without a route this does nothing.
    pub fn detach(&mut self, tx: &mut CommandSender) {
        let Some(route) = self.attachment.take() else {
            return;
        };
        tx.send(GraphCommand::Disconnect {
            source: self.index,
            fade: CONTROL_RAMP,
        });
        if let Some(reset) = route.target.neutral_reset(route.voice) {
            tx.send(reset);
        }
        log::debug!(
            "source {} detached from {} of voice {}",
            self.index,
            route.target,
            route.voice
        );
    }

    fn sync_output(&self, tx: &mut CommandSender) {
        tx.send(GraphCommand::RampSource {
            source: self.index,
            param: SourceParam::Depth,
            target: self.effective_output(),
            duration: CONTROL_RAMP,
        });
    }
}
