use crate::{
    dsp::{oscillator::Waveform, ramp::CONTROL_RAMP},
    graph::command::{CommandSender, GraphCommand, SharedParam, SourceIndex, VoiceId},
    synth::modulation::{ModTarget, ModulationSource, Route},
};

/*
Modulation Router
=================

Owns every modulation source and, through them, the routing table:

    source 0 → Some(Route { voice: 12, target: Filter })
    source 1 → None

One row per source, so "at most one route per source" holds by
construction. Every change is a transaction: the old route is detached
(with its neutral reset) before a new one is attached.

Note-on runs a full rebinding pass. Nothing carries over from the previous
note implicitly: each source is detached, then attached to the new voice if
its target and depth say so. After the pass, if no source drives the shared
tremolo stage with a non-zero output, that stage is ramped back to 1 so a
previous note's amplitude modulation cannot linger.
*/

pub struct ModulationRouter {
    sources: Vec<ModulationSource>,
}

impl ModulationRouter {
    pub fn new(count: usize) -> Self {
        Self {
            sources: (0..count).map(ModulationSource::new).collect(),
        }
    }

    pub fn sources(&self) -> &[ModulationSource] {
        &self.sources
    }

    pub fn source(&self, index: SourceIndex) -> Option<&ModulationSource> {
        self.sources.get(index)
    }

    /// The routing table, one row per source.
    pub fn routes(&self) -> impl Iterator<Item = Option<Route>> + '_ {
        self.sources.iter().map(|s| s.attachment())
    }

    /// Full rebinding pass for a freshly started voice.
    pub fn bind_voice(&mut self, voice: VoiceId, tx: &mut CommandSender) {
        for source in &mut self.sources {
            source.detach(tx);
            if source.target() != ModTarget::None {
                source.attach(voice, tx);
            }
        }
        self.guard_tremolo(tx);
    }

    /// Detach every source routed to `voice`.
    pub fn release_voice(&mut self, voice: VoiceId, tx: &mut CommandSender) {
        for source in &mut self.sources {
            if source.attachment().is_some_and(|r| r.voice == voice) {
                source.detach(tx);
            }
        }
    }

    pub fn set_rate(&mut self, index: SourceIndex, rate: f32, tx: &mut CommandSender) {
        if let Some(source) = self.sources.get_mut(index) {
            source.set_rate(rate, tx);
        }
    }

    pub fn set_waveform(&mut self, index: SourceIndex, waveform: Waveform, tx: &mut CommandSender) {
        if let Some(source) = self.sources.get_mut(index) {
            source.set_waveform(waveform, tx);
        }
    }

    pub fn toggle_pause(&mut self, index: SourceIndex, tx: &mut CommandSender) {
        if let Some(source) = self.sources.get_mut(index) {
            source.toggle_pause(tx);
        }
    }

    pub fn set_paused(&mut self, index: SourceIndex, paused: bool, tx: &mut CommandSender) {
        if let Some(source) = self.sources.get_mut(index) {
            source.set_paused(paused, tx);
        }
    }

    /// Change a source's target. While a note sounds the route moves at once:
    /// detach from the old target, then attach to the new one.
    pub fn set_target(
        &mut self,
        index: SourceIndex,
        target: ModTarget,
        voice: Option<VoiceId>,
        tx: &mut CommandSender,
    ) {
        let Some(source) = self.sources.get_mut(index) else {
            return;
        };
        if source.target() == target {
            return;
        }
        source.detach(tx);
        source.set_target(target, tx);
        if let Some(voice) = voice {
            source.attach(voice, tx);
        }
    }

    /// Change a source's depth. Crossing zero detaches or attaches; any other
    /// change ramps the live output.
    pub fn set_depth(
        &mut self,
        index: SourceIndex,
        depth: f32,
        voice: Option<VoiceId>,
        tx: &mut CommandSender,
    ) {
        let Some(source) = self.sources.get_mut(index) else {
            return;
        };
        source.set_depth(depth, tx);

        if source.depth() == 0.0 {
            source.detach(tx);
        } else if source.attachment().is_none() {
            if let Some(voice) = voice {
                source.attach(voice, tx);
            }
        }
    }

    fn guard_tremolo(&self, tx: &mut CommandSender) {
        let driven = self
            .sources
            .iter()
            .any(|s| s.target() == ModTarget::Amplitude && s.effective_output() > 0.0);
        if !driven {
            tx.send(GraphCommand::RampShared {
                param: SharedParam::Tremolo,
                target: 1.0,
                duration: CONTROL_RAMP,
            });
        }
    }
}
