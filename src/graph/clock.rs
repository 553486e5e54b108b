use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc,
};

/// Shared audio clock: the number of frames the renderer has produced.
///
/// The renderer is the only writer. The control plane reads it to turn
/// "now" into a sample position (for lifecycle bookkeeping) without ever
/// waiting on the audio thread.
#[derive(Debug, Clone, Default)]
pub struct AudioClock {
    frames: Arc<AtomicU64>,
}

impl AudioClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current position in frames.
    #[inline]
    pub fn now(&self) -> u64 {
        self.frames.load(Ordering::Acquire)
    }

    /// Advance by `frames`. Called by the renderer after each block.
    #[inline]
    pub(crate) fn advance(&self, frames: u64) {
        self.frames.fetch_add(frames, Ordering::AcqRel);
    }
}
