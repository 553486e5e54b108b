use rtrb::{Consumer, Producer, RingBuffer};

/*
Scope Tap
=========

A passive view of the mixed signal, taken after the shared amplitude-
modulation stage and before master volume:

    voices ──→ bus ──→ tremolo ──→ [tap] ──→ master ──→ output

The renderer side (`ScopeWriter`) pushes every sample into a ring and simply
drops samples when the ring is full. Nobody has to read it. The reader side
(`ScopeTap`) drains whatever arrived and keeps the most recent `window`
samples for display.

The byte view mirrors the usual 8-bit time-domain analyser format:

    byte = clamp(128 · (1 + x), 0, 255)      128 = silence
*/

/// Audio-thread end of the tap. Never blocks, never allocates.
pub struct ScopeWriter {
    tx: Producer<f32>,
}

impl ScopeWriter {
    #[inline]
    pub fn push(&mut self, sample: f32) {
        // Full ring: nobody is reading fast enough, drop it.
        let _ = self.tx.push(sample);
    }
}

/// Reader end of the tap, owned by whoever draws the waveform.
pub struct ScopeTap {
    rx: Consumer<f32>,
    window: Vec<f32>,
    write_pos: usize,
}

/// Create a connected writer/tap pair.
///
/// `capacity` bounds the ring between threads, `window` is the number of
/// most-recent samples the tap keeps.
pub fn scope_channel(capacity: usize, window: usize) -> (ScopeWriter, ScopeTap) {
    let (tx, rx) = RingBuffer::<f32>::new(capacity.max(1));
    let tap = ScopeTap {
        rx,
        window: vec![0.0; window.max(1)],
        write_pos: 0,
    };
    (ScopeWriter { tx }, tap)
}

impl ScopeTap {
    /// Drain pending samples into the window. Returns how many arrived.
    pub fn poll(&mut self) -> usize {
        let mut count = 0;
        while let Ok(sample) = self.rx.pop() {
            self.window[self.write_pos] = sample;
            self.write_pos = (self.write_pos + 1) % self.window.len();
            count += 1;
        }
        count
    }

    pub fn len(&self) -> usize {
        self.window.len()
    }

    pub fn is_empty(&self) -> bool {
        self.window.is_empty()
    }

    /// The window in chronological order, oldest first.
    pub fn samples(&self) -> Vec<f32> {
        let (newer, older) = self.window.split_at(self.write_pos);
        older.iter().chain(newer).copied().collect()
    }

    /// Fill `out` with the most recent samples as unsigned bytes.
    pub fn bytes(&self, out: &mut [u8]) {
        let samples = self.samples();
        let skip = samples.len().saturating_sub(out.len());
        for (byte, &x) in out.iter_mut().zip(&samples[skip..]) {
            *byte = (128.0 * (1.0 + x)).clamp(0.0, 255.0) as u8;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_silence_reads_as_128() {
        let (mut writer, mut tap) = scope_channel(64, 16);
        for _ in 0..16 {
            writer.push(0.0);
        }
        tap.poll();
        let mut bytes = [0u8; 16];
        tap.bytes(&mut bytes);
        assert!(bytes.iter().all(|&b| b == 128));
    }

    #[test]
    fn test_full_ring_drops_without_blocking() {
        let (mut writer, mut tap) = scope_channel(8, 8);
        for i in 0..100 {
            writer.push(i as f32);
        }
        assert_eq!(tap.poll(), 8);
        // The first eight pushes survived; the rest were dropped.
        assert_eq!(tap.samples(), (0..8).map(|i| i as f32).collect::<Vec<_>>());
    }

    #[test]
    fn test_window_keeps_most_recent_in_order() {
        let (mut writer, mut tap) = scope_channel(64, 4);
        for i in 0..6 {
            writer.push(i as f32 / 10.0);
        }
        tap.poll();
        assert_eq!(tap.samples(), vec![0.2, 0.3, 0.4, 0.5]);
    }

    #[test]
    fn test_byte_view_clamps() {
        let (mut writer, mut tap) = scope_channel(8, 3);
        writer.push(-2.0);
        writer.push(1.0);
        writer.push(0.5);
        tap.poll();
        let mut bytes = [0u8; 3];
        tap.bytes(&mut bytes);
        assert_eq!(bytes, [0, 255, 192]);
    }
}
