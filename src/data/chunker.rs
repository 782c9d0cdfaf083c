// ============================================================
// Layer 4 — Segment Chunker
// ============================================================
// Cuts an utterance's sample range into fixed-duration,
// non-overlapping chunks.
//
// Example with seg_len = 3 s on a 7.5 s utterance:
//   Chunk 1:  0.0 – 3.0 s
//   Chunk 2:  3.0 – 6.0 s
//   (the 1.5 s tail is dropped)
//
// An utterance shorter than one chunk is kept whole as a single
// segment so small corpora are not emptied.

pub struct Chunker {
    /// Chunk length in samples
    seg_len: usize,
}

impl Chunker {
    /// # Panics
    /// Panics if `seg_len` is zero
    pub fn new(seg_len: usize) -> Self {
        assert!(seg_len > 0, "seg_len must be positive");
        Self { seg_len }
    }

    /// Chunker for a duration in centiseconds at `sample_rate`.
    pub fn from_centiseconds(seg_dur: u32, sample_rate: u32) -> Self {
        Self::new((seg_dur as usize * sample_rate as usize / 100).max(1))
    }

    /// `[start, stop)` windows covering `[start, stop)`.
    pub fn chunk(&self, start: usize, stop: usize) -> Vec<(usize, usize)> {
        if stop <= start {
            return Vec::new();
        }
        let total = stop - start;
        if total < self.seg_len {
            return vec![(start, stop)];
        }
        (0..self.num_chunks(total))
            .map(|i| {
                let s = start + i * self.seg_len;
                (s, s + self.seg_len)
            })
            .collect()
    }

    /// Number of chunks a range of `len` samples produces
    pub fn num_chunks(&self, len: usize) -> usize {
        match len {
            0 => 0,
            l if l < self.seg_len => 1,
            l => l / self.seg_len,
        }
    }
}
