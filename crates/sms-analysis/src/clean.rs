//! Removal of short tracks before frames leave the delay ring.

use crate::sequencer::{FrameSequencer, FrameStatus};

/// Deletes tracks that live for fewer than `min_length` frames.
///
/// The oldest ring slot is inspected just before it is emitted. Every track
/// born there is followed forward through the ring; if it dies within
/// `min_length` frames it is zeroed in all the frames it occupies.
#[derive(Debug, Clone)]
pub struct TrackCleaner {
    min_length: usize,
    alive: Vec<bool>,
}

impl TrackCleaner {
    /// Cleaner for tracks shorter than `min_length` frames.
    pub fn new(min_length: usize) -> Self {
        Self {
            min_length,
            alive: Vec::new(),
        }
    }

    /// Clean the oldest slot of `seq` and mark it `Cleaned`.
    ///
    /// Returns the number of tracks removed.
    pub fn clean_oldest(&mut self, seq: &mut FrameSequencer) -> usize {
        let tracks = seq.slot(0).deterministic.layout().tracks();
        self.alive.resize(tracks, false);
        let depth = seq.depth();
        let mut removed = 0;

        for t in 0..tracks {
            let born = seq.slot(0).deterministic.freq()[t] > 0.0 && !self.alive[t];
            if born && self.min_length > 1 {
                let mut run = 0;
                while run < depth && run < self.min_length {
                    let slot = seq.slot(run);
                    if !slot.is_analyzed() || slot.deterministic.freq()[t] <= 0.0 {
                        break;
                    }
                    run += 1;
                }
                if run < self.min_length && run < depth {
                    for p in 0..run {
                        let fields = seq.slot_mut(p).deterministic.fields_mut();
                        fields.freq[t] = 0.0;
                        fields.amp[t] = 0.0;
                        fields.phase[t] = 0.0;
                    }
                    removed += 1;
                }
            }
            self.alive[t] = seq.slot(0).deterministic.freq()[t] > 0.0;
        }

        if removed > 0 {
            tracing::trace!(frame = seq.slot(0).frame_num, removed, "short tracks removed");
        }
        seq.slot_mut(0).status = FrameStatus::Cleaned;
        removed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sequencer::SequencerConfig;

    fn sequencer() -> FrameSequencer {
        FrameSequencer::new(SequencerConfig {
            sample_rate: 1000,
            hop_size: 10,
            total_samples: 100_000,
            default_window: 21,
            max_window: 101,
            window_periods: 3.0,
            min_good_frames: 3,
            depth: 6,
            guides: 2,
            max_peaks: 4,
        })
        .unwrap()
    }

    /// Fill every slot with an analyzed frame; track 0 lives in `short`
    /// leading frames, track 1 in all of them.
    fn fill(seq: &mut FrameSequencer, short: usize) {
        for p in 0..seq.depth() {
            let slot = seq.slot_mut(p);
            slot.frame_num = p + 1;
            slot.status = FrameStatus::TracksFound;
            let f = slot.deterministic.freq_mut();
            f[0] = if p < short { 100.0 } else { 0.0 };
            f[1] = 300.0;
        }
    }

    #[test]
    fn test_short_track_removed() {
        let mut seq = sequencer();
        fill(&mut seq, 2);
        let mut cleaner = TrackCleaner::new(3);
        assert_eq!(cleaner.clean_oldest(&mut seq), 1);
        assert_eq!(seq.slot(0).deterministic.freq(), &[0.0, 300.0]);
        assert_eq!(seq.slot(1).deterministic.freq()[0], 0.0);
        assert_eq!(seq.slot(0).status, FrameStatus::Cleaned);
    }

    #[test]
    fn test_long_track_kept() {
        let mut seq = sequencer();
        fill(&mut seq, 3);
        let mut cleaner = TrackCleaner::new(3);
        assert_eq!(cleaner.clean_oldest(&mut seq), 0);
        assert_eq!(seq.slot(2).deterministic.freq()[0], 100.0);
    }

    #[test]
    fn test_only_births_are_checked() {
        let mut seq = sequencer();
        fill(&mut seq, 2);
        let mut cleaner = TrackCleaner::new(3);
        cleaner.alive = vec![true, true];
        assert_eq!(cleaner.clean_oldest(&mut seq), 0);
        assert_eq!(seq.slot(0).deterministic.freq()[0], 100.0);
    }

    #[test]
    fn test_track_reaching_end_of_stream() {
        let mut seq = sequencer();
        fill(&mut seq, 6);
        seq.slot_mut(2).status = FrameStatus::End;
        let mut cleaner = TrackCleaner::new(3);
        assert_eq!(cleaner.clean_oldest(&mut seq), 2);
    }
}
