//! Per-stream counters

/// Counters for one stream connection
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct StreamStats {
    /// Binary frames decoded into the hierarchy
    pub frames_applied: u64,
    /// Payload bytes of all binary frames
    pub bytes_received: u64,
    /// Text frames, which are not protocol traffic
    pub text_frames_ignored: u64,
    /// Frames whose matrix count differed from the bone count
    pub truncated_frames: u64,
    /// Frames with not even one whole matrix
    pub empty_frames: u64,
    /// Messages that arrived after the stream was closed
    pub dropped_after_close: u64,
}

impl StreamStats {
    pub fn new() -> Self {
        StreamStats::default()
    }

    /// Count one decoded binary frame
    pub fn record_frame(&mut self, bytes: usize, truncated: bool, empty: bool) {
        self.frames_applied = self.frames_applied.saturating_add(1);
        self.bytes_received = self.bytes_received.saturating_add(bytes as u64);
        if truncated {
            self.truncated_frames = self.truncated_frames.saturating_add(1);
        }
        if empty {
            self.empty_frames = self.empty_frames.saturating_add(1);
        }
    }

    pub fn record_text(&mut self) {
        self.text_frames_ignored = self.text_frames_ignored.saturating_add(1);
    }

    pub fn record_dropped(&mut self) {
        self.dropped_after_close = self.dropped_after_close.saturating_add(1);
    }

    /// Fraction of frames that needed truncation
    pub fn truncation_rate(&self) -> f64 {
        if self.frames_applied == 0 {
            0.0
        } else {
            self.truncated_frames as f64 / self.frames_applied as f64
        }
    }
}
