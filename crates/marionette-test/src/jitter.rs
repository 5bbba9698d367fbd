//! Frame jitter simulator
//!
//! Perturbs well-formed pose frames the way a misbehaving server or a
//! mismatched skeleton would: frames cut short, frames carrying extra bones,
//! stray bytes after the last matrix, and text messages interleaved with
//! the binary stream. Seeded, so every run is reproducible.

use bytes::{BufMut, Bytes, BytesMut};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use marionette_transport::StreamMessage;
use marionette_wire::MATRIX_SIZE;

/// Jitter configuration
#[derive(Clone, Debug)]
pub struct JitterConfig {
    /// Probability of cutting a frame short
    pub truncate_prob: f64,
    /// Probability of appending extra matrices
    pub extend_prob: f64,
    /// Maximum number of extra matrices appended
    pub max_extra_bones: usize,
    /// Probability of appending a partial matrix
    pub trailing_prob: f64,
    /// Probability of emitting a text message instead of the frame
    pub text_prob: f64,
}

impl Default for JitterConfig {
    fn default() -> Self {
        JitterConfig {
            truncate_prob: 0.05,
            extend_prob: 0.05,
            max_extra_bones: 4,
            trailing_prob: 0.02,
            text_prob: 0.01,
        }
    }
}

impl JitterConfig {
    /// Pass frames through untouched
    pub fn clean() -> Self {
        JitterConfig {
            truncate_prob: 0.0,
            extend_prob: 0.0,
            max_extra_bones: 0,
            trailing_prob: 0.0,
            text_prob: 0.0,
        }
    }

    /// Most frames damaged in some way
    pub fn hostile() -> Self {
        JitterConfig {
            truncate_prob: 0.3,
            extend_prob: 0.3,
            max_extra_bones: 16,
            trailing_prob: 0.2,
            text_prob: 0.1,
        }
    }
}

/// Jitter statistics
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct JitterStats {
    pub frames_in: u64,
    pub truncated: u64,
    pub extended: u64,
    pub trailing: u64,
    pub text_injected: u64,
}

impl JitterStats {
    /// Binary frames whose matrix count no longer matches the input
    pub fn mismatched(&self) -> u64 {
        self.truncated + self.extended
    }
}

/// Frame perturbation simulator
#[derive(Debug)]
pub struct FrameJitter {
    config: JitterConfig,
    rng: StdRng,
    stats: JitterStats,
}

impl FrameJitter {
    /// Create a new simulator with seed
    pub fn new(config: JitterConfig, seed: u64) -> Self {
        FrameJitter {
            config,
            rng: StdRng::seed_from_u64(seed),
            stats: JitterStats::default(),
        }
    }

    /// Perturb one frame
    pub fn perturb(&mut self, frame: Bytes) -> StreamMessage {
        self.stats.frames_in += 1;

        if self.rng.gen::<f64>() < self.config.text_prob {
            self.stats.text_injected += 1;
            return StreamMessage::Text(format!("{{\"status\":\"heartbeat\",\"seq\":{}}}", self.stats.frames_in));
        }

        let mut buf = BytesMut::from(&frame[..]);

        let whole = buf.len() / MATRIX_SIZE;
        if whole > 0 && self.rng.gen::<f64>() < self.config.truncate_prob {
            let keep = self.rng.gen_range(0..whole);
            buf.truncate(keep * MATRIX_SIZE);
            self.stats.truncated += 1;
        } else if self.config.max_extra_bones > 0 && self.rng.gen::<f64>() < self.config.extend_prob {
            let extra = self.rng.gen_range(1..=self.config.max_extra_bones);
            for _ in 0..extra * MATRIX_SIZE / 8 {
                buf.put_f64_le(self.rng.gen_range(-10.0..10.0));
            }
            self.stats.extended += 1;
        }

        if self.rng.gen::<f64>() < self.config.trailing_prob {
            let stray = self.rng.gen_range(1..MATRIX_SIZE);
            for _ in 0..stray {
                buf.put_u8(self.rng.gen());
            }
            self.stats.trailing += 1;
        }

        StreamMessage::Binary(buf.freeze())
    }

    /// Perturb a whole sequence of frames
    pub fn perturb_all<I>(&mut self, frames: I) -> Vec<StreamMessage>
    where
        I: IntoIterator<Item = Bytes>,
    {
        frames.into_iter().map(|f| self.perturb(f)).collect()
    }

    /// Get current statistics
    pub fn stats(&self) -> &JitterStats {
        &self.stats
    }

    /// Reset statistics
    pub fn reset_stats(&mut self) {
        self.stats = JitterStats::default();
    }
}
