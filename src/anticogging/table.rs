//! Cogging torque compensation table.
//!
//! A fixed 1024-bucket map of feed-forward torque versus mechanical position,
//! one bucket per 1/1024 of a turn. Position-derived indices always wrap
//! modulo the table length; externally supplied indices are bounds-checked
//! and rejected, never wrapped, so a bad index cannot corrupt an unrelated
//! bucket.

use libm::floorf;

/// Number of buckets in the cogging map (one per 1/1024 turn).
pub const COGGING_MAP_LEN: usize = 1024;

/// Learned torque-vs-position compensation map.
#[derive(Debug, Clone)]
pub struct CoggingTable {
    map: [f32; COGGING_MAP_LEN],
}

impl Default for CoggingTable {
    fn default() -> Self {
        Self::new()
    }
}

impl CoggingTable {
    /// Create a zeroed table.
    pub const fn new() -> Self {
        Self {
            map: [0.0; COGGING_MAP_LEN],
        }
    }

    /// Table length in buckets.
    #[inline]
    pub const fn len(&self) -> usize {
        COGGING_MAP_LEN
    }

    /// Always false; the table has fixed capacity.
    #[inline]
    pub const fn is_empty(&self) -> bool {
        false
    }

    /// Bucket index for a mechanical position in turns.
    ///
    /// Uses the floor-based fractional turn so negative positions wrap into
    /// the same bucket as their positive equivalents; the final modulo
    /// guards the `frac == 1.0` rounding edge.
    #[inline]
    pub fn bucket_for(&self, pos_turns: f32) -> usize {
        let frac = pos_turns - floorf(pos_turns);
        (frac * COGGING_MAP_LEN as f32) as usize % COGGING_MAP_LEN
    }

    /// Compensation torque for a position, clamped to ±`max_torque`.
    #[inline]
    pub fn feed_forward(&self, pos_turns: f32, max_torque: f32) -> f32 {
        self.map[self.bucket_for(pos_turns)].clamp(-max_torque, max_torque)
    }

    /// Read a bucket by external index; out-of-range indices are rejected.
    pub fn get(&self, index: usize) -> Option<f32> {
        self.map.get(index).copied()
    }

    /// Write a bucket by external index; returns false (and writes nothing)
    /// for an out-of-range index.
    pub fn set(&mut self, index: usize, value: f32) -> bool {
        match self.map.get_mut(index) {
            Some(slot) => {
                *slot = value;
                true
            }
            None => false,
        }
    }

    /// Fold `sample` into a bucket's running average.
    ///
    /// `visits` is how many samples the bucket already holds (the sweep's
    /// completed turn count), so the stored value converges on the mean of
    /// all samples seen.
    pub fn accumulate(&mut self, index: usize, sample: f32, visits: u32) {
        if let Some(slot) = self.map.get_mut(index) {
            *slot += (sample - *slot) / (visits + 1) as f32;
        }
    }

    /// Mean of all buckets.
    pub fn mean(&self) -> f32 {
        let sum: f32 = self.map.iter().sum();
        sum / COGGING_MAP_LEN as f32
    }

    /// Subtract the table mean from every bucket so compensation carries no
    /// net torque bias.
    pub fn remove_bias(&mut self) {
        let bias = self.mean();
        for slot in self.map.iter_mut() {
            *slot -= bias;
        }
    }

    /// Zero every bucket.
    pub fn clear(&mut self) {
        self.map = [0.0; COGGING_MAP_LEN];
    }
}
