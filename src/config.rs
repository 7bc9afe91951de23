use crate::ldr_format::DEFAULT_FILL_UNROLL_THRESHOLD;

/// Tuning knobs for a shrink run.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ShrinkConfig {
    /// Largest Fill block, in bytes, that is unrolled into literal data.
    /// Bigger Fill blocks stay header-only.
    pub fill_unroll_threshold: u32,
}

impl ShrinkConfig {
    pub fn with_fill_unroll_threshold(mut self, threshold: u32) -> Self {
        self.fill_unroll_threshold = threshold;
        self
    }

    pub fn unrolls(&self, byte_count: u32) -> bool {
        byte_count <= self.fill_unroll_threshold
    }
}

impl Default for ShrinkConfig {
    fn default() -> Self {
        Self {
            fill_unroll_threshold: DEFAULT_FILL_UNROLL_THRESHOLD,
        }
    }
}
