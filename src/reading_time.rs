//! Word count and reading time estimation

/// Words per minute used for the reading time estimate
pub const DEFAULT_WORDS_PER_MINUTE: usize = 200;

pub struct ReadingTimeEstimator {
    words_per_minute: usize,
}

impl ReadingTimeEstimator {
    pub fn new() -> Self {
        Self {
            words_per_minute: DEFAULT_WORDS_PER_MINUTE,
        }
    }

    /// Minutes needed to read `word_count` words, rounded up
    pub fn minutes(&self, word_count: usize) -> usize {
        word_count.div_ceil(self.words_per_minute)
    }
}

impl Default for ReadingTimeEstimator {
    fn default() -> Self {
        Self::new()
    }
}
