use crate::foundation::core::Vec2;
use crate::foundation::error::{AfterimageError, AfterimageResult};
use crate::foundation::math::radical_inverse;

/// Default number of samples before the sequence repeats.
pub const DEFAULT_JITTER_PERIOD: usize = 16;

/// Halton(2, 3) offsets in `[-1, 1]²`, `length` of them.
///
/// Index 0 of the Halton sequence is skipped since it is the origin for every base.
pub fn generate(length: usize) -> Vec<Vec2> {
    (1..=length)
        .map(|i| {
            let i = u32::try_from(i).unwrap_or(u32::MAX);
            Vec2::new(
                2.0 * radical_inverse(i, 2) - 1.0,
                2.0 * radical_inverse(i, 3) - 1.0,
            )
        })
        .collect()
}

/// Periodic cursor over a precomputed jitter sequence.
#[derive(Clone, Debug, PartialEq)]
pub struct JitterSequencer {
    samples: Vec<Vec2>,
    cursor: usize,
}

impl JitterSequencer {
    /// Sequencer cycling through `period` samples.
    pub fn new(period: usize) -> AfterimageResult<Self> {
        if period == 0 {
            return Err(AfterimageError::config("jitter period must be at least 1"));
        }
        Ok(Self {
            samples: generate(period),
            cursor: 0,
        })
    }

    /// Return the sample under the cursor, then move the cursor forward (wrapping).
    pub fn advance(&mut self) -> Vec2 {
        let s = self.samples[self.cursor];
        self.cursor = (self.cursor + 1) % self.samples.len();
        s
    }

    /// Rewind to the first sample.
    pub fn reset(&mut self) {
        self.cursor = 0;
    }

    /// Position of the next sample, in `[0, period)`.
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Number of samples per cycle.
    pub fn period(&self) -> usize {
        self.samples.len()
    }

    /// The full sequence.
    pub fn samples(&self) -> &[Vec2] {
        &self.samples
    }
}

impl Default for JitterSequencer {
    fn default() -> Self {
        Self {
            samples: generate(DEFAULT_JITTER_PERIOD),
            cursor: 0,
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/temporal/jitter.rs"]
mod tests;
