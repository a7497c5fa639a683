// Copyright (c) 2024-present, Andrew Werner
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

use thiserror::Error;

/// The largest tower any map may be configured with.
pub const MAX_HEIGHT: usize = 64;

const DEFAULT_MAX_HEIGHT: usize = 32;
const DEFAULT_PROBABILITY: f64 = 0.25;

/// Construction parameters for a [`SkipMap`](crate::SkipMap).
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Options {
    max_height: usize,
    probability: f64,
}

/// Returned when [`Options`] hold a value the map cannot work with.
#[derive(Clone, Copy, Debug, PartialEq, Error)]
pub enum OptionsError {
    /// The height ceiling is zero or above [`MAX_HEIGHT`].
    #[error("max height must be in 1..={MAX_HEIGHT}, got {0}")]
    MaxHeight(usize),
    /// The promotion probability is outside `[0, 1)` or not a number.
    #[error("promotion probability must be in [0, 1), got {0}")]
    Probability(f64),
}

impl Default for Options {
    fn default() -> Self {
        Self {
            max_height: DEFAULT_MAX_HEIGHT,
            probability: DEFAULT_PROBABILITY,
        }
    }
}

impl Options {
    /// The defaults: a ceiling of 32 levels and a promotion probability of 1/4.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the ceiling on node height.
    #[must_use]
    pub fn max_height(mut self, max_height: usize) -> Self {
        self.max_height = max_height;
        self
    }

    /// Sets the probability that a node is promoted one more level.
    #[must_use]
    pub fn probability(mut self, probability: f64) -> Self {
        self.probability = probability;
        self
    }

    /// The configured height ceiling.
    pub fn get_max_height(&self) -> usize {
        self.max_height
    }

    /// The configured promotion probability.
    pub fn get_probability(&self) -> f64 {
        self.probability
    }

    /// Checks both parameters.
    ///
    /// # Errors
    ///
    /// Returns the first parameter found out of range.
    pub fn validate(&self) -> Result<(), OptionsError> {
        if self.max_height == 0 || self.max_height > MAX_HEIGHT {
            return Err(OptionsError::MaxHeight(self.max_height));
        }
        if !(0.0..1.0).contains(&self.probability) {
            return Err(OptionsError::Probability(self.probability));
        }
        Ok(())
    }

    // A coin flip succeeds when a uniform u32 falls below this cut-off.
    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        clippy::cast_precision_loss
    )]
    pub(crate) fn promote_threshold(&self) -> u32 {
        (f64::from(u32::MAX) * self.probability) as u32
    }
}
