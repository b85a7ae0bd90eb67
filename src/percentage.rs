//! Validated progress percentage.

use crate::error::ProgressError;

/// A progress value guaranteed to lie within `0..=100`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub struct Percentage(u8);

impl Percentage {
    pub const ZERO: Self = Self(0);
    pub const FULL: Self = Self(100);

    /// Reject anything outside `0..=100` instead of clamping it.
    pub fn new(value: i32) -> Result<Self, ProgressError> {
        match u8::try_from(value) {
            Ok(pct) if pct <= 100 => Ok(Self(pct)),
            _ => Err(ProgressError::InvalidPercentage(value)),
        }
    }

    #[must_use]
    pub fn get(self) -> u8 {
        self.0
    }

    /// Percentage points still to go.
    #[must_use]
    pub fn remaining(self) -> u8 {
        100 - self.0
    }
}

impl std::fmt::Display for Percentage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}%", self.0)
    }
}
