//! Implementation of a saturating counter.

use serde::{ Deserialize, Serialize };
use crate::Outcome;

/// Configuration for building a [`SaturatingCounter`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaturatingCounterConfig {
    /// Width of the counter [in bits]
    pub bits: u8,
    /// Initial value of the counter
    pub init: u8,
}
impl SaturatingCounterConfig {
    pub fn storage_bits(&self) -> usize { self.bits as usize }

    /// Returns true if the counter width and initial value are sensible.
    pub fn is_valid(&self) -> bool {
        (1..=8).contains(&self.bits) && (self.init as u16) < (1u16 << self.bits)
    }

    pub fn build(self) -> SaturatingCounter {
        SaturatingCounter::new(self.bits, self.init)
    }
}

/// An N-bit unsigned saturating counter.
///
/// The predicted direction is given by the most-significant bit.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SaturatingCounter {
    bits: u8,
    ctr: u8,
}
impl SaturatingCounter {
    pub fn new(bits: u8, init: u8) -> Self {
        assert!((1..=8).contains(&bits), "invalid counter width {}", bits);
        let res = Self { bits, ctr: init };
        assert!(init <= res.max(),
            "initial value {} does not fit in {} bits", init, bits);
        res
    }

    /// The largest value this counter can hold.
    pub fn max(&self) -> u8 {
        ((1u16 << self.bits) - 1) as u8
    }

    /// The smallest value with the most-significant bit set
    /// (the "weakly taken" state).
    pub fn midpoint(&self) -> u8 {
        1 << (self.bits - 1)
    }

    pub fn bits(&self) -> u8 { self.bits }
    pub fn value(&self) -> u8 { self.ctr }

    pub fn increment(&mut self) {
        if self.ctr < self.max() {
            self.ctr += 1;
        }
    }

    pub fn decrement(&mut self) {
        self.ctr = self.ctr.saturating_sub(1);
    }

    /// Overwrite the counter value.
    pub fn set(&mut self, val: u8) {
        assert!(val <= self.max(),
            "value {} does not fit in {} bits", val, self.bits);
        self.ctr = val;
    }

    /// Return the current predicted direction.
    pub fn predict(&self) -> Outcome {
        // Only reachable if the counter was corrupted
        assert!(self.ctr <= self.max(),
            "counter value {} exceeds {} bits", self.ctr, self.bits);
        Outcome::from(self.ctr & self.midpoint() != 0)
    }

    /// Move the counter toward the provided outcome.
    pub fn update(&mut self, outcome: Outcome) {
        match outcome {
            Outcome::T => self.increment(),
            Outcome::N => self.decrement(),
        }
    }
}
