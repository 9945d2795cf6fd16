//! Branch direction predictors.

pub mod table;
pub mod counter;
pub mod tage;

pub use table::*;
pub use counter::*;
pub use tage::*;

use crate::Outcome;

/// Interface to a predictor driven by a trace: every conditional branch is
/// first predicted, and then trained with the resolved outcome before the
/// next branch is predicted.
pub trait BranchPredictor {
    fn name(&self) -> &'static str;

    /// Return the predicted outcome for the branch at 'pc'.
    fn predict(&self, pc: u32) -> Outcome;

    /// Update the internal state of the predictor with the correct outcome.
    fn train(&mut self, pc: u32, outcome: Outcome);
}
