//! A TAgged GEometric history length (TAGE) conditional branch predictor.

pub mod branch;
pub mod error;
pub mod history;
pub mod predictor;

pub use branch::*;
pub use error::*;
pub use history::*;
pub use predictor::*;

