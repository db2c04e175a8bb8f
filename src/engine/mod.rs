//! Pure valuation computation. Everything in this module is deterministic for
//! a given (asset, locality band, day) and performs no I/O.

pub mod adjustment;
pub mod calculator;
pub mod confidence;

pub use calculator::ValuationCalculator;
pub use confidence::ConfidenceInputs;
