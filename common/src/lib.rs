//! Tasas Common Types
//!
//! Shared types for the Tasas rate monitor: the calculator currencies, the
//! rate snapshot that the reconciliation engine produces, decimal helpers used
//! by both the fetch layer and the conversion engine, and timing constants.

pub mod monetary;
pub mod rates;
pub mod error;
pub mod time;

pub use monetary::*;
pub use rates::*;
pub use error::*;
pub use time::*;
