//! Bulk input schema
//!
//! This module defines the column contract with the upstream data producer and
//! the raw delimited table it applies to. The contract is validated once at load
//! time so a layout change fails with a precise error instead of corrupting scores.

mod layout;
mod table;

pub use layout::*;
pub use table::*;
