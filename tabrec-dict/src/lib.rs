//! Dictionary interfaces for dimension columns.
//!
//! Dimension values never reach a record as strings: each is replaced by its ID in a per-column
//! dictionary, stored in the smallest number of bytes that can hold the dictionary's largest
//! ID. This crate defines what a record layout needs from such a dictionary and from the
//! service that loads them; building dictionaries is left to that service.

pub use dictionary::*;

mod dictionary;
#[cfg(feature = "test-harness")]
pub mod test_harness;
