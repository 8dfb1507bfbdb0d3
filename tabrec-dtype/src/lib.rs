//! The type system for tabrec.
//!
//! This crate describes what a table looks like before any byte layout is derived from it:
//! physical types and values for metric columns, logical column types, column references, and
//! the ordered table descriptor that every layout is built against.

pub use column::*;
pub use dtype::*;
pub use ptype::*;
pub use pvalue::*;
pub use table::*;

mod column;
mod dtype;
mod ptype;
mod pvalue;
mod table;
