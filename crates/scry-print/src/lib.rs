//! # scry-print
//!
//! Pretty-printing of values in a target process's address space, driven by
//! the type graphs `scry-dwarf` reconstructs. This crate provides:
//!
//! - [`Arch`], the little slice of architecture knowledge value decoding
//!   needs (pointer width, endianness, float/complex assembly)
//! - [`TargetMemory`], the oracle trait the debugger side implements to read
//!   typed primitives, strings, struct fields, and map buckets at target
//!   addresses
//! - [`Printer`], the cycle-aware recursive value formatter
//!
//! Printing never aborts on a bad read: failures render inline as `<…>` and
//! the first one is returned alongside the full text.

pub mod arch;
pub mod error;
pub mod oracle;
pub mod printer;

pub use arch::Arch;
pub use error::PrintError;
pub use oracle::{MemoryError, TargetMemory};
pub use printer::Printer;
