//! The target-memory oracle the printer reads through.
//!
//! The printer never touches the target directly; the debugger side
//! implements [`TargetMemory`] over whatever transport it has (ptrace, a core
//! file, an RPC connection) and the printer stays transport-agnostic.

use scry_dwarf::{StructLayout, TypeId};
use thiserror::Error;

/// Failure reading the target's address space.
#[derive(Error, Debug)]
pub enum MemoryError {
    /// The address is not mapped in the target.
    #[error("address {addr:#x} is not mapped in the target")]
    Unmapped { addr: u64 },

    /// Fewer bytes than requested could be read.
    #[error("short read at {addr:#x}: wanted {wanted} bytes, got {got}")]
    ShortRead {
        addr: u64,
        wanted: usize,
        got: usize,
    },

    /// A runtime structure did not have the layout the reader expected.
    #[error("bad runtime layout: {0}")]
    BadLayout(String),

    /// I/O error from the underlying transport.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Reads typed values out of the target's address space.
///
/// The struct-field readers take the structural layout so implementations can
/// find field offsets without holding their own copy of the type graph; the
/// map reader walks the runtime's bucket structure, which only the debugger
/// side knows.
pub trait TargetMemory {
    /// Read one byte.
    fn peek_u8(&self, addr: u64) -> Result<u8, MemoryError>;

    /// Read a pointer-sized unsigned value.
    fn peek_ptr(&self, addr: u64) -> Result<u64, MemoryError>;

    /// Read a signed integer of the given byte size.
    fn peek_int(&self, addr: u64, size: i64) -> Result<i64, MemoryError>;

    /// Read an unsigned integer of the given byte size.
    fn peek_uint(&self, addr: u64, size: i64) -> Result<u64, MemoryError>;

    /// Fill `buf` from target memory at `addr`.
    fn peek_bytes(&self, addr: u64, buf: &mut [u8]) -> Result<(), MemoryError>;

    /// Read the string whose two-word runtime header sits at `addr`,
    /// returning at most `max_len` bytes of it.
    fn peek_string(
        &self,
        header: &StructLayout,
        addr: u64,
        max_len: u64,
    ) -> Result<String, MemoryError>;

    /// Read the pointer-valued field `field` of the struct at `addr`.
    fn peek_ptr_struct_field(
        &self,
        layout: &StructLayout,
        addr: u64,
        field: &str,
    ) -> Result<u64, MemoryError>;

    /// Read the integer-valued field `field` of the struct at `addr`,
    /// whatever its signedness.
    fn peek_uint_or_int_struct_field(
        &self,
        layout: &StructLayout,
        addr: u64,
        field: &str,
    ) -> Result<u64, MemoryError>;

    /// Enumerate the entries of the map at `addr`, calling `visit` with each
    /// entry's key address, value address, key type, and value type. `visit`
    /// returns `false` to stop the enumeration early.
    fn peek_map_values(
        &self,
        key: TypeId,
        elem: TypeId,
        addr: u64,
        visit: &mut dyn FnMut(u64, u64, TypeId, TypeId) -> bool,
    ) -> Result<(), MemoryError>;
}
