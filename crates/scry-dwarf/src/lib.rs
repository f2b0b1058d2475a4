//! # scry-dwarf
//!
//! Reconstruction of a program's source-level type graph from DWARF
//! debugging information. This crate provides:
//!
//! - The DIE surface the decoder consumes: entries, attribute values,
//!   tag/attribute/encoding constants, and the [`EntryReader`] trait the
//!   debugger side implements over its `.debug_info` storage
//! - A type model covering base types, qualifiers, pointers, arrays,
//!   structs/unions/classes, enums, typedefs, subroutines, and the Go
//!   language composites (slice, string, map, channel, interface)
//! - The recursive, offset-memoizing type decoder itself
//!
//! Types live in a [`TypeGraph`] arena and refer to each other by
//! [`TypeId`], so cyclic source types (a struct containing a pointer to
//! itself) decode to one shared node per DIE offset.
//!
//! # Example
//!
//! ```ignore
//! use scry_dwarf::TypeGraph;
//!
//! let mut graph = TypeGraph::new();
//! let ty = graph.type_at(&mut reader, 0x2a)?;
//! println!("{}", graph.display(ty));
//! ```

pub mod cursor;
pub mod decode;
pub mod entry;
pub mod error;
pub mod leb128;
pub mod location;
pub mod model;

pub use cursor::ChildCursor;
pub use decode::read_type;
pub use entry::{Attr, AttrValue, DwAt, DwAte, DwTag, Entry, EntryReader, Offset, ReflectKind};
pub use error::DecodeError;
pub use leb128::{decode_sleb128, decode_uleb128, Leb128Error};
pub use location::member_offset;
pub use model::{
    BasicClass, EnumValue, Qualifier, StructField, StructKind, StructLayout, TypeDisplay,
    TypeGraph, TypeId, TypeKind, TypeNode,
};
