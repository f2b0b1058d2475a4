//! DWARF Debug Information Entry (DIE) surface.
//!
//! The entry reader itself lives on the debugger side; this module declares
//! the shape of what it produces (entries with a tag, a children flag, and an
//! attribute list) and the [`EntryReader`] trait the type decoder consumes.

use serde::{Deserialize, Serialize};

use crate::error::DecodeError;

/// Byte position of a DIE within its section. The stable identity of a type.
pub type Offset = u64;

/// DIE tags the type decoder dispatches on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DwTag {
    /// Null entry terminating a sibling list.
    Null,
    ArrayType,
    ClassType,
    EnumerationType,
    FormalParameter,
    Member,
    PointerType,
    CompileUnit,
    StructType,
    SubroutineType,
    Typedef,
    UnionType,
    UnspecifiedParameters,
    SubrangeType,
    BaseType,
    ConstType,
    Enumerator,
    Variable,
    VolatileType,
    RestrictType,
    UnspecifiedType,
    /// A tag this library does not interpret.
    Unknown(u16),
}

impl From<u16> for DwTag {
    fn from(value: u16) -> Self {
        match value {
            0x00 => DwTag::Null,
            0x01 => DwTag::ArrayType,
            0x02 => DwTag::ClassType,
            0x04 => DwTag::EnumerationType,
            0x05 => DwTag::FormalParameter,
            0x0d => DwTag::Member,
            0x0f => DwTag::PointerType,
            0x11 => DwTag::CompileUnit,
            0x13 => DwTag::StructType,
            0x15 => DwTag::SubroutineType,
            0x16 => DwTag::Typedef,
            0x17 => DwTag::UnionType,
            0x18 => DwTag::UnspecifiedParameters,
            0x21 => DwTag::SubrangeType,
            0x24 => DwTag::BaseType,
            0x26 => DwTag::ConstType,
            0x28 => DwTag::Enumerator,
            0x34 => DwTag::Variable,
            0x35 => DwTag::VolatileType,
            0x37 => DwTag::RestrictType,
            0x3b => DwTag::UnspecifiedType,
            other => DwTag::Unknown(other),
        }
    }
}

/// DIE attributes the type decoder consumes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DwAt {
    Location,
    Name,
    ByteSize,
    BitOffset,
    BitSize,
    /// DW_AT_bit_stride (called stride_size in DWARF 2).
    StrideSize,
    UpperBound,
    ConstValue,
    Count,
    DataMemberLoc,
    Declaration,
    Encoding,
    Type,
    /// DW_AT_byte_stride.
    Stride,
    /// Go vendor extension: the reflect kind of the type.
    GoKind,
    /// Go vendor extension: key type of a map.
    GoKey,
    /// Go vendor extension: element type of a map, slice, or channel.
    GoElem,
    Unknown(u16),
}

impl From<u16> for DwAt {
    fn from(value: u16) -> Self {
        match value {
            0x02 => DwAt::Location,
            0x03 => DwAt::Name,
            0x0b => DwAt::ByteSize,
            0x0c => DwAt::BitOffset,
            0x0d => DwAt::BitSize,
            0x1c => DwAt::ConstValue,
            0x2e => DwAt::StrideSize,
            0x2f => DwAt::UpperBound,
            0x37 => DwAt::Count,
            0x38 => DwAt::DataMemberLoc,
            0x3c => DwAt::Declaration,
            0x3e => DwAt::Encoding,
            0x49 => DwAt::Type,
            0x51 => DwAt::Stride,
            0x2900 => DwAt::GoKind,
            0x2901 => DwAt::GoKey,
            0x2902 => DwAt::GoElem,
            other => DwAt::Unknown(other),
        }
    }
}

/// Base-type encodings (DW_ATE_*).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DwAte {
    Address,
    Boolean,
    ComplexFloat,
    Float,
    Signed,
    SignedChar,
    Unsigned,
    UnsignedChar,
    Unknown(i64),
}

impl From<i64> for DwAte {
    fn from(value: i64) -> Self {
        match value {
            0x01 => DwAte::Address,
            0x02 => DwAte::Boolean,
            0x03 => DwAte::ComplexFloat,
            0x04 => DwAte::Float,
            0x05 => DwAte::Signed,
            0x06 => DwAte::SignedChar,
            0x07 => DwAte::Unsigned,
            0x08 => DwAte::UnsignedChar,
            other => DwAte::Unknown(other),
        }
    }
}

/// The reflect-kind hint carried by the Go compiler on type entries.
///
/// Numbering follows Go's `reflect.Kind`. The decoder treats only `Slice`,
/// `String`, `Map`, `Chan`, and `Interface` specially; everything else is
/// carried through for the debugger side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReflectKind {
    Invalid,
    Bool,
    Int,
    Int8,
    Int16,
    Int32,
    Int64,
    Uint,
    Uint8,
    Uint16,
    Uint32,
    Uint64,
    Uintptr,
    Float32,
    Float64,
    Complex64,
    Complex128,
    Array,
    Chan,
    Func,
    Interface,
    Map,
    Ptr,
    Slice,
    String,
    Struct,
    UnsafePointer,
    Unknown(i64),
}

impl From<i64> for ReflectKind {
    fn from(value: i64) -> Self {
        match value {
            0 => ReflectKind::Invalid,
            1 => ReflectKind::Bool,
            2 => ReflectKind::Int,
            3 => ReflectKind::Int8,
            4 => ReflectKind::Int16,
            5 => ReflectKind::Int32,
            6 => ReflectKind::Int64,
            7 => ReflectKind::Uint,
            8 => ReflectKind::Uint8,
            9 => ReflectKind::Uint16,
            10 => ReflectKind::Uint32,
            11 => ReflectKind::Uint64,
            12 => ReflectKind::Uintptr,
            13 => ReflectKind::Float32,
            14 => ReflectKind::Float64,
            15 => ReflectKind::Complex64,
            16 => ReflectKind::Complex128,
            17 => ReflectKind::Array,
            18 => ReflectKind::Chan,
            19 => ReflectKind::Func,
            20 => ReflectKind::Interface,
            21 => ReflectKind::Map,
            22 => ReflectKind::Ptr,
            23 => ReflectKind::Slice,
            24 => ReflectKind::String,
            25 => ReflectKind::Struct,
            26 => ReflectKind::UnsafePointer,
            other => ReflectKind::Unknown(other),
        }
    }
}

/// An attribute value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum AttrValue {
    /// A constant. DWARF forms narrower than 64 bits are widened by the reader.
    Signed(i64),
    /// A string value.
    String(String),
    /// A flag.
    Flag(bool),
    /// A block of bytes (location expressions).
    Block(Vec<u8>),
    /// A reference to another DIE by section offset.
    Reference(Offset),
    /// An 8-byte type-unit signature.
    Signature(u64),
}

/// A single attribute of a DIE.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attr {
    pub at: DwAt,
    pub value: AttrValue,
}

/// A Debug Information Entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entry {
    /// Offset of this DIE within its section.
    pub offset: Offset,
    /// The tag indicating what this DIE represents.
    pub tag: DwTag,
    /// Whether this DIE is followed by a children sub-tree.
    pub has_children: bool,
    /// The attributes of this DIE, in stream order.
    pub attrs: Vec<Attr>,
}

impl Entry {
    /// Get an attribute value by name.
    pub fn attr(&self, at: DwAt) -> Option<&AttrValue> {
        self.attrs.iter().find(|a| a.at == at).map(|a| &a.value)
    }

    /// Get an integer attribute.
    pub fn ival(&self, at: DwAt) -> Option<i64> {
        match self.attr(at)? {
            AttrValue::Signed(v) => Some(*v),
            _ => None,
        }
    }

    /// Get a string attribute.
    pub fn sval(&self, at: DwAt) -> Option<&str> {
        match self.attr(at)? {
            AttrValue::String(s) => Some(s),
            _ => None,
        }
    }

    /// Get a byte-block attribute.
    pub fn block(&self, at: DwAt) -> Option<&[u8]> {
        match self.attr(at)? {
            AttrValue::Block(b) => Some(b),
            _ => None,
        }
    }

    /// Whether the attribute is present at all, regardless of value.
    pub fn has(&self, at: DwAt) -> bool {
        self.attr(at).is_some()
    }

    /// Get the name attribute as a string.
    pub fn name(&self) -> Option<&str> {
        self.sval(DwAt::Name)
    }

    /// The reflect-kind hint, `Invalid` when absent.
    pub fn reflect_kind(&self) -> ReflectKind {
        self.ival(DwAt::GoKind)
            .map(ReflectKind::from)
            .unwrap_or(ReflectKind::Invalid)
    }
}

/// A positioned cursor over the DIE stream of one DWARF section.
///
/// Implemented by the debugger side over its `.debug_info` storage. Cloning
/// yields an independent cursor over the same underlying bytes; the decoder
/// clones before every recursive sub-decode so an outer iteration's position
/// is never perturbed by an inner one.
pub trait EntryReader: Clone {
    /// Position the reader at a section offset.
    fn seek(&mut self, off: Offset);

    /// Read the entry at the current position and advance past it.
    ///
    /// Returns `Ok(None)` at end of stream. Null entries terminating a
    /// sibling list are returned as entries with [`DwTag::Null`].
    fn next(&mut self) -> Result<Option<Entry>, DecodeError>;

    /// The offset of the entry `next` would return.
    fn offset(&self) -> Offset;

    /// Size in bytes of addresses in the current compilation unit.
    fn address_size(&self) -> i64;
}
