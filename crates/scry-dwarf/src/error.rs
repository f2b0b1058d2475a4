//! Error types for DWARF type decoding.

use thiserror::Error;

use crate::entry::Offset;

/// Error type for the type decoder.
///
/// Every variant carries the section it was decoding and the offset of the
/// entry that produced it, since those are what a user greps for.
#[derive(Error, Debug)]
pub enum DecodeError {
    /// No entry, or a misaligned entry, at the requested offset.
    #[error("decoding dwarf section {section} at offset {offset:#x}: no type at offset")]
    NoTypeAtOffset {
        section: &'static str,
        offset: Offset,
    },

    /// A base type without an encoding attribute.
    #[error("decoding dwarf section {section} at offset {offset:#x}: missing encoding attribute for {type_name}")]
    MissingEncoding {
        section: &'static str,
        offset: Offset,
        type_name: String,
    },

    /// A base type with an encoding this library does not recognize.
    #[error("decoding dwarf section {section} at offset {offset:#x}: unrecognized encoding attribute value {encoding}")]
    BadEncoding {
        section: &'static str,
        offset: Offset,
        encoding: i64,
    },

    /// An enumeration type used as an array subrange.
    #[error("decoding dwarf section {section} at offset {offset:#x}: cannot handle enumeration type as array bound")]
    BadArrayBound {
        section: &'static str,
        offset: Offset,
    },

    /// A member-location expression with an opcode outside the two accepted
    /// forms, or trailing bytes after a recognized form.
    #[error("decoding dwarf section {section} at offset {offset:#x}: unexpected opcode {op:#x}")]
    UnexpectedOpcode {
        section: &'static str,
        offset: Offset,
        op: u8,
    },

    /// The DIE stream ended in the middle of a composite entry.
    #[error("decoding dwarf section {section} at offset {offset:#x}: unexpected end of DWARF entries")]
    TruncatedEntries {
        section: &'static str,
        offset: Offset,
    },

    /// A member-location expression ended in the middle of a LEB128 value.
    #[error("decoding dwarf section {section} at offset {offset:#x}: truncated location expression")]
    TruncatedExpression {
        section: &'static str,
        offset: Offset,
    },

    /// A type-unit signature with no registered type.
    #[error("decoding dwarf section {section} at offset {offset:#x}: no type registered for signature {signature:#018x}")]
    UnknownSignature {
        section: &'static str,
        offset: Offset,
        signature: u64,
    },

    /// The entry reader reported a malformed stream.
    #[error("malformed entry at offset {offset:#x}: {reason}")]
    MalformedEntry { offset: Offset, reason: String },
}
