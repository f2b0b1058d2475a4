//! Error types for value printing.

use scry_dwarf::{DecodeError, DwTag};
use thiserror::Error;

use crate::oracle::MemoryError;

/// A failure encountered while printing a value.
///
/// Printing does not stop at the first failure: each one is rendered inline
/// as `<…>` and the first becomes the operation's sticky error.
#[derive(Error, Debug)]
pub enum PrintError {
    #[error("unrecognized bool size {0}")]
    BadBoolSize(i64),

    #[error("unrecognized float size {0}")]
    BadFloatSize(i64),

    #[error("unrecognized complex size {0}")]
    BadComplexSize(i64),

    /// Only plain structs print; unions and classes do not.
    #[error("can't handle struct type {0}")]
    UnhandledStructKind(&'static str),

    /// The printer met a type variant it does not format.
    #[error("unimplemented type {0}")]
    UnhandledType(String),

    /// An array or slice element type with no known size.
    #[error("can't determine element size")]
    UnknownElementSize,

    /// The interface's runtime representation did not have the expected
    /// typedef-of-typedef-of-struct shape.
    #[error("bad interface type: {reason}")]
    BadInterfaceLayout { reason: &'static str },

    /// The channel's runtime representation was not a pointer to a struct.
    #[error("bad channel type: {reason}")]
    BadChannelLayout { reason: &'static str },

    #[error("struct field {0} missing")]
    MissingField(String),

    #[error("struct definition repeats field {0}")]
    RepeatedField(String),

    /// A target-memory read failed.
    #[error("{context}: {source}")]
    Oracle {
        context: &'static str,
        source: MemoryError,
    },

    /// An entry with no type attribute.
    #[error("no type")]
    NoType,

    /// An entry that is neither a variable nor a formal parameter.
    #[error("unrecognized entry tag {0:?}")]
    UnexpectedTag(DwTag),

    /// Decoding the entry's type failed.
    #[error("type lookup: {0}")]
    Decode(#[from] DecodeError),
}
