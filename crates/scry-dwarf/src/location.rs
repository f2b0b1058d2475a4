//! Mini-evaluator for member-location expressions.
//!
//! Field offsets in struct entries arrive as tiny DWARF expressions. Only the
//! two forms compilers actually emit for data members are accepted:
//!
//! 1. `[DW_OP_plus_uconst, uleb128]`
//! 2. `[DW_OP_consts, sleb128, DW_OP_plus]`
//!
//! Anything else is an error; a full expression evaluator lives elsewhere in
//! the debugger and is deliberately not duplicated here.

use crate::entry::Offset;
use crate::error::DecodeError;
use crate::leb128::{decode_sleb128, decode_uleb128};

const OP_CONSTS: u8 = 0x11;
const OP_PLUS: u8 = 0x22;
const OP_PLUS_UCONST: u8 = 0x23;

/// Evaluate a member-location expression to a byte offset.
///
/// An empty expression means offset 0. `section` and `offset` name the member
/// entry the expression came from, for error context.
pub fn member_offset(
    data: &[u8],
    section: &'static str,
    offset: Offset,
) -> Result<i64, DecodeError> {
    if data.is_empty() {
        return Ok(0);
    }

    let truncated = || DecodeError::TruncatedExpression { section, offset };

    let (value, rest) = match data[0] {
        OP_PLUS_UCONST => {
            let (v, len) = decode_uleb128(&data[1..]).map_err(|_| truncated())?;
            (v as i64, &data[1 + len..])
        }
        OP_CONSTS => {
            let (v, len) = decode_sleb128(&data[1..]).map_err(|_| truncated())?;
            let rest = &data[1 + len..];
            match rest.first() {
                Some(&OP_PLUS) => (v, &rest[1..]),
                Some(&op) => {
                    return Err(DecodeError::UnexpectedOpcode {
                        section,
                        offset,
                        op,
                    })
                }
                None => return Err(truncated()),
            }
        }
        op => {
            return Err(DecodeError::UnexpectedOpcode {
                section,
                offset,
                op,
            })
        }
    };

    match rest.first() {
        None => Ok(value),
        Some(&op) => Err(DecodeError::UnexpectedOpcode {
            section,
            offset,
            op,
        }),
    }
}
