//! Direct-child iteration over a parent DIE.
//!
//! Most DWARF generators emit a composite's children as a flat sibling list,
//! but clang sometimes nests composite entries inside other composites. The
//! cursor returns only the parent's direct (childless) children and silently
//! consumes any nested sub-trees, so the decoder's member/parameter/
//! enumerator loops never see them.

use crate::entry::{DwTag, Entry, EntryReader, Offset};
use crate::error::DecodeError;

/// Iterates the direct children of one parent entry.
pub struct ChildCursor<'r, R: EntryReader> {
    section: &'static str,
    reader: &'r mut R,
    /// How many unterminated nested sub-trees the cursor is currently inside.
    depth: usize,
    exhausted: bool,
}

impl<'r, R: EntryReader> ChildCursor<'r, R> {
    /// Start iterating children of the entry the reader is positioned after.
    /// A parent without the children flag yields nothing.
    pub fn new(section: &'static str, reader: &'r mut R, parent_has_children: bool) -> Self {
        ChildCursor {
            section,
            reader,
            depth: 0,
            exhausted: !parent_has_children,
        }
    }

    /// The underlying reader, for recursive sub-decodes. Callers clone it so
    /// the iteration's position is not disturbed.
    pub fn reader(&self) -> &R {
        self.reader
    }

    /// The next direct child, or `None` once the parent's sibling list is
    /// terminated. Fails with `TruncatedEntries` if the stream ends first.
    pub fn next_child(&mut self) -> Result<Option<Entry>, DecodeError> {
        if self.exhausted {
            return Ok(None);
        }
        loop {
            let kid = self.reader.next()?.ok_or(DecodeError::TruncatedEntries {
                section: self.section,
                offset: self.current_offset(),
            })?;
            if kid.tag == DwTag::Null {
                if self.depth > 0 {
                    self.depth -= 1;
                    continue;
                }
                self.exhausted = true;
                return Ok(None);
            }
            if kid.has_children {
                self.depth += 1;
            }
            if self.depth > 0 {
                continue;
            }
            return Ok(Some(kid));
        }
    }

    fn current_offset(&self) -> Offset {
        self.reader.offset()
    }
}
