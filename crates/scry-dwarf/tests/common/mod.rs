//! Shared test harness: an in-memory entry reader over synthetic DIE
//! streams, plus terse entry constructors.

use std::rc::Rc;

use scry_dwarf::{Attr, AttrValue, DecodeError, DwAt, DwTag, Entry, EntryReader, Offset};

/// An entry reader over a fixed, offset-sorted entry list. Clones share the
/// storage, like real readers share the section bytes.
#[derive(Clone)]
pub struct VecReader {
    entries: Rc<Vec<Entry>>,
    pos: usize,
    address_size: i64,
}

impl VecReader {
    pub fn new(entries: Vec<Entry>) -> Self {
        VecReader {
            entries: Rc::new(entries),
            pos: 0,
            address_size: 8,
        }
    }

    #[allow(dead_code)]
    pub fn with_address_size(mut self, address_size: i64) -> Self {
        self.address_size = address_size;
        self
    }
}

impl EntryReader for VecReader {
    fn seek(&mut self, off: Offset) {
        self.pos = self
            .entries
            .iter()
            .position(|e| e.offset >= off)
            .unwrap_or(self.entries.len());
    }

    fn next(&mut self) -> Result<Option<Entry>, DecodeError> {
        let e = self.entries.get(self.pos).cloned();
        if e.is_some() {
            self.pos += 1;
        }
        Ok(e)
    }

    fn offset(&self) -> Offset {
        self.entries.get(self.pos).map(|e| e.offset).unwrap_or(u64::MAX)
    }

    fn address_size(&self) -> i64 {
        self.address_size
    }
}

pub fn entry(offset: Offset, tag: DwTag, has_children: bool, attrs: Vec<(DwAt, AttrValue)>) -> Entry {
    Entry {
        offset,
        tag,
        has_children,
        attrs: attrs
            .into_iter()
            .map(|(at, value)| Attr { at, value })
            .collect(),
    }
}

pub fn null(offset: Offset) -> Entry {
    entry(offset, DwTag::Null, false, vec![])
}

pub fn ival(v: i64) -> AttrValue {
    AttrValue::Signed(v)
}

pub fn sval(s: &str) -> AttrValue {
    AttrValue::String(s.to_string())
}

pub fn reference(off: Offset) -> AttrValue {
    AttrValue::Reference(off)
}

/// A plain signed 4-byte base type entry named `name`.
pub fn int32_entry(offset: Offset, name: &str) -> Entry {
    entry(
        offset,
        DwTag::BaseType,
        false,
        vec![
            (DwAt::Name, sval(name)),
            (DwAt::Encoding, ival(0x05)),
            (DwAt::ByteSize, ival(4)),
        ],
    )
}
