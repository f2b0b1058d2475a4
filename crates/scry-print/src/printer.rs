//! Pretty-prints values in the target address space using decoded type
//! information.
//!
//! Output is accumulated into a buffer; failures are rendered inline as
//! `<…>` and the first one is kept as the operation's sticky error, so a
//! partially unreadable value still prints everything that could be read.
//! A visited set keyed by (type, address) bounds recursion on cyclic heap
//! data.

use std::collections::HashSet;
use std::fmt::Write as _;

use scry_dwarf::{
    read_type, AttrValue, BasicClass, DwAt, DwTag, Entry, EntryReader, StructField, StructKind,
    StructLayout, TypeGraph, TypeId, TypeKind,
};
use tracing::trace;

use crate::arch::Arch;
use crate::error::PrintError;
use crate::oracle::TargetMemory;

/// At most this many array or slice elements are printed; the rest become
/// `", ..."`.
const MAX_ARRAY_VALUES_TO_PRINT: i64 = 100;

/// At most this many map entries are printed; the rest become `" ..."`.
const MAX_MAP_VALUES_TO_PRINT: u64 = 8;

/// At most this many bytes of a string are read.
const MAX_STRING_SIZE: u64 = 100;

/// A pretty-printer for values in the target address space.
///
/// It can be reused between printing operations to avoid reallocations, but
/// it is not safe for concurrent access.
pub struct Printer<'a, M: TargetMemory> {
    arch: Arch,
    mem: &'a M,
    buf: String,
    /// Sticky first error of the current operation.
    err: Option<PrintError>,
    /// Prevents looping on cyclic data.
    visited: HashSet<(TypeId, u64)>,
}

impl<'a, M: TargetMemory> Printer<'a, M> {
    pub fn new(arch: Arch, mem: &'a M) -> Self {
        Printer {
            arch,
            mem,
            buf: String::new(),
            err: None,
            visited: HashSet::new(),
        }
    }

    /// Pretty-print the value of type `ty` at `addr`.
    ///
    /// Returns the accumulated text and the first error encountered, if any;
    /// the text is complete even when an error is returned.
    pub fn print_value(
        &mut self,
        graph: &TypeGraph,
        ty: TypeId,
        addr: u64,
    ) -> (String, Option<PrintError>) {
        self.reset();
        self.print_value_at(graph, ty, addr);
        (std::mem::take(&mut self.buf), self.err.take())
    }

    /// Pretty-print the value of a variable or formal-parameter entry at
    /// `addr`, decoding its type on demand.
    pub fn print_entry<R: EntryReader>(
        &mut self,
        graph: &mut TypeGraph,
        r: &mut R,
        entry: &Entry,
        addr: u64,
    ) -> (String, Option<PrintError>) {
        self.reset();
        self.print_entry_value_at(graph, r, entry, addr);
        (std::mem::take(&mut self.buf), self.err.take())
    }

    fn reset(&mut self) {
        self.buf.clear();
        self.err = None;
        self.visited.clear();
    }

    /// Render the failure inline and keep it as the sticky error if no
    /// earlier one is set.
    fn fail(&mut self, err: PrintError) {
        let _ = write!(self.buf, "<{err}>");
        if self.err.is_none() {
            self.err = Some(err);
        }
    }

    fn print_entry_value_at<R: EntryReader>(
        &mut self,
        graph: &mut TypeGraph,
        r: &mut R,
        entry: &Entry,
        addr: u64,
    ) {
        if addr == 0 {
            self.buf.push_str("<nil>");
            return;
        }
        match entry.tag {
            DwTag::Variable | DwTag::FormalParameter => {}
            tag => {
                self.fail(PrintError::UnexpectedTag(tag));
                return;
            }
        }
        let ty = match entry.attr(DwAt::Type) {
            Some(AttrValue::Reference(off)) => match read_type("info", r, *off, graph) {
                Ok(ty) => ty,
                Err(err) => {
                    self.fail(PrintError::Decode(err));
                    return;
                }
            },
            Some(AttrValue::Signature(sig)) => match graph.signature(*sig) {
                Some(ty) => ty,
                None => {
                    self.fail(PrintError::NoType);
                    return;
                }
            },
            _ => {
                self.fail(PrintError::NoType);
                return;
            }
        };
        self.print_value_at(graph, ty, addr);
    }

    fn print_value_at(&mut self, g: &TypeGraph, ty: TypeId, a: u64) {
        if a != 0 {
            // Check if we are repeating the same type and address.
            if !self.visited.insert((ty, a)) {
                let _ = write!(self.buf, "({} {a:#x})", g.display(ty));
                return;
            }
        }
        let node = g.node(ty);
        if a == 0 {
            // A composite at address zero has no storage to walk.
            match node.kind {
                TypeKind::Struct(_)
                | TypeKind::Array { .. }
                | TypeKind::Slice { .. }
                | TypeKind::Str { .. }
                | TypeKind::Map { .. }
                | TypeKind::Chan { .. }
                | TypeKind::Interface { .. } => {
                    self.buf.push_str("<nil>");
                    return;
                }
                _ => {}
            }
        }
        match &node.kind {
            TypeKind::Basic {
                class: BasicClass::Bool,
                ..
            } => {
                if node.byte_size != 1 {
                    self.fail(PrintError::BadBoolSize(node.byte_size));
                    return;
                }
                match self.mem.peek_u8(a) {
                    Ok(b) => {
                        let _ = write!(self.buf, "{}", b != 0);
                    }
                    Err(err) => self.fail(PrintError::Oracle {
                        context: "reading bool",
                        source: err,
                    }),
                }
            }
            TypeKind::Ptr { .. } => match self.mem.peek_ptr(a) {
                Ok(ptr) => {
                    let _ = write!(self.buf, "{ptr:#x}");
                }
                Err(err) => self.fail(PrintError::Oracle {
                    context: "reading pointer",
                    source: err,
                }),
            },
            TypeKind::Basic {
                class: BasicClass::Int,
                ..
            } => match self.mem.peek_int(a, node.byte_size) {
                Ok(i) => {
                    let _ = write!(self.buf, "{i}");
                }
                Err(err) => self.fail(PrintError::Oracle {
                    context: "reading integer",
                    source: err,
                }),
            },
            TypeKind::Basic {
                class: BasicClass::Uint,
                ..
            } => match self.mem.peek_uint(a, node.byte_size) {
                Ok(u) => {
                    let _ = write!(self.buf, "{u}");
                }
                Err(err) => self.fail(PrintError::Oracle {
                    context: "reading unsigned integer",
                    source: err,
                }),
            },
            TypeKind::Basic {
                class: BasicClass::Float,
                ..
            } => {
                let size = node.byte_size;
                let mut buf = vec![0u8; size.max(0) as usize];
                if let Err(err) = self.mem.peek_bytes(a, &mut buf) {
                    self.fail(PrintError::Oracle {
                        context: "reading float",
                        source: err,
                    });
                    return;
                }
                match size {
                    4 => {
                        let v = self.arch.float32(&buf);
                        let _ = write!(self.buf, "{v}");
                    }
                    8 => {
                        let v = self.arch.float64(&buf);
                        let _ = write!(self.buf, "{v}");
                    }
                    _ => self.fail(PrintError::BadFloatSize(size)),
                }
            }
            TypeKind::Basic {
                class: BasicClass::Complex,
                ..
            } => {
                let size = node.byte_size;
                let mut buf = vec![0u8; size.max(0) as usize];
                if let Err(err) = self.mem.peek_bytes(a, &mut buf) {
                    self.fail(PrintError::Oracle {
                        context: "reading complex",
                        source: err,
                    });
                    return;
                }
                match size {
                    8 => {
                        let (re, im) = self.arch.complex64(&buf);
                        if im.is_sign_negative() {
                            let _ = write!(self.buf, "({re}-{}i)", -im);
                        } else {
                            let _ = write!(self.buf, "({re}+{im}i)");
                        }
                    }
                    16 => {
                        let (re, im) = self.arch.complex128(&buf);
                        if im.is_sign_negative() {
                            let _ = write!(self.buf, "({re}-{}i)", -im);
                        } else {
                            let _ = write!(self.buf, "({re}+{im}i)");
                        }
                    }
                    _ => self.fail(PrintError::BadComplexSize(size)),
                }
            }
            TypeKind::Struct(layout) => {
                if layout.kind != StructKind::Struct {
                    // Could be a class or a union.
                    self.fail(PrintError::UnhandledStructKind(layout.kind.as_str()));
                    return;
                }
                let _ = write!(self.buf, "{} {{", g.display(ty));
                for (i, field) in layout.fields.iter().enumerate() {
                    if i != 0 {
                        self.buf.push_str(", ");
                    }
                    self.print_value_at(g, field.ty, a.wrapping_add(field.byte_offset as u64));
                }
                self.buf.push('}');
            }
            TypeKind::Array {
                elem,
                stride_bits,
                count,
            } => self.print_array_at(g, ty, *elem, *stride_bits, *count, a),
            TypeKind::Interface { inner } => self.print_interface_at(g, *inner, a),
            TypeKind::Map { key, elem, .. } => self.print_map_at(g, *key, *elem, a),
            TypeKind::Chan { inner, elem } => self.print_channel_at(g, *inner, *elem, a),
            TypeKind::Slice { header, elem } => self.print_slice_at(g, ty, header, *elem, a),
            TypeKind::Str { header } => self.print_string_at(header, a),
            TypeKind::Typedef { inner } => self.print_value_at(g, *inner, a),
            TypeKind::Func { .. } => {
                let _ = write!(self.buf, "{} @{a:#x} ", g.display(ty));
            }
            TypeKind::Void => self.buf.push_str("void"),
            TypeKind::Basic { .. } | TypeKind::Qual { .. } | TypeKind::Enum { .. }
            | TypeKind::DotDotDot => {
                self.fail(PrintError::UnhandledType(g.display(ty).to_string()))
            }
        }
    }

    fn print_array_at(
        &mut self,
        g: &TypeGraph,
        ty: TypeId,
        elem: TypeId,
        stride_bits: i64,
        count: i64,
        a: u64,
    ) {
        let stride = if stride_bits > 0 {
            (stride_bits / 8) as u64
        } else {
            match self.value_size(g, elem) {
                Some(size) => size,
                None => {
                    self.fail(PrintError::UnknownElementSize);
                    0
                }
            }
        };
        let _ = write!(self.buf, "{}{{", g.display(ty));
        let n = count.min(MAX_ARRAY_VALUES_TO_PRINT);
        let mut addr = a;
        for i in 0..n {
            if i != 0 {
                self.buf.push_str(", ");
            }
            self.print_value_at(g, elem, addr);
            addr = addr.wrapping_add(stride);
        }
        if n < count {
            self.buf.push_str(", ...");
        }
        self.buf.push('}');
    }

    fn print_slice_at(
        &mut self,
        g: &TypeGraph,
        ty: TypeId,
        header: &StructLayout,
        elem: TypeId,
        a: u64,
    ) {
        // The runtime header is a struct with fields array, len, cap.
        let mut ptr = match self.mem.peek_ptr_struct_field(header, a, "array") {
            Ok(p) => p,
            Err(err) => {
                self.fail(PrintError::Oracle {
                    context: "reading slice",
                    source: err,
                });
                return;
            }
        };
        let length = match self.mem.peek_uint_or_int_struct_field(header, a, "len") {
            Ok(l) => l,
            Err(err) => {
                self.fail(PrintError::Oracle {
                    context: "reading slice",
                    source: err,
                });
                return;
            }
        };
        // Capacity is validated but not otherwise used.
        if let Err(err) = self.mem.peek_uint_or_int_struct_field(header, a, "cap") {
            self.fail(PrintError::Oracle {
                context: "reading slice",
                source: err,
            });
            return;
        }
        let size = match self.value_size(g, elem) {
            Some(size) => size,
            None => {
                self.fail(PrintError::UnknownElementSize);
                0
            }
        };
        let _ = write!(self.buf, "{}{{", g.display(ty));
        for i in 0..length {
            if i != 0 {
                self.buf.push_str(", ");
            }
            self.print_value_at(g, elem, ptr);
            ptr = ptr.wrapping_add(size);
        }
        self.buf.push('}');
    }

    fn print_string_at(&mut self, header: &StructLayout, a: u64) {
        match self.mem.peek_string(header, a, MAX_STRING_SIZE) {
            Ok(s) => {
                let _ = write!(self.buf, "{s:?}");
            }
            Err(err) => self.fail(PrintError::Oracle {
                context: "reading string",
                source: err,
            }),
        }
    }

    fn print_map_at(&mut self, g: &TypeGraph, key: TypeId, elem: TypeId, a: u64) {
        self.buf.push_str("map[");
        let mem = self.mem;
        let mut count: u64 = 0;
        let result = mem.peek_map_values(key, elem, a, &mut |key_addr, val_addr, kt, vt| {
            count += 1;
            if count > MAX_MAP_VALUES_TO_PRINT {
                return false;
            }
            if count > 1 {
                self.buf.push(' ');
            }
            self.print_value_at(g, kt, key_addr);
            self.buf.push(':');
            self.print_value_at(g, vt, val_addr);
            true
        });
        if let Err(err) = result {
            self.fail(PrintError::Oracle {
                context: "reading map values",
                source: err,
            });
        }
        if count > MAX_MAP_VALUES_TO_PRINT {
            self.buf.push_str(" ...");
        }
        self.buf.push(']');
    }

    fn print_channel_at(&mut self, g: &TypeGraph, inner: TypeId, elem: TypeId, a: u64) {
        let _ = write!(self.buf, "(chan {} ", g.display(elem));
        self.channel_value_at(g, inner, a);
        self.buf.push(')');
    }

    fn channel_value_at(&mut self, g: &TypeGraph, inner: TypeId, a: u64) {
        let a = match self.mem.peek_ptr(a) {
            Ok(p) => p,
            Err(err) => {
                self.fail(PrintError::Oracle {
                    context: "reading channel",
                    source: err,
                });
                return;
            }
        };
        if a == 0 {
            self.buf.push_str("<nil>");
            return;
        }
        let _ = write!(self.buf, "{a:#x}");

        // The channel variant is a typedef for a pointer to a struct.
        let layout = match &g.node(inner).kind {
            TypeKind::Ptr { pointee } => match &g.node(*pointee).kind {
                TypeKind::Struct(layout) => layout,
                _ => {
                    self.fail(PrintError::BadChannelLayout {
                        reason: "not a pointer to a struct",
                    });
                    return;
                }
            },
            _ => {
                self.fail(PrintError::BadChannelLayout {
                    reason: "not a pointer",
                });
                return;
            }
        };

        // Print the buffer's length (qcount) and capacity (dataqsiz), if not
        // 0/0.
        let qcount = match self.mem.peek_uint_or_int_struct_field(layout, a, "qcount") {
            Ok(v) => v,
            Err(err) => {
                self.fail(PrintError::Oracle {
                    context: "reading channel",
                    source: err,
                });
                return;
            }
        };
        let dataqsiz = match self.mem.peek_uint_or_int_struct_field(layout, a, "dataqsiz") {
            Ok(v) => v,
            Err(err) => {
                self.fail(PrintError::Oracle {
                    context: "reading channel",
                    source: err,
                });
                return;
            }
        };
        if qcount != 0 || dataqsiz != 0 {
            let _ = write!(self.buf, " [{qcount}/{dataqsiz}]");
        }
    }

    fn print_interface_at(&mut self, g: &TypeGraph, inner: TypeId, a: u64) {
        // The interface variant is a typedef binding a typedef binding a
        // struct with fields tab and data.
        let td = match &g.node(inner).kind {
            TypeKind::Typedef { inner } => *inner,
            _ => {
                self.fail(PrintError::BadInterfaceLayout {
                    reason: "not a typedef",
                });
                return;
            }
        };
        let layout = match &g.node(td).kind {
            TypeKind::Struct(layout) => layout,
            _ => {
                self.fail(PrintError::BadInterfaceLayout {
                    reason: "not a typedef of a struct",
                });
                return;
            }
        };
        self.buf.push('(');
        match self.mem.peek_ptr_struct_field(layout, a, "tab") {
            Err(err) => self.fail(PrintError::Oracle {
                context: "reading interface type",
                source: err,
            }),
            Ok(tab) => match get_field(layout, "tab") {
                Err(err) => self.fail(err),
                Ok(field) => self.print_type_of_interface(g, field.ty, tab),
            },
        }
        self.buf.push_str(", ");
        match self.mem.peek_ptr_struct_field(layout, a, "data") {
            Err(err) => self.fail(PrintError::Oracle {
                context: "reading interface value",
                source: err,
            }),
            Ok(0) => self.buf.push_str("<nil>"),
            Ok(data) => {
                let _ = write!(self.buf, "{data:#x}");
            }
        }
        self.buf.push(')');
    }

    /// Print the name of the type the interface's tab pointer refers to.
    ///
    /// The tab field points at a typedef of a struct whose `_type` field
    /// points at a typedef of a struct whose `_string` field points at the
    /// name of the type.
    fn print_type_of_interface(&mut self, g: &TypeGraph, ty: TypeId, a: u64) {
        if a == 0 {
            self.buf.push_str("<nil>");
            return;
        }
        let td = match &g.node(ty).kind {
            TypeKind::Ptr { pointee } => *pointee,
            _ => {
                self.fail(PrintError::BadInterfaceLayout {
                    reason: "tab is not a pointer",
                });
                return;
            }
        };
        let st = match &g.node(td).kind {
            TypeKind::Typedef { inner } => *inner,
            _ => {
                self.fail(PrintError::BadInterfaceLayout {
                    reason: "tab does not point at a typedef",
                });
                return;
            }
        };
        let tab_layout = match &g.node(st).kind {
            TypeKind::Struct(layout) => layout,
            _ => {
                self.fail(PrintError::BadInterfaceLayout {
                    reason: "tab typedef is not a struct",
                });
                return;
            }
        };
        let type_field = match get_field(tab_layout, "_type") {
            Ok(f) => f,
            Err(err) => {
                self.fail(err);
                return;
            }
        };
        let td2 = match &g.node(type_field.ty).kind {
            TypeKind::Ptr { pointee } => *pointee,
            _ => {
                self.fail(PrintError::BadInterfaceLayout {
                    reason: "_type is not a pointer",
                });
                return;
            }
        };
        let st2 = match &g.node(td2).kind {
            TypeKind::Typedef { inner } => *inner,
            _ => {
                self.fail(PrintError::BadInterfaceLayout {
                    reason: "_type does not point at a typedef",
                });
                return;
            }
        };
        let type_layout = match &g.node(st2).kind {
            TypeKind::Struct(layout) => layout,
            _ => {
                self.fail(PrintError::BadInterfaceLayout {
                    reason: "_type typedef is not a struct",
                });
                return;
            }
        };
        let string_field = match get_field(type_layout, "_string") {
            Ok(f) => f,
            Err(err) => {
                self.fail(err);
                return;
            }
        };
        let string_header = match &g.node(string_field.ty).kind {
            TypeKind::Ptr { pointee } => match &g.node(*pointee).kind {
                TypeKind::Str { header } => header,
                _ => {
                    self.fail(PrintError::BadInterfaceLayout {
                        reason: "_string does not point at a string",
                    });
                    return;
                }
            },
            _ => {
                self.fail(PrintError::BadInterfaceLayout {
                    reason: "_string is not a pointer",
                });
                return;
            }
        };
        let type_addr = match self.mem.peek_ptr_struct_field(tab_layout, a, "_type") {
            Ok(p) => p,
            Err(err) => {
                self.fail(PrintError::Oracle {
                    context: "reading interface type",
                    source: err,
                });
                return;
            }
        };
        let string_addr = match self.mem.peek_ptr_struct_field(type_layout, type_addr, "_string") {
            Ok(p) => p,
            Err(err) => {
                self.fail(PrintError::Oracle {
                    context: "reading interface type",
                    source: err,
                });
                return;
            }
        };
        trace!(type_addr, string_addr, "resolved interface type name");
        self.print_string_at(string_header, string_addr);
    }

    /// The byte size of a value of the type, for element strides. Falls back
    /// to the pointer width for pointers with unrecorded sizes; that is the
    /// only fallback we know of, but more may arise.
    fn value_size(&self, g: &TypeGraph, ty: TypeId) -> Option<u64> {
        let size = g.size_of(ty);
        if size >= 0 {
            return Some(size as u64);
        }
        match g.node(ty).kind {
            TypeKind::Ptr { .. } => Some(self.arch.pointer_size as u64),
            _ => None,
        }
    }
}

/// Find the unique field named `name` in a structural layout.
fn get_field<'l>(layout: &'l StructLayout, name: &str) -> Result<&'l StructField, PrintError> {
    let mut found = None;
    for field in &layout.fields {
        if field.name == name {
            if found.is_some() {
                return Err(PrintError::RepeatedField(name.to_string()));
            }
            found = Some(field);
        }
    }
    found.ok_or_else(|| PrintError::MissingField(name.to_string()))
}
