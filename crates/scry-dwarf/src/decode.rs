//! The type decoder: materializes [`TypeGraph`] nodes from DIEs.
//!
//! Decoding is recursive over offset references, which may point forward,
//! backward, or at the entry currently being decoded. The cache entry for an
//! offset is inserted before any recursion, so cyclic references resolve to
//! the node under construction; a failed decode evicts its cache entry so
//! partial types never leak.

use tracing::trace;

use crate::cursor::ChildCursor;
use crate::entry::{AttrValue, DwAt, DwAte, DwTag, Entry, EntryReader, Offset, ReflectKind};
use crate::error::DecodeError;
use crate::location::member_offset;
use crate::model::{
    BasicClass, EnumValue, Qualifier, StructField, StructKind, StructLayout, TypeGraph, TypeId,
    TypeKind, TypeNode,
};

impl TypeGraph {
    /// Read the type at `off` in the DWARF `info` section.
    pub fn type_at<R: EntryReader>(
        &mut self,
        r: &mut R,
        off: Offset,
    ) -> Result<TypeId, DecodeError> {
        read_type("info", r, off, self)
    }
}

/// Read a type from `r` at `off` of the named section, using and updating
/// the graph's offset cache.
pub fn read_type<R: EntryReader>(
    section: &'static str,
    r: &mut R,
    off: Offset,
    graph: &mut TypeGraph,
) -> Result<TypeId, DecodeError> {
    if let Some(id) = graph.lookup_offset(off) {
        trace!(offset = off, "type cache hit");
        return Ok(id);
    }
    r.seek(off);
    let address_size = r.address_size();
    let e = match r.next()? {
        Some(e) if e.offset == off => e,
        _ => return Err(DecodeError::NoTypeAtOffset { section, offset: off }),
    };
    trace!(offset = off, tag = ?e.tag, "decoding type");

    // The variant payload is filled in below; what matters now is that the
    // node exists and is cached before any recursion, so cyclic references
    // resolve to it.
    let id = graph.insert(TypeNode {
        byte_size: -1,
        name: String::new(),
        kind_hint: e.reflect_kind(),
        offset: off,
        kind: TypeKind::Void,
    });
    graph.cache_insert(off, id);

    match decode_entry(section, r, graph, &e, id, address_size) {
        Ok(()) => Ok(id),
        Err(err) => {
            // Take the failed skeleton out of the cache so that a retry at
            // this offset doesn't hit it and return success.
            graph.cache_evict(off);
            Err(err)
        }
    }
}

/// Resolve the type referenced by an entry's attribute: an offset recurses on
/// a cloned reader, a type-unit signature goes through the graph's registry,
/// and a missing attribute means void.
fn type_of<R: EntryReader>(
    section: &'static str,
    r: &R,
    graph: &mut TypeGraph,
    e: &Entry,
    at: DwAt,
) -> Result<TypeId, DecodeError> {
    match e.attr(at) {
        Some(AttrValue::Reference(toff)) => {
            let toff = *toff;
            let mut sub = r.clone();
            read_type(section, &mut sub, toff, graph)
        }
        Some(AttrValue::Signature(sig)) => {
            graph
                .signature(*sig)
                .ok_or(DecodeError::UnknownSignature {
                    section,
                    offset: e.offset,
                    signature: *sig,
                })
        }
        _ => Ok(graph.insert_void()),
    }
}

fn decode_entry<R: EntryReader>(
    section: &'static str,
    r: &mut R,
    graph: &mut TypeGraph,
    e: &Entry,
    id: TypeId,
    address_size: i64,
) -> Result<(), DecodeError> {
    match e.tag {
        DwTag::ArrayType => decode_array(section, r, graph, e, id)?,
        DwTag::BaseType => decode_base(section, graph, e, id)?,
        DwTag::ClassType | DwTag::StructType | DwTag::UnionType => {
            decode_struct(section, r, graph, e, id)?
        }
        DwTag::ConstType | DwTag::VolatileType | DwTag::RestrictType => {
            decode_qual(section, r, graph, e, id)?
        }
        DwTag::EnumerationType => decode_enum(section, r, graph, e, id)?,
        DwTag::PointerType => decode_ptr(section, r, graph, e, id)?,
        DwTag::SubroutineType => decode_func(section, r, graph, e, id)?,
        DwTag::Typedef => decode_typedef(section, r, graph, e, id)?,
        DwTag::UnspecifiedType => {
            let node = graph.node_mut(id);
            node.name = e.name().unwrap_or_default().to_string();
            node.kind = TypeKind::Basic {
                class: BasicClass::Unspecified,
                bit_size: 0,
                bit_offset: 0,
            };
        }
        _ => {
            return Err(DecodeError::NoTypeAtOffset {
                section,
                offset: e.offset,
            })
        }
    }

    // Resolve the byte size: the explicit attribute if present; otherwise
    // typedef-shaped types take the size of what they wrap, pointers take the
    // compilation unit's address size, and everything else is unknown.
    let byte_size = match e.ival(DwAt::ByteSize) {
        Some(b) => b,
        None => match &graph.node(id).kind {
            TypeKind::Typedef { inner }
            | TypeKind::Map { inner, .. }
            | TypeKind::Chan { inner, .. }
            | TypeKind::Interface { inner } => graph.size_of(*inner),
            TypeKind::Ptr { .. } => address_size,
            _ => -1,
        },
    };
    graph.node_mut(id).byte_size = byte_size;
    Ok(())
}

/// Multi-dimensional array (DWARF v2 §5.4). Dimensions come from child
/// subrange entries in left-to-right order; the first becomes this array's
/// count and each further one wraps the element in a fresh inner array.
fn decode_array<R: EntryReader>(
    section: &'static str,
    r: &mut R,
    graph: &mut TypeGraph,
    e: &Entry,
    id: TypeId,
) -> Result<(), DecodeError> {
    let elem = type_of(section, r, graph, e, DwAt::Type)?;

    let stride_bits = if let Some(bytes) = e.ival(DwAt::Stride) {
        8 * bytes
    } else if let Some(bits) = e.ival(DwAt::StrideSize) {
        bits
    } else {
        // No stride specified; assume the element type's size.
        8 * graph.size_of(elem)
    };

    let mut count = -1i64;
    let mut elem_ty = elem;
    let mut ndim = 0usize;
    let mut cursor = ChildCursor::new(section, r, e.has_children);
    while let Some(kid) = cursor.next_child()? {
        match kid.tag {
            DwTag::SubrangeType => {
                let c = match kid.ival(DwAt::Count) {
                    Some(c) => c,
                    // Old binaries may carry an upper bound instead; the
                    // length is one more than the bound.
                    None => match kid.ival(DwAt::UpperBound) {
                        Some(u) => u + 1,
                        None => -1, // as in x[]
                    },
                };
                if ndim == 0 {
                    count = c;
                } else {
                    elem_ty = graph.insert(TypeNode {
                        byte_size: 0,
                        name: String::new(),
                        kind_hint: ReflectKind::Invalid,
                        offset: 0,
                        kind: TypeKind::Array {
                            elem: elem_ty,
                            stride_bits: 0,
                            count: c,
                        },
                    });
                }
                ndim += 1;
            }
            DwTag::EnumerationType => {
                return Err(DecodeError::BadArrayBound {
                    section,
                    offset: kid.offset,
                })
            }
            _ => {}
        }
    }
    // LLVM emits no subrange at all for x[].

    graph.node_mut(id).kind = TypeKind::Array {
        elem: elem_ty,
        stride_bits,
        count,
    };
    Ok(())
}

/// Basic type (DWARF v2 §5.1).
fn decode_base(
    section: &'static str,
    graph: &mut TypeGraph,
    e: &Entry,
    id: TypeId,
) -> Result<(), DecodeError> {
    let mut name = e.name().unwrap_or_default().to_string();
    let enc = e
        .ival(DwAt::Encoding)
        .ok_or_else(|| DecodeError::MissingEncoding {
            section,
            offset: e.offset,
            type_name: name.clone(),
        })?;
    let class = match DwAte::from(enc) {
        DwAte::Address => BasicClass::Addr,
        DwAte::Boolean => BasicClass::Bool,
        DwAte::ComplexFloat => BasicClass::Complex,
        DwAte::Float => BasicClass::Float,
        DwAte::Signed => BasicClass::Int,
        DwAte::Unsigned => BasicClass::Uint,
        DwAte::SignedChar => BasicClass::Char,
        DwAte::UnsignedChar => BasicClass::Uchar,
        DwAte::Unknown(_) => {
            return Err(DecodeError::BadEncoding {
                section,
                offset: e.offset,
                encoding: enc,
            })
        }
    };
    if class == BasicClass::Complex && name == "complex" {
        // clang writes out 'complex' instead of 'complex float' or
        // 'complex double', but the byte size disambiguates.
        match e.ival(DwAt::ByteSize) {
            Some(8) => name = "complex float".to_string(),
            Some(16) => name = "complex double".to_string(),
            _ => {}
        }
    }

    let node = graph.node_mut(id);
    node.name = name;
    node.kind = TypeKind::Basic {
        class,
        bit_size: e.ival(DwAt::BitSize).unwrap_or(0),
        bit_offset: e.ival(DwAt::BitOffset).unwrap_or(0),
    };
    Ok(())
}

/// Struct, union, or class (DWARF v2 §5.5) — also slices and strings, which
/// the compiler marks with the reflect-kind hint.
fn decode_struct<R: EntryReader>(
    section: &'static str,
    r: &mut R,
    graph: &mut TypeGraph,
    e: &Entry,
    id: TypeId,
) -> Result<(), DecodeError> {
    let kind = match e.tag {
        DwTag::ClassType => StructKind::Class,
        DwTag::UnionType => StructKind::Union,
        _ => StructKind::Struct,
    };
    let hint = e.reflect_kind();
    let slice_elem = if hint == ReflectKind::Slice {
        Some(type_of(section, r, graph, e, DwAt::GoElem)?)
    } else {
        None
    };
    let struct_name = e.name().unwrap_or_default().to_string();
    let incomplete = e.has(DwAt::Declaration);

    let mut fields: Vec<StructField> = Vec::new();
    let mut last_field_ty: Option<TypeId> = None;
    let mut last_field_bit_offset: i64 = 0;
    let mut cursor = ChildCursor::new(section, r, e.has_children);
    while let Some(kid) = cursor.next_child()? {
        if kid.tag != DwTag::Member {
            continue;
        }
        let fty = type_of(section, cursor.reader(), graph, &kid, DwAt::Type)?;
        let byte_offset = match kid.attr(DwAt::DataMemberLoc) {
            Some(AttrValue::Block(loc)) => member_offset(loc, section, kid.offset)?,
            Some(AttrValue::Signed(v)) => *v,
            _ => 0,
        };
        let bit_offset_attr = kid.ival(DwAt::BitOffset);
        let field = StructField {
            name: kid.name().unwrap_or_default().to_string(),
            ty: fty,
            byte_offset,
            byte_size: kid.ival(DwAt::ByteSize).unwrap_or(0),
            bit_offset: bit_offset_attr.unwrap_or(0),
            bit_size: kid.ival(DwAt::BitSize).unwrap_or(0),
        };

        let bito = bit_offset_attr.unwrap_or(field.byte_offset * 8);
        if bito == last_field_bit_offset && kind != StructKind::Union {
            // The previous field was zero width: DWARF writes out 0-length
            // arrays as if they were 1-length arrays.
            if let Some(prev) = last_field_ty {
                graph.zero_array(prev);
            }
        }
        last_field_ty = Some(field.ty);
        last_field_bit_offset = bito;
        fields.push(field);
    }
    if kind != StructKind::Union {
        if let Some(b) = e.ival(DwAt::ByteSize) {
            if b * 8 == last_field_bit_offset {
                // The final field must be zero width.
                if let Some(prev) = last_field_ty {
                    graph.zero_array(prev);
                }
            }
        }
    }

    let layout = StructLayout {
        kind,
        struct_name,
        fields,
        incomplete,
    };
    graph.node_mut(id).kind = match (hint, slice_elem) {
        (ReflectKind::Slice, Some(elem)) => TypeKind::Slice {
            header: layout,
            elem,
        },
        (ReflectKind::String, _) => TypeKind::Str { header: layout },
        _ => TypeKind::Struct(layout),
    };
    Ok(())
}

/// Type qualifier (DWARF v2 §5.2).
fn decode_qual<R: EntryReader>(
    section: &'static str,
    r: &mut R,
    graph: &mut TypeGraph,
    e: &Entry,
    id: TypeId,
) -> Result<(), DecodeError> {
    let inner = type_of(section, r, graph, e, DwAt::Type)?;
    let qual = match e.tag {
        DwTag::RestrictType => Qualifier::Restrict,
        DwTag::VolatileType => Qualifier::Volatile,
        _ => Qualifier::Const,
    };
    graph.node_mut(id).kind = TypeKind::Qual { qual, inner };
    Ok(())
}

/// Enumeration type (DWARF v2 §5.6).
fn decode_enum<R: EntryReader>(
    section: &'static str,
    r: &mut R,
    graph: &mut TypeGraph,
    e: &Entry,
    id: TypeId,
) -> Result<(), DecodeError> {
    let enum_name = e.name().unwrap_or_default().to_string();
    let mut values = Vec::new();
    let mut cursor = ChildCursor::new(section, r, e.has_children);
    while let Some(kid) = cursor.next_child()? {
        if kid.tag != DwTag::Enumerator {
            continue;
        }
        values.push(EnumValue {
            name: kid.name().unwrap_or_default().to_string(),
            value: kid.ival(DwAt::ConstValue).unwrap_or(0),
        });
    }
    graph.node_mut(id).kind = TypeKind::Enum { enum_name, values };
    Ok(())
}

/// Pointer type (DWARF v2 §5.2). `void*` carries no type attribute.
fn decode_ptr<R: EntryReader>(
    section: &'static str,
    r: &mut R,
    graph: &mut TypeGraph,
    e: &Entry,
    id: TypeId,
) -> Result<(), DecodeError> {
    let pointee = type_of(section, r, graph, e, DwAt::Type)?;
    graph.node_mut(id).kind = TypeKind::Ptr { pointee };
    Ok(())
}

/// Subroutine type (DWARF v2 §5.7).
fn decode_func<R: EntryReader>(
    section: &'static str,
    r: &mut R,
    graph: &mut TypeGraph,
    e: &Entry,
    id: TypeId,
) -> Result<(), DecodeError> {
    let ret = type_of(section, r, graph, e, DwAt::Type)?;
    let mut params = Vec::new();
    let mut cursor = ChildCursor::new(section, r, e.has_children);
    while let Some(kid) = cursor.next_child()? {
        let param = match kid.tag {
            DwTag::FormalParameter => type_of(section, cursor.reader(), graph, &kid, DwAt::Type)?,
            DwTag::UnspecifiedParameters => graph.insert(TypeNode {
                byte_size: 0,
                name: String::new(),
                kind_hint: ReflectKind::Invalid,
                offset: 0,
                kind: TypeKind::DotDotDot,
            }),
            _ => continue,
        };
        params.push(param);
    }
    graph.node_mut(id).kind = TypeKind::Func { ret, params };
    Ok(())
}

/// Typedef (DWARF v2 §5.3) — also maps, channels, and interfaces, which the
/// compiler emits as typedefs of their runtime representation.
fn decode_typedef<R: EntryReader>(
    section: &'static str,
    r: &mut R,
    graph: &mut TypeGraph,
    e: &Entry,
    id: TypeId,
) -> Result<(), DecodeError> {
    let kind = match e.reflect_kind() {
        ReflectKind::Map => {
            let key = type_of(section, r, graph, e, DwAt::GoKey)?;
            let elem = type_of(section, r, graph, e, DwAt::GoElem)?;
            let inner = type_of(section, r, graph, e, DwAt::Type)?;
            TypeKind::Map { inner, key, elem }
        }
        ReflectKind::Chan => {
            let elem = type_of(section, r, graph, e, DwAt::GoElem)?;
            let inner = type_of(section, r, graph, e, DwAt::Type)?;
            TypeKind::Chan { inner, elem }
        }
        ReflectKind::Interface => {
            let inner = type_of(section, r, graph, e, DwAt::Type)?;
            TypeKind::Interface { inner }
        }
        _ => {
            let inner = type_of(section, r, graph, e, DwAt::Type)?;
            TypeKind::Typedef { inner }
        }
    };
    let node = graph.node_mut(id);
    node.name = e.name().unwrap_or_default().to_string();
    node.kind = kind;
    Ok(())
}
