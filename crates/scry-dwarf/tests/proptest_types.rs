//! Property-based tests for the type model and decoder.
//!
//! These verify structural invariants rather than specific values:
//! - Display never emits a newline and never renders empty
//! - Decoding is identity-by-offset: decode(off) == decode(off)
//! - Member declaration order and offset monotonicity survive decoding

mod common;

use common::{entry, int32_entry, ival, null, reference, sval, VecReader};
use proptest::prelude::*;
use scry_dwarf::{
    BasicClass, DwAt, DwTag, EnumValue, Qualifier, ReflectKind, StructField, StructKind,
    StructLayout, TypeGraph, TypeId, TypeKind, TypeNode,
};

// =============================================================================
// Type Generators
// =============================================================================

/// A buildable description of a type tree.
#[derive(Debug, Clone)]
enum TypePlan {
    Base(String),
    Void,
    Ptr(Box<TypePlan>),
    Array(i64, Box<TypePlan>),
    Qual(Qualifier, Box<TypePlan>),
    Struct(String, Vec<(String, TypePlan)>),
    Enum(Vec<(String, i64)>),
    Func(Vec<TypePlan>, Box<TypePlan>),
    Typedef(String, Box<TypePlan>),
}

fn arb_ident() -> impl Strategy<Value = String> {
    "[a-z][a-z0-9_]{0,7}"
}

fn arb_plan() -> impl Strategy<Value = TypePlan> {
    let leaf = prop_oneof![
        arb_ident().prop_map(TypePlan::Base),
        Just(TypePlan::Void),
        (
            proptest::collection::vec((arb_ident(), -1000i64..1000), 0..4)
        )
            .prop_map(TypePlan::Enum),
    ];

    leaf.prop_recursive(
        3,  // depth
        24, // max nodes
        6,  // items per collection
        |inner| {
            prop_oneof![
                inner.clone().prop_map(|t| TypePlan::Ptr(Box::new(t))),
                (-1i64..100, inner.clone())
                    .prop_map(|(n, t)| TypePlan::Array(n, Box::new(t))),
                (
                    prop::sample::select(vec![
                        Qualifier::Const,
                        Qualifier::Restrict,
                        Qualifier::Volatile
                    ]),
                    inner.clone()
                )
                    .prop_map(|(q, t)| TypePlan::Qual(q, Box::new(t))),
                (
                    arb_ident(),
                    proptest::collection::vec((arb_ident(), inner.clone()), 0..4)
                )
                    .prop_map(|(name, fields)| TypePlan::Struct(name, fields)),
                (
                    proptest::collection::vec(inner.clone(), 0..4),
                    inner.clone()
                )
                    .prop_map(|(params, ret)| TypePlan::Func(params, Box::new(ret))),
                (arb_ident(), inner.clone())
                    .prop_map(|(name, t)| TypePlan::Typedef(name, Box::new(t))),
            ]
        },
    )
}

fn build(g: &mut TypeGraph, plan: &TypePlan) -> TypeId {
    let node = |kind, name: &str, byte_size| TypeNode {
        byte_size,
        name: name.to_string(),
        kind_hint: ReflectKind::Invalid,
        offset: 0,
        kind,
    };
    match plan {
        TypePlan::Base(name) => g.insert(node(
            TypeKind::Basic {
                class: BasicClass::Int,
                bit_size: 0,
                bit_offset: 0,
            },
            name,
            4,
        )),
        TypePlan::Void => g.insert_void(),
        TypePlan::Ptr(inner) => {
            let pointee = build(g, inner);
            g.insert(node(TypeKind::Ptr { pointee }, "", 8))
        }
        TypePlan::Array(count, inner) => {
            let elem = build(g, inner);
            g.insert(node(
                TypeKind::Array {
                    elem,
                    stride_bits: 0,
                    count: *count,
                },
                "",
                -1,
            ))
        }
        TypePlan::Qual(q, inner) => {
            let inner = build(g, inner);
            g.insert(node(TypeKind::Qual { qual: *q, inner }, "", -1))
        }
        TypePlan::Struct(name, fields) => {
            let mut offset = 0;
            let fields = fields
                .iter()
                .map(|(fname, fplan)| {
                    let ty = build(g, fplan);
                    let f = StructField {
                        name: fname.clone(),
                        ty,
                        byte_offset: offset,
                        byte_size: 8,
                        bit_offset: 0,
                        bit_size: 0,
                    };
                    offset += 8;
                    f
                })
                .collect();
            g.insert(node(
                TypeKind::Struct(StructLayout {
                    kind: StructKind::Struct,
                    struct_name: name.clone(),
                    fields,
                    incomplete: false,
                }),
                "",
                -1,
            ))
        }
        TypePlan::Enum(values) => g.insert(node(
            TypeKind::Enum {
                enum_name: String::new(),
                values: values
                    .iter()
                    .map(|(n, v)| EnumValue {
                        name: n.clone(),
                        value: *v,
                    })
                    .collect(),
            },
            "",
            4,
        )),
        TypePlan::Func(params, ret) => {
            let params = params.iter().map(|p| build(g, p)).collect();
            let ret = build(g, ret);
            g.insert(node(TypeKind::Func { ret, params }, "", -1))
        }
        TypePlan::Typedef(name, inner) => {
            let inner = build(g, inner);
            g.insert(node(TypeKind::Typedef { inner }, name, -1))
        }
    }
}

// =============================================================================
// Display Properties
// =============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(512))]

    /// Display output is single-line and non-empty for every type shape.
    #[test]
    fn display_is_single_line_and_nonempty(plan in arb_plan()) {
        let mut g = TypeGraph::new();
        let id = build(&mut g, &plan);
        let s = g.display(id).to_string();
        prop_assert!(!s.is_empty(), "display of {plan:?} is empty");
        prop_assert!(!s.contains('\n'), "display of {plan:?} contains a newline: {s:?}");
    }

    /// A pointer display is always "*" followed by the pointee display.
    #[test]
    fn pointer_display_prefixes_star(plan in arb_plan()) {
        let mut g = TypeGraph::new();
        let pointee = build(&mut g, &plan);
        let ptr = g.insert(TypeNode {
            byte_size: 8,
            name: String::new(),
            kind_hint: ReflectKind::Invalid,
            offset: 0,
            kind: TypeKind::Ptr { pointee },
        });
        let expected = format!("*{}", g.display(pointee));
        prop_assert_eq!(g.display(ptr).to_string(), expected);
    }
}

// =============================================================================
// Decoder Properties
// =============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    /// Decoding the same offset twice yields the same node.
    #[test]
    fn decode_is_identity_by_offset(count in 1usize..8) {
        let entries: Vec<_> = (0..count)
            .map(|i| int32_entry(1 + i as u64, &format!("t{i}")))
            .collect();
        let mut r = VecReader::new(entries);
        let mut g = TypeGraph::new();
        for i in 0..count {
            let off = 1 + i as u64;
            let a = g.type_at(&mut r, off).unwrap();
            let b = g.type_at(&mut r, off).unwrap();
            prop_assert_eq!(a, b);
        }
        prop_assert_eq!(g.len(), count);
    }

    /// Member order and offset monotonicity survive decoding for
    /// bitfield-free structs.
    #[test]
    fn member_offsets_stay_nondecreasing(raw in proptest::collection::vec(0i64..4096, 1..12)) {
        let mut offsets = raw;
        offsets.sort_unstable();

        let mut entries = vec![entry(
            1,
            DwTag::StructType,
            true,
            vec![(DwAt::Name, sval("g"))],
        )];
        for (i, off) in offsets.iter().enumerate() {
            entries.push(entry(
                2 + i as u64,
                DwTag::Member,
                false,
                vec![
                    (DwAt::Name, sval(&format!("f{i}"))),
                    (DwAt::Type, reference(1000)),
                    (DwAt::DataMemberLoc, ival(*off)),
                ],
            ));
        }
        entries.push(null(2 + offsets.len() as u64));
        entries.push(int32_entry(1000, "int32"));

        let mut r = VecReader::new(entries);
        let mut g = TypeGraph::new();
        let s = g.type_at(&mut r, 1).unwrap();
        let layout = match &g.node(s).kind {
            TypeKind::Struct(layout) => layout,
            other => panic!("expected struct, got {other:?}"),
        };
        prop_assert_eq!(layout.fields.len(), offsets.len());
        for (i, f) in layout.fields.iter().enumerate() {
            prop_assert_eq!(&f.name, &format!("f{i}"));
            prop_assert_eq!(f.byte_offset, offsets[i]);
        }
        for pair in layout.fields.windows(2) {
            prop_assert!(pair[0].byte_offset <= pair[1].byte_offset);
        }
    }
}
