use std::collections::BTreeMap;

use crate::Error;
use crate::allocator::ColumnAllocator;
use crate::codec::{CodecKind, ColumnBinary, EncodeContext, MakerRegistry, select_codec};
use crate::column::{Column, PrimitiveStore};
use crate::schema::ColumnType;
use crate::value::{PrimitiveObject, Value};

fn column_of(name: &str, values: &[Value]) -> Column {
    let mut c = Column::new(name);
    for (row, v) in values.iter().enumerate() {
        c.add(v, row).unwrap();
    }
    c
}

fn encode(column: &Column) -> ColumnBinary {
    let registry = MakerRegistry::default();
    EncodeContext::new(&registry).encode(column).unwrap()
}

fn encode_forced(column: &Column, kind: CodecKind) -> ColumnBinary {
    let registry = MakerRegistry::default();
    let mut forced = BTreeMap::new();
    forced.insert(column.name().to_string(), kind);
    let mut ctx = EncodeContext::new(&registry);
    ctx.set_forced_codecs(&forced);
    ctx.encode(column).unwrap()
}

fn decode(binary: &ColumnBinary) -> Column {
    MakerRegistry::default().to_column(binary).unwrap()
}

fn assert_same_rows(expected: &Column, actual: &Column) {
    assert_eq!(expected.len(), actual.len(), "row count");
    for row in 0..expected.len() {
        assert_eq!(expected.get_value(row), actual.get_value(row), "row {row}");
    }
}

fn longs(values: &[Option<i64>]) -> Column {
    let rows: Vec<Value> = values
        .iter()
        .map(|v| v.map_or(Value::Null, Value::from))
        .collect();
    column_of("n", &rows)
}

fn strings(values: &[Option<&str>]) -> Column {
    let rows: Vec<Value> = values
        .iter()
        .map(|v| v.map_or(Value::Null, Value::from))
        .collect();
    column_of("s", &rows)
}

fn sample_columns() -> Vec<Column> {
    vec![
        longs(&[Some(5), None, Some(-3), Some(5), Some(1_000_000), None]),
        strings(&[Some("b"), Some("a"), None, Some("b"), Some("b"), Some("")]),
        column_of(
            "d",
            &[Value::from(1.5f64), Value::Null, Value::from(-0.25f64), Value::from(1.5f64)],
        ),
        column_of(
            "f",
            &[Value::from(true), Value::from(false), Value::Null, Value::from(true)],
        ),
        column_of(
            "b",
            &[Value::from(vec![1u8, 2]), Value::Null, Value::from(Vec::<u8>::new())],
        ),
        column_of("i8", &[Value::from(-128i8), Value::from(127i8), Value::Null]),
        column_of("i16", &[Value::from(-300i16), Value::Null, Value::from(300i16)]),
        column_of("f32", &[Value::from(0.5f32), Value::from(2.0f32), Value::Null]),
    ]
}

#[test]
fn every_scalar_codec_round_trips_what_it_accepts() {
    let registry = MakerRegistry::default();
    for column in sample_columns() {
        for kind in [
            CodecKind::Dump,
            CodecKind::Range,
            CodecKind::Dictionary,
            CodecKind::RunLength,
            CodecKind::NullOptimized,
        ] {
            if !registry.get(kind).unwrap().supports(column.column_type()) {
                continue;
            }
            let binary = encode_forced(&column, kind);
            assert_eq!(binary.codec, kind, "{} forced to {}", column.name(), kind.name());
            let decoded = decode(&binary);
            assert_eq!(decoded.column_type(), column.column_type());
            assert_same_rows(&column, &decoded);
        }
    }
}

#[test]
fn automatic_selection_round_trips() {
    for column in sample_columns() {
        let binary = encode(&column);
        assert_same_rows(&column, &decode(&binary));
        assert_eq!(binary.null_count as usize, column.null_count());
        assert_eq!(binary.row_count as usize, column.len());
    }
}

#[test]
fn constant_column_is_stored_once() {
    let column = longs(&vec![Some(42); 5_000]);
    let binary = encode(&column);
    assert_eq!(binary.codec, CodecKind::Constant);
    assert!(binary.uncompressed_len < 16);
    assert_same_rows(&column, &decode(&binary));
}

#[test]
fn constant_cannot_be_forced_onto_varying_values() {
    let column = longs(&[Some(1), Some(2)]);
    let binary = encode_forced(&column, CodecKind::Constant);
    assert_ne!(binary.codec, CodecKind::Constant);
    assert_same_rows(&column, &decode(&binary));
}

#[test]
fn range_is_not_offered_for_strings() {
    let column = strings(&[Some("x"), Some("y")]);
    let binary = encode_forced(&column, CodecKind::Range);
    assert_ne!(binary.codec, CodecKind::Range);
    assert_same_rows(&column, &decode(&binary));
}

#[test]
fn narrow_integer_span_picks_range_or_better() {
    let values: Vec<Option<i64>> = (0..2_000).map(|i| Some(1_000_000 + (i % 200))).collect();
    let column = longs(&values);
    let kind = select_codec(&column, &MakerRegistry::default()).unwrap();
    assert!(matches!(kind, CodecKind::Range | CodecKind::Dictionary), "{kind:?}");
    assert_same_rows(&column, &decode(&encode(&column)));
}

#[test]
fn all_null_and_empty_columns_round_trip() {
    let all_null = column_of("z", &[Value::Null, Value::Null, Value::Null]);
    let binary = encode(&all_null);
    assert_eq!(binary.codec, CodecKind::Unsupported);
    assert!(binary.payload.is_empty());
    let decoded = decode(&binary);
    assert_eq!(decoded.len(), 3);
    assert_eq!(decoded.null_count(), 3);

    let empty = Column::from_store("e", ColumnType::Long, 0, PrimitiveStore::Plain(Vec::new()));
    for kind in [CodecKind::Dump, CodecKind::RunLength, CodecKind::NullOptimized] {
        let decoded = decode(&encode_forced(&empty, kind));
        assert_eq!(decoded.len(), 0);
    }
}

#[test]
fn typed_all_null_column_can_be_forced() {
    let column = Column::from_store(
        "n",
        ColumnType::Integer,
        4,
        PrimitiveStore::Plain(vec![None; 4]),
    );
    for kind in [CodecKind::Dump, CodecKind::NullOptimized, CodecKind::RunLength] {
        let decoded = decode(&encode_forced(&column, kind));
        assert_eq!(decoded.len(), 4);
        assert_eq!(decoded.null_count(), 4);
    }
}

#[test]
fn sparse_and_far_single_cells_round_trip() {
    let mut sparse = Column::new("s");
    sparse.add(&Value::from(7i64), 3).unwrap();
    sparse.set_len(20);

    let mut far = Column::new("far");
    far.add(&Value::from("last"), 10_001).unwrap();

    for column in [sparse, far] {
        for kind in [
            CodecKind::Dump,
            CodecKind::Dictionary,
            CodecKind::RunLength,
            CodecKind::NullOptimized,
        ] {
            let binary = encode_forced(&column, kind);
            assert_same_rows(&column, &decode(&binary));
        }
        let binary = encode(&column);
        assert_same_rows(&column, &decode(&binary));
    }
}

#[test]
fn far_single_cell_prefers_null_optimized() {
    let mut far = Column::new("far");
    far.add(&Value::from(9i64), 10_001).unwrap();
    assert_eq!(encode(&far).codec, CodecKind::NullOptimized);
}

#[test]
fn nested_columns_round_trip() {
    let rows = vec![
        Value::object([
            ("id", Value::from(1i64)),
            ("tags", Value::Array(vec![Value::from("a"), Value::from("b")])),
        ]),
        Value::Null,
        Value::object([("tags", Value::Array(vec![]))]),
    ];
    let spread_column = column_of("doc", &rows);
    let binary = encode(&spread_column);
    assert_eq!(binary.codec, CodecKind::Spread);
    assert!(binary.child("id").is_some());
    assert_eq!(binary.child("tags").map(|c| c.codec), Some(CodecKind::Array));
    assert_same_rows(&spread_column, &decode(&binary));

    let union_column = column_of(
        "u",
        &[Value::from(1i32), Value::from("x"), Value::Null, Value::from(2i32)],
    );
    let binary = encode(&union_column);
    assert_eq!(binary.codec, CodecKind::Union);
    assert_eq!(binary.children.len(), 2);
    assert_eq!(binary.children[0].row_count, 2);
    assert_same_rows(&union_column, &decode(&binary));
}

#[test]
fn union_members_stay_row_aligned_after_decoding() {
    let column = column_of("u", &[Value::from("x"), Value::from(5i64), Value::Null]);
    let decoded = decode(&encode(&column));
    for c in [&column, &decoded] {
        let long = c.child("LONG").unwrap();
        let string = c.child("STRING").unwrap();
        assert_eq!(long.get_value(1), Value::from(5i64));
        assert!(long.is_null(0));
        assert_eq!(string.get_value(0), Value::from("x"));
        assert!(string.is_null(1));
        assert!(long.is_null(2) && string.is_null(2));
    }

    let taken = decoded.take(&[1, 0]).unwrap();
    assert_eq!(taken.child("LONG").unwrap().get_value(0), Value::from(5i64));
    assert_eq!(taken.child("STRING").unwrap().get_value(1), Value::from("x"));
    assert!(taken.child("LONG").unwrap().is_null(1));
}

#[test]
fn forced_codecs_follow_dotted_paths() {
    let rows = vec![
        Value::object([("id", Value::from(1i64))]),
        Value::object([("id", Value::from(2i64))]),
    ];
    let column = column_of("user", &rows);
    let registry = MakerRegistry::default();
    let mut forced = BTreeMap::new();
    forced.insert("user.id".to_string(), CodecKind::Dump);
    let mut ctx = EncodeContext::new(&registry);
    ctx.set_forced_codecs(&forced);
    let binary = ctx.encode(&column).unwrap();
    assert_eq!(binary.child("id").map(|c| c.codec), Some(CodecKind::Dump));
}

#[test]
fn load_index_over_every_row_is_the_full_column() {
    for column in sample_columns() {
        let mut binary = encode(&column);
        binary.set_load_index((0..column.len() as i64).collect());
        assert_same_rows(&column, &decode(&binary));
    }
}

#[test]
fn load_index_past_the_end_yields_nulls() {
    let column = longs(&[Some(1), Some(2), Some(3)]);
    let mut binary = encode_forced(&column, CodecKind::Dump);
    binary.set_load_index(vec![0, 2, 2, 3, 10]);
    let out = decode(&binary);
    assert_eq!(out.len(), 5);
    assert_eq!(out.get(0).primitive(), Some(&PrimitiveObject::Long(1)));
    assert_eq!(out.get(1).primitive(), Some(&PrimitiveObject::Long(3)));
    assert_eq!(out.get(2).primitive(), Some(&PrimitiveObject::Long(3)));
    assert!(out.get(3).is_null());
    assert!(out.get(4).is_null());
}

#[test]
fn decreasing_or_negative_load_index_is_rejected() {
    let column = longs(&[Some(1), Some(2), Some(3)]);
    let registry = MakerRegistry::default();

    let mut binary = encode(&column);
    binary.set_load_index(vec![2, 1]);
    let err = registry.to_column(&binary).unwrap_err();
    assert_eq!(
        err,
        Error::LoadIndex("index 1 at position 1 is below the previous index 2".to_string())
    );

    binary.set_load_index(vec![-1]);
    let err = registry.to_column(&binary).unwrap_err();
    assert_eq!(err, Error::LoadIndex("negative index -1 at position 0".to_string()));
}

#[test]
fn load_index_applies_to_nested_columns() {
    let rows = vec![
        Value::Array(vec![Value::from(1i64)]),
        Value::Array(vec![Value::from(2i64), Value::from(3i64)]),
        Value::Null,
    ];
    let column = column_of("a", &rows);
    let mut binary = encode(&column);
    binary.set_load_index(vec![1, 2, 5]);
    let out = decode(&binary);
    assert_eq!(out.get_value(0), rows[1]);
    assert!(out.is_null(1));
    assert!(out.is_null(2));
}

#[test]
fn repetitions_expand_rows_before_load_index() {
    let column = strings(&[Some("a"), Some("b"), Some("c")]);
    let mut binary = encode(&column);
    binary.set_repetitions(vec![2, 0, 1]);
    let out = decode(&binary);
    let got: Vec<Value> = (0..out.len()).map(|r| out.get_value(r)).collect();
    assert_eq!(got, vec![Value::from("a"), Value::from("a"), Value::from("c")]);

    binary.set_load_index(vec![1, 2, 3]);
    let out = decode(&binary);
    let got: Vec<Value> = (0..out.len()).map(|r| out.get_value(r)).collect();
    assert_eq!(got, vec![Value::from("a"), Value::from("c"), Value::Null]);
}

#[test]
fn allocator_receives_the_same_rows() {
    let mut columns = sample_columns();
    columns.push(column_of(
        "doc",
        &[
            Value::object([("k", Value::from(1i64))]),
            Value::Null,
            Value::object([("k", Value::from(3i64))]),
        ],
    ));
    columns.push(column_of(
        "arr",
        &[
            Value::Array(vec![Value::from(1i64), Value::from(2i64)]),
            Value::Null,
            Value::Array(vec![Value::from(3i64)]),
        ],
    ));
    let registry = MakerRegistry::default();
    for column in columns {
        let binary = encode(&column);
        let mut alloc = ColumnAllocator::new(column.name(), column.column_type());
        registry.load_in_memory_storage(&binary, &mut alloc).unwrap();
        assert_same_rows(&column, &alloc.into_column().unwrap());
    }
}

#[test]
fn allocator_honours_load_index() {
    let column = longs(&[Some(10), None, Some(30), Some(40)]);
    let mut binary = encode_forced(&column, CodecKind::RunLength);
    binary.set_load_index(vec![0, 3, 9]);
    let mut alloc = ColumnAllocator::new("n", ColumnType::Long);
    MakerRegistry::default()
        .load_in_memory_storage(&binary, &mut alloc)
        .unwrap();
    let out = alloc.into_column().unwrap();
    assert_eq!(out.len(), 3);
    assert_eq!(out.get(1).primitive(), Some(&PrimitiveObject::Long(40)));
    assert!(out.is_null(2));
}

#[test]
fn truncated_payload_is_a_decode_error() {
    let column = longs(&[Some(1), Some(2), Some(3)]);
    let mut binary = encode_forced(&column, CodecKind::Dump);
    binary.payload.truncate(binary.payload.len() - 1);
    let err = MakerRegistry::default().to_column(&binary).unwrap_err();
    assert!(matches!(err, Error::Decode(_)), "{err:?}");
}

#[test]
fn null_optimized_count_past_the_payload_is_a_decode_error() {
    let mut binary = ColumnBinary::new("c", ColumnType::Long, CodecKind::NullOptimized);
    binary.row_count = u32::MAX;
    binary.payload = vec![0x06, 0xff, 0xff, 0xff, 0xff];
    binary.uncompressed_len = binary.payload.len() as u32;
    let err = MakerRegistry::default().to_column(&binary).unwrap_err();
    assert_eq!(
        err,
        Error::Decode("4294967295 values declared, 0 bytes left".to_string())
    );
}

#[test]
fn wrong_magic_is_a_decode_error() {
    let column = strings(&[Some("a"), Some("b")]);
    let mut binary = encode_forced(&column, CodecKind::Dictionary);
    binary.codec = CodecKind::RunLength;
    let err = MakerRegistry::default().to_column(&binary).unwrap_err();
    assert!(matches!(err, Error::Decode(_)), "{err:?}");
}

#[test]
fn unknown_codecs_are_reported() {
    assert_eq!(
        CodecKind::from_id(99).unwrap_err(),
        Error::UnsupportedCodec("unknown codec id: 99".to_string())
    );
    assert_eq!(
        CodecKind::from_name("lz4").unwrap_err(),
        Error::UnsupportedCodec("unknown codec name: lz4".to_string())
    );
    let column = longs(&[Some(1)]);
    let binary = encode(&column);
    let err = MakerRegistry::empty().to_column(&binary).unwrap_err();
    assert!(matches!(err, Error::UnsupportedCodec(_)), "{err:?}");
}

#[test]
fn codec_ids_and_names_are_stable() {
    for kind in CodecKind::ALL {
        assert_eq!(CodecKind::from_id(kind.id()).unwrap(), kind);
        assert_eq!(CodecKind::from_name(kind.name()).unwrap(), kind);
    }
    assert_eq!(CodecKind::Dictionary.id(), 4);
    assert_eq!(CodecKind::Union.id(), 12);
}
