use std::collections::{BTreeMap, BTreeSet};

use proptest::prelude::*;

use crate::codec::{CodecKind, ColumnBinary, EncodeContext, MakerRegistry};
use crate::column::Column;
use crate::expression::Expression;
use crate::filter::{Filter, NumberOp, StringFilter};
use crate::index::BlockIndexNode;
use crate::spread::Spread;
use crate::value::{PrimitiveObject, Value};

const SCALAR_CODECS: [CodecKind; 6] = [
    CodecKind::Dump,
    CodecKind::Constant,
    CodecKind::Range,
    CodecKind::Dictionary,
    CodecKind::RunLength,
    CodecKind::NullOptimized,
];

fn column_of(name: &str, values: &[Value]) -> Column {
    let mut c = Column::new(name);
    for (row, v) in values.iter().enumerate() {
        c.add(v, row).unwrap();
    }
    c.set_len(values.len());
    c
}

fn encode_forced(column: &Column, kind: CodecKind) -> ColumnBinary {
    let registry = MakerRegistry::default();
    let mut forced = BTreeMap::new();
    forced.insert(column.name().to_string(), kind);
    let mut ctx = EncodeContext::new(&registry);
    ctx.set_forced_codecs(&forced);
    ctx.encode(column).unwrap()
}

/// Rows selected by `Column::filter`, or by the per-cell reference when it declines.
fn filtered_rows(column: &Column, filter: &Filter) -> Vec<usize> {
    match column.filter(filter).unwrap() {
        Some(hits) => hits.iter_ones().collect(),
        None => (0..column.len())
            .filter(|&r| filter.cell_matches(&column.get(r)))
            .collect(),
    }
}

fn reference_rows(values: &[Option<PrimitiveObject>], filter: &Filter) -> Vec<usize> {
    values
        .iter()
        .enumerate()
        .filter(|(_, v)| filter.matches(v.as_ref()))
        .map(|(i, _)| i)
        .collect()
}

/// Checks cell filtering and block pruning of `values` under every codec.
fn check_all_codecs(
    values: &[Option<PrimitiveObject>],
    filter: &Filter,
) -> Result<(), TestCaseError> {
    let rows: Vec<Value> = values
        .iter()
        .map(|v| v.clone().map_or(Value::Null, Value::Primitive))
        .collect();
    let column = column_of("c", &rows);
    let typed: Vec<Option<PrimitiveObject>> =
        (0..column.len()).map(|r| column.get(r).primitive().cloned()).collect();
    let expected = reference_rows(&typed, filter);
    let registry = MakerRegistry::default();
    for kind in SCALAR_CODECS {
        let binary = encode_forced(&column, kind);
        let decoded = registry.to_column(&binary).unwrap();
        prop_assert_eq!(
            filtered_rows(&decoded, filter),
            expected.clone(),
            "codec {}",
            binary.codec.name()
        );

        let mut node = BlockIndexNode::new();
        registry
            .set_block_index_node(node.child_mut("c"), &binary, 7)
            .unwrap();
        let expr = Expression::column("c", filter.clone());
        if let Some(blocks) = node.get_block_spread_index(&expr).unwrap() {
            if !expected.is_empty() {
                prop_assert!(
                    blocks.contains(&7),
                    "codec {} pruned a matching block",
                    binary.codec.name()
                );
            }
        }
    }
    Ok(())
}

fn nullable_small_i64() -> impl Strategy<Value = Option<i64>> {
    prop_oneof![
        8 => (-20_i64..20).prop_map(Some),
        2 => Just(None),
    ]
}

fn nullable_word() -> impl Strategy<Value = Option<String>> {
    prop_oneof![
        8 => prop::sample::select(vec!["", "a", "ab", "abc", "b", "ba", "cab", "zz"])
            .prop_map(|s| Some(s.to_string())),
        2 => Just(None),
    ]
}

fn number_literal() -> impl Strategy<Value = PrimitiveObject> {
    prop_oneof![
        (-25_i64..25).prop_map(PrimitiveObject::Long),
        (-25_i8..25).prop_map(PrimitiveObject::Byte),
        (-50_i32..50).prop_map(|x| PrimitiveObject::Double(f64::from(x) / 2.0)),
        (-50_i16..50).prop_map(|x| PrimitiveObject::Float(f32::from(x) / 2.0)),
    ]
}

fn number_filter() -> impl Strategy<Value = Filter> {
    let ops = prop::sample::select(vec![
        NumberOp::Equal,
        NumberOp::NotEqual,
        NumberOp::Lt,
        NumberOp::Le,
        NumberOp::Gt,
        NumberOp::Ge,
    ]);
    prop_oneof![
        (ops, number_literal()).prop_map(|(op, value)| Filter::Number { op, value }),
        (
            number_literal(),
            any::<bool>(),
            number_literal(),
            any::<bool>(),
            any::<bool>()
        )
            .prop_map(|(low, low_inclusive, high, high_inclusive, invert)| {
                Filter::NumberRange {
                    low,
                    low_inclusive,
                    high,
                    high_inclusive,
                    invert,
                }
            }),
        Just(Filter::Null),
        Just(Filter::NotNull),
        Just(Filter::exact("a")),
    ]
}

fn string_filter() -> impl Strategy<Value = Filter> {
    let word = prop::sample::select(vec!["", "a", "ab", "b", "c", "zz"]).prop_map(str::to_string);
    prop_oneof![
        word.clone().prop_map(|w| Filter::String(StringFilter::Exact(w))),
        word.clone().prop_map(|w| Filter::String(StringFilter::ForwardMatch(w))),
        word.clone().prop_map(|w| Filter::String(StringFilter::BackwardMatch(w))),
        word.clone().prop_map(|w| Filter::String(StringFilter::PartialMatch(w))),
        (word.clone(), any::<bool>(), word.clone(), any::<bool>(), any::<bool>()).prop_map(
            |(min, min_inclusive, max, max_inclusive, invert)| {
                Filter::String(StringFilter::Range {
                    min,
                    min_inclusive,
                    max,
                    max_inclusive,
                    invert,
                })
            }
        ),
        prop::collection::btree_set(word, 0..3)
            .prop_map(|set: BTreeSet<String>| Filter::String(StringFilter::Dictionary(set))),
        Just(Filter::Null),
        Just(Filter::NotNull),
        Just(Filter::number(NumberOp::Equal, 1i64)),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    #[test]
    fn prop_number_filters_agree_with_reference(
        values in prop::collection::vec(nullable_small_i64(), 0..=64),
        filter in number_filter(),
    ) {
        let values: Vec<Option<PrimitiveObject>> =
            values.into_iter().map(|v| v.map(PrimitiveObject::Long)).collect();
        check_all_codecs(&values, &filter)?;
    }

    #[test]
    fn prop_byte_columns_answer_float_literals(
        values in prop::collection::vec(prop::option::of(-20_i8..20), 0..=48),
        filter in number_filter(),
    ) {
        let values: Vec<Option<PrimitiveObject>> =
            values.into_iter().map(|v| v.map(PrimitiveObject::Byte)).collect();
        check_all_codecs(&values, &filter)?;
    }

    #[test]
    fn prop_double_columns_agree_with_reference(
        values in prop::collection::vec(prop::option::of(-40_i32..40), 0..=48),
        filter in number_filter(),
    ) {
        let values: Vec<Option<PrimitiveObject>> = values
            .into_iter()
            .map(|v| v.map(|x| PrimitiveObject::Double(f64::from(x) / 4.0)))
            .collect();
        check_all_codecs(&values, &filter)?;
    }

    #[test]
    fn prop_string_filters_agree_with_reference(
        values in prop::collection::vec(nullable_word(), 0..=64),
        filter in string_filter(),
    ) {
        let values: Vec<Option<PrimitiveObject>> =
            values.into_iter().map(|v| v.map(PrimitiveObject::String)).collect();
        check_all_codecs(&values, &filter)?;
    }

    #[test]
    fn prop_boolean_filters_agree_with_reference(
        values in prop::collection::vec(prop::option::of(any::<bool>()), 0..=32),
        wanted in any::<bool>(),
    ) {
        let values: Vec<Option<PrimitiveObject>> =
            values.into_iter().map(|v| v.map(PrimitiveObject::Bool)).collect();
        check_all_codecs(&values, &Filter::Boolean(wanted))?;
        check_all_codecs(&values, &Filter::Null)?;
    }
}

#[test]
fn number_filter_compares_across_numeric_types() {
    let f = Filter::number(NumberOp::Lt, 2.5f64);
    assert!(f.matches(Some(&PrimitiveObject::Byte(2))));
    assert!(!f.matches(Some(&PrimitiveObject::Byte(3))));
    assert!(!f.matches(None));
    assert!(!f.matches(Some(&PrimitiveObject::String("1".to_string()))));
}

#[test]
fn inverted_range_selects_outside_values() {
    let f = Filter::NumberRange {
        low: PrimitiveObject::Long(0),
        low_inclusive: true,
        high: PrimitiveObject::Long(10),
        high_inclusive: false,
        invert: true,
    };
    assert!(f.matches(Some(&PrimitiveObject::Long(-1))));
    assert!(f.matches(Some(&PrimitiveObject::Long(10))));
    assert!(!f.matches(Some(&PrimitiveObject::Long(0))));
    assert!(!f.matches(None));
}

#[test]
fn array_rows_match_when_an_element_does() {
    let column = column_of(
        "a",
        &[
            Value::Array(vec![Value::from(1i64), Value::from(9i64)]),
            Value::Array(vec![Value::from(2i64)]),
            Value::Null,
        ],
    );
    let rows = filtered_rows(&column, &Filter::number(NumberOp::Gt, 5i64));
    assert_eq!(rows, vec![0]);
    let rows = filtered_rows(&column, &Filter::Null);
    assert_eq!(rows, vec![2]);
}

#[test]
fn union_rows_are_filtered_per_member() {
    let column = column_of(
        "u",
        &[
            Value::from(5i64),
            Value::from("five"),
            Value::Null,
            Value::from(6i64),
        ],
    );
    assert_eq!(filtered_rows(&column, &Filter::number(NumberOp::Ge, 5i64)), vec![0, 3]);
    assert_eq!(filtered_rows(&column, &Filter::exact("five")), vec![1]);
    assert_eq!(filtered_rows(&column, &Filter::Null), vec![2]);
}

#[test]
fn expressions_combine_cell_results() {
    let mut spread = Spread::new();
    for (id, name) in [(1i64, "ann"), (2, "bob"), (3, "cid"), (4, "ann")] {
        spread
            .add_row(&Value::object([
                ("id", Value::from(id)),
                ("user", Value::object([("name", Value::from(name))])),
            ]))
            .unwrap();
    }
    let by_name = Expression::leaf(["user", "name"], Filter::exact("ann"));
    let big_id = Expression::column("id", Filter::number(NumberOp::Gt, 1i64));

    let and = Expression::And(vec![by_name.clone(), big_id.clone()]);
    assert_eq!(spread.filter_rows(&and).unwrap(), vec![3]);

    let or = Expression::Or(vec![by_name.clone(), big_id]);
    assert_eq!(spread.filter_rows(&or).unwrap(), vec![0, 1, 2, 3]);

    let not = Expression::not(by_name);
    assert_eq!(spread.filter_rows(&not).unwrap(), vec![1, 2]);

    let missing = Expression::column("nope", Filter::Null);
    assert_eq!(spread.filter_rows(&missing).unwrap(), vec![0, 1, 2, 3]);
}
