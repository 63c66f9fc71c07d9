use std::collections::BTreeSet;

use crate::codec::{EncodeContext, MakerRegistry};
use crate::column::Column;
use crate::expression::Expression;
use crate::filter::{Filter, NumberOp, StringFilter};
use crate::index::{BlockIndex, BlockIndexNode, BlockSummary};
use crate::value::Value;

fn four_block_index() -> BlockIndex {
    let mut index = BlockIndex::new();
    for (id, (min, max)) in [(-10, 10), (-5, 0), (0, 5), (-3, 3)].into_iter().enumerate() {
        index.add(id as u32, BlockSummary::LongRange { min, max });
    }
    index
}

fn four_block_node() -> BlockIndexNode {
    let mut node = BlockIndexNode::new();
    *node.child_mut("n").index_mut() = four_block_index();
    node
}

fn set(ids: &[u32]) -> Option<BTreeSet<u32>> {
    Some(ids.iter().copied().collect())
}

#[test]
fn equal_five_keeps_the_blocks_whose_range_holds_five() {
    let index = four_block_index();
    let blocks = index.get_block_spread_index(&Filter::number(NumberOp::Equal, 5i64));
    assert_eq!(blocks, set(&[0, 2]));
}

#[test]
fn comparisons_and_ranges_prune_by_bounds() {
    let index = four_block_index();
    assert_eq!(
        index.get_block_spread_index(&Filter::number(NumberOp::Lt, -4i64)),
        set(&[0, 1])
    );
    assert_eq!(
        index.get_block_spread_index(&Filter::number(NumberOp::Gt, 3.5f64)),
        set(&[0, 2])
    );
    assert_eq!(
        index.get_block_spread_index(&Filter::between(6i64, 8i64)),
        set(&[0])
    );
    assert_eq!(
        index.get_block_spread_index(&Filter::number(NumberOp::Ge, 11i8)),
        set(&[])
    );
}

#[test]
fn not_equal_only_prunes_single_value_blocks() {
    let mut index = four_block_index();
    index.add(4, BlockSummary::LongRange { min: 7, max: 7 });
    let blocks = index.get_block_spread_index(&Filter::number(NumberOp::NotEqual, 7i64));
    assert_eq!(blocks, set(&[0, 1, 2, 3]));
}

#[test]
fn null_checks_never_prune() {
    let index = four_block_index();
    assert_eq!(index.get_block_spread_index(&Filter::Null), None);
    assert_eq!(index.get_block_spread_index(&Filter::NotNull), None);
}

#[test]
fn value_filters_of_another_family_prune_everything() {
    let index = four_block_index();
    assert_eq!(index.get_block_spread_index(&Filter::exact("5")), set(&[]));
    assert_eq!(index.get_block_spread_index(&Filter::Boolean(true)), set(&[]));
}

#[test]
fn unsupported_summaries_keep_their_block() {
    let mut index = four_block_index();
    index.add(9, BlockSummary::Unsupported);
    let blocks = index.get_block_spread_index(&Filter::number(NumberOp::Equal, 100i64));
    assert_eq!(blocks, set(&[9]));
}

#[test]
fn and_intersects_or_unites_not_gives_up() {
    let node = four_block_node();
    let eq5 = Expression::column("n", Filter::number(NumberOp::Equal, 5i64));
    let neg = Expression::column("n", Filter::number(NumberOp::Lt, 0i64));
    let any = Expression::column("n", Filter::NotNull);

    let and = Expression::And(vec![eq5.clone(), neg.clone()]);
    assert_eq!(node.get_block_spread_index(&and).unwrap(), set(&[0]));

    let and_any = Expression::And(vec![eq5.clone(), any.clone()]);
    assert_eq!(node.get_block_spread_index(&and_any).unwrap(), set(&[0, 2]));

    let or = Expression::Or(vec![eq5.clone(), neg]);
    assert_eq!(node.get_block_spread_index(&or).unwrap(), set(&[0, 1, 2, 3]));

    let or_any = Expression::Or(vec![eq5.clone(), any]);
    assert_eq!(node.get_block_spread_index(&or_any).unwrap(), None);

    let not = Expression::not(eq5);
    assert_eq!(node.get_block_spread_index(&not).unwrap(), None);
}

#[test]
fn missing_columns_are_all_null() {
    let node = four_block_node();
    let value = Expression::column("absent", Filter::number(NumberOp::Equal, 1i64));
    assert_eq!(node.get_block_spread_index(&value).unwrap(), set(&[]));
    let null = Expression::column("absent", Filter::Null);
    assert_eq!(node.get_block_spread_index(&null).unwrap(), None);
}

#[test]
fn string_summaries_prune_by_set_and_range() {
    let mut index = BlockIndex::new();
    index.add(
        0,
        BlockSummary::StringSet(["apple", "pear"].iter().map(|s| s.to_string()).collect()),
    );
    index.add(
        1,
        BlockSummary::StringRange {
            min: "m".to_string(),
            max: "p".to_string(),
        },
    );
    assert_eq!(index.get_block_spread_index(&Filter::exact("pear")), set(&[0]));
    assert_eq!(index.get_block_spread_index(&Filter::exact("orange")), set(&[1]));
    assert_eq!(index.get_block_spread_index(&Filter::exact("apple")), set(&[0]));
    assert_eq!(
        index.get_block_spread_index(&Filter::String(StringFilter::ForwardMatch("ap".to_string()))),
        set(&[0])
    );
    assert_eq!(
        index.get_block_spread_index(&Filter::String(StringFilter::PartialMatch("z".to_string()))),
        set(&[1])
    );
}

#[test]
fn boolean_summaries_track_both_values() {
    let mut index = BlockIndex::new();
    index.add(
        0,
        BlockSummary::Boolean {
            has_true: true,
            has_false: false,
        },
    );
    index.add(
        1,
        BlockSummary::Boolean {
            has_true: true,
            has_false: true,
        },
    );
    assert_eq!(index.get_block_spread_index(&Filter::Boolean(false)), set(&[1]));
    assert_eq!(index.get_block_spread_index(&Filter::Boolean(true)), set(&[0, 1]));
}

#[test]
fn nested_columns_register_under_their_path() {
    let mut column = Column::new("user");
    for (row, age) in [30i64, 40].into_iter().enumerate() {
        column
            .add(&Value::object([("age", Value::from(age))]), row)
            .unwrap();
    }
    let registry = MakerRegistry::default();
    let binary = EncodeContext::new(&registry).encode(&column).unwrap();

    let mut node = BlockIndexNode::new();
    registry
        .set_block_index_node(node.child_mut("user"), &binary, 3)
        .unwrap();
    let age = node
        .find(&["user".to_string(), "age".to_string()])
        .unwrap();
    assert_eq!(
        age.index().summaries(3),
        &[BlockSummary::LongRange { min: 30, max: 40 }]
    );

    let hit = Expression::leaf(["user", "age"], Filter::number(NumberOp::Equal, 40i64));
    assert_eq!(node.get_block_spread_index(&hit).unwrap(), set(&[3]));
    let miss = Expression::leaf(["user", "age"], Filter::number(NumberOp::Equal, 41i64));
    assert_eq!(node.get_block_spread_index(&miss).unwrap(), set(&[]));
}

#[test]
fn union_members_share_one_node() {
    let mut column = Column::new("v");
    column.add(&Value::from(3i64), 0).unwrap();
    column.add(&Value::from("x"), 1).unwrap();
    let registry = MakerRegistry::default();
    let binary = EncodeContext::new(&registry).encode(&column).unwrap();
    let mut node = BlockIndexNode::new();
    registry
        .set_block_index_node(node.child_mut("v"), &binary, 0)
        .unwrap();
    let expr = Expression::column("v", Filter::exact("x"));
    assert_eq!(node.get_block_spread_index(&expr).unwrap(), set(&[0]));
    let expr = Expression::column("v", Filter::number(NumberOp::Equal, 3i64));
    assert_eq!(node.get_block_spread_index(&expr).unwrap(), set(&[0]));
    let expr = Expression::column("v", Filter::number(NumberOp::Equal, 4i64));
    assert_eq!(node.get_block_spread_index(&expr).unwrap(), set(&[]));

    let member = Expression::leaf(["v", "LONG"], Filter::number(NumberOp::Equal, 3i64));
    assert_eq!(node.get_block_spread_index(&member).unwrap(), set(&[0]));
    let member = Expression::leaf(["v", "STRING"], Filter::exact("x"));
    assert_eq!(node.get_block_spread_index(&member).unwrap(), set(&[0]));
    let member = Expression::leaf(["v", "STRING"], Filter::exact("y"));
    assert_eq!(node.get_block_spread_index(&member).unwrap(), set(&[]));
}

#[test]
fn merged_nodes_keep_every_block() {
    let mut a = four_block_node();
    let mut b = BlockIndexNode::new();
    b.child_mut("n")
        .index_mut()
        .add(8, BlockSummary::LongRange { min: 5, max: 5 });
    a.merge(&b);
    let expr = Expression::column("n", Filter::number(NumberOp::Equal, 5i64));
    assert_eq!(a.get_block_spread_index(&expr).unwrap(), set(&[0, 2, 8]));
}

#[test]
fn double_summaries_ignore_nan() {
    let mut column = Column::new("d");
    for (row, v) in [1.0f64, f64::NAN, 2.0].into_iter().enumerate() {
        column.add(&Value::from(v), row).unwrap();
    }
    let registry = MakerRegistry::default();
    let binary = EncodeContext::new(&registry).encode(&column).unwrap();
    let mut node = BlockIndexNode::new();
    registry
        .set_block_index_node(node.child_mut("d"), &binary, 0)
        .unwrap();
    assert_eq!(
        node.child("d").unwrap().index().summaries(0),
        &[BlockSummary::DoubleRange { min: 1.0, max: 2.0 }]
    );
}
