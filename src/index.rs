//! Block-level pushdown.
//!
//! Each codec leaves a small summary of a column in every block. Evaluating an
//! [`Expression`] against those summaries yields the set of blocks that may
//! contain a matching row; every other block is skipped without being read.

use core::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};

use tracing::trace;

use crate::codec::wire::{ByteReader, write_u32_len_bytes, write_u32_le};
use crate::expression::{Expression, ExpressionVisitor};
use crate::filter::{Filter, NumberOp, StringFilter};
use crate::schema::ColumnType;
use crate::value::{PrimitiveObject, compare_numbers};
use crate::{Error, Result};

/// Dictionaries larger than this are summarized by their bounds only.
pub(crate) const MAX_SUMMARY_SET: usize = 1024;

/// What one block knows about the non-null values of one column.
#[derive(Debug, Clone, PartialEq)]
pub enum BlockSummary {
    /// Nothing is known; the block can never be skipped.
    Unsupported,
    /// Integer bounds, inclusive.
    LongRange { min: i64, max: i64 },
    /// Float bounds, inclusive, NaN excluded.
    DoubleRange { min: f64, max: f64 },
    StringRange { min: String, max: String },
    Boolean { has_true: bool, has_false: bool },
    /// Every distinct string value.
    StringSet(BTreeSet<String>),
}

impl BlockSummary {
    /// Summary of the non-null values of a scalar column of type `ty`.
    ///
    /// `keep_set` retains the distinct strings instead of only their bounds.
    pub(crate) fn from_values<'a>(
        ty: ColumnType,
        values: impl IntoIterator<Item = &'a PrimitiveObject>,
        keep_set: bool,
    ) -> BlockSummary {
        let mut values = values.into_iter().peekable();
        if values.peek().is_none() {
            return BlockSummary::Unsupported;
        }
        if ty.is_integer() {
            let mut bounds: Option<(i64, i64)> = None;
            for v in values {
                let Ok(x) = v.get_long() else {
                    return BlockSummary::Unsupported;
                };
                bounds = Some(match bounds {
                    None => (x, x),
                    Some((lo, hi)) => (lo.min(x), hi.max(x)),
                });
            }
            return match bounds {
                Some((min, max)) => BlockSummary::LongRange { min, max },
                None => BlockSummary::Unsupported,
            };
        }
        if ty.is_float() {
            let mut bounds: Option<(f64, f64)> = None;
            for v in values {
                let Ok(x) = v.get_double() else {
                    return BlockSummary::Unsupported;
                };
                if x.is_nan() {
                    continue;
                }
                bounds = Some(match bounds {
                    None => (x, x),
                    Some((lo, hi)) => (lo.min(x), hi.max(x)),
                });
            }
            return match bounds {
                Some((min, max)) => BlockSummary::DoubleRange { min, max },
                None => BlockSummary::Unsupported,
            };
        }
        match ty {
            ColumnType::Boolean => {
                let (mut has_true, mut has_false) = (false, false);
                for v in values {
                    match v.get_bool().ok() {
                        Some(true) => has_true = true,
                        Some(false) => has_false = true,
                        None => return BlockSummary::Unsupported,
                    }
                }
                BlockSummary::Boolean {
                    has_true,
                    has_false,
                }
            }
            ColumnType::String => {
                let mut set = BTreeSet::new();
                for v in values {
                    let Some(s) = v.as_str() else {
                        return BlockSummary::Unsupported;
                    };
                    if !set.contains(s) {
                        set.insert(s.to_string());
                    }
                }
                if keep_set && set.len() <= MAX_SUMMARY_SET {
                    return BlockSummary::StringSet(set);
                }
                match (set.first(), set.last()) {
                    (Some(min), Some(max)) => BlockSummary::StringRange {
                        min: min.clone(),
                        max: max.clone(),
                    },
                    _ => BlockSummary::Unsupported,
                }
            }
            _ => BlockSummary::Unsupported,
        }
    }

    /// `false` only when no row summarized here can satisfy `filter`.
    pub fn may_match(&self, filter: &Filter) -> bool {
        match filter {
            Filter::Null | Filter::NotNull => true,
            Filter::Boolean(b) => match self {
                BlockSummary::Unsupported => true,
                BlockSummary::Boolean {
                    has_true,
                    has_false,
                } => {
                    if *b {
                        *has_true
                    } else {
                        *has_false
                    }
                }
                _ => false,
            },
            Filter::Number { op, value } => match self.number_bounds() {
                NumberBounds::Unknown => true,
                NumberBounds::NotNumeric => false,
                NumberBounds::Range(min, max) => number_op_may_match(*op, &min, &max, value),
            },
            Filter::NumberRange {
                low,
                low_inclusive,
                high,
                high_inclusive,
                invert,
            } => match self.number_bounds() {
                NumberBounds::Unknown => true,
                NumberBounds::NotNumeric => false,
                NumberBounds::Range(_, _) if *invert => true,
                NumberBounds::Range(min, max) => {
                    let (Some(max_vs_low), Some(min_vs_high)) =
                        (compare_numbers(&max, low), compare_numbers(&min, high))
                    else {
                        return false;
                    };
                    let below = match max_vs_low {
                        Ordering::Less => true,
                        Ordering::Equal => !*low_inclusive,
                        Ordering::Greater => false,
                    };
                    let above = match min_vs_high {
                        Ordering::Greater => true,
                        Ordering::Equal => !*high_inclusive,
                        Ordering::Less => false,
                    };
                    !(below || above)
                }
            },
            Filter::String(sf) => match self {
                BlockSummary::Unsupported => true,
                BlockSummary::StringSet(set) => set.iter().any(|s| sf.matches(s)),
                BlockSummary::StringRange { min, max } => string_range_may_match(sf, min, max),
                _ => false,
            },
        }
    }

    fn number_bounds(&self) -> NumberBounds {
        match self {
            BlockSummary::Unsupported => NumberBounds::Unknown,
            BlockSummary::LongRange { min, max } => {
                NumberBounds::Range(PrimitiveObject::Long(*min), PrimitiveObject::Long(*max))
            }
            BlockSummary::DoubleRange { min, max } => {
                NumberBounds::Range(PrimitiveObject::Double(*min), PrimitiveObject::Double(*max))
            }
            _ => NumberBounds::NotNumeric,
        }
    }

    pub(crate) fn encode(&self, out: &mut Vec<u8>) -> Result<()> {
        match self {
            BlockSummary::Unsupported => out.push(0),
            BlockSummary::LongRange { min, max } => {
                out.push(1);
                out.extend_from_slice(&min.to_le_bytes());
                out.extend_from_slice(&max.to_le_bytes());
            }
            BlockSummary::DoubleRange { min, max } => {
                out.push(2);
                out.extend_from_slice(&min.to_bits().to_le_bytes());
                out.extend_from_slice(&max.to_bits().to_le_bytes());
            }
            BlockSummary::StringRange { min, max } => {
                out.push(3);
                write_u32_len_bytes(out, min.as_bytes())?;
                write_u32_len_bytes(out, max.as_bytes())?;
            }
            BlockSummary::Boolean {
                has_true,
                has_false,
            } => {
                out.push(4);
                out.push(u8::from(*has_true) | (u8::from(*has_false) << 1));
            }
            BlockSummary::StringSet(set) => {
                out.push(5);
                let n = u32::try_from(set.len())
                    .map_err(|_| Error::Encode("summary set too large".to_string()))?;
                write_u32_le(out, n);
                for s in set {
                    write_u32_len_bytes(out, s.as_bytes())?;
                }
            }
        }
        Ok(())
    }

    /// Empty `bytes` carry no summary.
    pub(crate) fn decode(bytes: &[u8]) -> Result<Option<BlockSummary>> {
        if bytes.is_empty() {
            return Ok(None);
        }
        let mut r = ByteReader::new(bytes);
        let summary = match r.read_u8()? {
            0 => BlockSummary::Unsupported,
            1 => BlockSummary::LongRange {
                min: r.read_u64_le()? as i64,
                max: r.read_u64_le()? as i64,
            },
            2 => BlockSummary::DoubleRange {
                min: f64::from_bits(r.read_u64_le()?),
                max: f64::from_bits(r.read_u64_le()?),
            },
            3 => BlockSummary::StringRange {
                min: read_string(&mut r)?,
                max: read_string(&mut r)?,
            },
            4 => {
                let flags = r.read_u8()?;
                BlockSummary::Boolean {
                    has_true: flags & 1 != 0,
                    has_false: flags & 2 != 0,
                }
            }
            5 => {
                let n = r.read_u32_le()? as usize;
                let mut set = BTreeSet::new();
                for _ in 0..n {
                    set.insert(read_string(&mut r)?);
                }
                BlockSummary::StringSet(set)
            }
            tag => return Err(Error::Decode(format!("unknown summary tag: {tag}"))),
        };
        r.finish("summary")?;
        Ok(Some(summary))
    }
}

fn read_string(r: &mut ByteReader<'_>) -> Result<String> {
    let len = r.read_u32_le()? as usize;
    let bytes = r.take(len)?;
    std::str::from_utf8(bytes)
        .map(str::to_string)
        .map_err(|_| Error::Decode("invalid UTF-8 in summary".to_string()))
}

enum NumberBounds {
    Unknown,
    NotNumeric,
    Range(PrimitiveObject, PrimitiveObject),
}

fn number_op_may_match(
    op: NumberOp,
    min: &PrimitiveObject,
    max: &PrimitiveObject,
    value: &PrimitiveObject,
) -> bool {
    let (Some(min_vs), Some(max_vs)) = (compare_numbers(min, value), compare_numbers(max, value))
    else {
        // A NaN literal compares false against every row.
        return false;
    };
    match op {
        NumberOp::Equal => min_vs != Ordering::Greater && max_vs != Ordering::Less,
        NumberOp::NotEqual => !(min_vs == Ordering::Equal && max_vs == Ordering::Equal),
        NumberOp::Lt => min_vs == Ordering::Less,
        NumberOp::Le => min_vs != Ordering::Greater,
        NumberOp::Gt => max_vs == Ordering::Greater,
        NumberOp::Ge => max_vs != Ordering::Less,
    }
}

fn string_range_may_match(sf: &StringFilter, min: &str, max: &str) -> bool {
    match sf {
        StringFilter::Exact(s) => min <= s.as_str() && s.as_str() <= max,
        StringFilter::ForwardMatch(p) => {
            if max < p.as_str() {
                return false;
            }
            // Everything starting with `p` sorts at or after `p`, and before
            // any string that is greater without sharing the prefix.
            !(min > p.as_str() && !min.starts_with(p.as_str()))
        }
        StringFilter::BackwardMatch(_) | StringFilter::PartialMatch(_) => true,
        StringFilter::Range {
            min: lo,
            min_inclusive,
            max: hi,
            max_inclusive,
            invert,
        } => {
            if *invert {
                return true;
            }
            let below = if *min_inclusive {
                max < lo.as_str()
            } else {
                max <= lo.as_str()
            };
            let above = if *max_inclusive {
                min > hi.as_str()
            } else {
                min >= hi.as_str()
            };
            !(below || above)
        }
        StringFilter::Dictionary(set) => set.iter().any(|s| min <= s.as_str() && s.as_str() <= max),
    }
}

/// Per-column map from block id to what each registered piece of that block knows.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BlockIndex {
    blocks: BTreeMap<u32, Vec<BlockSummary>>,
}

impl BlockIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, block_id: u32, summary: BlockSummary) {
        self.blocks.entry(block_id).or_default().push(summary);
    }

    pub fn block_ids(&self) -> impl Iterator<Item = u32> + '_ {
        self.blocks.keys().copied()
    }

    pub fn summaries(&self, block_id: u32) -> &[BlockSummary] {
        self.blocks.get(&block_id).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Blocks that may hold a row matching `filter`; `None` means every block.
    ///
    /// Blocks without any summary for this column hold only nulls and are
    /// excluded by value filters.
    pub fn get_block_spread_index(&self, filter: &Filter) -> Option<BTreeSet<u32>> {
        if matches!(filter, Filter::Null | Filter::NotNull) {
            return None;
        }
        Some(
            self.blocks
                .iter()
                .filter(|(_, summaries)| summaries.iter().any(|s| s.may_match(filter)))
                .map(|(id, _)| *id)
                .collect(),
        )
    }

    fn merge(&mut self, other: &BlockIndex) {
        for (id, summaries) in &other.blocks {
            self.blocks
                .entry(*id)
                .or_default()
                .extend(summaries.iter().cloned());
        }
    }
}

/// Tree of [`BlockIndex`]es mirroring the nested column names of a file.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BlockIndexNode {
    index: BlockIndex,
    children: BTreeMap<String, BlockIndexNode>,
}

impl BlockIndexNode {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn index(&self) -> &BlockIndex {
        &self.index
    }

    pub fn index_mut(&mut self) -> &mut BlockIndex {
        &mut self.index
    }

    pub fn child(&self, name: &str) -> Option<&BlockIndexNode> {
        self.children.get(name)
    }

    pub fn child_mut(&mut self, name: &str) -> &mut BlockIndexNode {
        self.children.entry(name.to_string()).or_default()
    }

    pub fn children(&self) -> impl Iterator<Item = (&str, &BlockIndexNode)> {
        self.children.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn find(&self, path: &[String]) -> Option<&BlockIndexNode> {
        let mut node = self;
        for key in path {
            node = node.children.get(key)?;
        }
        Some(node)
    }

    /// Blocks that may satisfy `expr`; `None` means every block.
    pub fn get_block_spread_index(&self, expr: &Expression) -> Result<Option<BTreeSet<u32>>> {
        let out = expr.accept(&mut BlockIndexEvaluator { root: self })?;
        trace!(blocks = ?out, "block index evaluated");
        Ok(out)
    }

    pub fn merge(&mut self, other: &BlockIndexNode) {
        self.index.merge(&other.index);
        for (name, child) in &other.children {
            self.child_mut(name).merge(child);
        }
    }
}

struct BlockIndexEvaluator<'a> {
    root: &'a BlockIndexNode,
}

impl ExpressionVisitor for BlockIndexEvaluator<'_> {
    type Output = Option<BTreeSet<u32>>;

    fn leaf(&mut self, path: &[String], filter: &Filter) -> Result<Self::Output> {
        match self.root.find(path) {
            Some(node) => Ok(node.index.get_block_spread_index(filter)),
            // No block has this column: every row is null.
            None if filter.matches(None) => Ok(None),
            None => Ok(Some(BTreeSet::new())),
        }
    }

    fn and(&mut self, parts: Vec<Self::Output>) -> Result<Self::Output> {
        let mut acc: Option<BTreeSet<u32>> = None;
        for part in parts.into_iter().flatten() {
            acc = Some(match acc {
                None => part,
                Some(a) => a.intersection(&part).copied().collect(),
            });
        }
        Ok(acc)
    }

    fn or(&mut self, parts: Vec<Self::Output>) -> Result<Self::Output> {
        let mut acc = BTreeSet::new();
        for part in parts {
            match part {
                None => return Ok(None),
                Some(p) => acc.extend(p),
            }
        }
        Ok(Some(acc))
    }

    fn not(&mut self, _inner: Self::Output) -> Result<Self::Output> {
        Ok(None)
    }
}
