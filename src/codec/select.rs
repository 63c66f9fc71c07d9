use std::collections::HashSet;

use crate::codec::wire::{value_size, varint_len, write_value};
use crate::codec::{CodecKind, MakerRegistry};
use crate::column::{Column, ColumnKind};
use crate::schema::ColumnType;
use crate::value::PrimitiveObject;
use crate::Result;

/// Distinct counting stops here; past it no dictionary is considered.
const MAX_DISTINCT: usize = 1 << 16;

/// Value statistics of one scalar column, shared by every size estimate.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ColumnStats {
    pub column_type: Option<ColumnType>,
    pub row_count: usize,
    pub null_count: usize,
    /// `None` once more than the tracked number of distinct values was seen.
    pub distinct: Option<usize>,
    /// Encoded bytes of the distinct values.
    pub distinct_bytes: usize,
    /// Maximal stretches of equal rows, null stretches included.
    pub runs: usize,
    /// Encoded bytes of every non-null value.
    pub value_bytes: usize,
    pub int_min: Option<i64>,
    pub int_max: Option<i64>,
    /// Varint bytes needed for the row deltas of the non-null rows.
    pub row_delta_bytes: usize,
}

impl ColumnStats {
    pub fn collect(column: &Column) -> Result<Self> {
        let ty = column.column_type();
        let mut stats = ColumnStats {
            column_type: Some(ty),
            row_count: column.len(),
            ..Default::default()
        };
        if !ty.is_primitive() {
            stats.null_count = column.null_count();
            return Ok(stats);
        }
        let mut seen: Option<HashSet<Vec<u8>>> = Some(HashSet::new());
        let mut key = Vec::new();
        let mut prev: Option<Option<&PrimitiveObject>> = None;
        let mut prev_row: Option<usize> = None;
        for row in 0..column.len() {
            let v = column.get(row).primitive();
            if prev != Some(v) {
                stats.runs += 1;
                prev = Some(v);
            }
            let Some(v) = v else {
                stats.null_count += 1;
                continue;
            };
            stats.value_bytes += value_size(ty, v);
            let delta = match prev_row {
                None => row,
                Some(p) => row - p,
            };
            stats.row_delta_bytes += varint_len(delta as u64);
            prev_row = Some(row);
            if ty.is_integer() {
                if let Ok(x) = v.get_long() {
                    stats.int_min = Some(stats.int_min.map_or(x, |m| m.min(x)));
                    stats.int_max = Some(stats.int_max.map_or(x, |m| m.max(x)));
                }
            }
            if let Some(set) = seen.as_mut() {
                key.clear();
                write_value(&mut key, ty, v)?;
                if !set.contains(&key) {
                    stats.distinct_bytes += key.len();
                    set.insert(key.clone());
                    if set.len() > MAX_DISTINCT {
                        seen = None;
                    }
                }
            }
        }
        stats.distinct = seen.map(|s| s.len());
        Ok(stats)
    }

    pub fn non_null_count(&self) -> usize {
        self.row_count - self.null_count
    }
}

/// The codec for `column`: structural kinds map to their maker, scalars to the
/// registered codec with the smallest estimate (lowest id on ties).
pub fn select_codec(column: &Column, registry: &MakerRegistry) -> Result<CodecKind> {
    match column.kind() {
        ColumnKind::Array(_) => return Ok(CodecKind::Array),
        ColumnKind::Spread { .. } => return Ok(CodecKind::Spread),
        ColumnKind::Union(_) => return Ok(CodecKind::Union),
        ColumnKind::Primitive(_) => {}
    }
    let stats = ColumnStats::collect(column)?;
    if stats.non_null_count() == 0 {
        return Ok(CodecKind::Unsupported);
    }
    let ty = column.column_type();
    let best = registry
        .makers()
        .filter(|m| m.kind().is_scalar() && m.supports(ty))
        .filter_map(|m| m.estimate_size(&stats).map(|size| (size, m.kind())))
        .min();
    Ok(best.map_or(CodecKind::Dump, |(_, kind)| kind))
}
