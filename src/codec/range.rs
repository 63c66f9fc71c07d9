use crate::bitmap::{Bitmap, ceil_div_8};
use crate::codec::scalar::{ScalarCodec, ScalarMaker, write_presence};
use crate::codec::wire::{ByteReader, integer_of};
use crate::codec::{CodecKind, ColumnStats};
use crate::column::{Column, PrimitiveStore};
use crate::schema::ColumnType;
use crate::{Error, Result};

const MAGIC: u8 = 0xA3;

/// Integers stored as offsets from the column minimum in the narrowest width.
///
/// ```text
/// magic u8 | presence bitmap | min i64 | width u8 | (value - min) as width bytes*
/// ```
pub(crate) struct RangeCodec;

pub(crate) static RANGE: ScalarMaker<RangeCodec> = ScalarMaker(RangeCodec);

fn width_for(span: u64) -> u8 {
    if span <= u8::MAX as u64 {
        1
    } else if span <= u16::MAX as u64 {
        2
    } else if span <= 0xFF_FFFF {
        3
    } else if span <= u32::MAX as u64 {
        4
    } else {
        8
    }
}

fn span(min: i64, max: i64) -> u64 {
    (max as i128 - min as i128) as u64
}

impl ScalarCodec for RangeCodec {
    const KIND: CodecKind = CodecKind::Range;

    fn supports(&self, ty: ColumnType) -> bool {
        ty.is_integer()
    }

    fn estimate_size(&self, stats: &ColumnStats) -> Option<usize> {
        let (min, max) = (stats.int_min?, stats.int_max?);
        let width = width_for(span(min, max)) as usize;
        Some(1 + ceil_div_8(stats.row_count).ok()? + 8 + 1 + stats.non_null_count() * width)
    }

    fn encode_payload(&self, column: &Column, out: &mut Vec<u8>) -> Result<()> {
        let mut values = Vec::new();
        for (_, v) in column.primitive_rows() {
            values.push(
                v.get_long()
                    .map_err(|e| Error::Encode(format!("range codec: {e}")))?,
            );
        }
        let min = values.iter().copied().min().unwrap_or(0);
        let max = values.iter().copied().max().unwrap_or(0);
        let width = width_for(span(min, max));
        out.push(MAGIC);
        write_presence(column, out)?;
        out.extend_from_slice(&min.to_le_bytes());
        out.push(width);
        for v in values {
            let delta = v.wrapping_sub(min) as u64;
            out.extend_from_slice(&delta.to_le_bytes()[..width as usize]);
        }
        Ok(())
    }

    fn decode_store(
        &self,
        ty: ColumnType,
        row_count: usize,
        payload: &[u8],
    ) -> Result<PrimitiveStore> {
        let mut r = ByteReader::new(payload);
        r.expect_magic(MAGIC, "range")?;
        let presence = Bitmap::from_bytes(r.take(ceil_div_8(row_count)?)?, row_count)?;
        let min = r.read_u64_le()? as i64;
        let width = r.read_u8()? as usize;
        if !matches!(width, 1 | 2 | 3 | 4 | 8) {
            return Err(Error::Decode(format!("invalid range width: {width}")));
        }
        let mut values = Vec::with_capacity(row_count.min(r.remaining()));
        for row in 0..row_count {
            if !presence.get(row) {
                values.push(None);
                continue;
            }
            let mut buf = [0u8; 8];
            buf[..width].copy_from_slice(r.take(width)?);
            let v = min.wrapping_add(u64::from_le_bytes(buf) as i64);
            values.push(Some(integer_of(ty, v)?));
        }
        r.finish("range")?;
        Ok(PrimitiveStore::Plain(values))
    }
}
