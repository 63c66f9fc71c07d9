use crate::codec::scalar::{ScalarCodec, ScalarMaker};
use crate::codec::wire::{
    ByteReader, read_value, usize_to_u32, write_u32_le, write_u64_varint, write_value,
};
use crate::codec::{CodecKind, ColumnStats};
use crate::column::{Column, PrimitiveStore};
use crate::schema::ColumnType;
use crate::{Error, Result};

const MAGIC: u8 = 0x06;

/// Only the non-null rows: their row numbers delta-encoded, then their values.
///
/// ```text
/// magic u8 | count u32 | row delta varint* | value*
/// ```
pub(crate) struct NullOptimizedCodec;

pub(crate) static NULL_OPTIMIZED: ScalarMaker<NullOptimizedCodec> =
    ScalarMaker(NullOptimizedCodec);

impl ScalarCodec for NullOptimizedCodec {
    const KIND: CodecKind = CodecKind::NullOptimized;

    fn estimate_size(&self, stats: &ColumnStats) -> Option<usize> {
        Some(1 + 4 + stats.row_delta_bytes + stats.value_bytes)
    }

    fn encode_payload(&self, column: &Column, out: &mut Vec<u8>) -> Result<()> {
        let ty = column.column_type();
        let rows = column.primitive_rows();
        out.push(MAGIC);
        write_u32_le(out, usize_to_u32(rows.len(), "value count")?);
        let mut prev: Option<usize> = None;
        for (row, _) in &rows {
            let delta = match prev {
                None => *row,
                Some(p) => row - p,
            };
            write_u64_varint(out, delta as u64);
            prev = Some(*row);
        }
        for (_, v) in &rows {
            write_value(out, ty, v)?;
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
        r.expect_magic(MAGIC, "null optimized")?;
        let count = r.read_u32_le()? as usize;
        if count > row_count {
            return Err(Error::Decode("more values than rows".to_string()));
        }
        // Every row delta takes at least one byte.
        if count > r.remaining() {
            return Err(Error::Decode(format!(
                "{count} values declared, {} bytes left",
                r.remaining()
            )));
        }
        let mut rows = Vec::with_capacity(count);
        let mut prev: Option<u64> = None;
        for _ in 0..count {
            let delta = r.read_u64_varint()?;
            let row = match prev {
                None => delta,
                Some(_) if delta == 0 => {
                    return Err(Error::Decode("row numbers are not ascending".to_string()));
                }
                Some(p) => p
                    .checked_add(delta)
                    .ok_or_else(|| Error::Decode("row number overflow".to_string()))?,
            };
            if row >= row_count as u64 {
                return Err(Error::Decode("row number past row count".to_string()));
            }
            rows.push(row as u32);
            prev = Some(row);
        }
        let mut values = Vec::with_capacity(count.min(r.remaining()));
        for _ in 0..count {
            values.push(read_value(&mut r, ty)?);
        }
        r.finish("null optimized")?;
        Ok(PrimitiveStore::Sparse { rows, values })
    }
}
