use crate::bitmap::{Bitmap, ceil_div_8};
use crate::codec::scalar::{ScalarCodec, ScalarMaker, write_presence};
use crate::codec::wire::{ByteReader, read_value, write_value};
use crate::codec::{CodecKind, ColumnStats};
use crate::column::{Column, PrimitiveStore};
use crate::schema::ColumnType;
use crate::Result;

const MAGIC: u8 = 0xD1;

/// Presence bitmap followed by every non-null value in row order.
///
/// ```text
/// magic u8 | presence: ceil(rows / 8) bytes | value*
/// ```
pub(crate) struct DumpCodec;

pub(crate) static DUMP: ScalarMaker<DumpCodec> = ScalarMaker(DumpCodec);

impl ScalarCodec for DumpCodec {
    const KIND: CodecKind = CodecKind::Dump;

    fn estimate_size(&self, stats: &ColumnStats) -> Option<usize> {
        Some(1 + ceil_div_8(stats.row_count).ok()? + stats.value_bytes)
    }

    fn encode_payload(&self, column: &Column, out: &mut Vec<u8>) -> Result<()> {
        out.push(MAGIC);
        write_presence(column, out)?;
        let ty = column.column_type();
        for (_, v) in column.primitive_rows() {
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
        r.expect_magic(MAGIC, "dump")?;
        let presence = Bitmap::from_bytes(r.take(ceil_div_8(row_count)?)?, row_count)?;
        let mut values = Vec::with_capacity(row_count.min(r.remaining()));
        for row in 0..row_count {
            values.push(if presence.get(row) {
                Some(read_value(&mut r, ty)?)
            } else {
                None
            });
        }
        r.finish("dump")?;
        Ok(PrimitiveStore::Plain(values))
    }
}
