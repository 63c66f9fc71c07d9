use crate::codec::scalar::{ScalarCodec, ScalarMaker};
use crate::codec::wire::{ByteReader, read_value, write_value};
use crate::codec::{CodecKind, ColumnStats};
use crate::column::{Column, PrimitiveStore};
use crate::schema::ColumnType;
use crate::{Error, Result};

const MAGIC: u8 = 0xC2;

/// One value repeated on every row, no nulls.
pub(crate) struct ConstantCodec;

pub(crate) static CONSTANT: ScalarMaker<ConstantCodec> = ScalarMaker(ConstantCodec);

impl ScalarCodec for ConstantCodec {
    const KIND: CodecKind = CodecKind::Constant;

    fn estimate_size(&self, stats: &ColumnStats) -> Option<usize> {
        if stats.null_count != 0 || stats.distinct != Some(1) {
            return None;
        }
        Some(1 + stats.distinct_bytes)
    }

    fn encode_payload(&self, column: &Column, out: &mut Vec<u8>) -> Result<()> {
        let rows = column.primitive_rows();
        let Some((_, first)) = rows.first() else {
            return Err(Error::Encode("constant column has no value".to_string()));
        };
        if rows.len() != column.len() || rows.iter().any(|(_, v)| v.total_cmp(first).is_ne()) {
            return Err(Error::Encode(format!(
                "column {} is not constant",
                column.name()
            )));
        }
        out.push(MAGIC);
        write_value(out, column.column_type(), first)
    }

    fn decode_store(
        &self,
        ty: ColumnType,
        row_count: usize,
        payload: &[u8],
    ) -> Result<PrimitiveStore> {
        let mut r = ByteReader::new(payload);
        r.expect_magic(MAGIC, "constant")?;
        let value = read_value(&mut r, ty)?;
        r.finish("constant")?;
        Ok(PrimitiveStore::Constant {
            value: Some(value),
            len: row_count,
        })
    }
}
