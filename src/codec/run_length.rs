use crate::codec::scalar::{ScalarCodec, ScalarMaker};
use crate::codec::wire::{
    ByteReader, read_value, usize_to_u32, write_u32_le, write_u64_varint, write_value,
};
use crate::codec::{CodecKind, ColumnStats};
use crate::column::{Column, PrimitiveStore};
use crate::schema::ColumnType;
use crate::value::PrimitiveObject;
use crate::{Error, Result};

const MAGIC: u8 = 0xE5;

/// Stretches of equal rows, nulls included.
///
/// ```text
/// magic u8 | run_count u32 | (run_len varint | present u8 | value?)*
/// ```
pub(crate) struct RunLengthCodec;

pub(crate) static RUN_LENGTH: ScalarMaker<RunLengthCodec> = ScalarMaker(RunLengthCodec);

impl ScalarCodec for RunLengthCodec {
    const KIND: CodecKind = CodecKind::RunLength;

    fn estimate_size(&self, stats: &ColumnStats) -> Option<usize> {
        let avg_value = stats
            .value_bytes
            .div_ceil(stats.non_null_count().max(1));
        Some(1 + 4 + stats.runs * (2 + avg_value))
    }

    fn encode_payload(&self, column: &Column, out: &mut Vec<u8>) -> Result<()> {
        let ty = column.column_type();
        let mut runs: Vec<(usize, Option<&PrimitiveObject>)> = Vec::new();
        let mut last_key: Option<Vec<u8>> = None;
        for row in 0..column.len() {
            let v = column.get(row).primitive();
            let key = match v {
                Some(v) => {
                    let mut k = Vec::new();
                    write_value(&mut k, ty, v)?;
                    Some(k)
                }
                None => None,
            };
            match runs.last_mut() {
                Some((n, _)) if key == last_key => *n += 1,
                _ => runs.push((1, v)),
            }
            last_key = key;
        }
        out.push(MAGIC);
        write_u32_le(out, usize_to_u32(runs.len(), "run count")?);
        for (n, v) in runs {
            write_u64_varint(out, n as u64);
            match v {
                Some(v) => {
                    out.push(1);
                    write_value(out, ty, v)?;
                }
                None => out.push(0),
            }
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
        r.expect_magic(MAGIC, "run length")?;
        let run_count = r.read_u32_le()? as usize;
        let mut runs = Vec::with_capacity(run_count.min(r.remaining()));
        let mut end = 0usize;
        for _ in 0..run_count {
            let n = usize::try_from(r.read_u64_varint()?)
                .map_err(|_| Error::Decode("run too long".to_string()))?;
            if n == 0 {
                return Err(Error::Decode("empty run".to_string()));
            }
            end = end
                .checked_add(n)
                .filter(|&e| e <= row_count)
                .ok_or_else(|| Error::Decode("runs exceed row count".to_string()))?;
            let v = match r.read_u8()? {
                0 => None,
                1 => Some(read_value(&mut r, ty)?),
                b => return Err(Error::Decode(format!("invalid run flag: {b}"))),
            };
            runs.push((end, v));
        }
        if end != row_count {
            return Err(Error::Decode("runs do not cover every row".to_string()));
        }
        r.finish("run length")?;
        Ok(PrimitiveStore::RunLength { runs })
    }
}
