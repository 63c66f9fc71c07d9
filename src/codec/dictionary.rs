use std::collections::HashMap;

use crate::codec::scalar::{ScalarCodec, ScalarMaker};
use crate::codec::wire::{
    ByteReader, read_value, usize_to_u32, write_u16_le, write_u32_le, write_value,
};
use crate::codec::{CodecKind, ColumnStats};
use crate::column::{Column, PrimitiveStore};
use crate::index::BlockSummary;
use crate::schema::ColumnType;
use crate::{Error, Result};

const MAGIC: u8 = 0xD4;

/// Distinct values once, then one reference per row (`0` = null).
///
/// ```text
/// magic u8 | index_width u8 | dict_count u32 | value* | ref (index_width bytes)*
/// ```
pub(crate) struct DictionaryCodec;

pub(crate) static DICTIONARY: ScalarMaker<DictionaryCodec> = ScalarMaker(DictionaryCodec);

fn index_width(dict_count: usize) -> usize {
    // Refs run up to dict_count since 0 is reserved for null.
    if dict_count < 0x100 {
        1
    } else if dict_count < 0x1_0000 {
        2
    } else {
        4
    }
}

impl ScalarCodec for DictionaryCodec {
    const KIND: CodecKind = CodecKind::Dictionary;

    fn estimate_size(&self, stats: &ColumnStats) -> Option<usize> {
        let distinct = stats.distinct?;
        Some(1 + 1 + 4 + stats.distinct_bytes + stats.row_count * index_width(distinct))
    }

    fn encode_payload(&self, column: &Column, out: &mut Vec<u8>) -> Result<()> {
        let ty = column.column_type();
        let mut dict_blob = Vec::new();
        let mut dict_map: HashMap<Vec<u8>, u32> = HashMap::new();
        let mut refs: Vec<u32> = Vec::with_capacity(column.len());
        let mut key = Vec::new();
        for row in 0..column.len() {
            let Some(v) = column.get(row).primitive() else {
                refs.push(0);
                continue;
            };
            key.clear();
            write_value(&mut key, ty, v)?;
            if let Some(&idx) = dict_map.get(key.as_slice()) {
                refs.push(idx);
                continue;
            }
            let idx = usize_to_u32(dict_map.len() + 1, "dictionary")?;
            dict_blob.extend_from_slice(&key);
            dict_map.insert(key.clone(), idx);
            refs.push(idx);
        }
        let dict_count = dict_map.len();
        let width = index_width(dict_count);
        out.push(MAGIC);
        out.push(width as u8);
        write_u32_le(out, usize_to_u32(dict_count, "dictionary")?);
        out.extend_from_slice(&dict_blob);
        match width {
            1 => out.extend(refs.iter().map(|&r| r as u8)),
            2 => {
                for &r in &refs {
                    let v: u16 = r
                        .try_into()
                        .map_err(|_| Error::Encode("dict index overflow".to_string()))?;
                    write_u16_le(out, v);
                }
            }
            _ => {
                for &r in &refs {
                    write_u32_le(out, r);
                }
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
        r.expect_magic(MAGIC, "dictionary")?;
        let width = r.read_u8()? as usize;
        if width != 1 && width != 2 && width != 4 {
            return Err(Error::Decode("invalid index width".to_string()));
        }
        let dict_count = r.read_u32_le()? as usize;
        let mut dict = Vec::with_capacity(dict_count.min(r.remaining()));
        for _ in 0..dict_count {
            dict.push(read_value(&mut r, ty)?);
        }
        let mut refs = Vec::with_capacity(row_count.min(r.remaining()));
        for _ in 0..row_count {
            let idx = match width {
                1 => r.read_u8()? as u32,
                2 => r.read_u16_le()? as u32,
                _ => r.read_u32_le()?,
            };
            if idx as usize > dict_count {
                return Err(Error::Decode("dictionary index out of bounds".to_string()));
            }
            refs.push(idx);
        }
        r.finish("dictionary")?;
        Ok(PrimitiveStore::Dictionary { dict, refs })
    }

    fn summary(&self, column: &Column) -> BlockSummary {
        let rows = column.primitive_rows();
        BlockSummary::from_values(column.column_type(), rows.iter().map(|(_, v)| *v), true)
    }
}
