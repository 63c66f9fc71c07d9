use crate::codec::CodecKind;
use crate::codec::compress::Compression;
use crate::schema::ColumnType;
use crate::{Error, Result};

/// Header bytes of one column apart from its name and meta: name length,
/// type, codec, compression, counts, sizes, meta length, payload
/// offset and length, child count.
const HEADER_FIXED_LEN: usize = 2 + 1 + 2 + 1 + 4 + 4 + 8 + 4 + 4 + 4 + 4 + 2;

/// The encoded form of one column inside a block.
///
/// `payload` is compressed with `compression`; `meta` holds the block summary
/// and is never compressed. Nested columns keep their encoded children.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnBinary {
    pub column_name: String,
    pub column_type: ColumnType,
    pub codec: CodecKind,
    pub compression: Compression,
    pub row_count: u32,
    pub null_count: u32,
    pub logical_data_size: u64,
    pub uncompressed_len: u32,
    pub meta: Vec<u8>,
    pub payload: Vec<u8>,
    /// Rows to materialize, ascending (repeats allowed). Reader-side only.
    pub load_index: Option<Vec<i64>>,
    /// Per-row repeat counts applied before `load_index`. Reader-side only.
    pub repetitions: Option<Vec<u32>>,
    pub children: Vec<ColumnBinary>,
}

impl ColumnBinary {
    pub fn new(column_name: impl Into<String>, column_type: ColumnType, codec: CodecKind) -> Self {
        Self {
            column_name: column_name.into(),
            column_type,
            codec,
            compression: Compression::None,
            row_count: 0,
            null_count: 0,
            logical_data_size: 0,
            uncompressed_len: 0,
            meta: Vec::new(),
            payload: Vec::new(),
            load_index: None,
            repetitions: None,
            children: Vec::new(),
        }
    }

    pub fn set_load_index(&mut self, load_index: Vec<i64>) -> &mut Self {
        self.load_index = Some(load_index);
        self
    }

    pub fn set_repetitions(&mut self, repetitions: Vec<u32>) -> &mut Self {
        self.repetitions = Some(repetitions);
        self
    }

    pub fn child(&self, name: &str) -> Option<&ColumnBinary> {
        self.children.iter().find(|c| c.column_name == name)
    }

    /// The payload after decompression, checked against `uncompressed_len`.
    pub fn plain_payload(&self) -> Result<Vec<u8>> {
        let expected = self.uncompressed_len as usize;
        let mut plain = Vec::with_capacity(expected.min(self.payload.len().saturating_mul(8)));
        self.compression
            .decompress_into(&self.payload, expected, &mut plain)?;
        if plain.len() != expected {
            return Err(Error::Decode(format!(
                "{} payload of {} is {} bytes, header says {expected}",
                self.codec.name(),
                self.column_name,
                plain.len()
            )));
        }
        Ok(plain)
    }

    /// Compresses `plain` into the payload and records its length.
    pub(crate) fn set_plain_payload(
        &mut self,
        plain: &[u8],
        compression: Compression,
    ) -> Result<()> {
        self.uncompressed_len = u32::try_from(plain.len())
            .map_err(|_| Error::Encode("payload too large".to_string()))?;
        let compression = if plain.is_empty() {
            Compression::None
        } else {
            compression
        };
        compression.compress_into(&mut self.payload, plain)?;
        self.compression = compression;
        Ok(())
    }

    /// Bytes this column and its children occupy in a block.
    pub fn stored_len(&self) -> usize {
        let header = HEADER_FIXED_LEN + self.column_name.len() + self.meta.len();
        header
            + self.payload.len()
            + self.children.iter().map(ColumnBinary::stored_len).sum::<usize>()
    }

    /// Appends the header tree to `meta_out` and every payload, pre-order, to `data_out`.
    pub(crate) fn write_to(&self, meta_out: &mut Vec<u8>, data_out: &mut Vec<u8>) -> Result<()> {
        let name = self.column_name.as_bytes();
        let name_len = u16::try_from(name.len())
            .map_err(|_| Error::Encode(format!("column name too long: {}", self.column_name)))?;
        meta_out.extend_from_slice(&name_len.to_be_bytes());
        meta_out.extend_from_slice(name);
        meta_out.push(self.column_type.id());
        meta_out.extend_from_slice(&self.codec.id().to_be_bytes());
        meta_out.push(self.compression.id());
        meta_out.extend_from_slice(&self.row_count.to_be_bytes());
        meta_out.extend_from_slice(&self.null_count.to_be_bytes());
        meta_out.extend_from_slice(&self.logical_data_size.to_be_bytes());
        meta_out.extend_from_slice(&self.uncompressed_len.to_be_bytes());
        meta_out.extend_from_slice(&be_len(self.meta.len())?.to_be_bytes());
        meta_out.extend_from_slice(&self.meta);
        meta_out.extend_from_slice(&be_len(data_out.len())?.to_be_bytes());
        meta_out.extend_from_slice(&be_len(self.payload.len())?.to_be_bytes());
        data_out.extend_from_slice(&self.payload);
        let child_count = u16::try_from(self.children.len())
            .map_err(|_| Error::Encode("too many child columns".to_string()))?;
        meta_out.extend_from_slice(&child_count.to_be_bytes());
        for child in &self.children {
            child.write_to(meta_out, data_out)?;
        }
        Ok(())
    }

    /// Parses one header tree. Payloads are left empty; their `(offset, len)`
    /// inside the block data are appended to `ranges` in pre-order.
    pub(crate) fn read_header(
        r: &mut BeReader<'_>,
        ranges: &mut Vec<(u32, u32)>,
        depth: usize,
    ) -> Result<ColumnBinary> {
        if depth > MAX_NESTING {
            return Err(Error::Format("column nesting too deep".to_string()));
        }
        let name_len = r.read_u16()? as usize;
        let column_name = std::str::from_utf8(r.take(name_len)?)
            .map_err(|_| Error::Format("column name is not UTF-8".to_string()))?
            .to_string();
        let column_type = ColumnType::from_id(r.read_u8()?)?;
        let codec = CodecKind::from_id(r.read_u16()?)?;
        let compression = Compression::from_id(r.read_u8()?)?;
        let row_count = r.read_u32()?;
        let null_count = r.read_u32()?;
        let logical_data_size = r.read_u64()?;
        let uncompressed_len = r.read_u32()?;
        let meta_len = r.read_u32()? as usize;
        let meta = r.take(meta_len)?.to_vec();
        let offset = r.read_u32()?;
        let len = r.read_u32()?;
        ranges.push((offset, len));
        let child_count = r.read_u16()? as usize;
        let mut children = Vec::with_capacity(child_count.min(r.remaining()));
        for _ in 0..child_count {
            children.push(Self::read_header(r, ranges, depth + 1)?);
        }
        Ok(ColumnBinary {
            column_name,
            column_type,
            codec,
            compression,
            row_count,
            null_count,
            logical_data_size,
            uncompressed_len,
            meta,
            payload: Vec::new(),
            load_index: None,
            repetitions: None,
            children,
        })
    }

    /// Fills payloads from `data` in the pre-order `read_header` recorded.
    pub(crate) fn attach_payloads(
        &mut self,
        ranges: &mut std::slice::Iter<'_, (u32, u32)>,
        data: &[u8],
    ) -> Result<()> {
        let &(offset, len) = ranges
            .next()
            .ok_or_else(|| Error::Format("missing payload range".to_string()))?;
        let start = offset as usize;
        let end = start
            .checked_add(len as usize)
            .ok_or_else(|| Error::Format("payload range overflow".to_string()))?;
        let bytes = data
            .get(start..end)
            .ok_or_else(|| Error::Format("payload range out of block".to_string()))?;
        self.payload = bytes.to_vec();
        for child in self.children.iter_mut() {
            child.attach_payloads(ranges, data)?;
        }
        Ok(())
    }
}

const MAX_NESTING: usize = 64;

fn be_len(n: usize) -> Result<u32> {
    u32::try_from(n).map_err(|_| Error::Encode("block section too large".to_string()))
}

/// Big-endian cursor over block framing. Truncation is a format error.
pub(crate) struct BeReader<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> BeReader<'a> {
    pub(crate) fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, pos: 0 }
    }

    pub(crate) fn remaining(&self) -> usize {
        self.bytes.len() - self.pos
    }

    pub(crate) fn take(&mut self, n: usize) -> Result<&'a [u8]> {
        let end = self
            .pos
            .checked_add(n)
            .ok_or_else(|| Error::Format("block offset overflow".to_string()))?;
        if end > self.bytes.len() {
            return Err(Error::Format("truncated block".to_string()));
        }
        let slice = &self.bytes[self.pos..end];
        self.pos = end;
        Ok(slice)
    }

    pub(crate) fn read_u8(&mut self) -> Result<u8> {
        Ok(self.take(1)?[0])
    }

    pub(crate) fn read_u16(&mut self) -> Result<u16> {
        let b = self.take(2)?;
        Ok(u16::from_be_bytes([b[0], b[1]]))
    }

    pub(crate) fn read_u32(&mut self) -> Result<u32> {
        let b = self.take(4)?;
        Ok(u32::from_be_bytes([b[0], b[1], b[2], b[3]]))
    }

    pub(crate) fn read_u64(&mut self) -> Result<u64> {
        let b = self.take(8)?;
        Ok(u64::from_be_bytes([
            b[0], b[1], b[2], b[3], b[4], b[5], b[6], b[7],
        ]))
    }
}
