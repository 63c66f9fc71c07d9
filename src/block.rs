//! Block framing.
//!
//! ```text
//! meta_len u32 | meta | data_len u32 | data | zero padding to the slot end
//! meta := row_count u32 | column_count u32 | column header*
//! ```
//! Column headers are written by [`ColumnBinary`]; `data` is every payload
//! concatenated in header pre-order. A `meta_len` of zero marks an empty slot.

use crate::codec::ColumnBinary;
use crate::codec::binary::BeReader;
use crate::{Error, Result};

pub const DEFAULT_BLOCK_READER: &str = "default";
pub const DEFAULT_BLOCK_READER_CLASS: &str = "spread_columnar::block::DefaultBlockReader";

/// Bytes of framing around `meta` and `data`.
pub(crate) const FRAME_OVERHEAD: usize = 4 + 4 + 4 + 4;

/// Block layouts a file header can name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockReaderKind {
    Default,
}

impl BlockReaderKind {
    /// Resolves a short or fully qualified block reader name.
    pub fn resolve(name: &str) -> Result<Self> {
        match name {
            DEFAULT_BLOCK_READER | DEFAULT_BLOCK_READER_CLASS => Ok(BlockReaderKind::Default),
            other => Err(Error::Format(format!("unknown block reader: {other}"))),
        }
    }

    pub fn class_name(self) -> &'static str {
        match self {
            BlockReaderKind::Default => DEFAULT_BLOCK_READER_CLASS,
        }
    }
}

/// Encoded size of a block holding `columns`, without padding.
pub(crate) fn framed_len(columns: &[ColumnBinary]) -> usize {
    FRAME_OVERHEAD + columns.iter().map(ColumnBinary::stored_len).sum::<usize>()
}

pub(crate) fn encode_block(row_count: usize, columns: &[ColumnBinary]) -> Result<Vec<u8>> {
    let mut meta = Vec::new();
    let mut data = Vec::new();
    meta.extend_from_slice(&be_u32(row_count, "row count")?.to_be_bytes());
    meta.extend_from_slice(&be_u32(columns.len(), "column count")?.to_be_bytes());
    for column in columns {
        column.write_to(&mut meta, &mut data)?;
    }
    let mut out = Vec::with_capacity(8 + meta.len() + data.len());
    out.extend_from_slice(&be_u32(meta.len(), "block meta")?.to_be_bytes());
    out.extend_from_slice(&meta);
    out.extend_from_slice(&be_u32(data.len(), "block data")?.to_be_bytes());
    out.extend_from_slice(&data);
    Ok(out)
}

fn be_u32(n: usize, what: &str) -> Result<u32> {
    u32::try_from(n).map_err(|_| Error::Encode(format!("{what} too large: {n}")))
}

/// Parsed block headers; payloads are attached once the data is read.
#[derive(Debug)]
pub(crate) struct BlockMeta {
    pub(crate) row_count: usize,
    pub(crate) columns: Vec<ColumnBinary>,
    ranges: Vec<(u32, u32)>,
}

impl BlockMeta {
    pub(crate) fn parse(bytes: &[u8]) -> Result<Self> {
        let mut r = BeReader::new(bytes);
        let row_count = r.read_u32()? as usize;
        let column_count = r.read_u32()? as usize;
        let mut columns = Vec::with_capacity(column_count.min(r.remaining()));
        let mut ranges = Vec::new();
        for _ in 0..column_count {
            let column = ColumnBinary::read_header(&mut r, &mut ranges, 0)?;
            if column.row_count as usize != row_count {
                return Err(Error::Format(format!(
                    "column {} has {} rows, block has {row_count}",
                    column.column_name, column.row_count
                )));
            }
            columns.push(column);
        }
        if r.remaining() != 0 {
            return Err(Error::Format("trailing bytes after block headers".to_string()));
        }
        Ok(Self {
            row_count,
            columns,
            ranges,
        })
    }

    pub(crate) fn attach(mut self, data: &[u8]) -> Result<Vec<ColumnBinary>> {
        let mut ranges = self.ranges.iter();
        for column in self.columns.iter_mut() {
            column.attach_payloads(&mut ranges, data)?;
        }
        Ok(self.columns)
    }
}
