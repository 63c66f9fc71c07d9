use std::collections::VecDeque;
use std::io::{Read, Seek, SeekFrom};

use tracing::debug;

use crate::block::{BlockMeta, BlockReaderKind};
use crate::codec::{ColumnBinary, MakerRegistry};
use crate::config::ReaderConfig;
use crate::file::FileHeader;
use crate::index::BlockIndexNode;
use crate::spread::Spread;
use crate::{Error, Result};

/// Pull iterator over the blocks of one file, or of byte ranges within it.
///
/// A block belongs to a range when its slot start offset falls inside it, so
/// readers over disjoint ranges of the same file never see a block twice.
pub struct SpreadReader<R: Read + Seek> {
    stream: Option<R>,
    total_len: u64,
    header: FileHeader,
    block_reader: BlockReaderKind,
    config: ReaderConfig,
    registry: MakerRegistry,
    ranges: VecDeque<(u64, u64)>,
    /// Next slot of the current range and its exclusive end.
    cursor: Option<(u64, u64)>,
    pending: Option<LoadedBlock>,
    block_index: BlockIndexNode,
    current_block_id: Option<u32>,
    current_row_count: usize,
}

struct LoadedBlock {
    block_id: u32,
    row_count: usize,
    columns: Vec<ColumnBinary>,
}

impl<R: Read + Seek> SpreadReader<R> {
    /// Opens the whole stream.
    pub fn open_stream(stream: R, total_len: u64, config: ReaderConfig) -> Result<Self> {
        Self::open_stream_range(stream, total_len, config, 0, total_len)
    }

    /// Opens `[range_start, range_start + range_len)` of the stream.
    pub fn open_stream_range(
        mut stream: R,
        total_len: u64,
        config: ReaderConfig,
        range_start: u64,
        range_len: u64,
    ) -> Result<Self> {
        stream.seek(SeekFrom::Start(0))?;
        let header = FileHeader::read_from(&mut stream, total_len)?;
        let name = config
            .block_reader_override()
            .unwrap_or(header.block_reader_name());
        let block_reader = BlockReaderKind::resolve(name)?;
        debug!(
            block_size = header.block_size(),
            block_reader = block_reader.class_name(),
            total_len,
            "opened spread file"
        );
        let mut reader = Self {
            stream: Some(stream),
            total_len,
            header,
            block_reader,
            config,
            registry: MakerRegistry::default(),
            ranges: VecDeque::new(),
            cursor: None,
            pending: None,
            block_index: BlockIndexNode::new(),
            current_block_id: None,
            current_row_count: 0,
        };
        reader.add_range(range_start, range_len);
        Ok(reader)
    }

    /// Replaces the maker registry used to decode columns.
    pub fn set_registry(&mut self, registry: MakerRegistry) -> &mut Self {
        self.registry = registry;
        self
    }

    /// Queues another byte range; it is read after the ranges before it.
    pub fn add_range(&mut self, start: u64, len: u64) {
        let end = start.saturating_add(len).min(self.total_len);
        debug!(start, end, "queued byte range");
        self.ranges.push_back((start, end));
    }

    pub fn block_size(&self) -> usize {
        self.header.block_size()
    }

    pub fn block_reader_name(&self) -> &str {
        self.header.block_reader_name()
    }

    /// Layout used for blocks, after any override in the config.
    pub fn block_reader(&self) -> BlockReaderKind {
        self.block_reader
    }

    /// Summaries of every block whose headers were read so far.
    pub fn block_index(&self) -> &BlockIndexNode {
        &self.block_index
    }

    /// Rows in the block most recently returned by `next` or `next_raw`.
    pub fn current_row_count(&self) -> usize {
        self.current_row_count
    }

    pub fn current_block_id(&self) -> Option<u32> {
        self.current_block_id
    }

    pub fn has_next(&mut self) -> Result<bool> {
        if self.pending.is_none() {
            self.pending = self.read_next_block()?;
        }
        Ok(self.pending.is_some())
    }

    /// The next surviving block, decoded.
    pub fn next(&mut self) -> Result<Option<Spread>> {
        let Some(columns) = self.next_raw()? else {
            return Ok(None);
        };
        let mut spread = Spread::new();
        for binary in &columns {
            spread.add_column(self.registry.to_column(binary)?)?;
        }
        spread.set_row_count(self.current_row_count);
        Ok(Some(spread))
    }

    /// The next surviving block as encoded columns, payloads attached.
    pub fn next_raw(&mut self) -> Result<Option<Vec<ColumnBinary>>> {
        if !self.has_next()? {
            return Ok(None);
        }
        match self.pending.take() {
            Some(block) => {
                self.current_block_id = Some(block.block_id);
                self.current_row_count = block.row_count;
                Ok(Some(block.columns))
            }
            None => Ok(None),
        }
    }

    /// Drops the stream. Further reads report no more blocks.
    pub fn close(&mut self) {
        self.stream = None;
        self.ranges.clear();
        self.cursor = None;
        self.pending = None;
    }

    pub fn into_inner(mut self) -> Option<R> {
        self.stream.take()
    }

    fn slot_count(&self) -> u64 {
        let bs = self.header.block_size() as u64;
        self.total_len.div_ceil(bs)
    }

    /// Next slot to visit, advancing through queued ranges.
    fn next_slot(&mut self) -> Option<u64> {
        let bs = self.header.block_size() as u64;
        loop {
            if let Some((slot, end)) = self.cursor {
                if slot < end {
                    self.cursor = Some((slot + 1, end));
                    return Some(slot);
                }
                self.cursor = None;
            }
            let (start, end) = self.ranges.pop_front()?;
            let first = start.div_ceil(bs);
            let last = end.div_ceil(bs).min(self.slot_count());
            self.cursor = Some((first, last));
        }
    }

    fn read_next_block(&mut self) -> Result<Option<LoadedBlock>> {
        if self.stream.is_none() {
            return Ok(None);
        }
        while let Some(slot) = self.next_slot() {
            let block = match self.block_reader {
                BlockReaderKind::Default => self.read_slot(slot)?,
            };
            if let Some(block) = block {
                return Ok(Some(block));
            }
        }
        Ok(None)
    }

    /// Reads one slot. `None` when the slot is empty or pruned.
    fn read_slot(&mut self, slot: u64) -> Result<Option<LoadedBlock>> {
        let bs = self.header.block_size() as u64;
        let slot_start = slot * bs;
        let start = if slot == 0 {
            self.header.encoded_len() as u64
        } else {
            slot_start
        };
        let slot_end = slot_start.saturating_add(bs).min(self.total_len);
        let capacity = slot_end.saturating_sub(start);
        if capacity < 4 {
            return Ok(None);
        }
        let block_id = u32::try_from(slot)
            .map_err(|_| Error::Format(format!("block slot {slot} out of range")))?;
        let Some(stream) = self.stream.as_mut() else {
            return Ok(None);
        };
        stream.seek(SeekFrom::Start(start))?;
        let meta_len = read_be_u32(stream)? as u64;
        if meta_len == 0 {
            return Ok(None);
        }
        if 4 + meta_len + 4 > capacity {
            return Err(Error::Format(format!(
                "block {block_id} meta of {meta_len} bytes overruns its slot"
            )));
        }
        let mut meta_bytes = vec![0u8; meta_len as usize];
        stream.read_exact(&mut meta_bytes)?;
        let data_len = read_be_u32(stream)? as u64;
        if 8 + meta_len + data_len > capacity {
            return Err(Error::Format(format!(
                "block {block_id} data of {data_len} bytes overruns its slot"
            )));
        }
        let meta = BlockMeta::parse(&meta_bytes)?;

        let mut node = BlockIndexNode::new();
        for column in &meta.columns {
            self.registry
                .set_block_index_node(node.child_mut(&column.column_name), column, block_id)?;
        }
        self.block_index.merge(&node);

        if let Some(expr) = self.config.block_skip_index() {
            if let Some(candidates) = node.get_block_spread_index(expr)? {
                if !candidates.contains(&block_id) {
                    debug!(block_id, rows = meta.row_count, "block skipped by index");
                    return Ok(None);
                }
            }
        }

        let mut data = vec![0u8; data_len as usize];
        stream.read_exact(&mut data)?;
        debug!(block_id, rows = meta.row_count, columns = meta.columns.len(), "read block");
        Ok(Some(LoadedBlock {
            block_id,
            row_count: meta.row_count,
            columns: meta.attach(&data)?,
        }))
    }
}

fn read_be_u32<R: Read>(r: &mut R) -> Result<u32> {
    let mut b = [0u8; 4];
    r.read_exact(&mut b)?;
    Ok(u32::from_be_bytes(b))
}
