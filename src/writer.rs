use std::io::Write;

use tracing::{debug, warn};

use crate::block::{encode_block, framed_len};
use crate::codec::{ColumnBinary, EncodeContext, MakerRegistry};
use crate::config::WriterConfig;
use crate::file::FileHeader;
use crate::index::BlockIndexNode;
use crate::spread::Spread;
use crate::value::Value;
use crate::{Error, Result};

/// Rows between checks of the buffered size against the block capacity.
const SIZE_CHECK_INTERVAL: usize = 256;

/// Buffers rows into row groups and appends each as one block.
///
/// Block `k` starts at byte `k * block_size` (block 0 right after the file
/// header). Padding before a block is written only when that block is, so
/// the file ends with the last block's bytes. Dropping a writer discards
/// buffered rows; call [`SpreadWriter::close`].
pub struct SpreadWriter<W: Write> {
    out: Option<W>,
    config: WriterConfig,
    registry: MakerRegistry,
    header_len: usize,
    position: u64,
    next_block_id: u32,
    buffer: Spread,
    rows_since_check: usize,
    block_index: BlockIndexNode,
}

impl<W: Write> SpreadWriter<W> {
    /// Writes the file header to `out`.
    pub fn new(mut out: W, config: WriterConfig) -> Result<Self> {
        config.validate()?;
        let header = FileHeader::new(config.block_size(), config.block_reader_name());
        let bytes = header.encode()?;
        out.write_all(&bytes)?;
        debug!(
            block_size = config.block_size(),
            row_group_size = config.row_group_size(),
            "opened spread writer"
        );
        Ok(Self {
            out: Some(out),
            config,
            registry: MakerRegistry::default(),
            header_len: bytes.len(),
            position: bytes.len() as u64,
            next_block_id: 0,
            buffer: Spread::new(),
            rows_since_check: 0,
            block_index: BlockIndexNode::new(),
        })
    }

    pub fn set_registry(&mut self, registry: MakerRegistry) -> &mut Self {
        self.registry = registry;
        self
    }

    /// Summaries of every block written so far.
    pub fn block_index(&self) -> &BlockIndexNode {
        &self.block_index
    }

    pub fn blocks_written(&self) -> u32 {
        self.next_block_id
    }

    pub fn buffered_rows(&self) -> usize {
        self.buffer.row_count()
    }

    /// Buffers one object row, sealing a row group when it is full.
    pub fn add_row(&mut self, row: &Value) -> Result<()> {
        self.buffer.add_row(row)?;
        self.rows_since_check += 1;
        if self.buffer.row_count() >= self.config.row_group_size() {
            return self.flush_rows();
        }
        if self.rows_since_check >= SIZE_CHECK_INTERVAL {
            self.rows_since_check = 0;
            let estimate: u64 = self
                .buffer
                .columns()
                .iter()
                .map(|c| c.logical_data_size())
                .sum();
            if estimate >= self.block_capacity(self.next_block_id) as u64 {
                debug!(rows = self.buffer.row_count(), estimate, "row group near block capacity");
                return self.flush_rows();
            }
        }
        Ok(())
    }

    /// Writes buffered rows, then `spread` as its own row group(s).
    pub fn write_spread(&mut self, spread: &Spread) -> Result<()> {
        self.flush_rows()?;
        self.write_group(spread.clone())
    }

    /// Writes buffered rows and flushes the underlying writer.
    pub fn flush(&mut self) -> Result<()> {
        self.flush_rows()?;
        if let Some(out) = self.out.as_mut() {
            out.flush()?;
        }
        Ok(())
    }

    /// Writes what is buffered and returns the underlying writer.
    pub fn close(mut self) -> Result<W> {
        self.flush()?;
        self.out
            .take()
            .ok_or_else(|| Error::Other("writer already closed".to_string()))
    }

    fn flush_rows(&mut self) -> Result<()> {
        self.rows_since_check = 0;
        if self.buffer.row_count() == 0 {
            return Ok(());
        }
        let group = std::mem::take(&mut self.buffer);
        self.write_group(group)
    }

    fn block_capacity(&self, block_id: u32) -> usize {
        if block_id == 0 {
            self.config.block_size().saturating_sub(self.header_len)
        } else {
            self.config.block_size()
        }
    }

    /// Encodes `group` into one block, halving it until each part fits.
    fn write_group(&mut self, mut group: Spread) -> Result<()> {
        let rows = group.row_count();
        if rows == 0 {
            return Ok(());
        }
        group.set_row_count(rows);
        let columns = self.encode_columns(&group)?;
        let len = framed_len(&columns);
        let capacity = self.block_capacity(self.next_block_id);
        if len <= capacity {
            return self.write_block(rows, &columns);
        }
        if rows == 1 {
            return Err(Error::Encode(format!(
                "a single row needs {len} bytes, block {} holds {capacity}",
                self.next_block_id
            )));
        }
        let mid = rows / 2;
        debug!(rows, encoded = len, capacity, "splitting row group");
        let head = group.take(&(0..mid).collect::<Vec<_>>())?;
        let tail = group.take(&(mid..rows).collect::<Vec<_>>())?;
        drop(group);
        self.write_group(head)?;
        self.write_group(tail)
    }

    fn encode_columns(&self, group: &Spread) -> Result<Vec<ColumnBinary>> {
        let mut ctx = EncodeContext::new(&self.registry);
        ctx.set_compression(self.config.compression())
            .set_forced_codecs(self.config.forced_codecs());
        group.columns().iter().map(|c| ctx.encode(c)).collect()
    }

    fn write_block(&mut self, rows: usize, columns: &[ColumnBinary]) -> Result<()> {
        let block_id = self.next_block_id;
        let bytes = encode_block(rows, columns)?;
        let out = self
            .out
            .as_mut()
            .ok_or_else(|| Error::Other("writer already closed".to_string()))?;
        let slot_start = block_id as u64 * self.config.block_size() as u64;
        if self.position < slot_start {
            let pad = vec![0u8; (slot_start - self.position) as usize];
            out.write_all(&pad)?;
            self.position = slot_start;
        }
        out.write_all(&bytes)?;
        self.position += bytes.len() as u64;

        for column in columns {
            self.registry.set_block_index_node(
                self.block_index.child_mut(&column.column_name),
                column,
                block_id,
            )?;
        }
        debug!(block_id, rows, bytes = bytes.len(), "wrote block");
        self.next_block_id = block_id
            .checked_add(1)
            .ok_or_else(|| Error::Encode("too many blocks".to_string()))?;
        Ok(())
    }
}

impl<W: Write> Drop for SpreadWriter<W> {
    fn drop(&mut self) {
        if self.out.is_some() && self.buffer.row_count() > 0 {
            warn!(rows = self.buffer.row_count(), "spread writer dropped with unwritten rows");
        }
    }
}
