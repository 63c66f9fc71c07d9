use std::collections::BTreeMap;

use crate::block::DEFAULT_BLOCK_READER;
use crate::codec::{CodecKind, Compression};
use crate::expression::Expression;
use crate::{Error, Result};

pub const DEFAULT_BLOCK_SIZE: usize = 4 * 1024 * 1024;
pub const DEFAULT_ROW_GROUP_SIZE: usize = 10_000;

/// Smallest block that still fits a header and one framed block.
pub const MIN_BLOCK_SIZE: usize = 256;

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "tools-json", derive(serde::Serialize, serde::Deserialize))]
pub struct WriterConfig {
    block_size: usize,
    row_group_size: usize,
    block_reader_name: String,
    compression: Compression,
    forced_codecs: BTreeMap<String, CodecKind>,
}

impl Default for WriterConfig {
    fn default() -> Self {
        Self {
            block_size: DEFAULT_BLOCK_SIZE,
            row_group_size: DEFAULT_ROW_GROUP_SIZE,
            block_reader_name: DEFAULT_BLOCK_READER.to_string(),
            compression: Compression::None,
            forced_codecs: BTreeMap::new(),
        }
    }
}

impl WriterConfig {
    pub fn set_block_size(&mut self, block_size: usize) -> &mut Self {
        self.block_size = block_size;
        self
    }

    /// Rows buffered before a row group is sealed.
    pub fn set_row_group_size(&mut self, rows: usize) -> &mut Self {
        self.row_group_size = rows;
        self
    }

    pub fn set_block_reader_name(&mut self, name: impl Into<String>) -> &mut Self {
        self.block_reader_name = name.into();
        self
    }

    pub fn set_compression(&mut self, compression: Compression) -> &mut Self {
        self.compression = compression;
        self
    }

    /// Forces `kind` for the scalar column at dotted `path`, e.g. `"user.id"`.
    pub fn set_forced_codec(&mut self, path: impl Into<String>, kind: CodecKind) -> &mut Self {
        self.forced_codecs.insert(path.into(), kind);
        self
    }

    pub fn block_size(&self) -> usize {
        self.block_size
    }

    pub fn row_group_size(&self) -> usize {
        self.row_group_size
    }

    pub fn block_reader_name(&self) -> &str {
        &self.block_reader_name
    }

    pub fn compression(&self) -> Compression {
        self.compression
    }

    pub fn forced_codecs(&self) -> &BTreeMap<String, CodecKind> {
        &self.forced_codecs
    }

    pub(crate) fn validate(&self) -> Result<()> {
        if self.block_size < MIN_BLOCK_SIZE || i32::try_from(self.block_size).is_err() {
            return Err(Error::Other(format!(
                "block size {} out of range",
                self.block_size
            )));
        }
        if self.row_group_size == 0 {
            return Err(Error::Other("row group size must be positive".to_string()));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "tools-json", derive(serde::Serialize, serde::Deserialize))]
pub struct ReaderConfig {
    #[cfg_attr(feature = "tools-json", serde(skip))]
    block_skip_index: Option<Expression>,
    block_reader_override: Option<String>,
}

impl ReaderConfig {
    /// Blocks whose index proves no row can satisfy `expr` are not read.
    pub fn set_block_skip_index(&mut self, expr: Expression) -> &mut Self {
        self.block_skip_index = Some(expr);
        self
    }

    /// Resolves blocks with `name` instead of the class name in the file header.
    pub fn set_block_reader_override(&mut self, name: impl Into<String>) -> &mut Self {
        self.block_reader_override = Some(name.into());
        self
    }

    pub fn block_skip_index(&self) -> Option<&Expression> {
        self.block_skip_index.as_ref()
    }

    pub fn block_reader_override(&self) -> Option<&str> {
        self.block_reader_override.as_deref()
    }
}
