//! Column codecs.
//!
//! Every codec is a [`ColumnBinaryMaker`] identified by a stable
//! [`CodecKind`] id written into each column header. Scalar codecs pick a
//! physical layout for a single-typed column; the array, spread and union
//! makers encode their own row structure and recurse into child columns.

mod array;
pub mod binary;
pub mod compress;
mod constant;
mod dictionary;
mod dump;
mod null_optimized;
mod range;
mod run_length;
mod scalar;
mod select;
mod spread;
mod union;
mod unsupported;
pub(crate) mod wire;

use std::collections::BTreeMap;

use tracing::{debug, warn};

use crate::allocator::MemoryAllocator;
use crate::column::Column;
use crate::index::BlockIndexNode;
use crate::schema::ColumnType;
use crate::{Error, Result};

pub use binary::ColumnBinary;
pub use compress::Compression;
pub use select::{ColumnStats, select_codec};

/// Stable codec identifiers. Ids are part of the file format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "tools-json", derive(serde::Serialize, serde::Deserialize))]
pub enum CodecKind {
    /// All rows null; no payload.
    Unsupported,
    Dump,
    Constant,
    Range,
    Dictionary,
    RunLength,
    NullOptimized,
    Array,
    Spread,
    Union,
}

impl CodecKind {
    pub const ALL: [CodecKind; 10] = [
        CodecKind::Unsupported,
        CodecKind::Dump,
        CodecKind::Constant,
        CodecKind::Range,
        CodecKind::Dictionary,
        CodecKind::RunLength,
        CodecKind::NullOptimized,
        CodecKind::Array,
        CodecKind::Spread,
        CodecKind::Union,
    ];

    pub fn id(self) -> u16 {
        match self {
            CodecKind::Unsupported => 0,
            CodecKind::Dump => 1,
            CodecKind::Constant => 2,
            CodecKind::Range => 3,
            CodecKind::Dictionary => 4,
            CodecKind::RunLength => 5,
            CodecKind::NullOptimized => 6,
            CodecKind::Array => 10,
            CodecKind::Spread => 11,
            CodecKind::Union => 12,
        }
    }

    pub fn from_id(id: u16) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|k| k.id() == id)
            .ok_or_else(|| Error::UnsupportedCodec(format!("unknown codec id: {id}")))
    }

    pub fn name(self) -> &'static str {
        match self {
            CodecKind::Unsupported => "unsupported",
            CodecKind::Dump => "dump",
            CodecKind::Constant => "constant",
            CodecKind::Range => "range",
            CodecKind::Dictionary => "dictionary",
            CodecKind::RunLength => "run_length",
            CodecKind::NullOptimized => "null_optimized",
            CodecKind::Array => "array",
            CodecKind::Spread => "spread",
            CodecKind::Union => "union",
        }
    }

    pub fn from_name(name: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|k| k.name() == name)
            .ok_or_else(|| Error::UnsupportedCodec(format!("unknown codec name: {name}")))
    }

    pub fn is_scalar(self) -> bool {
        !matches!(self, CodecKind::Array | CodecKind::Spread | CodecKind::Union)
    }
}

/// Converts between a [`Column`] and its [`ColumnBinary`].
///
/// Implementations are stateless; one instance serves every column of a file.
pub trait ColumnBinaryMaker: Send + Sync {
    fn kind(&self) -> CodecKind;

    /// Whether this maker can encode a column of type `ty`.
    fn supports(&self, ty: ColumnType) -> bool;

    /// Predicted payload size before compression, `None` when not applicable.
    fn estimate_size(&self, stats: &ColumnStats) -> Option<usize>;

    fn to_binary(&self, column: &Column, ctx: &EncodeContext<'_>) -> Result<ColumnBinary>;

    /// Decodes rows `plan` (all rows when `None`). Plan entries past the
    /// column become null rows.
    fn to_column_planned(
        &self,
        binary: &ColumnBinary,
        plan: Option<&[usize]>,
        registry: &MakerRegistry,
    ) -> Result<Column>;

    /// Like [`Self::to_column_planned`], writing into `allocator` instead.
    fn load_planned(
        &self,
        binary: &ColumnBinary,
        plan: Option<&[usize]>,
        registry: &MakerRegistry,
        allocator: &mut dyn MemoryAllocator,
    ) -> Result<()>;

    /// Registers what `binary` knows about its values as block `block_id`.
    fn set_block_index_node(
        &self,
        node: &mut BlockIndexNode,
        binary: &ColumnBinary,
        block_id: u32,
        registry: &MakerRegistry,
    ) -> Result<()>;

    /// Decodes `binary`, honoring its `repetitions` and `load_index`.
    fn to_column(&self, binary: &ColumnBinary, registry: &MakerRegistry) -> Result<Column> {
        let plan = load_plan(binary)?;
        self.to_column_planned(binary, plan.as_deref(), registry)
    }

    /// Streams `binary` into `allocator`, honoring its `repetitions` and `load_index`.
    fn load_in_memory_storage(
        &self,
        binary: &ColumnBinary,
        registry: &MakerRegistry,
        allocator: &mut dyn MemoryAllocator,
    ) -> Result<()> {
        let plan = load_plan(binary)?;
        self.load_planned(binary, plan.as_deref(), registry, allocator)
    }
}

/// Codec id to maker table. Built once per reader or writer.
#[derive(Clone)]
pub struct MakerRegistry {
    makers: BTreeMap<u16, &'static dyn ColumnBinaryMaker>,
}

impl Default for MakerRegistry {
    fn default() -> Self {
        let mut out = Self::empty();
        out.register(&unsupported::UNSUPPORTED)
            .register(&dump::DUMP)
            .register(&constant::CONSTANT)
            .register(&range::RANGE)
            .register(&dictionary::DICTIONARY)
            .register(&run_length::RUN_LENGTH)
            .register(&null_optimized::NULL_OPTIMIZED)
            .register(&array::ARRAY)
            .register(&spread::SPREAD)
            .register(&union::UNION);
        out
    }
}

impl core::fmt::Debug for MakerRegistry {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_list()
            .entries(self.makers.values().map(|m| m.kind()))
            .finish()
    }
}

impl MakerRegistry {
    pub fn empty() -> Self {
        Self {
            makers: BTreeMap::new(),
        }
    }

    pub fn register(&mut self, maker: &'static dyn ColumnBinaryMaker) -> &mut Self {
        self.makers.insert(maker.kind().id(), maker);
        self
    }

    pub fn get(&self, kind: CodecKind) -> Result<&'static dyn ColumnBinaryMaker> {
        self.makers
            .get(&kind.id())
            .copied()
            .ok_or_else(|| Error::UnsupportedCodec(format!("no maker for codec {}", kind.name())))
    }

    pub fn get_by_name(&self, name: &str) -> Result<&'static dyn ColumnBinaryMaker> {
        self.get(CodecKind::from_name(name)?)
    }

    pub fn makers(&self) -> impl Iterator<Item = &'static dyn ColumnBinaryMaker> + '_ {
        self.makers.values().copied()
    }

    /// Decodes `binary` with the maker its header names.
    pub fn to_column(&self, binary: &ColumnBinary) -> Result<Column> {
        self.get(binary.codec)?.to_column(binary, self)
    }

    pub(crate) fn to_column_planned(
        &self,
        binary: &ColumnBinary,
        plan: Option<&[usize]>,
    ) -> Result<Column> {
        self.get(binary.codec)?
            .to_column_planned(binary, plan, self)
    }

    pub fn load_in_memory_storage(
        &self,
        binary: &ColumnBinary,
        allocator: &mut dyn MemoryAllocator,
    ) -> Result<()> {
        self.get(binary.codec)?
            .load_in_memory_storage(binary, self, allocator)
    }

    pub(crate) fn load_planned(
        &self,
        binary: &ColumnBinary,
        plan: Option<&[usize]>,
        allocator: &mut dyn MemoryAllocator,
    ) -> Result<()> {
        self.get(binary.codec)?
            .load_planned(binary, plan, self, allocator)
    }

    pub fn set_block_index_node(
        &self,
        node: &mut BlockIndexNode,
        binary: &ColumnBinary,
        block_id: u32,
    ) -> Result<()> {
        self.get(binary.codec)?
            .set_block_index_node(node, binary, block_id, self)
    }
}

/// Settings threaded through one column tree while encoding.
#[derive(Debug, Clone)]
pub struct EncodeContext<'a> {
    registry: &'a MakerRegistry,
    compression: Compression,
    forced: Option<&'a BTreeMap<String, CodecKind>>,
    path: String,
}

impl<'a> EncodeContext<'a> {
    pub fn new(registry: &'a MakerRegistry) -> Self {
        Self {
            registry,
            compression: Compression::None,
            forced: None,
            path: String::new(),
        }
    }

    pub fn set_compression(&mut self, compression: Compression) -> &mut Self {
        self.compression = compression;
        self
    }

    /// Codec overrides keyed by dotted column path, e.g. `"user.id"`.
    pub fn set_forced_codecs(&mut self, forced: &'a BTreeMap<String, CodecKind>) -> &mut Self {
        self.forced = Some(forced);
        self
    }

    pub fn registry(&self) -> &'a MakerRegistry {
        self.registry
    }

    pub fn compression(&self) -> Compression {
        self.compression
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub(crate) fn child(&self, name: &str) -> EncodeContext<'a> {
        let path = if self.path.is_empty() {
            name.to_string()
        } else {
            format!("{}.{name}", self.path)
        };
        EncodeContext {
            registry: self.registry,
            compression: self.compression,
            forced: self.forced,
            path,
        }
    }

    /// Encodes `column` as the child `column.name()` of the current path.
    pub fn encode(&self, column: &Column) -> Result<ColumnBinary> {
        self.child(column.name()).encode_here(column)
    }

    /// Encodes `column` at the current path with its forced codec, or the
    /// cheapest one that applies. Only scalar columns can be forced.
    pub(crate) fn encode_here(&self, column: &Column) -> Result<ColumnBinary> {
        let forced = if column.column_type().is_primitive() {
            self.forced.and_then(|f| f.get(self.path.as_str())).copied()
        } else {
            None
        };
        let kind = match forced {
            Some(kind) => {
                let maker = self.registry.get(kind)?;
                if maker.supports(column.column_type())
                    && maker.estimate_size(&ColumnStats::collect(column)?).is_some()
                {
                    kind
                } else {
                    warn!(
                        path = self.path.as_str(),
                        codec = kind.name(),
                        "forced codec cannot encode column; selecting automatically"
                    );
                    select_codec(column, self.registry)?
                }
            }
            None => select_codec(column, self.registry)?,
        };
        debug!(
            path = self.path.as_str(),
            codec = kind.name(),
            rows = column.len(),
            "encoding column"
        );
        self.registry.get(kind)?.to_binary(column, self)
    }
}

/// Resolves `repetitions` and `load_index` into the source row of every output row.
///
/// The load index is validated before anything else is looked at.
pub(crate) fn load_plan(binary: &ColumnBinary) -> Result<Option<Vec<usize>>> {
    let load_index = match &binary.load_index {
        Some(idx) => Some(validate_load_index(idx)?),
        None => None,
    };
    let expanded = match &binary.repetitions {
        Some(reps) => {
            let mut rows = Vec::new();
            for (row, &n) in reps.iter().enumerate() {
                rows.extend(std::iter::repeat_n(row, n as usize));
            }
            Some(rows)
        }
        None => None,
    };
    Ok(match (load_index, expanded) {
        (None, None) => None,
        (Some(idx), None) => Some(idx),
        (None, Some(rows)) => Some(rows),
        (Some(idx), Some(rows)) => Some(
            idx.into_iter()
                .map(|k| rows.get(k).copied().unwrap_or(usize::MAX))
                .collect(),
        ),
    })
}

fn validate_load_index(idx: &[i64]) -> Result<Vec<usize>> {
    let mut out = Vec::with_capacity(idx.len());
    let mut prev: Option<i64> = None;
    for (pos, &v) in idx.iter().enumerate() {
        if v < 0 {
            return Err(Error::LoadIndex(format!("negative index {v} at position {pos}")));
        }
        if let Some(p) = prev {
            if v < p {
                return Err(Error::LoadIndex(format!(
                    "index {v} at position {pos} is below the previous index {p}"
                )));
            }
        }
        prev = Some(v);
        out.push(
            usize::try_from(v)
                .map_err(|_| Error::LoadIndex(format!("index {v} does not fit in memory")))?,
        );
    }
    Ok(out)
}
