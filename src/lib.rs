//! Block-structured columnar storage for semi-structured rows.
//!
//! Rows are folded into a [`Spread`] of typed [`Column`]s, each column is
//! encoded by the cheapest applicable codec, and every row group becomes one
//! fixed-size block of a `$CLM` file. Per-block summaries feed a
//! [`BlockIndexNode`] so readers can skip blocks a predicate rules out.

pub mod allocator;
pub mod bitmap;
pub mod block;
pub mod codec;
pub mod column;
pub mod config;
pub mod error;
pub mod expression;
pub mod file;
pub mod filter;
pub mod index;
pub mod reader;
pub mod schema;
pub mod spread;
pub mod value;
pub mod writer;

pub use crate::allocator::{ColumnAllocator, MemoryAllocator};
pub use crate::codec::{
    CodecKind, ColumnBinary, ColumnBinaryMaker, Compression, EncodeContext, MakerRegistry,
};
pub use crate::column::{Cell, Column, ColumnKind};
pub use crate::config::{ReaderConfig, WriterConfig};
pub use crate::error::{Error, Result};
pub use crate::expression::Expression;
pub use crate::filter::{Filter, NumberOp, StringFilter};
pub use crate::index::{BlockIndex, BlockIndexNode, BlockSummary};
pub use crate::reader::SpreadReader;
pub use crate::schema::ColumnType;
pub use crate::spread::Spread;
pub use crate::value::{PrimitiveObject, Value};
pub use crate::writer::SpreadWriter;

#[cfg(test)]
mod tests;
