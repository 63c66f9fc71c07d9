use crate::codec::scalar::{ScalarCodec, ScalarMaker};
use crate::codec::{CodecKind, ColumnStats};
use crate::column::{Column, PrimitiveStore};
use crate::index::BlockSummary;
use crate::schema::ColumnType;
use crate::{Error, Result};

/// Column with no non-null row. Nothing is stored and nothing can be pruned.
pub(crate) struct UnsupportedCodec;

pub(crate) static UNSUPPORTED: ScalarMaker<UnsupportedCodec> = ScalarMaker(UnsupportedCodec);

impl ScalarCodec for UnsupportedCodec {
    const KIND: CodecKind = CodecKind::Unsupported;

    fn supports(&self, ty: ColumnType) -> bool {
        ty.is_primitive() || ty == ColumnType::Null
    }

    fn estimate_size(&self, stats: &ColumnStats) -> Option<usize> {
        (stats.non_null_count() == 0).then_some(0)
    }

    fn encode_payload(&self, column: &Column, _out: &mut Vec<u8>) -> Result<()> {
        if column.primitive_rows().is_empty() {
            Ok(())
        } else {
            Err(Error::Encode(format!(
                "column {} has values and cannot be stored without a payload",
                column.name()
            )))
        }
    }

    fn decode_store(
        &self,
        _ty: ColumnType,
        row_count: usize,
        payload: &[u8],
    ) -> Result<PrimitiveStore> {
        if !payload.is_empty() {
            return Err(Error::Decode("unsupported codec carries a payload".to_string()));
        }
        Ok(PrimitiveStore::Constant {
            value: None,
            len: row_count,
        })
    }

    fn summary(&self, _column: &Column) -> BlockSummary {
        BlockSummary::Unsupported
    }
}
