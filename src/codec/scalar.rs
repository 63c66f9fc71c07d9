use crate::allocator::MemoryAllocator;
use crate::codec::wire::usize_to_u32;
use crate::codec::{
    CodecKind, ColumnBinary, ColumnBinaryMaker, ColumnStats, EncodeContext, MakerRegistry,
};
use crate::column::{Column, PrimitiveStore};
use crate::index::{BlockIndexNode, BlockSummary};
use crate::schema::ColumnType;
use crate::{Error, Result};

/// Physical layout of a single-typed column.
///
/// The payload handed to `decode_store` is already decompressed.
pub(crate) trait ScalarCodec: Send + Sync {
    const KIND: CodecKind;

    fn supports(&self, ty: ColumnType) -> bool {
        ty.is_primitive()
    }

    fn estimate_size(&self, stats: &ColumnStats) -> Option<usize>;

    fn encode_payload(&self, column: &Column, out: &mut Vec<u8>) -> Result<()>;

    fn decode_store(
        &self,
        ty: ColumnType,
        row_count: usize,
        payload: &[u8],
    ) -> Result<PrimitiveStore>;

    fn summary(&self, column: &Column) -> BlockSummary {
        let rows = column.primitive_rows();
        BlockSummary::from_values(column.column_type(), rows.iter().map(|(_, v)| *v), false)
    }
}

pub(crate) struct ScalarMaker<C>(pub(crate) C);

impl<C: ScalarCodec> ScalarMaker<C> {
    fn decode(&self, binary: &ColumnBinary) -> Result<PrimitiveStore> {
        if !self.0.supports(binary.column_type) {
            return Err(Error::Decode(format!(
                "{} cannot hold {:?}",
                C::KIND.name(),
                binary.column_type
            )));
        }
        let plain = binary.plain_payload()?;
        self.0
            .decode_store(binary.column_type, binary.row_count as usize, &plain)
    }
}

impl<C: ScalarCodec> ColumnBinaryMaker for ScalarMaker<C> {
    fn kind(&self) -> CodecKind {
        C::KIND
    }

    fn supports(&self, ty: ColumnType) -> bool {
        self.0.supports(ty)
    }

    fn estimate_size(&self, stats: &ColumnStats) -> Option<usize> {
        self.0.estimate_size(stats)
    }

    fn to_binary(&self, column: &Column, ctx: &EncodeContext<'_>) -> Result<ColumnBinary> {
        let ty = column.column_type();
        if !self.0.supports(ty) {
            return Err(Error::Encode(format!(
                "{} cannot encode {ty:?}",
                C::KIND.name()
            )));
        }
        let mut plain = Vec::new();
        self.0.encode_payload(column, &mut plain)?;
        let mut binary = ColumnBinary::new(column.name(), ty, C::KIND);
        binary.row_count = usize_to_u32(column.len(), "row count")?;
        binary.null_count = usize_to_u32(column.null_count(), "null count")?;
        binary.logical_data_size = column.logical_data_size();
        binary.set_plain_payload(&plain, ctx.compression())?;
        self.0.summary(column).encode(&mut binary.meta)?;
        Ok(binary)
    }

    fn to_column_planned(
        &self,
        binary: &ColumnBinary,
        plan: Option<&[usize]>,
        _registry: &MakerRegistry,
    ) -> Result<Column> {
        let store = self.decode(binary)?;
        let column = Column::from_store(
            binary.column_name.clone(),
            binary.column_type,
            binary.row_count as usize,
            store,
        );
        match plan {
            None => Ok(column),
            Some(rows) => column.take(rows),
        }
    }

    fn load_planned(
        &self,
        binary: &ColumnBinary,
        plan: Option<&[usize]>,
        _registry: &MakerRegistry,
        allocator: &mut dyn MemoryAllocator,
    ) -> Result<()> {
        let store = self.decode(binary)?;
        let row_count = binary.row_count as usize;
        let mut put = |out_row: usize, src_row: usize| -> Result<()> {
            let v = if src_row < row_count {
                store.get(src_row)
            } else {
                None
            };
            match v {
                Some(v) => allocator.set_primitive(out_row, v),
                None => allocator.set_null(out_row),
            }
        };
        let count = match plan {
            None => {
                for row in 0..row_count {
                    put(row, row)?;
                }
                row_count
            }
            Some(rows) => {
                for (out_row, &src_row) in rows.iter().enumerate() {
                    put(out_row, src_row)?;
                }
                rows.len()
            }
        };
        allocator.set_value_count(count)
    }

    fn set_block_index_node(
        &self,
        node: &mut BlockIndexNode,
        binary: &ColumnBinary,
        block_id: u32,
        _registry: &MakerRegistry,
    ) -> Result<()> {
        if let Some(summary) = BlockSummary::decode(&binary.meta)? {
            node.index_mut().add(block_id, summary);
        }
        Ok(())
    }
}

/// Null bitmap over `column`, bit set = non-null.
pub(crate) fn write_presence(column: &Column, out: &mut Vec<u8>) -> Result<()> {
    let bits: Vec<bool> = (0..column.len()).map(|row| !column.is_null(row)).collect();
    out.extend_from_slice(crate::bitmap::Bitmap::from_bools(&bits)?.as_bytes());
    Ok(())
}
