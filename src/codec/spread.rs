use crate::allocator::MemoryAllocator;
use crate::bitmap::{Bitmap, ceil_div_8};
use crate::codec::wire::{ByteReader, usize_to_u32};
use crate::codec::{
    CodecKind, ColumnBinary, ColumnBinaryMaker, ColumnStats, EncodeContext, MakerRegistry,
};
use crate::column::{Column, ColumnKind};
use crate::index::BlockIndexNode;
use crate::schema::ColumnType;
use crate::spread::Spread;
use crate::{Error, Result};

const MAGIC: u8 = 0x5B;

/// Struct rows: a presence bitmap plus one child binary per field.
///
/// ```text
/// magic u8 | presence: ceil(rows / 8) bytes
/// ```
pub(crate) struct SpreadMaker;

pub(crate) static SPREAD: SpreadMaker = SpreadMaker;

fn decode_presence(binary: &ColumnBinary) -> Result<Bitmap> {
    let plain = binary.plain_payload()?;
    let row_count = binary.row_count as usize;
    let mut r = ByteReader::new(&plain);
    r.expect_magic(MAGIC, "spread")?;
    let presence = Bitmap::from_bytes(r.take(ceil_div_8(row_count)?)?, row_count)?;
    r.finish("spread")?;
    Ok(presence)
}

/// Presence of each output row of `plan`.
fn planned_presence(presence: &Bitmap, plan: Option<&[usize]>) -> Vec<bool> {
    match plan {
        None => (0..presence.len()).map(|row| presence.get(row)).collect(),
        Some(rows) => rows.iter().map(|&row| presence.get(row)).collect(),
    }
}

impl ColumnBinaryMaker for SpreadMaker {
    fn kind(&self) -> CodecKind {
        CodecKind::Spread
    }

    fn supports(&self, ty: ColumnType) -> bool {
        ty == ColumnType::Spread
    }

    fn estimate_size(&self, _stats: &ColumnStats) -> Option<usize> {
        None
    }

    fn to_binary(&self, column: &Column, ctx: &EncodeContext<'_>) -> Result<ColumnBinary> {
        let ColumnKind::Spread { spread, .. } = column.kind() else {
            return Err(Error::Encode(format!("{} is not a spread column", column.name())));
        };
        let bits: Vec<bool> = (0..column.len()).map(|row| !column.is_null(row)).collect();
        let mut plain = vec![MAGIC];
        plain.extend_from_slice(Bitmap::from_bools(&bits)?.as_bytes());
        let mut binary = ColumnBinary::new(column.name(), ColumnType::Spread, CodecKind::Spread);
        binary.row_count = usize_to_u32(column.len(), "row count")?;
        binary.null_count = usize_to_u32(column.null_count(), "null count")?;
        binary.logical_data_size = column.logical_data_size();
        binary.set_plain_payload(&plain, ctx.compression())?;
        for child in spread.columns() {
            binary.children.push(ctx.encode(child)?);
        }
        Ok(binary)
    }

    fn to_column_planned(
        &self,
        binary: &ColumnBinary,
        plan: Option<&[usize]>,
        registry: &MakerRegistry,
    ) -> Result<Column> {
        let presence = decode_presence(binary)?;
        let present = planned_presence(&presence, plan);
        let mut spread = Spread::new();
        for child in &binary.children {
            spread.add_column(registry.to_column_planned(child, plan)?)?;
        }
        spread.set_row_count(present.len());
        Ok(Column::from_spread(binary.column_name.clone(), spread, present))
    }

    fn load_planned(
        &self,
        binary: &ColumnBinary,
        plan: Option<&[usize]>,
        registry: &MakerRegistry,
        allocator: &mut dyn MemoryAllocator,
    ) -> Result<()> {
        let presence = decode_presence(binary)?;
        let present = planned_presence(&presence, plan);
        for child in &binary.children {
            let sink = allocator.get_child(&child.column_name, child.column_type)?;
            registry.load_planned(child, plan, sink)?;
        }
        for (row, p) in present.iter().enumerate() {
            if !p {
                allocator.set_null(row)?;
            }
        }
        allocator.set_value_count(present.len())
    }

    fn set_block_index_node(
        &self,
        node: &mut BlockIndexNode,
        binary: &ColumnBinary,
        block_id: u32,
        registry: &MakerRegistry,
    ) -> Result<()> {
        for child in &binary.children {
            registry.set_block_index_node(node.child_mut(&child.column_name), child, block_id)?;
        }
        Ok(())
    }
}
