use crate::allocator::{MemoryAllocator, write_column};
use crate::codec::wire::{ByteReader, usize_to_u32};
use crate::codec::{
    CodecKind, ColumnBinary, ColumnBinaryMaker, ColumnStats, EncodeContext, MakerRegistry,
};
use crate::column::{Column, ColumnKind};
use crate::index::BlockIndexNode;
use crate::schema::ColumnType;
use crate::{Error, Result};

const MAGIC: u8 = 0x0C;

/// Mixed-type rows: a tag per row, one dense child binary per member type.
///
/// ```text
/// magic u8 | tag u8*   (0 = null, otherwise child index + 1)
/// ```
/// Child `i` holds the rows tagged `i + 1`, in row order. Decoding expands
/// each child back to one row per union row.
pub(crate) struct UnionMaker;

pub(crate) static UNION: UnionMaker = UnionMaker;

impl ColumnBinaryMaker for UnionMaker {
    fn kind(&self) -> CodecKind {
        CodecKind::Union
    }

    fn supports(&self, ty: ColumnType) -> bool {
        ty == ColumnType::Union
    }

    fn estimate_size(&self, _stats: &ColumnStats) -> Option<usize> {
        None
    }

    fn to_binary(&self, column: &Column, ctx: &EncodeContext<'_>) -> Result<ColumnBinary> {
        let ColumnKind::Union(u) = column.kind() else {
            return Err(Error::Encode(format!("{} is not a union column", column.name())));
        };
        let mut plain = Vec::with_capacity(1 + column.len());
        plain.push(MAGIC);
        for row in 0..column.len() {
            plain.push(u.tags.get(row).copied().unwrap_or(0));
        }
        let mut binary = ColumnBinary::new(column.name(), ColumnType::Union, CodecKind::Union);
        binary.row_count = usize_to_u32(column.len(), "row count")?;
        binary.null_count = usize_to_u32(column.null_count(), "null count")?;
        binary.logical_data_size = column.logical_data_size();
        binary.set_plain_payload(&plain, ctx.compression())?;
        for (i, child) in u.children().iter().enumerate() {
            let dense = child.take(&u.child_positions(i))?;
            binary.children.push(ctx.encode(&dense)?);
        }
        Ok(binary)
    }

    fn to_column_planned(
        &self,
        binary: &ColumnBinary,
        plan: Option<&[usize]>,
        registry: &MakerRegistry,
    ) -> Result<Column> {
        let plain = binary.plain_payload()?;
        let mut r = ByteReader::new(&plain);
        r.expect_magic(MAGIC, "union")?;
        let tags = r.take(binary.row_count as usize)?.to_vec();
        r.finish("union")?;
        // Each member is stored dense; spread it back to union row order.
        let mut gathers = vec![vec![usize::MAX; tags.len()]; binary.children.len()];
        let mut next = vec![0usize; binary.children.len()];
        for (row, &tag) in tags.iter().enumerate() {
            if tag == 0 {
                continue;
            }
            let member = tag as usize - 1;
            let (Some(gather), Some(slot)) = (gathers.get_mut(member), next.get_mut(member)) else {
                return Err(Error::Decode("union tag out of bounds".to_string()));
            };
            gather[row] = *slot;
            *slot += 1;
        }
        let mut children = Vec::with_capacity(binary.children.len());
        for ((child, gather), &needed) in binary.children.iter().zip(&gathers).zip(&next) {
            let dense = registry.to_column(child)?;
            if dense.len() < needed {
                return Err(Error::Decode(format!(
                    "union member {} has {} rows, tags need {needed}",
                    child.column_name,
                    dense.len()
                )));
            }
            children.push(dense.take(gather)?);
        }
        let positions = (0..tags.len()).map(|r| r as u32).collect();
        let column = Column::from_union(binary.column_name.clone(), tags, positions, children)?;
        match plan {
            None => Ok(column),
            Some(rows) => column.take(rows),
        }
    }

    fn load_planned(
        &self,
        binary: &ColumnBinary,
        plan: Option<&[usize]>,
        registry: &MakerRegistry,
        allocator: &mut dyn MemoryAllocator,
    ) -> Result<()> {
        let column = self.to_column_planned(binary, plan, registry)?;
        write_column(&column, allocator)
    }

    fn set_block_index_node(
        &self,
        node: &mut BlockIndexNode,
        binary: &ColumnBinary,
        block_id: u32,
        registry: &MakerRegistry,
    ) -> Result<()> {
        // A member answers for the union and for its own path.
        for child in &binary.children {
            registry.set_block_index_node(node, child, block_id)?;
            registry.set_block_index_node(node.child_mut(&child.column_name), child, block_id)?;
        }
        Ok(())
    }
}
