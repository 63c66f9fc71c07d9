use crate::allocator::{MemoryAllocator, write_column};
use crate::codec::wire::{ByteReader, usize_to_u32, write_u64_varint};
use crate::codec::{
    CodecKind, ColumnBinary, ColumnBinaryMaker, ColumnStats, EncodeContext, MakerRegistry,
};
use crate::column::{Column, ColumnKind};
use crate::index::BlockIndexNode;
use crate::schema::ColumnType;
use crate::{Error, Result};

const MAGIC: u8 = 0xAA;

/// Per-row element counts; the elements themselves are one child column.
///
/// ```text
/// magic u8 | (element_count + 1, 0 = null) varint*
/// ```
pub(crate) struct ArrayMaker;

pub(crate) static ARRAY: ArrayMaker = ArrayMaker;

impl ArrayMaker {
    fn decode_ranges(binary: &ColumnBinary) -> Result<Vec<Option<(u32, u32)>>> {
        let plain = binary.plain_payload()?;
        let mut r = ByteReader::new(&plain);
        r.expect_magic(MAGIC, "array")?;
        let row_count = binary.row_count as usize;
        let mut ranges = Vec::with_capacity(row_count.min(r.remaining()));
        let mut next: u64 = 0;
        for _ in 0..row_count {
            let n = r.read_u64_varint()?;
            if n == 0 {
                ranges.push(None);
                continue;
            }
            let end = next
                .checked_add(n - 1)
                .filter(|&e| e <= u32::MAX as u64)
                .ok_or_else(|| Error::Decode("array element count overflow".to_string()))?;
            ranges.push(Some((next as u32, end as u32)));
            next = end;
        }
        r.finish("array")?;
        Ok(ranges)
    }

    fn element(binary: &ColumnBinary) -> Result<&ColumnBinary> {
        match binary.children.as_slice() {
            [child] => Ok(child),
            _ => Err(Error::Decode(format!(
                "array {} needs exactly one element column",
                binary.column_name
            ))),
        }
    }
}

impl ColumnBinaryMaker for ArrayMaker {
    fn kind(&self) -> CodecKind {
        CodecKind::Array
    }

    fn supports(&self, ty: ColumnType) -> bool {
        ty == ColumnType::Array
    }

    fn estimate_size(&self, _stats: &ColumnStats) -> Option<usize> {
        None
    }

    fn to_binary(&self, column: &Column, ctx: &EncodeContext<'_>) -> Result<ColumnBinary> {
        let ColumnKind::Array(a) = column.kind() else {
            return Err(Error::Encode(format!("{} is not an array column", column.name())));
        };
        let mut plain = vec![MAGIC];
        for row in 0..column.len() {
            match a.range(row) {
                Some((s, e)) => write_u64_varint(&mut plain, (e - s) as u64 + 1),
                None => write_u64_varint(&mut plain, 0),
            }
        }
        let mut binary = ColumnBinary::new(column.name(), ColumnType::Array, CodecKind::Array);
        binary.row_count = usize_to_u32(column.len(), "row count")?;
        binary.null_count = usize_to_u32(column.null_count(), "null count")?;
        binary.logical_data_size = column.logical_data_size();
        binary.set_plain_payload(&plain, ctx.compression())?;
        // Elements share the array's path.
        binary.children.push(ctx.encode_here(a.child())?);
        Ok(binary)
    }

    fn to_column_planned(
        &self,
        binary: &ColumnBinary,
        plan: Option<&[usize]>,
        registry: &MakerRegistry,
    ) -> Result<Column> {
        let ranges = Self::decode_ranges(binary)?;
        let element = registry.to_column(Self::element(binary)?)?;
        let used = ranges.iter().flatten().map(|(_, e)| *e as usize).max().unwrap_or(0);
        if used > element.len() {
            return Err(Error::Decode(format!(
                "array {} refers to {used} elements, element column has {}",
                binary.column_name,
                element.len()
            )));
        }
        let column = Column::from_array(binary.column_name.clone(), ranges, element);
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
        let element = Self::element(binary)?;
        // An array row matches when one of its elements does.
        registry.set_block_index_node(node, element, block_id)
    }
}
