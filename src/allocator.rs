//! Decoding straight into caller-owned storage.
//!
//! [`MemoryAllocator`] is the sink side of
//! [`load_in_memory_storage`](crate::codec::ColumnBinaryMaker::load_in_memory_storage):
//! scalar makers push one typed value per row without building a [`Column`]
//! first. [`ColumnAllocator`] is the in-crate sink producing a [`Column`].

use crate::column::{Column, ColumnKind, PrimitiveStore, type_child_name};
use crate::schema::ColumnType;
use crate::spread::Spread;
use crate::value::{PrimitiveObject, Value};
use crate::{Error, Result};

pub trait MemoryAllocator {
    fn set_null(&mut self, index: usize) -> Result<()>;
    fn set_bool(&mut self, index: usize, value: bool) -> Result<()>;
    fn set_byte(&mut self, index: usize, value: i8) -> Result<()>;
    fn set_short(&mut self, index: usize, value: i16) -> Result<()>;
    fn set_integer(&mut self, index: usize, value: i32) -> Result<()>;
    fn set_long(&mut self, index: usize, value: i64) -> Result<()>;
    fn set_float(&mut self, index: usize, value: f32) -> Result<()>;
    fn set_double(&mut self, index: usize, value: f64) -> Result<()>;
    fn set_string(&mut self, index: usize, value: &str) -> Result<()>;
    fn set_bytes(&mut self, index: usize, value: &[u8]) -> Result<()>;

    /// Called once all rows are delivered; rows never set are null.
    fn set_value_count(&mut self, count: usize) -> Result<()>;

    fn set_primitive(&mut self, index: usize, value: &PrimitiveObject) -> Result<()> {
        match value {
            PrimitiveObject::Bool(v) => self.set_bool(index, *v),
            PrimitiveObject::Byte(v) => self.set_byte(index, *v),
            PrimitiveObject::Short(v) => self.set_short(index, *v),
            PrimitiveObject::Integer(v) => self.set_integer(index, *v),
            PrimitiveObject::Long(v) => self.set_long(index, *v),
            PrimitiveObject::Float(v) => self.set_float(index, *v),
            PrimitiveObject::Double(v) => self.set_double(index, *v),
            PrimitiveObject::String(v) => self.set_string(index, v),
            PrimitiveObject::Bytes(v) => self.set_bytes(index, v),
        }
    }

    /// Sink for the named child of a struct column.
    fn get_child(&mut self, name: &str, ty: ColumnType) -> Result<&mut dyn MemoryAllocator> {
        let _ = ty;
        Err(Error::Other(format!(
            "allocator cannot hold struct child {name}"
        )))
    }

    /// Row `index` of an array column holds child elements `[start, start + len)`.
    fn set_array_range(&mut self, index: usize, start: usize, len: usize) -> Result<()> {
        let _ = (index, start, len);
        Err(Error::Other("allocator cannot hold arrays".to_string()))
    }

    /// Sink for the elements of an array column.
    fn get_array_child(
        &mut self,
        child_len: usize,
        ty: ColumnType,
    ) -> Result<&mut dyn MemoryAllocator> {
        let _ = (child_len, ty);
        Err(Error::Other("allocator cannot hold arrays".to_string()))
    }

    /// Sink for the nested (array or struct) rows of a union, indexed by union row.
    ///
    /// Scalar union rows are delivered through the typed setters instead.
    fn get_union_child(&mut self, ty: ColumnType) -> Result<&mut dyn MemoryAllocator> {
        Err(Error::Other(format!(
            "allocator cannot hold {ty:?} union rows"
        )))
    }
}

/// Builds a [`Column`] from allocator calls.
#[derive(Debug)]
pub struct ColumnAllocator {
    name: String,
    ty: ColumnType,
    column: Column,
    value_count: usize,
    nulls: Vec<bool>,
    ranges: Vec<Option<(u32, u32)>>,
    array_child: Option<Box<ColumnAllocator>>,
    children: Vec<ColumnAllocator>,
    union_children: Vec<ColumnAllocator>,
}

impl ColumnAllocator {
    pub fn new(name: impl Into<String>, ty: ColumnType) -> Self {
        let name = name.into();
        let column = if ty.is_primitive() {
            Column::from_store(name.clone(), ty, 0, PrimitiveStore::Plain(Vec::new()))
        } else {
            Column::new(name.clone())
        };
        Self {
            name,
            ty,
            column,
            value_count: 0,
            nulls: Vec::new(),
            ranges: Vec::new(),
            array_child: None,
            children: Vec::new(),
            union_children: Vec::new(),
        }
    }

    fn put(&mut self, index: usize, value: PrimitiveObject) -> Result<()> {
        self.column.add(&Value::Primitive(value), index)
    }

    pub fn into_column(self) -> Result<Column> {
        let len = self.value_count;
        match self.ty {
            ColumnType::Array => {
                let mut ranges = self.ranges;
                ranges.resize(len, None);
                let child = match self.array_child {
                    Some(c) => c.into_column()?,
                    None => Column::new(self.name.clone()),
                };
                Ok(Column::from_array(self.name, ranges, child))
            }
            ColumnType::Spread => {
                let mut spread = Spread::new();
                for child in self.children {
                    spread.add_column(child.into_column()?)?;
                }
                spread.set_row_count(len);
                let present = (0..len)
                    .map(|row| !self.nulls.get(row).copied().unwrap_or(false))
                    .collect();
                Ok(Column::from_spread(self.name, spread, present))
            }
            _ => {
                let mut column = self.column;
                for child in self.union_children {
                    let child = child.into_column()?;
                    for row in 0..child.len() {
                        if !child.is_null(row) {
                            column.add(&child.get_value(row), row)?;
                        }
                    }
                }
                column.set_len(len);
                column.set_name(self.name);
                Ok(column)
            }
        }
    }
}

impl MemoryAllocator for ColumnAllocator {
    fn set_null(&mut self, index: usize) -> Result<()> {
        if self.nulls.len() <= index {
            self.nulls.resize(index + 1, false);
        }
        self.nulls[index] = true;
        Ok(())
    }

    fn set_bool(&mut self, index: usize, value: bool) -> Result<()> {
        self.put(index, PrimitiveObject::Bool(value))
    }

    fn set_byte(&mut self, index: usize, value: i8) -> Result<()> {
        self.put(index, PrimitiveObject::Byte(value))
    }

    fn set_short(&mut self, index: usize, value: i16) -> Result<()> {
        self.put(index, PrimitiveObject::Short(value))
    }

    fn set_integer(&mut self, index: usize, value: i32) -> Result<()> {
        self.put(index, PrimitiveObject::Integer(value))
    }

    fn set_long(&mut self, index: usize, value: i64) -> Result<()> {
        self.put(index, PrimitiveObject::Long(value))
    }

    fn set_float(&mut self, index: usize, value: f32) -> Result<()> {
        self.put(index, PrimitiveObject::Float(value))
    }

    fn set_double(&mut self, index: usize, value: f64) -> Result<()> {
        self.put(index, PrimitiveObject::Double(value))
    }

    fn set_string(&mut self, index: usize, value: &str) -> Result<()> {
        self.put(index, PrimitiveObject::String(value.to_string()))
    }

    fn set_bytes(&mut self, index: usize, value: &[u8]) -> Result<()> {
        self.put(index, PrimitiveObject::Bytes(value.to_vec()))
    }

    fn set_value_count(&mut self, count: usize) -> Result<()> {
        self.value_count = count;
        Ok(())
    }

    fn get_child(&mut self, name: &str, ty: ColumnType) -> Result<&mut dyn MemoryAllocator> {
        if self.ty != ColumnType::Spread {
            return Err(Error::Other(format!("{:?} column has no named children", self.ty)));
        }
        let slot = match self.children.iter().position(|c| c.name == name) {
            Some(i) => i,
            None => {
                self.children.push(ColumnAllocator::new(name, ty));
                self.children.len() - 1
            }
        };
        Ok(&mut self.children[slot])
    }

    fn set_array_range(&mut self, index: usize, start: usize, len: usize) -> Result<()> {
        let end = start
            .checked_add(len)
            .ok_or_else(|| Error::Other("array range overflow".to_string()))?;
        let start = u32::try_from(start)
            .map_err(|_| Error::Other("array child too large".to_string()))?;
        let end = u32::try_from(end)
            .map_err(|_| Error::Other("array child too large".to_string()))?;
        if self.ranges.len() <= index {
            self.ranges.resize(index + 1, None);
        }
        self.ranges[index] = Some((start, end));
        Ok(())
    }

    fn get_array_child(
        &mut self,
        _child_len: usize,
        ty: ColumnType,
    ) -> Result<&mut dyn MemoryAllocator> {
        if self.ty != ColumnType::Array {
            return Err(Error::Other(format!("{:?} column has no elements", self.ty)));
        }
        let name = self.name.clone();
        let child = self
            .array_child
            .get_or_insert_with(|| Box::new(ColumnAllocator::new(name, ty)));
        Ok(child.as_mut())
    }

    fn get_union_child(&mut self, ty: ColumnType) -> Result<&mut dyn MemoryAllocator> {
        let slot = match self.union_children.iter().position(|c| c.ty == ty) {
            Some(i) => i,
            None => {
                self.union_children
                    .push(ColumnAllocator::new(type_child_name(ty), ty));
                self.union_children.len() - 1
            }
        };
        Ok(&mut self.union_children[slot])
    }
}

/// Replays a materialized column into `allocator`.
pub fn write_column(column: &Column, allocator: &mut dyn MemoryAllocator) -> Result<()> {
    let len = column.len();
    match column.kind() {
        ColumnKind::Primitive(_) => {
            for row in 0..len {
                match column.get(row).primitive() {
                    Some(v) => allocator.set_primitive(row, v)?,
                    None => allocator.set_null(row)?,
                }
            }
        }
        ColumnKind::Array(a) => {
            for row in 0..len {
                match a.range(row) {
                    Some((s, e)) => allocator.set_array_range(row, s, e - s)?,
                    None => allocator.set_null(row)?,
                }
            }
            let child = a.child();
            write_column(
                child,
                allocator.get_array_child(child.len(), child.column_type())?,
            )?;
        }
        ColumnKind::Spread { spread, .. } => {
            for row in 0..len {
                if column.is_null(row) {
                    allocator.set_null(row)?;
                }
            }
            for child in spread.columns() {
                write_column(child, allocator.get_child(child.name(), child.column_type())?)?;
            }
        }
        ColumnKind::Union(u) => {
            for (ci, child) in u.children().iter().enumerate() {
                if child.column_type().is_primitive() {
                    continue;
                }
                // Re-index the nested child by union row.
                let mut by_row = vec![usize::MAX; len];
                for (row, slot) in by_row.iter_mut().enumerate() {
                    if u.tags.get(row).copied() == Some((ci + 1) as u8) {
                        *slot = u.positions[row] as usize;
                    }
                }
                let nested = child.take(&by_row)?;
                write_column(&nested, allocator.get_union_child(child.column_type())?)?;
            }
            for row in 0..len {
                match column.get(row) {
                    cell if cell.is_null() => allocator.set_null(row)?,
                    cell => {
                        if let Some(v) = cell.primitive() {
                            allocator.set_primitive(row, v)?;
                        }
                    }
                }
            }
        }
    }
    allocator.set_value_count(len)
}
