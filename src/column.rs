use crate::bitmap::Bitmap;
use crate::filter::Filter;
use crate::schema::{ColumnField, ColumnType};
use crate::spread::Spread;
use crate::value::{PrimitiveObject, Value};
use crate::{Error, Result};

/// Row storage of a scalar column.
///
/// Columns built by the writer are always `Plain`. Decoders keep the
/// representation of their codec so that filters can run on dictionary
/// entries, runs or a single constant instead of on every row.
#[derive(Debug, Clone, PartialEq)]
pub enum PrimitiveStore {
    Plain(Vec<Option<PrimitiveObject>>),
    /// `refs[row] == 0` is null, otherwise the row holds `dict[refs[row] - 1]`.
    Dictionary {
        dict: Vec<PrimitiveObject>,
        refs: Vec<u32>,
    },
    /// Run `i` covers rows `[runs[i - 1].0, runs[i].0)`.
    RunLength {
        runs: Vec<(usize, Option<PrimitiveObject>)>,
    },
    Constant {
        value: Option<PrimitiveObject>,
        len: usize,
    },
    /// Only non-null rows are kept; `rows` is strictly ascending.
    Sparse {
        rows: Vec<u32>,
        values: Vec<PrimitiveObject>,
    },
}

impl PrimitiveStore {
    pub fn get(&self, row: usize) -> Option<&PrimitiveObject> {
        match self {
            PrimitiveStore::Plain(values) => values.get(row).and_then(|v| v.as_ref()),
            PrimitiveStore::Dictionary { dict, refs } => match refs.get(row).copied() {
                Some(r) if r > 0 => dict.get((r - 1) as usize),
                _ => None,
            },
            PrimitiveStore::RunLength { runs } => {
                let i = runs.partition_point(|(end, _)| *end <= row);
                runs.get(i).and_then(|(_, v)| v.as_ref())
            }
            PrimitiveStore::Constant { value, len } => {
                if row < *len {
                    value.as_ref()
                } else {
                    None
                }
            }
            PrimitiveStore::Sparse { rows, values } => {
                let row_u32 = u32::try_from(row).ok()?;
                rows.binary_search(&row_u32)
                    .ok()
                    .and_then(|i| values.get(i))
            }
        }
    }

    fn into_plain(self, len: usize) -> Vec<Option<PrimitiveObject>> {
        match self {
            PrimitiveStore::Plain(values) => values,
            other => (0..len).map(|i| other.get(i).cloned()).collect(),
        }
    }

    /// Evaluates `filter` for rows `[0, len)`.
    fn filter(&self, filter: &Filter, len: usize) -> Result<Bitmap> {
        let mut out = Bitmap::new_all_unset(len)?;
        let null_matches = filter.matches(None);
        match self {
            PrimitiveStore::Plain(values) => {
                for row in 0..len {
                    let v = values.get(row).and_then(|v| v.as_ref());
                    if filter.matches(v) {
                        out.set(row, true)?;
                    }
                }
            }
            PrimitiveStore::Dictionary { dict, refs } => {
                let hits: Vec<bool> = dict.iter().map(|v| filter.matches(Some(v))).collect();
                for row in 0..len {
                    let hit = match refs.get(row).copied() {
                        Some(r) if r > 0 => hits.get((r - 1) as usize).copied().unwrap_or(false),
                        _ => null_matches,
                    };
                    if hit {
                        out.set(row, true)?;
                    }
                }
            }
            PrimitiveStore::RunLength { runs } => {
                let mut start = 0usize;
                for (end, v) in runs {
                    let end = (*end).min(len);
                    if start < end && filter.matches(v.as_ref()) {
                        for row in start..end {
                            out.set(row, true)?;
                        }
                    }
                    start = end;
                }
                if null_matches {
                    for row in start..len {
                        out.set(row, true)?;
                    }
                }
            }
            PrimitiveStore::Constant { value, len: stored } => {
                let stored = (*stored).min(len);
                if filter.matches(value.as_ref()) {
                    for row in 0..stored {
                        out.set(row, true)?;
                    }
                }
                if null_matches {
                    for row in stored..len {
                        out.set(row, true)?;
                    }
                }
            }
            PrimitiveStore::Sparse { rows, values } => {
                if null_matches {
                    out = Bitmap::new_all_set(len)?;
                }
                for (row, v) in rows.iter().zip(values.iter()) {
                    let row = *row as usize;
                    if row < len {
                        out.set(row, filter.matches(Some(v)))?;
                    }
                }
            }
        }
        Ok(out)
    }

    fn take(&self, indices: &[usize]) -> PrimitiveStore {
        match self {
            PrimitiveStore::Dictionary { dict, refs } => PrimitiveStore::Dictionary {
                dict: dict.clone(),
                refs: indices
                    .iter()
                    .map(|&i| refs.get(i).copied().unwrap_or(0))
                    .collect(),
            },
            other => {
                PrimitiveStore::Plain(indices.iter().map(|&i| other.get(i).cloned()).collect())
            }
        }
    }
}

/// One row handed out by [`Column::get`]. Borrowed from the column, never owning child data.
#[derive(Debug, Clone, Copy)]
pub enum Cell<'a> {
    Null,
    Primitive(&'a PrimitiveObject),
    Array {
        start: usize,
        end: usize,
        child: &'a Column,
    },
    Spread {
        row: usize,
        spread: &'a Spread,
    },
}

impl<'a> Cell<'a> {
    pub fn is_null(&self) -> bool {
        matches!(self, Cell::Null)
    }

    pub fn column_type(&self) -> ColumnType {
        match self {
            Cell::Null => ColumnType::Null,
            Cell::Primitive(p) => p.column_type(),
            Cell::Array { .. } => ColumnType::Array,
            Cell::Spread { .. } => ColumnType::Spread,
        }
    }

    pub fn primitive(&self) -> Option<&'a PrimitiveObject> {
        match self {
            Cell::Primitive(p) => Some(*p),
            _ => None,
        }
    }

    pub fn to_value(&self) -> Value {
        match self {
            Cell::Null => Value::Null,
            Cell::Primitive(p) => Value::Primitive((*p).clone()),
            Cell::Array { start, end, child } => {
                Value::Array((*start..*end).map(|i| child.get_value(i)).collect())
            }
            Cell::Spread { row, spread } => spread.get_row(*row),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ArrayColumn {
    /// Per-row `[start, end)` into `child`; `None` is a null row.
    pub(crate) ranges: Vec<Option<(u32, u32)>>,
    pub(crate) child: Box<Column>,
}

impl ArrayColumn {
    pub fn child(&self) -> &Column {
        &self.child
    }

    pub fn range(&self, row: usize) -> Option<(usize, usize)> {
        self.ranges
            .get(row)
            .copied()
            .flatten()
            .map(|(s, e)| (s as usize, e as usize))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct UnionColumn {
    /// Per-row discriminant; `0` is null, otherwise `children[tag - 1]`.
    pub(crate) tags: Vec<u8>,
    /// Per-row position inside the selected child. Members are kept
    /// row-aligned with the union, so a tagged row `r` sits at `r`.
    pub(crate) positions: Vec<u32>,
    pub(crate) children: Vec<Column>,
}

impl UnionColumn {
    pub fn children(&self) -> &[Column] {
        &self.children
    }

    pub fn child_by_type(&self, ty: ColumnType) -> Option<&Column> {
        self.children.iter().find(|c| c.ty == ty)
    }

    /// Rows of `child_index` in union row order, as positions inside that child.
    pub(crate) fn child_positions(&self, child_index: usize) -> Vec<usize> {
        let tag = child_index + 1;
        self.tags
            .iter()
            .zip(self.positions.iter())
            .filter(|(t, _)| **t as usize == tag)
            .map(|(_, p)| *p as usize)
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ColumnKind {
    Primitive(PrimitiveStore),
    Array(ArrayColumn),
    Spread { spread: Spread, present: Vec<bool> },
    Union(UnionColumn),
}

/// A named, typed, sparse, randomly indexable sequence of rows.
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    name: String,
    ty: ColumnType,
    len: usize,
    kind: ColumnKind,
}

impl Column {
    /// An empty column whose type is decided by the first non-null value.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ty: ColumnType::Null,
            len: 0,
            kind: ColumnKind::Primitive(PrimitiveStore::Plain(Vec::new())),
        }
    }

    pub fn from_store(
        name: impl Into<String>,
        ty: ColumnType,
        len: usize,
        store: PrimitiveStore,
    ) -> Self {
        Self {
            name: name.into(),
            ty,
            len,
            kind: ColumnKind::Primitive(store),
        }
    }

    pub fn from_array(
        name: impl Into<String>,
        ranges: Vec<Option<(u32, u32)>>,
        child: Column,
    ) -> Self {
        Self {
            name: name.into(),
            ty: ColumnType::Array,
            len: ranges.len(),
            kind: ColumnKind::Array(ArrayColumn {
                ranges,
                child: Box::new(child),
            }),
        }
    }

    pub fn from_spread(name: impl Into<String>, spread: Spread, present: Vec<bool>) -> Self {
        Self {
            name: name.into(),
            ty: ColumnType::Spread,
            len: present.len(),
            kind: ColumnKind::Spread { spread, present },
        }
    }

    pub fn from_union(
        name: impl Into<String>,
        tags: Vec<u8>,
        positions: Vec<u32>,
        children: Vec<Column>,
    ) -> Result<Self> {
        if tags.len() != positions.len() {
            return Err(Error::Decode("union tags/positions length mismatch".to_string()));
        }
        for (&t, &p) in tags.iter().zip(positions.iter()) {
            if t == 0 {
                continue;
            }
            let child = children
                .get(t as usize - 1)
                .ok_or_else(|| Error::Decode("union tag out of bounds".to_string()))?;
            if p as usize >= child.len() {
                return Err(Error::Decode("union position out of bounds".to_string()));
            }
        }
        Ok(Self {
            name: name.into(),
            ty: ColumnType::Union,
            len: tags.len(),
            kind: ColumnKind::Union(UnionColumn {
                tags,
                positions,
                children,
            }),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    pub fn column_type(&self) -> ColumnType {
        self.ty
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn kind(&self) -> &ColumnKind {
        &self.kind
    }

    /// Grows the logical length so that trailing unassigned rows exist as nulls.
    pub fn set_len(&mut self, len: usize) {
        if len > self.len {
            self.len = len;
        }
    }

    pub fn get(&self, row: usize) -> Cell<'_> {
        if row >= self.len {
            return Cell::Null;
        }
        match &self.kind {
            ColumnKind::Primitive(store) => match store.get(row) {
                Some(v) => Cell::Primitive(v),
                None => Cell::Null,
            },
            ColumnKind::Array(a) => match a.range(row) {
                Some((start, end)) => Cell::Array {
                    start,
                    end,
                    child: &a.child,
                },
                None => Cell::Null,
            },
            ColumnKind::Spread { spread, present } => {
                if present.get(row).copied().unwrap_or(false) {
                    Cell::Spread { row, spread }
                } else {
                    Cell::Null
                }
            }
            ColumnKind::Union(u) => {
                let tag = u.tags.get(row).copied().unwrap_or(0);
                if tag == 0 {
                    return Cell::Null;
                }
                match (u.children.get(tag as usize - 1), u.positions.get(row)) {
                    (Some(child), Some(&pos)) => child.get(pos as usize),
                    _ => Cell::Null,
                }
            }
        }
    }

    pub fn get_value(&self, row: usize) -> Value {
        self.get(row).to_value()
    }

    pub fn is_null(&self, row: usize) -> bool {
        self.get(row).is_null()
    }

    pub fn null_count(&self) -> usize {
        (0..self.len).filter(|&i| self.is_null(i)).count()
    }

    /// Named child of a spread or union column.
    ///
    /// Arrays are not traversed: their element rows do not line up with the
    /// rows of the enclosing spread.
    pub fn child(&self, name: &str) -> Option<&Column> {
        match &self.kind {
            ColumnKind::Spread { spread, .. } => spread.get_column(name),
            ColumnKind::Union(u) => u.children.iter().find(|c| c.name == name),
            ColumnKind::Array(_) | ColumnKind::Primitive(_) => None,
        }
    }

    pub fn field(&self) -> ColumnField {
        let children = match &self.kind {
            ColumnKind::Primitive(_) => Vec::new(),
            ColumnKind::Array(a) => vec![a.child.field()],
            ColumnKind::Spread { spread, .. } => spread.schema(),
            ColumnKind::Union(u) => u.children.iter().map(|c| c.field()).collect(),
        };
        ColumnField {
            name: self.name.clone(),
            ty: self.ty,
            children,
        }
    }

    /// Assigns `value` to `row`, widening or converting the column as needed.
    ///
    /// Integers widen to the widest integer seen, mixed integer/float widen to
    /// `Double`; anything else turns the column into a union.
    pub fn add(&mut self, value: &Value, row: usize) -> Result<()> {
        let row_end = row
            .checked_add(1)
            .ok_or_else(|| Error::Other("row index overflow".to_string()))?;
        u32::try_from(row).map_err(|_| Error::Other("row index too large".to_string()))?;
        match value {
            Value::Null => {
                self.set_null(row)?;
                self.set_len(row_end);
                return Ok(());
            }
            Value::Primitive(p) => self.add_primitive(p, row)?,
            Value::Array(items) => self.add_array(items, row)?,
            Value::Object(fields) => self.add_object(fields, row)?,
        }
        self.set_len(row_end);
        Ok(())
    }

    fn set_null(&mut self, row: usize) -> Result<()> {
        if row >= self.len {
            return Ok(());
        }
        match &mut self.kind {
            ColumnKind::Primitive(store) => {
                let mut values = std::mem::replace(store, PrimitiveStore::Plain(Vec::new()))
                    .into_plain(self.len);
                if row < values.len() {
                    values[row] = None;
                }
                *store = PrimitiveStore::Plain(values);
            }
            ColumnKind::Array(a) => {
                if let Some(r) = a.ranges.get_mut(row) {
                    *r = None;
                }
            }
            ColumnKind::Spread { present, .. } => {
                if let Some(p) = present.get_mut(row) {
                    *p = false;
                }
            }
            ColumnKind::Union(u) => {
                if let Some(t) = u.tags.get_mut(row) {
                    *t = 0;
                }
            }
        }
        Ok(())
    }

    /// Only a column with no non-null row yet may change its shape in place.
    fn is_untyped(&self) -> bool {
        self.ty == ColumnType::Null
    }

    fn add_primitive(&mut self, p: &PrimitiveObject, row: usize) -> Result<()> {
        let vt = p.column_type();
        if self.is_untyped() {
            self.ty = vt;
            self.kind = ColumnKind::Primitive(PrimitiveStore::Plain(Vec::new()));
        }
        if let ColumnKind::Primitive(store) = &mut self.kind {
            if let Some(target) = self.ty.common_supertype(vt) {
                let mut values = std::mem::replace(store, PrimitiveStore::Plain(Vec::new()))
                    .into_plain(self.len);
                if target != self.ty {
                    for v in values.iter_mut().flatten() {
                        *v = v.cast(target)?;
                    }
                    self.ty = target;
                }
                if values.len() <= row {
                    values.resize(row + 1, None);
                }
                values[row] = Some(p.cast(target)?);
                *store = PrimitiveStore::Plain(values);
                return Ok(());
            }
        }
        self.make_union()?;
        self.union_add(&Value::Primitive(p.clone()), row)
    }

    fn add_array(&mut self, items: &[Value], row: usize) -> Result<()> {
        if self.is_untyped() {
            let ranges = vec![None; self.len];
            self.ty = ColumnType::Array;
            self.kind = ColumnKind::Array(ArrayColumn {
                ranges,
                child: Box::new(Column::new(self.name.clone())),
            });
        }
        if let ColumnKind::Array(a) = &mut self.kind {
            let start = a.child.len();
            for (i, item) in items.iter().enumerate() {
                a.child.add(item, start + i)?;
            }
            let end = start + items.len();
            a.child.set_len(end);
            if a.ranges.len() <= row {
                a.ranges.resize(row + 1, None);
            }
            let start = u32::try_from(start)
            .map_err(|_| Error::Other("array child too large".to_string()))?;
            let end = u32::try_from(end)
            .map_err(|_| Error::Other("array child too large".to_string()))?;
            a.ranges[row] = Some((start, end));
            return Ok(());
        }
        self.make_union()?;
        self.union_add(&Value::Array(items.to_vec()), row)
    }

    fn add_object(&mut self, fields: &[(String, Value)], row: usize) -> Result<()> {
        if self.is_untyped() {
            self.ty = ColumnType::Spread;
            self.kind = ColumnKind::Spread {
                spread: Spread::new(),
                present: vec![false; self.len],
            };
        }
        if let ColumnKind::Spread { spread, present } = &mut self.kind {
            spread.add_row_at(fields, row)?;
            if present.len() <= row {
                present.resize(row + 1, false);
            }
            present[row] = true;
            return Ok(());
        }
        self.make_union()?;
        self.union_add(&Value::Object(fields.to_vec()), row)
    }

    fn make_union(&mut self) -> Result<()> {
        if matches!(self.kind, ColumnKind::Union(_)) {
            return Ok(());
        }
        let len = self.len;
        let placeholder = Column::new(self.name.clone());
        let previous = std::mem::replace(self, placeholder);
        let mut tags = vec![0u8; len];
        for (row, tag) in tags.iter_mut().enumerate() {
            if !previous.is_null(row) {
                *tag = 1;
            }
        }
        let positions: Vec<u32> = (0..len).map(|r| r as u32).collect();
        let mut child = previous;
        let child_name = type_child_name(child.ty);
        child.set_name(child_name);
        self.ty = ColumnType::Union;
        self.len = len;
        self.kind = ColumnKind::Union(UnionColumn {
            tags,
            positions,
            children: vec![child],
        });
        Ok(())
    }

    fn union_add(&mut self, value: &Value, row: usize) -> Result<()> {
        let ColumnKind::Union(u) = &mut self.kind else {
            return Err(Error::Other("column is not a union".to_string()));
        };
        let vt = value.column_type();
        let slot = u
            .children
            .iter()
            .position(|c| c.ty == vt)
            .or_else(|| {
                u.children.iter().position(|c| {
                    c.ty.is_primitive() && vt.is_primitive() && c.ty.common_supertype(vt).is_some()
                })
            });
        let slot = match slot {
            Some(s) => s,
            None => {
                if u.children.len() >= u8::MAX as usize {
                    return Err(Error::Other("too many union children".to_string()));
                }
                u.children.push(Column::new(type_child_name(vt)));
                u.children.len() - 1
            }
        };
        let child = &mut u.children[slot];
        child.add(value, row)?;
        let name = type_child_name(child.ty);
        child.set_name(name);
        if u.tags.len() <= row {
            u.tags.resize(row + 1, 0);
            u.positions.resize(row + 1, 0);
        }
        u.tags[row] = (slot + 1) as u8;
        u.positions[row] = row as u32;
        Ok(())
    }

    /// Evaluates `filter` against every row.
    ///
    /// `None` means this column cannot answer locally and the caller has to
    /// compare row by row.
    pub fn filter(&self, filter: &Filter) -> Result<Option<Bitmap>> {
        match &self.kind {
            ColumnKind::Primitive(store) => store.filter(filter, self.len).map(Some),
            ColumnKind::Array(a) => {
                let Some(child_hits) = a.child.filter(filter)? else {
                    return Ok(None);
                };
                let mut out = Bitmap::new_all_unset(self.len)?;
                for row in 0..self.len {
                    let hit = match a.range(row) {
                        None => filter.matches(None),
                        Some((s, e)) => match filter {
                            Filter::Null => false,
                            Filter::NotNull => true,
                            _ => (s..e).any(|i| child_hits.get(i)),
                        },
                    };
                    if hit {
                        out.set(row, true)?;
                    }
                }
                Ok(Some(out))
            }
            ColumnKind::Spread { .. } => Ok(None),
            ColumnKind::Union(u) => {
                let mut child_hits = Vec::with_capacity(u.children.len());
                for child in &u.children {
                    match child.filter(filter)? {
                        Some(b) => child_hits.push(b),
                        None => return Ok(None),
                    }
                }
                let null_matches = filter.matches(None);
                let mut out = Bitmap::new_all_unset(self.len)?;
                for row in 0..self.len {
                    let tag = u.tags.get(row).copied().unwrap_or(0) as usize;
                    let hit = if tag == 0 {
                        null_matches
                    } else {
                        let pos = u.positions.get(row).copied().unwrap_or(0) as usize;
                        child_hits.get(tag - 1).is_some_and(|b| b.get(pos))
                    };
                    if hit {
                        out.set(row, true)?;
                    }
                }
                Ok(Some(out))
            }
        }
    }

    /// Bulk extracts `index_list[offset..offset + length]`.
    ///
    /// Indices may repeat; indices past the column (or past the list) yield `None`.
    pub fn get_primitive_object_array(
        &self,
        index_list: &[usize],
        offset: usize,
        length: usize,
    ) -> Vec<Option<PrimitiveObject>> {
        (offset..offset.saturating_add(length))
            .map(|i| {
                index_list
                    .get(i)
                    .and_then(|&row| self.get(row).primitive().cloned())
            })
            .collect()
    }

    /// A new column holding rows `indices` in order. Out-of-range indices become null rows.
    pub fn take(&self, indices: &[usize]) -> Result<Column> {
        let kind = match &self.kind {
            ColumnKind::Primitive(store) => ColumnKind::Primitive(store.take(indices)),
            ColumnKind::Array(a) => {
                let mut gather = Vec::new();
                let mut ranges = Vec::with_capacity(indices.len());
                for &row in indices {
                    let r = if row < self.len { a.range(row) } else { None };
                    match r {
                        Some((s, e)) => {
                            let start = u32::try_from(gather.len())
                                .map_err(|_| Error::Other("array child too large".to_string()))?;
                            gather.extend(s..e);
                            let end = u32::try_from(gather.len())
                                .map_err(|_| Error::Other("array child too large".to_string()))?;
                            ranges.push(Some((start, end)));
                        }
                        None => ranges.push(None),
                    }
                }
                ColumnKind::Array(ArrayColumn {
                    ranges,
                    child: Box::new(a.child.take(&gather)?),
                })
            }
            ColumnKind::Spread { spread, present } => ColumnKind::Spread {
                spread: spread.take(indices)?,
                present: indices
                    .iter()
                    .map(|&i| i < self.len && present.get(i).copied().unwrap_or(false))
                    .collect(),
            },
            ColumnKind::Union(u) => {
                let mut tags = vec![0u8; indices.len()];
                let mut children = Vec::with_capacity(u.children.len());
                for (ci, child) in u.children.iter().enumerate() {
                    let tag = (ci + 1) as u8;
                    // Rows owned by another member read as null in this child.
                    let mut gather = vec![usize::MAX; indices.len()];
                    for (out_row, &row) in indices.iter().enumerate() {
                        if row < self.len && u.tags.get(row).copied() == Some(tag) {
                            tags[out_row] = tag;
                            gather[out_row] = u.positions[row] as usize;
                        }
                    }
                    children.push(child.take(&gather)?);
                }
                ColumnKind::Union(UnionColumn {
                    tags,
                    positions: (0..indices.len()).map(|r| r as u32).collect(),
                    children,
                })
            }
        };
        Ok(Column {
            name: self.name.clone(),
            ty: self.ty,
            len: indices.len(),
            kind,
        })
    }

    /// Non-null scalar rows in row order, with their row index.
    pub fn primitive_rows(&self) -> Vec<(usize, &PrimitiveObject)> {
        (0..self.len)
            .filter_map(|row| self.get(row).primitive().map(|p| (row, p)))
            .collect()
    }

    /// Bytes needed to hold every non-null value uncompressed.
    pub fn logical_data_size(&self) -> u64 {
        match &self.kind {
            ColumnKind::Primitive(_) => self
                .primitive_rows()
                .iter()
                .map(|(_, p)| p.logical_size() as u64)
                .sum(),
            ColumnKind::Array(a) => a.child.logical_data_size() + (self.len as u64) * 4,
            ColumnKind::Spread { spread, .. } => {
                spread.columns().iter().map(|c| c.logical_data_size()).sum()
            }
            ColumnKind::Union(u) => {
                u.children.iter().map(|c| c.logical_data_size()).sum::<u64>() + self.len as u64
            }
        }
    }
}

pub(crate) fn type_child_name(ty: ColumnType) -> String {
    format!("{ty:?}").to_ascii_uppercase()
}
