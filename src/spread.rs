use std::collections::HashMap;

use crate::bitmap::Bitmap;
use crate::column::Column;
use crate::expression::Expression;
use crate::schema::ColumnField;
use crate::value::Value;
use crate::{Error, Result};

/// A row group: named columns sharing one row count.
///
/// Also the payload of a nested struct column.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Spread {
    columns: Vec<Column>,
    index: HashMap<String, usize>,
    row_count: usize,
}

impl Spread {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn row_count(&self) -> usize {
        self.row_count
    }

    pub fn set_row_count(&mut self, row_count: usize) {
        if row_count > self.row_count {
            self.row_count = row_count;
        }
        for c in self.columns.iter_mut() {
            c.set_len(self.row_count);
        }
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|c| c.name())
    }

    pub fn get_column(&self, name: &str) -> Option<&Column> {
        self.index.get(name).and_then(|&i| self.columns.get(i))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// Adds a decoded or prebuilt column; its length extends the row count.
    pub fn add_column(&mut self, column: Column) -> Result<()> {
        if self.index.contains_key(column.name()) {
            return Err(Error::Other(format!(
                "duplicate column name: {}",
                column.name()
            )));
        }
        if column.len() > self.row_count {
            self.row_count = column.len();
        }
        self.index
            .insert(column.name().to_string(), self.columns.len());
        self.columns.push(column);
        Ok(())
    }

    /// Appends one row. Anything but an object is rejected.
    pub fn add_row(&mut self, row: &Value) -> Result<()> {
        match row {
            Value::Object(fields) => {
                let at = self.row_count;
                self.add_row_at(fields, at)
            }
            _ => Err(Error::Other("a spread row must be an object".to_string())),
        }
    }

    pub(crate) fn add_row_at(&mut self, fields: &[(String, Value)], row: usize) -> Result<()> {
        for (key, value) in fields {
            let slot = match self.index.get(key.as_str()) {
                Some(&i) => i,
                None => {
                    let mut column = Column::new(key.clone());
                    column.set_len(self.row_count);
                    self.index.insert(key.clone(), self.columns.len());
                    self.columns.push(column);
                    self.columns.len() - 1
                }
            };
            self.columns[slot].add(value, row)?;
        }
        let next = row
            .checked_add(1)
            .ok_or_else(|| Error::Other("row index overflow".to_string()))?;
        if next > self.row_count {
            self.row_count = next;
        }
        Ok(())
    }

    pub fn get_row(&self, row: usize) -> Value {
        Value::Object(
            self.columns
                .iter()
                .filter(|c| !c.is_null(row))
                .map(|c| (c.name().to_string(), c.get_value(row)))
                .collect(),
        )
    }

    pub fn schema(&self) -> Vec<ColumnField> {
        self.columns.iter().map(|c| c.field()).collect()
    }

    pub fn take(&self, indices: &[usize]) -> Result<Spread> {
        let mut out = Spread::new();
        for c in &self.columns {
            out.add_column(c.take(indices)?)?;
        }
        out.row_count = indices.len();
        Ok(out)
    }

    /// Resolves a column through nested spreads, e.g. `["user", "id"]`.
    pub fn find_column(&self, path: &[String]) -> Option<&Column> {
        let (first, rest) = path.split_first()?;
        let mut column = self.get_column(first)?;
        for key in rest {
            column = column.child(key)?;
        }
        Some(column)
    }

    /// Bitmap of the rows for which `expr` holds.
    pub fn filter(&self, expr: &Expression) -> Result<Bitmap> {
        expr.evaluate_spread(self)
    }

    /// Indices of the rows for which `expr` holds, ascending.
    pub fn filter_rows(&self, expr: &Expression) -> Result<Vec<usize>> {
        Ok(self.filter(expr)?.iter_ones().collect())
    }
}
