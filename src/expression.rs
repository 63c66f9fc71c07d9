use crate::bitmap::Bitmap;
use crate::filter::Filter;
use crate::spread::Spread;
use crate::Result;

/// Predicate tree shared by block skipping and cell filtering.
#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    And(Vec<Expression>),
    Or(Vec<Expression>),
    Not(Box<Expression>),
    /// `filter` applied to the column at `path` (nested spread keys).
    Leaf { path: Vec<String>, filter: Filter },
}

impl Expression {
    pub fn leaf<S: Into<String>>(path: impl IntoIterator<Item = S>, filter: Filter) -> Self {
        Expression::Leaf {
            path: path.into_iter().map(Into::into).collect(),
            filter,
        }
    }

    pub fn column(name: impl Into<String>, filter: Filter) -> Self {
        Expression::Leaf {
            path: vec![name.into()],
            filter,
        }
    }

    pub fn not(inner: Expression) -> Self {
        Expression::Not(Box::new(inner))
    }

    pub fn accept<V: ExpressionVisitor>(&self, visitor: &mut V) -> Result<V::Output> {
        match self {
            Expression::Leaf { path, filter } => visitor.leaf(path, filter),
            Expression::And(parts) => {
                let mut outs = Vec::with_capacity(parts.len());
                for p in parts {
                    outs.push(p.accept(visitor)?);
                }
                visitor.and(outs)
            }
            Expression::Or(parts) => {
                let mut outs = Vec::with_capacity(parts.len());
                for p in parts {
                    outs.push(p.accept(visitor)?);
                }
                visitor.or(outs)
            }
            Expression::Not(inner) => {
                let out = inner.accept(visitor)?;
                visitor.not(out)
            }
        }
    }

    /// Cell-level evaluation against a decoded row group.
    pub fn evaluate_spread(&self, spread: &Spread) -> Result<Bitmap> {
        let mut visitor = SpreadCellEvaluator { spread };
        self.accept(&mut visitor)
    }
}

/// One evaluation target of an [`Expression`].
pub trait ExpressionVisitor {
    type Output;

    fn leaf(&mut self, path: &[String], filter: &Filter) -> Result<Self::Output>;
    fn and(&mut self, parts: Vec<Self::Output>) -> Result<Self::Output>;
    fn or(&mut self, parts: Vec<Self::Output>) -> Result<Self::Output>;
    fn not(&mut self, inner: Self::Output) -> Result<Self::Output>;
}

struct SpreadCellEvaluator<'a> {
    spread: &'a Spread,
}

impl ExpressionVisitor for SpreadCellEvaluator<'_> {
    type Output = Bitmap;

    fn leaf(&mut self, path: &[String], filter: &Filter) -> Result<Bitmap> {
        let len = self.spread.row_count();
        let Some(column) = self.spread.find_column(path) else {
            // A missing column is null on every row.
            return if filter.matches(None) {
                Bitmap::new_all_set(len)
            } else {
                Bitmap::new_all_unset(len)
            };
        };
        let mut out = match column.filter(filter)? {
            Some(hits) => hits,
            None => {
                let mut hits = Bitmap::new_all_unset(column.len())?;
                for row in 0..column.len() {
                    if filter.cell_matches(&column.get(row)) {
                        hits.set(row, true)?;
                    }
                }
                hits
            }
        };
        if out.len() != len {
            // Rows past the column's end are nulls.
            let null_matches = filter.matches(None);
            let mut resized = Bitmap::new_all_unset(len)?;
            for row in 0..len {
                let hit = if row < out.len() { out.get(row) } else { null_matches };
                if hit {
                    resized.set(row, true)?;
                }
            }
            out = resized;
        }
        Ok(out)
    }

    fn and(&mut self, parts: Vec<Bitmap>) -> Result<Bitmap> {
        let mut acc = Bitmap::new_all_set(self.spread.row_count())?;
        for p in &parts {
            acc.and(p)?;
        }
        Ok(acc)
    }

    fn or(&mut self, parts: Vec<Bitmap>) -> Result<Bitmap> {
        let mut acc = Bitmap::new_all_unset(self.spread.row_count())?;
        for p in &parts {
            acc.or(p)?;
        }
        Ok(acc)
    }

    fn not(&mut self, mut inner: Bitmap) -> Result<Bitmap> {
        inner.invert();
        Ok(inner)
    }
}
