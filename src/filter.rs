use core::cmp::Ordering;
use std::collections::BTreeSet;

use crate::column::Cell;
use crate::value::{PrimitiveObject, compare_numbers};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "tools-json", derive(serde::Serialize, serde::Deserialize))]
pub enum NumberOp {
    Equal,
    NotEqual,
    Lt,
    Le,
    Gt,
    Ge,
}

impl NumberOp {
    fn accepts(self, o: Ordering) -> bool {
        match self {
            NumberOp::Equal => o == Ordering::Equal,
            NumberOp::NotEqual => o != Ordering::Equal,
            NumberOp::Lt => o == Ordering::Less,
            NumberOp::Le => o != Ordering::Greater,
            NumberOp::Gt => o == Ordering::Greater,
            NumberOp::Ge => o != Ordering::Less,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum StringFilter {
    Exact(String),
    ForwardMatch(String),
    BackwardMatch(String),
    PartialMatch(String),
    Range {
        min: String,
        min_inclusive: bool,
        max: String,
        max_inclusive: bool,
        invert: bool,
    },
    Dictionary(BTreeSet<String>),
}

impl StringFilter {
    pub fn matches(&self, s: &str) -> bool {
        match self {
            StringFilter::Exact(t) => s == t,
            StringFilter::ForwardMatch(t) => s.starts_with(t.as_str()),
            StringFilter::BackwardMatch(t) => s.ends_with(t.as_str()),
            StringFilter::PartialMatch(t) => s.contains(t.as_str()),
            StringFilter::Range {
                min,
                min_inclusive,
                max,
                max_inclusive,
                invert,
            } => {
                let above = if *min_inclusive {
                    s >= min.as_str()
                } else {
                    s > min.as_str()
                };
                let below = if *max_inclusive {
                    s <= max.as_str()
                } else {
                    s < max.as_str()
                };
                (above && below) != *invert
            }
            StringFilter::Dictionary(set) => set.contains(s),
        }
    }
}

/// A single-column predicate.
///
/// Value predicates never match null, and never match a value of another
/// type family (a number predicate on a string row is simply false).
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    Boolean(bool),
    Number {
        op: NumberOp,
        value: PrimitiveObject,
    },
    NumberRange {
        low: PrimitiveObject,
        low_inclusive: bool,
        high: PrimitiveObject,
        high_inclusive: bool,
        invert: bool,
    },
    String(StringFilter),
    Null,
    NotNull,
}

impl Filter {
    pub fn number(op: NumberOp, value: impl Into<PrimitiveObject>) -> Self {
        Filter::Number {
            op,
            value: value.into(),
        }
    }

    pub fn between(low: impl Into<PrimitiveObject>, high: impl Into<PrimitiveObject>) -> Self {
        Filter::NumberRange {
            low: low.into(),
            low_inclusive: true,
            high: high.into(),
            high_inclusive: true,
            invert: false,
        }
    }

    pub fn exact(s: impl Into<String>) -> Self {
        Filter::String(StringFilter::Exact(s.into()))
    }

    /// Reference evaluation for one scalar row (`None` = null).
    pub fn matches(&self, value: Option<&PrimitiveObject>) -> bool {
        let Some(v) = value else {
            return matches!(self, Filter::Null);
        };
        match self {
            Filter::Null => false,
            Filter::NotNull => true,
            Filter::Boolean(b) => matches!(v, PrimitiveObject::Bool(x) if x == b),
            Filter::Number { op, value } => match compare_numbers(v, value) {
                Some(o) => op.accepts(o),
                None => false,
            },
            Filter::NumberRange {
                low,
                low_inclusive,
                high,
                high_inclusive,
                invert,
            } => {
                let (Some(lo), Some(hi)) = (compare_numbers(v, low), compare_numbers(v, high))
                else {
                    return false;
                };
                let above = if *low_inclusive {
                    lo != Ordering::Less
                } else {
                    lo == Ordering::Greater
                };
                let below = if *high_inclusive {
                    hi != Ordering::Greater
                } else {
                    hi == Ordering::Less
                };
                (above && below) != *invert
            }
            Filter::String(sf) => match v {
                PrimitiveObject::String(s) => sf.matches(s),
                _ => false,
            },
        }
    }

    /// Reference evaluation for any cell.
    ///
    /// An array row matches a value predicate when any of its elements does.
    /// A struct row only answers null checks.
    pub fn cell_matches(&self, cell: &Cell<'_>) -> bool {
        match cell {
            Cell::Null => self.matches(None),
            Cell::Primitive(p) => self.matches(Some(*p)),
            Cell::Array { start, end, child } => match self {
                Filter::Null => false,
                Filter::NotNull => true,
                _ => (*start..*end).any(|i| self.cell_matches(&child.get(i))),
            },
            Cell::Spread { .. } => matches!(self, Filter::NotNull),
        }
    }
}
