use crate::{Error, Result};

#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "tools-json", derive(serde::Serialize, serde::Deserialize))]
pub enum ColumnType {
    Union,
    Array,
    Spread,
    Boolean,
    Byte,
    Short,
    Integer,
    Long,
    Float,
    Double,
    String,
    Bytes,
    Null,
}

impl ColumnType {
    pub fn id(self) -> u8 {
        match self {
            ColumnType::Union => 0,
            ColumnType::Array => 1,
            ColumnType::Spread => 2,
            ColumnType::Boolean => 3,
            ColumnType::Byte => 4,
            ColumnType::Short => 5,
            ColumnType::Integer => 6,
            ColumnType::Long => 7,
            ColumnType::Float => 8,
            ColumnType::Double => 9,
            ColumnType::String => 10,
            ColumnType::Bytes => 11,
            ColumnType::Null => 12,
        }
    }

    pub fn from_id(id: u8) -> Result<Self> {
        match id {
            0 => Ok(ColumnType::Union),
            1 => Ok(ColumnType::Array),
            2 => Ok(ColumnType::Spread),
            3 => Ok(ColumnType::Boolean),
            4 => Ok(ColumnType::Byte),
            5 => Ok(ColumnType::Short),
            6 => Ok(ColumnType::Integer),
            7 => Ok(ColumnType::Long),
            8 => Ok(ColumnType::Float),
            9 => Ok(ColumnType::Double),
            10 => Ok(ColumnType::String),
            11 => Ok(ColumnType::Bytes),
            12 => Ok(ColumnType::Null),
            _ => Err(Error::Format(format!("unknown column type id: {id}"))),
        }
    }

    pub fn is_primitive(self) -> bool {
        !matches!(
            self,
            ColumnType::Union | ColumnType::Array | ColumnType::Spread | ColumnType::Null
        )
    }

    pub fn is_integer(self) -> bool {
        matches!(
            self,
            ColumnType::Byte | ColumnType::Short | ColumnType::Integer | ColumnType::Long
        )
    }

    pub fn is_float(self) -> bool {
        matches!(self, ColumnType::Float | ColumnType::Double)
    }

    pub fn is_number(self) -> bool {
        self.is_integer() || self.is_float()
    }

    /// Fixed byte width of one value, `None` for variable-length types.
    pub fn fixed_width(self) -> Option<usize> {
        match self {
            ColumnType::Boolean | ColumnType::Byte => Some(1),
            ColumnType::Short => Some(2),
            ColumnType::Integer | ColumnType::Float => Some(4),
            ColumnType::Long | ColumnType::Double => Some(8),
            _ => None,
        }
    }

    /// Narrowest type able to hold values of both `self` and `other`
    /// without leaving the scalar family. `None` means the pair needs a union.
    pub fn common_supertype(self, other: ColumnType) -> Option<ColumnType> {
        if self == other {
            return Some(self);
        }
        if self == ColumnType::Null {
            return Some(other);
        }
        if other == ColumnType::Null {
            return Some(self);
        }
        if self.is_integer() && other.is_integer() {
            return Some(self.max(other));
        }
        if self.is_float() && other.is_float() {
            return Some(self.max(other));
        }
        if self.is_number() && other.is_number() {
            return Some(ColumnType::Double);
        }
        None
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnField {
    pub name: String,
    pub ty: ColumnType,
    pub children: Vec<ColumnField>,
}

impl ColumnField {
    pub fn child(&self, name: &str) -> Option<&ColumnField> {
        self.children.iter().find(|c| c.name == name)
    }
}
