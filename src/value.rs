use core::cmp::Ordering;
use core::fmt;

use crate::schema::ColumnType;
use crate::{Error, Result};

/// One canonical scalar.
///
/// Numeric getters widen losslessly; a request that would lose information
/// (e.g. `get_byte` on a `Long(1000)`) fails instead of truncating.
#[derive(Debug, Clone, PartialEq)]
pub enum PrimitiveObject {
    Bool(bool),
    Byte(i8),
    Short(i16),
    Integer(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    String(String),
    Bytes(Vec<u8>),
}

impl PrimitiveObject {
    pub fn column_type(&self) -> ColumnType {
        match self {
            PrimitiveObject::Bool(_) => ColumnType::Boolean,
            PrimitiveObject::Byte(_) => ColumnType::Byte,
            PrimitiveObject::Short(_) => ColumnType::Short,
            PrimitiveObject::Integer(_) => ColumnType::Integer,
            PrimitiveObject::Long(_) => ColumnType::Long,
            PrimitiveObject::Float(_) => ColumnType::Float,
            PrimitiveObject::Double(_) => ColumnType::Double,
            PrimitiveObject::String(_) => ColumnType::String,
            PrimitiveObject::Bytes(_) => ColumnType::Bytes,
        }
    }

    pub fn is_integer(&self) -> bool {
        self.column_type().is_integer()
    }

    pub fn is_number(&self) -> bool {
        self.column_type().is_number()
    }

    pub fn get_bool(&self) -> Result<bool> {
        match self {
            PrimitiveObject::Bool(v) => Ok(*v),
            PrimitiveObject::String(s) => match s.as_str() {
                "true" => Ok(true),
                "false" => Ok(false),
                _ => Err(type_error(self, "boolean")),
            },
            _ => Err(type_error(self, "boolean")),
        }
    }

    pub fn get_long(&self) -> Result<i64> {
        match self {
            PrimitiveObject::Byte(v) => Ok(i64::from(*v)),
            PrimitiveObject::Short(v) => Ok(i64::from(*v)),
            PrimitiveObject::Integer(v) => Ok(i64::from(*v)),
            PrimitiveObject::Long(v) => Ok(*v),
            PrimitiveObject::Float(v) => {
                exact_f64_to_i64(f64::from(*v)).ok_or_else(|| type_error(self, "long"))
            }
            PrimitiveObject::Double(v) => {
                exact_f64_to_i64(*v).ok_or_else(|| type_error(self, "long"))
            }
            _ => Err(type_error(self, "long")),
        }
    }

    pub fn get_int(&self) -> Result<i32> {
        let v = self.get_long()?;
        i32::try_from(v).map_err(|_| type_error(self, "integer"))
    }

    pub fn get_short(&self) -> Result<i16> {
        let v = self.get_long()?;
        i16::try_from(v).map_err(|_| type_error(self, "short"))
    }

    pub fn get_byte(&self) -> Result<i8> {
        let v = self.get_long()?;
        i8::try_from(v).map_err(|_| type_error(self, "byte"))
    }

    pub fn get_double(&self) -> Result<f64> {
        match self {
            PrimitiveObject::Byte(v) => Ok(f64::from(*v)),
            PrimitiveObject::Short(v) => Ok(f64::from(*v)),
            PrimitiveObject::Integer(v) => Ok(f64::from(*v)),
            // i64 -> f64 is only exact up to 2^53.
            PrimitiveObject::Long(v) => {
                let d = *v as f64;
                if exact_f64_to_i64(d) == Some(*v) {
                    Ok(d)
                } else {
                    Err(type_error(self, "double"))
                }
            }
            PrimitiveObject::Float(v) => Ok(f64::from(*v)),
            PrimitiveObject::Double(v) => Ok(*v),
            _ => Err(type_error(self, "double")),
        }
    }

    pub fn get_float(&self) -> Result<f32> {
        match self {
            PrimitiveObject::Float(v) => Ok(*v),
            PrimitiveObject::Byte(v) => Ok(f32::from(*v)),
            PrimitiveObject::Short(v) => Ok(f32::from(*v)),
            _ => {
                let d = self.get_double().map_err(|_| type_error(self, "float"))?;
                let f = d as f32;
                if f64::from(f) == d || d.is_nan() {
                    Ok(f)
                } else {
                    Err(type_error(self, "float"))
                }
            }
        }
    }

    pub fn get_string(&self) -> Result<String> {
        match self {
            PrimitiveObject::String(s) => Ok(s.clone()),
            PrimitiveObject::Bytes(b) => String::from_utf8(b.clone())
                .map_err(|_| Error::Other("bytes are not valid UTF-8".to_string())),
            PrimitiveObject::Bool(v) => Ok(v.to_string()),
            PrimitiveObject::Byte(v) => Ok(v.to_string()),
            PrimitiveObject::Short(v) => Ok(v.to_string()),
            PrimitiveObject::Integer(v) => Ok(v.to_string()),
            PrimitiveObject::Long(v) => Ok(v.to_string()),
            PrimitiveObject::Float(v) => Ok(v.to_string()),
            PrimitiveObject::Double(v) => Ok(v.to_string()),
        }
    }

    pub fn get_bytes(&self) -> Result<Vec<u8>> {
        match self {
            PrimitiveObject::Bytes(b) => Ok(b.clone()),
            PrimitiveObject::String(s) => Ok(s.as_bytes().to_vec()),
            _ => Err(type_error(self, "bytes")),
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            PrimitiveObject::String(s) => Some(s.as_str()),
            _ => None,
        }
    }

    /// Converts to the representation of `ty`, failing when the value does
    /// not fit losslessly.
    pub fn cast(&self, ty: ColumnType) -> Result<PrimitiveObject> {
        if self.column_type() == ty {
            return Ok(self.clone());
        }
        match ty {
            ColumnType::Boolean => Ok(PrimitiveObject::Bool(self.get_bool()?)),
            ColumnType::Byte => Ok(PrimitiveObject::Byte(self.get_byte()?)),
            ColumnType::Short => Ok(PrimitiveObject::Short(self.get_short()?)),
            ColumnType::Integer => Ok(PrimitiveObject::Integer(self.get_int()?)),
            ColumnType::Long => Ok(PrimitiveObject::Long(self.get_long()?)),
            ColumnType::Float => Ok(PrimitiveObject::Float(self.get_float()?)),
            ColumnType::Double => match self {
                // Widening a long into a double column is accepted even past 2^53.
                PrimitiveObject::Long(v) => Ok(PrimitiveObject::Double(*v as f64)),
                _ => Ok(PrimitiveObject::Double(self.get_double()?)),
            },
            ColumnType::String => Ok(PrimitiveObject::String(self.get_string()?)),
            ColumnType::Bytes => Ok(PrimitiveObject::Bytes(self.get_bytes()?)),
            _ => Err(type_error(self, "scalar")),
        }
    }

    /// Number of bytes this value occupies once materialized.
    pub fn logical_size(&self) -> usize {
        match self {
            PrimitiveObject::String(s) => s.len(),
            PrimitiveObject::Bytes(b) => b.len(),
            other => other.column_type().fixed_width().unwrap_or(0),
        }
    }

    /// Total order used for dictionaries and min/max summaries.
    ///
    /// Numbers compare numerically across widths, floats use IEEE total order,
    /// values of different families order by type id.
    pub fn total_cmp(&self, other: &PrimitiveObject) -> Ordering {
        if let Some(o) = compare_numbers(self, other) {
            return o;
        }
        match (self, other) {
            (PrimitiveObject::Bool(a), PrimitiveObject::Bool(b)) => a.cmp(b),
            (PrimitiveObject::String(a), PrimitiveObject::String(b)) => a.cmp(b),
            (PrimitiveObject::Bytes(a), PrimitiveObject::Bytes(b)) => a.cmp(b),
            (a, b) => {
                let fa = a.is_number();
                let fb = b.is_number();
                if fa && fb {
                    let x = as_f64_lossy(a).unwrap_or(f64::NAN);
                    let y = as_f64_lossy(b).unwrap_or(f64::NAN);
                    x.total_cmp(&y)
                } else {
                    a.column_type().id().cmp(&b.column_type().id())
                }
            }
        }
    }
}

impl fmt::Display for PrimitiveObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PrimitiveObject::Bytes(b) => write!(f, "{b:?}"),
            other => match other.get_string() {
                Ok(s) => write!(f, "{s}"),
                Err(_) => write!(f, "?"),
            },
        }
    }
}

fn type_error(v: &PrimitiveObject, target: &str) -> Error {
    Error::Other(format!(
        "cannot read {:?} value as {target}",
        v.column_type()
    ))
}

fn exact_f64_to_i64(d: f64) -> Option<i64> {
    if d.fract() != 0.0 || !d.is_finite() {
        return None;
    }
    if d < -9_223_372_036_854_775_808.0 || d >= 9_223_372_036_854_775_808.0 {
        return None;
    }
    Some(d as i64)
}

fn as_f64_lossy(v: &PrimitiveObject) -> Option<f64> {
    match v {
        PrimitiveObject::Byte(x) => Some(f64::from(*x)),
        PrimitiveObject::Short(x) => Some(f64::from(*x)),
        PrimitiveObject::Integer(x) => Some(f64::from(*x)),
        PrimitiveObject::Long(x) => Some(*x as f64),
        PrimitiveObject::Float(x) => Some(f64::from(*x)),
        PrimitiveObject::Double(x) => Some(*x),
        _ => None,
    }
}

fn as_i64_exact(v: &PrimitiveObject) -> Option<i64> {
    match v {
        PrimitiveObject::Byte(x) => Some(i64::from(*x)),
        PrimitiveObject::Short(x) => Some(i64::from(*x)),
        PrimitiveObject::Integer(x) => Some(i64::from(*x)),
        PrimitiveObject::Long(x) => Some(*x),
        _ => None,
    }
}

/// Compares two numeric values of any width.
///
/// Integer pairs compare exactly. When either side is a float the comparison
/// is done in `f64`; an integer beyond 2^53 against a float is compared after
/// splitting the float into its integral part so that the result stays exact.
/// `None` when either side is not a number or a NaN is involved.
pub fn compare_numbers(a: &PrimitiveObject, b: &PrimitiveObject) -> Option<Ordering> {
    if let (Some(x), Some(y)) = (as_i64_exact(a), as_i64_exact(b)) {
        return Some(x.cmp(&y));
    }
    match (as_i64_exact(a), as_i64_exact(b)) {
        (Some(x), None) => {
            let y = as_f64_lossy(b)?;
            cmp_i64_f64(x, y)
        }
        (None, Some(y)) => {
            let x = as_f64_lossy(a)?;
            cmp_i64_f64(y, x).map(Ordering::reverse)
        }
        _ => {
            let x = as_f64_lossy(a)?;
            let y = as_f64_lossy(b)?;
            x.partial_cmp(&y)
        }
    }
}

fn cmp_i64_f64(x: i64, y: f64) -> Option<Ordering> {
    if y.is_nan() {
        return None;
    }
    if y >= 9_223_372_036_854_775_808.0 {
        return Some(Ordering::Less);
    }
    if y < -9_223_372_036_854_775_808.0 {
        return Some(Ordering::Greater);
    }
    let floor = y.floor();
    let yi = floor as i64;
    match x.cmp(&yi) {
        Ordering::Equal => {
            if y > floor {
                Some(Ordering::Less)
            } else {
                Some(Ordering::Equal)
            }
        }
        o => Some(o),
    }
}

/// Generic structured value handed over by a row-ingestion front end.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Primitive(PrimitiveObject),
    Array(Vec<Value>),
    Object(Vec<(String, Value)>),
}

impl Value {
    pub fn column_type(&self) -> ColumnType {
        match self {
            Value::Null => ColumnType::Null,
            Value::Primitive(p) => p.column_type(),
            Value::Array(_) => ColumnType::Array,
            Value::Object(_) => ColumnType::Spread,
        }
    }

    pub fn object<K: Into<String>>(fields: impl IntoIterator<Item = (K, Value)>) -> Value {
        Value::Object(fields.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }
}

impl From<PrimitiveObject> for Value {
    fn from(v: PrimitiveObject) -> Self {
        Value::Primitive(v)
    }
}

macro_rules! impl_from_scalar {
    ($t:ty, $variant:ident) => {
        impl From<$t> for PrimitiveObject {
            fn from(v: $t) -> Self {
                PrimitiveObject::$variant(v)
            }
        }

        impl From<$t> for Value {
            fn from(v: $t) -> Self {
                Value::Primitive(PrimitiveObject::$variant(v))
            }
        }
    };
}

impl_from_scalar!(bool, Bool);
impl_from_scalar!(i8, Byte);
impl_from_scalar!(i16, Short);
impl_from_scalar!(i32, Integer);
impl_from_scalar!(i64, Long);
impl_from_scalar!(f32, Float);
impl_from_scalar!(f64, Double);
impl_from_scalar!(String, String);
impl_from_scalar!(Vec<u8>, Bytes);

impl From<&str> for PrimitiveObject {
    fn from(v: &str) -> Self {
        PrimitiveObject::String(v.to_string())
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Primitive(PrimitiveObject::String(v.to_string()))
    }
}

#[cfg(feature = "tools-json")]
impl From<&serde_json::Value> for Value {
    fn from(v: &serde_json::Value) -> Self {
        match v {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Primitive(PrimitiveObject::Bool(*b)),
            serde_json::Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    if let Ok(i) = i32::try_from(i) {
                        Value::Primitive(PrimitiveObject::Integer(i))
                    } else {
                        Value::Primitive(PrimitiveObject::Long(i))
                    }
                } else {
                    Value::Primitive(PrimitiveObject::Double(n.as_f64().unwrap_or(f64::NAN)))
                }
            }
            serde_json::Value::String(s) => Value::Primitive(PrimitiveObject::String(s.clone())),
            serde_json::Value::Array(items) => {
                Value::Array(items.iter().map(Value::from).collect())
            }
            serde_json::Value::Object(map) => Value::Object(
                map.iter()
                    .map(|(k, v)| (k.clone(), Value::from(v)))
                    .collect(),
            ),
        }
    }
}
