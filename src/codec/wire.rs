use crate::schema::ColumnType;
use crate::value::PrimitiveObject;
use crate::{Error, Result};

pub(crate) fn write_u16_le(out: &mut Vec<u8>, v: u16) {
    out.extend_from_slice(&v.to_le_bytes());
}

pub(crate) fn write_u32_le(out: &mut Vec<u8>, v: u32) {
    out.extend_from_slice(&v.to_le_bytes());
}

pub(crate) fn write_u32_len_bytes(out: &mut Vec<u8>, bytes: &[u8]) -> Result<()> {
    let len: u32 = bytes
        .len()
        .try_into()
        .map_err(|_| Error::Encode("payload too large".to_string()))?;
    write_u32_le(out, len);
    out.extend_from_slice(bytes);
    Ok(())
}

pub(crate) fn usize_to_u32(v: usize, what: &str) -> Result<u32> {
    v.try_into()
        .map_err(|_| Error::Encode(format!("{what} too large")))
}

#[inline]
pub(crate) fn write_u64_varint(out: &mut Vec<u8>, mut x: u64) {
    while x >= 0x80 {
        out.push((x as u8) | 0x80);
        x >>= 7;
    }
    out.push(x as u8);
}

pub(crate) fn varint_len(mut x: u64) -> usize {
    let mut n = 1;
    while x >= 0x80 {
        x >>= 7;
        n += 1;
    }
    n
}

/// Bounds-checked little-endian cursor over a decoded payload.
pub(crate) struct ByteReader<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> ByteReader<'a> {
    pub(crate) fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, pos: 0 }
    }

    pub(crate) fn remaining(&self) -> usize {
        self.bytes.len() - self.pos
    }

    pub(crate) fn take(&mut self, n: usize) -> Result<&'a [u8]> {
        let end = self
            .pos
            .checked_add(n)
            .ok_or_else(|| Error::Decode("decode overflow".to_string()))?;
        if end > self.bytes.len() {
            return Err(Error::Decode("truncated payload".to_string()));
        }
        let slice = &self.bytes[self.pos..end];
        self.pos = end;
        Ok(slice)
    }

    pub(crate) fn read_u8(&mut self) -> Result<u8> {
        Ok(self.take(1)?[0])
    }

    pub(crate) fn read_u16_le(&mut self) -> Result<u16> {
        let b = self.take(2)?;
        Ok(u16::from_le_bytes([b[0], b[1]]))
    }

    pub(crate) fn read_u32_le(&mut self) -> Result<u32> {
        let b = self.take(4)?;
        Ok(u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
    }

    pub(crate) fn read_u64_le(&mut self) -> Result<u64> {
        let b = self.take(8)?;
        Ok(u64::from_le_bytes([
            b[0], b[1], b[2], b[3], b[4], b[5], b[6], b[7],
        ]))
    }

    pub(crate) fn read_u64_varint(&mut self) -> Result<u64> {
        let mut x: u64 = 0;
        let mut shift: u32 = 0;
        loop {
            let b = self.read_u8().map_err(|_| Error::Decode("truncated varint".to_string()))?;
            let lo = (b & 0x7F) as u64;
            if shift >= 64 {
                return Err(Error::Decode("varint overflow".to_string()));
            }
            x |= lo << shift;
            if (b & 0x80) == 0 {
                return Ok(x);
            }
            shift += 7;
        }
    }

    pub(crate) fn expect_magic(&mut self, magic: u8, codec: &str) -> Result<()> {
        let b = self
            .read_u8()
            .map_err(|_| Error::Decode(format!("{codec} payload is empty")))?;
        if b != magic {
            return Err(Error::Decode(format!("{codec} magic mismatch")));
        }
        Ok(())
    }

    pub(crate) fn finish(&self, codec: &str) -> Result<()> {
        if self.pos != self.bytes.len() {
            return Err(Error::Decode(format!("trailing bytes in {codec} payload")));
        }
        Ok(())
    }
}

/// Encoded size of one value of `ty`.
pub(crate) fn value_size(ty: ColumnType, v: &PrimitiveObject) -> usize {
    match ty.fixed_width() {
        Some(w) => w,
        None => 4 + v.logical_size(),
    }
}

pub(crate) fn write_value(out: &mut Vec<u8>, ty: ColumnType, v: &PrimitiveObject) -> Result<()> {
    let v = if v.column_type() == ty {
        std::borrow::Cow::Borrowed(v)
    } else {
        std::borrow::Cow::Owned(
            v.cast(ty)
                .map_err(|e| Error::Encode(format!("value does not fit column type: {e}")))?,
        )
    };
    match v.as_ref() {
        PrimitiveObject::Bool(b) => out.push(u8::from(*b)),
        PrimitiveObject::Byte(x) => out.push(*x as u8),
        PrimitiveObject::Short(x) => out.extend_from_slice(&x.to_le_bytes()),
        PrimitiveObject::Integer(x) => out.extend_from_slice(&x.to_le_bytes()),
        PrimitiveObject::Long(x) => out.extend_from_slice(&x.to_le_bytes()),
        PrimitiveObject::Float(x) => out.extend_from_slice(&x.to_bits().to_le_bytes()),
        PrimitiveObject::Double(x) => out.extend_from_slice(&x.to_bits().to_le_bytes()),
        PrimitiveObject::String(s) => write_u32_len_bytes(out, s.as_bytes())?,
        PrimitiveObject::Bytes(b) => write_u32_len_bytes(out, b)?,
    }
    Ok(())
}

pub(crate) fn read_value(r: &mut ByteReader<'_>, ty: ColumnType) -> Result<PrimitiveObject> {
    match ty {
        ColumnType::Boolean => match r.read_u8()? {
            0 => Ok(PrimitiveObject::Bool(false)),
            1 => Ok(PrimitiveObject::Bool(true)),
            b => Err(Error::Decode(format!("invalid boolean byte: {b}"))),
        },
        ColumnType::Byte => Ok(PrimitiveObject::Byte(r.read_u8()? as i8)),
        ColumnType::Short => Ok(PrimitiveObject::Short(r.read_u16_le()? as i16)),
        ColumnType::Integer => Ok(PrimitiveObject::Integer(r.read_u32_le()? as i32)),
        ColumnType::Long => Ok(PrimitiveObject::Long(r.read_u64_le()? as i64)),
        ColumnType::Float => Ok(PrimitiveObject::Float(f32::from_bits(r.read_u32_le()?))),
        ColumnType::Double => Ok(PrimitiveObject::Double(f64::from_bits(r.read_u64_le()?))),
        ColumnType::String => {
            let len = r.read_u32_le()? as usize;
            let bytes = r.take(len)?;
            let s = std::str::from_utf8(bytes)
                .map_err(|_| Error::Decode("invalid UTF-8 string value".to_string()))?;
            Ok(PrimitiveObject::String(s.to_string()))
        }
        ColumnType::Bytes => {
            let len = r.read_u32_le()? as usize;
            Ok(PrimitiveObject::Bytes(r.take(len)?.to_vec()))
        }
        other => Err(Error::Decode(format!("{other:?} is not a scalar type"))),
    }
}

/// Builds the integer variant of `ty` from `v`, rejecting values out of its range.
pub(crate) fn integer_of(ty: ColumnType, v: i64) -> Result<PrimitiveObject> {
    let out = match ty {
        ColumnType::Byte => i8::try_from(v).ok().map(PrimitiveObject::Byte),
        ColumnType::Short => i16::try_from(v).ok().map(PrimitiveObject::Short),
        ColumnType::Integer => i32::try_from(v).ok().map(PrimitiveObject::Integer),
        ColumnType::Long => Some(PrimitiveObject::Long(v)),
        _ => None,
    };
    out.ok_or_else(|| Error::Decode(format!("value {v} out of range for {ty:?}")))
}
