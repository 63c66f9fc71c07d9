use crate::{Error, Result};

pub(crate) fn ceil_div_8(n: usize) -> Result<usize> {
    n.checked_add(7)
        .ok_or_else(|| Error::Other("size overflow".to_string()))
        .map(|v| v / 8)
}

/// LSB-first bit set sized to a row count.
///
/// Used both as the on-disk null bitmap of scalar codecs and as the result of
/// cell-level filtering (bit set = row matches).
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Bitmap {
    bytes: Vec<u8>,
    len: usize,
}

impl Bitmap {
    pub fn new_all_unset(len: usize) -> Result<Self> {
        let byte_len = ceil_div_8(len)?;
        Ok(Self {
            bytes: vec![0u8; byte_len],
            len,
        })
    }

    pub fn new_all_set(len: usize) -> Result<Self> {
        let byte_len = ceil_div_8(len)?;
        if byte_len == 0 {
            return Ok(Self {
                bytes: Vec::new(),
                len,
            });
        }
        let mut bytes = vec![0xFFu8; byte_len];
        let rem = len % 8;
        if rem != 0 {
            let mask = (1u8 << rem) - 1;
            let last = bytes
                .last_mut()
                .ok_or_else(|| Error::Other("bitmap out of bounds".to_string()))?;
            *last = mask;
        }
        Ok(Self { bytes, len })
    }

    pub fn from_bytes(bytes: &[u8], len: usize) -> Result<Self> {
        let expected = ceil_div_8(len)?;
        if bytes.len() != expected {
            return Err(Error::Decode("bitmap length mismatch".to_string()));
        }
        let mut bytes = bytes.to_vec();
        let rem = len % 8;
        if rem != 0 {
            if let Some(last) = bytes.last_mut() {
                *last &= (1u8 << rem) - 1;
            }
        }
        Ok(Self { bytes, len })
    }

    pub fn from_bools(bits: &[bool]) -> Result<Self> {
        let mut out = Self::new_all_unset(bits.len())?;
        for (i, &b) in bits.iter().enumerate() {
            if b {
                out.bytes[i / 8] |= 1u8 << (i % 8);
            }
        }
        Ok(out)
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn set(&mut self, idx: usize, value: bool) -> Result<()> {
        if idx >= self.len {
            return Err(Error::Other("bitmap out of bounds".to_string()));
        }
        let mask = 1u8 << (idx % 8);
        if value {
            self.bytes[idx / 8] |= mask;
        } else {
            self.bytes[idx / 8] &= !mask;
        }
        Ok(())
    }

    /// Out-of-range indices read as unset.
    #[inline]
    pub fn get(&self, idx: usize) -> bool {
        if idx >= self.len {
            return false;
        }
        (self.bytes[idx / 8] & (1u8 << (idx % 8))) != 0
    }

    pub fn count_ones(&self) -> usize {
        self.bytes.iter().map(|b| b.count_ones() as usize).sum()
    }

    pub fn iter_ones(&self) -> impl Iterator<Item = usize> + '_ {
        (0..self.len).filter(move |&i| self.get(i))
    }

    pub fn and(&mut self, other: &Bitmap) -> Result<()> {
        if other.len != self.len {
            return Err(Error::Other("bitmap length mismatch".to_string()));
        }
        for (a, b) in self.bytes.iter_mut().zip(other.bytes.iter()) {
            *a &= *b;
        }
        Ok(())
    }

    pub fn or(&mut self, other: &Bitmap) -> Result<()> {
        if other.len != self.len {
            return Err(Error::Other("bitmap length mismatch".to_string()));
        }
        for (a, b) in self.bytes.iter_mut().zip(other.bytes.iter()) {
            *a |= *b;
        }
        Ok(())
    }

    pub fn invert(&mut self) {
        for b in self.bytes.iter_mut() {
            *b = !*b;
        }
        let rem = self.len % 8;
        if rem != 0 {
            if let Some(last) = self.bytes.last_mut() {
                *last &= (1u8 << rem) - 1;
            }
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.bytes.as_slice()
    }
}
