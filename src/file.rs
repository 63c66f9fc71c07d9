use std::io::{Read, Write};

use crate::{Error, Result};

pub const MAGIC: &[u8; 4] = b"$CLM";

/// `"$CLM" | block_size i32 | name_len i32 | name UTF-16BE`, all big endian.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileHeader {
    block_size: usize,
    block_reader_name: String,
}

const FIXED_LEN: usize = 4 + 4 + 4;

impl FileHeader {
    pub fn new(block_size: usize, block_reader_name: impl Into<String>) -> Self {
        Self {
            block_size,
            block_reader_name: block_reader_name.into(),
        }
    }

    pub fn block_size(&self) -> usize {
        self.block_size
    }

    pub fn block_reader_name(&self) -> &str {
        &self.block_reader_name
    }

    /// Bytes the header occupies at the start of block 0.
    pub fn encoded_len(&self) -> usize {
        FIXED_LEN + 2 * self.block_reader_name.encode_utf16().count()
    }

    pub fn encode(&self) -> Result<Vec<u8>> {
        let block_size = i32::try_from(self.block_size)
            .map_err(|_| {
                Error::Encode(format!("block size {} does not fit i32", self.block_size))
            })?;
        let name: Vec<u16> = self.block_reader_name.encode_utf16().collect();
        let name_len = name
            .len()
            .checked_mul(2)
            .and_then(|n| i32::try_from(n).ok())
            .ok_or_else(|| Error::Encode("block reader name too long".to_string()))?;
        let mut out = Vec::with_capacity(self.encoded_len());
        out.extend_from_slice(MAGIC);
        out.extend_from_slice(&block_size.to_be_bytes());
        out.extend_from_slice(&name_len.to_be_bytes());
        for unit in name {
            out.extend_from_slice(&unit.to_be_bytes());
        }
        if out.len() > self.block_size {
            return Err(Error::Encode(format!(
                "header of {} bytes does not fit block size {}",
                out.len(),
                self.block_size
            )));
        }
        Ok(out)
    }

    pub fn write_to<W: Write>(&self, w: &mut W) -> Result<()> {
        w.write_all(&self.encode()?)?;
        Ok(())
    }

    /// Reads and validates a header. `total_len` bounds the declared name.
    pub fn read_from<R: Read>(r: &mut R, total_len: u64) -> Result<Self> {
        let mut fixed = [0u8; FIXED_LEN];
        r.read_exact(&mut fixed)?;
        if &fixed[0..4] != MAGIC {
            return Err(Error::Format("bad file magic".to_string()));
        }
        let block_size = i32::from_be_bytes([fixed[4], fixed[5], fixed[6], fixed[7]]);
        let name_len = i32::from_be_bytes([fixed[8], fixed[9], fixed[10], fixed[11]]);
        if block_size <= 0 {
            return Err(Error::Format(format!("invalid block size: {block_size}")));
        }
        if name_len < 0 || name_len % 2 != 0 {
            return Err(Error::Format(format!("invalid block reader name length: {name_len}")));
        }
        let header_len = FIXED_LEN as u64 + name_len as u64;
        if header_len > block_size as u64 {
            return Err(Error::Format(format!(
                "header of {header_len} bytes exceeds block size {block_size}"
            )));
        }
        if header_len > total_len {
            return Err(Error::Format("truncated file header".to_string()));
        }
        let mut raw = vec![0u8; name_len as usize];
        r.read_exact(&mut raw)?;
        let units = raw.chunks_exact(2).map(|c| u16::from_be_bytes([c[0], c[1]]));
        let block_reader_name = char::decode_utf16(units)
            .collect::<core::result::Result<String, _>>()
            .map_err(|_| Error::Format("block reader name is not valid UTF-16".to_string()))?;
        Ok(Self {
            block_size: block_size as usize,
            block_reader_name,
        })
    }
}
