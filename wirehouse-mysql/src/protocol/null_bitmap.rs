use bytes::Bytes;
use smallvec::SmallVec;

use crate::error::Error;
use crate::io::BufExt;

/// Bit offset of the first column in a binary result row's NULL bitmap.
pub const RESULT_ROW_OFFSET: usize = 2;

/// How parameter indexes map onto the NULL bitmap of a `COM_STMT_EXECUTE` request.
///
/// Picked once per server and never inferred from packet contents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NullBitmapLayout {
    /// Parameter *i* is bit *i*; the bitmap is `(n + 7) / 8` bytes.
    #[default]
    Standard,

    /// Bits 0 and 1 are reserved and parameter *i* is bit *i + 2*; the bitmap is
    /// `(n + 9) / 8` bytes.
    MariaDbExecute,
}

impl NullBitmapLayout {
    pub const fn offset(self) -> usize {
        match self {
            NullBitmapLayout::Standard => 0,
            NullBitmapLayout::MariaDbExecute => 2,
        }
    }

    /// Byte length of the bitmap for `count` parameters.
    pub const fn bitmap_len(self, count: usize) -> usize {
        bitmap_len(count, self.offset())
    }
}

const fn bitmap_len(count: usize, offset: usize) -> usize {
    (count + offset).div_ceil(8)
}

/// A NULL bitmap over `count` values whose first value sits at bit `offset`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NullBitmap {
    bytes: SmallVec<[u8; 8]>,
    offset: usize,
    count: usize,
}

impl NullBitmap {
    pub fn new(count: usize, offset: usize) -> Self {
        Self {
            bytes: SmallVec::from_elem(0, bitmap_len(count, offset)),
            offset,
            count,
        }
    }

    pub fn for_execute(layout: NullBitmapLayout, count: usize) -> Self {
        Self::new(count, layout.offset())
    }

    pub fn for_result_row(count: usize) -> Self {
        Self::new(count, RESULT_ROW_OFFSET)
    }

    /// Read a bitmap of exactly the computed length and reject any bit set outside
    /// the value range, including the reserved offset bits.
    pub fn decode(buf: &mut Bytes, count: usize, offset: usize) -> Result<Self, Error> {
        let raw = buf.get_bytes(bitmap_len(count, offset))?;

        let bitmap = Self {
            bytes: SmallVec::from_slice(&raw),
            offset,
            count,
        };

        let total_bits = raw.len() * 8;
        for bit in (0..offset).chain(offset + count..total_bits) {
            if bitmap.bit(bit) {
                return Err(Error::MalformedBitmap(format!(
                    "bit {bit} is set but only bits {offset}..{} map to values",
                    offset + count
                )));
            }
        }

        Ok(bitmap)
    }

    pub fn set_null(&mut self, index: usize) {
        debug_assert!(index < self.count);

        let bit = index + self.offset;
        self.bytes[bit / 8] |= 1 << (bit % 8);
    }

    pub fn is_null(&self, index: usize) -> bool {
        index < self.count && self.bit(index + self.offset)
    }

    fn bit(&self, bit: usize) -> bool {
        self.bytes[bit / 8] & (1 << (bit % 8)) != 0
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }
}
