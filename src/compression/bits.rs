
//! Logical bit sequences and their packing into bytes.

use std::fmt;
use bit_field::BitField;
use crate::error::{Error, Result};


/// A growable sequence of bits.
/// Bits are packed into bytes, the first bit being the most significant bit of the first byte.
/// Unused bits of the last byte are always zero.
#[derive(Clone, Default, PartialEq, Eq, Hash)]
pub struct Bits {
    bytes: Vec<u8>,
    len: usize,
}

impl Bits {

    /// An empty sequence.
    pub fn new() -> Self { Self::default() }

    /// An empty sequence that can hold `capacity` bits without reallocating.
    pub fn with_capacity(capacity: usize) -> Self {
        Self { bytes: Vec::with_capacity((capacity + 7) / 8), len: 0 }
    }

    /// Reinterpret packed bytes as a sequence of `len` bits.
    /// Fails if the bytes do not contain exactly the bits required.
    pub fn from_bytes(bytes: Vec<u8>, len: usize) -> Result<Self> {
        if (len + 7) / 8 != bytes.len() {
            return Err(Error::invalid(format!("{} bytes cannot contain exactly {} bits", bytes.len(), len)));
        }

        let mut bits = Self { bytes, len };
        bits.clear_unused();
        Ok(bits)
    }

    fn clear_unused(&mut self) {
        let used = self.len % 8;
        if used != 0 {
            if let Some(last) = self.bytes.last_mut() {
                last.set_bits(0 .. 8 - used, 0);
            }
        }
    }

    /// Number of bits.
    #[inline] pub fn len(&self) -> usize { self.len }

    /// Whether this sequence has no bits.
    #[inline] pub fn is_empty(&self) -> bool { self.len == 0 }

    /// The packed bytes, including the zero padding of the last byte.
    #[inline] pub fn as_bytes(&self) -> &[u8] { &self.bytes }

    /// Append a single bit.
    #[inline]
    pub fn push(&mut self, bit: bool) {
        let offset = self.len % 8;
        if offset == 0 {
            self.bytes.push(0);
        }

        if bit {
            let last = self.bytes.len() - 1;
            self.bytes[last].set_bit(7 - offset, true);
        }

        self.len += 1;
    }

    /// Append the lowest `count` bits of `value`, most significant first.
    pub fn push_bits(&mut self, value: u64, count: u8) {
        debug_assert!(count <= 64, "bit count too large");

        for index in (0 .. usize::from(count)).rev() {
            self.push(value.get_bit(index));
        }
    }

    /// The bit at the specified position, if any.
    #[inline]
    pub fn get(&self, index: usize) -> Option<bool> {
        if index < self.len { Some(self.bytes[index / 8].get_bit(7 - index % 8)) }
        else { None }
    }

    /// All bits in order.
    pub fn iter(&self) -> impl Iterator<Item = bool> + '_ {
        (0 .. self.len).map(move |index| self.bytes[index / 8].get_bit(7 - index % 8))
    }

    /// Read this sequence from the start.
    pub fn cursor(&self) -> BitCursor<'_> {
        BitCursor { bits: self, position: 0 }
    }
}

impl std::iter::FromIterator<bool> for Bits {
    fn from_iter<I: IntoIterator<Item = bool>>(iter: I) -> Self {
        let mut bits = Bits::new();
        for bit in iter { bits.push(bit); }
        bits
    }
}

impl fmt::Debug for Bits {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "Bits({})", self)
    }
}

impl fmt::Display for Bits {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        for bit in self.iter() {
            formatter.write_str(if bit { "1" } else { "0" })?;
        }

        Ok(())
    }
}


/// Reads the bits of a sequence one after another.
#[derive(Debug, Clone)]
pub struct BitCursor<'b> {
    bits: &'b Bits,
    position: usize,
}

impl BitCursor<'_> {

    /// Number of bits not consumed yet.
    #[inline] pub fn remaining(&self) -> usize { self.bits.len() - self.position }

    /// Consume the next bit.
    #[inline]
    pub fn read_bit(&mut self) -> Option<bool> {
        let bit = self.bits.get(self.position)?;
        self.position += 1;
        Some(bit)
    }

    /// Consume `count` bits as an unsigned number, most significant bit first.
    pub fn read_bits(&mut self, count: u8) -> Option<u64> {
        if usize::from(count) > self.remaining() || count > 64 {
            return None;
        }

        let mut value = 0_u64;
        for _ in 0 .. count {
            value = (value << 1) | u64::from(self.read_bit()?);
        }

        Some(value)
    }
}


#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn packs_most_significant_first(){
        let bits: Bits = [true, false, true, true, false, false, false, false, true].iter().copied().collect();
        assert_eq!(bits.len(), 9);
        assert_eq!(bits.as_bytes(), &[0b1011_0000, 0b1000_0000]);
        assert_eq!(bits.to_string(), "101100001");
    }

    #[test]
    fn push_bits_and_read_back(){
        let mut bits = Bits::new();
        bits.push_bits(0b101, 3);
        bits.push_bits(0xABCD, 16);
        bits.push_bits(0, 0);

        let mut cursor = bits.cursor();
        assert_eq!(cursor.read_bits(3), Some(0b101));
        assert_eq!(cursor.read_bits(16), Some(0xABCD));
        assert_eq!(cursor.remaining(), 0);
        assert_eq!(cursor.read_bit(), None);
        assert_eq!(cursor.read_bits(1), None);
    }

    #[test]
    fn from_bytes_validates_length_and_clears_padding(){
        let bits = Bits::from_bytes(vec![0xFF, 0xFF], 10).unwrap();
        assert_eq!(bits.as_bytes(), &[0xFF, 0b1100_0000]);
        assert_eq!(bits.get(9), Some(true));
        assert_eq!(bits.get(10), None);

        assert!(Bits::from_bytes(vec![0xFF], 10).is_err());
        assert!(Bits::from_bytes(vec![0xFF, 0, 0], 10).is_err());
        assert!(Bits::from_bytes(Vec::new(), 0).unwrap().is_empty());
    }
}
