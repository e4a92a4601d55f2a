
//! Specialized binary input and output.
//! Uses the error handling for this crate.

pub use ::std::io::{Read, Write};
use lebe::prelude::*;
use crate::error::{Error, Result, UnitResult};


/// Do not allocate more than this number of elements at once
/// when reading a vector whose length comes from untrusted bytes.
pub(crate) const SOFT_MAX_ELEMENTS: usize = 1 << 16;


/// Generic trait that defines common binary operations such as reading and writing for this type.
pub trait Data: Sized + Default + Clone {
    const BYTE_SIZE: usize = ::std::mem::size_of::<Self>();

    /// Read a value of type `Self`.
    fn read(read: &mut impl Read) -> Result<Self>;

    /// Read as many values of type `Self` as fit into the specified slice.
    /// If the slice cannot be filled completely, returns `Error::Invalid`.
    fn read_slice(read: &mut impl Read, slice: &mut[Self]) -> UnitResult;

    /// Read as many values of type `Self` as specified with `data_size`.
    ///
    /// This method will not allocate more memory than `soft_max` at once.
    /// If `hard_max` is specified, it will never read any more than that.
    /// Returns `Error::Invalid` if reader does not contain the desired number of elements.
    #[inline]
    fn read_vec(read: &mut impl Read, data_size: usize, soft_max: usize, hard_max: Option<usize>) -> Result<Vec<Self>> {
        if let Some(max) = hard_max {
            if data_size > max {
                return Err(Error::invalid("content size"))
            }
        }

        let soft_max = hard_max.unwrap_or(soft_max).min(soft_max).max(1);
        let mut data = Vec::new();

        // do not allocate more than $chunks memory at once
        // (most of the time, this loop will run only once)
        while data.len() < data_size {
            let chunk_start = data.len();
            let chunk_end = (chunk_start + soft_max).min(data_size);

            data.resize(chunk_end, Self::default());
            Self::read_slice(read, &mut data[chunk_start .. chunk_end])?;
        }

        Ok(data)
    }

    /// Write this value to the writer.
    fn write(self, write: &mut impl Write) -> UnitResult;

    /// Write all values of that slice to the writer.
    fn write_slice(write: &mut impl Write, slice: &[Self]) -> UnitResult;

    /// Write the length of the slice as `u32` and then its contents.
    #[inline]
    fn write_u32_sized_slice(write: &mut impl Write, slice: &[Self]) -> UnitResult {
        crate::error::usize_to_u32(slice.len(), "slice too large")?.write(write)?;
        Self::write_slice(write, slice)
    }

    /// Read the desired element count and then read that many items into a vector.
    /// Never allocates more than `soft_max` elements before the data has actually been read.
    #[inline]
    fn read_u32_sized_vec(read: &mut impl Read, soft_max: usize, hard_max: Option<usize>) -> Result<Vec<Self>> {
        let size = crate::error::u32_to_usize(u32::read(read)?, "array size")?;
        Self::read_vec(read, size, soft_max, hard_max)
    }
}


macro_rules! implement_data_for_primitive {
    ($kind: ident) => {
        impl Data for $kind {
            #[inline]
            fn read(read: &mut impl Read) -> Result<Self> {
                Ok(read.read_from_little_endian()?)
            }

            #[inline]
            fn write(self, write: &mut impl Write) -> Result<()> {
                write.write_as_little_endian(&self)?;
                Ok(())
            }

            #[inline]
            fn read_slice(read: &mut impl Read, slice: &mut [Self]) -> Result<()> {
                read.read_from_little_endian_into(slice)?;
                Ok(())
            }

            #[inline]
            fn write_slice(write: &mut impl Write, slice: &[Self]) -> Result<()> {
                write.write_as_little_endian(slice)?;
                Ok(())
            }
        }
    };
}

implement_data_for_primitive!(u8);
implement_data_for_primitive!(u32);
implement_data_for_primitive!(u64);
implement_data_for_primitive!(f32);


#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn sized_vec_round_trip(){
        let values = [1.5_f32, -3.0, 0.25];
        let mut bytes = Vec::new();
        f32::write_u32_sized_slice(&mut bytes, &values).unwrap();
        assert_eq!(bytes.len(), 4 + 3 * f32::BYTE_SIZE);

        let read = f32::read_u32_sized_vec(&mut bytes.as_slice(), 2, None).unwrap();
        assert_eq!(read, values.to_vec());
    }

    #[test]
    fn huge_length_does_not_allocate(){
        let mut bytes = Vec::new();
        u32::MAX.write(&mut bytes).unwrap();
        bytes.extend_from_slice(&[1, 2, 3]);

        let result = u8::read_u32_sized_vec(&mut bytes.as_slice(), SOFT_MAX_ELEMENTS, None);
        assert!(matches!(result, Err(Error::Invalid(_))));
    }

    #[test]
    fn hard_max_is_respected(){
        let mut bytes = Vec::new();
        u8::write_u32_sized_slice(&mut bytes, &[1, 2, 3, 4]).unwrap();

        let result = u8::read_u32_sized_vec(&mut bytes.as_slice(), SOFT_MAX_ELEMENTS, Some(3));
        assert!(matches!(result, Err(Error::Invalid(_))));
    }
}
