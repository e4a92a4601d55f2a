
//! Two-dimensional containers for channels, sub-bands and mode maps.

use crate::error::{Error, Result, UnitResult, u32_to_usize, usize_to_u32};
use crate::io::{Data, Read, Write, SOFT_MAX_ELEMENTS};
use crate::math::Vec2;


/// A dense row-major matrix of floating point values.
/// All rows have the same length, which is enforced on construction.
#[derive(Clone, Debug, PartialEq, Default)]
pub struct Matrix {
    rows: usize,
    columns: usize,
    values: Vec<f32>,
}

impl Matrix {

    /// A matrix of the specified extents, filled with zeroes.
    pub fn new(rows: usize, columns: usize) -> Self {
        Self { rows, columns, values: vec![0.0; rows * columns] }
    }

    /// Fill a matrix row by row from a flat sequence.
    /// Fails if the sequence does not have exactly `rows * columns` values.
    pub fn from_values(rows: usize, columns: usize, values: Vec<f32>) -> Result<Self> {
        if values.len() != rows * columns {
            return Err(Error::shape(format!(
                "{} values cannot fill a {}x{} matrix",
                values.len(), rows, columns
            )));
        }

        Ok(Self { rows, columns, values })
    }

    /// Build a matrix from nested rows. Fails for ragged rows.
    pub fn from_rows<R: AsRef<[f32]>>(rows: &[R]) -> Result<Self> {
        let columns = rows.first().map_or(0, |row| row.as_ref().len());
        let mut values = Vec::with_capacity(rows.len() * columns);

        for row in rows {
            let row = row.as_ref();
            if row.len() != columns {
                return Err(Error::shape("rows of different lengths"));
            }

            values.extend_from_slice(row);
        }

        Ok(Self { rows: rows.len(), columns, values })
    }

    /// Number of rows (height).
    #[inline] pub fn rows(&self) -> usize { self.rows }

    /// Number of columns (width).
    #[inline] pub fn columns(&self) -> usize { self.columns }

    /// Width and height of this matrix.
    #[inline] pub fn size(&self) -> Vec2<usize> { Vec2(self.columns, self.rows) }

    /// Whether this matrix has no values at all.
    #[inline] pub fn is_empty(&self) -> bool { self.values.is_empty() }

    /// All values, row after row.
    #[inline] pub fn values(&self) -> &[f32] { &self.values }

    #[inline]
    fn index(&self, row: usize, column: usize) -> Result<usize> {
        if row >= self.rows || column >= self.columns {
            return Err(Error::out_of_range(format!(
                "({}, {}) is outside of a {}x{} matrix",
                row, column, self.rows, self.columns
            )));
        }

        Ok(row * self.columns + column)
    }

    /// The value at the specified position.
    #[inline]
    pub fn get(&self, row: usize, column: usize) -> Result<f32> {
        Ok(self.values[self.index(row, column)?])
    }

    /// Replace the value at the specified position.
    #[inline]
    pub fn set(&mut self, row: usize, column: usize, value: f32) -> UnitResult {
        let index = self.index(row, column)?;
        self.values[index] = value;
        Ok(())
    }

    /// Apply a function to each value, keeping the extents.
    pub fn map(&self, mut map: impl FnMut(f32) -> f32) -> Self {
        Self {
            rows: self.rows,
            columns: self.columns,
            values: self.values.iter().map(|&value| map(value)).collect()
        }
    }

    /// Square root of the sum of all squared values.
    pub fn l2_norm(&self) -> f64 {
        self.values.iter()
            .map(|&value| f64::from(value) * f64::from(value))
            .sum::<f64>().sqrt()
    }

    /// The largest absolute difference of two values at the same position.
    /// Fails if the extents of both matrices differ.
    pub fn max_abs_difference(&self, other: &Matrix) -> Result<f32> {
        if self.size() != other.size() {
            return Err(Error::shape("cannot compare matrices of different extents"));
        }

        Ok(self.values.iter().zip(&other.values)
            .map(|(a, b)| (a - b).abs())
            .fold(0.0, f32::max))
    }

    /// Write the row count, the column count and all values.
    pub fn write(&self, write: &mut impl Write) -> UnitResult {
        usize_to_u32(self.rows, "too many rows")?.write(write)?;
        usize_to_u32(self.columns, "too many columns")?.write(write)?;
        f32::write_slice(write, &self.values)
    }

    /// Read a matrix that was written with `write`.
    pub fn read(read: &mut impl Read) -> Result<Self> {
        let rows = u32_to_usize(u32::read(read)?, "row count")?;
        let columns = u32_to_usize(u32::read(read)?, "column count")?;
        let count = rows.checked_mul(columns).ok_or_else(|| Error::invalid("matrix size"))?;

        let values = f32::read_vec(read, count, SOFT_MAX_ELEMENTS, None)?;
        Self::from_values(rows, columns, values)
    }
}
