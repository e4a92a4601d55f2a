
//! Scalar quantization of sub-band coefficients to a small integer alphabet.

use std::convert::TryFrom;

use crate::compression::huffman::{FreqStatistics, Symbol};
use crate::error::{Error, Result};
use crate::matrix::Matrix;


/// Truncating uniform quantizer over `-shift .. shift`.
/// The step width is the integer quotient of the range and the level count,
/// and coefficients are truncated, not rounded, to their step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Quantizer {
    shift: i32,
    levels: u32,
    max_value: i32,
    divider: i32,
}

impl Quantizer {

    /// Fails with `UnquantizableInput` for an empty alphabet,
    /// or if there are more levels than integers in the range.
    pub fn new(shift: u32, levels: u32) -> Result<Self> {
        if levels == 0 {
            return Err(Error::unquantizable("the alphabet must have at least one level"));
        }

        if levels > u32::from(Symbol::MAX) + 1 {
            return Err(Error::unquantizable(format!("{} levels exceed the symbol range", levels)));
        }

        let max_value = shift.checked_mul(2)
            .and_then(|max| i32::try_from(max).ok())
            .ok_or_else(|| Error::unquantizable(format!("shift {} is too large", shift)))?;

        // levels fits into i32 because it is at most 65536
        let divider = max_value / levels as i32;
        if divider == 0 {
            return Err(Error::unquantizable(format!(
                "{} levels do not fit into the range of {}", levels, max_value
            )));
        }

        Ok(Quantizer { shift: max_value / 2, levels, max_value, divider })
    }

    /// Number of symbols of the alphabet.
    pub fn levels(&self) -> u32 { self.levels }

    /// The width of a single quantization step.
    pub fn divider(&self) -> i32 { self.divider }

    /// The offset that is added before quantizing.
    pub fn shift(&self) -> i32 { self.shift }

    /// Map a coefficient to a symbol in `0 .. levels`.
    /// Coefficients outside of `-shift .. shift` are clamped silently.
    #[inline]
    pub fn quantize(&self, coefficient: f32) -> Symbol {
        let shifted = coefficient + self.shift as f32;

        let clamped = if shifted < 0.0 { 0.0 }
            else if shifted >= self.max_value as f32 { (self.max_value - 1) as f32 }
            else { shifted };

        // also maps `NaN` to zero
        let step = (clamped / self.divider as f32) as u32;
        step.min(self.levels - 1) as Symbol
    }

    /// The lower bound of the step of a symbol, moved back by the shift.
    #[inline]
    pub fn dequantize(&self, symbol: Symbol) -> f32 {
        (i32::from(symbol) * self.divider - self.shift) as f32
    }

    /// Quantize every value of the matrix, row after row,
    /// and count how often each symbol occurs.
    pub fn quantize_band(&self, matrix: &Matrix) -> Result<(Vec<Symbol>, FreqStatistics)> {
        let mut statistics = FreqStatistics::new(self.levels as usize);
        let mut symbols = Vec::with_capacity(matrix.values().len());

        for &value in matrix.values() {
            let symbol = self.quantize(value);
            statistics.push(symbol)?;
            symbols.push(symbol);
        }

        Ok((symbols, statistics))
    }

    /// Restore a matrix of the specified extents from its symbols.
    pub fn dequantize_band(&self, rows: usize, columns: usize, symbols: &[Symbol]) -> Result<Matrix> {
        let values = symbols.iter().map(|&symbol| self.dequantize(symbol)).collect();
        Matrix::from_values(rows, columns, values)
    }
}
