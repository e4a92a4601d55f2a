
//! Block transformations that turn a 2x2 pixel neighbourhood
//! into one average and three detail coefficients, and back.

mod classic;
mod adaptive;

pub use self::classic::HaarClassic;
pub use self::adaptive::{HaarAdaptive, AdaptiveMode};

use crate::error::{Error, Result};


/// A 2x2 pixel neighbourhood `[x00, x01, x10, x11]`,
/// where the first index is the row and the second index the column.
pub type Block = [f32; 4];

/// The result of transforming a single block.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Coefficients {
    pub average: f32,
    pub vertical: f32,
    pub horizontal: f32,
    pub diagonal: f32,

    /// Present only for adaptive transformations.
    /// Identifies the variant that produced the other coefficients.
    pub mode: Option<u8>,
}

impl Coefficients {

    /// Sum of the squares of the three detail coefficients.
    #[inline]
    pub fn detail_energy(&self) -> f32 {
        self.vertical * self.vertical
            + self.horizontal * self.horizontal
            + self.diagonal * self.diagonal
    }
}


/// Forward and inverse transformation of a single 2x2 block.
pub trait Wavelet2DTransformation: Sync {

    /// Short name, used in diagnostics.
    fn caption(&self) -> &'static str;

    /// Whether `forward` produces a mode tag that `inverse` requires.
    fn is_adaptive(&self) -> bool;

    /// Transform the pixels of one block into coefficients.
    fn forward(&self, block: Block) -> Coefficients;

    /// Restore the pixels of one block.
    /// Fails with `InvalidModeTag` if the mode does not belong to this transformation.
    fn inverse(&self, coefficients: Coefficients) -> Result<Block>;
}

impl<T: Wavelet2DTransformation + ?Sized> Wavelet2DTransformation for &T {
    fn caption(&self) -> &'static str { (**self).caption() }
    fn is_adaptive(&self) -> bool { (**self).is_adaptive() }
    fn forward(&self, block: Block) -> Coefficients { (**self).forward(block) }
    fn inverse(&self, coefficients: Coefficients) -> Result<Block> { (**self).inverse(coefficients) }
}


/// Selects one of the block transformations of this crate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Wavelet {

    /// The fixed scaled hadamard transformation.
    Classic,

    /// Chooses the variant with the least detail energy for each block.
    Adaptive,
}

impl Wavelet {

    /// The transformation this selector stands for.
    pub fn transformation(self) -> &'static dyn Wavelet2DTransformation {
        match self {
            Wavelet::Classic => &HaarClassic,
            Wavelet::Adaptive => &HaarAdaptive,
        }
    }
}

impl Default for Wavelet {
    fn default() -> Self { Wavelet::Classic }
}


/// Convert a mode tag stored in a floating point mode map back to an integer.
/// Fractional, negative or huge values are not valid tags.
pub(crate) fn mode_from_value(value: f32) -> Result<u8> {
    if value.is_finite() && value.fract() == 0.0 && value >= 0.0 && value <= f32::from(u8::MAX) {
        Ok(value as u8)
    }
    else {
        Err(Error::mode_tag(format!("{} is not an integer tag", value)))
    }
}
