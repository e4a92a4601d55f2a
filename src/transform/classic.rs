
//! The classic Haar transformation of a 2x2 block.

use super::*;


/// Scaled hadamard transformation. The inverse is exact for all real inputs,
/// up to floating point rounding.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HaarClassic;

/// Transform without any mode tag. Shared with the adaptive variant.
#[inline]
pub(crate) fn forward([x00, x01, x10, x11]: Block) -> Coefficients {
    Coefficients {
        average:    (x00 + x01 + x10 + x11) / 4.0,
        vertical:   (x00 - x01 + x10 - x11) / 4.0,
        horizontal: (x00 + x01 - x10 - x11) / 4.0,
        diagonal:   (x00 - x01 - x10 + x11) / 4.0,
        mode: None,
    }
}

/// Restore a block, ignoring the mode tag. Shared with the adaptive variant.
#[inline]
pub(crate) fn inverse(coefficients: Coefficients) -> Block {
    let Coefficients { average: a, vertical: v, horizontal: h, diagonal: d, .. } = coefficients;
    [
        a + v + h + d,
        a - v + h - d,
        a + v - h - d,
        a - v - h + d,
    ]
}

impl Wavelet2DTransformation for HaarClassic {
    fn caption(&self) -> &'static str { "haar" }
    fn is_adaptive(&self) -> bool { false }

    fn forward(&self, block: Block) -> Coefficients {
        self::forward(block)
    }

    fn inverse(&self, coefficients: Coefficients) -> Result<Block> {
        if let Some(mode) = coefficients.mode {
            return Err(Error::mode_tag(format!("classic haar has no mode {}", mode)));
        }

        Ok(self::inverse(coefficients))
    }
}
