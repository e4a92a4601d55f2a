
//! Haar transformation that picks, for each block,
//! the variant with the least detail energy.

use super::*;
use super::classic;
use std::convert::TryFrom;


/// Tries every `AdaptiveMode` on a block and keeps the one
/// whose detail coefficients have the smallest sum of squares.
/// Ties are resolved towards the mode with the smaller tag.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HaarAdaptive;

/// The closed set of block variants of `HaarAdaptive`.
/// All variants share the same average coefficient,
/// so a pyramid built from them stays a pyramid of block means.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AdaptiveMode {

    /// The classic scaled hadamard details.
    Hadamard,

    /// Details are the quarter differences of the other three pixels to the top left pixel.
    FromTopLeft,

    /// Details are the quarter differences of the other three pixels to the top right pixel.
    FromTopRight,

    /// Details are the quarter differences of the other three pixels to the bottom left pixel.
    FromBottomLeft,

    /// Details are the quarter differences of the other three pixels to the bottom right pixel.
    FromBottomRight,
}

impl AdaptiveMode {

    /// Number of distinct tags. Valid tags are `0 .. COUNT`.
    pub const COUNT: u8 = 5;

    /// All modes, in the order of their tags.
    pub const ALL: [AdaptiveMode; 5] = [
        AdaptiveMode::Hadamard,
        AdaptiveMode::FromTopLeft, AdaptiveMode::FromTopRight,
        AdaptiveMode::FromBottomLeft, AdaptiveMode::FromBottomRight,
    ];

    /// The integer stored in the mode map.
    pub fn tag(self) -> u8 {
        match self {
            AdaptiveMode::Hadamard => 0,
            AdaptiveMode::FromTopLeft => 1,
            AdaptiveMode::FromTopRight => 2,
            AdaptiveMode::FromBottomLeft => 3,
            AdaptiveMode::FromBottomRight => 4,
        }
    }

    /// Index of the reference pixel inside the block, if any.
    fn reference(self) -> Option<usize> {
        match self {
            AdaptiveMode::Hadamard => None,
            AdaptiveMode::FromTopLeft => Some(0),
            AdaptiveMode::FromTopRight => Some(1),
            AdaptiveMode::FromBottomLeft => Some(2),
            AdaptiveMode::FromBottomRight => Some(3),
        }
    }

    fn forward(self, block: Block) -> Coefficients {
        let mut coefficients = match self.reference() {
            None => classic::forward(block),

            Some(corner) => {
                let reference = block[corner];
                let mut details = block.iter().enumerate()
                    .filter(|&(index, _)| index != corner)
                    .map(|(_, &pixel)| (pixel - reference) / 4.0);

                // the filter leaves exactly three values
                Coefficients {
                    average: block.iter().sum::<f32>() / 4.0,
                    vertical: details.next().unwrap_or_default(),
                    horizontal: details.next().unwrap_or_default(),
                    diagonal: details.next().unwrap_or_default(),
                    mode: None,
                }
            }
        };

        coefficients.mode = Some(self.tag());
        coefficients
    }

    fn inverse(self, coefficients: Coefficients) -> Block {
        match self.reference() {
            None => classic::inverse(coefficients),

            Some(corner) => {
                let details = [coefficients.vertical, coefficients.horizontal, coefficients.diagonal];
                let reference = coefficients.average - details.iter().sum::<f32>();

                let mut block = [reference; 4];
                let others = (0..4).filter(|&index| index != corner);

                for (index, detail) in others.zip(details.iter()) {
                    block[index] = reference + 4.0 * detail;
                }

                block
            }
        }
    }
}

impl TryFrom<u8> for AdaptiveMode {
    type Error = Error;

    fn try_from(tag: u8) -> Result<Self> {
        match AdaptiveMode::ALL.get(usize::from(tag)) {
            Some(&mode) => Ok(mode),
            None => Err(Error::mode_tag(format!(
                "adaptive haar tag {} is not below {}", tag, AdaptiveMode::COUNT
            ))),
        }
    }
}

impl Wavelet2DTransformation for HaarAdaptive {
    fn caption(&self) -> &'static str { "adaptive-haar" }
    fn is_adaptive(&self) -> bool { true }

    fn forward(&self, block: Block) -> Coefficients {
        let mut best = AdaptiveMode::Hadamard.forward(block);

        for mode in &AdaptiveMode::ALL[1..] {
            let candidate = mode.forward(block);

            // strict comparison keeps the smaller tag on ties
            if candidate.detail_energy() < best.detail_energy() {
                best = candidate;
            }
        }

        best
    }

    fn inverse(&self, coefficients: Coefficients) -> Result<Block> {
        let tag = coefficients.mode
            .ok_or_else(|| Error::mode_tag("adaptive haar requires a mode tag"))?;

        Ok(AdaptiveMode::try_from(tag)?.inverse(coefficients))
    }
}
