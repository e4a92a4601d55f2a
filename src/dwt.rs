
//! Multi-level decomposition of a channel into sub-bands, and reconstruction.
//! Each level splits the input into non-overlapping 2x2 blocks
//! and applies a `Wavelet2DTransformation` to every block.

use std::borrow::Cow;

use crate::error::{Error, Location, Result, UnitResult};
use crate::math::Vec2;
use crate::matrix::Matrix;
use crate::options::AbortFlag;
use crate::transform::{Coefficients, Wavelet2DTransformation, mode_from_value};


/// The deepest supported pyramid. Every level halves the extents,
/// so a matrix with `u32` extents has no complete block below this depth.
pub const MAX_DEPTH: usize = 32;

/// Names the matrices of a single decomposition level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SubBand {
    Average,
    Vertical,
    Horizontal,
    Diagonal,
    ModeMap,
}

/// The average sub-band is either a plain matrix
/// or was decomposed once more, forming a pyramid.
#[derive(Debug, Clone, PartialEq)]
pub enum Average {
    Terminal(Matrix),
    Nested(Box<DwtCoefficients>),
}

/// The result of decomposing a matrix.
/// All detail matrices and the mode map share the same extents,
/// which are half the extents of the decomposed matrix.
#[derive(Debug, Clone, PartialEq)]
pub struct DwtCoefficients {
    pub average: Average,
    pub vertical: Matrix,
    pub horizontal: Matrix,
    pub diagonal: Matrix,

    /// One mode tag per block. Present if and only if the transformation is adaptive.
    pub mode_map: Option<Matrix>,

    /// Only computed if requested when decomposing.
    pub norms: Option<Norms>,
}

/// L2 magnitudes of the sub-bands of one level.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Norms {
    pub average: f64,
    pub vertical: f64,
    pub horizontal: f64,
    pub diagonal: f64,
}

impl Norms {

    /// Measure the four matrices of a level.
    pub fn of(average: &Matrix, vertical: &Matrix, horizontal: &Matrix, diagonal: &Matrix) -> Self {
        Norms {
            average: average.l2_norm(),
            vertical: vertical.l2_norm(),
            horizontal: horizontal.l2_norm(),
            diagonal: diagonal.l2_norm(),
        }
    }

    /// Sum of the vertical, horizontal and diagonal norms.
    pub fn detail_sum(&self) -> f64 {
        self.vertical + self.horizontal + self.diagonal
    }
}

impl DwtCoefficients {

    /// Extents shared by the detail matrices of this level.
    pub fn band_size(&self) -> Vec2<usize> {
        self.vertical.size()
    }

    /// Number of levels in this pyramid, at least one.
    pub fn depth(&self) -> usize {
        match &self.average {
            Average::Terminal(_) => 1,
            Average::Nested(nested) => 1 + nested.depth(),
        }
    }

    /// The average matrix of the coarsest level.
    pub fn terminal_average(&self) -> &Matrix {
        match &self.average {
            Average::Terminal(average) => average,
            Average::Nested(nested) => nested.terminal_average(),
        }
    }

    /// Check that the matrices of this level agree with each other.
    /// Nested levels are not inspected.
    pub fn validate(&self, adaptive: bool) -> UnitResult {
        let size = self.band_size();

        if self.horizontal.size() != size || self.diagonal.size() != size {
            return Err(Error::shape("detail sub-bands have different extents"));
        }

        if let Average::Terminal(average) = &self.average {
            if average.size() != size {
                return Err(Error::shape("average and detail sub-bands have different extents"));
            }
        }

        match (&self.mode_map, adaptive) {
            (Some(_), false) => Err(Error::shape("mode map given to a transformation without modes")),
            (None, true) => Err(Error::shape("adaptive transformation requires a mode map")),
            (Some(map), true) if map.size() != size => Err(Error::shape("mode map and sub-bands have different extents")),
            _ => Ok(()),
        }
    }
}


/// The wavelet engine. Decomposes and reconstructs matrices
/// using the block transformation it owns.
#[derive(Debug, Clone, Default)]
pub struct Dwt<T> {
    transformation: T,
    compute_norms: bool,
    abort: Option<AbortFlag>,
}

impl<T: Wavelet2DTransformation> Dwt<T> {

    /// An engine that does not compute norms and cannot be cancelled.
    pub fn new(transformation: T) -> Self {
        Self { transformation, compute_norms: false, abort: None }
    }

    /// Compute the norms of each level while decomposing.
    pub fn with_norms(self, compute_norms: bool) -> Self {
        Self { compute_norms, ..self }
    }

    /// Check this flag before each level.
    pub fn with_abort_flag(self, abort: Option<AbortFlag>) -> Self {
        Self { abort, ..self }
    }

    /// The block transformation used by this engine.
    pub fn transformation(&self) -> &T {
        &self.transformation
    }

    fn check_abort(&self) -> UnitResult {
        match &self.abort {
            Some(flag) => flag.check(),
            None => Ok(()),
        }
    }

    /// Split the matrix into four sub-bands, `levels` times.
    /// Odd extents of the input are truncated, dropping the last row or column.
    /// Every average that is decomposed again must have even extents.
    pub fn decompose(&self, matrix: &Matrix, levels: usize) -> Result<DwtCoefficients> {
        if levels == 0 {
            return Err(Error::shape("at least one decomposition level is required"));
        }

        if levels > MAX_DEPTH {
            return Err(Error::shape(format!("at most {} decomposition levels are supported", MAX_DEPTH)));
        }

        self.decompose_level(matrix, levels, 1)
    }

    fn decompose_level(&self, matrix: &Matrix, remaining: usize, level: usize) -> Result<DwtCoefficients> {
        let location = Location { channel: None, level, band: None };
        self.check_abort()?;

        let size = matrix.size() / Vec2(2, 2);
        if size.area() == 0 {
            return Err(Error::shape(format!(
                "a {}x{} matrix has no complete 2x2 block",
                matrix.rows(), matrix.columns()
            )).at(location));
        }

        let adaptive = self.transformation.is_adaptive();
        let input = matrix.values();
        let input_width = matrix.columns();

        let mut average = Vec::with_capacity(size.area());
        let mut vertical = Vec::with_capacity(size.area());
        let mut horizontal = Vec::with_capacity(size.area());
        let mut diagonal = Vec::with_capacity(size.area());
        let mut modes = Vec::with_capacity(if adaptive { size.area() } else { 0 });

        for row in 0 .. size.height() {
            let top = 2 * row * input_width;
            let bottom = top + input_width;

            for column in 0 .. size.width() {
                let left = 2 * column;

                let coefficients = self.transformation.forward([
                    input[top + left], input[top + left + 1],
                    input[bottom + left], input[bottom + left + 1],
                ]);

                average.push(coefficients.average);
                vertical.push(coefficients.vertical);
                horizontal.push(coefficients.horizontal);
                diagonal.push(coefficients.diagonal);

                if adaptive {
                    modes.push(coefficients.mode.map_or(f32::NAN, f32::from));
                }
            }
        }

        let (rows, columns) = (size.height(), size.width());
        let average = Matrix::from_values(rows, columns, average)?;
        let vertical = Matrix::from_values(rows, columns, vertical)?;
        let horizontal = Matrix::from_values(rows, columns, horizontal)?;
        let diagonal = Matrix::from_values(rows, columns, diagonal)?;

        let mode_map = if adaptive { Some(Matrix::from_values(rows, columns, modes)?) } else { None };

        let norms = if self.compute_norms {
            let norms = Norms::of(&average, &vertical, &horizontal, &diagonal);

            log::debug!(
                "{} level {}: vertical {:.3}, horizontal {:.3}, diagonal {:.3}, average {:.3}, detail sum {:.3}",
                self.transformation.caption(), level,
                norms.vertical, norms.horizontal, norms.diagonal, norms.average, norms.detail_sum()
            );

            Some(norms)
        }
        else { None };

        let average = if remaining > 1 {
            if rows % 2 != 0 || columns % 2 != 0 {
                return Err(Error::shape(format!(
                    "a {}x{} average cannot be decomposed again without losing data",
                    rows, columns
                )).at(Location { band: Some(SubBand::Average), .. location }));
            }

            Average::Nested(Box::new(self.decompose_level(&average, remaining - 1, level + 1)?))
        }
        else {
            Average::Terminal(average)
        };

        Ok(DwtCoefficients { average, vertical, horizontal, diagonal, mode_map, norms })
    }

    /// Rebuild the matrix from all levels of the coefficients.
    /// The result has exactly twice the extents of the outermost sub-bands.
    pub fn reconstruct(&self, coefficients: &DwtCoefficients) -> Result<Matrix> {
        self.reconstruct_level(coefficients, 1)
    }

    fn reconstruct_level(&self, coefficients: &DwtCoefficients, level: usize) -> Result<Matrix> {
        let location = Location { channel: None, level, band: None };
        self.check_abort()?;

        if level > MAX_DEPTH {
            return Err(Error::shape(format!("pyramid has more than {} levels", MAX_DEPTH)).at(location));
        }

        let average: Cow<'_, Matrix> = match &coefficients.average {
            Average::Terminal(average) => Cow::Borrowed(average),
            Average::Nested(nested) => Cow::Owned(self.reconstruct_level(nested, level + 1)?),
        };

        let size = coefficients.band_size();
        if average.size() != size {
            return Err(Error::shape(format!(
                "average has extents {:?} but details have {:?}", average.size(), size
            )).at(Location { band: Some(SubBand::Average), .. location }));
        }

        coefficients.validate(self.transformation.is_adaptive())
            .map_err(|error| error.at(location))?;

        let output_width = 2 * size.width();
        let mut output = vec![0.0; 4 * size.area()];

        let average = average.values();
        let vertical = coefficients.vertical.values();
        let horizontal = coefficients.horizontal.values();
        let diagonal = coefficients.diagonal.values();
        let modes = coefficients.mode_map.as_ref().map(Matrix::values);

        for row in 0 .. size.height() {
            let top = 2 * row * output_width;
            let bottom = top + output_width;

            for column in 0 .. size.width() {
                let index = row * size.width() + column;

                let mode = match modes {
                    Some(modes) => Some(mode_from_value(modes[index])
                        .map_err(|error| error.at(Location { band: Some(SubBand::ModeMap), .. location }))?),
                    None => None,
                };

                let block = self.transformation.inverse(Coefficients {
                    average: average[index],
                    vertical: vertical[index],
                    horizontal: horizontal[index],
                    diagonal: diagonal[index],
                    mode,
                }).map_err(|error| error.at(Location { band: Some(SubBand::ModeMap), .. location }))?;

                let left = 2 * column;
                output[top + left] = block[0];
                output[top + left + 1] = block[1];
                output[bottom + left] = block[2];
                output[bottom + left + 1] = block[3];
            }
        }

        Matrix::from_values(2 * size.height(), output_width, output)
    }

    /// Norms of the outermost level. The average norm of a nested pyramid
    /// is measured on its reconstructed average.
    pub fn norms(&self, coefficients: &DwtCoefficients) -> Result<Norms> {
        if let Some(norms) = coefficients.norms {
            return Ok(norms);
        }

        let average = match &coefficients.average {
            Average::Terminal(average) => Cow::Borrowed(average),
            Average::Nested(nested) => Cow::Owned(self.reconstruct(nested)?),
        };

        Ok(Norms::of(&average, &coefficients.vertical, &coefficients.horizontal, &coefficients.diagonal))
    }
}


#[cfg(test)]
mod test {
    use super::*;
    use crate::transform::{HaarClassic, HaarAdaptive, AdaptiveMode};

    fn ramp(rows: usize, columns: usize) -> Matrix {
        let values = (0 .. rows * columns).map(|index| (index * 7 % 31) as f32 - 3.5).collect();
        Matrix::from_values(rows, columns, values).unwrap()
    }

    #[test]
    fn single_level_round_trip(){
        let matrix = ramp(6, 8);
        let dwt = Dwt::new(HaarClassic);

        let coefficients = dwt.decompose(&matrix, 1).unwrap();
        assert_eq!(coefficients.band_size(), Vec2(4, 3));
        assert_eq!(coefficients.depth(), 1);
        assert!(coefficients.mode_map.is_none());

        let reconstructed = dwt.reconstruct(&coefficients).unwrap();
        assert!(reconstructed.max_abs_difference(&matrix).unwrap() < 1e-4);
    }

    #[test]
    fn pyramid_round_trip(){
        let matrix = ramp(16, 8);

        for levels in 1 ..= 3 {
            let dwt = Dwt::new(HaarClassic);
            let coefficients = dwt.decompose(&matrix, levels).unwrap();
            assert_eq!(coefficients.depth(), levels);

            let reconstructed = dwt.reconstruct(&coefficients).unwrap();
            assert!(reconstructed.max_abs_difference(&matrix).unwrap() < 1e-3);
        }
    }

    #[test]
    fn adaptive_pyramid_round_trip(){
        let matrix = ramp(8, 8);
        let dwt = Dwt::new(HaarAdaptive);

        let coefficients = dwt.decompose(&matrix, 2).unwrap();
        let map = coefficients.mode_map.as_ref().unwrap();
        assert_eq!(map.size(), coefficients.band_size());
        assert!(map.values().iter().all(|&tag| tag >= 0.0 && tag < f32::from(AdaptiveMode::COUNT)));

        let reconstructed = dwt.reconstruct(&coefficients).unwrap();
        assert!(reconstructed.max_abs_difference(&matrix).unwrap() < 1e-3);
    }

    #[test]
    fn odd_extents_are_truncated(){
        let matrix = ramp(5, 7);
        let dwt = Dwt::new(HaarClassic);

        let coefficients = dwt.decompose(&matrix, 1).unwrap();
        assert_eq!(coefficients.band_size(), Vec2(3, 2));

        let reconstructed = dwt.reconstruct(&coefficients).unwrap();
        assert_eq!(reconstructed.size(), Vec2(6, 4));

        for row in 0 .. 4 {
            for column in 0 .. 6 {
                let difference = reconstructed.get(row, column).unwrap() - matrix.get(row, column).unwrap();
                assert!(difference.abs() < 1e-4);
            }
        }
    }

    #[test]
    fn odd_nested_average_is_rejected(){
        let dwt = Dwt::new(HaarClassic);
        let error = dwt.decompose(&ramp(6, 6), 2).unwrap_err();
        assert!(matches!(error.cause(), Error::ShapeMismatch(_)));
        assert_eq!(error.location().unwrap().level, 1);
    }

    #[test]
    fn too_small(){
        let dwt = Dwt::new(HaarClassic);
        assert!(dwt.decompose(&ramp(1, 8), 1).is_err());
        assert!(dwt.decompose(&ramp(4, 4), 0).is_err());
    }

    #[test]
    fn mismatched_bands(){
        let dwt = Dwt::new(HaarClassic);
        let mut coefficients = dwt.decompose(&ramp(4, 4), 1).unwrap();
        coefficients.diagonal = Matrix::new(1, 2);

        let error = dwt.reconstruct(&coefficients).unwrap_err();
        assert!(matches!(error.cause(), Error::ShapeMismatch(_)));
    }

    #[test]
    fn corrupt_mode_map(){
        let dwt = Dwt::new(HaarAdaptive);
        let mut coefficients = dwt.decompose(&ramp(4, 4), 1).unwrap();
        coefficients.mode_map.as_mut().unwrap().set(0, 1, 9.0).unwrap();

        let error = dwt.reconstruct(&coefficients).unwrap_err();
        assert!(matches!(error.cause(), Error::InvalidModeTag(_)));
        assert_eq!(error.location().unwrap().band, Some(SubBand::ModeMap));

        coefficients.mode_map = None;
        let error = dwt.reconstruct(&coefficients).unwrap_err();
        assert!(matches!(error.cause(), Error::ShapeMismatch(_)));

        let classic = Dwt::new(HaarClassic).decompose(&ramp(4, 4), 1).unwrap();
        let error = Dwt::new(HaarAdaptive).reconstruct(&classic).unwrap_err();
        assert!(matches!(error.cause(), Error::ShapeMismatch(_)));
        assert_eq!(error.location().unwrap().level, 1);
    }

    #[test]
    fn depth_is_limited(){
        let dwt = Dwt::new(HaarClassic);
        assert!(matches!(dwt.decompose(&ramp(4, 4), MAX_DEPTH + 1), Err(Error::ShapeMismatch(_))));

        // a hand built pyramid of empty levels
        let empty = DwtCoefficients {
            average: Average::Terminal(Matrix::new(0, 0)),
            vertical: Matrix::new(0, 0),
            horizontal: Matrix::new(0, 0),
            diagonal: Matrix::new(0, 0),
            mode_map: None,
            norms: None,
        };

        let mut coefficients = empty.clone();
        for _ in 1 .. MAX_DEPTH {
            coefficients = DwtCoefficients { average: Average::Nested(Box::new(coefficients)), .. empty.clone() };
        }

        assert_eq!(coefficients.depth(), MAX_DEPTH);
        assert_eq!(dwt.reconstruct(&coefficients).unwrap().size(), Vec2(0, 0));

        let coefficients = DwtCoefficients { average: Average::Nested(Box::new(coefficients)), .. empty };
        let error = dwt.reconstruct(&coefficients).unwrap_err();
        assert!(matches!(error.cause(), Error::ShapeMismatch(_)));
        assert_eq!(error.location().unwrap().level, MAX_DEPTH + 1);
    }

    #[test]
    fn norms(){
        let dwt = Dwt::new(HaarClassic).with_norms(true);
        let coefficients = dwt.decompose(&ramp(8, 8), 2).unwrap();

        let eager = coefficients.norms.unwrap();
        let mut lazy_coefficients = coefficients.clone();
        lazy_coefficients.norms = None;
        let lazy = Dwt::new(HaarClassic).norms(&lazy_coefficients).unwrap();

        assert!((eager.average - lazy.average).abs() < 1e-3);
        assert!((eager.detail_sum() - lazy.detail_sum()).abs() < 1e-6);
    }

    #[test]
    fn aborted(){
        let flag = AbortFlag::default();
        flag.abort();

        let dwt = Dwt::new(HaarClassic).with_abort_flag(Some(flag));
        assert!(matches!(dwt.decompose(&ramp(4, 4), 1), Err(Error::Aborted)));
    }
}
