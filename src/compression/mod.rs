
//! Quantization and entropy coding of decomposed channels.
//! Only the detail sub-bands are quantized and huffman coded.
//! The terminal average and the mode maps are kept at full precision.

pub mod bits;
pub mod huffman;
pub mod quantization;

use crate::dwt::{Average, DwtCoefficients, SubBand, MAX_DEPTH};
use crate::error::{Error, Location, Result, UnitResult, u32_to_usize, u64_to_usize, usize_to_u32};
use crate::io::{Data, Read, Write, SOFT_MAX_ELEMENTS};
use crate::matrix::Matrix;
use crate::options::{AbortFlag, CodecOptions};

use self::bits::Bits;
use self::huffman::HuffmanTree;
use self::quantization::Quantizer;


/// The huffman coded symbols of one sub-band, together with the persisted code tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedBand {
    rows: usize,
    columns: usize,
    tree: Vec<u8>,
    bits: Bits,
}

/// The encoded form of `DwtCoefficients`, mirroring its pyramid.
#[derive(Debug, Clone, PartialEq)]
pub struct EncodedCoefficients {
    pub average: EncodedAverage,
    pub vertical: EncodedBand,
    pub horizontal: EncodedBand,
    pub diagonal: EncodedBand,
    pub mode_map: Option<Matrix>,
}

/// The terminal average is stored without quantization.
#[derive(Debug, Clone, PartialEq)]
pub enum EncodedAverage {
    Terminal(Matrix),
    Nested(Box<EncodedCoefficients>),
}


impl EncodedBand {

    /// Number of rows of the sub-band.
    pub fn rows(&self) -> usize { self.rows }

    /// Number of columns of the sub-band.
    pub fn columns(&self) -> usize { self.columns }

    /// The persisted huffman tree.
    pub fn tree(&self) -> &[u8] { &self.tree }

    /// The concatenated codes of all symbols, row after row.
    pub fn bits(&self) -> &Bits { &self.bits }

    /// Write the extents, the tree and the packed bits.
    pub fn write(&self, write: &mut impl Write) -> UnitResult {
        usize_to_u32(self.rows, "too many rows")?.write(write)?;
        usize_to_u32(self.columns, "too many columns")?.write(write)?;
        u8::write_u32_sized_slice(write, &self.tree)?;
        (self.bits.len() as u64).write(write)?;
        u8::write_slice(write, self.bits.as_bytes())
    }

    /// Read a band that was written with `write`.
    /// Does not check whether the tree can be parsed.
    pub fn read(read: &mut impl Read) -> Result<Self> {
        let rows = u32_to_usize(u32::read(read)?, "row count")?;
        let columns = u32_to_usize(u32::read(read)?, "column count")?;
        let tree = u8::read_u32_sized_vec(read, SOFT_MAX_ELEMENTS, None)?;

        let bit_count = u64_to_usize(u64::read(read)?, "bit count")?;
        let byte_count = bit_count / 8 + usize::from(bit_count % 8 != 0);
        let bytes = u8::read_vec(read, byte_count, SOFT_MAX_ELEMENTS, None)?;

        Ok(EncodedBand { rows, columns, tree, bits: Bits::from_bytes(bytes, bit_count)? })
    }
}

impl EncodedCoefficients {

    /// Number of levels in this pyramid, at least one.
    pub fn depth(&self) -> usize {
        match &self.average {
            EncodedAverage::Terminal(_) => 1,
            EncodedAverage::Nested(nested) => 1 + nested.depth(),
        }
    }

    /// Number of bits of all huffman coded bands of all levels.
    pub fn coded_bit_count(&self) -> usize {
        let own = self.vertical.bits.len() + self.horizontal.bits.len() + self.diagonal.bits.len();

        match &self.average {
            EncodedAverage::Terminal(_) => own,
            EncodedAverage::Nested(nested) => own + nested.coded_bit_count(),
        }
    }

    /// Write the depth, then the bands of each level, outermost first,
    /// then the terminal average.
    pub fn write(&self, write: &mut impl Write) -> UnitResult {
        usize_to_u32(self.depth(), "pyramid too deep")?.write(write)?;

        let mut level = self;
        loop {
            level.vertical.write(write)?;
            level.horizontal.write(write)?;
            level.diagonal.write(write)?;

            match &level.mode_map {
                Some(map) => { 1_u8.write(write)?; map.write(write)?; },
                None => 0_u8.write(write)?,
            }

            match &level.average {
                EncodedAverage::Nested(nested) => level = nested,
                EncodedAverage::Terminal(average) => return average.write(write),
            }
        }
    }

    /// Read coefficients that were written with `write`.
    pub fn read(read: &mut impl Read) -> Result<Self> {
        let depth = u32_to_usize(u32::read(read)?, "depth")?;
        if depth == 0 {
            return Err(Error::invalid("pyramid without levels"));
        }

        if depth > MAX_DEPTH {
            return Err(Error::invalid(format!("pyramid with {} levels, at most {} are supported", depth, MAX_DEPTH)));
        }

        let mut levels = Vec::with_capacity(depth);
        for _ in 0 .. depth {
            let vertical = EncodedBand::read(read)?;
            let horizontal = EncodedBand::read(read)?;
            let diagonal = EncodedBand::read(read)?;

            let mode_map = match u8::read(read)? {
                0 => None,
                1 => Some(Matrix::read(read)?),
                _ => return Err(Error::invalid("mode map flag")),
            };

            levels.push((vertical, horizontal, diagonal, mode_map));
        }

        // assemble the pyramid from the innermost level outwards
        let mut average = EncodedAverage::Terminal(Matrix::read(read)?);

        while let Some((vertical, horizontal, diagonal, mode_map)) = levels.pop() {
            let coefficients = EncodedCoefficients { average, vertical, horizontal, diagonal, mode_map };
            if levels.is_empty() { return Ok(coefficients); }

            average = EncodedAverage::Nested(Box::new(coefficients));
        }

        Err(Error::invalid("pyramid without levels"))
    }
}


/// Quantizes sub-bands and compresses their symbols with a huffman code, and back.
#[derive(Debug, Clone)]
pub struct Quantization {
    quantizer: Quantizer,
    abort: Option<AbortFlag>,
}

impl Quantization {

    /// A pipeline with an alphabet of `levels` symbols over `-shift .. shift`.
    pub fn new(shift: u32, levels: u32) -> Result<Self> {
        Ok(Self { quantizer: Quantizer::new(shift, levels)?, abort: None })
    }

    /// A pipeline with the quantizer and abort flag of the options.
    pub fn from_options(options: &CodecOptions) -> Result<Self> {
        Ok(Self { abort: options.abort.clone(), .. Self::new(options.shift, options.levels)? })
    }

    /// The scalar quantizer used for all bands.
    pub fn quantizer(&self) -> &Quantizer { &self.quantizer }

    fn check_abort(&self) -> UnitResult {
        match &self.abort {
            Some(flag) => flag.check(),
            None => Ok(()),
        }
    }

    /// Quantize the matrix and compress the symbols.
    pub fn encode_band(&self, band: &Matrix) -> Result<EncodedBand> {
        let (rows, columns) = (band.rows(), band.columns());

        if band.is_empty() {
            return Ok(EncodedBand { rows, columns, tree: Vec::new(), bits: Bits::new() });
        }

        let (symbols, statistics) = self.quantizer.quantize_band(band)?;
        let tree = statistics.build_tree()?;
        let bits = tree.code_table()?.encode(&symbols)?;

        log::debug!(
            "encoded {}x{} band with {} distinct symbols into {} bits",
            rows, columns, statistics.distinct(), bits.len()
        );

        Ok(EncodedBand { rows, columns, tree: tree.to_bytes()?, bits })
    }

    /// Parse the tree, decode the symbols and restore the quantized values.
    pub fn decode_band(&self, band: &EncodedBand) -> Result<Matrix> {
        let count = band.rows.checked_mul(band.columns)
            .ok_or_else(|| Error::invalid("band size"))?;

        if count == 0 {
            return Ok(Matrix::new(band.rows, band.columns));
        }

        let tree = HuffmanTree::from_bytes(&band.tree)?;
        if tree.alphabet_size() != self.quantizer.levels() as usize {
            return Err(Error::tree_corrupt(format!(
                "tree for {} symbols cannot decode {} levels",
                tree.alphabet_size(), self.quantizer.levels()
            )));
        }

        let symbols = tree.decode(&band.bits, count)?;
        self.quantizer.dequantize_band(band.rows, band.columns, &symbols)
    }

    /// Encode the detail bands of all levels.
    pub fn encode(&self, coefficients: &DwtCoefficients) -> Result<EncodedCoefficients> {
        self.encode_level(coefficients, 1)
    }

    fn encode_level(&self, coefficients: &DwtCoefficients, level: usize) -> Result<EncodedCoefficients> {
        if level > MAX_DEPTH {
            return Err(Error::shape(format!("pyramid has more than {} levels", MAX_DEPTH)));
        }

        let encode = |band: SubBand, matrix: &Matrix| {
            self.check_abort()?;
            self.encode_band(matrix).map_err(|error| error.at(Location { channel: None, level, band: Some(band) }))
        };

        let vertical = encode(SubBand::Vertical, &coefficients.vertical)?;
        let horizontal = encode(SubBand::Horizontal, &coefficients.horizontal)?;
        let diagonal = encode(SubBand::Diagonal, &coefficients.diagonal)?;

        let average = match &coefficients.average {
            Average::Terminal(average) => EncodedAverage::Terminal(average.clone()),
            Average::Nested(nested) => EncodedAverage::Nested(Box::new(self.encode_level(nested, level + 1)?)),
        };

        Ok(EncodedCoefficients {
            average, vertical, horizontal, diagonal,
            mode_map: coefficients.mode_map.clone(),
        })
    }

    /// Decode the detail bands of all levels.
    /// The result has no norms.
    pub fn decode(&self, encoded: &EncodedCoefficients) -> Result<DwtCoefficients> {
        self.decode_level(encoded, 1)
    }

    fn decode_level(&self, encoded: &EncodedCoefficients, level: usize) -> Result<DwtCoefficients> {
        if level > MAX_DEPTH {
            return Err(Error::invalid(format!("pyramid has more than {} levels", MAX_DEPTH)));
        }

        let decode = |band: SubBand, encoded: &EncodedBand| {
            self.check_abort()?;
            self.decode_band(encoded).map_err(|error| error.at(Location { channel: None, level, band: Some(band) }))
        };

        let vertical = decode(SubBand::Vertical, &encoded.vertical)?;
        let horizontal = decode(SubBand::Horizontal, &encoded.horizontal)?;
        let diagonal = decode(SubBand::Diagonal, &encoded.diagonal)?;

        let average = match &encoded.average {
            EncodedAverage::Terminal(average) => Average::Terminal(average.clone()),
            EncodedAverage::Nested(nested) => Average::Nested(Box::new(self.decode_level(nested, level + 1)?)),
        };

        Ok(DwtCoefficients {
            average, vertical, horizontal, diagonal,
            mode_map: encoded.mode_map.clone(),
            norms: None,
        })
    }

    /// Encode and immediately decode, yielding the coefficients a decoder would see.
    pub fn process(&self, coefficients: &DwtCoefficients) -> Result<DwtCoefficients> {
        self.decode(&self.encode(coefficients)?)
    }
}
