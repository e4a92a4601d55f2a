
//! Encoding and decoding of images with a red, a green and a blue channel.
//! The channels never influence each other: each one is decomposed,
//! quantized and huffman coded on its own, and reports its own result.

use crate::compression::{EncodedCoefficients, Quantization};
use crate::dwt::Dwt;
use crate::error::{Error, Location, Result, UnitResult};
use crate::io::{Read, Write};
use crate::matrix::Matrix;
use crate::options::CodecOptions;


/// Names one of the three color channels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Channel {
    Red,
    Green,
    Blue,
}

impl Channel {

    /// All channels, in the order they are processed and persisted.
    pub const ALL: [Channel; 3] = [Channel::Red, Channel::Green, Channel::Blue];
}

/// One value per color channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Channels<T> {
    pub red: T,
    pub green: T,
    pub blue: T,
}

impl<T> Channels<T> {

    /// Group three values.
    pub fn new(red: T, green: T, blue: T) -> Self {
        Channels { red, green, blue }
    }

    /// The value of the specified channel.
    pub fn get(&self, channel: Channel) -> &T {
        match channel {
            Channel::Red => &self.red,
            Channel::Green => &self.green,
            Channel::Blue => &self.blue,
        }
    }

    /// All values, in the order of `Channel::ALL`.
    pub fn as_array(&self) -> [&T; 3] {
        [&self.red, &self.green, &self.blue]
    }

    /// Borrow each value.
    pub fn as_ref(&self) -> Channels<&T> {
        Channels { red: &self.red, green: &self.green, blue: &self.blue }
    }

    /// Convert each value, knowing which channel it belongs to.
    pub fn map<U>(self, mut map: impl FnMut(Channel, T) -> U) -> Channels<U> {
        Channels {
            red: map(Channel::Red, self.red),
            green: map(Channel::Green, self.green),
            blue: map(Channel::Blue, self.blue),
        }
    }
}

impl<T> Channels<Result<T>> {

    /// Succeeds only if all channels succeeded.
    /// Otherwise returns the error of the first failed channel.
    pub fn into_result(self) -> Result<Channels<T>> {
        Ok(Channels { red: self.red?, green: self.green?, blue: self.blue? })
    }
}

impl Channels<EncodedCoefficients> {

    /// Write the red, green and blue channel, in that order.
    pub fn write(&self, write: &mut impl Write) -> UnitResult {
        for channel in self.as_array().iter() {
            channel.write(write)?;
        }

        Ok(())
    }

    /// Read an image that was written with `write`.
    pub fn read(read: &mut impl Read) -> Result<Self> {
        let red = EncodedCoefficients::read(read)?;
        let green = EncodedCoefficients::read(read)?;
        let blue = EncodedCoefficients::read(read)?;
        Ok(Channels { red, green, blue })
    }
}


/// Decompose a single channel with the configured wavelet
/// and compress the detail bands of all levels.
pub fn encode_channel(matrix: &Matrix, options: &CodecOptions) -> Result<EncodedCoefficients> {
    options.validate()?;

    let dwt = Dwt::new(options.wavelet.transformation())
        .with_norms(options.compute_norms)
        .with_abort_flag(options.abort.clone());

    let coefficients = dwt.decompose(matrix, options.depth)?;
    let encoded = Quantization::from_options(options)?.encode(&coefficients)?;

    log::debug!(
        "encoded {}x{} channel with {} levels into {} bits",
        matrix.rows(), matrix.columns(), encoded.depth(), encoded.coded_bit_count()
    );

    Ok(encoded)
}

/// Decompress and reconstruct a single channel.
/// The pyramid depth is taken from the encoded data, not from the options.
pub fn decode_channel(encoded: &EncodedCoefficients, options: &CodecOptions) -> Result<Matrix> {
    options.validate()?;

    let coefficients = Quantization::from_options(options)?.decode(encoded)?;

    Dwt::new(options.wavelet.transformation())
        .with_abort_flag(options.abort.clone())
        .reconstruct(&coefficients)
}

/// Encode all three channels, in parallel if the options allow it.
/// Fails as a whole only if the channels do not share the same extents.
pub fn encode_image(image: &Channels<Matrix>, options: &CodecOptions) -> Result<Channels<Result<EncodedCoefficients>>> {
    let size = image.red.size();
    if image.green.size() != size || image.blue.size() != size {
        return Err(Error::shape("all channels of an image must have the same extents"));
    }

    Ok(process_channels(image, options.parallel, |channel, matrix| {
        encode_channel(matrix, options).map_err(|error| error.at(channel_location(channel)))
    }))
}

/// Decode all three channels, in parallel if the options allow it.
pub fn decode_image(image: &Channels<EncodedCoefficients>, options: &CodecOptions) -> Channels<Result<Matrix>> {
    process_channels(image, options.parallel, |channel, encoded| {
        decode_channel(encoded, options).map_err(|error| error.at(channel_location(channel)))
    })
}

fn channel_location(channel: Channel) -> Location {
    Location { channel: Some(channel), level: 0, band: None }
}

fn process_channels<T: Sync, U: Send>(
    channels: &Channels<T>, parallel: bool,
    process: impl Fn(Channel, &T) -> U + Sync
) -> Channels<U> {
    if parallel { process_in_parallel(channels, process) }
    else { channels.as_ref().map(process) }
}

#[cfg(feature = "rayon")]
fn process_in_parallel<T: Sync, U: Send>(channels: &Channels<T>, process: impl Fn(Channel, &T) -> U + Sync) -> Channels<U> {
    let process = &process;

    let (red, (green, blue)) = rayon_core::join(
        || process(Channel::Red, &channels.red),
        || rayon_core::join(
            || process(Channel::Green, &channels.green),
            || process(Channel::Blue, &channels.blue),
        ),
    );

    Channels { red, green, blue }
}

#[cfg(not(feature = "rayon"))]
fn process_in_parallel<T: Sync, U: Send>(channels: &Channels<T>, process: impl Fn(Channel, &T) -> U + Sync) -> Channels<U> {
    channels.as_ref().map(process)
}


#[cfg(test)]
mod test {
    use super::*;
    use crate::dwt::SubBand;
    use crate::options::AbortFlag;
    use crate::transform::Wavelet;

    fn channel(rows: usize, columns: usize, seed: usize) -> Matrix {
        let values = (0 .. rows * columns)
            .map(|index| ((index * 7 + seed * 13) % 64) as f32 * 3.0)
            .collect();

        Matrix::from_values(rows, columns, values).unwrap()
    }

    fn image(rows: usize, columns: usize) -> Channels<Matrix> {
        Channels::new(channel(rows, columns, 0), channel(rows, columns, 1), channel(rows, columns, 2))
    }

    #[test]
    fn map_knows_the_channel(){
        let names = Channels::new(1, 2, 3).map(|channel, value| (channel, value * 2));
        assert_eq!(names.green, (Channel::Green, 4));
        assert_eq!(*names.get(Channel::Blue), (Channel::Blue, 6));
        assert_eq!(names.as_array().len(), 3);
    }

    #[test]
    fn sequential_and_parallel_agree(){
        let image = image(16, 16);
        let options = CodecOptions::default().with_depth(2).with_wavelet(Wavelet::Adaptive);

        let sequential = encode_image(&image, &options.clone().with_parallel(false)).unwrap().into_result().unwrap();
        let parallel = encode_image(&image, &options.clone().with_parallel(true)).unwrap().into_result().unwrap();
        assert_eq!(sequential, parallel);

        let decoded = decode_image(&parallel, &options).into_result().unwrap();
        for (original, decoded) in image.as_array().iter().zip(decoded.as_array().iter()) {
            assert_eq!(original.size(), decoded.size());
        }
    }

    #[test]
    fn image_persistence(){
        let options = CodecOptions::low();
        let encoded = encode_image(&image(8, 4), &options).unwrap().into_result().unwrap();

        let mut bytes = Vec::new();
        encoded.write(&mut bytes).unwrap();
        assert_eq!(Channels::<EncodedCoefficients>::read(&mut bytes.as_slice()).unwrap(), encoded);
    }

    #[test]
    fn different_extents_are_rejected(){
        let mut image = image(8, 8);
        image.blue = channel(4, 8, 0);
        assert!(matches!(encode_image(&image, &CodecOptions::default()), Err(Error::ShapeMismatch(_))));
    }

    #[test]
    fn failures_are_reported_per_channel(){
        let options = CodecOptions::default().with_depth(2).with_parallel(false);
        let mut encoded = encode_image(&image(8, 8), &options).unwrap().into_result().unwrap();

        // a band coded with a smaller alphabet than the options describe
        encoded.green.diagonal = Quantization::new(256, 16).unwrap()
            .encode_band(&channel(4, 4, 0)).unwrap();

        let decoded = decode_image(&encoded, &options);
        assert!(decoded.red.is_ok());
        assert!(decoded.blue.is_ok());

        let error = decoded.green.unwrap_err();
        let location = error.location().unwrap();
        assert_eq!(location.channel, Some(Channel::Green));
        assert_eq!(location.level, 1);
        assert_eq!(location.band, Some(SubBand::Diagonal));
        assert!(matches!(error.cause(), Error::TreeCorrupt(_)));
    }

    #[test]
    fn aborted_before_the_first_level(){
        let flag = AbortFlag::new();
        flag.abort();

        let options = CodecOptions::default().with_abort_flag(flag);
        let result = encode_channel(&channel(4, 4, 0), &options);
        assert!(matches!(result, Err(Error::Aborted)));
    }
}
