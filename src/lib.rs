
//! Lossy image compression with Haar wavelets.
//!
//! Each color channel is split into a pyramid of sub-bands by a
//! classic or an adaptive 2x2 Haar transformation.
//! The detail sub-bands are quantized to a small alphabet and huffman coded,
//! while the coarsest average is kept at full precision.
//!
//! ```
//! use wavelet_codec::prelude::*;
//!
//! let channel = Matrix::from_rows(&[
//!     [ 10.0,  20.0,  30.0,  40.0],
//!     [ 50.0,  60.0,  70.0,  80.0],
//!     [ 90.0, 100.0, 110.0, 120.0],
//!     [130.0, 140.0, 150.0, 160.0],
//! ]).unwrap();
//!
//! let options = CodecOptions::default();
//! let encoded = encode_channel(&channel, &options).unwrap();
//! let decoded = decode_channel(&encoded, &options).unwrap();
//!
//! assert_eq!(decoded.size(), channel.size());
//! ```

#![forbid(unsafe_code)]
#![warn(
    rust_2018_idioms,
    future_incompatible,
    unused_extern_crates,
)]

pub mod io;
pub mod math;
pub mod error;
pub mod matrix;
pub mod transform;
pub mod dwt;
pub mod compression;
pub mod options;
pub mod image;


pub mod prelude {

    // main exports
    pub use crate::image::{
        encode_channel, decode_channel,
        encode_image, decode_image,
        Channel, Channels,
    };

    pub use crate::options::{CodecOptions, AbortFlag};

    // core data types
    pub use crate::matrix::Matrix;
    pub use crate::transform::{Wavelet, Wavelet2DTransformation, HaarClassic, HaarAdaptive, AdaptiveMode};
    pub use crate::dwt::{Dwt, DwtCoefficients, Average, Norms, SubBand};
    pub use crate::compression::{Quantization, EncodedBand, EncodedCoefficients, EncodedAverage};

    // secondary data types
    pub use crate::error::{self, Error, Result};
    pub use crate::math::Vec2;
}
