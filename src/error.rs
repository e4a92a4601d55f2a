
//! Error type definitions.

use std::borrow::Cow;
use std::io::ErrorKind;
pub use std::io::Error as IoError;
use std::convert::TryFrom;
use std::error;
use std::fmt;
use std::num::TryFromIntError;

use crate::dwt::SubBand;
use crate::image::Channel;


/// A result that may contain a codec error.
pub type Result<T> = std::result::Result<T, Error>;

/// A result that, if ok, contains nothing, and otherwise contains a codec error.
pub type UnitResult = Result<()>;


/// An error that may happen while encoding or decoding a channel.
/// Corrupted data is always reported, never replaced by a guessed value.
#[derive(Debug)]
pub enum Error {

    /// Sub-bands or matrices do not have the extents required by the operation.
    ShapeMismatch(Cow<'static, str>),

    /// A matrix was accessed outside of its rows and columns.
    OutOfRange(Cow<'static, str>),

    /// The quantizer configuration cannot map coefficients to an alphabet,
    /// for example an empty alphabet.
    UnquantizableInput(Cow<'static, str>),

    /// A decoded bit sequence does not belong to any leaf of the huffman tree.
    UnknownSymbol(Cow<'static, str>),

    /// An adaptive block transformation was given a mode tag it does not know.
    InvalidModeTag(Cow<'static, str>),

    /// A persisted huffman tree could not be parsed.
    TreeCorrupt(Cow<'static, str>),

    /// Persisted bytes are malformed, for example a length that exceeds the remaining data.
    Invalid(Cow<'static, str>),

    /// The host application requested cancellation.
    Aborted,

    /// The underlying byte stream could not be read or written.
    Io(IoError),

    /// Another error, annotated with the channel, level and sub-band where it happened.
    Located {
        location: Location,
        cause: Box<Error>,
    },
}

/// Where in the pipeline of an image an error occurred.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Location {

    /// Absent if a single channel was processed on its own.
    pub channel: Option<Channel>,

    /// One-based decomposition level, counted from the full resolution.
    /// Zero if the error does not belong to a single level.
    pub level: usize,

    /// Absent if the whole level failed.
    pub band: Option<SubBand>,
}


impl Error {

    /// Create an error of the variant `ShapeMismatch`.
    pub(crate) fn shape(message: impl Into<Cow<'static, str>>) -> Self {
        Error::ShapeMismatch(message.into())
    }

    /// Create an error of the variant `OutOfRange`.
    pub(crate) fn out_of_range(message: impl Into<Cow<'static, str>>) -> Self {
        Error::OutOfRange(message.into())
    }

    /// Create an error of the variant `UnquantizableInput`.
    pub(crate) fn unquantizable(message: impl Into<Cow<'static, str>>) -> Self {
        Error::UnquantizableInput(message.into())
    }

    /// Create an error of the variant `UnknownSymbol`.
    pub(crate) fn unknown_symbol(message: impl Into<Cow<'static, str>>) -> Self {
        Error::UnknownSymbol(message.into())
    }

    /// Create an error of the variant `InvalidModeTag`.
    pub(crate) fn mode_tag(message: impl Into<Cow<'static, str>>) -> Self {
        Error::InvalidModeTag(message.into())
    }

    /// Create an error of the variant `TreeCorrupt`.
    pub(crate) fn tree_corrupt(message: impl Into<Cow<'static, str>>) -> Self {
        Error::TreeCorrupt(message.into())
    }

    /// Create an error of the variant `Invalid`.
    pub(crate) fn invalid(message: impl Into<Cow<'static, str>>) -> Self {
        Error::Invalid(message.into())
    }

    /// Annotate this error with the place it happened.
    /// An error that already knows its location keeps the innermost band,
    /// but learns its channel if it did not know it yet.
    pub(crate) fn at(self, location: Location) -> Self {
        match self {
            Error::Located { location: inner, cause } => Error::Located {
                location: Location {
                    channel: inner.channel.or(location.channel),
                    .. inner
                },
                cause,
            },

            error => Error::Located { location, cause: Box::new(error) },
        }
    }

    /// The error without any location annotation.
    pub fn cause(&self) -> &Error {
        match self {
            Error::Located { cause, .. } => cause.cause(),
            error => error,
        }
    }

    /// The location annotation, if any.
    pub fn location(&self) -> Option<Location> {
        match self {
            Error::Located { location, .. } => Some(*location),
            _ => None,
        }
    }
}

/// Enable using the `?` operator on `std::io::Result`.
impl From<IoError> for Error {
    fn from(error: IoError) -> Self {
        if error.kind() == ErrorKind::UnexpectedEof {
            Error::invalid("reference to missing bytes")
        }
        else {
            Error::Io(error)
        }
    }
}

impl From<TryFromIntError> for Error {
    fn from(_: TryFromIntError) -> Self {
        Error::invalid("invalid size")
    }
}

impl error::Error for Error {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match *self {
            Error::Io(ref err) => Some(err),
            Error::Located { ref cause, .. } => Some(cause.as_ref()),
            _ => None,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::ShapeMismatch(message) => write!(formatter, "shape mismatch: {}", message),
            Error::OutOfRange(message) => write!(formatter, "index out of range: {}", message),
            Error::UnquantizableInput(message) => write!(formatter, "cannot quantize: {}", message),
            Error::UnknownSymbol(message) => write!(formatter, "unknown huffman code: {}", message),
            Error::InvalidModeTag(message) => write!(formatter, "invalid mode tag: {}", message),
            Error::TreeCorrupt(message) => write!(formatter, "corrupt huffman tree: {}", message),
            Error::Invalid(message) => write!(formatter, "invalid data: {}", message),
            Error::Aborted => write!(formatter, "cancelled"),
            Error::Io(err) => err.fmt(formatter),
            Error::Located { location, cause } => write!(formatter, "{} (at {})", cause, location),
        }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(channel) = self.channel {
            write!(formatter, "{:?} channel, ", channel)?;
        }

        write!(formatter, "level {}", self.level)?;

        if let Some(band) = self.band {
            write!(formatter, ", {:?} band", band)?;
        }

        Ok(())
    }
}


/// Return error on invalid range.
#[inline]
pub(crate) fn u32_to_usize(value: u32, error_message: &'static str) -> Result<usize> {
    usize::try_from(value).map_err(|_| Error::invalid(error_message))
}

/// Return error on invalid range.
#[inline]
pub(crate) fn usize_to_u32(value: usize, error_message: &'static str) -> Result<u32> {
    u32::try_from(value).map_err(|_| Error::invalid(error_message))
}

/// Return error on invalid range.
#[inline]
pub(crate) fn u64_to_usize(value: u64, error_message: &'static str) -> Result<usize> {
    usize::try_from(value).map_err(|_| Error::invalid(error_message))
}
