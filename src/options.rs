
//! Configuration of the codec pipeline.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::dwt::MAX_DEPTH;
use crate::error::{Error, UnitResult};
use crate::transform::Wavelet;


/// Everything that controls how channels are encoded.
/// The same options must be used for decoding.
#[derive(Debug, Clone)]
pub struct CodecOptions {

    /// Size of the quantization alphabet. Quantized symbols are in `0 .. levels`.
    pub levels: u32,

    /// Offset that moves coefficients into the non-negative quantizer range.
    /// Coefficients are clamped to `-shift .. shift`.
    pub shift: u32,

    /// Number of decomposition levels of the pyramid.
    pub depth: usize,

    /// The block transformation.
    pub wavelet: Wavelet,

    /// Compute the sub-band norms of every level while decomposing.
    pub compute_norms: bool,

    /// Process the three color channels on the thread pool.
    /// Has no effect without the `rayon` feature.
    pub parallel: bool,

    /// Checked between levels and sub-bands.
    pub abort: Option<AbortFlag>,
}

impl Default for CodecOptions {
    fn default() -> Self {
        CodecOptions {
            levels: 32,
            shift: 256,
            depth: 1,
            wavelet: Wavelet::Classic,
            compute_norms: false,
            parallel: cfg!(feature = "rayon"),
            abort: None,
        }
    }
}

impl CodecOptions {

    /// Largest supported alphabet. Symbols are stored as `u16`.
    pub const MAX_LEVELS: u32 = 1 << 16;

    /// Fine quantization and a deep pyramid.
    pub fn high() -> Self {
        CodecOptions { levels: 128, depth: 3, ..Self::default() }
    }

    /// Coarse quantization and a single level.
    pub fn low() -> Self {
        CodecOptions { levels: 16, depth: 1, ..Self::default() }
    }

    /// Use the specified alphabet size.
    pub fn with_levels(self, levels: u32) -> Self { Self { levels, ..self } }

    /// Use the specified quantizer offset.
    pub fn with_shift(self, shift: u32) -> Self { Self { shift, ..self } }

    /// Use the specified pyramid depth.
    pub fn with_depth(self, depth: usize) -> Self { Self { depth, ..self } }

    /// Use the specified block transformation.
    pub fn with_wavelet(self, wavelet: Wavelet) -> Self { Self { wavelet, ..self } }

    /// Compute sub-band norms while decomposing.
    pub fn with_norms(self, compute_norms: bool) -> Self { Self { compute_norms, ..self } }

    /// Process channels on the thread pool or on the calling thread.
    pub fn with_parallel(self, parallel: bool) -> Self { Self { parallel, ..self } }

    /// Allow cancellation through the specified flag.
    pub fn with_abort_flag(self, abort: AbortFlag) -> Self { Self { abort: Some(abort), ..self } }

    /// Reject configurations that cannot produce a valid pipeline.
    pub fn validate(&self) -> UnitResult {
        if self.levels == 0 {
            return Err(Error::unquantizable("the alphabet must have at least one level"));
        }

        if self.levels > Self::MAX_LEVELS {
            return Err(Error::unquantizable(format!("at most {} levels are supported", Self::MAX_LEVELS)));
        }

        if u64::from(self.levels) > 2 * u64::from(self.shift) {
            return Err(Error::unquantizable(format!(
                "{} levels do not fit into the quantizer range of {}", self.levels, 2 * u64::from(self.shift)
            )));
        }

        if self.depth == 0 {
            return Err(Error::shape("at least one decomposition level is required"));
        }

        if self.depth > MAX_DEPTH {
            return Err(Error::shape(format!("at most {} decomposition levels are supported", MAX_DEPTH)));
        }

        Ok(())
    }
}


/// Shared flag that lets a host application cancel encoding or decoding.
/// The pipeline only looks at it between levels and sub-bands,
/// so no sub-band is ever left half written.
#[derive(Debug, Clone, Default)]
pub struct AbortFlag(Arc<AtomicBool>);

impl AbortFlag {

    /// A flag that is not raised yet.
    pub fn new() -> Self { Self::default() }

    /// Request cancellation of all pipelines sharing this flag.
    pub fn abort(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    /// Whether cancellation was requested.
    pub fn is_aborted(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }

    pub(crate) fn check(&self) -> UnitResult {
        if self.is_aborted() { Err(Error::Aborted) }
        else { Ok(()) }
    }
}
