#[macro_use]
extern crate bencher;

extern crate wavelet_codec;
use wavelet_codec::prelude::*;
use wavelet_codec::compression::huffman;

use bencher::Bencher;
use rand::{Rng, SeedableRng};
use rand::rngs::StdRng;


fn random_image(size: usize) -> Channels<Matrix> {
    let mut random = StdRng::seed_from_u64(0);

    Channels::new((), (), ()).map(|_, _| {
        let values = (0 .. size * size).map(|_| random.random::<f32>() * 255.0).collect();
        Matrix::from_values(size, size, values).unwrap()
    })
}

/// Decompose and reconstruct without quantization
fn classic_pyramid(bench: &mut Bencher) {
    let image = random_image(512);
    let dwt = Dwt::new(HaarClassic);

    bench.iter(||{
        let coefficients = dwt.decompose(&image.red, 4).unwrap();
        bencher::black_box(dwt.reconstruct(&coefficients).unwrap());
    })
}

/// Every block tries all adaptive modes
fn adaptive_pyramid(bench: &mut Bencher) {
    let image = random_image(512);
    let dwt = Dwt::new(HaarAdaptive);

    bench.iter(||{
        let coefficients = dwt.decompose(&image.red, 4).unwrap();
        bencher::black_box(dwt.reconstruct(&coefficients).unwrap());
    })
}

/// Huffman coding of a skewed symbol distribution
fn huffman_round_trip(bench: &mut Bencher) {
    let mut random = StdRng::seed_from_u64(1);
    let symbols: Vec<u16> = (0 .. 1 << 18)
        .map(|_| (random.random::<f32>().powi(4) * 32.0) as u16 % 32)
        .collect();

    bench.iter(||{
        let (tree, bits) = huffman::compress(32, &symbols).unwrap();
        bencher::black_box(huffman::decompress(&tree, &bits, symbols.len()).unwrap());
    })
}

/// Encode three channels on the calling thread
fn encode_image_sequential(bench: &mut Bencher) {
    let image = random_image(256);
    let options = CodecOptions::high().with_parallel(false);

    bench.iter(||{
        bencher::black_box(encode_image(&image, &options).unwrap().into_result().unwrap());
    })
}

/// Encode three channels on the thread pool
fn encode_image_parallel(bench: &mut Bencher) {
    let image = random_image(256);
    let options = CodecOptions::high().with_parallel(true);

    bench.iter(||{
        bencher::black_box(encode_image(&image, &options).unwrap().into_result().unwrap());
    })
}

/// Decode and reconstruct three channels
fn decode_image_parallel(bench: &mut Bencher) {
    let options = CodecOptions::high().with_wavelet(Wavelet::Adaptive);
    let encoded = encode_image(&random_image(256), &options).unwrap().into_result().unwrap();

    bench.iter(||{
        bencher::black_box(decode_image(&encoded, &options).into_result().unwrap());
    })
}

benchmark_group!(codec,
    classic_pyramid,
    adaptive_pyramid,
    huffman_round_trip,
    encode_image_sequential,
    encode_image_parallel,
    decode_image_parallel
);

benchmark_main!(codec);
