use rand::SeedableRng;
use rand::rngs::StdRng;
use rand_distr::{Distribution, Normal};
use rustradio::block::{Block, BlockRet};
use rustradio::stream::{ReadStream, WriteStream};
use rustradio::{Complex, Error, rustradio_macros};

use crate::error::{Error as TxError, Result};

/// Zero-mean complex Gaussian noise with independent I and Q.
///
/// Each component has standard deviation `amplitude / √2`, so the complex
/// power of the output is `amplitude²`.
pub struct ComplexGaussian {
    dist: Normal<f32>,
    rng: StdRng,
}

impl ComplexGaussian {
    pub fn new(amplitude: f32) -> Result<Self> {
        Self::with_rng(amplitude, StdRng::from_os_rng())
    }

    /// Reproducible noise for tests.
    pub fn with_seed(amplitude: f32, seed: u64) -> Result<Self> {
        Self::with_rng(amplitude, StdRng::seed_from_u64(seed))
    }

    fn with_rng(amplitude: f32, rng: StdRng) -> Result<Self> {
        let dist = Normal::new(0.0, amplitude * std::f32::consts::FRAC_1_SQRT_2)
            .map_err(|e| TxError::InvalidConfig(format!("noise amplitude {amplitude}: {e}")))?;
        Ok(Self { dist, rng })
    }

    pub fn sample(&mut self) -> Complex {
        Complex::new(
            self.dist.sample(&mut self.rng),
            self.dist.sample(&mut self.rng),
        )
    }

    pub fn fill(&mut self, out: &mut [Complex]) {
        for s in out.iter_mut() {
            *s = self.sample();
        }
    }
}

/// Endless source block emitting [`ComplexGaussian`] noise.
#[derive(rustradio_macros::Block)]
pub struct NoiseSource {
    #[rustradio(out)]
    dst: WriteStream<Complex>,
    noise: ComplexGaussian,
}

impl NoiseSource {
    pub fn new(noise: ComplexGaussian) -> (Self, ReadStream<Complex>) {
        let (dst, prev) = rustradio::stream::new_stream();
        (Self { dst, noise }, prev)
    }
}

impl Block for NoiseSource {
    fn work(&mut self) -> std::result::Result<BlockRet<'_>, Error> {
        let mut output = self.dst.write_buf()?;
        let n = output.len();
        if n == 0 {
            return Ok(BlockRet::Pending);
        }
        self.noise.fill(&mut output.slice()[..n]);
        output.produce(n, &[]);
        Ok(BlockRet::Again)
    }
}
