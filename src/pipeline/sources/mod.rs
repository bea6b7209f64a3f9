mod noise;

pub use noise::{ComplexGaussian, NoiseSource};
