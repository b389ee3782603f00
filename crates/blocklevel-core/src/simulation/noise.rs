//! Noise generation for the simulated block

use rand::Rng;
use rand_distr::{Distribution, Normal};

/// Noise source over an injected RNG
#[derive(Debug, Clone)]
pub struct NoiseSource<R: Rng> {
    rng: R,
}

impl<R: Rng> NoiseSource<R> {
    pub fn new(rng: R) -> Self {
        Self { rng }
    }

    /// Uniform sample in [-half_width, half_width]
    ///
    /// Returns 0 without touching the RNG when `half_width` is 0.
    pub fn uniform(&mut self, half_width: f64) -> f64 {
        if half_width <= 0.0 {
            return 0.0;
        }
        self.rng.gen_range(-half_width..=half_width)
    }

    /// Zero-mean Gaussian sample with standard deviation `std_dev`
    ///
    /// Returns 0 without touching the RNG when `std_dev` is not positive.
    pub fn gaussian(&mut self, std_dev: f64) -> f64 {
        if !(std_dev > 0.0) {
            return 0.0;
        }
        match Normal::new(0.0, std_dev) {
            Ok(normal) => normal.sample(&mut self.rng),
            Err(_) => 0.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_zero_width_is_silent() {
        let mut noise = NoiseSource::new(StdRng::seed_from_u64(1));
        assert_eq!(noise.uniform(0.0), 0.0);
        assert_eq!(noise.gaussian(0.0), 0.0);
        assert_eq!(noise.gaussian(f64::NAN), 0.0);
    }

    #[test]
    fn test_uniform_within_bounds() {
        let mut noise = NoiseSource::new(StdRng::seed_from_u64(7));
        for _ in 0..1000 {
            let v = noise.uniform(0.2);
            assert!((-0.2..=0.2).contains(&v));
        }
    }

    #[test]
    fn test_gaussian_statistics() {
        let mut noise = NoiseSource::new(StdRng::seed_from_u64(3));
        let n = 20_000;
        let samples: Vec<f64> = (0..n).map(|_| noise.gaussian(0.5)).collect();
        let mean = samples.iter().sum::<f64>() / n as f64;
        let var = samples.iter().map(|s| (s - mean).powi(2)).sum::<f64>() / n as f64;

        assert!(mean.abs() < 0.02);
        assert!((var.sqrt() - 0.5).abs() < 0.02);
    }

    #[test]
    fn test_same_seed_same_sequence() {
        let mut a = NoiseSource::new(StdRng::seed_from_u64(99));
        let mut b = NoiseSource::new(StdRng::seed_from_u64(99));
        for _ in 0..10 {
            assert_eq!(a.gaussian(1.0), b.gaussian(1.0));
        }
    }
}
