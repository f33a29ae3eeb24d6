//! Source of non-negative random values.

use rand::distributions::Distribution;
use rand::Rng;
use rand_distr::Normal;
use serde::{Deserialize, Serialize};

use crate::error::SimError;

/// Mean and standard deviation of a Gaussian distribution.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct GaussianParams {
    pub mean: f64,
    pub std: f64,
}

impl GaussianParams {
    pub const fn new(mean: f64, std: f64) -> Self {
        Self { mean, std }
    }
}

/// Gaussian distribution restricted to non-negative values by rejection sampling.
///
/// Draws are repeated until a value `>= 0` is obtained. There is no iteration cap, so a mean far below zero
/// relative to the deviation makes sampling arbitrarily slow. The only combination that can never produce
/// a value (negative mean with zero deviation) is rejected at construction.
///
/// Samples are taken from the simulation random number generator, e.g. via
/// [`SimulationContext::sample_from_distribution`](edgesim_core::SimulationContext::sample_from_distribution),
/// so each run owns its random stream.
#[derive(Clone, Copy, Debug)]
pub struct PositiveGaussian {
    params: GaussianParams,
    normal: Normal<f64>,
}

impl PositiveGaussian {
    pub fn new(mean: f64, std: f64) -> Result<Self, SimError> {
        if !mean.is_finite() || !std.is_finite() || std < 0. {
            return Err(SimError::config(format!(
                "invalid gaussian parameters: mean = {}, std = {}",
                mean, std
            )));
        }
        if std == 0. && mean < 0. {
            return Err(SimError::config(format!(
                "gaussian with mean {} and zero std never produces a non-negative value",
                mean
            )));
        }
        let normal = Normal::new(mean, std).map_err(|e| SimError::config(e.to_string()))?;
        Ok(Self {
            params: GaussianParams::new(mean, std),
            normal,
        })
    }

    pub fn from_params(params: GaussianParams) -> Result<Self, SimError> {
        Self::new(params.mean, params.std)
    }

    pub fn params(&self) -> GaussianParams {
        self.params
    }
}

impl Distribution<f64> for PositiveGaussian {
    fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> f64 {
        loop {
            let value = self.normal.sample(rng);
            if value >= 0. {
                return value;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand_distr::Distribution;
    use rand_pcg::Pcg64;

    use super::PositiveGaussian;
    use crate::error::SimError;

    #[test]
    fn test_samples_are_non_negative() {
        let mut rng = Pcg64::seed_from_u64(7);
        // most of the mass is below zero
        let dist = PositiveGaussian::new(-1., 2.).unwrap();
        for _ in 0..10_000 {
            assert!(dist.sample(&mut rng) >= 0.);
        }
    }

    #[test]
    fn test_zero_std_gives_constant() {
        let mut rng = Pcg64::seed_from_u64(7);
        let dist = PositiveGaussian::new(0.01, 0.).unwrap();
        assert_eq!(dist.sample(&mut rng), 0.01);
    }

    #[test]
    fn test_invalid_parameters_are_rejected() {
        assert!(matches!(PositiveGaussian::new(1., -1.), Err(SimError::Configuration(_))));
        assert!(matches!(PositiveGaussian::new(f64::NAN, 1.), Err(SimError::Configuration(_))));
        assert!(matches!(PositiveGaussian::new(-3., 0.), Err(SimError::Configuration(_))));
    }
}
