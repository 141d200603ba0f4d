#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use super::super::{PeakModel, PeakShapeModel};

/// The ratio of a Gaussian's full width at half maximum to its `sigma`
pub const GAUSSIAN_FWHM_FACTOR: f64 = 2.3548;

/// Gaussian peak shape model
///
/// ```math
/// y = a\exp\left({\frac{-(x - \mu)^2}{2\sigma^2}}\right)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct GaussianPeakShape {
    pub mu: f64,
    pub sigma: f64,
    pub amplitude: f64,
}

impl GaussianPeakShape {
    pub fn new(mu: f64, sigma: f64, amplitude: f64) -> Self {
        Self {
            mu,
            sigma,
            amplitude,
        }
    }
}

impl PeakShapeModel for GaussianPeakShape {
    const KIND: PeakModel = PeakModel::Gaussian;

    fn from_params(params: [f64; 3]) -> Self {
        let [amplitude, mu, sigma] = params;
        Self::new(mu, sigma, amplitude)
    }

    fn params(&self) -> [f64; 3] {
        [self.amplitude, self.mu, self.sigma]
    }

    fn density(&self, x: f64) -> f64 {
        self.amplitude * (-(x - self.mu).powi(2) / (2.0 * self.sigma.powi(2))).exp()
    }

    fn jacobian(&self, x: f64) -> [f64; 3] {
        let d = x - self.mu;
        let s2 = self.sigma.powi(2);
        let e = (-d.powi(2) / (2.0 * s2)).exp();
        [
            e,
            self.amplitude * e * d / s2,
            self.amplitude * e * d.powi(2) / (s2 * self.sigma),
        ]
    }

    fn fwhm(&self) -> f64 {
        GAUSSIAN_FWHM_FACTOR * self.sigma
    }
}
