#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use super::super::{PeakModel, PeakShapeModel};

/// Lorentzian (Cauchy) peak shape model, scaled so `y(x0) = a`
///
/// ```math
/// y = a\frac{\gamma^2}{(x - x_0)^2 + \gamma^2}
/// ```
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct LorentzianPeakShape {
    pub x0: f64,
    pub gamma: f64,
    pub amplitude: f64,
}

impl LorentzianPeakShape {
    pub fn new(x0: f64, gamma: f64, amplitude: f64) -> Self {
        Self {
            x0,
            gamma,
            amplitude,
        }
    }
}

impl PeakShapeModel for LorentzianPeakShape {
    const KIND: PeakModel = PeakModel::Lorentzian;

    fn from_params(params: [f64; 3]) -> Self {
        let [amplitude, x0, gamma] = params;
        Self::new(x0, gamma, amplitude)
    }

    fn params(&self) -> [f64; 3] {
        [self.amplitude, self.x0, self.gamma]
    }

    fn density(&self, x: f64) -> f64 {
        let g2 = self.gamma.powi(2);
        self.amplitude * g2 / ((x - self.x0).powi(2) + g2)
    }

    fn jacobian(&self, x: f64) -> [f64; 3] {
        let d = x - self.x0;
        let g2 = self.gamma.powi(2);
        let denom = d.powi(2) + g2;
        let denom2 = denom.powi(2);
        [
            g2 / denom,
            self.amplitude * g2 * 2.0 * d / denom2,
            self.amplitude * 2.0 * self.gamma * d.powi(2) / denom2,
        ]
    }

    fn fwhm(&self) -> f64 {
        2.0 * self.gamma
    }
}
