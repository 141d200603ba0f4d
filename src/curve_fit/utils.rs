use std::fmt::{self, Debug};
use std::str::FromStr;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use thiserror::Error;

use super::{FitArgs, PeakShapeFitter};

/// The smallest number of distinct points a three parameter model is fit to
pub const MIN_FIT_POINTS: usize = 4;

/// The peak shape families that can be fit
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum PeakModel {
    #[default]
    Gaussian,
    Lorentzian,
}

impl fmt::Display for PeakModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Gaussian => f.write_str("gaussian"),
            Self::Lorentzian => f.write_str("lorentzian"),
        }
    }
}

impl FromStr for PeakModel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "gaussian" | "gauss" => Ok(Self::Gaussian),
            "lorentzian" | "lorentz" => Ok(Self::Lorentzian),
            other => Err(format!("Unknown peak model {other:?}")),
        }
    }
}

/// Why a peak shape could not be fit
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FitFailure {
    #[error("Only {points} distinct points are available, at least {required} are required")]
    TooFewPoints { points: usize, required: usize },
    #[error("The wavelength and intensity arrays differ in length ({wavelength} != {intensity})")]
    LengthMismatch { wavelength: usize, intensity: usize },
    #[error("The signal is constant")]
    ConstantSignal,
    #[error("The fit did not converge after {iterations} iterations")]
    DidNotConverge { iterations: usize },
    #[error("The fit produced a non-finite value")]
    NonFinite,
    #[error("The fitted center {center} lies outside the window {window:?}")]
    CenterOutsideWindow { center: f64, window: (f64, f64) },
    #[error("The fitted amplitude is not positive")]
    NonPositiveAmplitude,
}

/// Hyperparameters for fitting a peak shape model
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct FitConfig {
    /// The maximum number of Levenberg-Marquardt iterations
    pub max_iter: usize,
    /// The relative change in parameters and in squared error below which the
    /// fit is considered converged
    pub convergence: f64,
    /// The starting damping factor
    pub damping: f64,
    /// The minimum number of distinct points required, never less than [`MIN_FIT_POINTS`]
    pub min_points: usize,
}

impl FitConfig {
    pub fn max_iter(mut self, max_iter: usize) -> Self {
        self.max_iter = max_iter;
        self
    }

    pub fn convergence(mut self, convergence: f64) -> Self {
        self.convergence = convergence;
        self
    }

    pub fn damping(mut self, damping: f64) -> Self {
        self.damping = damping;
        self
    }

    pub fn min_points(mut self, min_points: usize) -> Self {
        self.min_points = min_points;
        self
    }

    pub(crate) fn required_points(&self) -> usize {
        self.min_points.max(MIN_FIT_POINTS)
    }
}

impl Default for FitConfig {
    fn default() -> Self {
        Self {
            max_iter: 500,
            convergence: 1e-10,
            damping: 1e-3,
            min_points: MIN_FIT_POINTS,
        }
    }
}

/// The parameters and goodness of fit of a converged peak shape fit
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct FitResult {
    pub model: PeakModel,
    pub amplitude: f64,
    pub center_nm: f64,
    /// `sigma` for [`PeakModel::Gaussian`], `gamma` for [`PeakModel::Lorentzian`]
    pub width_param: f64,
    pub fwhm_nm: f64,
    pub r_squared: f64,
    pub iterations: usize,
}

impl fmt::Display for FitResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} fit: center {:.4} nm, amplitude {:.4}, FWHM {:.4} nm, R² {:.5}",
            self.model, self.center_nm, self.amplitude, self.fwhm_nm, self.r_squared
        )
    }
}

/// A three parameter peak shape model fit with Levenberg-Marquardt
pub trait PeakShapeModel: Clone + Debug + Sized {
    const KIND: PeakModel;

    /// Build a model from `[amplitude, center, width]`
    fn from_params(params: [f64; 3]) -> Self;

    /// The model's `[amplitude, center, width]`
    fn params(&self) -> [f64; 3];

    /// The theoretical intensity at wavelength `x`
    fn density(&self, x: f64) -> f64;

    /// The partial derivatives of [`PeakShapeModel::density`] at `x` with respect to
    /// `[amplitude, center, width]`
    fn jacobian(&self, x: f64) -> [f64; 3];

    fn fwhm(&self) -> f64;

    fn amplitude(&self) -> f64 {
        self.params()[0]
    }

    fn center(&self) -> f64 {
        self.params()[1]
    }

    fn width(&self) -> f64 {
        self.params()[2]
    }

    /// Whether the parameters describe a usable peak
    fn is_valid(&self) -> bool {
        let [amplitude, center, width] = self.params();
        amplitude.is_finite() && center.is_finite() && width.is_finite() && width > 0.0
    }

    fn predict(&self, wavelength: &[f64]) -> Vec<f64> {
        wavelength.iter().map(|x| self.density(*x)).collect()
    }

    fn residual_sum_of_squares(&self, data: &FitArgs) -> f64 {
        data.iter().map(|(x, y)| (y - self.density(x)).powi(2)).sum()
    }

    /// `1 - SS_res / SS_tot`, zero when the data has no variance
    fn r_squared(&self, data: &FitArgs) -> f64 {
        let ss_tot = data.total_sum_of_squares();
        if ss_tot == 0.0 {
            return 0.0;
        }
        1.0 - self.residual_sum_of_squares(data) / ss_tot
    }

    /// Starting parameters: the maximum intensity, the wavelength it occurs at
    /// and a tenth of the wavelength range
    fn guess(data: &FitArgs) -> Self {
        if data.is_empty() {
            return Self::from_params([1.0, 0.0, 1.0]);
        }
        let idx = data.argmax();
        let mut width = data.wavelength_range() / 10.0;
        if width <= 0.0 || !width.is_finite() {
            width = 1.0;
        }
        Self::from_params([data.intensity[idx], data.wavelength[idx], width])
    }

    fn to_result(&self, r_squared: f64, iterations: usize) -> FitResult {
        FitResult {
            model: Self::KIND,
            amplitude: self.amplitude(),
            center_nm: self.center(),
            width_param: self.width(),
            fwhm_nm: self.fwhm(),
            r_squared,
            iterations,
        }
    }

    fn fit(&mut self, data: FitArgs) -> Result<FitResult, FitFailure> {
        self.fit_with(data, FitConfig::default())
    }

    fn fit_with(&mut self, data: FitArgs, config: FitConfig) -> Result<FitResult, FitFailure> {
        PeakShapeFitter::new(data).fit_model(self, &config)
    }
}
