//! Peak shape fitting to recover a sub-sample line center, amplitude and width.
//!
//! The supported peak shape types:
//! - [`GaussianPeakShape`]
//! - [`LorentzianPeakShape`]
//!
//! Both are three parameter models fit by Levenberg-Marquardt least squares in
//! [`PeakShapeFitter`], starting from the most intense point with a width of a
//! tenth of the wavelength range. Degenerate input and non-converging fits are
//! reported as [`FitFailure`] values.
//!
//! # Example
//!
//! ```rust
//! use osapeaks::curve_fit::{fit, PeakModel};
//!
//! let wavelength: Vec<f64> = (0..121).map(|i| 520.0 + i as f64 * 0.5).collect();
//! let intensity: Vec<f64> = wavelength
//!     .iter()
//!     .map(|x| 100.0 * (-(x - 550.0f64).powi(2) / 50.0).exp())
//!     .collect();
//! let result = fit(&wavelength, &intensity, PeakModel::Gaussian).unwrap();
//! assert!((result.center_nm - 550.0).abs() < 0.1);
//! ```
mod data;
mod fitter;
mod shapes;
mod utils;

use std::borrow::Cow;

pub use data::{FitArgs, FitArgsIter};
pub use fitter::PeakShapeFitter;
pub use shapes::{GaussianPeakShape, LorentzianPeakShape};
pub use utils::{FitConfig, FitFailure, FitResult, PeakModel, PeakShapeModel, MIN_FIT_POINTS};

/// Fit `model` to the data with the default [`FitConfig`]
pub fn fit(
    wavelength_nm: &[f64],
    intensity: &[f64],
    model: PeakModel,
) -> Result<FitResult, FitFailure> {
    fit_with(wavelength_nm, intensity, model, FitConfig::default())
}

fn paired<'a>(
    wavelength_nm: &'a [f64],
    intensity: &'a [f64],
) -> Result<FitArgs<'a, 'a>, FitFailure> {
    FitArgs::new(Cow::Borrowed(wavelength_nm), Cow::Borrowed(intensity)).ok_or(
        FitFailure::LengthMismatch {
            wavelength: wavelength_nm.len(),
            intensity: intensity.len(),
        },
    )
}

/// Fit a freshly guessed `model` to already paired data
pub fn fit_args(
    args: FitArgs,
    model: PeakModel,
    config: FitConfig,
) -> Result<FitResult, FitFailure> {
    match model {
        PeakModel::Gaussian => GaussianPeakShape::guess(&args).fit_with(args, config),
        PeakModel::Lorentzian => LorentzianPeakShape::guess(&args).fit_with(args, config),
    }
}

pub fn fit_with(
    wavelength_nm: &[f64],
    intensity: &[f64],
    model: PeakModel,
    config: FitConfig,
) -> Result<FitResult, FitFailure> {
    fit_args(paired(wavelength_nm, intensity)?, model, config)
}

/// Fit `model` using only the points with wavelengths in `window`.
///
/// The fit is rejected when its center falls outside the window or its
/// amplitude is not positive. All statistics, including `r_squared`, are
/// computed on the window alone.
pub fn fit_in_window(
    wavelength_nm: &[f64],
    intensity: &[f64],
    window: (f64, f64),
    model: PeakModel,
    config: FitConfig,
) -> Result<FitResult, FitFailure> {
    let (lo, hi) = if window.0 <= window.1 {
        window
    } else {
        (window.1, window.0)
    };
    let args = paired(wavelength_nm, intensity)?;
    let result = fit_args(args.window(lo, hi), model, config)?;
    check_window(result, (lo, hi))
}

fn check_window(result: FitResult, window: (f64, f64)) -> Result<FitResult, FitFailure> {
    if !(window.0..=window.1).contains(&result.center_nm) {
        return Err(FitFailure::CenterOutsideWindow {
            center: result.center_nm,
            window,
        });
    }
    if result.amplitude <= 0.0 {
        return Err(FitFailure::NonPositiveAmplitude);
    }
    Ok(result)
}

#[cfg(test)]
mod test {
    use super::*;
    use rstest::rstest;

    macro_rules! assert_is_close {
        ($t1:expr, $t2:expr, $tol:expr, $label:literal) => {
            assert!(
                ($t1 - $t2).abs() < $tol,
                "Observed {} {}, expected {}, difference {}",
                $label,
                $t1,
                $t2,
                $t1 - $t2,
            );
        };
        ($t1:expr, $t2:expr, $tol:expr, $label:literal, $obj:ident) => {
            assert!(
                ($t1 - $t2).abs() < $tol,
                "Observed {} {}, expected {}, difference {} from {:?}",
                $label,
                $t1,
                $t2,
                $t1 - $t2,
                $obj
            );
        };
    }

    fn axis(start: f64, stop: f64, step: f64) -> Vec<f64> {
        let n = ((stop - start) / step).round() as usize;
        (0..=n).map(|i| start + i as f64 * step).collect()
    }

    /// Small deterministic ripple standing in for measurement noise
    fn ripple(i: usize, scale: f64) -> f64 {
        ((i as f64 * 12.9898).sin() * 43758.5453).fract() * scale
    }

    #[test_log::test]
    fn test_gaussian_recovery() {
        let x = axis(520.0, 580.0, 0.25);
        let truth = GaussianPeakShape::new(550.0, 5.0, 100.0);
        let y: Vec<f64> = x
            .iter()
            .enumerate()
            .map(|(i, x)| truth.density(*x) + ripple(i, 0.05))
            .collect();
        let result = fit(&x, &y, PeakModel::Gaussian).unwrap();
        assert_eq!(result.model, PeakModel::Gaussian);
        assert_is_close!(result.center_nm, 550.0, 0.1, "center", result);
        assert_is_close!(result.amplitude, 100.0, 0.5, "amplitude", result);
        assert_is_close!(result.width_param, 5.0, 0.05, "sigma", result);
        assert_is_close!(result.fwhm_nm, 2.3548 * 5.0, 0.1, "fwhm", result);
        assert!(result.r_squared > 0.99, "{result}");
    }

    #[test_log::test]
    fn test_lorentzian_recovery() {
        let x = axis(580.0, 640.0, 0.25);
        let truth = LorentzianPeakShape::new(612.3, 2.5, 40.0);
        let y = truth.predict(&x);
        let result = fit(&x, &y, PeakModel::Lorentzian).unwrap();
        assert_is_close!(result.center_nm, 612.3, 1e-4, "center", result);
        assert_is_close!(result.width_param, 2.5, 1e-4, "gamma", result);
        assert_is_close!(result.fwhm_nm, 5.0, 1e-3, "fwhm", result);
        assert!(result.r_squared > 0.9999);
    }

    #[test]
    fn test_constant_signal() {
        let x = axis(500.0, 510.0, 1.0);
        let y = vec![3.0; x.len()];
        assert_eq!(
            fit(&x, &y, PeakModel::Gaussian),
            Err(FitFailure::ConstantSignal)
        );
    }

    #[rstest]
    #[case(vec![500.0, 501.0, 502.0], vec![1.0, 3.0, 1.0], 3)]
    #[case(vec![500.0, 500.0, 501.0, 501.0, 502.0], vec![1.0, 1.1, 3.0, 2.9, 1.0], 3)]
    fn test_too_few_points(#[case] x: Vec<f64>, #[case] y: Vec<f64>, #[case] points: usize) {
        assert_eq!(
            fit(&x, &y, PeakModel::Lorentzian),
            Err(FitFailure::TooFewPoints {
                points,
                required: MIN_FIT_POINTS
            })
        );
    }

    #[test]
    fn test_mismatched_lengths() {
        assert_eq!(
            fit(&[1.0, 2.0], &[1.0], PeakModel::Gaussian),
            Err(FitFailure::LengthMismatch {
                wavelength: 2,
                intensity: 1
            })
        );
    }

    #[test]
    fn test_non_finite() {
        let x = axis(500.0, 510.0, 1.0);
        let mut y: Vec<f64> = x.iter().map(|x| 10.0 - (x - 505.0f64).abs()).collect();
        y[3] = f64::NAN;
        assert_eq!(fit(&x, &y, PeakModel::Gaussian), Err(FitFailure::NonFinite));
    }

    #[test]
    fn test_iteration_budget() {
        let x = axis(520.0, 580.0, 0.5);
        let truth = GaussianPeakShape::new(548.0, 4.0, 80.0);
        let y = truth.predict(&x);
        let config = FitConfig::default().max_iter(1);
        let err = fit_with(&x, &y, PeakModel::Gaussian, config).unwrap_err();
        assert_eq!(err, FitFailure::DidNotConverge { iterations: 1 });
    }

    fn two_lines() -> (Vec<f64>, Vec<f64>) {
        let x = axis(500.0, 640.0, 0.5);
        let blue = LorentzianPeakShape::new(530.0, 2.0, 60.0);
        let red = LorentzianPeakShape::new(610.0, 3.0, 90.0);
        let y = x.iter().map(|x| blue.density(*x) + red.density(*x)).collect();
        (x, y)
    }

    #[test_log::test]
    fn test_window_fit() {
        let (x, y) = two_lines();
        let result = fit_in_window(
            &x,
            &y,
            (520.0, 540.0),
            PeakModel::Lorentzian,
            FitConfig::default().min_points(10),
        )
        .unwrap();
        assert_is_close!(result.center_nm, 530.0, 0.05, "center", result);
        assert!(result.amplitude > 0.0);
        assert!(result.r_squared > 0.99);

        // Reversed bounds are accepted
        let again = fit_in_window(
            &x,
            &y,
            (540.0, 520.0),
            PeakModel::Lorentzian,
            FitConfig::default().min_points(10),
        )
        .unwrap();
        assert_eq!(result, again);
    }

    #[test]
    fn test_window_too_narrow() {
        let (x, y) = two_lines();
        let err = fit_in_window(
            &x,
            &y,
            (529.0, 531.0),
            PeakModel::Lorentzian,
            FitConfig::default().min_points(10),
        )
        .unwrap_err();
        assert_eq!(
            err,
            FitFailure::TooFewPoints {
                points: 5,
                required: 10
            }
        );
    }

    #[test]
    fn test_window_checks() {
        let result = FitResult {
            model: PeakModel::Gaussian,
            amplitude: 12.0,
            center_nm: 591.5,
            width_param: 8.0,
            fwhm_nm: 2.3548 * 8.0,
            r_squared: 0.999,
            iterations: 12,
        };
        assert_eq!(
            check_window(result, (560.0, 590.0)),
            Err(FitFailure::CenterOutsideWindow {
                center: 591.5,
                window: (560.0, 590.0)
            })
        );
        assert_eq!(check_window(result, (560.0, 600.0)), Ok(result));

        let inverted = FitResult {
            amplitude: -3.0,
            ..result
        };
        assert_eq!(
            check_window(inverted, (560.0, 600.0)),
            Err(FitFailure::NonPositiveAmplitude)
        );
    }

    #[test]
    fn test_r_squared_of_constant_is_zero() {
        let model = GaussianPeakShape::new(0.0, 1.0, 1.0);
        let x = vec![0.0, 1.0, 2.0];
        let y = vec![2.0, 2.0, 2.0];
        let args = FitArgs::from((x.as_slice(), y.as_slice()));
        assert_eq!(model.r_squared(&args), 0.0);
    }
}
