//! `osapeaks` turns a batch of optical spectrum analyzer readings into
//! per-line wavelength statistics with expanded uncertainties.
//!
//! Each sample's spectrum is loaded from `wavelength;intensity` records
//! ([`text`]), its peaks are picked by prominence with [`PeakPicker`], the
//! peaks of all samples are grouped into spectral lines ([`clustering`]), the
//! three dominant lines are selected as the red, green and blue principal lines
//! ([`selection`]) and every group is summarized ([`statistics`]). The
//! [`Analyzer`] runs the whole sequence. [`curve_fit`] independently fits
//! Gaussian or Lorentzian shapes to a spectrum or a window of one.
//!
//! # Usage
//! ```
//! use osapeaks::{AnalysisConfig, Analyzer};
//!
//! let paths: Vec<_> = (1..=10)
//!     .map(|i| format!("test/data/visible/spectrum{i:03}.txt"))
//!     .collect();
//! let analyzer = Analyzer::new(AnalysisConfig::visible_osa());
//! let report = analyzer.analyze_files(&paths).unwrap();
//! assert_eq!(report.principal.len(), 3);
//! for row in report.statistics.principal() {
//!     let (mean, u) = (row.wl_mean_nm, row.wl_expanded_uncertainty_nm);
//!     println!("{}: {:.3} ± {:.3} nm", row.label, mean, u);
//! }
//! ```
pub mod clustering;
pub mod curve_fit;
pub mod peak;
pub mod peak_picker;
pub mod pipeline;
pub mod selection;
pub mod spectrum;
pub mod statistics;
pub mod text;

pub use crate::clustering::{
    cluster_peaks, ClusteringError, ClusteringStrategy, GroupId, PeakGroup, PeakGroups,
};
pub use crate::curve_fit::{fit, fit_in_window, FitFailure, FitResult, PeakModel};
pub use crate::peak::{ColorBand, PeakRecord};
pub use crate::peak_picker::{pick_peaks, PeakPicker, PeakPickerError};
pub use crate::pipeline::{AnalysisConfig, AnalysisError, AnalysisReport, Analyzer, Sample};
pub use crate::selection::{select_principal, SelectionPolicy};
pub use crate::spectrum::{Spectrum, WavelengthUnit};
pub use crate::statistics::{aggregate, GroupStatistics, StatisticsTable};
pub use crate::text::{SpectrumError, SpectrumReader};
