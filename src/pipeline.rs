//! The batch analysis entry point.
//!
//! An [`Analyzer`] loads and peak-picks every sample independently, in parallel
//! when the `parallelism` feature is enabled, then clusters the pooled peaks,
//! selects the principal lines and summarizes each group. Problems with a single
//! sample never abort the batch; they are collected in the [`BatchSummary`].
//! Failures after detection has finished are reported as [`AnalysisError`].
use std::fmt;
use std::path::Path;

use log::{info, warn};
use thiserror::Error;

#[cfg(feature = "parallelism")]
use rayon::prelude::*;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::clustering::{
    cluster_peaks, ClusteringError, ClusteringStrategy, GroupId, PeakGroups,
};
use crate::peak::{ColorBand, PeakRecord};
use crate::peak_picker::{PeakPicker, PeakPickerError};
use crate::selection::{select_principal, SelectionPolicy};
use crate::spectrum::{Spectrum, WavelengthUnit};
use crate::statistics::StatisticsTable;
use crate::text::{SpectrumError, SpectrumReader};

/// The section marker that precedes the data of vendor CSV exports
pub const DATA_SECTION_MARKER: &str = "[Data]";

/// Every tunable of an analysis run
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize), serde(default))]
pub struct AnalysisConfig {
    /// The clustering cut distance, or bin width, in nanometers
    pub tolerance_nm: f64,
    pub prominence: f64,
    pub distance: Option<usize>,
    pub height: Option<f64>,
    pub selection: SelectionPolicy,
    pub clustering: ClusteringStrategy,
    /// Reject a whole sample on its first malformed line
    pub strict: bool,
    /// The unit the wavelength column of the inputs is written in
    pub unit: WavelengthUnit,
    pub section_marker: Option<String>,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            tolerance_nm: 5.0,
            prominence: 5.0,
            distance: None,
            height: None,
            selection: SelectionPolicy::default(),
            clustering: ClusteringStrategy::default(),
            strict: false,
            unit: WavelengthUnit::Meters,
            section_marker: None,
        }
    }
}

impl AnalysisConfig {
    /// A low-noise analyzer writing wavelengths in meters
    pub fn visible_osa() -> Self {
        Self::default()
    }

    /// A noisier instrument exporting vendor CSV in nanometers
    pub fn thorlabs() -> Self {
        Self::default()
            .unit(WavelengthUnit::Nanometers)
            .prominence(10.0)
            .distance(Some(10))
            .section_marker(Some(DATA_SECTION_MARKER))
    }

    pub fn tolerance_nm(mut self, tolerance_nm: f64) -> Self {
        self.tolerance_nm = tolerance_nm;
        self
    }

    pub fn prominence(mut self, prominence: f64) -> Self {
        self.prominence = prominence;
        self
    }

    pub fn distance(mut self, distance: Option<usize>) -> Self {
        self.distance = distance;
        self
    }

    pub fn height(mut self, height: Option<f64>) -> Self {
        self.height = height;
        self
    }

    pub fn selection(mut self, selection: SelectionPolicy) -> Self {
        self.selection = selection;
        self
    }

    pub fn clustering(mut self, clustering: ClusteringStrategy) -> Self {
        self.clustering = clustering;
        self
    }

    pub fn strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    pub fn unit(mut self, unit: WavelengthUnit) -> Self {
        self.unit = unit;
        self
    }

    pub fn section_marker<S: Into<String>>(mut self, marker: Option<S>) -> Self {
        self.section_marker = marker.map(|s| s.into());
        self
    }

    pub fn picker(&self) -> PeakPicker {
        PeakPicker::builder()
            .prominence(self.prominence)
            .distance(self.distance)
            .height(self.height)
            .build()
    }

    pub fn reader(&self) -> SpectrumReader {
        SpectrumReader::new(self.unit)
            .strict(self.strict)
            .section_marker(self.section_marker.clone())
    }

    #[cfg(feature = "serde")]
    pub fn from_json<R: std::io::Read>(reader: R) -> serde_json::Result<Self> {
        serde_json::from_reader(reader)
    }

    #[cfg(feature = "serde")]
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

/// One sample's spectrum and the label it is reported under
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    pub source_id: String,
    pub spectrum: Spectrum,
}

impl Sample {
    pub fn new<S: Into<String>>(source_id: S, spectrum: Spectrum) -> Self {
        Self {
            source_id: source_id.into(),
            spectrum,
        }
    }
}

/// Why a sample contributed nothing to the analysis
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum SampleFailureReason {
    /// The sample could not be read at all; it is excluded from the batch
    Unreadable(String),
    /// The sample had no valid records; it is excluded from the batch
    EmptySpectrum,
    /// The spectrum holds `NaN` or infinite values; it is excluded from the batch
    NonFinite,
    /// The sample was read but held no peaks; it still counts toward detection rates
    NoPeaksDetected,
}

impl SampleFailureReason {
    /// Whether the sample still counts toward detection rates
    pub fn counts_as_sample(&self) -> bool {
        matches!(self, Self::NoPeaksDetected)
    }
}

impl From<SpectrumError> for SampleFailureReason {
    fn from(value: SpectrumError) -> Self {
        match value {
            SpectrumError::EmptySpectrum => Self::EmptySpectrum,
            other => Self::Unreadable(other.to_string()),
        }
    }
}

impl From<PeakPickerError> for SampleFailureReason {
    fn from(value: PeakPickerError) -> Self {
        match value {
            PeakPickerError::NoPeaksDetected => Self::NoPeaksDetected,
        }
    }
}

impl fmt::Display for SampleFailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unreadable(reason) => write!(f, "unreadable: {reason}"),
            Self::EmptySpectrum => f.write_str("no valid records"),
            Self::NonFinite => f.write_str("non-finite wavelength or intensity"),
            Self::NoPeaksDetected => f.write_str("no peaks detected"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SampleFailure {
    pub sample_index: usize,
    pub source_id: String,
    pub reason: SampleFailureReason,
}

/// Counts of what happened to each input of a batch
#[derive(Debug, Default, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct BatchSummary {
    pub inputs: usize,
    /// Samples that were read, the detection rate denominator
    pub total_samples: usize,
    pub samples_with_peaks: usize,
    pub peak_count: usize,
    /// Malformed lines skipped across all samples
    pub skipped_records: usize,
    pub failures: Vec<SampleFailure>,
}

impl BatchSummary {
    /// Inputs that were excluded from the batch
    pub fn excluded(&self) -> usize {
        self.inputs - self.total_samples
    }
}

impl fmt::Display for BatchSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} inputs, {} samples read ({} excluded), {} with peaks, {} peaks, {} skipped records",
            self.inputs,
            self.total_samples,
            self.excluded(),
            self.samples_with_peaks,
            self.peak_count,
            self.skipped_records
        )
    }
}

/// Errors that stop the aggregation stage of a batch
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AnalysisError {
    #[error("None of the inputs could be read")]
    NoSamples,
    #[error("No peaks were detected in any of the {samples} samples")]
    NoPeaksDetected { samples: usize },
    #[error("Failed to cluster peaks: {0}")]
    Clustering(#[from] ClusteringError),
}

/// The complete outcome of a batch analysis
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct AnalysisReport {
    pub config: AnalysisConfig,
    pub summary: BatchSummary,
    pub groups: PeakGroups,
    /// The principal groups in ascending wavelength order
    pub principal: Vec<GroupId>,
    pub statistics: StatisticsTable,
}

impl AnalysisReport {
    /// One `label: mean ± U nm (rate %)` line per principal group
    pub fn console_summary(&self) -> String {
        self.statistics
            .principal()
            .map(|row| {
                format!(
                    "{}: {:.3} ± {:.3} nm ({:.1} %)",
                    row.label,
                    row.wl_mean_nm,
                    row.wl_expanded_uncertainty_nm,
                    row.detection_rate_pct
                )
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    #[cfg(feature = "serde")]
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    #[cfg(feature = "serde")]
    pub fn write_json<W: std::io::Write>(&self, writer: W) -> serde_json::Result<()> {
        serde_json::to_writer_pretty(writer, self)
    }
}

/// A peak found while inspecting a single spectrum
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct InspectedPeak {
    pub index: usize,
    pub wavelength_nm: f64,
    pub intensity: f64,
    pub prominence: f64,
    pub color_band: ColorBand,
}

/// What detection produced for one input
#[derive(Debug)]
struct SampleOutcome {
    peaks: Vec<PeakRecord>,
    skipped: usize,
    failure: Option<SampleFailure>,
}

impl SampleOutcome {
    fn counts_as_sample(&self) -> bool {
        match &self.failure {
            Some(failure) => failure.reason.counts_as_sample(),
            None => true,
        }
    }
}

// Can't inline cfg-if
cfg_if::cfg_if! {
    if #[cfg(feature = "parallelism")] {
        fn map_samples<T, F>(inputs: &[T], f: F) -> Vec<SampleOutcome>
        where
            T: Sync,
            F: Fn(usize, &T) -> SampleOutcome + Sync + Send,
        {
            inputs.par_iter().enumerate().map(|(i, x)| f(i, x)).collect()
        }
    } else {
        fn map_samples<T, F>(inputs: &[T], f: F) -> Vec<SampleOutcome>
        where
            F: Fn(usize, &T) -> SampleOutcome,
        {
            inputs.iter().enumerate().map(|(i, x)| f(i, x)).collect()
        }
    }
}

/// Runs the whole pipeline under one [`AnalysisConfig`]
#[derive(Debug, Clone)]
pub struct Analyzer {
    config: AnalysisConfig,
    picker: PeakPicker,
}

impl Default for Analyzer {
    fn default() -> Self {
        Self::new(AnalysisConfig::default())
    }
}

impl Analyzer {
    pub fn new(config: AnalysisConfig) -> Self {
        let picker = config.picker();
        Self { config, picker }
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    /// List every peak of one spectrum along with its prominence
    pub fn inspect(&self, spectrum: &Spectrum) -> Vec<InspectedPeak> {
        let wavelength_nm = spectrum.wavelength_nm();
        let intensity = spectrum.intensity();
        self.picker
            .detect_with_prominences(intensity)
            .into_iter()
            .map(|p| InspectedPeak {
                index: p.index,
                wavelength_nm: wavelength_nm[p.index],
                intensity: intensity[p.index],
                prominence: p.prominence,
                color_band: ColorBand::from_wavelength(wavelength_nm[p.index]),
            })
            .collect()
    }

    fn detect(
        &self,
        sample_index: usize,
        source_id: &str,
        spectrum: &Spectrum,
        skipped: usize,
    ) -> SampleOutcome {
        let picked = if spectrum.is_finite() {
            self.picker
                .pick_peaks(spectrum, sample_index, source_id)
                .map_err(SampleFailureReason::from)
        } else {
            Err(SampleFailureReason::NonFinite)
        };
        match picked {
            Ok(peaks) => SampleOutcome {
                peaks,
                skipped,
                failure: None,
            },
            Err(reason) => {
                warn!("{source_id}: {reason}");
                SampleOutcome {
                    peaks: Vec::new(),
                    skipped,
                    failure: Some(SampleFailure {
                        sample_index,
                        source_id: source_id.to_string(),
                        reason,
                    }),
                }
            }
        }
    }

    /// Analyze spectra that are already in memory, `samples[i]` becoming sample `i`
    pub fn analyze(&self, samples: &[Sample]) -> Result<AnalysisReport, AnalysisError> {
        let outcomes = map_samples(samples, |i, sample| {
            self.detect(i, &sample.source_id, &sample.spectrum, 0)
        });
        self.aggregate(outcomes)
    }

    /// Load and analyze each file, `paths[i]` becoming sample `i`.
    ///
    /// Files that cannot be read, or that hold no valid records, are excluded.
    pub fn analyze_files<P: AsRef<Path> + Sync>(
        &self,
        paths: &[P],
    ) -> Result<AnalysisReport, AnalysisError> {
        let reader = self.config.reader();
        let outcomes = map_samples(paths, |i, path| {
            let path = path.as_ref();
            let source_id = path
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_else(|| path.display().to_string());
            match reader.read_file(path) {
                Ok(report) => self.detect(i, &source_id, &report.spectrum, report.skipped_count()),
                Err(err) => {
                    warn!("Excluding {source_id}: {err}");
                    SampleOutcome {
                        peaks: Vec::new(),
                        skipped: 0,
                        failure: Some(SampleFailure {
                            sample_index: i,
                            source_id,
                            reason: err.into(),
                        }),
                    }
                }
            }
        });
        self.aggregate(outcomes)
    }

    fn aggregate(&self, outcomes: Vec<SampleOutcome>) -> Result<AnalysisReport, AnalysisError> {
        let mut summary = BatchSummary {
            inputs: outcomes.len(),
            ..Default::default()
        };
        let mut peaks = Vec::new();
        for outcome in outcomes {
            if outcome.counts_as_sample() {
                summary.total_samples += 1;
            }
            if !outcome.peaks.is_empty() {
                summary.samples_with_peaks += 1;
            }
            summary.skipped_records += outcome.skipped;
            summary.failures.extend(outcome.failure);
            peaks.extend(outcome.peaks);
        }
        summary.peak_count = peaks.len();
        info!("{summary}");

        if summary.total_samples == 0 {
            return Err(AnalysisError::NoSamples);
        }
        if peaks.is_empty() {
            return Err(AnalysisError::NoPeaksDetected {
                samples: summary.total_samples,
            });
        }

        let mut groups = cluster_peaks(peaks, self.config.tolerance_nm, self.config.clustering)?;
        let principal = select_principal(&mut groups, summary.total_samples, self.config.selection);
        let statistics = StatisticsTable::from_groups(&groups, summary.total_samples);

        Ok(AnalysisReport {
            config: self.config.clone(),
            summary,
            groups,
            principal,
            statistics,
        })
    }
}

#[cfg(test)]
mod test {
    use std::fs;
    use std::path::PathBuf;

    use super::*;

    /// A visible spectrum with three emission lines on a flat baseline
    fn synthetic_spectrum(i: usize, lines: &[(f64, f64)]) -> Spectrum {
        let wavelength: Vec<f64> = (0..=680).map(|k| 380.0 + k as f64 * 0.5).collect();
        let shift = ((i * 37) % 41) as f64 / 10.0 - 2.0;
        let intensity = wavelength
            .iter()
            .map(|x| {
                lines
                    .iter()
                    .map(|(center, amp)| amp * (-(x - center - shift).powi(2) / 8.0).exp())
                    .sum::<f64>()
                    + 1.0
            })
            .collect();
        Spectrum::new(wavelength, intensity).unwrap()
    }

    fn rgb_samples(n: usize) -> Vec<Sample> {
        (0..n)
            .map(|i| {
                Sample::new(
                    format!("spectrum{:03}.txt", i + 1),
                    synthetic_spectrum(i, &[(450.0, 60.0), (530.0, 90.0), (610.0, 75.0)]),
                )
            })
            .collect()
    }

    #[test_log::test]
    fn test_three_principal_lines() {
        let report = Analyzer::default().analyze(&rgb_samples(100)).unwrap();
        assert_eq!(report.summary.total_samples, 100);
        assert_eq!(report.summary.peak_count, 300);
        assert!(report.summary.failures.is_empty());
        assert_eq!(report.groups.len(), 3);
        assert_eq!(report.principal, vec![GroupId(1), GroupId(2), GroupId(3)]);

        let bands: Vec<ColorBand> = report.statistics.iter().map(|r| r.color_band).collect();
        assert_eq!(bands, vec![ColorBand::Blue, ColorBand::Green, ColorBand::Red]);
        for row in report.statistics.iter() {
            assert!(row.is_principal);
            assert_eq!(row.detection_count, 100);
            assert_eq!(row.detection_rate_pct, 100.0);
            assert!(row.wl_std_nm > 0.0 && row.wl_std_nm < 2.0);
        }
        let summary = report.console_summary();
        assert_eq!(summary.lines().count(), 3);
        assert!(summary.starts_with("RGB-1 (Blue): 4"), "{summary}");
    }

    #[test]
    fn test_empty_samples_still_count() {
        let mut samples = rgb_samples(9);
        let flat = Spectrum::new(vec![400.0, 401.0, 402.0], vec![1.0, 1.0, 1.0]).unwrap();
        samples.push(Sample::new("flat.txt", flat));
        let report = Analyzer::default().analyze(&samples).unwrap();
        assert_eq!(report.summary.inputs, 10);
        assert_eq!(report.summary.total_samples, 10);
        assert_eq!(report.summary.samples_with_peaks, 9);
        assert_eq!(
            report.summary.failures,
            vec![SampleFailure {
                sample_index: 9,
                source_id: "flat.txt".into(),
                reason: SampleFailureReason::NoPeaksDetected
            }]
        );
        for row in report.statistics.iter() {
            assert_eq!(row.detection_rate_pct, 90.0);
        }
    }

    #[test_log::test]
    fn test_non_finite_sample_is_excluded() {
        let mut samples = rgb_samples(2);
        let broken = Spectrum::new(
            vec![448.0, 449.0, f64::NAN, 451.0, 452.0],
            vec![1.0, 1.0, 50.0, 1.0, 1.0],
        )
        .unwrap();
        samples.push(Sample::new("broken.txt", broken));

        let report = Analyzer::default().analyze(&samples).unwrap();
        assert_eq!(report.summary.inputs, 3);
        assert_eq!(report.summary.total_samples, 2);
        assert_eq!(report.summary.excluded(), 1);
        assert_eq!(
            report.summary.failures,
            vec![SampleFailure {
                sample_index: 2,
                source_id: "broken.txt".into(),
                reason: SampleFailureReason::NonFinite
            }]
        );
        assert_eq!(report.groups.len(), 3);
        for row in report.statistics.iter() {
            assert_eq!(row.detection_rate_pct, 100.0);
        }
    }

    #[test]
    fn test_aggregation_errors() {
        let analyzer = Analyzer::default();
        assert_eq!(analyzer.analyze(&[]), Err(AnalysisError::NoSamples));

        let flat = Spectrum::new(vec![400.0, 401.0, 402.0], vec![1.0, 1.0, 1.0]).unwrap();
        let samples = vec![Sample::new("a", flat.clone()), Sample::new("b", flat)];
        assert_eq!(
            analyzer.analyze(&samples),
            Err(AnalysisError::NoPeaksDetected { samples: 2 })
        );

        let bad = Analyzer::new(AnalysisConfig::default().tolerance_nm(-1.0));
        assert_eq!(
            bad.analyze(&rgb_samples(2)),
            Err(AnalysisError::Clustering(ClusteringError::InvalidTolerance(-1.0)))
        );
    }

    #[test]
    fn test_inspect() {
        let spectrum = synthetic_spectrum(0, &[(450.0, 60.0), (530.0, 90.0), (610.0, 75.0)]);
        let peaks = Analyzer::default().inspect(&spectrum);
        assert_eq!(peaks.len(), 3);
        assert_eq!(peaks[1].color_band, ColorBand::Green);
        assert!((peaks[1].prominence - 90.0).abs() < 0.5);
        assert!(peaks.windows(2).all(|w| w[0].index < w[1].index));
    }

    fn fixture_paths() -> Vec<PathBuf> {
        let mut paths: Vec<PathBuf> = fs::read_dir("test/data/visible")
            .unwrap()
            .map(|entry| entry.unwrap().path())
            .collect();
        paths.sort();
        paths
    }

    #[test_log::test]
    fn test_analyze_fixture_files() {
        let mut paths = fixture_paths();
        assert_eq!(paths.len(), 10);
        paths.push(PathBuf::from("test/data/visible/missing.txt"));

        let report = Analyzer::default().analyze_files(&paths).unwrap();
        assert_eq!(report.summary.inputs, 11);
        assert_eq!(report.summary.total_samples, 10);
        assert_eq!(report.summary.excluded(), 1);
        assert!(matches!(
            report.summary.failures[0].reason,
            SampleFailureReason::Unreadable(_)
        ));

        let principal: Vec<_> = report.statistics.principal().collect();
        assert_eq!(principal.len(), 3);
        for (row, expected) in principal.iter().zip([450.0, 530.0, 610.0]) {
            assert!((row.wl_mean_nm - expected).abs() < 2.0, "{row:?}");
            assert_eq!(row.detection_rate_pct, 100.0);
        }
    }

    fn batch_paths() -> Vec<&'static str> {
        vec![
            "test/data/batch/header_only.txt",
            "test/data/batch/one_bad_line.txt",
            "test/data/batch/two_bad_lines.txt",
            "test/data/visible/spectrum001.txt",
        ]
    }

    #[test_log::test]
    fn test_lenient_batch_exclusions() {
        let report = Analyzer::default().analyze_files(&batch_paths()).unwrap();
        assert_eq!(report.summary.inputs, 4);
        assert_eq!(report.summary.total_samples, 3);
        assert_eq!(report.summary.excluded(), 1);
        assert_eq!(report.summary.samples_with_peaks, 3);
        assert_eq!(report.summary.skipped_records, 3);
        assert_eq!(
            report.summary.failures,
            vec![SampleFailure {
                sample_index: 0,
                source_id: "header_only.txt".into(),
                reason: SampleFailureReason::EmptySpectrum
            }]
        );
        for row in report.statistics.principal() {
            assert_eq!(row.detection_count, 3);
            assert_eq!(row.detection_rate_pct, 100.0);
        }
    }

    #[test_log::test]
    fn test_strict_batch_exclusions() {
        let analyzer = Analyzer::new(AnalysisConfig::default().strict(true));
        let report = analyzer.analyze_files(&batch_paths()).unwrap();
        assert_eq!(report.summary.inputs, 4);
        assert_eq!(report.summary.total_samples, 1);
        assert_eq!(report.summary.excluded(), 3);
        assert_eq!(report.summary.skipped_records, 0);

        let reasons: Vec<_> = report
            .summary
            .failures
            .iter()
            .map(|f| (f.sample_index, f.reason.clone()))
            .collect();
        assert_eq!(reasons.len(), 3);
        assert_eq!(reasons[0], (0, SampleFailureReason::EmptySpectrum));
        for (index, reason) in &reasons[1..] {
            assert!(
                matches!(reason, SampleFailureReason::Unreadable(msg) if msg.contains("Line")),
                "sample {index}: {reason:?}"
            );
        }
        for row in report.statistics.principal() {
            assert_eq!(row.detection_rate_pct, 100.0);
        }
    }

    #[test]
    fn test_thorlabs_preset_reads_vendor_csv() {
        let config = AnalysisConfig::thorlabs();
        assert_eq!(config.unit, WavelengthUnit::Nanometers);
        assert_eq!(config.distance, Some(10));
        let report = Analyzer::new(config)
            .analyze_files(&["test/data/thorlabs/sample001.csv"])
            .unwrap();
        assert_eq!(report.summary.total_samples, 1);
        assert_eq!(report.principal.len(), 3);
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_config_json() {
        let config = AnalysisConfig::thorlabs().selection(SelectionPolicy::TopThree);
        let text = config.to_json().unwrap();
        let restored = AnalysisConfig::from_json(text.as_bytes()).unwrap();
        assert_eq!(config, restored);

        let partial = AnalysisConfig::from_json(r#"{"tolerance_nm": 2.5}"#.as_bytes()).unwrap();
        assert_eq!(partial, AnalysisConfig::default().tolerance_nm(2.5));
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_report_json() {
        let report = Analyzer::default().analyze(&rgb_samples(5)).unwrap();
        let value: serde_json::Value = serde_json::from_str(&report.to_json().unwrap()).unwrap();
        assert_eq!(value["summary"]["total_samples"], 5);
        assert_eq!(value["statistics"]["rows"].as_array().unwrap().len(), 3);
        assert_eq!(value["statistics"]["rows"][0]["label"], "RGB-1 (Blue)");
    }
}
