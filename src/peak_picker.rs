//! Local extremum detection filtered by topographic prominence.
//!
//! A candidate peak is a sample strictly greater than its neighbours, where a
//! flat run of equal values counts as one candidate located at the middle of
//! the run. Each candidate's prominence is its height above the higher of the
//! two lowest points reached before the signal climbs above the candidate on
//! either side, or the signal ends.
//!
//! ```
//! use osapeaks::PeakPicker;
//!
//! let signal = [0.0, 1.0, 5.0, 1.0, 0.0, 0.0, 1.0, 8.0, 1.0, 0.0];
//! let picker = PeakPicker::builder().prominence(3.0).build();
//! assert_eq!(picker.detect(&signal), vec![2, 7]);
//! ```
use std::cmp::Ordering;
use std::fmt;

use log::debug;
use thiserror::Error;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::peak::PeakRecord;
use crate::spectrum::Spectrum;

/// All the ways peak picking can fail
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PeakPickerError {
    #[error("No peaks satisfied the prominence and height criteria")]
    NoPeaksDetected,
}

/// A retained extremum and the prominence it was retained with
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PickedPeak {
    pub index: usize,
    pub prominence: f64,
}

impl fmt::Display for PickedPeak {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PickedPeak({}, {})", self.index, self.prominence)
    }
}

/// A prominence-based peak picker for spectra
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PeakPicker {
    /// The minimum prominence a peak must have to be retained
    pub prominence: f64,
    /// The minimum index separation between retained peaks
    pub distance: Option<usize>,
    /// An absolute intensity floor applied before computing prominences
    pub height: Option<f64>,
    /// Detect minima instead of maxima
    pub find_valleys: bool,
}

impl Default for PeakPicker {
    fn default() -> Self {
        Self {
            prominence: 5.0,
            distance: None,
            height: None,
            find_valleys: false,
        }
    }
}

/// A builder for configuring [`PeakPicker`]
#[derive(Debug, Clone, Default)]
pub struct PeakPickerBuilder {
    picker: PeakPicker,
}

impl PeakPickerBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn prominence(&mut self, prominence: f64) -> &mut Self {
        self.picker.prominence = prominence;
        self
    }

    pub fn distance(&mut self, distance: Option<usize>) -> &mut Self {
        self.picker.distance = distance;
        self
    }

    pub fn height(&mut self, height: Option<f64>) -> &mut Self {
        self.picker.height = height;
        self
    }

    pub fn find_valleys(&mut self, find_valleys: bool) -> &mut Self {
        self.picker.find_valleys = find_valleys;
        self
    }

    pub fn build(&self) -> PeakPicker {
        self.picker.clone()
    }
}

impl From<PeakPickerBuilder> for PeakPicker {
    fn from(value: PeakPickerBuilder) -> Self {
        value.build()
    }
}

/// Find the indices of strict local maxima, resolving plateaus to the middle
/// of the run of equal values. The first and last samples are never maxima.
pub fn local_maxima(signal: &[f64]) -> Vec<usize> {
    let n = signal.len();
    let mut maxima = Vec::new();
    if n < 3 {
        return maxima;
    }
    let mut i = 1;
    let i_max = n - 1;
    while i < i_max {
        if signal[i - 1] < signal[i] {
            let mut i_ahead = i + 1;
            while i_ahead < i_max && signal[i_ahead] == signal[i] {
                i_ahead += 1;
            }
            if signal[i_ahead] < signal[i] {
                let left = i;
                let right = i_ahead - 1;
                maxima.push((left + right) / 2);
                i = i_ahead;
                continue;
            }
        }
        i += 1;
    }
    maxima
}

/// Compute the prominence of the point at `peak` in `signal`.
///
/// Walks outward in both directions while the signal does not exceed the
/// peak, tracking the lowest point reached on each side.
pub fn prominence_of(signal: &[f64], peak: usize) -> f64 {
    let peak_val = signal[peak];

    let mut left_min = peak_val;
    let mut i = peak;
    loop {
        let v = signal[i];
        if v > peak_val {
            break;
        }
        if v < left_min {
            left_min = v;
        }
        if i == 0 {
            break;
        }
        i -= 1;
    }

    let mut right_min = peak_val;
    for v in signal[peak..].iter().copied() {
        if v > peak_val {
            break;
        }
        if v < right_min {
            right_min = v;
        }
    }

    peak_val - left_min.max(right_min)
}

/// Compute the prominence of each index in `peaks`
pub fn peak_prominences(signal: &[f64], peaks: &[usize]) -> Vec<f64> {
    peaks.iter().map(|p| prominence_of(signal, *p)).collect()
}

/// Greedily keep the most prominent peaks so that no two retained peaks are
/// closer than `distance` samples. Returns the survivors in index order.
fn enforce_distance(peaks: Vec<PickedPeak>, distance: usize) -> Vec<PickedPeak> {
    if distance <= 1 || peaks.len() < 2 {
        return peaks;
    }
    let mut ranked = peaks;
    ranked.sort_by(|a, b| {
        b.prominence
            .partial_cmp(&a.prominence)
            .unwrap_or(Ordering::Equal)
            .then(a.index.cmp(&b.index))
    });

    let mut kept: Vec<PickedPeak> = Vec::with_capacity(ranked.len());
    for cand in ranked {
        if kept
            .iter()
            .all(|k| k.index.abs_diff(cand.index) >= distance)
        {
            kept.push(cand);
        }
    }
    kept.sort_by_key(|p| p.index);
    kept
}

impl PeakPicker {
    pub fn new(
        prominence: f64,
        distance: Option<usize>,
        height: Option<f64>,
        find_valleys: bool,
    ) -> Self {
        Self {
            prominence,
            distance,
            height,
            find_valleys,
        }
    }

    pub fn builder() -> PeakPickerBuilder {
        PeakPickerBuilder::new()
    }

    fn detect_maxima(&self, signal: &[f64]) -> Vec<PickedPeak> {
        let mut candidates = local_maxima(signal);
        if let Some(height) = self.height {
            candidates.retain(|i| signal[*i] >= height);
        }

        let peaks: Vec<PickedPeak> = candidates
            .into_iter()
            .map(|index| PickedPeak {
                index,
                prominence: prominence_of(signal, index),
            })
            .filter(|p| p.prominence >= self.prominence)
            .collect();

        match self.distance {
            Some(distance) => enforce_distance(peaks, distance),
            None => peaks,
        }
    }

    /// Find the peaks of `intensity_array` along with their prominences,
    /// in ascending index order.
    ///
    /// When [`PeakPicker::find_valleys`] is set the signal is negated first, so
    /// [`PeakPicker::height`] then bounds the negated intensity.
    pub fn detect_with_prominences(&self, intensity_array: &[f64]) -> Vec<PickedPeak> {
        if self.find_valleys {
            let negated: Vec<f64> = intensity_array.iter().map(|y| -y).collect();
            self.detect_maxima(&negated)
        } else {
            self.detect_maxima(intensity_array)
        }
    }

    /// Find the indices of the peaks of `intensity_array`, in ascending order
    pub fn detect(&self, intensity_array: &[f64]) -> Vec<usize> {
        self.detect_with_prominences(intensity_array)
            .into_iter()
            .map(|p| p.index)
            .collect()
    }

    /// Pick peaks from `spectrum`, labeling each with its sample of origin.
    pub fn pick_peaks(
        &self,
        spectrum: &Spectrum,
        sample_index: usize,
        source_id: &str,
    ) -> Result<Vec<PeakRecord>, PeakPickerError> {
        let peaks: Vec<PeakRecord> = self
            .detect(spectrum.intensity())
            .into_iter()
            .map(|i| {
                PeakRecord::new(
                    sample_index,
                    source_id,
                    spectrum.wavelength_nm()[i],
                    spectrum.intensity()[i],
                )
            })
            .collect();
        debug!("{source_id}: {} peaks", peaks.len());
        if peaks.is_empty() {
            Err(PeakPickerError::NoPeaksDetected)
        } else {
            Ok(peaks)
        }
    }
}

/// A convenience function that uses the default peak picking configuration
/// with the given `prominence` to pick peaks from a spectrum.
pub fn pick_peaks(
    spectrum: &Spectrum,
    prominence: f64,
) -> Result<Vec<PeakRecord>, PeakPickerError> {
    PeakPicker::builder()
        .prominence(prominence)
        .build()
        .pick_peaks(spectrum, 0, "")
}

#[cfg(test)]
mod test {
    use super::*;
    use rstest::rstest;

    const SCENARIO: [f64; 10] = [0.0, 1.0, 5.0, 1.0, 0.0, 0.0, 1.0, 8.0, 1.0, 0.0];

    #[rstest]
    #[case(3.0, vec![2, 7])]
    #[case(5.0, vec![2, 7])]
    #[case(6.0, vec![7])]
    #[case(9.0, vec![])]
    fn test_prominence_threshold(#[case] prominence: f64, #[case] expected: Vec<usize>) {
        let picker = PeakPicker::builder().prominence(prominence).build();
        assert_eq!(picker.detect(&SCENARIO), expected);
    }

    #[test]
    fn test_prominences_exact() {
        let signal = [1.0, 3.0, 2.0, 6.0, 4.0, 5.0, 0.0];
        let peaks = local_maxima(&signal);
        assert_eq!(peaks, vec![1, 3, 5]);
        // 3 sits above the edge (1) and the valley at 2 before 6 rises past it,
        // 6 spans the whole signal and 5 only climbs 1 above the valley at 4
        assert_eq!(peak_prominences(&signal, &peaks), vec![1.0, 5.0, 1.0]);
    }

    #[test]
    fn test_plateau_midpoint() {
        let signal = [0.0, 2.0, 2.0, 2.0, 0.0, 1.0, 1.0, 0.0];
        assert_eq!(local_maxima(&signal), vec![2, 5]);
        // A plateau that runs into a higher value is not a maximum
        let signal = [0.0, 2.0, 2.0, 3.0, 0.0];
        assert_eq!(local_maxima(&signal), vec![3]);
    }

    #[test]
    fn test_edges_are_not_peaks() {
        let signal = [9.0, 1.0, 0.0, 1.0, 9.0];
        assert!(local_maxima(&signal).is_empty());
        assert!(local_maxima(&[1.0, 2.0]).is_empty());
    }

    #[test]
    fn test_height_prefilter() {
        let picker = PeakPicker::builder()
            .prominence(1.0)
            .height(Some(6.0))
            .build();
        assert_eq!(picker.detect(&SCENARIO), vec![7]);
    }

    #[test]
    fn test_distance_keeps_most_prominent() {
        let signal = [0.0, 4.0, 0.0, 10.0, 0.0, 3.0, 0.0, 0.0, 0.0, 7.0, 0.0];
        let picker = PeakPicker::builder()
            .prominence(1.0)
            .distance(Some(3))
            .build();
        // 1 and 5 are within 3 samples of 3, which is more prominent
        assert_eq!(picker.detect(&signal), vec![3, 9]);

        let picker = PeakPicker::builder()
            .prominence(1.0)
            .distance(Some(7))
            .build();
        assert_eq!(picker.detect(&signal), vec![3]);
    }

    #[test]
    fn test_valleys() {
        let signal = [5.0, 4.0, 1.0, 4.0, 5.0, 2.0, 5.0];
        let picker = PeakPicker::builder()
            .prominence(2.0)
            .find_valleys(true)
            .build();
        let valleys = picker.detect_with_prominences(&signal);
        assert_eq!(valleys.iter().map(|p| p.index).collect::<Vec<_>>(), vec![2, 5]);
        assert_eq!(valleys[0].prominence, 4.0);
        assert_eq!(valleys[1].prominence, 3.0);
    }

    #[test]
    fn test_deterministic() {
        let signal: Vec<f64> = (0..500)
            .map(|i| ((i as f64) * 0.1).sin() * 10.0 + ((i as f64) * 0.73).cos())
            .collect();
        let picker = PeakPicker::builder().prominence(2.0).distance(Some(5)).build();
        let first = picker.detect(&signal);
        assert!(!first.is_empty());
        assert_eq!(first, picker.detect(&signal));
        assert!(first.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_pick_peaks_no_peaks() {
        let spectrum = Spectrum::new(vec![400.0, 401.0, 402.0], vec![1.0, 1.0, 1.0]).unwrap();
        assert_eq!(
            pick_peaks(&spectrum, 1.0),
            Err(PeakPickerError::NoPeaksDetected)
        );
    }

    #[test]
    fn test_pick_peaks_records() {
        let wavelength: Vec<f64> = (0..SCENARIO.len()).map(|i| 500.0 + i as f64).collect();
        let spectrum = Spectrum::new(wavelength, SCENARIO.to_vec()).unwrap();
        let picker = PeakPicker::builder().prominence(3.0).build();
        let peaks = picker.pick_peaks(&spectrum, 4, "spectrum005.txt").unwrap();
        assert_eq!(peaks.len(), 2);
        assert_eq!(peaks[0].wavelength_nm, 502.0);
        assert_eq!(peaks[1].intensity, 8.0);
        assert!(peaks.iter().all(|p| p.sample_index == 4));
    }
}
