//! Descriptive statistics over the members of each [`PeakGroup`].
//!
//! Dispersion uses the sample standard deviation (divisor `n - 1`) and the
//! expanded uncertainty is `1.96 * SEM`, a normal approximation rather than a
//! Student's t interval. Groups with a single member report zero dispersion and
//! set [`GroupStatistics::insufficient_samples`].
use std::io;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::clustering::{GroupId, PeakGroup, PeakGroups};
use crate::peak::ColorBand;

/// Coverage factor for a ~95% interval
pub const COVERAGE_FACTOR: f64 = 1.96;

/// The column names written by [`StatisticsTable::write_csv`]
pub const CSV_HEADER: [&str; 18] = [
    "group_id",
    "label",
    "color_band",
    "principal",
    "wl_mean_nm",
    "wl_std_nm",
    "wl_expanded_uncertainty_nm",
    "wl_sem_nm",
    "wl_min_nm",
    "wl_max_nm",
    "wl_range_nm",
    "int_mean",
    "int_std",
    "int_cv_pct",
    "int_min",
    "int_max",
    "detection_count",
    "detection_rate_pct",
];

/// Mean, sample standard deviation, minimum and maximum of a non-empty slice
#[derive(Debug, Default, Clone, Copy, PartialEq)]
struct Summary {
    mean: f64,
    std: f64,
    min: f64,
    max: f64,
}

impl Summary {
    fn of(values: &[f64]) -> Self {
        if values.is_empty() {
            return Self::default();
        }
        let n = values.len() as f64;
        let mean = values.iter().sum::<f64>() / n;
        let std = if values.len() > 1 {
            let ss: f64 = values.iter().map(|v| (v - mean).powi(2)).sum();
            (ss / (n - 1.0)).sqrt()
        } else {
            0.0
        };
        let (min, max) = values
            .iter()
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
                (lo.min(*v), hi.max(*v))
            });
        Self {
            mean,
            std,
            min,
            max,
        }
    }
}

/// The summary of one [`PeakGroup`]
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct GroupStatistics {
    pub group_id: GroupId,
    pub label: String,
    pub color_band: ColorBand,
    pub is_principal: bool,
    /// The number of peaks in the group
    pub n: usize,
    pub wl_mean_nm: f64,
    pub wl_std_nm: f64,
    pub wl_sem_nm: f64,
    pub wl_expanded_uncertainty_nm: f64,
    pub wl_min_nm: f64,
    pub wl_max_nm: f64,
    pub wl_range_nm: f64,
    pub int_mean: f64,
    pub int_std: f64,
    pub int_cv_pct: f64,
    pub int_min: f64,
    pub int_max: f64,
    /// Distinct samples contributing to the group
    pub detection_count: usize,
    pub detection_rate_pct: f64,
    /// Fewer than two peaks, so the dispersion fields are zero
    pub insufficient_samples: bool,
}

/// Compute the [`GroupStatistics`] for `group` out of `total_samples` samples.
pub fn aggregate(group: &PeakGroup, total_samples: usize) -> GroupStatistics {
    let wavelengths: Vec<f64> = group.peaks.iter().map(|p| p.wavelength_nm).collect();
    let intensities: Vec<f64> = group.peaks.iter().map(|p| p.intensity).collect();
    let n = wavelengths.len();
    let wl = Summary::of(&wavelengths);
    let int = Summary::of(&intensities);

    let wl_sem_nm = if n > 1 { wl.std / (n as f64).sqrt() } else { 0.0 };
    let int_cv_pct = if int.mean > 0.0 {
        int.std / int.mean * 100.0
    } else {
        0.0
    };

    GroupStatistics {
        group_id: group.id,
        label: group.label(),
        color_band: group.color_band,
        is_principal: group.is_principal,
        n,
        wl_mean_nm: wl.mean,
        wl_std_nm: wl.std,
        wl_sem_nm,
        wl_expanded_uncertainty_nm: COVERAGE_FACTOR * wl_sem_nm,
        wl_min_nm: wl.min,
        wl_max_nm: wl.max,
        wl_range_nm: wl.max - wl.min,
        int_mean: int.mean,
        int_std: int.std,
        int_cv_pct,
        int_min: int.min,
        int_max: int.max,
        detection_count: group.sample_count,
        detection_rate_pct: group.detection_rate_pct(total_samples),
        insufficient_samples: n < 2,
    }
}

/// One [`GroupStatistics`] row per group, principal groups first and each tier
/// ordered by ascending mean wavelength.
#[derive(Debug, Default, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct StatisticsTable {
    pub rows: Vec<GroupStatistics>,
}

impl StatisticsTable {
    pub fn from_groups(groups: &PeakGroups, total_samples: usize) -> Self {
        let mut rows: Vec<GroupStatistics> =
            groups.iter().map(|g| aggregate(g, total_samples)).collect();
        rows.sort_by(|a, b| {
            b.is_principal
                .cmp(&a.is_principal)
                .then_with(|| a.wl_mean_nm.total_cmp(&b.wl_mean_nm))
        });
        Self { rows }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, GroupStatistics> {
        self.rows.iter()
    }

    pub fn principal(&self) -> impl Iterator<Item = &GroupStatistics> {
        self.rows.iter().filter(|r| r.is_principal)
    }

    /// Write the table as CSV with a [`CSV_HEADER`] line
    pub fn write_csv<W: io::Write>(&self, writer: W) -> csv::Result<()> {
        let mut writer = csv::Writer::from_writer(writer);
        writer.write_record(CSV_HEADER)?;
        for row in self.rows.iter() {
            writer.write_record([
                row.group_id.to_string(),
                row.label.clone(),
                row.color_band.to_string(),
                if row.is_principal { "yes" } else { "no" }.to_string(),
                format!("{:.4}", row.wl_mean_nm),
                format!("{:.4}", row.wl_std_nm),
                format!("{:.4}", row.wl_expanded_uncertainty_nm),
                format!("{:.4}", row.wl_sem_nm),
                format!("{:.4}", row.wl_min_nm),
                format!("{:.4}", row.wl_max_nm),
                format!("{:.4}", row.wl_range_nm),
                format!("{:.4}", row.int_mean),
                format!("{:.4}", row.int_std),
                format!("{:.2}", row.int_cv_pct),
                format!("{:.4}", row.int_min),
                format!("{:.4}", row.int_max),
                row.detection_count.to_string(),
                format!("{:.1}", row.detection_rate_pct),
            ])?;
        }
        writer.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::clustering::{cluster_peaks, ClusteringStrategy};
    use crate::peak::PeakRecord;
    use crate::selection::{select_principal, SelectionPolicy};

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
    }

    fn single_group(peaks: Vec<PeakRecord>) -> PeakGroup {
        let groups = cluster_peaks(peaks, 5.0, ClusteringStrategy::Hierarchical).unwrap();
        assert_eq!(groups.len(), 1);
        groups.into_vec().remove(0)
    }

    #[test]
    fn test_intensity_statistics() {
        let peaks = [10.0, 12.0, 11.0, 13.0]
            .into_iter()
            .enumerate()
            .map(|(i, y)| PeakRecord::new(i, "", 530.0 + i as f64 * 0.5, y))
            .collect();
        let stats = aggregate(&single_group(peaks), 4);
        assert_is_close!(stats.int_mean, 11.5, 1e-12, "int_mean");
        assert_is_close!(stats.int_std, 1.2910, 1e-4, "int_std");
        assert_is_close!(stats.int_cv_pct, 11.226, 1e-3, "int_cv_pct");
        assert_eq!(stats.int_min, 10.0);
        assert_eq!(stats.int_max, 13.0);

        assert_is_close!(stats.wl_mean_nm, 530.75, 1e-9, "wl_mean");
        assert_is_close!(stats.wl_range_nm, 1.5, 1e-9, "wl_range");
        let sem = stats.wl_std_nm / 2.0;
        assert_is_close!(stats.wl_sem_nm, sem, 1e-12, "wl_sem");
        assert_is_close!(stats.wl_expanded_uncertainty_nm, 1.96 * sem, 1e-12, "U");
        assert!(!stats.insufficient_samples);
        assert_eq!(stats.detection_rate_pct, 100.0);
    }

    #[test]
    fn test_single_member_floor() {
        let stats = aggregate(&single_group(vec![PeakRecord::new(0, "", 612.0, 40.0)]), 10);
        assert_eq!(stats.n, 1);
        assert_eq!(stats.wl_std_nm, 0.0);
        assert_eq!(stats.wl_sem_nm, 0.0);
        assert_eq!(stats.wl_expanded_uncertainty_nm, 0.0);
        assert_eq!(stats.int_cv_pct, 0.0);
        assert!(stats.insufficient_samples);
        assert_eq!(stats.detection_rate_pct, 10.0);
    }

    #[test]
    fn test_zero_mean_intensity_cv() {
        let peaks = vec![
            PeakRecord::new(0, "", 450.0, -1.0),
            PeakRecord::new(1, "", 450.5, 1.0),
        ];
        let stats = aggregate(&single_group(peaks), 2);
        assert_eq!(stats.int_cv_pct, 0.0);
    }

    #[test]
    fn test_repeated_sample_counts_once() {
        let peaks = vec![
            PeakRecord::new(0, "", 450.0, 1.0),
            PeakRecord::new(0, "", 450.4, 1.0),
            PeakRecord::new(1, "", 450.2, 1.0),
        ];
        let stats = aggregate(&single_group(peaks), 4);
        assert_eq!(stats.n, 3);
        assert_eq!(stats.detection_count, 2);
        assert_eq!(stats.detection_rate_pct, 50.0);
    }

    fn table() -> StatisticsTable {
        let mut peaks = Vec::new();
        for i in 0..4 {
            for (wl, y) in [(430.0, 5.0), (450.0, 50.0), (530.0, 40.0), (610.0, 45.0)] {
                if wl > 440.0 || i == 0 {
                    peaks.push(PeakRecord::new(i, "", wl, y));
                }
            }
        }
        let mut groups = cluster_peaks(peaks, 5.0, ClusteringStrategy::Hierarchical).unwrap();
        select_principal(&mut groups, 4, SelectionPolicy::OnePerBand);
        StatisticsTable::from_groups(&groups, 4)
    }

    #[test]
    fn test_two_tier_ordering() {
        let table = table();
        let order: Vec<(bool, f64)> = table
            .iter()
            .map(|r| (r.is_principal, r.wl_mean_nm))
            .collect();
        assert_eq!(
            order,
            vec![(true, 450.0), (true, 530.0), (true, 610.0), (false, 430.0)]
        );
        assert_eq!(table.rows[3].label, "Group 1");
        assert_eq!(table.rows[0].label, "RGB-1 (Blue)");
    }

    #[test]
    fn test_write_csv() {
        let mut buffer = Vec::new();
        table().write_csv(&mut buffer).unwrap();
        let text = String::from_utf8(buffer).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 5);
        assert_eq!(lines[0], CSV_HEADER.join(","));
        assert!(lines[1].starts_with("2,RGB-1 (Blue),Blue,yes,450.0000,"));
        assert!(lines[4].starts_with("1,Group 1,Blue,no,430.0000,"));
        assert!(lines[4].ends_with(",1,25.0"));
    }
}
