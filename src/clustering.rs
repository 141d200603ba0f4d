//! Group peaks detected across many samples into lines that correspond to the
//! same physical feature.
//!
//! Two strategies implement [`PeakClusterer`]:
//!
//! - [`HierarchicalClusterer`] runs average-linkage agglomerative clustering on
//!   the wavelengths and cuts the dendrogram at the tolerance. On a line,
//!   average-linkage clusters are always contiguous runs of the sorted values and
//!   the linkage distance between two neighbouring runs is the difference of
//!   their means, so the exact dendrogram is built by repeatedly merging the
//!   closest pair of neighbouring runs through a heap in `O(n log n)`.
//! - [`BinnedClusterer`] drops every peak into a fixed-width bin anchored half
//!   a tolerance below the lowest wavelength of the run. This is linear time but
//!   only approximates the hierarchical partition: two peaks a hair apart can
//!   land on opposite sides of a bin edge, and a wide spread of jittered peaks
//!   can be cut in two where the hierarchical method would keep it whole.
//!
//! [`ClusteringStrategy`] picks one of the two once per call.
use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap, HashSet};
use std::fmt;

use log::{debug, info};
use thiserror::Error;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::peak::{ColorBand, PeakRecord};

/// The peak count above which [`ClusteringStrategy::Auto`] switches to binning
pub const DEFAULT_HIERARCHICAL_LIMIT: usize = 10_000;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ClusteringError {
    #[error("No peaks were detected in any sample")]
    NoPeaksDetected,
    #[error("The clustering tolerance must be a positive finite number, got {0}")]
    InvalidTolerance(f64),
    #[error("Peak wavelengths must be finite")]
    NonFiniteWavelength,
}

/// Assign each wavelength a cluster label.
///
/// Labels are only meaningful for equality; two inputs share a label exactly
/// when they belong to the same cluster.
pub trait PeakClusterer {
    fn assign(&self, wavelengths: &[f64], tolerance_nm: f64) -> Vec<usize>;
}

/// A merge candidate between the run starting at `left` and the one at `right`
#[derive(Debug, Clone, Copy)]
struct MergeCandidate {
    distance: f64,
    left: usize,
    right: usize,
    left_stamp: u32,
    right_stamp: u32,
}

impl PartialEq for MergeCandidate {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for MergeCandidate {}

impl PartialOrd for MergeCandidate {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for MergeCandidate {
    // Reversed so the max-heap pops the closest, then leftmost, pair first
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .distance
            .total_cmp(&self.distance)
            .then_with(|| other.left.cmp(&self.left))
    }
}

#[derive(Debug, Clone)]
struct Run {
    sum: f64,
    count: usize,
    end: usize,
    prev: Option<usize>,
    next: Option<usize>,
    alive: bool,
    stamp: u32,
}

impl Run {
    fn mean(&self) -> f64 {
        self.sum / self.count as f64
    }
}

/// Exact average-linkage clustering cut at the tolerance distance
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct HierarchicalClusterer;

impl HierarchicalClusterer {
    fn candidate(runs: &[Run], left: usize, right: usize) -> MergeCandidate {
        MergeCandidate {
            distance: runs[right].mean() - runs[left].mean(),
            left,
            right,
            left_stamp: runs[left].stamp,
            right_stamp: runs[right].stamp,
        }
    }
}

impl PeakClusterer for HierarchicalClusterer {
    fn assign(&self, wavelengths: &[f64], tolerance_nm: f64) -> Vec<usize> {
        let n = wavelengths.len();
        let mut order: Vec<usize> = (0..n).collect();
        order.sort_by(|a, b| wavelengths[*a].total_cmp(&wavelengths[*b]).then(a.cmp(b)));

        let mut runs: Vec<Run> = order
            .iter()
            .enumerate()
            .map(|(pos, i)| Run {
                sum: wavelengths[*i],
                count: 1,
                end: pos,
                prev: pos.checked_sub(1),
                next: if pos + 1 < n { Some(pos + 1) } else { None },
                alive: true,
                stamp: 0,
            })
            .collect();

        let mut heap: BinaryHeap<MergeCandidate> = (1..n)
            .map(|pos| Self::candidate(&runs, pos - 1, pos))
            .collect();

        while let Some(cand) = heap.pop() {
            let (left, right) = (cand.left, cand.right);
            if !runs[left].alive
                || !runs[right].alive
                || runs[left].stamp != cand.left_stamp
                || runs[right].stamp != cand.right_stamp
            {
                continue;
            }
            // Average linkage heights never decrease, so nothing later can merge
            if cand.distance > tolerance_nm {
                break;
            }

            let absorbed = runs[right].clone();
            runs[right].alive = false;
            let merged = &mut runs[left];
            merged.sum += absorbed.sum;
            merged.count += absorbed.count;
            merged.end = absorbed.end;
            merged.next = absorbed.next;
            merged.stamp += 1;
            let prev = merged.prev;
            let next = merged.next;

            if let Some(next) = next {
                runs[next].prev = Some(left);
                heap.push(Self::candidate(&runs, left, next));
            }
            if let Some(prev) = prev {
                heap.push(Self::candidate(&runs, prev, left));
            }
        }

        let mut labels = vec![0; n];
        let mut start = if n > 0 { Some(0) } else { None };
        let mut label = 0;
        while let Some(pos) = start {
            let run = &runs[pos];
            for i in &order[pos..=run.end] {
                labels[*i] = label;
            }
            label += 1;
            start = run.next;
        }
        labels
    }
}

/// Fixed-width binning with the lowest wavelength in the middle of the first bin
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct BinnedClusterer;

impl PeakClusterer for BinnedClusterer {
    fn assign(&self, wavelengths: &[f64], tolerance_nm: f64) -> Vec<usize> {
        let lowest = wavelengths.iter().copied().fold(f64::INFINITY, f64::min);
        let origin = lowest - tolerance_nm / 2.0;
        wavelengths
            .iter()
            .map(|w| ((w - origin) / tolerance_nm).floor() as usize)
            .collect()
    }
}

/// Which [`PeakClusterer`] to use for a clustering pass
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum ClusteringStrategy {
    Hierarchical,
    Binned,
    /// Use [`ClusteringStrategy::Hierarchical`] below `threshold` peaks,
    /// [`ClusteringStrategy::Binned`] otherwise
    Auto { threshold: usize },
}

impl Default for ClusteringStrategy {
    fn default() -> Self {
        Self::Auto {
            threshold: DEFAULT_HIERARCHICAL_LIMIT,
        }
    }
}

impl ClusteringStrategy {
    /// Resolve [`ClusteringStrategy::Auto`] into a concrete strategy for `peak_count` peaks
    pub fn resolve(&self, peak_count: usize) -> ClusteringStrategy {
        match self {
            Self::Auto { threshold } => {
                if peak_count < *threshold {
                    Self::Hierarchical
                } else {
                    Self::Binned
                }
            }
            other => *other,
        }
    }
}

impl PeakClusterer for ClusteringStrategy {
    fn assign(&self, wavelengths: &[f64], tolerance_nm: f64) -> Vec<usize> {
        match self.resolve(wavelengths.len()) {
            Self::Binned => BinnedClusterer.assign(wavelengths, tolerance_nm),
            _ => HierarchicalClusterer.assign(wavelengths, tolerance_nm),
        }
    }
}

impl fmt::Display for ClusteringStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Hierarchical => f.write_str("hierarchical"),
            Self::Binned => f.write_str("binned"),
            Self::Auto { threshold } => write!(f, "auto({threshold})"),
        }
    }
}

/// The identifier of a [`PeakGroup`] within its [`PeakGroups`], starting at 1
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct GroupId(pub usize);

impl fmt::Display for GroupId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A set of peaks judged to come from the same spectral line
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PeakGroup {
    pub id: GroupId,
    pub peaks: Vec<PeakRecord>,
    pub mean_wavelength_nm: f64,
    pub mean_intensity: f64,
    /// The number of distinct samples contributing to this group
    pub sample_count: usize,
    pub color_band: ColorBand,
    pub is_principal: bool,
    /// Set when the group is selected as a principal line, e.g. `RGB-1 (Blue)`
    pub rank_label: Option<String>,
}

impl PeakGroup {
    /// Build a group from a non-empty list of peaks
    pub fn new(id: GroupId, peaks: Vec<PeakRecord>) -> Self {
        let n = peaks.len().max(1) as f64;
        let mean_wavelength_nm = peaks.iter().map(|p| p.wavelength_nm).sum::<f64>() / n;
        let mean_intensity = peaks.iter().map(|p| p.intensity).sum::<f64>() / n;
        let sample_count = peaks
            .iter()
            .map(|p| p.sample_index)
            .collect::<HashSet<_>>()
            .len();
        Self {
            id,
            peaks,
            mean_wavelength_nm,
            mean_intensity,
            sample_count,
            color_band: ColorBand::from_wavelength(mean_wavelength_nm),
            is_principal: false,
            rank_label: None,
        }
    }

    pub fn len(&self) -> usize {
        self.peaks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.peaks.is_empty()
    }

    /// The percentage of `total_samples` this group was observed in
    pub fn detection_rate_pct(&self, total_samples: usize) -> f64 {
        if total_samples == 0 {
            return 0.0;
        }
        self.sample_count as f64 / total_samples as f64 * 100.0
    }

    /// The rank label for principal groups, `Group {id}` otherwise
    pub fn label(&self) -> String {
        self.rank_label
            .clone()
            .unwrap_or_else(|| format!("Group {}", self.id))
    }
}

/// All groups from one clustering pass, ordered by ascending mean wavelength.
///
/// A group's [`GroupId`] is its 1-based position in that order.
#[derive(Debug, Default, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PeakGroups {
    groups: Vec<PeakGroup>,
    strategy: Option<ClusteringStrategy>,
    tolerance_nm: f64,
}

impl PeakGroups {
    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, PeakGroup> {
        self.groups.iter()
    }

    pub fn get(&self, id: GroupId) -> Option<&PeakGroup> {
        self.groups.get(id.0.checked_sub(1)?)
    }

    pub fn get_mut(&mut self, id: GroupId) -> Option<&mut PeakGroup> {
        self.groups.get_mut(id.0.checked_sub(1)?)
    }

    /// The concrete strategy that produced these groups
    pub fn strategy(&self) -> Option<ClusteringStrategy> {
        self.strategy
    }

    pub fn tolerance_nm(&self) -> f64 {
        self.tolerance_nm
    }

    pub fn total_peaks(&self) -> usize {
        self.groups.iter().map(|g| g.len()).sum()
    }

    /// Find the group a given peak was assigned to
    pub fn group_of(&self, peak: &PeakRecord) -> Option<&PeakGroup> {
        self.groups.iter().find(|g| g.peaks.contains(peak))
    }

    pub fn principal(&self) -> impl Iterator<Item = &PeakGroup> {
        self.groups.iter().filter(|g| g.is_principal)
    }

    /// Drop any principal marks from a previous selection
    pub fn clear_principal(&mut self) {
        for group in self.groups.iter_mut() {
            group.is_principal = false;
            group.rank_label = None;
        }
    }

    pub fn into_vec(self) -> Vec<PeakGroup> {
        self.groups
    }
}

impl<'a> IntoIterator for &'a PeakGroups {
    type Item = &'a PeakGroup;
    type IntoIter = std::slice::Iter<'a, PeakGroup>;

    fn into_iter(self) -> Self::IntoIter {
        self.groups.iter()
    }
}

/// Cluster `peaks` into [`PeakGroups`] using `strategy` with `tolerance_nm`
/// as the cut distance or bin width.
pub fn cluster_peaks(
    peaks: Vec<PeakRecord>,
    tolerance_nm: f64,
    strategy: ClusteringStrategy,
) -> Result<PeakGroups, ClusteringError> {
    if !(tolerance_nm.is_finite() && tolerance_nm > 0.0) {
        return Err(ClusteringError::InvalidTolerance(tolerance_nm));
    }
    if peaks.is_empty() {
        return Err(ClusteringError::NoPeaksDetected);
    }
    let wavelengths: Vec<f64> = peaks.iter().map(|p| p.wavelength_nm).collect();
    if wavelengths.iter().any(|w| !w.is_finite()) {
        return Err(ClusteringError::NonFiniteWavelength);
    }

    let resolved = strategy.resolve(peaks.len());
    debug!(
        "Clustering {} peaks with the {resolved} strategy at {tolerance_nm} nm",
        peaks.len()
    );
    let labels = resolved.assign(&wavelengths, tolerance_nm);

    let mut members: HashMap<usize, Vec<PeakRecord>> = HashMap::new();
    for (peak, label) in peaks.into_iter().zip(labels) {
        members.entry(label).or_default().push(peak);
    }

    let mut groups: Vec<PeakGroup> = members
        .into_values()
        .map(|peaks| PeakGroup::new(GroupId(0), peaks))
        .collect();
    groups.sort_by(|a, b| a.mean_wavelength_nm.total_cmp(&b.mean_wavelength_nm));
    for (i, group) in groups.iter_mut().enumerate() {
        group.id = GroupId(i + 1);
    }

    info!("{} peak groups identified", groups.len());
    Ok(PeakGroups {
        groups,
        strategy: Some(resolved),
        tolerance_nm,
    })
}
