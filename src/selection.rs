//! Choose the dominant groups that stand for the red, green and blue source lines.
use std::cmp::Ordering;
use std::fmt;

use log::info;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::clustering::{GroupId, PeakGroup, PeakGroups};
use crate::peak::ColorBand;

/// How many principal groups are selected at most
pub const PRINCIPAL_COUNT: usize = 3;

/// How principal groups are chosen from the ranking
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum SelectionPolicy {
    /// The best group of each of Blue, Green and Red, filling any empty band
    /// from the overall ranking
    #[default]
    OnePerBand,
    /// The three best groups regardless of color
    TopThree,
}

impl fmt::Display for SelectionPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OnePerBand => f.write_str("one-per-band"),
            Self::TopThree => f.write_str("top-three"),
        }
    }
}

/// Higher detection rate first, then higher mean intensity, then lower id
fn rank_order(a: &PeakGroup, b: &PeakGroup, total_samples: usize) -> Ordering {
    b.detection_rate_pct(total_samples)
        .total_cmp(&a.detection_rate_pct(total_samples))
        .then_with(|| b.mean_intensity.total_cmp(&a.mean_intensity))
        .then_with(|| a.id.cmp(&b.id))
}

/// The group ids of `groups` from best to worst
pub fn rank_groups(groups: &PeakGroups, total_samples: usize) -> Vec<GroupId> {
    let mut ranked: Vec<&PeakGroup> = groups.iter().collect();
    ranked.sort_by(|a, b| rank_order(a, b, total_samples));
    ranked.into_iter().map(|g| g.id).collect()
}

impl SelectionPolicy {
    /// Pick up to [`PRINCIPAL_COUNT`] ids out of a best-first `ranking`
    pub fn choose(&self, groups: &PeakGroups, ranking: &[GroupId]) -> Vec<GroupId> {
        match self {
            Self::TopThree => ranking.iter().copied().take(PRINCIPAL_COUNT).collect(),
            Self::OnePerBand => {
                let mut chosen: Vec<GroupId> = ColorBand::ALL
                    .iter()
                    .filter_map(|band| {
                        ranking.iter().copied().find(|id| {
                            groups
                                .get(*id)
                                .is_some_and(|g| g.color_band == *band)
                        })
                    })
                    .collect();
                for id in ranking {
                    if chosen.len() >= PRINCIPAL_COUNT {
                        break;
                    }
                    if !chosen.contains(id) {
                        chosen.push(*id);
                    }
                }
                chosen
            }
        }
    }
}

/// Mark the principal groups of `groups` under `policy` and label them
/// `RGB-{i} ({color_band})` in ascending wavelength order.
///
/// Any earlier selection is cleared first. Returns the selected ids in
/// ascending wavelength order, fewer than three when fewer groups exist.
pub fn select_principal(
    groups: &mut PeakGroups,
    total_samples: usize,
    policy: SelectionPolicy,
) -> Vec<GroupId> {
    groups.clear_principal();
    let ranking = rank_groups(groups, total_samples);
    let mut selected = policy.choose(groups, &ranking);
    // Ids follow ascending mean wavelength
    selected.sort();

    for (i, id) in selected.iter().enumerate() {
        if let Some(group) = groups.get_mut(*id) {
            group.is_principal = true;
            group.rank_label = Some(format!("RGB-{} ({})", i + 1, group.color_band));
            info!(
                "Principal line {}: {:.2} nm, detection rate {:.1}%, mean intensity {:.2}",
                i + 1,
                group.mean_wavelength_nm,
                group.detection_rate_pct(total_samples),
                group.mean_intensity
            );
        }
    }
    selected
}
