use std::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

const BLUE_UPPER_NM: f64 = 500.0;
const GREEN_UPPER_NM: f64 = 580.0;

/// A coarse visible-light classification of a spectral line.
///
/// This is a reporting convention, not a color matching function.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum ColorBand {
    Blue,
    Green,
    Red,
}

impl ColorBand {
    /// All bands in ascending wavelength order
    pub const ALL: [ColorBand; 3] = [ColorBand::Blue, ColorBand::Green, ColorBand::Red];

    /// `< 500 nm` is blue, `[500, 580)` is green and anything from `580 nm` up is red
    pub fn from_wavelength(wavelength_nm: f64) -> Self {
        if wavelength_nm < BLUE_UPPER_NM {
            Self::Blue
        } else if wavelength_nm < GREEN_UPPER_NM {
            Self::Green
        } else {
            Self::Red
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Blue => "Blue",
            Self::Green => "Green",
            Self::Red => "Red",
        }
    }
}

impl fmt::Display for ColorBand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One extremum detected in one sample's spectrum
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PeakRecord {
    /// Which temporal sample the peak came from
    pub sample_index: usize,
    /// A human readable label for the sample, used only for diagnostics
    pub source_id: String,
    pub wavelength_nm: f64,
    pub intensity: f64,
}

impl PeakRecord {
    pub fn new<S: Into<String>>(
        sample_index: usize,
        source_id: S,
        wavelength_nm: f64,
        intensity: f64,
    ) -> Self {
        Self {
            sample_index,
            source_id: source_id.into(),
            wavelength_nm,
            intensity,
        }
    }

    pub fn color_band(&self) -> ColorBand {
        ColorBand::from_wavelength(self.wavelength_nm)
    }
}

impl fmt::Display for PeakRecord {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "PeakRecord({}, {}, {}, {})",
            self.sample_index, self.source_id, self.wavelength_nm, self.intensity
        )
    }
}
