//! The paired wavelength/intensity arrays produced by an optical spectrum analyzer.
use std::borrow::Cow;
use std::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// The unit the wavelength column of a record stream is written in.
///
/// The loader never guesses this, the caller must state it.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum WavelengthUnit {
    /// Wavelengths in meters, usually in scientific notation (`4.5e-07`)
    #[default]
    Meters,
    /// Wavelengths already in nanometers
    Nanometers,
}

impl WavelengthUnit {
    /// The factor that converts a value in this unit to nanometers
    pub fn to_nanometers(&self) -> f64 {
        match self {
            Self::Meters => 1e9,
            Self::Nanometers => 1.0,
        }
    }
}

impl fmt::Display for WavelengthUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Meters => f.write_str("m"),
            Self::Nanometers => f.write_str("nm"),
        }
    }
}

/// A single spectrum with wavelengths normalized to nanometers.
///
/// `wavelength_nm` and `intensity` always have the same, non-zero, length.
/// The arrays cannot be changed once constructed.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(try_from = "SpectrumArrays")
)]
pub struct Spectrum {
    wavelength_nm: Vec<f64>,
    intensity: Vec<f64>,
}

#[cfg(feature = "serde")]
#[derive(Deserialize)]
struct SpectrumArrays {
    wavelength_nm: Vec<f64>,
    intensity: Vec<f64>,
}

#[cfg(feature = "serde")]
impl TryFrom<SpectrumArrays> for Spectrum {
    type Error = &'static str;

    fn try_from(value: SpectrumArrays) -> Result<Self, Self::Error> {
        Spectrum::new(value.wavelength_nm, value.intensity)
            .ok_or("a spectrum needs non-empty arrays of equal length")
    }
}

impl Spectrum {
    /// Create a new spectrum, returning `None` when the arrays are empty or
    /// do not have the same length.
    pub fn new(wavelength_nm: Vec<f64>, intensity: Vec<f64>) -> Option<Self> {
        if wavelength_nm.is_empty() || wavelength_nm.len() != intensity.len() {
            return None;
        }
        Some(Self {
            wavelength_nm,
            intensity,
        })
    }

    pub fn wavelength_nm(&self) -> &[f64] {
        &self.wavelength_nm
    }

    pub fn intensity(&self) -> &[f64] {
        &self.intensity
    }

    /// Whether every wavelength and intensity is a finite number
    pub fn is_finite(&self) -> bool {
        self.iter().all(|(x, y)| x.is_finite() && y.is_finite())
    }

    pub fn len(&self) -> usize {
        self.wavelength_nm.len()
    }

    pub fn is_empty(&self) -> bool {
        self.wavelength_nm.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<(f64, f64)> {
        Some((*self.wavelength_nm.get(index)?, *self.intensity.get(index)?))
    }

    pub fn iter(&self) -> impl Iterator<Item = (f64, f64)> + '_ {
        self.wavelength_nm
            .iter()
            .copied()
            .zip(self.intensity.iter().copied())
    }

    /// Check if the wavelength axis is monotonically ascending or flat
    pub fn is_sorted(&self) -> bool {
        self.wavelength_nm.windows(2).all(|w| w[0] <= w[1])
    }

    /// The lowest and highest wavelength in the spectrum
    pub fn wavelength_range(&self) -> (f64, f64) {
        self.wavelength_nm
            .iter()
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), x| {
                (lo.min(*x), hi.max(*x))
            })
    }

    /// Borrow the points whose wavelength lies within `[lo, hi]`.
    ///
    /// Assumes the wavelength axis is ascending.
    pub fn window(&self, lo: f64, hi: f64) -> (Cow<'_, [f64]>, Cow<'_, [f64]>) {
        let start = self.wavelength_nm.partition_point(|x| *x < lo);
        let end = self.wavelength_nm.partition_point(|x| *x <= hi).max(start);
        (
            Cow::Borrowed(&self.wavelength_nm[start..end]),
            Cow::Borrowed(&self.intensity[start..end]),
        )
    }
}
