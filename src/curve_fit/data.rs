use std::borrow::Cow;
use std::iter::FusedIterator;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::spectrum::Spectrum;

/// An iterator over the `(wavelength, intensity)` pairs of a [`FitArgs`]
pub struct FitArgsIter<'a> {
    inner: std::iter::Zip<
        std::iter::Copied<std::slice::Iter<'a, f64>>,
        std::iter::Copied<std::slice::Iter<'a, f64>>,
    >,
}

impl Iterator for FitArgsIter<'_> {
    type Item = (f64, f64);

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl FusedIterator for FitArgsIter<'_> {}

impl ExactSizeIterator for FitArgsIter<'_> {
    fn len(&self) -> usize {
        self.inner.len()
    }
}

/// A borrowed or owned pair of wavelength and intensity arrays to fit a peak
/// shape against
#[derive(Debug, Default, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct FitArgs<'a, 'b> {
    pub wavelength: Cow<'a, [f64]>,
    pub intensity: Cow<'b, [f64]>,
}

impl<'a, 'b> FitArgs<'a, 'b> {
    /// Pair the two arrays, returning `None` when their lengths differ
    pub fn new(wavelength: Cow<'a, [f64]>, intensity: Cow<'b, [f64]>) -> Option<Self> {
        if wavelength.len() != intensity.len() {
            return None;
        }
        Some(Self {
            wavelength,
            intensity,
        })
    }

    pub fn len(&self) -> usize {
        self.wavelength.len()
    }

    pub fn is_empty(&self) -> bool {
        self.wavelength.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<(f64, f64)> {
        Some((*self.wavelength.get(index)?, *self.intensity.get(index)?))
    }

    pub fn iter(&self) -> FitArgsIter<'_> {
        FitArgsIter {
            inner: self
                .wavelength
                .iter()
                .copied()
                .zip(self.intensity.iter().copied()),
        }
    }

    /// Borrow the arrays without copying
    pub fn borrow(&self) -> FitArgs<'_, '_> {
        FitArgs {
            wavelength: Cow::Borrowed(self.wavelength.as_ref()),
            intensity: Cow::Borrowed(self.intensity.as_ref()),
        }
    }

    /// The index of the most intense point, the first one on ties
    pub fn argmax(&self) -> usize {
        let mut best = 0;
        let mut best_value = f64::NEG_INFINITY;
        for (i, y) in self.intensity.iter().enumerate() {
            if *y > best_value {
                best = i;
                best_value = *y;
            }
        }
        best
    }

    /// The distance between the lowest and highest wavelength
    pub fn wavelength_range(&self) -> f64 {
        let (lo, hi) = self
            .wavelength
            .iter()
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), x| {
                (lo.min(*x), hi.max(*x))
            });
        if self.is_empty() {
            0.0
        } else {
            hi - lo
        }
    }

    /// The number of distinct wavelength values
    pub fn distinct_points(&self) -> usize {
        let mut xs: Vec<u64> = self.wavelength.iter().map(|x| x.to_bits()).collect();
        xs.sort_unstable();
        xs.dedup();
        xs.len()
    }

    pub fn is_constant(&self) -> bool {
        match self.intensity.first() {
            Some(first) => self.intensity.iter().all(|y| y == first),
            None => true,
        }
    }

    pub fn is_finite(&self) -> bool {
        self.iter().all(|(x, y)| x.is_finite() && y.is_finite())
    }

    pub fn mean_intensity(&self) -> f64 {
        if self.is_empty() {
            return 0.0;
        }
        self.intensity.iter().sum::<f64>() / self.len() as f64
    }

    /// The total sum of squares of the intensity about its mean
    pub fn total_sum_of_squares(&self) -> f64 {
        let mean = self.mean_intensity();
        self.intensity.iter().map(|y| (y - mean).powi(2)).sum()
    }

    /// Restrict the data to wavelengths in `[lo, hi]`.
    ///
    /// Sorted wavelength axes are sliced without copying.
    pub fn window(&self, lo: f64, hi: f64) -> FitArgs<'_, '_> {
        if self.wavelength.windows(2).all(|w| w[0] <= w[1]) {
            let start = self.wavelength.partition_point(|x| *x < lo);
            let end = self.wavelength.partition_point(|x| *x <= hi).max(start);
            FitArgs {
                wavelength: Cow::Borrowed(&self.wavelength[start..end]),
                intensity: Cow::Borrowed(&self.intensity[start..end]),
            }
        } else {
            let (wavelength, intensity): (Vec<f64>, Vec<f64>) =
                self.iter().filter(|(x, _)| *x >= lo && *x <= hi).unzip();
            FitArgs {
                wavelength: Cow::Owned(wavelength),
                intensity: Cow::Owned(intensity),
            }
        }
    }
}

impl<'a> From<&'a Spectrum> for FitArgs<'a, 'a> {
    fn from(value: &'a Spectrum) -> Self {
        Self {
            wavelength: Cow::Borrowed(value.wavelength_nm()),
            intensity: Cow::Borrowed(value.intensity()),
        }
    }
}

impl<'a, 'b> From<(&'a [f64], &'b [f64])> for FitArgs<'a, 'b> {
    fn from(value: (&'a [f64], &'b [f64])) -> Self {
        Self {
            wavelength: Cow::Borrowed(value.0),
            intensity: Cow::Borrowed(value.1),
        }
    }
}

impl From<(Vec<f64>, Vec<f64>)> for FitArgs<'static, 'static> {
    fn from(value: (Vec<f64>, Vec<f64>)) -> Self {
        Self {
            wavelength: Cow::Owned(value.0),
            intensity: Cow::Owned(value.1),
        }
    }
}
