//! Reading and writing spectra as delimited text records.
//!
//! Each data line holds exactly two numeric fields, a wavelength and an
//! intensity, separated by `;`:
//!
//! ```text
//! 4.00000000000e-07;1.25000000000e+01
//! 4.00500000000e-07;1.31000000000e+01
//! ```
//!
//! Some vendor exports carry a free-form header ending in a `[Data]` line and
//! `#`-prefixed comments; [`SpectrumReader::section_marker`] handles those.
use std::fs;
use std::io;
use std::io::prelude::*;
use std::path;

use log::{debug, warn};
use thiserror::Error;

use crate::spectrum::{Spectrum, WavelengthUnit};

/// All the ways reading a spectrum can fail
#[derive(Debug, Error)]
pub enum SpectrumError {
    #[error("Line {line} is not a pair of numbers: {content:?}")]
    MalformedRecord { line: usize, content: String },
    #[error("No valid records were found")]
    EmptySpectrum,
    #[error("An IO error occurred: {0}")]
    IO(#[from] io::Error),
}

/// A line the lenient reader stepped over
#[derive(Debug, Clone, PartialEq)]
pub struct SkippedRecord {
    /// 1-based line number in the source
    pub line: usize,
    pub content: String,
}

/// The product of reading one record stream
#[derive(Debug, Clone)]
pub struct LoadReport {
    pub spectrum: Spectrum,
    pub skipped: Vec<SkippedRecord>,
}

impl LoadReport {
    pub fn skipped_count(&self) -> usize {
        self.skipped.len()
    }
}

/// The field separator of a record
pub const DELIMITER: char = ';';

/// Configurable reader for `wavelength;intensity` record streams
#[derive(Debug, Clone)]
pub struct SpectrumReader {
    pub unit: WavelengthUnit,
    /// Abort on the first malformed line instead of skipping it
    pub strict: bool,
    /// When set, everything up to and including the first line containing
    /// this marker is treated as a header and ignored
    pub section_marker: Option<String>,
}

impl Default for SpectrumReader {
    fn default() -> Self {
        Self {
            unit: WavelengthUnit::Meters,
            strict: false,
            section_marker: None,
        }
    }
}

impl SpectrumReader {
    pub fn new(unit: WavelengthUnit) -> Self {
        Self {
            unit,
            ..Default::default()
        }
    }

    pub fn unit(mut self, unit: WavelengthUnit) -> Self {
        self.unit = unit;
        self
    }

    pub fn strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    pub fn section_marker<S: Into<String>>(mut self, marker: Option<S>) -> Self {
        self.section_marker = marker.map(|s| s.into());
        self
    }

    /// Parse one record into a nanometer wavelength and an intensity.
    ///
    /// `NaN`, `inf` and values that overflow on scaling are malformed.
    fn parse_record(&self, line: &str, scale: f64) -> Option<(f64, f64)> {
        let mut fields = line.split(DELIMITER).map(|f| f.trim());
        let wavelength = fields.next()?.parse::<f64>().ok()? * scale;
        let intensity = fields.next()?.parse::<f64>().ok()?;
        if fields.next().is_some() || !wavelength.is_finite() || !intensity.is_finite() {
            return None;
        }
        Some((wavelength, intensity))
    }

    /// Read a [`Spectrum`] from any buffered source.
    pub fn read<R: BufRead>(&self, reader: R) -> Result<LoadReport, SpectrumError> {
        let scale = self.unit.to_nanometers();
        let mut wavelength_nm = Vec::new();
        let mut intensity = Vec::new();
        let mut skipped = Vec::new();
        let mut in_data = self.section_marker.is_none();

        for (i, line) in reader.lines().enumerate() {
            let line = line?;
            let content = line.trim();
            if !in_data {
                if let Some(marker) = self.section_marker.as_deref() {
                    in_data = content.contains(marker);
                }
                continue;
            }
            if content.is_empty() || content.starts_with('#') {
                continue;
            }
            match self.parse_record(content, scale) {
                Some((x, y)) => {
                    wavelength_nm.push(x);
                    intensity.push(y);
                }
                None => {
                    if self.strict {
                        return Err(SpectrumError::MalformedRecord {
                            line: i + 1,
                            content: content.to_string(),
                        });
                    }
                    warn!("Skipping malformed record on line {}: {:?}", i + 1, content);
                    skipped.push(SkippedRecord {
                        line: i + 1,
                        content: content.to_string(),
                    });
                }
            }
        }

        let spectrum =
            Spectrum::new(wavelength_nm, intensity).ok_or(SpectrumError::EmptySpectrum)?;
        debug!(
            "Read {} points, skipped {} records",
            spectrum.len(),
            skipped.len()
        );
        Ok(LoadReport { spectrum, skipped })
    }

    pub fn read_str(&self, text: &str) -> Result<LoadReport, SpectrumError> {
        self.read(io::Cursor::new(text))
    }

    pub fn read_file<P: AsRef<path::Path>>(&self, path: P) -> Result<LoadReport, SpectrumError> {
        let reader = io::BufReader::new(fs::File::open(path)?);
        self.read(reader)
    }
}

/// Write `spectrum` as `;`-delimited records with the wavelength expressed in
/// `unit`, both fields in scientific notation with 12 significant digits.
pub fn spectrum_to_writer<W: io::Write>(
    spectrum: &Spectrum,
    unit: WavelengthUnit,
    writer: &mut W,
) -> io::Result<()> {
    let scale = unit.to_nanometers();
    for (x, y) in spectrum.iter() {
        writeln!(writer, "{:.11e}{DELIMITER}{:.11e}", x / scale, y)?;
    }
    Ok(())
}
