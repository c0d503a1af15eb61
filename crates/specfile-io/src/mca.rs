//! Multi-channel analyzer spectra.
//!
//! With `#@MCADEV n` (n ≥ 1) in the scan header, every data row is followed
//! by one or more `@A` lines holding its spectrum. All `@A` lines after a row,
//! together with their `\` continuations, concatenate into that row's
//! spectrum. Without the directive the scan has no spectra.

use crate::data::{Body, BodyItem};
use specfile_core::{HeaderValue, Result, SpecError};
use std::collections::BTreeMap;

const DEFAULT_CALIBRATION: [f64; 3] = [0.0, 1.0, 0.0];

/// Spectra of one scan, one per data row.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Mca {
    spectra: Vec<Vec<f64>>,
    calibration: Vec<f64>,
    channels: Vec<i64>,
}

/// Is spectrum mode switched on by the MCA header?
pub(crate) fn is_enabled(mca_header: &BTreeMap<String, String>) -> bool {
    mca_header
        .get("MCADEV")
        .and_then(|v| HeaderValue::parse(v).as_i64())
        .map_or(false, |n| n >= 1)
}

impl Mca {
    pub(crate) fn assemble(body: Body<'_>, mca_header: &BTreeMap<String, String>) -> Result<Self> {
        let calibration = mca_header
            .get("CALIB")
            .and_then(|v| HeaderValue::parse(v).to_f64_vec())
            .unwrap_or_else(|| DEFAULT_CALIBRATION.to_vec());

        if !is_enabled(mca_header) {
            return Ok(Mca {
                spectra: Vec::new(),
                calibration,
                channels: Vec::new(),
            });
        }

        let mut rows = 0;
        let mut spectra: Vec<Vec<f64>> = Vec::new();
        let mut group_open = false;

        for item in body {
            match item {
                BodyItem::Row(_) => {
                    rows += 1;
                    group_open = false;
                }
                BodyItem::Spectrum(line, tokens) => {
                    if !group_open {
                        spectra.push(Vec::new());
                        group_open = true;
                    }
                    if let Some(spectrum) = spectra.last_mut() {
                        for tok in tokens.split_whitespace() {
                            let value = tok.parse::<f64>().map_err(|_| SpecError::MalformedRow {
                                line: line.number + 1,
                                reason: format!("non-numeric spectrum value {:?}", tok),
                            })?;
                            spectrum.push(value);
                        }
                    }
                }
            }
        }

        if spectra.len() != rows {
            return Err(SpecError::MalformedSpectrum {
                rows,
                spectra: spectra.len(),
            });
        }

        let channels = mca_header
            .get("CHANN")
            .and_then(|v| channels_from_header(v))
            .unwrap_or_else(|| {
                let n = spectra.first().map_or(0, Vec::len);
                (0..n as i64).collect()
            });

        Ok(Mca {
            spectra,
            calibration,
            channels,
        })
    }

    pub fn len(&self) -> usize {
        self.spectra.len()
    }

    pub fn is_empty(&self) -> bool {
        self.spectra.is_empty()
    }

    pub fn get(&self, i: usize) -> Option<&[f64]> {
        self.spectra.get(i).map(Vec::as_slice)
    }

    pub fn spectra(&self) -> &[Vec<f64>] {
        &self.spectra
    }

    pub fn iter(&self) -> impl Iterator<Item = &[f64]> + '_ {
        self.spectra.iter().map(Vec::as_slice)
    }

    /// Energy calibration coefficients `[a, b, c]` from `#@CALIB`
    /// (`E = a + b·ch + c·ch²`); `[0, 1, 0]` when absent.
    pub fn calibration(&self) -> &[f64] {
        &self.calibration
    }

    /// Channel numbers from `#@CHANN n first last step`, or `0..len` of the
    /// first spectrum when absent.
    pub fn channels(&self) -> &[i64] {
        &self.channels
    }

    /// Calibrated energy of every channel.
    pub fn energies(&self) -> Vec<f64> {
        let coeff = |i: usize| self.calibration.get(i).copied().unwrap_or(0.0);
        let (a, b, c) = (coeff(0), coeff(1), coeff(2));
        self.channels
            .iter()
            .map(|&ch| {
                let x = ch as f64;
                a + b * x + c * x * x
            })
            .collect()
    }
}

/// `n first last step` → `first, first+step, …, last`, at most `n` channels.
fn channels_from_header(value: &str) -> Option<Vec<i64>> {
    let parts = match HeaderValue::parse(value) {
        HeaderValue::IntVec(parts) if parts.len() >= 3 => parts,
        _ => return None,
    };
    let count = usize::try_from(parts[0]).ok()?;
    let (first, last) = (parts[1], parts[2]);
    let step = parts.get(3).copied().filter(|&s| s > 0).unwrap_or(1);
    if last < first {
        return Some(Vec::new());
    }
    let step = usize::try_from(step).ok()?;
    Some((first..=last).step_by(step).take(count).collect())
}
