//! Matching peak lists against a [`ReferenceTable`].
//!
//! The traversal order is fixed: spectra in the order given, then categories in
//! table order, then entries in table order, then matching peaks in ascending
//! peak index. Every strategy here preserves that order, including the parallel
//! one, so repeated runs over the same input produce identical output.
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::{debug, instrument, trace};

#[cfg(feature = "parallelism")]
use rayon::prelude::*;

use crate::error::ScreenError;
use crate::hit::Hit;
use crate::reference::{ContaminantCategory, ReferenceEntry, ReferenceTable};
use crate::spectrum::Spectrum;

/// The default absolute m/z tolerance, in Daltons
pub const DEFAULT_TOLERANCE: f64 = 0.5;

/// How to treat several peaks falling within tolerance of the same reference entry
/// in the same spectrum.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "kebab-case"))]
pub enum DedupPolicy {
    /// Emit one hit for every matching peak
    #[default]
    AllPeaks,
    /// Emit at most one hit, for the matching peak with the lowest index
    FirstPeak,
    /// Emit at most one hit carrying the summed intensity of all matching peaks,
    /// reported at the m/z of the most intense one
    SummedIntensity,
}

/// Parameters controlling which peaks count as a match
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct MatchParams {
    /// The maximum absolute difference between observed and target m/z, inclusive
    pub tolerance: f64,
    pub dedup: DedupPolicy,
    /// Only screen spectra of this MS level. Spectra without a level are always screened.
    pub ms_level: Option<u8>,
}

impl Default for MatchParams {
    fn default() -> Self {
        Self {
            tolerance: DEFAULT_TOLERANCE,
            dedup: DedupPolicy::default(),
            ms_level: None,
        }
    }
}

impl MatchParams {
    pub fn new(tolerance: f64, dedup: DedupPolicy, ms_level: Option<u8>) -> Self {
        Self {
            tolerance,
            dedup,
            ms_level,
        }
    }

    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self
    }

    pub fn with_dedup(mut self, dedup: DedupPolicy) -> Self {
        self.dedup = dedup;
        self
    }

    pub fn with_ms_level(mut self, ms_level: Option<u8>) -> Self {
        self.ms_level = ms_level;
        self
    }

    pub fn validate(&self) -> Result<(), ScreenError> {
        if !self.tolerance.is_finite() || self.tolerance < 0.0 {
            Err(ScreenError::InvalidTolerance(self.tolerance))
        } else {
            Ok(())
        }
    }

    /// Whether `observed_mz` lies in the closed window `[target - tol, target + tol]`
    #[inline]
    pub fn is_within(&self, observed_mz: f64, target_mz: f64) -> bool {
        let lo = target_mz - self.tolerance;
        let hi = target_mz + self.tolerance;
        lo <= observed_mz && observed_mz <= hi
    }
}

/// A source of cooperative cancellation, polled once per spectrum
pub trait CancellationSignal {
    fn is_cancelled(&self) -> bool;
}

impl CancellationSignal for AtomicBool {
    fn is_cancelled(&self) -> bool {
        self.load(Ordering::Acquire)
    }
}

impl<T: CancellationSignal + ?Sized> CancellationSignal for &T {
    fn is_cancelled(&self) -> bool {
        (**self).is_cancelled()
    }
}

impl<T: CancellationSignal + ?Sized> CancellationSignal for Arc<T> {
    fn is_cancelled(&self) -> bool {
        (**self).is_cancelled()
    }
}

/// A [`CancellationSignal`] that is never raised
#[derive(Debug, Clone, Copy, Default)]
pub struct NeverCancel;

impl CancellationSignal for NeverCancel {
    fn is_cancelled(&self) -> bool {
        false
    }
}

/// Screens spectra against a borrowed [`ReferenceTable`] with a fixed set of
/// [`MatchParams`].
///
/// Creating the matcher validates the table and the parameters once, so the
/// per-spectrum methods only have to check the spectrum itself.
#[derive(Debug, Clone)]
pub struct ContaminantMatcher<'a> {
    table: &'a ReferenceTable,
    params: MatchParams,
}

impl<'a> ContaminantMatcher<'a> {
    pub fn new(table: &'a ReferenceTable, params: MatchParams) -> Result<Self, ScreenError> {
        params.validate()?;
        table.validate()?;
        Ok(Self { table, params })
    }

    pub fn table(&self) -> &'a ReferenceTable {
        self.table
    }

    pub fn params(&self) -> &MatchParams {
        &self.params
    }

    /// Whether `spectrum` passes the MS level filter
    pub fn accepts(&self, spectrum: &Spectrum) -> bool {
        match (self.params.ms_level, spectrum.ms_level) {
            (Some(wanted), Some(level)) => wanted == level,
            _ => true,
        }
    }

    fn scan_entry(
        &self,
        spectrum_index: usize,
        spectrum: &Spectrum,
        category: &ContaminantCategory,
        entry: &ReferenceEntry,
        acc: &mut Vec<Hit>,
    ) {
        let target = entry.target_mz;
        let mut matches = spectrum
            .iter()
            .enumerate()
            .filter(|(_, p)| self.params.is_within(p.mz, target));

        let make_hit = |observed_mz: f64, intensity: f64, peak_index: usize| {
            Hit::new(
                spectrum_index,
                category.name.as_str(),
                entry.label.as_str(),
                target,
                observed_mz,
                intensity,
                peak_index,
            )
        };

        match self.params.dedup {
            DedupPolicy::AllPeaks => {
                acc.extend(matches.map(|(i, p)| make_hit(p.mz, p.intensity, i)));
            }
            DedupPolicy::FirstPeak => {
                if let Some((i, p)) = matches.next() {
                    acc.push(make_hit(p.mz, p.intensity, i));
                }
            }
            DedupPolicy::SummedIntensity => {
                if let Some((first_i, first)) = matches.next() {
                    let (total, best_i, best) = matches.fold(
                        (first.intensity, first_i, first),
                        |(total, best_i, best), (i, p)| {
                            if p.intensity > best.intensity {
                                (total + p.intensity, i, p)
                            } else {
                                (total + p.intensity, best_i, best)
                            }
                        },
                    );
                    acc.push(make_hit(best.mz, total, best_i));
                }
            }
        }
    }

    /// Append the hits for a single spectrum to `acc`, returning how many were added.
    ///
    /// Spectra rejected by the MS level filter contribute nothing and are not validated.
    pub fn match_spectrum_into(
        &self,
        spectrum_index: usize,
        spectrum: &Spectrum,
        acc: &mut Vec<Hit>,
    ) -> Result<usize, ScreenError> {
        if !self.accepts(spectrum) {
            trace!(
                "Skipping spectrum {spectrum_index} with MS level {:?}",
                spectrum.ms_level
            );
            return Ok(0);
        }
        spectrum.validate(spectrum_index)?;
        let before = acc.len();
        for category in self.table.iter() {
            for entry in category.iter() {
                self.scan_entry(spectrum_index, spectrum, category, entry, acc);
            }
        }
        Ok(acc.len() - before)
    }

    /// Find all hits in a single spectrum
    #[instrument(level = "trace", skip(self, spectrum), fields(n_peaks = spectrum.len()))]
    pub fn match_spectrum(
        &self,
        spectrum_index: usize,
        spectrum: &Spectrum,
    ) -> Result<Vec<Hit>, ScreenError> {
        let mut acc = Vec::new();
        self.match_spectrum_into(spectrum_index, spectrum, &mut acc)?;
        Ok(acc)
    }

    /// Find all hits across `spectra`, indexing spectra by their position in the slice
    pub fn match_spectra(&self, spectra: &[Spectrum]) -> Result<Vec<Hit>, ScreenError> {
        self.match_spectra_with_cancel(spectra, &NeverCancel)
    }

    /// As [`ContaminantMatcher::match_spectra`], polling `cancel` before each spectrum
    pub fn match_spectra_with_cancel<C: CancellationSignal + ?Sized>(
        &self,
        spectra: &[Spectrum],
        cancel: &C,
    ) -> Result<Vec<Hit>, ScreenError> {
        let mut acc = Vec::new();
        for (spectrum_index, spectrum) in spectra.iter().enumerate() {
            if cancel.is_cancelled() {
                return Err(ScreenError::Cancelled { spectrum_index });
            }
            self.match_spectrum_into(spectrum_index, spectrum, &mut acc)?;
        }
        debug!(
            "Found {} hits in {} spectra against {} reference entries",
            acc.len(),
            spectra.len(),
            self.table.num_entries()
        );
        Ok(acc)
    }

    /// Screen spectra in parallel, concatenating per-spectrum results in spectrum order.
    ///
    /// The output is identical to [`ContaminantMatcher::match_spectra`]. If more than one
    /// spectrum is malformed, which one is reported is not specified.
    #[cfg(feature = "parallelism")]
    pub fn par_match_spectra(&self, spectra: &[Spectrum]) -> Result<Vec<Hit>, ScreenError> {
        self.par_match_spectra_with_cancel(spectra, &NeverCancel)
    }

    #[cfg(feature = "parallelism")]
    pub fn par_match_spectra_with_cancel<C: CancellationSignal + Sync + ?Sized>(
        &self,
        spectra: &[Spectrum],
        cancel: &C,
    ) -> Result<Vec<Hit>, ScreenError> {
        let per_spectrum: Vec<Vec<Hit>> = spectra
            .par_iter()
            .enumerate()
            .map(|(spectrum_index, spectrum)| {
                if cancel.is_cancelled() {
                    return Err(ScreenError::Cancelled { spectrum_index });
                }
                self.match_spectrum(spectrum_index, spectrum)
            })
            .collect::<Result<_, _>>()?;
        let acc: Vec<Hit> = per_spectrum.into_iter().flatten().collect();
        debug!(
            "Found {} hits in {} spectra against {} reference entries",
            acc.len(),
            spectra.len(),
            self.table.num_entries()
        );
        Ok(acc)
    }
}

/// A single-shot screening of `spectra` against `table` with the default
/// [`DedupPolicy`] and no MS level filter.
///
/// # Errors
/// [`ScreenError::InvalidTolerance`] or a table validation error before any
/// spectrum is examined, or a data error naming the first malformed spectrum.
pub fn match_spectra(
    spectra: &[Spectrum],
    table: &ReferenceTable,
    tolerance: f64,
) -> Result<Vec<Hit>, ScreenError> {
    let params = MatchParams::default().with_tolerance(tolerance);
    ContaminantMatcher::new(table, params)?.match_spectra(spectra)
}
