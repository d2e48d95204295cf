//! High level APIs for running a complete screening pass
use tracing::{debug, info};

use crate::error::ScreenError;
use crate::hit::Hit;
use crate::matcher::{CancellationSignal, ContaminantMatcher, MatchParams, NeverCancel};
use crate::reference::ReferenceTable;
use crate::report::{ReportBuilder, ReportData};
use crate::spectrum::Spectrum;
use crate::summary::{summarize_with, CategorySummary, SummaryOptions, SummaryOrdering};

/// Everything that controls a screening run besides the reference table itself
#[derive(Debug, Clone, Copy, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct ScreenParams {
    #[cfg_attr(feature = "serde", serde(flatten))]
    pub match_params: MatchParams,
    /// List categories without any hits in the summaries
    pub zero_fill: bool,
    pub ordering: SummaryOrdering,
    /// Compute per-category intensity distributions
    pub distributions: bool,
}

impl ScreenParams {
    pub fn new(match_params: MatchParams) -> Self {
        Self {
            match_params,
            ..Default::default()
        }
    }

    pub fn summary_options<'a>(&self, table: &'a ReferenceTable) -> SummaryOptions<'a> {
        SummaryOptions::default()
            .with_table(table)
            .with_zero_fill(self.zero_fill)
            .with_ordering(self.ordering)
            .with_distributions(self.distributions)
    }
}

/// The results of one screening run, ready to hand to a report renderer.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ScreenOutcome {
    /// How many spectra were presented, including those skipped by the MS level filter
    pub total_spectra: usize,
    /// How many spectra passed the MS level filter and were matched
    pub screened_spectra: usize,
    /// How many peaks were examined across all screened spectra
    pub peaks_scanned: usize,
    pub hits: Vec<Hit>,
    pub summaries: Vec<CategorySummary>,
}

impl ScreenOutcome {
    pub fn report(&self) -> ReportData {
        self.report_with(&ReportBuilder::default())
    }

    pub fn report_with(&self, builder: &ReportBuilder) -> ReportData {
        builder.build(&self.hits, &self.summaries, self.total_spectra)
    }
}

/// An incremental screening run over spectra that arrive one at a time.
///
/// Spectra are indexed in the order they are pushed. Call [`ScreeningSession::finish`]
/// to aggregate the accumulated hits.
#[derive(Debug, Clone)]
pub struct ScreeningSession<'a> {
    matcher: ContaminantMatcher<'a>,
    params: ScreenParams,
    hits: Vec<Hit>,
    total_spectra: usize,
    screened_spectra: usize,
    peaks_scanned: usize,
}

impl<'a> ScreeningSession<'a> {
    /// Validate the table and parameters and start an empty run
    pub fn new(table: &'a ReferenceTable, params: ScreenParams) -> Result<Self, ScreenError> {
        let matcher = ContaminantMatcher::new(table, params.match_params)?;
        Ok(Self {
            matcher,
            params,
            hits: Vec::new(),
            total_spectra: 0,
            screened_spectra: 0,
            peaks_scanned: 0,
        })
    }

    pub fn matcher(&self) -> &ContaminantMatcher<'a> {
        &self.matcher
    }

    /// Screen the next spectrum, returning the number of hits it produced.
    ///
    /// A malformed spectrum is still counted so that later spectra keep their
    /// positional index.
    pub fn push(&mut self, spectrum: &Spectrum) -> Result<usize, ScreenError> {
        let spectrum_index = self.total_spectra;
        self.total_spectra += 1;
        if !self.matcher.accepts(spectrum) {
            return Ok(0);
        }
        let n = self
            .matcher
            .match_spectrum_into(spectrum_index, spectrum, &mut self.hits)?;
        self.screened_spectra += 1;
        self.peaks_scanned += spectrum.len();
        Ok(n)
    }

    /// Reserve the next index for a spectrum that could not be decoded at all
    pub fn skip(&mut self) -> usize {
        let spectrum_index = self.total_spectra;
        self.total_spectra += 1;
        spectrum_index
    }

    /// The number of spectra pushed so far
    pub fn len(&self) -> usize {
        self.total_spectra
    }

    pub fn is_empty(&self) -> bool {
        self.total_spectra == 0
    }

    pub fn hits(&self) -> &[Hit] {
        &self.hits
    }

    /// Aggregate the accumulated hits and close the run
    pub fn finish(self) -> ScreenOutcome {
        let options = self.params.summary_options(self.matcher.table());
        let summaries = summarize_with(&self.hits, &options);
        debug!(
            "Screened {} of {} spectra, {} peaks",
            self.screened_spectra, self.total_spectra, self.peaks_scanned
        );
        ScreenOutcome {
            total_spectra: self.total_spectra,
            screened_spectra: self.screened_spectra,
            peaks_scanned: self.peaks_scanned,
            hits: self.hits,
            summaries,
        }
    }
}

/// A single-shot screening run: match `spectra` against `table`, then aggregate.
///
/// # Note
/// Configuration errors are reported before any spectrum is examined. A malformed
/// spectrum aborts the whole run; use a [`ScreeningSession`] to skip over them instead.
pub fn screen_spectra(
    spectra: &[Spectrum],
    table: &ReferenceTable,
    params: ScreenParams,
) -> Result<ScreenOutcome, ScreenError> {
    screen_spectra_with_cancel(spectra, table, params, &NeverCancel)
}

/// As [`screen_spectra`], polling `cancel` once per spectrum
pub fn screen_spectra_with_cancel<C: CancellationSignal + ?Sized>(
    spectra: &[Spectrum],
    table: &ReferenceTable,
    params: ScreenParams,
    cancel: &C,
) -> Result<ScreenOutcome, ScreenError> {
    let mut session = ScreeningSession::new(table, params)?;
    for (spectrum_index, spectrum) in spectra.iter().enumerate() {
        if cancel.is_cancelled() {
            return Err(ScreenError::Cancelled { spectrum_index });
        }
        session.push(spectrum)?;
    }
    let outcome = session.finish();
    info!(
        "{} contaminant hits in {} categories",
        outcome.hits.len(),
        outcome.summaries.iter().filter(|s| s.hit_count > 0).count()
    );
    Ok(outcome)
}
