//! Screen mass spectra for known contaminant signatures.
//!
//! Peaks are compared against a [`ReferenceTable`] of categorized target m/z values
//! within an absolute tolerance, producing [`Hit`]s that are aggregated into
//! per-category [`CategorySummary`] records and shaped into [`ReportData`] for a
//! downstream renderer.
//!
//! ```
//! use mzcontam::{match_spectra, summarize, ReferenceTable, Spectrum};
//!
//! let table = ReferenceTable::from_pairs([("Polymers", vec![(391.2843, "PEG/PPG")])]);
//! let spectra = vec![Spectrum::new(vec![391.2843], vec![5000.0])];
//! let hits = match_spectra(&spectra, &table, 0.5).unwrap();
//! assert_eq!(hits.len(), 1);
//! assert_eq!(summarize(&hits)[0].hit_count, 1);
//! ```
pub mod api;
pub mod error;
pub mod hit;
pub mod matcher;
pub mod reference;
pub mod report;
pub mod spectrum;
pub mod summary;

pub use crate::api::{
    screen_spectra, screen_spectra_with_cancel, ScreenOutcome, ScreenParams, ScreeningSession,
};
pub use crate::error::ScreenError;
pub use crate::hit::Hit;
pub use crate::matcher::{
    match_spectra, CancellationSignal, ContaminantMatcher, DedupPolicy, MatchParams,
    DEFAULT_TOLERANCE,
};
pub use crate::reference::{BuiltinTable, ContaminantCategory, ReferenceEntry, ReferenceTable};
pub use crate::report::{build_report_data, ReportBuilder, ReportData, ReportStyle};
pub use crate::spectrum::{Peak, Spectrum};
pub use crate::summary::{
    summarize, summarize_with, CategorySummary, SummaryOptions, SummaryOrdering,
};
