use std::fmt::Display;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use mzcontam::{BuiltinTable, DedupPolicy, ReportBuilder, ReportStyle, SummaryOrdering};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ArgDedupPolicy {
    #[default]
    /// Report every peak that falls within tolerance of a reference entry
    AllPeaks,
    /// Report only the first peak within tolerance per reference entry and spectrum
    FirstPeak,
    /// Report one hit per reference entry and spectrum, summing the intensity of every peak within tolerance
    SummedIntensity,
}

impl From<ArgDedupPolicy> for DedupPolicy {
    fn from(value: ArgDedupPolicy) -> Self {
        match value {
            ArgDedupPolicy::AllPeaks => DedupPolicy::AllPeaks,
            ArgDedupPolicy::FirstPeak => DedupPolicy::FirstPeak,
            ArgDedupPolicy::SummedIntensity => DedupPolicy::SummedIntensity,
        }
    }
}

impl Display for ArgDedupPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ArgReferenceTable {
    #[default]
    /// Four categories of common polymer, detergent, plasticizer and other contaminants
    Standard,
    /// Fifteen categories including adducts, solvents, calibrants and metabolites
    Extended,
}

impl From<ArgReferenceTable> for BuiltinTable {
    fn from(value: ArgReferenceTable) -> Self {
        match value {
            ArgReferenceTable::Standard => BuiltinTable::Standard,
            ArgReferenceTable::Extended => BuiltinTable::Extended,
        }
    }
}

impl Display for ArgReferenceTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ArgSummaryOrdering {
    #[default]
    /// Most hits first, ties broken by category name
    HitCount,
    /// The order categories appear in the reference table
    Reference,
}

impl From<ArgSummaryOrdering> for SummaryOrdering {
    fn from(value: ArgSummaryOrdering) -> Self {
        match value {
            ArgSummaryOrdering::HitCount => SummaryOrdering::HitCountDescending,
            ArgSummaryOrdering::Reference => SummaryOrdering::ReferenceOrder,
        }
    }
}

impl Display for ArgSummaryOrdering {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// Report settings that are only read from configuration files
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportParams {
    pub title: String,
    pub style: ReportStyle,
}

impl Default for ReportParams {
    fn default() -> Self {
        let builder = ReportBuilder::default();
        Self {
            title: builder.title,
            style: builder.style,
        }
    }
}

impl ReportParams {
    pub fn make_builder(&self, top_hits_cap: usize) -> ReportBuilder {
        ReportBuilder::new()
            .title(self.title.clone())
            .style(self.style.clone())
            .top_hits_cap(top_hits_cap)
    }
}
