//! Aggregating hits into per-category summaries
use std::cmp::Ordering;
use std::collections::BTreeMap;

use itertools::Itertools;

use crate::hit::Hit;
use crate::reference::ReferenceTable;

/// Five-number summary plus mean of the hit intensities in one category,
/// enough to draw a box plot.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct IntensityDistribution {
    pub min: f64,
    pub lower_quartile: f64,
    pub median: f64,
    pub upper_quartile: f64,
    pub max: f64,
    pub mean: f64,
}

impl IntensityDistribution {
    /// Summarize a set of intensities, using linear interpolation between
    /// order statistics for the quartiles. Returns `None` for an empty set.
    pub fn from_intensities(values: &[f64]) -> Option<Self> {
        if values.is_empty() {
            return None;
        }
        let sorted: Vec<f64> = values
            .iter()
            .copied()
            .sorted_by(|a, b| a.total_cmp(b))
            .collect();
        let quantile = |q: f64| -> f64 {
            let pos = q * (sorted.len() - 1) as f64;
            let lo = pos.floor() as usize;
            let hi = pos.ceil() as usize;
            sorted[lo] + (sorted[hi] - sorted[lo]) * (pos - lo as f64)
        };
        Some(Self {
            min: sorted[0],
            lower_quartile: quantile(0.25),
            median: quantile(0.5),
            upper_quartile: quantile(0.75),
            max: sorted[sorted.len() - 1],
            mean: sorted.iter().sum::<f64>() / sorted.len() as f64,
        })
    }
}

/// The hits attributed to one contaminant category
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CategorySummary {
    pub category: String,
    pub hit_count: usize,
    pub total_intensity: f64,
    /// Absent when the category has no hits or distributions were not requested
    pub intensity: Option<IntensityDistribution>,
}

impl CategorySummary {
    pub fn new(category: impl Into<String>, hit_count: usize, total_intensity: f64) -> Self {
        Self {
            category: category.into(),
            hit_count,
            total_intensity,
            intensity: None,
        }
    }

    pub fn empty(category: impl Into<String>) -> Self {
        Self::new(category, 0, 0.0)
    }
}

/// How to order the summaries
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "kebab-case"))]
pub enum SummaryOrdering {
    /// Most hits first, ties broken by category name ascending
    #[default]
    HitCountDescending,
    /// The order categories appear in the reference table. Categories not in the
    /// table, or when no table is given, follow in name order.
    ReferenceOrder,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SummaryOptions<'a> {
    /// The table used for zero-filling and for [`SummaryOrdering::ReferenceOrder`]
    pub table: Option<&'a ReferenceTable>,
    /// Include a zero-hit summary for every category in `table` without hits
    pub zero_fill: bool,
    pub ordering: SummaryOrdering,
    /// Compute an [`IntensityDistribution`] for each category with hits
    pub distributions: bool,
}

impl<'a> SummaryOptions<'a> {
    pub fn with_table(mut self, table: &'a ReferenceTable) -> Self {
        self.table = Some(table);
        self
    }

    pub fn with_zero_fill(mut self, zero_fill: bool) -> Self {
        self.zero_fill = zero_fill;
        self
    }

    pub fn with_ordering(mut self, ordering: SummaryOrdering) -> Self {
        self.ordering = ordering;
        self
    }

    pub fn with_distributions(mut self, distributions: bool) -> Self {
        self.distributions = distributions;
        self
    }
}

/// Group `hits` by category with the default [`SummaryOptions`]: no zero-filling,
/// no distributions, most hits first.
pub fn summarize(hits: &[Hit]) -> Vec<CategorySummary> {
    summarize_with(hits, &SummaryOptions::default())
}

/// Group `hits` by category, counting them and summing their intensities.
pub fn summarize_with(hits: &[Hit], options: &SummaryOptions<'_>) -> Vec<CategorySummary> {
    let mut groups: BTreeMap<&str, Vec<f64>> = BTreeMap::new();
    for hit in hits {
        groups
            .entry(hit.category.as_str())
            .or_default()
            .push(hit.intensity);
    }

    let mut summaries: Vec<CategorySummary> = groups
        .iter()
        .map(|(category, intensities)| {
            let mut summary =
                CategorySummary::new(*category, intensities.len(), intensities.iter().sum());
            if options.distributions {
                summary.intensity = IntensityDistribution::from_intensities(intensities);
            }
            summary
        })
        .collect();

    if options.zero_fill {
        if let Some(table) = options.table {
            summaries.extend(
                table
                    .category_names()
                    .filter(|name| !groups.contains_key(name))
                    .map(CategorySummary::empty),
            );
        }
    }

    match options.ordering {
        SummaryOrdering::HitCountDescending => {
            summaries.sort_by(|a, b| {
                b.hit_count
                    .cmp(&a.hit_count)
                    .then_with(|| a.category.cmp(&b.category))
            });
        }
        SummaryOrdering::ReferenceOrder => {
            let position = |name: &str| {
                options
                    .table
                    .and_then(|t| t.position_of(name))
                    .unwrap_or(usize::MAX)
            };
            summaries.sort_by(|a, b| {
                match position(a.category.as_str()).cmp(&position(b.category.as_str())) {
                    Ordering::Equal => a.category.cmp(&b.category),
                    ord => ord,
                }
            });
        }
    }
    summaries
}

/// The total number of hits across summaries
pub fn total_hits(summaries: &[CategorySummary]) -> usize {
    summaries.iter().map(|s| s.hit_count).sum()
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::reference::BuiltinTable;

    fn hit(category: &str, intensity: f64) -> Hit {
        Hit::new(0, category, "x", 100.0, 100.0, intensity, 0)
    }

    #[test]
    fn test_empty() {
        assert!(summarize(&[]).is_empty());
    }

    #[test]
    fn test_two_categories() {
        let hits = vec![hit("Polymers", 5.0), hit("Detergents", 2.0)];
        let summaries = summarize(&hits);
        assert_eq!(
            summaries,
            vec![
                CategorySummary::new("Detergents", 1, 2.0),
                CategorySummary::new("Polymers", 1, 5.0),
            ]
        );
        assert_eq!(total_hits(&summaries), hits.len());
    }

    #[test]
    fn test_ordering() {
        let hits = vec![
            hit("Others", 1.0),
            hit("Polymers", 1.0),
            hit("Polymers", 2.0),
            hit("Detergents", 4.0),
            hit("Others", 8.0),
            hit("Plasticizers", 3.0),
        ];
        let summaries = summarize(&hits);
        let names: Vec<_> = summaries.iter().map(|s| s.category.as_str()).collect();
        assert_eq!(names, ["Others", "Polymers", "Detergents", "Plasticizers"]);
        assert_eq!(summaries[0].total_intensity, 9.0);
        assert_eq!(total_hits(&summaries), hits.len());

        let table: ReferenceTable = BuiltinTable::Standard.into();
        let summaries = summarize_with(
            &hits,
            &SummaryOptions::default()
                .with_table(&table)
                .with_ordering(SummaryOrdering::ReferenceOrder),
        );
        let names: Vec<_> = summaries.iter().map(|s| s.category.as_str()).collect();
        assert_eq!(names, ["Polymers", "Detergents", "Plasticizers", "Others"]);
    }

    #[test]
    fn test_zero_fill() {
        let table: ReferenceTable = BuiltinTable::Standard.into();
        let hits = vec![hit("Plasticizers", 1.0), hit("Plasticizers", 1.0)];
        let summaries = summarize_with(
            &hits,
            &SummaryOptions::default()
                .with_table(&table)
                .with_zero_fill(true),
        );
        assert_eq!(summaries.len(), 4);
        assert_eq!(summaries[0], CategorySummary::new("Plasticizers", 2, 2.0));
        let names: Vec<_> = summaries[1..].iter().map(|s| s.category.as_str()).collect();
        assert_eq!(names, ["Detergents", "Others", "Polymers"]);
        assert!(summaries[1..].iter().all(|s| s.hit_count == 0));
    }

    #[test]
    fn test_distributions() {
        let hits: Vec<_> = [1.0, 2.0, 3.0, 4.0, 5.0]
            .into_iter()
            .map(|i| hit("Polymers", i))
            .collect();
        let summaries = summarize_with(&hits, &SummaryOptions::default().with_distributions(true));
        let dist = summaries[0].intensity.unwrap();
        assert_eq!(dist.min, 1.0);
        assert_eq!(dist.lower_quartile, 2.0);
        assert_eq!(dist.median, 3.0);
        assert_eq!(dist.upper_quartile, 4.0);
        assert_eq!(dist.max, 5.0);
        assert_eq!(dist.mean, 3.0);

        let dist = IntensityDistribution::from_intensities(&[4.0, 1.0]).unwrap();
        assert_eq!(dist.median, 2.5);
        assert!(IntensityDistribution::from_intensities(&[]).is_none());
    }
}
