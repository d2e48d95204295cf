//! Shaping screening results into the data a report renderer consumes.
//!
//! Nothing here draws or lays anything out. [`ReportData`] carries everything a
//! chart or document renderer needs, including a [`ReportStyle`] record so that
//! visual choices are configuration rather than code.
use std::fmt::{Display, Write};

use chrono::{DateTime, Local};
use itertools::Itertools;

use crate::hit::Hit;
use crate::summary::{CategorySummary, IntensityDistribution};

/// The number of individual hits listed in the top hits table
pub const TOP_HITS_CAP: usize = 20;

pub const DEFAULT_REPORT_TITLE: &str = "Contaminant Analysis Report";

/// An RGB triple
pub type Color = (u8, u8, u8);

/// Visual settings handed to the renderer untouched
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct ReportStyle {
    pub font_family: String,
    pub title_font_size: u8,
    pub body_font_size: u8,
    pub table_font_size: u8,
    pub header_color: Color,
    pub header_text_color: Color,
    pub text_color: Color,
    pub alternate_row_color: Color,
    pub border_color: Color,
    pub section_fill_color: Color,
    /// Column widths in millimeters for the category summary table
    pub summary_column_widths: Vec<f32>,
    /// Column widths in millimeters for the top hits table
    pub hit_column_widths: Vec<f32>,
    pub footer_text: Option<String>,
}

impl Default for ReportStyle {
    fn default() -> Self {
        Self {
            font_family: "Arial".to_string(),
            title_font_size: 16,
            body_font_size: 12,
            table_font_size: 10,
            header_color: (37, 99, 235),
            header_text_color: (255, 255, 255),
            text_color: (31, 41, 55),
            alternate_row_color: (243, 244, 246),
            border_color: (209, 213, 219),
            section_fill_color: (200, 220, 255),
            summary_column_widths: vec![90.0, 30.0],
            hit_column_widths: vec![30.0, 40.0, 40.0, 30.0],
            footer_text: None,
        }
    }
}

/// A labeled sequence of values for a bar chart
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ChartSeries {
    pub title: String,
    pub x_label: String,
    pub y_label: String,
    pub labels: Vec<String>,
    pub values: Vec<f64>,
}

/// One box of an intensity box plot
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct IntensityBox {
    pub category: String,
    pub distribution: IntensityDistribution,
}

/// Everything needed to render a report for one screening run
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ReportData {
    pub title: String,
    pub generated_at: DateTime<Local>,
    pub total_spectra: usize,
    pub total_hits: usize,
    pub summaries: Vec<CategorySummary>,
    /// The most intense hits, most intense first, at most `top_hits_cap` of them
    pub top_hits: Vec<Hit>,
    /// How many hits did not make it into `top_hits`
    pub omitted_hits: usize,
    pub hit_count_chart: ChartSeries,
    /// Empty unless the summaries carry intensity distributions
    pub intensity_chart: Vec<IntensityBox>,
    pub style: ReportStyle,
}

/// Configures how [`ReportData`] is assembled
#[derive(Debug, Clone)]
pub struct ReportBuilder {
    pub title: String,
    pub top_hits_cap: usize,
    pub style: ReportStyle,
    pub generated_at: Option<DateTime<Local>>,
}

impl Default for ReportBuilder {
    fn default() -> Self {
        Self {
            title: DEFAULT_REPORT_TITLE.to_string(),
            top_hits_cap: TOP_HITS_CAP,
            style: ReportStyle::default(),
            generated_at: None,
        }
    }
}

impl ReportBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn top_hits_cap(mut self, cap: usize) -> Self {
        self.top_hits_cap = cap;
        self
    }

    pub fn style(mut self, style: ReportStyle) -> Self {
        self.style = style;
        self
    }

    /// Pin the report timestamp instead of reading the clock at build time
    pub fn generated_at(mut self, when: DateTime<Local>) -> Self {
        self.generated_at = Some(when);
        self
    }

    pub fn build(
        &self,
        hits: &[Hit],
        summaries: &[CategorySummary],
        total_spectra: usize,
    ) -> ReportData {
        // A stable sort keeps traversal order among equally intense hits
        let top_hits: Vec<Hit> = hits
            .iter()
            .sorted_by(|a, b| b.intensity.total_cmp(&a.intensity))
            .take(self.top_hits_cap)
            .cloned()
            .collect();

        let hit_count_chart = ChartSeries {
            title: "Contaminant Hits by Class".to_string(),
            x_label: "Contaminant Class".to_string(),
            y_label: "Number of Hits".to_string(),
            labels: summaries.iter().map(|s| s.category.clone()).collect(),
            values: summaries.iter().map(|s| s.hit_count as f64).collect(),
        };

        let intensity_chart = summaries
            .iter()
            .filter_map(|s| {
                s.intensity.map(|distribution| IntensityBox {
                    category: s.category.clone(),
                    distribution,
                })
            })
            .collect();

        ReportData {
            title: self.title.clone(),
            generated_at: self.generated_at.unwrap_or_else(Local::now),
            total_spectra,
            total_hits: hits.len(),
            summaries: summaries.to_vec(),
            omitted_hits: hits.len() - top_hits.len(),
            top_hits,
            hit_count_chart,
            intensity_chart,
            style: self.style.clone(),
        }
    }
}

/// Assemble [`ReportData`] with the default title, style and top hits cap,
/// timestamped with the current local time.
pub fn build_report_data(
    hits: &[Hit],
    summaries: &[CategorySummary],
    total_spectra: usize,
) -> ReportData {
    ReportBuilder::default().build(hits, summaries, total_spectra)
}

impl ReportData {
    /// Whether there is nothing to chart, so a renderer should show a "no data" state
    pub fn is_empty(&self) -> bool {
        self.total_hits == 0
    }

    /// The timestamp formatted for use in output file names
    pub fn timestamp_slug(&self) -> String {
        self.generated_at.format("%Y%m%d_%H%M%S").to_string()
    }

    /// Rows of the category summary table: category, hit count
    pub fn summary_rows(&self) -> Vec<[String; 2]> {
        self.summaries
            .iter()
            .map(|s| [s.category.clone(), s.hit_count.to_string()])
            .collect()
    }

    pub const TOP_HIT_HEADERS: [&'static str; 4] =
        ["Class", "Contaminant", "Observed m/z", "Intensity"];

    /// Rows of the top hits table: class, contaminant, observed m/z, intensity
    pub fn top_hit_rows(&self) -> Vec<[String; 4]> {
        self.top_hits
            .iter()
            .map(|h| {
                [
                    h.category.clone(),
                    h.label.clone(),
                    format!("{:.4}", h.observed_mz),
                    format!("{:.0}", h.intensity),
                ]
            })
            .collect()
    }

    /// The plain text analysis summary block
    pub fn summary_text(&self) -> String {
        SummaryText(self).to_string()
    }

    fn write_summary<W: Write>(&self, buf: &mut W) -> std::fmt::Result {
        writeln!(buf, "Report Generated: {}", self.generated_at.format("%Y-%m-%d %H:%M:%S"))?;
        writeln!(buf, "Total spectra analyzed: {}", self.total_spectra)?;
        writeln!(buf, "Total contaminant hits: {}", self.total_hits)?;
        writeln!(buf)?;
        if self.summaries.iter().all(|s| s.hit_count == 0) {
            writeln!(buf, "No contaminants detected.")?;
        } else {
            writeln!(buf, "Contaminants by class:")?;
            for s in self.summaries.iter() {
                writeln!(buf, "- {}: {} hits", s.category, s.hit_count)?;
            }
        }
        Ok(())
    }
}

struct SummaryText<'a>(&'a ReportData);

impl Display for SummaryText<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.write_summary(f)
    }
}

impl Display for ReportData {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "{}", self.title)?;
        self.write_summary(f)?;
        if !self.top_hits.is_empty() {
            writeln!(f)?;
            writeln!(f, "Top Contaminant Hits")?;
            writeln!(f, "{}", Self::TOP_HIT_HEADERS.join("\t"))?;
            for row in self.top_hit_rows() {
                writeln!(f, "{}", row.join("\t"))?;
            }
            if self.omitted_hits > 0 {
                writeln!(f, "... and {} more rows", self.omitted_hits)?;
            }
        }
        Ok(())
    }
}
