use std::fmt::Display;

/// A peak that fell within tolerance of a reference entry.
///
/// Hits are created by the matcher and are never modified afterwards.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Hit {
    /// The position of the matched spectrum in the screened sequence
    pub spectrum_index: usize,
    pub category: String,
    pub label: String,
    pub target_mz: f64,
    pub observed_mz: f64,
    pub intensity: f64,
    /// The position of the matched peak within its spectrum. When intensities are
    /// summed over several peaks, this is the most intense contributor.
    pub peak_index: usize,
}

impl Hit {
    pub fn new(
        spectrum_index: usize,
        category: impl Into<String>,
        label: impl Into<String>,
        target_mz: f64,
        observed_mz: f64,
        intensity: f64,
        peak_index: usize,
    ) -> Self {
        Self {
            spectrum_index,
            category: category.into(),
            label: label.into(),
            target_mz,
            observed_mz,
            intensity,
            peak_index,
        }
    }

    /// The signed mass error in Daltons
    pub fn mass_error(&self) -> f64 {
        self.observed_mz - self.target_mz
    }

    /// The signed mass error in parts-per-million of the target m/z
    pub fn ppm_error(&self) -> f64 {
        (self.observed_mz - self.target_mz) / self.target_mz * 1e6
    }
}

impl Display for Hit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}/{} @ {:0.4} (observed {:0.4}, {:0.0}) in spectrum {}",
            self.category,
            self.label,
            self.target_mz,
            self.observed_mz,
            self.intensity,
            self.spectrum_index
        )
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_errors() {
        let hit = Hit::new(0, "Polymers", "PEG/PPG", 500.0, 500.25, 100.0, 0);
        assert!((hit.mass_error() - 0.25).abs() < 1e-12);
        assert!((hit.ppm_error() - 500.0).abs() < 1e-6);

        let hit = Hit::new(0, "Polymers", "PEG/PPG", 500.0, 499.75, 100.0, 0);
        assert!((hit.ppm_error() + 500.0).abs() < 1e-6);
    }
}
