//! Failure modes of a screening run.
use thiserror::Error;

/// The ways a screening run can fail.
///
/// Data errors name the spectrum that could not be screened so the caller can
/// decide whether to skip it or abort. Configuration errors are raised before
/// any spectrum is examined.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ScreenError {
    #[error("Spectrum {spectrum_index} has {mz_len} m/z values but {intensity_len} intensity values")]
    MismatchedArrays {
        spectrum_index: usize,
        mz_len: usize,
        intensity_len: usize,
    },
    #[error("Spectrum {spectrum_index} has a non-finite m/z or intensity at peak {peak_index}")]
    NonFiniteValue {
        spectrum_index: usize,
        peak_index: usize,
    },
    #[error("The matching tolerance must be a finite, non-negative number, got {0}")]
    InvalidTolerance(f64),
    #[error("The reference table does not contain any categories")]
    EmptyReferenceTable,
    #[error("The reference category {0:?} does not contain any entries")]
    EmptyCategory(String),
    #[error("The reference category {0:?} is defined more than once")]
    DuplicateCategory(String),
    #[error("The reference entry {label:?} in {category:?} has an invalid target m/z {target_mz}")]
    InvalidTargetMass {
        category: String,
        label: String,
        target_mz: f64,
    },
    #[error("Screening was cancelled before spectrum {spectrum_index}")]
    Cancelled { spectrum_index: usize },
}

impl ScreenError {
    /// Whether this error describes a malformed spectrum rather than a bad configuration
    pub fn is_data_error(&self) -> bool {
        matches!(
            self,
            Self::MismatchedArrays { .. } | Self::NonFiniteValue { .. }
        )
    }

    /// Whether this error was raised while validating parameters, before any scanning
    pub fn is_config_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidTolerance(_)
                | Self::EmptyReferenceTable
                | Self::EmptyCategory(_)
                | Self::DuplicateCategory(_)
                | Self::InvalidTargetMass { .. }
        )
    }

    /// The spectrum the error refers to, if any
    pub fn spectrum_index(&self) -> Option<usize> {
        match self {
            Self::MismatchedArrays { spectrum_index, .. }
            | Self::NonFiniteValue { spectrum_index, .. }
            | Self::Cancelled { spectrum_index } => Some(*spectrum_index),
            _ => None,
        }
    }
}
