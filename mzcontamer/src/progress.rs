use std::ops::AddAssign;

#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct ProgressRecord {
    /// Spectra decoded from the input, whether or not they were screened
    pub spectra_read: usize,
    pub spectra_screened: usize,
    /// Spectra passed over by the MS level filter
    pub spectra_skipped: usize,
    /// Spectra whose peak arrays could not be used
    pub spectra_rejected: usize,
    pub peaks_scanned: usize,
    pub hits: usize,
}

impl ProgressRecord {
    /// One spectrum read and screened
    pub fn screened(peaks_scanned: usize, hits: usize) -> Self {
        Self {
            spectra_read: 1,
            spectra_screened: 1,
            peaks_scanned,
            hits,
            ..Default::default()
        }
    }

    pub fn skipped() -> Self {
        Self {
            spectra_read: 1,
            spectra_skipped: 1,
            ..Default::default()
        }
    }

    pub fn rejected() -> Self {
        Self {
            spectra_read: 1,
            spectra_rejected: 1,
            ..Default::default()
        }
    }

    pub fn log(&self) {
        tracing::info!(
            "Spectra Read: {} | Screened: {} | Skipped: {} | Rejected: {}",
            self.spectra_read,
            self.spectra_screened,
            self.spectra_skipped,
            self.spectra_rejected
        );
        tracing::info!("Peaks Scanned: {}", self.peaks_scanned);
        tracing::info!("Contaminant Hits: {}", self.hits);
    }
}

impl AddAssign for ProgressRecord {
    fn add_assign(&mut self, rhs: Self) {
        self.spectra_read += rhs.spectra_read;
        self.spectra_screened += rhs.spectra_screened;
        self.spectra_skipped += rhs.spectra_skipped;
        self.spectra_rejected += rhs.spectra_rejected;
        self.peaks_scanned += rhs.peaks_scanned;
        self.hits += rhs.hits;
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_accumulate() {
        let mut acc = ProgressRecord::default();
        acc += ProgressRecord::screened(12, 2);
        acc += ProgressRecord::skipped();
        acc += ProgressRecord::rejected();
        acc += ProgressRecord::screened(12, 2);
        assert_eq!(acc.spectra_read, 4);
        assert_eq!(acc.spectra_screened, 2);
        assert_eq!(acc.spectra_skipped, 1);
        assert_eq!(acc.spectra_rejected, 1);
        assert_eq!(acc.peaks_scanned, 24);
        assert_eq!(acc.hits, 4);
    }
}
