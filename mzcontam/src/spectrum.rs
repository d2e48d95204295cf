//! A minimal peak list representation to screen against.
use std::iter::Zip;
use std::slice;

use mzpeaks::prelude::*;

use crate::error::ScreenError;

/// A single (m/z, intensity) pair from a peak list
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Peak {
    pub mz: f64,
    pub intensity: f64,
}

impl Peak {
    pub fn new(mz: f64, intensity: f64) -> Self {
        Self { mz, intensity }
    }
}

/// One scan's peak list, stored as parallel m/z and intensity arrays.
///
/// The arrays are not required to be sorted. Peaks are addressed by their
/// position in the arrays, which is also the order the matcher visits them in.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Spectrum {
    pub mz_array: Vec<f64>,
    pub intensity_array: Vec<f64>,
    /// The MS level of the scan, if the source reported one
    pub ms_level: Option<u8>,
    /// The native identifier of the scan in its source file
    pub id: Option<String>,
    /// The scan start time, in minutes
    pub start_time: Option<f64>,
}

impl Spectrum {
    pub fn new(mz_array: Vec<f64>, intensity_array: Vec<f64>) -> Self {
        Self {
            mz_array,
            intensity_array,
            ..Default::default()
        }
    }

    pub fn with_ms_level(mut self, ms_level: u8) -> Self {
        self.ms_level = Some(ms_level);
        self
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_start_time(mut self, start_time: f64) -> Self {
        self.start_time = Some(start_time);
        self
    }

    /// Build a spectrum from a slice of centroided peaks
    pub fn from_centroids<C: CentroidLike>(peaks: &[C]) -> Self {
        let mut mz_array = Vec::with_capacity(peaks.len());
        let mut intensity_array = Vec::with_capacity(peaks.len());
        for p in peaks {
            mz_array.push(p.mz());
            intensity_array.push(p.intensity() as f64);
        }
        Self::new(mz_array, intensity_array)
    }

    /// The number of peaks, taken from the m/z array
    pub fn len(&self) -> usize {
        self.mz_array.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mz_array.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<Peak> {
        match (self.mz_array.get(index), self.intensity_array.get(index)) {
            (Some(mz), Some(intensity)) => Some(Peak::new(*mz, *intensity)),
            _ => None,
        }
    }

    /// Iterate over peaks in array order
    pub fn iter(&self) -> PeakIter<'_> {
        PeakIter {
            inner: self.mz_array.iter().zip(self.intensity_array.iter()),
        }
    }

    /// The sum of all intensities
    pub fn tic(&self) -> f64 {
        self.intensity_array.iter().sum()
    }

    /// Check that the arrays are parallel and that every value is finite.
    ///
    /// `spectrum_index` is only used to label the error.
    pub fn validate(&self, spectrum_index: usize) -> Result<(), ScreenError> {
        if self.mz_array.len() != self.intensity_array.len() {
            return Err(ScreenError::MismatchedArrays {
                spectrum_index,
                mz_len: self.mz_array.len(),
                intensity_len: self.intensity_array.len(),
            });
        }
        if let Some(peak_index) = self
            .iter()
            .position(|p| !(p.mz.is_finite() && p.intensity.is_finite()))
        {
            return Err(ScreenError::NonFiniteValue {
                spectrum_index,
                peak_index,
            });
        }
        Ok(())
    }
}

impl FromIterator<(f64, f64)> for Spectrum {
    fn from_iter<T: IntoIterator<Item = (f64, f64)>>(iter: T) -> Self {
        let (mz_array, intensity_array) = iter.into_iter().unzip();
        Self::new(mz_array, intensity_array)
    }
}

pub struct PeakIter<'a> {
    inner: Zip<slice::Iter<'a, f64>, slice::Iter<'a, f64>>,
}

impl Iterator for PeakIter<'_> {
    type Item = Peak;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|(mz, i)| Peak::new(*mz, *i))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<'a> IntoIterator for &'a Spectrum {
    type Item = Peak;
    type IntoIter = PeakIter<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

#[cfg(test)]
mod test {
    use mzpeaks::CentroidPeak;

    use super::*;

    #[test]
    fn test_from_centroids() {
        let peaks = vec![
            CentroidPeak::new(391.2843, 5000.0, 0),
            CentroidPeak::new(429.0887, 250.0, 1),
        ];
        let spectrum = Spectrum::from_centroids(&peaks);
        assert_eq!(spectrum.len(), 2);
        assert_eq!(spectrum.get(1), Some(Peak::new(429.0887, 250.0)));
        assert_eq!(spectrum.tic(), 5250.0);
    }

    #[test]
    fn test_validate() {
        let spectrum = Spectrum::new(vec![100.0, 200.0], vec![1.0]);
        assert_eq!(
            spectrum.validate(3),
            Err(ScreenError::MismatchedArrays {
                spectrum_index: 3,
                mz_len: 2,
                intensity_len: 1
            })
        );

        let spectrum: Spectrum = [(100.0, 1.0), (f64::INFINITY, 2.0)].into_iter().collect();
        assert_eq!(
            spectrum.validate(0),
            Err(ScreenError::NonFiniteValue {
                spectrum_index: 0,
                peak_index: 1
            })
        );

        let spectrum: Spectrum = [(100.0, 1.0), (200.0, f64::NAN)].into_iter().collect();
        assert!(spectrum.validate(0).unwrap_err().is_data_error());

        Spectrum::default().validate(0).unwrap();
    }
}
