use std::fs;
use std::path::Path;

use mzdata::prelude::*;
use mzdata::spectrum::bindata::{ArrayRetrievalError, BinaryArrayMap};
use mzdata::spectrum::{MultiLayerSpectrum, RefPeakDataLevel};
use mzpeaks::{CentroidPeak, DeconvolutedPeak};
use tracing::debug;

use mzcontam::{ReferenceTable, Spectrum};

use crate::args::ArgReferenceTable;
use crate::driver::MZContamerError;

pub(crate) type CPeak = CentroidPeak;
pub(crate) type DPeak = DeconvolutedPeak;
pub(crate) type SpectrumType = MultiLayerSpectrum<CPeak, DPeak>;

/// Where the spectrum sits in its source file, kept alongside the screened
/// sequence so hits can be traced back to a scan.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct SpectrumOrigin {
    pub index: usize,
    pub id: String,
    pub start_time: f64,
    pub ms_level: u8,
}

impl SpectrumOrigin {
    pub fn from_spectrum<S: SpectrumLike<CPeak, DPeak>>(source: &S) -> Self {
        Self {
            index: source.index(),
            id: source.id().to_string(),
            start_time: source.start_time(),
            ms_level: source.ms_level(),
        }
    }
}

fn array_or_empty<T: Clone>(
    values: Result<std::borrow::Cow<'_, [T]>, ArrayRetrievalError>,
) -> Result<Vec<T>, ArrayRetrievalError> {
    match values {
        Ok(values) => Ok(values.into_owned()),
        Err(ArrayRetrievalError::NotFound(_)) => Ok(Vec::new()),
        Err(e) => Err(e),
    }
}

fn spectrum_from_arrays(arrays: &BinaryArrayMap) -> Result<Spectrum, ArrayRetrievalError> {
    let mzs = array_or_empty(arrays.mzs())?;
    let intensities = array_or_empty(arrays.intensities())?;
    Ok(Spectrum::new(
        mzs,
        intensities.into_iter().map(|i| i as f64).collect(),
    ))
}

/// Convert the most refined peak data available on `source` into a [`Spectrum`].
///
/// Deconvoluted peaks have no m/z to screen, so the raw arrays are used instead
/// when present.
pub fn spectrum_from_mzdata<S: SpectrumLike<CPeak, DPeak>>(
    source: &S,
) -> Result<Spectrum, ArrayRetrievalError> {
    let spectrum = match source.peaks() {
        RefPeakDataLevel::Missing => Spectrum::default(),
        RefPeakDataLevel::RawData(arrays) => spectrum_from_arrays(arrays)?,
        RefPeakDataLevel::Centroid(peaks) => Spectrum::from_centroids(peaks.as_slice()),
        RefPeakDataLevel::Deconvoluted(_) => match source.raw_arrays() {
            Some(arrays) => spectrum_from_arrays(arrays)?,
            None => {
                debug!("{} only has deconvoluted peaks", source.id());
                Spectrum::default()
            }
        },
    };
    Ok(spectrum
        .with_ms_level(source.ms_level())
        .with_id(source.id())
        .with_start_time(source.start_time()))
}

/// Read a custom reference table from a TOML file
pub fn load_reference_table<P: AsRef<Path>>(path: P) -> Result<ReferenceTable, MZContamerError> {
    let path = path.as_ref();
    let text = fs::read_to_string(path)?;
    let table: ReferenceTable =
        toml::from_str(&text).map_err(|e| MZContamerError::ReferenceTableError {
            path: path.display().to_string(),
            source: e,
        })?;
    debug!(
        "Read {} categories and {} entries from {}",
        table.len(),
        table.num_entries(),
        path.display()
    );
    Ok(table)
}

/// Pick the reference table for a run, preferring a file over a built-in name
pub fn resolve_reference_table<P: AsRef<Path>>(
    path: Option<P>,
    builtin: ArgReferenceTable,
) -> Result<ReferenceTable, MZContamerError> {
    let table = match path {
        Some(path) => load_reference_table(path)?,
        None => mzcontam::BuiltinTable::from(builtin).into(),
    };
    table.validate()?;
    Ok(table)
}

#[cfg(test)]
mod test {
    use std::io::Write;

    use mzdata::spectrum::SpectrumDescription;
    use mzpeaks::PeakSet;

    use super::*;

    #[test]
    fn test_spectrum_from_centroids() {
        let mut description = SpectrumDescription::default();
        description.id = "scan=7".to_string();
        description.index = 6;
        description.ms_level = 2;
        let peaks = PeakSet::new(vec![
            CentroidPeak::new(391.2843, 5000.0, 0),
            CentroidPeak::new(522.3554, 20.0, 1),
        ]);
        let source = SpectrumType::new(description, None, Some(peaks), None);
        let spectrum = spectrum_from_mzdata(&source).unwrap();
        assert_eq!(spectrum.len(), 2);
        assert_eq!(spectrum.mz_array, vec![391.2843, 522.3554]);
        assert_eq!(spectrum.intensity_array, vec![5000.0, 20.0]);
        assert_eq!(spectrum.ms_level, Some(2));
        assert_eq!(spectrum.id.as_deref(), Some("scan=7"));

        let origin = SpectrumOrigin::from_spectrum(&source);
        assert_eq!(origin.index, 6);
        assert_eq!(origin.id, "scan=7");
    }

    #[test]
    fn test_missing_peaks_are_empty() {
        let source = SpectrumType::default();
        let spectrum = spectrum_from_mzdata(&source).unwrap();
        assert!(spectrum.is_empty());
    }

    #[test]
    fn test_load_reference_table() -> Result<(), MZContamerError> {
        let path = std::env::temp_dir().join("mzcontamer_load_reference_table.toml");
        let mut fh = fs::File::create(&path)?;
        writeln!(
            fh,
            r#"
[[category]]
name = "Polymers"
entries = [{{ mz = 391.2843, label = "PEG/PPG" }}]

[[category]]
name = "Solvent Peaks"
entries = [{{ target_mz = 89.0626, label = "Acetonitrile" }}]
"#
        )?;
        drop(fh);
        let table = resolve_reference_table(Some(&path), ArgReferenceTable::Extended)?;
        assert_eq!(table.len(), 2);
        assert_eq!(
            table.category_names().collect::<Vec<_>>(),
            ["Polymers", "Solvent Peaks"]
        );
        fs::remove_file(&path)?;

        let table = resolve_reference_table(None::<&Path>, ArgReferenceTable::Extended)?;
        assert_eq!(table.len(), 15);
        Ok(())
    }

    #[test]
    fn test_reference_table_rejected() {
        let path = std::env::temp_dir().join("mzcontamer_empty_reference_table.toml");
        fs::write(&path, "category = []\n").unwrap();
        let err = resolve_reference_table(Some(&path), ArgReferenceTable::Standard).unwrap_err();
        assert!(matches!(
            err,
            MZContamerError::ScreenError(mzcontam::ScreenError::EmptyReferenceTable)
        ));
        fs::remove_file(&path).unwrap();
    }
}
