use std::fs;
use std::io::{self, prelude::*};
use std::path::Path;

use flate2::write::GzEncoder;
use flate2::Compression;
use serde::Serialize;
use tracing::{debug, info};

use mzcontam::{Hit, ReportData, ScreenParams};

use crate::load::SpectrumOrigin;

pub(crate) const TSV_HEADER: [&str; 11] = [
    "spectrum_index",
    "scan_id",
    "start_time",
    "ms_level",
    "category",
    "label",
    "target_mz",
    "observed_mz",
    "mass_error",
    "intensity",
    "peak_index",
];

/// The JSON document written as the main output of a run
#[derive(Debug, Serialize)]
pub struct ReportDocument<'a> {
    pub version: &'static str,
    pub input_file: &'a str,
    pub parameters: &'a ScreenParams,
    pub screened_spectra: usize,
    pub peaks_scanned: usize,
    pub summary_text: String,
    pub report: &'a ReportData,
}

fn is_gzip_path(path: &Path) -> bool {
    path.extension().is_some_and(|ext| ext == "gz")
}

/// A destination for run output. Gzip streams must be [`finish`](OutputSink::finish)ed
/// to write their trailer.
pub enum OutputSink {
    Stdout(io::BufWriter<io::Stdout>),
    File(io::BufWriter<fs::File>),
    Gzip(GzEncoder<io::BufWriter<fs::File>>),
}

impl OutputSink {
    /// Open `path` for writing, with '-' meaning STDOUT and a `.gz` suffix meaning
    /// gzip compression.
    pub fn open(path: &Path) -> io::Result<Self> {
        if path == Path::new("-") {
            return Ok(Self::Stdout(io::BufWriter::new(io::stdout())));
        }
        let handle = io::BufWriter::new(fs::File::create(path)?);
        if is_gzip_path(path) {
            debug!("Compressing {}", path.display());
            Ok(Self::Gzip(GzEncoder::new(handle, Compression::best())))
        } else {
            Ok(Self::File(handle))
        }
    }

    pub fn finish(self) -> io::Result<()> {
        match self {
            Self::Stdout(mut w) => w.flush(),
            Self::File(mut w) => w.flush(),
            Self::Gzip(w) => w.finish()?.flush(),
        }
    }
}

impl Write for OutputSink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            Self::Stdout(w) => w.write(buf),
            Self::File(w) => w.write(buf),
            Self::Gzip(w) => w.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            Self::Stdout(w) => w.flush(),
            Self::File(w) => w.flush(),
            Self::Gzip(w) => w.flush(),
        }
    }
}

pub fn write_report_json<W: Write>(mut writer: W, document: &ReportDocument<'_>) -> io::Result<()> {
    serde_json::to_writer_pretty(&mut writer, document)?;
    writeln!(writer)?;
    writer.flush()
}

pub fn write_hits_tsv<W: Write>(
    mut writer: W,
    hits: &[Hit],
    origins: &[SpectrumOrigin],
) -> io::Result<()> {
    writeln!(writer, "{}", TSV_HEADER.join("\t"))?;
    for hit in hits {
        let origin = origins.get(hit.spectrum_index);
        writeln!(
            writer,
            "{}\t{}\t{}\t{}\t{}\t{}\t{:0.4}\t{:0.4}\t{:0.4}\t{:0.0}\t{}",
            hit.spectrum_index,
            origin.map(|o| o.id.as_str()).unwrap_or_default(),
            origin
                .map(|o| format!("{:0.4}", o.start_time))
                .unwrap_or_default(),
            origin.map(|o| o.ms_level.to_string()).unwrap_or_default(),
            hit.category,
            hit.label,
            hit.target_mz,
            hit.observed_mz,
            hit.mass_error(),
            hit.intensity,
            hit.peak_index,
        )?;
    }
    writer.flush()
}

/// Echo the report summary to the log
pub fn log_summary(report: &ReportData) {
    for line in report.summary_text().lines() {
        info!("{line}");
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_write_hits_tsv() -> io::Result<()> {
        let hits = vec![
            Hit::new(0, "Polymers", "PEG/PPG", 391.2843, 391.3, 5000.0, 3),
            Hit::new(5, "Detergents", "Tween", 522.3554, 522.4, 20.0, 0),
        ];
        let origins = vec![SpectrumOrigin {
            index: 10,
            id: "scan=11".to_string(),
            start_time: 12.5,
            ms_level: 1,
        }];
        let mut buffer = Vec::new();
        write_hits_tsv(&mut buffer, &hits, &origins)?;
        let text = String::from_utf8(buffer).unwrap();
        let lines: Vec<_> = text.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("spectrum_index\tscan_id"));
        assert_eq!(
            lines[1],
            "0\tscan=11\t12.5000\t1\tPolymers\tPEG/PPG\t391.2843\t391.3000\t0.0157\t5000\t3"
        );
        assert!(lines[2].starts_with("5\t\t\t\tDetergents\tTween"));
        Ok(())
    }

    #[test]
    fn test_gzip_output() -> io::Result<()> {
        let path = std::env::temp_dir().join("mzcontamer_test_gzip_output.tsv.gz");
        let hits = vec![Hit::new(0, "Polymers", "PEG/PPG", 391.2843, 391.3, 5000.0, 3)];
        let mut sink = OutputSink::open(&path)?;
        assert!(matches!(sink, OutputSink::Gzip(_)));
        write_hits_tsv(&mut sink, &hits, &[])?;
        sink.finish()?;

        let mut text = String::new();
        flate2::read::GzDecoder::new(fs::File::open(&path)?).read_to_string(&mut text)?;
        fs::remove_file(&path)?;
        let lines: Vec<_> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[1].starts_with("0\t\t\t\tPolymers\tPEG/PPG"));
        Ok(())
    }

    #[test]
    fn test_gzip_path() {
        assert!(is_gzip_path(Path::new("report.json.gz")));
        assert!(!is_gzip_path(Path::new("report.json")));
        assert!(!is_gzip_path(Path::new("-")));
    }
}
