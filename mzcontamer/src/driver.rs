use std::fs;
use std::io;
use std::path::PathBuf;
use std::str::FromStr;
use std::thread;
use std::time::Instant;

use clap::Parser;
use crossbeam_channel::{bounded, Receiver, Sender};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use tracing::{debug, info, warn};

use mzdata::io::{
    infer_format, infer_from_stream, mgf::MGFReaderType, mzml::MzMLReaderType,
    MassSpectrometryFormat, PreBufferedStream, RestartableGzDecoder, StreamingSpectrumIterator,
    MZReader,
};
use mzdata::prelude::*;

use mzcontam::matcher::DEFAULT_TOLERANCE;
use mzcontam::report::TOP_HITS_CAP;
use mzcontam::{
    MatchParams, ReferenceTable, ScreenError, ScreenOutcome, ScreenParams, ScreeningSession,
};

use crate::args::{ArgDedupPolicy, ArgReferenceTable, ArgSummaryOrdering, ReportParams};
use crate::load::{
    resolve_reference_table, spectrum_from_mzdata, CPeak, DPeak, SpectrumOrigin, SpectrumType,
};
use crate::progress::ProgressRecord;
use crate::time_range::TimeRange;
use crate::write::{log_summary, write_hits_tsv, write_report_json, OutputSink, ReportDocument};

pub(crate) const BUFFER_SIZE: usize = 1_000;
const BATCH_SIZE: usize = 64;
const PROGRESS_INTERVAL: usize = 5_000;

fn non_negative_float_f64(s: &str) -> Result<f64, String> {
    let value = s.parse::<f64>().map_err(|e| e.to_string())?;
    if value < 0.0 {
        Err(format!("`{s}` is less than zero"))
    } else if !value.is_finite() {
        Err(format!("`{s}` is not a finite number"))
    } else {
        Ok(value)
    }
}

#[derive(Debug, Error)]
pub enum MZContamerError {
    #[error("An IO error occurred: {0}")]
    IOError(
        #[source]
        #[from]
        io::Error,
    ),
    #[error("The input file format for {0} was either unknown or not supported ({1:?})")]
    FormatUnknownOrNotSupportedError(String, MassSpectrometryFormat),
    #[error("The input file format from STDIN was either unknown or not supported ({0:?})")]
    FormatUnknownOrNotSupportedErrorStdIn(MassSpectrometryFormat),
    #[error("Failed to read the reference table from {path}: {source}")]
    ReferenceTableError {
        path: String,
        #[source]
        source: toml::de::Error,
    },
    #[error("Screening failed: {0}")]
    ScreenError(
        #[source]
        #[from]
        ScreenError,
    ),
    #[error("Failed to build the thread pool: {0}")]
    ThreadPoolError(
        #[source]
        #[from]
        rayon::ThreadPoolBuildError,
    ),
}

/// Screen mass spectrometry files for known contaminant signatures.
///
/// Read a file or stream, compare every peak against a table of known contaminant
/// masses, and write a JSON report of the hits, per-category summaries and chart data.
#[derive(Parser, Debug, Clone, Deserialize, Serialize)]
#[command(author, version)]
#[serde(default)]
pub struct MZContamer {
    /// The path to read the input spectra from, or if '-' is passed, read from STDIN
    #[arg()]
    pub input_file: String,

    /// The path to write the JSON report to, or if '-' is passed, write to STDOUT.
    ///
    /// If the path ends with `.gz`, the report will be gzip compressed.
    #[arg(short = 'o', long = "output-file", default_value = "-")]
    pub output_file: PathBuf,

    /// The path to write a tab-separated table of every contaminant hit to
    #[arg(short = 'H', long = "hits-file")]
    pub hits_file: Option<PathBuf>,

    /// The path to write a log file to, in addition to STDERR
    #[arg(short = 'l', long = "log-file")]
    pub log_file: Option<PathBuf>,

    /// A TOML configuration file to read additional parameters from.
    ///
    /// Configurations are also read from `mzcontamer.toml` in the working directory.
    /// Environment variables prefixed with `MZCONTAMER_` will be read too.
    #[arg(long = "config-file")]
    pub config_file: Option<PathBuf>,

    /// The number of spectra to queue between the reader and the screener
    #[arg(short = 'w', long = "buffer-size", default_value_t = BUFFER_SIZE)]
    pub buffer_size: usize,

    /// The number of threads to use, passing a value < 1 to use all available threads
    #[arg(
        short='t',
        long="threads",
        default_value_t=-1,
    )]
    pub threads: i32,

    /// The time range to screen, denoted (start?)-(stop?)
    #[arg(
        short='r',
        long="time-range",
        value_parser=TimeRange::from_str,
        value_name="BEGIN-END",
        long_help=r#"The time range to screen, denoted (start?)-(stop?)

If a start is not specified, screening begins from the start of the run.
If a stop is not specified, screening stops at the end of the run.
"#
    )]
    pub time_range: Option<TimeRange>,

    /// The maximum absolute m/z difference, in Daltons, for a peak to match a reference entry
    #[arg(
        short = 'e',
        long = "tolerance",
        default_value_t = DEFAULT_TOLERANCE,
        value_parser = non_negative_float_f64
    )]
    pub tolerance: f64,

    /// Only screen spectra of this MS level
    #[arg(short = 'L', long = "ms-level", value_parser = clap::value_parser!(u8).range(1..))]
    pub ms_level: Option<u8>,

    /// How to report several peaks matching the same reference entry in one spectrum
    #[arg(short = 'd', long = "dedup", default_value = "all-peaks")]
    pub dedup: ArgDedupPolicy,

    /// The built-in reference table to screen against
    #[arg(short = 'R', long = "reference", default_value = "standard")]
    pub reference: ArgReferenceTable,

    /// A TOML file containing a custom reference table, used instead of `--reference`
    #[arg(short = 'f', long = "reference-file")]
    pub reference_file: Option<PathBuf>,

    /// List reference categories without any hits in the summaries
    #[arg(short = 'z', long = "zero-fill")]
    pub zero_fill: bool,

    /// How to order the category summaries
    #[arg(short = 's', long = "summary-order", default_value = "hit-count")]
    pub summary_order: ArgSummaryOrdering,

    /// Compute intensity distributions for each category
    #[arg(short = 'D', long = "distributions")]
    pub distributions: bool,

    /// The number of most intense hits to list in the report
    #[arg(short = 'n', long = "top-hits", default_value_t = TOP_HITS_CAP)]
    pub top_hits: usize,

    #[arg(
        skip,
        help = "The report title and visual style handed to renderers"
    )]
    pub report: ReportParams,
}

impl Default for MZContamer {
    fn default() -> Self {
        Self {
            input_file: "-".to_string(),
            output_file: PathBuf::from("-"),
            hits_file: None,
            log_file: None,
            config_file: None,
            buffer_size: BUFFER_SIZE,
            threads: -1,
            time_range: None,
            tolerance: DEFAULT_TOLERANCE,
            ms_level: None,
            dedup: ArgDedupPolicy::default(),
            reference: ArgReferenceTable::default(),
            reference_file: None,
            zero_fill: false,
            summary_order: ArgSummaryOrdering::default(),
            distributions: false,
            top_hits: TOP_HITS_CAP,
            report: ReportParams::default(),
        }
    }
}

/// Everything the screening stage hands back to the driver
struct ScreenResult {
    outcome: ScreenOutcome,
    origins: Vec<SpectrumOrigin>,
    progress: ProgressRecord,
}

fn read_spectra<R: Iterator<Item = SpectrumType>>(
    reader: R,
    time_range: TimeRange,
    sender: Sender<SpectrumType>,
) -> usize {
    let mut n_sent = 0;
    for spectrum in reader {
        let time = spectrum.start_time();
        if time < time_range.start {
            continue;
        }
        if time_range.is_past(time) {
            debug!("Reached the end of the time range at {time:0.3}");
            break;
        }
        if sender.send(spectrum).is_err() {
            warn!("Screening stopped early, no longer reading");
            break;
        }
        n_sent += 1;
    }
    n_sent
}

impl MZContamer {
    fn create_threadpool(&self) -> Result<rayon::ThreadPool, MZContamerError> {
        let num_threads = if self.threads > 0 {
            self.threads as usize
        } else {
            thread::available_parallelism()?.into()
        };
        debug!("Using {} cores", num_threads);
        Ok(rayon::ThreadPoolBuilder::new()
            .num_threads(num_threads)
            .build()?)
    }

    pub fn screen_params(&self) -> ScreenParams {
        let mut params = ScreenParams::new(MatchParams::new(
            self.tolerance,
            self.dedup.into(),
            self.ms_level,
        ));
        params.zero_fill = self.zero_fill;
        params.ordering = self.summary_order.into();
        params.distributions = self.distributions;
        params
    }

    pub fn main(&self) -> Result<(), MZContamerError> {
        info!(
            "mzcontamer v{}",
            option_env!("CARGO_PKG_VERSION").unwrap_or("unknown")
        );
        info!("Input: {}", self.input_file);
        info!("Output: {}", self.output_file.display());
        let table = resolve_reference_table(self.reference_file.as_ref(), self.reference)?;
        match self.reference_file.as_ref() {
            Some(path) => info!("Reference: {}", path.display()),
            None => info!("Reference: {}", self.reference),
        }
        info!(
            "{} categories, {} reference masses, tolerance {} Da",
            table.len(),
            table.num_entries(),
            self.tolerance
        );
        self.create_threadpool()?
            .install(|| self.reader_then(&table))
    }

    fn reader_then(&self, table: &ReferenceTable) -> Result<(), MZContamerError> {
        if self.input_file == "-" {
            let mut buffered =
                PreBufferedStream::new_with_buffer_size(io::stdin(), 2usize.pow(20))?;
            let (ms_format, compressed) = infer_from_stream(&mut buffered)?;
            debug!("Detected {ms_format:?} from STDIN (compressed? {compressed})");
            match ms_format {
                MassSpectrometryFormat::MGF => {
                    if compressed {
                        let reader = StreamingSpectrumIterator::new(MGFReaderType::new(
                            RestartableGzDecoder::new(io::BufReader::new(buffered)),
                        ));
                        self.screen_then(reader, table)?;
                    } else {
                        let reader = StreamingSpectrumIterator::new(MGFReaderType::new(buffered));
                        self.screen_then(reader, table)?;
                    }
                }
                MassSpectrometryFormat::MzML => {
                    if compressed {
                        let reader = StreamingSpectrumIterator::new(MzMLReaderType::new(
                            RestartableGzDecoder::new(io::BufReader::new(buffered)),
                        ));
                        self.screen_then(reader, table)?;
                    } else {
                        let reader = StreamingSpectrumIterator::new(MzMLReaderType::new(buffered));
                        self.screen_then(reader, table)?;
                    }
                }
                _ => {
                    return Err(MZContamerError::FormatUnknownOrNotSupportedErrorStdIn(
                        ms_format,
                    ))
                }
            }
        } else {
            let (ms_format, compressed) = infer_format(&self.input_file)?;
            debug!("Detected {ms_format:?} from path (compressed? {compressed})");
            match (ms_format, compressed) {
                (MassSpectrometryFormat::MGF, true) => {
                    let fh = RestartableGzDecoder::new(io::BufReader::new(fs::File::open(
                        &self.input_file,
                    )?));
                    let reader = StreamingSpectrumIterator::new(MGFReaderType::new(fh));
                    self.screen_then(reader, table)?;
                }
                (MassSpectrometryFormat::MzML, true) => {
                    let fh = RestartableGzDecoder::new(io::BufReader::new(fs::File::open(
                        &self.input_file,
                    )?));
                    let reader = StreamingSpectrumIterator::new(MzMLReaderType::new(fh));
                    self.screen_then(reader, table)?;
                }
                (MassSpectrometryFormat::Unknown, _) | (_, true) => {
                    return Err(MZContamerError::FormatUnknownOrNotSupportedError(
                        self.input_file.clone(),
                        ms_format,
                    ))
                }
                // Uncompressed mzMLb and Thermo RAW are opened here when mzdata is built with them
                (_, false) => {
                    let reader = MZReader::open_path(self.input_file.clone())?;
                    self.screen_then(reader, table)?;
                }
            }
        }
        Ok(())
    }

    fn screen_then<
        R: RandomAccessSpectrumIterator<CPeak, DPeak, SpectrumType> + Send + 'static,
    >(
        &self,
        mut reader: R,
        table: &ReferenceTable,
    ) -> Result<(), MZContamerError> {
        let time_range = self.time_range.unwrap_or_default();
        if time_range.start > 0.0 {
            info!("Starting from {}", time_range.start);
            if let Err(e) = reader.start_from_time(time_range.start) {
                warn!("Failed to seek to {}, scanning from the beginning: {e}", time_range.start);
            }
        }

        let start = Instant::now();
        let (sender, receiver) = bounded(self.buffer_size.max(1));
        let read_task = thread::spawn(move || read_spectra(reader, time_range, sender));

        let screened = self.screen_spectra(receiver, table);

        match read_task.join() {
            Ok(n) => debug!("Reader finished after {n} spectra"),
            Err(e) => warn!("Failed to join reader task: {e:?}"),
        }
        let ScreenResult {
            outcome,
            origins,
            progress,
        } = screened?;
        progress.log();
        info!("Screening Elapsed Time: {:0.3?}", Instant::now() - start);

        let report = outcome.report_with(&self.report.make_builder(self.top_hits));
        log_summary(&report);

        let params = self.screen_params();
        let document = ReportDocument {
            version: option_env!("CARGO_PKG_VERSION").unwrap_or("unknown"),
            input_file: &self.input_file,
            parameters: &params,
            screened_spectra: outcome.screened_spectra,
            peaks_scanned: outcome.peaks_scanned,
            summary_text: report.summary_text(),
            report: &report,
        };
        let mut output = OutputSink::open(&self.output_file)?;
        write_report_json(&mut output, &document)?;
        output.finish()?;

        if let Some(hits_file) = self.hits_file.as_ref() {
            info!("Writing {} hits to {}", outcome.hits.len(), hits_file.display());
            let mut output = OutputSink::open(hits_file)?;
            write_hits_tsv(&mut output, &outcome.hits, &origins)?;
            output.finish()?;
        }
        Ok(())
    }

    fn screen_spectra(
        &self,
        receiver: Receiver<SpectrumType>,
        table: &ReferenceTable,
    ) -> Result<ScreenResult, MZContamerError> {
        let mut session = ScreeningSession::new(table, self.screen_params())?;
        let mut origins = Vec::new();
        let mut progress = ProgressRecord::default();
        let mut batch = Vec::with_capacity(BATCH_SIZE);

        while let Ok(first) = receiver.recv() {
            batch.clear();
            batch.push(first);
            batch.extend(receiver.try_iter().take(BATCH_SIZE - 1));

            let converted: Vec<_> = batch
                .par_iter()
                .map(|s| (SpectrumOrigin::from_spectrum(s), spectrum_from_mzdata(s)))
                .collect();

            for (origin, spectrum) in converted {
                progress += match spectrum {
                    Ok(spectrum) => {
                        let accepted = session.matcher().accepts(&spectrum);
                        match session.push(&spectrum) {
                            Ok(n_hits) if accepted => {
                                ProgressRecord::screened(spectrum.len(), n_hits)
                            }
                            Ok(_) => ProgressRecord::skipped(),
                            Err(e) if e.is_data_error() => {
                                warn!("Skipping {}: {e}", origin.id);
                                ProgressRecord::rejected()
                            }
                            Err(e) => return Err(e.into()),
                        }
                    }
                    Err(e) => {
                        warn!("Failed to read the peaks of {}: {e}", origin.id);
                        session.skip();
                        ProgressRecord::rejected()
                    }
                };
                if progress.spectra_read % PROGRESS_INTERVAL == 0 {
                    info!(
                        "Screened {} spectra | Scans={} Time={:0.3}",
                        progress.spectra_read, origin.id, origin.start_time
                    );
                }
                origins.push(origin);
            }
        }

        Ok(ScreenResult {
            outcome: session.finish(),
            origins,
            progress,
        })
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_non_negative_float() {
        assert_eq!(non_negative_float_f64("0.5"), Ok(0.5));
        assert_eq!(non_negative_float_f64("0"), Ok(0.0));
        assert!(non_negative_float_f64("-0.1").is_err());
        assert!(non_negative_float_f64("inf").is_err());
        assert!(non_negative_float_f64("x").is_err());
    }

    #[test]
    fn test_screen_params_from_args() {
        let args = MZContamer::parse_from([
            "mzcontamer",
            "input.mzML",
            "-e",
            "0.02",
            "-L",
            "1",
            "-d",
            "summed-intensity",
            "-z",
            "-s",
            "reference",
        ]);
        let params = args.screen_params();
        assert_eq!(params.match_params.tolerance, 0.02);
        assert_eq!(params.match_params.ms_level, Some(1));
        assert_eq!(
            params.match_params.dedup,
            mzcontam::DedupPolicy::SummedIntensity
        );
        assert!(params.zero_fill);
        assert_eq!(params.ordering, mzcontam::SummaryOrdering::ReferenceOrder);
        assert!(!params.distributions);
    }

    #[test]
    fn test_read_spectra_time_window() {
        let spectra: Vec<SpectrumType> = [1.0, 2.0, 3.0, 4.0]
            .into_iter()
            .map(|t| {
                let mut s = SpectrumType::default();
                s.description_mut()
                    .acquisition
                    .first_scan_mut()
                    .unwrap()
                    .start_time = t;
                s
            })
            .collect();
        let (sender, receiver) = bounded(10);
        let n = read_spectra(spectra.into_iter(), TimeRange::new(2.0, 3.0), sender);
        assert_eq!(n, 2);
        let times: Vec<_> = receiver.iter().map(|s| s.start_time()).collect();
        assert_eq!(times, [2.0, 3.0]);
    }
}
