mod args;
mod driver;
mod load;
mod progress;
mod time_range;
mod write;

pub use args::*;
pub use driver::{MZContamer, MZContamerError};
pub use load::{load_reference_table, spectrum_from_mzdata, SpectrumOrigin};
pub use progress::ProgressRecord;
pub use time_range::{TimeRange, TimeRangeParseError};
