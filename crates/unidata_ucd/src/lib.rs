//! Collects per-codepoint records from the Unicode Character Database text files.
//!
//! The files are read from a single data directory, in a fixed order, later files overriding values set by earlier
//! ones. Malformed lines are skipped and counted, a missing file stops the collection.
use std::{io, path::{Path, PathBuf}};

use unidata_compact::RecordSet;

mod intern;
pub use intern::Interner;

mod collector;
pub use collector::*;

mod parsers;

/// Error returned while collecting records
#[derive(Debug, thiserror::Error)]
pub enum UcdError {
    #[error("failed to read '{}'", .path.display())]
    Io { path: PathBuf, #[source] source: io::Error },
}

pub type Result<T> = core::result::Result<T, UcdError>;

/// Input files, in processing order
pub const UCD_FILES : [&str; 7] = [
    collector::PROPERTY_VALUE_ALIASES,
    collector::UNICODE_DATA,
    collector::BLOCKS,
    collector::DERIVED_AGE,
    collector::NAME_ALIASES,
    collector::UNIHAN_READINGS,
    collector::EMOJI_DATA,
];

/// Collect the records of every codepoint from the files in `data_dir`
pub fn collect(data_dir: &Path) -> Result<RecordSet> {
    let mut collector = Collector::new(data_dir);
    collector.run()?;
    Ok(collector.finish())
}
