use std::{io, path::PathBuf};

use crate::Field;

/// Error returned while compiling or reading back the encoded data
#[derive(Debug, thiserror::Error)]
pub enum CompileError {
    /// More distinct strings than indices below the absent sentinel
    #[error("string table overflow: {distinct} distinct strings, at most {max} can be indexed")]
    StringTableOverflow { distinct: usize, max: usize },
    /// A present value has no entry in the string table
    #[error("no string table entry for {field} of U+{codepoint:04X}: {value:?}")]
    MissingTableEntry { field: Field, codepoint: u32, value: String },
    #[error("failed to write '{}'", .path.display())]
    Write { path: PathBuf, #[source] source: io::Error },
    #[error("failed to read '{}'", .path.display())]
    Read { path: PathBuf, #[source] source: io::Error },
    /// An output file does not have the expected shape
    #[error("'{}' is malformed: {reason}", .path.display())]
    MalformedOutput { path: PathBuf, reason: String },
    /// The data read back from the outputs differs from the compiled records
    #[error("read back {what} of U+{codepoint:04X} does not match the compiled records")]
    VerificationFailed { what: String, codepoint: u32 },
}

pub type Result<T> = core::result::Result<T, CompileError>;
