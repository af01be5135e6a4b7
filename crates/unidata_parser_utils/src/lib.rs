//! Small parsing helpers shared by the configuration parser and the UCD collectors

pub mod str_parser;
pub mod ucd;

/// Parser error
#[derive(Clone, Copy, Debug, PartialEq, Eq, thiserror::Error)]
#[error("{msg} at {line}:{column}")]
pub struct ParserError {
    pub line   : usize,
    pub column : usize,
    pub msg    : &'static str,
}
