//! Compaction and encoding of per-codepoint Unicode data.
//!
//! A [`RecordSet`] holds one record for every codepoint. From it a frequency ranked [`StringTable`] is built,
//! every string field is encoded as one table index per codepoint and the flag bytes of two neighbouring
//! codepoints are packed into one 16-bit unit. All streams are written as JSON string literals made of
//! `\uXXXX` escapes, so a consumer gets one UTF-16 code unit per encoded value.

mod error;
pub use error::*;

pub mod record;
pub use record::{CodepointRecord, Field, FlagBits, RecordSet, CODEPOINT_COUNT};

pub mod table;
pub use table::{StringTable, ABSENT};

pub mod encode;
pub use encode::{encode, EncodedStream};

pub mod pack;
pub use pack::{pack, PackedBits};

pub mod serialize;
pub use serialize::{OutputLayout, OutputSet};

pub mod reader;
pub use reader::CompiledData;

mod pipeline;
pub use pipeline::*;
