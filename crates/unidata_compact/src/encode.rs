use crate::{CompileError, Field, RecordSet, Result, StringTable, ABSENT, CODEPOINT_COUNT};

/// String table indices of one field, one unit per codepoint in codepoint order
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct EncodedStream {
    field : Field,
    units : Vec<u16>,
}

impl EncodedStream {
    pub fn field(&self) -> Field {
        self.field
    }

    pub fn units(&self) -> &[u16] {
        &self.units
    }

    /// Get the index stored for a codepoint
    pub fn get(&self, codepoint: u32) -> Option<u16> {
        self.units.get(codepoint as usize).copied()
    }

    /// Number of codepoints with a value
    pub fn present(&self) -> usize {
        self.units.iter().filter(|&&unit| unit != ABSENT).count()
    }
}

/// Encode the value of `field` for every codepoint as an index into `table`, or [`ABSENT`].
///
/// Values are looked up by their exact string. A value missing from the table means the table was built without
/// this field and is reported as [`CompileError::MissingTableEntry`].
pub fn encode(records: &RecordSet, field: Field, table: &StringTable) -> Result<EncodedStream> {
    let mut units = Vec::with_capacity(CODEPOINT_COUNT);
    for (codepoint, record) in records.iter() {
        let unit = match record.get(field) {
            Some(value) => table.index_of(value).ok_or_else(|| CompileError::MissingTableEntry {
                field,
                codepoint,
                value: value.to_string()
            })?,
            None => ABSENT,
        };
        units.push(unit);
    }
    Ok(EncodedStream { field, units })
}
