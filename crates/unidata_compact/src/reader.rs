//! Reading the output files back
use std::{collections::HashSet, fs, path::{Path, PathBuf}};

use crate::{
    pack::{PackedBits, PACKED_COUNT},
    serialize::stream_len,
    table::MAX_STRINGS,
    CompileError, Field, FlagBits, OutputLayout, RecordSet, Result, ABSENT, CODEPOINT_COUNT,
};

/// Decoded content of a set of output files
#[derive(Debug)]
pub struct CompiledData {
    strings : Vec<String>,
    fields  : [Vec<u16>; Field::COUNT],
    bits    : PackedBits,
}

impl CompiledData {
    /// Load the output files described by `layout`
    pub fn load(layout: &OutputLayout) -> Result<Self> {
        let fields = Field::ALL.map(|field| layout.field_path(field));
        Self::load_files(&layout.string_table_path(), &fields, &layout.bits_path())
    }

    /// Load output files from explicit paths, `fields` is in [`Field::ALL`] order
    pub fn load_files(string_table: &Path, fields: &[PathBuf; Field::COUNT], bits: &Path) -> Result<Self> {
        let strings = read_string_table(string_table)?;

        let mut streams: [Vec<u16>; Field::COUNT] = Default::default();
        for (stream, path) in streams.iter_mut().zip(fields) {
            let units = read_units(path, CODEPOINT_COUNT)?;
            if let Some(pos) = units.iter().position(|&unit| unit != ABSENT && unit as usize >= strings.len()) {
                return Err(malformed(path, format!("index {:#06X} of U+{pos:04X} is not in the string table", units[pos])));
            }
            *stream = units;
        }

        let bits = PackedBits::from_units(read_units(bits, PACKED_COUNT)?);
        Ok(Self { strings, fields: streams, bits })
    }

    pub fn string_table(&self) -> &[String] {
        &self.strings
    }

    pub fn units(&self, field: Field) -> &[u16] {
        &self.fields[field.index()]
    }

    pub fn bits(&self) -> &PackedBits {
        &self.bits
    }

    /// Get the value of `field` for a codepoint, `None` when absent or when the codepoint is out of range
    pub fn decode(&self, field: Field, codepoint: u32) -> Option<&str> {
        let unit = *self.fields[field.index()].get(codepoint as usize)?;
        self.strings.get(unit as usize).map(String::as_str)
    }

    /// Get the flags of a codepoint
    pub fn flags(&self, codepoint: u32) -> Option<FlagBits> {
        self.bits.flags(codepoint)
    }

    /// Check that every field and flag of every codepoint matches `records`
    pub fn verify(&self, records: &RecordSet) -> Result<()> {
        for (codepoint, record) in records.iter() {
            for field in Field::ALL {
                if self.decode(field, codepoint) != record.get(field) {
                    return Err(CompileError::VerificationFailed { what: field.to_string(), codepoint });
                }
            }
            if self.flags(codepoint) != Some(record.flags) {
                return Err(CompileError::VerificationFailed { what: "flags".to_string(), codepoint });
            }
        }
        Ok(())
    }
}

fn malformed(path: &Path, reason: String) -> CompileError {
    CompileError::MalformedOutput { path: path.to_path_buf(), reason }
}

fn read_string_table(path: &Path) -> Result<Vec<String>> {
    let data = fs::read(path).map_err(|source| CompileError::Read { path: path.to_path_buf(), source })?;
    let strings: Vec<String> = serde_json::from_slice(&data).map_err(|err| malformed(path, err.to_string()))?;

    if strings.len() > MAX_STRINGS {
        return Err(malformed(path, format!("{} strings, at most {MAX_STRINGS} are allowed", strings.len())));
    }
    let mut seen = HashSet::with_capacity(strings.len());
    for (idx, string) in strings.iter().enumerate() {
        if string.is_empty() {
            return Err(malformed(path, format!("entry {idx} is empty")));
        }
        if !seen.insert(string.as_str()) {
            return Err(malformed(path, format!("entry {idx} is a duplicate of {string:?}")));
        }
    }
    Ok(strings)
}

fn read_units(path: &Path, expected: usize) -> Result<Vec<u16>> {
    let text = fs::read(path).map_err(|source| CompileError::Read { path: path.to_path_buf(), source })?;
    parse_units(&text, expected).map_err(|reason| malformed(path, reason))
}

/// Parse a stream written by [`write_units`](crate::serialize::write_units), which needs to hold exactly `expected` units.
///
/// Only the exact output shape is accepted: a quoted sequence of `\u` escapes with 4 uppercase hex digits.
pub fn parse_units(text: &[u8], expected: usize) -> core::result::Result<Vec<u16>, String> {
    if text.len() != stream_len(expected) {
        return Err(format!("expected {} bytes for {expected} units, found {}", stream_len(expected), text.len()));
    }
    let body = text.strip_prefix(b"\"")
        .and_then(|text| text.strip_suffix(b"\""))
        .ok_or_else(|| "stream is not a JSON string".to_string())?;

    let mut units = Vec::with_capacity(expected);
    for (idx, escape) in body.chunks_exact(6).enumerate() {
        if &escape[..2] != b"\\u" {
            return Err(format!("unit {idx} is not a \\u escape"));
        }
        let mut unit = 0u16;
        for &digit in &escape[2..] {
            let val = match digit {
                b'0'..=b'9' => digit - b'0',
                b'A'..=b'F' => digit - b'A' + 10,
                _ => return Err(format!("unit {idx} has an invalid hex digit {:?}", digit as char)),
            };
            unit = (unit << 4) | val as u16;
        }
        units.push(unit);
    }
    Ok(units)
}

#[cfg(test)]
mod tests {
    use std::rc::Rc;
    use crate::{encode, pack, OutputSet, StringTable};
    use super::*;

    fn sample() -> RecordSet {
        let mut records = RecordSet::new();
        records.set(0x41, Field::Name, Rc::from("LATIN CAPITAL LETTER A"));
        records.set(0x41, Field::GeneralCategory, Rc::from("Uppercase Letter (Lu)"));
        records.set(0x42, Field::Name, Rc::from("LATIN CAPITAL LETTER A"));
        records.set(0x4E00, Field::MandarinReading, Rc::from("yī"));
        records.set(0x4E00, Field::Name, Rc::from("one; a, an; alone"));
        records.enable_flag(0x4E00, FlagBits::KDefinitionExists);
        records.enable_flag(0x20, FlagBits::SpaceSeparator);
        records.enable_flag(0x1F600, FlagBits::EmojiPresentation);
        records
    }

    fn write_all(records: &RecordSet, layout: OutputLayout) {
        let table = StringTable::build(records, &Field::ALL).unwrap();
        let mut outputs = OutputSet::new(layout).unwrap();
        outputs.stage_string_table(&table).unwrap();
        for field in Field::ALL {
            outputs.stage_field(&encode(records, field, &table).unwrap()).unwrap();
        }
        outputs.stage_bits(&pack(records)).unwrap();
        outputs.commit().unwrap();
    }

    #[test]
    fn parses_exact_streams() {
        assert_eq!(parse_units(br#""\u0041\uFFFF""#, 2), Ok(vec![0x41, 0xFFFF]));
        assert_eq!(parse_units(br#""""#, 0), Ok(vec![]));
    }

    #[test]
    fn rejects_other_shapes() {
        assert!(parse_units(br#""\u0041""#, 2).is_err());
        assert!(parse_units(br#""\u00ab""#, 1).is_err());
        assert!(parse_units(br#"'\u0041'"#, 1).is_err());
        assert!(parse_units(br#""\x0041""#, 1).is_err());
        assert!(parse_units(br#"["\u0041"]"#, 1).is_err());
    }

    #[test]
    fn round_trips_every_codepoint() {
        let dir = tempfile::tempdir().unwrap();
        let layout = OutputLayout::new(dir.path(), "data");
        let records = sample();
        write_all(&records, layout.clone());

        let data = CompiledData::load(&layout).unwrap();
        data.verify(&records).unwrap();

        assert_eq!(data.decode(Field::Name, 0x42), Some("LATIN CAPITAL LETTER A"));
        assert_eq!(data.decode(Field::MandarinReading, 0x4E00), Some("yī"));
        assert_eq!(data.decode(Field::Block, 0x41), None);
        assert_eq!(data.flags(0x4E00), Some(FlagBits::KDefinitionExists));
        assert_eq!(data.flags(0x21), Some(FlagBits::none()));
        assert_eq!(data.units(Field::Age).len(), CODEPOINT_COUNT);
        assert_eq!(data.bits().units().len(), PACKED_COUNT);
        assert_eq!(data.string_table()[0], "LATIN CAPITAL LETTER A");
    }

    #[test]
    fn verify_reports_differences() {
        let dir = tempfile::tempdir().unwrap();
        let layout = OutputLayout::new(dir.path(), "data");
        let mut records = sample();
        write_all(&records, layout.clone());

        records.enable_flag(0x1F601, FlagBits::EmojiPresentation);
        let data = CompiledData::load(&layout).unwrap();
        match data.verify(&records) {
            Err(CompileError::VerificationFailed { what, codepoint }) => {
                assert_eq!(what, "flags");
                assert_eq!(codepoint, 0x1F601);
            },
            other => panic!("expected a verification failure, got {other:?}"),
        }
    }

    #[test]
    fn index_outside_of_table_is_malformed() {
        let dir = tempfile::tempdir().unwrap();
        let layout = OutputLayout::new(dir.path(), "data");
        write_all(&sample(), layout.clone());

        fs::write(layout.string_table_path(), r#"["LATIN CAPITAL LETTER A"]"#).unwrap();
        assert!(matches!(CompiledData::load(&layout), Err(CompileError::MalformedOutput { .. })));
    }

    #[test]
    fn duplicate_strings_are_malformed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.string.json");
        fs::write(&path, r#"["a","b","a"]"#).unwrap();
        assert!(matches!(read_string_table(&path), Err(CompileError::MalformedOutput { .. })));

        fs::write(&path, r#"["a",""]"#).unwrap();
        assert!(matches!(read_string_table(&path), Err(CompileError::MalformedOutput { .. })));
    }

    #[test]
    fn missing_file_is_a_read_error() {
        let dir = tempfile::tempdir().unwrap();
        let layout = OutputLayout::new(dir.path(), "missing");
        assert!(matches!(CompiledData::load(&layout), Err(CompileError::Read { .. })));
    }
}
