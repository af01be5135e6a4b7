use core::fmt;
use std::rc::Rc;

use unidata_macros::flags;

/// Number of codepoints, `0x000000..=0x10FFFF`
pub const CODEPOINT_COUNT : usize = 0x110000;

/// String valued fields of a codepoint record
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub enum Field {
    /// Character name, or the Unihan definition for ideographs
    Name,
    /// General category as `<label> (<short code>)`, e.g. `Uppercase Letter (Lu)`
    GeneralCategory,
    /// Block name
    Block,
    /// Version of first assignment, as `Unicode <version>`
    Age,
    /// Unihan `kMandarin` reading
    MandarinReading,
}

impl Field {
    pub const COUNT : usize = 5;

    /// All fields, in output order
    pub const ALL : [Field; Self::COUNT] = [
        Field::Name,
        Field::GeneralCategory,
        Field::Block,
        Field::Age,
        Field::MandarinReading,
    ];

    /// Key used in output file names
    pub const fn key(self) -> &'static str {
        match self {
            Field::Name            => "name",
            Field::GeneralCategory => "gc",
            Field::Block           => "block",
            Field::Age             => "age",
            Field::MandarinReading => "mpy",
        }
    }

    pub const fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.key())
    }
}

/// Per-codepoint boolean properties, packed in a byte.
///
/// The bit values are part of the output format: new flags get a new bit, existing ones are never moved.
#[flags(u8, parse_from_name)]
pub enum FlagBits {
    /// The name comes from the Unihan `kDefinition` field
    #[parse_name("kDefinition exists")]
    KDefinitionExists = 0x01,
    /// `Emoji_Presentation` in emoji-data.txt
    #[parse_name("Emoji_Presentation")]
    EmojiPresentation = 0x02,
    /// General category `Zs`
    #[parse_name("General_Category Zs")]
    SpaceSeparator = 0x04,
    /// Any of the mark general categories (`Mn`, `Mc`, `Me`)
    #[parse_name("General_Category M")]
    AnyMark = 0x08,
}

/// Data collected for a single codepoint
#[derive(Clone, Default, Debug, PartialEq)]
pub struct CodepointRecord {
    values    : [Option<Rc<str>>; Field::COUNT],
    pub flags : FlagBits,
}

impl CodepointRecord {
    /// Get the value of a field, `None` when absent
    pub fn get(&self, field: Field) -> Option<&str> {
        self.values[field.index()].as_deref()
    }

    /// Get the shared value of a field
    pub fn value(&self, field: Field) -> Option<&Rc<str>> {
        self.values[field.index()].as_ref()
    }

    /// Set or clear a field, an empty string clears the field
    pub fn set(&mut self, field: Field, value: Option<Rc<str>>) {
        self.values[field.index()] = value.filter(|val| !val.is_empty());
    }

    /// Check if no field and no flag is set
    pub fn is_empty(&self) -> bool {
        self.flags.is_none() && self.values.iter().all(Option::is_none)
    }
}

/// One record slot for every codepoint, addressed by the codepoint itself.
///
/// Slots are allocated on first write, reading an untouched slot gives an empty record.
pub struct RecordSet {
    slots : Vec<Option<Box<CodepointRecord>>>,
    empty : CodepointRecord,
}

impl RecordSet {
    /// Create a record set where every field of every codepoint is absent
    pub fn new() -> Self {
        Self { slots: vec![None; CODEPOINT_COUNT], empty: CodepointRecord::default() }
    }

    /// Get the record of a codepoint, `None` if the codepoint is out of range
    pub fn get(&self, codepoint: u32) -> Option<&CodepointRecord> {
        self.slots.get(codepoint as usize).map(|slot| slot.as_deref().unwrap_or(&self.empty))
    }

    /// Get the mutable record of a codepoint, `None` if the codepoint is out of range
    pub fn get_mut(&mut self, codepoint: u32) -> Option<&mut CodepointRecord> {
        self.slots.get_mut(codepoint as usize).map(|slot| &mut **slot.get_or_insert_with(Default::default))
    }

    /// Set a field of a codepoint, returns `false` if the codepoint is out of range
    pub fn set(&mut self, codepoint: u32, field: Field, value: Rc<str>) -> bool {
        match self.get_mut(codepoint) {
            Some(record) => {
                record.set(field, Some(value));
                true
            },
            None => false,
        }
    }

    /// Enable a flag on a codepoint, returns `false` if the codepoint is out of range
    pub fn enable_flag(&mut self, codepoint: u32, flag: FlagBits) -> bool {
        match self.get_mut(codepoint) {
            Some(record) => {
                record.flags.enable(flag);
                true
            },
            None => false,
        }
    }

    /// Iterate over all codepoints in ascending order, with their records
    pub fn iter(&self) -> impl Iterator<Item = (u32, &CodepointRecord)> + '_ {
        self.slots.iter()
            .enumerate()
            .map(|(cp, slot)| (cp as u32, slot.as_deref().unwrap_or(&self.empty)))
    }

    /// Number of codepoints which were written to
    pub fn assigned(&self) -> usize {
        self.slots.iter().filter(|slot| slot.is_some()).count()
    }

    /// Number of codepoints which have a value for `field`
    pub fn populated(&self, field: Field) -> usize {
        self.iter().filter(|(_, record)| record.get(field).is_some()).count()
    }

    /// Number of codepoints which have `flag` set
    pub fn flagged(&self, flag: FlagBits) -> usize {
        self.iter().filter(|(_, record)| record.flags.contains(flag)).count()
    }
}

impl Default for RecordSet {
    fn default() -> Self {
        Self::new()
    }
}
