//! Frequency ranked table of every distinct string value
use std::{collections::HashMap, rc::Rc};

use crate::{CompileError, Field, RecordSet, Result};

/// Index written for a field without a value, never assigned to a string
pub const ABSENT : u16 = 0xFFFF;

/// Maximum number of strings in a table, indices have to stay below [`ABSENT`]
pub const MAX_STRINGS : usize = ABSENT as usize - 1;

/// Ordered sequence of distinct, non-empty strings.
///
/// Strings are ordered by descending occurrence count, strings with the same count are ordered by their bytes,
/// so the most common strings get the smallest indices and the same input always gives the same table.
#[derive(Debug)]
pub struct StringTable {
    strings : Vec<Rc<str>>,
    indices : HashMap<Rc<str>, u16>,
}

impl StringTable {
    /// Build a table from the values of `fields` over every codepoint.
    ///
    /// Occurrences are counted across all given fields, so a string used by multiple fields is stored once.
    pub fn build(records: &RecordSet, fields: &[Field]) -> Result<Self> {
        let mut counts = HashMap::<Rc<str>, usize>::new();
        for (_, record) in records.iter() {
            for &field in fields {
                if let Some(value) = record.value(field) {
                    match counts.get_mut(value) {
                        Some(count) => *count += 1,
                        None => { counts.insert(value.clone(), 1); },
                    }
                }
            }
        }
        Self::from_counts(counts)
    }

    /// Build a table from precounted occurrences, empty strings and unused strings are dropped
    pub fn from_counts(counts: HashMap<Rc<str>, usize>) -> Result<Self> {
        let mut entries = counts.into_iter()
            .filter(|(value, count)| !value.is_empty() && *count != 0)
            .collect::<Vec<_>>();

        if entries.len() > MAX_STRINGS {
            return Err(CompileError::StringTableOverflow { distinct: entries.len(), max: MAX_STRINGS });
        }

        entries.sort_unstable_by(|(a_val, a_count), (b_val, b_count)| b_count.cmp(a_count).then_with(|| a_val.cmp(b_val)));

        let strings = entries.into_iter().map(|(value, _)| value).collect::<Vec<_>>();
        let indices = strings.iter()
            .enumerate()
            .map(|(idx, value)| (value.clone(), idx as u16))
            .collect();
        Ok(Self { strings, indices })
    }

    /// Number of strings in the table
    pub fn len(&self) -> usize {
        self.strings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strings.is_empty()
    }

    /// Get the string at `index`, `None` for [`ABSENT`] or any other index outside of the table
    pub fn get(&self, index: u16) -> Option<&str> {
        self.strings.get(index as usize).map(|val| &**val)
    }

    /// Get the index of an exact string
    pub fn index_of(&self, value: &str) -> Option<u16> {
        self.indices.get(value).copied()
    }

    /// Iterate over the strings in index order
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.strings.iter().map(|val| &**val)
    }
}
