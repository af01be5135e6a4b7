//! Packing of the per-codepoint flag bytes, two codepoints per 16-bit unit
use static_assertions::const_assert_eq;

use crate::{FlagBits, RecordSet, CODEPOINT_COUNT};

/// Number of units in a packed stream
pub const PACKED_COUNT : usize = CODEPOINT_COUNT / 2;

const_assert_eq!(CODEPOINT_COUNT % 2, 0);

/// Byte of a packed unit holding a codepoint's flags
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum BytePosition {
    /// Even codepoint, bits 0..8
    Low,
    /// Odd codepoint, bits 8..16
    High,
}

/// Flag bytes of all codepoints, unit `k` holds codepoint `2k` in the low byte and `2k + 1` in the high byte
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct PackedBits {
    units : Vec<u16>,
}

impl PackedBits {
    /// Wrap already packed units
    pub fn from_units(units: Vec<u16>) -> Self {
        Self { units }
    }

    pub fn units(&self) -> &[u16] {
        &self.units
    }

    /// Get the flags of a codepoint, `None` if the codepoint is outside of the stream
    pub fn flags(&self, codepoint: u32) -> Option<FlagBits> {
        let (idx, pos) = locate(codepoint);
        let (low, high) = unpack(*self.units.get(idx)?);
        let byte = match pos {
            BytePosition::Low => low,
            BytePosition::High => high,
        };
        Some(FlagBits::from_bits_truncate(byte))
    }
}

/// Combine the flag bytes of an even and the following odd codepoint
pub const fn pack_pair(low: u8, high: u8) -> u16 {
    ((high as u16) << 8) | low as u16
}

/// Split a unit into the flag bytes of the even (low) and odd (high) codepoint
pub const fn unpack(unit: u16) -> (u8, u8) {
    (unit as u8, (unit >> 8) as u8)
}

/// Get the unit index and the byte within the unit for a codepoint
pub const fn locate(codepoint: u32) -> (usize, BytePosition) {
    let pos = if codepoint & 1 == 0 { BytePosition::Low } else { BytePosition::High };
    ((codepoint >> 1) as usize, pos)
}

/// Pack the flag bytes of every codepoint
pub fn pack(records: &RecordSet) -> PackedBits {
    let mut units = Vec::with_capacity(PACKED_COUNT);
    let mut low = 0;
    for (codepoint, record) in records.iter() {
        let bits = record.flags.bits();
        if codepoint & 1 == 0 {
            low = bits;
        } else {
            units.push(pack_pair(low, bits));
        }
    }
    PackedBits { units }
}
