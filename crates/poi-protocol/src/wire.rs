//! Bit-exact wire format.
//!
//! A unit is 16 bits:
//! - bits 0-5: column
//! - bits 6-11: row
//! - bits 12-14: tag (0 neutral ruin, 1-3 side A paint/money/defense, 4-6 side B, 7 symmetry claim)
//! - bit 15: relay request (tower units only)
//!
//! For a symmetry claim the low three bits hold the still-valid bitmap instead of a location.
//! A message carries one or two units: `(a << 16) | b`, or a bare `a`.

use crate::{Cell, ProtocolError, Side, Structure, SymmetrySet, Team, TowerKind};

const COORD_MASK: u16 = 0b11_1111;
const LOCATION_MASK: u16 = 0x0FFF;
const TAG_SHIFT: u16 = 12;
const TAG_MASK: u16 = 0b111;

/// Tag value reserved for symmetry claims.
pub const SYMMETRY_TAG: u16 = 7;
/// "Please relay this onward."
pub const RELAY_FLAG: u16 = 1 << 15;

/// A decoded wire unit.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WireUnit {
    Tower {
        cell: Cell,
        structure: Structure,
        relay: bool,
    },
    Symmetry(SymmetrySet),
}

impl WireUnit {
    pub fn encode(self) -> u16 {
        match self {
            WireUnit::Tower {
                cell,
                structure,
                relay,
            } => {
                let flag = if relay { RELAY_FLAG } else { 0 };
                tower_tag(structure) | encode_location(cell) | flag
            }
            WireUnit::Symmetry(valid) => encode_symmetry_claim(valid),
        }
    }
}

#[inline]
pub fn encode_location(cell: Cell) -> u16 {
    ((cell.y as u16 & COORD_MASK) << 6) | (cell.x as u16 & COORD_MASK)
}

#[inline]
pub fn decode_location(unit: u16) -> Cell {
    Cell::new((unit & COORD_MASK) as u8, ((unit >> 6) & COORD_MASK) as u8)
}

/// Tag bits (already shifted into 12-14) for an owner/kind pair.
pub fn encode_tower(owner: Team, kind: TowerKind) -> u16 {
    tower_tag(Structure::new(owner, kind))
}

fn tower_tag(structure: Structure) -> u16 {
    match structure {
        Structure::Ruin => 0,
        Structure::Tower { side, kind } => (1 + side.ordinal() * 3 + kind.index()) << TAG_SHIFT,
    }
}

#[inline]
fn tag_of(unit: u16) -> u16 {
    (unit >> TAG_SHIFT) & TAG_MASK
}

fn structure_from_tag(tag: u16) -> Structure {
    if tag == 0 {
        return Structure::Ruin;
    }
    let side = if tag <= 3 { Side::A } else { Side::B };
    let kind = match (tag - 1) % 3 {
        0 => TowerKind::Paint,
        1 => TowerKind::Money,
        _ => TowerKind::Defense,
    };
    Structure::Tower { side, kind }
}

/// Decodes a tower unit into `(structure, cell)`. Symmetry claims are rejected.
pub fn decode_tower(unit: u16) -> Result<(Structure, Cell), ProtocolError> {
    let tag = tag_of(unit);
    if tag == SYMMETRY_TAG {
        return Err(ProtocolError::NotATower(unit));
    }
    Ok((structure_from_tag(tag), decode_location(unit & LOCATION_MASK)))
}

pub fn encode_symmetry_claim(valid: SymmetrySet) -> u16 {
    (SYMMETRY_TAG << TAG_SHIFT) | valid.bits() as u16
}

pub fn decode_unit(unit: u16) -> WireUnit {
    let tag = tag_of(unit);
    if tag == SYMMETRY_TAG {
        return WireUnit::Symmetry(SymmetrySet::from_bits(unit as u8));
    }
    WireUnit::Tower {
        cell: decode_location(unit),
        structure: structure_from_tag(tag),
        relay: unit & RELAY_FLAG != 0,
    }
}

#[inline]
pub fn pack(a: u16, b: u16) -> u32 {
    ((a as u32) << 16) | b as u32
}

#[inline]
pub fn pack_single(a: u16) -> u32 {
    a as u32
}

/// Splits a message into its units. The second unit is present iff the high half is nonzero.
#[inline]
pub fn unpack(message: u32) -> (u16, Option<u16>) {
    let high = (message >> 16) as u16;
    let low = message as u16;
    if high != 0 {
        (high, Some(low))
    } else {
        (low, None)
    }
}

/// Accumulates up to two units into one message.
///
/// A zero unit (neutral ruin at (0, 0)) cannot sit in the high half, so it is kept low.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct MessageBuilder {
    first: Option<u16>,
    second: Option<u16>,
}

impl MessageBuilder {
    pub const CAPACITY: usize = 2;

    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.first.is_some() as usize + self.second.is_some() as usize
    }

    pub fn is_empty(&self) -> bool {
        self.first.is_none()
    }

    pub fn is_full(&self) -> bool {
        self.second.is_some()
    }

    /// Appends `unit`; returns `false` when the message already holds two units.
    pub fn push(&mut self, unit: u16) -> bool {
        match (self.first, self.second) {
            (None, _) => self.first = Some(unit),
            (Some(_), None) => self.second = Some(unit),
            _ => return false,
        }
        true
    }

    /// The packed message, if any unit was pushed. Leaves the builder empty.
    pub fn take(&mut self) -> Option<u32> {
        let message = match (self.first.take(), self.second.take()) {
            (None, _) => return None,
            (Some(a), None) => pack_single(a),
            (Some(0), Some(b)) => pack(b, 0),
            (Some(a), Some(b)) => pack(a, b),
        };
        Some(message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn location_bits_are_column_then_row() {
        let unit = encode_location(Cell::new(5, 9));
        assert_eq!(unit, (9 << 6) | 5);
        assert_eq!(decode_location(unit), Cell::new(5, 9));
    }

    #[test]
    fn tower_tags_follow_mapping_table() {
        assert_eq!(encode_tower(Team::Neutral, TowerKind::Money), 0);
        assert_eq!(encode_tower(Side::A.into(), TowerKind::Paint), 1 << 12);
        assert_eq!(encode_tower(Side::A.into(), TowerKind::Defense), 3 << 12);
        assert_eq!(encode_tower(Side::B.into(), TowerKind::Paint), 4 << 12);
        assert_eq!(encode_tower(Side::B.into(), TowerKind::Defense), 6 << 12);
    }

    #[test]
    fn symmetry_claim_uses_reserved_tag() {
        let unit = encode_symmetry_claim(SymmetrySet::from_bits(0b101));
        assert_eq!(unit, 0x7005);
        assert_eq!(
            decode_unit(unit),
            WireUnit::Symmetry(SymmetrySet::from_bits(0b101))
        );
        assert_eq!(decode_tower(unit), Err(ProtocolError::NotATower(unit)));
    }

    #[test]
    fn relay_flag_survives_decode() {
        let unit = WireUnit::Tower {
            cell: Cell::new(40, 2),
            structure: Structure::Tower {
                side: Side::B,
                kind: TowerKind::Money,
            },
            relay: true,
        };
        let raw = unit.encode();
        assert_eq!(raw >> 15, 1);
        assert_eq!(decode_unit(raw), unit);
    }

    #[test]
    fn unpack_treats_empty_high_half_as_single() {
        assert_eq!(unpack(pack(0x1234, 0x0042)), (0x1234, Some(0x0042)));
        assert_eq!(unpack(pack_single(0x0042)), (0x0042, None));
    }

    #[test]
    fn builder_keeps_zero_unit_low() {
        let mut builder = MessageBuilder::new();
        assert!(builder.push(0));
        assert!(builder.push(0x1001));
        assert!(!builder.push(0x2002));
        let message = builder.take().unwrap();
        assert_eq!(unpack(message), (0x1001, Some(0)));
        assert!(builder.is_empty());
        assert_eq!(builder.take(), None);
    }
}
