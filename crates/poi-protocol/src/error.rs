use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProtocolError {
    #[error("invalid symmetry index {0} (expected 0..=2)")]
    InvalidSymmetry(u8),
    #[error("cell ({x}, {y}) is outside the 6-bit coordinate range")]
    CoordinateOutOfRange { x: i32, y: i32 },
    #[error("unit {0:#06x} carries the symmetry tag, not a tower")]
    NotATower(u16),
}
