use poi_protocol::{Cell, ProtocolError};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoreError {
    /// The map holds more distinct structures than the registry was sized for.
    #[error("fact registry is full ({capacity} slots); cannot register structure at {cell}")]
    CapacityExceeded { capacity: usize, cell: Cell },
    #[error("cell {cell} is outside the {width}x{height} map")]
    OffMap { cell: Cell, width: u8, height: u8 },
    #[error("invalid protocol config: {0}")]
    InvalidConfig(String),
    #[error(transparent)]
    Protocol(#[from] ProtocolError),
}

/// A send or broadcast the channel refused (out of range, quota spent, ...).
///
/// Transient: the fact stays unknown to the recipient and is retried on a later tick.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SendError {
    #[error("recipient at {0} is out of range")]
    OutOfRange(Cell),
    #[error("per-tick message quota exhausted")]
    QuotaExhausted,
    #[error("this agent cannot broadcast")]
    BroadcastUnavailable,
}
