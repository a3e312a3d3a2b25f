//! Points-of-interest fact types and the 16-bit gossip wire codec.

#![forbid(unsafe_code)]

mod cell;
mod error;
mod ids;
mod symmetry;
pub mod wire;

pub use crate::cell::*;
pub use crate::error::ProtocolError;
pub use crate::ids::*;
pub use crate::symmetry::*;
pub use crate::wire::{
    decode_location, decode_tower, decode_unit, encode_location, encode_symmetry_claim,
    encode_tower, pack, pack_single, unpack, MessageBuilder, WireUnit, RELAY_FLAG, SYMMETRY_TAG,
};
