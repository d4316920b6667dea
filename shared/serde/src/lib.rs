//! # Lockstep Serde
//! Bit-level serialization shared by every crate that speaks the lockstep
//! wire protocol: command packets, replicated-object deltas and snapshots.

#![deny(trivial_numeric_casts, unstable_features, unused_import_braces)]

mod bit_counter;
mod bit_reader;
mod bit_writer;
mod constants;
mod error;
mod impls;
mod integer;
mod serde;

pub use bit_counter::BitCounter;
pub use bit_reader::{BitReader, OwnedBitReader};
pub use bit_writer::{BitWrite, BitWriter};
pub use constants::{MAX_COLLECTION_LENGTH, MAX_STRING_BYTES};
pub use error::SerdeErr;
pub use integer::{
    SerdeInteger, SerdeIntegerConversion, SignedInteger, SignedVariableInteger, UnsignedInteger,
    UnsignedVariableInteger,
};
pub use serde::{ConstBitLength, Serde};
