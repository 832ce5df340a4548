//! Cryptographic hashes for Cardano
//!
//! Two helper objects are exposed:
//!
//! * [`Hasher`] to stream bytes or CBOR-encodable objects into a Blake2b
//!   digest without materializing intermediate buffers
//! * [`struct@Hash`] a strongly typed fixed-size digest
//!
//! The protocol only needs two digest sizes: 224 bits for key and script
//! hashes, 256 bits for transaction ids and datum hashes.

mod digest;
mod hasher;

pub use self::{digest::Hash, hasher::Hasher};
