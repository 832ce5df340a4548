//! Common CBOR interface shared by every lovelace crate.
//!
//! The on-chain wire format is canonical CBOR; every deviation changes the
//! transaction id and therefore invalidates signatures. All entities in this
//! workspace implement [`minicbor::Encode`] and [`minicbor::Decode`] directly
//! and rely on the helper containers in [`utils`] for the parts of the CDDL
//! that plain derives cannot express (indefinite arrays, tagged sets, nested
//! CBOR, order-preserving maps).

/// Shared re-export of the minicbor lib across all lovelace crates
pub use minicbor;

/// Round-trip friendly common helper structs
pub mod utils;

pub type Error = Box<dyn std::error::Error>;

/// Standalone encode/decode of a single CBOR data item.
///
/// A blanket impl covers every type with context-free minicbor codecs, so
/// callers can write `Tx::decode_fragment(bytes)` without importing encoder
/// plumbing.
pub trait Fragment<'a>
where
    Self: Sized,
{
    fn encode_fragment(&self) -> Result<Vec<u8>, Error>;
    fn decode_fragment(bytes: &'a [u8]) -> Result<Self, Error>;
}

impl<'a, T> Fragment<'a> for T
where
    T: minicbor::Encode<()> + minicbor::Decode<'a, ()> + Sized,
{
    fn encode_fragment(&self) -> Result<Vec<u8>, Error> {
        minicbor::to_vec(self).map_err(|e| e.into())
    }

    fn decode_fragment(bytes: &'a [u8]) -> Result<Self, Error> {
        minicbor::decode(bytes).map_err(|e| e.into())
    }
}
