//! Rust-native building blocks for Cardano transaction construction
//!
//! This is an umbrella crate that re-exports the particular member crates
//! under a common namespace:
//!
//! - [`codec`]: CBOR interface and round-trip friendly helpers
//! - [`crypto`]: Blake2b hashing and Ed25519 keys
//! - [`addresses`]: Shelley, Stake and Byron addresses
//! - [`primitives`]: the on-chain data model (values, outputs, scripts,
//!   Plutus data, certificates, governance)
//! - [`wallet`]: signing keys and cardano-cli key files
//! - [`txbuilder`]: coin selection, fees and the transaction builder

pub use lovelace_addresses as addresses;
pub use lovelace_codec as codec;
pub use lovelace_crypto as crypto;
pub use lovelace_primitives as primitives;
pub use lovelace_txbuilder as txbuilder;
pub use lovelace_wallet as wallet;
