//! Asymmetric key material used to witness transactions

pub mod ed25519;
