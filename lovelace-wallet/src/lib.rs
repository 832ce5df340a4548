//! Signing key management and cardano-cli compatible key files
//!
//! Keys wrap the raw Ed25519 material from `lovelace-crypto` together with
//! the `(type, description)` envelope that the cardano-cli JSON key-file
//! format carries. Extended keys follow the 128-byte layout used by HD
//! wallets (64-byte extended secret, 32-byte public key, 32-byte chain
//! code); derivation itself happens outside this crate and hands us the
//! bytes.

use std::fs;
use std::path::Path;

use lovelace_codec::minicbor;
use lovelace_codec::utils::Bytes;
use lovelace_crypto::hash::{Hash, Hasher};
use lovelace_crypto::key::ed25519::{PublicKey, SecretKey, SecretKeyExtended, Signature};
use rand_core::{CryptoRng, RngCore};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub type VerificationKeyHash = Hash<28>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("expected key type {expected}, got {got}")]
    InvalidKeyType { expected: String, got: String },

    #[error("invalid payload size {0} for this key kind")]
    InvalidSize(usize),

    #[error("invalid extended key bit tweaks")]
    InvalidBitTweaks,

    #[error("file {0} already exists and is not empty")]
    FileExists(String),

    #[error("error decoding key cbor: {0}")]
    Cbor(#[from] minicbor::decode::Error),

    #[error("error decoding key hex: {0}")]
    Hex(#[from] hex::FromHexError),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// The role a key plays in an address, deciding its envelope strings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyRole {
    Payment,
    Stake,
}

impl KeyRole {
    fn signing_type(&self, extended: bool) -> &'static str {
        match (self, extended) {
            (KeyRole::Payment, false) => "PaymentSigningKeyShelley_ed25519",
            (KeyRole::Payment, true) => "PaymentExtendedSigningKeyShelley_ed25519_bip32",
            (KeyRole::Stake, false) => "StakeSigningKeyShelley_ed25519",
            (KeyRole::Stake, true) => "StakeExtendedSigningKeyShelley_ed25519_bip32",
        }
    }

    fn verification_type(&self, extended: bool) -> &'static str {
        match (self, extended) {
            (KeyRole::Payment, false) => "PaymentVerificationKeyShelley_ed25519",
            (KeyRole::Payment, true) => "PaymentExtendedVerificationKeyShelley_ed25519_bip32",
            (KeyRole::Stake, false) => "StakeVerificationKeyShelley_ed25519",
            (KeyRole::Stake, true) => "StakeExtendedVerificationKeyShelley_ed25519_bip32",
        }
    }

    fn signing_description(&self) -> &'static str {
        match self {
            KeyRole::Payment => "Payment Signing Key",
            KeyRole::Stake => "Stake Signing Key",
        }
    }

    fn verification_description(&self) -> &'static str {
        match self {
            KeyRole::Payment => "Payment Verification Key",
            KeyRole::Stake => "Stake Verification Key",
        }
    }
}

#[derive(Serialize, Deserialize)]
struct KeyFile {
    #[serde(rename = "type")]
    key_type: String,
    description: String,
    #[serde(rename = "cborHex")]
    cbor_hex: String,
}

/// Envelope behavior shared by every key flavor: cbor payload plus
/// `(type, description)` metadata, serialized as the cardano-cli JSON
/// key-file format.
pub trait KeyEnvelope: Sized {
    fn payload(&self) -> &[u8];
    fn key_type(&self) -> &str;
    fn description(&self) -> &str;
    fn from_parts(payload: Vec<u8>, key_type: String, description: String) -> Result<Self, Error>;

    fn to_json(&self) -> Result<String, Error> {
        let cbor: Bytes = self.payload().to_vec().into();

        let file = KeyFile {
            key_type: self.key_type().to_string(),
            description: self.description().to_string(),
            cbor_hex: hex::encode(minicbor::to_vec(&cbor).expect("infallible")),
        };

        Ok(serde_json::to_string(&file)?)
    }

    /// Restore a key from its JSON rendering.
    ///
    /// With `expected_type` set, the envelope type is validated against it.
    fn from_json(data: &str, expected_type: Option<&str>) -> Result<Self, Error> {
        let file: KeyFile = serde_json::from_str(data)?;

        if let Some(expected) = expected_type {
            if file.key_type != expected {
                return Err(Error::InvalidKeyType {
                    expected: expected.to_string(),
                    got: file.key_type,
                });
            }
        }

        let cbor = hex::decode(&file.cbor_hex)?;
        let payload: Bytes = minicbor::decode(&cbor)?;

        Self::from_parts(payload.into(), file.key_type, file.description)
    }

    fn load(path: impl AsRef<Path>) -> Result<Self, Error> {
        Self::from_json(&fs::read_to_string(path)?, None)
    }

    /// Write the key file; refuses to overwrite a non-empty file
    fn save(&self, path: impl AsRef<Path>) -> Result<(), Error> {
        let path = path.as_ref();

        if let Ok(meta) = fs::metadata(path) {
            if meta.len() > 0 {
                return Err(Error::FileExists(path.display().to_string()));
            }
        }

        fs::write(path, self.to_json()?)?;

        Ok(())
    }
}

macro_rules! impl_envelope {
    ($Type:ty, $size_check:expr) => {
        impl KeyEnvelope for $Type {
            fn payload(&self) -> &[u8] {
                &self.payload
            }

            fn key_type(&self) -> &str {
                &self.key_type
            }

            fn description(&self) -> &str {
                &self.description
            }

            fn from_parts(
                payload: Vec<u8>,
                key_type: String,
                description: String,
            ) -> Result<Self, Error> {
                let check: fn(usize) -> bool = $size_check;
                if !check(payload.len()) {
                    return Err(Error::InvalidSize(payload.len()));
                }

                Ok(Self {
                    payload,
                    key_type,
                    description,
                })
            }
        }
    };
}

/// A regular Ed25519 signing key (32-byte seed)
#[derive(Clone, PartialEq, Eq)]
pub struct SigningKey {
    payload: Vec<u8>,
    key_type: String,
    description: String,
}

impl_envelope!(SigningKey, |len| len == SecretKey::SIZE);

impl SigningKey {
    pub fn generate<R: RngCore + CryptoRng>(rng: R, role: KeyRole) -> Self {
        let secret = SecretKey::new(rng);
        let payload = unsafe { SecretKey::leak_into_bytes(secret) }.to_vec();

        Self {
            payload,
            key_type: role.signing_type(false).to_string(),
            description: role.signing_description().to_string(),
        }
    }

    fn secret(&self) -> SecretKey {
        let bytes: [u8; SecretKey::SIZE] = self.payload.as_slice().try_into().expect("checked");
        SecretKey::from(bytes)
    }

    pub fn sign(&self, data: &[u8]) -> Signature {
        self.secret().sign(data)
    }

    pub fn to_verification_key(&self) -> VerificationKey {
        VerificationKey {
            payload: self.secret().public_key().as_bytes().to_vec(),
            key_type: self.key_type.replace("Signing", "Verification"),
            description: self.description.replace("Signing", "Verification"),
        }
    }
}

impl std::fmt::Debug for SigningKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("SigningKey<opaque>")
    }
}

/// A regular Ed25519 verification key
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerificationKey {
    payload: Vec<u8>,
    key_type: String,
    description: String,
}

impl_envelope!(VerificationKey, |len| len == 32);

impl VerificationKey {
    pub fn from_bytes(payload: Vec<u8>) -> Result<Self, Error> {
        Self::from_parts(payload, String::new(), String::new())
    }

    /// Blake2b-224 digest of the key, as used in addresses
    pub fn hash(&self) -> VerificationKeyHash {
        Hasher::<224>::hash(&self.payload)
    }

    pub fn verify(&self, data: &[u8], signature: &Signature) -> bool {
        match PublicKey::try_from(self.payload.as_slice()) {
            Ok(key) => key.verify(data, signature),
            Err(_) => false,
        }
    }

    pub fn to_public_key(&self) -> Result<PublicKey, Error> {
        PublicKey::try_from(self.payload.as_slice())
            .map_err(|_| Error::InvalidSize(self.payload.len()))
    }
}

/// An extended Ed25519 signing key in the HD wallet 128-byte layout
#[derive(Clone, PartialEq, Eq)]
pub struct ExtendedSigningKey {
    payload: Vec<u8>,
    key_type: String,
    description: String,
}

impl_envelope!(ExtendedSigningKey, |len| len == 128);

impl ExtendedSigningKey {
    /// Consume externally-derived key bytes (extended secret, public key,
    /// chain code)
    pub fn from_bytes(payload: Vec<u8>, role: KeyRole) -> Result<Self, Error> {
        Self::from_parts(
            payload,
            role.signing_type(true).to_string(),
            role.signing_description().to_string(),
        )
    }

    fn secret(&self) -> Result<SecretKeyExtended, Error> {
        let bytes: [u8; 64] = self.payload[..64].try_into().expect("checked");
        SecretKeyExtended::from_bytes(bytes).map_err(|_| Error::InvalidBitTweaks)
    }

    pub fn sign(&self, data: &[u8]) -> Result<Signature, Error> {
        Ok(self.secret()?.sign(data))
    }

    pub fn to_verification_key(&self) -> ExtendedVerificationKey {
        ExtendedVerificationKey {
            payload: self.payload[64..].to_vec(),
            key_type: self.key_type.replace("Signing", "Verification"),
            description: self.description.replace("Signing", "Verification"),
        }
    }
}

impl std::fmt::Debug for ExtendedSigningKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("ExtendedSigningKey<opaque>")
    }
}

/// An extended verification key: public key plus chain code
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtendedVerificationKey {
    payload: Vec<u8>,
    key_type: String,
    description: String,
}

impl_envelope!(ExtendedVerificationKey, |len| len == 64);

impl ExtendedVerificationKey {
    /// The 32-byte verification key with the chain code trimmed off
    pub fn to_non_extended(&self) -> VerificationKey {
        VerificationKey {
            payload: self.payload[..32].to_vec(),
            key_type: self.key_type.replace("Extended", "").replace("_bip32", ""),
            description: self.description.clone(),
        }
    }

    /// Hash of the non-extended key; the chain code never enters addresses
    pub fn hash(&self) -> VerificationKeyHash {
        self.to_non_extended().hash()
    }
}

/// A signing/verification key pair
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyPair {
    pub signing_key: SigningKey,
    pub verification_key: VerificationKey,
}

impl KeyPair {
    pub fn generate<R: RngCore + CryptoRng>(rng: R, role: KeyRole) -> Self {
        let signing_key = SigningKey::generate(rng, role);
        Self::from_signing_key(signing_key)
    }

    pub fn from_signing_key(signing_key: SigningKey) -> Self {
        let verification_key = signing_key.to_verification_key();

        Self {
            signing_key,
            verification_key,
        }
    }
}

/// Any key that can witness a transaction body hash
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnySigningKey {
    Normal(SigningKey),
    Extended(ExtendedSigningKey),
}

impl AnySigningKey {
    pub fn sign(&self, data: &[u8]) -> Result<Signature, Error> {
        match self {
            AnySigningKey::Normal(key) => Ok(key.sign(data)),
            AnySigningKey::Extended(key) => key.sign(data),
        }
    }

    /// The non-extended verification key matching this signing key
    pub fn to_verification_key(&self) -> VerificationKey {
        match self {
            AnySigningKey::Normal(key) => key.to_verification_key(),
            AnySigningKey::Extended(key) => key.to_verification_key().to_non_extended(),
        }
    }
}

impl From<SigningKey> for AnySigningKey {
    fn from(key: SigningKey) -> Self {
        AnySigningKey::Normal(key)
    }
}

impl From<ExtendedSigningKey> for AnySigningKey {
    fn from(key: ExtendedSigningKey) -> Self {
        AnySigningKey::Extended(key)
    }
}
