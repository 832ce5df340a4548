//! Ed25519 and Ed25519Extended asymmetric keys
//!
//! [`SecretKey`] is a normal Ed25519 key (32-byte seed). [`SecretKeyExtended`]
//! is the 64-byte extended form produced by BIP32-style derivation. Both
//! produce a [`Signature`] verifiable with the associated [`PublicKey`].

use crate::memsec::Scrubbed as _;
use cryptoxide::ed25519::{
    self, EXTENDED_KEY_LENGTH, PRIVATE_KEY_LENGTH, PUBLIC_KEY_LENGTH, SIGNATURE_LENGTH,
};
use rand_core::{CryptoRng, RngCore};
use std::{fmt, str::FromStr};
use thiserror::Error;

/// Ed25519 secret key (seed form)
#[derive(Clone)]
pub struct SecretKey([u8; Self::SIZE]);

/// Ed25519 extended secret key
///
/// Unlike [`SecretKey`], the extended form is what HD wallet derivation
/// produces. The first 32 bytes carry the clamping bit tweaks mandated by
/// the scheme; [`SecretKeyExtended::from_bytes`] verifies them.
#[derive(Clone)]
pub struct SecretKeyExtended([u8; Self::SIZE]);

/// Ed25519 public key, used to verify a [`Signature`]
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct PublicKey([u8; Self::SIZE]);

/// Ed25519 signature
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Signature([u8; Self::SIZE]);

#[derive(Debug, Error)]
pub enum TryFromPublicKeyError {
    #[error("Invalid size, expecting {}", PublicKey::SIZE)]
    InvalidSize,
}

#[derive(Debug, Error)]
pub enum TryFromSignatureError {
    #[error("Invalid size, expecting {}", Signature::SIZE)]
    InvalidSize,
}

#[derive(Debug, Error)]
pub enum TryFromSecretKeyError {
    #[error("Invalid size, expecting {}", SecretKey::SIZE)]
    InvalidSize,
}

#[derive(Debug, Error)]
pub enum TryFromSecretKeyExtendedError {
    #[error("Invalid Ed25519 Extended Secret Key format")]
    InvalidBitTweaks,

    #[error("Invalid size, expecting {}", SecretKeyExtended::SIZE)]
    InvalidSize,
}

macro_rules! impl_size_zero {
    ($Type:ty, $Size:expr) => {
        impl $Type {
            /// Size of the type in bytes.
            pub const SIZE: usize = $Size;

            #[inline]
            fn zero() -> Self {
                Self([0; Self::SIZE])
            }
        }
    };
}

impl_size_zero!(SecretKey, PRIVATE_KEY_LENGTH);
impl_size_zero!(SecretKeyExtended, EXTENDED_KEY_LENGTH);
impl_size_zero!(PublicKey, PUBLIC_KEY_LENGTH);
impl_size_zero!(Signature, SIGNATURE_LENGTH);

impl SecretKey {
    /// generate a new [`SecretKey`] from the given random number generator
    pub fn new<Rng>(mut rng: Rng) -> Self
    where
        Rng: RngCore + CryptoRng,
    {
        let mut s = Self::zero();
        rng.fill_bytes(&mut s.0);
        s
    }

    /// the [`PublicKey`] associated to this key
    pub fn public_key(&self) -> PublicKey {
        let (mut sk, pk) = ed25519::keypair(&self.0);

        // sk is a private component, scrub it before releasing the result
        sk.scrub();

        PublicKey(pk)
    }

    /// create a [`Signature`] for the given message with this key
    pub fn sign<T>(&self, msg: T) -> Signature
    where
        T: AsRef<[u8]>,
    {
        let (mut sk, _) = ed25519::keypair(&self.0);

        let signature = ed25519::signature(msg.as_ref(), &sk);

        sk.scrub();

        Signature(signature)
    }

    /// expose the raw bytes of the key
    ///
    /// # Safety
    ///
    /// Marked unsafe to flag that the caller takes over responsibility for
    /// the confidentiality of the returned bytes: the scrub-on-drop and
    /// opaque-debug protections no longer apply to the copy.
    #[inline]
    pub unsafe fn leak_into_bytes(Self(bytes): Self) -> [u8; Self::SIZE] {
        bytes
    }
}

impl SecretKeyExtended {
    /// generate a new [`SecretKeyExtended`] from the given random number
    /// generator
    pub fn new<Rng>(mut rng: Rng) -> Self
    where
        Rng: RngCore + CryptoRng,
    {
        let mut s = Self::zero();
        rng.fill_bytes(&mut s.0);

        s.0[0] &= 0b1111_1000;
        s.0[31] &= 0b0011_1111;
        s.0[31] |= 0b0100_0000;

        debug_assert!(s.check_structure());

        s
    }

    #[inline]
    #[allow(clippy::verbose_bit_mask)]
    fn check_structure(&self) -> bool {
        (self.0[0] & 0b0000_0111) == 0
            && (self.0[31] & 0b0100_0000) == 0b0100_0000
            && (self.0[31] & 0b1000_0000) == 0
    }

    /// build a [`SecretKeyExtended`] from raw bytes, verifying the
    /// mandatory bit tweaks
    pub fn from_bytes(bytes: [u8; Self::SIZE]) -> Result<Self, TryFromSecretKeyExtendedError> {
        let candidate = Self(bytes);

        if candidate.check_structure() {
            Ok(candidate)
        } else {
            Err(TryFromSecretKeyExtendedError::InvalidBitTweaks)
        }
    }

    /// build a [`SecretKeyExtended`] without validating the bit tweaks
    ///
    /// # Safety
    ///
    /// Signatures produced with a non-conforming key are not
    /// cryptographically sound. Prefer [`SecretKeyExtended::from_bytes`].
    pub unsafe fn from_bytes_unchecked(bytes: [u8; Self::SIZE]) -> Self {
        Self(bytes)
    }

    /// the [`PublicKey`] associated to this key
    pub fn public_key(&self) -> PublicKey {
        let pk = ed25519::extended_to_public(&self.0);

        PublicKey::from(pk)
    }

    /// create a [`Signature`] for the given message with this key
    pub fn sign<T: AsRef<[u8]>>(&self, msg: T) -> Signature {
        let signature = ed25519::signature_extended(msg.as_ref(), &self.0);

        Signature::from(signature)
    }

    /// expose the raw bytes of the key
    ///
    /// # Safety
    ///
    /// Same caveats as [`SecretKey::leak_into_bytes`].
    #[inline]
    pub unsafe fn leak_into_bytes(Self(bytes): Self) -> [u8; Self::SIZE] {
        bytes
    }
}

impl PublicKey {
    /// verify the [`Signature`] against the message and this key
    #[inline]
    pub fn verify<T: AsRef<[u8]>>(&self, msg: T, signature: &Signature) -> bool {
        ed25519::verify(msg.as_ref(), &self.0, &signature.0)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl Signature {
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl Drop for SecretKey {
    fn drop(&mut self) {
        self.0.scrub()
    }
}

impl Drop for SecretKeyExtended {
    fn drop(&mut self) {
        self.0.scrub()
    }
}

impl fmt::Debug for SecretKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SecretKey<Ed25519>")
    }
}

impl fmt::Debug for SecretKeyExtended {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SecretKey<Ed25519Extended>")
    }
}

impl fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("PublicKey").field(&hex::encode(self.0)).finish()
    }
}

impl fmt::Debug for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Signature").field(&hex::encode(self.0)).finish()
    }
}

impl fmt::Display for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

impl From<[u8; Self::SIZE]> for PublicKey {
    fn from(bytes: [u8; Self::SIZE]) -> Self {
        Self(bytes)
    }
}

impl From<[u8; Self::SIZE]> for Signature {
    fn from(bytes: [u8; Self::SIZE]) -> Self {
        Self(bytes)
    }
}

impl From<[u8; Self::SIZE]> for SecretKey {
    fn from(bytes: [u8; Self::SIZE]) -> Self {
        Self(bytes)
    }
}

impl AsRef<[u8]> for PublicKey {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl AsRef<[u8]> for Signature {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl TryFrom<&[u8]> for PublicKey {
    type Error = TryFromPublicKeyError;

    fn try_from(value: &[u8]) -> Result<Self, Self::Error> {
        let bytes: [u8; Self::SIZE] = value
            .try_into()
            .map_err(|_| TryFromPublicKeyError::InvalidSize)?;
        Ok(Self(bytes))
    }
}

impl TryFrom<&[u8]> for Signature {
    type Error = TryFromSignatureError;

    fn try_from(value: &[u8]) -> Result<Self, Self::Error> {
        let bytes: [u8; Self::SIZE] = value
            .try_into()
            .map_err(|_| TryFromSignatureError::InvalidSize)?;
        Ok(Self(bytes))
    }
}

impl TryFrom<&[u8]> for SecretKey {
    type Error = TryFromSecretKeyError;

    fn try_from(value: &[u8]) -> Result<Self, Self::Error> {
        let bytes: [u8; Self::SIZE] = value
            .try_into()
            .map_err(|_| TryFromSecretKeyError::InvalidSize)?;
        Ok(Self(bytes))
    }
}

impl TryFrom<&[u8]> for SecretKeyExtended {
    type Error = TryFromSecretKeyExtendedError;

    fn try_from(value: &[u8]) -> Result<Self, Self::Error> {
        let bytes: [u8; Self::SIZE] = value
            .try_into()
            .map_err(|_| TryFromSecretKeyExtendedError::InvalidSize)?;
        Self::from_bytes(bytes)
    }
}

impl FromStr for PublicKey {
    type Err = TryFromPublicKeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = hex::decode(s).map_err(|_| TryFromPublicKeyError::InvalidSize)?;
        Self::try_from(bytes.as_slice())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::OsRng;

    #[test]
    fn sign_verify_roundtrip() {
        let key = SecretKey::new(OsRng);
        let public = key.public_key();

        let signature = key.sign(b"lovelace");

        assert!(public.verify(b"lovelace", &signature));
        assert!(!public.verify(b"not lovelace", &signature));
    }

    #[test]
    fn extended_sign_verify_roundtrip() {
        let key = SecretKeyExtended::new(OsRng);
        let public = key.public_key();

        let signature = key.sign(b"lovelace");

        assert!(public.verify(b"lovelace", &signature));
    }

    #[test]
    fn extended_bit_tweaks_checked() {
        let result = SecretKeyExtended::from_bytes([0xff; SecretKeyExtended::SIZE]);
        assert!(matches!(
            result,
            Err(TryFromSecretKeyExtendedError::InvalidBitTweaks)
        ));
    }
}
