use crate::hash::Hash;
use cryptoxide::blake2b::Blake2b;
use lovelace_codec::minicbor;

/// Incremental Blake2b hasher with a const digest size in bits.
///
/// ```
/// use lovelace_crypto::hash::Hasher;
///
/// let mut hasher = Hasher::<224>::new();
/// hasher.input(b"my key");
/// let digest = hasher.finalize();
/// # assert_eq!(
/// #   "276fd18711931e2c0e21430192dbeac0e458093cd9d1fcd7210f64b3",
/// #   hex::encode(digest)
/// # );
/// ```
pub struct Hasher<const BITS: usize>(Blake2b);

impl<const BITS: usize> Hasher<BITS> {
    /// update the [`Hasher`] with the given input
    #[inline]
    pub fn input(&mut self, bytes: &[u8]) {
        use cryptoxide::digest::Digest as _;
        self.0.input(bytes);
    }
}

macro_rules! common_hasher {
    ($size:literal) => {
        impl Hasher<$size> {
            #[inline]
            pub fn new() -> Self {
                Self(Blake2b::new($size / 8))
            }

            /// one-shot digest of the given bytes
            #[inline]
            pub fn hash(bytes: &[u8]) -> Hash<{ $size / 8 }> {
                let mut hasher = Self::new();
                hasher.input(bytes);
                hasher.finalize()
            }

            /// digest of a single prefix byte followed by the given bytes;
            /// this is how script hashes discriminate their language
            #[inline]
            pub fn hash_tagged(bytes: &[u8], tag: u8) -> Hash<{ $size / 8 }> {
                let mut hasher = Self::new();
                hasher.input(&[tag]);
                hasher.input(bytes);
                hasher.finalize()
            }

            /// digest of the CBOR encoding of the given value, streamed
            /// through the hasher without an intermediate buffer
            #[inline]
            pub fn hash_cbor(data: &impl minicbor::Encode<()>) -> Hash<{ $size / 8 }> {
                let mut hasher = Self::new();
                let () = minicbor::encode(data, &mut hasher).expect("infallible");
                hasher.finalize()
            }

            /// consume the [`Hasher`] and return the computed digest
            pub fn finalize(mut self) -> Hash<{ $size / 8 }> {
                use cryptoxide::digest::Digest as _;
                let mut hash = [0; $size / 8];
                self.0.result(&mut hash);
                Hash::new(hash)
            }
        }

        impl Default for Hasher<$size> {
            fn default() -> Self {
                Self::new()
            }
        }
    };
}

common_hasher!(224);
common_hasher!(256);

impl<'a, const BITS: usize> minicbor::encode::Write for &'a mut Hasher<BITS> {
    type Error = std::convert::Infallible;

    #[inline]
    fn write_all(&mut self, buf: &[u8]) -> Result<(), Self::Error> {
        self.input(buf);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blake2b_256_vector() {
        let mut hasher = Hasher::<256>::new();
        hasher.input(b"My transaction");

        assert_eq!(
            "0d8d00cdd4657ac84d82f0a56067634a7adfdf43da41cb534bcaa45060973d21",
            hex::encode(hasher.finalize())
        );
    }

    #[test]
    fn blake2b_224_vector() {
        let digest = Hasher::<224>::hash(b"My Public Key");

        assert_eq!(
            "c123c9bc0e9e31a20a4aa23518836ec5fb54bdc85735c56b38eb79a5",
            hex::encode(digest)
        );
    }
}
