use lovelace_codec::minicbor::{self, Decode, Encode};
use lovelace_codec::utils::Bytes;
use lovelace_crypto::hash::Hasher;

use crate::{AddrKeyhash, ScriptHash};

/// Native (phase-1) script AST
///
/// Hashed as Blake2b-224 over `0x00 || cbor(script)`, the zero prefix being
/// the native-script language discriminant.
#[derive(Debug, PartialEq, Eq, Clone)]
pub enum NativeScript {
    ScriptPubkey(AddrKeyhash),
    ScriptAll(Vec<NativeScript>),
    ScriptAny(Vec<NativeScript>),
    ScriptNOfK(u32, Vec<NativeScript>),
    InvalidBefore(u64),
    InvalidHereafter(u64),
}

impl NativeScript {
    pub fn script_hash(&self) -> ScriptHash {
        let cbor = minicbor::to_vec(self).expect("infallible");
        Hasher::<224>::hash_tagged(&cbor, 0)
    }

    /// Key hashes of every pubkey leaf in the script tree
    pub fn signers(&self) -> Vec<AddrKeyhash> {
        match self {
            NativeScript::ScriptPubkey(hash) => vec![*hash],
            NativeScript::ScriptAll(scripts)
            | NativeScript::ScriptAny(scripts)
            | NativeScript::ScriptNOfK(_, scripts) => {
                scripts.iter().flat_map(|s| s.signers()).collect()
            }
            NativeScript::InvalidBefore(_) | NativeScript::InvalidHereafter(_) => vec![],
        }
    }
}

impl<'b, C> minicbor::decode::Decode<'b, C> for NativeScript {
    fn decode(d: &mut minicbor::Decoder<'b>, ctx: &mut C) -> Result<Self, minicbor::decode::Error> {
        d.array()?;

        match d.u32()? {
            0 => Ok(NativeScript::ScriptPubkey(d.decode_with(ctx)?)),
            1 => Ok(NativeScript::ScriptAll(d.decode_with(ctx)?)),
            2 => Ok(NativeScript::ScriptAny(d.decode_with(ctx)?)),
            3 => Ok(NativeScript::ScriptNOfK(
                d.decode_with(ctx)?,
                d.decode_with(ctx)?,
            )),
            4 => Ok(NativeScript::InvalidBefore(d.decode_with(ctx)?)),
            5 => Ok(NativeScript::InvalidHereafter(d.decode_with(ctx)?)),
            _ => Err(minicbor::decode::Error::message(
                "unknown variant for native script",
            )),
        }
    }
}

impl<C> minicbor::encode::Encode<C> for NativeScript {
    fn encode<W: minicbor::encode::Write>(
        &self,
        e: &mut minicbor::Encoder<W>,
        ctx: &mut C,
    ) -> Result<(), minicbor::encode::Error<W::Error>> {
        match self {
            NativeScript::ScriptPubkey(v) => {
                e.array(2)?;
                e.encode_with(0, ctx)?;
                e.encode_with(v, ctx)?;
            }
            NativeScript::ScriptAll(v) => {
                e.array(2)?;
                e.encode_with(1, ctx)?;
                e.encode_with(v, ctx)?;
            }
            NativeScript::ScriptAny(v) => {
                e.array(2)?;
                e.encode_with(2, ctx)?;
                e.encode_with(v, ctx)?;
            }
            NativeScript::ScriptNOfK(a, b) => {
                e.array(3)?;
                e.encode_with(3, ctx)?;
                e.encode_with(a, ctx)?;
                e.encode_with(b, ctx)?;
            }
            NativeScript::InvalidBefore(v) => {
                e.array(2)?;
                e.encode_with(4, ctx)?;
                e.encode_with(v, ctx)?;
            }
            NativeScript::InvalidHereafter(v) => {
                e.array(2)?;
                e.encode_with(5, ctx)?;
                e.encode_with(v, ctx)?;
            }
        }

        Ok(())
    }
}

/// Compiled Plutus script bytes, versioned by const generic
///
/// Hashed as Blake2b-224 over `VERSION || bytes`: 0x01 for V1, 0x02 for V2,
/// 0x03 for V3.
#[derive(Encode, Decode, Debug, PartialEq, Eq, Clone)]
#[cbor(transparent)]
pub struct PlutusScript<const VERSION: usize>(#[n(0)] pub Bytes);

impl<const VERSION: usize> PlutusScript<VERSION> {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self(bytes.into())
    }

    pub fn script_hash(&self) -> ScriptHash {
        Hasher::<224>::hash_tagged(self.as_ref(), VERSION as u8)
    }
}

impl<const VERSION: usize> AsRef<[u8]> for PlutusScript<VERSION> {
    fn as_ref(&self) -> &[u8] {
        self.0.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Hash;

    fn pubkey(fill: u8) -> NativeScript {
        NativeScript::ScriptPubkey(Hash::new([fill; 28]))
    }

    #[test]
    fn native_script_roundtrip() {
        let script = NativeScript::ScriptAll(vec![
            NativeScript::InvalidHereafter(123456789),
            NativeScript::InvalidBefore(123456780),
            pubkey(1),
            NativeScript::ScriptAny(vec![pubkey(1), pubkey(2)]),
            NativeScript::ScriptNOfK(1, vec![pubkey(3)]),
        ]);

        let bytes = minicbor::to_vec(&script).unwrap();
        let back: NativeScript = minicbor::decode(&bytes).unwrap();

        assert_eq!(back, script);
    }

    #[test]
    fn signers_walks_the_tree() {
        let script = NativeScript::ScriptAll(vec![
            NativeScript::InvalidBefore(1),
            pubkey(1),
            NativeScript::ScriptAny(vec![pubkey(1), pubkey(2)]),
        ]);

        let signers = script.signers();
        assert_eq!(signers.len(), 3);
        assert!(signers.contains(&Hash::new([2; 28])));
    }

    #[test]
    fn script_hashes_discriminate_language() {
        let native = pubkey(1);
        let native_again = pubkey(1);
        assert_eq!(native.script_hash(), native_again.script_hash());

        let v1 = PlutusScript::<1>::new(vec![0x4e, 0x4d, 0x01, 0x00, 0x00, 0x22, 0x12, 0x00, 0x11]);
        let v2 = PlutusScript::<2>::new(vec![0x4e, 0x4d, 0x01, 0x00, 0x00, 0x22, 0x12, 0x00, 0x11]);

        // same bytes, different language prefix, different hash
        assert_ne!(v1.script_hash(), v2.script_hash());
    }
}
