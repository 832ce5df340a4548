//! Ledger primitives and cbor codec for Cardano transaction construction
//!
//! Handcrafted, idiomatic rust artifacts based on the [Conway CDDL](https://github.com/IntersectMBO/cardano-ledger/blob/master/eras/conway/impl/cddl-files/conway.cddl).
//! Serialization is bit-exact with what the ledger expects: any deviation
//! changes the transaction id and breaks signatures.

mod aux;
mod model;
mod plutus;
mod script;
mod script_data;
mod value;

pub use aux::*;
pub use model::*;
pub use plutus::*;
pub use script::*;
pub use script_data::*;
pub use value::*;

pub use lovelace_codec::utils::{
    Bytes, CborWrap, IndefList, Int, KeyValuePairs, MaybeIndefArray, NonEmptyKeyValuePairs,
    NonEmptySet, NonZeroInt, Nullable, PositiveCoin, Set,
};
pub use lovelace_codec::Fragment;
pub use lovelace_crypto::hash::Hash;

use lovelace_codec::minicbor::{self, data::Tag, Decode, Encode};
use std::collections::BTreeMap;

// ----- Common type definitions

pub type AddrKeyhash = Hash<28>;

pub type Coin = u64;

pub type CostModel = Vec<i64>;

pub type DatumHash = Hash<32>;

pub type AuxiliaryDataHash = Hash<32>;

pub type TransactionId = Hash<32>;

pub type AnchorDataHash = Hash<32>;

pub type DnsName = String;

pub type Epoch = u64;

pub type Genesishash = Bytes;

pub type IPv4 = Bytes;

pub type IPv6 = Bytes;

pub type PolicyId = Hash<28>;

pub type PoolKeyhash = Hash<28>;

pub type PoolMetadataHash = Hash<32>;

pub type Port = u32;

pub type ProtocolVersion = (u64, u64);

pub type RewardAccount = Bytes;

pub type ScriptHash = Hash<28>;

pub type VrfKeyhash = Hash<32>;

/// Script execution budget, in memory units and cpu steps
#[derive(Encode, Decode, Debug, PartialEq, Eq, Clone, Copy, Default, PartialOrd, Ord)]
pub struct ExUnits {
    #[n(0)]
    pub mem: u64,
    #[n(1)]
    pub steps: u64,
}

impl ExUnits {
    pub fn new(mem: u64, steps: u64) -> Self {
        Self { mem, steps }
    }

    pub fn is_zero(&self) -> bool {
        self.mem == 0 && self.steps == 0
    }

    /// Component-wise addition; None on overflow. Components are unsigned,
    /// so a "negative" operand cannot exist in the first place.
    pub fn checked_add(&self, other: &ExUnits) -> Option<ExUnits> {
        Some(ExUnits {
            mem: self.mem.checked_add(other.mem)?,
            steps: self.steps.checked_add(other.steps)?,
        })
    }
}

#[derive(Encode, Decode, Debug, PartialEq, Eq, Clone)]
pub struct ExUnitPrices {
    #[n(0)]
    pub mem_price: RationalNumber,

    #[n(1)]
    pub step_price: RationalNumber,
}

#[derive(Debug, PartialEq, Eq, Clone)]
pub struct RationalNumber {
    pub numerator: u64,
    pub denominator: u64,
}

impl<'b, C> minicbor::decode::Decode<'b, C> for RationalNumber {
    fn decode(d: &mut minicbor::Decoder<'b>, ctx: &mut C) -> Result<Self, minicbor::decode::Error> {
        let tag = d.tag()?;

        if tag != Tag::Unassigned(30) {
            return Err(minicbor::decode::Error::message(
                "expected tag 30 for rational number",
            ));
        }

        d.array()?;

        Ok(RationalNumber {
            numerator: d.decode_with(ctx)?,
            denominator: d.decode_with(ctx)?,
        })
    }
}

impl<C> minicbor::encode::Encode<C> for RationalNumber {
    fn encode<W: minicbor::encode::Write>(
        &self,
        e: &mut minicbor::Encoder<W>,
        ctx: &mut C,
    ) -> Result<(), minicbor::encode::Error<W::Error>> {
        e.tag(Tag::Unassigned(30))?;
        e.array(2)?;
        e.encode_with(self.numerator, ctx)?;
        e.encode_with(self.denominator, ctx)?;

        Ok(())
    }
}

pub type UnitInterval = RationalNumber;

pub type PositiveInterval = RationalNumber;

#[derive(Encode, Decode, Debug, PartialEq, Eq, PartialOrd, Ord, Clone, Copy)]
#[cbor(index_only)]
pub enum NetworkId {
    #[n(0)]
    Testnet,
    #[n(1)]
    Mainnet,
}

impl From<NetworkId> for u8 {
    fn from(network_id: NetworkId) -> u8 {
        match network_id {
            NetworkId::Testnet => 0,
            NetworkId::Mainnet => 1,
        }
    }
}

impl TryFrom<u8> for NetworkId {
    type Error = ();

    fn try_from(i: u8) -> Result<Self, Self::Error> {
        match i {
            0 => Ok(Self::Testnet),
            1 => Ok(Self::Mainnet),
            _ => Err(()),
        }
    }
}

/// A reference to the output of a previous transaction
#[derive(Encode, Decode, Debug, PartialEq, Eq, PartialOrd, Ord, Clone, std::hash::Hash, Default)]
pub struct TransactionInput {
    #[n(0)]
    pub transaction_id: TransactionId,

    #[n(1)]
    pub index: u64,
}

impl TransactionInput {
    pub fn new(transaction_id: TransactionId, index: u64) -> Self {
        Self {
            transaction_id,
            index,
        }
    }
}

// !! NOTE / IMPORTANT !!
// It is tempting to declare AddrKeyhash first so the variant order matches
// the wire tags (0 for keys, 1 for scripts). However, the Haskell reference
// codebase declares ScriptHash first, and that declaration order drives the
// `Ord` instance, which in turn decides how maps keyed by credentials are
// sorted on the wire. Preserve the quirk.
#[derive(Debug, PartialEq, PartialOrd, Eq, Ord, Clone, std::hash::Hash)]
pub enum StakeCredential {
    ScriptHash(ScriptHash),
    AddrKeyhash(AddrKeyhash),
}

impl StakeCredential {
    pub fn as_hash(&self) -> &Hash<28> {
        match self {
            StakeCredential::ScriptHash(x) => x,
            StakeCredential::AddrKeyhash(x) => x,
        }
    }

    pub fn is_script(&self) -> bool {
        matches!(self, StakeCredential::ScriptHash(_))
    }
}

impl<'b, C> minicbor::decode::Decode<'b, C> for StakeCredential {
    fn decode(d: &mut minicbor::Decoder<'b>, ctx: &mut C) -> Result<Self, minicbor::decode::Error> {
        d.array()?;

        match d.u16()? {
            0 => Ok(StakeCredential::AddrKeyhash(d.decode_with(ctx)?)),
            1 => Ok(StakeCredential::ScriptHash(d.decode_with(ctx)?)),
            _ => Err(minicbor::decode::Error::message(
                "invalid variant id for StakeCredential",
            )),
        }
    }
}

impl<C> minicbor::encode::Encode<C> for StakeCredential {
    fn encode<W: minicbor::encode::Write>(
        &self,
        e: &mut minicbor::Encoder<W>,
        ctx: &mut C,
    ) -> Result<(), minicbor::encode::Error<W::Error>> {
        match self {
            StakeCredential::AddrKeyhash(x) => {
                e.array(2)?;
                e.encode_with(0, ctx)?;
                e.encode_with(x, ctx)?;
            }
            StakeCredential::ScriptHash(x) => {
                e.array(2)?;
                e.encode_with(1, ctx)?;
                e.encode_with(x, ctx)?;
            }
        }

        Ok(())
    }
}

#[derive(Debug, PartialEq, Eq, Clone)]
pub enum Relay {
    SingleHostAddr(Nullable<Port>, Nullable<IPv4>, Nullable<IPv6>),
    SingleHostName(Nullable<Port>, DnsName),
    MultiHostName(DnsName),
}

impl<'b, C> minicbor::decode::Decode<'b, C> for Relay {
    fn decode(d: &mut minicbor::Decoder<'b>, ctx: &mut C) -> Result<Self, minicbor::decode::Error> {
        d.array()?;

        match d.u16()? {
            0 => Ok(Relay::SingleHostAddr(
                d.decode_with(ctx)?,
                d.decode_with(ctx)?,
                d.decode_with(ctx)?,
            )),
            1 => Ok(Relay::SingleHostName(
                d.decode_with(ctx)?,
                d.decode_with(ctx)?,
            )),
            2 => Ok(Relay::MultiHostName(d.decode_with(ctx)?)),
            _ => Err(minicbor::decode::Error::message(
                "invalid variant id for Relay",
            )),
        }
    }
}

impl<C> minicbor::encode::Encode<C> for Relay {
    fn encode<W: minicbor::encode::Write>(
        &self,
        e: &mut minicbor::Encoder<W>,
        ctx: &mut C,
    ) -> Result<(), minicbor::encode::Error<W::Error>> {
        match self {
            Relay::SingleHostAddr(a, b, c) => {
                e.array(4)?;
                e.encode_with(0, ctx)?;
                e.encode_with(a, ctx)?;
                e.encode_with(b, ctx)?;
                e.encode_with(c, ctx)?;
            }
            Relay::SingleHostName(a, b) => {
                e.array(3)?;
                e.encode_with(1, ctx)?;
                e.encode_with(a, ctx)?;
                e.encode_with(b, ctx)?;
            }
            Relay::MultiHostName(a) => {
                e.array(2)?;
                e.encode_with(2, ctx)?;
                e.encode_with(a, ctx)?;
            }
        }

        Ok(())
    }
}

#[derive(Encode, Decode, Debug, PartialEq, Eq, Clone)]
pub struct PoolMetadata {
    #[n(0)]
    pub url: String,

    #[n(1)]
    pub hash: PoolMetadataHash,
}

/// Plutus language versions, in cost-model key order
#[derive(Encode, Decode, Debug, PartialEq, Eq, Clone, Copy, PartialOrd, Ord, std::hash::Hash)]
#[cbor(index_only)]
pub enum Language {
    #[n(0)]
    PlutusV1,

    #[n(1)]
    PlutusV2,

    #[n(2)]
    PlutusV3,
}

impl Language {
    pub fn value(&self) -> u8 {
        match self {
            Language::PlutusV1 => 0,
            Language::PlutusV2 => 1,
            Language::PlutusV3 => 2,
        }
    }
}

/// Cost models per language, used in protocol parameters
pub type CostModels = BTreeMap<u64, CostModel>;
