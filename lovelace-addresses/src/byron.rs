//! Decode-only support for legacy Byron addresses
//!
//! A Byron address is a double-CBOR structure: `[#6.24(payload), crc32]`,
//! where the checksum covers the raw payload bytes and the payload itself is
//! `[root_hash, attributes, type]`. Byron addresses can be parsed and spent
//! from, but this library never constructs new ones.

use lovelace_codec::{
    minicbor::{self, data::Tag, Decode, Encode},
    utils::{Bytes, OrderPreservingProperties},
};
use lovelace_crypto::hash::Hash;

use crate::{Error, Network};

const TESTNET_MAGIC_DISCRIMINANT: u64 = 1097911063;

pub type AddressId = Hash<28>;
pub type StakeholderId = Hash<28>;

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd)]
pub enum AddrDistr {
    Bootstrap(StakeholderId),
    Single,
}

impl<'b, C> minicbor::Decode<'b, C> for AddrDistr {
    fn decode(d: &mut minicbor::Decoder<'b>, ctx: &mut C) -> Result<Self, minicbor::decode::Error> {
        d.array()?;
        let variant = d.u32()?;

        match variant {
            0 => Ok(AddrDistr::Bootstrap(d.decode_with(ctx)?)),
            1 => Ok(AddrDistr::Single),
            _ => Err(minicbor::decode::Error::message(
                "invalid variant for address distribution",
            )),
        }
    }
}

impl<C> minicbor::Encode<C> for AddrDistr {
    fn encode<W: minicbor::encode::Write>(
        &self,
        e: &mut minicbor::Encoder<W>,
        ctx: &mut C,
    ) -> Result<(), minicbor::encode::Error<W::Error>> {
        match self {
            AddrDistr::Bootstrap(x) => {
                e.array(2)?;
                e.u32(0)?;
                e.encode_with(x, ctx)?;
            }
            AddrDistr::Single => {
                e.array(1)?;
                e.u32(1)?;
            }
        }

        Ok(())
    }
}

/// Byron address type tag
///
/// Only pubkey (0) and redeem (2) addresses ever made it on-chain; anything
/// else is rejected at the [`ByronAddress`] level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd)]
pub enum AddrType {
    PubKey,
    Script,
    Redeem,
    Other(u64),
}

impl AddrType {
    pub fn value(&self) -> u64 {
        match self {
            AddrType::PubKey => 0,
            AddrType::Script => 1,
            AddrType::Redeem => 2,
            AddrType::Other(x) => *x,
        }
    }
}

impl<'b, C> minicbor::Decode<'b, C> for AddrType {
    fn decode(
        d: &mut minicbor::Decoder<'b>,
        _ctx: &mut C,
    ) -> Result<Self, minicbor::decode::Error> {
        let variant = d.u64()?;

        match variant {
            0 => Ok(AddrType::PubKey),
            1 => Ok(AddrType::Script),
            2 => Ok(AddrType::Redeem),
            x => Ok(AddrType::Other(x)),
        }
    }
}

impl<C> minicbor::Encode<C> for AddrType {
    fn encode<W: minicbor::encode::Write>(
        &self,
        e: &mut minicbor::Encoder<W>,
        _ctx: &mut C,
    ) -> Result<(), minicbor::encode::Error<W::Error>> {
        e.u64(self.value())?;

        Ok(())
    }
}

/// A single entry of the payload attribute map, in original order
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd)]
pub enum AddrAttrProperty {
    AddrDistr(AddrDistr),
    DerivationPath(Bytes),
    NetworkMagic(Bytes),
    Unparsed(u8, Bytes),
}

impl<'b, C> minicbor::Decode<'b, C> for AddrAttrProperty {
    fn decode(d: &mut minicbor::Decoder<'b>, ctx: &mut C) -> Result<Self, minicbor::decode::Error> {
        let key = d.u8()?;

        match key {
            0 => Ok(AddrAttrProperty::AddrDistr(d.decode_with(ctx)?)),
            1 => Ok(AddrAttrProperty::DerivationPath(d.decode_with(ctx)?)),
            2 => Ok(AddrAttrProperty::NetworkMagic(d.decode_with(ctx)?)),
            x => Ok(AddrAttrProperty::Unparsed(x, d.decode_with(ctx)?)),
        }
    }
}

impl<C> minicbor::Encode<C> for AddrAttrProperty {
    fn encode<W: minicbor::encode::Write>(
        &self,
        e: &mut minicbor::Encoder<W>,
        ctx: &mut C,
    ) -> Result<(), minicbor::encode::Error<W::Error>> {
        match self {
            AddrAttrProperty::AddrDistr(x) => {
                e.u32(0)?;
                e.encode_with(x, ctx)?;
            }
            AddrAttrProperty::DerivationPath(x) => {
                e.u32(1)?;
                e.encode_with(x, ctx)?;
            }
            AddrAttrProperty::NetworkMagic(x) => {
                e.u32(2)?;
                e.encode_with(x, ctx)?;
            }
            AddrAttrProperty::Unparsed(a, b) => {
                e.encode_with(a, ctx)?;
                e.encode_with(b, ctx)?;
            }
        }

        Ok(())
    }
}

pub type AddrAttrs = OrderPreservingProperties<AddrAttrProperty>;

/// The inner payload of a Byron address
#[derive(Debug, Encode, Decode, Clone, PartialEq)]
pub struct AddressPayload {
    #[n(0)]
    pub root: AddressId,

    #[n(1)]
    pub attributes: AddrAttrs,

    #[n(2)]
    pub addrtype: AddrType,
}

impl AddressPayload {
    /// Network inferred from the magic attribute: the testnet discriminant
    /// maps to testnet, anything else (including absence) means mainnet.
    pub fn network(&self) -> Network {
        for attr in self.attributes.iter() {
            if let AddrAttrProperty::NetworkMagic(bytes) = attr {
                let magic: Result<u64, _> = minicbor::decode(bytes);

                return match magic {
                    Ok(TESTNET_MAGIC_DISCRIMINANT) => Network::Testnet,
                    _ => Network::Mainnet,
                };
            }
        }

        Network::Mainnet
    }
}

/// A decoded Byron address: raw payload bytes plus the CRC32 over them
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Hash)]
pub struct ByronAddress {
    payload: Bytes,
    crc: u32,
}

fn compute_crc(payload: &[u8]) -> u32 {
    crc::Crc::<u32>::new(&crc::CRC_32_ISO_HDLC).checksum(payload)
}

impl ByronAddress {
    fn from_parts(payload: Bytes, crc: u32) -> Result<Self, Error> {
        let computed = compute_crc(&payload);

        if crc != computed {
            return Err(Error::InvalidByronCrc(crc, computed));
        }

        let candidate = ByronAddress { payload, crc };

        // reject structurally invalid payloads upfront so that accessors
        // never fail later
        let inner = candidate.decode_payload()?;

        match inner.addrtype {
            AddrType::PubKey | AddrType::Redeem => Ok(candidate),
            other => Err(Error::InvalidByronAddrType(other.value())),
        }
    }

    /// Tries to decode a Byron address from its raw CBOR bytes
    pub fn from_bytes(value: &[u8]) -> Result<Self, Error> {
        let mut d = minicbor::Decoder::new(value);

        d.array().map_err(Error::InvalidByronCbor)?;

        let tag = d.tag().map_err(Error::InvalidByronCbor)?;

        if tag != Tag::Cbor {
            return Err(Error::InvalidByronTag);
        }

        let payload: Vec<u8> = d
            .bytes()
            .map(Vec::from)
            .map_err(Error::InvalidByronCbor)?;

        let crc = d.u32().map_err(Error::InvalidByronCbor)?;

        Self::from_parts(payload.into(), crc)
    }

    /// Tries to decode a Byron address from its base58 rendering
    pub fn from_base58(value: &str) -> Result<Self, Error> {
        let bytes = base58::FromBase58::from_base58(value).map_err(Error::BadBase58)?;
        Self::from_bytes(&bytes)
    }

    /// Decodes the inner payload structure
    pub fn decode_payload(&self) -> Result<AddressPayload, Error> {
        minicbor::decode(&self.payload).map_err(Error::InvalidByronCbor)
    }

    /// The 28-byte root hash of the address
    pub fn root(&self) -> Result<AddressId, Error> {
        self.decode_payload().map(|x| x.root)
    }

    pub fn crc(&self) -> u32 {
        self.crc
    }

    pub fn network(&self) -> Result<Network, Error> {
        self.decode_payload().map(|x| x.network())
    }

    /// Gets a numeric id describing the type of the address
    pub fn typeid(&self) -> u8 {
        0b1000
    }

    pub fn to_vec(&self) -> Vec<u8> {
        minicbor::to_vec(self).expect("infallible")
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.to_vec())
    }

    pub fn to_base58(&self) -> String {
        base58::ToBase58::to_base58(self.to_vec().as_slice())
    }
}

impl<'b, C> minicbor::Decode<'b, C> for ByronAddress {
    fn decode(d: &mut minicbor::Decoder<'b>, _ctx: &mut C) -> Result<Self, minicbor::decode::Error> {
        d.array()?;

        let tag = d.tag()?;

        if tag != Tag::Cbor {
            return Err(minicbor::decode::Error::message(
                "expected tag 24 for byron address payload",
            ));
        }

        let payload: Vec<u8> = d.bytes().map(Vec::from)?;
        let crc = d.u32()?;

        ByronAddress::from_parts(payload.into(), crc)
            .map_err(|e| minicbor::decode::Error::message(format!("invalid byron address: {e}")))
    }
}

impl<C> minicbor::Encode<C> for ByronAddress {
    fn encode<W: minicbor::encode::Write>(
        &self,
        e: &mut minicbor::Encoder<W>,
        _ctx: &mut C,
    ) -> Result<(), minicbor::encode::Error<W::Error>> {
        e.array(2)?;
        e.tag(Tag::Cbor)?;
        e.bytes(&self.payload)?;
        e.u32(self.crc)?;

        Ok(())
    }
}
