use lovelace_codec::minicbor::{
    self,
    data::{Tag, Type},
    Encode,
};
use lovelace_codec::utils::{IndefList, Int, KeyValuePairs};
use lovelace_crypto::hash::Hasher;
use std::{fmt, ops::Deref};
use thiserror::Error;

use crate::DatumHash;

#[derive(Error, Debug)]
pub enum PlutusDataError {
    #[error("constructor id {0} out of range for compact tags")]
    ConstructorOutOfRange(u64),

    #[error("integer out of the range representable in JSON")]
    IntOutOfRange,

    #[error("invalid JSON shape for plutus data: {0}")]
    InvalidJson(String),

    #[error("error parsing JSON: {0}")]
    JsonParse(#[from] serde_json::Error),

    #[error("invalid hex payload: {0}")]
    InvalidHex(#[from] hex::FromHexError),
}

/// Untyped Plutus datum, isomorphic to the ledger's `Data` type
///
/// The encoding mimics the canonical Haskell plutus implementation down to
/// its quirks: constructor field lists and non-empty arrays are
/// indefinite-length, maps are definite, and byte strings beyond 64 bytes
/// are chunked.
#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Clone)]
pub enum PlutusData {
    Constr(Constr<PlutusData>),
    Map(KeyValuePairs<PlutusData, PlutusData>),
    BigInt(BigInt),
    BoundedBytes(BoundedBytes),
    Array(IndefList<PlutusData>),
}

impl PlutusData {
    /// The unit datum: constructor 0 with no fields
    pub fn unit() -> Self {
        PlutusData::Constr(Constr::new(0, vec![]))
    }

    pub fn integer(value: i64) -> Self {
        PlutusData::BigInt(BigInt::Int(value.into()))
    }

    pub fn bytes(value: Vec<u8>) -> Self {
        PlutusData::BoundedBytes(value.into())
    }

    pub fn list(items: Vec<PlutusData>) -> Self {
        PlutusData::Array(items.into())
    }

    /// Blake2b-256 of the canonical encoding
    pub fn hash(&self) -> DatumHash {
        Hasher::<256>::hash_cbor(self)
    }

    /// Renders the original implementation's JSON dictionary shape
    pub fn to_json(&self) -> Result<serde_json::Value, PlutusDataError> {
        use serde_json::{json, Value};

        match self {
            PlutusData::Constr(constr) => {
                let fields: Result<Vec<_>, _> =
                    constr.fields.iter().map(|f| f.to_json()).collect();

                Ok(json!({
                    "constructor": constr.constructor(),
                    "fields": fields?,
                }))
            }
            PlutusData::Map(pairs) => {
                let entries: Result<Vec<Value>, PlutusDataError> = pairs
                    .iter()
                    .map(|(k, v)| {
                        Ok(json!({
                            "k": k.to_json()?,
                            "v": v.to_json()?,
                        }))
                    })
                    .collect();

                Ok(json!({ "map": entries? }))
            }
            PlutusData::BigInt(big) => {
                let value = i128::from(big);

                if let Ok(small) = i64::try_from(value) {
                    Ok(json!({ "int": small }))
                } else if let Ok(unsigned) = u64::try_from(value) {
                    Ok(json!({ "int": unsigned }))
                } else {
                    Err(PlutusDataError::IntOutOfRange)
                }
            }
            PlutusData::BoundedBytes(bytes) => Ok(json!({ "bytes": hex::encode(bytes.deref()) })),
            PlutusData::Array(items) => {
                let list: Result<Vec<_>, _> = items.iter().map(|x| x.to_json()).collect();
                Ok(json!({ "list": list? }))
            }
        }
    }

    pub fn to_json_string(&self) -> Result<String, PlutusDataError> {
        Ok(serde_json::to_string(&self.to_json()?)?)
    }

    /// Parses the original implementation's JSON dictionary shape
    pub fn from_json(value: &serde_json::Value) -> Result<Self, PlutusDataError> {
        let object = value
            .as_object()
            .ok_or_else(|| PlutusDataError::InvalidJson("expected object".into()))?;

        if let Some(id) = object.get("constructor") {
            let id = id
                .as_u64()
                .ok_or_else(|| PlutusDataError::InvalidJson("bad constructor id".into()))?;

            let fields = object
                .get("fields")
                .and_then(|f| f.as_array())
                .ok_or_else(|| PlutusDataError::InvalidJson("missing fields".into()))?
                .iter()
                .map(Self::from_json)
                .collect::<Result<Vec<_>, _>>()?;

            Ok(PlutusData::Constr(Constr::new(id, fields)))
        } else if let Some(entries) = object.get("map") {
            let entries = entries
                .as_array()
                .ok_or_else(|| PlutusDataError::InvalidJson("bad map".into()))?
                .iter()
                .map(|entry| {
                    let k = entry
                        .get("k")
                        .ok_or_else(|| PlutusDataError::InvalidJson("map entry without k".into()))?;
                    let v = entry
                        .get("v")
                        .ok_or_else(|| PlutusDataError::InvalidJson("map entry without v".into()))?;

                    Ok((Self::from_json(k)?, Self::from_json(v)?))
                })
                .collect::<Result<Vec<_>, PlutusDataError>>()?;

            Ok(PlutusData::Map(entries.into()))
        } else if let Some(int) = object.get("int") {
            if let Some(small) = int.as_i64() {
                Ok(PlutusData::BigInt(BigInt::Int(small.into())))
            } else if let Some(unsigned) = int.as_u64() {
                Ok(PlutusData::BigInt(BigInt::Int(unsigned.into())))
            } else {
                Err(PlutusDataError::IntOutOfRange)
            }
        } else if let Some(bytes) = object.get("bytes") {
            let hex_str = bytes
                .as_str()
                .ok_or_else(|| PlutusDataError::InvalidJson("bad bytes".into()))?;

            Ok(PlutusData::BoundedBytes(hex::decode(hex_str)?.into()))
        } else if let Some(list) = object.get("list") {
            let items = list
                .as_array()
                .ok_or_else(|| PlutusDataError::InvalidJson("bad list".into()))?
                .iter()
                .map(Self::from_json)
                .collect::<Result<Vec<_>, _>>()?;

            Ok(PlutusData::Array(items.into()))
        } else {
            Err(PlutusDataError::InvalidJson(
                "unknown plutus data shape".into(),
            ))
        }
    }

    pub fn from_json_string(data: &str) -> Result<Self, PlutusDataError> {
        Self::from_json(&serde_json::from_str(data)?)
    }
}

impl<'b, C> minicbor::decode::Decode<'b, C> for PlutusData {
    fn decode(d: &mut minicbor::Decoder<'b>, ctx: &mut C) -> Result<Self, minicbor::decode::Error> {
        match d.datatype()? {
            Type::Tag => {
                let mut probe = d.probe();
                let tag = probe.tag()?;

                match tag {
                    Tag::PosBignum | Tag::NegBignum => Ok(Self::BigInt(d.decode_with(ctx)?)),
                    Tag::Unassigned((121..=127) | (1280..=1400) | 102) => {
                        Ok(Self::Constr(d.decode_with(ctx)?))
                    }
                    _ => Err(minicbor::decode::Error::message(
                        "unknown tag for plutus data",
                    )),
                }
            }
            Type::U8
            | Type::U16
            | Type::U32
            | Type::U64
            | Type::I8
            | Type::I16
            | Type::I32
            | Type::I64
            | Type::Int => Ok(Self::BigInt(d.decode_with(ctx)?)),
            Type::Map | Type::MapIndef => Ok(Self::Map(d.decode_with(ctx)?)),
            Type::Bytes | Type::BytesIndef => Ok(Self::BoundedBytes(d.decode_with(ctx)?)),
            Type::Array | Type::ArrayIndef => Ok(Self::Array(d.decode_with(ctx)?)),

            any => Err(minicbor::decode::Error::message(format!(
                "bad cbor data type ({any:?}) for plutus data"
            ))),
        }
    }
}

impl<C> minicbor::encode::Encode<C> for PlutusData {
    fn encode<W: minicbor::encode::Write>(
        &self,
        e: &mut minicbor::Encoder<W>,
        ctx: &mut C,
    ) -> Result<(), minicbor::encode::Error<W::Error>> {
        match self {
            Self::Constr(a) => {
                e.encode_with(a, ctx)?;
            }
            Self::Map(a) => {
                // definite-length map, matching the canonical plutus
                // implementation
                e.map(a.len() as u64)?;
                for (k, v) in a.iter() {
                    k.encode(e, ctx)?;
                    v.encode(e, ctx)?;
                }
            }
            Self::BigInt(a) => {
                e.encode_with(a, ctx)?;
            }
            Self::BoundedBytes(a) => {
                e.encode_with(a, ctx)?;
            }
            Self::Array(a) => {
                e.encode_with(a, ctx)?;
            }
        };

        Ok(())
    }
}

/*
big_int = int / big_uint / big_nint
big_uint = #6.2(bounded_bytes)
big_nint = #6.3(bounded_bytes)
*/

#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Clone)]
pub enum BigInt {
    Int(Int),
    BigUInt(BoundedBytes),
    BigNInt(BoundedBytes),
}

impl From<&BigInt> for i128 {
    fn from(value: &BigInt) -> Self {
        match value {
            BigInt::Int(x) => i128::from(*x),
            BigInt::BigUInt(bytes) => {
                bytes.iter().fold(0i128, |acc, b| (acc << 8) | *b as i128)
            }
            BigInt::BigNInt(bytes) => {
                let n = bytes.iter().fold(0i128, |acc, b| (acc << 8) | *b as i128);
                -n - 1
            }
        }
    }
}

impl<'b, C> minicbor::decode::Decode<'b, C> for BigInt {
    fn decode(d: &mut minicbor::Decoder<'b>, ctx: &mut C) -> Result<Self, minicbor::decode::Error> {
        match d.datatype()? {
            Type::U8
            | Type::U16
            | Type::U32
            | Type::U64
            | Type::I8
            | Type::I16
            | Type::I32
            | Type::I64
            | Type::Int => Ok(Self::Int(d.decode_with(ctx)?)),
            Type::Tag => match d.tag()? {
                Tag::PosBignum => Ok(Self::BigUInt(d.decode_with(ctx)?)),
                Tag::NegBignum => Ok(Self::BigNInt(d.decode_with(ctx)?)),
                _ => Err(minicbor::decode::Error::message(
                    "invalid cbor tag for big int",
                )),
            },
            _ => Err(minicbor::decode::Error::message(
                "invalid cbor data type for big int",
            )),
        }
    }
}

impl<C> minicbor::encode::Encode<C> for BigInt {
    fn encode<W: minicbor::encode::Write>(
        &self,
        e: &mut minicbor::Encoder<W>,
        ctx: &mut C,
    ) -> Result<(), minicbor::encode::Error<W::Error>> {
        match self {
            BigInt::Int(x) => {
                e.encode_with(x, ctx)?;
            }
            BigInt::BigUInt(x) => {
                e.tag(Tag::PosBignum)?;
                e.encode_with(x, ctx)?;
            }
            BigInt::BigNInt(x) => {
                e.tag(Tag::NegBignum)?;
                e.encode_with(x, ctx)?;
            }
        };

        Ok(())
    }
}

/// A constructor application: logical id plus field list
///
/// Ids 0..6 ride on tags 121..127, ids 7..127 on tags 1280..1400, anything
/// larger falls back to tag 102 carrying `[id, fields]`.
#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Clone)]
pub struct Constr<A> {
    pub tag: u64,
    pub any_constructor: Option<u64>,
    pub fields: IndefList<A>,
}

impl<A> Constr<A> {
    /// Build a constructor from its logical id
    pub fn new(constructor: u64, fields: Vec<A>) -> Self {
        match constructor {
            0..=6 => Constr {
                tag: 121 + constructor,
                any_constructor: None,
                fields: fields.into(),
            },
            7..=127 => Constr {
                tag: 1280 + (constructor - 7),
                any_constructor: None,
                fields: fields.into(),
            },
            _ => Constr {
                tag: 102,
                any_constructor: Some(constructor),
                fields: fields.into(),
            },
        }
    }

    /// The logical constructor id this object carries
    pub fn constructor(&self) -> u64 {
        match self.tag {
            121..=127 => self.tag - 121,
            1280..=1400 => self.tag - 1280 + 7,
            _ => self.any_constructor.unwrap_or_default(),
        }
    }
}

impl<'b, C, A> minicbor::decode::Decode<'b, C> for Constr<A>
where
    A: minicbor::decode::Decode<'b, C>,
{
    fn decode(d: &mut minicbor::Decoder<'b>, ctx: &mut C) -> Result<Self, minicbor::decode::Error> {
        let tag = d.tag()?;

        match tag {
            Tag::Unassigned(x @ (121..=127 | 1280..=1400)) => Ok(Constr {
                tag: x,
                fields: d.decode_with(ctx)?,
                any_constructor: None,
            }),
            Tag::Unassigned(102) => {
                d.array()?;

                Ok(Constr {
                    tag: 102,
                    any_constructor: Some(d.decode_with(ctx)?),
                    fields: d.decode_with(ctx)?,
                })
            }
            _ => Err(minicbor::decode::Error::message(
                "bad tag code for plutus data constructor",
            )),
        }
    }
}

impl<C, A> minicbor::encode::Encode<C> for Constr<A>
where
    A: minicbor::encode::Encode<C>,
{
    fn encode<W: minicbor::encode::Write>(
        &self,
        e: &mut minicbor::Encoder<W>,
        ctx: &mut C,
    ) -> Result<(), minicbor::encode::Error<W::Error>> {
        e.tag(Tag::Unassigned(self.tag))?;

        match self.tag {
            102 => {
                e.array(2)?;
                e.encode_with(self.any_constructor.unwrap_or_default(), ctx)?;
                e.encode_with(&self.fields, ctx)?;
            }
            _ => {
                e.encode_with(&self.fields, ctx)?;
            }
        }

        Ok(())
    }
}

/// Byte string encoded the way the canonical plutus implementation does:
/// definite form up to 64 bytes, indefinite 64-byte chunks beyond
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub struct BoundedBytes(Vec<u8>);

impl From<Vec<u8>> for BoundedBytes {
    fn from(xs: Vec<u8>) -> Self {
        BoundedBytes(xs)
    }
}

impl From<BoundedBytes> for Vec<u8> {
    fn from(b: BoundedBytes) -> Self {
        b.0
    }
}

impl Deref for BoundedBytes {
    type Target = Vec<u8>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl fmt::Display for BoundedBytes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(&self.0))
    }
}

impl<'b, C> minicbor::decode::Decode<'b, C> for BoundedBytes {
    fn decode(d: &mut minicbor::Decoder<'b>, _: &mut C) -> Result<Self, minicbor::decode::Error> {
        let mut res = Vec::new();

        for chunk in d.bytes_iter()? {
            res.extend_from_slice(chunk?);
        }

        Ok(BoundedBytes::from(res))
    }
}

impl<C> Encode<C> for BoundedBytes {
    fn encode<W: minicbor::encode::Write>(
        &self,
        e: &mut minicbor::Encoder<W>,
        _: &mut C,
    ) -> Result<(), minicbor::encode::Error<W::Error>> {
        const CHUNK_SIZE: usize = 64;
        let bs: &Vec<u8> = self.deref();

        if bs.len() <= CHUNK_SIZE {
            e.bytes(bs)?;
        } else {
            e.begin_bytes()?;
            for b in bs.chunks(CHUNK_SIZE) {
                e.bytes(b)?;
            }
            e.end()?;
        }

        Ok(())
    }
}

/// Deterministic constructor id for a user-defined datum type
///
/// The id is the big-endian u32 made of the first four bytes of
/// Blake2b-256 over `"<type_path>(<field_signature>)"`, where the field
/// signature is the comma-joined list of field type names. It depends only
/// on the type's path and shape, never on compilation order, which makes it
/// a wire-compatibility contract: renaming or moving the type changes the
/// id. Types that must match an on-chain validator should pin an explicit
/// id instead.
pub fn constr_id(type_path: &str, field_signature: &str) -> u64 {
    let preimage = format!("{type_path}({field_signature})");
    let digest = Hasher::<256>::hash(preimage.as_bytes());

    u32::from_be_bytes([digest[0], digest[1], digest[2], digest[3]]) as u64
}

/// Conversion of a typed value into untyped Plutus data
pub trait ToPlutusData {
    fn to_plutus_data(&self) -> PlutusData;
}

impl ToPlutusData for PlutusData {
    fn to_plutus_data(&self) -> PlutusData {
        self.clone()
    }
}

impl ToPlutusData for u64 {
    fn to_plutus_data(&self) -> PlutusData {
        PlutusData::BigInt(BigInt::Int((*self).into()))
    }
}

impl ToPlutusData for i64 {
    fn to_plutus_data(&self) -> PlutusData {
        PlutusData::integer(*self)
    }
}

impl ToPlutusData for Vec<u8> {
    fn to_plutus_data(&self) -> PlutusData {
        PlutusData::bytes(self.clone())
    }
}

impl<T: ToPlutusData> ToPlutusData for Vec<T> {
    fn to_plutus_data(&self) -> PlutusData {
        PlutusData::list(self.iter().map(|x| x.to_plutus_data()).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lovelace_codec::minicbor;

    fn to_hex<T: minicbor::Encode<()>>(value: &T) -> String {
        hex::encode(minicbor::to_vec(value).unwrap())
    }

    #[test]
    fn unit_datum_vector() {
        let unit = PlutusData::unit();

        assert_eq!(to_hex(&unit), "d87980");
        assert_eq!(
            unit.hash().to_string(),
            "923918e403bf43c34b4ef6b48eb2ee04babed17320d8d1b9ff9ad086e86f44ec"
        );
    }

    #[test]
    fn large_constructor_id_vector() {
        // constructor 130 with fields [123, b"1234"], exercising tag 102
        let datum = PlutusData::Constr(Constr::new(
            130,
            vec![
                PlutusData::integer(123),
                PlutusData::bytes(b"1234".to_vec()),
            ],
        ));

        assert_eq!(to_hex(&datum), "d8668218829f187b4431323334ff");

        let bytes = minicbor::to_vec(&datum).unwrap();
        let back: PlutusData = minicbor::decode(&bytes).unwrap();
        assert_eq!(back, datum);

        match &back {
            PlutusData::Constr(c) => assert_eq!(c.constructor(), 130),
            _ => panic!("expected constr"),
        }
    }

    #[test]
    fn mid_range_constructor_uses_1280_tags() {
        let constr: Constr<PlutusData> = Constr::new(7, vec![]);
        assert_eq!(constr.tag, 1280);
        assert_eq!(constr.constructor(), 7);

        let constr: Constr<PlutusData> = Constr::new(127, vec![]);
        assert_eq!(constr.tag, 1400);
        assert_eq!(constr.constructor(), 127);
    }

    #[test]
    fn long_bytes_chunked() {
        let datum = PlutusData::bytes(vec![0xab; 65]);
        let bytes = minicbor::to_vec(&datum).unwrap();

        // indefinite byte string marker
        assert_eq!(bytes[0], 0x5f);

        let back: PlutusData = minicbor::decode(&bytes).unwrap();
        assert_eq!(back, datum);
    }

    #[test]
    fn json_roundtrip() {
        let datum = PlutusData::Constr(Constr::new(
            1,
            vec![
                PlutusData::integer(42),
                PlutusData::bytes(vec![0xca, 0xfe]),
                PlutusData::list(vec![PlutusData::integer(1)]),
                PlutusData::Map(vec![(PlutusData::integer(1), PlutusData::integer(2))].into()),
            ],
        ));

        let json = datum.to_json_string().unwrap();
        let back = PlutusData::from_json_string(&json).unwrap();

        assert_eq!(back, datum);
    }

    #[test]
    fn constr_id_depends_only_on_signature() {
        let a = constr_id("myapp::Vesting", "int,bytes");
        let b = constr_id("myapp::Vesting", "int,bytes");
        let c = constr_id("myapp::Vesting", "int,int");
        let d = constr_id("myapp::Other", "int,bytes");

        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_ne!(a, d);
        assert!(a <= u32::MAX as u64);
    }
}
