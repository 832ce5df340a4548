use lovelace_codec::minicbor::{self, data::{Tag, Type}, Decode, Encode};
use lovelace_codec::utils::{Bytes, Int, KeyValuePairs};
use lovelace_crypto::hash::Hasher;

use crate::{AuxiliaryDataHash, NativeScript, PlutusScript};

pub type MetadatumLabel = u64;

#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Clone)]
pub enum Metadatum {
    Int(Int),
    Bytes(Bytes),
    Text(String),
    Array(Vec<Metadatum>),
    Map(KeyValuePairs<Metadatum, Metadatum>),
}

impl<'b, C> minicbor::Decode<'b, C> for Metadatum {
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
            | Type::Int => Ok(Metadatum::Int(d.decode_with(ctx)?)),
            Type::Bytes => Ok(Metadatum::Bytes(d.decode_with(ctx)?)),
            Type::String | Type::StringIndef => Ok(Metadatum::Text(d.decode_with(ctx)?)),
            Type::Array | Type::ArrayIndef => Ok(Metadatum::Array(d.decode_with(ctx)?)),
            Type::Map | Type::MapIndef => Ok(Metadatum::Map(d.decode_with(ctx)?)),
            _ => Err(minicbor::decode::Error::message(
                "unknown data type for metadatum",
            )),
        }
    }
}

impl<C> minicbor::Encode<C> for Metadatum {
    fn encode<W: minicbor::encode::Write>(
        &self,
        e: &mut minicbor::Encoder<W>,
        ctx: &mut C,
    ) -> Result<(), minicbor::encode::Error<W::Error>> {
        match self {
            Metadatum::Int(a) => {
                e.encode_with(a, ctx)?;
            }
            Metadatum::Bytes(a) => {
                e.encode_with(a, ctx)?;
            }
            Metadatum::Text(a) => {
                e.encode_with(a, ctx)?;
            }
            Metadatum::Array(a) => {
                e.encode_with(a, ctx)?;
            }
            Metadatum::Map(a) => {
                e.encode_with(a, ctx)?;
            }
        };

        Ok(())
    }
}

pub type Metadata = KeyValuePairs<MetadatumLabel, Metadatum>;

/// Auxiliary scripts and metadata attached next to a transaction
///
/// Three generations of wire shape exist; the post-Alonzo one is a map
/// under CBOR tag 259. All are hashed with Blake2b-256 to produce the
/// body's `auxiliary_data_hash`.
#[derive(Debug, PartialEq, Eq, Clone)]
pub enum AuxiliaryData {
    Shelley(Metadata),
    ShelleyMa {
        transaction_metadata: Metadata,
        auxiliary_scripts: Option<Vec<NativeScript>>,
    },
    PostAlonzo(PostAlonzoAuxiliaryData),
}

impl AuxiliaryData {
    pub fn hash(&self) -> AuxiliaryDataHash {
        Hasher::<256>::hash_cbor(self)
    }
}

#[derive(Encode, Decode, Debug, PartialEq, Eq, Clone, Default)]
#[cbor(map)]
pub struct PostAlonzoAuxiliaryData {
    #[n(0)]
    pub metadata: Option<Metadata>,

    #[n(1)]
    pub native_scripts: Option<Vec<NativeScript>>,

    #[n(2)]
    pub plutus_v1_scripts: Option<Vec<PlutusScript<1>>>,

    #[n(3)]
    pub plutus_v2_scripts: Option<Vec<PlutusScript<2>>>,

    #[n(4)]
    pub plutus_v3_scripts: Option<Vec<PlutusScript<3>>>,
}

impl<'b, C> minicbor::Decode<'b, C> for AuxiliaryData {
    fn decode(d: &mut minicbor::Decoder<'b>, ctx: &mut C) -> Result<Self, minicbor::decode::Error> {
        match d.datatype()? {
            Type::Map | Type::MapIndef => Ok(AuxiliaryData::Shelley(d.decode_with(ctx)?)),
            Type::Array => {
                d.array()?;
                Ok(AuxiliaryData::ShelleyMa {
                    transaction_metadata: d.decode_with(ctx)?,
                    auxiliary_scripts: d.decode_with(ctx)?,
                })
            }
            Type::Tag => {
                let tag = d.tag()?;

                if tag != Tag::Unassigned(259) {
                    return Err(minicbor::decode::Error::message(
                        "invalid tag for auxiliary data",
                    ));
                }

                Ok(AuxiliaryData::PostAlonzo(d.decode_with(ctx)?))
            }
            _ => Err(minicbor::decode::Error::message(
                "unknown data type for auxiliary data",
            )),
        }
    }
}

impl<C> minicbor::Encode<C> for AuxiliaryData {
    fn encode<W: minicbor::encode::Write>(
        &self,
        e: &mut minicbor::Encoder<W>,
        ctx: &mut C,
    ) -> Result<(), minicbor::encode::Error<W::Error>> {
        match self {
            AuxiliaryData::Shelley(m) => {
                e.encode_with(m, ctx)?;
            }
            AuxiliaryData::ShelleyMa {
                transaction_metadata,
                auxiliary_scripts,
            } => {
                e.array(2)?;
                e.encode_with(transaction_metadata, ctx)?;
                e.encode_with(auxiliary_scripts, ctx)?;
            }
            AuxiliaryData::PostAlonzo(v) => {
                e.tag(Tag::Unassigned(259))?;
                e.encode_with(v, ctx)?;
            }
        };

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_metadata() -> Metadata {
        vec![(
            674u64,
            Metadatum::Map(
                vec![(
                    Metadatum::Text("msg".into()),
                    Metadatum::Array(vec![Metadatum::Text("hello".into())]),
                )]
                .into(),
            ),
        )]
        .into()
    }

    #[test]
    fn shelley_roundtrip() {
        let aux = AuxiliaryData::Shelley(sample_metadata());
        let bytes = minicbor::to_vec(&aux).unwrap();
        let back: AuxiliaryData = minicbor::decode(&bytes).unwrap();

        assert_eq!(back, aux);
    }

    #[test]
    fn post_alonzo_is_tagged() {
        let aux = AuxiliaryData::PostAlonzo(PostAlonzoAuxiliaryData {
            metadata: Some(sample_metadata()),
            ..Default::default()
        });

        let bytes = minicbor::to_vec(&aux).unwrap();
        // tag 259 = 0xd9 0x01 0x03
        assert_eq!(&bytes[0..3], &[0xd9, 0x01, 0x03]);

        let back: AuxiliaryData = minicbor::decode(&bytes).unwrap();
        assert_eq!(back, aux);
    }

    #[test]
    fn hash_differs_between_shapes() {
        let shelley = AuxiliaryData::Shelley(sample_metadata());
        let alonzo = AuxiliaryData::PostAlonzo(PostAlonzoAuxiliaryData {
            metadata: Some(sample_metadata()),
            ..Default::default()
        });

        assert_ne!(shelley.hash(), alonzo.hash());
    }
}
