use std::collections::BTreeMap;

use lovelace_codec::minicbor::{self, Encode};
use lovelace_crypto::hash::{Hash, Hasher};

use crate::{CostModel, PlutusData, Redeemers};

pub type PlutusVersion = u8;

/// Cost models of the languages used by a transaction, keyed by version
/// (0 for PlutusV1, 1 for V2, 2 for V3)
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LanguageViews(pub BTreeMap<PlutusVersion, CostModel>);

impl LanguageViews {
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<(PlutusVersion, CostModel)> for LanguageViews {
    fn from_iter<I: IntoIterator<Item = (PlutusVersion, CostModel)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl<C> Encode<C> for LanguageViews {
    fn encode<W: minicbor::encode::Write>(
        &self,
        e: &mut minicbor::Encoder<W>,
        ctx: &mut C,
    ) -> Result<(), minicbor::encode::Error<W::Error>> {
        // Ledger quirk, kept on purpose: the PlutusV1 entry is encoded with
        // a bytestring key (the CBOR of 0) whose value is the cost model
        // re-serialized as an indefinite list inside a bytestring. Because
        // that key serializes as 0x4100, it sorts after the plain uint keys
        // of the other languages.
        let mut canonical_order: Vec<u8> = self.0.keys().copied().filter(|&k| k != 0).collect();
        canonical_order.sort();
        if self.0.contains_key(&0) {
            canonical_order.push(0);
        }

        e.map(self.0.len() as u64)?;
        for lang in canonical_order {
            let cost_model = &self.0[&lang];
            match lang {
                0 => {
                    let mut inner = vec![];
                    let mut sub = minicbor::Encoder::new(&mut inner);
                    sub.begin_array().expect("infallible");
                    for v in cost_model.iter() {
                        sub.encode_with(v, ctx).expect("infallible");
                    }
                    sub.end().expect("infallible");

                    e.bytes(&minicbor::to_vec(0).expect("infallible"))?;
                    e.bytes(&inner)?;
                }
                _ => {
                    e.encode(lang)?;
                    e.encode(cost_model)?;
                }
            }
        }

        Ok(())
    }
}

/// The preimage of a transaction body's `script_data_hash`
#[derive(Debug, Clone)]
pub struct ScriptData {
    pub redeemers: Option<Redeemers>,
    pub datums: Option<Vec<PlutusData>>,
    pub language_views: Option<LanguageViews>,
}

impl ScriptData {
    /// Blake2b-256 over `cbor(redeemers) || cbor(datums) || cbor(views)`,
    /// with empty-map placeholders for absent redeemers and views
    pub fn hash(&self) -> Hash<32> {
        let mut buf = vec![];

        if let Some(redeemers) = &self.redeemers {
            minicbor::encode(redeemers, &mut buf).expect("infallible");
        } else {
            buf.push(0xa0);
        }

        if let Some(datums) = &self.datums {
            if !datums.is_empty() {
                minicbor::encode(datums, &mut buf).expect("infallible");
            }
        }

        if let Some(language_views) = &self.language_views {
            minicbor::encode(language_views, &mut buf).expect("infallible");
        } else {
            buf.push(0xa0);
        }

        Hasher::<256>::hash(&buf)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn v1_entry_uses_bytestring_key_and_goes_last() {
        let views: LanguageViews = [(0u8, vec![1i64, 2, 3]), (1u8, vec![4i64, 5])]
            .into_iter()
            .collect();

        let bytes = minicbor::to_vec(&views).unwrap();

        // map(2), then the v2 entry under plain key 1, then the v1 entry
        // under bytestring key 0x4100
        assert_eq!(bytes[0], 0xa2);
        assert_eq!(bytes[1], 0x01);

        let v1_key_pos = bytes
            .windows(2)
            .position(|w| w == [0x41, 0x00])
            .expect("v1 bytestring key present");
        assert!(v1_key_pos > 1);

        // the v1 cost model is wrapped in a bytestring holding an
        // indefinite list
        let after_key = &bytes[v1_key_pos + 2..];
        assert_eq!(after_key[0] & 0xe0, 0x40);
        assert_eq!(after_key[1], 0x9f);
        assert_eq!(*after_key.last().unwrap(), 0xff);
    }

    #[test]
    fn absent_parts_hash_as_empty_maps() {
        let empty = ScriptData {
            redeemers: None,
            datums: None,
            language_views: None,
        };

        // hash of two empty maps back to back
        let expected = Hasher::<256>::hash(&[0xa0, 0xa0]);
        assert_eq!(empty.hash(), expected);
    }

    #[test]
    fn datums_contribute_to_hash() {
        let without = ScriptData {
            redeemers: None,
            datums: None,
            language_views: None,
        };

        let with = ScriptData {
            redeemers: None,
            datums: Some(vec![PlutusData::unit()]),
            language_views: None,
        };

        assert_ne!(without.hash(), with.hash());
    }
}
