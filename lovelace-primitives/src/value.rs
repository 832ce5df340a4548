use std::collections::BTreeMap;
use std::fmt;
use std::ops::{Add, AddAssign};

use lovelace_codec::minicbor::{self, data::Type};
use thiserror::Error;

use crate::{Coin, PolicyId};

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ValueError {
    #[error("asset name longer than 32 bytes")]
    AssetNameTooLong,

    #[error("subtraction would produce a negative component")]
    NegativeComponent,
}

/// Name of a native asset: 0 to 32 raw bytes
///
/// The ledger sorts multiasset maps by byte length first and contents
/// second, so `Ord` is implemented that way; keeping asset names in a
/// `BTreeMap` then yields the canonical wire order for free.
#[derive(Debug, Clone, PartialEq, Eq, std::hash::Hash, Default)]
pub struct AssetName(Vec<u8>);

impl AssetName {
    pub const MAX_SIZE: usize = 32;

    pub fn new(bytes: Vec<u8>) -> Result<Self, ValueError> {
        if bytes.len() > Self::MAX_SIZE {
            return Err(ValueError::AssetNameTooLong);
        }

        Ok(Self(bytes))
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.0
    }

    pub fn to_vec(&self) -> Vec<u8> {
        self.0.clone()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl TryFrom<Vec<u8>> for AssetName {
    type Error = ValueError;

    fn try_from(value: Vec<u8>) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl TryFrom<&[u8]> for AssetName {
    type Error = ValueError;

    fn try_from(value: &[u8]) -> Result<Self, Self::Error> {
        Self::new(value.to_vec())
    }
}

impl AsRef<[u8]> for AssetName {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Display for AssetName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(&self.0))
    }
}

impl PartialOrd for AssetName {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for AssetName {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        (self.0.len(), &self.0).cmp(&(other.0.len(), &other.0))
    }
}

impl<'b, C> minicbor::decode::Decode<'b, C> for AssetName {
    fn decode(
        d: &mut minicbor::Decoder<'b>,
        _ctx: &mut C,
    ) -> Result<Self, minicbor::decode::Error> {
        let bytes = d.bytes()?;

        AssetName::new(bytes.to_vec())
            .map_err(|_| minicbor::decode::Error::message("asset name longer than 32 bytes"))
    }
}

impl<C> minicbor::encode::Encode<C> for AssetName {
    fn encode<W: minicbor::encode::Write>(
        &self,
        e: &mut minicbor::Encoder<W>,
        _ctx: &mut C,
    ) -> Result<(), minicbor::encode::Error<W::Error>> {
        e.bytes(&self.0)?;

        Ok(())
    }
}

/// Assets grouped by minting policy
///
/// `BTreeMap` keeps policies (fixed-size hashes) and asset names in the
/// ledger's canonical order, so encoding simply walks the map.
pub type Multiasset<A> = BTreeMap<PolicyId, BTreeMap<AssetName, A>>;

/// Minted (positive) and burned (negative) quantities
pub type Mint = Multiasset<i64>;

/// A bundle of lovelace plus native assets
///
/// The wire shape is a bare uint when no assets are present, or
/// `[coin, multiasset]` otherwise. Arithmetic keeps values normalized:
/// zero quantities and empty policies are dropped, and a value with no
/// assets left collapses back to the bare-coin form.
#[derive(Debug, PartialEq, Eq, Clone)]
pub enum Value {
    Coin(Coin),
    Multiasset(Coin, Multiasset<u64>),
}

impl Value {
    pub fn new(coin: Coin, multiasset: Multiasset<u64>) -> Self {
        Value::Multiasset(coin, multiasset).normalize()
    }

    pub fn zero() -> Self {
        Value::Coin(0)
    }

    pub fn coin(&self) -> Coin {
        match self {
            Value::Coin(x) => *x,
            Value::Multiasset(x, _) => *x,
        }
    }

    pub fn set_coin(&mut self, coin: Coin) {
        match self {
            Value::Coin(x) => *x = coin,
            Value::Multiasset(x, _) => *x = coin,
        }
    }

    pub fn assets(&self) -> Option<&Multiasset<u64>> {
        match self {
            Value::Coin(_) => None,
            Value::Multiasset(_, ma) => Some(ma),
        }
    }

    pub fn has_assets(&self) -> bool {
        self.assets().map(|ma| !ma.is_empty()).unwrap_or(false)
    }

    /// Quantity of a specific asset in this value
    pub fn asset(&self, policy: &PolicyId, name: &AssetName) -> u64 {
        self.assets()
            .and_then(|ma| ma.get(policy))
            .and_then(|assets| assets.get(name))
            .copied()
            .unwrap_or(0)
    }

    fn into_parts(self) -> (Coin, Multiasset<u64>) {
        match self {
            Value::Coin(c) => (c, Multiasset::new()),
            Value::Multiasset(c, ma) => (c, ma),
        }
    }

    fn normalize(self) -> Self {
        let (coin, mut ma) = self.into_parts();

        ma.retain(|_, assets| {
            assets.retain(|_, quantity| *quantity != 0);
            !assets.is_empty()
        });

        if ma.is_empty() {
            Value::Coin(coin)
        } else {
            Value::Multiasset(coin, ma)
        }
    }

    /// Pointwise subtraction; fails if any component would go negative
    pub fn checked_sub(&self, other: &Value) -> Result<Value, ValueError> {
        let coin = self
            .coin()
            .checked_sub(other.coin())
            .ok_or(ValueError::NegativeComponent)?;

        let mut ma = match self {
            Value::Coin(_) => Multiasset::new(),
            Value::Multiasset(_, ma) => ma.clone(),
        };

        if let Some(other_ma) = other.assets() {
            for (policy, assets) in other_ma {
                for (name, quantity) in assets {
                    let entry = ma
                        .entry(*policy)
                        .or_default()
                        .entry(name.clone())
                        .or_insert(0);

                    *entry = entry
                        .checked_sub(*quantity)
                        .ok_or(ValueError::NegativeComponent)?;
                }
            }
        }

        Ok(Value::Multiasset(coin, ma).normalize())
    }

    /// True when every component of `self` is less than or equal to the
    /// matching component of `other`
    pub fn leq(&self, other: &Value) -> bool {
        if self.coin() > other.coin() {
            return false;
        }

        if let Some(ma) = self.assets() {
            for (policy, assets) in ma {
                for (name, quantity) in assets {
                    if *quantity > other.asset(policy, name) {
                        return false;
                    }
                }
            }
        }

        true
    }

    /// Drop every asset that is not present in `requested`, keeping coin
    ///
    /// Selectors use this to compare selected inputs against a request
    /// without being distracted by assets that will flow back as change.
    pub fn trim_to(&self, requested: &Value) -> Value {
        let mut trimmed = Multiasset::new();

        if let (Some(ma), Some(wanted)) = (self.assets(), requested.assets()) {
            for (policy, assets) in ma {
                if let Some(wanted_assets) = wanted.get(policy) {
                    for (name, quantity) in assets {
                        if wanted_assets.contains_key(name) {
                            trimmed
                                .entry(*policy)
                                .or_insert_with(BTreeMap::new)
                                .insert(name.clone(), *quantity);
                        }
                    }
                }
            }
        }

        Value::Multiasset(self.coin(), trimmed).normalize()
    }
}

impl Default for Value {
    fn default() -> Self {
        Value::zero()
    }
}

impl From<Coin> for Value {
    fn from(coin: Coin) -> Self {
        Value::Coin(coin)
    }
}

impl Add for Value {
    type Output = Value;

    fn add(self, other: Value) -> Value {
        let (coin_a, mut ma) = self.into_parts();
        let (coin_b, ma_b) = other.into_parts();

        for (policy, assets) in ma_b {
            for (name, quantity) in assets {
                *ma.entry(policy).or_default().entry(name).or_insert(0) += quantity;
            }
        }

        Value::Multiasset(coin_a + coin_b, ma).normalize()
    }
}

impl AddAssign for Value {
    fn add_assign(&mut self, other: Value) {
        let current = std::mem::take(self);
        *self = current + other;
    }
}

impl<'b, C> minicbor::decode::Decode<'b, C> for Value {
    fn decode(d: &mut minicbor::Decoder<'b>, ctx: &mut C) -> Result<Self, minicbor::decode::Error> {
        match d.datatype()? {
            Type::U8 | Type::U16 | Type::U32 | Type::U64 => Ok(Value::Coin(d.decode_with(ctx)?)),
            Type::Array => {
                d.array()?;
                let coin = d.decode_with(ctx)?;
                let multiasset = d.decode_with(ctx)?;
                Ok(Value::Multiasset(coin, multiasset))
            }
            _ => Err(minicbor::decode::Error::message(
                "unknown cbor data type for Value",
            )),
        }
    }
}

impl<C> minicbor::encode::Encode<C> for Value {
    fn encode<W: minicbor::encode::Write>(
        &self,
        e: &mut minicbor::Encoder<W>,
        ctx: &mut C,
    ) -> Result<(), minicbor::encode::Error<W::Error>> {
        match self {
            Value::Coin(coin) => {
                e.encode_with(coin, ctx)?;
            }
            Value::Multiasset(coin, other) if other.is_empty() => {
                e.encode_with(coin, ctx)?;
            }
            Value::Multiasset(coin, other) => {
                e.array(2)?;
                e.encode_with(coin, ctx)?;
                e.encode_with(other, ctx)?;
            }
        };

        Ok(())
    }
}

/// Merge a minted quantity into a mint bundle, dropping zeroed entries
pub fn mint_add(mint: &mut Mint, policy: PolicyId, name: AssetName, quantity: i64) {
    let assets = mint.entry(policy).or_default();
    let entry = assets.entry(name.clone()).or_insert(0);
    *entry += quantity;

    if *entry == 0 {
        assets.remove(&name);
    }

    if assets.is_empty() {
        mint.remove(&policy);
    }
}

/// Positive quantities of a mint bundle (the tokens actually produced)
pub fn mint_positive(mint: &Mint) -> Multiasset<u64> {
    mint_filtered(mint, |quantity| quantity > 0, |quantity| quantity as u64)
}

/// Negative quantities of a mint bundle, as positive amounts to be burned
pub fn mint_negative(mint: &Mint) -> Multiasset<u64> {
    mint_filtered(mint, |quantity| quantity < 0, |quantity| (-quantity) as u64)
}

fn mint_filtered(
    mint: &Mint,
    keep: impl Fn(i64) -> bool,
    convert: impl Fn(i64) -> u64,
) -> Multiasset<u64> {
    let mut out = Multiasset::new();

    for (policy, assets) in mint {
        for (name, quantity) in assets {
            if keep(*quantity) {
                out.entry(*policy)
                    .or_insert_with(BTreeMap::new)
                    .insert(name.clone(), convert(*quantity));
            }
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Hash;
    use lovelace_codec::minicbor;
    use proptest::prelude::*;

    fn policy(fill: u8) -> PolicyId {
        Hash::new([fill; 28])
    }

    fn name(bytes: &[u8]) -> AssetName {
        AssetName::new(bytes.to_vec()).unwrap()
    }

    fn token_value(coin: u64, fill: u8, asset: &[u8], quantity: u64) -> Value {
        let mut ma = Multiasset::new();
        ma.entry(policy(fill)).or_default().insert(name(asset), quantity);
        Value::new(coin, ma)
    }

    #[test]
    fn empty_value_encodes_as_bare_coin() {
        let value = Value::Multiasset(42, Multiasset::new());
        let bytes = minicbor::to_vec(&value).unwrap();

        assert_eq!(bytes, vec![0x18, 0x2a]);
    }

    #[test]
    fn asset_names_sort_by_length_first() {
        let mut assets: BTreeMap<AssetName, u64> = BTreeMap::new();
        assets.insert(name(b"zz"), 1);
        assets.insert(name(b"aaa"), 2);
        assets.insert(name(b"b"), 3);

        let order: Vec<_> = assets.keys().map(|n| n.as_slice().to_vec()).collect();
        assert_eq!(order, vec![b"b".to_vec(), b"zz".to_vec(), b"aaa".to_vec()]);
    }

    #[test]
    fn asset_name_rejects_oversize() {
        assert!(AssetName::new(vec![0; 33]).is_err());
        assert!(AssetName::new(vec![0; 32]).is_ok());
    }

    #[test]
    fn subtraction_requires_coverage() {
        let a = token_value(10, 1, b"tok", 5);
        let b = token_value(4, 1, b"tok", 7);

        assert_eq!(a.checked_sub(&b), Err(ValueError::NegativeComponent));

        let c = token_value(4, 1, b"tok", 5);
        let diff = a.checked_sub(&c).unwrap();
        assert_eq!(diff, Value::Coin(6));
    }

    #[test]
    fn subtraction_of_unknown_asset_fails() {
        let a = Value::Coin(10);
        let b = token_value(1, 1, b"tok", 1);

        assert_eq!(a.checked_sub(&b), Err(ValueError::NegativeComponent));
    }

    #[test]
    fn leq_is_pointwise() {
        let small = token_value(5, 1, b"tok", 1);
        let big = token_value(10, 1, b"tok", 2);

        assert!(small.leq(&big));
        assert!(!big.leq(&small));

        // missing asset means not covered
        assert!(!small.leq(&Value::Coin(100)));
        assert!(Value::Coin(5).leq(&small));
    }

    #[test]
    fn mint_bookkeeping() {
        let mut mint = Mint::new();
        mint_add(&mut mint, policy(1), name(b"a"), 5);
        mint_add(&mut mint, policy(1), name(b"b"), -3);

        assert_eq!(mint_positive(&mint).get(&policy(1)).unwrap()[&name(b"a")], 5);
        assert_eq!(mint_negative(&mint).get(&policy(1)).unwrap()[&name(b"b")], 3);

        mint_add(&mut mint, policy(1), name(b"a"), -5);
        assert!(mint_positive(&mint).is_empty());
    }

    proptest! {
        #[test]
        fn add_then_sub_is_identity(
            coin_a in 0u64..1_000_000,
            coin_b in 0u64..1_000_000,
            qty_a in 0u64..1_000,
            qty_b in 0u64..1_000,
        ) {
            let a = token_value(coin_a, 7, b"tok", qty_a);
            let b = token_value(coin_b, 7, b"tok", qty_b);

            let sum = a.clone() + b.clone();
            prop_assert_eq!(sum.checked_sub(&b).unwrap(), a);
        }

        #[test]
        fn value_roundtrip(coin in any::<u64>(), qty in 1u64..u64::MAX) {
            let value = token_value(coin, 3, b"asset", qty);
            let bytes = minicbor::to_vec(&value).unwrap();
            let back: Value = minicbor::decode(&bytes).unwrap();
            prop_assert_eq!(back, value);
        }
    }
}
