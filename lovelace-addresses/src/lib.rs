//! Interact with Cardano addresses of any type
//!
//! The entry point is the [Address] enum, holding the decoded content of a
//! Byron, Shelley or Stake address. Shelley addresses render to bech32 and
//! Byron addresses to base58, per [CIP-19](https://cips.cardano.org/cips/cip19/).

pub mod byron;
pub mod varuint;

use std::{fmt, io::Cursor, str::FromStr};

use lovelace_crypto::hash::Hash;
use thiserror::Error;

pub use byron::ByronAddress;

#[derive(Error, Debug)]
pub enum Error {
    #[error("error converting from/to bech32 {0}")]
    BadBech32(bech32::Error),

    #[error("error decoding base58 value")]
    BadBase58(base58::FromBase58Error),

    #[error("error decoding hex value")]
    BadHex,

    #[error("unknown or bad string format for address {0}")]
    UnknownStringFormat(String),

    #[error("address header not found")]
    MissingHeader,

    #[error("address header is invalid {0:08b}")]
    InvalidHeader(u8),

    #[error("invalid operation for Byron address")]
    InvalidForByron,

    #[error("invalid operation for address content")]
    InvalidForContent,

    #[error("invalid CBOR for Byron address {0}")]
    InvalidByronCbor(lovelace_codec::minicbor::decode::Error),

    #[error("Byron address CRC mismatch, stated {0}, computed {1}")]
    InvalidByronCrc(u32, u32),

    #[error("Byron address payload requires CBOR tag 24")]
    InvalidByronTag,

    #[error("unsupported Byron address type tag {0}")]
    InvalidByronAddrType(u64),

    #[error("unknown hrp for network {0:08b}")]
    UnknownNetworkHrp(u8),

    #[error("invalid hash size {0}")]
    InvalidHashSize(usize),

    #[error("variable-length uint error: {0}")]
    VarUint(varuint::Error),
}

pub type PaymentKeyHash = Hash<28>;
pub type StakeKeyHash = Hash<28>;
pub type ScriptHash = Hash<28>;

pub type Slot = u64;
pub type TxIdx = u64;
pub type CertIdx = u64;

/// An on-chain pointer to a stake key registration certificate
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Pointer(Slot, TxIdx, CertIdx);

impl Pointer {
    pub fn new(slot: Slot, tx_idx: TxIdx, cert_idx: CertIdx) -> Self {
        Pointer(slot, tx_idx, cert_idx)
    }

    pub fn parse(bytes: &[u8]) -> Result<Self, Error> {
        let mut cursor = Cursor::new(bytes);
        let a = varuint::read(&mut cursor).map_err(Error::VarUint)?;
        let b = varuint::read(&mut cursor).map_err(Error::VarUint)?;
        let c = varuint::read(&mut cursor).map_err(Error::VarUint)?;

        Ok(Pointer(a, b, c))
    }

    pub fn to_vec(&self) -> Vec<u8> {
        let mut cursor = Cursor::new(vec![]);
        varuint::write(&mut cursor, self.0);
        varuint::write(&mut cursor, self.1);
        varuint::write(&mut cursor, self.2);

        cursor.into_inner()
    }

    pub fn slot(&self) -> u64 {
        self.0
    }

    pub fn tx_idx(&self) -> u64 {
        self.1
    }

    pub fn cert_idx(&self) -> u64 {
        self.2
    }
}

/// The network tag of an address
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Hash)]
pub enum Network {
    Testnet,
    Mainnet,
    Other(u8),
}

impl From<u8> for Network {
    fn from(id: u8) -> Self {
        match id {
            0 => Network::Testnet,
            1 => Network::Mainnet,
            x => Network::Other(x),
        }
    }
}

impl Network {
    pub fn is_mainnet(&self) -> bool {
        matches!(self, Network::Mainnet)
    }

    pub fn value(&self) -> u8 {
        match self {
            Network::Testnet => 0,
            Network::Mainnet => 1,
            Network::Other(x) => *x,
        }
    }
}

/// The payment part of a Shelley address
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Hash)]
pub enum ShelleyPaymentPart {
    Key(PaymentKeyHash),
    Script(ScriptHash),
}

impl ShelleyPaymentPart {
    pub fn key_hash(hash: Hash<28>) -> Self {
        Self::Key(hash)
    }

    pub fn script_hash(hash: Hash<28>) -> Self {
        Self::Script(hash)
    }

    /// Get a reference to the inner hash of this address part
    pub fn as_hash(&self) -> &Hash<28> {
        match self {
            Self::Key(x) => x,
            Self::Script(x) => x,
        }
    }

    pub fn to_vec(&self) -> Vec<u8> {
        self.as_hash().to_vec()
    }

    pub fn is_script(&self) -> bool {
        matches!(self, Self::Script(_))
    }
}

/// The delegation part of a Shelley address
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Hash)]
pub enum ShelleyDelegationPart {
    Key(StakeKeyHash),
    Script(ScriptHash),
    Pointer(Pointer),
    Null,
}

impl ShelleyDelegationPart {
    pub fn key_hash(hash: Hash<28>) -> Self {
        Self::Key(hash)
    }

    pub fn script_hash(hash: Hash<28>) -> Self {
        Self::Script(hash)
    }

    pub fn from_pointer(bytes: &[u8]) -> Result<Self, Error> {
        let pointer = Pointer::parse(bytes)?;
        Ok(Self::Pointer(pointer))
    }

    /// Get a reference to the inner hash of this address part, if any
    pub fn as_hash(&self) -> Option<&Hash<28>> {
        match self {
            Self::Key(x) => Some(x),
            Self::Script(x) => Some(x),
            Self::Pointer(_) => None,
            Self::Null => None,
        }
    }

    pub fn to_vec(&self) -> Vec<u8> {
        match self {
            Self::Key(x) => x.to_vec(),
            Self::Script(x) => x.to_vec(),
            Self::Pointer(x) => x.to_vec(),
            Self::Null => vec![],
        }
    }

    pub fn is_script(&self) -> bool {
        matches!(self, Self::Script(_))
    }
}

/// A decoded Shelley address
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Hash)]
pub struct ShelleyAddress(Network, ShelleyPaymentPart, ShelleyDelegationPart);

/// The payload of a Stake address
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Hash)]
pub enum StakePayload {
    Stake(StakeKeyHash),
    Script(ScriptHash),
}

impl StakePayload {
    fn stake_key(bytes: &[u8]) -> Result<Self, Error> {
        slice_to_hash(bytes).map(StakePayload::Stake)
    }

    fn script(bytes: &[u8]) -> Result<Self, Error> {
        slice_to_hash(bytes).map(StakePayload::Script)
    }

    pub fn is_script(&self) -> bool {
        matches!(self, StakePayload::Script(_))
    }

    /// Get a reference to the inner hash of this payload
    pub fn as_hash(&self) -> &Hash<28> {
        match self {
            StakePayload::Stake(x) => x,
            StakePayload::Script(x) => x,
        }
    }
}

impl AsRef<[u8]> for StakePayload {
    fn as_ref(&self) -> &[u8] {
        match self {
            Self::Stake(x) => x.as_ref(),
            Self::Script(x) => x.as_ref(),
        }
    }
}

/// A decoded Stake address
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Hash)]
pub struct StakeAddress(Network, StakePayload);

/// A decoded Cardano address of any type
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Hash)]
pub enum Address {
    Byron(ByronAddress),
    Shelley(ShelleyAddress),
    Stake(StakeAddress),
}

fn slice_to_hash(slice: &[u8]) -> Result<Hash<28>, Error> {
    Hash::from_slice(slice).ok_or(Error::InvalidHashSize(slice.len()))
}

fn encode_bech32(addr: &[u8], hrp: &str) -> Result<String, Error> {
    let base32 = bech32::ToBase32::to_base32(&addr);
    bech32::encode(hrp, base32, bech32::Variant::Bech32).map_err(Error::BadBech32)
}

fn decode_bech32(bech32: &str) -> Result<(String, Vec<u8>), Error> {
    let (hrp, addr, _) = bech32::decode(bech32).map_err(Error::BadBech32)?;
    let base10 = bech32::FromBase32::from_base32(&addr).map_err(Error::BadBech32)?;
    Ok((hrp, base10))
}

fn parse_network(header: u8) -> Network {
    Network::from(header & 0b0000_1111)
}

fn shelley_hash_parts(payload: &[u8]) -> Result<(Hash<28>, Hash<28>), Error> {
    let h1 = slice_to_hash(payload.get(0..28).ok_or(Error::InvalidHashSize(payload.len()))?)?;
    let h2 = slice_to_hash(payload.get(28..56).ok_or(Error::InvalidHashSize(
        payload.len().saturating_sub(28),
    ))?)?;

    Ok((h1, h2))
}

fn bytes_to_address(bytes: &[u8]) -> Result<Address, Error> {
    let header = *bytes.first().ok_or(Error::MissingHeader)?;
    let payload = &bytes[1..];
    let net = parse_network(header);

    let addr = match header & 0b1111_0000 {
        0b0000_0000 => {
            let (h1, h2) = shelley_hash_parts(payload)?;
            ShelleyAddress(
                net,
                ShelleyPaymentPart::Key(h1),
                ShelleyDelegationPart::Key(h2),
            )
            .into()
        }
        0b0001_0000 => {
            let (h1, h2) = shelley_hash_parts(payload)?;
            ShelleyAddress(
                net,
                ShelleyPaymentPart::Script(h1),
                ShelleyDelegationPart::Key(h2),
            )
            .into()
        }
        0b0010_0000 => {
            let (h1, h2) = shelley_hash_parts(payload)?;
            ShelleyAddress(
                net,
                ShelleyPaymentPart::Key(h1),
                ShelleyDelegationPart::Script(h2),
            )
            .into()
        }
        0b0011_0000 => {
            let (h1, h2) = shelley_hash_parts(payload)?;
            ShelleyAddress(
                net,
                ShelleyPaymentPart::Script(h1),
                ShelleyDelegationPart::Script(h2),
            )
            .into()
        }
        0b0100_0000 => {
            let h1 = slice_to_hash(payload.get(0..28).ok_or(Error::MissingHeader)?)?;
            let p2 = ShelleyDelegationPart::from_pointer(&payload[28..])?;
            ShelleyAddress(net, ShelleyPaymentPart::Key(h1), p2).into()
        }
        0b0101_0000 => {
            let h1 = slice_to_hash(payload.get(0..28).ok_or(Error::MissingHeader)?)?;
            let p2 = ShelleyDelegationPart::from_pointer(&payload[28..])?;
            ShelleyAddress(net, ShelleyPaymentPart::Script(h1), p2).into()
        }
        0b0110_0000 => {
            let h1 = slice_to_hash(payload)?;
            ShelleyAddress(net, ShelleyPaymentPart::Key(h1), ShelleyDelegationPart::Null).into()
        }
        0b0111_0000 => {
            let h1 = slice_to_hash(payload)?;
            ShelleyAddress(
                net,
                ShelleyPaymentPart::Script(h1),
                ShelleyDelegationPart::Null,
            )
            .into()
        }
        0b1000_0000 => Address::Byron(ByronAddress::from_bytes(bytes)?),
        0b1110_0000 => StakeAddress(net, StakePayload::stake_key(payload)?).into(),
        0b1111_0000 => StakeAddress(net, StakePayload::script(payload)?).into(),
        _ => return Err(Error::InvalidHeader(header)),
    };

    Ok(addr)
}

impl ShelleyAddress {
    pub fn new(
        network: Network,
        payment: ShelleyPaymentPart,
        delegation: ShelleyDelegationPart,
    ) -> Self {
        Self(network, payment, delegation)
    }

    /// Gets the network associated with this address
    pub fn network(&self) -> Network {
        self.0
    }

    /// Gets a numeric id describing the type of the address
    pub fn typeid(&self) -> u8 {
        match (&self.1, &self.2) {
            (ShelleyPaymentPart::Key(_), ShelleyDelegationPart::Key(_)) => 0b0000,
            (ShelleyPaymentPart::Script(_), ShelleyDelegationPart::Key(_)) => 0b0001,
            (ShelleyPaymentPart::Key(_), ShelleyDelegationPart::Script(_)) => 0b0010,
            (ShelleyPaymentPart::Script(_), ShelleyDelegationPart::Script(_)) => 0b0011,
            (ShelleyPaymentPart::Key(_), ShelleyDelegationPart::Pointer(_)) => 0b0100,
            (ShelleyPaymentPart::Script(_), ShelleyDelegationPart::Pointer(_)) => 0b0101,
            (ShelleyPaymentPart::Key(_), ShelleyDelegationPart::Null) => 0b0110,
            (ShelleyPaymentPart::Script(_), ShelleyDelegationPart::Null) => 0b0111,
        }
    }

    pub fn to_header(&self) -> u8 {
        (self.typeid() << 4) | self.0.value()
    }

    pub fn payment(&self) -> &ShelleyPaymentPart {
        &self.1
    }

    pub fn delegation(&self) -> &ShelleyDelegationPart {
        &self.2
    }

    /// Gets the bech32 human-readable-part for this address
    pub fn hrp(&self) -> Result<&'static str, Error> {
        match &self.0 {
            Network::Testnet => Ok("addr_test"),
            Network::Mainnet => Ok("addr"),
            Network::Other(x) => Err(Error::UnknownNetworkHrp(*x)),
        }
    }

    pub fn to_vec(&self) -> Vec<u8> {
        let header = self.to_header();
        let payment = self.1.to_vec();
        let delegation = self.2.to_vec();

        [&[header], payment.as_slice(), delegation.as_slice()].concat()
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.to_vec())
    }

    pub fn to_bech32(&self) -> Result<String, Error> {
        encode_bech32(&self.to_vec(), self.hrp()?)
    }

    /// Indicates if either the payment or delegation part is a script
    pub fn has_script(&self) -> bool {
        self.payment().is_script() || self.delegation().is_script()
    }
}

impl StakeAddress {
    pub fn new(network: Network, payload: StakePayload) -> Self {
        Self(network, payload)
    }

    pub fn network(&self) -> Network {
        self.0
    }

    pub fn typeid(&self) -> u8 {
        match &self.1 {
            StakePayload::Stake(_) => 0b1110,
            StakePayload::Script(_) => 0b1111,
        }
    }

    pub fn to_header(&self) -> u8 {
        (self.typeid() << 4) | self.0.value()
    }

    pub fn payload(&self) -> &StakePayload {
        &self.1
    }

    pub fn hrp(&self) -> Result<&'static str, Error> {
        match &self.0 {
            Network::Testnet => Ok("stake_test"),
            Network::Mainnet => Ok("stake"),
            Network::Other(x) => Err(Error::UnknownNetworkHrp(*x)),
        }
    }

    pub fn to_vec(&self) -> Vec<u8> {
        [&[self.to_header()], self.1.as_ref()].concat()
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.to_vec())
    }

    pub fn to_bech32(&self) -> Result<String, Error> {
        encode_bech32(&self.to_vec(), self.hrp()?)
    }

    pub fn is_script(&self) -> bool {
        self.payload().is_script()
    }
}

impl TryFrom<ShelleyAddress> for StakeAddress {
    type Error = Error;

    fn try_from(value: ShelleyAddress) -> Result<Self, Self::Error> {
        let payload = match value.delegation() {
            ShelleyDelegationPart::Key(h) => StakePayload::Stake(*h),
            ShelleyDelegationPart::Script(h) => StakePayload::Script(*h),
            _ => return Err(Error::InvalidForContent),
        };

        Ok(StakeAddress(value.network(), payload))
    }
}

impl Address {
    /// Tries to encode this address into its bech32 form
    pub fn to_bech32(&self) -> Result<String, Error> {
        match self {
            Address::Byron(_) => Err(Error::InvalidForByron),
            Address::Shelley(x) => x.to_bech32(),
            Address::Stake(x) => x.to_bech32(),
        }
    }

    /// Tries to parse a bech32 value into an Address
    pub fn from_bech32(bech32: &str) -> Result<Self, Error> {
        let (hrp, bytes) = decode_bech32(bech32)?;

        // catch hrp/content mismatches a plain header parse would let through
        // (a pool id is 28 bytes with no header, for instance)
        if !matches!(hrp.as_str(), "addr" | "addr_test" | "stake" | "stake_test") {
            return Err(Error::UnknownStringFormat(bech32.to_owned()));
        }

        let address = bytes_to_address(&bytes)?;

        let expected = address.hrp()?;
        if hrp != expected {
            return Err(Error::UnknownStringFormat(bech32.to_owned()));
        }

        Ok(address)
    }

    /// Tries to decode the raw bytes of an address
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, Error> {
        bytes_to_address(bytes)
    }

    /// Tries to parse a hex value into an Address
    pub fn from_hex(bytes: &str) -> Result<Self, Error> {
        let bytes = hex::decode(bytes).map_err(|_| Error::BadHex)?;
        bytes_to_address(&bytes)
    }

    /// Gets the network associated with this address
    pub fn network(&self) -> Option<Network> {
        match self {
            Address::Byron(x) => x.network().ok(),
            Address::Shelley(x) => Some(x.network()),
            Address::Stake(x) => Some(x.network()),
        }
    }

    /// Gets a numeric id describing the type of the address
    pub fn typeid(&self) -> u8 {
        match self {
            Address::Byron(x) => x.typeid(),
            Address::Shelley(x) => x.typeid(),
            Address::Stake(x) => x.typeid(),
        }
    }

    /// Gets the bech32 human-readable-part for this address
    pub fn hrp(&self) -> Result<&'static str, Error> {
        match self {
            Address::Byron(_) => Err(Error::InvalidForByron),
            Address::Shelley(x) => x.hrp(),
            Address::Stake(x) => x.hrp(),
        }
    }

    /// Indicates if this address includes a script hash
    pub fn has_script(&self) -> bool {
        match self {
            Address::Byron(_) => false,
            Address::Shelley(x) => x.has_script(),
            Address::Stake(x) => x.is_script(),
        }
    }

    /// Indicates if this is an enterprise address
    pub fn is_enterprise(&self) -> bool {
        match self {
            Address::Shelley(x) => matches!(x.delegation(), ShelleyDelegationPart::Null),
            _ => false,
        }
    }

    pub fn to_vec(&self) -> Vec<u8> {
        match self {
            Address::Byron(x) => x.to_vec(),
            Address::Shelley(x) => x.to_vec(),
            Address::Stake(x) => x.to_vec(),
        }
    }

    pub fn to_hex(&self) -> String {
        match self {
            Address::Byron(x) => x.to_hex(),
            Address::Shelley(x) => x.to_hex(),
            Address::Stake(x) => x.to_hex(),
        }
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Address::Byron(x) => f.write_str(&x.to_base58()),
            Address::Shelley(x) => f.write_str(&x.to_bech32().unwrap_or_else(|_| x.to_hex())),
            Address::Stake(x) => f.write_str(&x.to_bech32().unwrap_or_else(|_| x.to_hex())),
        }
    }
}

impl FromStr for Address {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Ok(x) = Address::from_bech32(s) {
            return Ok(x);
        }

        if let Ok(x) = ByronAddress::from_base58(s) {
            return Ok(x.into());
        }

        if let Ok(x) = Address::from_hex(s) {
            return Ok(x);
        }

        Err(Error::UnknownStringFormat(s.to_owned()))
    }
}

impl TryFrom<&[u8]> for Address {
    type Error = Error;

    fn try_from(value: &[u8]) -> Result<Self, Self::Error> {
        bytes_to_address(value)
    }
}

impl From<ByronAddress> for Address {
    fn from(addr: ByronAddress) -> Self {
        Address::Byron(addr)
    }
}

impl From<ShelleyAddress> for Address {
    fn from(addr: ShelleyAddress) -> Self {
        Address::Shelley(addr)
    }
}

impl From<StakeAddress> for Address {
    fn from(addr: StakeAddress) -> Self {
        Address::Stake(addr)
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::*;

    const MAINNET_TEST_VECTORS: &[(&str, u8)] = &[
        ("addr1qx2fxv2umyhttkxyxp8x0dlpdt3k6cwng5pxj3jhsydzer3n0d3vllmyqwsx5wktcd8cc3sq835lu7drv2xwl2wywfgse35a3x", 0u8),
        ("addr1z8phkx6acpnf78fuvxn0mkew3l0fd058hzquvz7w36x4gten0d3vllmyqwsx5wktcd8cc3sq835lu7drv2xwl2wywfgs9yc0hh", 1u8),
        ("addr1yx2fxv2umyhttkxyxp8x0dlpdt3k6cwng5pxj3jhsydzerkr0vd4msrxnuwnccdxlhdjar77j6lg0wypcc9uar5d2shs2z78ve", 2u8),
        ("addr1x8phkx6acpnf78fuvxn0mkew3l0fd058hzquvz7w36x4gt7r0vd4msrxnuwnccdxlhdjar77j6lg0wypcc9uar5d2shskhj42g", 3u8),
        ("addr1gx2fxv2umyhttkxyxp8x0dlpdt3k6cwng5pxj3jhsydzer5pnz75xxcrzqf96k", 4u8),
        ("addr128phkx6acpnf78fuvxn0mkew3l0fd058hzquvz7w36x4gtupnz75xxcrtw79hu", 5u8),
        ("addr1vx2fxv2umyhttkxyxp8x0dlpdt3k6cwng5pxj3jhsydzers66hrl8", 6u8),
        ("addr1w8phkx6acpnf78fuvxn0mkew3l0fd058hzquvz7w36x4gtcyjy7wx", 7u8),
        ("stake1uyehkck0lajq8gr28t9uxnuvgcqrc6070x3k9r8048z8y5gh6ffgw", 14u8),
        ("stake178phkx6acpnf78fuvxn0mkew3l0fd058hzquvz7w36x4gtcccycj5", 15u8),
        ("37btjrVyb4KDXBNC4haBVPCrro8AQPHwvCMp3RFhhSVWwfFmZ6wwzSK6JK1hY6wHNmtrpTf1kdbva8TCneM2YsiXT7mrzT21EacHnPpz5YyUdj64na", 8u8),
    ];

    const PAYMENT_PUBLIC_KEY: &str =
        "addr_vk1w0l2sr2zgfm26ztc6nl9xy8ghsk5sh6ldwemlpmp9xylzy4dtf7st80zhd";
    const STAKE_PUBLIC_KEY: &str =
        "stake_vk1px4j0r2fk7ux5p23shz8f3y5y2qam7s954rgf3lg5merqcj6aetsft99wu";

    fn hash_vector_key(key: &str) -> Hash<28> {
        let (_, x) = decode_bech32(key).unwrap();
        lovelace_crypto::hash::Hasher::<224>::hash(&x)
    }

    #[test]
    fn roundtrip_string() {
        for (original, _) in MAINNET_TEST_VECTORS {
            let addr = Address::from_str(original).unwrap();
            assert_eq!(&addr.to_string(), original);
        }
    }

    #[test]
    fn typeid_matches() {
        for (original, typeid) in MAINNET_TEST_VECTORS {
            let addr = Address::from_str(original).unwrap();
            assert_eq!(addr.typeid(), *typeid);
        }
    }

    #[test]
    fn network_matches() {
        for (original, _) in MAINNET_TEST_VECTORS {
            let addr = Address::from_str(original).unwrap();

            assert!(matches!(addr.network(), Some(Network::Mainnet)));
        }
    }

    #[test]
    fn construct_from_parts() {
        let payment_hash = hash_vector_key(PAYMENT_PUBLIC_KEY);
        let delegation_hash = hash_vector_key(STAKE_PUBLIC_KEY);

        let addr: Address = ShelleyAddress::new(
            Network::Mainnet,
            ShelleyPaymentPart::key_hash(payment_hash),
            ShelleyDelegationPart::key_hash(delegation_hash),
        )
        .into();

        assert_eq!(addr.to_bech32().unwrap(), MAINNET_TEST_VECTORS[0].0);
    }

    #[test]
    fn pointer_vector_matches() {
        let addr = Address::from_str(MAINNET_TEST_VECTORS[4].0).unwrap();

        match addr {
            Address::Shelley(x) => match x.delegation() {
                ShelleyDelegationPart::Pointer(ptr) => {
                    assert_eq!(ptr.slot(), 2498243);
                    assert_eq!(ptr.tx_idx(), 27);
                    assert_eq!(ptr.cert_idx(), 3);
                }
                _ => panic!("expected pointer delegation"),
            },
            _ => panic!("expected shelley address"),
        }
    }

    #[test]
    fn hrp_content_mismatch_rejected() {
        // a pool hrp is not an address
        let pool = encode_bech32(&[0u8; 28], "pool").unwrap();
        assert!(Address::from_bech32(&pool).is_err());

        // a stake string decoded as stake works
        let stake = MAINNET_TEST_VECTORS[8].0;
        assert!(Address::from_bech32(stake).is_ok());
    }

    #[test]
    fn shelley_into_stake() {
        let addr = Address::from_str(MAINNET_TEST_VECTORS[0].0).unwrap();

        match addr {
            Address::Shelley(shelley) => {
                let stake: StakeAddress = shelley.clone().try_into().unwrap();
                assert_eq!(stake.network(), shelley.network());
                assert_eq!(
                    stake.payload().as_hash(),
                    shelley.delegation().as_hash().unwrap()
                );
            }
            _ => panic!("expected shelley address"),
        }
    }
}
