use std::collections::BTreeMap;

use lovelace_codec::minicbor::{self, data::Type, Decode, Encode};
use lovelace_codec::utils::{Bytes, CborWrap, Nullable, PositiveCoin, Set};

use crate::{
    AnchorDataHash, AddrKeyhash, AuxiliaryData, AuxiliaryDataHash, Coin, CostModels, DatumHash, Epoch, ExUnitPrices,
    ExUnits, Genesishash, Hash, Mint, NativeScript, NetworkId, PlutusData, PlutusScript,
    PoolKeyhash, PoolMetadata, RationalNumber, Relay, RewardAccount, ScriptHash, StakeCredential,
    TransactionId, TransactionInput, UnitInterval, Value, VrfKeyhash,
};

pub type Withdrawals = BTreeMap<RewardAccount, Coin>;

pub type RequiredSigners = Set<AddrKeyhash>;

// ----- Outputs

/// Pre-Alonzo array-shaped transaction output
///
/// The optional trailing datum hash is omitted entirely when absent.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct LegacyTransactionOutput {
    pub address: Bytes,
    pub amount: Value,
    pub datum_hash: Option<DatumHash>,
}

impl<'b, C> minicbor::decode::Decode<'b, C> for LegacyTransactionOutput {
    fn decode(d: &mut minicbor::Decoder<'b>, ctx: &mut C) -> Result<Self, minicbor::decode::Error> {
        let len = d.array()?;

        let address = d.decode_with(ctx)?;
        let amount = d.decode_with(ctx)?;

        let datum_hash = match len {
            Some(2) => None,
            Some(3) => Some(d.decode_with(ctx)?),
            _ => {
                return Err(minicbor::decode::Error::message(
                    "invalid array length for legacy output",
                ))
            }
        };

        Ok(LegacyTransactionOutput {
            address,
            amount,
            datum_hash,
        })
    }
}

impl<C> minicbor::encode::Encode<C> for LegacyTransactionOutput {
    fn encode<W: minicbor::encode::Write>(
        &self,
        e: &mut minicbor::Encoder<W>,
        ctx: &mut C,
    ) -> Result<(), minicbor::encode::Error<W::Error>> {
        match &self.datum_hash {
            Some(hash) => {
                e.array(3)?;
                e.encode_with(&self.address, ctx)?;
                e.encode_with(&self.amount, ctx)?;
                e.encode_with(hash, ctx)?;
            }
            None => {
                e.array(2)?;
                e.encode_with(&self.address, ctx)?;
                e.encode_with(&self.amount, ctx)?;
            }
        }

        Ok(())
    }
}

/// Datum attached to a post-Alonzo output: either a hash or inline data
#[derive(Debug, PartialEq, Eq, Clone)]
pub enum DatumOption {
    Hash(DatumHash),
    Data(CborWrap<PlutusData>),
}

impl<'b, C> minicbor::Decode<'b, C> for DatumOption {
    fn decode(d: &mut minicbor::Decoder<'b>, ctx: &mut C) -> Result<Self, minicbor::decode::Error> {
        d.array()?;

        match d.u8()? {
            0 => Ok(Self::Hash(d.decode_with(ctx)?)),
            1 => Ok(Self::Data(d.decode_with(ctx)?)),
            _ => Err(minicbor::decode::Error::message(
                "invalid variant for datum option",
            )),
        }
    }
}

impl<C> minicbor::Encode<C> for DatumOption {
    fn encode<W: minicbor::encode::Write>(
        &self,
        e: &mut minicbor::Encoder<W>,
        ctx: &mut C,
    ) -> Result<(), minicbor::encode::Error<W::Error>> {
        match self {
            Self::Hash(x) => {
                e.array(2)?;
                e.encode_with(0, ctx)?;
                e.encode_with(x, ctx)?;
            }
            Self::Data(x) => {
                e.array(2)?;
                e.encode_with(1, ctx)?;
                e.encode_with(x, ctx)?;
            }
        }

        Ok(())
    }
}

/// script = [0, native_script // 1, plutus_v1 // 2, plutus_v2 // 3, plutus_v3]
#[derive(Debug, PartialEq, Eq, Clone)]
pub enum ScriptRef {
    NativeScript(NativeScript),
    PlutusV1Script(PlutusScript<1>),
    PlutusV2Script(PlutusScript<2>),
    PlutusV3Script(PlutusScript<3>),
}

impl ScriptRef {
    /// Hash of the wrapped script, with its language discriminant
    pub fn script_hash(&self) -> ScriptHash {
        match self {
            ScriptRef::NativeScript(x) => x.script_hash(),
            ScriptRef::PlutusV1Script(x) => x.script_hash(),
            ScriptRef::PlutusV2Script(x) => x.script_hash(),
            ScriptRef::PlutusV3Script(x) => x.script_hash(),
        }
    }
}

impl<'b, C> minicbor::Decode<'b, C> for ScriptRef {
    fn decode(d: &mut minicbor::Decoder<'b>, ctx: &mut C) -> Result<Self, minicbor::decode::Error> {
        d.array()?;

        match d.u8()? {
            0 => Ok(Self::NativeScript(d.decode_with(ctx)?)),
            1 => Ok(Self::PlutusV1Script(d.decode_with(ctx)?)),
            2 => Ok(Self::PlutusV2Script(d.decode_with(ctx)?)),
            3 => Ok(Self::PlutusV3Script(d.decode_with(ctx)?)),
            _ => Err(minicbor::decode::Error::message(
                "invalid variant for script ref",
            )),
        }
    }
}

impl<C> minicbor::Encode<C> for ScriptRef {
    fn encode<W: minicbor::encode::Write>(
        &self,
        e: &mut minicbor::Encoder<W>,
        ctx: &mut C,
    ) -> Result<(), minicbor::encode::Error<W::Error>> {
        e.array(2)?;

        match self {
            Self::NativeScript(x) => {
                e.encode_with(0, ctx)?;
                e.encode_with(x, ctx)?;
            }
            Self::PlutusV1Script(x) => {
                e.encode_with(1, ctx)?;
                e.encode_with(x, ctx)?;
            }
            Self::PlutusV2Script(x) => {
                e.encode_with(2, ctx)?;
                e.encode_with(x, ctx)?;
            }
            Self::PlutusV3Script(x) => {
                e.encode_with(3, ctx)?;
                e.encode_with(x, ctx)?;
            }
        }

        Ok(())
    }
}

/// Post-Alonzo map-shaped transaction output
#[derive(Encode, Decode, Debug, PartialEq, Eq, Clone)]
#[cbor(map)]
pub struct PostAlonzoTransactionOutput {
    #[n(0)]
    pub address: Bytes,

    #[n(1)]
    pub value: Value,

    #[n(2)]
    pub datum_option: Option<DatumOption>,

    #[n(3)]
    pub script_ref: Option<CborWrap<ScriptRef>>,
}

/// A transaction output in either of its two wire shapes
#[derive(Debug, PartialEq, Eq, Clone)]
pub enum TransactionOutput {
    Legacy(LegacyTransactionOutput),
    PostAlonzo(PostAlonzoTransactionOutput),
}

impl TransactionOutput {
    pub fn address(&self) -> &Bytes {
        match self {
            TransactionOutput::Legacy(x) => &x.address,
            TransactionOutput::PostAlonzo(x) => &x.address,
        }
    }

    pub fn value(&self) -> &Value {
        match self {
            TransactionOutput::Legacy(x) => &x.amount,
            TransactionOutput::PostAlonzo(x) => &x.value,
        }
    }

    pub fn value_mut(&mut self) -> &mut Value {
        match self {
            TransactionOutput::Legacy(x) => &mut x.amount,
            TransactionOutput::PostAlonzo(x) => &mut x.value,
        }
    }

    pub fn lovelace(&self) -> Coin {
        self.value().coin()
    }

    pub fn datum_hash(&self) -> Option<&DatumHash> {
        match self {
            TransactionOutput::Legacy(x) => x.datum_hash.as_ref(),
            TransactionOutput::PostAlonzo(x) => match &x.datum_option {
                Some(DatumOption::Hash(hash)) => Some(hash),
                _ => None,
            },
        }
    }

    pub fn inline_datum(&self) -> Option<&PlutusData> {
        match self {
            TransactionOutput::Legacy(_) => None,
            TransactionOutput::PostAlonzo(x) => match &x.datum_option {
                Some(DatumOption::Data(data)) => Some(data),
                _ => None,
            },
        }
    }

    pub fn script_ref(&self) -> Option<&ScriptRef> {
        match self {
            TransactionOutput::Legacy(_) => None,
            TransactionOutput::PostAlonzo(x) => x.script_ref.as_ref().map(|w| &w.0),
        }
    }
}

impl<'b, C> minicbor::Decode<'b, C> for TransactionOutput {
    fn decode(d: &mut minicbor::Decoder<'b>, ctx: &mut C) -> Result<Self, minicbor::decode::Error> {
        match d.datatype()? {
            Type::Array | Type::ArrayIndef => Ok(Self::Legacy(d.decode_with(ctx)?)),
            Type::Map | Type::MapIndef => Ok(Self::PostAlonzo(d.decode_with(ctx)?)),
            _ => Err(minicbor::decode::Error::message(
                "invalid data type for transaction output",
            )),
        }
    }
}

impl<C> minicbor::Encode<C> for TransactionOutput {
    fn encode<W: minicbor::encode::Write>(
        &self,
        e: &mut minicbor::Encoder<W>,
        ctx: &mut C,
    ) -> Result<(), minicbor::encode::Error<W::Error>> {
        match self {
            Self::Legacy(x) => e.encode_with(x, ctx)?,
            Self::PostAlonzo(x) => e.encode_with(x, ctx)?,
        };

        Ok(())
    }
}

/// An unspent transaction output, the unit of coin selection
///
/// Not itself an on-chain entity; the pair only exists in the client.
#[derive(Debug, PartialEq, Eq, Clone, Encode, Decode)]
pub struct UTxO {
    #[n(0)]
    pub input: TransactionInput,

    #[n(1)]
    pub output: TransactionOutput,
}

impl UTxO {
    pub fn new(input: TransactionInput, output: TransactionOutput) -> Self {
        Self { input, output }
    }
}

// ----- Certificates

pub type DRepCredential = StakeCredential;

pub type CommitteeColdCredential = StakeCredential;

pub type CommitteeHotCredential = StakeCredential;

#[derive(Debug, PartialEq, PartialOrd, Eq, Ord, Clone)]
pub enum DRep {
    Key(AddrKeyhash),
    Script(ScriptHash),
    Abstain,
    NoConfidence,
}

impl<'b, C> minicbor::Decode<'b, C> for DRep {
    fn decode(d: &mut minicbor::Decoder<'b>, ctx: &mut C) -> Result<Self, minicbor::decode::Error> {
        d.array()?;

        match d.u16()? {
            0 => Ok(Self::Key(d.decode_with(ctx)?)),
            1 => Ok(Self::Script(d.decode_with(ctx)?)),
            2 => Ok(Self::Abstain),
            3 => Ok(Self::NoConfidence),
            _ => Err(minicbor::decode::Error::message(
                "invalid variant for drep",
            )),
        }
    }
}

impl<C> minicbor::Encode<C> for DRep {
    fn encode<W: minicbor::encode::Write>(
        &self,
        e: &mut minicbor::Encoder<W>,
        ctx: &mut C,
    ) -> Result<(), minicbor::encode::Error<W::Error>> {
        match self {
            Self::Key(x) => {
                e.array(2)?;
                e.encode_with(0, ctx)?;
                e.encode_with(x, ctx)?;
            }
            Self::Script(x) => {
                e.array(2)?;
                e.encode_with(1, ctx)?;
                e.encode_with(x, ctx)?;
            }
            Self::Abstain => {
                e.array(1)?;
                e.encode_with(2, ctx)?;
            }
            Self::NoConfidence => {
                e.array(1)?;
                e.encode_with(3, ctx)?;
            }
        }

        Ok(())
    }
}

#[derive(Encode, Decode, Debug, PartialEq, PartialOrd, Eq, Ord, Clone)]
pub struct Anchor {
    #[n(0)]
    pub url: String,

    #[n(1)]
    pub content_hash: AnchorDataHash,
}

#[derive(Debug, PartialEq, Eq, Clone)]
pub enum Certificate {
    StakeRegistration(StakeCredential),
    StakeDeregistration(StakeCredential),
    StakeDelegation(StakeCredential, PoolKeyhash),
    PoolRegistration {
        operator: PoolKeyhash,
        vrf_keyhash: VrfKeyhash,
        pledge: Coin,
        cost: Coin,
        margin: UnitInterval,
        reward_account: RewardAccount,
        pool_owners: Set<AddrKeyhash>,
        relays: Vec<Relay>,
        pool_metadata: Option<PoolMetadata>,
    },
    PoolRetirement(PoolKeyhash, Epoch),
    Reg(StakeCredential, Coin),
    UnReg(StakeCredential, Coin),
    VoteDeleg(StakeCredential, DRep),
    StakeVoteDeleg(StakeCredential, PoolKeyhash, DRep),
    StakeRegDeleg(StakeCredential, PoolKeyhash, Coin),
    VoteRegDeleg(StakeCredential, DRep, Coin),
    StakeVoteRegDeleg(StakeCredential, PoolKeyhash, DRep, Coin),
    AuthCommitteeHot(CommitteeColdCredential, CommitteeHotCredential),
    ResignCommitteeCold(CommitteeColdCredential, Option<Anchor>),
    RegDRepCert(DRepCredential, Coin, Option<Anchor>),
    UnRegDRepCert(DRepCredential, Coin),
    UpdateDRepCert(DRepCredential, Option<Anchor>),
}

impl Certificate {
    /// The stake credential this certificate operates on, if any
    pub fn stake_credential(&self) -> Option<&StakeCredential> {
        match self {
            Certificate::StakeRegistration(c)
            | Certificate::StakeDeregistration(c)
            | Certificate::StakeDelegation(c, _)
            | Certificate::Reg(c, _)
            | Certificate::UnReg(c, _)
            | Certificate::VoteDeleg(c, _)
            | Certificate::StakeVoteDeleg(c, _, _)
            | Certificate::StakeRegDeleg(c, _, _)
            | Certificate::VoteRegDeleg(c, _, _)
            | Certificate::StakeVoteRegDeleg(c, _, _, _) => Some(c),
            _ => None,
        }
    }
}

impl<'b, C> minicbor::Decode<'b, C> for Certificate {
    fn decode(d: &mut minicbor::Decoder<'b>, ctx: &mut C) -> Result<Self, minicbor::decode::Error> {
        d.array()?;

        match d.u16()? {
            0 => Ok(Certificate::StakeRegistration(d.decode_with(ctx)?)),
            1 => Ok(Certificate::StakeDeregistration(d.decode_with(ctx)?)),
            2 => Ok(Certificate::StakeDelegation(
                d.decode_with(ctx)?,
                d.decode_with(ctx)?,
            )),
            3 => Ok(Certificate::PoolRegistration {
                operator: d.decode_with(ctx)?,
                vrf_keyhash: d.decode_with(ctx)?,
                pledge: d.decode_with(ctx)?,
                cost: d.decode_with(ctx)?,
                margin: d.decode_with(ctx)?,
                reward_account: d.decode_with(ctx)?,
                pool_owners: d.decode_with(ctx)?,
                relays: d.decode_with(ctx)?,
                pool_metadata: d.decode_with(ctx)?,
            }),
            4 => Ok(Certificate::PoolRetirement(
                d.decode_with(ctx)?,
                d.decode_with(ctx)?,
            )),
            7 => Ok(Certificate::Reg(d.decode_with(ctx)?, d.decode_with(ctx)?)),
            8 => Ok(Certificate::UnReg(d.decode_with(ctx)?, d.decode_with(ctx)?)),
            9 => Ok(Certificate::VoteDeleg(
                d.decode_with(ctx)?,
                d.decode_with(ctx)?,
            )),
            10 => Ok(Certificate::StakeVoteDeleg(
                d.decode_with(ctx)?,
                d.decode_with(ctx)?,
                d.decode_with(ctx)?,
            )),
            11 => Ok(Certificate::StakeRegDeleg(
                d.decode_with(ctx)?,
                d.decode_with(ctx)?,
                d.decode_with(ctx)?,
            )),
            12 => Ok(Certificate::VoteRegDeleg(
                d.decode_with(ctx)?,
                d.decode_with(ctx)?,
                d.decode_with(ctx)?,
            )),
            13 => Ok(Certificate::StakeVoteRegDeleg(
                d.decode_with(ctx)?,
                d.decode_with(ctx)?,
                d.decode_with(ctx)?,
                d.decode_with(ctx)?,
            )),
            14 => Ok(Certificate::AuthCommitteeHot(
                d.decode_with(ctx)?,
                d.decode_with(ctx)?,
            )),
            15 => Ok(Certificate::ResignCommitteeCold(
                d.decode_with(ctx)?,
                d.decode_with(ctx)?,
            )),
            16 => Ok(Certificate::RegDRepCert(
                d.decode_with(ctx)?,
                d.decode_with(ctx)?,
                d.decode_with(ctx)?,
            )),
            17 => Ok(Certificate::UnRegDRepCert(
                d.decode_with(ctx)?,
                d.decode_with(ctx)?,
            )),
            18 => Ok(Certificate::UpdateDRepCert(
                d.decode_with(ctx)?,
                d.decode_with(ctx)?,
            )),
            _ => Err(minicbor::decode::Error::message(
                "unknown variant for certificate",
            )),
        }
    }
}

impl<C> minicbor::Encode<C> for Certificate {
    fn encode<W: minicbor::encode::Write>(
        &self,
        e: &mut minicbor::Encoder<W>,
        ctx: &mut C,
    ) -> Result<(), minicbor::encode::Error<W::Error>> {
        match self {
            Certificate::StakeRegistration(a) => {
                e.array(2)?;
                e.encode_with(0, ctx)?;
                e.encode_with(a, ctx)?;
            }
            Certificate::StakeDeregistration(a) => {
                e.array(2)?;
                e.encode_with(1, ctx)?;
                e.encode_with(a, ctx)?;
            }
            Certificate::StakeDelegation(a, b) => {
                e.array(3)?;
                e.encode_with(2, ctx)?;
                e.encode_with(a, ctx)?;
                e.encode_with(b, ctx)?;
            }
            Certificate::PoolRegistration {
                operator,
                vrf_keyhash,
                pledge,
                cost,
                margin,
                reward_account,
                pool_owners,
                relays,
                pool_metadata,
            } => {
                e.array(10)?;
                e.encode_with(3, ctx)?;
                e.encode_with(operator, ctx)?;
                e.encode_with(vrf_keyhash, ctx)?;
                e.encode_with(pledge, ctx)?;
                e.encode_with(cost, ctx)?;
                e.encode_with(margin, ctx)?;
                e.encode_with(reward_account, ctx)?;
                e.encode_with(pool_owners, ctx)?;
                e.encode_with(relays, ctx)?;
                e.encode_with(pool_metadata, ctx)?;
            }
            Certificate::PoolRetirement(a, b) => {
                e.array(3)?;
                e.encode_with(4, ctx)?;
                e.encode_with(a, ctx)?;
                e.encode_with(b, ctx)?;
            }
            Certificate::Reg(a, b) => {
                e.array(3)?;
                e.encode_with(7, ctx)?;
                e.encode_with(a, ctx)?;
                e.encode_with(b, ctx)?;
            }
            Certificate::UnReg(a, b) => {
                e.array(3)?;
                e.encode_with(8, ctx)?;
                e.encode_with(a, ctx)?;
                e.encode_with(b, ctx)?;
            }
            Certificate::VoteDeleg(a, b) => {
                e.array(3)?;
                e.encode_with(9, ctx)?;
                e.encode_with(a, ctx)?;
                e.encode_with(b, ctx)?;
            }
            Certificate::StakeVoteDeleg(a, b, c) => {
                e.array(4)?;
                e.encode_with(10, ctx)?;
                e.encode_with(a, ctx)?;
                e.encode_with(b, ctx)?;
                e.encode_with(c, ctx)?;
            }
            Certificate::StakeRegDeleg(a, b, c) => {
                e.array(4)?;
                e.encode_with(11, ctx)?;
                e.encode_with(a, ctx)?;
                e.encode_with(b, ctx)?;
                e.encode_with(c, ctx)?;
            }
            Certificate::VoteRegDeleg(a, b, c) => {
                e.array(4)?;
                e.encode_with(12, ctx)?;
                e.encode_with(a, ctx)?;
                e.encode_with(b, ctx)?;
                e.encode_with(c, ctx)?;
            }
            Certificate::StakeVoteRegDeleg(a, b, c, x) => {
                e.array(5)?;
                e.encode_with(13, ctx)?;
                e.encode_with(a, ctx)?;
                e.encode_with(b, ctx)?;
                e.encode_with(c, ctx)?;
                e.encode_with(x, ctx)?;
            }
            Certificate::AuthCommitteeHot(a, b) => {
                e.array(3)?;
                e.encode_with(14, ctx)?;
                e.encode_with(a, ctx)?;
                e.encode_with(b, ctx)?;
            }
            Certificate::ResignCommitteeCold(a, b) => {
                e.array(3)?;
                e.encode_with(15, ctx)?;
                e.encode_with(a, ctx)?;
                e.encode_with(b, ctx)?;
            }
            Certificate::RegDRepCert(a, b, c) => {
                e.array(4)?;
                e.encode_with(16, ctx)?;
                e.encode_with(a, ctx)?;
                e.encode_with(b, ctx)?;
                e.encode_with(c, ctx)?;
            }
            Certificate::UnRegDRepCert(a, b) => {
                e.array(3)?;
                e.encode_with(17, ctx)?;
                e.encode_with(a, ctx)?;
                e.encode_with(b, ctx)?;
            }
            Certificate::UpdateDRepCert(a, b) => {
                e.array(3)?;
                e.encode_with(18, ctx)?;
                e.encode_with(a, ctx)?;
                e.encode_with(b, ctx)?;
            }
        }

        Ok(())
    }
}

// ----- Governance

#[derive(Debug, PartialEq, Eq, Clone, PartialOrd, Ord)]
pub enum Voter {
    ConstitutionalCommitteeScript(ScriptHash),
    ConstitutionalCommitteeKey(AddrKeyhash),
    DRepScript(ScriptHash),
    DRepKey(AddrKeyhash),
    StakePoolKey(AddrKeyhash),
}

impl<'b, C> minicbor::Decode<'b, C> for Voter {
    fn decode(d: &mut minicbor::Decoder<'b>, ctx: &mut C) -> Result<Self, minicbor::decode::Error> {
        d.array()?;

        match d.u16()? {
            0 => Ok(Self::ConstitutionalCommitteeKey(d.decode_with(ctx)?)),
            1 => Ok(Self::ConstitutionalCommitteeScript(d.decode_with(ctx)?)),
            2 => Ok(Self::DRepKey(d.decode_with(ctx)?)),
            3 => Ok(Self::DRepScript(d.decode_with(ctx)?)),
            4 => Ok(Self::StakePoolKey(d.decode_with(ctx)?)),
            _ => Err(minicbor::decode::Error::message(
                "invalid variant for voter",
            )),
        }
    }
}

impl<C> minicbor::Encode<C> for Voter {
    fn encode<W: minicbor::encode::Write>(
        &self,
        e: &mut minicbor::Encoder<W>,
        ctx: &mut C,
    ) -> Result<(), minicbor::encode::Error<W::Error>> {
        e.array(2)?;

        match self {
            Self::ConstitutionalCommitteeKey(x) => {
                e.encode_with(0, ctx)?;
                e.encode_with(x, ctx)?;
            }
            Self::ConstitutionalCommitteeScript(x) => {
                e.encode_with(1, ctx)?;
                e.encode_with(x, ctx)?;
            }
            Self::DRepKey(x) => {
                e.encode_with(2, ctx)?;
                e.encode_with(x, ctx)?;
            }
            Self::DRepScript(x) => {
                e.encode_with(3, ctx)?;
                e.encode_with(x, ctx)?;
            }
            Self::StakePoolKey(x) => {
                e.encode_with(4, ctx)?;
                e.encode_with(x, ctx)?;
            }
        }

        Ok(())
    }
}

#[derive(Encode, Decode, Debug, PartialEq, Eq, Clone, PartialOrd, Ord)]
pub struct GovActionId {
    #[n(0)]
    pub transaction_id: TransactionId,

    #[n(1)]
    pub action_index: u32,
}

#[derive(Encode, Decode, Debug, PartialEq, Eq, Clone, Copy)]
#[cbor(index_only)]
pub enum Vote {
    #[n(0)]
    No,
    #[n(1)]
    Yes,
    #[n(2)]
    Abstain,
}

#[derive(Encode, Decode, Debug, PartialEq, Eq, Clone)]
pub struct VotingProcedure {
    #[n(0)]
    pub vote: Vote,

    #[n(1)]
    pub anchor: Option<Anchor>,
}

pub type VotingProcedures = BTreeMap<Voter, BTreeMap<GovActionId, VotingProcedure>>;

#[derive(Encode, Decode, Debug, PartialEq, Eq, Clone)]
pub struct Constitution {
    #[n(0)]
    pub anchor: Anchor,

    #[n(1)]
    pub guardrail_script: Option<ScriptHash>,
}

#[derive(Debug, PartialEq, Eq, Clone)]
pub enum GovAction {
    ParameterChange(
        Option<GovActionId>,
        Box<ProtocolParamUpdate>,
        Option<ScriptHash>,
    ),
    HardForkInitiation(Option<GovActionId>, crate::ProtocolVersion),
    TreasuryWithdrawals(BTreeMap<RewardAccount, Coin>, Option<ScriptHash>),
    NoConfidence(Option<GovActionId>),
    UpdateCommittee(
        Option<GovActionId>,
        Set<CommitteeColdCredential>,
        BTreeMap<CommitteeColdCredential, Epoch>,
        UnitInterval,
    ),
    NewConstitution(Option<GovActionId>, Constitution),
    Information,
}

impl<'b, C> minicbor::Decode<'b, C> for GovAction {
    fn decode(d: &mut minicbor::Decoder<'b>, ctx: &mut C) -> Result<Self, minicbor::decode::Error> {
        d.array()?;

        match d.u16()? {
            0 => Ok(Self::ParameterChange(
                d.decode_with(ctx)?,
                Box::new(d.decode_with(ctx)?),
                d.decode_with(ctx)?,
            )),
            1 => Ok(Self::HardForkInitiation(
                d.decode_with(ctx)?,
                d.decode_with(ctx)?,
            )),
            2 => Ok(Self::TreasuryWithdrawals(
                d.decode_with(ctx)?,
                d.decode_with(ctx)?,
            )),
            3 => Ok(Self::NoConfidence(d.decode_with(ctx)?)),
            4 => Ok(Self::UpdateCommittee(
                d.decode_with(ctx)?,
                d.decode_with(ctx)?,
                d.decode_with(ctx)?,
                d.decode_with(ctx)?,
            )),
            5 => Ok(Self::NewConstitution(
                d.decode_with(ctx)?,
                d.decode_with(ctx)?,
            )),
            6 => Ok(Self::Information),
            _ => Err(minicbor::decode::Error::message(
                "invalid variant for gov action",
            )),
        }
    }
}

impl<C> minicbor::Encode<C> for GovAction {
    fn encode<W: minicbor::encode::Write>(
        &self,
        e: &mut minicbor::Encoder<W>,
        ctx: &mut C,
    ) -> Result<(), minicbor::encode::Error<W::Error>> {
        match self {
            Self::ParameterChange(a, b, c) => {
                e.array(4)?;
                e.encode_with(0, ctx)?;
                e.encode_with(a, ctx)?;
                e.encode_with(b.as_ref(), ctx)?;
                e.encode_with(c, ctx)?;
            }
            Self::HardForkInitiation(a, b) => {
                e.array(3)?;
                e.encode_with(1, ctx)?;
                e.encode_with(a, ctx)?;
                e.encode_with(b, ctx)?;
            }
            Self::TreasuryWithdrawals(a, b) => {
                e.array(3)?;
                e.encode_with(2, ctx)?;
                e.encode_with(a, ctx)?;
                e.encode_with(b, ctx)?;
            }
            Self::NoConfidence(a) => {
                e.array(2)?;
                e.encode_with(3, ctx)?;
                e.encode_with(a, ctx)?;
            }
            Self::UpdateCommittee(a, b, c, x) => {
                e.array(5)?;
                e.encode_with(4, ctx)?;
                e.encode_with(a, ctx)?;
                e.encode_with(b, ctx)?;
                e.encode_with(c, ctx)?;
                e.encode_with(x, ctx)?;
            }
            Self::NewConstitution(a, b) => {
                e.array(3)?;
                e.encode_with(5, ctx)?;
                e.encode_with(a, ctx)?;
                e.encode_with(b, ctx)?;
            }
            Self::Information => {
                e.array(1)?;
                e.encode_with(6, ctx)?;
            }
        }

        Ok(())
    }
}

#[derive(Encode, Decode, Debug, PartialEq, Eq, Clone)]
pub struct ProposalProcedure {
    #[n(0)]
    pub deposit: Coin,

    #[n(1)]
    pub reward_account: RewardAccount,

    #[n(2)]
    pub gov_action: GovAction,

    #[n(3)]
    pub anchor: Anchor,
}

// ----- Protocol parameter updates

#[derive(Encode, Decode, Debug, PartialEq, Eq, Clone, Default)]
#[cbor(map)]
pub struct ProtocolParamUpdate {
    #[n(0)]
    pub minfee_a: Option<u64>,
    #[n(1)]
    pub minfee_b: Option<u64>,
    #[n(2)]
    pub max_block_body_size: Option<u64>,
    #[n(3)]
    pub max_transaction_size: Option<u64>,
    #[n(4)]
    pub max_block_header_size: Option<u64>,
    #[n(5)]
    pub key_deposit: Option<Coin>,
    #[n(6)]
    pub pool_deposit: Option<Coin>,
    #[n(7)]
    pub maximum_epoch: Option<Epoch>,
    #[n(8)]
    pub desired_number_of_stake_pools: Option<u64>,
    #[n(9)]
    pub pool_pledge_influence: Option<RationalNumber>,
    #[n(10)]
    pub expansion_rate: Option<UnitInterval>,
    #[n(11)]
    pub treasury_growth_rate: Option<UnitInterval>,
    #[n(16)]
    pub min_pool_cost: Option<Coin>,
    #[n(17)]
    pub ada_per_utxo_byte: Option<Coin>,
    #[n(18)]
    pub cost_models_for_script_languages: Option<CostModels>,
    #[n(19)]
    pub execution_costs: Option<ExUnitPrices>,
    #[n(20)]
    pub max_tx_ex_units: Option<ExUnits>,
    #[n(21)]
    pub max_block_ex_units: Option<ExUnits>,
    #[n(22)]
    pub max_value_size: Option<u64>,
    #[n(23)]
    pub collateral_percentage: Option<u64>,
    #[n(24)]
    pub max_collateral_inputs: Option<u64>,
    #[n(33)]
    pub minfee_refscript_cost_per_byte: Option<UnitInterval>,
}

#[derive(Encode, Decode, Debug, PartialEq, Eq, Clone)]
pub struct Update {
    #[n(0)]
    pub proposed_protocol_parameter_updates: BTreeMap<Genesishash, ProtocolParamUpdate>,

    #[n(1)]
    pub epoch: Epoch,
}

// ----- Redeemers & witnesses

#[derive(Encode, Decode, Debug, PartialEq, Eq, Clone, Copy, PartialOrd, Ord)]
#[cbor(index_only)]
pub enum RedeemerTag {
    #[n(0)]
    Spend,
    #[n(1)]
    Mint,
    #[n(2)]
    Cert,
    #[n(3)]
    Reward,
    #[n(4)]
    Vote,
    #[n(5)]
    Propose,
}

#[derive(Encode, Decode, Debug, PartialEq, Eq, Clone)]
pub struct Redeemer {
    #[n(0)]
    pub tag: RedeemerTag,

    #[n(1)]
    pub index: u32,

    #[n(2)]
    pub data: PlutusData,

    #[n(3)]
    pub ex_units: ExUnits,
}

#[derive(Encode, Decode, Debug, PartialEq, Eq, Clone, PartialOrd, Ord)]
pub struct RedeemersKey {
    #[n(0)]
    pub tag: RedeemerTag,

    #[n(1)]
    pub index: u32,
}

#[derive(Encode, Decode, Debug, PartialEq, Eq, Clone)]
pub struct RedeemersValue {
    #[n(0)]
    pub data: PlutusData,

    #[n(1)]
    pub ex_units: ExUnits,
}

/// Redeemer collection in either its historical list or Chang-era map form
#[derive(Debug, PartialEq, Eq, Clone)]
pub enum Redeemers {
    List(Vec<Redeemer>),
    Map(BTreeMap<RedeemersKey, RedeemersValue>),
}

impl Redeemers {
    pub fn is_empty(&self) -> bool {
        match self {
            Redeemers::List(x) => x.is_empty(),
            Redeemers::Map(x) => x.is_empty(),
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Redeemers::List(x) => x.len(),
            Redeemers::Map(x) => x.len(),
        }
    }

    /// The redeemers as flat (tag, index, data, units) records
    pub fn to_list(&self) -> Vec<Redeemer> {
        match self {
            Redeemers::List(x) => x.clone(),
            Redeemers::Map(x) => x
                .iter()
                .map(|(key, value)| Redeemer {
                    tag: key.tag,
                    index: key.index,
                    data: value.data.clone(),
                    ex_units: value.ex_units,
                })
                .collect(),
        }
    }
}

impl From<Vec<Redeemer>> for Redeemers {
    fn from(value: Vec<Redeemer>) -> Self {
        Redeemers::List(value)
    }
}

impl From<BTreeMap<RedeemersKey, RedeemersValue>> for Redeemers {
    fn from(value: BTreeMap<RedeemersKey, RedeemersValue>) -> Self {
        Redeemers::Map(value)
    }
}

impl<'b, C> minicbor::Decode<'b, C> for Redeemers {
    fn decode(d: &mut minicbor::Decoder<'b>, ctx: &mut C) -> Result<Self, minicbor::decode::Error> {
        match d.datatype()? {
            Type::Array | Type::ArrayIndef => Ok(Self::List(d.decode_with(ctx)?)),
            Type::Map | Type::MapIndef => Ok(Self::Map(d.decode_with(ctx)?)),
            _ => Err(minicbor::decode::Error::message(
                "invalid data type for redeemers",
            )),
        }
    }
}

impl<C> minicbor::Encode<C> for Redeemers {
    fn encode<W: minicbor::encode::Write>(
        &self,
        e: &mut minicbor::Encoder<W>,
        ctx: &mut C,
    ) -> Result<(), minicbor::encode::Error<W::Error>> {
        match self {
            Self::List(x) => e.encode_with(x, ctx)?,
            Self::Map(x) => e.encode_with(x, ctx)?,
        };

        Ok(())
    }
}

#[derive(Encode, Decode, Debug, PartialEq, Eq, Clone)]
pub struct VKeyWitness {
    #[n(0)]
    pub vkey: Bytes,

    #[n(1)]
    pub signature: Bytes,
}

#[derive(Encode, Decode, Debug, PartialEq, Eq, Clone)]
pub struct BootstrapWitness {
    #[n(0)]
    pub public_key: Bytes,

    #[n(1)]
    pub signature: Bytes,

    #[n(2)]
    pub chain_code: Bytes,

    #[n(3)]
    pub attributes: Bytes,
}

#[derive(Encode, Decode, Debug, PartialEq, Eq, Clone, Default)]
#[cbor(map)]
pub struct WitnessSet {
    #[n(0)]
    pub vkeywitness: Option<Vec<VKeyWitness>>,

    #[n(1)]
    pub native_script: Option<Vec<NativeScript>>,

    #[n(2)]
    pub bootstrap_witness: Option<Vec<BootstrapWitness>>,

    #[n(3)]
    pub plutus_v1_script: Option<Vec<PlutusScript<1>>>,

    #[n(4)]
    pub plutus_data: Option<Vec<PlutusData>>,

    #[n(5)]
    pub redeemer: Option<Redeemers>,

    #[n(6)]
    pub plutus_v2_script: Option<Vec<PlutusScript<2>>>,

    #[n(7)]
    pub plutus_v3_script: Option<Vec<PlutusScript<3>>>,
}

impl WitnessSet {
    pub fn has_plutus_script(&self) -> bool {
        self.plutus_v1_script.as_ref().map_or(false, |x| !x.is_empty())
            || self.plutus_v2_script.as_ref().map_or(false, |x| !x.is_empty())
            || self.plutus_v3_script.as_ref().map_or(false, |x| !x.is_empty())
    }
}

// ----- Transaction body & transaction

#[derive(Encode, Decode, Debug, PartialEq, Eq, Clone, Default)]
#[cbor(map)]
pub struct TransactionBody {
    #[n(0)]
    pub inputs: Set<TransactionInput>,

    #[n(1)]
    pub outputs: Vec<TransactionOutput>,

    #[n(2)]
    pub fee: Coin,

    #[n(3)]
    pub ttl: Option<u64>,

    #[n(4)]
    pub certificates: Option<Vec<Certificate>>,

    #[n(5)]
    pub withdrawals: Option<Withdrawals>,

    #[n(6)]
    pub update: Option<Update>,

    #[n(7)]
    pub auxiliary_data_hash: Option<AuxiliaryDataHash>,

    #[n(8)]
    pub validity_interval_start: Option<u64>,

    #[n(9)]
    pub mint: Option<Mint>,

    #[n(11)]
    pub script_data_hash: Option<Hash<32>>,

    #[n(13)]
    pub collateral: Option<Vec<TransactionInput>>,

    #[n(14)]
    pub required_signers: Option<RequiredSigners>,

    #[n(15)]
    pub network_id: Option<NetworkId>,

    #[n(16)]
    pub collateral_return: Option<TransactionOutput>,

    #[n(17)]
    pub total_collateral: Option<Coin>,

    #[n(18)]
    pub reference_inputs: Option<Vec<TransactionInput>>,

    #[n(19)]
    pub voting_procedures: Option<VotingProcedures>,

    #[n(20)]
    pub proposal_procedures: Option<Vec<ProposalProcedure>>,

    #[n(21)]
    pub treasury_value: Option<Coin>,

    #[n(22)]
    pub donation: Option<PositiveCoin>,
}

impl TransactionBody {
    /// Blake2b-256 of the canonical encoding, i.e. the transaction id
    pub fn hash(&self) -> TransactionId {
        lovelace_crypto::hash::Hasher::<256>::hash_cbor(self)
    }
}

#[derive(Encode, Decode, Debug, PartialEq, Clone)]
pub struct Transaction {
    #[n(0)]
    pub transaction_body: TransactionBody,

    #[n(1)]
    pub transaction_witness_set: WitnessSet,

    #[n(2)]
    pub valid: bool,

    #[n(3)]
    pub auxiliary_data: Nullable<AuxiliaryData>,
}

impl Transaction {
    pub fn new(
        transaction_body: TransactionBody,
        transaction_witness_set: WitnessSet,
        auxiliary_data: Option<AuxiliaryData>,
    ) -> Self {
        Self {
            transaction_body,
            transaction_witness_set,
            valid: true,
            auxiliary_data: auxiliary_data.into(),
        }
    }

    pub fn id(&self) -> TransactionId {
        self.transaction_body.hash()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lovelace_codec::minicbor;

    fn input(fill: u8, index: u64) -> TransactionInput {
        TransactionInput::new(Hash::new([fill; 32]), index)
    }

    fn legacy_output(coin: u64) -> TransactionOutput {
        TransactionOutput::Legacy(LegacyTransactionOutput {
            address: vec![0x60; 29].into(),
            amount: Value::Coin(coin),
            datum_hash: None,
        })
    }

    fn roundtrip<T>(value: &T) -> T
    where
        T: minicbor::Encode<()> + for<'b> minicbor::Decode<'b, ()>,
    {
        let bytes = minicbor::to_vec(value).unwrap();
        minicbor::decode(&bytes).unwrap()
    }

    #[test]
    fn minimal_body_roundtrip() {
        let body = TransactionBody {
            inputs: vec![input(1, 0)].into(),
            outputs: vec![legacy_output(500_000)],
            fee: 165_413,
            ..Default::default()
        };

        assert_eq!(roundtrip(&body), body);
    }

    #[test]
    fn body_optional_fields_omitted() {
        let body = TransactionBody {
            inputs: vec![input(1, 0)].into(),
            outputs: vec![legacy_output(500_000)],
            fee: 0,
            ..Default::default()
        };

        let bytes = minicbor::to_vec(&body).unwrap();
        // a map of exactly three entries: inputs, outputs, fee
        assert_eq!(bytes[0], 0xa3);
    }

    #[test]
    fn certificate_wire_tags() {
        let cred = StakeCredential::AddrKeyhash(Hash::new([7; 28]));
        let cert = Certificate::StakeRegistration(cred.clone());

        let bytes = minicbor::to_vec(&cert).unwrap();
        // [0, [0, h'07...']]
        assert_eq!(&bytes[0..2], &[0x82, 0x00]);

        let deleg = Certificate::StakeDelegation(cred, Hash::new([9; 28]));
        let bytes = minicbor::to_vec(&deleg).unwrap();
        assert_eq!(&bytes[0..2], &[0x83, 0x02]);

        assert_eq!(roundtrip(&deleg), deleg);
    }

    #[test]
    fn stake_credential_order_quirk() {
        // script credentials sort before key credentials, as in the ledger
        let script = StakeCredential::ScriptHash(Hash::new([0xff; 28]));
        let key = StakeCredential::AddrKeyhash(Hash::new([0x00; 28]));

        assert!(script < key);
    }

    #[test]
    fn output_shapes() {
        let legacy = legacy_output(42);
        let bytes = minicbor::to_vec(&legacy).unwrap();
        assert_eq!(bytes[0], 0x82);
        assert_eq!(roundtrip(&legacy), legacy);

        let post = TransactionOutput::PostAlonzo(PostAlonzoTransactionOutput {
            address: vec![0x60; 29].into(),
            value: Value::Coin(42),
            datum_option: Some(DatumOption::Hash(Hash::new([1; 32]))),
            script_ref: None,
        });
        let bytes = minicbor::to_vec(&post).unwrap();
        assert_eq!(bytes[0], 0xa3);
        assert_eq!(roundtrip(&post), post);
    }

    #[test]
    fn governance_roundtrip() {
        let voter = Voter::DRepKey(Hash::new([2; 28]));
        let action_id = GovActionId {
            transaction_id: Hash::new([3; 32]),
            action_index: 0,
        };
        let procedure = VotingProcedure {
            vote: Vote::Yes,
            anchor: None,
        };

        let mut procedures = VotingProcedures::new();
        procedures
            .entry(voter)
            .or_default()
            .insert(action_id, procedure);

        let body = TransactionBody {
            inputs: vec![input(1, 0)].into(),
            outputs: vec![],
            fee: 0,
            voting_procedures: Some(procedures),
            ..Default::default()
        };

        assert_eq!(roundtrip(&body), body);
    }

    #[test]
    fn proposal_roundtrip() {
        let proposal = ProposalProcedure {
            deposit: 1_000_000,
            reward_account: vec![0xe0; 29].into(),
            gov_action: GovAction::Information,
            anchor: Anchor {
                url: "https://example.com/gov.json".into(),
                content_hash: Hash::new([4; 32]),
            },
        };

        assert_eq!(roundtrip(&proposal), proposal);
    }

    #[test]
    fn update_roundtrip() {
        let mut updates = BTreeMap::new();
        updates.insert(
            Bytes::from(vec![1; 28]),
            ProtocolParamUpdate {
                minfee_a: Some(44),
                ..Default::default()
            },
        );

        let update = Update {
            proposed_protocol_parameter_updates: updates,
            epoch: 300,
        };

        assert_eq!(roundtrip(&update), update);
    }

    #[test]
    fn redeemers_both_forms_roundtrip() {
        let redeemer = Redeemer {
            tag: RedeemerTag::Spend,
            index: 0,
            data: PlutusData::unit(),
            ex_units: ExUnits::new(1_000_000, 1_000_000),
        };

        let as_list = Redeemers::List(vec![redeemer.clone()]);
        assert_eq!(roundtrip(&as_list), as_list);

        let mut map = BTreeMap::new();
        map.insert(
            RedeemersKey {
                tag: RedeemerTag::Spend,
                index: 0,
            },
            RedeemersValue {
                data: PlutusData::unit(),
                ex_units: ExUnits::new(1_000_000, 1_000_000),
            },
        );
        let as_map = Redeemers::Map(map);
        assert_eq!(roundtrip(&as_map), as_map);

        assert_eq!(as_list.to_list(), as_map.to_list());
    }

    #[test]
    fn transaction_id_ignores_insertion_order() {
        let mut mint_a = Mint::new();
        crate::mint_add(&mut mint_a, Hash::new([1; 28]), crate::AssetName::new(b"b".to_vec()).unwrap(), 1);
        crate::mint_add(&mut mint_a, Hash::new([1; 28]), crate::AssetName::new(b"a".to_vec()).unwrap(), 2);

        let mut mint_b = Mint::new();
        crate::mint_add(&mut mint_b, Hash::new([1; 28]), crate::AssetName::new(b"a".to_vec()).unwrap(), 2);
        crate::mint_add(&mut mint_b, Hash::new([1; 28]), crate::AssetName::new(b"b".to_vec()).unwrap(), 1);

        let body_a = TransactionBody {
            inputs: vec![input(1, 0)].into(),
            outputs: vec![legacy_output(1)],
            mint: Some(mint_a),
            ..Default::default()
        };

        let body_b = TransactionBody {
            inputs: vec![input(1, 0)].into(),
            outputs: vec![legacy_output(1)],
            mint: Some(mint_b),
            ..Default::default()
        };

        assert_eq!(body_a.hash(), body_b.hash());
    }
}
