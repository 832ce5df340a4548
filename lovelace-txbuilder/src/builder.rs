use std::collections::{BTreeMap, BTreeSet, HashSet};

use lovelace_addresses::{Address, ShelleyPaymentPart};
use lovelace_codec::minicbor;
use lovelace_crypto::hash::Hash;
use lovelace_primitives::{
    mint_negative, mint_positive, AddrKeyhash, AuxiliaryData, Certificate, Coin, ExUnits,
    LanguageViews, LegacyTransactionOutput, Mint, NativeScript, PlutusData, ProposalProcedure,
    Redeemer, RedeemerTag, Redeemers, RedeemersKey, RedeemersValue, RewardAccount, ScriptData,
    ScriptHash, ScriptRef, Set, Transaction, TransactionBody, TransactionInput, TransactionOutput,
    UTxO, VKeyWitness, Value, VotingProcedure, VotingProcedures, Voter, GovAction, GovActionId,
    Anchor, Vote, WitnessSet, Withdrawals,
};
use lovelace_wallet::{AnySigningKey, KeyEnvelope};

use crate::coinselection::{LargestFirstSelector, RandomImproveMultiAsset, UtxoSelector};
use crate::fee::{fee, min_lovelace_post_alonzo, tiered_reference_script_fee};
use crate::{ChainContext, SelectionError, TxBuilderError};

/// Iteration bound for the fee-tightening loop
const FEE_ROUNDS: usize = 3;

/// Dummy key and signature bytes used to size unsigned transactions.
/// Ed25519 keys and signatures have fixed lengths, so the content never
/// affects the estimate.
const FAKE_VKEY: [u8; 32] = [0x5a; 32];
const FAKE_SIGNATURE: [u8; 64] = [0xa5; 64];

/// A script passed to the builder: either the script itself or a UTxO
/// whose output carries it as a reference script
#[derive(Debug, Clone)]
pub enum ScriptOrRef {
    Script(ScriptRef),
    Reference(UTxO),
}

impl From<NativeScript> for ScriptOrRef {
    fn from(value: NativeScript) -> Self {
        ScriptOrRef::Script(ScriptRef::NativeScript(value))
    }
}

impl From<ScriptRef> for ScriptOrRef {
    fn from(value: ScriptRef) -> Self {
        ScriptOrRef::Script(value)
    }
}

impl From<UTxO> for ScriptOrRef {
    fn from(value: UTxO) -> Self {
        ScriptOrRef::Reference(value)
    }
}

/// A user-supplied redeemer before the builder assigns its ledger index
///
/// Leaving `ex_units` unset asks the builder to estimate the budget through
/// the chain context; setting it pins the budget. The two modes cannot be
/// mixed within one transaction.
#[derive(Debug, Clone)]
pub struct RedeemerWitness {
    pub tag: Option<RedeemerTag>,
    pub data: PlutusData,
    pub ex_units: Option<ExUnits>,
}

impl RedeemerWitness {
    pub fn new(data: PlutusData) -> Self {
        Self {
            tag: None,
            data,
            ex_units: None,
        }
    }

    pub fn pinned(data: PlutusData, ex_units: ExUnits) -> Self {
        Self {
            tag: None,
            data,
            ex_units: Some(ex_units),
        }
    }
}

/// Where a script witness lives once the builder has resolved it
#[derive(Debug, Clone)]
enum ScriptSlot {
    /// not yet located; resolved during build from known UTxOs
    Pending(ScriptHash),
    /// attached to the witness set
    Witness(ScriptRef),
    /// carried by a reference input
    Reference(TransactionInput, ScriptRef),
    /// inline in the very output being spent
    Inline(ScriptRef),
}

impl ScriptSlot {
    fn script_hash(&self) -> ScriptHash {
        match self {
            ScriptSlot::Pending(hash) => *hash,
            ScriptSlot::Witness(s) => s.script_hash(),
            ScriptSlot::Reference(_, s) => s.script_hash(),
            ScriptSlot::Inline(s) => s.script_hash(),
        }
    }

    fn script(&self) -> Option<&ScriptRef> {
        match self {
            ScriptSlot::Pending(_) => None,
            ScriptSlot::Witness(s) | ScriptSlot::Reference(_, s) | ScriptSlot::Inline(s) => {
                Some(s)
            }
        }
    }
}

#[derive(Debug, Clone)]
struct SpendWitness {
    utxo: UTxO,
    script: ScriptSlot,
    datum: Option<PlutusData>,
    redeemer: Option<RedeemerWitness>,
}

#[derive(Debug, Clone)]
struct PolicyWitness {
    script: ScriptSlot,
    redeemer: Option<RedeemerWitness>,
}

/// Builds a wire-shaped output paying a value to an address
pub fn pay_to_address(address: &Address, value: Value) -> TransactionOutput {
    TransactionOutput::Legacy(LegacyTransactionOutput {
        address: address.to_vec().into(),
        amount: value,
        datum_hash: None,
    })
}

/// Staged transaction state plus the balancing logic that turns it into a
/// finalized body
pub struct TransactionBuilder<'a> {
    context: &'a dyn ChainContext,
    utxo_selectors: Vec<Box<dyn UtxoSelector>>,

    /// inputs pinned by the user
    pub inputs: Vec<UTxO>,
    /// candidate inputs handed directly to selection
    pub potential_inputs: Vec<UTxO>,
    /// inputs never to be selected
    pub excluded_inputs: Vec<UTxO>,
    input_addresses: Vec<String>,

    outputs: Vec<TransactionOutput>,
    fee: Coin,

    pub ttl: Option<u64>,
    pub validity_start: Option<u64>,
    pub mint: Mint,
    pub native_scripts: Vec<NativeScript>,
    pub certificates: Vec<Certificate>,
    pub withdrawals: Withdrawals,
    pub auxiliary_data: Option<AuxiliaryData>,
    pub required_signers: Vec<AddrKeyhash>,
    pub collaterals: Vec<UTxO>,
    pub collateral_return_threshold: u64,
    /// emit redeemers in the Chang-era map shape instead of the older list
    pub use_redeemer_map: bool,

    reference_inputs: BTreeSet<TransactionInput>,
    reference_scripts: Vec<ScriptRef>,

    spend_witnesses: Vec<SpendWitness>,
    mint_witnesses: Vec<PolicyWitness>,
    cert_witnesses: Vec<PolicyWitness>,
    withdrawal_witnesses: Vec<PolicyWitness>,

    votes: VotingProcedures,
    proposals: Vec<ProposalProcedure>,

    collateral_return: Option<TransactionOutput>,
    total_collateral: Option<Coin>,
}

impl<'a> TransactionBuilder<'a> {
    pub fn new(context: &'a dyn ChainContext) -> Self {
        Self::with_selectors(
            context,
            vec![
                Box::new(RandomImproveMultiAsset::new()),
                Box::new(LargestFirstSelector),
            ],
        )
    }

    pub fn with_selectors(
        context: &'a dyn ChainContext,
        utxo_selectors: Vec<Box<dyn UtxoSelector>>,
    ) -> Self {
        Self {
            context,
            utxo_selectors,
            inputs: vec![],
            potential_inputs: vec![],
            excluded_inputs: vec![],
            input_addresses: vec![],
            outputs: vec![],
            fee: 0,
            ttl: None,
            validity_start: None,
            mint: Mint::new(),
            native_scripts: vec![],
            certificates: vec![],
            withdrawals: Withdrawals::new(),
            auxiliary_data: None,
            required_signers: vec![],
            collaterals: vec![],
            collateral_return_threshold: 1_000_000,
            use_redeemer_map: true,
            reference_inputs: BTreeSet::new(),
            reference_scripts: vec![],
            spend_witnesses: vec![],
            mint_witnesses: vec![],
            cert_witnesses: vec![],
            withdrawal_witnesses: vec![],
            votes: VotingProcedures::new(),
            proposals: vec![],
            collateral_return: None,
            total_collateral: None,
        }
    }

    /// Pin a UTxO into the transaction inputs
    pub fn add_input(&mut self, utxo: UTxO) -> &mut Self {
        self.inputs.push(utxo);
        self
    }

    /// Mark an address whose UTxOs may be pulled on demand during selection
    pub fn add_input_address(&mut self, address: impl Into<String>) -> &mut Self {
        self.input_addresses.push(address.into());
        self
    }

    /// Append an output
    pub fn add_output(&mut self, output: TransactionOutput) -> &mut Self {
        self.outputs.push(output);
        self
    }

    /// Include an input that is only read, never consumed
    pub fn add_reference_input(&mut self, input: TransactionInput) -> &mut Self {
        self.reference_inputs.insert(input);
        self
    }

    fn check_ex_units_mode(&self, incoming: &RedeemerWitness) -> Result<(), TxBuilderError> {
        let pinned = incoming.ex_units.is_some();

        for existing in self.all_redeemer_witnesses() {
            if existing.ex_units.is_some() != pinned {
                return Err(TxBuilderError::InvalidArgument(
                    "cannot mix pinned execution units with estimated ones".into(),
                ));
            }
        }

        Ok(())
    }

    fn coerce_tag(
        redeemer: &mut RedeemerWitness,
        expected: RedeemerTag,
    ) -> Result<(), TxBuilderError> {
        match redeemer.tag {
            None => {
                redeemer.tag = Some(expected);
                Ok(())
            }
            Some(tag) if tag == expected => Ok(()),
            Some(tag) => Err(TxBuilderError::InvalidArgument(format!(
                "expected {expected:?} redeemer, got {tag:?}"
            ))),
        }
    }

    /// Register a UTxO spent under a script.
    ///
    /// The script may be passed directly, carried by a reference UTxO,
    /// inline in the spent output itself, or omitted to be located among
    /// the UTxOs of the known input addresses during build.
    pub fn add_script_input(
        &mut self,
        utxo: UTxO,
        script: Option<ScriptOrRef>,
        datum: Option<PlutusData>,
        redeemer: Option<RedeemerWitness>,
    ) -> Result<&mut Self, TxBuilderError> {
        let address = Address::from_bytes(utxo.output.address())?;

        let payment_hash = match &address {
            Address::Shelley(shelley) => match shelley.payment() {
                ShelleyPaymentPart::Script(hash) => *hash,
                ShelleyPaymentPart::Key(_) => {
                    return Err(TxBuilderError::InvalidArgument(
                        "expect the payment part of the address to be a script hash".into(),
                    ))
                }
            },
            _ => {
                return Err(TxBuilderError::InvalidArgument(
                    "expect a shelley script address".into(),
                ))
            }
        };

        if utxo.output.inline_datum().is_some() && datum.is_some() {
            return Err(TxBuilderError::InvalidArgument(
                "datum is already inline in the UTxO, explicit datum not allowed".into(),
            ));
        }

        if let (Some(expected), Some(datum)) = (utxo.output.datum_hash(), &datum) {
            if datum.hash() != *expected {
                return Err(TxBuilderError::InvalidArgument(format!(
                    "datum hash mismatch: output expects {expected}, datum hashes to {}",
                    datum.hash()
                )));
            }
        }

        let slot = match script {
            Some(ScriptOrRef::Script(script)) => {
                if script.script_hash() != payment_hash {
                    return Err(TxBuilderError::InvalidArgument(format!(
                        "script hash {} does not match address payment part {payment_hash}",
                        script.script_hash()
                    )));
                }
                ScriptSlot::Witness(script)
            }
            Some(ScriptOrRef::Reference(reference)) => self.attach_reference(reference, payment_hash)?,
            None => match utxo.output.script_ref() {
                Some(script) if script.script_hash() == payment_hash => {
                    ScriptSlot::Inline(script.clone())
                }
                _ => ScriptSlot::Pending(payment_hash),
            },
        };

        let redeemer = match redeemer {
            Some(mut redeemer) => {
                Self::coerce_tag(&mut redeemer, RedeemerTag::Spend)?;
                self.check_ex_units_mode(&redeemer)?;
                Some(redeemer)
            }
            None => {
                if !matches!(slot.script(), Some(ScriptRef::NativeScript(_))) {
                    return Err(TxBuilderError::InvalidArgument(
                        "spending a plutus script input requires a redeemer".into(),
                    ));
                }
                None
            }
        };

        self.inputs.push(utxo.clone());
        self.spend_witnesses.push(SpendWitness {
            utxo,
            script: slot,
            datum,
            redeemer,
        });

        Ok(self)
    }

    fn attach_reference(
        &mut self,
        reference: UTxO,
        expected_hash: ScriptHash,
    ) -> Result<ScriptSlot, TxBuilderError> {
        let script = reference.output.script_ref().cloned().ok_or_else(|| {
            TxBuilderError::InvalidArgument(
                "reference UTxO does not carry an inline script".into(),
            )
        })?;

        if script.script_hash() != expected_hash {
            return Err(TxBuilderError::InvalidArgument(format!(
                "reference script hash {} does not match expected {expected_hash}",
                script.script_hash()
            )));
        }

        self.reference_inputs.insert(reference.input.clone());
        self.reference_scripts.push(script.clone());

        Ok(ScriptSlot::Reference(reference.input, script))
    }

    fn add_policy_witness(
        &mut self,
        script: ScriptOrRef,
        redeemer: Option<RedeemerWitness>,
        tag: RedeemerTag,
    ) -> Result<PolicyWitness, TxBuilderError> {
        let slot = match script {
            ScriptOrRef::Script(script) => ScriptSlot::Witness(script),
            ScriptOrRef::Reference(reference) => {
                let script = reference.output.script_ref().cloned().ok_or_else(|| {
                    TxBuilderError::InvalidArgument(
                        "reference UTxO does not carry an inline script".into(),
                    )
                })?;

                self.reference_inputs.insert(reference.input.clone());
                self.reference_scripts.push(script.clone());

                ScriptSlot::Reference(reference.input, script)
            }
        };

        let redeemer = match redeemer {
            Some(mut redeemer) => {
                Self::coerce_tag(&mut redeemer, tag)?;
                self.check_ex_units_mode(&redeemer)?;
                Some(redeemer)
            }
            None => None,
        };

        Ok(PolicyWitness {
            script: slot,
            redeemer,
        })
    }

    /// Register a script authorizing an entry of the mint field
    pub fn add_minting_script(
        &mut self,
        script: impl Into<ScriptOrRef>,
        redeemer: Option<RedeemerWitness>,
    ) -> Result<&mut Self, TxBuilderError> {
        let witness = self.add_policy_witness(script.into(), redeemer, RedeemerTag::Mint)?;
        self.mint_witnesses.push(witness);
        Ok(self)
    }

    /// Register a script backing a certificate's script credential
    pub fn add_certificate_script(
        &mut self,
        script: impl Into<ScriptOrRef>,
        redeemer: Option<RedeemerWitness>,
    ) -> Result<&mut Self, TxBuilderError> {
        let witness = self.add_policy_witness(script.into(), redeemer, RedeemerTag::Cert)?;
        self.cert_witnesses.push(witness);
        Ok(self)
    }

    /// Register a script backing a withdrawal's script reward account
    pub fn add_withdrawal_script(
        &mut self,
        script: impl Into<ScriptOrRef>,
        redeemer: Option<RedeemerWitness>,
    ) -> Result<&mut Self, TxBuilderError> {
        let witness = self.add_policy_witness(script.into(), redeemer, RedeemerTag::Reward)?;
        self.withdrawal_witnesses.push(witness);
        Ok(self)
    }

    /// Append a voting procedure
    pub fn add_vote(
        &mut self,
        voter: Voter,
        gov_action_id: GovActionId,
        vote: Vote,
        anchor: Option<Anchor>,
    ) -> &mut Self {
        self.votes
            .entry(voter)
            .or_default()
            .insert(gov_action_id, VotingProcedure { vote, anchor });
        self
    }

    /// Append a governance proposal procedure
    pub fn add_proposal(
        &mut self,
        deposit: Coin,
        reward_account: RewardAccount,
        gov_action: GovAction,
        anchor: Anchor,
    ) -> &mut Self {
        self.proposals.push(ProposalProcedure {
            deposit,
            reward_account,
            gov_action,
            anchor,
        });
        self
    }

    // ----- build internals

    fn all_redeemer_witnesses(&self) -> impl Iterator<Item = &RedeemerWitness> {
        self.spend_witnesses
            .iter()
            .filter_map(|w| w.redeemer.as_ref())
            .chain(self.mint_witnesses.iter().filter_map(|w| w.redeemer.as_ref()))
            .chain(self.cert_witnesses.iter().filter_map(|w| w.redeemer.as_ref()))
            .chain(
                self.withdrawal_witnesses
                    .iter()
                    .filter_map(|w| w.redeemer.as_ref()),
            )
    }

    fn should_estimate_execution_units(&self) -> bool {
        let mut any = false;

        for witness in self.all_redeemer_witnesses() {
            if witness.ex_units.is_some() {
                return false;
            }
            any = true;
        }

        any
    }

    /// Fetch the spendable UTxOs of every registered input address, once
    fn address_utxos(&self) -> Result<Vec<UTxO>, TxBuilderError> {
        let mut fetched = vec![];

        for address in &self.input_addresses {
            fetched.extend(self.context.utxos(address)?);
        }

        Ok(fetched)
    }

    /// Locate scripts registered without a source among the known UTxOs
    fn resolve_pending_scripts(&mut self, known: &[UTxO]) -> Result<(), TxBuilderError> {
        let mut resolutions: Vec<(usize, UTxO, ScriptRef)> = vec![];

        for (position, witness) in self.spend_witnesses.iter().enumerate() {
            if let ScriptSlot::Pending(wanted) = &witness.script {
                let found = known.iter().find_map(|candidate| {
                    candidate
                        .output
                        .script_ref()
                        .filter(|script| script.script_hash() == *wanted)
                        .map(|script| (candidate.clone(), script.clone()))
                });

                match found {
                    Some((candidate, script)) => {
                        resolutions.push((position, candidate, script))
                    }
                    None => {
                        return Err(TxBuilderError::InvalidArgument(format!(
                            "cannot find script {wanted} among known UTxOs"
                        )))
                    }
                }
            }
        }

        for (position, candidate, script) in resolutions {
            self.reference_inputs.insert(candidate.input.clone());
            self.reference_scripts.push(script.clone());
            self.spend_witnesses[position].script =
                ScriptSlot::Reference(candidate.input, script);
        }

        Ok(())
    }

    /// Sorted mint policy ids, the order redeemer indexes refer to
    fn sorted_mint_policies(&self) -> Vec<ScriptHash> {
        self.mint.keys().copied().collect()
    }

    /// All redeemers with their ledger-defined indexes
    fn build_redeemers(&self, strict: bool) -> Result<Vec<Redeemer>, TxBuilderError> {
        let mut redeemers: Vec<Redeemer> = vec![];

        let mut push = |tag, index: Option<usize>, witness: &RedeemerWitness| {
            match index {
                Some(index) => {
                    redeemers.push(Redeemer {
                        tag,
                        index: index as u32,
                        data: witness.data.clone(),
                        ex_units: witness.ex_units.unwrap_or_default(),
                    });
                    Ok(())
                }
                None if !strict => {
                    redeemers.push(Redeemer {
                        tag,
                        index: 0,
                        data: witness.data.clone(),
                        ex_units: witness.ex_units.unwrap_or_default(),
                    });
                    Ok(())
                }
                None => Err(TxBuilderError::Builder(format!(
                    "cannot locate the target of a {tag:?} redeemer"
                ))),
            }
        };

        for witness in &self.spend_witnesses {
            if let Some(redeemer) = &witness.redeemer {
                let index = self
                    .inputs
                    .iter()
                    .position(|u| u.input == witness.utxo.input);
                push(RedeemerTag::Spend, index, redeemer)?;
            }
        }

        let policies = self.sorted_mint_policies();
        for witness in &self.mint_witnesses {
            if let Some(redeemer) = &witness.redeemer {
                let hash = witness.script.script_hash();
                let index = policies.iter().position(|p| *p == hash);
                push(RedeemerTag::Mint, index, redeemer)?;
            }
        }

        for witness in &self.cert_witnesses {
            if let Some(redeemer) = &witness.redeemer {
                let hash = witness.script.script_hash();
                let index = self.certificates.iter().position(|cert| {
                    cert.stake_credential()
                        .map(|cred| cred.is_script() && *cred.as_hash() == hash)
                        .unwrap_or(false)
                });
                push(RedeemerTag::Cert, index, redeemer)?;
            }
        }

        let accounts: Vec<&RewardAccount> = self.withdrawals.keys().collect();
        for witness in &self.withdrawal_witnesses {
            if let Some(redeemer) = &witness.redeemer {
                let hash = witness.script.script_hash();
                let index = accounts
                    .iter()
                    .position(|account| account.len() == 29 && account[1..] == hash[..]);
                push(RedeemerTag::Reward, index, redeemer)?;
            }
        }

        redeemers.sort_by_key(|r| (r.tag, r.index));

        Ok(redeemers)
    }

    fn redeemers_collection(&self, redeemers: Vec<Redeemer>) -> Redeemers {
        if self.use_redeemer_map {
            let map: BTreeMap<RedeemersKey, RedeemersValue> = redeemers
                .into_iter()
                .map(|r| {
                    (
                        RedeemersKey {
                            tag: r.tag,
                            index: r.index,
                        },
                        RedeemersValue {
                            data: r.data,
                            ex_units: r.ex_units,
                        },
                    )
                })
                .collect();
            Redeemers::Map(map)
        } else {
            Redeemers::List(redeemers)
        }
    }

    fn datums(&self) -> Vec<PlutusData> {
        self.spend_witnesses
            .iter()
            .filter_map(|w| w.datum.clone())
            .collect()
    }

    /// Scripts destined for the witness set, split by language
    fn witness_scripts(
        &self,
        remove_dup: bool,
    ) -> (
        Vec<NativeScript>,
        Vec<lovelace_primitives::PlutusScript<1>>,
        Vec<lovelace_primitives::PlutusScript<2>>,
        Vec<lovelace_primitives::PlutusScript<3>>,
    ) {
        let mut native = self.native_scripts.clone();
        let mut v1 = vec![];
        let mut v2 = vec![];
        let mut v3 = vec![];

        let slots = self
            .spend_witnesses
            .iter()
            .map(|w| &w.script)
            .chain(self.mint_witnesses.iter().map(|w| &w.script))
            .chain(self.cert_witnesses.iter().map(|w| &w.script))
            .chain(self.withdrawal_witnesses.iter().map(|w| &w.script));

        for slot in slots {
            if let ScriptSlot::Witness(script) = slot {
                match script {
                    ScriptRef::NativeScript(s) => native.push(s.clone()),
                    ScriptRef::PlutusV1Script(s) => v1.push(s.clone()),
                    ScriptRef::PlutusV2Script(s) => v2.push(s.clone()),
                    ScriptRef::PlutusV3Script(s) => v3.push(s.clone()),
                }
            }
        }

        if remove_dup {
            fn dedup_by_hash<T>(scripts: Vec<T>, hash: impl Fn(&T) -> ScriptHash) -> Vec<T> {
                let mut seen = HashSet::new();
                scripts
                    .into_iter()
                    .filter(|script| seen.insert(hash(script)))
                    .collect()
            }

            native = dedup_by_hash(native, |s| s.script_hash());
            v1 = dedup_by_hash(v1, |s| s.script_hash());
            v2 = dedup_by_hash(v2, |s| s.script_hash());
            v3 = dedup_by_hash(v3, |s| s.script_hash());
        }

        (native, v1, v2, v3)
    }

    /// Plutus versions involved in this transaction, witness or reference
    fn used_languages(&self) -> BTreeSet<u8> {
        let mut used = BTreeSet::new();

        let slots = self
            .spend_witnesses
            .iter()
            .map(|w| &w.script)
            .chain(self.mint_witnesses.iter().map(|w| &w.script))
            .chain(self.cert_witnesses.iter().map(|w| &w.script))
            .chain(self.withdrawal_witnesses.iter().map(|w| &w.script));

        for slot in slots {
            match slot.script() {
                Some(ScriptRef::PlutusV1Script(_)) => {
                    used.insert(0);
                }
                Some(ScriptRef::PlutusV2Script(_)) => {
                    used.insert(1);
                }
                Some(ScriptRef::PlutusV3Script(_)) => {
                    used.insert(2);
                }
                _ => {}
            }
        }

        used
    }

    fn script_data_hash(&self, strict: bool) -> Result<Option<Hash<32>>, TxBuilderError> {
        let redeemers = self.build_redeemers(strict)?;
        let datums = self.datums();

        if redeemers.is_empty() && datums.is_empty() {
            return Ok(None);
        }

        let pp = self.context.protocol_param();

        let views: LanguageViews = self
            .used_languages()
            .into_iter()
            .filter_map(|lang| pp.cost_models.get(&lang).map(|model| (lang, model.clone())))
            .collect();

        let data = ScriptData {
            redeemers: Some(self.redeemers_collection(redeemers)),
            datums: if datums.is_empty() { None } else { Some(datums) },
            language_views: if views.is_empty() { None } else { Some(views) },
        };

        Ok(Some(data.hash()))
    }

    /// Assemble the witness set from the staged scripts, datums and
    /// redeemers; signatures are added separately
    pub fn build_witness_set(&self, remove_dup_script: bool) -> WitnessSet {
        let (native, v1, v2, v3) = self.witness_scripts(remove_dup_script);
        let datums = self.datums();
        let redeemers = self
            .build_redeemers(false)
            .unwrap_or_default();

        WitnessSet {
            vkeywitness: None,
            native_script: if native.is_empty() { None } else { Some(native) },
            bootstrap_witness: None,
            plutus_v1_script: if v1.is_empty() { None } else { Some(v1) },
            plutus_data: if datums.is_empty() { None } else { Some(datums) },
            redeemer: if redeemers.is_empty() {
                None
            } else {
                Some(self.redeemers_collection(redeemers))
            },
            plutus_v2_script: if v2.is_empty() { None } else { Some(v2) },
            plutus_v3_script: if v3.is_empty() { None } else { Some(v3) },
        }
    }

    // ----- deposits and refunds

    fn total_deposits(&self) -> Coin {
        let pp = self.context.protocol_param();
        let mut total = 0;

        for cert in &self.certificates {
            total += match cert {
                Certificate::StakeRegistration(_) => pp.key_deposit,
                Certificate::Reg(_, coin)
                | Certificate::StakeRegDeleg(_, _, coin)
                | Certificate::VoteRegDeleg(_, _, coin)
                | Certificate::StakeVoteRegDeleg(_, _, _, coin) => *coin,
                Certificate::PoolRegistration { .. } => pp.pool_deposit,
                Certificate::RegDRepCert(_, coin, _) => *coin,
                _ => 0,
            };
        }

        for proposal in &self.proposals {
            total += proposal.deposit;
        }

        total
    }

    fn total_refunds(&self) -> Coin {
        let pp = self.context.protocol_param();
        let mut total = 0;

        for cert in &self.certificates {
            total += match cert {
                Certificate::StakeDeregistration(_) => pp.key_deposit,
                Certificate::UnReg(_, coin) => *coin,
                Certificate::UnRegDRepCert(_, coin) => *coin,
                _ => 0,
            };
        }

        total
    }

    fn withdrawal_total(&self) -> Coin {
        self.withdrawals.values().sum()
    }

    // ----- fee estimation with dummy witnesses

    /// Distinct signers this transaction will need, judged from input
    /// addresses, certificates, withdrawals and explicit signers
    fn estimated_signer_count(&self) -> usize {
        let mut hashes: HashSet<Hash<28>> = HashSet::new();

        for utxo in self.inputs.iter().chain(self.collaterals.iter()) {
            if let Ok(Address::Shelley(shelley)) = Address::from_bytes(utxo.output.address()) {
                if let ShelleyPaymentPart::Key(hash) = shelley.payment() {
                    hashes.insert(*hash);
                }
            }
        }

        for cert in &self.certificates {
            if let Some(cred) = cert.stake_credential() {
                if !cred.is_script() {
                    hashes.insert(*cred.as_hash());
                }
            }
        }

        for account in self.withdrawals.keys() {
            if account.len() == 29 && account[0] & 0xf0 == 0xe0 {
                if let Some(hash) = Hash::from_slice(&account[1..]) {
                    hashes.insert(hash);
                }
            }
        }

        for signer in &self.required_signers {
            hashes.insert(*signer);
        }

        hashes.len()
    }

    fn build_fake_witness_set(&self) -> WitnessSet {
        let mut witness_set = self.build_witness_set(true);

        let fake = VKeyWitness {
            vkey: FAKE_VKEY.to_vec().into(),
            signature: FAKE_SIGNATURE.to_vec().into(),
        };

        let count = self.estimated_signer_count().max(1);
        witness_set.vkeywitness = Some(vec![fake; count]);

        witness_set
    }

    fn build_full_fake_tx(&self) -> Result<Vec<u8>, TxBuilderError> {
        let body = self.build_tx_body(false)?;
        let witness_set = self.build_fake_witness_set();
        let tx = Transaction::new(body, witness_set, self.auxiliary_data.clone());

        let bytes = minicbor::to_vec(&tx).expect("infallible");

        let max_size = self.context.protocol_param().max_tx_size;
        if bytes.len() as u64 > max_size {
            return Err(TxBuilderError::InvalidTransaction(format!(
                "transaction size {} exceeds the maximum of {max_size}",
                bytes.len()
            )));
        }

        Ok(bytes)
    }

    fn estimate_fee(&self) -> Result<Coin, TxBuilderError> {
        let mut units = ExUnits::default();

        for witness in self.all_redeemer_witnesses() {
            let pinned = witness.ex_units.unwrap_or_default();
            units = units.checked_add(&pinned).ok_or_else(|| {
                TxBuilderError::InvalidOperation("execution unit sum overflow".into())
            })?;
        }

        let size = self.build_full_fake_tx()?.len() as u64;
        let mut estimated = fee(self.context, size, units.steps, units.mem);

        let ref_scripts_size: u64 = self
            .reference_scripts
            .iter()
            .map(|script| minicbor::to_vec(script).expect("infallible").len() as u64)
            .sum();

        if ref_scripts_size > 0 {
            estimated += tiered_reference_script_fee(self.context, ref_scripts_size)?;
        }

        Ok(estimated)
    }

    // ----- change handling

    fn provided_amount(&self) -> Value {
        let mut provided = Value::zero();

        for utxo in &self.inputs {
            provided += utxo.output.value().clone();
        }

        provided += Value::new(0, mint_positive(&self.mint));
        provided += Value::from(self.withdrawal_total());
        provided += Value::from(self.total_refunds());

        provided
    }

    fn requested_amount(&self, fees: Coin) -> Value {
        let mut requested = Value::from(fees);

        for output in &self.outputs {
            requested += output.value().clone();
        }

        requested += Value::new(0, mint_negative(&self.mint));
        requested += Value::from(self.total_deposits());

        requested
    }

    /// Split a multi-asset change into bundles that each fit
    /// `max_val_size` when serialized
    fn pack_tokens_for_change(
        &self,
        change_address: &Address,
        change: &Value,
        max_val_size: u64,
    ) -> Vec<lovelace_primitives::Multiasset<u64>> {
        use lovelace_primitives::Multiasset;

        let Some(multi_asset) = change.assets() else {
            return vec![];
        };

        let mut bundles: Vec<Multiasset<u64>> = vec![];
        let mut current = Multiasset::new();

        for (policy, assets) in multi_asset {
            for (name, quantity) in assets {
                current
                    .entry(*policy)
                    .or_default()
                    .insert(name.clone(), *quantity);

                let probe = pay_to_address(
                    change_address,
                    Value::new(change.coin(), current.clone()),
                );
                let size = minicbor::to_vec(probe.value()).expect("infallible").len() as u64;

                if size > max_val_size {
                    // roll back the last addition and open a new bundle
                    let assets_entry = current.get_mut(policy).expect("just inserted");
                    assets_entry.remove(name);
                    if assets_entry.is_empty() {
                        current.remove(policy);
                    }

                    bundles.push(std::mem::take(&mut current));

                    current
                        .entry(*policy)
                        .or_default()
                        .insert(name.clone(), *quantity);
                }
            }
        }

        if !current.is_empty() {
            bundles.push(current);
        }

        bundles
    }

    fn calc_change(
        &self,
        fees: Coin,
        change_address: &Address,
        respect_min_utxo: bool,
    ) -> Result<Vec<TransactionOutput>, TxBuilderError> {
        let requested = self.requested_amount(fees);
        let provided = self.provided_amount();

        let change = provided.checked_sub(&requested).map_err(|_| {
            TxBuilderError::UtxoSelection(SelectionError::InsufficientBalance(format!(
                "inputs cannot cover outputs, fee and deposits; requested {requested:?}, provided {provided:?}"
            )))
        })?;

        if !change.has_assets() {
            let sizing = pay_to_address(change_address, change.clone());

            if respect_min_utxo
                && change.coin() < min_lovelace_post_alonzo(&sizing, self.context)
            {
                return Err(TxBuilderError::UtxoSelection(
                    SelectionError::InsufficientBalance(
                        "not enough ADA left for the change output".into(),
                    ),
                ));
            }

            return Ok(vec![pay_to_address(change_address, change)]);
        }

        let max_val_size = self.context.protocol_param().max_val_size;
        let bundles = self.pack_tokens_for_change(change_address, &change, max_val_size);

        let mut remaining_coin = change.coin();
        let mut outputs = vec![];
        let last = bundles.len().saturating_sub(1);

        for (position, bundle) in bundles.into_iter().enumerate() {
            if position == last {
                let output =
                    pay_to_address(change_address, Value::new(remaining_coin, bundle));

                if respect_min_utxo
                    && remaining_coin < min_lovelace_post_alonzo(&output, self.context)
                {
                    return Err(TxBuilderError::UtxoSelection(
                        SelectionError::InsufficientBalance(
                            "not enough ADA left to hold the change assets".into(),
                        ),
                    ));
                }

                outputs.push(output);
            } else {
                let mut output = pay_to_address(change_address, Value::new(0, bundle));
                let min_coin = min_lovelace_post_alonzo(&output, self.context);

                if respect_min_utxo && remaining_coin < min_coin {
                    return Err(TxBuilderError::UtxoSelection(
                        SelectionError::InsufficientBalance(
                            "not enough ADA left to hold the change assets".into(),
                        ),
                    ));
                }

                output.value_mut().set_coin(min_coin);
                remaining_coin = remaining_coin.saturating_sub(min_coin);
                outputs.push(output);
            }
        }

        Ok(outputs)
    }

    fn add_change_and_fee(
        &mut self,
        change_address: Option<&Address>,
        merge_change: bool,
    ) -> Result<(), TxBuilderError> {
        let original_outputs = self.outputs.clone();

        let merge_index = change_address.and_then(|address| {
            if merge_change {
                let bytes = address.to_vec();
                self.outputs
                    .iter()
                    .position(|output| output.address().as_ref() == bytes.as_slice())
            } else {
                None
            }
        });

        let apply_changes = |builder: &mut Self, changes: Vec<TransactionOutput>| {
            if let (Some(index), 1) = (merge_index, changes.len()) {
                let merged = builder.outputs[index].value().clone()
                    + changes[0].value().clone();
                *builder.outputs[index].value_mut() = merged;
            } else {
                builder.outputs.extend(changes);
            }
        };

        if let Some(address) = change_address {
            for _ in 0..FEE_ROUNDS {
                self.fee = self.estimate_fee()?;
                let changes = self.calc_change(self.fee, address, !merge_change)?;

                apply_changes(self, changes);

                let refined = self.estimate_fee()?;

                if refined == self.fee {
                    return Ok(());
                }

                // fee moved once change entered the picture; retry on the
                // original outputs with the refined fee
                self.fee = refined;
                self.outputs = original_outputs.clone();
                let changes = self.calc_change(self.fee, address, !merge_change)?;
                apply_changes(self, changes);

                if self.estimate_fee()? == self.fee {
                    return Ok(());
                }

                self.outputs = original_outputs.clone();
            }

            // accept the last computed layout
            self.fee = self.estimate_fee()?;
            let changes = self.calc_change(self.fee, address, !merge_change)?;
            apply_changes(self, changes);

            Ok(())
        } else {
            self.fee = self.estimate_fee()?;
            Ok(())
        }
    }

    // ----- collateral

    fn set_collateral_return(
        &mut self,
        collateral_address: Option<&Address>,
    ) -> Result<(), TxBuilderError> {
        let needs_collateral = self
            .all_redeemer_witnesses()
            .next()
            .is_some();

        if !needs_collateral {
            return Ok(());
        }

        let pp = self.context.protocol_param();
        let estimated = self.estimate_fee()?;
        let collateral_amount = (estimated * pp.collateral_percent).div_ceil(100);

        if self.collaterals.is_empty() {
            // pure-ADA UTxOs sitting at key addresses, largest first
            let mut candidates: Vec<UTxO> = self
                .address_utxos()?
                .into_iter()
                .filter(|utxo| !utxo.output.value().has_assets())
                .filter(|utxo| {
                    matches!(
                        Address::from_bytes(utxo.output.address()),
                        Ok(Address::Shelley(shelley))
                            if matches!(shelley.payment(), ShelleyPaymentPart::Key(_))
                    )
                })
                .collect();

            candidates.sort_by_key(|utxo| utxo.output.lovelace());

            let mut total = 0u64;

            while total < collateral_amount {
                if self.collaterals.len() as u64 >= pp.max_collateral_inputs {
                    break;
                }

                let Some(candidate) = candidates.pop() else {
                    break;
                };

                total += candidate.output.lovelace();
                self.collaterals.push(candidate);
            }
        }

        let total: u64 = self
            .collaterals
            .iter()
            .map(|utxo| utxo.output.lovelace())
            .sum();

        if total < collateral_amount {
            return Err(TxBuilderError::Builder(format!(
                "insufficient collateral: need {collateral_amount}, have {total}"
            )));
        }

        let surplus = total - collateral_amount;

        if surplus > self.collateral_return_threshold {
            let address = collateral_address.ok_or_else(|| {
                TxBuilderError::Builder(
                    "a collateral change address is required to return surplus collateral".into(),
                )
            })?;

            let return_output = pay_to_address(address, Value::from(surplus));

            if surplus < min_lovelace_post_alonzo(&return_output, self.context) {
                return Err(TxBuilderError::Builder(format!(
                    "collateral return {surplus} is below its minimum lovelace"
                )));
            }

            self.collateral_return = Some(return_output);
            self.total_collateral = Some(collateral_amount);
        }

        Ok(())
    }

    // ----- execution units

    fn update_execution_units(&mut self) -> Result<(), TxBuilderError> {
        if !self.should_estimate_execution_units() {
            return Ok(());
        }

        let cbor = self.build_full_fake_tx()?;
        let estimates = self.context.evaluate_tx(&cbor)?;

        let input_order: Vec<TransactionInput> =
            self.inputs.iter().map(|u| u.input.clone()).collect();
        let policies = self.sorted_mint_policies();
        let certificates = self.certificates.clone();
        let accounts: Vec<RewardAccount> = self.withdrawals.keys().cloned().collect();

        let patch = |tag: RedeemerTag,
                     index: Option<usize>,
                     witness: &mut RedeemerWitness|
         -> Result<(), TxBuilderError> {
            let index = index.ok_or_else(|| {
                TxBuilderError::Builder(format!("cannot locate the target of a {tag:?} redeemer"))
            })? as u32;

            let key = RedeemersKey { tag, index };

            let units = estimates.get(&key).ok_or_else(|| {
                TxBuilderError::TransactionFailed(format!(
                    "backend did not return execution units for {tag:?}:{index}"
                ))
            })?;

            witness.ex_units = Some(*units);
            Ok(())
        };

        for witness in &mut self.spend_witnesses {
            let input = witness.utxo.input.clone();
            if let Some(redeemer) = &mut witness.redeemer {
                let index = input_order.iter().position(|i| *i == input);
                patch(RedeemerTag::Spend, index, redeemer)?;
            }
        }

        for witness in &mut self.mint_witnesses {
            let hash = witness.script.script_hash();
            if let Some(redeemer) = &mut witness.redeemer {
                let index = policies.iter().position(|p| *p == hash);
                patch(RedeemerTag::Mint, index, redeemer)?;
            }
        }

        for witness in &mut self.cert_witnesses {
            let hash = witness.script.script_hash();
            if let Some(redeemer) = &mut witness.redeemer {
                let index = certificates.iter().position(|cert| {
                    cert.stake_credential()
                        .map(|cred| cred.is_script() && *cred.as_hash() == hash)
                        .unwrap_or(false)
                });
                patch(RedeemerTag::Cert, index, redeemer)?;
            }
        }

        for witness in &mut self.withdrawal_witnesses {
            let hash = witness.script.script_hash();
            if let Some(redeemer) = &mut witness.redeemer {
                let index = accounts
                    .iter()
                    .position(|account| account.len() == 29 && account[1..] == hash[..]);
                patch(RedeemerTag::Reward, index, redeemer)?;
            }
        }

        Ok(())
    }

    // ----- body assembly

    fn build_tx_body(&self, strict: bool) -> Result<TransactionBody, TxBuilderError> {
        let inputs: Set<TransactionInput> = self
            .inputs
            .iter()
            .map(|utxo| utxo.input.clone())
            .collect::<Vec<_>>()
            .into();

        let body = TransactionBody {
            inputs,
            outputs: self.outputs.clone(),
            fee: self.fee,
            ttl: self.ttl,
            certificates: if self.certificates.is_empty() {
                None
            } else {
                Some(self.certificates.clone())
            },
            withdrawals: if self.withdrawals.is_empty() {
                None
            } else {
                Some(self.withdrawals.clone())
            },
            update: None,
            auxiliary_data_hash: self.auxiliary_data.as_ref().map(|aux| aux.hash()),
            validity_interval_start: self.validity_start,
            mint: if self.mint.is_empty() {
                None
            } else {
                Some(self.mint.clone())
            },
            script_data_hash: self.script_data_hash(strict)?,
            collateral: if self.collaterals.is_empty() {
                None
            } else {
                Some(self.collaterals.iter().map(|u| u.input.clone()).collect())
            },
            required_signers: if self.required_signers.is_empty() {
                None
            } else {
                Some(self.required_signers.clone().into())
            },
            network_id: None,
            collateral_return: self.collateral_return.clone(),
            total_collateral: self.total_collateral,
            reference_inputs: if self.reference_inputs.is_empty() {
                None
            } else {
                Some(self.reference_inputs.iter().cloned().collect())
            },
            voting_procedures: if self.votes.is_empty() {
                None
            } else {
                Some(self.votes.clone())
            },
            proposal_procedures: if self.proposals.is_empty() {
                None
            } else {
                Some(self.proposals.clone())
            },
            treasury_value: None,
            donation: None,
        };

        Ok(body)
    }

    /// Difference still missing from the current selection, with the coin
    /// part computed in signed space so over-selection never looks like a
    /// deficit
    fn unfulfilled(&self, requested: &Value, provided: &Value, extra_coin: i128) -> Value {
        let mut missing = lovelace_primitives::Multiasset::new();

        if let Some(wanted) = requested.assets() {
            for (policy, assets) in wanted {
                for (name, quantity) in assets {
                    let have = provided.asset(policy, name);
                    if *quantity > have {
                        missing
                            .entry(*policy)
                            .or_default()
                            .insert(name.clone(), quantity - have);
                    }
                }
            }
        }

        let coin_diff = requested.coin() as i128 - provided.coin() as i128 + extra_coin;
        let coin = coin_diff.max(0) as u64;

        Value::new(coin, missing)
    }

    /// Finalize the transaction body: resolve scripts, select inputs,
    /// assign redeemer indexes, arrange collateral, evaluate execution
    /// units and settle fee and change.
    pub fn build(
        &mut self,
        change_address: Option<&Address>,
        merge_change: bool,
        collateral_change_address: Option<&Address>,
    ) -> Result<TransactionBody, TxBuilderError> {
        let address_utxos = self.address_utxos()?;

        // 1. every script witness must have a concrete source
        let mut known = self.potential_inputs.clone();
        known.extend(self.inputs.iter().cloned());
        known.extend(address_utxos.iter().cloned());
        self.resolve_pending_scripts(&known)?;

        // 2. figure out how much is still missing and let the selectors
        //    cover it
        let mut selected = self.inputs.clone();
        let mut selected_amount = Value::zero();
        for utxo in &selected {
            selected_amount += utxo.output.value().clone();
        }
        selected_amount += Value::new(0, mint_positive(&self.mint));
        selected_amount += Value::from(self.withdrawal_total());
        selected_amount += Value::from(self.total_refunds());

        let can_merge_change = merge_change
            && change_address
                .map(|address| {
                    let bytes = address.to_vec();
                    self.outputs
                        .iter()
                        .any(|output| output.address().as_ref() == bytes.as_slice())
                })
                .unwrap_or(false);

        let requested_amount = self.requested_amount(self.estimate_fee()?);

        let trimmed = selected_amount.trim_to(&requested_amount);

        let min_change_buffer = match (change_address, can_merge_change) {
            (Some(address), false) => min_lovelace_post_alonzo(
                &pay_to_address(address, selected_amount.clone()),
                self.context,
            ) as i128,
            _ => 0,
        };

        let unfulfilled = self.unfulfilled(&requested_amount, &trimmed, min_change_buffer);

        if unfulfilled.coin() > 0 || unfulfilled.has_assets() {
            let mut pool: Vec<UTxO> = vec![];

            for candidate in self
                .potential_inputs
                .iter()
                .chain(address_utxos.iter())
            {
                let already_selected = selected.iter().any(|u| u.input == candidate.input);
                let excluded = self
                    .excluded_inputs
                    .iter()
                    .any(|u| u.input == candidate.input);
                let duplicate = pool.iter().any(|u| u.input == candidate.input);

                if !already_selected && !excluded && !duplicate {
                    pool.push(candidate.clone());
                }
            }

            let request = vec![crate::coinselection::sizing_output(unfulfilled.clone())];

            let mut outcome: Result<Vec<UTxO>, TxBuilderError> = Err(
                TxBuilderError::UtxoSelection(SelectionError::InsufficientBalance(format!(
                    "{unfulfilled:?}"
                ))),
            );

            let context = self.context;
            let selector_count = self.utxo_selectors.len();
            for (position, selector) in self.utxo_selectors.iter_mut().enumerate() {
                match selector.select(pool.clone(), &request, context, None, false, false) {
                    Ok(result) => {
                        outcome = Ok(result.selected);
                        break;
                    }
                    Err(err) if position + 1 < selector_count => {
                        log::warn!("selector failed, trying the next one: {err}");
                    }
                    Err(err) => {
                        outcome = Err(TxBuilderError::UtxoSelection(err));
                    }
                }
            }

            for utxo in outcome? {
                selected_amount += utxo.output.value().clone();
                selected.push(utxo);
            }
        }

        // 3. canonical input order
        selected.sort_by(|a, b| {
            (a.input.transaction_id, a.input.index).cmp(&(b.input.transaction_id, b.input.index))
        });
        self.inputs = selected;

        // 4. budgets for redeemers that asked to be estimated
        self.update_execution_units()?;

        // 5. collateral for any plutus execution
        self.set_collateral_return(collateral_change_address.or(change_address))?;

        // 6. settle fee and change
        self.add_change_and_fee(change_address, merge_change)?;

        // 7. final body, with a size check through the fake transaction
        let body = self.build_tx_body(true)?;
        self.build_full_fake_tx()?;

        Ok(body)
    }

    /// Build and sign in one step.
    ///
    /// Duplicate signing keys are collapsed unless `force_skeys` is set.
    pub fn build_and_sign(
        &mut self,
        signing_keys: &[AnySigningKey],
        change_address: Option<&Address>,
        merge_change: bool,
        force_skeys: bool,
    ) -> Result<Transaction, TxBuilderError> {
        let body = self.build(change_address, merge_change, None)?;
        let body_hash = body.hash();

        let mut witness_set = self.build_witness_set(true);

        let mut seen: HashSet<Vec<u8>> = HashSet::new();
        let mut vkey_witnesses = vec![];

        for key in signing_keys {
            let verification_key = key.to_verification_key();

            if !force_skeys && !seen.insert(verification_key.payload().to_vec()) {
                continue;
            }

            let signature = key
                .sign(body_hash.as_ref())
                .map_err(|e| TxBuilderError::InvalidArgument(format!("unusable signing key: {e}")))?;

            vkey_witnesses.push(VKeyWitness {
                vkey: verification_key.payload().to_vec().into(),
                signature: signature.as_ref().to_vec().into(),
            });
        }

        if !vkey_witnesses.is_empty() {
            witness_set.vkeywitness = Some(vkey_witnesses);
        }

        Ok(Transaction::new(
            body,
            witness_set,
            self.auxiliary_data.clone(),
        ))
    }
}
