//! Interfaces through which the builder reads the chain
//!
//! Concrete backends (Blockfrost, Ogmios, a local node) live outside this
//! crate; the builder only ever sees this trait. All calls may block on
//! network I/O, and the library never retries them.

use std::collections::BTreeMap;

use lovelace_primitives::{
    CostModel, ExUnits, NetworkId, RedeemersKey, TransactionId, UTxO,
};

use crate::TxBuilderError;

/// Tier parameters for the reference-script fee introduced in Conway
#[derive(Debug, Clone, PartialEq)]
pub struct FeeReferenceScripts {
    /// per-byte cost of the first tier
    pub base: f64,
    /// tier width in bytes
    pub range: u64,
    /// per-tier cost multiplier
    pub multiplier: f64,
}

/// Cardano protocol parameters
#[derive(Debug, Clone, Default)]
pub struct ProtocolParameters {
    pub min_fee_constant: u64,
    pub min_fee_coefficient: u64,
    pub max_block_size: u64,
    pub max_tx_size: u64,
    pub max_block_header_size: u64,
    pub key_deposit: u64,
    pub pool_deposit: u64,
    pub pool_influence: f64,
    pub monetary_expansion: f64,
    pub treasury_expansion: f64,
    pub decentralization_param: f64,
    pub extra_entropy: Option<String>,
    pub protocol_major_version: u64,
    pub protocol_minor_version: u64,
    pub min_utxo: u64,
    pub min_pool_cost: u64,
    pub price_mem: f64,
    pub price_step: f64,
    pub max_tx_ex_mem: u64,
    pub max_tx_ex_steps: u64,
    pub max_block_ex_mem: u64,
    pub max_block_ex_steps: u64,
    pub max_val_size: u64,
    pub collateral_percent: u64,
    pub max_collateral_inputs: u64,
    pub coins_per_utxo_word: u64,
    pub coins_per_utxo_byte: u64,
    /// cost models keyed by plutus version (0 = V1, 1 = V2, 2 = V3)
    pub cost_models: BTreeMap<u8, CostModel>,
    pub maximum_reference_scripts_size: u64,
    pub min_fee_reference_scripts: Option<FeeReferenceScripts>,
}

impl ProtocolParameters {
    /// The byte price for min-UTxO math. Contexts predating Babbage only
    /// report the word price, which is eight times the byte price.
    pub fn utxo_byte_cost(&self) -> u64 {
        if self.coins_per_utxo_byte > 0 {
            self.coins_per_utxo_byte
        } else {
            self.coins_per_utxo_word / 8
        }
    }
}

/// Cardano genesis parameters
#[derive(Debug, Clone, Default)]
pub struct GenesisParameters {
    pub active_slots_coefficient: f64,
    pub update_quorum: u64,
    pub max_lovelace_supply: u64,
    pub network_magic: u64,
    pub epoch_length: u64,
    pub system_start: u64,
    pub slots_per_kes_period: u64,
    pub slot_length: u64,
    pub max_kes_evolutions: u64,
    pub security_param: u64,
}

/// A read-only view of the chain, plus transaction submission
pub trait ChainContext {
    /// Current protocol parameters
    fn protocol_param(&self) -> ProtocolParameters;

    /// Chain genesis parameters
    fn genesis_param(&self) -> GenesisParameters;

    /// The network this context operates on
    fn network(&self) -> NetworkId;

    /// Current epoch number
    fn epoch(&self) -> u64;

    /// Slot number of the last sealed block
    fn last_block_slot(&self) -> u64;

    /// All UTxOs currently sitting at a bech32 address
    fn utxos(&self, address: &str) -> Result<Vec<UTxO>, TxBuilderError>;

    /// Submit a signed transaction; returns its id on acceptance
    fn submit_tx(&self, cbor: &[u8]) -> Result<TransactionId, TxBuilderError>;

    /// Ask the backend to evaluate the execution units of every redeemer
    /// in the given (provisionally signed) transaction
    fn evaluate_tx(
        &self,
        cbor: &[u8],
    ) -> Result<BTreeMap<RedeemersKey, ExUnits>, TxBuilderError>;
}
