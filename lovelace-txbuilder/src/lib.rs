//! An ergonomic Cardano transaction builder
//!
//! The [`TransactionBuilder`] stages inputs, outputs, scripts, redeemers,
//! certificates and governance actions, then balances the transaction
//! against a [`ChainContext`]: coin selection, fee estimation with dummy
//! witnesses, change splitting, collateral handling and execution-unit
//! evaluation. `build` yields a finalized body; `build_and_sign` also
//! produces the witness set.

mod builder;
mod chain;
mod coinselection;
mod fee;

pub use builder::{pay_to_address, RedeemerWitness, ScriptOrRef, TransactionBuilder};
pub use chain::{ChainContext, FeeReferenceScripts, GenesisParameters, ProtocolParameters};
pub use coinselection::{
    LargestFirstSelector, RandomImproveMultiAsset, SelectionResult, UtxoSelector,
};
pub use fee::{
    bundle_size, fee, max_tx_fee, min_lovelace_post_alonzo, min_lovelace_pre_alonzo,
    tiered_reference_script_fee,
};

use thiserror::Error;

/// Failures raised by the coin selectors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SelectionError {
    #[error("insufficient UTxO balance, unfulfilled amount: {0}")]
    InsufficientBalance(String),

    #[error("max input count {0} exceeded")]
    MaxInputCount(usize),

    #[error("input UTxOs depleted")]
    InputDepleted,

    #[error("selection failed: {0}")]
    Selection(String),
}

/// Failures raised while constructing a transaction
#[derive(Error, Debug)]
pub enum TxBuilderError {
    #[error("error decoding: {0}")]
    Decoding(String),

    #[error("invalid address input: {0}")]
    InvalidAddressInput(#[from] lovelace_addresses::Error),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("invalid operation: {0}")]
    InvalidOperation(String),

    #[error("invalid transaction: {0}")]
    InvalidTransaction(String),

    #[error("transaction builder: {0}")]
    Builder(String),

    #[error("transaction failed: {0}")]
    TransactionFailed(String),

    #[error(transparent)]
    UtxoSelection(#[from] SelectionError),
}
