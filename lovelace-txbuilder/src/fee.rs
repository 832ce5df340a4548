//! Fee and minimum-UTxO calculators

use std::collections::HashSet;

use lovelace_codec::minicbor;
use lovelace_primitives::{Multiasset, TransactionOutput};

use crate::{ChainContext, TxBuilderError};

/// Linear fee plus the execution price of the supplied budget
///
/// `a * size + b`, with `ceil(steps * price_step)` and
/// `ceil(mem * price_mem)` on top.
pub fn fee(context: &dyn ChainContext, length: u64, exec_steps: u64, exec_mem: u64) -> u64 {
    let pp = context.protocol_param();

    length * pp.min_fee_coefficient
        + pp.min_fee_constant
        + (exec_steps as f64 * pp.price_step).ceil() as u64
        + (exec_mem as f64 * pp.price_mem).ceil() as u64
}

/// The largest fee any single transaction can possibly incur
pub fn max_tx_fee(context: &dyn ChainContext) -> u64 {
    let pp = context.protocol_param();
    fee(context, pp.max_tx_size, pp.max_tx_ex_steps, pp.max_tx_ex_mem)
}

/// Fee for scripts carried by reference inputs, tiered by size
///
/// Each `range`-byte tier costs `multiplier` times the per-byte price of
/// the previous one, starting at `base`.
pub fn tiered_reference_script_fee(
    context: &dyn ChainContext,
    scripts_size: u64,
) -> Result<u64, TxBuilderError> {
    let pp = context.protocol_param();

    if pp.maximum_reference_scripts_size > 0 && scripts_size > pp.maximum_reference_scripts_size {
        return Err(TxBuilderError::InvalidTransaction(format!(
            "reference scripts size {scripts_size} exceeds maximum {}",
            pp.maximum_reference_scripts_size
        )));
    }

    let Some(tiers) = pp.min_fee_reference_scripts else {
        return Ok(0);
    };

    let mut total = 0f64;
    let mut per_byte = tiers.base;
    let mut remaining = scripts_size;

    while remaining > 0 {
        let chunk = remaining.min(tiers.range);
        total += per_byte * chunk as f64;
        remaining -= chunk;
        per_byte *= tiers.multiplier;
    }

    Ok(total.ceil() as u64)
}

/// Heap words occupied by a multi-asset bundle
///
/// Duplicated asset names across policies count once, matching the
/// reference serialization library.
pub fn bundle_size(multi_asset: &Multiasset<u64>) -> u64 {
    let num_policies = multi_asset.len() as u64;
    let mut num_assets = 0u64;
    let mut total_name_len = 0u64;

    let mut seen_names: HashSet<&[u8]> = HashSet::new();

    for assets in multi_asset.values() {
        num_assets += assets.len() as u64;
        for name in assets.keys() {
            if seen_names.insert(name.as_slice()) {
                total_name_len += name.len() as u64;
            }
        }
    }

    let byte_len = num_assets * 12 + total_name_len + num_policies * 28;
    6 + byte_len.div_ceil(8)
}

/// Minimum lovelace for an output under the word-based (pre-Alonzo) rule
pub fn min_lovelace_pre_alonzo(output: &TransactionOutput, context: &dyn ChainContext) -> u64 {
    let pp = context.protocol_param();

    let Some(multi_asset) = output.value().assets() else {
        return pp.min_utxo;
    };

    let utxo_entry_size = 27;
    let data_hash_size = if output.datum_hash().is_some() { 10 } else { 0 };
    let finalized_size = utxo_entry_size + bundle_size(multi_asset) + data_hash_size;

    finalized_size * pp.coins_per_utxo_word
}

/// Minimum lovelace for an output under the byte-based (post-Alonzo) rule:
/// `(160 + serialized size) * coins_per_utxo_byte`
pub fn min_lovelace_post_alonzo(output: &TransactionOutput, context: &dyn ChainContext) -> u64 {
    let pp = context.protocol_param();
    let size = minicbor::to_vec(output).expect("infallible").len() as u64;

    (160 + size) * pp.utxo_byte_cost()
}
