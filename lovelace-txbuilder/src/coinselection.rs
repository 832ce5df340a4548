//! Coin selection strategies
//!
//! Selectors pick a subset of candidate UTxOs whose combined value covers a
//! set of requested outputs (plus, optionally, the worst-case fee), and
//! report the implied change. Strategies are pluggable; the builder tries
//! them in order until one succeeds.

use lovelace_primitives::{
    LegacyTransactionOutput, Multiasset, TransactionOutput, UTxO, Value,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::fee::{max_tx_fee, min_lovelace_post_alonzo};
use crate::{ChainContext, SelectionError};

/// Outcome of a selection round
#[derive(Debug, Clone)]
pub struct SelectionResult {
    pub selected: Vec<UTxO>,
    pub change: Value,
}

/// A strategy that picks UTxOs to satisfy requested outputs
pub trait UtxoSelector {
    /// Select a subset of `utxos` covering `outputs`.
    ///
    /// With `include_max_fee`, the worst-case transaction fee is added to
    /// the request. With `respect_min_utxo`, additional inputs are pulled
    /// until the implied change output clears its minimum lovelace.
    fn select(
        &mut self,
        utxos: Vec<UTxO>,
        outputs: &[TransactionOutput],
        context: &dyn ChainContext,
        max_input_count: Option<usize>,
        include_max_fee: bool,
        respect_min_utxo: bool,
    ) -> Result<SelectionResult, SelectionError>;
}

/// A placeholder change output used only to size min-UTxO requirements
pub(crate) fn sizing_output(change: Value) -> TransactionOutput {
    TransactionOutput::Legacy(LegacyTransactionOutput {
        address: vec![0u8; 57].into(),
        amount: change,
        datum_hash: None,
    })
}

fn requested_total(
    outputs: &[TransactionOutput],
    context: &dyn ChainContext,
    include_max_fee: bool,
) -> Value {
    let mut total = if include_max_fee {
        Value::from(max_tx_fee(context))
    } else {
        Value::zero()
    };

    for output in outputs {
        total += output.value().clone();
    }

    total
}

fn unfulfilled_diagnostic(requested: &Value, selected: &Value) -> String {
    match requested.checked_sub(selected) {
        Ok(missing) => format!("{missing:?}"),
        Err(_) => format!("requested {requested:?}, selected {selected:?}"),
    }
}

/// Largest-first selection as specified in CIP-2, with the transaction fee
/// taken into consideration
#[derive(Debug, Default, Clone)]
pub struct LargestFirstSelector;

impl LargestFirstSelector {
    fn top_up_for_min_utxo(
        &mut self,
        available: Vec<UTxO>,
        selected: &mut Vec<UTxO>,
        selected_amount: &mut Value,
        total_requested: &Value,
        context: &dyn ChainContext,
        max_input_count: Option<usize>,
    ) -> Result<(), SelectionError> {
        let change = selected_amount
            .checked_sub(total_requested)
            .map_err(|_| SelectionError::Selection("selection accounting underflow".into()))?;

        let min_change = min_lovelace_post_alonzo(&sizing_output(change.clone()), context);

        if change.coin() < min_change {
            let remaining_count = max_input_count.map(|max| max.saturating_sub(selected.len()));

            let additional = self.select(
                available,
                &[sizing_output(Value::from(min_change - change.coin()))],
                context,
                remaining_count,
                false,
                false,
            )?;

            for utxo in additional.selected {
                *selected_amount += utxo.output.value().clone();
                selected.push(utxo);
            }
        }

        Ok(())
    }
}

impl UtxoSelector for LargestFirstSelector {
    fn select(
        &mut self,
        utxos: Vec<UTxO>,
        outputs: &[TransactionOutput],
        context: &dyn ChainContext,
        max_input_count: Option<usize>,
        include_max_fee: bool,
        respect_min_utxo: bool,
    ) -> Result<SelectionResult, SelectionError> {
        let mut available = utxos;
        available.sort_by_key(|utxo| utxo.output.lovelace());

        let total_requested = requested_total(outputs, context, include_max_fee);

        let mut selected: Vec<UTxO> = vec![];
        let mut selected_amount = Value::zero();

        while !total_requested.leq(&selected_amount) {
            let to_add = available.pop().ok_or_else(|| {
                SelectionError::InsufficientBalance(unfulfilled_diagnostic(
                    &total_requested,
                    &selected_amount,
                ))
            })?;

            selected_amount += to_add.output.value().clone();
            selected.push(to_add);

            if let Some(max) = max_input_count {
                if selected.len() > max {
                    return Err(SelectionError::MaxInputCount(max));
                }
            }
        }

        if respect_min_utxo {
            self.top_up_for_min_utxo(
                available,
                &mut selected,
                &mut selected_amount,
                &total_requested,
                context,
                max_input_count,
            )?;
        }

        let change = selected_amount
            .checked_sub(&total_requested)
            .map_err(|_| SelectionError::Selection("selection accounting underflow".into()))?;

        Ok(SelectionResult { selected, change })
    }
}

/// Random-improve selection as specified in CIP-2, extended to
/// multi-assets
///
/// The requested value is split per asset (ADA plus each policy/name
/// pair), each split is satisfied by random draws, and a second phase
/// tries to move every split closer to twice its requested amount without
/// crossing three times.
pub struct RandomImproveMultiAsset {
    sequence: Option<std::vec::IntoIter<usize>>,
    rng: StdRng,
}

impl Default for RandomImproveMultiAsset {
    fn default() -> Self {
        Self::new()
    }
}

impl RandomImproveMultiAsset {
    pub fn new() -> Self {
        Self {
            sequence: None,
            rng: StdRng::from_entropy(),
        }
    }

    /// Replace the RNG with a fixed index sequence, for reproducible tests
    pub fn with_sequence(sequence: Vec<usize>) -> Self {
        Self {
            sequence: Some(sequence.into_iter()),
            rng: StdRng::from_entropy(),
        }
    }

    fn next_index(&mut self, len: usize) -> Result<usize, SelectionError> {
        if len == 0 {
            return Err(SelectionError::InputDepleted);
        }

        match &mut self.sequence {
            Some(sequence) => {
                let index = sequence
                    .next()
                    .ok_or_else(|| SelectionError::Selection("random sequence depleted".into()))?;

                if index >= len {
                    return Err(SelectionError::Selection(format!(
                        "random index {index} out of range"
                    )));
                }

                Ok(index)
            }
            None => Ok(self.rng.gen_range(0..len)),
        }
    }

    /// One single-asset value per component of `value`, ADA first
    fn split_by_asset(value: &Value) -> Vec<Value> {
        let mut splits = vec![Value::Coin(value.coin())];

        if let Some(multi_asset) = value.assets() {
            for (policy, assets) in multi_asset {
                for (name, quantity) in assets {
                    let mut single = Multiasset::new();
                    single
                        .entry(*policy)
                        .or_default()
                        .insert(name.clone(), *quantity);
                    splits.push(Value::new(0, single));
                }
            }
        }

        splits
    }

    /// Magnitude of a single-asset value, for request ordering
    fn single_asset_quantity(value: &Value) -> u64 {
        if value.coin() > 0 {
            value.coin()
        } else {
            value
                .assets()
                .and_then(|ma| ma.values().next())
                .and_then(|assets| assets.values().next())
                .copied()
                .unwrap_or(0)
        }
    }

    /// Signed difference between the single asset of `former` and the
    /// matching component of `latter`
    fn diff_by_former(former: &Value, latter: &Value) -> i128 {
        if former.coin() > 0 {
            former.coin() as i128 - latter.coin() as i128
        } else {
            match former.assets().and_then(|ma| {
                ma.iter()
                    .next()
                    .and_then(|(policy, assets)| assets.keys().next().map(|name| (policy, name)))
            }) {
                Some((policy, name)) => {
                    former.asset(policy, name) as i128 - latter.asset(policy, name) as i128
                }
                None => 0,
            }
        }
    }

    fn random_select_subset(
        &mut self,
        amount: &Value,
        remaining: &mut Vec<UTxO>,
        selected: &mut Vec<UTxO>,
        selected_amount: &mut Value,
    ) -> Result<(), SelectionError> {
        while !amount.leq(selected_amount) {
            if remaining.is_empty() {
                return Err(SelectionError::InputDepleted);
            }

            let index = self.next_index(remaining.len())?;
            let to_add = remaining.remove(index);

            *selected_amount += to_add.output.value().clone();
            selected.push(to_add);
        }

        Ok(())
    }

    #[allow(clippy::too_many_arguments)]
    fn improve(
        &mut self,
        selected: &mut Vec<UTxO>,
        selected_amount: &mut Value,
        mut remaining: Vec<UTxO>,
        ideal: &Value,
        upper_bound: &Value,
        max_input_count: Option<usize>,
    ) -> Result<(), SelectionError> {
        loop {
            if remaining.is_empty() || Self::diff_by_former(ideal, selected_amount) <= 0 {
                // nothing left to draw, or already beyond the ideal
                return Ok(());
            }

            if let Some(max) = max_input_count {
                if selected.len() > max {
                    return Err(SelectionError::MaxInputCount(max));
                }
            }

            let index = self.next_index(remaining.len())?;
            let candidate = remaining.remove(index);

            let attempt = selected_amount.clone() + candidate.output.value().clone();

            let closer = Self::diff_by_former(ideal, &attempt).abs()
                < Self::diff_by_former(ideal, selected_amount).abs();
            let within_bound = Self::diff_by_former(upper_bound, &attempt) >= 0;

            if closer && within_bound {
                *selected_amount = attempt;
                selected.push(candidate);
            }
        }
    }
}

impl UtxoSelector for RandomImproveMultiAsset {
    fn select(
        &mut self,
        utxos: Vec<UTxO>,
        outputs: &[TransactionOutput],
        context: &dyn ChainContext,
        max_input_count: Option<usize>,
        include_max_fee: bool,
        respect_min_utxo: bool,
    ) -> Result<SelectionResult, SelectionError> {
        let mut remaining = utxos;

        let request_sum = requested_total(outputs, context, include_max_fee);

        let mut request_sorted = Self::split_by_asset(&request_sum);
        request_sorted.sort_by_key(|value| std::cmp::Reverse(Self::single_asset_quantity(value)));

        // Phase 1: random selection per asset request
        let mut selected: Vec<UTxO> = vec![];
        let mut selected_amount = Value::zero();

        for request in &request_sorted {
            self.random_select_subset(
                request,
                &mut remaining,
                &mut selected,
                &mut selected_amount,
            )
            .map_err(|err| match err {
                SelectionError::InputDepleted => SelectionError::InsufficientBalance(
                    unfulfilled_diagnostic(&request_sum, &selected_amount),
                ),
                other => other,
            })?;

            if let Some(max) = max_input_count {
                if selected.len() > max {
                    return Err(SelectionError::MaxInputCount(max));
                }
            }
        }

        // Phase 2: improve each request in reverse order
        for request in request_sorted.iter().rev() {
            let ideal = request.clone() + request.clone();
            let upper_bound = ideal.clone() + request.clone();

            let before = selected.len();

            let outcome = self.improve(
                &mut selected,
                &mut selected_amount,
                remaining.clone(),
                &ideal,
                &upper_bound,
                max_input_count,
            );

            match outcome {
                Ok(()) => {}
                // improvement is best-effort; a depleted sequence or pool
                // just stops this round
                Err(SelectionError::MaxInputCount(max)) => {
                    return Err(SelectionError::MaxInputCount(max))
                }
                Err(_) => {}
            }

            let newly_selected: Vec<_> = selected[before..].to_vec();
            remaining.retain(|utxo| !newly_selected.contains(utxo));
        }

        // Phase 3: min-UTxO top-up, identical to largest-first
        if respect_min_utxo {
            let change = selected_amount
                .checked_sub(&request_sum)
                .map_err(|_| SelectionError::Selection("selection accounting underflow".into()))?;

            let min_change = min_lovelace_post_alonzo(&sizing_output(change.clone()), context);

            if change.coin() < min_change {
                let remaining_count = max_input_count.map(|max| max.saturating_sub(selected.len()));

                let additional = self.select(
                    remaining,
                    &[sizing_output(Value::from(min_change - change.coin()))],
                    context,
                    remaining_count,
                    false,
                    false,
                )?;

                for utxo in additional.selected {
                    selected_amount += utxo.output.value().clone();
                    selected.push(utxo);
                }
            }
        }

        let change = selected_amount
            .checked_sub(&request_sum)
            .map_err(|_| SelectionError::Selection("selection accounting underflow".into()))?;

        Ok(SelectionResult { selected, change })
    }
}
