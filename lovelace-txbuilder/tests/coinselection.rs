mod common;

use common::{address_output, token_bundle, FixedChainContext, SENDER};

use lovelace_primitives::{Hash, TransactionInput, UTxO, Value};
use lovelace_txbuilder::{
    LargestFirstSelector, RandomImproveMultiAsset, SelectionError, UtxoSelector,
};

fn ada_utxo(index: u64, coin: u64) -> UTxO {
    UTxO::new(
        TransactionInput::new(Hash::new([index as u8; 32]), index),
        address_output(SENDER, Value::Coin(coin)),
    )
}

fn candidates() -> Vec<UTxO> {
    (1..=10).map(|i| ada_utxo(i, i * 1_000_000)).collect()
}

#[test]
fn largest_first_pops_largest() {
    let context = FixedChainContext;
    let mut selector = LargestFirstSelector;

    let result = selector
        .select(
            candidates(),
            &[address_output(SENDER, Value::Coin(15_000_000))],
            &context,
            None,
            false,
            false,
        )
        .unwrap();

    // 10M + 9M cover the request
    assert_eq!(result.selected.len(), 2);
    assert_eq!(result.selected[0].output.lovelace(), 10_000_000);
    assert_eq!(result.selected[1].output.lovelace(), 9_000_000);
    assert_eq!(result.change.coin(), 4_000_000);
}

#[test]
fn largest_first_includes_max_fee() {
    let context = FixedChainContext;
    let mut selector = LargestFirstSelector;

    let result = selector
        .select(
            candidates(),
            &[address_output(SENDER, Value::Coin(9_000_000))],
            &context,
            None,
            true,
            false,
        )
        .unwrap();

    // the request alone fits into the largest UTxO, the worst-case fee
    // forces a second one
    assert!(result.selected.len() >= 2);
}

#[test]
fn largest_first_insufficient_balance() {
    let context = FixedChainContext;
    let mut selector = LargestFirstSelector;

    let result = selector.select(
        candidates(),
        &[address_output(SENDER, Value::Coin(1_000_000_000))],
        &context,
        None,
        false,
        false,
    );

    assert!(matches!(
        result,
        Err(SelectionError::InsufficientBalance(_))
    ));
}

#[test]
fn largest_first_max_input_count() {
    let context = FixedChainContext;
    let mut selector = LargestFirstSelector;

    let result = selector.select(
        candidates(),
        &[address_output(SENDER, Value::Coin(25_000_000))],
        &context,
        Some(2),
        false,
        false,
    );

    assert_eq!(result.unwrap_err(), SelectionError::MaxInputCount(2));
}

#[test]
fn largest_first_respects_min_utxo() {
    let context = FixedChainContext;
    let mut selector = LargestFirstSelector;

    // request consumes the largest UTxO almost exactly, so the change
    // would fall under its minimum and another input must be pulled
    let result = selector
        .select(
            candidates(),
            &[address_output(SENDER, Value::Coin(9_999_000))],
            &context,
            None,
            false,
            true,
        )
        .unwrap();

    assert!(result.selected.len() >= 2);

    let min_change = lovelace_txbuilder::min_lovelace_post_alonzo(
        &address_output(SENDER, result.change.clone()),
        &context,
    );
    assert!(result.change.coin() >= min_change);
}

#[test]
fn random_improve_is_deterministic_with_sequence() {
    let context = FixedChainContext;

    let mut first = RandomImproveMultiAsset::with_sequence(vec![3, 0, 0, 0, 0, 0]);
    let mut second = RandomImproveMultiAsset::with_sequence(vec![3, 0, 0, 0, 0, 0]);

    let outputs = [address_output(SENDER, Value::Coin(8_000_000))];

    let a = first
        .select(candidates(), &outputs, &context, None, false, false)
        .unwrap();
    let b = second
        .select(candidates(), &outputs, &context, None, false, false)
        .unwrap();

    let ids =
        |result: &lovelace_txbuilder::SelectionResult| -> Vec<(Hash<32>, u64)> {
            result
                .selected
                .iter()
                .map(|u| (u.input.transaction_id, u.input.index))
                .collect()
        };

    assert_eq!(ids(&a), ids(&b));
}

#[test]
fn random_improve_covers_each_asset() {
    let context = FixedChainContext;
    let mut selector = RandomImproveMultiAsset::new();

    let mut pool = candidates();
    pool.push(UTxO::new(
        TransactionInput::new(Hash::new([0xaa; 32]), 0),
        address_output(
            SENDER,
            Value::new(2_000_000, token_bundle(&[(b"Token1", 5)])),
        ),
    ));

    let outputs = [address_output(
        SENDER,
        Value::new(1_000_000, token_bundle(&[(b"Token1", 3)])),
    )];

    let result = selector
        .select(pool, &outputs, &context, None, false, false)
        .unwrap();

    let token_total: u64 = result
        .selected
        .iter()
        .map(|u| u.output.value().asset(&common::policy(), &common::asset(b"Token1")))
        .sum();

    assert!(token_total >= 3);
    assert_eq!(result.change.asset(&common::policy(), &common::asset(b"Token1")), token_total - 3);
}

#[test]
fn random_improve_exhausted_sequence_fails() {
    let context = FixedChainContext;
    let mut selector = RandomImproveMultiAsset::with_sequence(vec![]);

    let result = selector.select(
        candidates(),
        &[address_output(SENDER, Value::Coin(1_000_000))],
        &context,
        None,
        false,
        false,
    );

    assert!(matches!(result, Err(SelectionError::Selection(_))));
}

#[test]
fn random_improve_insufficient_balance() {
    let context = FixedChainContext;
    let mut selector = RandomImproveMultiAsset::new();

    let result = selector.select(
        candidates(),
        &[address_output(SENDER, Value::Coin(1_000_000_000))],
        &context,
        None,
        false,
        false,
    );

    assert!(matches!(
        result,
        Err(SelectionError::InsufficientBalance(_))
    ));
}
