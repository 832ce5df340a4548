mod common;

use common::{address_output, asset, policy, token_bundle, FixedChainContext, SENDER};

use lovelace_addresses::Address;
use lovelace_primitives::{
    mint_add, Certificate, ExUnits, Hash, NativeScript, PlutusData, PlutusScript, RedeemerTag,
    ScriptRef, StakeCredential, TransactionInput, TransactionOutput, UTxO, Value,
};
use lovelace_txbuilder::{
    pay_to_address, ChainContext, LargestFirstSelector, RandomImproveMultiAsset, RedeemerWitness,
    ScriptOrRef, TransactionBuilder,
};

fn sender_address() -> Address {
    Address::from_bech32(SENDER).unwrap()
}

fn deterministic_builder(
    context: &FixedChainContext,
    sequence: Vec<usize>,
) -> TransactionBuilder<'_> {
    TransactionBuilder::with_selectors(
        context,
        vec![Box::new(RandomImproveMultiAsset::with_sequence(sequence))],
    )
}

fn largest_first_builder(context: &FixedChainContext) -> TransactionBuilder<'_> {
    TransactionBuilder::with_selectors(context, vec![Box::new(LargestFirstSelector)])
}

#[test]
fn simple_ada_send() {
    let context = FixedChainContext;
    let sender = sender_address();

    let mut builder = deterministic_builder(&context, vec![0, 0]);
    builder
        .add_input_address(SENDER)
        .add_output(pay_to_address(&sender, Value::Coin(500_000)));

    let body = builder.build(Some(&sender), false, None).unwrap();

    assert_eq!(
        body.inputs.to_vec(),
        vec![TransactionInput::new(Hash::new([0x31; 32]), 0)]
    );

    assert_eq!(
        body.outputs,
        vec![
            address_output(SENDER, Value::Coin(500_000)),
            address_output(SENDER, Value::Coin(4_334_587)),
        ]
    );

    assert_eq!(body.fee, 165_413);
}

#[test]
fn multi_asset_send() {
    let context = FixedChainContext;
    let sender = sender_address();

    let mut builder = largest_first_builder(&context);
    builder
        .add_input_address(SENDER)
        .add_output(pay_to_address(&sender, Value::Coin(3_000_000)))
        .add_output(pay_to_address(
            &sender,
            Value::new(2_000_000, token_bundle(&[(b"Token1", 1)])),
        ));

    let body = builder.build(Some(&sender), false, None).unwrap();

    assert_eq!(
        body.inputs.to_vec(),
        vec![
            TransactionInput::new(Hash::new([0x31; 32]), 0),
            TransactionInput::new(Hash::new([0x32; 32]), 1),
        ]
    );

    assert_eq!(
        body.outputs,
        vec![
            address_output(SENDER, Value::Coin(3_000_000)),
            address_output(SENDER, Value::new(2_000_000, token_bundle(&[(b"Token1", 1)]))),
            address_output(
                SENDER,
                Value::new(5_827_767, token_bundle(&[(b"Token2", 2)]))
            ),
        ]
    );

    assert_eq!(body.fee, 172_233);
}

#[test]
fn exact_fee_no_change() {
    let context = FixedChainContext;
    let sender = sender_address();

    let input_amount = 10_000_000;

    let utxo = UTxO::new(
        TransactionInput::new(Hash::new([0x31; 32]), 0),
        address_output(SENDER, Value::Coin(input_amount)),
    );

    // learn the fee for a single-input single-output transaction
    let mut probe = largest_first_builder(&context);
    probe
        .add_input(utxo.clone())
        .add_output(pay_to_address(&sender, Value::Coin(5_000_000)));
    let fee = probe.build(None, false, None).unwrap().fee;

    assert_eq!(fee, 163_785);

    // spend the input exactly: output plus fee consume the whole UTxO
    let mut builder = largest_first_builder(&context);
    builder
        .add_input(utxo)
        .add_output(pay_to_address(&sender, Value::Coin(input_amount - fee)));

    let body = builder.build(None, false, None).unwrap();

    assert_eq!(body.inputs.len(), 1);
    assert_eq!(body.outputs.len(), 1);
    assert_eq!(body.fee, 163_785);
    assert_eq!(body.outputs[0].lovelace() + body.fee, input_amount);
}

#[test]
fn mint_with_native_script() {
    let context = FixedChainContext;
    let sender = sender_address();

    let vk1 = Hash::new([0x0a; 28]);
    let vk2 = Hash::new([0x0b; 28]);

    let script = NativeScript::ScriptAll(vec![
        NativeScript::InvalidHereafter(123456789),
        NativeScript::InvalidBefore(123456780),
        NativeScript::ScriptPubkey(vk1),
        NativeScript::ScriptAll(vec![
            NativeScript::ScriptPubkey(vk1),
            NativeScript::ScriptPubkey(vk2),
        ]),
    ]);

    let policy_id = script.script_hash();

    let payment_hash = match &sender {
        Address::Shelley(shelley) => *shelley.payment().as_hash(),
        _ => panic!("expected shelley address"),
    };

    let mut builder = largest_first_builder(&context);

    builder.add_input_address(SENDER);

    let mut minted = lovelace_primitives::Multiasset::new();
    minted
        .entry(policy_id)
        .or_default()
        .insert(asset(b"Token1"), 1);

    builder
        .add_output(pay_to_address(&sender, Value::new(3_000_000, minted.clone())))
        .add_minting_script(script.clone(), None)
        .unwrap();

    mint_add(&mut builder.mint, policy_id, asset(b"Token1"), 1);
    builder.ttl = Some(123456789);
    builder.validity_start = Some(1000);
    builder.required_signers.push(payment_hash);

    let body = builder.build(Some(&sender), false, None).unwrap();

    assert_eq!(body.ttl, Some(123456789));
    assert_eq!(body.validity_interval_start, Some(1000));

    let mint = body.mint.as_ref().expect("mint field present");
    assert_eq!(mint[&policy_id][&asset(b"Token1")], 1);

    let signers = body.required_signers.as_ref().expect("required signers");
    assert!(signers.iter().any(|h| *h == payment_hash));

    // the minted token reaches its destination, surplus tokens flow into
    // the change output
    assert_eq!(body.outputs[0].value().asset(&policy_id, &asset(b"Token1")), 1);
    let change = body.outputs.last().unwrap();
    assert_eq!(change.value().asset(&policy(), &asset(b"Token2")), 2);

    // the native script travels in the witness set
    let witness_set = builder.build_witness_set(true);
    assert_eq!(witness_set.native_script, Some(vec![script]));
}

#[test]
fn plutus_script_spend() {
    let context = FixedChainContext;
    let sender = sender_address();

    let plutus_script = PlutusScript::<1>::new(b"dummy test script".to_vec());
    let script_hash = plutus_script.script_hash();

    let script_address = Address::Shelley(lovelace_addresses::ShelleyAddress::new(
        lovelace_addresses::Network::Testnet,
        lovelace_addresses::ShelleyPaymentPart::script_hash(script_hash),
        lovelace_addresses::ShelleyDelegationPart::Null,
    ));

    let datum = PlutusData::unit();

    let script_utxo = UTxO::new(
        TransactionInput::new(Hash::new([0x18; 32]), 0),
        TransactionOutput::Legacy(lovelace_primitives::LegacyTransactionOutput {
            address: script_address.to_vec().into(),
            amount: Value::Coin(10_000_000),
            datum_hash: Some(datum.hash()),
        }),
    );

    let redeemer = RedeemerWitness::pinned(PlutusData::unit(), ExUnits::new(1_000_000, 1_000_000));

    let mut builder = largest_first_builder(&context);
    builder
        .add_script_input(
            script_utxo,
            Some(ScriptOrRef::Script(ScriptRef::PlutusV1Script(
                plutus_script.clone(),
            ))),
            Some(datum.clone()),
            Some(redeemer),
        )
        .unwrap();

    builder
        .add_input_address(SENDER)
        .add_output(pay_to_address(&sender, Value::Coin(5_000_000)));

    let body = builder.build(Some(&sender), false, None).unwrap();

    let witness_set = builder.build_witness_set(true);

    assert_eq!(witness_set.plutus_v1_script, Some(vec![plutus_script]));
    assert_eq!(witness_set.plutus_data, Some(vec![datum]));

    let redeemers = witness_set.redeemer.expect("redeemers present").to_list();
    assert_eq!(redeemers.len(), 1);
    assert_eq!(redeemers[0].tag, RedeemerTag::Spend);
    assert_eq!(redeemers[0].index, 0);
    assert_eq!(redeemers[0].ex_units, ExUnits::new(1_000_000, 1_000_000));

    assert!(body.script_data_hash.is_some());

    // collateral comes from the sender's pure-ADA UTxO, and the sizeable
    // surplus is returned
    let collateral = body.collateral.as_ref().expect("collateral present");
    assert_eq!(collateral.len(), 1);

    let collateral_return = body.collateral_return.as_ref().expect("return present");
    assert!(collateral_return.lovelace() > 1_000_000);
    assert!(body.total_collateral.is_some());
}

#[test]
fn zero_ex_units_are_evaluated() {
    let context = FixedChainContext;
    let sender = sender_address();

    let plutus_script = PlutusScript::<1>::new(b"dummy test script".to_vec());
    let script_hash = plutus_script.script_hash();

    let script_address = Address::Shelley(lovelace_addresses::ShelleyAddress::new(
        lovelace_addresses::Network::Testnet,
        lovelace_addresses::ShelleyPaymentPart::script_hash(script_hash),
        lovelace_addresses::ShelleyDelegationPart::Null,
    ));

    let datum = PlutusData::unit();

    let script_utxo = UTxO::new(
        TransactionInput::new(Hash::new([0x18; 32]), 0),
        TransactionOutput::Legacy(lovelace_primitives::LegacyTransactionOutput {
            address: script_address.to_vec().into(),
            amount: Value::Coin(10_000_000),
            datum_hash: Some(datum.hash()),
        }),
    );

    let mut builder = largest_first_builder(&context);
    builder
        .add_script_input(
            script_utxo,
            Some(ScriptOrRef::Script(ScriptRef::PlutusV1Script(plutus_script))),
            Some(datum),
            Some(RedeemerWitness::new(PlutusData::unit())),
        )
        .unwrap();

    builder
        .add_input_address(SENDER)
        .add_output(pay_to_address(&sender, Value::Coin(5_000_000)));

    builder.build(Some(&sender), false, None).unwrap();

    // the evaluator's budget replaced the zero placeholder
    let redeemers = builder
        .build_witness_set(true)
        .redeemer
        .expect("redeemers present")
        .to_list();

    assert_eq!(redeemers[0].ex_units, ExUnits::new(399882, 175940720));
}

#[test]
fn stake_registration_and_delegation() {
    let context = FixedChainContext;
    let sender = sender_address();

    let stake_credential = StakeCredential::AddrKeyhash(Hash::new([0x31; 28]));
    let pool_hash = Hash::new([0x31; 28]);

    let mut builder = deterministic_builder(&context, vec![0, 0]);
    builder
        .add_input_address(SENDER)
        .add_output(pay_to_address(&sender, Value::Coin(500_000)));

    builder.certificates = vec![
        Certificate::StakeRegistration(stake_credential.clone()),
        Certificate::StakeDelegation(stake_credential.clone(), pool_hash),
    ];

    let body = builder.build(Some(&sender), false, None).unwrap();

    assert_eq!(body.fee, 174_257);

    assert_eq!(
        body.outputs,
        vec![
            address_output(SENDER, Value::Coin(500_000)),
            address_output(SENDER, Value::Coin(2_325_743)),
        ]
    );

    let certificates = body.certificates.as_ref().expect("certificates present");
    assert_eq!(
        certificates,
        &vec![
            Certificate::StakeRegistration(stake_credential.clone()),
            Certificate::StakeDelegation(stake_credential, pool_hash),
        ]
    );

    // wire shape: [[0, [0, h]], [2, [0, h], pool]]
    let bytes = lovelace_codec::minicbor::to_vec(certificates).unwrap();
    assert_eq!(&bytes[0..4], &[0x82, 0x82, 0x00, 0x82]);
}

#[test]
fn pinned_inputs_are_respected() {
    let context = FixedChainContext;
    let sender = sender_address();

    let utxos = context.utxos(SENDER).unwrap();

    let mut builder = deterministic_builder(&context, vec![0, 0]);
    builder
        .add_input_address(SENDER)
        .add_input(utxos[1].clone())
        .add_output(pay_to_address(&sender, Value::Coin(500_000)));

    let body = builder.build(Some(&sender), false, None).unwrap();

    assert!(body
        .inputs
        .iter()
        .any(|input| *input == TransactionInput::new(Hash::new([0x32; 32]), 1)));
}

#[test]
fn conflicting_ex_unit_modes_rejected() {
    let context = FixedChainContext;

    let plutus_script = PlutusScript::<1>::new(b"dummy test script".to_vec());
    let script_hash = plutus_script.script_hash();

    let script_address = Address::Shelley(lovelace_addresses::ShelleyAddress::new(
        lovelace_addresses::Network::Testnet,
        lovelace_addresses::ShelleyPaymentPart::script_hash(script_hash),
        lovelace_addresses::ShelleyDelegationPart::Null,
    ));

    let datum = PlutusData::unit();

    let utxo = |index| {
        UTxO::new(
            TransactionInput::new(Hash::new([0x18; 32]), index),
            TransactionOutput::Legacy(lovelace_primitives::LegacyTransactionOutput {
                address: script_address.to_vec().into(),
                amount: Value::Coin(10_000_000),
                datum_hash: Some(datum.hash()),
            }),
        )
    };

    let mut builder = largest_first_builder(&context);

    builder
        .add_script_input(
            utxo(0),
            Some(ScriptOrRef::Script(ScriptRef::PlutusV1Script(
                plutus_script.clone(),
            ))),
            Some(datum.clone()),
            Some(RedeemerWitness::pinned(
                PlutusData::unit(),
                ExUnits::new(1_000_000, 1_000_000),
            )),
        )
        .unwrap();

    let conflicting = builder.add_script_input(
        utxo(1),
        Some(ScriptOrRef::Script(ScriptRef::PlutusV1Script(plutus_script))),
        Some(datum),
        Some(RedeemerWitness::new(PlutusData::unit())),
    );

    assert!(conflicting.is_err());
}

#[test]
fn wrong_redeemer_tag_rejected() {
    let context = FixedChainContext;

    let script = NativeScript::ScriptPubkey(Hash::new([0x0a; 28]));

    let mut redeemer = RedeemerWitness::pinned(PlutusData::unit(), ExUnits::new(1, 1));
    redeemer.tag = Some(RedeemerTag::Spend);

    let mut builder = largest_first_builder(&context);
    let result = builder.add_minting_script(script, Some(redeemer));

    assert!(result.is_err());
}

#[test]
fn insufficient_balance_surfaces_diagnostic() {
    let context = FixedChainContext;
    let sender = sender_address();

    let mut builder = largest_first_builder(&context);
    builder
        .add_input_address(SENDER)
        .add_output(pay_to_address(&sender, Value::Coin(1_000_000_000)));

    let result = builder.build(Some(&sender), false, None);

    match result {
        Err(lovelace_txbuilder::TxBuilderError::UtxoSelection(err)) => {
            assert!(err.to_string().contains("insufficient"));
        }
        other => panic!("expected selection failure, got {other:?}"),
    }
}

#[test]
fn merge_change_reuses_existing_output() {
    let context = FixedChainContext;
    let sender = sender_address();

    let mut builder = deterministic_builder(&context, vec![0, 0]);
    builder
        .add_input_address(SENDER)
        .add_output(pay_to_address(&sender, Value::Coin(500_000)));

    let body = builder.build(Some(&sender), true, None).unwrap();

    // change merged into the only output instead of a second one
    assert_eq!(body.outputs.len(), 1);
    assert_eq!(body.outputs[0].lovelace() + body.fee, 5_000_000);
}

#[test]
fn selector_fallback_is_attempted() {
    let context = FixedChainContext;
    let sender = sender_address();

    // first selector always runs out of sequence, the second succeeds
    let mut builder = TransactionBuilder::with_selectors(
        &context,
        vec![
            Box::new(RandomImproveMultiAsset::with_sequence(vec![])),
            Box::new(LargestFirstSelector),
        ],
    );

    builder
        .add_input_address(SENDER)
        .add_output(pay_to_address(&sender, Value::Coin(500_000)));

    let body = builder.build(Some(&sender), false, None).unwrap();
    assert!(!body.inputs.is_empty());
}

#[test]
fn excluded_inputs_are_skipped() {
    let context = FixedChainContext;
    let sender = sender_address();

    let utxos = context.utxos(SENDER).unwrap();

    let mut builder = largest_first_builder(&context);
    builder.excluded_inputs.push(utxos[1].clone());
    builder
        .add_input_address(SENDER)
        .add_output(pay_to_address(&sender, Value::Coin(500_000)));

    let body = builder.build(Some(&sender), false, None).unwrap();

    assert_eq!(
        body.inputs.to_vec(),
        vec![TransactionInput::new(Hash::new([0x31; 32]), 0)]
    );
}
