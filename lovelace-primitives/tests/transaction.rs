use std::collections::BTreeMap;

use lovelace_codec::minicbor;
use lovelace_codec::utils::{CborWrap, Nullable};
use lovelace_primitives::*;

fn roundtrip<T>(value: &T) -> T
where
    T: minicbor::Encode<()> + for<'b> minicbor::Decode<'b, ()>,
{
    let bytes = minicbor::to_vec(value).unwrap();
    minicbor::decode(&bytes).unwrap()
}

fn keyhash(fill: u8) -> Hash<28> {
    Hash::new([fill; 28])
}

fn txid(fill: u8) -> Hash<32> {
    Hash::new([fill; 32])
}

fn enterprise_address(fill: u8) -> Bytes {
    let mut bytes = vec![0x60];
    bytes.extend_from_slice(&[fill; 28]);
    bytes.into()
}

fn asset_name(name: &[u8]) -> AssetName {
    AssetName::new(name.to_vec()).unwrap()
}

fn sample_body() -> TransactionBody {
    let mut mint = Mint::new();
    mint_add(&mut mint, keyhash(9), asset_name(b"Roadster"), 100);
    mint_add(&mut mint, keyhash(9), asset_name(b"Spent"), -4);

    let mut withdrawals = Withdrawals::new();
    let mut account = vec![0xe0];
    account.extend_from_slice(&[7; 28]);
    withdrawals.insert(account.into(), 1_500_000);

    TransactionBody {
        inputs: vec![
            TransactionInput::new(txid(1), 0),
            TransactionInput::new(txid(2), 3),
        ]
        .into(),
        outputs: vec![
            TransactionOutput::Legacy(LegacyTransactionOutput {
                address: enterprise_address(1),
                amount: Value::Coin(2_000_000),
                datum_hash: None,
            }),
            TransactionOutput::PostAlonzo(PostAlonzoTransactionOutput {
                address: enterprise_address(2),
                value: Value::new(
                    5_000_000,
                    [(keyhash(9), [(asset_name(b"Roadster"), 96u64)].into())].into(),
                ),
                datum_option: Some(DatumOption::Data(CborWrap(PlutusData::unit()))),
                script_ref: Some(CborWrap(ScriptRef::NativeScript(NativeScript::ScriptPubkey(
                    keyhash(3),
                )))),
            }),
        ],
        fee: 172_233,
        ttl: Some(1000),
        certificates: Some(vec![
            Certificate::StakeRegistration(StakeCredential::AddrKeyhash(keyhash(4))),
            Certificate::StakeDelegation(StakeCredential::AddrKeyhash(keyhash(4)), keyhash(5)),
            Certificate::RegDRepCert(StakeCredential::ScriptHash(keyhash(6)), 500_000_000, None),
        ]),
        withdrawals: Some(withdrawals),
        update: None,
        auxiliary_data_hash: Some(txid(8)),
        validity_interval_start: Some(100),
        mint: Some(mint),
        script_data_hash: Some(txid(7)),
        collateral: Some(vec![TransactionInput::new(txid(3), 1)]),
        required_signers: Some(vec![keyhash(1)].into()),
        network_id: Some(NetworkId::Testnet),
        collateral_return: None,
        total_collateral: Some(5_000_000),
        reference_inputs: Some(vec![TransactionInput::new(txid(4), 0)]),
        voting_procedures: None,
        proposal_procedures: None,
        treasury_value: None,
        donation: None,
    }
}

#[test]
fn body_roundtrips() {
    let body = sample_body();
    assert_eq!(roundtrip(&body), body);
}

#[test]
fn full_transaction_roundtrips() {
    let mut redeemer_map = BTreeMap::new();
    redeemer_map.insert(
        RedeemersKey {
            tag: RedeemerTag::Spend,
            index: 0,
        },
        RedeemersValue {
            data: PlutusData::unit(),
            ex_units: ExUnits::new(399882, 175940720),
        },
    );

    let witness_set = WitnessSet {
        vkeywitness: Some(vec![VKeyWitness {
            vkey: vec![0x5a; 32].into(),
            signature: vec![0xa5; 64].into(),
        }]),
        native_script: Some(vec![NativeScript::ScriptAll(vec![
            NativeScript::ScriptPubkey(keyhash(1)),
            NativeScript::InvalidHereafter(200),
        ])]),
        bootstrap_witness: None,
        plutus_v1_script: Some(vec![PlutusScript::<1>::new(b"some script".to_vec())]),
        plutus_data: Some(vec![PlutusData::unit()]),
        redeemer: Some(Redeemers::Map(redeemer_map)),
        plutus_v2_script: None,
        plutus_v3_script: None,
    };

    let aux = AuxiliaryData::PostAlonzo(PostAlonzoAuxiliaryData {
        metadata: Some(
            vec![(674u64, Metadatum::Text("hello".into()))].into(),
        ),
        ..Default::default()
    });

    let tx = Transaction::new(sample_body(), witness_set, Some(aux));

    assert_eq!(roundtrip(&tx), tx);
}

#[test]
fn transaction_id_is_body_blake2b() {
    let body = sample_body();
    let bytes = minicbor::to_vec(&body).unwrap();

    let expected = lovelace_crypto::hash::Hasher::<256>::hash(&bytes);
    assert_eq!(body.hash(), expected);
}

#[test]
fn absent_auxiliary_data_is_null() {
    let tx = Transaction::new(sample_body(), WitnessSet::default(), None);
    assert_eq!(tx.auxiliary_data, Nullable::Null);

    let bytes = minicbor::to_vec(&tx).unwrap();
    assert_eq!(*bytes.last().unwrap(), 0xf6);
}

#[test]
fn multiasset_entries_sort_canonically_on_the_wire() {
    // policies are fixed-size hashes, so plain lexicographic order rules;
    // asset names sort by length first
    let value = Value::new(
        1,
        [
            (
                keyhash(2),
                [(asset_name(b"bb"), 1u64), (asset_name(b"a"), 1u64)].into(),
            ),
            (keyhash(1), [(asset_name(b"zzz"), 1u64)].into()),
        ]
        .into(),
    );

    let bytes = minicbor::to_vec(&value).unwrap();

    let policy1 = bytes
        .windows(28)
        .position(|w| w == [1u8; 28])
        .expect("policy 1 present");
    let policy2 = bytes
        .windows(28)
        .position(|w| w == [2u8; 28])
        .expect("policy 2 present");
    assert!(policy1 < policy2);

    let a = bytes.windows(1).position(|w| w == b"a").unwrap();
    let bb = bytes
        .windows(2)
        .position(|w| w == b"bb")
        .expect("bb present");
    assert!(a < bb);
}

#[test]
fn withdrawals_and_certificates_roundtrip_in_body() {
    let body = sample_body();
    let bytes = minicbor::to_vec(&body).unwrap();
    let back: TransactionBody = minicbor::decode(&bytes).unwrap();

    assert_eq!(back.withdrawals, body.withdrawals);
    assert_eq!(back.certificates, body.certificates);
    assert_eq!(back.mint, body.mint);
}
