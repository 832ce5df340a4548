use std::collections::BTreeMap;

use lovelace_primitives::{
    AssetName, ExUnits, Hash, LegacyTransactionOutput, Multiasset, NetworkId, RedeemerTag,
    RedeemersKey, TransactionId, TransactionInput, TransactionOutput, UTxO, Value,
};
use lovelace_txbuilder::{
    ChainContext, GenesisParameters, ProtocolParameters, TxBuilderError,
};

pub const SENDER: &str = "addr_test1vrm9x2zsux7va6w892g38tvchnzahvcd9tykqf3ygnmwtaqyfg52x";

pub fn policy() -> Hash<28> {
    Hash::new([0x31; 28])
}

pub fn asset(name: &[u8]) -> AssetName {
    AssetName::new(name.to_vec()).unwrap()
}

pub fn address_output(address: &str, value: Value) -> TransactionOutput {
    let address = lovelace_addresses::Address::from_bech32(address).unwrap();

    TransactionOutput::Legacy(LegacyTransactionOutput {
        address: address.to_vec().into(),
        amount: value,
        datum_hash: None,
    })
}

pub fn token_bundle(entries: &[(&[u8], u64)]) -> Multiasset<u64> {
    let mut assets = BTreeMap::new();
    for (name, quantity) in entries {
        assets.insert(asset(name), *quantity);
    }

    let mut bundle = Multiasset::new();
    bundle.insert(policy(), assets);
    bundle
}

/// The canned chain state every scenario runs against: fixed protocol
/// parameters and two UTxOs at the queried address
pub struct FixedChainContext;

impl ChainContext for FixedChainContext {
    fn protocol_param(&self) -> ProtocolParameters {
        ProtocolParameters {
            min_fee_constant: 155381,
            min_fee_coefficient: 44,
            max_block_size: 73728,
            max_tx_size: 16384,
            max_block_header_size: 1100,
            key_deposit: 2_000_000,
            pool_deposit: 500_000_000,
            pool_influence: 0.3,
            monetary_expansion: 0.003,
            treasury_expansion: 0.2,
            decentralization_param: 0.0,
            extra_entropy: None,
            protocol_major_version: 6,
            protocol_minor_version: 0,
            min_utxo: 1_000_000,
            min_pool_cost: 340_000_000,
            price_mem: 0.0577,
            price_step: 0.0000721,
            max_tx_ex_mem: 10_000_000,
            max_tx_ex_steps: 10_000_000_000,
            max_block_ex_mem: 50_000_000,
            max_block_ex_steps: 40_000_000_000,
            max_val_size: 5000,
            collateral_percent: 150,
            max_collateral_inputs: 3,
            coins_per_utxo_word: 34482,
            coins_per_utxo_byte: 0,
            cost_models: BTreeMap::from([(0u8, vec![1i64, 2, 3]), (1u8, vec![4i64, 5, 6])]),
            maximum_reference_scripts_size: 200 * 1024,
            min_fee_reference_scripts: None,
        }
    }

    fn genesis_param(&self) -> GenesisParameters {
        GenesisParameters {
            active_slots_coefficient: 0.05,
            update_quorum: 5,
            max_lovelace_supply: 45_000_000_000_000_000,
            network_magic: 764824073,
            epoch_length: 432000,
            system_start: 1506203091,
            slots_per_kes_period: 129600,
            slot_length: 1,
            max_kes_evolutions: 62,
            security_param: 2160,
        }
    }

    fn network(&self) -> NetworkId {
        NetworkId::Testnet
    }

    fn epoch(&self) -> u64 {
        300
    }

    fn last_block_slot(&self) -> u64 {
        2000
    }

    fn utxos(&self, address: &str) -> Result<Vec<UTxO>, TxBuilderError> {
        let u1 = UTxO::new(
            TransactionInput::new(Hash::new([0x31; 32]), 0),
            address_output(address, Value::Coin(5_000_000)),
        );

        let u2 = UTxO::new(
            TransactionInput::new(Hash::new([0x32; 32]), 1),
            address_output(
                address,
                Value::new(6_000_000, token_bundle(&[(b"Token1", 1), (b"Token2", 2)])),
            ),
        );

        Ok(vec![u1, u2])
    }

    fn submit_tx(&self, cbor: &[u8]) -> Result<TransactionId, TxBuilderError> {
        Ok(lovelace_crypto::hash::Hasher::<256>::hash(cbor))
    }

    fn evaluate_tx(
        &self,
        _cbor: &[u8],
    ) -> Result<BTreeMap<RedeemersKey, ExUnits>, TxBuilderError> {
        Ok(BTreeMap::from([(
            RedeemersKey {
                tag: RedeemerTag::Spend,
                index: 0,
            },
            ExUnits::new(399882, 175940720),
        )]))
    }
}
