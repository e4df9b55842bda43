//! Nullable wallet: builds raw transactions from in-memory BSQ coins.

use dao_governance::{SignedTx, WalletError, WalletService};
use dao_parser::{RawTx, RawTxInput, RawTxOutput};
use dao_types::{TxId, TxOutputKey};
use std::collections::BTreeMap;
use std::sync::{Mutex, PoisonError};

/// Decode a tx built by [`NullWallet`].
pub fn decode_signed_tx(tx: &SignedTx) -> Result<RawTx, bincode::Error> {
    bincode::deserialize(&tx.bytes)
}

#[derive(Default)]
struct WalletState {
    coins: BTreeMap<TxOutputKey, u64>,
    /// Stake outputs, spendable only through `build_spend_tx`.
    locked: BTreeMap<TxOutputKey, u64>,
    next_tx: u64,
    built: Vec<RawTx>,
}

/// A wallet that spends its largest coin for every tx and tracks the change.
///
/// Tx ids are `[seed, counter (8 bytes BE), 0..]`, so two wallets with
/// different seeds never collide.
pub struct NullWallet {
    seed: u8,
    state: Mutex<WalletState>,
}

impl NullWallet {
    pub fn new(seed: u8) -> Self {
        Self {
            seed,
            state: Mutex::new(WalletState::default()),
        }
    }

    pub fn with_coin(seed: u8, coin: TxOutputKey, value: u64) -> Self {
        let wallet = Self::new(seed);
        wallet.add_coin(coin, value);
        wallet
    }

    pub fn add_coin(&self, coin: TxOutputKey, value: u64) {
        self.lock().coins.insert(coin, value);
    }

    pub fn balance(&self) -> u64 {
        self.lock().coins.values().sum()
    }

    pub fn locked(&self) -> u64 {
        self.lock().locked.values().sum()
    }

    /// Raw form of every tx built since the last call, in build order.
    pub fn take_built(&self) -> Vec<RawTx> {
        std::mem::take(&mut self.lock().built)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, WalletState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn next_tx_id(&self, state: &mut WalletState) -> TxId {
        let mut bytes = [0u8; 32];
        bytes[0] = self.seed;
        bytes[1..9].copy_from_slice(&state.next_tx.to_be_bytes());
        state.next_tx += 1;
        TxId::new(bytes)
    }

    /// Spend `input` into `outputs` plus a trailing OP_RETURN output.
    fn build(
        &self,
        state: &mut WalletState,
        input: TxOutputKey,
        outputs: &[u64],
        op_return: &[u8],
    ) -> Result<SignedTx, WalletError> {
        let tx_id = self.next_tx_id(state);
        let mut raw_outputs: Vec<RawTxOutput> = outputs
            .iter()
            .zip(0u32..)
            .map(|(value, index)| RawTxOutput {
                index,
                value: *value,
                address: None,
                op_return_data: None,
            })
            .collect();
        raw_outputs.push(RawTxOutput {
            index: raw_outputs.len() as u32,
            value: 0,
            address: None,
            op_return_data: Some(op_return.to_vec()),
        });
        let raw = RawTx {
            id: tx_id,
            inputs: vec![RawTxInput {
                tx_id: input.tx_id,
                index: input.index,
            }],
            outputs: raw_outputs,
        };
        let bytes = bincode::serialize(&raw).map_err(|e| WalletError::Other(e.to_string()))?;
        state.built.push(raw);
        Ok(SignedTx { tx_id, bytes })
    }
}

fn take_coin(state: &mut WalletState, need: u64) -> Result<(TxOutputKey, u64), WalletError> {
    let (key, value) = state
        .coins
        .iter()
        .max_by_key(|(_, v)| **v)
        .map(|(k, v)| (*k, *v))
        .ok_or(WalletError::InsufficientBsq { need, have: 0 })?;
    if value < need {
        return Err(WalletError::InsufficientBsq { need, have: value });
    }
    state.coins.remove(&key);
    Ok((key, value))
}

impl WalletService for NullWallet {
    fn build_fee_tx(&self, fee: u64, op_return: &[u8]) -> Result<SignedTx, WalletError> {
        let mut state = self.lock();
        let (coin, value) = take_coin(&mut state, fee)?;
        let tx = self.build(&mut state, coin, &[value - fee], op_return)?;
        state.coins.insert(TxOutputKey::new(tx.tx_id, 0), value - fee);
        Ok(tx)
    }

    fn build_issuance_request_tx(
        &self,
        fee: u64,
        requested: u64,
        op_return: &[u8],
    ) -> Result<SignedTx, WalletError> {
        let mut state = self.lock();
        let (coin, value) = take_coin(&mut state, fee)?;
        let tx = self.build(&mut state, coin, &[value - fee, requested], op_return)?;
        state.coins.insert(TxOutputKey::new(tx.tx_id, 0), value - fee);
        Ok(tx)
    }

    fn build_stake_tx(&self, stake: u64, fee: u64, op_return: &[u8]) -> Result<SignedTx, WalletError> {
        let mut state = self.lock();
        let (coin, value) = take_coin(&mut state, stake.saturating_add(fee))?;
        let change = value - stake - fee;
        let tx = self.build(&mut state, coin, &[stake, change], op_return)?;
        state.locked.insert(TxOutputKey::new(tx.tx_id, 0), stake);
        state.coins.insert(TxOutputKey::new(tx.tx_id, 1), change);
        Ok(tx)
    }

    fn build_spend_tx(&self, output: TxOutputKey, op_return: &[u8]) -> Result<SignedTx, WalletError> {
        let mut state = self.lock();
        let value = state
            .locked
            .remove(&output)
            .ok_or(WalletError::OutputNotOwned(output))?;
        let tx = self.build(&mut state, output, &[value], op_return)?;
        state.coins.insert(TxOutputKey::new(tx.tx_id, 0), value);
        Ok(tx)
    }
}
