use crate::core::{Block, Blockchain, TxOutput};
use crate::error::Result;
use data_encoding::HEXLOWER;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

/// One spendable output: the transaction it came from, its position there,
/// and the output itself.
#[derive(Debug, Clone, Serialize, Deserialize, bincode::Encode, bincode::Decode)]
pub struct Utxo {
    tx_id: Vec<u8>,
    out_index: usize,
    output: TxOutput,
}

impl Utxo {
    pub fn get_tx_id(&self) -> &[u8] {
        self.tx_id.as_slice()
    }

    pub fn get_out_index(&self) -> usize {
        self.out_index
    }

    pub fn get_output(&self) -> &TxOutput {
        &self.output
    }
}

/// Address -> unspent outputs index derived from a chain.
///
/// The index is advanced per mined block with [`UTXOSet::update`] and can be
/// rebuilt from scratch with [`UTXOSet::reindex`]. Reads and writes go
/// through an internal read/write lock, so clones share one index.
#[derive(Clone)]
pub struct UTXOSet {
    blockchain: Blockchain,
    utxos: Arc<RwLock<HashMap<String, Vec<Utxo>>>>,
}

impl UTXOSet {
    /// Build the index for `blockchain` with a full reindex.
    pub fn new(blockchain: Blockchain) -> Result<UTXOSet> {
        let utxo_set = UTXOSet {
            blockchain,
            utxos: Arc::new(RwLock::new(HashMap::new())),
        };
        utxo_set.reindex()?;
        Ok(utxo_set)
    }

    pub fn get_blockchain(&self) -> &Blockchain {
        &self.blockchain
    }

    /// Sum of all unspent output values held by `address`.
    pub fn balance(&self, address: &str) -> i64 {
        let utxos = self.read_utxos();
        utxos
            .get(address)
            .map(|entries| {
                entries
                    .iter()
                    .map(|utxo| utxo.output.get_value())
                    .sum::<i64>()
            })
            .unwrap_or(0)
    }

    /// Snapshot of all unspent outputs held by `address`.
    pub fn find_utxos(&self, address: &str) -> Vec<Utxo> {
        let utxos = self.read_utxos();
        utxos.get(address).cloned().unwrap_or_default()
    }

    /// Walk the address's outputs in stored order, collecting them until the
    /// accumulated value covers `amount`.
    ///
    /// Returns the accumulated value and the selection as a map from hex
    /// transaction ID to output indexes; both are returned even when the
    /// target was not reached, and the caller decides what to do then.
    pub fn find_spendable(&self, address: &str, amount: i64) -> (i64, HashMap<String, Vec<usize>>) {
        let utxos = self.read_utxos();
        let mut selected: HashMap<String, Vec<usize>> = HashMap::new();
        let mut accumulated = 0;

        if let Some(entries) = utxos.get(address) {
            for utxo in entries {
                let txid_hex = HEXLOWER.encode(utxo.tx_id.as_slice());
                selected.entry(txid_hex).or_default().push(utxo.out_index);
                accumulated += utxo.output.get_value();

                if accumulated >= amount {
                    break;
                }
            }
        }

        (accumulated, selected)
    }

    /// Advance the index by one block: inputs of non-coinbase transactions
    /// remove the outputs they spend, then every new output is added under
    /// the address derived from its pubkey hash.
    pub fn update(&self, block: &Block) -> Result<()> {
        let mut utxos = self
            .utxos
            .write()
            .expect("Failed to acquire write lock on UTXO set - this should never happen");
        Self::apply_block(&mut utxos, block);
        Ok(())
    }

    /// Rebuild the whole index by replaying every block in chain order from
    /// an empty map, using the exact same per-block application as
    /// [`UTXOSet::update`].
    pub fn reindex(&self) -> Result<()> {
        let blocks = self.blockchain.blocks();
        let mut utxos = self
            .utxos
            .write()
            .expect("Failed to acquire write lock on UTXO set - this should never happen");

        utxos.clear();
        for block in &blocks {
            Self::apply_block(&mut utxos, block);
        }
        Ok(())
    }

    fn apply_block(utxos: &mut HashMap<String, Vec<Utxo>>, block: &Block) {
        for tx in block.get_transactions() {
            if !tx.is_coinbase() {
                for input in tx.get_inputs() {
                    // The spent output may sit under any address, so every
                    // bucket is filtered
                    for entries in utxos.values_mut() {
                        entries.retain(|utxo| {
                            utxo.tx_id != input.get_prev_txid()
                                || utxo.out_index as i64 != input.get_out_index()
                        });
                    }
                }
            }

            for (out_index, output) in tx.get_outputs().iter().enumerate() {
                let address = HEXLOWER.encode(output.get_pub_key_hash());
                utxos.entry(address).or_default().push(Utxo {
                    tx_id: tx.get_id().to_vec(),
                    out_index,
                    output: output.clone(),
                });
            }
        }
    }

    fn read_utxos(&self) -> std::sync::RwLockReadGuard<'_, HashMap<String, Vec<Utxo>>> {
        self.utxos
            .read()
            .expect("Failed to acquire read lock on UTXO set - this should never happen")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Transaction;
    use crate::wallet::Wallet;

    #[test]
    fn test_genesis_balance() {
        let wallet = Wallet::new();
        let chain = Blockchain::new(1, wallet.get_address()).unwrap();
        let utxo_set = UTXOSet::new(chain).unwrap();

        assert_eq!(utxo_set.balance(wallet.get_address()), 50);

        let utxos = utxo_set.find_utxos(wallet.get_address());
        assert_eq!(utxos.len(), 1);
        assert_eq!(utxos[0].get_out_index(), 0);
        assert_eq!(utxos[0].get_tx_id().len(), 32);
        assert_eq!(utxos[0].get_output().get_value(), 50);
    }

    #[test]
    fn test_unknown_address_is_empty() {
        let wallet = Wallet::new();
        let chain = Blockchain::new(0, wallet.get_address()).unwrap();
        let utxo_set = UTXOSet::new(chain).unwrap();

        assert_eq!(utxo_set.balance("ffffffffffffffffffffffffffffffffffffffff"), 0);
        let (accumulated, selection) =
            utxo_set.find_spendable("ffffffffffffffffffffffffffffffffffffffff", 10);
        assert_eq!(accumulated, 0);
        assert!(selection.is_empty());
    }

    #[test]
    fn test_update_accumulates_coinbase_rewards() {
        let wallet = Wallet::new();
        let chain = Blockchain::new(0, wallet.get_address()).unwrap();
        let utxo_set = UTXOSet::new(chain.clone()).unwrap();

        for i in 0..3 {
            let coinbase_tx =
                Transaction::new_coinbase(wallet.get_address(), &format!("b{i}")).unwrap();
            let (block, _) = chain.mine_and_append(vec![coinbase_tx]).unwrap();
            utxo_set.update(&block).unwrap();
        }

        assert_eq!(utxo_set.balance(wallet.get_address()), 200);
    }

    #[test]
    fn test_find_spendable_stops_at_amount() {
        let wallet = Wallet::new();
        let chain = Blockchain::new(0, wallet.get_address()).unwrap();
        let utxo_set = UTXOSet::new(chain.clone()).unwrap();

        let coinbase_tx = Transaction::new_coinbase(wallet.get_address(), "b1").unwrap();
        let (block, _) = chain.mine_and_append(vec![coinbase_tx]).unwrap();
        utxo_set.update(&block).unwrap();

        // 50 covers the request, so only the first output is selected
        let (accumulated, selection) = utxo_set.find_spendable(wallet.get_address(), 30);
        assert_eq!(accumulated, 50);
        assert_eq!(selection.values().map(|v| v.len()).sum::<usize>(), 1);
    }

    #[test]
    fn test_find_spendable_returns_everything_when_short() {
        let wallet = Wallet::new();
        let chain = Blockchain::new(0, wallet.get_address()).unwrap();
        let utxo_set = UTXOSet::new(chain).unwrap();

        let (accumulated, selection) = utxo_set.find_spendable(wallet.get_address(), 1000);
        assert_eq!(accumulated, 50);
        assert_eq!(selection.values().map(|v| v.len()).sum::<usize>(), 1);
    }

    #[test]
    fn test_spend_moves_balances() {
        let sender = Wallet::new();
        let receiver = Wallet::new();
        let chain = Blockchain::new(0, sender.get_address()).unwrap();
        let utxo_set = UTXOSet::new(chain.clone()).unwrap();

        let mut tx =
            Transaction::new_transfer(sender.get_address(), receiver.get_address(), 30, &utxo_set)
                .unwrap();
        chain.sign_transaction(&mut tx, &sender).unwrap();
        let (block, _) = chain.mine_and_append(vec![tx]).unwrap();
        utxo_set.update(&block).unwrap();

        assert_eq!(utxo_set.balance(sender.get_address()), 20);
        assert_eq!(utxo_set.balance(receiver.get_address()), 30);
    }

    #[test]
    fn test_reindex_is_idempotent_and_matches_updates() {
        let sender = Wallet::new();
        let receiver = Wallet::new();
        let chain = Blockchain::new(0, sender.get_address()).unwrap();
        let utxo_set = UTXOSet::new(chain.clone()).unwrap();

        let mut tx =
            Transaction::new_transfer(sender.get_address(), receiver.get_address(), 30, &utxo_set)
                .unwrap();
        chain.sign_transaction(&mut tx, &sender).unwrap();
        let (block, _) = chain.mine_and_append(vec![tx]).unwrap();
        utxo_set.update(&block).unwrap();

        let sender_balance = utxo_set.balance(sender.get_address());
        let receiver_balance = utxo_set.balance(receiver.get_address());

        utxo_set.reindex().unwrap();
        assert_eq!(utxo_set.balance(sender.get_address()), sender_balance);
        assert_eq!(utxo_set.balance(receiver.get_address()), receiver_balance);

        utxo_set.reindex().unwrap();
        assert_eq!(utxo_set.balance(sender.get_address()), sender_balance);
        assert_eq!(utxo_set.balance(receiver.get_address()), receiver_balance);
    }
}
