// This file implements the transaction system - the core of how value moves in the chain.
// I'm following Bitcoin's UTXO model: each transaction consumes previous outputs
// and creates new ones, and ownership is proven with ECDSA signatures.

use crate::error::{BlockchainError, Result};
use crate::storage::UTXOSet;
use crate::utils::{current_timestamp, ecdsa_p256_verify, hash_pub_key, sha256_digest};
use crate::wallet::Wallet;
use data_encoding::HEXLOWER;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Fixed mining reward paid by every coinbase output.
pub const COINBASE_REWARD: i64 = 50;

/// Output index carried by the synthetic coinbase input.
pub const COINBASE_INPUT_INDEX: i64 = -1;

// A transaction input references a previous transaction output.
// Think of it as "I want to spend output #2 of transaction ABC123".
#[derive(Debug, Clone, Serialize, Deserialize, bincode::Encode, bincode::Decode)]
pub struct TxInput {
    prev_txid: Vec<u8>, // ID of the transaction containing the output to spend
    out_index: i64,     // Index of that output (-1 for coinbase)
    signature: Vec<u8>, // Signature proving ownership of the referenced output
    pub_key: Vec<u8>,   // Serialized public key the signature verifies against
}

impl TxInput {
    pub fn get_prev_txid(&self) -> &[u8] {
        self.prev_txid.as_slice()
    }

    pub fn get_out_index(&self) -> i64 {
        self.out_index
    }

    pub fn get_signature(&self) -> &[u8] {
        self.signature.as_slice()
    }

    pub fn get_pub_key(&self) -> &[u8] {
        self.pub_key.as_slice()
    }
}

// A transaction output is a "check" that can be cashed later by whoever
// holds the key hashing to pub_key_hash.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, bincode::Encode, bincode::Decode)]
pub struct TxOutput {
    value: i64,            // Amount this output is worth
    pub_key_hash: Vec<u8>, // Hash of the public key allowed to spend it
}

impl TxOutput {
    pub(crate) fn new(value: i64, pub_key_hash: Vec<u8>) -> TxOutput {
        TxOutput {
            value,
            pub_key_hash,
        }
    }

    pub fn get_value(&self) -> i64 {
        self.value
    }

    pub fn get_pub_key_hash(&self) -> &[u8] {
        self.pub_key_hash.as_slice()
    }
}

/// A transfer of value: inputs consuming prior outputs, and new outputs.
#[derive(Debug, Clone, Serialize, Deserialize, bincode::Encode, bincode::Decode)]
pub struct Transaction {
    id: Vec<u8>,          // SHA-256 of the canonical serialization with id cleared
    inputs: Vec<TxInput>, // What is being spent
    outputs: Vec<TxOutput>, // Where the value is going
    timestamp: i64,       // Creation time, part of the hash preimage
}

impl Transaction {
    /// Create a coinbase transaction minting the mining reward to `to`.
    ///
    /// `to` is normally a 40-char hex address; anything that fails to decode
    /// is locked as its raw bytes. `data` rides along in the synthetic input
    /// and defaults to a human-readable reward note.
    pub fn new_coinbase(to: &str, data: &str) -> Result<Transaction> {
        let data = if data.is_empty() {
            format!("Reward to '{to}'")
        } else {
            data.to_string()
        };

        // Coinbase inputs reference nothing; the data rides in the pub_key slot
        let input = TxInput {
            prev_txid: vec![],
            out_index: COINBASE_INPUT_INDEX,
            signature: vec![],
            pub_key: data.into_bytes(),
        };

        let pub_key_hash = HEXLOWER
            .decode(to.as_bytes())
            .unwrap_or_else(|_| to.as_bytes().to_vec());
        let output = TxOutput::new(COINBASE_REWARD, pub_key_hash);

        let mut tx = Transaction {
            id: vec![],
            inputs: vec![input],
            outputs: vec![output],
            timestamp: current_timestamp()?,
        };
        tx.id = tx.hash()?;

        Ok(tx)
    }

    /// Build an unsigned transfer of `amount` from one address to another,
    /// selecting spendable outputs from the UTXO set.
    ///
    /// Inputs carry the sender's decoded address as a placeholder public key
    /// until the transaction is signed. A change output back to `from` is
    /// emitted when the selection overshoots.
    pub fn new_transfer(
        from: &str,
        to: &str,
        amount: i64,
        utxo_set: &UTXOSet,
    ) -> Result<Transaction> {
        if amount <= 0 {
            return Err(BlockchainError::InvalidAmount(amount));
        }

        let from_pub_key_hash = HEXLOWER
            .decode(from.as_bytes())
            .map_err(|_| BlockchainError::InvalidAddress(from.to_string()))?;
        let to_pub_key_hash = HEXLOWER
            .decode(to.as_bytes())
            .map_err(|_| BlockchainError::InvalidAddress(to.to_string()))?;

        let (accumulated, selection) = utxo_set.find_spendable(from, amount);
        if accumulated < amount {
            return Err(BlockchainError::InsufficientFunds {
                required: amount,
                available: accumulated,
            });
        }

        let mut inputs = vec![];
        for (txid_hex, out_indexes) in selection {
            let prev_txid = HEXLOWER.decode(txid_hex.as_bytes()).map_err(|e| {
                BlockchainError::Transaction(format!("Invalid transaction ID: {e}"))
            })?;
            for out_index in out_indexes {
                inputs.push(TxInput {
                    prev_txid: prev_txid.clone(),
                    out_index: out_index as i64,
                    signature: vec![],
                    pub_key: from_pub_key_hash.clone(),
                });
            }
        }

        let mut outputs = vec![TxOutput::new(amount, to_pub_key_hash)];
        let change = accumulated - amount;
        if change > 0 {
            outputs.push(TxOutput::new(change, from_pub_key_hash));
        }

        let mut tx = Transaction {
            id: vec![],
            inputs,
            outputs,
            timestamp: current_timestamp()?,
        };
        tx.id = tx.hash()?;

        Ok(tx)
    }

    /// A coinbase transaction has exactly one input that references nothing.
    pub fn is_coinbase(&self) -> bool {
        self.inputs.len() == 1
            && self.inputs[0].prev_txid.is_empty()
            && self.inputs[0].out_index == COINBASE_INPUT_INDEX
    }

    /// Canonical hash of this transaction: SHA-256 over the canonical
    /// encoding with the `id` field cleared, so the stored ID never feeds
    /// itself.
    pub fn hash(&self) -> Result<Vec<u8>> {
        let mut tx_copy = self.clone();
        tx_copy.id = vec![];
        Ok(sha256_digest(tx_copy.canonical_bytes()?.as_slice()))
    }

    // Transaction IDs and sighashes are defined over this exact encoding;
    // it must stay byte-stable across runs and platforms.
    fn canonical_bytes(&self) -> Result<Vec<u8>> {
        bincode::encode_to_vec(self, bincode::config::standard()).map_err(|e| {
            BlockchainError::Serialization(format!("Failed to encode transaction: {e}"))
        })
    }

    /// Digest covered by the signature of input `input_index`.
    ///
    /// The image is the trimmed transaction with only that input's pub_key
    /// set to the referenced output's pub_key_hash. Signer and verifier both
    /// reconstruct the exact same digest through this function.
    fn sighash(&self, input_index: usize, prev_pub_key_hash: &[u8]) -> Result<Vec<u8>> {
        let mut tx_copy = self.trimmed_copy();
        tx_copy.inputs[input_index].pub_key = prev_pub_key_hash.to_vec();
        tx_copy.hash()
    }

    /// Sign every input with the wallet's key.
    ///
    /// `prev_txs` maps hex transaction IDs to the referenced transactions;
    /// a missing entry fails with `MissingPrevTx`. Coinbase transactions
    /// need no signature.
    pub fn sign(
        &mut self,
        wallet: &Wallet,
        prev_txs: &HashMap<String, Transaction>,
    ) -> Result<()> {
        if self.is_coinbase() {
            return Ok(());
        }

        // Resolve every referenced output before touching any signature,
        // so a half-signed transaction can never escape this function
        for input in &self.inputs {
            let txid_hex = HEXLOWER.encode(input.prev_txid.as_slice());
            let prev_tx = prev_txs
                .get(&txid_hex)
                .ok_or(BlockchainError::MissingPrevTx(txid_hex))?;
            Self::referenced_output(prev_tx, input.out_index)?;
        }

        for i in 0..self.inputs.len() {
            let txid_hex = HEXLOWER.encode(self.inputs[i].prev_txid.as_slice());
            let prev_tx = prev_txs
                .get(&txid_hex)
                .ok_or(BlockchainError::MissingPrevTx(txid_hex))?;
            let prev_output = Self::referenced_output(prev_tx, self.inputs[i].out_index)?;

            let digest = self.sighash(i, prev_output.get_pub_key_hash())?;
            self.inputs[i].signature = wallet.sign(digest.as_slice())?;
            self.inputs[i].pub_key = wallet.get_public_key().to_vec();
        }

        Ok(())
    }

    /// Check every input's signature against the referenced outputs.
    ///
    /// Beyond the signature itself, the embedded public key must hash to the
    /// referenced output's pub_key_hash, otherwise a valid signature over a
    /// foreign key would pass.
    pub fn verify(&self, prev_txs: &HashMap<String, Transaction>) -> bool {
        if self.is_coinbase() {
            return true;
        }

        for (i, input) in self.inputs.iter().enumerate() {
            let txid_hex = HEXLOWER.encode(input.prev_txid.as_slice());
            let prev_tx = match prev_txs.get(&txid_hex) {
                Some(tx) => tx,
                None => return false,
            };
            let prev_output = match Self::referenced_output(prev_tx, input.out_index) {
                Ok(output) => output,
                Err(_) => return false,
            };

            if hash_pub_key(input.pub_key.as_slice()) != prev_output.get_pub_key_hash() {
                return false;
            }

            let digest = match self.sighash(i, prev_output.get_pub_key_hash()) {
                Ok(digest) => digest,
                Err(_) => return false,
            };

            if !ecdsa_p256_verify(
                input.pub_key.as_slice(),
                digest.as_slice(),
                input.signature.as_slice(),
            ) {
                return false;
            }
        }

        true
    }

    /// Copy with all input signatures and public keys cleared; outputs,
    /// timestamp and id are preserved.
    pub fn trimmed_copy(&self) -> Transaction {
        let inputs = self
            .inputs
            .iter()
            .map(|input| TxInput {
                prev_txid: input.prev_txid.clone(),
                out_index: input.out_index,
                signature: vec![],
                pub_key: vec![],
            })
            .collect();

        Transaction {
            id: self.id.clone(),
            inputs,
            outputs: self.outputs.clone(),
            timestamp: self.timestamp,
        }
    }

    pub fn get_id(&self) -> &[u8] {
        self.id.as_slice()
    }

    pub fn get_inputs(&self) -> &[TxInput] {
        self.inputs.as_slice()
    }

    pub fn get_outputs(&self) -> &[TxOutput] {
        self.outputs.as_slice()
    }

    pub fn get_timestamp(&self) -> i64 {
        self.timestamp
    }

    fn referenced_output(prev_tx: &Transaction, out_index: i64) -> Result<&TxOutput> {
        usize::try_from(out_index)
            .ok()
            .and_then(|idx| prev_tx.outputs.get(idx))
            .ok_or_else(|| {
                BlockchainError::Transaction(format!(
                    "Output index {out_index} out of range for transaction {}",
                    HEXLOWER.encode(prev_tx.id.as_slice())
                ))
            })
    }
}
