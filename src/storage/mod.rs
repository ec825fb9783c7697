//! Chain-derived indexes
//!
//! This module holds the UTXO set, the address-to-unspent-outputs index
//! that balance queries and spendable-output selection run against.

pub mod utxo_set;

pub use utxo_set::{UTXOSet, Utxo};
