use crate::error::{BlockchainError, Result};
use crate::wallet::Wallet;
use std::collections::HashMap;

/// In-memory collection of wallets, keyed by address.
///
/// Persistence is left to the caller through
/// [`Wallet::key_material`](crate::wallet::Wallet::key_material).
#[derive(Default)]
pub struct Wallets {
    wallets: HashMap<String, Wallet>,
}

impl Wallets {
    pub fn new() -> Wallets {
        Wallets {
            wallets: HashMap::new(),
        }
    }

    /// Create a wallet, register it, and return its address.
    pub fn create_wallet(&mut self) -> String {
        let wallet = Wallet::new();
        let address = wallet.get_address().to_string();
        self.wallets.insert(address.clone(), wallet);
        address
    }

    pub fn get_wallet(&self, address: &str) -> Result<&Wallet> {
        self.wallets
            .get(address)
            .ok_or_else(|| BlockchainError::Wallet(format!("Wallet not found: {address}")))
    }

    pub fn get_addresses(&self) -> Vec<String> {
        self.wallets.keys().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_and_get_wallet() {
        let mut wallets = Wallets::new();
        let address = wallets.create_wallet();

        let wallet = wallets.get_wallet(&address).unwrap();
        assert_eq!(wallet.get_address(), address);
    }

    #[test]
    fn test_get_unknown_wallet_fails() {
        let wallets = Wallets::new();
        assert!(matches!(
            wallets.get_wallet("missing"),
            Err(BlockchainError::Wallet(_))
        ));
    }

    #[test]
    fn test_addresses_lists_all_wallets() {
        let mut wallets = Wallets::new();
        let a = wallets.create_wallet();
        let b = wallets.create_wallet();

        let addresses = wallets.get_addresses();
        assert_eq!(addresses.len(), 2);
        assert!(addresses.contains(&a));
        assert!(addresses.contains(&b));
    }
}
