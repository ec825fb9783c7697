//! Blockchain integration tests
//!
//! Exercises the public API end to end: genesis, mining, balances,
//! signed transfers, UTXO consumption, and chain validation.

use minichain::core::{Blockchain, Transaction, COINBASE_REWARD};
use minichain::storage::UTXOSet;
use minichain::wallet::{Wallet, Wallets};
use minichain::BlockchainError;

fn init_logs() {
    let _ = env_logger::builder().is_test(true).try_init();
}

#[test]
fn test_genesis_balance() {
    init_logs();
    let wallet = Wallet::new();
    let chain = Blockchain::new(1, wallet.get_address()).unwrap();
    let utxo_set = UTXOSet::new(chain.clone()).unwrap();

    assert_eq!(chain.length(), 1);
    assert_eq!(utxo_set.balance(wallet.get_address()), COINBASE_REWARD);
    assert!(chain.is_valid());
}

#[test]
fn test_append_grows_balance() {
    let wallet = Wallet::new();
    let chain = Blockchain::new(1, wallet.get_address()).unwrap();
    let utxo_set = UTXOSet::new(chain.clone()).unwrap();

    let coinbase_tx = Transaction::new_coinbase(wallet.get_address(), "b1").unwrap();
    let (block, metrics) = chain.mine_and_append(vec![coinbase_tx]).unwrap();
    utxo_set.update(&block).unwrap();

    assert_eq!(chain.length(), 2);
    assert_eq!(utxo_set.balance(wallet.get_address()), 2 * COINBASE_REWARD);
    assert!(chain.is_valid());
    assert!(metrics.attempts >= 1);
    assert_eq!(metrics.hash, block.get_hash());
}

#[test]
fn test_repeated_coinbases_accumulate() {
    let wallet = Wallet::new();
    let chain = Blockchain::new(0, wallet.get_address()).unwrap();
    let utxo_set = UTXOSet::new(chain.clone()).unwrap();

    let rounds = 5;
    for i in 0..rounds {
        let coinbase_tx =
            Transaction::new_coinbase(wallet.get_address(), &format!("b{i}")).unwrap();
        let (block, _) = chain.mine_and_append(vec![coinbase_tx]).unwrap();
        utxo_set.update(&block).unwrap();
    }

    // Genesis plus one coinbase per appended block
    assert_eq!(
        utxo_set.balance(wallet.get_address()),
        (rounds + 1) * COINBASE_REWARD
    );
    assert!(chain.is_valid());
}

#[test]
fn test_signature_round_trip_through_chain() {
    let sender = Wallet::new();
    let receiver = Wallet::new();
    let chain = Blockchain::new(1, sender.get_address()).unwrap();
    let utxo_set = UTXOSet::new(chain.clone()).unwrap();

    let mut tx =
        Transaction::new_transfer(sender.get_address(), receiver.get_address(), 25, &utxo_set)
            .unwrap();
    chain.sign_transaction(&mut tx, &sender).unwrap();
    assert!(chain.verify_transaction(&tx));
}

#[test]
fn test_utxo_consumption_splits_value() {
    init_logs();
    let sender = Wallet::new();
    let receiver = Wallet::new();
    let chain = Blockchain::new(1, sender.get_address()).unwrap();
    let utxo_set = UTXOSet::new(chain.clone()).unwrap();

    // Spend the genesis coinbase: 30 to the receiver, 20 back as change
    let mut tx =
        Transaction::new_transfer(sender.get_address(), receiver.get_address(), 30, &utxo_set)
            .unwrap();
    chain.sign_transaction(&mut tx, &sender).unwrap();

    let (block, _) = chain.mine_and_append(vec![tx]).unwrap();
    utxo_set.update(&block).unwrap();

    assert_eq!(utxo_set.balance(sender.get_address()), 20);
    assert_eq!(utxo_set.balance(receiver.get_address()), 30);
    assert!(chain.is_valid());
}

#[test]
fn test_transfer_rejects_bad_arguments() {
    let sender = Wallet::new();
    let receiver = Wallet::new();
    let chain = Blockchain::new(0, sender.get_address()).unwrap();
    let utxo_set = UTXOSet::new(chain).unwrap();

    assert!(matches!(
        Transaction::new_transfer(sender.get_address(), receiver.get_address(), 0, &utxo_set),
        Err(BlockchainError::InvalidAmount(0))
    ));
    assert!(matches!(
        Transaction::new_transfer(sender.get_address(), receiver.get_address(), -5, &utxo_set),
        Err(BlockchainError::InvalidAmount(-5))
    ));
    assert!(matches!(
        Transaction::new_transfer("not hex!", receiver.get_address(), 10, &utxo_set),
        Err(BlockchainError::InvalidAddress(_))
    ));
    assert!(matches!(
        Transaction::new_transfer(sender.get_address(), "not hex!", 10, &utxo_set),
        Err(BlockchainError::InvalidAddress(_))
    ));
    assert!(matches!(
        Transaction::new_transfer(sender.get_address(), receiver.get_address(), 100, &utxo_set),
        Err(BlockchainError::InsufficientFunds {
            required: 100,
            available: 50
        })
    ));
}

#[test]
fn test_spending_received_funds() {
    let mut wallets = Wallets::new();
    let alice = wallets.create_wallet();
    let bob = wallets.create_wallet();
    let carol = wallets.create_wallet();

    let chain = Blockchain::new(0, &alice).unwrap();
    let utxo_set = UTXOSet::new(chain.clone()).unwrap();

    // Alice pays Bob 30 out of her genesis reward
    let mut tx = Transaction::new_transfer(&alice, &bob, 30, &utxo_set).unwrap();
    chain
        .sign_transaction(&mut tx, wallets.get_wallet(&alice).unwrap())
        .unwrap();
    let (block, _) = chain.mine_and_append(vec![tx]).unwrap();
    utxo_set.update(&block).unwrap();

    // Bob forwards 10 of that to Carol
    let mut tx = Transaction::new_transfer(&bob, &carol, 10, &utxo_set).unwrap();
    chain
        .sign_transaction(&mut tx, wallets.get_wallet(&bob).unwrap())
        .unwrap();
    let (block, _) = chain.mine_and_append(vec![tx]).unwrap();
    utxo_set.update(&block).unwrap();

    assert_eq!(utxo_set.balance(&alice), 20);
    assert_eq!(utxo_set.balance(&bob), 20);
    assert_eq!(utxo_set.balance(&carol), 10);
    assert!(chain.is_valid());
}

#[test]
fn test_update_stream_matches_full_reindex() {
    let sender = Wallet::new();
    let receiver = Wallet::new();
    let chain = Blockchain::new(0, sender.get_address()).unwrap();
    let updated = UTXOSet::new(chain.clone()).unwrap();

    for i in 0..3 {
        let coinbase_tx =
            Transaction::new_coinbase(sender.get_address(), &format!("b{i}")).unwrap();
        let (block, _) = chain.mine_and_append(vec![coinbase_tx]).unwrap();
        updated.update(&block).unwrap();
    }

    let mut tx =
        Transaction::new_transfer(sender.get_address(), receiver.get_address(), 120, &updated)
            .unwrap();
    chain.sign_transaction(&mut tx, &sender).unwrap();
    let (block, _) = chain.mine_and_append(vec![tx]).unwrap();
    updated.update(&block).unwrap();

    // A set built fresh from the same chain must agree with the streamed one
    let reindexed = UTXOSet::new(chain).unwrap();
    for address in [sender.get_address(), receiver.get_address()] {
        assert_eq!(updated.balance(address), reindexed.balance(address));
        assert_eq!(
            updated.find_utxos(address).len(),
            reindexed.find_utxos(address).len()
        );
    }
    assert_eq!(updated.balance(receiver.get_address()), 120);
    assert_eq!(updated.balance(sender.get_address()), 80);
}

#[test]
fn test_transaction_lookup_across_blocks() {
    let wallet = Wallet::new();
    let chain = Blockchain::new(0, wallet.get_address()).unwrap();

    let coinbase_tx = Transaction::new_coinbase(wallet.get_address(), "b1").unwrap();
    let tx_id = coinbase_tx.get_id().to_vec();
    chain.mine_and_append(vec![coinbase_tx]).unwrap();

    let found = chain.find_transaction(&tx_id).unwrap();
    assert_eq!(found.get_id(), tx_id.as_slice());
    assert_eq!(chain.all_transactions().len(), 2);
}
