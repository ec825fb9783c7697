//! Error handling for the blockchain
//!
//! This module provides the error types shared by every blockchain operation.

use std::fmt;

/// Result type alias for blockchain operations
pub type Result<T> = std::result::Result<T, BlockchainError>;

/// Error types for blockchain operations
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BlockchainError {
    /// Cryptographic operation errors (keygen, signing, key reconstruction)
    Crypto(String),
    /// Serialization/deserialization errors
    Serialization(String),
    /// Transaction structure violations (bad indices, malformed inputs)
    Transaction(String),
    /// Wallet collection errors
    Wallet(String),
    /// Invalid address format (not hex-decodable)
    InvalidAddress(String),
    /// Non-positive transfer amount
    InvalidAmount(i64),
    /// Difficulty outside the supported range
    InvalidDifficulty(u32),
    /// Mining failure (nonce exhaustion)
    Mining(String),
    /// Mining attempt budget exhausted before a valid nonce was found
    Cancelled,
    /// Block index outside the chain
    OutOfRange { index: usize, length: usize },
    /// Transaction ID not present in the chain
    TransactionNotFound(String),
    /// Referenced previous transaction missing from the signing context
    MissingPrevTx(String),
    /// Spendable outputs do not cover the requested amount
    InsufficientFunds { required: i64, available: i64 },
    /// Chain-wide validation failure with a reason
    InvalidChain(String),
}

impl fmt::Display for BlockchainError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BlockchainError::Crypto(msg) => write!(f, "Cryptographic error: {msg}"),
            BlockchainError::Serialization(msg) => write!(f, "Serialization error: {msg}"),
            BlockchainError::Transaction(msg) => write!(f, "Transaction error: {msg}"),
            BlockchainError::Wallet(msg) => write!(f, "Wallet error: {msg}"),
            BlockchainError::InvalidAddress(addr) => write!(f, "Invalid address: {addr}"),
            BlockchainError::InvalidAmount(amount) => {
                write!(f, "Invalid amount: {amount} (must be positive)")
            }
            BlockchainError::InvalidDifficulty(difficulty) => {
                write!(f, "Invalid difficulty: {difficulty}")
            }
            BlockchainError::Mining(msg) => write!(f, "Mining error: {msg}"),
            BlockchainError::Cancelled => write!(f, "Mining cancelled: attempt budget exhausted"),
            BlockchainError::OutOfRange { index, length } => {
                write!(f, "Block index {index} out of range (chain length: {length})")
            }
            BlockchainError::TransactionNotFound(id) => {
                write!(f, "Transaction not found: {id}")
            }
            BlockchainError::MissingPrevTx(id) => {
                write!(f, "Previous transaction not found: {id}")
            }
            BlockchainError::InsufficientFunds {
                required,
                available,
            } => {
                write!(
                    f,
                    "Insufficient funds: required {required}, available {available}"
                )
            }
            BlockchainError::InvalidChain(msg) => write!(f, "Invalid chain: {msg}"),
        }
    }
}

impl std::error::Error for BlockchainError {}
