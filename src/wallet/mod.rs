//! Wallet and key management
//!
//! ECDSA P-256 keypairs, address derivation, and an in-memory wallet
//! collection. At-rest persistence is a caller concern; the key material
//! is exposed as structured bytes instead.

pub mod wallet;
pub mod wallets;

pub use wallet::{KeyMaterial, Wallet};
pub use wallets::Wallets;
