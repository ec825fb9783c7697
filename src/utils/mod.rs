//! Utility functions and helpers
//!
//! This module contains cryptographic utilities and encoding functions
//! used throughout the blockchain.

pub mod crypto;

pub use crypto::{
    current_timestamp, decode_public_key, ecdsa_p256_sign, ecdsa_p256_verify, hash_pub_key,
    merkle_root, new_signing_key, pub_key_to_address, public_key_to_bytes, sha256_digest,
    sha256_hex,
};
