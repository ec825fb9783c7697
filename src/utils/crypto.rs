use data_encoding::HEXLOWER;
use p256::ecdsa::signature::{Signer, Verifier};
use p256::ecdsa::{Signature, SigningKey, VerifyingKey};
use p256::{EncodedPoint, FieldBytes};
use rand_core::OsRng;
use ring::digest::{Context, SHA256};

use crate::error::{BlockchainError, Result};
use std::time::{SystemTime, UNIX_EPOCH};

/// Length of a P-256 field element in bytes.
const FIELD_LEN: usize = 32;

/// Number of pubkey-hash bytes used for an address (40 hex chars).
const ADDRESS_HASH_LEN: usize = 20;

pub fn current_timestamp() -> Result<i64> {
    let duration = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_err(|e| BlockchainError::Crypto(format!("System time error: {e}")))?
        .as_secs();

    // Ensure the timestamp fits in i64
    if duration > i64::MAX as u64 {
        return Err(BlockchainError::Crypto("Timestamp overflow".to_string()));
    }

    Ok(duration as i64)
}

pub fn sha256_digest(data: &[u8]) -> Vec<u8> {
    let mut context = Context::new(&SHA256);
    context.update(data);
    let digest = context.finish();
    digest.as_ref().to_vec()
}

/// SHA-256 of a string, hex-encoded (64 lowercase chars).
pub fn sha256_hex(data: &str) -> String {
    HEXLOWER.encode(sha256_digest(data.as_bytes()).as_slice())
}

pub fn new_signing_key() -> SigningKey {
    SigningKey::random(&mut OsRng)
}

/// Serialize a public key as `X || Y`, both fixed 32-byte big-endian.
pub fn public_key_to_bytes(public_key: &VerifyingKey) -> Vec<u8> {
    let point = public_key.to_encoded_point(false);
    // Uncompressed SEC1 encoding is 0x04 || X || Y; drop the tag byte.
    point.as_bytes()[1..].to_vec()
}

/// ECDSA P-256 over SHA-256 of the message. The signature is the fixed-width
/// 64-byte concatenation `R || S`, each half big-endian.
pub fn ecdsa_p256_sign(signing_key: &SigningKey, message: &[u8]) -> Result<Vec<u8>> {
    let signature: Signature = signing_key
        .try_sign(message)
        .map_err(|e| BlockchainError::Crypto(format!("Failed to sign message: {e}")))?;
    Ok(signature.to_bytes().to_vec())
}

/// Verify an `R || S` signature against a serialized `X || Y` public key.
///
/// Zero-length and odd-length signatures are rejected outright; otherwise the
/// byte string is split in half and each half is decoded as a big-endian
/// scalar, so shorter-than-32-byte halves are accepted as long as both halves
/// have the same length.
pub fn ecdsa_p256_verify(public_key: &[u8], message: &[u8], signature: &[u8]) -> bool {
    if signature.is_empty() || signature.len() % 2 != 0 {
        return false;
    }

    let (r, s) = signature.split_at(signature.len() / 2);
    let signature = match (field_bytes(r), field_bytes(s)) {
        (Ok(r), Ok(s)) => match Signature::from_scalars(r, s) {
            Ok(signature) => signature,
            Err(_) => return false,
        },
        _ => return false,
    };

    let verifying_key = match decode_public_key(public_key) {
        Ok(key) => key,
        Err(_) => return false,
    };

    verifying_key.verify(message, &signature).is_ok()
}

/// Reconstruct a P-256 public key from its `X || Y` serialization.
pub fn decode_public_key(public_key: &[u8]) -> Result<VerifyingKey> {
    if public_key.is_empty() || public_key.len() % 2 != 0 {
        return Err(BlockchainError::Crypto(
            "Invalid public key length".to_string(),
        ));
    }

    let (x, y) = public_key.split_at(public_key.len() / 2);
    let point = EncodedPoint::from_affine_coordinates(&field_bytes(x)?, &field_bytes(y)?, false);
    VerifyingKey::from_encoded_point(&point)
        .map_err(|e| BlockchainError::Crypto(format!("Invalid public key: {e}")))
}

/// Hash a serialized public key down to the 20 address bytes (double SHA-256).
pub fn hash_pub_key(public_key: &[u8]) -> Vec<u8> {
    let first = sha256_digest(public_key);
    let second = sha256_digest(first.as_slice());
    second[..ADDRESS_HASH_LEN].to_vec()
}

/// Derive the 40-char lowercase hex address of a serialized public key.
pub fn pub_key_to_address(public_key: &[u8]) -> String {
    HEXLOWER.encode(hash_pub_key(public_key).as_slice())
}

/// Merkle root of a list of hashes.
///
/// An empty list hashes to SHA-256 of empty input and a single element is its
/// own root. Otherwise elements are paired left to right (an unpaired tail
/// element is combined with itself) and the reduced level recurses.
pub fn merkle_root(hashes: &[Vec<u8>]) -> Vec<u8> {
    if hashes.is_empty() {
        return sha256_digest(&[]);
    }
    if hashes.len() == 1 {
        return hashes[0].clone();
    }

    let mut next_level = Vec::with_capacity(hashes.len().div_ceil(2));
    let mut i = 0;
    while i < hashes.len() {
        let left = &hashes[i];
        let right = if i + 1 < hashes.len() {
            &hashes[i + 1]
        } else {
            left
        };

        let mut combined = Vec::with_capacity(left.len() + right.len());
        combined.extend_from_slice(left);
        combined.extend_from_slice(right);
        next_level.push(sha256_digest(combined.as_slice()));
        i += 2;
    }

    merkle_root(&next_level)
}

fn field_bytes(bytes: &[u8]) -> Result<FieldBytes> {
    if bytes.len() > FIELD_LEN {
        return Err(BlockchainError::Crypto(
            "Field element too long".to_string(),
        ));
    }
    let mut padded = [0u8; FIELD_LEN];
    padded[FIELD_LEN - bytes.len()..].copy_from_slice(bytes);
    Ok(padded.into())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sha256_hex_round_trip() {
        let hex = sha256_hex("hello");
        assert_eq!(hex.len(), 64);
        assert!(hex.chars().all(|c| c.is_ascii_hexdigit()));

        // Decoding the hex must give back the raw digest
        let decoded = HEXLOWER.decode(hex.as_bytes()).unwrap();
        assert_eq!(decoded, sha256_digest(b"hello"));
    }

    #[test]
    fn test_sign_and_verify() {
        let key = new_signing_key();
        let public_key = public_key_to_bytes(key.verifying_key());
        let message = b"transfer 25 coins";

        let signature = ecdsa_p256_sign(&key, message).unwrap();
        assert_eq!(signature.len(), 64);
        assert!(ecdsa_p256_verify(&public_key, message, &signature));
    }

    #[test]
    fn test_verify_rejects_tampered_signature() {
        let key = new_signing_key();
        let public_key = public_key_to_bytes(key.verifying_key());
        let message = b"transfer 25 coins";

        let mut signature = ecdsa_p256_sign(&key, message).unwrap();
        signature[0] ^= 0x01;
        assert!(!ecdsa_p256_verify(&public_key, message, &signature));
    }

    #[test]
    fn test_verify_rejects_wrong_message() {
        let key = new_signing_key();
        let public_key = public_key_to_bytes(key.verifying_key());

        let signature = ecdsa_p256_sign(&key, b"original").unwrap();
        assert!(!ecdsa_p256_verify(&public_key, b"forged", &signature));
    }

    #[test]
    fn test_verify_rejects_bad_lengths() {
        let key = new_signing_key();
        let public_key = public_key_to_bytes(key.verifying_key());

        assert!(!ecdsa_p256_verify(&public_key, b"data", &[]));
        assert!(!ecdsa_p256_verify(&public_key, b"data", &[0x01, 0x02, 0x03]));
    }

    #[test]
    fn test_signature_split_and_reassemble() {
        let key = new_signing_key();
        let public_key = public_key_to_bytes(key.verifying_key());
        let signature = ecdsa_p256_sign(&key, b"data").unwrap();

        let (r, s) = signature.split_at(signature.len() / 2);
        let mut reassembled = r.to_vec();
        reassembled.extend_from_slice(s);
        assert_eq!(reassembled, signature);
        assert!(ecdsa_p256_verify(&public_key, b"data", &reassembled));
    }

    #[test]
    fn test_address_format() {
        let key = new_signing_key();
        let address = pub_key_to_address(&public_key_to_bytes(key.verifying_key()));
        assert_eq!(address.len(), 40);
        assert!(address
            .chars()
            .all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }

    #[test]
    fn test_merkle_root_empty_and_single() {
        assert_eq!(merkle_root(&[]), sha256_digest(&[]));

        let single = vec![sha256_digest(b"tx1")];
        assert_eq!(merkle_root(&single), single[0]);
    }

    #[test]
    fn test_merkle_root_is_order_sensitive() {
        let a = sha256_digest(b"a");
        let b = sha256_digest(b"b");

        let root_ab = merkle_root(&[a.clone(), b.clone()]);
        let root_ba = merkle_root(&[b, a]);
        assert_ne!(root_ab, root_ba);
    }

    #[test]
    fn test_merkle_root_duplicates_unpaired_tail() {
        let a = sha256_digest(b"a");
        let b = sha256_digest(b"b");
        let c = sha256_digest(b"c");

        // With three leaves the tail is paired with itself
        let left = {
            let mut combined = a.clone();
            combined.extend_from_slice(&b);
            sha256_digest(&combined)
        };
        let right = {
            let mut combined = c.clone();
            combined.extend_from_slice(&c);
            sha256_digest(&combined)
        };
        let expected = merkle_root(&[left, right]);
        assert_eq!(merkle_root(&[a, b, c]), expected);
    }

    #[test]
    fn test_decode_public_key_round_trip() {
        let key = new_signing_key();
        let bytes = public_key_to_bytes(key.verifying_key());

        let decoded = decode_public_key(&bytes).unwrap();
        assert_eq!(public_key_to_bytes(&decoded), bytes);
        assert!(decode_public_key(&[]).is_err());
        assert!(decode_public_key(&bytes[..33]).is_err());
    }
}
