use crate::error::Result;
use crate::utils::{
    ecdsa_p256_sign, new_signing_key, pub_key_to_address, public_key_to_bytes,
};
use p256::ecdsa::SigningKey;
use p256::FieldBytes;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Raw key material of a wallet: the private scalar `D` and the public
/// point coordinates `(X, Y)`, all big-endian byte strings.
///
/// This is the hand-off format for callers that implement their own at-rest
/// storage; the bytes are wiped when the value is dropped.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct KeyMaterial {
    pub d: Vec<u8>,
    pub x: Vec<u8>,
    pub y: Vec<u8>,
}

/// An ECDSA P-256 keypair with its derived address.
pub struct Wallet {
    signing_key: SigningKey,
    public_key: Vec<u8>, // X || Y, cached at construction
    address: String,
}

impl Wallet {
    /// Generate a fresh keypair.
    pub fn new() -> Wallet {
        Self::from_signing_key(new_signing_key())
    }

    /// Sign arbitrary data with this wallet's private key.
    pub fn sign(&self, data: &[u8]) -> Result<Vec<u8>> {
        ecdsa_p256_sign(&self.signing_key, data)
    }

    pub fn get_address(&self) -> &str {
        self.address.as_str()
    }

    pub fn get_public_key(&self) -> &[u8] {
        self.public_key.as_slice()
    }

    /// Export the key material for external persistence.
    pub fn key_material(&self) -> KeyMaterial {
        KeyMaterial {
            d: self.signing_key.to_bytes().to_vec(),
            x: self.public_key[..32].to_vec(),
            y: self.public_key[32..].to_vec(),
        }
    }

    /// Rebuild a wallet from exported key material. The public key and
    /// address are re-derived from the private scalar, so a corrupted
    /// point cannot slip back in.
    pub fn from_key_material(material: &KeyMaterial) -> Result<Wallet> {
        let signing_key = SigningKey::from_bytes(&scalar_bytes(&material.d)?)
            .map_err(|e| crate::error::BlockchainError::Crypto(format!("Invalid private key: {e}")))?;
        Ok(Self::from_signing_key(signing_key))
    }

    fn from_signing_key(signing_key: SigningKey) -> Wallet {
        let public_key = public_key_to_bytes(signing_key.verifying_key());
        let address = pub_key_to_address(&public_key);
        Wallet {
            signing_key,
            public_key,
            address,
        }
    }
}

impl Default for Wallet {
    fn default() -> Self {
        Self::new()
    }
}

fn scalar_bytes(bytes: &[u8]) -> Result<FieldBytes> {
    if bytes.is_empty() || bytes.len() > 32 {
        return Err(crate::error::BlockchainError::Crypto(
            "Invalid private scalar length".to_string(),
        ));
    }
    let mut padded = [0u8; 32];
    padded[32 - bytes.len()..].copy_from_slice(bytes);
    Ok(padded.into())
}
