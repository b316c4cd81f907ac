//! Key derivation and signing for pool addresses.
//!
//! [`ChainKeyService`] is the seam to the signing backend. [`LocalKeyService`]
//! derives everything deterministically from one seed:
//!
//! ```text
//! child     = SHA-256(seed ‖ TAG ‖ len(p0) ‖ p0 ‖ len(p1) ‖ p1 …)
//! untweaked = ed25519 public key of child
//! tweaked   = ed25519 public key of SHA-256(child ‖ "TapTweak" ‖ untweaked)
//! address   = hrp ‖ hex(SHA-256(tweaked)[..20])
//! ```
//!
//! Spend authorization signs with the tweaked key.

use async_trait::async_trait;
use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};
use runepool_types::{constants, ExchangeConfig, ExchangeError, PoolKeys, Result};
use sha2::{Digest, Sha256};

/// Produces pool key material and spend signatures.
#[async_trait]
pub trait ChainKeyService: Send + Sync {
    /// Derive the key material for `path`. Must be deterministic.
    async fn derive(&self, path: &[Vec<u8>]) -> Result<PoolKeys>;

    /// Sign `message` with the tweaked key at `path`.
    async fn sign(&self, path: &[Vec<u8>], message: &[u8]) -> Result<Vec<u8>>;
}

/// Seeded in-process key service.
pub struct LocalKeyService {
    seed: [u8; 32],
    hrp: String,
}

impl LocalKeyService {
    #[must_use]
    pub fn new(seed: [u8; 32], hrp: impl Into<String>) -> Self {
        Self {
            seed,
            hrp: hrp.into(),
        }
    }

    pub fn from_config(config: &ExchangeConfig) -> Result<Self> {
        Ok(Self::new(config.key_seed()?, config.network_hrp.clone()))
    }

    fn child(&self, path: &[Vec<u8>]) -> SigningKey {
        let mut hasher = Sha256::new();
        hasher.update(self.seed);
        hasher.update(constants::KEY_DERIVATION_TAG);
        for component in path {
            hasher.update((component.len() as u64).to_le_bytes());
            hasher.update(component);
        }
        SigningKey::from_bytes(&hasher.finalize().into())
    }

    fn tweak(child: &SigningKey) -> SigningKey {
        let mut hasher = Sha256::new();
        hasher.update(child.to_bytes());
        hasher.update(constants::KEY_TWEAK_TAG);
        hasher.update(child.verifying_key().as_bytes());
        SigningKey::from_bytes(&hasher.finalize().into())
    }

    /// Synchronous derivation used by the async trait methods.
    #[must_use]
    pub fn derive_keys(&self, path: &[Vec<u8>]) -> PoolKeys {
        let child = self.child(path);
        let tweaked = Self::tweak(&child).verifying_key();
        let digest = Sha256::digest(tweaked.as_bytes());
        PoolKeys {
            untweaked: hex::encode(child.verifying_key().as_bytes()),
            tweaked: hex::encode(tweaked.as_bytes()),
            derivation_path: path.to_vec(),
            address: format!("{}{}", self.hrp, hex::encode(&digest[..20])),
        }
    }
}

#[async_trait]
impl ChainKeyService for LocalKeyService {
    async fn derive(&self, path: &[Vec<u8>]) -> Result<PoolKeys> {
        Ok(self.derive_keys(path))
    }

    async fn sign(&self, path: &[Vec<u8>], message: &[u8]) -> Result<Vec<u8>> {
        let signer = Self::tweak(&self.child(path));
        Ok(signer.sign(message).to_bytes().to_vec())
    }
}

/// Check a signature produced by [`ChainKeyService::sign`] against a tweaked key.
pub fn verify_signature(tweaked_hex: &str, message: &[u8], signature: &[u8]) -> Result<()> {
    let key: [u8; 32] = hex::decode(tweaked_hex)
        .map_err(|_| ExchangeError::ChainKeyError)?
        .try_into()
        .map_err(|_| ExchangeError::ChainKeyError)?;
    let key = VerifyingKey::from_bytes(&key).map_err(|_| ExchangeError::ChainKeyError)?;
    let signature = Signature::from_slice(signature).map_err(|_| ExchangeError::ChainKeyError)?;
    key.verify(message, &signature)
        .map_err(|_| ExchangeError::ChainKeyError)
}
