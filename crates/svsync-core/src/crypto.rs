//! Signing and validation of packets.
//!
//! Wraps Ed25519 with strong types. Signing is pluggable through the
//! [`Signer`] and [`Validator`] traits; the sync logic never depends on a
//! particular scheme.

use ed25519_dalek::{Signature, Signer as _, SigningKey, Verifier, VerifyingKey};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use crate::error::{CoreError, Result};

/// A 32-byte Ed25519 public key.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Ed25519PublicKey(pub [u8; 32]);

impl Ed25519PublicKey {
    /// Create from raw bytes.
    pub const fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Convert to hex string.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Verify a signature over a message.
    pub fn verify(&self, message: &[u8], signature: &Ed25519Signature) -> Result<()> {
        let verifying_key =
            VerifyingKey::from_bytes(&self.0).map_err(|_| CoreError::InvalidPublicKey)?;

        let sig = Signature::from_bytes(&signature.0);

        verifying_key
            .verify(message, &sig)
            .map_err(|_| CoreError::InvalidSignature)
    }
}

impl fmt::Debug for Ed25519PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Ed25519Pub({})", &self.to_hex()[..16])
    }
}

/// A 64-byte Ed25519 signature.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Ed25519Signature(pub [u8; 64]);

impl fmt::Debug for Ed25519Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Ed25519Sig({}...)", &hex::encode(&self.0[..8]))
    }
}

/// Signature attached to a packet, with the key that produced it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PacketSignature {
    /// Signer's public key.
    pub key: Ed25519PublicKey,
    /// Signature over the packet's signed portion.
    pub value: Ed25519Signature,
}

/// Produces signatures for outgoing packets.
pub trait Signer: Send + Sync {
    /// Sign the given bytes.
    fn sign(&self, message: &[u8]) -> PacketSignature;
}

/// Checks signatures on incoming packets.
pub trait Validator: Send + Sync {
    /// Accept or reject `message` carrying `signature`.
    fn validate(&self, message: &[u8], signature: Option<&PacketSignature>) -> Result<()>;
}

/// An Ed25519 keypair.
#[derive(Clone)]
pub struct Keypair {
    signing_key: SigningKey,
}

impl Keypair {
    /// Generate a new random keypair.
    pub fn generate() -> Self {
        let mut rng = rand::thread_rng();
        Self {
            signing_key: SigningKey::generate(&mut rng),
        }
    }

    /// Create from a 32-byte seed.
    pub fn from_seed(seed: &[u8; 32]) -> Self {
        Self {
            signing_key: SigningKey::from_bytes(seed),
        }
    }

    /// Get the public key.
    pub fn public_key(&self) -> Ed25519PublicKey {
        Ed25519PublicKey(self.signing_key.verifying_key().to_bytes())
    }
}

impl Signer for Keypair {
    fn sign(&self, message: &[u8]) -> PacketSignature {
        PacketSignature {
            key: self.public_key(),
            value: Ed25519Signature(self.signing_key.sign(message).to_bytes()),
        }
    }
}

impl fmt::Debug for Keypair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Keypair({:?})", self.public_key())
    }
}

/// Validator that accepts signatures from a fixed set of keys.
#[derive(Debug, Clone, Default)]
pub struct TrustAnchors {
    keys: HashSet<Ed25519PublicKey>,
}

impl TrustAnchors {
    /// Trust exactly the given keys.
    pub fn new(keys: impl IntoIterator<Item = Ed25519PublicKey>) -> Self {
        Self {
            keys: keys.into_iter().collect(),
        }
    }

    /// Add a trusted key.
    pub fn insert(&mut self, key: Ed25519PublicKey) {
        self.keys.insert(key);
    }
}

impl Validator for TrustAnchors {
    fn validate(&self, message: &[u8], signature: Option<&PacketSignature>) -> Result<()> {
        let signature = signature.ok_or(CoreError::MissingSignature)?;
        if !self.keys.contains(&signature.key) {
            return Err(CoreError::UntrustedSigner(signature.key.to_hex()));
        }
        signature.key.verify(message, &signature.value)
    }
}

/// Security settings shared by the sync core and the fetcher.
#[derive(Clone)]
pub struct SecurityOptions {
    /// Signs outgoing sync interests when present.
    pub interest_signer: Option<Arc<dyn Signer>>,
    /// Signs locally produced data when present.
    pub data_signer: Option<Arc<dyn Signer>>,
    /// Validates incoming sync interests and fetched data when present.
    pub validator: Option<Arc<dyn Validator>>,
    /// Extra fetch attempts after a data validation failure.
    pub retries_on_validation_fail: u32,
}

impl SecurityOptions {
    /// Sign and validate everything with a single keypair.
    pub fn with_keypair(keypair: Keypair, anchors: TrustAnchors) -> Self {
        let signer: Arc<dyn Signer> = Arc::new(keypair);
        Self {
            interest_signer: Some(Arc::clone(&signer)),
            data_signer: Some(signer),
            validator: Some(Arc::new(anchors)),
            ..Self::default()
        }
    }
}

impl Default for SecurityOptions {
    fn default() -> Self {
        Self {
            interest_signer: None,
            data_signer: None,
            validator: None,
            retries_on_validation_fail: 1,
        }
    }
}

impl fmt::Debug for SecurityOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SecurityOptions")
            .field("interest_signer", &self.interest_signer.is_some())
            .field("data_signer", &self.data_signer.is_some())
            .field("validator", &self.validator.is_some())
            .field("retries_on_validation_fail", &self.retries_on_validation_fail)
            .finish()
    }
}
