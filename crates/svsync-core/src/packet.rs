//! Network packets exchanged through a face.

use bytes::Bytes;
use rand::Rng;
use std::time::Duration;

use crate::crypto::{PacketSignature, Signer, Validator};
use crate::error::Result;
use crate::name::Name;
use crate::tlv;

/// Interest lifetime when none is set explicitly.
pub const DEFAULT_INTEREST_LIFETIME: Duration = Duration::from_secs(4);

/// TLV type of the Content element inside a Data signed portion.
const CONTENT_TYPE: u64 = 21;

/// A request for named data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Interest {
    /// The requested name (or name prefix).
    pub name: Name,
    /// Random value for loop detection.
    pub nonce: u32,
    /// How long the request stays pending before timing out.
    pub lifetime: Duration,
    /// Whether data under `name` may satisfy the request.
    pub can_be_prefix: bool,
    /// Whether stale cached data is unacceptable.
    pub must_be_fresh: bool,
    /// Optional signature over [`signed_portion`](Self::signed_portion).
    pub signature: Option<PacketSignature>,
}

impl Interest {
    /// Create an interest with a random nonce and the default lifetime.
    pub fn new(name: Name) -> Self {
        Self {
            name,
            nonce: rand::thread_rng().gen(),
            lifetime: DEFAULT_INTEREST_LIFETIME,
            can_be_prefix: false,
            must_be_fresh: false,
            signature: None,
        }
    }

    /// Set the lifetime.
    pub fn with_lifetime(mut self, lifetime: Duration) -> Self {
        self.lifetime = lifetime;
        self
    }

    /// Set the CanBePrefix flag.
    pub fn with_can_be_prefix(mut self, can_be_prefix: bool) -> Self {
        self.can_be_prefix = can_be_prefix;
        self
    }

    /// Set the MustBeFresh flag.
    pub fn with_must_be_fresh(mut self, must_be_fresh: bool) -> Self {
        self.must_be_fresh = must_be_fresh;
        self
    }

    /// Draw a new nonce so a retransmission is not taken for a loop.
    pub fn refresh_nonce(&mut self) {
        let old = self.nonce;
        let mut rng = rand::thread_rng();
        while self.nonce == old {
            self.nonce = rng.gen();
        }
    }

    /// True if `data_name` satisfies this interest.
    pub fn matches(&self, data_name: &Name) -> bool {
        if self.can_be_prefix {
            self.name.is_prefix_of(data_name)
        } else {
            &self.name == data_name
        }
    }

    /// Bytes covered by the signature: the encoded name.
    pub fn signed_portion(&self) -> Vec<u8> {
        self.name.encode()
    }

    /// Attach a signature produced by `signer`.
    pub fn sign(&mut self, signer: &dyn Signer) {
        self.signature = Some(signer.sign(&self.signed_portion()));
    }

    /// Check the attached signature with `validator`.
    pub fn validate(&self, validator: &dyn Validator) -> Result<()> {
        validator.validate(&self.signed_portion(), self.signature.as_ref())
    }
}

/// A named, optionally signed piece of content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Data {
    /// Full data name.
    pub name: Name,
    /// Application payload.
    pub content: Bytes,
    /// How long the data counts as fresh in caches.
    pub freshness: Duration,
    /// Optional signature over [`signed_portion`](Self::signed_portion).
    pub signature: Option<PacketSignature>,
}

impl Data {
    /// Create unsigned data.
    pub fn new(name: Name, content: impl Into<Bytes>) -> Self {
        Self {
            name,
            content: content.into(),
            freshness: Duration::ZERO,
            signature: None,
        }
    }

    /// Set the freshness period.
    pub fn with_freshness(mut self, freshness: Duration) -> Self {
        self.freshness = freshness;
        self
    }

    /// Bytes covered by the signature: encoded name followed by content TLV.
    pub fn signed_portion(&self) -> Vec<u8> {
        let mut buf = self.name.encode();
        tlv::encode_tlv(&mut buf, CONTENT_TYPE, &self.content);
        buf
    }

    /// Attach a signature produced by `signer`.
    pub fn sign(&mut self, signer: &dyn Signer) {
        self.signature = Some(signer.sign(&self.signed_portion()));
    }

    /// Check the attached signature with `validator`.
    pub fn validate(&self, validator: &dyn Validator) -> Result<()> {
        validator.validate(&self.signed_portion(), self.signature.as_ref())
    }
}

/// Why a face rejected an interest.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NackReason {
    /// Same name and nonce seen recently (looping or duplicate request).
    Duplicate,
    /// Nothing is listening under the requested name.
    NoRoute,
    /// The path is overloaded.
    Congestion,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::{Keypair, TrustAnchors};

    fn name(s: &str) -> Name {
        s.parse().unwrap()
    }

    #[test]
    fn test_refresh_nonce_changes_value() {
        let mut interest = Interest::new(name("/a"));
        let before = interest.nonce;
        interest.refresh_nonce();
        assert_ne!(interest.nonce, before);
    }

    #[test]
    fn test_matches_respects_can_be_prefix() {
        let exact = Interest::new(name("/a/b"));
        assert!(exact.matches(&name("/a/b")));
        assert!(!exact.matches(&name("/a/b/c")));

        let prefix = exact.clone().with_can_be_prefix(true);
        assert!(prefix.matches(&name("/a/b/c")));
        assert!(!prefix.matches(&name("/a")));
    }

    #[test]
    fn test_signed_interest_validates() {
        let keypair = Keypair::from_seed(&[7u8; 32]);
        let anchors = TrustAnchors::new([keypair.public_key()]);

        let mut interest = Interest::new(name("/sync/vv"));
        interest.sign(&keypair);
        interest.validate(&anchors).unwrap();

        interest.name = name("/sync/other");
        assert!(interest.validate(&anchors).is_err());
    }

    #[test]
    fn test_signed_data_detects_tampered_content() {
        let keypair = Keypair::from_seed(&[9u8; 32]);
        let anchors = TrustAnchors::new([keypair.public_key()]);

        let mut data = Data::new(name("/n/1"), &b"hello"[..]);
        data.sign(&keypair);
        data.validate(&anchors).unwrap();

        data.content = Bytes::from_static(b"hellO");
        assert!(data.validate(&anchors).is_err());
    }
}
