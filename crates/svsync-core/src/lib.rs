//! # svsync core
//!
//! Pure primitives for state-vector sync: names, version vectors, the TLV
//! wire codec and packet types.
//!
//! This crate contains no I/O, no timers and no networking.
//!
//! ## Key Types
//!
//! - [`Name`] / [`NodeId`] - Hierarchical identifiers with canonical order
//! - [`VersionVector`] - Node to highest-sequence-number mapping, with its codec
//! - [`Interest`] / [`Data`] - Request and response packets
//! - [`SecurityOptions`] - Pluggable signing and validation
//!
//! ## Encoding
//!
//! Version vectors encode as nested TLV; see [`tlv`] and
//! [`version_vector`].

pub mod crypto;
pub mod error;
pub mod name;
pub mod packet;
pub mod tlv;
pub mod version_vector;

pub use crypto::{
    Ed25519PublicKey, Ed25519Signature, Keypair, PacketSignature, SecurityOptions, Signer,
    TrustAnchors, Validator,
};
pub use error::{CoreError, Result};
pub use name::{Component, Name, NodeId, SeqNo};
pub use packet::{Data, Interest, NackReason, DEFAULT_INTEREST_LIFETIME};
pub use version_vector::VersionVector;
