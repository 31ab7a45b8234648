//! # svsync
//!
//! State-vector sync for groups of data producers.
//!
//! ## Overview
//!
//! Each member publishes a sequence of data packets. Members exchange
//! version vectors (the highest sequence number known per producer) so that
//! everyone learns what exists, then fetch the data they are missing
//! directly from its producer.
//!
//! - **Publish**: [`SVSync::publish_data`] stores data and announces it
//! - **Discover**: the update callback receives [`MissingDataInfo`] ranges
//! - **Fetch**: [`SVSync::fetch_data`] / [`SVSync::fetch_missing`] retrieve
//!   data through a window-bounded fetch pipeline
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use svsync::{MemoryNetwork, MissingDataInfo, SVSync, SvSyncConfig};
//!
//! async fn example() -> svsync::Result<()> {
//!     let network = MemoryNetwork::new();
//!     let node = SVSync::new(
//!         Arc::new(network.create_face()),
//!         "/chat".parse()?,
//!         "/node/alice".parse()?,
//!         Arc::new(|missing: &[MissingDataInfo]| {
//!             for info in missing {
//!                 println!("{} published up to {}", info.node_id, info.high);
//!             }
//!         }),
//!         SvSyncConfig::default(),
//!     )
//!     .await?;
//!
//!     let seq = node.publish_data(&b"hello"[..]).await?;
//!     assert_eq!(seq, 1);
//!     Ok(())
//! }
//! ```
//!
//! ## Re-exports
//!
//! - `svsync::core` - Names, version vectors, TLV, packets, signing
//! - `svsync::sync` - Sync protocol, subset selection, fetcher, faces

pub mod error;
pub mod store;
pub mod svsync;

pub use svsync_core as core;
pub use svsync_sync as sync;

pub use crate::error::{Result, SvSyncError};
pub use crate::store::{DataStore, InsertResult, MemoryDataStore};
pub use crate::svsync::{data_name, data_prefix, SVSync, SvSyncConfig};

pub use svsync_core::{
    Data, Interest, Keypair, Name, NodeId, SecurityOptions, SeqNo, TrustAnchors, VersionVector,
};
pub use svsync_sync::{
    Face, FetchError, FetcherConfig, InstanceCounter, MemoryFace, MemoryNetwork, MissingDataInfo,
    SyncConfig, SyncCore, SyncInterestMode, UpdateCallback,
};
