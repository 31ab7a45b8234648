//! # svsync testkit
//!
//! Testing utilities for svsync.
//!
//! ## Overview
//!
//! This crate provides:
//!
//! - **Golden vectors**: Version vector encodings with known bytes
//! - **Generators**: Proptest strategies for names and version vectors
//! - **Fixtures**: Groups of sync nodes on an in-memory network
//!
//! ## Golden Vectors
//!
//! ```rust
//! use svsync_testkit::vectors::{all_vectors, check_vector};
//!
//! for vector in all_vectors() {
//!     check_vector(&vector).unwrap();
//! }
//! ```
//!
//! ## Property Testing
//!
//! ```rust,ignore
//! use proptest::prelude::*;
//! use svsync_core::VersionVector;
//! use svsync_testkit::generators::version_vector;
//!
//! proptest! {
//!     #[test]
//!     fn encoding_is_deterministic(vv in version_vector(16)) {
//!         prop_assert_eq!(vv.encode(), vv.clone().encode());
//!     }
//! }
//! ```
//!
//! ## Group Fixtures
//!
//! ```rust,no_run
//! use svsync_testkit::fixtures::{fast_config, SyncGroup};
//!
//! async fn example() {
//!     let group = SyncGroup::new(3, fast_config).await;
//!     group.member(0).publish_data(&b"hello"[..]).await.unwrap();
//!     assert!(group.wait_converged(std::time::Duration::from_secs(10)).await);
//! }
//! ```

pub mod fixtures;
pub mod generators;
pub mod vectors;

pub use fixtures::{fast_config, signed_config, SyncGroup};
