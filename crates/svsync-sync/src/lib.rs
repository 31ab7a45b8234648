//! # svsync sync
//!
//! State-vector sync protocol and data retrieval.
//!
//! ## Overview
//!
//! Every node keeps a version vector: for each producer it knows, the
//! highest sequence number it has heard of. Nodes multicast their vector as
//! a sync interest under a shared prefix, periodically and whenever they
//! publish. A node that receives an outdated vector replies after a
//! randomized suppression delay, unless another reply already covered it.
//!
//! ## Key Properties
//!
//! - **Monotone**: known sequence numbers never decrease
//! - **Eventually consistent**: periodic retransmission repairs any loss
//! - **Bounded fan-in**: replies per divergence event stay roughly constant
//!   as the group grows
//! - **Size-bounded**: large vectors are fragmented or subset-sampled
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use svsync_sync::{MemoryNetwork, MissingDataInfo, SyncConfig, SyncCore, UpdateCallback};
//!
//! async fn example() -> svsync_sync::Result<()> {
//!     let network = MemoryNetwork::new();
//!     let face = Arc::new(network.create_face());
//!     let on_update: UpdateCallback = Arc::new(|missing: &[MissingDataInfo]| {
//!         for info in missing {
//!             println!("{} has {}..={}", info.node_id, info.low, info.high);
//!         }
//!     });
//!
//!     let core = SyncCore::new(
//!         face,
//!         "/group/sync".parse()?,
//!         "/node/alice".parse()?,
//!         on_update,
//!         SyncConfig::default(),
//!     )
//!     .await?;
//!     core.publish(1);
//!     Ok(())
//! }
//! ```
//!
//! ## Message Flow
//!
//! ```text
//! Node A                              Node B
//!   |-- /sync/<{A:1}> ---------------->|  B learns A:[1,1]
//!   |<------------- /sync/<{A:1,B:3}> -|  B knew more, replies after suppression
//!   |  A learns B:[1,3]                |
//! ```

pub mod config;
pub mod error;
pub mod fetcher;
pub mod protocol;
pub mod subset;
pub mod suppression;
pub mod timer;
pub mod transport;

pub use config::{FetcherConfig, InstanceCounter, SyncConfig, SyncInterestMode};
pub use error::{FetchError, Result, SyncError};
pub use fetcher::{FetchResult, Fetcher};
pub use protocol::{MissingDataInfo, SyncCore, SyncPhase, UpdateCallback};
pub use subset::SubsetSelector;
pub use timer::ScopedTask;
pub use transport::{
    memory::MemoryFace, memory::MemoryNetwork, Face, IncomingInterest, InterestOutcome,
    InterestReceiver,
};
