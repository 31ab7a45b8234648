//! Test fixtures and helpers.
//!
//! Common setup code for multi-node tests.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use svsync::{
    InstanceCounter, Keypair, MemoryFace, MemoryNetwork, MissingDataInfo, Name, NodeId, SVSync,
    SecurityOptions, SvSyncConfig, TrustAnchors, VersionVector,
};

/// Seed of the key shared by [`signed_config`] groups.
pub const GROUP_KEY_SEED: [u8; 32] = [0x42; 32];

/// Config with a short startup window and a per-node deterministic seed.
pub fn fast_config(index: usize) -> SvSyncConfig {
    let mut config = SvSyncConfig::default();
    config.sync.startup_delay_min = Duration::from_millis(100);
    config.sync.startup_delay_max = Duration::from_secs(1);
    config.sync.rng_seed = Some(index as u64 + 1);
    config
}

/// [`fast_config`] with every packet signed by the shared group key.
pub fn signed_config(index: usize) -> SvSyncConfig {
    let mut config = fast_config(index);
    let key = Keypair::from_seed(&GROUP_KEY_SEED);
    let anchors = TrustAnchors::new([key.public_key()]);
    config.sync.security = SecurityOptions::with_keypair(key, anchors);
    config
}

/// A group of sync nodes on one in-memory network.
pub struct SyncGroup {
    network: Arc<MemoryNetwork>,
    members: Vec<SVSync<MemoryFace>>,
    updates: Vec<Arc<Mutex<Vec<MissingDataInfo>>>>,
    instances: InstanceCounter,
}

impl SyncGroup {
    /// Prefix shared by every group member.
    pub fn sync_prefix() -> Name {
        Name::new().append("svsync").append("test")
    }

    /// Identity of member `index`.
    pub fn node_id(index: usize) -> NodeId {
        Name::new().append("node").append(index.to_string().as_str())
    }

    /// Start `size` members on a fresh lossless network.
    pub async fn new(size: usize, configure: impl Fn(usize) -> SvSyncConfig) -> Self {
        match Self::on_network(MemoryNetwork::new(), size, configure).await {
            Ok(group) => group,
            Err(e) => panic!("failed to start sync group: {e}"),
        }
    }

    /// Start `size` members on `network`.
    pub async fn on_network(
        network: Arc<MemoryNetwork>,
        size: usize,
        configure: impl Fn(usize) -> SvSyncConfig,
    ) -> svsync::Result<Self> {
        let mut group = Self {
            network,
            members: Vec::with_capacity(size),
            updates: Vec::with_capacity(size),
            instances: InstanceCounter::new(),
        };
        for index in 0..size {
            group.join(configure(index)).await?;
        }
        Ok(group)
    }

    /// Add one member; returns its index.
    pub async fn join(&mut self, mut config: SvSyncConfig) -> svsync::Result<usize> {
        let index = self.members.len();
        config.sync.instance_id = self.instances.next();

        let log = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&log);
        let member = SVSync::new(
            Arc::new(self.network.create_face()),
            Self::sync_prefix(),
            Self::node_id(index),
            Arc::new(move |missing: &[MissingDataInfo]| {
                sink.lock()
                    .unwrap_or_else(|e| e.into_inner())
                    .extend_from_slice(missing);
            }),
            config,
        )
        .await?;

        self.members.push(member);
        self.updates.push(log);
        Ok(index)
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Member `index`. Panics if out of range.
    pub fn member(&self, index: usize) -> &SVSync<MemoryFace> {
        &self.members[index]
    }

    pub fn members(&self) -> &[SVSync<MemoryFace>] {
        &self.members
    }

    pub fn network(&self) -> &Arc<MemoryNetwork> {
        &self.network
    }

    /// Every range member `index` has been told about so far.
    pub fn updates(&self, index: usize) -> Vec<MissingDataInfo> {
        self.updates[index]
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Vector states of all members, in member order.
    pub fn states(&self) -> Vec<VersionVector> {
        self.members.iter().map(|m| m.core().state()).collect()
    }

    /// True when every member holds the same vector.
    pub fn converged(&self) -> bool {
        let states = self.states();
        states.windows(2).all(|pair| pair[0] == pair[1])
    }

    /// Poll until [`converged`](Self::converged) or `timeout` passes.
    pub async fn wait_converged(&self, timeout: Duration) -> bool {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            if self.converged() {
                return true;
            }
            if tokio::time::Instant::now() >= deadline {
                return false;
            }
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
    }
}
