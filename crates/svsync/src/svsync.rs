//! Application-facing sync node.
//!
//! [`SVSync`] combines a [`SyncCore`] with a [`Fetcher`] and a data store:
//! publishing stores and announces data, and missing ranges reported by the
//! update callback can be fetched from their producers.
//!
//! Data produced by node `N` in group `G` is named `N/G/<seq>`, where the
//! sequence number is a non-negative integer component. Each node serves
//! its own data under `N/G`.

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use tokio::sync::Mutex as AsyncMutex;

use svsync_core::{Data, Interest, Name, NodeId, SeqNo};
use svsync_sync::{
    Face, FetchError, Fetcher, FetcherConfig, MissingDataInfo, ScopedTask, SyncConfig, SyncCore,
    UpdateCallback,
};

use crate::error::{Result, SvSyncError};
use crate::store::{DataStore, InsertResult, MemoryDataStore};

/// Configuration for [`SVSync`].
#[derive(Debug, Clone)]
pub struct SvSyncConfig {
    /// Sync protocol settings, including security.
    pub sync: SyncConfig,
    /// Fetch window and validation retries.
    pub fetcher: FetcherConfig,
    /// Freshness period set on published data.
    pub data_freshness: Duration,
}

impl Default for SvSyncConfig {
    fn default() -> Self {
        Self {
            sync: SyncConfig::default(),
            fetcher: FetcherConfig::default(),
            data_freshness: Duration::from_secs(1),
        }
    }
}

/// Prefix under which `node` serves its data for `sync_prefix`.
pub fn data_prefix(node: &NodeId, sync_prefix: &Name) -> Name {
    node.clone().join(sync_prefix)
}

/// Name of the data `node` published with sequence number `seq`.
pub fn data_name(node: &NodeId, sync_prefix: &Name, seq: SeqNo) -> Name {
    data_prefix(node, sync_prefix).append_number(seq)
}

/// A sync group member that publishes and fetches data.
pub struct SVSync<F: Face, S: DataStore = MemoryDataStore> {
    core: SyncCore<F>,
    fetcher: Fetcher<F>,
    store: Arc<S>,
    config: SvSyncConfig,
    publish_lock: AsyncMutex<()>,
    _server: ScopedTask,
}

impl<F: Face> SVSync<F> {
    /// Join the group at `sync_prefix` as `node_id`, keeping data in memory.
    pub async fn new(
        face: Arc<F>,
        sync_prefix: Name,
        node_id: NodeId,
        on_update: UpdateCallback,
        config: SvSyncConfig,
    ) -> Result<Self> {
        Self::with_store(
            face,
            sync_prefix,
            node_id,
            on_update,
            config,
            MemoryDataStore::new(),
        )
        .await
    }
}

impl<F: Face, S: DataStore> SVSync<F, S> {
    /// Join the group, keeping data in `store`.
    pub async fn with_store(
        face: Arc<F>,
        sync_prefix: Name,
        node_id: NodeId,
        on_update: UpdateCallback,
        config: SvSyncConfig,
        store: S,
    ) -> Result<Self> {
        let store = Arc::new(store);

        let prefix = data_prefix(&node_id, &sync_prefix);
        let mut requests = face.register_prefix(&prefix).await?;
        let serving = Arc::clone(&store);
        let server = ScopedTask::spawn(async move {
            while let Some(incoming) = requests.recv().await {
                match serving.get(&incoming.interest.name).await {
                    Ok(Some(data)) => {
                        incoming.put_data(data);
                    }
                    Ok(None) => {
                        tracing::trace!(name = %incoming.interest.name, "no data for interest");
                    }
                    Err(e) => {
                        tracing::warn!(name = %incoming.interest.name, error = %e, "store lookup failed");
                    }
                }
            }
        });

        let fetcher = Fetcher::new(
            Arc::clone(&face),
            config.fetcher.clone(),
            config.sync.security.validator.clone(),
        );
        let core = SyncCore::new(
            face,
            sync_prefix,
            node_id,
            on_update,
            config.sync.clone(),
        )
        .await?;

        tracing::info!(node = %core.node_id(), data_prefix = %prefix, "svsync node ready");

        Ok(Self {
            core,
            fetcher,
            store,
            config,
            publish_lock: AsyncMutex::new(()),
            _server: server,
        })
    }

    /// Publish `content` as this node's next sequence number.
    pub async fn publish_data(&self, content: impl Into<Bytes>) -> Result<SeqNo> {
        let _guard = self.publish_lock.lock().await;

        let seq = self.core.seq_no() + 1;
        let mut data = Data::new(self.data_name(self.node_id(), seq), content)
            .with_freshness(self.config.data_freshness);
        if let Some(signer) = &self.config.sync.security.data_signer {
            data.sign(signer.as_ref());
        }

        let name = data.name.clone();
        match self.store.insert(data).await? {
            InsertResult::Inserted | InsertResult::AlreadyExists => {}
            InsertResult::Conflict => return Err(SvSyncError::Conflict(name.to_string())),
        }
        self.core.publish(seq);
        tracing::debug!(node = %self.node_id(), seq, "published data");
        Ok(seq)
    }

    /// Fetch the data `node` published as `seq`.
    ///
    /// Locally stored data is returned without touching the network.
    pub async fn fetch_data(&self, node: &NodeId, seq: SeqNo, retries: u32) -> Result<Data> {
        let name = self.data_name(node, seq);
        if let Some(data) = self.store.get(&name).await? {
            return Ok(data);
        }
        Ok(self.fetcher.fetch(Interest::new(name), retries).await?)
    }

    /// Fetch every sequence number in `missing`, through the fetch window.
    ///
    /// Results are in ascending sequence order.
    pub async fn fetch_missing(
        &self,
        missing: &MissingDataInfo,
        retries: u32,
    ) -> Vec<Result<Data>> {
        let receivers: Vec<_> = missing
            .seq_nos()
            .map(|seq| {
                let name = self.data_name(&missing.node_id, seq);
                self.fetcher.submit(Interest::new(name), retries)
            })
            .collect();

        let mut results = Vec::with_capacity(receivers.len());
        for receiver in receivers {
            let outcome = receiver.await.unwrap_or(Err(FetchError::Cancelled));
            results.push(outcome.map_err(SvSyncError::from));
        }
        results
    }

    /// Name of the data `node` published as `seq` in this group.
    pub fn data_name(&self, node: &NodeId, seq: SeqNo) -> Name {
        data_name(node, self.core.sync_prefix(), seq)
    }

    pub fn node_id(&self) -> &NodeId {
        self.core.node_id()
    }

    pub fn sync_prefix(&self) -> &Name {
        self.core.sync_prefix()
    }

    /// The underlying sync protocol instance.
    pub fn core(&self) -> &SyncCore<F> {
        &self.core
    }

    pub fn fetcher(&self) -> &Fetcher<F> {
        &self.fetcher
    }

    pub fn store(&self) -> &S {
        &self.store
    }
}
