//! Sync protocol state machine.
//!
//! A [`SyncCore`] keeps the local version vector and exchanges it with the
//! group as sync interests under a shared prefix. Divergence is detected by
//! merging every received vector; newly learned ranges are reported through
//! the update callback, and the node replies (after suppression) when it
//! knows something the sender did not.
//!
//! ## Phases
//!
//! ```text
//! Uninitialized --startup delay--> Steady <--> Suppressing
//! ```
//!
//! - **Uninitialized**: listening and merging, but not sending.
//! - **Steady**: a jittered periodic retransmission is scheduled.
//! - **Suppressing**: an outdated vector was received; incoming vectors are
//!   aggregated until the suppression timer fires, and the reply is skipped
//!   if the aggregate already covers the local state.
//!
//! At most one retransmission is scheduled at a time. Scheduled tasks hold
//! a weak reference, so dropping the `SyncCore` stops all activity.

use std::collections::BTreeSet;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, Weak};
use std::time::Duration;

use rand::rngs::StdRng;
use rand::SeedableRng;
use tokio::time::Instant;

use svsync_core::{Interest, Name, NodeId, SeqNo, VersionVector};

use crate::config::{SyncConfig, SyncInterestMode};
use crate::error::Result;
use crate::subset::SubsetSelector;
use crate::suppression::{jittered, startup_delay, suppression_delay};
use crate::timer::ScopedTask;
use crate::transport::Face;

/// A contiguous range of sequence numbers learned for one node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MissingDataInfo {
    /// Producer of the missing data.
    pub node_id: NodeId,
    /// First missing sequence number (inclusive).
    pub low: SeqNo,
    /// Last missing sequence number (inclusive).
    pub high: SeqNo,
}

impl MissingDataInfo {
    /// Sequence numbers in the range, in ascending order.
    pub fn seq_nos(&self) -> std::ops::RangeInclusive<SeqNo> {
        self.low..=self.high
    }
}

/// Called once per merge with every range that merge discovered.
pub type UpdateCallback = Arc<dyn Fn(&[MissingDataInfo]) + Send + Sync>;

/// Observable phase of a [`SyncCore`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncPhase {
    /// Waiting for the startup delay to elapse.
    Uninitialized,
    /// Periodic retransmission only.
    Steady,
    /// A suppression window is open.
    Suppressing,
}

#[derive(Default)]
struct Schedule {
    /// Aggregate of vectors received while suppressing.
    pending: Option<VersionVector>,
    next_deadline: Option<Instant>,
    retx: Option<ScopedTask>,
}

struct CoreInner<F: Face> {
    face: Arc<F>,
    sync_prefix: Name,
    node_id: NodeId,
    config: SyncConfig,
    on_update: UpdateCallback,
    initialized: AtomicBool,
    vv: Mutex<VersionVector>,
    sched: Mutex<Schedule>,
    selector: Mutex<SubsetSelector>,
    rng: Mutex<StdRng>,
}

/// State-vector sync participant.
///
/// Must be created and used from within a tokio runtime.
pub struct SyncCore<F: Face> {
    inner: Arc<CoreInner<F>>,
    _listener: ScopedTask,
    _startup: ScopedTask,
}

impl<F: Face> SyncCore<F> {
    /// Register `sync_prefix` on `face` and start the protocol.
    ///
    /// Fails if the configuration is invalid or the prefix cannot be
    /// registered; no instance is produced in that case.
    pub async fn new(
        face: Arc<F>,
        sync_prefix: Name,
        node_id: NodeId,
        on_update: UpdateCallback,
        config: SyncConfig,
    ) -> Result<Self> {
        config.validate()?;

        let mut receiver = face.register_prefix(&sync_prefix).await?;

        let mut rng = match config.rng_seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let selector = match &config.interest_mode {
            SyncInterestMode::RecentRandom { recent, random } => {
                SubsetSelector::new(*recent, *random, 0)
            }
            SyncInterestMode::Bucket {
                bucket_size,
                recent,
                ..
            } => SubsetSelector::new(*recent, 0, *bucket_size),
            SyncInterestMode::Full | SyncInterestMode::Fragmented { .. } => {
                SubsetSelector::new(0, 0, 0)
            }
        };
        let selector = match config.rng_seed {
            Some(seed) => selector.with_seed(seed.wrapping_add(1)),
            None => selector,
        };
        let startup = startup_delay(config.startup_delay_min, config.startup_delay_max, &mut rng);

        let inner = Arc::new(CoreInner {
            face,
            sync_prefix,
            node_id,
            config,
            on_update,
            initialized: AtomicBool::new(false),
            vv: Mutex::new(VersionVector::new()),
            sched: Mutex::new(Schedule::default()),
            selector: Mutex::new(selector),
            rng: Mutex::new(rng),
        });

        let weak = Arc::downgrade(&inner);
        let listener = ScopedTask::spawn(async move {
            while let Some(incoming) = receiver.recv().await {
                let Some(inner) = weak.upgrade() else { break };
                inner.handle_sync_interest(&incoming.interest);
            }
        });

        let weak = Arc::downgrade(&inner);
        let startup_task = ScopedTask::after(startup, move || {
            if let Some(inner) = weak.upgrade() {
                inner.on_startup();
            }
        });

        tracing::debug!(
            node = %inner.node_id,
            instance = inner.config.instance_id,
            prefix = %inner.sync_prefix,
            delay_ms = startup.as_millis() as u64,
            "sync prefix registered"
        );

        Ok(Self {
            inner,
            _listener: listener,
            _startup: startup_task,
        })
    }

    /// This node's identity.
    pub fn node_id(&self) -> &NodeId {
        &self.inner.node_id
    }

    /// Prefix under which sync interests are exchanged.
    pub fn sync_prefix(&self) -> &Name {
        &self.inner.sync_prefix
    }

    /// Instance identifier used in log output.
    pub fn instance_id(&self) -> u64 {
        self.inner.config.instance_id
    }

    /// Raise this node's own sequence number to `seq`.
    ///
    /// Returns true if the vector changed; a send is then scheduled after
    /// the publish delay.
    pub fn publish(&self, seq: SeqNo) -> bool {
        self.inner.update_seq_no(seq, &self.inner.node_id)
    }

    /// Raise `node`'s sequence number to `seq`.
    pub fn update_seq_no(&self, seq: SeqNo, node: &NodeId) -> bool {
        self.inner.update_seq_no(seq, node)
    }

    /// This node's own sequence number.
    pub fn seq_no(&self) -> SeqNo {
        self.inner.vv().get(&self.inner.node_id)
    }

    /// Known sequence number of `node` (0 if never seen).
    pub fn seq_no_of(&self, node: &NodeId) -> SeqNo {
        self.inner.vv().get(node)
    }

    /// Every node present in the local vector.
    pub fn node_ids(&self) -> BTreeSet<NodeId> {
        self.inner.vv().node_ids().cloned().collect()
    }

    /// Snapshot of the local vector.
    pub fn state(&self) -> VersionVector {
        self.inner.vv().clone()
    }

    /// Human-readable form of the local vector.
    pub fn state_string(&self) -> String {
        self.inner.vv().to_string()
    }

    /// True once the startup delay has elapsed.
    pub fn is_initialized(&self) -> bool {
        self.inner.initialized.load(Ordering::Acquire)
    }

    /// True while a suppression window is open.
    pub fn is_suppressing(&self) -> bool {
        self.inner.sched().pending.is_some()
    }

    pub fn phase(&self) -> SyncPhase {
        if !self.is_initialized() {
            SyncPhase::Uninitialized
        } else if self.is_suppressing() {
            SyncPhase::Suppressing
        } else {
            SyncPhase::Steady
        }
    }

    /// When the next sync interest is due, if one is scheduled.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.inner.sched().next_deadline
    }

    /// Process one received sync interest.
    ///
    /// Interests that fail validation, fall outside the sync prefix or carry
    /// a malformed vector are dropped without changing state.
    pub fn handle_sync_interest(&self, interest: &Interest) {
        self.inner.handle_sync_interest(interest);
    }

    /// Merge `remote` into the local vector.
    ///
    /// Returns `(local_newer, remote_newer)`. Invokes the update callback
    /// once if `remote` carried anything new.
    pub fn merge_state_vector(&self, remote: &VersionVector) -> (bool, bool) {
        self.inner.merge_state_vector(remote)
    }
}

impl<F: Face> fmt::Debug for SyncCore<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SyncCore")
            .field("node_id", &self.inner.node_id)
            .field("sync_prefix", &self.inner.sync_prefix)
            .field("phase", &self.phase())
            .field("state", &*self.inner.vv())
            .finish()
    }
}

impl<F: Face> CoreInner<F> {
    fn vv(&self) -> MutexGuard<'_, VersionVector> {
        self.vv.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn sched(&self) -> MutexGuard<'_, Schedule> {
        self.sched.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn rng(&self) -> MutexGuard<'_, StdRng> {
        self.rng.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn selector(&self) -> MutexGuard<'_, SubsetSelector> {
        self.selector.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn retx_interval(&self) -> Duration {
        jittered(
            self.config.retx_period,
            self.config.retx_jitter,
            &mut *self.rng(),
        )
    }

    fn on_startup(self: &Arc<Self>) {
        self.initialized.store(true, Ordering::Release);
        tracing::info!(
            node = %self.node_id,
            instance = self.config.instance_id,
            "sync started"
        );
        self.send_sync_interest();
        self.schedule_retx(self.retx_interval());
    }

    fn update_seq_no(self: &Arc<Self>, seq: SeqNo, node: &NodeId) -> bool {
        let raised = {
            let mut vv = self.vv();
            if seq > vv.get(node) {
                vv.set(node.clone(), seq);
                true
            } else {
                false
            }
        };
        if raised {
            tracing::trace!(node = %self.node_id, target_node = %node, seq, "sequence number raised");
            self.schedule_retx(self.config.publish_delay);
        }
        raised
    }

    /// Replace the pending retransmission with one firing after `delay`.
    ///
    /// The task is spawned with the schedule lock held; a task that fires
    /// at once blocks in `on_retx_timer` until its handle is stored.
    fn schedule_retx(self: &Arc<Self>, delay: Duration) {
        let weak: Weak<Self> = Arc::downgrade(self);
        let mut sched = self.sched();
        sched.next_deadline = Some(Instant::now() + delay);
        sched.retx = Some(ScopedTask::after(delay, move || {
            if let Some(inner) = weak.upgrade() {
                inner.on_retx_timer();
            }
        }));
    }

    fn on_retx_timer(self: &Arc<Self>) {
        let pending = self.sched().pending.take();
        let send = match pending {
            None => true,
            Some(aggregate) => {
                let newer = self.vv().is_newer_than(&aggregate);
                if !newer {
                    tracing::trace!(node = %self.node_id, "reply suppressed, peers already up to date");
                }
                newer
            }
        };
        if send {
            self.send_sync_interest();
        }
        self.schedule_retx(self.retx_interval());
    }

    fn handle_sync_interest(self: &Arc<Self>, interest: &Interest) {
        if let Some(validator) = &self.config.security.validator {
            if let Err(e) = interest.validate(validator.as_ref()) {
                tracing::debug!(node = %self.node_id, error = %e, "dropping unverified sync interest");
                return;
            }
        }

        let name = &interest.name;
        if name.len() != self.sync_prefix.len() + 1 || !self.sync_prefix.is_prefix_of(name) {
            tracing::debug!(node = %self.node_id, name = %name, "dropping interest outside sync prefix");
            return;
        }
        let Some(component) = name.get(-1) else {
            return;
        };
        let remote = match VersionVector::decode(component.as_bytes()) {
            Ok(vv) => vv,
            Err(e) => {
                tracing::debug!(node = %self.node_id, error = %e, "dropping malformed sync interest");
                return;
            }
        };

        let (local_newer, _) = self.merge_state_vector(&remote);
        self.react_to_remote(remote, local_newer);
    }

    /// Aggregate into an open suppression window, or open one when the
    /// local vector is newer. An up-to-date remote resets the timer to a
    /// full jittered period rather than a near-zero delay.
    fn react_to_remote(self: &Arc<Self>, remote: VersionVector, local_newer: bool) {
        let delay = suppression_delay(
            self.config.max_suppression_time,
            self.config.suppression_curve,
            &mut *self.rng(),
        );

        let mut sched = self.sched();
        if let Some(pending) = sched.pending.as_mut() {
            pending.merge_max(&remote);
            return;
        }

        if !local_newer {
            drop(sched);
            self.schedule_retx(self.retx_interval());
            return;
        }

        tracing::trace!(
            node = %self.node_id,
            delay_ms = delay.as_millis() as u64,
            "entering suppression"
        );
        sched.pending = Some(remote);
        let due = Instant::now() + delay;
        let sooner = sched.next_deadline.map_or(true, |current| due < current);
        drop(sched);
        if sooner {
            self.schedule_retx(delay);
        }
    }

    fn merge_state_vector(&self, remote: &VersionVector) -> (bool, bool) {
        let mut missing = Vec::new();
        let local_newer = {
            let mut vv = self.vv();
            for (node, seq) in remote.iter() {
                let local = vv.get(node);
                if seq > local {
                    missing.push(MissingDataInfo {
                        node_id: node.clone(),
                        low: local + 1,
                        high: seq,
                    });
                    vv.set(node.clone(), seq);
                }
            }
            vv.is_newer_than(remote)
        };

        let remote_newer = !missing.is_empty();
        if remote_newer {
            tracing::debug!(node = %self.node_id, ranges = missing.len(), "new data discovered");
            (self.on_update)(&missing);
        }
        (local_newer, remote_newer)
    }

    /// Payloads for one round, per the configured interest mode.
    fn outgoing_vectors(&self) -> Vec<Vec<u8>> {
        let snapshot = self.vv().clone();
        match &self.config.interest_mode {
            SyncInterestMode::Full => vec![snapshot.encode()],
            SyncInterestMode::Fragmented { max_entries } => {
                match snapshot.encode_chunks(*max_entries) {
                    Ok(chunks) if chunks.is_empty() => vec![snapshot.encode()],
                    Ok(chunks) => chunks,
                    Err(e) => {
                        tracing::warn!(node = %self.node_id, error = %e, "fragmentation failed, sending full vector");
                        vec![snapshot.encode()]
                    }
                }
            }
            SyncInterestMode::RecentRandom { .. } => {
                vec![self.selector().select_recent_and_random(&snapshot).encode()]
            }
            SyncInterestMode::Bucket {
                globally_ordered, ..
            } => vec![self
                .selector()
                .select_bucket(&snapshot, *globally_ordered)
                .encode()],
        }
    }

    fn send_sync_interest(&self) {
        if !self.initialized.load(Ordering::Acquire) {
            return;
        }

        let payloads = self.outgoing_vectors();
        tracing::trace!(node = %self.node_id, interests = payloads.len(), "sending sync interest");

        for payload in payloads {
            let mut interest = Interest::new(self.sync_prefix.clone().append(payload))
                .with_lifetime(self.config.sync_interest_lifetime)
                .with_can_be_prefix(true)
                .with_must_be_fresh(true);
            if let Some(signer) = &self.config.security.interest_signer {
                interest.sign(signer.as_ref());
            }

            let face = Arc::clone(&self.face);
            tokio::spawn(async move {
                let _ = face.express_interest(interest).await;
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SyncError;
    use crate::transport::memory::{MemoryFace, MemoryNetwork};
    use svsync_core::{Keypair, SecurityOptions, TrustAnchors};

    fn name(s: &str) -> Name {
        s.parse().unwrap()
    }

    fn config(seed: u64) -> SyncConfig {
        SyncConfig {
            startup_delay_min: Duration::from_millis(100),
            startup_delay_max: Duration::from_millis(100),
            rng_seed: Some(seed),
            ..SyncConfig::default()
        }
    }

    fn recorder() -> (UpdateCallback, Arc<Mutex<Vec<Vec<MissingDataInfo>>>>) {
        let batches = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&batches);
        let callback: UpdateCallback = Arc::new(move |missing: &[MissingDataInfo]| {
            sink.lock().unwrap().push(missing.to_vec());
        });
        (callback, batches)
    }

    async fn node(
        network: &Arc<MemoryNetwork>,
        id: &str,
        config: SyncConfig,
    ) -> (
        SyncCore<MemoryFace>,
        Arc<MemoryFace>,
        Arc<Mutex<Vec<Vec<MissingDataInfo>>>>,
    ) {
        let face = Arc::new(network.create_face());
        let (callback, batches) = recorder();
        let core = SyncCore::new(Arc::clone(&face), name("/sync"), name(id), callback, config)
            .await
            .unwrap();
        (core, face, batches)
    }

    fn sync_interest(vv: &VersionVector) -> Interest {
        Interest::new(name("/sync").append(vv.encode()))
    }

    fn vv(entries: &[(&str, u64)]) -> VersionVector {
        entries.iter().map(|(n, s)| (name(n), *s)).collect()
    }

    #[tokio::test(start_paused = true)]
    async fn test_registration_failure_is_fatal() {
        let network = MemoryNetwork::new();
        let face = Arc::new(network.create_face());
        let _claimed = face.register_prefix(&name("/sync")).await.unwrap();

        let (callback, _) = recorder();
        let result = SyncCore::new(face, name("/sync"), name("/a"), callback, config(1)).await;
        assert!(matches!(result, Err(SyncError::RegistrationFailed { .. })));
    }

    #[tokio::test(start_paused = true)]
    async fn test_invalid_config_is_rejected() {
        let network = MemoryNetwork::new();
        let face = Arc::new(network.create_face());
        let (callback, _) = recorder();
        let bad = SyncConfig {
            retx_period: Duration::ZERO,
            ..config(1)
        };
        let result = SyncCore::new(face, name("/sync"), name("/a"), callback, bad).await;
        assert!(matches!(result, Err(SyncError::InvalidConfig(_))));
    }

    #[tokio::test(start_paused = true)]
    async fn test_startup_initializes_after_delay() {
        let network = MemoryNetwork::new();
        let (core, face, _) = node(&network, "/a", config(1)).await;

        assert_eq!(core.phase(), SyncPhase::Uninitialized);
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(!core.is_initialized());
        assert_eq!(face.expressed_count(), 0);

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(core.phase(), SyncPhase::Steady);
        assert_eq!(face.expressed_count(), 1);
        assert!(core.next_deadline().is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_two_nodes_discover_publish() {
        let network = MemoryNetwork::new();
        let (a, _, _) = node(&network, "/a", config(1)).await;
        let (b, _, b_updates) = node(&network, "/b", config(2)).await;

        assert!(a.publish(1));
        tokio::time::sleep(Duration::from_secs(2)).await;

        assert_eq!(b.seq_no_of(&name("/a")), 1);
        let batches = b_updates.lock().unwrap().clone();
        assert_eq!(
            batches,
            vec![vec![MissingDataInfo {
                node_id: name("/a"),
                low: 1,
                high: 1,
            }]]
        );
        assert_eq!(b.state(), vv(&[("/a", 1)]));
    }

    #[tokio::test(start_paused = true)]
    async fn test_merge_reports_both_directions() {
        let network = MemoryNetwork::new();
        let (core, _, updates) = node(&network, "/a", config(1)).await;
        core.publish(3);

        assert_eq!(core.merge_state_vector(&vv(&[("/a", 3)])), (false, false));
        assert_eq!(core.merge_state_vector(&vv(&[("/b", 1)])), (true, true));
        assert_eq!(
            core.merge_state_vector(&vv(&[("/a", 3), ("/b", 1)])),
            (false, false)
        );
        assert_eq!(
            core.merge_state_vector(&vv(&[("/a", 4), ("/b", 1)])),
            (false, true)
        );
        assert!(updates.lock().unwrap().len() == 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_merge_reports_one_batch_with_ranges() {
        let network = MemoryNetwork::new();
        let (core, _, updates) = node(&network, "/a", config(1)).await;
        core.update_seq_no(2, &name("/b"));

        core.merge_state_vector(&vv(&[("/b", 5), ("/c", 3)]));

        let batches = updates.lock().unwrap().clone();
        assert_eq!(batches.len(), 1);
        assert_eq!(
            batches[0],
            vec![
                MissingDataInfo {
                    node_id: name("/b"),
                    low: 3,
                    high: 5
                },
                MissingDataInfo {
                    node_id: name("/c"),
                    low: 1,
                    high: 3
                },
            ]
        );
        assert_eq!(batches[0][0].seq_nos().count(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_publish_is_monotone() {
        let network = MemoryNetwork::new();
        let (core, _, _) = node(&network, "/a", config(1)).await;

        assert!(core.publish(3));
        assert!(!core.publish(2));
        assert!(!core.publish(3));
        assert_eq!(core.seq_no(), 3);
        assert_eq!(core.node_ids(), BTreeSet::from([name("/a")]));
        assert_eq!(core.state_string(), "/a:3");
    }

    #[tokio::test(start_paused = true)]
    async fn test_publish_sends_promptly() {
        let network = MemoryNetwork::new();
        let (core, face, _) = node(&network, "/a", config(1)).await;
        tokio::time::sleep(Duration::from_millis(200)).await;
        let before = face.expressed_count();

        core.publish(1);
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(face.expressed_count(), before + 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_immediate_publish_keeps_a_retransmission_pending() {
        let network = MemoryNetwork::new();
        let cfg = SyncConfig {
            publish_delay: Duration::ZERO,
            retx_period: Duration::from_secs(3600),
            ..config(1)
        };
        let (core, _, _) = node(&network, "/a", cfg).await;

        let mut idle = 0;
        for seq in 1..=1000u64 {
            core.publish(seq);
            tokio::time::sleep(Duration::from_millis(2)).await;
            let live = core
                .inner
                .sched()
                .retx
                .as_ref()
                .is_some_and(|task| !task.is_finished());
            if !live {
                idle += 1;
            }
        }
        assert_eq!(idle, 0, "rounds with no live retransmission task");
    }

    #[tokio::test(start_paused = true)]
    async fn test_outdated_vector_opens_suppression() {
        let network = MemoryNetwork::new();
        let (core, face, _) = node(&network, "/a", config(1)).await;
        tokio::time::sleep(Duration::from_millis(200)).await;
        core.publish(5);
        tokio::time::sleep(Duration::from_millis(10)).await;
        let before = face.expressed_count();

        core.handle_sync_interest(&sync_interest(&vv(&[("/a", 2)])));
        assert_eq!(core.phase(), SyncPhase::Suppressing);
        let deadline = core.next_deadline().unwrap();
        assert!(deadline <= Instant::now() + Duration::from_millis(500));

        tokio::time::sleep(Duration::from_millis(600)).await;
        assert_eq!(core.phase(), SyncPhase::Steady);
        assert_eq!(face.expressed_count(), before + 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_covering_vector_suppresses_reply() {
        let network = MemoryNetwork::new();
        let (core, face, _) = node(&network, "/a", config(1)).await;
        tokio::time::sleep(Duration::from_millis(200)).await;
        core.publish(5);
        tokio::time::sleep(Duration::from_millis(10)).await;
        let before = face.expressed_count();

        core.handle_sync_interest(&sync_interest(&vv(&[("/a", 2)])));
        // Another peer answers with the full state first.
        core.handle_sync_interest(&sync_interest(&vv(&[("/a", 5), ("/b", 1)])));
        assert_eq!(core.phase(), SyncPhase::Suppressing);

        tokio::time::sleep(Duration::from_millis(600)).await;
        assert_eq!(core.phase(), SyncPhase::Steady);
        assert_eq!(face.expressed_count(), before);
        assert_eq!(core.seq_no_of(&name("/b")), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_up_to_date_vector_resets_retransmission() {
        let network = MemoryNetwork::new();
        let (core, _, _) = node(&network, "/a", config(1)).await;
        tokio::time::sleep(Duration::from_millis(200)).await;

        core.handle_sync_interest(&sync_interest(&vv(&[("/b", 1)])));
        assert_eq!(core.phase(), SyncPhase::Steady);
        let deadline = core.next_deadline().unwrap();
        assert!(deadline >= Instant::now() + Duration::from_millis(22_500));
    }

    #[tokio::test(start_paused = true)]
    async fn test_malformed_interests_are_dropped() {
        let network = MemoryNetwork::new();
        let (core, _, updates) = node(&network, "/a", config(1)).await;
        tokio::time::sleep(Duration::from_millis(200)).await;
        let deadline = core.next_deadline();

        core.handle_sync_interest(&Interest::new(name("/sync").append(&b"\x01\x02\x03"[..])));
        core.handle_sync_interest(&Interest::new(name("/other").append(vv(&[("/b", 1)]).encode())));
        core.handle_sync_interest(&Interest::new(name("/sync")));

        assert!(core.state().is_empty());
        assert!(updates.lock().unwrap().is_empty());
        assert_eq!(core.phase(), SyncPhase::Steady);
        assert_eq!(core.next_deadline(), deadline);
    }

    #[tokio::test(start_paused = true)]
    async fn test_periodic_retransmission_rate() {
        let network = MemoryNetwork::new();
        let (_core, face, _) = node(&network, "/a", config(7)).await;

        tokio::time::sleep(Duration::from_secs(100)).await;
        let sent = face.expressed_count();
        assert!((3..=5).contains(&sent), "sent {sent} interests");
    }

    #[tokio::test(start_paused = true)]
    async fn test_fragmented_mode_splits_vector() {
        let network = MemoryNetwork::new();
        let observer = network.create_face();
        let mut rx = observer.register_prefix(&name("/sync")).await.unwrap();

        let cfg = SyncConfig {
            interest_mode: SyncInterestMode::Fragmented { max_entries: 2 },
            ..config(1)
        };
        let (core, _, _) = node(&network, "/a", cfg).await;
        tokio::time::sleep(Duration::from_millis(200)).await;
        while rx.try_recv().is_ok() {}

        for (i, n) in ["/a", "/b", "/c", "/d", "/e"].iter().enumerate() {
            core.update_seq_no(i as u64 + 1, &name(n));
        }
        tokio::time::sleep(Duration::from_millis(10)).await;

        let mut merged = VersionVector::new();
        let mut count = 0;
        while let Ok(incoming) = rx.try_recv() {
            let interest = incoming.interest;
            assert!(interest.must_be_fresh && interest.can_be_prefix);
            assert_eq!(interest.lifetime, Duration::from_secs(1));
            let part = VersionVector::decode(interest.name.get(-1).unwrap().as_bytes()).unwrap();
            assert!(part.len() <= 2);
            merged.merge_max(&part);
            count += 1;
        }
        assert_eq!(count, 3);
        assert_eq!(merged, core.state());
    }

    #[tokio::test(start_paused = true)]
    async fn test_bucket_mode_sends_one_bounded_interest() {
        let network = MemoryNetwork::new();
        let observer = network.create_face();
        let mut rx = observer.register_prefix(&name("/sync")).await.unwrap();

        let cfg = SyncConfig {
            interest_mode: SyncInterestMode::Bucket {
                bucket_size: 2,
                recent: 1,
                globally_ordered: true,
            },
            ..config(1)
        };
        let (core, _, _) = node(&network, "/a", cfg).await;
        for (i, n) in ["/a", "/b", "/c", "/d", "/e"].iter().enumerate() {
            core.update_seq_no(i as u64 + 1, &name(n));
        }
        tokio::time::sleep(Duration::from_millis(200)).await;

        let incoming = rx.try_recv().unwrap();
        let part = VersionVector::decode(incoming.interest.name.get(-1).unwrap().as_bytes()).unwrap();
        assert_eq!(part.len(), 3);
        assert!(part.contains(&name("/e")));
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_signed_interests_are_validated() {
        let network = MemoryNetwork::new();
        let trusted = Keypair::from_seed(&[1u8; 32]);
        let stranger = Keypair::from_seed(&[2u8; 32]);

        let cfg = SyncConfig {
            security: SecurityOptions::with_keypair(
                Keypair::from_seed(&[1u8; 32]),
                TrustAnchors::new([trusted.public_key()]),
            ),
            ..config(1)
        };
        let (core, _, updates) = node(&network, "/a", cfg).await;

        let mut unsigned = sync_interest(&vv(&[("/b", 1)]));
        core.handle_sync_interest(&unsigned);

        unsigned.sign(&stranger);
        core.handle_sync_interest(&unsigned);
        assert!(core.state().is_empty());

        let mut signed = sync_interest(&vv(&[("/b", 1)]));
        signed.sign(&trusted);
        core.handle_sync_interest(&signed);
        assert_eq!(core.seq_no_of(&name("/b")), 1);
        assert_eq!(updates.lock().unwrap().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_drop_stops_activity() {
        let network = MemoryNetwork::new();
        let (core, face, _) = node(&network, "/a", config(1)).await;
        tokio::time::sleep(Duration::from_millis(200)).await;
        let sent = face.expressed_count();

        drop(core);
        tokio::time::sleep(Duration::from_secs(120)).await;
        assert_eq!(face.expressed_count(), sent);
    }
}
