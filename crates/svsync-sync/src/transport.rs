//! Network capability consumed by the sync core and the fetcher.
//!
//! A [`Face`] registers name prefixes to receive interests, and expresses
//! interests on behalf of the caller. Implementations may sit on top of a
//! real forwarder or, as in [`memory`], route between in-process nodes.

use async_trait::async_trait;
use tokio::sync::mpsc;

use svsync_core::{Data, Interest, NackReason, Name};

use crate::error::Result;

/// Outcome of expressing one interest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InterestOutcome {
    /// Matching data arrived.
    Data(Data),
    /// The network rejected the interest.
    Nack(NackReason),
    /// Nothing arrived within the interest lifetime.
    Timeout,
}

/// An interest delivered to a registered prefix.
///
/// Dropping it without calling [`put_data`](Self::put_data) leaves the
/// requester to time out.
#[derive(Debug)]
pub struct IncomingInterest {
    /// The received interest.
    pub interest: Interest,
    reply: Option<mpsc::Sender<Data>>,
}

impl IncomingInterest {
    /// Wrap an interest with an optional reply path.
    pub fn new(interest: Interest, reply: Option<mpsc::Sender<Data>>) -> Self {
        Self { interest, reply }
    }

    /// Answer the interest. Returns false if the requester is gone.
    pub fn put_data(self, data: Data) -> bool {
        match self.reply {
            Some(reply) => reply.try_send(data).is_ok(),
            None => false,
        }
    }
}

/// Stream of interests arriving under a registered prefix.
pub type InterestReceiver = mpsc::Receiver<IncomingInterest>;

/// Network capability trait.
///
/// Implementations must be thread-safe (Send + Sync).
#[async_trait]
pub trait Face: Send + Sync + 'static {
    /// Claim `prefix` and receive every interest expressed under it.
    ///
    /// Fails with [`SyncError::RegistrationFailed`](crate::SyncError) when
    /// the prefix cannot be claimed.
    async fn register_prefix(&self, prefix: &Name) -> Result<InterestReceiver>;

    /// Express an interest and wait for data, a nack or the lifetime to pass.
    async fn express_interest(&self, interest: Interest) -> InterestOutcome;
}

/// In-process network for tests and simulations.
///
/// Interests are multicast to every other face with a matching
/// registration; the first matching reply wins.
pub mod memory {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::sync::{Arc, Mutex, MutexGuard};
    use std::time::Duration;
    use tokio::time::Instant;

    use crate::error::SyncError;

    /// How long a (name, nonce) pair is remembered for loop detection.
    pub const DEAD_NONCE_LIFETIME: Duration = Duration::from_secs(6);

    const LISTENER_QUEUE: usize = 1024;

    struct Listener {
        face_id: u64,
        prefix: Name,
        sender: mpsc::Sender<IncomingInterest>,
    }

    struct NetworkState {
        listeners: Vec<Listener>,
        dead_nonces: HashMap<(Name, u32), Instant>,
        rng: StdRng,
    }

    /// Shared state for the memory network.
    pub struct MemoryNetwork {
        state: Mutex<NetworkState>,
        loss_rate: f64,
        next_face_id: AtomicU64,
    }

    impl MemoryNetwork {
        /// Create a lossless network.
        pub fn new() -> Arc<Self> {
            Self::with_loss(0.0, 0)
        }

        /// Create a network that drops each delivery with probability `loss_rate`.
        pub fn with_loss(loss_rate: f64, seed: u64) -> Arc<Self> {
            Arc::new(Self {
                state: Mutex::new(NetworkState {
                    listeners: Vec::new(),
                    dead_nonces: HashMap::new(),
                    rng: StdRng::seed_from_u64(seed),
                }),
                loss_rate: loss_rate.clamp(0.0, 1.0),
                next_face_id: AtomicU64::new(1),
            })
        }

        /// Create a face attached to this network.
        pub fn create_face(self: &Arc<Self>) -> MemoryFace {
            MemoryFace {
                face_id: self.next_face_id.fetch_add(1, Ordering::Relaxed),
                network: Arc::clone(self),
                expressed: AtomicU64::new(0),
            }
        }

        fn lock(&self) -> MutexGuard<'_, NetworkState> {
            self.state.lock().unwrap_or_else(|e| e.into_inner())
        }
    }

    /// In-memory face implementation.
    pub struct MemoryFace {
        face_id: u64,
        network: Arc<MemoryNetwork>,
        expressed: AtomicU64,
    }

    impl MemoryFace {
        /// Identifier of this face within its network.
        pub fn id(&self) -> u64 {
            self.face_id
        }

        /// Number of interests this face has expressed.
        pub fn expressed_count(&self) -> u64 {
            self.expressed.load(Ordering::Relaxed)
        }

        /// Deliver `interest` to matching listeners, returning the reply channel.
        fn dispatch(&self, interest: &Interest) -> std::result::Result<mpsc::Receiver<Data>, NackReason> {
            let mut state = self.network.lock();
            let now = Instant::now();

            state
                .dead_nonces
                .retain(|_, seen| now.duration_since(*seen) < DEAD_NONCE_LIFETIME);
            let key = (interest.name.clone(), interest.nonce);
            if state.dead_nonces.contains_key(&key) {
                return Err(NackReason::Duplicate);
            }
            state.dead_nonces.insert(key, now);

            state.listeners.retain(|l| !l.sender.is_closed());

            let targets: Vec<mpsc::Sender<IncomingInterest>> = state
                .listeners
                .iter()
                .filter(|l| l.face_id != self.face_id && l.prefix.is_prefix_of(&interest.name))
                .map(|l| l.sender.clone())
                .collect();
            if targets.is_empty() {
                return Err(NackReason::NoRoute);
            }

            let (reply_tx, reply_rx) = mpsc::channel(targets.len());
            for target in targets {
                if self.network.loss_rate > 0.0 && state.rng.gen_bool(self.network.loss_rate) {
                    continue;
                }
                let incoming = IncomingInterest::new(interest.clone(), Some(reply_tx.clone()));
                if target.try_send(incoming).is_err() {
                    tracing::debug!(face = self.face_id, "listener queue full, interest dropped");
                }
            }
            drop(reply_tx);
            Ok(reply_rx)
        }
    }

    #[async_trait]
    impl Face for MemoryFace {
        async fn register_prefix(&self, prefix: &Name) -> Result<InterestReceiver> {
            let mut state = self.network.lock();
            state.listeners.retain(|l| !l.sender.is_closed());

            if state
                .listeners
                .iter()
                .any(|l| l.face_id == self.face_id && &l.prefix == prefix)
            {
                return Err(SyncError::RegistrationFailed {
                    prefix: prefix.to_string(),
                    reason: "prefix already registered on this face".into(),
                });
            }

            let (sender, receiver) = mpsc::channel(LISTENER_QUEUE);
            state.listeners.push(Listener {
                face_id: self.face_id,
                prefix: prefix.clone(),
                sender,
            });
            Ok(receiver)
        }

        async fn express_interest(&self, interest: Interest) -> InterestOutcome {
            self.expressed.fetch_add(1, Ordering::Relaxed);

            let mut replies = match self.dispatch(&interest) {
                Ok(replies) => replies,
                Err(reason) => return InterestOutcome::Nack(reason),
            };

            let deadline = Instant::now() + interest.lifetime;
            loop {
                match tokio::time::timeout_at(deadline, replies.recv()).await {
                    Ok(Some(data)) if interest.matches(&data.name) => {
                        return InterestOutcome::Data(data)
                    }
                    Ok(Some(_)) => continue,
                    // Every listener dropped the interest unanswered.
                    Ok(None) => {
                        tokio::time::sleep_until(deadline).await;
                        return InterestOutcome::Timeout;
                    }
                    Err(_) => return InterestOutcome::Timeout,
                }
            }
        }
    }
}
