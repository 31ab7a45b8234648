//! Window-bounded retrieval of individual data packets.
//!
//! Requests wait in a FIFO queue and are admitted while fewer than
//! `window_size` are in flight. A timed-out request is re-queued at the
//! tail with a fresh id and nonce until its retries run out; a nack is
//! always terminal. Data that fails validation is retried under a separate
//! budget.

use std::collections::{HashSet, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};

use tokio::sync::oneshot;

use svsync_core::{Data, Interest, Validator};

use crate::config::FetcherConfig;
use crate::error::FetchError;
use crate::transport::{Face, InterestOutcome};

/// Outcome delivered for each submitted request.
pub type FetchResult = std::result::Result<Data, FetchError>;

struct Request {
    id: u64,
    interest: Interest,
    retries_left: u32,
    validation_retries_left: u32,
    attempts: u32,
    reply: oneshot::Sender<FetchResult>,
}

#[derive(Default)]
struct FetchState {
    next_id: u64,
    queue: VecDeque<Request>,
    outstanding: HashSet<u64>,
}

impl FetchState {
    fn enqueue(&mut self, mut request: Request) {
        request.id = self.next_id;
        self.next_id += 1;
        self.queue.push_back(request);
    }
}

struct FetcherInner<F: Face> {
    face: Arc<F>,
    config: FetcherConfig,
    validator: Option<Arc<dyn Validator>>,
    state: Mutex<FetchState>,
}

/// Bounded concurrent fetch pipeline. Cloning shares the same window.
pub struct Fetcher<F: Face> {
    inner: Arc<FetcherInner<F>>,
}

impl<F: Face> Clone for Fetcher<F> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<F: Face> Fetcher<F> {
    /// Create a fetcher. Data is validated when `validator` is set.
    pub fn new(
        face: Arc<F>,
        config: FetcherConfig,
        validator: Option<Arc<dyn Validator>>,
    ) -> Self {
        Self {
            inner: Arc::new(FetcherInner {
                face,
                config,
                validator,
                state: Mutex::new(FetchState::default()),
            }),
        }
    }

    /// Queue `interest`, retrying up to `max_retries` times on timeout.
    ///
    /// The receiver resolves once with the terminal outcome. Dropping it
    /// before the request is admitted withdraws the request.
    pub fn submit(&self, interest: Interest, max_retries: u32) -> oneshot::Receiver<FetchResult> {
        let (reply, receiver) = oneshot::channel();
        let request = Request {
            id: 0,
            interest,
            retries_left: max_retries,
            validation_retries_left: self.inner.config.validation_retries,
            attempts: 0,
            reply,
        };
        self.inner.state().enqueue(request);
        self.inner.pump();
        receiver
    }

    /// Submit and wait for the outcome.
    pub async fn fetch(&self, interest: Interest, max_retries: u32) -> FetchResult {
        self.submit(interest, max_retries)
            .await
            .unwrap_or(Err(FetchError::Cancelled))
    }

    /// Requests currently in flight.
    pub fn outstanding(&self) -> usize {
        self.inner.state().outstanding.len()
    }

    /// Requests waiting for admission.
    pub fn queued(&self) -> usize {
        self.inner.state().queue.len()
    }

    pub fn window_size(&self) -> usize {
        self.inner.config.window_size
    }
}

impl<F: Face> FetcherInner<F> {
    fn state(&self) -> MutexGuard<'_, FetchState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Admit queued requests while the window has room.
    fn pump(self: &Arc<Self>) {
        loop {
            let mut request = {
                let mut state = self.state();
                if state.outstanding.len() >= self.config.window_size.max(1) {
                    return;
                }
                let Some(request) = state.queue.pop_front() else {
                    return;
                };
                if request.reply.is_closed() {
                    continue;
                }
                state.outstanding.insert(request.id);
                request
            };

            request.attempts += 1;
            tracing::trace!(id = request.id, name = %request.interest.name, "expressing interest");

            let inner = Arc::clone(self);
            tokio::spawn(async move {
                let outcome = inner.face.express_interest(request.interest.clone()).await;
                inner.complete(request, outcome);
            });
        }
    }

    fn complete(self: &Arc<Self>, mut request: Request, outcome: InterestOutcome) {
        self.state().outstanding.remove(&request.id);

        match outcome {
            InterestOutcome::Data(data) => match self.check(&data) {
                Ok(()) => {
                    let _ = request.reply.send(Ok(data));
                }
                Err(e) if request.validation_retries_left > 0 => {
                    tracing::debug!(name = %data.name, error = %e, "data failed validation, retrying");
                    request.validation_retries_left -= 1;
                    self.requeue(request);
                }
                Err(e) => {
                    tracing::warn!(name = %data.name, error = %e, "data failed validation");
                    let _ = request.reply.send(Err(FetchError::ValidationFailed(e)));
                }
            },
            InterestOutcome::Nack(reason) => {
                tracing::warn!(name = %request.interest.name, ?reason, "interest nacked");
                let _ = request.reply.send(Err(FetchError::Nack(reason)));
            }
            InterestOutcome::Timeout if request.retries_left > 0 => {
                tracing::debug!(
                    name = %request.interest.name,
                    retries_left = request.retries_left,
                    "interest timed out, retrying"
                );
                request.retries_left -= 1;
                self.requeue(request);
            }
            InterestOutcome::Timeout => {
                tracing::warn!(
                    name = %request.interest.name,
                    attempts = request.attempts,
                    "interest timed out"
                );
                let attempts = request.attempts;
                let _ = request.reply.send(Err(FetchError::Timeout { attempts }));
            }
        }

        self.pump();
    }

    fn check(&self, data: &Data) -> svsync_core::Result<()> {
        match &self.validator {
            Some(validator) => data.validate(validator.as_ref()),
            None => Ok(()),
        }
    }

    fn requeue(&self, mut request: Request) {
        request.interest.refresh_nonce();
        self.state().enqueue(request);
    }
}
