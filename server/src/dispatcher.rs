use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tenant_gateway_config::DispatcherConfig;
use tokio::sync::{mpsc, oneshot, Mutex, Notify, RwLock, Semaphore};
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::error::AppError;
use crate::resource::{ListOutcome, ResourceAdapter, ResourceType};

const INBOUND_CHANNEL_CAPACITY: usize = 256;

/// One request, tagged by operation. A single `mpsc` channel carrying this
/// enum stands in for the per-operation channel bank: ordering within a
/// tenant is preserved either way, and there is one fewer moving part.
pub enum Operation {
    List { resource_type: ResourceType, page: Option<u32>, count: Option<u32> },
    Get { resource_type: ResourceType, id: String },
    MarkReviewed { resource_type: ResourceType, id: String },
}

pub enum DispatchResult {
    List(ListOutcome),
    Document(serde_json::Value),
}

struct RequestMessage {
    operation: Operation,
    reply: oneshot::Sender<Result<DispatchResult, AppError>>,
}

struct WorkerState {
    rx: Option<mpsc::Receiver<RequestMessage>>,
    handle: Option<JoinHandle<()>>,
}

/// The per-tenant serialization lane: one worker task processes every
/// request for this tenant in arrival order, backed by a bounded pool of
/// response rendezvous permits.
///
/// `pseudoClosed` is not a boolean toggled in place; it is derived from
/// whether a worker task currently owns the receiver. The `mpsc` sender and
/// receiver are created once and never replaced, so reactivating a cooled
/// dispatcher costs one `tokio::spawn`, not a new channel pair.
pub struct Dispatcher {
    tenant: String,
    tx: mpsc::Sender<RequestMessage>,
    pool: Arc<Semaphore>,
    idle_timeout: Duration,
    reset: Notify,
    pseudo_closed: AtomicBool,
    state: Mutex<WorkerState>,
    adapter: Arc<ResourceAdapter>,
}

impl Dispatcher {
    fn new(
        tenant: String,
        adapter: Arc<ResourceAdapter>,
        pool_size: usize,
        idle_timeout: Duration,
    ) -> Arc<Self> {
        let (tx, rx) = mpsc::channel(INBOUND_CHANNEL_CAPACITY);
        Arc::new(Self {
            tenant,
            tx,
            pool: Arc::new(Semaphore::new(pool_size)),
            idle_timeout,
            reset: Notify::new(),
            pseudo_closed: AtomicBool::new(true),
            state: Mutex::new(WorkerState { rx: Some(rx), handle: None }),
            adapter,
        })
    }

    #[must_use]
    pub fn is_pseudo_closed(&self) -> bool {
        self.pseudo_closed.load(Ordering::SeqCst)
    }

    /// Starts the worker if it is not already running. Idempotent and safe
    /// to call on every request; reactivation completes before this
    /// returns, satisfying the tenant router's ordering requirement.
    pub async fn activate(self: &Arc<Self>) {
        let mut state = self.state.lock().await;
        if state.handle.is_some() {
            return;
        }

        let rx = state
            .rx
            .take()
            .expect("dispatcher channel handles are reused, never dropped");
        let worker = Arc::clone(self);
        state.handle = Some(tokio::spawn(async move { worker.run(rx).await }));
        self.pseudo_closed.store(false, Ordering::SeqCst);
        info!(tenant = %self.tenant, "dispatcher active");
    }

    /// Non-blocking idle-timer reset pulse. A dropped pulse (no worker
    /// listening, or the notify already has one pending) is benign.
    pub fn pulse_reset(&self) {
        self.reset.notify_one();
    }

    /// Submits a request and waits up to `deadline` for the worker's reply.
    ///
    /// On timeout, the handler returns `408` immediately but keeps a
    /// detached task waiting on the same reply channel so the worker's
    /// eventual delivery still releases the pool permit instead of leaking
    /// it — the fix the design notes call for, applied at every timeout
    /// rather than only as a best-effort secondary receive.
    pub async fn submit(&self, operation: Operation, deadline: Duration) -> Result<DispatchResult, AppError> {
        let permit = self.pool.clone().try_acquire_owned().ok();
        let (reply_tx, reply_rx) = oneshot::channel();

        self.tx
            .send(RequestMessage { operation, reply: reply_tx })
            .await
            .map_err(|_| AppError::NotReady("tenant dispatcher is not accepting requests".to_string()))?;

        match tokio::time::timeout(deadline, reply_rx).await {
            Ok(Ok(result)) => {
                drop(permit);
                result
            }
            Ok(Err(_)) => {
                drop(permit);
                Err(AppError::Backend("dispatcher reply channel closed before responding".to_string()))
            }
            Err(_) => {
                tokio::spawn(async move {
                    let _ = reply_rx.await;
                    drop(permit);
                });
                Err(AppError::Timeout)
            }
        }
    }

    async fn run(self: Arc<Self>, mut rx: mpsc::Receiver<RequestMessage>) {
        loop {
            let idle = tokio::time::sleep(self.idle_timeout);
            tokio::pin!(idle);

            tokio::select! {
                biased;

                message = rx.recv() => {
                    match message {
                        Some(request) => self.handle_request(request).await,
                        None => return,
                    }
                }

                () = self.reset.notified() => {
                    continue;
                }

                () = &mut idle => {
                    break;
                }
            }
        }

        let mut state = self.state.lock().await;
        state.rx = Some(rx);
        state.handle = None;
        drop(state);
        self.pseudo_closed.store(true, Ordering::SeqCst);
        info!(tenant = %self.tenant, "dispatcher idle timeout, pseudo-closed");
    }

    async fn handle_request(&self, request: RequestMessage) {
        let result = match request.operation {
            Operation::List { resource_type, page, count } => self
                .adapter
                .list(&self.tenant, resource_type, page, count)
                .await
                .map(DispatchResult::List)
                .map_err(AppError::from),
            Operation::Get { resource_type, id } => self
                .adapter
                .get(&self.tenant, resource_type, &id)
                .await
                .map(DispatchResult::Document)
                .map_err(AppError::from),
            Operation::MarkReviewed { resource_type, id } => self
                .adapter
                .mark_reviewed(&self.tenant, resource_type, &id)
                .await
                .map(DispatchResult::Document)
                .map_err(AppError::from),
        };

        // Send failure means the handler already abandoned the slot after
        // its own timeout and no one is draining it; nothing to do.
        let _ = request.reply.send(result);
    }
}

/// Tenant → dispatcher map behind a readers-writer lock: the common path
/// (dispatcher exists and is active) only ever takes a read lock.
pub struct DispatcherRegistry {
    dispatchers: RwLock<HashMap<String, Arc<Dispatcher>>>,
    adapter: Arc<ResourceAdapter>,
    pool_size: usize,
    idle_timeout: Duration,
    request_timeout: Duration,
}

impl DispatcherRegistry {
    #[must_use]
    pub fn new(adapter: Arc<ResourceAdapter>, config: &DispatcherConfig) -> Self {
        Self {
            dispatchers: RwLock::new(HashMap::new()),
            adapter,
            pool_size: config.response_pool_size,
            idle_timeout: Duration::from_secs(config.idle_timeout_secs),
            request_timeout: Duration::from_secs(config.request_timeout_secs),
        }
    }

    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        self.request_timeout
    }

    /// Locates (or creates) the tenant's dispatcher and ensures it is
    /// active, completing reactivation before returning it to the caller.
    pub async fn activate(&self, tenant: &str) -> Arc<Dispatcher> {
        {
            let dispatchers = self.dispatchers.read().await;
            if let Some(dispatcher) = dispatchers.get(tenant) {
                if !dispatcher.is_pseudo_closed() {
                    return Arc::clone(dispatcher);
                }
            }
        }

        let dispatcher = {
            let mut dispatchers = self.dispatchers.write().await;
            Arc::clone(dispatchers.entry(tenant.to_string()).or_insert_with(|| {
                Dispatcher::new(tenant.to_string(), Arc::clone(&self.adapter), self.pool_size, self.idle_timeout)
            }))
        };

        dispatcher.activate().await;
        dispatcher
    }

    /// Pulses the idle-timer reset for a tenant that already has a
    /// dispatcher entry. A miss (no entry yet) is not an error: the
    /// dispatcher created by the following `activate` starts its own timer.
    pub async fn pulse_reset(&self, tenant: &str) {
        let dispatchers = self.dispatchers.read().await;
        if let Some(dispatcher) = dispatchers.get(tenant) {
            dispatcher.pulse_reset();
        } else {
            warn!(tenant = %tenant, "idle-timer reset pulse dropped, no dispatcher yet");
        }
    }
}
