//! # Request Handles
//!
//! A [`RequestHandle`] represents one in-flight remote operation. It settles
//! exactly once, with either a success payload or a failure payload, and runs
//! the continuations registered on it:
//!
//! 1. every `done` (on success) or every `fail` (on failure), in registration order,
//! 2. then every `always`, in registration order.
//!
//! Continuations registered after the handle settled run immediately on the
//! registering thread. Continuations registered while the settling thread is
//! still dispatching are queued and run by that thread after the current
//! batch. No continuation ever runs while the handle's internal lock is held,
//! so a continuation may freely register further continuations or inspect the
//! handle.
//!
//! Handles are cheap to clone; all clones observe the same settlement.
//!
//! ```rust
//! use resource_framework::RequestHandle;
//! use serde_json::json;
//! use std::sync::{Arc, Mutex};
//!
//! let log = Arc::new(Mutex::new(Vec::new()));
//! let handle = RequestHandle::pending();
//!
//! let (a, b) = (log.clone(), log.clone());
//! handle
//!     .always(move |_| a.lock().unwrap().push("always"))
//!     .done(move |_| b.lock().unwrap().push("done"));
//!
//! handle.settle(Ok(json!({"post": {"id": 1}})));
//! assert_eq!(*log.lock().unwrap(), ["done", "always"]);
//! ```

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::watch;
use tracing::debug;

/// Wire payload exchanged with the adapter.
pub type Payload = Value;

/// Settled result of a request: `Ok` with the success payload or `Err` with
/// the raw failure payload.
pub type Outcome = Result<Payload, Payload>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Method {
    Get,
    Post,
    Put,
    Delete,
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Delete => "DELETE",
        };
        f.write_str(name)
    }
}

/// Parameters handed to [`Adapter::request`](crate::adapter::Adapter::request).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestParams {
    pub method: Method,
    pub data: Option<Payload>,
}

impl RequestParams {
    pub fn new(method: Method) -> Self {
        Self { method, data: None }
    }

    pub fn get() -> Self {
        Self::new(Method::Get)
    }

    pub fn with_data(mut self, data: Payload) -> Self {
        self.data = Some(data);
        self
    }

    /// Removes `key` from an object payload. An object left empty is dropped.
    pub fn take_data_field(&mut self, key: &str) -> Option<Payload> {
        let object = self.data.as_mut()?.as_object_mut()?;
        let value = object.remove(key);
        if object.is_empty() {
            self.data = None;
        }
        value
    }

    pub(crate) fn data_field(&self, key: &str) -> Option<&Payload> {
        self.data.as_ref()?.get(key)
    }
}

type Continuation = Box<dyn FnOnce(&Payload) + Send>;
type Finalizer = Box<dyn FnOnce(&Outcome) + Send>;

#[derive(Default)]
struct Queue {
    done: Vec<Continuation>,
    fail: Vec<Continuation>,
    always: Vec<Finalizer>,
}

impl Queue {
    fn is_empty(&self) -> bool {
        self.done.is_empty() && self.fail.is_empty() && self.always.is_empty()
    }

    fn run(self, outcome: &Outcome) {
        match outcome {
            Ok(payload) => self.done.into_iter().for_each(|f| f(payload)),
            Err(payload) => self.fail.into_iter().for_each(|f| f(payload)),
        }
        self.always.into_iter().for_each(|f| f(outcome));
    }
}

enum Phase {
    Pending(Queue),
    /// Settled; the settling thread is still running continuations. New
    /// registrations queue up behind the current batch.
    Dispatching(Outcome, Queue),
    Settled(Outcome),
}

struct HandleInner {
    id: u64,
    phase: Mutex<Phase>,
    settled: watch::Sender<bool>,
}

static NEXT_REQUEST_ID: AtomicU64 = AtomicU64::new(1);

/// Settle-once handle for an asynchronous request.
#[derive(Clone)]
pub struct RequestHandle {
    inner: Arc<HandleInner>,
}

impl RequestHandle {
    /// Creates a handle that settles when [`settle`](Self::settle) is called.
    pub fn pending() -> Self {
        let (settled, _) = watch::channel(false);
        Self {
            inner: Arc::new(HandleInner {
                id: NEXT_REQUEST_ID.fetch_add(1, Ordering::Relaxed),
                phase: Mutex::new(Phase::Pending(Queue::default())),
                settled,
            }),
        }
    }

    pub fn resolved(payload: Payload) -> Self {
        let handle = Self::pending();
        handle.settle(Ok(payload));
        handle
    }

    pub fn rejected(payload: Payload) -> Self {
        let handle = Self::pending();
        handle.settle(Err(payload));
        handle
    }

    /// Drives `future` on a Tokio task and settles the handle with its output.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn spawn<F>(future: F) -> Self
    where
        F: Future<Output = Outcome> + Send + 'static,
    {
        let handle = Self::pending();
        let settle = handle.clone();
        tokio::spawn(async move {
            let outcome = future.await;
            settle.settle(outcome);
        });
        handle
    }

    pub fn id(&self) -> u64 {
        self.inner.id
    }

    fn phase(&self) -> MutexGuard<'_, Phase> {
        self.inner
            .phase
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Outcome of a settled handle, or `None` after queueing via `push`.
    fn register(&self, push: impl FnOnce(&mut Queue)) -> Option<Outcome> {
        let mut phase = self.phase();
        match &mut *phase {
            Phase::Pending(queue) | Phase::Dispatching(_, queue) => {
                push(queue);
                None
            }
            Phase::Settled(outcome) => Some(outcome.clone()),
        }
    }

    /// Registers a success continuation.
    pub fn done<F>(&self, f: F) -> &Self
    where
        F: FnOnce(&Payload) + Send + 'static,
    {
        let mut f = Some(f);
        let settled = self.register(|queue| {
            if let Some(f) = f.take() {
                queue.done.push(Box::new(f));
            }
        });
        if let (Some(Ok(payload)), Some(f)) = (&settled, f) {
            f(payload);
        }
        self
    }

    /// Registers a failure continuation.
    pub fn fail<F>(&self, f: F) -> &Self
    where
        F: FnOnce(&Payload) + Send + 'static,
    {
        let mut f = Some(f);
        let settled = self.register(|queue| {
            if let Some(f) = f.take() {
                queue.fail.push(Box::new(f));
            }
        });
        if let (Some(Err(payload)), Some(f)) = (&settled, f) {
            f(payload);
        }
        self
    }

    /// Registers a continuation that runs once the handle settles either way.
    pub fn always<F>(&self, f: F) -> &Self
    where
        F: FnOnce(&Outcome) + Send + 'static,
    {
        let mut f = Some(f);
        let settled = self.register(|queue| {
            if let Some(f) = f.take() {
                queue.always.push(Box::new(f));
            }
        });
        if let (Some(outcome), Some(f)) = (&settled, f) {
            f(outcome);
        }
        self
    }

    /// Settles the handle. Returns `false` if it had already settled, in
    /// which case `outcome` is discarded.
    pub fn settle(&self, outcome: Outcome) -> bool {
        let mut batch = {
            let mut phase = self.phase();
            let queue = match &mut *phase {
                Phase::Pending(queue) => std::mem::take(queue),
                Phase::Dispatching(..) | Phase::Settled(_) => return false,
            };
            *phase = Phase::Dispatching(outcome.clone(), Queue::default());
            queue
        };

        debug!(
            request_id = self.inner.id,
            success = outcome.is_ok(),
            "Request settled"
        );

        loop {
            batch.run(&outcome);
            let mut phase = self.phase();
            let queued = match &mut *phase {
                Phase::Dispatching(_, queue) if !queue.is_empty() => Some(std::mem::take(queue)),
                _ => None,
            };
            match queued {
                Some(queue) => batch = queue,
                None => {
                    *phase = Phase::Settled(outcome.clone());
                    break;
                }
            }
        }

        self.inner.settled.send_replace(true);
        true
    }

    pub fn is_settled(&self) -> bool {
        !matches!(*self.phase(), Phase::Pending(_))
    }

    pub fn outcome(&self) -> Option<Outcome> {
        match &*self.phase() {
            Phase::Settled(outcome) | Phase::Dispatching(outcome, _) => Some(outcome.clone()),
            Phase::Pending(_) => None,
        }
    }

    /// Waits until the handle has settled and every continuation registered
    /// before settlement has run.
    pub async fn wait(&self) -> Outcome {
        let mut settled = self.inner.settled.subscribe();
        // The sender lives in `self`, so the channel cannot close here.
        let _ = settled.wait_for(|done| *done).await;
        self.outcome()
            .unwrap_or_else(|| Err(Value::String("request was never settled".into())))
    }

    pub fn ptr_eq(&self, other: &RequestHandle) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl fmt::Debug for RequestHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestHandle")
            .field("id", &self.inner.id)
            .field("settled", &self.is_settled())
            .finish()
    }
}
