//! Signal subscription: the [`SignalSource`] trait and the in-process
//! [`SignalHub`] that implements it.
//!
//! Rate limiting is not something each subscriber re-implements. A
//! subscription that asks for a throttle gets its handler wrapped in
//! [`Throttled`] by the hub, uniformly for every category.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, Weak};
use std::time::Duration;

use sessionward_types::{SharedClock, Timestamp};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::{Signal, SignalCategory};

/// Callback invoked for each delivered signal.
pub type SignalHandler = Arc<dyn Fn(Signal) + Send + Sync>;

/// Something interaction signals can be subscribed to.
pub trait SignalSource: Send + Sync {
    /// Delivers every signal of `category` to `handler`, at most once per
    /// `throttle` if one is given. The subscription lasts until the
    /// returned [`Subscription`] is dropped or unsubscribed.
    fn subscribe(
        &self,
        category: SignalCategory,
        throttle: Option<Duration>,
        handler: SignalHandler,
    ) -> Subscription;
}

// ---------------------------------------------------------------------------
// Subscription
// ---------------------------------------------------------------------------

type SubscriberMap = Mutex<HashMap<u64, (SignalCategory, SignalHandler)>>;

/// Keeps a subscription alive. Dropping it unsubscribes.
#[must_use = "dropping a Subscription unsubscribes immediately"]
pub struct Subscription {
    id: u64,
    category: SignalCategory,
    hub: Weak<SubscriberMap>,
}

impl Subscription {
    pub fn category(&self) -> SignalCategory {
        self.category
    }

    /// Stops delivery. Equivalent to dropping the subscription.
    pub fn unsubscribe(self) {}
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(map) = self.hub.upgrade() {
            map.lock()
                .unwrap_or_else(PoisonError::into_inner)
                .remove(&self.id);
        }
    }
}

// ---------------------------------------------------------------------------
// Throttled
// ---------------------------------------------------------------------------

/// Leading-edge throttle: the first signal passes, then nothing more until
/// `interval` has elapsed since the last one that passed.
pub struct Throttled {
    interval: Duration,
    clock: SharedClock,
    last: Mutex<Option<Timestamp>>,
}

impl Throttled {
    pub fn new(interval: Duration, clock: SharedClock) -> Self {
        Self {
            interval,
            clock,
            last: Mutex::new(None),
        }
    }

    /// Returns `true` if a signal arriving now may pass, and records it.
    pub fn admit(&self) -> bool {
        let now = self.clock.now();
        let mut last = self.last.lock().unwrap_or_else(PoisonError::into_inner);
        match *last {
            Some(previous) if now.saturating_duration_since(previous) < self.interval => false,
            _ => {
                *last = Some(now);
                true
            }
        }
    }

    /// Wraps `handler` so it only sees admitted signals.
    pub fn wrap(self, handler: SignalHandler) -> SignalHandler {
        Arc::new(move |signal| {
            if self.admit() {
                handler(signal);
            }
        })
    }
}

// ---------------------------------------------------------------------------
// SignalHub
// ---------------------------------------------------------------------------

/// In-process signal source. The host calls [`dispatch`](Self::dispatch)
/// for each raw interaction event (or feeds a channel through
/// [`forward_from`](Self::forward_from)).
pub struct SignalHub {
    clock: SharedClock,
    subscribers: Arc<SubscriberMap>,
    next_id: AtomicU64,
}

impl SignalHub {
    pub fn new(clock: SharedClock) -> Self {
        Self {
            clock,
            subscribers: Arc::new(Mutex::new(HashMap::new())),
            next_id: AtomicU64::new(1),
        }
    }

    /// Delivers `signal` to every subscriber of its category.
    ///
    /// Handlers run after the subscriber lock is released, so a handler
    /// may subscribe or unsubscribe without deadlocking.
    pub fn dispatch(&self, signal: Signal) {
        let handlers: Vec<SignalHandler> = self
            .subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .filter(|(category, _)| *category == signal.category)
            .map(|(_, handler)| Arc::clone(handler))
            .collect();

        for handler in handlers {
            handler(signal);
        }
    }

    /// Spawns a task that dispatches every signal received on `rx` until
    /// the sending side closes.
    pub fn forward_from(self: &Arc<Self>, mut rx: mpsc::UnboundedReceiver<Signal>) -> JoinHandle<()> {
        let hub = Arc::clone(self);
        tokio::spawn(async move {
            while let Some(signal) = rx.recv().await {
                hub.dispatch(signal);
            }
            tracing::debug!("signal bridge closed");
        })
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

impl SignalSource for SignalHub {
    fn subscribe(
        &self,
        category: SignalCategory,
        throttle: Option<Duration>,
        handler: SignalHandler,
    ) -> Subscription {
        let handler = match throttle {
            Some(interval) if !interval.is_zero() => {
                Throttled::new(interval, Arc::clone(&self.clock)).wrap(handler)
            }
            _ => handler,
        };

        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id, (category, handler));

        Subscription {
            id,
            category,
            hub: Arc::downgrade(&self.subscribers),
        }
    }
}
