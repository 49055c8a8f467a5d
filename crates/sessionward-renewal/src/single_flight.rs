//! Keyed single-flight execution.
//!
//! The first caller for a key starts the work; anyone arriving while it
//! is still running gets a clone of the same [`Shared`] future and so the
//! same result. Nothing is cached once the work finishes: the next caller
//! after completion starts fresh.
//!
//! The map counts how many callers are awaiting each flight. When the
//! last one goes away before completion, the entry is evicted and the
//! work itself is dropped, so anything it guards is released.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::{Mutex, MutexGuard, PoisonError};

use futures_util::FutureExt;
use futures_util::future::{BoxFuture, Shared};

type SharedWork<T> = Shared<BoxFuture<'static, T>>;

struct Flight<T>
where
    T: Clone,
{
    work: SharedWork<T>,
    waiters: usize,
}

/// In-flight map from key to the shared future doing the work.
pub struct SingleFlight<K, T>
where
    T: Clone,
{
    in_flight: Mutex<HashMap<K, Flight<T>>>,
}

impl<K, T> SingleFlight<K, T>
where
    K: Eq + Hash + Clone,
    T: Clone + Send + Sync + 'static,
{
    pub fn new() -> Self {
        Self {
            in_flight: Mutex::new(HashMap::new()),
        }
    }

    /// Joins the flight for `key`, or starts one with `start` if none is
    /// running.
    ///
    /// `start` is only called when this caller becomes the leader. The
    /// flight keeps running as long as at least one caller is awaiting
    /// it. If every caller is dropped first, the work is dropped with
    /// them.
    pub async fn run<F>(&self, key: K, start: F) -> T
    where
        F: FnOnce() -> BoxFuture<'static, T>,
    {
        let work = {
            let mut map = self.lock();
            // A finished entry is stale: start over rather than join it.
            let joined = map
                .get_mut(&key)
                .filter(|flight| flight.work.peek().is_none())
                .map(|flight| {
                    flight.waiters += 1;
                    flight.work.clone()
                });
            match joined {
                Some(work) => work,
                None => {
                    let work = start().shared();
                    map.insert(
                        key.clone(),
                        Flight {
                            work: work.clone(),
                            waiters: 1,
                        },
                    );
                    work
                }
            }
        };

        let waiter = Waiter {
            flights: self,
            key,
            work: work.clone(),
        };
        let output = work.await;
        drop(waiter);
        output
    }

    /// `true` if work for `key` is currently running.
    pub fn is_in_flight(&self, key: &K) -> bool {
        self.lock()
            .get(key)
            .is_some_and(|flight| flight.work.peek().is_none())
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<K, Flight<T>>> {
        self.in_flight.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// One caller's stake in a flight. Dropping it (on completion or on
/// cancellation) releases the stake; the entry goes once the work has
/// finished or nobody is left waiting.
struct Waiter<'a, K, T>
where
    K: Eq + Hash + Clone,
    T: Clone + Send + Sync + 'static,
{
    flights: &'a SingleFlight<K, T>,
    key: K,
    work: SharedWork<T>,
}

impl<K, T> Drop for Waiter<'_, K, T>
where
    K: Eq + Hash + Clone,
    T: Clone + Send + Sync + 'static,
{
    fn drop(&mut self) {
        let mut map = self.flights.lock();
        let Some(flight) = map.get_mut(&self.key) else {
            return;
        };
        if !flight.work.ptr_eq(&self.work) {
            return;
        }
        flight.waiters = flight.waiters.saturating_sub(1);
        if flight.waiters == 0 || flight.work.peek().is_some() {
            map.remove(&self.key);
        }
    }
}

impl<K, T> Default for SingleFlight<K, T>
where
    K: Eq + Hash + Clone,
    T: Clone + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}
