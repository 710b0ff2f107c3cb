//! Keyed single-flight guard.
//!
//! A second caller for a key that already has work in flight awaits the same
//! shared future instead of starting new work. The entry is removed when the
//! work finishes, whether it succeeded or failed, through an RAII guard held
//! by the shared future itself.

use std::collections::HashMap;
use std::future::Future;
use std::hash::Hash;
use std::sync::{Arc, Mutex};

use futures_util::future::{BoxFuture, FutureExt, Shared};

use crate::lock;

type InFlight<T> = Shared<BoxFuture<'static, T>>;
type Registry<K, T> = Arc<Mutex<HashMap<K, InFlight<T>>>>;

pub struct SingleFlight<K, T>
where
    T: Clone,
{
    in_flight: Registry<K, T>,
}

impl<K, T> SingleFlight<K, T>
where
    K: Eq + Hash + Clone + Send + Sync + 'static,
    T: Clone + Send + Sync + 'static,
{
    pub fn new() -> Self {
        Self {
            in_flight: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Run `work` for `key`, or join the run already in flight.
    ///
    /// `work` is only invoked by the caller that starts a new flight, and only
    /// to build the future; it must not call back into this guard.
    pub async fn run<F, Fut>(&self, key: K, work: F) -> T
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T> + Send + 'static,
    {
        let flight = {
            let mut map = lock(&self.in_flight);
            match map.get(&key) {
                Some(existing) => {
                    tracing::debug!("Joining in-flight request");
                    existing.clone()
                }
                None => {
                    let inner = work();
                    let guard = FlightGuard {
                        registry: Arc::clone(&self.in_flight),
                        key: key.clone(),
                    };
                    let flight = async move {
                        let _guard = guard;
                        inner.await
                    }
                    .boxed()
                    .shared();
                    map.insert(key, flight.clone());
                    flight
                }
            }
        };
        flight.await
    }

    /// Number of keys with work in flight.
    pub fn in_flight(&self) -> usize {
        lock(&self.in_flight).len()
    }

    pub fn is_in_flight(&self, key: &K) -> bool {
        lock(&self.in_flight).contains_key(key)
    }
}

impl<K, T> Default for SingleFlight<K, T>
where
    K: Eq + Hash + Clone + Send + Sync + 'static,
    T: Clone + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

// ═══════════════════════════════════════════════════════════
// FlightGuard: removes the registry entry when the work ends
// ═══════════════════════════════════════════════════════════

struct FlightGuard<K, T>
where
    K: Eq + Hash,
    T: Clone,
{
    registry: Registry<K, T>,
    key: K,
}

impl<K, T> Drop for FlightGuard<K, T>
where
    K: Eq + Hash,
    T: Clone,
{
    fn drop(&mut self) {
        let mut map = lock(&self.registry);
        map.remove(&self.key);
    }
}
