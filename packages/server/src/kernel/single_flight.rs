//! Collapse concurrent calls for the same key into one in-flight execution.

use std::collections::HashMap;
use std::future::Future;
use std::hash::Hash;
use std::sync::{Arc, Mutex, MutexGuard};

use futures::future::{BoxFuture, FutureExt, Shared};
use thiserror::Error;

/// The spawned call ended without producing a value (panic or runtime shutdown).
#[derive(Debug, Clone, Error)]
#[error("in-flight call did not complete: {0}")]
pub struct FlightError(String);

type InFlight<T> = Shared<BoxFuture<'static, Result<T, FlightError>>>;
type Calls<K, T> = Arc<Mutex<HashMap<K, InFlight<T>>>>;

/// Every caller that arrives while a call for `key` is running awaits that
/// call's result instead of starting its own. Outputs must be `Clone` so each
/// waiter gets a copy.
///
/// Calls run on their own task, so a caller that is dropped midway (a client
/// disconnect, a timeout) never leaves the call stalled with resources held.
pub struct SingleFlight<K, T: Clone> {
    calls: Calls<K, T>,
}

impl<K, T: Clone> Default for SingleFlight<K, T> {
    fn default() -> Self {
        Self {
            calls: Arc::new(Mutex::new(HashMap::new())),
        }
    }
}

impl<K, T> SingleFlight<K, T>
where
    K: Eq + Hash + Clone + Send + 'static,
    T: Clone + Send + Sync + 'static,
{
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `make()` for `key` unless a call is already in flight, in which
    /// case join it. The entry is removed once the call settles, so the next
    /// caller starts fresh.
    ///
    /// Must be called from within a tokio runtime.
    pub async fn run<F, Fut>(&self, key: K, make: F) -> Result<T, FlightError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T> + Send + 'static,
    {
        let shared = {
            let mut calls = lock(&self.calls);
            match calls.get(&key) {
                Some(existing) => existing.clone(),
                None => {
                    let release = Release {
                        calls: Arc::clone(&self.calls),
                        key: key.clone(),
                    };
                    let fut = make();
                    let handle = tokio::spawn(async move {
                        let _release = release;
                        fut.await
                    });
                    let shared = handle
                        .map(|joined| joined.map_err(|e| FlightError(e.to_string())))
                        .boxed()
                        .shared();
                    calls.insert(key, shared.clone());
                    shared
                }
            }
        };
        shared.await
    }

    /// Keys with a call currently in flight.
    pub fn in_flight(&self) -> usize {
        lock(&self.calls).len()
    }
}

/// Removes the key when the spawned call finishes, panics included.
struct Release<K: Eq + Hash, T: Clone> {
    calls: Calls<K, T>,
    key: K,
}

impl<K: Eq + Hash, T: Clone> Drop for Release<K, T> {
    fn drop(&mut self) {
        lock(&self.calls).remove(&self.key);
    }
}

fn lock<K, T>(calls: &Mutex<HashMap<K, InFlight<T>>>) -> MutexGuard<'_, HashMap<K, InFlight<T>>>
where
    T: Clone,
{
    // The map stays consistent even if a holder panicked mid-insert.
    calls.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[tokio::test(start_paused = true)]
    async fn concurrent_callers_share_one_execution() {
        let flight: SingleFlight<&'static str, usize> = SingleFlight::new();
        let runs = Arc::new(AtomicUsize::new(0));

        let call = || {
            let runs = runs.clone();
            flight.run("KAKAO", move || async move {
                tokio::time::sleep(Duration::from_millis(100)).await;
                runs.fetch_add(1, Ordering::SeqCst) + 1
            })
        };

        let (a, b, c) = tokio::join!(call(), call(), call());
        assert_eq!((a.unwrap(), b.unwrap(), c.unwrap()), (1, 1, 1));
        assert_eq!(runs.load(Ordering::SeqCst), 1);
        assert_eq!(flight.in_flight(), 0);
    }

    #[tokio::test]
    async fn settled_call_is_not_reused() {
        let flight: SingleFlight<u8, usize> = SingleFlight::new();
        let runs = Arc::new(AtomicUsize::new(0));

        for expected in 1..=2 {
            let runs = runs.clone();
            let out = flight
                .run(1, move || async move { runs.fetch_add(1, Ordering::SeqCst) + 1 })
                .await
                .unwrap();
            assert_eq!(out, expected);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn different_keys_run_independently() {
        let flight: SingleFlight<&'static str, &'static str> = SingleFlight::new();
        let slow = |name: &'static str| async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            name
        };

        let (a, b) = tokio::join!(
            flight.run("LINE", || slow("LINE")),
            flight.run("TOSS", || slow("TOSS")),
        );
        assert_eq!((a.unwrap(), b.unwrap()), ("LINE", "TOSS"));
    }

    #[tokio::test(start_paused = true)]
    async fn abandoned_call_still_runs_to_completion() {
        let flight: Arc<SingleFlight<&'static str, usize>> = Arc::new(SingleFlight::new());
        let runs = Arc::new(AtomicUsize::new(0));

        let caller = {
            let flight = flight.clone();
            let runs = runs.clone();
            tokio::spawn(async move {
                flight
                    .run("NAVER", move || async move {
                        tokio::time::sleep(Duration::from_millis(100)).await;
                        runs.fetch_add(1, Ordering::SeqCst) + 1
                    })
                    .await
            })
        };

        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(flight.in_flight(), 1);
        caller.abort();

        tokio::time::sleep(Duration::from_millis(200)).await;
        assert_eq!(runs.load(Ordering::SeqCst), 1);
        assert_eq!(flight.in_flight(), 0);
    }

    #[tokio::test]
    async fn panicking_call_is_reported_and_released() {
        let flight: SingleFlight<u8, usize> = SingleFlight::new();

        let fail = true;
        let out = flight
            .run(7, move || async move {
                if fail {
                    panic!("crawler blew up");
                }
                0
            })
            .await;

        assert!(out.is_err());
        assert_eq!(flight.in_flight(), 0);
    }
}
