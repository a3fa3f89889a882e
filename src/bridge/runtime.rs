// src/bridge/runtime.rs

//! Private scheduler instances and the ledger that accounts for them.

use std::future::Future;
use std::io;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use tokio::runtime::{Builder, Runtime};

use super::{BridgeError, panic_message};

/// Creation/teardown counters for schedulers and worker threads.
#[derive(Debug, Default)]
pub struct RuntimeLedger {
    runtimes_created: AtomicUsize,
    runtimes_torn_down: AtomicUsize,
    teardowns_overran: AtomicUsize,
    threads_spawned: AtomicUsize,
    threads_joined: AtomicUsize,
}

impl RuntimeLedger {
    pub fn snapshot(&self) -> LedgerSnapshot {
        LedgerSnapshot {
            runtimes_created: self.runtimes_created.load(Ordering::SeqCst),
            runtimes_torn_down: self.runtimes_torn_down.load(Ordering::SeqCst),
            teardowns_overran: self.teardowns_overran.load(Ordering::SeqCst),
            threads_spawned: self.threads_spawned.load(Ordering::SeqCst),
            threads_joined: self.threads_joined.load(Ordering::SeqCst),
        }
    }

    pub(crate) fn record_thread_spawned(&self) {
        self.threads_spawned.fetch_add(1, Ordering::SeqCst);
    }

    pub(crate) fn record_thread_joined(&self) {
        self.threads_joined.fetch_add(1, Ordering::SeqCst);
    }
}

/// Point-in-time copy of a [`RuntimeLedger`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LedgerSnapshot {
    pub runtimes_created: usize,
    pub runtimes_torn_down: usize,
    /// Teardowns that used up the whole grace period. Blocking tasks of
    /// those runtimes may still be running on detached threads.
    pub teardowns_overran: usize,
    pub threads_spawned: usize,
    pub threads_joined: usize,
}

impl LedgerSnapshot {
    pub fn runtimes_alive(&self) -> usize {
        self.runtimes_created.saturating_sub(self.runtimes_torn_down)
    }

    pub fn threads_alive(&self) -> usize {
        self.threads_spawned.saturating_sub(self.threads_joined)
    }

    /// Every scheduler and thread created so far has been released.
    ///
    /// A runtime counts as released once its shutdown returns, including
    /// shutdowns listed in `teardowns_overran`.
    pub fn is_balanced(&self) -> bool {
        self.runtimes_alive() == 0 && self.threads_alive() == 0
    }
}

/// A current-thread runtime owned by exactly one bridge call.
///
/// Dropping the guard shuts the runtime down, so teardown also happens while
/// unwinding.
pub(crate) struct PrivateRuntime {
    runtime: Option<Runtime>,
    ledger: Arc<RuntimeLedger>,
    grace: Duration,
}

impl PrivateRuntime {
    pub(crate) fn new(ledger: Arc<RuntimeLedger>, grace: Duration) -> io::Result<Self> {
        let runtime = Builder::new_current_thread().enable_all().build()?;
        ledger.runtimes_created.fetch_add(1, Ordering::SeqCst);
        Ok(Self {
            runtime: Some(runtime),
            ledger,
            grace,
        })
    }

    /// Run `work` to completion, honoring an optional deadline.
    ///
    /// The work is spawned as a task so that a panic or cancellation surfaces
    /// as a `JoinError` instead of unwinding through the caller.
    pub(crate) fn drive<T, E, F>(
        &self,
        work: F,
        deadline: Option<Duration>,
    ) -> Result<T, BridgeError<E>>
    where
        F: Future<Output = Result<T, E>> + Send + 'static,
        T: Send + 'static,
        E: Send + 'static,
    {
        let runtime = self.runtime.as_ref().ok_or_else(|| {
            BridgeError::Runtime(io::Error::other("private scheduler already torn down"))
        })?;

        let task = runtime.spawn(async move {
            match deadline {
                Some(limit) => tokio::time::timeout(limit, work)
                    .await
                    .map_err(|_| limit),
                None => Ok(work.await),
            }
        });

        match runtime.block_on(task) {
            Ok(Ok(Ok(value))) => Ok(value),
            Ok(Ok(Err(error))) => Err(BridgeError::Work(error)),
            Ok(Err(limit)) => Err(BridgeError::TimedOut(limit)),
            Err(join_error) if join_error.is_panic() => Err(BridgeError::Panicked(
                panic_message(join_error.into_panic()),
            )),
            Err(_) => Err(BridgeError::Cancelled),
        }
    }
}

impl Drop for PrivateRuntime {
    fn drop(&mut self) {
        if let Some(runtime) = self.runtime.take() {
            let started = Instant::now();
            runtime.shutdown_timeout(self.grace);
            if started.elapsed() >= self.grace {
                self.ledger.teardowns_overran.fetch_add(1, Ordering::SeqCst);
            }
            self.ledger
                .runtimes_torn_down
                .fetch_add(1, Ordering::SeqCst);
        }
    }
}
