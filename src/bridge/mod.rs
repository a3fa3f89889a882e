// src/bridge/mod.rs

//! Execution bridge: run an asynchronous work unit from synchronous code.
//!
//! Two strategies sit behind one entry point:
//! - **Inline**: no scheduler owns the calling thread, so a private
//!   current-thread runtime is created, driven to completion and torn down.
//! - **Offloaded**: a scheduler already owns the calling thread. Blocking it
//!   on its own runtime would deadlock, so the work moves to a fresh worker
//!   thread with its own private runtime. The outcome comes back through a
//!   one-shot slot and the worker is joined before returning.
//!
//! Every runtime created here is torn down before `run_to_completion`
//! returns, on success, failure, deadline expiry and panic alike.

mod runtime;

use std::any::Any;
use std::future::Future;
use std::io;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use futures::channel::oneshot;
use thiserror::Error;
use tokio::runtime::Handle;

use crate::logging::Logger;

pub use runtime::{LedgerSnapshot, RuntimeLedger};
use runtime::PrivateRuntime;

/// Default bound on private runtime shutdown.
pub const DEFAULT_TEARDOWN_GRACE: Duration = Duration::from_millis(1000);

/// How a work unit is executed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    /// Private runtime on the calling thread.
    Inline,
    /// Private runtime on a dedicated worker thread.
    Offloaded,
}

impl Strategy {
    /// Pick the strategy for the current thread of control.
    pub fn probe() -> Self {
        match Handle::try_current() {
            Ok(_) => Strategy::Offloaded,
            Err(_) => Strategy::Inline,
        }
    }
}

/// Failure of a bridged work unit.
///
/// `Work` carries the work unit's own error untouched. The remaining variants
/// describe a work unit that did not finish normally or bridge mechanics that
/// broke down.
#[derive(Debug, Error)]
pub enum BridgeError<E> {
    #[error("{0}")]
    Work(E),

    #[error("work unit exceeded its {}ms deadline", .0.as_millis())]
    TimedOut(Duration),

    #[error("work unit was cancelled")]
    Cancelled,

    #[error("work unit panicked: {0}")]
    Panicked(String),

    #[error("failed to create private scheduler: {0}")]
    Runtime(#[source] io::Error),

    #[error("failed to start worker thread: {0}")]
    Spawn(#[source] io::Error),

    #[error("result slot closed before a result was written")]
    ResultLost,
}

impl<E> BridgeError<E> {
    /// True when the bridge itself failed rather than the work unit.
    pub fn is_mechanical(&self) -> bool {
        self.mechanical_reason().is_some()
    }

    /// Description of a bridge mechanics failure, if this is one.
    pub fn mechanical_reason(&self) -> Option<String> {
        match self {
            BridgeError::Runtime(error) => {
                Some(format!("failed to create private scheduler: {error}"))
            }
            BridgeError::Spawn(error) => Some(format!("failed to start worker thread: {error}")),
            BridgeError::ResultLost => {
                Some("result slot closed before a result was written".to_string())
            }
            _ => None,
        }
    }
}

/// Runs work units to completion for synchronous callers.
#[derive(Clone)]
pub struct ExecutionBridge {
    ledger: Arc<RuntimeLedger>,
    logger: Arc<dyn Logger>,
    teardown_grace: Duration,
    #[cfg(test)]
    refuse_runtimes: bool,
}

impl ExecutionBridge {
    pub fn new(logger: Arc<dyn Logger>) -> Self {
        Self {
            ledger: Arc::new(RuntimeLedger::default()),
            logger,
            teardown_grace: DEFAULT_TEARDOWN_GRACE,
            #[cfg(test)]
            refuse_runtimes: false,
        }
    }

    /// Fail every private runtime creation, to exercise mechanics failures.
    #[cfg(test)]
    pub(crate) fn refusing_runtimes(mut self) -> Self {
        self.refuse_runtimes = true;
        self
    }

    #[cfg(test)]
    fn refuses_runtimes(&self) -> bool {
        self.refuse_runtimes
    }

    #[cfg(not(test))]
    fn refuses_runtimes(&self) -> bool {
        false
    }

    /// Bound how long a private runtime may take to shut down.
    pub fn with_teardown_grace(mut self, grace: Duration) -> Self {
        self.teardown_grace = grace;
        self
    }

    /// Creation/teardown counts across every call made through this bridge.
    pub fn ledger(&self) -> LedgerSnapshot {
        self.ledger.snapshot()
    }

    /// Run `work` to completion and hand back its outcome.
    ///
    /// `deadline` bounds the work unit; on expiry the work is dropped and
    /// `BridgeError::TimedOut` is returned after the runtime is torn down.
    pub fn run_to_completion<T, E, F>(
        &self,
        work: F,
        deadline: Option<Duration>,
    ) -> Result<T, BridgeError<E>>
    where
        F: Future<Output = Result<T, E>> + Send + 'static,
        T: Send + 'static,
        E: Send + 'static,
    {
        let strategy = Strategy::probe();
        self.logger
            .debug(&format!("Execution bridge strategy: {strategy:?}"));

        let outcome = match strategy {
            Strategy::Inline => self.run_inline(work, deadline),
            Strategy::Offloaded => self.run_offloaded(work, deadline),
        };

        if let Err(error) = &outcome {
            if let Some(reason) = error.mechanical_reason() {
                self.logger.error(&format!("Execution bridge failure: {reason}"));
            }
        }
        outcome
    }

    fn run_inline<T, E, F>(&self, work: F, deadline: Option<Duration>) -> Result<T, BridgeError<E>>
    where
        F: Future<Output = Result<T, E>> + Send + 'static,
        T: Send + 'static,
        E: Send + 'static,
    {
        let runtime = open_runtime(
            Arc::clone(&self.ledger),
            self.teardown_grace,
            self.refuses_runtimes(),
        )
        .map_err(BridgeError::Runtime)?;
        let outcome = runtime.drive(work, deadline);
        drop(runtime);
        outcome
    }

    fn run_offloaded<T, E, F>(
        &self,
        work: F,
        deadline: Option<Duration>,
    ) -> Result<T, BridgeError<E>>
    where
        F: Future<Output = Result<T, E>> + Send + 'static,
        T: Send + 'static,
        E: Send + 'static,
    {
        let (slot, pending) = oneshot::channel();
        let ledger = Arc::clone(&self.ledger);
        let grace = self.teardown_grace;
        let refuse = self.refuses_runtimes();

        let worker = thread::Builder::new()
            .name("bridge-worker".to_string())
            .spawn(move || {
                let outcome = match open_runtime(ledger, grace, refuse) {
                    // Runtime is dropped at the end of this arm, before the slot is written.
                    Ok(runtime) => runtime.drive(work, deadline),
                    Err(error) => Err(BridgeError::Runtime(error)),
                };
                let _ = slot.send(outcome);
            })
            .map_err(BridgeError::Spawn)?;
        self.ledger.record_thread_spawned();

        let received = futures::executor::block_on(pending);
        let joined = worker.join();
        self.ledger.record_thread_joined();

        match (received, joined) {
            (Ok(outcome), _) => outcome,
            (Err(_), Err(payload)) => Err(BridgeError::Panicked(panic_message(payload))),
            (Err(_), Ok(())) => Err(BridgeError::ResultLost),
        }
    }
}

impl std::fmt::Debug for ExecutionBridge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExecutionBridge")
            .field("ledger", &self.ledger.snapshot())
            .field("teardown_grace", &self.teardown_grace)
            .finish()
    }
}

fn open_runtime(
    ledger: Arc<RuntimeLedger>,
    grace: Duration,
    refuse: bool,
) -> io::Result<PrivateRuntime> {
    if refuse {
        return Err(io::Error::other("runtime creation refused"));
    }
    PrivateRuntime::new(ledger, grace)
}

pub(crate) fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(message) = payload.downcast_ref::<&'static str>() {
        return (*message).to_string();
    }
    if let Some(message) = payload.downcast_ref::<String>() {
        return message.clone();
    }
    "non-string panic payload".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logging::{LogLevel, MemoryLogger};

    fn bridge() -> ExecutionBridge {
        ExecutionBridge::new(Arc::new(MemoryLogger::new()))
            .with_teardown_grace(Duration::from_millis(200))
    }

    async fn answer() -> Result<u64, String> {
        tokio::task::yield_now().await;
        Ok(42)
    }

    #[test]
    fn test_probe_without_runtime_is_inline() {
        assert_eq!(Strategy::probe(), Strategy::Inline);
    }

    #[tokio::test]
    async fn test_probe_inside_runtime_is_offloaded() {
        assert_eq!(Strategy::probe(), Strategy::Offloaded);
    }

    #[test]
    fn test_inline_returns_value_and_tears_down() {
        let bridge = bridge();
        let value = bridge.run_to_completion(answer(), None).unwrap();
        assert_eq!(value, 42);

        let ledger = bridge.ledger();
        assert_eq!(ledger.runtimes_created, 1);
        assert_eq!(ledger.runtimes_torn_down, 1);
        assert_eq!(ledger.threads_spawned, 0);
        assert!(ledger.is_balanced());
    }

    #[tokio::test]
    async fn test_offloaded_returns_value_and_joins_worker() {
        let bridge = bridge();
        let value = bridge.run_to_completion(answer(), None).unwrap();
        assert_eq!(value, 42);

        let ledger = bridge.ledger();
        assert_eq!(ledger.runtimes_created, 1);
        assert_eq!(ledger.threads_spawned, 1);
        assert_eq!(ledger.threads_joined, 1);
        assert!(ledger.is_balanced());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_offloaded_from_multi_thread_runtime() {
        let bridge = bridge();
        let value = bridge.run_to_completion(answer(), None).unwrap();
        assert_eq!(value, 42);
        assert!(bridge.ledger().is_balanced());
    }

    #[test]
    fn test_strategy_is_transparent_to_outcome() {
        let inline = bridge().run_to_completion(answer(), None).unwrap();

        let ambient = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        let offloaded = ambient.block_on(async { bridge().run_to_completion(answer(), None) });

        assert_eq!(inline, offloaded.unwrap());
    }

    #[test]
    fn test_work_error_is_returned_unchanged() {
        let bridge = bridge();
        let outcome: Result<(), _> =
            bridge.run_to_completion(async { Err("upstream refused".to_string()) }, None);

        match outcome {
            Err(BridgeError::Work(message)) => assert_eq!(message, "upstream refused"),
            other => panic!("unexpected outcome: {other:?}"),
        }
        assert!(bridge.ledger().is_balanced());
    }

    #[test]
    fn test_deadline_expiry_inline_releases_runtime() {
        let bridge = bridge();
        let outcome: Result<(), BridgeError<String>> = bridge.run_to_completion(
            async {
                tokio::time::sleep(Duration::from_secs(30)).await;
                Ok(())
            },
            Some(Duration::from_millis(20)),
        );

        assert!(matches!(outcome, Err(BridgeError::TimedOut(_))));
        assert!(bridge.ledger().is_balanced());
    }

    #[tokio::test]
    async fn test_deadline_expiry_offloaded_releases_thread() {
        let bridge = bridge();
        let outcome: Result<(), BridgeError<String>> = bridge.run_to_completion(
            async {
                tokio::time::sleep(Duration::from_secs(30)).await;
                Ok(())
            },
            Some(Duration::from_millis(20)),
        );

        assert!(matches!(outcome, Err(BridgeError::TimedOut(_))));
        let ledger = bridge.ledger();
        assert_eq!(ledger.threads_spawned, 1);
        assert!(ledger.is_balanced());
    }

    #[test]
    fn test_panic_is_captured() {
        let bridge = bridge();
        let outcome: Result<(), BridgeError<String>> =
            bridge.run_to_completion(
                async {
                    if true {
                        panic!("selector blew up");
                    }
                    Ok(())
                },
                None,
            );

        match outcome {
            Err(BridgeError::Panicked(message)) => assert!(message.contains("selector blew up")),
            other => panic!("unexpected outcome: {other:?}"),
        }
        assert!(bridge.ledger().is_balanced());
    }

    #[tokio::test]
    async fn test_panic_is_captured_when_offloaded() {
        let bridge = bridge();
        let outcome: Result<(), BridgeError<String>> =
            bridge.run_to_completion(
                async {
                    if true {
                        panic!("offloaded panic");
                    }
                    Ok(())
                },
                None,
            );

        assert!(matches!(outcome, Err(BridgeError::Panicked(_))));
        assert!(bridge.ledger().is_balanced());
    }

    #[test]
    fn test_reentrant_call_does_not_deadlock() {
        let bridge = bridge();
        let inner = bridge.clone();
        let value = bridge
            .run_to_completion(
                async move {
                    inner
                        .run_to_completion(answer(), None)
                        .map(|v| v + 1)
                        .map_err(|e| e.to_string())
                },
                None,
            )
            .unwrap();
        assert_eq!(value, 43);

        let ledger = bridge.ledger();
        assert_eq!(ledger.runtimes_created, 2);
        assert_eq!(ledger.threads_spawned, 1);
        assert!(ledger.is_balanced());
    }

    #[test]
    fn test_repeated_calls_stay_balanced() {
        let bridge = bridge();
        for i in 0..5u64 {
            let value = bridge.run_to_completion(async move { Ok::<_, ()>(i * 2) }, None);
            assert_eq!(value.unwrap(), i * 2);
            assert!(bridge.ledger().is_balanced());
        }
        assert_eq!(bridge.ledger().runtimes_created, 5);
    }

    #[test]
    fn test_strategy_is_logged() {
        let logger = Arc::new(MemoryLogger::new());
        let bridge = ExecutionBridge::new(logger.clone());
        bridge
            .run_to_completion(async { Ok::<_, ()>(()) }, None)
            .unwrap();
        assert!(logger.contains(LogLevel::Debug, "Inline"));
    }

    #[test]
    fn test_runtime_creation_failure_is_mechanical() {
        let logger = Arc::new(MemoryLogger::new());
        let bridge = ExecutionBridge::new(logger.clone()).refusing_runtimes();
        let outcome = bridge.run_to_completion(answer(), None);

        assert!(matches!(outcome, Err(BridgeError::Runtime(_))));
        assert!(logger.contains(LogLevel::Error, "failed to create private scheduler"));
        assert_eq!(bridge.ledger().runtimes_created, 0);
    }

    #[test]
    fn test_mechanical_classification() {
        assert!(BridgeError::<()>::ResultLost.is_mechanical());
        assert!(BridgeError::<()>::Spawn(io::Error::other("no threads")).is_mechanical());
        assert!(!BridgeError::<()>::Cancelled.is_mechanical());
        assert!(!BridgeError::Work(()).is_mechanical());
    }
}
