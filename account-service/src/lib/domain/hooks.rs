//! Before/after extension points shared by every service.
//!
//! A before-hook runs inline and can veto the operation. An after-hook is
//! fire-and-forget: it runs on its own tokio task, detached from the caller's
//! cancellation, bounded by a timeout, and its failures and panics are only
//! logged.

use std::sync::Arc;
use std::time::Duration;

use futures::future::BoxFuture;
use tokio::task::JoinHandle;

use crate::domain::errors::AccountError;

/// Synchronous veto hook. Returning an error aborts the operation.
pub type BeforeHook<A> = Arc<dyn Fn(&A) -> anyhow::Result<()> + Send + Sync>;

/// Asynchronous post-action hook.
pub type AfterHook<A> = Arc<dyn Fn(A) -> BoxFuture<'static, anyhow::Result<()>> + Send + Sync>;

/// Default bound on a single after-hook run.
pub const DEFAULT_HOOK_TIMEOUT: Duration = Duration::from_secs(10);

/// Wrap a closure as a before-hook.
pub fn before<A, F>(f: F) -> BeforeHook<A>
where
    F: Fn(&A) -> anyhow::Result<()> + Send + Sync + 'static,
{
    Arc::new(f)
}

/// Wrap an async closure as an after-hook.
///
/// ```ignore
/// let hook = hooks::after(|user: User| async move {
///     mailer.send_welcome(&user.email).await
/// });
/// ```
pub fn after<A, F, Fut>(f: F) -> AfterHook<A>
where
    F: Fn(A) -> Fut + Send + Sync + 'static,
    Fut: std::future::Future<Output = anyhow::Result<()>> + Send + 'static,
{
    Arc::new(move |arg| Box::pin(f(arg)))
}

/// Runs hooks on behalf of a service.
#[derive(Debug, Clone, Copy)]
pub struct HookDispatcher {
    timeout: Duration,
}

impl Default for HookDispatcher {
    fn default() -> Self {
        Self::new(DEFAULT_HOOK_TIMEOUT)
    }
}

impl HookDispatcher {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Run a before-hook inline.
    ///
    /// # Errors
    /// * `Blocked` - The hook vetoed `operation`
    pub fn run_before<A>(
        &self,
        operation: &'static str,
        hook: Option<&BeforeHook<A>>,
        arg: &A,
    ) -> Result<(), AccountError> {
        let Some(hook) = hook else {
            return Ok(());
        };

        hook(arg).map_err(|e| {
            tracing::warn!(operation, reason = %e, "Operation blocked by before-hook");
            AccountError::Blocked {
                operation,
                reason: e.to_string(),
            }
        })
    }

    /// Dispatch an after-hook on a detached task.
    ///
    /// Returns the supervising task handle so callers (mostly tests) can wait
    /// for completion. The handle never resolves to a hook error; those are
    /// logged here. Outside a tokio runtime the hook is skipped.
    pub fn dispatch_after<A>(
        &self,
        operation: &'static str,
        hook: Option<&AfterHook<A>>,
        arg: A,
    ) -> Option<JoinHandle<()>>
    where
        A: Send + 'static,
    {
        let hook = Arc::clone(hook?);

        let runtime = match tokio::runtime::Handle::try_current() {
            Ok(runtime) => runtime,
            Err(_) => {
                tracing::warn!(operation, "No async runtime available, after-hook skipped");
                return None;
            }
        };

        let timeout = self.timeout;
        let supervisor = runtime.spawn(async move {
            // Building the future happens inside the task so a panicking
            // hook body is caught by the join handle as well.
            let mut task = tokio::spawn(async move { hook(arg).await });

            match tokio::time::timeout(timeout, &mut task).await {
                Ok(Ok(Ok(()))) => {
                    tracing::debug!(operation, "After-hook completed");
                }
                Ok(Ok(Err(e))) => {
                    tracing::error!(operation, error = %e, "After-hook failed");
                }
                Ok(Err(join_error)) if join_error.is_panic() => {
                    tracing::error!(operation, "After-hook panicked");
                }
                Ok(Err(join_error)) => {
                    tracing::error!(operation, error = %join_error, "After-hook task aborted");
                }
                Err(_) => {
                    task.abort();
                    tracing::warn!(
                        operation,
                        timeout_ms = timeout.as_millis() as u64,
                        "After-hook timed out"
                    );
                }
            }
        });

        Some(supervisor)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicBool;
    use std::sync::atomic::Ordering;

    use super::*;

    #[test]
    fn test_run_before_without_hook() {
        let dispatcher = HookDispatcher::default();
        assert!(dispatcher.run_before::<u32>("login", None, &1).is_ok());
    }

    #[test]
    fn test_run_before_veto() {
        let dispatcher = HookDispatcher::default();
        let hook: BeforeHook<u32> = before(|n: &u32| {
            if *n > 1 {
                anyhow::bail!("too many")
            }
            Ok(())
        });

        assert!(dispatcher.run_before("login", Some(&hook), &1).is_ok());

        let err = dispatcher.run_before("login", Some(&hook), &2).unwrap_err();
        assert_eq!(
            err,
            AccountError::Blocked {
                operation: "login",
                reason: "too many".to_string()
            }
        );
        assert_eq!(err.to_string(), "login blocked: too many");
    }

    #[tokio::test]
    async fn test_dispatch_after_runs_hook() {
        let dispatcher = HookDispatcher::default();
        let called = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&called);

        let hook: AfterHook<String> = after(move |value: String| {
            let flag = Arc::clone(&flag);
            async move {
                assert_eq!(value, "hello");
                flag.store(true, Ordering::SeqCst);
                Ok::<(), anyhow::Error>(())
            }
        });

        let handle = dispatcher
            .dispatch_after("register", Some(&hook), "hello".to_string())
            .expect("hook should be dispatched");
        handle.await.unwrap();

        assert!(called.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_dispatch_after_swallows_errors_and_panics() {
        let dispatcher = HookDispatcher::default();

        let failing: AfterHook<()> =
            after(|_: ()| async { Err::<(), _>(anyhow::anyhow!("smtp down")) });
        let panicking: AfterHook<()> =
            Arc::new(|_: ()| -> BoxFuture<'static, anyhow::Result<()>> { panic!("hook exploded") });

        let first = dispatcher.dispatch_after("register", Some(&failing), ()).unwrap();
        let second = dispatcher
            .dispatch_after("register", Some(&panicking), ())
            .unwrap();

        assert!(first.await.is_ok());
        assert!(second.await.is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn test_dispatch_after_times_out() {
        let dispatcher = HookDispatcher::new(Duration::from_millis(50));
        let finished = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&finished);

        let slow: AfterHook<()> = after(move |_: ()| {
            let flag = Arc::clone(&flag);
            async move {
                tokio::time::sleep(Duration::from_secs(60)).await;
                flag.store(true, Ordering::SeqCst);
                Ok::<(), anyhow::Error>(())
            }
        });

        let handle = dispatcher.dispatch_after("login", Some(&slow), ()).unwrap();
        handle.await.unwrap();

        assert!(!finished.load(Ordering::SeqCst));
    }

    #[test]
    fn test_dispatch_after_without_runtime() {
        let dispatcher = HookDispatcher::default();
        let hook: AfterHook<()> = after(|_: ()| async { Ok::<(), anyhow::Error>(()) });

        assert!(dispatcher.dispatch_after("login", Some(&hook), ()).is_none());
    }
}
