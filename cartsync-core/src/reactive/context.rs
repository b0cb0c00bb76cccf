//! Sync Context
//!
//! The sync context records which concern's sync pass is currently running
//! on a task. Interceptor layers consult it: a cart-mutating request issued
//! *from inside* a sync pass is passed through but never emits a signal, so a
//! widget's own requests cannot trigger another round of syncs.
//!
//! # Implementation
//!
//! A task-local stack. A sync pass is a future, so a thread-local would leak
//! across unrelated tasks interleaved on the same thread; the task-local is
//! carried with the future wherever it is polled. A nested scope (a sync pass
//! awaiting another binding) sees the outer stack plus its own concern.

use std::future::Future;

use super::registry::Concern;

tokio::task_local! {
    static SYNC_STACK: Vec<Concern>;
}

/// Entry point for running and inspecting sync scopes.
pub struct SyncContext;

impl SyncContext {
    /// Run `fut` as a sync pass of `concern`.
    pub async fn scope<F>(concern: Concern, fut: F) -> F::Output
    where
        F: Future,
    {
        let stack = SYNC_STACK
            .try_with(|stack| {
                let mut nested = stack.clone();
                nested.push(concern);
                nested
            })
            .unwrap_or_else(|_| vec![concern]);

        SYNC_STACK.scope(stack, fut).await
    }

    /// The innermost concern whose sync pass is running on this task.
    pub fn current() -> Option<Concern> {
        SYNC_STACK
            .try_with(|stack| stack.last().copied())
            .ok()
            .flatten()
    }

    /// Whether the current task is inside any sync pass.
    pub fn is_active() -> bool {
        Self::current().is_some()
    }

    /// Every concern on the current task's stack, outermost first.
    pub fn stack() -> Vec<Concern> {
        SYNC_STACK
            .try_with(|stack| stack.clone())
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn context_tracks_concern() {
        assert!(!SyncContext::is_active());
        assert!(SyncContext::current().is_none());

        SyncContext::scope(Concern::Upsell, async {
            assert!(SyncContext::is_active());
            assert_eq!(SyncContext::current(), Some(Concern::Upsell));
        })
        .await;

        // Context should be cleaned up after the scope ends
        assert!(!SyncContext::is_active());
    }

    #[tokio::test]
    async fn nested_scopes() {
        SyncContext::scope(Concern::Recommendations, async {
            assert_eq!(SyncContext::current(), Some(Concern::Recommendations));

            SyncContext::scope(Concern::TermsGate, async {
                assert_eq!(SyncContext::current(), Some(Concern::TermsGate));
                assert_eq!(
                    SyncContext::stack(),
                    vec![Concern::Recommendations, Concern::TermsGate]
                );
            })
            .await;

            // After inner scope ends, outer should be current
            assert_eq!(SyncContext::current(), Some(Concern::Recommendations));
        })
        .await;

        assert!(SyncContext::current().is_none());
    }

    #[tokio::test]
    async fn scope_does_not_leak_into_spawned_tasks() {
        SyncContext::scope(Concern::Upsell, async {
            let seen = tokio::spawn(async { SyncContext::current() }).await.unwrap();
            assert_eq!(seen, None);
        })
        .await;
    }
}
