//! Concurrency throttle for record actions.
//!
//! Wraps an async operation so that no more than `limit` invocations run at
//! once, however many callers are waiting on it. A slot is freed when an
//! invocation completes, whether it succeeded or failed.

use std::{future::Future, sync::Arc};

use tokio::sync::Semaphore;

use super::SweepError;

/// Caps the number of concurrently executing invocations.
#[derive(Debug, Clone)]
pub struct Throttle {
    permits: Arc<Semaphore>,
    limit: usize,
}

impl Throttle {
    /// Create a throttle allowing `limit` invocations at once.
    ///
    /// A limit of 0 would never admit anything and is rejected.
    pub fn new(limit: usize) -> Result<Self, SweepError> {
        if limit == 0 {
            return Err(SweepError::Config(
                "concurrency limit must be at least 1".to_string(),
            ));
        }
        Ok(Self {
            permits: Arc::new(Semaphore::new(limit)),
            limit,
        })
    }

    /// Number of invocations currently holding a slot.
    pub fn in_flight(&self) -> usize {
        self.limit - self.permits.available_permits()
    }

    /// Run `fut` once a slot is free, releasing the slot when it completes.
    pub async fn run<Fut>(&self, fut: Fut) -> Result<Fut::Output, SweepError>
    where
        Fut: Future,
    {
        let _permit = self
            .permits
            .acquire()
            .await
            .map_err(|_| SweepError::ThrottleClosed)?;
        Ok(fut.await)
    }

    /// Wrap `action` so every call goes through this throttle.
    pub fn wrap<F>(self, action: F) -> Throttled<F> {
        Throttled {
            throttle: self,
            action,
        }
    }
}

/// An operation whose invocations are limited by a [`Throttle`].
///
/// Has the same input and output as the wrapped operation, except that the
/// output is returned in a `Result` in case the throttle is closed.
pub struct Throttled<F> {
    throttle: Throttle,
    action: F,
}

impl<F> Throttled<F> {
    /// Invoke the wrapped operation with `input`, waiting for a free slot first.
    ///
    /// The operation is not started until the slot is held.
    pub async fn call<I, Fut>(&self, input: I) -> Result<Fut::Output, SweepError>
    where
        F: Fn(I) -> Fut,
        Fut: Future,
    {
        let _permit = self
            .throttle
            .permits
            .acquire()
            .await
            .map_err(|_| SweepError::ThrottleClosed)?;
        Ok((self.action)(input).await)
    }

    pub fn throttle(&self) -> &Throttle {
        &self.throttle
    }
}

/// Wrap `action` so at most `limit` of its invocations run at once.
pub fn throttle<F>(action: F, limit: usize) -> Result<Throttled<F>, SweepError> {
    Ok(Throttle::new(limit)?.wrap(action))
}
