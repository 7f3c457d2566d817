//! Readiness signalling for device buffers.
//!
//! A device buffer's data is materialized asynchronously by the client.
//! The producer holds a [`ReadyPromise`] and fulfills it exactly once;
//! every consumer holds a clone of the matching [`ReadyFuture`] and must
//! see it resolve to `Ok(())` before reading the buffer.

use crate::{Error, Result};
use futures::channel::oneshot;
use futures::future::{BoxFuture, FutureExt, Shared};
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

/// Completion signal of an asynchronous device operation.
///
/// Cheap to clone; all clones observe the same result. Can be awaited from
/// async code or waited on synchronously with
/// [`block_until_ready`](ReadyFuture::block_until_ready).
#[derive(Clone)]
pub struct ReadyFuture {
    inner: Shared<BoxFuture<'static, Result<()>>>,
}

/// Producer side of a [`ReadyFuture`].
///
/// Dropping a promise without fulfilling it resolves the future to an
/// [`Error::Internal`].
pub struct ReadyPromise {
    sender: oneshot::Sender<Result<()>>,
}

impl ReadyFuture {
    /// Create an unresolved future and the promise that resolves it.
    pub fn pair() -> (ReadyPromise, ReadyFuture) {
        let (sender, receiver) = oneshot::channel();
        let inner = receiver
            .map(|result| {
                result.unwrap_or_else(|_| {
                    Err(Error::Internal(
                        "readiness promise dropped before completion".to_string(),
                    ))
                })
            })
            .boxed()
            .shared();
        (ReadyPromise { sender }, ReadyFuture { inner })
    }

    /// A future that has already resolved successfully.
    pub fn ready() -> Self {
        Self::resolved(Ok(()))
    }

    /// A future that has already resolved with `error`.
    pub fn failed(error: Error) -> Self {
        Self::resolved(Err(error))
    }

    fn resolved(result: Result<()>) -> Self {
        Self {
            inner: futures::future::ready(result).boxed().shared(),
        }
    }

    /// Block the calling thread until the future resolves.
    pub fn block_until_ready(&self) -> Result<()> {
        pollster::block_on(self.inner.clone())
    }

    /// Whether the future has resolved, without blocking.
    pub fn is_ready(&self) -> bool {
        self.inner.clone().now_or_never().is_some()
    }
}

impl Future for ReadyFuture {
    type Output = Result<()>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        self.inner.poll_unpin(cx)
    }
}

impl fmt::Debug for ReadyFuture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReadyFuture")
            .field("ready", &self.is_ready())
            .finish()
    }
}

impl ReadyPromise {
    pub fn set(self, result: Result<()>) {
        // Nobody waiting is fine; the buffer may already be gone.
        let _ = self.sender.send(result);
    }

    pub fn set_ready(self) {
        self.set(Ok(()));
    }

    pub fn set_error(self, error: Error) {
        self.set(Err(error));
    }
}

impl fmt::Debug for ReadyPromise {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReadyPromise").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ready_future_is_resolved() {
        let future = ReadyFuture::ready();
        assert!(future.is_ready());
        assert_eq!(future.block_until_ready(), Ok(()));
    }

    #[test]
    fn test_failed_future_reports_error() {
        let future = ReadyFuture::failed(Error::Internal("device lost".to_string()));
        assert_eq!(
            future.block_until_ready(),
            Err(Error::Internal("device lost".to_string()))
        );
    }

    #[test]
    fn test_pair_resolves_all_clones() {
        let (promise, future) = ReadyFuture::pair();
        let other = future.clone();
        assert!(!future.is_ready());

        promise.set_ready();
        assert!(future.is_ready());
        assert_eq!(other.block_until_ready(), Ok(()));
        assert_eq!(future.block_until_ready(), Ok(()));
    }

    #[test]
    fn test_promise_fulfilled_from_another_thread() {
        let (promise, future) = ReadyFuture::pair();
        let handle = std::thread::spawn(move || {
            std::thread::sleep(std::time::Duration::from_millis(10));
            promise.set_error(Error::ResourceExhausted("out of memory".to_string()));
        });

        let result = future.block_until_ready();
        handle.join().unwrap();
        assert!(matches!(result, Err(Error::ResourceExhausted(_))));
    }

    #[test]
    fn test_dropped_promise_fails_future() {
        let (promise, future) = ReadyFuture::pair();
        drop(promise);
        assert!(matches!(
            future.block_until_ready(),
            Err(Error::Internal(_))
        ));
    }

    #[pollster::test]
    async fn test_future_can_be_awaited() {
        let (promise, future) = ReadyFuture::pair();
        promise.set_ready();
        assert_eq!(future.await, Ok(()));
    }
}
