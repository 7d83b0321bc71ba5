#![deny(unsafe_code)]

use core::future::Future;
use core::pin::Pin;
use core::task::{Context, Poll, Waker};

/// Something a task can suspend on.
///
/// The protocol runs in three steps: `is_ready` is checked first; if it is
/// false the awaitable gets the suspended task's waker once through
/// `on_suspend` and is responsible for waking it later; once `is_ready`
/// reports true, `resume` is called exactly once to produce the value.
pub trait Awaitable {
    type Output;

    fn is_ready(&self) -> bool;

    fn on_suspend(&mut self, continuation: &Waker);

    fn resume(&mut self) -> Self::Output;
}

/// Future driving an [`Awaitable`] through its suspend/resume protocol.
#[derive(Debug)]
#[must_use = "futures do nothing unless polled"]
pub struct Suspend<A> {
    awaitable: A,
    suspended: bool,
    finished: bool,
}

impl<A: Awaitable> Suspend<A> {
    pub fn new(awaitable: A) -> Self {
        Self {
            awaitable,
            suspended: false,
            finished: false,
        }
    }
}

// The awaitable is never pinned, so moving it is fine.
impl<A> Unpin for Suspend<A> {}

impl<A: Awaitable> Future for Suspend<A> {
    type Output = A::Output;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = Pin::into_inner(self);
        assert!(!this.finished, "`Suspend` polled after completion");

        if this.awaitable.is_ready() {
            this.finished = true;
            return Poll::Ready(this.awaitable.resume());
        }

        if !this.suspended {
            this.suspended = true;
            this.awaitable.on_suspend(cx.waker());
        }

        Poll::Pending
    }
}
