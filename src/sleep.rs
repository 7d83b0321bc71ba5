#![deny(unsafe_code)]

use core::future::IntoFuture;
use core::task::Waker;

use crate::awaitable::{Awaitable, Suspend};
use crate::executor::LoopHandle;
use crate::time::Instant;

/// Suspends the awaiting task until the deadline passes.
///
/// The deadline is fixed when the `Sleep` is created. Awaiting always goes
/// through the timer queue, even if the deadline has already passed.
#[derive(Debug)]
#[must_use = "futures do nothing unless awaited"]
pub struct Sleep {
    event_loop: LoopHandle,
    deadline: Instant,
    scheduled: bool,
}

impl Sleep {
    pub(crate) fn new(event_loop: LoopHandle, deadline: Instant) -> Self {
        Self {
            event_loop,
            deadline,
            scheduled: false,
        }
    }

    pub fn deadline(&self) -> Instant {
        self.deadline
    }
}

impl Awaitable for Sleep {
    type Output = ();

    fn is_ready(&self) -> bool {
        self.scheduled && self.event_loop.now() >= self.deadline
    }

    fn on_suspend(&mut self, continuation: &Waker) {
        self.event_loop.schedule(self.deadline, continuation.clone());
        self.scheduled = true;
    }

    fn resume(&mut self) {}
}

impl IntoFuture for Sleep {
    type Output = ();
    type IntoFuture = Suspend<Sleep>;

    fn into_future(self) -> Self::IntoFuture {
        Suspend::new(self)
    }
}

/// Delivers a captured value to the awaiting task once the deadline passes.
#[derive(Debug)]
#[must_use = "futures do nothing unless awaited"]
pub struct DelayedValue<T> {
    sleep: Sleep,
    value: Option<T>,
}

impl<T> DelayedValue<T> {
    pub(crate) fn new(sleep: Sleep, value: T) -> Self {
        Self {
            sleep,
            value: Some(value),
        }
    }

    pub fn deadline(&self) -> Instant {
        self.sleep.deadline()
    }
}

impl<T> Awaitable for DelayedValue<T> {
    type Output = T;

    fn is_ready(&self) -> bool {
        self.sleep.is_ready()
    }

    fn on_suspend(&mut self, continuation: &Waker) {
        self.sleep.on_suspend(continuation);
    }

    fn resume(&mut self) -> T {
        match self.value.take() {
            Some(value) => value,
            None => panic!("delayed value delivered twice"),
        }
    }
}

impl<T> IntoFuture for DelayedValue<T> {
    type Output = T;
    type IntoFuture = Suspend<DelayedValue<T>>;

    fn into_future(self) -> Self::IntoFuture {
        Suspend::new(self)
    }
}
