#![deny(unsafe_code)]

use alloc::rc::{Rc, Weak};
use core::cell::{Cell, RefCell};
use core::future::{Future, IntoFuture};
use core::task::{Context, Poll, Waker};

use futures::future::LocalBoxFuture;

use crate::awaitable::{Awaitable, Suspend};
use crate::error::Error;
use crate::executor::LoopInner;
use crate::slot::ResultSlot;

/// Identifies a task within its event loop.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TaskId(u64);

impl TaskId {
    pub(crate) const fn new(id: u64) -> Self {
        Self(id)
    }
}

impl core::fmt::Display for TaskId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "task#{}", self.0)
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum TaskState {
    /// Body is being polled.
    Running,
    /// Waiting on an awaitable.
    Suspended,
    /// Body returned; the result sits in the task until someone takes it.
    Completed,
}

/// Type-erased view of a task, as stored in the event loop's task table.
pub(crate) trait Schedulable {
    fn is_detached(&self) -> bool;

    /// Polls the body once. Returns true if this poll completed the task.
    fn step(&self) -> bool;
}

pub(crate) struct TaskCore<T> {
    id: TaskId,
    body: RefCell<Option<LocalBoxFuture<'static, T>>>,
    state: Cell<TaskState>,
    result: ResultSlot<T>,
    continuation: RefCell<Option<Waker>>,
    detached: Cell<bool>,
    waker: Waker,
}

impl<T> TaskCore<T> {
    pub(crate) fn new(id: TaskId, body: LocalBoxFuture<'static, T>, waker: Waker) -> Self {
        Self {
            id,
            body: RefCell::new(Some(body)),
            state: Cell::new(TaskState::Running),
            result: ResultSlot::new(),
            continuation: RefCell::new(None),
            detached: Cell::new(false),
            waker,
        }
    }

    fn set_continuation(&self, continuation: &Waker) {
        let mut slot = self.continuation.borrow_mut();
        match slot.as_ref() {
            None => *slot = Some(continuation.clone()),
            Some(existing) if existing.will_wake(continuation) => {}
            // Awaiting consumes the handle, so only a hand-built awaiter gets here.
            Some(_) => panic!("{}: {}", self.id, Error::AlreadyAwaited),
        }
    }
}

impl<T> Schedulable for TaskCore<T> {
    fn is_detached(&self) -> bool {
        self.detached.get()
    }

    fn step(&self) -> bool {
        let mut body = self.body.borrow_mut();
        let Some(future) = body.as_mut() else {
            // Stale wake for a finished task.
            return false;
        };

        self.state.set(TaskState::Running);
        let mut cx = Context::from_waker(&self.waker);
        let poll = future.as_mut().poll(&mut cx);
        match poll {
            Poll::Pending => {
                self.state.set(TaskState::Suspended);
                false
            }
            Poll::Ready(value) => {
                // Drop the finished body before anyone else runs.
                let finished = body.take();
                drop(body);
                drop(finished);

                self.result.fill(value);
                self.state.set(TaskState::Completed);
                log::trace!("{} completed", self.id);

                let continuation = self.continuation.borrow_mut().take();
                if let Some(continuation) = continuation {
                    continuation.wake();
                }
                true
            }
        }
    }
}

/// Owning handle to a task spawned on an [`EventLoop`](crate::executor::EventLoop).
///
/// Awaiting the handle yields the task's result. Dropping it before the task
/// completes releases the task; use [`Task::detach`] to let it run on its own.
#[must_use = "dropping a task handle releases the task; call `detach` to let it finish on its own"]
pub struct Task<T> {
    core: Rc<TaskCore<T>>,
    owner: Weak<LoopInner>,
}

impl<T> Task<T> {
    pub(crate) fn new(core: Rc<TaskCore<T>>, owner: Weak<LoopInner>) -> Self {
        Self { core, owner }
    }

    pub fn id(&self) -> TaskId {
        self.core.id
    }

    pub fn state(&self) -> TaskState {
        self.core.state.get()
    }

    pub fn is_finished(&self) -> bool {
        self.state() == TaskState::Completed
    }

    /// Takes the result of a finished task without awaiting it.
    pub fn try_take(&mut self) -> Result<T, Error> {
        self.core.result.take()
    }

    /// Hands the task over to the event loop, which drops it once it completes.
    pub fn detach(self) {
        log::trace!("{} detached", self.core.id);
        self.core.detached.set(true);
    }
}

impl<T> Drop for Task<T> {
    fn drop(&mut self) {
        if self.core.detached.get() || self.is_finished() {
            return;
        }
        if let Some(owner) = self.owner.upgrade() {
            log::debug!("{} released before completion", self.core.id);
            owner.release(self.core.id);
        }
    }
}

impl<T> core::fmt::Debug for Task<T> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Task")
            .field("id", &self.core.id)
            .field("state", &self.core.state.get())
            .finish()
    }
}

/// Awaiting a task: ready once the task has completed, otherwise the awaiter
/// becomes the task's continuation.
#[derive(Debug)]
pub struct TaskAwait<T> {
    task: Task<T>,
}

impl<T> Awaitable for TaskAwait<T> {
    type Output = T;

    fn is_ready(&self) -> bool {
        self.task.is_finished()
    }

    fn on_suspend(&mut self, continuation: &Waker) {
        self.task.core.set_continuation(continuation);
    }

    fn resume(&mut self) -> T {
        match self.task.try_take() {
            Ok(value) => value,
            Err(err) => panic!("{}: {}", self.task.id(), err),
        }
    }
}

impl<T> IntoFuture for Task<T> {
    type Output = T;
    type IntoFuture = Suspend<TaskAwait<T>>;

    fn into_future(self) -> Self::IntoFuture {
        Suspend::new(TaskAwait { task: self })
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;
    use std::rc::Rc;

    use super::*;
    use crate::executor::EventLoop;
    use crate::test_utils::{DropCounter, TestEnvironment, Trace};
    use crate::time::{Duration, Instant};

    fn test_loop() -> EventLoop {
        EventLoop::with_environment(TestEnvironment::new())
    }

    #[test]
    fn starts_eagerly() {
        let lp = test_loop();
        let started = Rc::new(Cell::new(false));

        let flag = started.clone();
        let task = lp.spawn(async move {
            flag.set(true);
        });

        assert!(started.get());
        assert!(task.is_finished());
    }

    #[test]
    fn suspended_until_timer_fires() {
        let lp = test_loop();
        let sleeper = lp.handle();
        let mut task = lp.spawn(async move {
            sleeper.sleep(Duration::from_millis(10)).await;
            7
        });

        assert_eq!(task.state(), TaskState::Suspended);
        assert_eq!(task.try_take(), Err(Error::NotFinished));

        lp.run();

        assert_eq!(task.state(), TaskState::Completed);
        assert_eq!(task.try_take(), Ok(7));
        assert_eq!(task.try_take(), Err(Error::ResultTaken));
    }

    #[test]
    fn await_completed_task_returns_immediately() {
        let lp = test_loop();
        let runs = Rc::new(Cell::new(0));

        let counter = runs.clone();
        let child = lp.spawn(async move {
            counter.set(counter.get() + 1);
            "done"
        });
        assert!(child.is_finished());

        let mut parent = lp.spawn(async move { child.await });

        // No scheduler round trip was needed.
        assert!(parent.is_finished());
        assert_eq!(parent.try_take(), Ok("done"));
        assert_eq!(runs.get(), 1);

        lp.run();
        assert_eq!(lp.now(), Instant::ZERO);
        assert_eq!(runs.get(), 1);
    }

    #[test]
    fn awaiter_resumes_when_child_completes() {
        let lp = test_loop();
        let trace = Trace::default();

        let (l, t) = (lp.handle(), trace.clone());
        let mut parent = lp.spawn(async move {
            let (cl, ct) = (l.clone(), t.clone());
            let child = l.spawn(async move {
                cl.sleep(Duration::from_millis(30)).await;
                ct.log(&cl, "child done");
                5
            });
            t.log(&l, "parent waiting");
            let v = child.await;
            t.log(&l, "parent resumed");
            v * 2
        });

        lp.run();

        assert_eq!(
            trace.lines(),
            ["0ms parent waiting", "30ms child done", "30ms parent resumed"]
        );
        assert_eq!(parent.try_take(), Ok(10));
    }

    #[test]
    fn detached_task_runs_to_completion() {
        let lp = test_loop();
        let trace = Trace::default();

        let (l, t) = (lp.handle(), trace.clone());
        lp.spawn(async move {
            l.sleep(Duration::from_millis(5)).await;
            t.log(&l, "detached done");
        })
        .detach();

        assert_eq!(lp.live_tasks(), 1);
        lp.run();

        assert_eq!(trace.lines(), ["5ms detached done"]);
        assert_eq!(lp.live_tasks(), 0);
    }

    #[test]
    fn detached_result_dropped_once() {
        let lp = test_loop();
        let drops: Rc<Cell<usize>> = Rc::default();

        let (l, d) = (lp.handle(), Rc::clone(&drops));
        lp.spawn(async move {
            l.sleep(Duration::from_millis(1)).await;
            DropCounter::new(&d)
        })
        .detach();

        assert_eq!(drops.get(), 0);
        lp.run();
        assert_eq!(drops.get(), 1);
    }

    #[test]
    fn detach_after_completion_drops_result() {
        let lp = test_loop();
        let drops: Rc<Cell<usize>> = Rc::default();

        let d = Rc::clone(&drops);
        let task = lp.spawn(async move { DropCounter::new(&d) });
        assert!(task.is_finished());

        task.detach();
        assert_eq!(drops.get(), 1);

        lp.run();
        assert_eq!(drops.get(), 1);
        assert_eq!(lp.live_tasks(), 0);
    }

    #[test]
    fn dropping_handle_releases_task() {
        let lp = test_loop();
        let resumed = Rc::new(Cell::new(false));

        let (l, r) = (lp.handle(), resumed.clone());
        let task = lp.spawn(async move {
            l.sleep(Duration::from_millis(5)).await;
            r.set(true);
        });
        assert_eq!(lp.live_tasks(), 1);

        drop(task);
        assert_eq!(lp.live_tasks(), 0);

        // The timer still fires, but nobody is left to resume.
        lp.run();
        assert!(!resumed.get());
        assert_eq!(lp.now(), Instant::from_millis(5));
    }

    #[test]
    #[should_panic(expected = "already taken")]
    fn await_after_try_take_panics() {
        let lp = test_loop();
        let mut child = lp.spawn(async { 5 });
        assert_eq!(child.try_take(), Ok(5));

        let _parent = lp.spawn(async move { child.await });
    }

    #[test]
    fn debug_shows_id_and_state() {
        let lp = test_loop();
        let task = lp.spawn(async {});
        let text = format!("{task:?}");
        assert!(text.contains("Completed"));
        assert!(text.contains(&format!("{:?}", task.id())));
    }

    #[test]
    #[should_panic(expected = "body failed")]
    fn panic_in_body_is_fatal() {
        let lp = test_loop();
        let l = lp.handle();
        let _task = lp.spawn(async move {
            l.sleep(Duration::from_millis(1)).await;
            panic!("body failed");
        });
        lp.run();
    }
}
