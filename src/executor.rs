use alloc::boxed::Box;
use alloc::collections::BTreeMap;
use alloc::rc::Rc;
use alloc::sync::Arc;
use alloc::vec::Vec;
use core::cell::{Cell, RefCell};
use core::future::Future;
use core::ops::Deref;
use core::task::Waker;

use crate::environment::Environment;
use crate::sleep::{DelayedValue, Sleep};
use crate::task::{Schedulable, Task, TaskCore, TaskId};
use crate::time::{Duration, Instant};
use crate::timer::TimerQueue;
use crate::waker::{ReadyQueue, task_waker};

pub(crate) struct LoopInner {
    env: Box<dyn Environment>,
    timers: RefCell<TimerQueue>,
    ready: Arc<ReadyQueue>,
    tasks: RefCell<BTreeMap<TaskId, Rc<dyn Schedulable>>>,
    next_task: Cell<u64>,
    closed: Cell<bool>,
}

impl LoopInner {
    /// Forgets the task. Pending wakes for it will be dropped.
    pub(crate) fn release(&self, id: TaskId) {
        // Dropping the task may release nested tasks, so the table must not stay borrowed.
        let released = self.tasks.borrow_mut().remove(&id);
        drop(released);
    }

    fn take_tasks(&self) -> BTreeMap<TaskId, Rc<dyn Schedulable>> {
        core::mem::take(&mut *self.tasks.borrow_mut())
    }
}

/// Single-threaded event loop: resumes woken tasks and fires timers in deadline order.
///
/// The `EventLoop` owns every task spawned on it. Task bodies talk to the
/// loop through a [`LoopHandle`]; dropping the `EventLoop` drops all tasks
/// it still holds, even if they hold handles themselves.
pub struct EventLoop {
    handle: LoopHandle,
}

/// Clonable access to an [`EventLoop`] for spawning tasks and creating timers.
#[derive(Clone)]
pub struct LoopHandle {
    inner: Rc<LoopInner>,
}

impl EventLoop {
    /// Event loop running on the system's monotonic clock.
    #[cfg(feature = "std")]
    pub fn new() -> Self {
        Self::with_environment(crate::environment::SystemEnvironment::new())
    }

    pub fn with_environment(env: impl Environment + 'static) -> Self {
        Self {
            handle: LoopHandle {
                inner: Rc::new(LoopInner {
                    env: Box::new(env),
                    timers: RefCell::new(TimerQueue::new()),
                    ready: Arc::new(ReadyQueue::new()),
                    tasks: RefCell::new(BTreeMap::new()),
                    next_task: Cell::new(0),
                    closed: Cell::new(false),
                }),
            },
        }
    }

    pub fn handle(&self) -> LoopHandle {
        self.handle.clone()
    }

    /// Runs until no task is ready and no timer is pending.
    pub fn run(&self) {
        loop {
            self.run_ready();

            let Some(event) = self.inner().timers.borrow_mut().pop() else {
                break;
            };
            self.inner().env.sleep_until(event.deadline);
            log::trace!("firing wake due at {}", event.deadline);
            event.target.wake();
        }

        self.reclaim_stalled();
    }

    fn inner(&self) -> &LoopInner {
        &self.handle.inner
    }

    fn run_ready(&self) {
        while let Some(id) = self.inner().ready.pop() {
            let task = self.inner().tasks.borrow().get(&id).cloned();
            let Some(task) = task else {
                log::debug!("dropping wake for released {}", id);
                continue;
            };

            if task.step() {
                if task.is_detached() {
                    log::debug!("reclaiming detached {}", id);
                }
                drop(task);
                self.inner().release(id);
            }
        }
    }

    // Detached tasks left over at this point wait on something that can
    // never happen; drop them so their storage is not leaked.
    fn reclaim_stalled(&self) {
        let stalled: Vec<_> = {
            let mut tasks = self.inner().tasks.borrow_mut();
            let ids: Vec<TaskId> = tasks
                .iter()
                .filter(|(_, task)| task.is_detached())
                .map(|(id, _)| *id)
                .collect();
            ids.into_iter().filter_map(|id| tasks.remove(&id)).collect()
        };

        if !stalled.is_empty() {
            log::warn!("dropping {} stalled detached task(s)", stalled.len());
        }
        drop(stalled);

        let owned = self.live_tasks();
        if owned > 0 {
            log::warn!("event loop drained with {} unfinished task(s)", owned);
        }
    }
}

impl Deref for EventLoop {
    type Target = LoopHandle;

    fn deref(&self) -> &LoopHandle {
        &self.handle
    }
}

// Task bodies keep handles to the loop, so the task table has to be
// emptied by hand to free them.
impl Drop for EventLoop {
    fn drop(&mut self) {
        let inner = self.inner();
        inner.closed.set(true);

        let timers = core::mem::take(&mut *inner.timers.borrow_mut());
        drop(timers);

        let tasks = inner.take_tasks();
        if !tasks.is_empty() {
            log::debug!("event loop dropped with {} task(s) left", tasks.len());
        }
        drop(tasks);

        // Dropping bodies may have spawned or registered more.
        drop(inner.take_tasks());
    }
}

#[cfg(feature = "std")]
impl Default for EventLoop {
    fn default() -> Self {
        Self::new()
    }
}

impl core::fmt::Debug for EventLoop {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Debug::fmt(&self.handle, f)
    }
}

impl LoopHandle {
    pub fn now(&self) -> Instant {
        self.inner.env.now()
    }

    /// Wakes `target` once `deadline` is reached. Scheduled wakes cannot be withdrawn.
    pub fn schedule(&self, deadline: Instant, target: Waker) {
        if self.inner.closed.get() {
            log::debug!("ignoring wake at {} on a dropped event loop", deadline);
            return;
        }
        log::trace!("wake scheduled at {}", deadline);
        self.inner.timers.borrow_mut().schedule(deadline, target);
    }

    pub fn sleep(&self, duration: Duration) -> Sleep {
        Sleep::new(self.clone(), self.now() + duration)
    }

    pub fn delay<T>(&self, duration: Duration, value: T) -> DelayedValue<T> {
        DelayedValue::new(self.sleep(duration), value)
    }

    /// Starts a task. The body runs right away, up to its first suspension.
    ///
    /// Once the owning [`EventLoop`] is gone the task still starts, but it is
    /// never resumed after its first suspension.
    pub fn spawn<F>(&self, future: F) -> Task<F::Output>
    where
        F: Future + 'static,
        F::Output: 'static,
    {
        let id = TaskId::new(self.inner.next_task.get());
        self.inner.next_task.set(self.inner.next_task.get() + 1);

        let waker = task_waker(id, &self.inner.ready);
        let core = Rc::new(TaskCore::new(id, Box::pin(future), waker));
        if self.inner.closed.get() {
            log::debug!("{} spawned on a dropped event loop", id);
        } else {
            self.inner
                .tasks
                .borrow_mut()
                .insert(id, core.clone() as Rc<dyn Schedulable>);
            log::trace!("{} spawned", id);
        }

        if core.step() {
            self.inner.release(id);
        }

        Task::new(core, Rc::downgrade(&self.inner))
    }

    pub fn pending_timers(&self) -> usize {
        self.inner.timers.borrow().len()
    }

    /// Tasks that have not completed yet.
    pub fn live_tasks(&self) -> usize {
        self.inner.tasks.borrow().len()
    }
}

impl core::fmt::Debug for LoopHandle {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("EventLoop")
            .field("now", &self.now())
            .field("pending_timers", &self.inner.timers.try_borrow().map(|t| t.len()).ok())
            .field("ready", &self.inner.ready.len())
            .field("live_tasks", &self.inner.tasks.try_borrow().map(|t| t.len()).ok())
            .finish()
    }
}
