#![deny(unsafe_code)]

use alloc::collections::VecDeque;
use alloc::sync::{Arc, Weak};
use core::cell::RefCell;
use core::task::Waker;

use critical_section::Mutex;
use futures::task::{ArcWake, waker};

use crate::task::TaskId;

/// Tasks woken since the event loop last looked, in wake order.
pub(crate) struct ReadyQueue {
    ids: Mutex<RefCell<VecDeque<TaskId>>>,
}

impl ReadyQueue {
    pub(crate) const fn new() -> Self {
        Self {
            ids: Mutex::new(RefCell::new(VecDeque::new())),
        }
    }

    pub(crate) fn push(&self, id: TaskId) {
        critical_section::with(|cs| self.ids.borrow_ref_mut(cs).push_back(id));
    }

    pub(crate) fn pop(&self) -> Option<TaskId> {
        critical_section::with(|cs| self.ids.borrow_ref_mut(cs).pop_front())
    }

    pub(crate) fn len(&self) -> usize {
        critical_section::with(|cs| self.ids.borrow_ref(cs).len())
    }
}

impl core::fmt::Debug for ReadyQueue {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ReadyQueue")
            .field("len", &self.len())
            .finish()
    }
}

// Wake token of a single task. Holds the queue weakly so a stray waker
// cannot keep a dropped loop alive.
struct TaskWaker {
    task: TaskId,
    ready: Weak<ReadyQueue>,
}

impl ArcWake for TaskWaker {
    fn wake_by_ref(arc_self: &Arc<Self>) {
        match arc_self.ready.upgrade() {
            Some(ready) => ready.push(arc_self.task),
            None => log::trace!("{} woken after its event loop was dropped", arc_self.task),
        }
    }
}

pub(crate) fn task_waker(task: TaskId, ready: &Arc<ReadyQueue>) -> Waker {
    waker(Arc::new(TaskWaker {
        task,
        ready: Arc::downgrade(ready),
    }))
}
