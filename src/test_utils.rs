use std::cell::{Cell, RefCell};
use std::rc::Rc;

use crate::environment::Environment;
use crate::executor::LoopHandle;
use crate::time::Instant;

/// Virtual clock: sleeping jumps straight to the deadline.
#[derive(Debug)]
pub struct TestEnvironment {
    now: Cell<Instant>,
}

impl TestEnvironment {
    pub fn new() -> Self {
        Self {
            now: Cell::new(Instant::ZERO),
        }
    }
}

impl Environment for TestEnvironment {
    fn now(&self) -> Instant {
        self.now.get()
    }

    fn sleep_until(&self, deadline: Instant) {
        if deadline > self.now.get() {
            self.now.set(deadline);
        }
    }
}

/// Shared log of "<time> <what>" lines.
#[derive(Debug, Clone, Default)]
pub struct Trace(Rc<RefCell<Vec<String>>>);

impl Trace {
    pub fn log(&self, lp: &LoopHandle, what: &str) {
        self.0.borrow_mut().push(format!("{} {}", lp.now(), what));
    }

    pub fn lines(&self) -> Vec<String> {
        self.0.borrow().clone()
    }
}

/// Counts its own drops.
#[derive(Debug)]
pub struct DropCounter(Rc<Cell<usize>>);

impl DropCounter {
    pub fn new(drops: &Rc<Cell<usize>>) -> Self {
        Self(drops.clone())
    }
}

impl Drop for DropCounter {
    fn drop(&mut self) {
        self.0.set(self.0.get() + 1);
    }
}

#[test]
fn virtual_clock_never_goes_back() {
    let env = TestEnvironment::new();
    env.sleep_until(Instant::from_millis(20));
    env.sleep_until(Instant::from_millis(5));
    assert_eq!(env.now(), Instant::from_millis(20));
}
