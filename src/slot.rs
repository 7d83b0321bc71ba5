#![deny(unsafe_code)]

use core::cell::Cell;

use crate::error::Error;

enum Slot<T> {
    Empty,
    Full(T),
    Taken,
}

/// Thread-unsafe single-value slot: written once on completion, read at most once.
pub(crate) struct ResultSlot<T> {
    value: Cell<Slot<T>>,
}

impl<T> ResultSlot<T> {
    pub(crate) const fn new() -> Self {
        Self {
            value: Cell::new(Slot::Empty),
        }
    }

    /// Stores the result. A second write keeps the first value.
    pub(crate) fn fill(&self, value: T) {
        match self.value.replace(Slot::Empty) {
            Slot::Empty => self.value.set(Slot::Full(value)),
            previous => {
                debug_assert!(false, "task result written twice");
                self.value.set(previous);
            }
        }
    }

    /// Moves the result out, leaving the slot permanently empty.
    pub(crate) fn take(&self) -> Result<T, Error> {
        match self.value.replace(Slot::Taken) {
            Slot::Full(value) => Ok(value),
            Slot::Taken => Err(Error::ResultTaken),
            Slot::Empty => {
                self.value.set(Slot::Empty);
                Err(Error::NotFinished)
            }
        }
    }
}

impl<T> Default for ResultSlot<T> {
    fn default() -> Self {
        Self::new()
    }
}
