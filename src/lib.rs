#![cfg_attr(not(any(test, feature = "std")), no_std)]

extern crate alloc;

pub mod awaitable;
#[cfg(feature = "std")]
pub mod demo;
pub mod environment;
mod error;
pub mod executor;
mod sleep;
mod slot;
pub mod task;
pub mod time;
pub mod timer;
mod waker;

pub use awaitable::{Awaitable, Suspend};
pub use error::Error;
pub use executor::{EventLoop, LoopHandle};
pub use sleep::{DelayedValue, Sleep};
pub use task::{Task, TaskAwait, TaskId, TaskState};

#[cfg(test)]
mod test_utils;
