#![deny(unsafe_code)]

use crate::time::Instant;

/// Clock the event loop runs against.
pub trait Environment {
    fn now(&self) -> Instant;

    /// Blocks the calling thread until `now() >= deadline`.
    fn sleep_until(&self, deadline: Instant);
}

/// Monotonic system clock. Time zero is the moment the environment was created.
#[cfg(feature = "std")]
#[derive(Debug, Clone, Copy)]
pub struct SystemEnvironment {
    epoch: std::time::Instant,
}

#[cfg(feature = "std")]
impl SystemEnvironment {
    pub fn new() -> Self {
        Self {
            epoch: std::time::Instant::now(),
        }
    }
}

#[cfg(feature = "std")]
impl Default for SystemEnvironment {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(feature = "std")]
impl Environment for SystemEnvironment {
    fn now(&self) -> Instant {
        let elapsed = self.epoch.elapsed().as_millis();
        Instant::from_millis(i64::try_from(elapsed).unwrap_or(i64::MAX))
    }

    fn sleep_until(&self, deadline: Instant) {
        // thread::sleep may return early on some platforms.
        loop {
            let remaining = deadline - self.now();
            if remaining <= crate::time::Duration::ZERO {
                return;
            }
            std::thread::sleep(remaining.into());
        }
    }
}
