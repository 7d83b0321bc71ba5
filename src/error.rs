/// Misuse of a task handle.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Ord, PartialOrd, thiserror::Error)]
pub enum Error {
    /// Someone is already waiting for this task.
    /// A task supports a single continuation.
    #[error("task is already awaited by another continuation")]
    AlreadyAwaited,
    /// The result was already read once.
    #[error("task result was already taken")]
    ResultTaken,
    #[error("task has not finished yet")]
    NotFinished,
}
