//! Awaitable completion of operations resolved by a later frame.
use async_channel::{Receiver, Sender, TryRecvError};

use crate::error::{PlotError, Result};

/// Sending half of a [`Completion`], kept by the plot until the operation
/// is reflected by a frame.
#[derive(Debug, Clone)]
pub struct Waiter {
    sender: Sender<Result<()>>,
}

impl Waiter {
    pub fn resolve(self) {
        let _ = self.sender.try_send(Ok(()));
    }

    pub fn reject(self, error: PlotError) {
        let _ = self.sender.try_send(Err(error));
    }
}

/// Completion of an asynchronous plot operation.
///
/// Dropping the plot before the operation finished resolves the completion
/// quietly.
#[derive(Debug)]
#[must_use = "a completion does nothing unless awaited or polled"]
pub struct Completion {
    receiver: Receiver<Result<()>>,
}

impl Completion {
    /// Constructs a new pending completion together with its waiter.
    pub fn pending() -> (Waiter, Self) {
        let (sender, receiver) = async_channel::bounded(1);
        (Waiter { sender }, Self { receiver })
    }

    /// Constructs an already finished completion.
    pub fn ready(result: Result<()>) -> Self {
        let (waiter, completion) = Self::pending();
        match result {
            Ok(()) => waiter.resolve(),
            Err(e) => waiter.reject(e),
        }
        completion
    }

    /// Waits for the operation to finish.
    pub async fn wait(self) -> Result<()> {
        self.receiver.recv().await.unwrap_or(Ok(()))
    }

    /// Takes the result if the operation finished.
    pub fn try_take(&self) -> Option<Result<()>> {
        match self.receiver.try_recv() {
            Ok(result) => Some(result),
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Closed) => Some(Ok(())),
        }
    }
}
