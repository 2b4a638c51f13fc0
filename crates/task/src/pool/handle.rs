use crossbeam::channel::{Receiver, RecvTimeoutError, TryRecvError};
use std::time::Duration;
use zpress_core::{Error, Result};

/// Handle to the result of a closure submitted to the pool
///
/// The result is delivered at most once. A handle whose job was discarded
/// without running reports [`Error::TaskCancelled`].
#[derive(Debug)]
pub struct TaskHandle<T> {
    pub(crate) rx: Receiver<Result<T>>,
}

impl<T> TaskHandle<T> {
    /// Block until the job has run
    pub fn wait(self) -> Result<T> {
        self.rx.recv().unwrap_or(Err(Error::TaskCancelled))
    }

    /// Block for at most `timeout`; `None` if the job has not finished yet
    pub fn wait_timeout(&self, timeout: Duration) -> Option<Result<T>> {
        match self.rx.recv_timeout(timeout) {
            Ok(result) => Some(result),
            Err(RecvTimeoutError::Timeout) => None,
            Err(RecvTimeoutError::Disconnected) => Some(Err(Error::TaskCancelled)),
        }
    }

    /// Result if the job already finished
    pub fn try_wait(&self) -> Option<Result<T>> {
        match self.rx.try_recv() {
            Ok(result) => Some(result),
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => Some(Err(Error::TaskCancelled)),
        }
    }
}
