use pings_model::{ClientInfo, PingBatch};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoordinatorError {
    /// Network or protocol trouble that may go away on its own.
    #[error("transient coordinator failure: {0}")]
    Transient(String),

    #[error("coordinator failure: {0}")]
    Fatal(String),
}

impl CoordinatorError {
    pub fn transient(message: impl Into<String>) -> Self {
        Self::Transient(message.into())
    }

    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Transient(_))
    }
}

/// The two round trips the worker makes to the coordinator.
pub trait Coordinator: Send {
    /// Fetches the next batch of targets. On success `client.geoip` is
    /// replaced with what the coordinator reported for this worker. On
    /// failure nothing is returned and `client` is left untouched.
    fn fetch_batch(&mut self, client: &mut ClientInfo) -> Result<PingBatch, CoordinatorError>;

    /// Reports a measured batch.
    fn submit(&mut self, client: &ClientInfo, batch: &PingBatch) -> Result<(), CoordinatorError>;
}

impl<C: Coordinator + ?Sized> Coordinator for Box<C> {
    fn fetch_batch(&mut self, client: &mut ClientInfo) -> Result<PingBatch, CoordinatorError> {
        (**self).fetch_batch(client)
    }

    fn submit(&mut self, client: &ClientInfo, batch: &PingBatch) -> Result<(), CoordinatorError> {
        (**self).submit(client, batch)
    }
}
