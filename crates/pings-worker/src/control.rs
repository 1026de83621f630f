//! The fetch → measure → submit state machine.
//!
//! ```text
//! FETCHING ──ok──▶ MEASURING(0) ─▶ … ─▶ MEASURING(N-1) ─▶ SUBMITTING ─▶ FETCHING
//!    │  └─ok, N = 0──────────────────────────────────────▶ SUBMITTING
//!    └─transient──▶ BACKOFF ─▶ FETCHING
//! ```
//!
//! Cancellation is checked at the top of every fetch, before every target and
//! during the backoff pause. It never interrupts a call in progress.

use crate::cancel::CancelToken;
use crate::coordinator::{Coordinator, CoordinatorError};
use crate::retry::RetryPolicy;
use crate::status::StatusSurface;
use pings_model::{ClientInfo, PingBatch};
use pings_probe::Prober;
use std::net::IpAddr;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, error, info, warn};

/// Failures that end the loop.
#[derive(Debug, Error)]
pub enum WorkerError {
    #[error(transparent)]
    Coordinator(#[from] CoordinatorError),

    #[error("measuring {addr} failed: {source}")]
    Probe {
        addr: IpAddr,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("giving up after {failures} consecutive fetch failures: {last}")]
    RetriesExhausted {
        failures: u32,
        last: CoordinatorError,
    },

    #[error("batch has no free result slot {index} for {addr}")]
    ResultSlot { addr: IpAddr, index: usize },

    #[error("worker thread panicked")]
    Panicked,
}

enum State {
    Fetching,
    Backoff(CoordinatorError),
    Measuring { batch: PingBatch, index: usize },
    Submitting(PingBatch),
    Stopped,
}

/// Owns everything the worker mutates exclusively; shares only `status`.
pub struct ControlLoop<C, P, R> {
    coordinator: C,
    prober: P,
    retry: R,
    client: ClientInfo,
    status: Arc<StatusSurface>,
    fetch_failures: u32,
}

impl<C, P, R> ControlLoop<C, P, R>
where
    C: Coordinator,
    P: Prober,
    R: RetryPolicy,
{
    pub fn new(
        coordinator: C,
        prober: P,
        retry: R,
        client: ClientInfo,
        status: Arc<StatusSurface>,
    ) -> Self {
        Self {
            coordinator,
            prober,
            retry,
            client,
            status,
            fetch_failures: 0,
        }
    }

    pub fn status(&self) -> &Arc<StatusSurface> {
        &self.status
    }

    /// Runs cycles until `cancel` fires (`Ok`) or an unrecoverable error
    /// occurs (`Err`).
    pub fn run(&mut self, cancel: &CancelToken) -> Result<(), WorkerError> {
        info!(client_id = %self.client.client_id, "pings worker starting");
        let outcome = self.run_cycles(cancel);
        self.status.clear_current_target();

        match &outcome {
            Ok(()) => info!("pings worker ending"),
            Err(err) => error!(error = %err, "pings worker stopped on error"),
        }
        outcome
    }

    fn run_cycles(&mut self, cancel: &CancelToken) -> Result<(), WorkerError> {
        let mut state = State::Fetching;
        loop {
            state = match state {
                State::Fetching => self.fetch(cancel)?,
                State::Backoff(last) => self.backoff(last, cancel)?,
                State::Measuring { batch, index } => self.measure(batch, index, cancel)?,
                State::Submitting(batch) => self.submit(batch)?,
                State::Stopped => return Ok(()),
            };
        }
    }

    fn fetch(&mut self, cancel: &CancelToken) -> Result<State, WorkerError> {
        if cancel.is_cancelled() {
            return Ok(State::Stopped);
        }

        match self.coordinator.fetch_batch(&mut self.client) {
            Ok(batch) => {
                self.fetch_failures = 0;
                self.status.set_source_geoip(self.client.geoip.clone());
                info!(count = batch.len(), "got pings from coordinator");

                if batch.is_empty() {
                    Ok(State::Submitting(batch))
                } else {
                    Ok(State::Measuring { batch, index: 0 })
                }
            }
            Err(err) if err.is_transient() => {
                self.fetch_failures += 1;
                warn!(failures = self.fetch_failures, error = %err, "fetching pings failed");
                Ok(State::Backoff(err))
            }
            Err(err) => Err(err.into()),
        }
    }

    fn backoff(
        &mut self,
        last: CoordinatorError,
        cancel: &CancelToken,
    ) -> Result<State, WorkerError> {
        let Some(delay) = self.retry.next_delay(self.fetch_failures) else {
            return Err(WorkerError::RetriesExhausted {
                failures: self.fetch_failures,
                last,
            });
        };

        debug!(?delay, "backing off before next fetch");
        if cancel.wait_timeout(delay) {
            Ok(State::Stopped)
        } else {
            Ok(State::Fetching)
        }
    }

    fn measure(
        &mut self,
        mut batch: PingBatch,
        index: usize,
        cancel: &CancelToken,
    ) -> Result<State, WorkerError> {
        if index >= batch.len() {
            return Ok(State::Submitting(batch));
        }
        if cancel.is_cancelled() {
            info!(measured = index, total = batch.len(), "abandoning batch");
            return Ok(State::Stopped);
        }

        let addr = batch.addresses[index];
        self.prober.reset();
        info!(%addr, progress = %format!("{}/{}", index + 1, batch.len()), "pinging address");

        let geoip = batch.geoip.get(index).cloned().flatten();
        self.status.set_current_target(addr, geoip);
        let outcome = self.prober.measure(addr);
        self.status.clear_current_target();

        outcome.map_err(|err| WorkerError::Probe {
            addr,
            source: err.into(),
        })?;

        let result = self.prober.last_result();
        info!(%addr, answered = result.answered(), min_ms = ?result.min_ms(), "ping result");
        if !batch.record(index, result) {
            return Err(WorkerError::ResultSlot { addr, index });
        }

        Ok(State::Measuring {
            batch,
            index: index + 1,
        })
    }

    fn submit(&mut self, batch: PingBatch) -> Result<State, WorkerError> {
        self.client.nickname = self.status.nickname();

        info!(count = batch.len(), nickname = %self.client.nickname, "submitting results");
        match self.coordinator.submit(&self.client, &batch) {
            Ok(()) => {}
            // The batch is dropped; the next cycle starts from a fresh fetch.
            Err(err) if err.is_transient() => {
                warn!(error = %err, dropped = batch.len(), "submitting results failed");
            }
            Err(err) => return Err(err.into()),
        }

        Ok(State::Fetching)
    }
}
