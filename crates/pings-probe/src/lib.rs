//! Latency measurement.

pub mod tcp;

pub use tcp::{ProbeSettings, TcpProber};

use anyhow::Result;
use pings_model::PingResult;
use std::net::IpAddr;

/// A measurement engine that keeps the samples of its most recent run.
pub trait Prober: Send {
    /// Discards the samples of the previous run.
    fn reset(&mut self);

    /// Probes `addr`, blocking until every probe has finished.
    fn measure(&mut self, addr: IpAddr) -> Result<()>;

    /// Samples of the latest `measure`.
    fn last_result(&self) -> PingResult;
}

impl<P: Prober + ?Sized> Prober for Box<P> {
    fn reset(&mut self) {
        (**self).reset()
    }

    fn measure(&mut self, addr: IpAddr) -> Result<()> {
        (**self).measure(addr)
    }

    fn last_result(&self) -> PingResult {
        (**self).last_result()
    }
}
