use crate::cancel::CancelToken;
use crate::control::{ControlLoop, WorkerError};
use crate::coordinator::Coordinator;
use crate::retry::RetryPolicy;
use crate::status::StatusSurface;
use pings_model::{ClientInfo, GeoIp};
use pings_probe::Prober;
use std::io;
use std::net::IpAddr;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

/// Runs a [`ControlLoop`] on its own thread and exposes its status.
///
/// A client runs at most once: after `stop` it cannot be started again.
pub struct PingsClient<C, P, R> {
    status: Arc<StatusSurface>,
    cancel: CancelToken,
    pending: Option<ControlLoop<C, P, R>>,
    handle: Option<JoinHandle<Result<(), WorkerError>>>,
}

impl<C, P, R> PingsClient<C, P, R>
where
    C: Coordinator + 'static,
    P: Prober + 'static,
    R: RetryPolicy + 'static,
{
    pub fn new(client: ClientInfo, coordinator: C, prober: P, retry: R) -> Self {
        let status = Arc::new(StatusSurface::new(client.nickname.clone()));
        let control = ControlLoop::new(coordinator, prober, retry, client, Arc::clone(&status));
        Self {
            status,
            cancel: CancelToken::new(),
            pending: Some(control),
            handle: None,
        }
    }

    /// Spawns the worker thread. Does nothing if it was already started.
    pub fn start(&mut self) -> io::Result<()> {
        let Some(mut control) = self.pending.take() else {
            return Ok(());
        };

        let cancel = self.cancel.clone();
        let handle = thread::Builder::new()
            .name("pings-worker".to_string())
            .spawn(move || control.run(&cancel))?;
        self.handle = Some(handle);
        Ok(())
    }

    /// Requests cancellation and waits for the worker to finish its current
    /// step. Returns how the loop ended.
    pub fn stop(&mut self) -> Result<(), WorkerError> {
        self.cancel.cancel();
        self.pending = None;
        match self.handle.take() {
            Some(handle) => handle.join().unwrap_or(Err(WorkerError::Panicked)),
            None => Ok(()),
        }
    }

    pub fn is_running(&self) -> bool {
        self.handle
            .as_ref()
            .map(|handle| !handle.is_finished())
            .unwrap_or(false)
    }

    pub fn status(&self) -> Arc<StatusSurface> {
        Arc::clone(&self.status)
    }

    pub fn set_nickname(&self, nickname: impl Into<String>) {
        self.status.set_nickname(nickname);
    }

    pub fn nickname(&self) -> String {
        self.status.nickname()
    }

    pub fn current_ping_dest(&self) -> Option<IpAddr> {
        self.status.current_ping_dest()
    }

    pub fn current_dest_geoip(&self) -> Option<Arc<GeoIp>> {
        self.status.current_dest_geoip()
    }

    pub fn source_geoip(&self) -> Option<Arc<GeoIp>> {
        self.status.source_geoip()
    }
}

impl<C, P, R> Drop for PingsClient<C, P, R> {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}
