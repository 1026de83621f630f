use arc_swap::{ArcSwap, ArcSwapOption};
use pings_model::GeoIp;
use std::net::IpAddr;
use std::sync::Arc;

/// Live progress of the worker, readable from any thread.
///
/// Every field is its own atomically swapped cell. Reads never block and
/// there is no consistency between fields: a reader may see the new
/// destination together with the previous destination's metadata.
#[derive(Debug)]
pub struct StatusSurface {
    current_dest: ArcSwapOption<IpAddr>,
    current_dest_geoip: ArcSwapOption<GeoIp>,
    source_geoip: ArcSwapOption<GeoIp>,
    nickname: ArcSwap<String>,
}

impl StatusSurface {
    pub fn new(nickname: impl Into<String>) -> Self {
        Self {
            current_dest: ArcSwapOption::empty(),
            current_dest_geoip: ArcSwapOption::empty(),
            source_geoip: ArcSwapOption::empty(),
            nickname: ArcSwap::from_pointee(nickname.into()),
        }
    }

    /// The address being measured right now, if any.
    pub fn current_ping_dest(&self) -> Option<IpAddr> {
        self.current_dest.load_full().map(|addr| *addr)
    }

    pub fn current_dest_geoip(&self) -> Option<Arc<GeoIp>> {
        self.current_dest_geoip.load_full()
    }

    /// Metadata the coordinator reported for this worker on the last fetch.
    pub fn source_geoip(&self) -> Option<Arc<GeoIp>> {
        self.source_geoip.load_full()
    }

    /// Requests a new display name. It is reported on the next submit.
    pub fn set_nickname(&self, nickname: impl Into<String>) {
        self.nickname.store(Arc::new(nickname.into()));
    }

    pub fn nickname(&self) -> String {
        (**self.nickname.load()).clone()
    }

    pub(crate) fn set_current_target(&self, addr: IpAddr, geoip: Option<GeoIp>) {
        self.current_dest.store(Some(Arc::new(addr)));
        self.current_dest_geoip.store(geoip.map(Arc::new));
    }

    pub(crate) fn clear_current_target(&self) {
        self.current_dest.store(None);
        self.current_dest_geoip.store(None);
    }

    pub(crate) fn set_source_geoip(&self, geoip: Option<GeoIp>) {
        self.source_geoip.store(geoip.map(Arc::new));
    }
}

impl Default for StatusSurface {
    fn default() -> Self {
        Self::new(String::new())
    }
}
