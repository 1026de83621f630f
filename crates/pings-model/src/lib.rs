//! Shared data structures for the pings worker.

use serde::{Deserialize, Serialize};
use std::net::IpAddr;

/// Descriptive metadata the coordinator attaches to an address.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct GeoIp {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latitude: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub longitude: Option<f64>,
}

impl GeoIp {
    /// Short "city, country" label, or `None` when neither is known.
    pub fn label(&self) -> Option<String> {
        let country = self.country_name.as_deref().or(self.country_code.as_deref());
        match (self.city.as_deref(), country) {
            (Some(city), Some(country)) => Some(format!("{city}, {country}")),
            (Some(city), None) => Some(city.to_string()),
            (None, Some(country)) => Some(country.to_string()),
            (None, None) => None,
        }
    }
}

/// The worker's identity as reported to the coordinator.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ClientInfo {
    pub nickname: String,
    pub client_id: String,
    /// Refreshed from every fetch; never sent back.
    #[serde(skip)]
    pub geoip: Option<GeoIp>,
}

impl ClientInfo {
    pub fn new(client_id: impl Into<String>) -> Self {
        Self {
            nickname: String::new(),
            client_id: client_id.into(),
            geoip: None,
        }
    }
}

/// Latency samples from one measurement, in milliseconds. `None` marks a
/// probe that got no answer.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(transparent)]
pub struct PingResult {
    pub rtt_ms: Vec<Option<f64>>,
}

impl PingResult {
    pub fn new(rtt_ms: Vec<Option<f64>>) -> Self {
        Self { rtt_ms }
    }

    pub fn is_unreachable(&self) -> bool {
        self.rtt_ms.iter().all(Option::is_none)
    }

    pub fn answered(&self) -> usize {
        self.rtt_ms.iter().filter(|rtt| rtt.is_some()).count()
    }

    pub fn min_ms(&self) -> Option<f64> {
        self.rtt_ms.iter().flatten().copied().reduce(f64::min)
    }
}

/// One fetch/measure/submit cycle worth of targets.
///
/// `addresses`, `geoip` and `results` are index aligned. A result slot is
/// `Some` once its address has been measured and is written only once.
#[derive(Debug, Clone, PartialEq)]
pub struct PingBatch {
    pub token: String,
    pub addresses: Vec<IpAddr>,
    pub geoip: Vec<Option<GeoIp>>,
    pub results: Vec<Option<PingResult>>,
}

impl PingBatch {
    pub fn new(token: impl Into<String>, targets: Vec<(IpAddr, Option<GeoIp>)>) -> Self {
        let (addresses, geoip): (Vec<_>, Vec<_>) = targets.into_iter().unzip();
        let results = vec![None; addresses.len()];
        Self {
            token: token.into(),
            addresses,
            geoip,
            results,
        }
    }

    pub fn len(&self) -> usize {
        self.addresses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.addresses.is_empty()
    }

    pub fn is_complete(&self) -> bool {
        self.results.iter().all(Option::is_some)
    }

    /// Stores the result for slot `index`. Returns `false` if the index is
    /// out of range or the slot was already filled.
    pub fn record(&mut self, index: usize, result: PingResult) -> bool {
        match self.results.get_mut(index) {
            Some(slot) if slot.is_none() => {
                *slot = Some(result);
                true
            }
            _ => false,
        }
    }
}

/// Body returned by the coordinator's `get_pings` endpoint.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PingsResponse {
    pub token: String,
    pub pings: Vec<String>,
    #[serde(default)]
    pub geoip: Vec<Option<GeoIp>>,
    #[serde(default)]
    pub client_geoip: Option<GeoIp>,
}

/// Body sent to the coordinator's `submit_ping_results` endpoint.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SubmitRequest {
    pub token: String,
    pub userid: String,
    pub client_id: String,
    pub results: Vec<PingResult>,
}

impl SubmitRequest {
    /// Builds the submission for a batch. Unfilled slots are sent as empty
    /// results so positions stay aligned with the fetched addresses.
    pub fn from_batch(client: &ClientInfo, batch: &PingBatch) -> Self {
        Self {
            token: batch.token.clone(),
            userid: client.nickname.clone(),
            client_id: client.client_id.clone(),
            results: batch
                .results
                .iter()
                .map(|slot| slot.clone().unwrap_or_default())
                .collect(),
        }
    }
}
