use crate::coordinator::{Coordinator, CoordinatorError};
use pings_model::{ClientInfo, GeoIp, PingBatch, PingsResponse, SubmitRequest};
use std::net::IpAddr;
use std::time::Duration;
use tracing::debug;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(15);
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Talks to the coordinator's JSON endpoints over blocking HTTP.
#[derive(Debug, Clone)]
pub struct HttpCoordinator {
    base_url: String,
    http: reqwest::blocking::Client,
}

impl HttpCoordinator {
    pub fn new(host: &str, port: u16) -> Result<Self, CoordinatorError> {
        Self::with_base_url(format!("http://{host}:{port}"))
    }

    pub fn with_base_url(base_url: impl Into<String>) -> Result<Self, CoordinatorError> {
        let http = reqwest::blocking::Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|err| CoordinatorError::Fatal(format!("failed to build HTTP client: {err}")))?;

        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            http,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{path}", self.base_url)
    }
}

impl Coordinator for HttpCoordinator {
    fn fetch_batch(&mut self, client: &mut ClientInfo) -> Result<PingBatch, CoordinatorError> {
        let url = self.endpoint("get_pings");
        let response: PingsResponse = self
            .http
            .post(&url)
            .json(client)
            .send()
            .and_then(|resp| resp.error_for_status())
            .and_then(|resp| resp.json::<PingsResponse>())
            .map_err(|err| CoordinatorError::transient(format!("get_pings via {url}: {err}")))?;

        debug!(token = %response.token, count = response.pings.len(), "decoded get_pings response");
        let (batch, client_geoip) = batch_from_response(response)?;
        client.geoip = client_geoip;
        Ok(batch)
    }

    fn submit(&mut self, client: &ClientInfo, batch: &PingBatch) -> Result<(), CoordinatorError> {
        let url = self.endpoint("submit_ping_results");
        let request = SubmitRequest::from_batch(client, batch);

        self.http
            .post(&url)
            .json(&request)
            .send()
            .and_then(|resp| resp.error_for_status())
            .map(|_| ())
            .map_err(|err| {
                CoordinatorError::transient(format!("submit_ping_results via {url}: {err}"))
            })
    }
}

/// Validates a `get_pings` body and turns it into a batch plus the
/// worker's own metadata.
pub fn batch_from_response(
    response: PingsResponse,
) -> Result<(PingBatch, Option<GeoIp>), CoordinatorError> {
    if response.geoip.len() != response.pings.len() {
        return Err(CoordinatorError::transient(format!(
            "get_pings returned {} addresses but {} geoip entries",
            response.pings.len(),
            response.geoip.len()
        )));
    }

    let mut targets = Vec::with_capacity(response.pings.len());
    for (raw, geoip) in response.pings.iter().zip(response.geoip) {
        let addr: IpAddr = raw.trim().parse().map_err(|_| {
            CoordinatorError::transient(format!("get_pings returned invalid address {raw:?}"))
        })?;
        targets.push((addr, geoip));
    }

    Ok((PingBatch::new(response.token, targets), response.client_geoip))
}
