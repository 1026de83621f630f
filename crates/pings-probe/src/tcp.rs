use crate::Prober;
use anyhow::{anyhow, Result};
use pings_model::PingResult;
use std::io::ErrorKind;
use std::net::{IpAddr, SocketAddr, TcpStream};
use std::thread::sleep;
use std::time::{Duration, Instant};
use tracing::debug;

#[derive(Debug, Clone)]
pub struct ProbeSettings {
    pub probes: u32,
    pub port: u16,
    pub timeout_ms: u64,
    pub interval_ms: u64,
}

impl Default for ProbeSettings {
    fn default() -> Self {
        Self {
            probes: 10,
            port: 80,
            timeout_ms: 2000,
            interval_ms: 100,
        }
    }
}

/// Times TCP connection setup to a fixed port.
///
/// A refused connection still counts as an answer: the RST came back from the
/// destination, so the elapsed time is a valid round trip.
#[derive(Debug, Clone)]
pub struct TcpProber {
    settings: ProbeSettings,
    samples: Vec<Option<f64>>,
}

impl TcpProber {
    pub fn new(settings: ProbeSettings) -> Self {
        Self {
            settings,
            samples: Vec::new(),
        }
    }

    pub fn settings(&self) -> &ProbeSettings {
        &self.settings
    }

    fn probe_once(&self, target: SocketAddr, timeout: Duration) -> Option<f64> {
        let started = Instant::now();
        match TcpStream::connect_timeout(&target, timeout) {
            Ok(_stream) => Some(elapsed_ms(started)),
            Err(err) if err.kind() == ErrorKind::ConnectionRefused => Some(elapsed_ms(started)),
            Err(err) => {
                debug!(%target, error = %err, "probe got no answer");
                None
            }
        }
    }
}

impl Prober for TcpProber {
    fn reset(&mut self) {
        self.samples.clear();
    }

    fn measure(&mut self, addr: IpAddr) -> Result<()> {
        if self.settings.probes == 0 {
            return Err(anyhow!("probe count must be at least 1"));
        }

        let target = SocketAddr::new(addr, self.settings.port);
        let timeout = Duration::from_millis(self.settings.timeout_ms.max(1));

        self.samples.clear();
        for probe in 0..self.settings.probes {
            let sample = self.probe_once(target, timeout);
            self.samples.push(sample);

            if self.settings.interval_ms > 0 && probe + 1 < self.settings.probes {
                sleep(Duration::from_millis(self.settings.interval_ms));
            }
        }

        Ok(())
    }

    fn last_result(&self) -> PingResult {
        PingResult::new(self.samples.clone())
    }
}

fn elapsed_ms(started: Instant) -> f64 {
    started.elapsed().as_secs_f64() * 1000.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_probes_is_rejected() {
        let mut prober = TcpProber::new(ProbeSettings {
            probes: 0,
            ..ProbeSettings::default()
        });
        assert!(prober.measure("127.0.0.1".parse().unwrap()).is_err());
    }

    #[test]
    fn result_is_empty_before_first_measure() {
        let prober = TcpProber::new(ProbeSettings::default());
        assert!(prober.last_result().rtt_ms.is_empty());
    }
}
