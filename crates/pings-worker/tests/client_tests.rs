use pings_model::{ClientInfo, GeoIp, PingBatch, PingResult};
use pings_probe::Prober;
use pings_worker::{Coordinator, CoordinatorError, FixedDelay, PingsClient};
use std::net::IpAddr;
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread;
use std::time::{Duration, Instant};

struct LoopbackCoordinator {
    submitted: Sender<String>,
}

impl Coordinator for LoopbackCoordinator {
    fn fetch_batch(&mut self, client: &mut ClientInfo) -> Result<PingBatch, CoordinatorError> {
        client.geoip = Some(GeoIp {
            city: Some("Montreal".to_string()),
            ..GeoIp::default()
        });
        Ok(PingBatch::new(
            "tok",
            vec![(IpAddr::from([198, 51, 100, 1]), None)],
        ))
    }

    fn submit(&mut self, client: &ClientInfo, _batch: &PingBatch) -> Result<(), CoordinatorError> {
        let _ = self.submitted.send(client.nickname.clone());
        Ok(())
    }
}

struct SlowProber;

impl Prober for SlowProber {
    fn reset(&mut self) {}

    fn measure(&mut self, _addr: IpAddr) -> anyhow::Result<()> {
        thread::sleep(Duration::from_millis(2));
        Ok(())
    }

    fn last_result(&self) -> PingResult {
        PingResult::new(vec![Some(2.0)])
    }
}

fn wait_for_nickname(rx: &Receiver<String>, wanted: &str) -> bool {
    let deadline = Instant::now() + Duration::from_secs(10);
    while Instant::now() < deadline {
        match rx.recv_timeout(Duration::from_millis(100)) {
            Ok(nickname) if nickname == wanted => return true,
            _ => continue,
        }
    }
    false
}

#[test]
fn runs_in_background_and_stops_cleanly() {
    let (tx, rx) = mpsc::channel();
    let mut client = PingsClient::new(
        ClientInfo::new("client-1"),
        LoopbackCoordinator { submitted: tx },
        SlowProber,
        FixedDelay::default(),
    );
    assert!(!client.is_running());

    client.start().unwrap();
    client.start().unwrap();
    assert!(client.is_running());

    client.set_nickname("yoda");
    assert!(wait_for_nickname(&rx, "yoda"));
    assert_eq!(
        client.source_geoip().and_then(|geoip| geoip.city.clone()).as_deref(),
        Some("Montreal")
    );

    client.stop().unwrap();
    assert!(!client.is_running());
    assert!(client.current_ping_dest().is_none());
}

#[test]
fn stop_without_start_is_a_no_op() {
    let (tx, _rx) = mpsc::channel();
    let mut client = PingsClient::new(
        ClientInfo::new("client-1"),
        LoopbackCoordinator { submitted: tx },
        SlowProber,
        FixedDelay::default(),
    );
    client.stop().unwrap();
    client.start().unwrap();
    assert!(!client.is_running());
}
