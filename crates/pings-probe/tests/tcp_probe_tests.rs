use pings_probe::{ProbeSettings, Prober, TcpProber};
use std::net::{IpAddr, Ipv4Addr, TcpListener};
use std::thread;

const LOCALHOST: IpAddr = IpAddr::V4(Ipv4Addr::LOCALHOST);

fn settings(port: u16, probes: u32) -> ProbeSettings {
    ProbeSettings {
        probes,
        port,
        timeout_ms: 500,
        interval_ms: 0,
    }
}

#[test]
fn listening_port_yields_one_sample_per_probe() {
    let listener = TcpListener::bind((LOCALHOST, 0)).unwrap();
    let port = listener.local_addr().unwrap().port();
    thread::spawn(move || {
        for stream in listener.incoming().take(3) {
            drop(stream);
        }
    });

    let mut prober = TcpProber::new(settings(port, 3));
    prober.measure(LOCALHOST).unwrap();

    let result = prober.last_result();
    assert_eq!(result.rtt_ms.len(), 3);
    assert!(result.rtt_ms.iter().all(|rtt| rtt.map_or(false, |ms| ms >= 0.0)));
}

#[test]
fn refused_port_still_counts_as_answer() {
    let port = {
        let listener = TcpListener::bind((LOCALHOST, 0)).unwrap();
        listener.local_addr().unwrap().port()
    };

    let mut prober = TcpProber::new(settings(port, 2));
    prober.measure(LOCALHOST).unwrap();

    assert_eq!(prober.last_result().answered(), 2);
}

#[test]
fn results_are_replaced_not_appended() {
    let port = {
        let listener = TcpListener::bind((LOCALHOST, 0)).unwrap();
        listener.local_addr().unwrap().port()
    };

    let mut prober = TcpProber::new(settings(port, 2));
    prober.measure(LOCALHOST).unwrap();
    prober.measure(LOCALHOST).unwrap();
    assert_eq!(prober.last_result().rtt_ms.len(), 2);

    prober.reset();
    assert!(prober.last_result().rtt_ms.is_empty());
}
