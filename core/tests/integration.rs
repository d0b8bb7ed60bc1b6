//! End-to-end tests against the live mock server.
//!
//! # Design
//! Each test starts the mock server on a random port in a background tokio
//! runtime, then drives it through the core client over real HTTP.

use std::net::SocketAddr;
use std::sync::mpsc;
use std::sync::Arc;
use std::time::Duration;

use ping_core::{
    run_burst, BurstConfig, ClientConfig, DispatchConfig, Dispatcher, Error, HttpClient,
    NumPayload, Outcome, PingApi,
};

fn start_server() -> SocketAddr {
    let std_listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = std_listener.local_addr().unwrap();
    std_listener.set_nonblocking(true).unwrap();

    std::thread::spawn(move || {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        rt.block_on(async {
            let listener = tokio::net::TcpListener::from_std(std_listener).unwrap();
            mock_server::run(listener).await
        })
        .unwrap();
    });

    addr
}

fn api_for(addr: SocketAddr) -> PingApi {
    let client = HttpClient::new(&ClientConfig {
        host: addr.ip().to_string(),
        port: addr.port(),
        timeout: Some(Duration::from_secs(10)),
        ..ClientConfig::default()
    });
    PingApi::new(Arc::new(client))
}

fn dispatcher() -> Dispatcher {
    Dispatcher::new(DispatchConfig {
        workers: 8,
        queue_depth: 32,
    })
    .unwrap()
}

/// Deliver the outcome to the test thread.
fn capture() -> (impl FnOnce(Outcome) + Send + 'static, mpsc::Receiver<Outcome>) {
    let (tx, rx) = mpsc::channel();
    (move |outcome| tx.send(outcome).unwrap(), rx)
}

#[test]
fn get_test_inline() {
    let api = api_for(start_server());
    let (callback, rx) = capture();

    api.test().get(callback).run();

    let resp = rx.try_recv().expect("callback runs before run() returns").unwrap();
    assert_eq!(resp.status, 200);
    assert_eq!(resp.reason, "OK");
    assert_eq!(resp.body, "pong");
}

#[test]
fn call_specific_header_reaches_server() {
    let api = api_for(start_server());
    let (callback, rx) = capture();

    api.test().get(callback).header("x-ping-tag", "17").run();

    let resp = rx.recv().unwrap().unwrap();
    assert_eq!(resp.status, 200);
    let tag = resp
        .headers
        .iter()
        .find(|(name, _)| name.eq_ignore_ascii_case("x-ping-tag"))
        .map(|(_, value)| value.as_str());
    assert_eq!(tag, Some("17"));
}

#[test]
fn caller_content_type_replaces_default() {
    let api = api_for(start_server());
    let pool = dispatcher();
    let (callback, rx) = capture();

    let deferred = api
        .json()
        .post_json(&NumPayload { num: 3 }, callback)
        .unwrap()
        .header("content-type", "text/plain");
    pool.spawn(deferred).unwrap().wait().unwrap();

    let resp = rx.recv().unwrap().unwrap();
    assert_eq!(resp.status, 415);
}

#[test]
fn post_echoes_body_on_worker() {
    let api = api_for(start_server());
    let pool = dispatcher();
    let (callback, rx) = capture();

    pool.spawn(api.post().post(Some("hello".to_string()), callback))
        .unwrap()
        .wait()
        .unwrap();

    let resp = rx.recv().unwrap().unwrap();
    assert_eq!(resp.status, 200);
    assert_eq!(resp.body, "hello");
}

#[test]
fn json_round_trip() {
    let api = api_for(start_server());
    let pool = dispatcher();

    for num in [0, 1, 999] {
        let (callback, rx) = capture();
        let deferred = api.json().post_json(&NumPayload { num }, callback).unwrap();
        pool.spawn(deferred).unwrap().wait().unwrap();

        let resp = rx.recv().unwrap().unwrap();
        let echo: NumPayload = resp.json().unwrap();
        assert_eq!(echo.num, num);
    }
}

#[test]
fn unknown_path_is_status_error() {
    let api = api_for(start_server());
    let missing = api.ping().join("missing");
    let url = missing.url();
    let (callback, rx) = capture();

    missing.get(callback).run();

    let resp = rx.recv().unwrap().unwrap();
    assert_eq!(resp.status, 404);
    let err = resp.error_for_status(&url).unwrap_err();
    assert!(matches!(err, Error::Status { status: 404, .. }));
    let line = err.to_string();
    assert!(line.contains("404"));
    assert!(line.contains("Not Found"));
    assert!(line.contains(&url));
}

#[test]
fn burst_completes_every_callback() {
    let api = api_for(start_server());
    let pool = dispatcher();

    let report = run_burst(&api, &pool, &BurstConfig { iterations: 50 }).unwrap();

    assert_eq!(report.callbacks, 150);
    assert_eq!(report.get_ok, 50);
    assert_eq!(report.post_ok, 50);
    assert_eq!(report.json_ok, 50);
    assert_eq!(report.failed(), 0);
    assert_eq!(report.abandoned, 0);
    assert_eq!(pool.in_flight(), 0);
}

#[test]
fn empty_burst_sends_nothing() {
    let api = api_for(start_server());
    let pool = dispatcher();

    let report = run_burst(&api, &pool, &BurstConfig { iterations: 0 }).unwrap();

    assert_eq!(report.callbacks, 0);
    assert_eq!(report.requests(), 0);
}

#[test]
fn burst_against_closed_port_counts_transport_failures() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let api = api_for(addr);
    let pool = dispatcher();

    let report = run_burst(&api, &pool, &BurstConfig { iterations: 3 }).unwrap();

    assert_eq!(report.callbacks, 9);
    assert_eq!(report.transport_failures, 9);
    assert_eq!(report.http_failures, 0);
    assert_eq!(report.succeeded(), 0);
}
