//! The request burst: GET, POST and JSON POST per iteration.
//!
//! # Design
//! GET and POST calls are tracked and their tickets joined at the end. JSON
//! calls are detached; `wait_idle` afterwards guarantees their callbacks have
//! run before `run_burst` returns. Each failed request is logged and counted,
//! never retried.

use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tracing::{error, info, warn};

use crate::dispatch::{Dispatcher, Ticket};
use crate::endpoint::{Outcome, PingApi};
use crate::error::Error;
use crate::http::HttpResponse;
use crate::types::NumPayload;

pub const DEFAULT_ITERATIONS: u32 = 1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BurstConfig {
    pub iterations: u32,
}

impl Default for BurstConfig {
    fn default() -> Self {
        Self {
            iterations: DEFAULT_ITERATIONS,
        }
    }
}

/// Counts gathered over one burst.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BurstReport {
    pub iterations: u32,
    pub get_ok: usize,
    pub post_ok: usize,
    pub json_ok: usize,
    /// Responses with a status other than 200.
    pub http_failures: usize,
    /// Requests that never got a response.
    pub transport_failures: usize,
    /// 200 responses whose body was not the expected JSON.
    pub decode_failures: usize,
    /// JSON echoes that decoded to a different number than was sent.
    pub json_mismatches: usize,
    /// Jobs that ended without completing their callback, or whose callback
    /// saw a dispatcher error instead of an HTTP outcome.
    pub abandoned: usize,
    /// Callbacks that ran, successful or not.
    pub callbacks: usize,
}

impl BurstReport {
    /// Three requests per iteration.
    pub fn requests(&self) -> usize {
        self.iterations as usize * 3
    }

    pub fn succeeded(&self) -> usize {
        self.get_ok + self.post_ok + self.json_ok
    }

    pub fn failed(&self) -> usize {
        self.http_failures + self.transport_failures + self.decode_failures + self.json_mismatches
    }
}

impl fmt::Display for BurstReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} requests: {} ok (get {}, post {}, json {}), {} failed \
             (http {}, transport {}, decode {}, mismatch {}), {} abandoned",
            self.requests(),
            self.succeeded(),
            self.get_ok,
            self.post_ok,
            self.json_ok,
            self.failed(),
            self.http_failures,
            self.transport_failures,
            self.decode_failures,
            self.json_mismatches,
            self.abandoned,
        )
    }
}

#[derive(Debug, Default)]
struct Tally {
    get_ok: AtomicUsize,
    post_ok: AtomicUsize,
    json_ok: AtomicUsize,
    http_failures: AtomicUsize,
    transport_failures: AtomicUsize,
    decode_failures: AtomicUsize,
    json_mismatches: AtomicUsize,
    abandoned: AtomicUsize,
    callbacks: AtomicUsize,
}

impl Tally {
    fn bump(counter: &AtomicUsize) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    fn fail(&self, err: &Error) {
        let counter = match err {
            Error::Status { .. } => &self.http_failures,
            Error::Serialization(_) | Error::Deserialization(_) => &self.decode_failures,
            Error::Transport { .. } => &self.transport_failures,
            Error::Closed | Error::Abandoned | Error::Spawn(_) => &self.abandoned,
        };
        Self::bump(counter);
        error!("[ERROR] {err}");
    }

    fn report(&self, iterations: u32, abandoned: usize) -> BurstReport {
        let load = |c: &AtomicUsize| c.load(Ordering::SeqCst);
        BurstReport {
            iterations,
            get_ok: load(&self.get_ok),
            post_ok: load(&self.post_ok),
            json_ok: load(&self.json_ok),
            http_failures: load(&self.http_failures),
            transport_failures: load(&self.transport_failures),
            decode_failures: load(&self.decode_failures),
            json_mismatches: load(&self.json_mismatches),
            abandoned: abandoned + load(&self.abandoned),
            callbacks: load(&self.callbacks),
        }
    }
}

/// Fire `config.iterations` rounds of requests at `api` and wait for every
/// callback to finish.
///
/// Only dispatcher and serialization errors are returned; request failures
/// are counted in the report.
pub fn run_burst(
    api: &PingApi,
    dispatcher: &Dispatcher,
    config: &BurstConfig,
) -> Result<BurstReport, Error> {
    let tally = Arc::new(Tally::default());
    let mut tickets: Vec<Ticket> = Vec::with_capacity(config.iterations as usize * 2);

    info!(iterations = config.iterations, base_url = api.root().client().base_url(), "starting burst");

    let submitted = (0..config.iterations)
        .try_for_each(|i| submit_round(api, dispatcher, &tally, &mut tickets, i));

    // Whatever made it onto the queue finishes before we return, error or not.
    let abandoned = settle(dispatcher, tickets);
    if let Err(err) = submitted {
        error!(%err, abandoned, "burst aborted while submitting");
        return Err(err);
    }

    let report = tally.report(config.iterations, abandoned);
    info!(%report, "burst finished");
    Ok(report)
}

fn submit_round(
    api: &PingApi,
    dispatcher: &Dispatcher,
    tally: &Arc<Tally>,
    tickets: &mut Vec<Ticket>,
    i: u32,
) -> Result<(), Error> {
    let test = api.test();
    let url = test.url();
    let t = Arc::clone(tally);
    tickets.push(dispatcher.spawn(test.get(move |outcome| {
        on_text(&t, &t.get_ok, outcome, &url, |resp| info!("{i} GET - {}", resp.body))
    }))?);

    let post = api.post();
    let url = post.url();
    let t = Arc::clone(tally);
    tickets.push(dispatcher.spawn(post.post(None, move |outcome| {
        on_text(&t, &t.post_ok, outcome, &url, |resp| info!("{i} POST - {}", resp.body))
    }))?);

    let json = api.json();
    let url = json.url();
    let t = Arc::clone(tally);
    let sent = NumPayload { num: i64::from(i) };
    dispatcher.detach(json.post_json(&sent, move |outcome| on_json(&t, outcome, &url, sent))?)
}

/// Join every ticket, then wait out detached jobs. Returns how many tracked
/// jobs ended without completing.
fn settle(dispatcher: &Dispatcher, tickets: Vec<Ticket>) -> usize {
    let mut abandoned = 0;
    for ticket in tickets {
        if let Err(err) = ticket.wait() {
            warn!("{err}");
            abandoned += 1;
        }
    }
    dispatcher.wait_idle();
    abandoned
}

fn on_text(
    tally: &Tally,
    ok: &AtomicUsize,
    outcome: Outcome,
    url: &str,
    log: impl FnOnce(&HttpResponse),
) {
    Tally::bump(&tally.callbacks);
    match outcome.and_then(|resp| resp.error_for_status(url)) {
        Ok(resp) => {
            Tally::bump(ok);
            log(&resp);
        }
        Err(err) => tally.fail(&err),
    }
}

fn on_json(tally: &Tally, outcome: Outcome, url: &str, sent: NumPayload) {
    Tally::bump(&tally.callbacks);
    let decoded = outcome
        .and_then(|resp| resp.error_for_status(url))
        .and_then(|resp| resp.json::<NumPayload>().map(|echo| (resp.body, echo)));
    match decoded {
        Ok((raw, echo)) if echo == sent => {
            Tally::bump(&tally.json_ok);
            info!("{} JSON - RAW = {raw}, Value = {}", sent.num, echo.num);
        }
        Ok((raw, echo)) => {
            Tally::bump(&tally.json_mismatches);
            warn!(sent = sent.num, received = echo.num, %raw, url, "json echo mismatch");
        }
        Err(err) => tally.fail(&err),
    }
}
