//! Effect manager driven over real HTTP against the mock server.
//!
//! # Design
//! Starts the mock server on a random port, then plays the host: a small
//! loop feeds commands to the `EffectManager` backed by `UreqTransport`,
//! collects everything dispatched through the router on an mpsc channel, and
//! routes self actions back in, like an application runtime would.

use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::time::Duration;

use http_effect_core::{
    cancel, expect_json, expect_string, expect_string_response, get, header, post, request, track, Body, Command,
    EffectManager, Error, HttpMethod, Metadata, Progress, Router, SelfAction, State, Subscription, TransportConfig,
    TransportOutcome, UreqTransport,
};
use mock_server::Note;

const WAIT: Duration = Duration::from_secs(10);
const QUIET: Duration = Duration::from_millis(200);

fn start_server() -> String {
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

    format!("http://{addr}")
}

#[derive(Debug)]
enum Msg {
    Text(Result<String, Error>),
    Note(Result<Note, Error>),
    Values(Result<Vec<String>, Error>),
    Raw(Result<Metadata, String>),
    Progress(Progress),
}

enum Event {
    App(Msg),
    Internal(SelfAction),
}

struct Host {
    manager: EffectManager<UreqTransport>,
    router: Router<Msg>,
    events: Receiver<Event>,
    state: State<Msg>,
    subs: Vec<Subscription<Msg>>,
}

impl Host {
    fn new(transport: UreqTransport) -> Self {
        let (tx, events) = mpsc::channel();
        let app_tx = tx.clone();
        let router = Router::new(
            move |msg| {
                let _ = app_tx.send(Event::App(msg));
            },
            move |action| {
                let _ = tx.send(Event::Internal(action));
            },
        );
        let manager = EffectManager::new(transport);
        let state = manager.init();
        Self {
            manager,
            router,
            events,
            state,
            subs: Vec::new(),
        }
    }

    fn declare(&mut self, commands: Vec<Command<Msg>>) {
        let state = std::mem::take(&mut self.state);
        self.state = self
            .manager
            .on_effects(&self.router, commands, self.subs.clone(), state);
    }

    fn subscribe(&mut self, subs: Vec<Subscription<Msg>>) {
        self.subs = subs;
        self.declare(Vec::new());
    }

    /// Next application action, routing self actions on the way.
    fn next_app(&mut self, wait: Duration) -> Option<Msg> {
        loop {
            match self.events.recv_timeout(wait) {
                Ok(Event::App(msg)) => return Some(msg),
                Ok(Event::Internal(action)) => {
                    let state = std::mem::take(&mut self.state);
                    self.state = self.manager.on_self_action(&self.router, action, state);
                }
                Err(RecvTimeoutError::Timeout) => return None,
                Err(RecvTimeoutError::Disconnected) => panic!("router dropped"),
            }
        }
    }

    fn expect_app(&mut self) -> Msg {
        self.next_app(WAIT).expect("no dispatch arrived")
    }

    /// Everything dispatched until the channel stays quiet.
    fn drain(&mut self) -> Vec<Msg> {
        std::iter::from_fn(|| self.next_app(QUIET)).collect()
    }
}

fn raw_metadata(outcome: TransportOutcome<String>) -> Result<Metadata, String> {
    match outcome {
        TransportOutcome::GoodStatus { metadata, .. } => Ok(metadata),
        TransportOutcome::BadStatus { body, .. } => Err(body),
        other => Err(format!("{other:?}")),
    }
}

#[test]
fn text_round_trip_and_bad_status() {
    let base = start_server();
    let mut host = Host::new(UreqTransport::new());

    host.declare(vec![post(
        &format!("{base}/echo"),
        Body::string("text/plain", "hello"),
        expect_string(Msg::Text),
    )]);
    assert!(matches!(host.expect_app(), Msg::Text(Ok(body)) if body == "hello"));

    host.declare(vec![get(&format!("{base}/status/404"), expect_string(Msg::Text))]);
    assert!(matches!(
        host.expect_app(),
        Msg::Text(Err(Error::BadStatus { status_code: 404 }))
    ));
}

#[test]
fn json_decoding_and_bad_body() {
    let base = start_server();
    let mut host = Host::new(UreqTransport::new());

    host.declare(vec![get(&format!("{base}/note"), expect_json(Msg::Note))]);
    match host.expect_app() {
        Msg::Note(Ok(note)) => assert_eq!(note.title, "declared"),
        other => panic!("unexpected {other:?}"),
    }

    host.declare(vec![get(&format!("{base}/bytes/5"), expect_json(Msg::Note))]);
    assert!(matches!(host.expect_app(), Msg::Note(Err(Error::BadBody { .. }))));
}

#[test]
fn duplicate_request_headers_are_each_sent() {
    let base = start_server();
    let mut host = Host::new(UreqTransport::new());

    host.declare(vec![request(
        HttpMethod::Get,
        vec![header("X-A", "1"), header("X-A", "2")],
        &format!("{base}/request-headers/x-a"),
        Body::empty(),
        expect_json(Msg::Values),
        None,
        None,
    )]);

    match host.expect_app() {
        Msg::Values(Ok(values)) => assert_eq!(values, vec!["1", "2"]),
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn request_body_is_sent_with_content_length() {
    let base = start_server();
    let mut host = Host::new(UreqTransport::new());

    for (name, expected) in [("content-length", vec!["5"]), ("transfer-encoding", vec![])] {
        host.declare(vec![post(
            &format!("{base}/request-headers/{name}"),
            Body::string("text/plain", "hello"),
            expect_json(Msg::Values),
        )]);
        match host.expect_app() {
            Msg::Values(Ok(values)) => assert_eq!(values, expected, "{name}"),
            other => panic!("unexpected {other:?}"),
        }
    }
}

#[test]
fn response_metadata_merges_duplicates_and_follows_redirects() {
    let base = start_server();
    let mut host = Host::new(UreqTransport::new());

    host.declare(vec![get(
        &format!("{base}/duplicate-headers"),
        expect_string_response(Msg::Raw, raw_metadata),
    )]);
    match host.expect_app() {
        Msg::Raw(Ok(metadata)) => {
            assert_eq!(metadata.status_code, 200);
            assert_eq!(metadata.status_text, "OK");
            assert_eq!(metadata.headers["x-dup"], "1, 2");
        }
        other => panic!("unexpected {other:?}"),
    }

    host.declare(vec![get(
        &format!("{base}/redirect"),
        expect_string_response(Msg::Raw, raw_metadata),
    )]);
    match host.expect_app() {
        Msg::Raw(Ok(metadata)) => assert!(metadata.url.ends_with("/note"), "{}", metadata.url),
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn transport_failures_become_errors() {
    let base = start_server();
    let mut host = Host::new(UreqTransport::new());

    host.declare(vec![request(
        HttpMethod::Get,
        Vec::new(),
        &format!("{base}/slow/3000"),
        Body::empty(),
        expect_string(Msg::Text),
        Some(Duration::from_millis(100)),
        None,
    )]);
    assert!(matches!(host.expect_app(), Msg::Text(Err(Error::Timeout))));

    let closed = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = closed.local_addr().unwrap();
    drop(closed);
    host.declare(vec![get(&format!("http://{addr}/"), expect_string(Msg::Text))]);
    assert!(matches!(host.expect_app(), Msg::Text(Err(Error::NetworkError))));
}

#[test]
fn bad_url_resolves_without_tracking() {
    let mut host = Host::new(UreqTransport::new());

    host.declare(vec![request(
        HttpMethod::Get,
        Vec::new(),
        "bad url",
        Body::empty(),
        expect_string(Msg::Text),
        None,
        Some("x"),
    )]);

    assert!(!host.state.live().contains("x"));
    assert!(matches!(
        host.expect_app(),
        Msg::Text(Err(Error::BadUrl { url })) if url == "bad url"
    ));
}

#[test]
fn cancelled_request_never_reports() {
    let base = start_server();
    let mut host = Host::new(UreqTransport::new());

    host.declare(vec![request(
        HttpMethod::Get,
        Vec::new(),
        &format!("{base}/slow/500"),
        Body::empty(),
        expect_string(Msg::Text),
        None,
        Some("slow"),
    )]);
    assert!(host.state.live().contains("slow"));

    host.declare(vec![cancel("slow")]);
    assert!(host.state.live().is_empty());
    assert!(host.next_app(Duration::from_millis(1500)).is_none());
}

#[test]
fn download_progress_and_settlement() {
    let base = start_server();
    let mut host = Host::new(UreqTransport::with_config(TransportConfig {
        read_chunk_size: 1024,
        ..TransportConfig::default()
    }));
    host.subscribe(vec![track("dl", Msg::Progress)]);

    host.declare(vec![request(
        HttpMethod::Get,
        Vec::new(),
        &format!("{base}/bytes/100000"),
        Body::empty(),
        expect_string(Msg::Text),
        None,
        Some("dl"),
    )]);

    let mut msgs = vec![host.expect_app()];
    msgs.extend(host.drain());

    let received: Vec<Progress> = msgs
        .iter()
        .filter_map(|msg| match msg {
            Msg::Progress(progress) => Some(*progress),
            _ => None,
        })
        .collect();
    assert!(received.len() > 1, "expected several progress events");
    assert_eq!(
        received.last(),
        Some(&Progress::Receiving {
            received: 100_000,
            total: Some(100_000),
        })
    );
    assert!(msgs
        .iter()
        .any(|msg| matches!(msg, Msg::Text(Ok(body)) if body.len() == 100_000)));
    assert!(host.state.live().is_empty(), "settled tracker is released");
}

#[test]
fn upload_progress_reaches_subscription() {
    let base = start_server();
    let mut host = Host::new(UreqTransport::new());
    host.subscribe(vec![track("up", Msg::Progress)]);

    let payload = vec![b'a'; 50_000];
    host.declare(vec![request(
        HttpMethod::Post,
        Vec::new(),
        &format!("{base}/echo"),
        Body::bytes("application/octet-stream", payload),
        expect_string(Msg::Text),
        None,
        Some("up"),
    )]);

    let mut msgs = vec![host.expect_app()];
    msgs.extend(host.drain());

    let sent: Vec<Progress> = msgs
        .iter()
        .filter_map(|msg| match msg {
            Msg::Progress(progress @ Progress::Sending { .. }) => Some(*progress),
            _ => None,
        })
        .collect();
    assert_eq!(
        sent.last(),
        Some(&Progress::Sending {
            sent: 50_000,
            total: 50_000,
        })
    );
    assert!(msgs
        .iter()
        .any(|msg| matches!(msg, Msg::Text(Ok(body)) if body.len() == 50_000)));
}
