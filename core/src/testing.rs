//! In-memory transport and dispatch recorders for unit tests.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use bytes::Bytes;

use crate::error::OpenError;
use crate::expect::ResponseMode;
use crate::http::{Header, HttpMethod, RawResponse};
use crate::router::{Router, SelfAction};
use crate::transport::{Abort, Channel, Task, Transport};

/// What the launcher configured on one channel.
#[derive(Debug, Clone)]
pub(crate) struct Sent {
    pub method: String,
    pub url: String,
    pub headers: Vec<Header>,
    pub timeout: Option<Duration>,
    pub mode: ResponseMode,
    pub credentials: bool,
    pub body: Option<Bytes>,
    pub tracked: bool,
}

struct Slot {
    sent: Sent,
    task: Option<Task>,
    aborted: Arc<AtomicBool>,
}

/// Records every sent request and lets tests fire its events by index.
/// URLs must start with `http://` or `https://` and contain no spaces.
#[derive(Clone, Default)]
pub(crate) struct FakeTransport {
    slots: Arc<Mutex<Vec<Slot>>>,
}

pub(crate) struct FakeChannel {
    slots: Arc<Mutex<Vec<Slot>>>,
    sent: Sent,
}

impl Transport for FakeTransport {
    type Channel = FakeChannel;

    fn open(&self, method: &HttpMethod, url: &str) -> Result<FakeChannel, OpenError> {
        let scheme_ok = url.starts_with("http://") || url.starts_with("https://");
        if !scheme_ok || url.contains(' ') {
            return Err(OpenError::BadUrl(url.to_string()));
        }
        Ok(FakeChannel {
            slots: Arc::clone(&self.slots),
            sent: Sent {
                method: method.to_string(),
                url: url.to_string(),
                headers: Vec::new(),
                timeout: None,
                mode: ResponseMode::Text,
                credentials: false,
                body: None,
                tracked: false,
            },
        })
    }
}

impl Channel for FakeChannel {
    fn set_header(&mut self, name: &str, value: &str) {
        self.sent.headers.push((name.to_string(), value.to_string()));
    }

    fn set_timeout(&mut self, timeout: Option<Duration>) {
        self.sent.timeout = timeout;
    }

    fn set_response_mode(&mut self, mode: ResponseMode) {
        self.sent.mode = mode;
    }

    fn set_credentials_policy(&mut self, allow_cross_origin: bool) {
        self.sent.credentials = allow_cross_origin;
    }

    fn send(mut self, body: Option<Bytes>, task: Task) -> Abort {
        self.sent.body = body;
        self.sent.tracked = task.progress.is_some();
        let aborted = Arc::new(AtomicBool::new(false));
        self.slots.lock().unwrap().push(Slot {
            sent: self.sent,
            task: Some(task),
            aborted: Arc::clone(&aborted),
        });
        Box::new(move || aborted.store(true, Ordering::SeqCst))
    }
}

impl FakeTransport {
    pub fn sent_count(&self) -> usize {
        self.slots.lock().unwrap().len()
    }

    pub fn sent(&self, index: usize) -> Sent {
        self.slots.lock().unwrap()[index].sent.clone()
    }

    pub fn aborted(&self, index: usize) -> bool {
        self.slots.lock().unwrap()[index].aborted.load(Ordering::SeqCst)
    }

    pub fn upload(&self, index: usize, sent: u64, total: u64) {
        if let Some(progress) = self.progress(index) {
            progress.upload(sent, total);
        }
    }

    pub fn download(&self, index: usize, received: u64, total: Option<u64>) {
        if let Some(progress) = self.progress(index) {
            progress.download(received, total);
        }
    }

    pub fn complete(&self, index: usize, response: RawResponse) {
        self.take_task(index).completion.load(response);
    }

    pub fn fail_timeout(&self, index: usize) {
        self.take_task(index).completion.timeout();
    }

    pub fn fail_network(&self, index: usize) {
        self.take_task(index).completion.network_error();
    }

    fn progress(&self, index: usize) -> Option<crate::transport::ProgressSink> {
        let slots = self.slots.lock().unwrap();
        slots[index].task.as_ref().and_then(|task| task.progress.clone())
    }

    // The lock is released before the completion runs so dispatch callbacks
    // may call back into the transport.
    fn take_task(&self, index: usize) -> Task {
        let task = self.slots.lock().unwrap()[index].task.take();
        task.expect("operation already completed")
    }
}

/// Actions captured by a recording dispatch.
#[derive(Clone)]
pub(crate) struct Recorded<A>(Arc<Mutex<Vec<A>>>);

impl<A> Recorded<A> {
    pub fn take(&self) -> Vec<A> {
        std::mem::take(&mut *self.0.lock().unwrap())
    }
}

/// A router that records everything sent to the application and to self.
pub(crate) fn recorder<A: Send + 'static>() -> (Router<A>, Recorded<A>, Recorded<SelfAction>) {
    let app = Recorded(Arc::new(Mutex::new(Vec::new())));
    let selfs = Recorded(Arc::new(Mutex::new(Vec::new())));
    let app_sink = Arc::clone(&app.0);
    let self_sink = Arc::clone(&selfs.0);
    let router = Router::new(
        move |action| app_sink.lock().unwrap().push(action),
        move |action| self_sink.lock().unwrap().push(action),
    );
    (router, app, selfs)
}
