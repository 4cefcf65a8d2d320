//! Client side of the scheme bridge.
//!
//! [`SchemeRequest`] wraps an ordinary request object. URLs that start with
//! the configured `<scheme>:` prefix never reach the wrapped object: they
//! are buffered and carried over a [`Fetch`] primitive instead, and the
//! result is exposed through the same getters and events.
//!
//! ```text
//! Unopened ──open(scheme URL)──► Scheme ──send──► Sent ──► Loaded | Failed
//!     │
//!     └────open(other URL)─────► Delegated (every call forwarded)
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::sync::{Arc, OnceLock};

use rustc_hash::FxHashMap;
use tokio::runtime::Handle;
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::server::SchemeConfig;

use super::{
    CompletionEvents, ErrorListener, Fetch, FetchRequest, FetchResponse, HttpRequest,
    LoadListener, ResponseSnapshot,
};

// ============================================================================
// PendingClientRequest
// ============================================================================

/// A scheme request between `open` and completion.
#[derive(Debug, Clone, Default)]
pub struct PendingClientRequest {
    /// Method as given to `open`.
    pub method: String,
    /// Target URL.
    pub url: String,
    /// Headers buffered since `open`.
    pub headers: FxHashMap<String, String>,
    /// Whether `send` has been called.
    pub sent: bool,
}

#[derive(Debug)]
enum Mode {
    Unopened,
    Delegated,
    Scheme(PendingClientRequest),
}

// ============================================================================
// SchemeRequest
// ============================================================================

/// Request object that serves one URL scheme in-process.
pub struct SchemeRequest<N, F> {
    /// Wrapped request object for every other URL.
    inner: N,
    /// Substrate for scheme URLs.
    fetch: Arc<F>,
    /// `<scheme>:`
    prefix: String,
    mode: Mode,
    /// Response fields, written once when a scheme request loads.
    outcome: Arc<OnceLock<ResponseSnapshot>>,
    events: Arc<CompletionEvents>,
}

impl<N, F> SchemeRequest<N, F>
where
    N: HttpRequest,
    F: Fetch + 'static,
{
    /// Wraps `inner`, routing `config`'s scheme through `fetch`.
    pub fn new(mut inner: N, fetch: Arc<F>, config: &SchemeConfig) -> Self {
        let events = Arc::new(CompletionEvents::new());
        forward_events(&mut inner, &events);

        Self {
            inner,
            fetch,
            prefix: config.prefix(),
            mode: Mode::Unopened,
            outcome: Arc::new(OnceLock::new()),
            events,
        }
    }

    /// Returns the wrapped request object.
    #[inline]
    #[must_use]
    pub fn inner(&self) -> &N {
        &self.inner
    }

    /// Returns `true` if the last `open` targeted the scheme.
    #[inline]
    #[must_use]
    pub fn is_scheme_request(&self) -> bool {
        matches!(self.mode, Mode::Scheme(_))
    }

    /// Returns the buffered request, if in scheme mode.
    #[must_use]
    pub fn pending(&self) -> Option<&PendingClientRequest> {
        match &self.mode {
            Mode::Scheme(pending) => Some(pending),
            _ => None,
        }
    }

    fn loaded(&self) -> Option<&ResponseSnapshot> {
        self.outcome.get()
    }
}

// ============================================================================
// HttpRequest
// ============================================================================

impl<N, F> HttpRequest for SchemeRequest<N, F>
where
    N: HttpRequest,
    F: Fetch + 'static,
{
    fn open(&mut self, method: &str, url: &str, is_async: bool) -> Result<()> {
        if !url.starts_with(&self.prefix) {
            self.mode = Mode::Delegated;
            self.events.reset();
            forward_events(&mut self.inner, &self.events);
            return self.inner.open(method, url, is_async);
        }

        if !is_async {
            return Err(Error::unsupported_mode(url));
        }

        self.events.reset();

        self.mode = Mode::Scheme(PendingClientRequest {
            method: method.to_string(),
            url: url.to_string(),
            ..Default::default()
        });
        self.outcome = Arc::new(OnceLock::new());
        Ok(())
    }

    fn set_request_header(&mut self, name: &str, value: &str) -> Result<()> {
        match &mut self.mode {
            Mode::Scheme(pending) if pending.sent => {
                Err(Error::invalid_state("Cannot set headers after send"))
            }
            Mode::Scheme(pending) => {
                pending.headers.insert(name.to_string(), value.to_string());
                Ok(())
            }
            Mode::Unopened | Mode::Delegated => self.inner.set_request_header(name, value),
        }
    }

    fn send(&mut self, body: Option<Vec<u8>>) -> Result<()> {
        let pending = match &mut self.mode {
            Mode::Unopened => return Err(Error::invalid_state("send called before open")),
            Mode::Delegated => return self.inner.send(body),
            Mode::Scheme(pending) => pending,
        };

        if pending.sent {
            return Err(Error::invalid_state("Request already sent"));
        }

        let runtime = Handle::try_current()
            .map_err(|e| Error::invalid_state(format!("No async runtime: {e}")))?;

        pending.sent = true;
        let request = FetchRequest {
            method: pending.method.clone(),
            url: pending.url.clone(),
            headers: pending.headers.clone(),
            body,
        };

        debug!(method = %request.method, url = %request.url, "Sending scheme request");

        let fetch = Arc::clone(&self.fetch);
        let outcome = Arc::clone(&self.outcome);
        let events = Arc::clone(&self.events);
        let generation = events.generation();

        runtime.spawn(async move {
            let url = request.url.clone();
            match fetch.fetch(request).await {
                Ok(response) => {
                    let snapshot = outcome.get_or_init(|| snapshot_of(response));
                    events.fire_load_for(generation, snapshot);
                }
                Err(err) => {
                    warn!(%url, %err, "Scheme request failed");
                    events.fire_error_for(generation, &err);
                }
            }
        });

        Ok(())
    }

    fn get_all_response_headers(&self) -> String {
        match self.mode {
            Mode::Scheme(_) => self
                .loaded()
                .map(|s| s.headers.clone())
                .unwrap_or_default(),
            _ => self.inner.get_all_response_headers(),
        }
    }

    fn status(&self) -> u16 {
        match self.mode {
            Mode::Scheme(_) => self.loaded().map_or(0, |s| s.status),
            _ => self.inner.status(),
        }
    }

    fn status_text(&self) -> String {
        match self.mode {
            Mode::Scheme(_) => self
                .loaded()
                .map(|s| s.status_text.clone())
                .unwrap_or_default(),
            _ => self.inner.status_text(),
        }
    }

    fn response_url(&self) -> String {
        match self.mode {
            Mode::Scheme(_) => self
                .loaded()
                .map(|s| s.response_url.clone())
                .unwrap_or_default(),
            _ => self.inner.response_url(),
        }
    }

    fn response(&self) -> Option<String> {
        match self.mode {
            Mode::Scheme(_) => self.loaded().map(|s| s.response.clone()),
            _ => self.inner.response(),
        }
    }

    fn on_load(&mut self, listener: LoadListener) {
        self.events.set_load(listener);
    }

    fn on_error(&mut self, listener: ErrorListener) {
        self.events.set_error(listener);
    }
}

impl<N: std::fmt::Debug, F> std::fmt::Debug for SchemeRequest<N, F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SchemeRequest")
            .field("inner", &self.inner)
            .field("prefix", &self.prefix)
            .field("mode", &self.mode)
            .field("events", &self.events)
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Helper Functions
// ============================================================================

/// Routes the wrapped object's completion into `events`.
fn forward_events<N: HttpRequest>(inner: &mut N, events: &Arc<CompletionEvents>) {
    let forward = Arc::clone(events);
    inner.on_load(Box::new(move |snapshot: &ResponseSnapshot| {
        forward.fire_load(snapshot);
    }));
    let forward = Arc::clone(events);
    inner.on_error(Box::new(move |err: &Error| {
        forward.fire_error(err);
    }));
}

fn snapshot_of(response: FetchResponse) -> ResponseSnapshot {
    let text = response.text();
    ResponseSnapshot {
        status: response.status,
        status_text: response.status_text,
        response_url: response.url,
        response: text,
        headers: format!("Content-Type: {}\r\n", response.content_type),
    }
}

// ============================================================================
// Tests
// ============================================================================
