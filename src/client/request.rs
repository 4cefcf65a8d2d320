//! Request-object capability and completion events.
//!
//! [`HttpRequest`] is the surface a page-side request object exposes. The
//! [`CompletionEvents`] slot guarantees that at most one of `load` or
//! `error` fires per request, however many paths race to complete it.

// ============================================================================
// Imports
// ============================================================================

use parking_lot::Mutex;
use tracing::{debug, warn};

use crate::error::{Error, Result};

// ============================================================================
// Types
// ============================================================================

/// Listener for the `load` event.
pub type LoadListener = Box<dyn FnOnce(&ResponseSnapshot) + Send>;

/// Listener for the `error` event.
pub type ErrorListener = Box<dyn FnOnce(&Error) + Send>;

// ============================================================================
// ResponseSnapshot
// ============================================================================

/// Response state visible once a request has loaded.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResponseSnapshot {
    /// Status code.
    pub status: u16,
    /// Status text.
    pub status_text: String,
    /// Final URL.
    pub response_url: String,
    /// Decoded response text.
    pub response: String,
    /// Header block, one `Name: value\r\n` line per header.
    pub headers: String,
}

// ============================================================================
// HttpRequest
// ============================================================================

/// Capability of a request object.
///
/// Mirrors the browser request object: configure with [`open`] and
/// [`set_request_header`], start with [`send`], observe through the
/// listeners and getters.
///
/// [`open`]: HttpRequest::open
/// [`set_request_header`]: HttpRequest::set_request_header
/// [`send`]: HttpRequest::send
pub trait HttpRequest: Send {
    /// Prepares a request.
    ///
    /// # Errors
    ///
    /// Implementation-defined; see [`crate::client::SchemeRequest`].
    fn open(&mut self, method: &str, url: &str, is_async: bool) -> Result<()>;

    /// Adds a request header.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidState`] if the request cannot take headers.
    fn set_request_header(&mut self, name: &str, value: &str) -> Result<()>;

    /// Starts the request.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidState`] if the request was not opened.
    fn send(&mut self, body: Option<Vec<u8>>) -> Result<()>;

    /// Returns the response header block, empty before completion.
    fn get_all_response_headers(&self) -> String;

    /// Returns the status code, `0` before completion.
    fn status(&self) -> u16;

    /// Returns the status text.
    fn status_text(&self) -> String;

    /// Returns the final URL.
    fn response_url(&self) -> String;

    /// Returns the response text, if loaded.
    fn response(&self) -> Option<String>;

    /// Sets the `load` listener.
    fn on_load(&mut self, listener: LoadListener);

    /// Sets the `error` listener.
    fn on_error(&mut self, listener: ErrorListener);
}

// ============================================================================
// CompletionEvents
// ============================================================================

/// Which completion event fired.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompletionKind {
    /// The request loaded.
    Load,
    /// The request failed.
    Error,
}

#[derive(Default)]
struct EventState {
    on_load: Option<LoadListener>,
    on_error: Option<ErrorListener>,
    fired: Option<CompletionKind>,
    /// Bumped by every reset; completions from older rounds are dropped.
    generation: u64,
}

/// Exactly-once completion slot.
///
/// One `load` or `error` fires per round; [`reset`](Self::reset) starts the
/// next round. Listeners are taken under the lock and invoked after it is
/// released.
#[derive(Default)]
pub struct CompletionEvents {
    state: Mutex<EventState>,
}

impl CompletionEvents {
    /// Creates an empty slot.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the `load` listener.
    pub fn set_load(&self, listener: LoadListener) {
        self.state.lock().on_load = Some(listener);
    }

    /// Replaces the `error` listener.
    pub fn set_error(&self, listener: ErrorListener) {
        self.state.lock().on_error = Some(listener);
    }

    /// Returns the event that fired in the current round, if any.
    #[must_use]
    pub fn fired(&self) -> Option<CompletionKind> {
        self.state.lock().fired
    }

    /// Returns the current round.
    #[must_use]
    pub fn generation(&self) -> u64 {
        self.state.lock().generation
    }

    /// Starts a new round and returns it. Listeners are kept.
    pub fn reset(&self) -> u64 {
        let mut state = self.state.lock();
        state.fired = None;
        state.generation += 1;
        state.generation
    }

    /// Fires `load` for the current round.
    ///
    /// Returns `false` if a completion already fired.
    pub fn fire_load(&self, snapshot: &ResponseSnapshot) -> bool {
        let generation = self.generation();
        self.fire_load_for(generation, snapshot)
    }

    /// Fires `error` for the current round.
    ///
    /// Returns `false` if a completion already fired.
    pub fn fire_error(&self, err: &Error) -> bool {
        let generation = self.generation();
        self.fire_error_for(generation, err)
    }

    /// Fires `load` on behalf of round `generation`.
    ///
    /// Returns `false` if the round is over or already completed.
    pub fn fire_load_for(&self, generation: u64, snapshot: &ResponseSnapshot) -> bool {
        if !self.claim(generation, CompletionKind::Load) {
            return false;
        }
        let listener = self.state.lock().on_load.take();
        if let Some(listener) = listener {
            listener(snapshot);
        }
        true
    }

    /// Fires `error` on behalf of round `generation`.
    ///
    /// Returns `false` if the round is over or already completed.
    pub fn fire_error_for(&self, generation: u64, err: &Error) -> bool {
        if !self.claim(generation, CompletionKind::Error) {
            return false;
        }
        let listener = self.state.lock().on_error.take();
        if let Some(listener) = listener {
            listener(err);
        }
        true
    }

    /// Marks round `generation` fired.
    fn claim(&self, generation: u64, kind: CompletionKind) -> bool {
        let mut state = self.state.lock();

        if state.generation != generation {
            debug!(
                generation,
                current = state.generation,
                attempted = ?kind,
                "Dropping stale completion"
            );
            return false;
        }

        if let Some(previous) = state.fired {
            warn!(?previous, attempted = ?kind, "Completion already fired");
            return false;
        }

        state.fired = Some(kind);
        true
    }
}

impl std::fmt::Debug for CompletionEvents {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.lock();
        f.debug_struct("CompletionEvents")
            .field("has_load", &state.on_load.is_some())
            .field("has_error", &state.on_error.is_some())
            .field("fired", &state.fired)
            .field("generation", &state.generation)
            .finish()
    }
}

// ============================================================================
// OfflineRequest
// ============================================================================

/// Request object with no network behind it.
///
/// Useful as the inner request of a [`crate::client::SchemeRequest`] that
/// only ever talks to its own scheme.
#[derive(Debug, Default)]
pub struct OfflineRequest {
    url: Option<String>,
}

impl OfflineRequest {
    /// Creates an offline request.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl HttpRequest for OfflineRequest {
    fn open(&mut self, _method: &str, url: &str, _is_async: bool) -> Result<()> {
        self.url = Some(url.to_string());
        Ok(())
    }

    fn set_request_header(&mut self, _name: &str, _value: &str) -> Result<()> {
        Ok(())
    }

    fn send(&mut self, _body: Option<Vec<u8>>) -> Result<()> {
        let url = self.url.as_deref().unwrap_or_default();
        Err(Error::invalid_state(format!(
            "No network available for {url:?}"
        )))
    }

    fn get_all_response_headers(&self) -> String {
        String::new()
    }

    fn status(&self) -> u16 {
        0
    }

    fn status_text(&self) -> String {
        String::new()
    }

    fn response_url(&self) -> String {
        String::new()
    }

    fn response(&self) -> Option<String> {
        None
    }

    fn on_load(&mut self, _listener: LoadListener) {}

    fn on_error(&mut self, _listener: ErrorListener) {}
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use crate::protocol::NetError;

    fn counting() -> (Arc<AtomicUsize>, Arc<AtomicUsize>, CompletionEvents) {
        let loads = Arc::new(AtomicUsize::new(0));
        let errors = Arc::new(AtomicUsize::new(0));
        let events = CompletionEvents::new();

        let counter = Arc::clone(&loads);
        events.set_load(Box::new(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        }));
        let counter = Arc::clone(&errors);
        events.set_error(Box::new(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        }));

        (loads, errors, events)
    }

    #[test]
    fn test_load_fires_once() {
        let (loads, errors, events) = counting();
        let snapshot = ResponseSnapshot::default();

        assert!(events.fire_load(&snapshot));
        assert!(!events.fire_load(&snapshot));
        assert_eq!(loads.load(Ordering::SeqCst), 1);
        assert_eq!(errors.load(Ordering::SeqCst), 0);
        assert_eq!(events.fired(), Some(CompletionKind::Load));
    }

    #[test]
    fn test_error_after_load_is_ignored() {
        let (loads, errors, events) = counting();

        assert!(events.fire_load(&ResponseSnapshot::default()));
        assert!(!events.fire_error(&Error::transport("backend:/x", NetError::Failed)));
        assert_eq!(loads.load(Ordering::SeqCst), 1);
        assert_eq!(errors.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_error_fires_and_blocks_load() {
        let (loads, errors, events) = counting();

        assert!(events.fire_error(&Error::transport("backend:/x", NetError::InvalidUrl)));
        assert!(!events.fire_load(&ResponseSnapshot::default()));
        assert_eq!(errors.load(Ordering::SeqCst), 1);
        assert_eq!(loads.load(Ordering::SeqCst), 0);
        assert_eq!(events.fired(), Some(CompletionKind::Error));
    }

    #[test]
    fn test_fire_without_listener_still_claims() {
        let events = CompletionEvents::new();
        assert!(events.fire_load(&ResponseSnapshot::default()));
        assert_eq!(events.fired(), Some(CompletionKind::Load));
    }

    #[test]
    fn test_reset_opens_a_new_round() {
        let (loads, _, events) = counting();
        assert!(events.fire_load(&ResponseSnapshot::default()));

        let counter = Arc::clone(&loads);
        events.set_load(Box::new(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        }));
        events.reset();

        assert_eq!(events.fired(), None);
        assert!(events.fire_load(&ResponseSnapshot::default()));
        assert_eq!(loads.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_completion_from_previous_round_is_dropped() {
        let (loads, _, events) = counting();
        let first = events.generation();
        let second = events.reset();

        assert!(!events.fire_load_for(first, &ResponseSnapshot::default()));
        assert_eq!(events.fired(), None);
        assert_eq!(loads.load(Ordering::SeqCst), 0);

        assert!(events.fire_load_for(second, &ResponseSnapshot::default()));
        assert_eq!(loads.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_unfired_listener_survives_reset() {
        let (loads, errors, events) = counting();
        assert!(events.fire_load(&ResponseSnapshot::default()));

        events.reset();
        assert!(events.fire_error(&Error::transport("backend:/x", NetError::Failed)));
        assert_eq!(loads.load(Ordering::SeqCst), 1);
        assert_eq!(errors.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_offline_request_refuses_send() {
        let mut request = OfflineRequest::new();
        request.open("GET", "https://example.com", true).expect("open");

        let err = request.send(None).unwrap_err();
        assert!(matches!(err, Error::InvalidState { .. }));
        assert_eq!(request.status(), 0);
        assert!(request.response().is_none());
    }
}
