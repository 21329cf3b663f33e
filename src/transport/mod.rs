//! Resilient server-push client
//!
//! The connection policy lives here as an explicit, timer-free state machine so
//! it can be unit tested without a socket or a clock. The host (the wasm entry
//! point) owns the actual WebSocket and the timers: it feeds socket callbacks
//! into `handle_open` / `handle_message` / `handle_close`, and schedules the
//! reconnect delay that `handle_close` hands back.
//!
//! Inbound payloads are structured records with a `type` field. A record fans
//! out to every handler registered for that exact type, then to the generic
//! `Message` handlers, in registration order. A failing handler is logged and
//! skipped; it never starves the handlers after it. Malformed payloads are
//! logged and dropped without touching the connection.

use std::collections::HashMap;

use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

/// Reconnect backoff: floor, growth factor, ceiling. Unjittered by design.
pub const RECONNECT_FLOOR_MS: f64 = 1000.0;
pub const RECONNECT_MULTIPLIER: f64 = 1.5;
pub const RECONNECT_CEILING_MS: f64 = 30_000.0;

/// Next reconnect delay from the current one: multiply and clamp.
#[inline]
pub fn next_delay(current_ms: f64) -> f64 {
    (current_ms * RECONNECT_MULTIPLIER).min(RECONNECT_CEILING_MS)
}

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("connection attempt failed: {0}")]
    Connect(String),
    #[error("send failed: {0}")]
    Send(String),
    #[error("malformed payload: {0}")]
    MalformedPayload(#[from] serde_json::Error),
    #[error("payload has no `type` field")]
    MissingType,
}

/// Failure raised by a registered handler; logged, never propagated to
/// the remaining handlers.
#[derive(Debug, Error)]
#[error("{0}")]
pub struct HandlerError(pub String);

/// Connection lifecycle of the one logical link.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkState {
    Idle,
    Connecting,
    Open,
    Closed { manual: bool },
}

/// Closed union of dispatchable event kinds: lifecycle events, the known
/// inbound record types, and the generic any-record kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    // Lifecycle, emitted independently of data events
    Connecting,
    Open,
    Close,
    Error,
    // Inbound record types
    Connection,
    Walker,
    Donation,
    Heartbeat,
    /// Every well-formed inbound record, regardless of type
    Message,
}

impl EventKind {
    fn from_type(t: &str) -> Option<Self> {
        match t {
            "connection" => Some(EventKind::Connection),
            "walker" => Some(EventKind::Walker),
            "donation" => Some(EventKind::Donation),
            "heartbeat" => Some(EventKind::Heartbeat),
            _ => None,
        }
    }
}

/// A dispatched event: its kind plus the event-specific payload.
///
/// The payload is the record's `data` field when present, otherwise the whole
/// record (both envelope shapes exist in the wild).
#[derive(Debug, Clone)]
pub struct Envelope {
    pub kind: EventKind,
    pub payload: Value,
}

impl Envelope {
    fn lifecycle(kind: EventKind) -> Self {
        Self {
            kind,
            payload: Value::Null,
        }
    }

    /// Decode a `walker` payload.
    pub fn walker(&self) -> Result<WalkerEvent, TransportError> {
        Ok(serde_json::from_value(self.payload.clone())?)
    }

    /// Decode a `donation` payload.
    pub fn donation(&self) -> Result<DonationEvent, TransportError> {
        Ok(serde_json::from_value(self.payload.clone())?)
    }
}

/// `{user}` carried by a `walker` record.
#[derive(Debug, Clone, Deserialize)]
pub struct WalkerEvent {
    #[serde(default)]
    pub user: Option<String>,
}

/// `{amount, user, message?, effect?}` carried by a `donation` record.
#[derive(Debug, Clone, Deserialize)]
pub struct DonationEvent {
    pub amount: f64,
    #[serde(default)]
    pub user: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub effect: Option<String>,
}

pub type Handler = Box<dyn FnMut(&Envelope) -> Result<(), HandlerError>>;

/// Outbound frame writer installed by the host while a socket exists.
pub type Sink = Box<dyn FnMut(&str) -> Result<(), String>>;

/// Policy half of the event transport: link state machine, backoff, and the
/// typed publish/subscribe fan-out.
pub struct EventTransport {
    state: LinkState,
    reconnect_delay_ms: f64,
    reconnect_attempts: u32,
    handlers: HashMap<EventKind, Vec<Handler>>,
    sink: Option<Sink>,
}

impl Default for EventTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl EventTransport {
    pub fn new() -> Self {
        Self {
            state: LinkState::Idle,
            reconnect_delay_ms: RECONNECT_FLOOR_MS,
            reconnect_attempts: 0,
            handlers: HashMap::new(),
            sink: None,
        }
    }

    /// Install the outbound writer for the current socket. Replaced on every
    /// reconnect.
    pub fn set_sink<F>(&mut self, sink: F)
    where
        F: FnMut(&str) -> Result<(), String> + 'static,
    {
        self.sink = Some(Box::new(sink));
    }

    /// Fire-and-forget outbound send. Fails (never panics) when the link is
    /// not open; a failed send is never retried.
    pub fn send(&mut self, record: &Value) -> Result<(), TransportError> {
        if self.state != LinkState::Open {
            return Err(TransportError::Send(format!(
                "link is {:?}, not open",
                self.state
            )));
        }
        let Some(sink) = self.sink.as_mut() else {
            return Err(TransportError::Send("no socket attached".to_string()));
        };
        sink(&record.to_string()).map_err(TransportError::Send)
    }

    pub fn state(&self) -> LinkState {
        self.state
    }

    pub fn is_open(&self) -> bool {
        self.state == LinkState::Open
    }

    /// Current delay a non-manual close would schedule.
    pub fn reconnect_delay_ms(&self) -> f64 {
        self.reconnect_delay_ms
    }

    pub fn reconnect_attempts(&self) -> u32 {
        self.reconnect_attempts
    }

    /// Register a handler. Multiple handlers per kind run in registration order.
    pub fn on<F>(&mut self, kind: EventKind, handler: F)
    where
        F: FnMut(&Envelope) -> Result<(), HandlerError> + 'static,
    {
        self.handlers.entry(kind).or_default().push(Box::new(handler));
    }

    /// Transition toward a new connection attempt. Returns false (and leaves
    /// state alone) when a connection is already open or in flight.
    pub fn begin_connect(&mut self) -> bool {
        match self.state {
            LinkState::Open | LinkState::Connecting => {
                log::warn!("connect requested while link is {:?}", self.state);
                false
            }
            _ => {
                self.state = LinkState::Connecting;
                self.emit(Envelope::lifecycle(EventKind::Connecting));
                true
            }
        }
    }

    /// Socket reported open: reset backoff to the floor.
    pub fn handle_open(&mut self) {
        self.state = LinkState::Open;
        self.reconnect_delay_ms = RECONNECT_FLOOR_MS;
        self.reconnect_attempts = 0;
        log::info!("link open");
        self.emit(Envelope::lifecycle(EventKind::Open));
    }

    /// Socket closed. Returns the delay the host must schedule before calling
    /// `begin_connect` again, or None after a user-initiated close.
    pub fn handle_close(&mut self) -> Option<f64> {
        let manual = matches!(self.state, LinkState::Closed { manual: true });
        self.emit(Envelope::lifecycle(EventKind::Close));
        if manual {
            return None;
        }
        self.state = LinkState::Closed { manual: false };
        let delay = self.reconnect_delay_ms;
        self.reconnect_delay_ms = next_delay(self.reconnect_delay_ms);
        self.reconnect_attempts += 1;
        log::info!(
            "link closed, reconnecting in {}ms (attempt {})",
            delay,
            self.reconnect_attempts
        );
        Some(delay)
    }

    /// Socket-level error. Never fatal; the close that follows drives reconnect.
    pub fn handle_error(&mut self, detail: &str) {
        log::error!("link error: {detail}");
        self.emit(Envelope {
            kind: EventKind::Error,
            payload: Value::String(detail.to_string()),
        });
    }

    /// Parse one inbound frame and fan it out. Malformed frames are dropped
    /// with a log; they never tear the connection down. A well-formed record
    /// with an unrecognized `type` skips the typed dispatch but still reaches
    /// the generic `Message` handlers.
    pub fn handle_message(&mut self, raw: &str) {
        let record: Value = match serde_json::from_str(raw) {
            Ok(v) => v,
            Err(err) => {
                log::warn!("dropping malformed payload: {err}");
                return;
            }
        };
        let Some(type_name) = record
            .get("type")
            .and_then(Value::as_str)
            .map(str::to_owned)
        else {
            log::warn!("dropping record with no type field");
            return;
        };
        // Some senders wrap the payload in `data`, some send it flat
        let payload = record.get("data").cloned().unwrap_or(record);
        match EventKind::from_type(&type_name) {
            Some(kind) => self.emit(Envelope {
                kind,
                payload: payload.clone(),
            }),
            None => log::debug!("record type {type_name:?} only reaches generic handlers"),
        }
        self.emit(Envelope {
            kind: EventKind::Message,
            payload,
        });
    }

    /// User-initiated shutdown: suppresses every future reconnect.
    pub fn close(&mut self) {
        self.state = LinkState::Closed { manual: true };
    }

    fn emit(&mut self, event: Envelope) {
        if let Some(handlers) = self.handlers.get_mut(&event.kind) {
            for handler in handlers.iter_mut() {
                if let Err(err) = handler(&event) {
                    log::error!("handler for {:?} failed: {err}", event.kind);
                }
            }
        }
    }
}
