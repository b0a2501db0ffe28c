//! Event module
//!
//! Subscription table for playback notifications. Each event kind has at most
//! one handler; notifying an unsubscribed kind does nothing.

use std::collections::HashMap;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::source::Metadata;
use crate::video::FrameRef;

/// Kind of playback notification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventKind {
    Error,
    Metadata,
    Start,
    Frame,
    End,
}

impl EventKind {
    pub fn name(&self) -> &'static str {
        match self {
            EventKind::Error => "error",
            EventKind::Metadata => "metadata",
            EventKind::Start => "start",
            EventKind::Frame => "frame",
            EventKind::End => "end",
        }
    }
}

impl FromStr for EventKind {
    type Err = UnknownEventKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "error" => Ok(EventKind::Error),
            "metadata" => Ok(EventKind::Metadata),
            "start" => Ok(EventKind::Start),
            "frame" => Ok(EventKind::Frame),
            "end" => Ok(EventKind::End),
            other => Err(UnknownEventKind(other.to_string())),
        }
    }
}

/// Returned when parsing an unrecognised event name
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown event kind: {0}")]
pub struct UnknownEventKind(pub String);

/// A notification delivered to subscribers
///
/// Payloads borrow scheduler-owned data and are only valid during the call.
#[derive(Debug, Clone, Copy)]
pub enum Event<'a> {
    Error(&'a str),
    Metadata(&'a Metadata),
    Start,
    Frame(FrameRef<'a>),
    End,
}

impl Event<'_> {
    pub fn kind(&self) -> EventKind {
        match self {
            Event::Error(_) => EventKind::Error,
            Event::Metadata(_) => EventKind::Metadata,
            Event::Start => EventKind::Start,
            Event::Frame(_) => EventKind::Frame,
            Event::End => EventKind::End,
        }
    }
}

/// Subscriber callback
pub type Handler = Box<dyn FnMut(&Event<'_>) + Send + 'static>;

/// Event kind -> optional handler
#[derive(Default)]
pub struct Dispatcher {
    handlers: HashMap<EventKind, Handler>,
}

impl Dispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `handler` for `kind`, returning the handler it replaces
    pub fn subscribe(&mut self, kind: EventKind, handler: Handler) -> Option<Handler> {
        self.handlers.insert(kind, handler)
    }

    pub fn unsubscribe(&mut self, kind: EventKind) -> Option<Handler> {
        self.handlers.remove(&kind)
    }

    /// Deliver `event` to its subscriber, if any
    pub fn notify(&mut self, event: &Event<'_>) {
        match self.handlers.get_mut(&event.kind()) {
            Some(handler) => handler(event),
            None => trace!("No subscriber for {} event", event.kind().name()),
        }
    }
}
