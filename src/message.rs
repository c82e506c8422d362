//! Message model shared by every stream.
//!
//! A stream delivers either a value or a control signal to its subscribers.
//! `Done` is terminal: it is broadcast at most once and nothing follows it.

use serde::Serialize;

/// Control signal categories carried by [`Signal`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SignalKind {
    /// Terminal completion; always the last message a subscriber sees
    Done,
    /// Non-fatal producer trouble; the stream keeps going
    Warning,
}

/// A control message with optional human-readable context
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Signal {
    pub kind: SignalKind,
    pub context: Option<String>,
}

impl Signal {
    pub fn done(context: impl Into<String>) -> Self {
        Signal {
            kind: SignalKind::Done,
            context: Some(context.into()),
        }
    }

    pub fn warning(context: impl Into<String>) -> Self {
        Signal {
            kind: SignalKind::Warning,
            context: Some(context.into()),
        }
    }

    pub fn is_done(&self) -> bool {
        self.kind == SignalKind::Done
    }
}

/// What a subscriber callback receives: a payload or a control signal
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Message<V> {
    Value(V),
    Signal(Signal),
}

impl<V> Message<V> {
    /// The payload, if this is a value message
    pub fn value(&self) -> Option<&V> {
        match self {
            Message::Value(value) => Some(value),
            Message::Signal(_) => None,
        }
    }

    /// The signal, if this is a control message
    pub fn signal(&self) -> Option<&Signal> {
        match self {
            Message::Value(_) => None,
            Message::Signal(signal) => Some(signal),
        }
    }
}
