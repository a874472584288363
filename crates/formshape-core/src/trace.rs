//! Shaping trace boundary.
//!
//! Tracing is optional, injected by the caller, and must not affect
//! shaping semantics.

///
/// ShapeTraceSink
///

pub trait ShapeTraceSink: Send + Sync {
    fn on_event(&self, event: ShapeTraceEvent);
}

///
/// ShapeTraceEvent
///
/// Structured events emitted by the engines. Degenerate conditions the
/// spec recovers silently (unknown or cyclic set references, malformed
/// literals) surface here so a composition root can escalate them.
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum ShapeTraceEvent {
    SetResolved {
        entity: String,
        set: String,
        related: bool,
        cached: bool,
    },
    UnknownSetReference {
        entity: String,
        token: String,
    },
    CyclicSetReference {
        entity: String,
        set: String,
    },
    MalformedLiteral {
        path: String,
    },
}

/// Forward an event when a sink is installed.
pub fn emit(sink: Option<&dyn ShapeTraceSink>, event: ShapeTraceEvent) {
    if let Some(sink) = sink {
        sink.on_event(event);
    }
}

///
/// TESTS
///
