//! Streaming protocol encoder
//!
//! Turns generation milestones into `data: <json>\n\n` frames. One encoder
//! serves exactly one generation request and one subscriber.

use serde::Serialize;
use std::io::Write;
use tokio::sync::mpsc;

use crate::types::{EventKind, StreamEvent, StreamStep};

/// Subscriber went away; nothing further can be delivered
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SinkClosed;

/// Destination for stream events
pub trait EventSink: Send {
    /// Deliver one event to the subscriber
    fn deliver(&mut self, event: &StreamEvent) -> Result<(), SinkClosed>;
}

impl EventSink for mpsc::UnboundedSender<StreamEvent> {
    fn deliver(&mut self, event: &StreamEvent) -> Result<(), SinkClosed> {
        self.send(event.clone()).map_err(|_| SinkClosed)
    }
}

impl EventSink for Vec<StreamEvent> {
    fn deliver(&mut self, event: &StreamEvent) -> Result<(), SinkClosed> {
        self.push(event.clone());
        Ok(())
    }
}

/// Writes encoded frames straight to a byte stream, flushing each one
pub struct FrameWriter<W: Write + Send> {
    writer: W,
}

impl<W: Write + Send> FrameWriter<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write + Send> EventSink for FrameWriter<W> {
    fn deliver(&mut self, event: &StreamEvent) -> Result<(), SinkClosed> {
        self.writer
            .write_all(encode_event(event).as_bytes())
            .and_then(|_| self.writer.flush())
            .map_err(|_| SinkClosed)
    }
}

#[derive(Serialize)]
struct Frame<'a> {
    #[serde(rename = "type")]
    kind: EventKind,
    step: StreamStep,
    #[serde(skip_serializing_if = "Option::is_none")]
    content: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<&'a str>,
}

/// Encode one event as a `data:` frame.
///
/// Error events carry their text under `message`, all others under `content`.
pub fn encode_event(event: &StreamEvent) -> String {
    let (content, message) = match event.kind {
        EventKind::Error => (None, Some(event.body.as_str())),
        _ => (Some(event.body.as_str()), None),
    };
    let frame = Frame {
        kind: event.kind,
        step: event.step,
        content,
        message,
    };
    // Frame holds only strings and unit enums, serialization cannot fail
    let json = serde_json::to_string(&frame).unwrap_or_default();
    format!("data: {}\n\n", json)
}

/// Stateful encoder for one generation request
pub struct StreamEncoder<S: EventSink> {
    sink: S,
    closed: bool,
    terminal_sent: bool,
    delivered: usize,
}

impl<S: EventSink> StreamEncoder<S> {
    pub fn new(sink: S) -> Self {
        Self {
            sink,
            closed: false,
            terminal_sent: false,
            delivered: 0,
        }
    }

    /// Emit an event unless the subscriber disconnected.
    ///
    /// A second terminal (success or error) event is dropped.
    pub fn emit(&mut self, event: StreamEvent) {
        if self.closed {
            return;
        }
        if event.kind.is_terminal() {
            if self.terminal_sent {
                tracing::debug!(step = %event.step, "Dropping second terminal event");
                return;
            }
            self.terminal_sent = true;
        }

        match self.sink.deliver(&event) {
            Ok(()) => self.delivered += 1,
            Err(SinkClosed) => {
                tracing::debug!(
                    step = %event.step,
                    "Subscriber disconnected, stopping stream output"
                );
                self.closed = true;
            }
        }
    }

    /// True once the subscriber has gone away
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Number of events delivered so far
    pub fn delivered(&self) -> usize {
        self.delivered
    }

    pub fn into_sink(self) -> S {
        self.sink
    }
}
