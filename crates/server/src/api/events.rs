//! Server-sent event framing for progress streams.

use std::convert::Infallible;

use axum::response::sse::{Event, Sse};
use futures::{Stream, StreamExt};
use reelhouse_core::ProgressEvent;
use tracing::warn;

/// Frames each progress event as `data: <json>\n\n`.
pub fn sse_response<S>(events: S) -> Sse<impl Stream<Item = Result<Event, Infallible>>>
where
    S: Stream<Item = ProgressEvent> + Send + 'static,
{
    Sse::new(events.map(|event| Ok(to_sse(&event))))
}

fn to_sse(event: &ProgressEvent) -> Event {
    Event::default().json_data(event).unwrap_or_else(|e| {
        warn!(error = %e, "Failed to serialize progress event");
        Event::default().comment("unserializable event")
    })
}
