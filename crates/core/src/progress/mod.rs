//! Event stream from a worker pool to one consumer.
//!
//! Delivery is best-effort. Sends never block the job; see
//! [`progress_channel`] for the drop policy. Events from a single worker
//! arrive in emission order, events from different workers interleave
//! freely.

mod channel;
mod events;

pub use channel::{progress_channel, ProgressSender, ProgressStream};
pub use events::{EventKind, ProgressEvent, RunSummary};
