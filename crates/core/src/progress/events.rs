use chrono::{DateTime, Utc};
use serde::Serialize;

/// One event of a batch or repair run, as relayed to the caller.
///
/// Serializes flat: `{"type": "progress", "asset": .., "timestamp": ..}`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProgressEvent {
    #[serde(flatten)]
    pub kind: EventKind,
    pub timestamp: DateTime<Utc>,
}

impl ProgressEvent {
    pub fn now(kind: EventKind) -> Self {
        Self {
            kind,
            timestamp: Utc::now(),
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self.kind, EventKind::Complete(_))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EventKind {
    /// An item started; `current` is its 1-based position.
    Progress {
        asset: String,
        current: usize,
        total: usize,
    },
    /// Items finished so far.
    OverallProgress { current: usize, total: usize },
    /// Output already existed.
    Skipped { asset: String, message: String },
    Warning { asset: String, message: String },
    Info { asset: String, message: String },
    Error {
        #[serde(skip_serializing_if = "Option::is_none")]
        asset: Option<String>,
        message: String,
    },
    Success {
        asset: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        output: Option<String>,
    },
    /// Cancellation observed; no further items start.
    Stop { message: String },
    Complete(RunSummary),
    Heartbeat,
}

/// Aggregate of a finished run.
///
/// `success + failed + skipped == total`; `cancelled` counts items never
/// started because of a stop request and is not part of `total`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub total: usize,
    pub success: usize,
    pub failed: usize,
    pub skipped: usize,
    pub cancelled: usize,
    pub errors: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_wire_shape() {
        let event = ProgressEvent::now(EventKind::Progress {
            asset: "/static/videos/Show/ep1.mp4".to_string(),
            current: 1,
            total: 3,
        });
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "progress");
        assert_eq!(json["asset"], "/static/videos/Show/ep1.mp4");
        assert_eq!(json["current"], 1);
        assert!(json["timestamp"].is_string());
    }

    #[test]
    fn test_complete_and_heartbeat_shape() {
        let summary = RunSummary {
            total: 3,
            success: 2,
            failed: 1,
            skipped: 0,
            cancelled: 0,
            errors: vec!["ep2 failed".to_string()],
        };
        let json = serde_json::to_value(ProgressEvent::now(EventKind::Complete(summary))).unwrap();
        assert_eq!(json["type"], "complete");
        assert_eq!(json["total"], 3);
        assert_eq!(json["errors"][0], "ep2 failed");

        let json = serde_json::to_value(ProgressEvent::now(EventKind::Heartbeat)).unwrap();
        assert_eq!(json["type"], "heartbeat");
        assert!(json["timestamp"].is_string());
    }

    #[test]
    fn test_error_without_asset_omits_field() {
        let json = serde_json::to_value(ProgressEvent::now(EventKind::Error {
            asset: None,
            message: "no roots".to_string(),
        }))
        .unwrap();
        assert!(json.get("asset").is_none());
        assert_eq!(json["type"], "error");
    }
}
