//! Types for the processor module.

use serde::Serialize;

/// Outcome of one episode in the repair pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RepairResult {
    pub title: String,
    pub episode: String,
    pub success: bool,
    pub message: String,
}

impl RepairResult {
    pub fn ok(title: impl Into<String>, episode: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            episode: episode.into(),
            success: true,
            message: message.into(),
        }
    }

    pub fn failed(
        title: impl Into<String>,
        episode: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            title: title.into(),
            episode: episode.into(),
            success: false,
            message: message.into(),
        }
    }

    /// `title/episode`, the asset name used in repair events.
    pub fn asset(&self) -> String {
        format!("{}/{}", self.title, self.episode)
    }
}
