use thiserror::Error;

use crate::jobs::RegistryError;

/// Errors returned to the submitter of a run. Per-item failures never
/// surface here; they are folded into the run summary.
#[derive(Debug, Error)]
pub enum ProcessorError {
    #[error("Batch contains no assets")]
    EmptyBatch,

    #[error(transparent)]
    Registry(#[from] RegistryError),
}
