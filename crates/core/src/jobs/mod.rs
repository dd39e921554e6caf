//! Registry of live batch jobs and their cancellation handles.

mod registry;

pub use registry::{JobId, JobInfo, JobRegistry, RegistryError};
