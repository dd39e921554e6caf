use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use tracing::{debug, warn};

use super::find_cover;

/// Outcome of a cover relocation attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CoverMove {
    /// This title was already handled earlier in the process.
    AlreadyHandled,
    /// No cover file in the raw title directory.
    NotFound,
    /// The cover already exists at the destination.
    AlreadyPresent(PathBuf),
    Moved(PathBuf),
    Copied(PathBuf),
    Failed(String),
}

/// Moves a title's cover from the raw area into its output title directory,
/// at most once per title for the lifetime of the process.
///
/// The title is marked before the attempt, so a failed move is not retried.
#[derive(Debug, Default)]
pub struct CoverRelocator {
    handled: Mutex<HashSet<String>>,
}

impl CoverRelocator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_handled(&self, title: &str) -> bool {
        self.handled
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .contains(title)
    }

    /// Relocates `<raw_dir>/<title>/cover.*` into `dest_title_dir`.
    ///
    /// Rename is tried first; across filesystems it falls back to copy and
    /// remove. Failures are logged and reported, never propagated.
    pub async fn relocate(&self, title: &str, raw_dir: &Path, dest_title_dir: &Path) -> CoverMove {
        {
            let mut handled = self.handled.lock().unwrap_or_else(|e| e.into_inner());
            if !handled.insert(title.to_string()) {
                return CoverMove::AlreadyHandled;
            }
        }

        let source_dir = raw_dir.join(title);
        let Some(name) = find_cover(&source_dir) else {
            debug!(title = %title, "No cover to relocate");
            return CoverMove::NotFound;
        };

        let source = source_dir.join(name);
        let dest = dest_title_dir.join(name);

        if dest.exists() {
            return CoverMove::AlreadyPresent(dest);
        }

        if let Err(e) = tokio::fs::create_dir_all(dest_title_dir).await {
            warn!(title = %title, error = %e, "Failed to create title directory for cover");
            return CoverMove::Failed(e.to_string());
        }

        match tokio::fs::rename(&source, &dest).await {
            Ok(()) => {
                debug!(title = %title, dest = %dest.display(), "Cover moved");
                CoverMove::Moved(dest)
            }
            Err(rename_err) => {
                debug!(
                    title = %title,
                    error = %rename_err,
                    "Cover rename failed, falling back to copy"
                );
                if let Err(e) = tokio::fs::copy(&source, &dest).await {
                    warn!(title = %title, error = %e, "Failed to copy cover");
                    return CoverMove::Failed(e.to_string());
                }
                if let Err(e) = tokio::fs::remove_file(&source).await {
                    warn!(title = %title, error = %e, "Cover copied but source could not be removed");
                }
                CoverMove::Copied(dest)
            }
        }
    }
}
