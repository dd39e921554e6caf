//! Title catalog: a persistent store kept in step with the output roots.
//!
//! The store is authoritative when it is reachable. The
//! [`CatalogReconciler`] derives entries from the filesystem, folds them into
//! the store by folder name, and answers every query from the filesystem
//! when the process runs without a store.

mod reconciler;
mod sqlite;
mod types;

pub use reconciler::CatalogReconciler;
pub use sqlite::SqliteCatalogStore;
pub use types::*;

/// Trait for catalog storage.
///
/// Implementations are synchronous; async callers run them on the blocking
/// pool.
pub trait CatalogStore: Send + Sync {
    /// Get an entry by its folder name.
    fn find_by_folder(&self, folder_name: &str) -> Result<Option<CatalogEntry>, CatalogError>;

    /// Update the row with the same folder name, or insert a new one.
    fn upsert(&self, entry: &CatalogEntry) -> Result<UpsertOutcome, CatalogError>;

    /// All entries ordered by title.
    fn list(&self) -> Result<Vec<CatalogEntry>, CatalogError>;

    /// Substring match against title and folder name.
    fn search(&self, keyword: &str) -> Result<Vec<CatalogEntry>, CatalogError>;

    /// Replace the cover reference of an entry.
    fn update_cover(&self, folder_name: &str, cover_ref: &str) -> Result<(), CatalogError>;

    /// Remove an entry. Returns whether a row existed.
    fn delete(&self, folder_name: &str) -> Result<bool, CatalogError>;
}
