use crate::error::Error;
use crate::storage::models::FileStatus;
use crate::storage::CatalogStore;
use tracing::trace;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileOutcome {
    Inserted,
    Updated,
}

/// Writes a freshly computed status, choosing insert or update by an exact
/// path lookup.
pub struct Reconciler<'a, S: CatalogStore + ?Sized> {
    store: &'a S,
}

impl<'a, S: CatalogStore + ?Sized> Reconciler<'a, S> {
    pub fn new(store: &'a S) -> Self {
        Self { store }
    }

    /// An existing status is replaced wholesale except for its identifying
    /// `path` and `server_id`; a missing one is inserted as given. Only the
    /// presence of the stored row is checked, so a row that no longer decodes
    /// is still overwritten.
    pub fn reconcile(&self, status: FileStatus) -> Result<ReconcileOutcome, Error> {
        if self.store.status_exists(&status.path)? {
            self.store.update_status(&status)?;
            trace!("Updated status for {}", status.path);
            Ok(ReconcileOutcome::Updated)
        } else {
            self.store.insert_status(&status)?;
            trace!("Inserted status for {}", status.path);
            Ok(ReconcileOutcome::Inserted)
        }
    }
}
