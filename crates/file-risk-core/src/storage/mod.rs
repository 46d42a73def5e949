pub mod models;
mod queries;
mod sqlite;

pub use sqlite::Database;

use crate::error::Error;
use models::{CatalogEntry, FileStatus};

/// The catalog operations the risk engine depends on.
///
/// `Database` is the production implementation; tests wrap it to inject
/// failures. Implementations are not required to be thread-safe since the
/// engine runs single-threaded.
pub trait CatalogStore {
    /// Full point-in-time snapshot of the file catalog.
    fn list_files(&self) -> Result<Vec<CatalogEntry>, Error>;
    fn get_status(&self, path: &str) -> Result<Option<FileStatus>, Error>;
    /// Whether a status is stored under `path`, without decoding it.
    fn status_exists(&self, path: &str) -> Result<bool, Error> {
        Ok(self.get_status(path)?.is_some())
    }
    fn insert_status(&self, status: &FileStatus) -> Result<(), Error>;
    /// Replace every mutable field of the status stored under `status.path`.
    /// The stored `server_id` is left as it is.
    fn update_status(&self, status: &FileStatus) -> Result<(), Error>;
}
