pub mod file;
pub mod group;

pub use file::{FileRecord, FileRepository};
pub use group::{ConfirmedFile, ConfirmedGroup, GroupRepository};

use super::connection::lock;
use super::{DatabaseError, DbHandle};
use rusqlite::Connection;
use std::sync::MutexGuard;

pub trait Repository {
    fn db(&self) -> &DbHandle;

    fn get_connection(&self) -> Result<MutexGuard<'_, Connection>, DatabaseError> {
        lock(self.db())
    }
}
