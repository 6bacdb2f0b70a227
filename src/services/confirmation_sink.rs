use crate::core::ports::{ConfirmError, ConfirmationSink};
use crate::core::proposal::ConfirmationRecord;
use crate::database::repositories::GroupRepository;
use crate::database::DbHandle;
use async_trait::async_trait;

/// Writes confirmed groups to `song_groups` / `group_files`, one
/// transaction per batch.
pub struct SqliteConfirmationSink {
    groups: GroupRepository,
}

impl SqliteConfirmationSink {
    pub fn new(db: DbHandle) -> Self {
        Self {
            groups: GroupRepository::new(db),
        }
    }
}

#[async_trait]
impl ConfirmationSink for SqliteConfirmationSink {
    async fn submit_confirmations(&self, batch: &[ConfirmationRecord]) -> Result<(), ConfirmError> {
        self.groups.confirm(batch)?;
        Ok(())
    }
}
