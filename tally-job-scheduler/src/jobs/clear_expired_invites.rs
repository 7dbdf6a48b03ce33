use tally_common::db::account::Dao as AccountDao;
use tally_common::db::DbThreadPool;

use async_trait::async_trait;
use std::time::Duration;

use crate::jobs::{Job, JobError};

/// Purges invitation rows whose expiration passed more than the grace period
/// ago. Recently expired invitations are left in place so responding to one
/// reports expiry rather than absence.
pub struct ClearExpiredInvitesJob {
    grace_period: Duration,
    db_thread_pool: DbThreadPool,
    is_running: bool,
}

impl ClearExpiredInvitesJob {
    pub fn new(grace_period: Duration, db_thread_pool: DbThreadPool) -> Self {
        Self {
            grace_period,
            db_thread_pool,
            is_running: false,
        }
    }
}

#[async_trait]
impl Job for ClearExpiredInvitesJob {
    fn name(&self) -> &'static str {
        "Clear Expired Invites"
    }

    fn is_ready(&self) -> bool {
        !self.is_running
    }

    async fn execute(&mut self) -> Result<(), JobError> {
        self.is_running = true;

        let dao = AccountDao::new(&self.db_thread_pool);
        let grace_period = self.grace_period;
        let result =
            tokio::task::spawn_blocking(move || dao.delete_all_expired_invitations(grace_period))
                .await;

        self.is_running = false;

        let deleted = result??;

        if deleted > 0 {
            log::info!("Deleted {deleted} expired invitations");
        }

        Ok(())
    }
}
