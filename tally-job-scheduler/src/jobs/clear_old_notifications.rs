use tally_common::db::notification::Dao as NotificationDao;
use tally_common::db::DbThreadPool;

use async_trait::async_trait;
use std::time::Duration;

use crate::jobs::{Job, JobError};

/// Deletes read notifications older than the configured maximum age. Unread
/// notifications are kept regardless of age.
pub struct ClearOldNotificationsJob {
    max_age: Duration,
    db_thread_pool: DbThreadPool,
    is_running: bool,
}

impl ClearOldNotificationsJob {
    pub fn new(max_age: Duration, db_thread_pool: DbThreadPool) -> Self {
        Self {
            max_age,
            db_thread_pool,
            is_running: false,
        }
    }
}

#[async_trait]
impl Job for ClearOldNotificationsJob {
    fn name(&self) -> &'static str {
        "Clear Old Notifications"
    }

    fn is_ready(&self) -> bool {
        !self.is_running
    }

    async fn execute(&mut self) -> Result<(), JobError> {
        self.is_running = true;

        let dao = NotificationDao::new(&self.db_thread_pool);
        let max_age = self.max_age;
        let result =
            tokio::task::spawn_blocking(move || dao.delete_old_notifications(max_age)).await;

        self.is_running = false;

        let deleted = result??;

        if deleted > 0 {
            log::info!("Deleted {deleted} old notifications");
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use tally_common::db::{notification, user};
    use tally_common::models::notification::NotificationKind;
    use tally_common::threadrand::SecureRng;

    use uuid::Uuid;

    use crate::env;

    #[tokio::test]
    async fn test_execute() {
        let user_dao = user::Dao::new(&env::testing::DB_THREAD_POOL);
        let notification_dao = notification::Dao::new(&env::testing::DB_THREAD_POOL);

        let user = user_dao
            .create_user(
                Uuid::now_v7(),
                &format!("jobs_test{}@test.com", SecureRng::next_u128()),
                "Jobs Test",
                "USD",
            )
            .unwrap();

        let payload = serde_json::json!({ "account_name": "Jobs Test Account" });

        notification_dao
            .create_notifications(&[user.id], NotificationKind::TransactionActivity, &payload)
            .unwrap();
        notification_dao
            .create_notifications(&[user.id], NotificationKind::GoalActivity, &payload)
            .unwrap();

        // Both notifications get read, then a third arrives and stays unread
        notification_dao.mark_all_notifications_read(user.id).unwrap();
        notification_dao
            .create_notifications(&[user.id], NotificationKind::InviteReceived, &payload)
            .unwrap();

        let mut job =
            ClearOldNotificationsJob::new(Duration::ZERO, env::testing::DB_THREAD_POOL.clone());
        job.execute().await.unwrap();
        assert!(job.is_ready());

        let remaining = notification_dao
            .get_notifications_for_user(user.id, 50)
            .unwrap();

        assert_eq!(remaining.len(), 1);
        assert!(remaining[0].is_unread);
    }

    #[tokio::test]
    async fn test_recent_read_notifications_are_retained() {
        let user_dao = user::Dao::new(&env::testing::DB_THREAD_POOL);
        let notification_dao = notification::Dao::new(&env::testing::DB_THREAD_POOL);

        let user = user_dao
            .create_user(
                Uuid::now_v7(),
                &format!("jobs_test{}@test.com", SecureRng::next_u128()),
                "Jobs Test",
                "USD",
            )
            .unwrap();

        let payload = serde_json::json!({ "account_name": "Jobs Test Account" });

        notification_dao
            .create_notifications(&[user.id], NotificationKind::TransactionActivity, &payload)
            .unwrap();
        notification_dao.mark_all_notifications_read(user.id).unwrap();

        let mut job = ClearOldNotificationsJob::new(
            Duration::from_secs(90 * 86400),
            env::testing::DB_THREAD_POOL.clone(),
        );
        job.execute().await.unwrap();

        let remaining = notification_dao
            .get_notifications_for_user(user.id, 50)
            .unwrap();

        assert_eq!(remaining.len(), 1);
    }
}
