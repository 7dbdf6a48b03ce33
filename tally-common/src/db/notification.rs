use diesel::{dsl, ExpressionMethods, QueryDsl, RunQueryDsl};
use std::time::{Duration, SystemTime};
use uuid::Uuid;

use crate::db::{DaoError, DbThreadPool};
use crate::models::notification::{NewNotification, Notification, NotificationKind};
use crate::schema::notifications as notification_fields;
use crate::schema::notifications::dsl::notifications;

pub struct Dao {
    db_thread_pool: DbThreadPool,
}

impl Dao {
    pub fn new(db_thread_pool: &DbThreadPool) -> Self {
        Self {
            db_thread_pool: db_thread_pool.clone(),
        }
    }

    /// Persists one notification per recipient. Returns the number of rows
    /// written.
    pub fn create_notifications(
        &self,
        recipient_user_ids: &[Uuid],
        kind: NotificationKind,
        payload: &serde_json::Value,
    ) -> Result<usize, DaoError> {
        if recipient_user_ids.is_empty() {
            return Ok(0);
        }

        let current_time = SystemTime::now();

        let new_notifications: Vec<NewNotification> = recipient_user_ids
            .iter()
            .map(|user_id| NewNotification {
                id: Uuid::now_v7(),
                user_id: *user_id,
                kind: kind.into(),
                payload,
                is_unread: true,
                created_timestamp: current_time,
            })
            .collect();

        Ok(dsl::insert_into(notifications)
            .values(&new_notifications)
            .execute(&mut self.db_thread_pool.get()?)?)
    }

    pub fn get_notifications_for_user(
        &self,
        user_id: Uuid,
        limit: i64,
    ) -> Result<Vec<Notification>, DaoError> {
        Ok(notifications
            .filter(notification_fields::user_id.eq(user_id))
            .order((
                notification_fields::is_unread.desc(),
                notification_fields::created_timestamp.desc(),
            ))
            .limit(limit)
            .load::<Notification>(&mut self.db_thread_pool.get()?)?)
    }

    pub fn get_unread_count(&self, user_id: Uuid) -> Result<i64, DaoError> {
        Ok(notifications
            .filter(notification_fields::user_id.eq(user_id))
            .filter(notification_fields::is_unread.eq(true))
            .count()
            .get_result::<i64>(&mut self.db_thread_pool.get()?)?)
    }

    pub fn mark_notification_read(
        &self,
        notification_id: Uuid,
        user_id: Uuid,
    ) -> Result<(), DaoError> {
        let affected_row_count = dsl::update(
            notifications
                .find(notification_id)
                .filter(notification_fields::user_id.eq(user_id)),
        )
        .set(notification_fields::is_unread.eq(false))
        .execute(&mut self.db_thread_pool.get()?)?;

        if affected_row_count == 0 {
            return Err(diesel::result::Error::NotFound.into());
        }

        Ok(())
    }

    pub fn mark_all_notifications_read(&self, user_id: Uuid) -> Result<usize, DaoError> {
        Ok(dsl::update(
            notifications
                .filter(notification_fields::user_id.eq(user_id))
                .filter(notification_fields::is_unread.eq(true)),
        )
        .set(notification_fields::is_unread.eq(false))
        .execute(&mut self.db_thread_pool.get()?)?)
    }

    /// Deletes read notifications older than `max_age`. Unread notifications
    /// stay until the user sees them.
    pub fn delete_old_notifications(&self, max_age: Duration) -> Result<usize, DaoError> {
        let cutoff = SystemTime::now() - max_age;

        Ok(diesel::delete(
            notifications
                .filter(notification_fields::is_unread.eq(false))
                .filter(notification_fields::created_timestamp.lt(cutoff)),
        )
        .execute(&mut self.db_thread_pool.get()?)?)
    }
}
