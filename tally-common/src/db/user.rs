use diesel::{dsl, ExpressionMethods, OptionalExtension, QueryDsl, RunQueryDsl};
use std::time::SystemTime;
use uuid::Uuid;

use crate::db::{DaoError, DbThreadPool};
use crate::models::push_subscription::{NewPushSubscription, PushSubscription};
use crate::models::user::{NewUser, User};
use crate::schema::push_subscriptions as push_subscription_fields;
use crate::schema::push_subscriptions::dsl::push_subscriptions;
use crate::schema::users as user_fields;
use crate::schema::users::dsl::users;

pub struct Dao {
    db_thread_pool: DbThreadPool,
}

impl Dao {
    pub fn new(db_thread_pool: &DbThreadPool) -> Self {
        Self {
            db_thread_pool: db_thread_pool.clone(),
        }
    }

    pub fn create_user(
        &self,
        user_id: Uuid,
        email: &str,
        name: &str,
        primary_currency: &str,
    ) -> Result<User, DaoError> {
        let email_lowercase = email.to_lowercase();
        let current_time = SystemTime::now();

        let new_user = NewUser {
            id: user_id,
            email: &email_lowercase,
            name,
            primary_currency,
            notifications_enabled: true,
            modified_timestamp: current_time,
            created_timestamp: current_time,
        };

        Ok(dsl::insert_into(users)
            .values(&new_user)
            .get_result::<User>(&mut self.db_thread_pool.get()?)?)
    }

    pub fn get_user_by_id(&self, user_id: Uuid) -> Result<User, DaoError> {
        Ok(users
            .find(user_id)
            .get_result::<User>(&mut self.db_thread_pool.get()?)?)
    }

    pub fn get_user_by_email(&self, email: &str) -> Result<Option<User>, DaoError> {
        Ok(users
            .filter(user_fields::email.eq(email.to_lowercase()))
            .get_result::<User>(&mut self.db_thread_pool.get()?)
            .optional()?)
    }

    pub fn update_user_preferences(
        &self,
        user_id: Uuid,
        name: &str,
        primary_currency: &str,
        notifications_enabled: bool,
    ) -> Result<User, DaoError> {
        Ok(dsl::update(users.find(user_id))
            .set((
                user_fields::name.eq(name),
                user_fields::primary_currency.eq(primary_currency),
                user_fields::notifications_enabled.eq(notifications_enabled),
                user_fields::modified_timestamp.eq(dsl::now),
            ))
            .get_result::<User>(&mut self.db_thread_pool.get()?)?)
    }

    pub fn upsert_push_subscription(
        &self,
        user_id: Uuid,
        endpoint: &str,
        keys: &serde_json::Value,
    ) -> Result<(), DaoError> {
        let new_subscription = NewPushSubscription {
            user_id,
            endpoint,
            keys,
            created_timestamp: SystemTime::now(),
        };

        dsl::insert_into(push_subscriptions)
            .values(&new_subscription)
            .on_conflict(push_subscription_fields::user_id)
            .do_update()
            .set((
                push_subscription_fields::endpoint.eq(endpoint),
                push_subscription_fields::keys.eq(keys),
            ))
            .execute(&mut self.db_thread_pool.get()?)?;

        Ok(())
    }

    pub fn delete_push_subscription(&self, user_id: Uuid) -> Result<(), DaoError> {
        diesel::delete(push_subscriptions.find(user_id))
            .execute(&mut self.db_thread_pool.get()?)?;
        Ok(())
    }

    pub fn get_push_subscriptions(
        &self,
        user_ids: &[Uuid],
    ) -> Result<Vec<PushSubscription>, DaoError> {
        Ok(push_subscriptions
            .filter(push_subscription_fields::user_id.eq_any(user_ids))
            .get_results::<PushSubscription>(&mut self.db_thread_pool.get()?)?)
    }
}
