use diesel::{Insertable, Queryable};
use serde::{Deserialize, Serialize};
use std::time::SystemTime;
use uuid::Uuid;

use crate::models::user::User;
use crate::schema::push_subscriptions;

#[derive(Clone, Debug, Serialize, Deserialize, Associations, Identifiable, Queryable)]
#[diesel(belongs_to(User, foreign_key = user_id))]
#[diesel(table_name = push_subscriptions, primary_key(user_id))]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct PushSubscription {
    pub user_id: Uuid,

    pub endpoint: String,
    pub keys: serde_json::Value,

    pub created_timestamp: SystemTime,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = push_subscriptions, primary_key(user_id))]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct NewPushSubscription<'a> {
    pub user_id: Uuid,

    pub endpoint: &'a str,
    pub keys: &'a serde_json::Value,

    pub created_timestamp: SystemTime,
}
