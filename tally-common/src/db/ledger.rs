use chrono::NaiveDate;
use diesel::{dsl, ExpressionMethods, QueryDsl, RunQueryDsl};
use std::time::SystemTime;
use uuid::Uuid;

use crate::db::{DaoError, DbThreadPool};
use crate::models::goal::{Goal, NewGoal};
use crate::models::subscription::{BillingCycle, NewSubscription, Subscription};
use crate::models::transaction::{NewTransaction, Transaction, TransactionKind};
use crate::schema::goals as goal_fields;
use crate::schema::goals::dsl::goals;
use crate::schema::subscriptions as subscription_fields;
use crate::schema::subscriptions::dsl::subscriptions;
use crate::schema::transactions as transaction_fields;
use crate::schema::transactions::dsl::transactions;

pub struct Dao {
    db_thread_pool: DbThreadPool,
}

impl Dao {
    pub fn new(db_thread_pool: &DbThreadPool) -> Self {
        Self {
            db_thread_pool: db_thread_pool.clone(),
        }
    }

    #[allow(clippy::too_many_arguments)]
    pub fn create_transaction(
        &self,
        joint_account_id: Uuid,
        amount_cents: i64,
        currency: &str,
        kind: TransactionKind,
        category: &str,
        date: NaiveDate,
        note: Option<&str>,
        added_by_user_id: Uuid,
        added_by_user_name: &str,
    ) -> Result<Transaction, DaoError> {
        let current_time = SystemTime::now();

        let new_transaction = NewTransaction {
            id: Uuid::now_v7(),
            joint_account_id,
            amount_cents,
            currency,
            kind: kind.into(),
            category,
            date,
            note,
            added_by_user_id,
            added_by_user_name,
            modified_timestamp: current_time,
            created_timestamp: current_time,
        };

        Ok(dsl::insert_into(transactions)
            .values(&new_transaction)
            .get_result::<Transaction>(&mut self.db_thread_pool.get()?)?)
    }

    pub fn get_transaction(
        &self,
        transaction_id: Uuid,
        joint_account_id: Uuid,
    ) -> Result<Transaction, DaoError> {
        Ok(transactions
            .find(transaction_id)
            .filter(transaction_fields::joint_account_id.eq(joint_account_id))
            .get_result::<Transaction>(&mut self.db_thread_pool.get()?)?)
    }

    pub fn get_transactions_for_account(
        &self,
        joint_account_id: Uuid,
    ) -> Result<Vec<Transaction>, DaoError> {
        Ok(transactions
            .filter(transaction_fields::joint_account_id.eq(joint_account_id))
            .order((
                transaction_fields::date.desc(),
                transaction_fields::created_timestamp.desc(),
            ))
            .load::<Transaction>(&mut self.db_thread_pool.get()?)?)
    }

    #[allow(clippy::too_many_arguments)]
    pub fn update_transaction(
        &self,
        transaction_id: Uuid,
        joint_account_id: Uuid,
        amount_cents: i64,
        currency: &str,
        kind: TransactionKind,
        category: &str,
        date: NaiveDate,
        note: Option<&str>,
    ) -> Result<Transaction, DaoError> {
        Ok(dsl::update(
            transactions
                .find(transaction_id)
                .filter(transaction_fields::joint_account_id.eq(joint_account_id)),
        )
        .set((
            transaction_fields::amount_cents.eq(amount_cents),
            transaction_fields::currency.eq(currency),
            transaction_fields::kind.eq(i16::from(kind)),
            transaction_fields::category.eq(category),
            transaction_fields::date.eq(date),
            transaction_fields::note.eq(note),
            transaction_fields::modified_timestamp.eq(dsl::now),
        ))
        .get_result::<Transaction>(&mut self.db_thread_pool.get()?)?)
    }

    pub fn delete_transaction(
        &self,
        transaction_id: Uuid,
        joint_account_id: Uuid,
    ) -> Result<(), DaoError> {
        let affected_row_count = diesel::delete(
            transactions
                .find(transaction_id)
                .filter(transaction_fields::joint_account_id.eq(joint_account_id)),
        )
        .execute(&mut self.db_thread_pool.get()?)?;

        if affected_row_count == 0 {
            return Err(diesel::result::Error::NotFound.into());
        }

        Ok(())
    }

    pub fn create_goal(
        &self,
        joint_account_id: Uuid,
        name: &str,
        target_cents: i64,
        currency: &str,
        deadline: Option<NaiveDate>,
    ) -> Result<Goal, DaoError> {
        let current_time = SystemTime::now();

        let new_goal = NewGoal {
            id: Uuid::now_v7(),
            joint_account_id,
            name,
            target_cents,
            current_cents: 0,
            currency,
            deadline,
            modified_timestamp: current_time,
            created_timestamp: current_time,
        };

        Ok(dsl::insert_into(goals)
            .values(&new_goal)
            .get_result::<Goal>(&mut self.db_thread_pool.get()?)?)
    }

    pub fn get_goal(&self, goal_id: Uuid, joint_account_id: Uuid) -> Result<Goal, DaoError> {
        Ok(goals
            .find(goal_id)
            .filter(goal_fields::joint_account_id.eq(joint_account_id))
            .get_result::<Goal>(&mut self.db_thread_pool.get()?)?)
    }

    pub fn get_goals_for_account(&self, joint_account_id: Uuid) -> Result<Vec<Goal>, DaoError> {
        Ok(goals
            .filter(goal_fields::joint_account_id.eq(joint_account_id))
            .order(goal_fields::created_timestamp.asc())
            .load::<Goal>(&mut self.db_thread_pool.get()?)?)
    }

    /// Returns the balance the goal held before the update alongside the
    /// updated row so callers can detect milestone crossings.
    #[allow(clippy::too_many_arguments)]
    pub fn update_goal(
        &self,
        goal_id: Uuid,
        joint_account_id: Uuid,
        name: &str,
        target_cents: i64,
        current_cents: i64,
        deadline: Option<NaiveDate>,
    ) -> Result<(i64, Goal), DaoError> {
        let mut db_connection = self.db_thread_pool.get()?;

        let (previous_cents, goal) = db_connection
            .build_transaction()
            .run::<_, diesel::result::Error, _>(|conn| {
                let previous_cents = goals
                    .find(goal_id)
                    .filter(goal_fields::joint_account_id.eq(joint_account_id))
                    .select(goal_fields::current_cents)
                    .get_result::<i64>(conn)?;

                let goal = dsl::update(
                    goals
                        .find(goal_id)
                        .filter(goal_fields::joint_account_id.eq(joint_account_id)),
                )
                .set((
                    goal_fields::name.eq(name),
                    goal_fields::target_cents.eq(target_cents),
                    goal_fields::current_cents.eq(current_cents),
                    goal_fields::deadline.eq(deadline),
                    goal_fields::modified_timestamp.eq(dsl::now),
                ))
                .get_result::<Goal>(conn)?;

                Ok((previous_cents, goal))
            })?;

        Ok((previous_cents, goal))
    }

    /// Atomically adds `amount_cents` to the goal balance. Returns the balance
    /// the goal held before the contribution alongside the updated row.
    pub fn contribute_to_goal(
        &self,
        goal_id: Uuid,
        joint_account_id: Uuid,
        amount_cents: i64,
    ) -> Result<(i64, Goal), DaoError> {
        let goal = dsl::update(
            goals
                .find(goal_id)
                .filter(goal_fields::joint_account_id.eq(joint_account_id)),
        )
        .set((
            goal_fields::current_cents.eq(goal_fields::current_cents + amount_cents),
            goal_fields::modified_timestamp.eq(dsl::now),
        ))
        .get_result::<Goal>(&mut self.db_thread_pool.get()?)?;

        Ok((goal.current_cents - amount_cents, goal))
    }

    pub fn delete_goal(&self, goal_id: Uuid, joint_account_id: Uuid) -> Result<(), DaoError> {
        let affected_row_count = diesel::delete(
            goals
                .find(goal_id)
                .filter(goal_fields::joint_account_id.eq(joint_account_id)),
        )
        .execute(&mut self.db_thread_pool.get()?)?;

        if affected_row_count == 0 {
            return Err(diesel::result::Error::NotFound.into());
        }

        Ok(())
    }

    #[allow(clippy::too_many_arguments)]
    pub fn create_subscription(
        &self,
        joint_account_id: Uuid,
        name: &str,
        amount_cents: i64,
        currency: &str,
        cycle: BillingCycle,
        next_billing_date: NaiveDate,
        added_by_user_id: Uuid,
    ) -> Result<Subscription, DaoError> {
        let current_time = SystemTime::now();

        let new_subscription = NewSubscription {
            id: Uuid::now_v7(),
            joint_account_id,
            name,
            amount_cents,
            currency,
            cycle: cycle.into(),
            next_billing_date,
            added_by_user_id,
            modified_timestamp: current_time,
            created_timestamp: current_time,
        };

        Ok(dsl::insert_into(subscriptions)
            .values(&new_subscription)
            .get_result::<Subscription>(&mut self.db_thread_pool.get()?)?)
    }

    pub fn get_subscription(
        &self,
        subscription_id: Uuid,
        joint_account_id: Uuid,
    ) -> Result<Subscription, DaoError> {
        Ok(subscriptions
            .find(subscription_id)
            .filter(subscription_fields::joint_account_id.eq(joint_account_id))
            .get_result::<Subscription>(&mut self.db_thread_pool.get()?)?)
    }

    pub fn get_subscriptions_for_account(
        &self,
        joint_account_id: Uuid,
    ) -> Result<Vec<Subscription>, DaoError> {
        Ok(subscriptions
            .filter(subscription_fields::joint_account_id.eq(joint_account_id))
            .order(subscription_fields::next_billing_date.asc())
            .load::<Subscription>(&mut self.db_thread_pool.get()?)?)
    }

    #[allow(clippy::too_many_arguments)]
    pub fn update_subscription(
        &self,
        subscription_id: Uuid,
        joint_account_id: Uuid,
        name: &str,
        amount_cents: i64,
        currency: &str,
        cycle: BillingCycle,
        next_billing_date: NaiveDate,
    ) -> Result<Subscription, DaoError> {
        Ok(dsl::update(
            subscriptions
                .find(subscription_id)
                .filter(subscription_fields::joint_account_id.eq(joint_account_id)),
        )
        .set((
            subscription_fields::name.eq(name),
            subscription_fields::amount_cents.eq(amount_cents),
            subscription_fields::currency.eq(currency),
            subscription_fields::cycle.eq(i16::from(cycle)),
            subscription_fields::next_billing_date.eq(next_billing_date),
            subscription_fields::modified_timestamp.eq(dsl::now),
        ))
        .get_result::<Subscription>(&mut self.db_thread_pool.get()?)?)
    }

    pub fn delete_subscription(
        &self,
        subscription_id: Uuid,
        joint_account_id: Uuid,
    ) -> Result<(), DaoError> {
        let affected_row_count = diesel::delete(
            subscriptions
                .find(subscription_id)
                .filter(subscription_fields::joint_account_id.eq(joint_account_id)),
        )
        .execute(&mut self.db_thread_pool.get()?)?;

        if affected_row_count == 0 {
            return Err(diesel::result::Error::NotFound.into());
        }

        Ok(())
    }
}
