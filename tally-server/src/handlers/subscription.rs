use tally_common::db::{self, DaoError, DbThreadPool};
use tally_common::request_io::inputs::{
    InputAccountId, InputEditSubscription, InputNewSubscription, InputSubscriptionId,
};
use tally_common::validators::Validity;

use actix_web::{web, HttpResponse};

use crate::fanout::Broadcaster;
use crate::handlers::error::{DoesNotExistType, HttpErrorResponse};
use crate::handlers::verification;
use crate::middleware::auth::{Access, VerifiedToken};
use crate::middleware::FromHeader;

pub async fn create(
    db_thread_pool: web::Data<DbThreadPool>,
    broadcaster: web::Data<Broadcaster>,
    user_access_token: VerifiedToken<Access, FromHeader>,
    subscription_data: web::Json<InputNewSubscription>,
) -> Result<HttpResponse, HttpErrorResponse> {
    if subscription_data.amount_cents <= 0 {
        return Err(HttpErrorResponse::InvalidAmount(String::from(
            "Subscription amount must be positive.",
        )));
    }

    if let Validity::Invalid(msg) = subscription_data.validate_currency_code() {
        return Err(HttpErrorResponse::IncorrectlyFormed(msg));
    }

    let user_id = user_access_token.claims.user_id;
    let account_id = subscription_data.account_id;

    verification::verify_can_edit_finances(account_id, user_id, &db_thread_pool).await?;

    let subscription = match web::block(move || {
        let ledger_dao = db::ledger::Dao::new(&db_thread_pool);
        ledger_dao.create_subscription(
            account_id,
            &subscription_data.name,
            subscription_data.amount_cents,
            &subscription_data.currency,
            subscription_data.cycle,
            subscription_data.next_billing_date,
            user_id,
        )
    })
    .await?
    {
        Ok(s) => s,
        Err(e) => {
            log::error!("{e}");
            return Err(HttpErrorResponse::InternalError(String::from(
                "Failed to create subscription",
            )));
        }
    };

    broadcaster.subscription_created(subscription.clone());

    Ok(HttpResponse::Created().json(subscription))
}

pub async fn get_all(
    db_thread_pool: web::Data<DbThreadPool>,
    user_access_token: VerifiedToken<Access, FromHeader>,
    query: web::Query<InputAccountId>,
) -> Result<HttpResponse, HttpErrorResponse> {
    let user_id = user_access_token.claims.user_id;
    let account_id = query.account_id;

    verification::verify_membership(account_id, user_id, &db_thread_pool).await?;

    let subscriptions = match web::block(move || {
        let ledger_dao = db::ledger::Dao::new(&db_thread_pool);
        ledger_dao.get_subscriptions_for_account(account_id)
    })
    .await?
    {
        Ok(s) => s,
        Err(e) => {
            log::error!("{e}");
            return Err(HttpErrorResponse::InternalError(String::from(
                "Failed to get subscriptions",
            )));
        }
    };

    Ok(HttpResponse::Ok().json(subscriptions))
}

pub async fn edit(
    db_thread_pool: web::Data<DbThreadPool>,
    broadcaster: web::Data<Broadcaster>,
    user_access_token: VerifiedToken<Access, FromHeader>,
    subscription_data: web::Json<InputEditSubscription>,
) -> Result<HttpResponse, HttpErrorResponse> {
    if subscription_data.amount_cents <= 0 {
        return Err(HttpErrorResponse::InvalidAmount(String::from(
            "Subscription amount must be positive.",
        )));
    }

    if let Validity::Invalid(msg) = subscription_data.validate_currency_code() {
        return Err(HttpErrorResponse::IncorrectlyFormed(msg));
    }

    let user_id = user_access_token.claims.user_id;
    let account_id = subscription_data.account_id;

    verification::verify_can_edit_finances(account_id, user_id, &db_thread_pool).await?;

    let subscription = match web::block(move || {
        let ledger_dao = db::ledger::Dao::new(&db_thread_pool);
        ledger_dao.update_subscription(
            subscription_data.subscription_id,
            account_id,
            &subscription_data.name,
            subscription_data.amount_cents,
            &subscription_data.currency,
            subscription_data.cycle,
            subscription_data.next_billing_date,
        )
    })
    .await?
    {
        Ok(s) => s,
        Err(e) => match e {
            DaoError::QueryFailure(diesel::result::Error::NotFound) => {
                return Err(HttpErrorResponse::DoesNotExist(
                    String::from("No subscription with the given ID"),
                    DoesNotExistType::Subscription,
                ));
            }
            _ => {
                log::error!("{e}");
                return Err(HttpErrorResponse::InternalError(String::from(
                    "Failed to update subscription",
                )));
            }
        },
    };

    broadcaster.subscription_updated(user_id, subscription.clone());

    Ok(HttpResponse::Ok().json(subscription))
}

pub async fn delete(
    db_thread_pool: web::Data<DbThreadPool>,
    broadcaster: web::Data<Broadcaster>,
    user_access_token: VerifiedToken<Access, FromHeader>,
    query: web::Query<InputSubscriptionId>,
) -> Result<HttpResponse, HttpErrorResponse> {
    let user_id = user_access_token.claims.user_id;
    let account_id = query.account_id;
    let subscription_id = query.subscription_id;

    verification::verify_can_edit_finances(account_id, user_id, &db_thread_pool).await?;

    let subscription = match web::block(move || {
        let ledger_dao = db::ledger::Dao::new(&db_thread_pool);

        let subscription = ledger_dao.get_subscription(subscription_id, account_id)?;
        ledger_dao.delete_subscription(subscription_id, account_id)?;

        Ok(subscription)
    })
    .await?
    {
        Ok(s) => s,
        Err(e) => match e {
            DaoError::QueryFailure(diesel::result::Error::NotFound) => {
                return Err(HttpErrorResponse::DoesNotExist(
                    String::from("No subscription with the given ID"),
                    DoesNotExistType::Subscription,
                ));
            }
            _ => {
                log::error!("{e}");
                return Err(HttpErrorResponse::InternalError(String::from(
                    "Failed to delete subscription",
                )));
            }
        },
    };

    broadcaster.subscription_deleted(user_id, subscription);

    Ok(HttpResponse::Ok().finish())
}
