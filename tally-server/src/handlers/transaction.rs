use tally_common::db::{self, DaoError, DbThreadPool};
use tally_common::request_io::inputs::{
    InputAccountId, InputEditTransaction, InputNewTransaction, InputTransactionId,
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
    transaction_data: web::Json<InputNewTransaction>,
) -> Result<HttpResponse, HttpErrorResponse> {
    if transaction_data.amount_cents <= 0 {
        return Err(HttpErrorResponse::InvalidAmount(String::from(
            "Transaction amount must be positive.",
        )));
    }

    if let Validity::Invalid(msg) = transaction_data.validate_currency_code() {
        return Err(HttpErrorResponse::IncorrectlyFormed(msg));
    }

    let user_id = user_access_token.claims.user_id;
    let account_id = transaction_data.account_id;

    verification::verify_can_edit_finances(account_id, user_id, &db_thread_pool).await?;

    let transaction = match web::block(move || {
        let user_dao = db::user::Dao::new(&db_thread_pool);
        let ledger_dao = db::ledger::Dao::new(&db_thread_pool);

        let user = user_dao.get_user_by_id(user_id)?;

        ledger_dao.create_transaction(
            account_id,
            transaction_data.amount_cents,
            &transaction_data.currency,
            transaction_data.kind,
            &transaction_data.category,
            transaction_data.date,
            transaction_data.note.as_deref(),
            user_id,
            &user.name,
        )
    })
    .await?
    {
        Ok(t) => t,
        Err(e) => {
            log::error!("{e}");
            return Err(HttpErrorResponse::InternalError(String::from(
                "Failed to record transaction",
            )));
        }
    };

    broadcaster.transaction_recorded(transaction.clone());

    Ok(HttpResponse::Created().json(transaction))
}

pub async fn get(
    db_thread_pool: web::Data<DbThreadPool>,
    user_access_token: VerifiedToken<Access, FromHeader>,
    query: web::Query<InputTransactionId>,
) -> Result<HttpResponse, HttpErrorResponse> {
    let user_id = user_access_token.claims.user_id;
    let account_id = query.account_id;
    let transaction_id = query.transaction_id;

    verification::verify_membership(account_id, user_id, &db_thread_pool).await?;

    let transaction = match web::block(move || {
        let ledger_dao = db::ledger::Dao::new(&db_thread_pool);
        ledger_dao.get_transaction(transaction_id, account_id)
    })
    .await?
    {
        Ok(t) => t,
        Err(e) => match e {
            DaoError::QueryFailure(diesel::result::Error::NotFound) => {
                return Err(HttpErrorResponse::DoesNotExist(
                    String::from("No transaction with the given ID"),
                    DoesNotExistType::Transaction,
                ));
            }
            _ => {
                log::error!("{e}");
                return Err(HttpErrorResponse::InternalError(String::from(
                    "Failed to get transaction",
                )));
            }
        },
    };

    Ok(HttpResponse::Ok().json(transaction))
}

pub async fn get_all(
    db_thread_pool: web::Data<DbThreadPool>,
    user_access_token: VerifiedToken<Access, FromHeader>,
    query: web::Query<InputAccountId>,
) -> Result<HttpResponse, HttpErrorResponse> {
    let user_id = user_access_token.claims.user_id;
    let account_id = query.account_id;

    verification::verify_membership(account_id, user_id, &db_thread_pool).await?;

    let transactions = match web::block(move || {
        let ledger_dao = db::ledger::Dao::new(&db_thread_pool);
        ledger_dao.get_transactions_for_account(account_id)
    })
    .await?
    {
        Ok(t) => t,
        Err(e) => {
            log::error!("{e}");
            return Err(HttpErrorResponse::InternalError(String::from(
                "Failed to get transactions",
            )));
        }
    };

    Ok(HttpResponse::Ok().json(transactions))
}

pub async fn edit(
    db_thread_pool: web::Data<DbThreadPool>,
    broadcaster: web::Data<Broadcaster>,
    user_access_token: VerifiedToken<Access, FromHeader>,
    transaction_data: web::Json<InputEditTransaction>,
) -> Result<HttpResponse, HttpErrorResponse> {
    if transaction_data.amount_cents <= 0 {
        return Err(HttpErrorResponse::InvalidAmount(String::from(
            "Transaction amount must be positive.",
        )));
    }

    if let Validity::Invalid(msg) = transaction_data.validate_currency_code() {
        return Err(HttpErrorResponse::IncorrectlyFormed(msg));
    }

    let user_id = user_access_token.claims.user_id;
    let account_id = transaction_data.account_id;

    verification::verify_can_edit_finances(account_id, user_id, &db_thread_pool).await?;

    let transaction = match web::block(move || {
        let ledger_dao = db::ledger::Dao::new(&db_thread_pool);
        ledger_dao.update_transaction(
            transaction_data.transaction_id,
            account_id,
            transaction_data.amount_cents,
            &transaction_data.currency,
            transaction_data.kind,
            &transaction_data.category,
            transaction_data.date,
            transaction_data.note.as_deref(),
        )
    })
    .await?
    {
        Ok(t) => t,
        Err(e) => match e {
            DaoError::QueryFailure(diesel::result::Error::NotFound) => {
                return Err(HttpErrorResponse::DoesNotExist(
                    String::from("No transaction with the given ID"),
                    DoesNotExistType::Transaction,
                ));
            }
            _ => {
                log::error!("{e}");
                return Err(HttpErrorResponse::InternalError(String::from(
                    "Failed to update transaction",
                )));
            }
        },
    };

    broadcaster.transaction_updated(user_id, transaction.clone());

    Ok(HttpResponse::Ok().json(transaction))
}

pub async fn delete(
    db_thread_pool: web::Data<DbThreadPool>,
    broadcaster: web::Data<Broadcaster>,
    user_access_token: VerifiedToken<Access, FromHeader>,
    query: web::Query<InputTransactionId>,
) -> Result<HttpResponse, HttpErrorResponse> {
    let user_id = user_access_token.claims.user_id;
    let account_id = query.account_id;
    let transaction_id = query.transaction_id;

    verification::verify_can_edit_finances(account_id, user_id, &db_thread_pool).await?;

    // The row is fetched before the delete so the fan-out can describe it
    let transaction = match web::block(move || {
        let ledger_dao = db::ledger::Dao::new(&db_thread_pool);

        let transaction = ledger_dao.get_transaction(transaction_id, account_id)?;
        ledger_dao.delete_transaction(transaction_id, account_id)?;

        Ok(transaction)
    })
    .await?
    {
        Ok(t) => t,
        Err(e) => match e {
            DaoError::QueryFailure(diesel::result::Error::NotFound) => {
                return Err(HttpErrorResponse::DoesNotExist(
                    String::from("No transaction with the given ID"),
                    DoesNotExistType::Transaction,
                ));
            }
            _ => {
                log::error!("{e}");
                return Err(HttpErrorResponse::InternalError(String::from(
                    "Failed to delete transaction",
                )));
            }
        },
    };

    broadcaster.transaction_deleted(user_id, transaction);

    Ok(HttpResponse::Ok().finish())
}
