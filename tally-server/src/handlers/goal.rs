use tally_common::db::{self, DaoError, DbThreadPool};
use tally_common::request_io::inputs::{
    InputAccountId, InputEditGoal, InputGoalContribution, InputGoalId, InputNewGoal,
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
    goal_data: web::Json<InputNewGoal>,
) -> Result<HttpResponse, HttpErrorResponse> {
    if goal_data.target_cents <= 0 {
        return Err(HttpErrorResponse::InvalidAmount(String::from(
            "Goal target must be positive.",
        )));
    }

    if let Validity::Invalid(msg) = goal_data.validate_currency_code() {
        return Err(HttpErrorResponse::IncorrectlyFormed(msg));
    }

    let user_id = user_access_token.claims.user_id;
    let account_id = goal_data.account_id;

    verification::verify_can_edit_finances(account_id, user_id, &db_thread_pool).await?;

    let goal = match web::block(move || {
        let ledger_dao = db::ledger::Dao::new(&db_thread_pool);
        ledger_dao.create_goal(
            account_id,
            &goal_data.name,
            goal_data.target_cents,
            &goal_data.currency,
            goal_data.deadline,
        )
    })
    .await?
    {
        Ok(g) => g,
        Err(e) => {
            log::error!("{e}");
            return Err(HttpErrorResponse::InternalError(String::from(
                "Failed to create goal",
            )));
        }
    };

    broadcaster.goal_created(user_id, goal.clone());

    Ok(HttpResponse::Created().json(goal))
}

pub async fn get(
    db_thread_pool: web::Data<DbThreadPool>,
    user_access_token: VerifiedToken<Access, FromHeader>,
    query: web::Query<InputGoalId>,
) -> Result<HttpResponse, HttpErrorResponse> {
    let user_id = user_access_token.claims.user_id;
    let account_id = query.account_id;
    let goal_id = query.goal_id;

    verification::verify_membership(account_id, user_id, &db_thread_pool).await?;

    let goal = match web::block(move || {
        let ledger_dao = db::ledger::Dao::new(&db_thread_pool);
        ledger_dao.get_goal(goal_id, account_id)
    })
    .await?
    {
        Ok(g) => g,
        Err(e) => match e {
            DaoError::QueryFailure(diesel::result::Error::NotFound) => {
                return Err(HttpErrorResponse::DoesNotExist(
                    String::from("No goal with the given ID"),
                    DoesNotExistType::Goal,
                ));
            }
            _ => {
                log::error!("{e}");
                return Err(HttpErrorResponse::InternalError(String::from(
                    "Failed to get goal",
                )));
            }
        },
    };

    Ok(HttpResponse::Ok().json(goal))
}

pub async fn get_all(
    db_thread_pool: web::Data<DbThreadPool>,
    user_access_token: VerifiedToken<Access, FromHeader>,
    query: web::Query<InputAccountId>,
) -> Result<HttpResponse, HttpErrorResponse> {
    let user_id = user_access_token.claims.user_id;
    let account_id = query.account_id;

    verification::verify_membership(account_id, user_id, &db_thread_pool).await?;

    let goals = match web::block(move || {
        let ledger_dao = db::ledger::Dao::new(&db_thread_pool);
        ledger_dao.get_goals_for_account(account_id)
    })
    .await?
    {
        Ok(g) => g,
        Err(e) => {
            log::error!("{e}");
            return Err(HttpErrorResponse::InternalError(String::from(
                "Failed to get goals",
            )));
        }
    };

    Ok(HttpResponse::Ok().json(goals))
}

pub async fn edit(
    db_thread_pool: web::Data<DbThreadPool>,
    broadcaster: web::Data<Broadcaster>,
    user_access_token: VerifiedToken<Access, FromHeader>,
    goal_data: web::Json<InputEditGoal>,
) -> Result<HttpResponse, HttpErrorResponse> {
    if goal_data.target_cents <= 0 {
        return Err(HttpErrorResponse::InvalidAmount(String::from(
            "Goal target must be positive.",
        )));
    }

    if goal_data.current_cents < 0 {
        return Err(HttpErrorResponse::InvalidAmount(String::from(
            "Goal balance cannot be negative.",
        )));
    }

    let user_id = user_access_token.claims.user_id;
    let account_id = goal_data.account_id;

    verification::verify_can_edit_finances(account_id, user_id, &db_thread_pool).await?;

    let (previous_cents, goal) = match web::block(move || {
        let ledger_dao = db::ledger::Dao::new(&db_thread_pool);
        ledger_dao.update_goal(
            goal_data.goal_id,
            account_id,
            &goal_data.name,
            goal_data.target_cents,
            goal_data.current_cents,
            goal_data.deadline,
        )
    })
    .await?
    {
        Ok(g) => g,
        Err(e) => match e {
            DaoError::QueryFailure(diesel::result::Error::NotFound) => {
                return Err(HttpErrorResponse::DoesNotExist(
                    String::from("No goal with the given ID"),
                    DoesNotExistType::Goal,
                ));
            }
            _ => {
                log::error!("{e}");
                return Err(HttpErrorResponse::InternalError(String::from(
                    "Failed to update goal",
                )));
            }
        },
    };

    broadcaster.goal_updated(user_id, previous_cents, goal.clone());

    Ok(HttpResponse::Ok().json(goal))
}

pub async fn contribute(
    db_thread_pool: web::Data<DbThreadPool>,
    broadcaster: web::Data<Broadcaster>,
    user_access_token: VerifiedToken<Access, FromHeader>,
    contribution_data: web::Json<InputGoalContribution>,
) -> Result<HttpResponse, HttpErrorResponse> {
    if contribution_data.amount_cents <= 0 {
        return Err(HttpErrorResponse::InvalidAmount(String::from(
            "Contribution amount must be positive.",
        )));
    }

    let user_id = user_access_token.claims.user_id;
    let account_id = contribution_data.account_id;
    let amount_cents = contribution_data.amount_cents;

    verification::verify_can_edit_finances(account_id, user_id, &db_thread_pool).await?;

    let (previous_cents, goal) = match web::block(move || {
        let ledger_dao = db::ledger::Dao::new(&db_thread_pool);
        ledger_dao.contribute_to_goal(contribution_data.goal_id, account_id, amount_cents)
    })
    .await?
    {
        Ok(g) => g,
        Err(e) => match e {
            DaoError::QueryFailure(diesel::result::Error::NotFound) => {
                return Err(HttpErrorResponse::DoesNotExist(
                    String::from("No goal with the given ID"),
                    DoesNotExistType::Goal,
                ));
            }
            _ => {
                log::error!("{e}");
                return Err(HttpErrorResponse::InternalError(String::from(
                    "Failed to contribute to goal",
                )));
            }
        },
    };

    broadcaster.goal_contributed(user_id, amount_cents, previous_cents, goal.clone());

    Ok(HttpResponse::Ok().json(goal))
}

pub async fn delete(
    db_thread_pool: web::Data<DbThreadPool>,
    broadcaster: web::Data<Broadcaster>,
    user_access_token: VerifiedToken<Access, FromHeader>,
    query: web::Query<InputGoalId>,
) -> Result<HttpResponse, HttpErrorResponse> {
    let user_id = user_access_token.claims.user_id;
    let account_id = query.account_id;
    let goal_id = query.goal_id;

    verification::verify_can_edit_finances(account_id, user_id, &db_thread_pool).await?;

    let goal = match web::block(move || {
        let ledger_dao = db::ledger::Dao::new(&db_thread_pool);

        let goal = ledger_dao.get_goal(goal_id, account_id)?;
        ledger_dao.delete_goal(goal_id, account_id)?;

        Ok(goal)
    })
    .await?
    {
        Ok(g) => g,
        Err(e) => match e {
            DaoError::QueryFailure(diesel::result::Error::NotFound) => {
                return Err(HttpErrorResponse::DoesNotExist(
                    String::from("No goal with the given ID"),
                    DoesNotExistType::Goal,
                ));
            }
            _ => {
                log::error!("{e}");
                return Err(HttpErrorResponse::InternalError(String::from(
                    "Failed to delete goal",
                )));
            }
        },
    };

    broadcaster.goal_deleted(user_id, goal);

    Ok(HttpResponse::Ok().finish())
}
