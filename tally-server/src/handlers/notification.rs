use tally_common::db::{self, DaoError, DbThreadPool};
use tally_common::request_io::inputs::{InputNotificationId, InputNotificationsQuery};
use tally_common::request_io::outputs::OutputNotifications;

use actix_web::{web, HttpResponse};

use crate::handlers::error::{DoesNotExistType, HttpErrorResponse};
use crate::middleware::auth::{Access, VerifiedToken};
use crate::middleware::FromHeader;

const DEFAULT_NOTIFICATION_PAGE_SIZE: i64 = 50;
const MAX_NOTIFICATION_PAGE_SIZE: i64 = 200;

pub async fn get_all(
    db_thread_pool: web::Data<DbThreadPool>,
    user_access_token: VerifiedToken<Access, FromHeader>,
    query: web::Query<InputNotificationsQuery>,
) -> Result<HttpResponse, HttpErrorResponse> {
    let user_id = user_access_token.claims.user_id;
    let limit = query
        .limit
        .unwrap_or(DEFAULT_NOTIFICATION_PAGE_SIZE)
        .clamp(1, MAX_NOTIFICATION_PAGE_SIZE);

    let (notifications, unread_count) = match web::block(move || {
        let notification_dao = db::notification::Dao::new(&db_thread_pool);

        let notifications = notification_dao.get_notifications_for_user(user_id, limit)?;
        let unread_count = notification_dao.get_unread_count(user_id)?;

        Ok::<_, DaoError>((notifications, unread_count))
    })
    .await?
    {
        Ok(n) => n,
        Err(e) => {
            log::error!("{e}");
            return Err(HttpErrorResponse::InternalError(String::from(
                "Failed to get notifications",
            )));
        }
    };

    Ok(HttpResponse::Ok().json(OutputNotifications {
        notifications,
        unread_count,
    }))
}

pub async fn mark_read(
    db_thread_pool: web::Data<DbThreadPool>,
    user_access_token: VerifiedToken<Access, FromHeader>,
    notification_data: web::Json<InputNotificationId>,
) -> Result<HttpResponse, HttpErrorResponse> {
    let user_id = user_access_token.claims.user_id;
    let notification_id = notification_data.notification_id;

    match web::block(move || {
        let notification_dao = db::notification::Dao::new(&db_thread_pool);
        notification_dao.mark_notification_read(notification_id, user_id)
    })
    .await?
    {
        Ok(_) => (),
        Err(e) => match e {
            DaoError::QueryFailure(diesel::result::Error::NotFound) => {
                return Err(HttpErrorResponse::DoesNotExist(
                    String::from("No notification with the given ID"),
                    DoesNotExistType::Notification,
                ));
            }
            _ => {
                log::error!("{e}");
                return Err(HttpErrorResponse::InternalError(String::from(
                    "Failed to mark notification read",
                )));
            }
        },
    }

    Ok(HttpResponse::Ok().finish())
}

pub async fn mark_all_read(
    db_thread_pool: web::Data<DbThreadPool>,
    user_access_token: VerifiedToken<Access, FromHeader>,
) -> Result<HttpResponse, HttpErrorResponse> {
    let user_id = user_access_token.claims.user_id;

    match web::block(move || {
        let notification_dao = db::notification::Dao::new(&db_thread_pool);
        notification_dao.mark_all_notifications_read(user_id)
    })
    .await?
    {
        Ok(_) => (),
        Err(e) => {
            log::error!("{e}");
            return Err(HttpErrorResponse::InternalError(String::from(
                "Failed to mark notifications read",
            )));
        }
    }

    Ok(HttpResponse::Ok().finish())
}

#[cfg(test)]
mod tests {
    use tally_common::db;
    use tally_common::models::notification::NotificationKind;
    use tally_common::request_io::inputs::InputNotificationId;
    use tally_common::request_io::outputs::OutputNotifications;

    use actix_web::body::to_bytes;
    use actix_web::http::StatusCode;
    use actix_web::test::{self, TestRequest};
    use actix_web::web::Data;
    use actix_web::App;
    use uuid::Uuid;

    use crate::env;
    use crate::handlers::test_utils;

    fn seed_notifications(user_id: Uuid, count: usize) {
        let notification_dao = db::notification::Dao::new(&env::testing::DB_THREAD_POOL);

        for n in 0..count {
            notification_dao
                .create_notifications(
                    &[user_id],
                    NotificationKind::ChatActivity,
                    &serde_json::json!({ "message": format!("notice {n}") }),
                )
                .unwrap();
        }
    }

    #[actix_web::test]
    async fn test_list_notifications_with_unread_count() {
        let app = test::init_service(
            App::new()
                .app_data(Data::new(env::testing::DB_THREAD_POOL.clone()))
                .app_data(Data::new(env::testing::SMTP_THREAD_POOL.clone()))
                .app_data(Data::new(env::testing::BROADCASTER.clone()))
                .app_data(Data::new(env::testing::ROOM_REGISTRY.clone()))
                .configure(crate::services::api::configure),
        )
        .await;

        let (user, user_token) = test_utils::create_user().await;
        seed_notifications(user.id, 3);

        let req = TestRequest::get()
            .uri("/api/notification/all")
            .insert_header(("AccessToken", user_token.as_str()))
            .to_request();
        let resp = test::call_service(&app, req).await;

        assert_eq!(resp.status(), StatusCode::OK);

        let resp_body = to_bytes(resp.into_body()).await.unwrap();
        let listed: OutputNotifications = serde_json::from_slice(&resp_body).unwrap();

        assert_eq!(listed.notifications.len(), 3);
        assert_eq!(listed.unread_count, 3);
        assert!(listed.notifications.iter().all(|n| n.user_id == user.id));
    }

    #[actix_web::test]
    async fn test_mark_notification_read() {
        let app = test::init_service(
            App::new()
                .app_data(Data::new(env::testing::DB_THREAD_POOL.clone()))
                .app_data(Data::new(env::testing::SMTP_THREAD_POOL.clone()))
                .app_data(Data::new(env::testing::BROADCASTER.clone()))
                .app_data(Data::new(env::testing::ROOM_REGISTRY.clone()))
                .configure(crate::services::api::configure),
        )
        .await;

        let (user, user_token) = test_utils::create_user().await;
        seed_notifications(user.id, 2);

        let notification_dao = db::notification::Dao::new(&env::testing::DB_THREAD_POOL);
        let listed = notification_dao
            .get_notifications_for_user(user.id, 10)
            .unwrap();

        let read = InputNotificationId {
            notification_id: listed[0].id,
        };

        let req = TestRequest::put()
            .uri("/api/notification/read")
            .insert_header(("AccessToken", user_token.as_str()))
            .set_json(&read)
            .to_request();
        let resp = test::call_service(&app, req).await;

        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(notification_dao.get_unread_count(user.id).unwrap(), 1);

        // Another user's token cannot touch this user's notifications
        let (_, other_token) = test_utils::create_user().await;

        let read = InputNotificationId {
            notification_id: listed[1].id,
        };

        let req = TestRequest::put()
            .uri("/api/notification/read")
            .insert_header(("AccessToken", other_token.as_str()))
            .set_json(&read)
            .to_request();
        let resp = test::call_service(&app, req).await;

        assert_eq!(resp.status(), StatusCode::NOT_FOUND);

        let resp_body = to_bytes(resp.into_body()).await.unwrap();
        let err: serde_json::Value = serde_json::from_slice(&resp_body).unwrap();
        assert_eq!(err["err_type"], 19);
    }

    #[actix_web::test]
    async fn test_mark_all_notifications_read() {
        let app = test::init_service(
            App::new()
                .app_data(Data::new(env::testing::DB_THREAD_POOL.clone()))
                .app_data(Data::new(env::testing::SMTP_THREAD_POOL.clone()))
                .app_data(Data::new(env::testing::BROADCASTER.clone()))
                .app_data(Data::new(env::testing::ROOM_REGISTRY.clone()))
                .configure(crate::services::api::configure),
        )
        .await;

        let (user, user_token) = test_utils::create_user().await;
        seed_notifications(user.id, 3);

        let req = TestRequest::put()
            .uri("/api/notification/read_all")
            .insert_header(("AccessToken", user_token.as_str()))
            .to_request();
        let resp = test::call_service(&app, req).await;

        assert_eq!(resp.status(), StatusCode::OK);

        let notification_dao = db::notification::Dao::new(&env::testing::DB_THREAD_POOL);
        assert_eq!(notification_dao.get_unread_count(user.id).unwrap(), 0);

        // Rows stay; only the unread flag flips
        let listed = notification_dao
            .get_notifications_for_user(user.id, 10)
            .unwrap();
        assert_eq!(listed.len(), 3);
    }
}
