use tally_common::db::DbThreadPool;
use tally_common::realtime::{RoomEvent, RoomId, RoomRegistry};
use tally_common::request_io::inputs::InputEventsQuery;

use actix_web::{web, HttpResponse};
use futures::stream::{self, Stream, StreamExt};
use std::convert::Infallible;
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;

use crate::handlers::error::HttpErrorResponse;
use crate::handlers::verification;
use crate::middleware::auth::{Access, VerifiedToken};
use crate::middleware::FromQuery;

/// Server-sent events feed. Every connection joins the caller's personal
/// room; passing `account_id` additionally joins that account's room after a
/// membership check. The token rides in the query string because EventSource
/// cannot set headers.
pub async fn subscribe(
    db_thread_pool: web::Data<DbThreadPool>,
    rooms: web::Data<RoomRegistry>,
    user_access_token: VerifiedToken<Access, FromQuery>,
    query: web::Query<InputEventsQuery>,
) -> Result<HttpResponse, HttpErrorResponse> {
    let user_id = user_access_token.claims.user_id;

    let personal_receiver = rooms.subscribe(RoomId::User(user_id)).await;

    let account_receiver = match query.account_id {
        Some(account_id) => {
            verification::verify_membership(account_id, user_id, &db_thread_pool).await?;
            Some(rooms.subscribe(RoomId::Account(account_id)).await)
        }
        None => None,
    };

    let events = match account_receiver {
        Some(account_receiver) => stream::select(
            event_stream(personal_receiver),
            event_stream(account_receiver),
        )
        .boxed(),
        None => event_stream(personal_receiver).boxed(),
    };

    // An immediate comment makes proxies flush headers to the client
    let body = stream::once(async {
        Ok::<_, Infallible>(web::Bytes::from_static(b": connected\n\n"))
    })
    .chain(events);

    Ok(HttpResponse::Ok()
        .content_type("text/event-stream")
        .insert_header(("Cache-Control", "no-cache"))
        .streaming(body))
}

/// Adapts a room subscription into SSE frames. A lagged receiver gets a
/// comment frame instead of the dropped events; a closed channel ends the
/// stream.
fn event_stream(
    receiver: broadcast::Receiver<RoomEvent>,
) -> impl Stream<Item = Result<web::Bytes, Infallible>> {
    stream::unfold(receiver, |mut receiver| async move {
        loop {
            match receiver.recv().await {
                Ok(event) => {
                    let Ok(payload) = serde_json::to_string(&event.payload) else {
                        continue;
                    };

                    let frame = format!("event: {}\ndata: {}\n\n", event.event, payload);
                    return Some((Ok(web::Bytes::from(frame)), receiver));
                }
                Err(RecvError::Lagged(_)) => {
                    return Some((
                        Ok(web::Bytes::from_static(b": some events were dropped\n\n")),
                        receiver,
                    ));
                }
                Err(RecvError::Closed) => return None,
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use tally_common::realtime::{RoomEvent, RoomId};

    use actix_web::body::{BoxBody, MessageBody};
    use actix_web::http::StatusCode;
    use actix_web::test::{self, TestRequest};
    use actix_web::web::Data;
    use actix_web::App;
    use futures::future::poll_fn;
    use std::pin::Pin;

    use crate::env;
    use crate::handlers::test_utils;

    async fn next_chunk(body: &mut BoxBody) -> String {
        let bytes = poll_fn(|cx| Pin::new(&mut *body).poll_next(cx))
            .await
            .unwrap()
            .unwrap();

        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[actix_web::test]
    async fn test_events_stream_delivers_room_events() {
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
        let account = test_utils::create_account(&user_token).await;

        let req = TestRequest::get()
            .uri(&format!(
                "/api/events?AccessToken={}&account_id={}",
                user_token, account.id
            ))
            .to_request();
        let resp = test::call_service(&app, req).await;

        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(
            resp.headers().get("content-type").unwrap(),
            "text/event-stream"
        );

        let mut body = resp.into_body();
        assert_eq!(next_chunk(&mut body).await, ": connected\n\n");

        // The subscription is live before the response body is polled
        let delivered = env::testing::ROOM_REGISTRY
            .publish(
                RoomId::Account(account.id),
                RoomEvent {
                    event: "transaction_recorded",
                    payload: serde_json::json!({ "amount_cents": 4250 }),
                },
            )
            .await;
        assert!(delivered >= 1);

        let frame = next_chunk(&mut body).await;
        assert!(frame.starts_with("event: transaction_recorded\ndata: "));
        assert!(frame.contains("\"amount_cents\":4250"));

        // Personal-room events arrive on the same connection
        env::testing::ROOM_REGISTRY
            .publish(
                RoomId::User(user.id),
                RoomEvent {
                    event: "invitation_received",
                    payload: serde_json::json!({ "account_name": "Shared" }),
                },
            )
            .await;

        let frame = next_chunk(&mut body).await;
        assert!(frame.starts_with("event: invitation_received\ndata: "));
    }

    #[actix_web::test]
    async fn test_events_requires_membership_for_account_room() {
        let app = test::init_service(
            App::new()
                .app_data(Data::new(env::testing::DB_THREAD_POOL.clone()))
                .app_data(Data::new(env::testing::SMTP_THREAD_POOL.clone()))
                .app_data(Data::new(env::testing::BROADCASTER.clone()))
                .app_data(Data::new(env::testing::ROOM_REGISTRY.clone()))
                .configure(crate::services::api::configure),
        )
        .await;

        let (_, admin_token) = test_utils::create_user().await;
        let account = test_utils::create_account(&admin_token).await;

        let (_, outsider_token) = test_utils::create_user().await;

        let req = TestRequest::get()
            .uri(&format!(
                "/api/events?AccessToken={}&account_id={}",
                outsider_token, account.id
            ))
            .to_request();
        let resp = test::call_service(&app, req).await;

        assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    }

    #[actix_web::test]
    async fn test_events_token_must_be_in_the_query_string() {
        let app = test::init_service(
            App::new()
                .app_data(Data::new(env::testing::DB_THREAD_POOL.clone()))
                .app_data(Data::new(env::testing::SMTP_THREAD_POOL.clone()))
                .app_data(Data::new(env::testing::BROADCASTER.clone()))
                .app_data(Data::new(env::testing::ROOM_REGISTRY.clone()))
                .configure(crate::services::api::configure),
        )
        .await;

        let (_, user_token) = test_utils::create_user().await;

        let req = TestRequest::get().uri("/api/events").to_request();
        let resp = test::call_service(&app, req).await;

        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

        // A header token does not satisfy the query extractor
        let req = TestRequest::get()
            .uri("/api/events")
            .insert_header(("AccessToken", user_token.as_str()))
            .to_request();
        let resp = test::call_service(&app, req).await;

        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    }
}
