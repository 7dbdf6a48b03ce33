use actix_web::web::*;

use crate::handlers::chat;

pub fn configure(cfg: &mut ServiceConfig) {
    cfg.service(
        scope("/chat")
            .route("/message", post().to(chat::post_message))
            .route("/message/read", put().to(chat::mark_message_read))
            .route("/messages", get().to(chat::get_messages))
            .route("/split_request", post().to(chat::create_split_request))
            .route(
                "/split_request/respond",
                put().to(chat::respond_to_split_request),
            )
            .route(
                "/split_request/all_open",
                get().to(chat::get_open_split_requests),
            ),
    );
}
