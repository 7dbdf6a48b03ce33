use actix_web::web::*;

use crate::handlers::transaction;

pub fn configure(cfg: &mut ServiceConfig) {
    cfg.service(
        scope("/transaction")
            .route("", post().to(transaction::create))
            .route("", get().to(transaction::get))
            .route("", put().to(transaction::edit))
            .route("", delete().to(transaction::delete))
            .route("/all", get().to(transaction::get_all)),
    );
}
