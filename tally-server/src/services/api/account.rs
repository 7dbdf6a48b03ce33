use actix_web::web::*;

use crate::handlers::account;

pub fn configure(cfg: &mut ServiceConfig) {
    cfg.service(
        scope("/account")
            .route("", post().to(account::create))
            .route("", get().to(account::get))
            .route("", put().to(account::edit))
            .route("", delete().to(account::delete))
            .route("/all", get().to(account::get_all))
            .route("/members", get().to(account::get_members))
            .route("/member/role", put().to(account::edit_member_role))
            .route("/member", delete().to(account::remove_member))
            .route("/leave", delete().to(account::leave))
            .route("/invitation", post().to(account::create_invitation))
            .route("/invitation/accept", put().to(account::accept_invitation))
            .route(
                "/invitation/decline",
                put().to(account::decline_invitation),
            )
            .route(
                "/invitation/all_pending",
                get().to(account::get_all_pending_invitations),
            )
            .route(
                "/invitation/all_for_account",
                get().to(account::get_invitations_for_account),
            ),
    );
}
