use actix_web::web::*;

mod account;
mod chat;
mod event;
mod goal;
mod health;
mod notification;
mod subscription;
mod transaction;
mod user;

pub fn configure(cfg: &mut ServiceConfig) {
    // The health scope has an empty prefix, so it must be registered after
    // every other scope to avoid shadowing them
    cfg.service(
        scope("/api")
            .configure(account::configure)
            .configure(chat::configure)
            .configure(event::configure)
            .configure(goal::configure)
            .configure(notification::configure)
            .configure(subscription::configure)
            .configure(transaction::configure)
            .configure(user::configure)
            .configure(health::configure),
    );
}
