use actix_web::web;

pub mod auth;
pub mod books;
pub mod cart;
pub mod chats;
pub mod user;

pub fn init(cfg: &mut web::ServiceConfig) {
    auth::init(cfg);
    user::init(cfg);
    books::init(cfg);
    cart::init(cfg);
    chats::conversation::init(cfg);
    chats::chatbot::init(cfg);
}
