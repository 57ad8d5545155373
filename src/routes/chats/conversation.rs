use actix_web::{get, post, web, HttpResponse};
use log::info;
use serde_json::json;
use sqlx::PgPool;
use uuid::Uuid;

use crate::databases::messages::MessageStore;
use crate::errors::ApiResult;
use crate::services::conversation::{conversations_for, send_message, thread_with, SendMessageRequest};
use crate::session::CurrentUser;

/// Sends as `user` and wraps the stored message in the `{success, message}` envelope.
pub async fn send_as<S>(store: &S, user: Uuid, request: SendMessageRequest) -> ApiResult<HttpResponse>
where
    S: MessageStore + ?Sized,
{
    let saved = send_message(store, user, request).await?;
    info!("Message {} sent from {} to {}", saved.id, saved.sender, saved.recipient);

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "message": saved
    })))
}

pub async fn list_conversations<S>(store: &S, user: Uuid) -> ApiResult<HttpResponse>
where
    S: MessageStore + ?Sized,
{
    let conversations = conversations_for(store, user).await?;
    Ok(HttpResponse::Ok().json(conversations))
}

pub async fn read_thread<S>(store: &S, user: Uuid, other: &str) -> ApiResult<HttpResponse>
where
    S: MessageStore + ?Sized,
{
    let messages = thread_with(store, user, other).await?;
    Ok(HttpResponse::Ok().json(messages))
}

#[post("/messages")]
pub async fn post_message(
    user: CurrentUser,
    db: web::Data<PgPool>,
    body: web::Json<SendMessageRequest>,
) -> ApiResult<HttpResponse> {
    send_as(db.get_ref(), user.id, body.into_inner()).await
}

#[get("/messages/conversations")]
pub async fn get_conversations(user: CurrentUser, db: web::Data<PgPool>) -> ApiResult<HttpResponse> {
    list_conversations(db.get_ref(), user.id).await
}

#[get("/messages/thread/{user_id}")]
pub async fn get_thread(
    user: CurrentUser,
    path: web::Path<String>,
    db: web::Data<PgPool>,
) -> ApiResult<HttpResponse> {
    read_thread(db.get_ref(), user.id, &path).await
}

pub fn init(cfg: &mut web::ServiceConfig) {
    cfg.service(post_message);
    cfg.service(get_conversations);
    cfg.service(get_thread);
}
