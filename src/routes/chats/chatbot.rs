use actix_web::{post, web, HttpResponse};
use serde::Deserialize;
use sqlx::PgPool;

use crate::errors::{ApiError, ApiResult};
use crate::services::chatbot;

#[derive(Debug, Deserialize)]
pub struct ChatbotRequest {
    pub message: Option<String>,
}

#[post("/chatbot")]
pub async fn ask_chatbot(
    body: web::Json<ChatbotRequest>,
    db: web::Data<PgPool>,
) -> ApiResult<HttpResponse> {
    let message = body
        .into_inner()
        .message
        .filter(|m| !m.trim().is_empty())
        .ok_or_else(|| ApiError::validation("Message required"))?;

    let reply = chatbot::reply(db.get_ref(), &message).await?;
    Ok(HttpResponse::Ok().json(reply))
}

pub fn init(cfg: &mut web::ServiceConfig) {
    cfg.service(ask_chatbot);
}
