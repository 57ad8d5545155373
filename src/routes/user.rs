use actix_web::{get, web, HttpResponse};
use serde_json::json;
use sqlx::PgPool;
use uuid::Uuid;

use crate::databases::auth::users::username_by_id;
use crate::errors::{ApiError, ApiResult};

#[get("/users/{user_id}")]
pub async fn get_user_info(
    user_id: web::Path<String>,
    db_pool: web::Data<PgPool>,
) -> ApiResult<HttpResponse> {
    let user_id = Uuid::parse_str(user_id.trim()).map_err(|_| ApiError::not_found("User not found"))?;

    match username_by_id(&db_pool, user_id).await? {
        Some(username) => Ok(HttpResponse::Ok().json(json!({ "username": username }))),
        None => Err(ApiError::not_found("User not found")),
    }
}

pub fn init(cfg: &mut web::ServiceConfig) {
    cfg.service(get_user_info);
}
