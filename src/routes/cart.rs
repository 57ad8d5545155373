use actix_web::{delete, get, post, web, HttpResponse};
use serde_json::json;
use sqlx::PgPool;
use uuid::Uuid;

use crate::databases::books;
use crate::databases::cart::{self, CartItem};
use crate::errors::{ApiError, ApiResult};
use crate::session::CurrentUser;

#[post("/cart/add/{book_id}")]
pub async fn add_to_cart(
    user: CurrentUser,
    path: web::Path<String>,
    db_pool: web::Data<PgPool>,
) -> ApiResult<HttpResponse> {
    let book_id = Uuid::parse_str(path.trim()).map_err(|_| ApiError::not_found("Book not found"))?;

    if cart::cart_contains(&db_pool, user.id, book_id).await? {
        return Err(ApiError::validation("Already in cart"));
    }
    if books::find_book(&db_pool, book_id).await?.is_none() {
        return Err(ApiError::not_found("Book not found"));
    }

    let entry = cart::add_to_cart(&db_pool, user.id, book_id)
        .await?
        .ok_or_else(|| ApiError::validation("Already in cart"))?;

    Ok(HttpResponse::Ok().json(json!({ "success": true, "cart": entry })))
}

#[delete("/cart/remove/{book_id}")]
pub async fn remove_from_cart(
    user: CurrentUser,
    path: web::Path<String>,
    db_pool: web::Data<PgPool>,
) -> ApiResult<HttpResponse> {
    let book_id = Uuid::parse_str(path.trim()).map_err(|_| ApiError::not_found("Item not in cart"))?;

    if !cart::remove_from_cart(&db_pool, user.id, book_id).await? {
        return Err(ApiError::not_found("Item not in cart"));
    }

    Ok(HttpResponse::Ok().json(json!({ "success": true })))
}

#[get("/cart")]
pub async fn get_cart(user: CurrentUser, db_pool: web::Data<PgPool>) -> ApiResult<HttpResponse> {
    let items: Vec<CartItem> = cart::cart_items(&db_pool, user.id)
        .await?
        .into_iter()
        .map(CartItem::from)
        .collect();

    Ok(HttpResponse::Ok().json(items))
}

pub fn init(cfg: &mut web::ServiceConfig) {
    cfg.service(add_to_cart);
    cfg.service(remove_from_cart);
    cfg.service(get_cart);
}
