use actix_multipart::Multipart;
use actix_web::{delete, get, post, put, web, HttpResponse};
use log::info;
use serde_json::json;
use sqlx::PgPool;
use uuid::Uuid;

use crate::config::Settings;
use crate::databases::books::{self, BookListing, BookRow};
use crate::errors::{ApiError, ApiResult};
use crate::services::uploads::{discard_image_on_error, read_book_form, remove_image, save_image, FormMode};
use crate::session::CurrentUser;

fn parse_book_id(raw: &str) -> ApiResult<Uuid> {
    Uuid::parse_str(raw.trim()).map_err(|_| ApiError::not_found("Book not found"))
}

/// Loads a book the current user is allowed to change.
async fn owned_book(pool: &PgPool, user: &CurrentUser, raw_id: &str) -> ApiResult<BookRow> {
    let id = parse_book_id(raw_id)?;
    let book = books::find_book(pool, id)
        .await?
        .ok_or_else(|| ApiError::not_found("Book not found"))?;

    if book.user_id != Some(user.id) {
        return Err(ApiError::Forbidden);
    }
    Ok(book)
}

async fn listing(pool: &PgPool, id: Uuid) -> ApiResult<BookListing> {
    books::find_book(pool, id)
        .await?
        .map(BookListing::from)
        .ok_or_else(|| ApiError::not_found("Book not found"))
}

#[post("/books")]
pub async fn create_book(
    user: CurrentUser,
    multipart: Multipart,
    db_pool: web::Data<PgPool>,
    settings: web::Data<Settings>,
) -> ApiResult<HttpResponse> {
    let form = read_book_form(multipart, FormMode::Create).await?;

    let image = match &form.image {
        Some(file) => Some(save_image(&settings.uploads_dir, file).await?),
        None => None,
    };

    let inserted = books::insert_book(&db_pool, user.id, &form.fields, image.as_deref()).await;
    let id = discard_image_on_error(&settings.uploads_dir, image.as_deref(), inserted).await?;

    info!("Book {} posted by {}", id, user.username);
    let book = listing(&db_pool, id).await?;
    Ok(HttpResponse::Ok().json(json!({ "success": true, "book": book })))
}

#[get("/books")]
pub async fn all_books(db_pool: web::Data<PgPool>) -> ApiResult<HttpResponse> {
    let rows = books::list_books(&db_pool, None).await?;
    let listings: Vec<BookListing> = rows.into_iter().map(BookListing::from).collect();
    Ok(HttpResponse::Ok().json(listings))
}

#[get("/books/mine")]
pub async fn my_books(user: CurrentUser, db_pool: web::Data<PgPool>) -> ApiResult<HttpResponse> {
    let rows = books::list_books(&db_pool, Some(user.id)).await?;
    let listings: Vec<BookListing> = rows.into_iter().map(BookListing::from).collect();
    Ok(HttpResponse::Ok().json(listings))
}

#[put("/books/{id}")]
pub async fn edit_book(
    user: CurrentUser,
    path: web::Path<String>,
    multipart: Multipart,
    db_pool: web::Data<PgPool>,
    settings: web::Data<Settings>,
) -> ApiResult<HttpResponse> {
    let book = owned_book(&db_pool, &user, &path).await?;
    let form = read_book_form(multipart, FormMode::Edit).await?;

    let new_image = match &form.image {
        Some(file) => Some(save_image(&settings.uploads_dir, file).await?),
        None => None,
    };

    let updated = books::update_book(&db_pool, book.id, &form.fields, new_image.as_deref()).await;
    discard_image_on_error(&settings.uploads_dir, new_image.as_deref(), updated).await?;

    if new_image.is_some() {
        if let Some(old) = &book.image {
            remove_image(&settings.uploads_dir, old).await;
        }
    }

    let updated = listing(&db_pool, book.id).await?;
    Ok(HttpResponse::Ok().json(json!({ "success": true, "book": updated })))
}

#[delete("/books/{id}")]
pub async fn delete_book(
    user: CurrentUser,
    path: web::Path<String>,
    db_pool: web::Data<PgPool>,
    settings: web::Data<Settings>,
) -> ApiResult<HttpResponse> {
    let book = owned_book(&db_pool, &user, &path).await?;

    if let Some(image) = &book.image {
        remove_image(&settings.uploads_dir, image).await;
    }
    books::delete_book(&db_pool, book.id).await?;

    info!("Book {} deleted by {}", book.id, user.username);
    Ok(HttpResponse::Ok().json(json!({ "success": true })))
}

pub fn init(cfg: &mut web::ServiceConfig) {
    cfg.service(create_book);
    cfg.service(all_books);
    cfg.service(my_books);
    cfg.service(edit_book);
    cfg.service(delete_book);
}
