use actix_web::{get, post, web, HttpRequest, HttpResponse};
use argon2::password_hash::SaltString;
use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier};
use log::{error, info};
use rand_core::OsRng;
use serde::Deserialize;
use serde_json::json;
use sqlx::PgPool;

use crate::config::Settings;
use crate::databases::auth::{sessions, users};
use crate::errors::{ApiError, ApiResult};
use crate::session::{expired_session_cookie, session_cookie, CurrentUser, SESSION_COOKIE};

#[derive(Debug, Deserialize)]
pub struct Credentials {
    pub username: Option<String>,
    pub password: Option<String>,
}

impl Credentials {
    /// Both fields, or a validation error when either is missing or blank.
    pub fn require(self) -> ApiResult<(String, String)> {
        match (self.username, self.password) {
            (Some(username), Some(password)) if !username.trim().is_empty() && !password.is_empty() => {
                Ok((username.trim().to_string(), password))
            }
            _ => Err(ApiError::validation("Username and password required")),
        }
    }
}

fn hash_password(password: &str) -> ApiResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| {
            error!("❌ Failed to hash password: {}", e);
            ApiError::Internal("password hashing failed".to_string())
        })
}

fn password_matches(password: &str, stored_hash: &str) -> bool {
    match PasswordHash::new(stored_hash) {
        Ok(parsed) => Argon2::default().verify_password(password.as_bytes(), &parsed).is_ok(),
        Err(e) => {
            error!("❌ Password hash parsing failed: {}", e);
            false
        }
    }
}

async fn open_session(
    db_pool: &PgPool,
    settings: &Settings,
    user_id: uuid::Uuid,
    username: &str,
) -> ApiResult<HttpResponse> {
    let session_id = sessions::create_session(db_pool, user_id, settings.session_ttl_hours).await?;

    Ok(HttpResponse::Ok()
        .cookie(session_cookie(session_id, settings.session_ttl_hours))
        .json(json!({ "success": true, "username": username })))
}

#[post("/signup")]
pub async fn signup(
    data: web::Json<Credentials>,
    db_pool: web::Data<PgPool>,
    settings: web::Data<Settings>,
) -> ApiResult<HttpResponse> {
    let (username, password) = data.into_inner().require()?;

    if users::username_exists(&db_pool, &username).await? {
        return Err(ApiError::validation("Username already taken"));
    }

    let password_hash = hash_password(&password)?;
    let user_id = users::insert_user(&db_pool, &username, &password_hash)
        .await?
        .ok_or_else(|| ApiError::validation("Username already taken"))?;

    info!("New user signed up: {}", username);
    open_session(&db_pool, &settings, user_id, &username).await
}

#[post("/login")]
pub async fn login(
    data: web::Json<Credentials>,
    db_pool: web::Data<PgPool>,
    settings: web::Data<Settings>,
) -> ApiResult<HttpResponse> {
    let (username, password) = data.into_inner().require()?;

    let user = users::get_user_by_username(&db_pool, &username)
        .await?
        .filter(|user| password_matches(&password, &user.password_hash))
        .ok_or_else(|| ApiError::validation("Invalid username or password"))?;

    open_session(&db_pool, &settings, user.id, &user.username).await
}

#[get("/me")]
pub async fn me(user: Option<CurrentUser>) -> HttpResponse {
    match user {
        Some(user) => HttpResponse::Ok().json(json!({ "id": user.id, "username": user.username })),
        None => HttpResponse::Ok().json(json!({ "username": null })),
    }
}

#[post("/logout")]
pub async fn logout(req: HttpRequest, db_pool: web::Data<PgPool>) -> ApiResult<HttpResponse> {
    if let Some(cookie) = req.cookie(SESSION_COOKIE) {
        sessions::delete_session(&db_pool, cookie.value()).await?;
    }

    Ok(HttpResponse::Ok()
        .cookie(expired_session_cookie())
        .json(json!({ "success": true })))
}

pub fn init(cfg: &mut web::ServiceConfig) {
    cfg.service(signup);
    cfg.service(login);
    cfg.service(me);
    cfg.service(logout);
}
