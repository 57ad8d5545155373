use actix_web::cookie::{time::Duration as CookieDuration, Cookie, SameSite};
use actix_web::{dev::Payload, web, FromRequest, HttpRequest};
use futures_util::future::LocalBoxFuture;
use sqlx::PgPool;
use uuid::Uuid;

use crate::databases::auth::sessions;
use crate::errors::ApiError;

pub const SESSION_COOKIE: &str = "bookcircle_sid";

/// The user behind the request's session cookie.
///
/// Extraction fails with `ApiError::Unauthorized` when there is no cookie or
/// the session is unknown or expired.
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub id: Uuid,
    pub username: String,
}

impl FromRequest for CurrentUser {
    type Error = ApiError;
    type Future = LocalBoxFuture<'static, Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        let session_id = req.cookie(SESSION_COOKIE).map(|c| c.value().to_string());
        let pool = req.app_data::<web::Data<PgPool>>().cloned();

        Box::pin(async move {
            let session_id = session_id.ok_or(ApiError::Unauthorized)?;
            let pool = pool.ok_or(ApiError::Unauthorized)?;

            match sessions::find_session_user(pool.get_ref(), &session_id).await? {
                Some(user) => Ok(CurrentUser {
                    id: user.user_id,
                    username: user.username,
                }),
                None => Err(ApiError::Unauthorized),
            }
        })
    }
}

pub fn session_cookie(session_id: String, ttl_hours: i64) -> Cookie<'static> {
    Cookie::build(SESSION_COOKIE, session_id)
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .max_age(CookieDuration::hours(ttl_hours))
        .finish()
}

pub fn expired_session_cookie() -> Cookie<'static> {
    let mut cookie = Cookie::build(SESSION_COOKIE, "")
        .path("/")
        .http_only(true)
        .finish();
    cookie.make_removal();
    cookie
}
