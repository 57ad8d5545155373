use chrono::{Duration, Utc};
use rand::{distributions::Alphanumeric, Rng};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

const SESSION_ID_LEN: usize = 48;

#[derive(Debug, Clone, FromRow)]
pub struct SessionUser {
    pub user_id: Uuid,
    pub username: String,
}

pub fn generate_session_id() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(SESSION_ID_LEN)
        .map(char::from)
        .collect()
}

pub async fn create_session(pool: &PgPool, user_id: Uuid, ttl_hours: i64) -> Result<String, sqlx::Error> {
    let session_id = generate_session_id();
    let expires_at = Utc::now() + Duration::hours(ttl_hours);

    sqlx::query("INSERT INTO sessions (session_id, user_id, expires_at) VALUES ($1, $2, $3)")
        .bind(&session_id)
        .bind(user_id)
        .bind(expires_at)
        .execute(pool)
        .await?;

    Ok(session_id)
}

pub async fn find_session_user(pool: &PgPool, session_id: &str) -> Result<Option<SessionUser>, sqlx::Error> {
    sqlx::query_as::<_, SessionUser>(
        r#"
        SELECT s.user_id, u.username
        FROM sessions s
        JOIN users u ON u.id = s.user_id
        WHERE s.session_id = $1 AND s.expires_at > now()
        "#,
    )
    .bind(session_id)
    .fetch_optional(pool)
    .await
}

pub async fn delete_session(pool: &PgPool, session_id: &str) -> Result<(), sqlx::Error> {
    sqlx::query("DELETE FROM sessions WHERE session_id = $1")
        .bind(session_id)
        .execute(pool)
        .await?;
    Ok(())
}
