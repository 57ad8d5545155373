use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::{FromRow, PgPool};
use std::collections::HashMap;
use uuid::Uuid;

use crate::databases::auth::users;

/// One directed message. Never updated after insert.
#[derive(Debug, Clone, PartialEq, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: i64,
    #[serde(rename = "from")]
    #[sqlx(rename = "sender_id")]
    pub sender: Uuid,
    #[serde(rename = "to")]
    #[sqlx(rename = "recipient_id")]
    pub recipient: Uuid,
    pub text: String,
    pub created_at: DateTime<Utc>,
    /// Stored but not read or updated by any path yet.
    pub read: bool,
}

impl Message {
    /// The other party of this message, seen from `user`.
    pub fn counterpart_of(&self, user: Uuid) -> Uuid {
        if self.sender == user {
            self.recipient
        } else {
            self.sender
        }
    }
}

/// Storage seam for the messaging core.
#[async_trait]
pub trait MessageStore {
    async fn user_exists(&self, user: Uuid) -> Result<bool, sqlx::Error>;

    async fn usernames(&self, users: &[Uuid]) -> Result<HashMap<Uuid, String>, sqlx::Error>;

    /// Appends a message; the store assigns id and timestamp.
    async fn insert_message(&self, from: Uuid, to: Uuid, text: &str) -> Result<Message, sqlx::Error>;

    /// Every message `user` sent or received, newest first.
    async fn messages_involving(&self, user: Uuid) -> Result<Vec<Message>, sqlx::Error>;

    /// Every message between `a` and `b` in either direction, oldest first.
    async fn messages_between(&self, a: Uuid, b: Uuid) -> Result<Vec<Message>, sqlx::Error>;
}

#[async_trait]
impl MessageStore for PgPool {
    async fn user_exists(&self, user: Uuid) -> Result<bool, sqlx::Error> {
        Ok(users::username_by_id(self, user).await?.is_some())
    }

    async fn usernames(&self, ids: &[Uuid]) -> Result<HashMap<Uuid, String>, sqlx::Error> {
        users::usernames_by_ids(self, ids).await
    }

    async fn insert_message(&self, from: Uuid, to: Uuid, text: &str) -> Result<Message, sqlx::Error> {
        sqlx::query_as::<_, Message>(
            r#"
            INSERT INTO messages (sender_id, recipient_id, text)
            VALUES ($1, $2, $3)
            RETURNING id, sender_id, recipient_id, text, created_at, read
            "#,
        )
        .bind(from)
        .bind(to)
        .bind(text)
        .fetch_one(self)
        .await
    }

    async fn messages_involving(&self, user: Uuid) -> Result<Vec<Message>, sqlx::Error> {
        sqlx::query_as::<_, Message>(
            r#"
            SELECT id, sender_id, recipient_id, text, created_at, read
            FROM messages
            WHERE sender_id = $1 OR recipient_id = $1
            ORDER BY created_at DESC, id DESC
            "#,
        )
        .bind(user)
        .fetch_all(self)
        .await
    }

    async fn messages_between(&self, a: Uuid, b: Uuid) -> Result<Vec<Message>, sqlx::Error> {
        sqlx::query_as::<_, Message>(
            r#"
            SELECT id, sender_id, recipient_id, text, created_at, read
            FROM messages
            WHERE (sender_id = $1 AND recipient_id = $2)
               OR (sender_id = $2 AND recipient_id = $1)
            ORDER BY created_at ASC, id ASC
            "#,
        )
        .bind(a)
        .bind(b)
        .fetch_all(self)
        .await
    }
}
