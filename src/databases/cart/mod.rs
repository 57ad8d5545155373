use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::databases::books::image_url;

#[derive(Debug, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct CartEntry {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub book_id: Uuid,
    #[sqlx(rename = "created_at")]
    pub added_at: DateTime<Utc>,
}

#[derive(Debug, FromRow)]
pub struct CartRow {
    pub id: Uuid,
    pub book_id: Uuid,
    pub title: Option<String>,
    pub author: Option<String>,
    pub price: Option<f64>,
    pub location: Option<String>,
    pub description: Option<String>,
    pub image: Option<String>,
    pub rating: Option<i16>,
    pub owner_username: Option<String>,
    pub book_created_at: DateTime<Utc>,
    pub added_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct CartOwner {
    pub username: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartItem {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub book_id: Uuid,
    pub title: Option<String>,
    pub author: Option<String>,
    pub price: Option<f64>,
    pub location: Option<String>,
    pub description: Option<String>,
    pub image: Option<String>,
    pub rating: Option<i16>,
    pub user: Option<CartOwner>,
    pub created_at: DateTime<Utc>,
    pub added_at: DateTime<Utc>,
}

impl From<CartRow> for CartItem {
    fn from(row: CartRow) -> Self {
        CartItem {
            id: row.id,
            book_id: row.book_id,
            title: row.title,
            author: row.author,
            price: row.price,
            location: row.location,
            description: row.description,
            image: row.image.as_deref().map(image_url),
            rating: row.rating,
            user: row.owner_username.map(|username| CartOwner { username }),
            created_at: row.book_created_at,
            added_at: row.added_at,
        }
    }
}

pub async fn cart_contains(pool: &PgPool, user_id: Uuid, book_id: Uuid) -> Result<bool, sqlx::Error> {
    let row = sqlx::query("SELECT 1 FROM cart_items WHERE user_id = $1 AND book_id = $2")
        .bind(user_id)
        .bind(book_id)
        .fetch_optional(pool)
        .await?;
    Ok(row.is_some())
}

/// Returns `None` when the book is already in the cart.
pub async fn add_to_cart(pool: &PgPool, user_id: Uuid, book_id: Uuid) -> Result<Option<CartEntry>, sqlx::Error> {
    sqlx::query_as::<_, CartEntry>(
        r#"
        INSERT INTO cart_items (id, user_id, book_id)
        VALUES ($1, $2, $3)
        ON CONFLICT (user_id, book_id) DO NOTHING
        RETURNING id, book_id, created_at
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(user_id)
    .bind(book_id)
    .fetch_optional(pool)
    .await
}

/// Returns whether a row was removed.
pub async fn remove_from_cart(pool: &PgPool, user_id: Uuid, book_id: Uuid) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM cart_items WHERE user_id = $1 AND book_id = $2")
        .bind(user_id)
        .bind(book_id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

pub async fn cart_items(pool: &PgPool, user_id: Uuid) -> Result<Vec<CartRow>, sqlx::Error> {
    sqlx::query_as::<_, CartRow>(
        r#"
        SELECT
            c.id, c.book_id, b.title, b.author, b.price, b.location, b.description,
            b.image, b.rating, u.username AS owner_username,
            b.created_at AS book_created_at, c.created_at AS added_at
        FROM cart_items c
        JOIN books b ON b.id = c.book_id
        LEFT JOIN users u ON u.id = b.user_id
        WHERE c.user_id = $1
        ORDER BY c.created_at DESC
        "#,
    )
    .bind(user_id)
    .fetch_all(pool)
    .await
}
