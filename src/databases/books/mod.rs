use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

const BOOK_COLUMNS: &str = r#"
    b.id, b.title, b.author, b.price, b.location, b.description, b.image, b.rating,
    b.user_id, u.username AS owner_username, b.created_at, b.updated_at
"#;

#[derive(Debug, Clone, FromRow)]
pub struct BookRow {
    pub id: Uuid,
    pub title: Option<String>,
    pub author: Option<String>,
    pub price: Option<f64>,
    pub location: Option<String>,
    pub description: Option<String>,
    pub image: Option<String>,
    pub rating: Option<i16>,
    pub user_id: Option<Uuid>,
    pub owner_username: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct BookOwner {
    pub id: Uuid,
    pub username: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BookListing {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub title: Option<String>,
    pub author: Option<String>,
    pub price: Option<f64>,
    pub location: Option<String>,
    pub description: Option<String>,
    pub image: Option<String>,
    pub rating: Option<i16>,
    pub user: Option<BookOwner>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

pub fn image_url(file_name: &str) -> String {
    format!("/uploads/{}", file_name)
}

impl From<BookRow> for BookListing {
    fn from(row: BookRow) -> Self {
        let user = match (row.user_id, row.owner_username) {
            (Some(id), Some(username)) => Some(BookOwner { id, username }),
            _ => None,
        };

        BookListing {
            id: row.id,
            title: row.title,
            author: row.author,
            price: row.price,
            location: row.location,
            description: row.description,
            image: row.image.as_deref().map(image_url),
            rating: row.rating,
            user,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// Text fields of a listing as submitted by the seller. `None` means "not provided".
#[derive(Debug, Default, Clone, PartialEq)]
pub struct BookFields {
    pub title: Option<String>,
    pub author: Option<String>,
    pub price: Option<f64>,
    pub location: Option<String>,
    pub description: Option<String>,
    pub rating: Option<i16>,
}

pub async fn insert_book(
    pool: &PgPool,
    owner: Uuid,
    fields: &BookFields,
    image: Option<&str>,
) -> Result<Uuid, sqlx::Error> {
    sqlx::query_scalar::<_, Uuid>(
        r#"
        INSERT INTO books (id, title, author, price, location, description, image, rating, user_id)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
        RETURNING id
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(&fields.title)
    .bind(&fields.author)
    .bind(fields.price)
    .bind(&fields.location)
    .bind(&fields.description)
    .bind(image)
    .bind(fields.rating)
    .bind(owner)
    .fetch_one(pool)
    .await
}

pub async fn find_book(pool: &PgPool, id: Uuid) -> Result<Option<BookRow>, sqlx::Error> {
    let sql = format!(
        "SELECT {} FROM books b LEFT JOIN users u ON u.id = b.user_id WHERE b.id = $1",
        BOOK_COLUMNS
    );
    sqlx::query_as::<_, BookRow>(&sql).bind(id).fetch_optional(pool).await
}

/// All listings newest first, optionally restricted to one owner.
pub async fn list_books(pool: &PgPool, owner: Option<Uuid>) -> Result<Vec<BookRow>, sqlx::Error> {
    let sql = format!(
        "SELECT {} FROM books b LEFT JOIN users u ON u.id = b.user_id
         WHERE ($1::uuid IS NULL OR b.user_id = $1)
         ORDER BY b.created_at DESC",
        BOOK_COLUMNS
    );
    sqlx::query_as::<_, BookRow>(&sql).bind(owner).fetch_all(pool).await
}

/// Applies the provided fields. Rating is not editable after posting.
pub async fn update_book(
    pool: &PgPool,
    id: Uuid,
    fields: &BookFields,
    image: Option<&str>,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        UPDATE books SET
            title = COALESCE($2, title),
            author = COALESCE($3, author),
            price = COALESCE($4, price),
            location = COALESCE($5, location),
            description = COALESCE($6, description),
            image = COALESCE($7, image),
            updated_at = clock_timestamp()
        WHERE id = $1
        "#,
    )
    .bind(id)
    .bind(&fields.title)
    .bind(&fields.author)
    .bind(fields.price)
    .bind(&fields.location)
    .bind(&fields.description)
    .bind(image)
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn delete_book(pool: &PgPool, id: Uuid) -> Result<(), sqlx::Error> {
    sqlx::query("DELETE FROM books WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(())
}

/// Escapes `%`, `_` and `\` so user text is matched literally by LIKE.
pub fn escape_like(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

pub async fn books_under_price(pool: &PgPool, max_price: f64, limit: i64) -> Result<Vec<BookRow>, sqlx::Error> {
    let sql = format!(
        "SELECT {} FROM books b LEFT JOIN users u ON u.id = b.user_id
         WHERE b.price <= $1
         ORDER BY b.created_at DESC
         LIMIT $2",
        BOOK_COLUMNS
    );
    sqlx::query_as::<_, BookRow>(&sql)
        .bind(max_price)
        .bind(limit)
        .fetch_all(pool)
        .await
}

pub async fn books_in_location(pool: &PgPool, location: &str, limit: i64) -> Result<Vec<BookRow>, sqlx::Error> {
    let sql = format!(
        "SELECT {} FROM books b LEFT JOIN users u ON u.id = b.user_id
         WHERE b.location ILIKE $1
         ORDER BY b.created_at DESC
         LIMIT $2",
        BOOK_COLUMNS
    );
    sqlx::query_as::<_, BookRow>(&sql)
        .bind(format!("%{}%", escape_like(location)))
        .bind(limit)
        .fetch_all(pool)
        .await
}

pub async fn books_matching_keywords(
    pool: &PgPool,
    keywords: &[String],
    limit: i64,
) -> Result<Vec<BookRow>, sqlx::Error> {
    let patterns: Vec<String> = keywords
        .iter()
        .map(|k| format!("%{}%", escape_like(k)))
        .collect();

    let sql = format!(
        "SELECT {} FROM books b LEFT JOIN users u ON u.id = b.user_id
         WHERE b.title ILIKE ANY($1) OR b.author ILIKE ANY($1)
         ORDER BY b.created_at DESC
         LIMIT $2",
        BOOK_COLUMNS
    );
    sqlx::query_as::<_, BookRow>(&sql)
        .bind(&patterns)
        .bind(limit)
        .fetch_all(pool)
        .await
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(owner: Option<(Uuid, &str)>, image: Option<&str>) -> BookRow {
        BookRow {
            id: Uuid::new_v4(),
            title: Some("Dune".to_string()),
            author: Some("Frank Herbert".to_string()),
            price: Some(250.0),
            location: Some("Pune".to_string()),
            description: None,
            image: image.map(str::to_string),
            rating: Some(4),
            user_id: owner.map(|(id, _)| id),
            owner_username: owner.map(|(_, name)| name.to_string()),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn listing_prefixes_image_with_uploads_path() {
        let listing = BookListing::from(row(None, Some("abc.jpg")));
        assert_eq!(listing.image.as_deref(), Some("/uploads/abc.jpg"));
        assert!(listing.user.is_none());
    }

    #[test]
    fn listing_includes_owner_when_known() {
        let owner = Uuid::new_v4();
        let listing = BookListing::from(row(Some((owner, "asha")), None));
        let user = listing.user.unwrap();
        assert_eq!(user.id, owner);
        assert_eq!(user.username, "asha");
        assert!(listing.image.is_none());
    }

    #[test]
    fn listing_id_goes_out_as_underscore_id() {
        let owner = Uuid::new_v4();
        let book = row(Some((owner, "asha")), Some("abc.jpg"));
        let id = book.id;
        let value = serde_json::to_value(BookListing::from(book)).unwrap();

        assert_eq!(value["_id"], id.to_string());
        assert!(value.get("id").is_none());
        assert_eq!(value["user"]["id"], owner.to_string());
        assert_eq!(value["image"], "/uploads/abc.jpg");
        assert!(value["createdAt"].is_string());
        assert!(value["updatedAt"].is_string());
    }

    #[test]
    fn escape_like_neutralises_wildcards() {
        assert_eq!(escape_like("50%_off\\"), "50\\%\\_off\\\\");
        assert_eq!(escape_like("mumbai"), "mumbai");
    }
}
