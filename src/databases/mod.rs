use anyhow::{Context, Result};
use log::info;
use sqlx::{Executor, PgPool};
use std::{fs, path::Path};

use crate::config::AppConfig;

pub mod auth;
pub mod books;
pub mod cart;
pub mod messages;

const SCHEMA_DIRS: [&str; 4] = [
    "databases/auth",
    "databases/books",
    "databases/cart",
    "databases/messages",
];

const REQUIRED_TABLES: [&str; 5] = ["users", "sessions", "books", "cart_items", "messages"];

fn load_all_schemas(schema_dirs: &[&str]) -> Result<String> {
    let mut combined_sql = String::new();

    for dir in schema_dirs {
        let schema_path = Path::new(env!("CARGO_MANIFEST_DIR")).join(dir).join("schema.sql");
        let sql = fs::read_to_string(&schema_path)
            .with_context(|| format!("Failed to read schema file: {:?}", schema_path))?;
        combined_sql.push_str(&sql);
        combined_sql.push('\n');
    }

    Ok(combined_sql)
}

async fn check_tables_exist(pool: &PgPool, tables: &[&str]) -> Result<bool> {
    for &table in tables {
        let exists: (bool,) = sqlx::query_as(
            "SELECT EXISTS (
                SELECT 1 FROM information_schema.tables
                WHERE table_schema = 'public' AND table_name = $1
            )",
        )
        .bind(table)
        .fetch_one(pool)
        .await?;

        if !exists.0 {
            info!("Table '{}' does NOT exist.", table);
            return Ok(false);
        }
    }
    Ok(true)
}

pub async fn setup_backend(config: &AppConfig) -> Result<PgPool> {
    let pool = PgPool::connect(&config.database_url)
        .await
        .context("Failed to connect to database")?;
    info!("✅ Database connected");

    let tables_exist = check_tables_exist(&pool, &REQUIRED_TABLES).await?;

    if !tables_exist {
        info!("Some tables missing. Running schema SQL to create tables...");
        let combined_schema_sql = load_all_schemas(&SCHEMA_DIRS)?;
        pool.execute(combined_schema_sql.as_str())
            .await
            .context("Failed to execute schema SQL")?;
        info!("Schema SQL executed successfully.");
    } else {
        info!("All required tables exist.");
    }

    clear_expired_sessions(&pool).await?;
    Ok(pool)
}

async fn clear_expired_sessions(pool: &PgPool) -> Result<()> {
    let removed = sqlx::query("DELETE FROM sessions WHERE expires_at <= now()")
        .execute(pool)
        .await
        .context("Failed to clear expired sessions")?
        .rows_affected();

    info!("Expired sessions cleared: {}", removed);
    Ok(())
}
