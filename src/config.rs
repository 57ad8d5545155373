use anyhow::{Context, Result};
use std::env;
use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub host: String,
    pub port: u16,
    pub uploads_dir: PathBuf,
    pub public_dir: PathBuf,
    pub session_ttl_hours: i64,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let database_url = env::var("DATABASE_URL").context("DATABASE_URL must be set")?;
        let host = env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port: u16 = env::var("PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse()
            .context("Invalid PORT")?;
        let uploads_dir = env::var("UPLOADS_DIR").unwrap_or_else(|_| "uploads".to_string());
        let public_dir = env::var("PUBLIC_DIR").unwrap_or_else(|_| "public".to_string());
        let session_ttl_hours: i64 = env::var("SESSION_TTL_HOURS")
            .unwrap_or_else(|_| "24".to_string())
            .parse()
            .context("Invalid SESSION_TTL_HOURS")?;

        Ok(Self {
            database_url,
            host,
            port,
            uploads_dir: uploads_dir.into(),
            public_dir: public_dir.into(),
            session_ttl_hours,
        })
    }
}

/// Settings the request handlers need at runtime, shared through `web::Data`.
#[derive(Debug, Clone)]
pub struct Settings {
    pub uploads_dir: PathBuf,
    pub session_ttl_hours: i64,
}

impl From<&AppConfig> for Settings {
    fn from(config: &AppConfig) -> Self {
        Self {
            uploads_dir: config.uploads_dir.clone(),
            session_ttl_hours: config.session_ttl_hours,
        }
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            uploads_dir: PathBuf::from("uploads"),
            session_ttl_hours: 24,
        }
    }
}
