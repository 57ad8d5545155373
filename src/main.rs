use actix_cors::Cors;
use actix_files::Files;
use actix_web::{middleware::Logger, web, App, HttpServer};
use anyhow::Context;
use log::info;

use book_circle::config::{AppConfig, Settings};
use book_circle::databases::setup_backend;

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = AppConfig::from_env()?;
    let pool = setup_backend(&config).await?;

    std::fs::create_dir_all(&config.uploads_dir)
        .with_context(|| format!("Failed to create uploads dir {:?}", config.uploads_dir))?;

    let settings = Settings::from(&config);
    let uploads_dir = config.uploads_dir.clone();
    let public_dir = config.public_dir.clone();

    info!("🚀 Server running on http://{}:{}", config.host, config.port);

    HttpServer::new(move || {
        App::new()
            .wrap(Logger::default())
            .wrap(Cors::permissive())
            .app_data(web::Data::new(pool.clone()))
            .app_data(web::Data::new(settings.clone()))
            .configure(book_circle::configure)
            .service(Files::new("/uploads", uploads_dir.clone()))
            .service(Files::new("/", public_dir.clone()).index_file("index.html"))
    })
    .bind((config.host.as_str(), config.port))?
    .run()
    .await?;

    Ok(())
}
