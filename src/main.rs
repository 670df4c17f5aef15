use actix_web::{App, HttpServer, middleware::Logger, web};
use anyhow::Context;
use chrono::Local; // timestamp in log lines
use env_logger::{Env, Target};
use std::io::Write; // for env_logger custom formatter
use std::sync::Arc;

use giftboard_backend::{
    config::Config,
    database::{create_pool, run_migrations},
    external::{AssetFolders, AssetStore, CloudinaryAssetStore, HttpMailer, Mailer},
    handlers,
    middlewares::{AuthMiddleware, create_cors},
    services::*,
    store::{DbAccountStore, DbEventStore, SharedAccountStore, SharedEventStore},
    swagger::swagger_config,
    utils::JwtService,
};

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info"))
        .format(|buf, record| {
            let ts = Local::now().format("%Y-%m-%dT%H:%M:%S%.3f%:z");
            let level = record.level().as_str().to_ascii_lowercase();
            let msg_json = serde_json::to_string(&format!("{}", record.args()))
                .unwrap_or_else(|_| "\"<invalid utf8>\"".to_string());
            writeln!(
                buf,
                "{{\"timestamp\":\"{}\",\"level\":\"{}\",\"message\":{},\"target\":\"{}\"}}",
                ts,
                level,
                msg_json,
                record.target(),
            )
        })
        .target(Target::Stdout)
        .init();

    // Configuration
    let config = Config::from_toml()
        .map_err(|e| anyhow::anyhow!("{e}"))
        .context("Failed to load configuration")?;

    let pool = create_pool(&config.database)
        .await
        .context("Failed to connect to the database")?;
    run_migrations(&pool)
        .await
        .context("Failed to run database migrations")?;

    let jwt_service = JwtService::new(
        &config.jwt.secret,
        config.jwt.access_token_expires_in,
        config.jwt.refresh_token_expires_in,
    );

    // Stores and external services
    let events: SharedEventStore = Arc::new(DbEventStore::new(pool.clone()));
    let accounts: SharedAccountStore = Arc::new(DbAccountStore::new(pool.clone()));
    let mailer: Arc<dyn Mailer> = Arc::new(HttpMailer::new(config.mailer.clone()));
    let assets: Arc<dyn AssetStore> = Arc::new(CloudinaryAssetStore::new(config.assets.clone()));
    let folders = AssetFolders::new(&config.assets.root_folder);

    let auth_service = AuthService::new(accounts.clone(), events.clone(), jwt_service.clone());
    let event_service = EventService::new(
        events.clone(),
        accounts.clone(),
        mailer,
        assets.clone(),
        folders.clone(),
        config.mailer.app_url.clone(),
    );
    let draw_service = DrawService::new(events.clone(), accounts.clone());
    let gift_service = GiftService::new(events.clone(), assets, folders);

    log::info!(
        "Starting HTTP server at {}:{}",
        config.server.host,
        config.server.port
    );

    HttpServer::new(move || {
        App::new()
            .wrap(Logger::default())
            .wrap(AuthMiddleware::new(jwt_service.clone()))
            .wrap(create_cors())
            .app_data(web::Data::new(auth_service.clone()))
            .app_data(web::Data::new(event_service.clone()))
            .app_data(web::Data::new(draw_service.clone()))
            .app_data(web::Data::new(gift_service.clone()))
            .configure(swagger_config)
            .service(
                web::scope("/api/v1")
                    .configure(handlers::auth_config)
                    .configure(handlers::account_config)
                    .configure(handlers::event_config),
            )
    })
    .bind((config.server.host.as_str(), config.server.port))?
    .run()
    .await?;

    Ok(())
}
