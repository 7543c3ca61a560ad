use actix_web::{App, HttpServer, middleware::Logger, web};
use chrono::Local; // timestamp in log lines
use env_logger::{Env, Target};
use std::io::Write; // for env_logger custom formatter

use otoko_press::{
    config::Config,
    database::{create_pool, run_migrations},
    external::{create_payment_gateway, create_storage},
    handlers,
    middlewares::{AuthMiddleware, create_cors},
    services::AppServices,
    swagger::swagger_config,
    utils::JwtService,
};

#[actix_web::main]
async fn main() -> std::io::Result<()> {
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

    let config = Config::from_toml().expect("Failed to load configuration file");

    let pool = create_pool(&config.database)
        .await
        .expect("Failed to create database connection pool");

    run_migrations(&pool)
        .await
        .expect("Failed to run database migrations");

    let jwt_service = JwtService::new(
        &config.jwt.secret,
        config.jwt.access_token_expires_in,
        config.jwt.refresh_token_expires_in,
    );

    // External collaborators; a missing gateway disables checkout and the webhook.
    let gateway = create_payment_gateway(&config.stripe);
    let storage = create_storage(&config.storage).await;
    std::fs::create_dir_all(&config.storage.local_dir)?;

    let services = AppServices::new(pool, &config, jwt_service.clone(), gateway, storage);
    let uploads_path = config.storage.public_path.clone();
    let uploads_dir = config.storage.local_dir.clone();

    log::info!(
        "Starting HTTP server at {}:{}",
        config.server.host,
        config.server.port
    );

    HttpServer::new(move || {
        App::new()
            .wrap(Logger::default())
            .wrap(create_cors())
            .wrap(AuthMiddleware::new(jwt_service.clone()))
            .app_data(handlers::json_config())
            .app_data(handlers::query_config())
            .app_data(web::Data::new(services.auth.clone()))
            .app_data(web::Data::new(services.ownership.clone()))
            .app_data(web::Data::new(services.checkout.clone()))
            .app_data(web::Data::new(services.purchases.clone()))
            .app_data(web::Data::new(services.search.clone()))
            .app_data(web::Data::new(services.admin_posts.clone()))
            .app_data(web::Data::new(services.media.clone()))
            .app_data(web::Data::new(services.settings.clone()))
            .app_data(web::Data::new(services.comments.clone()))
            .app_data(web::Data::new(services.content.clone()))
            .configure(swagger_config)
            .configure(handlers::webhook_config)
            .service(actix_files::Files::new(&uploads_path, &uploads_dir))
            .service(
                web::scope("/api/v1")
                    .configure(handlers::auth_config)
                    .configure(handlers::search_config)
                    .configure(handlers::content_config)
                    .configure(handlers::checkout_config)
                    .configure(handlers::comments_config)
                    .configure(handlers::admin_config),
            )
    })
    .bind((config.server.host.as_str(), config.server.port))?
    .run()
    .await
}
