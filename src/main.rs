use actix::Actor;
use actix_web::{web, App, HttpServer};
use clap::Parser;
use log::info;

use chess_sync::channel::PubSubHub;
use chess_sync::config::ServerConfig;
use chess_sync::models::AppState;
use chess_sync::routes::configure_routes;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // Initialize logger
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    let config = ServerConfig::parse();
    info!("Starting chess sync server at http://{}", config.bind);

    // The hub is shared by every game on this server
    let hub = PubSubHub::new(config.presence_timeout()).start();

    // Create shared application state
    let app_state = web::Data::new(AppState::new(
        hub,
        config.game_settings(),
        config.heartbeat_interval(),
    ));

    // Start HTTP server
    HttpServer::new(move || {
        App::new()
            .app_data(app_state.clone())
            .configure(configure_routes)
    })
    .bind(&config.bind)?
    .run()
    .await
}
