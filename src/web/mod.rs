mod handlers;
mod state;

use std::sync::Arc;

use actix_cors::Cors;
use actix_web::{web, App, HttpServer};
use tracing::info;
use tracing_actix_web::TracingLogger;

use crate::backend::DataBackend;
use crate::config::Config;

pub use state::AppState;

pub async fn start_server(config: Config, backend: Arc<dyn DataBackend>) -> std::io::Result<()> {
    let bind = (config.host.clone(), config.port);
    let state = AppState::new(config, backend).map_err(std::io::Error::other)?;
    let data = web::Data::new(state);

    info!(host = %bind.0, port = bind.1, "starting eco-benefits server");

    HttpServer::new(move || {
        App::new()
            .app_data(data.clone())
            .wrap(TracingLogger::default())
            .wrap(Cors::permissive())
            .route("/eco.json", web::get().to(handlers::eco_json))
            .route("/eco_summary.json", web::post().to(handlers::eco_summary))
            .route("/eco_full.json", web::post().to(handlers::eco_full))
            .route("/eco_scenario.json", web::post().to(handlers::eco_scenario))
            .route("/itree_codes.json", web::get().to(handlers::itree_codes))
            .route(
                "/invalidate_cache",
                web::post().to(handlers::invalidate_cache),
            )
    })
    .bind(bind)?
    .run()
    .await
}
