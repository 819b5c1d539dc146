// HTTP server assembly

use std::sync::Arc;

use actix_web::{App, HttpServer, dev::Server, middleware::{Compress, Logger, from_fn}, web};

use crate::api;
use crate::middleware::track_requests;
use crate::model::common::AppState;

/// Build and bind the REST server; the returned future runs until shutdown
pub fn main_server(
    app_state: Arc<AppState>,
    address: String,
    port: u16,
) -> Result<Server, std::io::Error> {
    Ok(HttpServer::new(move || {
        App::new()
            .wrap(from_fn(track_requests))
            .wrap(Logger::default())
            .wrap(Compress::default())
            .app_data(web::Data::from(app_state.clone()))
            .app_data(api::json_config())
            .app_data(api::query_config())
            .service(api::routes())
            .service(api::health::metrics_endpoint)
    })
    .bind((address, port))?
    .run())
}
