// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-photoacoustic project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

use std::path::PathBuf;

use rocket::fairing::{Fairing, Info, Kind};
use rocket::figment::Figment;
use rocket::http::{Header, Status};
use rocket::serde::json::Json;
use rocket::{catch, catchers, options, routes, Build, Request, Response, Rocket};

use super::auth::AuthKey;
use super::handlers::{self, api_error, ApiError, ErrorResponse};
use super::ConfigStore;
use crate::occupancy::OccupancyMonitor;
use crate::serializer::Serializer;

pub struct CORS;

#[rocket::async_trait]
impl Fairing for CORS {
    fn info(&self) -> Info {
        Info {
            name: "Add CORS headers to responses",
            kind: Kind::Response,
        }
    }

    async fn on_response<'r>(&self, _request: &'r Request<'_>, response: &mut Response<'r>) {
        response.set_header(Header::new("Access-Control-Allow-Origin", "*"));
        response.set_header(Header::new(
            "Access-Control-Allow-Methods",
            "POST, GET, OPTIONS",
        ));
        response.set_header(Header::new(
            "Access-Control-Allow-Headers",
            "Authorization, Content-Type",
        ));
        response.set_header(Header::new("Access-Control-Allow-Credentials", "true"));
    }
}

/// # Answers to OPTIONS requests
///
/// Browsers send preflight requests without credentials, so this route has
/// no key guard.
#[options("/<_path..>")]
async fn options(_path: PathBuf) -> Result<(), std::io::Error> {
    Ok(())
}

#[catch(401)]
fn unauthorized() -> Json<ErrorResponse> {
    Json(ErrorResponse {
        error: "Unauthorized".to_string(),
    })
}

#[catch(default)]
fn default_catcher(status: Status, _request: &Request<'_>) -> ApiError {
    api_error(status, status.reason().unwrap_or("Unknown error"))
}

/// Everything the routes need, handed over as managed state
pub struct ApiState {
    pub queue: Serializer,
    pub store: ConfigStore,
    pub monitor: Option<OccupancyMonitor>,
    pub auth_key: String,
}

/// Build the Rocket instance serving the gateway API
pub fn build_rocket(figment: Figment, state: ApiState) -> Rocket<Build> {
    rocket::custom(figment)
        .attach(CORS)
        .mount(
            "/",
            routes![
                options,
                handlers::read_status,
                handlers::set_register,
                handlers::info,
                handlers::set_unoccupied,
            ],
        )
        .register("/", catchers![unauthorized, default_catcher])
        .manage(AuthKey(state.auth_key))
        .manage(state.queue)
        .manage(state.store)
        .manage(state.monitor)
}
