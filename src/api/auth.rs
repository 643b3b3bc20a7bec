// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-photoacoustic project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Pre-shared key authentication
//!
//! Every route except CORS preflight takes an [`Authorized`] guard. The guard
//! compares the bearer token of the request with the key held in managed
//! state and fails with 401 otherwise, which the server turns into
//! `{"error": "Unauthorized"}`.

use rocket::http::Status;
use rocket::request::{self, FromRequest, Request};

/// The key clients must present, managed by Rocket
pub struct AuthKey(pub String);

/// Proof that the request carried the expected key
#[derive(Debug)]
pub struct Authorized;

/// Error type for authentication failures
#[derive(Debug)]
pub enum AuthError {
    /// No authorization header was provided
    Missing,
    /// The header is not a bearer token or the key does not match
    Invalid,
    /// No [`AuthKey`] was registered with the server
    NotConfigured,
}

/// Extract the token of an `Authorization: Bearer <token>` header value
fn bearer_token(header: &str) -> Option<&str> {
    let token = header.strip_prefix("Bearer ")?.trim();
    (!token.is_empty()).then_some(token)
}

#[rocket::async_trait]
impl<'r> FromRequest<'r> for Authorized {
    type Error = AuthError;

    async fn from_request(request: &'r Request<'_>) -> request::Outcome<Self, Self::Error> {
        let Some(expected) = request.rocket().state::<AuthKey>() else {
            log::error!("No API key configured, rejecting request");
            return request::Outcome::Error((Status::InternalServerError, AuthError::NotConfigured));
        };

        let header = match request.headers().get_one("Authorization") {
            Some(header) => header,
            None => return request::Outcome::Error((Status::Unauthorized, AuthError::Missing)),
        };

        match bearer_token(header) {
            Some(token) if token == expected.0 => request::Outcome::Success(Authorized),
            _ => {
                log::debug!("Rejected request to {} with a wrong key", request.uri());
                request::Outcome::Error((Status::Unauthorized, AuthError::Invalid))
            }
        }
    }
}
