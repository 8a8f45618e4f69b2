//! Bearer token extraction.

use hyper::header::AUTHORIZATION;
use hyper::Request;
use outlay_store::Token;

use crate::error::{ServerError, ServerResult};

/// Extracts and validates the bearer token from a request.
///
/// The `Authorization` header must be exactly `Bearer <token>`, one
/// space, no more parts, and the token itself must pass the storage
/// allow-list. Anything else is an authentication failure; requests
/// never reach the store, or the filesystem, without a valid token.
pub fn bearer_token<B>(req: &Request<B>) -> ServerResult<Token> {
    let header = req
        .headers()
        .get(AUTHORIZATION)
        .ok_or_else(|| ServerError::auth("missing Authorization header"))?;
    let value = header
        .to_str()
        .map_err(|_| ServerError::auth("Authorization header is not valid UTF-8"))?;

    let mut parts = value.split(' ');
    match (parts.next(), parts.next(), parts.next()) {
        (Some("Bearer"), Some(raw), None) => {
            Token::parse(raw).map_err(|err| ServerError::auth(err.to_string()))
        }
        _ => Err(ServerError::auth(
            "Authorization header must be 'Bearer <token>'",
        )),
    }
}
