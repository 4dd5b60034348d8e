use actix_web::dev::Payload;
use actix_web::{FromRequest, HttpRequest};
use futures::future::{ready, Ready};

use crate::errors::AppError;

/// Set by the authenticating proxy in front of this service.
pub const USER_ID_HEADER: &str = "X-User-Id";

/// The caller's user id, taken from [`USER_ID_HEADER`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthenticatedUser(pub i64);

impl AuthenticatedUser {
    fn from_request_headers(req: &HttpRequest) -> Result<Self, AppError> {
        let raw = req
            .headers()
            .get(USER_ID_HEADER)
            .ok_or_else(|| {
                AppError::Unauthorized(format!("{} header is required", USER_ID_HEADER))
            })?;
        raw.to_str()
            .ok()
            .and_then(|v| v.trim().parse::<i64>().ok())
            .filter(|id| *id > 0)
            .map(AuthenticatedUser)
            .ok_or_else(|| {
                AppError::Unauthorized(format!(
                    "{} header is not a valid user id",
                    USER_ID_HEADER
                ))
            })
    }
}

impl FromRequest for AuthenticatedUser {
    type Error = AppError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        ready(Self::from_request_headers(req))
    }
}
