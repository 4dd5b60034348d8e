use actix_web::{web, HttpResponse};
use serde::Serialize;
use utoipa::ToSchema;

use crate::errors::AppError;
use crate::handlers::identity::AuthenticatedUser;
use crate::AppState;

#[derive(Debug, Serialize, ToSchema)]
pub struct TelegramLinkResponse {
    /// Opens the seller bot and redeems the one-time token.
    pub link: String,
}

/// GET /account/telegram-link
///
/// Issues a fresh link token. Any earlier unredeemed token stops working.
#[utoipa::path(
    get,
    path = "/account/telegram-link",
    responses(
        (status = 200, description = "Deep link into the seller bot", body = TelegramLinkResponse),
        (status = 401, description = "Missing X-User-Id"),
        (status = 404, description = "Unknown user"),
    ),
    tag = "account"
)]
pub async fn telegram_link(
    state: web::Data<AppState>,
    user: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
    let invite = web::block(move || state.accounts.issue_link_token(user.0)).await??;
    Ok(HttpResponse::Ok().json(TelegramLinkResponse {
        link: invite.deep_link,
    }))
}
