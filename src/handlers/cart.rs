use actix_web::{web, HttpResponse};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::domain::cart::CartLine;
use crate::errors::AppError;
use crate::handlers::identity::AuthenticatedUser;
use crate::AppState;

#[derive(Debug, Deserialize, ToSchema)]
pub struct AddToCartRequest {
    pub product_id: i64,
    #[serde(default = "default_quantity")]
    pub quantity: i32,
}

fn default_quantity() -> i32 {
    1
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateCartRequest {
    pub quantity: i32,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CartLineResponse {
    pub id: i64,
    pub product_id: i64,
    pub title: String,
    pub unit_price: String,
    pub discount: Option<i32>,
    pub quantity: i32,
    /// Unit price times quantity, before any discount.
    pub line_total: String,
}

impl From<CartLine> for CartLineResponse {
    fn from(line: CartLine) -> Self {
        Self {
            line_total: line.line_total().to_string(),
            id: line.id,
            product_id: line.product_id,
            unit_price: line.unit_price.to_string(),
            discount: line.discount,
            quantity: line.quantity,
            title: line.title,
        }
    }
}

#[utoipa::path(
    get,
    path = "/cart",
    responses(
        (status = 200, description = "Caller's cart", body = [CartLineResponse]),
    ),
    tag = "cart"
)]
pub async fn list_cart(
    state: web::Data<AppState>,
    user: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
    let lines = web::block(move || state.carts.list_items(user.0)).await??;
    let body: Vec<CartLineResponse> = lines.into_iter().map(CartLineResponse::from).collect();
    Ok(HttpResponse::Ok().json(body))
}

/// POST /cart
///
/// Adds a product, or bumps the quantity if it is already in the cart.
#[utoipa::path(
    post,
    path = "/cart",
    request_body = AddToCartRequest,
    responses(
        (status = 201, description = "Cart line", body = CartLineResponse),
        (status = 400, description = "Bad quantity or not enough stock"),
        (status = 404, description = "Product not found"),
    ),
    tag = "cart"
)]
pub async fn add_to_cart(
    state: web::Data<AppState>,
    user: AuthenticatedUser,
    body: web::Json<AddToCartRequest>,
) -> Result<HttpResponse, AppError> {
    let AddToCartRequest {
        product_id,
        quantity,
    } = body.into_inner();
    let line = web::block(move || state.carts.add_item(user.0, product_id, quantity)).await??;
    Ok(HttpResponse::Created().json(CartLineResponse::from(line)))
}

#[utoipa::path(
    put,
    path = "/cart/{id}",
    params(("id" = i64, Path, description = "Cart row id")),
    request_body = UpdateCartRequest,
    responses(
        (status = 200, description = "Cart line", body = CartLineResponse),
        (status = 400, description = "Bad quantity or not enough stock"),
        (status = 404, description = "Cart row not found"),
    ),
    tag = "cart"
)]
pub async fn update_cart_item(
    state: web::Data<AppState>,
    user: AuthenticatedUser,
    path: web::Path<i64>,
    body: web::Json<UpdateCartRequest>,
) -> Result<HttpResponse, AppError> {
    let cart_id = path.into_inner();
    let quantity = body.quantity;
    let line = web::block(move || state.carts.set_quantity(user.0, cart_id, quantity)).await??;
    Ok(HttpResponse::Ok().json(CartLineResponse::from(line)))
}

#[utoipa::path(
    delete,
    path = "/cart/{id}",
    params(("id" = i64, Path, description = "Cart row id")),
    responses(
        (status = 204, description = "Removed"),
        (status = 404, description = "Cart row not found"),
    ),
    tag = "cart"
)]
pub async fn remove_cart_item(
    state: web::Data<AppState>,
    user: AuthenticatedUser,
    path: web::Path<i64>,
) -> Result<HttpResponse, AppError> {
    let cart_id = path.into_inner();
    web::block(move || state.carts.remove_item(user.0, cart_id)).await??;
    Ok(HttpResponse::NoContent().finish())
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use bigdecimal::BigDecimal;

    use super::*;

    #[test]
    fn line_total_is_undiscounted_and_scaled() {
        let line = CartLine {
            id: 1,
            product_id: 2,
            title: "Mug".to_string(),
            unit_price: BigDecimal::from_str("10.00").expect("decimal"),
            discount: Some(10),
            quantity: 3,
        };
        let resp = CartLineResponse::from(line);
        assert_eq!(resp.line_total, "30.00");
        assert_eq!(resp.discount, Some(10));
    }
}
