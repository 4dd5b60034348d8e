use actix_web::{web, HttpResponse};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::domain::order::{OrderStatus, OrderView};
use crate::errors::AppError;
use crate::handlers::identity::AuthenticatedUser;
use crate::AppState;

// ── Request / response DTOs ──────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct CreateOrderRequest {
    /// Cart rows to check out. Omit to check out the whole cart.
    #[serde(default)]
    pub cart_ids: Option<Vec<i64>>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CreateOrderResponse {
    pub order_id: i64,
    /// Decimal string with two places, e.g. "18.00"
    pub total_amount: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct OrderLineResponse {
    pub id: i64,
    pub product_id: i64,
    pub quantity: i32,
    pub price_at_purchase: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct OrderResponse {
    pub id: i64,
    pub user_id: i64,
    pub status: OrderStatus,
    pub total_amount: String,
    pub created_at: String,
    pub lines: Vec<OrderLineResponse>,
}

impl From<OrderView> for OrderResponse {
    fn from(o: OrderView) -> Self {
        Self {
            id: o.id,
            user_id: o.user_id,
            status: o.status,
            total_amount: o.total_amount.to_string(),
            created_at: o.created_at.to_rfc3339(),
            lines: o
                .lines
                .into_iter()
                .map(|l| OrderLineResponse {
                    id: l.id,
                    product_id: l.product_id,
                    quantity: l.quantity,
                    price_at_purchase: l.price_at_purchase.to_string(),
                })
                .collect(),
        }
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateStatusRequest {
    pub status: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct UpdateStatusResponse {
    pub order_id: i64,
    pub status: OrderStatus,
}

// ── Pagination ───────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ListOrdersParams {
    /// Page number (1-based). Defaults to 1.
    #[serde(default = "default_page")]
    pub page: i64,
    /// Number of items per page. Defaults to 20, maximum 100.
    #[serde(default = "default_limit")]
    pub limit: i64,
}

fn default_page() -> i64 {
    1
}

fn default_limit() -> i64 {
    20
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ListOrdersResponse {
    pub items: Vec<OrderResponse>,
    pub total: i64,
    pub page: i64,
    pub limit: i64,
}

// ── Handlers ─────────────────────────────────────────────────────────────────

/// POST /orders
///
/// Checks out the caller's cart. Stock is verified and decremented, the order
/// and its items are written and the consumed cart rows removed, all in one
/// transaction. Sellers are notified after the commit.
#[utoipa::path(
    post,
    path = "/orders",
    request_body = CreateOrderRequest,
    responses(
        (status = 201, description = "Order created", body = CreateOrderResponse),
        (status = 400, description = "Empty cart, unknown cart rows or insufficient stock"),
        (status = 401, description = "Missing X-User-Id"),
        (status = 500, description = "Internal server error"),
    ),
    tag = "orders"
)]
pub async fn create_order(
    state: web::Data<AppState>,
    user: AuthenticatedUser,
    body: Option<web::Json<CreateOrderRequest>>,
) -> Result<HttpResponse, AppError> {
    let cart_ids = body.and_then(|b| b.into_inner().cart_ids);

    let placed = web::block(move || state.orders.create_order(user.0, cart_ids)).await??;

    Ok(HttpResponse::Created().json(CreateOrderResponse {
        order_id: placed.order_id,
        total_amount: placed.total_amount.to_string(),
    }))
}

/// GET /orders/{id}
///
/// Returns one of the caller's orders with its items.
#[utoipa::path(
    get,
    path = "/orders/{id}",
    params(
        ("id" = i64, Path, description = "Order id"),
    ),
    responses(
        (status = 200, description = "Order found", body = OrderResponse),
        (status = 404, description = "Order not found"),
        (status = 500, description = "Internal server error"),
    ),
    tag = "orders"
)]
pub async fn get_order(
    state: web::Data<AppState>,
    user: AuthenticatedUser,
    path: web::Path<i64>,
) -> Result<HttpResponse, AppError> {
    let order_id = path.into_inner();

    let order = web::block(move || state.orders.get_order(user.0, order_id)).await??;

    Ok(HttpResponse::Ok().json(OrderResponse::from(order)))
}

/// GET /orders
///
/// The caller's orders, newest first.
#[utoipa::path(
    get,
    path = "/orders",
    params(ListOrdersParams),
    responses(
        (status = 200, description = "Paginated list of orders", body = ListOrdersResponse),
        (status = 500, description = "Internal server error"),
    ),
    tag = "orders"
)]
pub async fn list_orders(
    state: web::Data<AppState>,
    user: AuthenticatedUser,
    query: web::Query<ListOrdersParams>,
) -> Result<HttpResponse, AppError> {
    let params = query.into_inner();
    let page = params.page.max(1);
    let limit = params.limit.clamp(1, crate::application::order_service::MAX_PAGE_SIZE);

    let result = web::block(move || state.orders.list_orders(user.0, page, limit)).await??;

    Ok(HttpResponse::Ok().json(ListOrdersResponse {
        items: result.items.into_iter().map(OrderResponse::from).collect(),
        total: result.total,
        page,
        limit,
    }))
}

/// PUT /orders/{id}/status
///
/// Seller-side status change. The caller must own the shop of at least one
/// item in the order.
#[utoipa::path(
    put,
    path = "/orders/{id}/status",
    params(
        ("id" = i64, Path, description = "Order id"),
    ),
    request_body = UpdateStatusRequest,
    responses(
        (status = 200, description = "Status changed", body = UpdateStatusResponse),
        (status = 400, description = "Unknown status"),
        (status = 403, description = "Caller sells nothing in this order"),
        (status = 404, description = "Order not found"),
        (status = 409, description = "Transition not allowed"),
    ),
    tag = "orders"
)]
pub async fn update_status(
    state: web::Data<AppState>,
    user: AuthenticatedUser,
    path: web::Path<i64>,
    body: web::Json<UpdateStatusRequest>,
) -> Result<HttpResponse, AppError> {
    let order_id = path.into_inner();
    let status: OrderStatus = body.status.parse()?;

    let change = web::block(move || state.orders.set_status(user.0, order_id, status)).await??;

    Ok(HttpResponse::Ok().json(UpdateStatusResponse {
        order_id: change.order_id,
        status: change.to,
    }))
}
