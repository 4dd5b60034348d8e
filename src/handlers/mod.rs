pub mod account;
pub mod cart;
pub mod identity;
pub mod orders;

use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    paths(
        orders::create_order,
        orders::list_orders,
        orders::get_order,
        orders::update_status,
        cart::list_cart,
        cart::add_to_cart,
        cart::update_cart_item,
        cart::remove_cart_item,
        account::telegram_link,
    ),
    components(schemas(
        orders::CreateOrderRequest,
        orders::CreateOrderResponse,
        orders::OrderLineResponse,
        orders::OrderResponse,
        orders::ListOrdersResponse,
        orders::UpdateStatusRequest,
        orders::UpdateStatusResponse,
        cart::AddToCartRequest,
        cart::UpdateCartRequest,
        cart::CartLineResponse,
        account::TelegramLinkResponse,
        crate::domain::order::OrderStatus,
    )),
    tags(
        (name = "orders", description = "Checkout and order history"),
        (name = "cart", description = "Shopping cart"),
        (name = "account", description = "Seller chat linking"),
    )
)]
pub struct ApiDoc;
