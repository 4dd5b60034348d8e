use std::sync::Arc;

use async_trait::async_trait;

use super::account::{DeletedProduct, UserAccount};
use super::cart::{CartLine, CartSelection};
use super::errors::{DomainError, NotificationError};
use super::notification::{OrderNotice, OutboundMessage};
use super::order::{ListResult, OrderStatus, OrderView, PlacedOrder, StatusChange};

pub trait CartRepository: Send + Sync + 'static {
    fn add_or_increment(&self, user_id: i64, product_id: i64, quantity: i32)
        -> Result<CartLine, DomainError>;
    fn set_quantity(&self, user_id: i64, cart_id: i64, quantity: i32)
        -> Result<CartLine, DomainError>;
    fn list(&self, user_id: i64) -> Result<Vec<CartLine>, DomainError>;
    fn remove(&self, user_id: i64, cart_id: i64) -> Result<(), DomainError>;
}

pub trait OrderRepository: Send + Sync + 'static {
    /// Converts the selected cart rows into an order in one transaction.
    fn place(&self, user_id: i64, selection: CartSelection) -> Result<PlacedOrder, DomainError>;
    fn find_for_buyer(&self, user_id: i64, order_id: i64) -> Result<Option<OrderView>, DomainError>;
    fn list_for_buyer(&self, user_id: i64, page: i64, limit: i64)
        -> Result<ListResult, DomainError>;
    fn set_status_as_seller(
        &self,
        seller_id: i64,
        order_id: i64,
        status: OrderStatus,
    ) -> Result<StatusChange, DomainError>;
}

pub trait AccountRepository: Send + Sync + 'static {
    fn store_link_token(&self, user_id: i64, token: &str) -> Result<UserAccount, DomainError>;
    /// Binds `telegram_id` to the holder of `token` and clears the token.
    fn redeem_link_token(&self, token: &str, telegram_id: i64) -> Result<UserAccount, DomainError>;
    fn unlink(&self, telegram_id: i64) -> Result<bool, DomainError>;
    fn find_by_telegram_id(&self, telegram_id: i64) -> Result<Option<UserAccount>, DomainError>;
    fn soft_delete_product(&self, seller_id: i64, product_id: i64)
        -> Result<DeletedProduct, DomainError>;
}

pub trait NotificationRepository: Send + Sync + 'static {
    fn load_notice(&self, order_id: i64) -> Result<Option<OrderNotice>, DomainError>;
    /// Marks the outbox entry dispatched. `false` when another caller already
    /// claimed it, in which case nothing must be sent.
    fn claim_dispatch(&self, order_id: i64) -> Result<bool, DomainError>;
    /// Orders whose outbox entry has not been dispatched yet, oldest first.
    fn pending_dispatches(&self) -> Result<Vec<i64>, DomainError>;
}

/// Post-commit hook for committed orders. Must not block.
pub trait OrderNotifier: Send + Sync + 'static {
    fn order_placed(&self, order_id: i64);
}

impl<T: OrderNotifier + ?Sized> OrderNotifier for Arc<T> {
    fn order_placed(&self, order_id: i64) {
        (**self).order_placed(order_id)
    }
}

/// Outbound chat channel to sellers.
#[async_trait]
pub trait Messenger: Send + Sync + 'static {
    async fn send(&self, message: &OutboundMessage) -> Result<(), NotificationError>;
}
