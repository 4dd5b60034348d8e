use crate::domain::cart::CartLine;
use crate::domain::errors::DomainError;
use crate::domain::ports::CartRepository;

pub struct CartService<R> {
    repo: R,
}

impl<R: CartRepository> CartService<R> {
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    pub fn add_item(
        &self,
        user_id: i64,
        product_id: i64,
        quantity: i32,
    ) -> Result<CartLine, DomainError> {
        self.repo.add_or_increment(user_id, product_id, quantity)
    }

    pub fn set_quantity(
        &self,
        user_id: i64,
        cart_id: i64,
        quantity: i32,
    ) -> Result<CartLine, DomainError> {
        self.repo.set_quantity(user_id, cart_id, quantity)
    }

    pub fn list_items(&self, user_id: i64) -> Result<Vec<CartLine>, DomainError> {
        self.repo.list(user_id)
    }

    pub fn remove_item(&self, user_id: i64, cart_id: i64) -> Result<(), DomainError> {
        self.repo.remove(user_id, cart_id)
    }
}
