use bigdecimal::BigDecimal;

use super::pricing;

#[derive(Debug, Clone)]
pub struct CartLine {
    pub id: i64,
    pub product_id: i64,
    pub title: String,
    pub unit_price: BigDecimal,
    pub discount: Option<i32>,
    pub quantity: i32,
}

impl CartLine {
    /// Undiscounted `price × quantity`; discounts are applied at checkout.
    pub fn line_total(&self) -> BigDecimal {
        pricing::line_total(&self.unit_price, self.quantity)
    }
}

/// Which cart rows a checkout consumes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CartSelection {
    All,
    Only(Vec<i64>),
}

impl CartSelection {
    pub fn from_ids(ids: Option<Vec<i64>>) -> Self {
        match ids {
            None => CartSelection::All,
            Some(mut ids) => {
                ids.sort_unstable();
                ids.dedup();
                CartSelection::Only(ids)
            }
        }
    }
}
