use diesel::prelude::*;

use crate::db::DbPool;
use crate::domain::cart::CartLine;
use crate::domain::errors::DomainError;
use crate::domain::ports::CartRepository;
use crate::schema::{carts, products};

use super::models::{CartRow, NewCartRow, ProductRow};

pub struct DieselCartRepository {
    pool: DbPool,
}

impl DieselCartRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn live_product(conn: &mut PgConnection, product_id: i64) -> Result<ProductRow, DomainError> {
    products::table
        .find(product_id)
        .filter(products::is_deleted.eq(false))
        .select(ProductRow::as_select())
        .first(conn)
        .optional()?
        .ok_or(DomainError::NotFound)
}

fn ensure_stock(product: &ProductRow, wanted: i32) -> Result<(), DomainError> {
    if wanted > product.quantity {
        return Err(DomainError::InsufficientStock {
            product: product.title.clone(),
            available: product.quantity,
        });
    }
    Ok(())
}

fn owned_row(conn: &mut PgConnection, user_id: i64, cart_id: i64) -> Result<CartRow, DomainError> {
    let row = carts::table
        .find(cart_id)
        .select(CartRow::as_select())
        .first(conn)
        .optional()?
        .ok_or(DomainError::NotFound)?;
    if row.user_id != user_id {
        return Err(DomainError::PermissionDenied);
    }
    Ok(row)
}

fn validate_quantity(quantity: i32) -> Result<(), DomainError> {
    if quantity < 1 {
        return Err(DomainError::InvalidInput(
            "quantity must be at least 1".to_string(),
        ));
    }
    Ok(())
}

fn to_line(row: CartRow, product: ProductRow) -> CartLine {
    CartLine {
        id: row.id,
        product_id: product.id,
        title: product.title,
        unit_price: product.price,
        discount: product.discount,
        quantity: row.quantity,
    }
}

impl CartRepository for DieselCartRepository {
    fn add_or_increment(
        &self,
        user_id: i64,
        product_id: i64,
        quantity: i32,
    ) -> Result<CartLine, DomainError> {
        validate_quantity(quantity)?;
        let mut conn = self.pool.get()?;

        conn.transaction::<_, DomainError, _>(|conn| {
            let product = live_product(conn, product_id)?;

            let existing: Option<i32> = carts::table
                .filter(carts::user_id.eq(user_id))
                .filter(carts::product_id.eq(product_id))
                .select(carts::quantity)
                .first(conn)
                .optional()?;
            let wanted = existing
                .unwrap_or(0)
                .checked_add(quantity)
                .ok_or_else(|| DomainError::InvalidInput("quantity is too large".to_string()))?;
            ensure_stock(&product, wanted)?;

            let row = diesel::insert_into(carts::table)
                .values(&NewCartRow {
                    user_id,
                    product_id,
                    quantity,
                })
                .on_conflict((carts::user_id, carts::product_id))
                .do_update()
                .set(carts::quantity.eq(carts::quantity + quantity))
                .returning(CartRow::as_returning())
                .get_result(conn)?;

            Ok(to_line(row, product))
        })
    }

    fn set_quantity(
        &self,
        user_id: i64,
        cart_id: i64,
        quantity: i32,
    ) -> Result<CartLine, DomainError> {
        validate_quantity(quantity)?;
        let mut conn = self.pool.get()?;

        conn.transaction::<_, DomainError, _>(|conn| {
            let row = owned_row(conn, user_id, cart_id)?;
            let product = live_product(conn, row.product_id)?;
            ensure_stock(&product, quantity)?;

            let row = diesel::update(carts::table.find(row.id))
                .set(carts::quantity.eq(quantity))
                .returning(CartRow::as_returning())
                .get_result(conn)?;

            Ok(to_line(row, product))
        })
    }

    fn list(&self, user_id: i64) -> Result<Vec<CartLine>, DomainError> {
        let mut conn = self.pool.get()?;

        let rows: Vec<(CartRow, ProductRow)> = carts::table
            .inner_join(products::table)
            .filter(carts::user_id.eq(user_id))
            .order(carts::id.asc())
            .select((CartRow::as_select(), ProductRow::as_select()))
            .load(&mut conn)?;

        Ok(rows
            .into_iter()
            .map(|(row, product)| to_line(row, product))
            .collect())
    }

    fn remove(&self, user_id: i64, cart_id: i64) -> Result<(), DomainError> {
        let mut conn = self.pool.get()?;

        conn.transaction::<_, DomainError, _>(|conn| {
            let row = owned_row(conn, user_id, cart_id)?;
            diesel::delete(carts::table.find(row.id)).execute(conn)?;
            Ok(())
        })
    }
}
