use std::collections::{BTreeSet, HashMap};

use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde_json::json;
use uuid::Uuid;

use crate::db::DbPool;
use crate::domain::cart::CartSelection;
use crate::domain::errors::DomainError;
use crate::domain::order::{
    page_offset, ListResult, OrderLineView, OrderStatus, OrderView, PlacedOrder, StatusChange,
};
use crate::domain::ports::OrderRepository;
use crate::domain::pricing;
use crate::schema::{carts, order_items, order_outbox, orders, products, shops};

use super::models::{
    CartRow, NewOrderItemRow, NewOrderRow, NewOutboxEventRow, OrderItemRow, OrderRow, ProductRow,
};

pub const ORDER_CREATED_EVENT: &str = "OrderCreated";

pub struct DieselOrderRepository {
    pool: DbPool,
}

impl DieselOrderRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn lock_cart_rows(
    conn: &mut PgConnection,
    user_id: i64,
    selection: &CartSelection,
) -> Result<Vec<CartRow>, DomainError> {
    let owned = carts::table
        .filter(carts::user_id.eq(user_id))
        .order(carts::id.asc())
        .select(CartRow::as_select());

    match selection {
        CartSelection::All => Ok(owned.for_update().load(conn)?),
        CartSelection::Only(ids) => {
            let rows: Vec<CartRow> = owned
                .filter(carts::id.eq_any(ids.clone()))
                .for_update()
                .load(conn)?;
            let found: BTreeSet<i64> = rows.iter().map(|r| r.id).collect();
            let missing: Vec<i64> = ids.iter().copied().filter(|id| !found.contains(id)).collect();
            if !missing.is_empty() {
                return Err(DomainError::CartItemsNotFound(missing));
            }
            Ok(rows)
        }
    }
}

/// Locks the products in id order so concurrent checkouts never deadlock.
fn lock_products(
    conn: &mut PgConnection,
    product_ids: Vec<i64>,
) -> Result<HashMap<i64, ProductRow>, DomainError> {
    let rows: Vec<ProductRow> = products::table
        .filter(products::id.eq_any(product_ids))
        .order(products::id.asc())
        .select(ProductRow::as_select())
        .for_update()
        .load(conn)?;
    Ok(rows.into_iter().map(|p| (p.id, p)).collect())
}

struct PricedLine {
    cart_id: i64,
    product_id: i64,
    quantity: i32,
    unit_price: BigDecimal,
    line_total: BigDecimal,
}

fn price_lines(
    cart_rows: &[CartRow],
    locked: &HashMap<i64, ProductRow>,
) -> Result<Vec<PricedLine>, DomainError> {
    cart_rows
        .iter()
        .map(|row| {
            let product = locked.get(&row.product_id).ok_or(DomainError::NotFound)?;
            let available = if product.is_deleted { 0 } else { product.quantity };
            if available < row.quantity {
                return Err(DomainError::InsufficientStock {
                    product: product.title.clone(),
                    available,
                });
            }
            let unit_price = pricing::effective_unit_price(&product.price, product.discount);
            let line_total = pricing::line_total(&unit_price, row.quantity);
            Ok(PricedLine {
                cart_id: row.id,
                product_id: product.id,
                quantity: row.quantity,
                unit_price,
                line_total,
            })
        })
        .collect()
}

fn to_view(order: OrderRow, lines: Vec<OrderItemRow>) -> Result<OrderView, DomainError> {
    Ok(OrderView {
        id: order.id,
        user_id: order.user_id,
        status: order.status.parse()?,
        total_amount: order.total_amount,
        created_at: order.created_at,
        lines: lines
            .into_iter()
            .map(|l| OrderLineView {
                id: l.id,
                product_id: l.product_id,
                quantity: l.quantity,
                price_at_purchase: l.price_at_purchase,
            })
            .collect(),
    })
}

impl OrderRepository for DieselOrderRepository {
    fn place(&self, user_id: i64, selection: CartSelection) -> Result<PlacedOrder, DomainError> {
        let mut conn = self.pool.get()?;

        conn.transaction::<_, DomainError, _>(|conn| {
            // 1. Resolve and lock the cart rows being bought
            let cart_rows = lock_cart_rows(conn, user_id, &selection)?;
            if cart_rows.is_empty() {
                return Err(DomainError::EmptyCart);
            }

            // 2. Re-check stock against locked product rows
            let product_ids: BTreeSet<i64> = cart_rows.iter().map(|r| r.product_id).collect();
            let locked = lock_products(conn, product_ids.into_iter().collect())?;
            let lines = price_lines(&cart_rows, &locked)?;
            let total_amount = pricing::sum_totals(lines.iter().map(|l| &l.line_total));

            // 3. Insert the order
            let (order_id, created_at): (i64, DateTime<Utc>) = diesel::insert_into(orders::table)
                .values(&NewOrderRow {
                    user_id,
                    status: OrderStatus::Pending.as_str().to_string(),
                    total_amount: total_amount.clone(),
                })
                .returning((orders::id, orders::created_at))
                .get_result(conn)?;

            // 4. Insert order items with the price snapshot
            let new_items: Vec<NewOrderItemRow> = lines
                .iter()
                .map(|l| NewOrderItemRow {
                    order_id,
                    product_id: l.product_id,
                    quantity: l.quantity,
                    price_at_purchase: l.unit_price.clone(),
                })
                .collect();
            diesel::insert_into(order_items::table)
                .values(&new_items)
                .execute(conn)?;

            // 5. Decrement stock and drop the consumed cart rows
            for line in &lines {
                diesel::update(products::table.find(line.product_id))
                    .set(products::quantity.eq(products::quantity - line.quantity))
                    .execute(conn)?;
            }
            let cart_ids: Vec<i64> = lines.iter().map(|l| l.cart_id).collect();
            diesel::delete(carts::table.filter(carts::id.eq_any(cart_ids))).execute(conn)?;

            // 6. Record the owed notification in the same transaction
            let line_payloads: Vec<serde_json::Value> = lines
                .iter()
                .map(|l| {
                    json!({
                        "product_id": l.product_id,
                        "quantity": l.quantity,
                        "price_at_purchase": l.unit_price.to_string()
                    })
                })
                .collect();
            diesel::insert_into(order_outbox::table)
                .values(&NewOutboxEventRow {
                    id: Uuid::new_v4(),
                    order_id,
                    event_type: ORDER_CREATED_EVENT.to_string(),
                    payload: json!({
                        "order_id": order_id,
                        "user_id": user_id,
                        "status": OrderStatus::Pending,
                        "total_amount": total_amount.to_string(),
                        "lines": line_payloads
                    }),
                })
                .execute(conn)?;

            Ok(PlacedOrder {
                order_id,
                total_amount,
                created_at,
            })
        })
    }

    fn find_for_buyer(
        &self,
        user_id: i64,
        order_id: i64,
    ) -> Result<Option<OrderView>, DomainError> {
        let mut conn = self.pool.get()?;

        let order = orders::table
            .filter(orders::id.eq(order_id))
            .filter(orders::user_id.eq(user_id))
            .select(OrderRow::as_select())
            .first(&mut conn)
            .optional()?;

        let Some(order) = order else {
            return Ok(None);
        };

        let lines = OrderItemRow::belonging_to(&order)
            .order(order_items::id.asc())
            .select(OrderItemRow::as_select())
            .load(&mut conn)?;

        to_view(order, lines).map(Some)
    }

    fn list_for_buyer(
        &self,
        user_id: i64,
        page: i64,
        limit: i64,
    ) -> Result<ListResult, DomainError> {
        let offset = page_offset(page, limit)?;
        let mut conn = self.pool.get()?;

        conn.transaction::<_, DomainError, _>(|conn| {
            let total: i64 = orders::table
                .filter(orders::user_id.eq(user_id))
                .count()
                .get_result(conn)?;

            let rows = orders::table
                .filter(orders::user_id.eq(user_id))
                .select(OrderRow::as_select())
                .order((orders::created_at.desc(), orders::id.desc()))
                .limit(limit)
                .offset(offset)
                .load(conn)?;

            let items = rows
                .into_iter()
                .map(|o| to_view(o, vec![]))
                .collect::<Result<Vec<_>, _>>()?;

            Ok(ListResult { items, total })
        })
    }

    fn set_status_as_seller(
        &self,
        seller_id: i64,
        order_id: i64,
        status: OrderStatus,
    ) -> Result<StatusChange, DomainError> {
        let mut conn = self.pool.get()?;

        conn.transaction::<_, DomainError, _>(|conn| {
            let order = orders::table
                .find(order_id)
                .select(OrderRow::as_select())
                .for_update()
                .first(conn)
                .optional()?
                .ok_or(DomainError::NotFound)?;

            let sells_in_order: bool = diesel::select(diesel::dsl::exists(
                order_items::table
                    .inner_join(products::table.inner_join(shops::table))
                    .filter(order_items::order_id.eq(order_id))
                    .filter(shops::seller_id.eq(seller_id)),
            ))
            .get_result(conn)?;
            if !sells_in_order {
                return Err(DomainError::PermissionDenied);
            }

            let current: OrderStatus = order.status.parse()?;
            if !current.can_transition_to(status) {
                return Err(DomainError::InvalidStatusTransition {
                    from: current,
                    to: status,
                });
            }

            diesel::update(orders::table.find(order_id))
                .set((
                    orders::status.eq(status.as_str()),
                    orders::updated_at.eq(Utc::now()),
                ))
                .execute(conn)?;

            Ok(StatusChange {
                order_id,
                from: current,
                to: status,
            })
        })
    }
}
