use std::collections::HashMap;

use chrono::Utc;
use diesel::prelude::*;

use crate::db::DbPool;
use crate::domain::errors::DomainError;
use crate::domain::notification::{NoticeLine, OrderNotice};
use crate::domain::ports::NotificationRepository;
use crate::schema::{order_items, order_outbox, orders, product_images, products, shops, users};

use super::models::{OrderItemRow, OrderRow, ProductImageRow, UserRow};

pub struct DieselNotificationRepository {
    pool: DbPool,
}

impl DieselNotificationRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

impl NotificationRepository for DieselNotificationRepository {
    fn load_notice(&self, order_id: i64) -> Result<Option<OrderNotice>, DomainError> {
        let mut conn = self.pool.get()?;

        let header: Option<(OrderRow, UserRow)> = orders::table
            .inner_join(users::table)
            .filter(orders::id.eq(order_id))
            .select((OrderRow::as_select(), UserRow::as_select()))
            .first(&mut conn)
            .optional()?;

        let Some((order, buyer)) = header else {
            return Ok(None);
        };

        let items: Vec<(OrderItemRow, String, i64, Option<i64>)> = order_items::table
            .inner_join(products::table.inner_join(shops::table.inner_join(users::table)))
            .filter(order_items::order_id.eq(order.id))
            .order(order_items::id.asc())
            .select((
                OrderItemRow::as_select(),
                products::title,
                shops::seller_id,
                users::telegram_id,
            ))
            .load(&mut conn)?;

        // main image first, then the oldest upload
        let product_ids: Vec<i64> = items.iter().map(|(item, ..)| item.product_id).collect();
        let images: Vec<ProductImageRow> = product_images::table
            .filter(product_images::product_id.eq_any(product_ids))
            .order((product_images::is_main_image.desc(), product_images::id.asc()))
            .select(ProductImageRow::as_select())
            .load(&mut conn)?;
        let mut first_image: HashMap<i64, String> = HashMap::new();
        for image in images {
            first_image.entry(image.product_id).or_insert(image.image);
        }

        let buyer_name = format!("{} {}", buyer.first_name, buyer.last_name)
            .trim()
            .to_string();

        Ok(Some(OrderNotice {
            order_id: order.id,
            buyer_name,
            created_at: order.created_at,
            lines: items
                .into_iter()
                .map(|(item, title, seller_id, seller_chat_id)| NoticeLine {
                    seller_id,
                    seller_chat_id,
                    image: first_image.get(&item.product_id).cloned(),
                    title,
                    quantity: item.quantity,
                    price_at_purchase: item.price_at_purchase,
                })
                .collect(),
        }))
    }

    fn claim_dispatch(&self, order_id: i64) -> Result<bool, DomainError> {
        let mut conn = self.pool.get()?;

        let claimed = diesel::update(
            order_outbox::table
                .filter(order_outbox::order_id.eq(order_id))
                .filter(order_outbox::dispatched_at.is_null()),
        )
        .set(order_outbox::dispatched_at.eq(Some(Utc::now())))
        .execute(&mut conn)?;
        Ok(claimed > 0)
    }

    fn pending_dispatches(&self) -> Result<Vec<i64>, DomainError> {
        let mut conn = self.pool.get()?;

        Ok(order_outbox::table
            .filter(order_outbox::dispatched_at.is_null())
            .order(order_outbox::created_at.asc())
            .select(order_outbox::order_id)
            .load(&mut conn)?)
    }
}

#[cfg(test)]
mod tests {
    use super::DieselNotificationRepository;
    use crate::domain::cart::CartSelection;
    use crate::domain::ports::{NotificationRepository, OrderRepository};
    use crate::infrastructure::order_repo::DieselOrderRepository;
    use crate::test_support::{
        link_telegram, seed_cart, seed_image, seed_product, seed_shop, seed_user, setup_db,
    };

    #[tokio::test]
    #[ignore = "requires a Docker daemon for the Postgres testcontainer"]
    async fn order_across_two_shops_yields_two_messages() {
        let (_container, pool) = setup_db().await;
        let buyer = seed_user(&pool, "buyer@example.com");
        let seller_x = seed_user(&pool, "x@example.com");
        let seller_y = seed_user(&pool, "y@example.com");
        link_telegram(&pool, seller_x, 1001);
        link_telegram(&pool, seller_y, 2002);
        let shop_x = seed_shop(&pool, seller_x, "ShopX");
        let shop_y = seed_shop(&pool, seller_y, "ShopY");
        let product_a = seed_product(&pool, shop_x, "Product A", "10.00", 5, Some(10));
        let product_c = seed_product(&pool, shop_y, "Product C", "7.25", 5, None);
        seed_image(&pool, product_c, "product_additional_images/c-side.jpg", false);
        seed_image(&pool, product_c, "product_additional_images/c-main.jpg", true);
        seed_cart(&pool, buyer, product_a, 2);
        seed_cart(&pool, buyer, product_c, 1);

        let order_id = DieselOrderRepository::new(pool.clone())
            .place(buyer, CartSelection::All)
            .expect("place failed")
            .order_id;
        let repo = DieselNotificationRepository::new(pool);

        let notice = repo
            .load_notice(order_id)
            .expect("load failed")
            .expect("notice should exist");
        assert_eq!(notice.buyer_name, "Test User");
        assert_eq!(notice.lines.len(), 2);

        let messages = notice.seller_messages();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].chat_id, 1001);
        assert!(messages[0].text.contains("Your Earnings: $18.00"));
        assert!(messages[0].image.is_none());
        assert_eq!(messages[1].chat_id, 2002);
        assert!(messages[1].text.contains("Your Earnings: $7.25"));
        assert_eq!(
            messages[1].image.as_deref(),
            Some("product_additional_images/c-main.jpg")
        );
    }

    #[tokio::test]
    #[ignore = "requires a Docker daemon for the Postgres testcontainer"]
    async fn dispatched_orders_leave_pending_list() {
        let (_container, pool) = setup_db().await;
        let buyer = seed_user(&pool, "buyer@example.com");
        let seller = seed_user(&pool, "seller@example.com");
        let shop = seed_shop(&pool, seller, "ShopX");
        let mug = seed_product(&pool, shop, "Mug", "4.00", 10, None);
        seed_cart(&pool, buyer, mug, 1);
        let order_id = DieselOrderRepository::new(pool.clone())
            .place(buyer, CartSelection::All)
            .expect("place failed")
            .order_id;
        let repo = DieselNotificationRepository::new(pool);

        assert_eq!(repo.pending_dispatches().expect("pending failed"), vec![order_id]);
        assert!(repo.claim_dispatch(order_id).expect("claim failed"));
        assert!(repo.pending_dispatches().expect("pending failed").is_empty());
        assert!(!repo.claim_dispatch(order_id).expect("claim failed"));
        assert!(repo.load_notice(order_id + 1000).expect("load failed").is_none());
    }
}
