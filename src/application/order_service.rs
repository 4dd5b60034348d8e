use crate::domain::cart::CartSelection;
use crate::domain::errors::DomainError;
use crate::domain::order::{ListResult, OrderStatus, OrderView, PlacedOrder, StatusChange};
use crate::domain::ports::{OrderNotifier, OrderRepository};

pub const MAX_PAGE_SIZE: i64 = 100;

pub struct OrderService<R, N> {
    repo: R,
    notifier: N,
}

impl<R: OrderRepository, N: OrderNotifier> OrderService<R, N> {
    pub fn new(repo: R, notifier: N) -> Self {
        Self { repo, notifier }
    }

    /// Checks out the selected cart rows (all of them when `cart_ids` is
    /// `None`). The notifier only hears about orders that committed.
    pub fn create_order(
        &self,
        user_id: i64,
        cart_ids: Option<Vec<i64>>,
    ) -> Result<PlacedOrder, DomainError> {
        let placed = self.repo.place(user_id, CartSelection::from_ids(cart_ids))?;
        log::info!(
            "order {} placed by user {} (total {})",
            placed.order_id,
            user_id,
            placed.total_amount
        );
        self.notifier.order_placed(placed.order_id);
        Ok(placed)
    }

    pub fn get_order(&self, user_id: i64, order_id: i64) -> Result<OrderView, DomainError> {
        self.repo
            .find_for_buyer(user_id, order_id)?
            .ok_or(DomainError::NotFound)
    }

    pub fn list_orders(
        &self,
        user_id: i64,
        page: i64,
        limit: i64,
    ) -> Result<ListResult, DomainError> {
        self.repo
            .list_for_buyer(user_id, page.max(1), limit.clamp(1, MAX_PAGE_SIZE))
    }

    pub fn set_status(
        &self,
        seller_id: i64,
        order_id: i64,
        status: OrderStatus,
    ) -> Result<StatusChange, DomainError> {
        let change = self.repo.set_status_as_seller(seller_id, order_id, status)?;
        log::info!(
            "order {} moved {} -> {} by seller {}",
            change.order_id,
            change.from,
            change.to,
            seller_id
        );
        Ok(change)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use bigdecimal::BigDecimal;
    use chrono::Utc;

    use super::*;
    use crate::domain::order::ListResult;

    #[derive(Default)]
    struct FakeRepo {
        fail_with_stock: bool,
        selections: Mutex<Vec<CartSelection>>,
        pages: Mutex<Vec<(i64, i64)>>,
    }

    impl OrderRepository for FakeRepo {
        fn place(
            &self,
            _user_id: i64,
            selection: CartSelection,
        ) -> Result<PlacedOrder, DomainError> {
            self.selections.lock().unwrap().push(selection);
            if self.fail_with_stock {
                return Err(DomainError::InsufficientStock {
                    product: "Product B".to_string(),
                    available: 0,
                });
            }
            Ok(PlacedOrder {
                order_id: 7,
                total_amount: BigDecimal::from(18),
                created_at: Utc::now(),
            })
        }

        fn find_for_buyer(&self, _: i64, _: i64) -> Result<Option<OrderView>, DomainError> {
            Ok(None)
        }

        fn list_for_buyer(&self, _: i64, page: i64, limit: i64) -> Result<ListResult, DomainError> {
            self.pages.lock().unwrap().push((page, limit));
            Ok(ListResult {
                items: vec![],
                total: 0,
            })
        }

        fn set_status_as_seller(
            &self,
            _: i64,
            order_id: i64,
            status: OrderStatus,
        ) -> Result<StatusChange, DomainError> {
            Ok(StatusChange {
                order_id,
                from: OrderStatus::Pending,
                to: status,
            })
        }
    }

    #[derive(Default)]
    struct RecordingNotifier {
        placed: Mutex<Vec<i64>>,
    }

    impl OrderNotifier for RecordingNotifier {
        fn order_placed(&self, order_id: i64) {
            self.placed.lock().unwrap().push(order_id);
        }
    }

    #[test]
    fn notifies_after_successful_checkout() {
        let notifier = Arc::new(RecordingNotifier::default());
        let service = OrderService::new(FakeRepo::default(), Arc::clone(&notifier));

        let placed = service.create_order(1, None).expect("checkout");

        assert_eq!(placed.order_id, 7);
        assert_eq!(*notifier.placed.lock().unwrap(), vec![7]);
    }

    #[test]
    fn failed_checkout_never_notifies() {
        let notifier = Arc::new(RecordingNotifier::default());
        let repo = FakeRepo {
            fail_with_stock: true,
            ..FakeRepo::default()
        };
        let service = OrderService::new(repo, Arc::clone(&notifier));

        let err = service.create_order(1, Some(vec![3])).unwrap_err();

        assert!(matches!(err, DomainError::InsufficientStock { .. }));
        assert!(notifier.placed.lock().unwrap().is_empty());
    }

    #[test]
    fn cart_ids_become_a_deduplicated_selection() {
        let service =
            OrderService::new(FakeRepo::default(), Arc::new(RecordingNotifier::default()));

        service.create_order(1, Some(vec![5, 2, 5])).expect("checkout");
        service.create_order(1, None).expect("checkout");

        assert_eq!(
            *service.repo.selections.lock().unwrap(),
            vec![CartSelection::Only(vec![2, 5]), CartSelection::All]
        );
    }

    #[test]
    fn missing_order_is_not_found() {
        let service =
            OrderService::new(FakeRepo::default(), Arc::new(RecordingNotifier::default()));
        assert!(matches!(service.get_order(1, 99), Err(DomainError::NotFound)));
    }

    #[test]
    fn paging_is_clamped() {
        let service =
            OrderService::new(FakeRepo::default(), Arc::new(RecordingNotifier::default()));

        service.list_orders(1, 0, 1000).expect("list");
        service.list_orders(1, 3, 0).expect("list");

        assert_eq!(*service.repo.pages.lock().unwrap(), vec![(1, 100), (3, 1)]);
    }
}
