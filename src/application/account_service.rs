use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use rand::rngs::OsRng;
use rand::RngCore;

use crate::domain::account::{DeletedProduct, LinkInvite, UserAccount};
use crate::domain::errors::DomainError;
use crate::domain::order::{OrderStatus, StatusChange};
use crate::domain::ports::{AccountRepository, OrderRepository};

const TOKEN_BYTES: usize = 16;

/// 16 random bytes from the OS, base64url without padding (22 characters).
pub fn generate_link_token() -> String {
    let mut bytes = [0u8; TOKEN_BYTES];
    OsRng.fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

pub fn deep_link(bot_username: &str, token: &str) -> String {
    format!("https://t.me/{}?start={}", bot_username, token)
}

/// Binds chat accounts to users and applies seller actions coming from chat.
pub struct AccountLinkService<A, O> {
    accounts: A,
    orders: O,
    bot_username: String,
}

impl<A: AccountRepository, O: OrderRepository> AccountLinkService<A, O> {
    pub fn new(accounts: A, orders: O, bot_username: impl Into<String>) -> Self {
        Self {
            accounts,
            orders,
            bot_username: bot_username.into(),
        }
    }

    pub fn issue_link_token(&self, user_id: i64) -> Result<LinkInvite, DomainError> {
        let token = generate_link_token();
        self.accounts.store_link_token(user_id, &token)?;
        Ok(LinkInvite {
            deep_link: deep_link(&self.bot_username, &token),
            token,
        })
    }

    pub fn redeem_token(&self, token: &str, telegram_id: i64) -> Result<UserAccount, DomainError> {
        let user = self.accounts.redeem_link_token(token.trim(), telegram_id)?;
        log::info!("telegram account {} linked to user {}", telegram_id, user.id);
        Ok(user)
    }

    pub fn unlink(&self, telegram_id: i64) -> Result<bool, DomainError> {
        self.accounts.unlink(telegram_id)
    }

    pub fn resolve(&self, telegram_id: i64) -> Result<Option<UserAccount>, DomainError> {
        self.accounts.find_by_telegram_id(telegram_id)
    }

    fn linked_user(&self, telegram_id: i64) -> Result<UserAccount, DomainError> {
        self.resolve(telegram_id)?.ok_or(DomainError::PermissionDenied)
    }

    pub fn set_order_status(
        &self,
        order_id: i64,
        status: OrderStatus,
        telegram_id: i64,
    ) -> Result<StatusChange, DomainError> {
        let seller = self.linked_user(telegram_id)?;
        let change = self.orders.set_status_as_seller(seller.id, order_id, status)?;
        log::info!(
            "order {} moved {} -> {} via chat by seller {}",
            order_id,
            change.from,
            change.to,
            seller.id
        );
        Ok(change)
    }

    pub fn delete_product(
        &self,
        product_id: i64,
        telegram_id: i64,
    ) -> Result<DeletedProduct, DomainError> {
        let seller = self.linked_user(telegram_id)?;
        let deleted = self.accounts.soft_delete_product(seller.id, product_id)?;
        log::info!("product {} deleted via chat by seller {}", product_id, seller.id);
        Ok(deleted)
    }
}

#[cfg(test)]
pub(crate) mod fakes {
    use std::collections::HashMap;
    use std::sync::Mutex;

    use crate::domain::account::{DeletedProduct, UserAccount};
    use crate::domain::errors::DomainError;
    use crate::domain::cart::CartSelection;
    use crate::domain::order::{ListResult, OrderStatus, OrderView, PlacedOrder, StatusChange};
    use crate::domain::ports::{AccountRepository, OrderRepository};

    /// In-memory accounts: user id -> (account, outstanding token).
    #[derive(Default)]
    pub struct MemoryAccounts {
        pub users: Mutex<HashMap<i64, (UserAccount, Option<String>)>>,
        /// product id -> (owning seller, title)
        pub products: Mutex<HashMap<i64, (i64, String)>>,
    }

    impl MemoryAccounts {
        pub fn with_user(self, id: i64, first_name: &str) -> Self {
            self.users.lock().unwrap().insert(
                id,
                (
                    UserAccount {
                        id,
                        email: format!("user{id}@example.com"),
                        first_name: first_name.to_string(),
                        last_name: "Tester".to_string(),
                        telegram_id: None,
                    },
                    None,
                ),
            );
            self
        }

        pub fn with_product(self, id: i64, seller_id: i64, title: &str) -> Self {
            self.products
                .lock()
                .unwrap()
                .insert(id, (seller_id, title.to_string()));
            self
        }
    }

    impl AccountRepository for MemoryAccounts {
        fn store_link_token(&self, user_id: i64, token: &str) -> Result<UserAccount, DomainError> {
            let mut users = self.users.lock().unwrap();
            let (user, slot) = users.get_mut(&user_id).ok_or(DomainError::NotFound)?;
            *slot = Some(token.to_string());
            Ok(user.clone())
        }

        fn redeem_link_token(
            &self,
            token: &str,
            telegram_id: i64,
        ) -> Result<UserAccount, DomainError> {
            let mut users = self.users.lock().unwrap();
            let holder = users
                .iter()
                .find(|(_, (_, t))| !token.is_empty() && t.as_deref() == Some(token))
                .map(|(id, _)| *id)
                .ok_or(DomainError::InvalidToken)?;
            for (user, _) in users.values_mut() {
                if user.telegram_id == Some(telegram_id) {
                    user.telegram_id = None;
                }
            }
            let (user, slot) = users.get_mut(&holder).ok_or(DomainError::InvalidToken)?;
            user.telegram_id = Some(telegram_id);
            *slot = None;
            Ok(user.clone())
        }

        fn unlink(&self, telegram_id: i64) -> Result<bool, DomainError> {
            let mut users = self.users.lock().unwrap();
            let mut cleared = false;
            for (user, _) in users.values_mut() {
                if user.telegram_id == Some(telegram_id) {
                    user.telegram_id = None;
                    cleared = true;
                }
            }
            Ok(cleared)
        }

        fn find_by_telegram_id(
            &self,
            telegram_id: i64,
        ) -> Result<Option<UserAccount>, DomainError> {
            Ok(self
                .users
                .lock()
                .unwrap()
                .values()
                .find(|(u, _)| u.telegram_id == Some(telegram_id))
                .map(|(u, _)| u.clone()))
        }

        fn soft_delete_product(
            &self,
            seller_id: i64,
            product_id: i64,
        ) -> Result<DeletedProduct, DomainError> {
            let mut products = self.products.lock().unwrap();
            let (owner, _) = products.get(&product_id).ok_or(DomainError::NotFound)?;
            if *owner != seller_id {
                return Err(DomainError::PermissionDenied);
            }
            let (_, title) = products.remove(&product_id).ok_or(DomainError::NotFound)?;
            Ok(DeletedProduct {
                id: product_id,
                title,
            })
        }
    }

    /// Orders keyed by id with the set of sellers that have items in them.
    #[derive(Default)]
    pub struct MemoryOrders {
        pub orders: Mutex<HashMap<i64, (OrderStatus, Vec<i64>)>>,
    }

    impl MemoryOrders {
        pub fn with_order(self, id: i64, sellers: Vec<i64>) -> Self {
            self.orders
                .lock()
                .unwrap()
                .insert(id, (OrderStatus::Pending, sellers));
            self
        }
    }

    impl OrderRepository for MemoryOrders {
        fn place(&self, _: i64, _: CartSelection) -> Result<PlacedOrder, DomainError> {
            Err(DomainError::EmptyCart)
        }

        fn find_for_buyer(&self, _: i64, _: i64) -> Result<Option<OrderView>, DomainError> {
            Ok(None)
        }

        fn list_for_buyer(&self, _: i64, _: i64, _: i64) -> Result<ListResult, DomainError> {
            Ok(ListResult {
                items: vec![],
                total: 0,
            })
        }

        fn set_status_as_seller(
            &self,
            seller_id: i64,
            order_id: i64,
            status: OrderStatus,
        ) -> Result<StatusChange, DomainError> {
            let mut orders = self.orders.lock().unwrap();
            let (current, sellers) = orders.get_mut(&order_id).ok_or(DomainError::NotFound)?;
            if !sellers.contains(&seller_id) {
                return Err(DomainError::PermissionDenied);
            }
            if !current.can_transition_to(status) {
                return Err(DomainError::InvalidStatusTransition {
                    from: *current,
                    to: status,
                });
            }
            let from = *current;
            *current = status;
            Ok(StatusChange {
                order_id,
                from,
                to: status,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::fakes::{MemoryAccounts, MemoryOrders};
    use super::*;

    fn service(
        accounts: MemoryAccounts,
        orders: MemoryOrders,
    ) -> AccountLinkService<MemoryAccounts, MemoryOrders> {
        AccountLinkService::new(accounts, orders, "market_bot")
    }

    #[test]
    fn tokens_are_url_safe_and_unique() {
        let a = generate_link_token();
        let b = generate_link_token();
        assert_eq!(a.len(), 22);
        assert_ne!(a, b);
        assert!(a
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'));
    }

    #[test]
    fn deep_link_embeds_token() {
        let svc = service(MemoryAccounts::default().with_user(1, "Sam"), MemoryOrders::default());

        let invite = svc.issue_link_token(1).expect("issue");

        assert_eq!(
            invite.deep_link,
            format!("https://t.me/market_bot?start={}", invite.token)
        );
    }

    #[test]
    fn redeeming_twice_fails_the_second_time() {
        let svc = service(MemoryAccounts::default().with_user(1, "Sam"), MemoryOrders::default());
        let invite = svc.issue_link_token(1).expect("issue");

        let linked = svc.redeem_token(&invite.token, 900).expect("first redeem");
        assert_eq!(linked.telegram_id, Some(900));
        assert!(matches!(
            svc.redeem_token(&invite.token, 900),
            Err(DomainError::InvalidToken)
        ));
        assert_eq!(svc.resolve(900).expect("resolve").map(|u| u.id), Some(1));
    }

    #[test]
    fn reissue_invalidates_older_token() {
        let svc = service(MemoryAccounts::default().with_user(1, "Sam"), MemoryOrders::default());
        let old = svc.issue_link_token(1).expect("issue");
        let new = svc.issue_link_token(1).expect("issue");

        assert!(matches!(
            svc.redeem_token(&old.token, 900),
            Err(DomainError::InvalidToken)
        ));
        svc.redeem_token(&new.token, 900).expect("redeem");
    }

    #[test]
    fn unknown_user_cannot_get_a_token() {
        let svc = service(MemoryAccounts::default(), MemoryOrders::default());
        assert!(matches!(svc.issue_link_token(5), Err(DomainError::NotFound)));
    }

    #[test]
    fn unlinked_chat_cannot_act_as_seller() {
        let svc = service(
            MemoryAccounts::default().with_user(1, "Sam"),
            MemoryOrders::default().with_order(10, vec![1]),
        );

        assert!(matches!(
            svc.set_order_status(10, OrderStatus::Paid, 900),
            Err(DomainError::PermissionDenied)
        ));
        assert!(matches!(
            svc.delete_product(3, 900),
            Err(DomainError::PermissionDenied)
        ));
    }

    #[test]
    fn linked_seller_updates_status_and_deletes_products() {
        let svc = service(
            MemoryAccounts::default()
                .with_user(1, "Sam")
                .with_product(3, 1, "Lamp"),
            MemoryOrders::default().with_order(10, vec![1]),
        );
        let invite = svc.issue_link_token(1).expect("issue");
        svc.redeem_token(&invite.token, 900).expect("redeem");

        let change = svc
            .set_order_status(10, OrderStatus::Paid, 900)
            .expect("status");
        assert_eq!(change.to, OrderStatus::Paid);
        assert!(matches!(
            svc.set_order_status(10, OrderStatus::Pending, 900),
            Err(DomainError::InvalidStatusTransition { .. })
        ));

        assert_eq!(svc.delete_product(3, 900).expect("delete").title, "Lamp");
        assert!(svc.unlink(900).expect("unlink"));
        assert!(svc.resolve(900).expect("resolve").is_none());
    }
}
