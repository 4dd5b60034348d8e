use diesel::prelude::*;

use crate::db::DbPool;
use crate::domain::account::{DeletedProduct, UserAccount};
use crate::domain::errors::DomainError;
use crate::domain::ports::AccountRepository;
use crate::schema::{carts, products, shops, users};

use super::models::{ProductRow, ShopRow, UserRow};

pub struct DieselAccountRepository {
    pool: DbPool,
}

impl DieselAccountRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

impl From<UserRow> for UserAccount {
    fn from(row: UserRow) -> Self {
        UserAccount {
            id: row.id,
            email: row.email,
            first_name: row.first_name,
            last_name: row.last_name,
            telegram_id: row.telegram_id,
        }
    }
}

impl AccountRepository for DieselAccountRepository {
    fn store_link_token(&self, user_id: i64, token: &str) -> Result<UserAccount, DomainError> {
        let mut conn = self.pool.get()?;

        diesel::update(users::table.find(user_id))
            .set(users::telegram_token.eq(Some(token)))
            .returning(UserRow::as_returning())
            .get_result(&mut conn)
            .optional()?
            .map(UserAccount::from)
            .ok_or(DomainError::NotFound)
    }

    fn redeem_link_token(&self, token: &str, telegram_id: i64) -> Result<UserAccount, DomainError> {
        if token.is_empty() {
            return Err(DomainError::InvalidToken);
        }
        let mut conn = self.pool.get()?;

        conn.transaction::<_, DomainError, _>(|conn| {
            let holder = users::table
                .filter(users::telegram_token.eq(token))
                .select(UserRow::as_select())
                .for_update()
                .first(conn)
                .optional()?
                .ok_or(DomainError::InvalidToken)?;

            // one chat account maps to one user
            diesel::update(
                users::table
                    .filter(users::telegram_id.eq(telegram_id))
                    .filter(users::id.ne(holder.id)),
            )
            .set(users::telegram_id.eq(None::<i64>))
            .execute(conn)?;

            let linked = diesel::update(users::table.find(holder.id))
                .set((
                    users::telegram_id.eq(Some(telegram_id)),
                    users::telegram_token.eq(None::<String>),
                ))
                .returning(UserRow::as_returning())
                .get_result(conn)?;

            Ok(linked.into())
        })
    }

    fn unlink(&self, telegram_id: i64) -> Result<bool, DomainError> {
        let mut conn = self.pool.get()?;

        let cleared = diesel::update(users::table.filter(users::telegram_id.eq(telegram_id)))
            .set(users::telegram_id.eq(None::<i64>))
            .execute(&mut conn)?;
        Ok(cleared > 0)
    }

    fn find_by_telegram_id(&self, telegram_id: i64) -> Result<Option<UserAccount>, DomainError> {
        let mut conn = self.pool.get()?;

        let user = users::table
            .filter(users::telegram_id.eq(telegram_id))
            .select(UserRow::as_select())
            .first(&mut conn)
            .optional()?;
        Ok(user.map(UserAccount::from))
    }

    fn soft_delete_product(
        &self,
        seller_id: i64,
        product_id: i64,
    ) -> Result<DeletedProduct, DomainError> {
        let mut conn = self.pool.get()?;

        conn.transaction::<_, DomainError, _>(|conn| {
            let (product, shop): (ProductRow, ShopRow) = products::table
                .inner_join(shops::table)
                .filter(products::id.eq(product_id))
                .filter(products::is_deleted.eq(false))
                .select((ProductRow::as_select(), ShopRow::as_select()))
                .for_update()
                .first(conn)
                .optional()?
                .ok_or(DomainError::NotFound)?;

            if shop.seller_id != seller_id || shop.is_deleted {
                return Err(DomainError::PermissionDenied);
            }

            diesel::update(products::table.find(product.id))
                .set(products::is_deleted.eq(true))
                .execute(conn)?;
            diesel::delete(carts::table.filter(carts::product_id.eq(product.id))).execute(conn)?;

            Ok(DeletedProduct {
                id: product.id,
                title: product.title,
            })
        })
    }
}
