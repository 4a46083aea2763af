// Promotion ledger
//
// All redemption-time writes. Coupon and discount counters are bumped
// with a guarded UPDATE so the global cap can never be oversold, and
// the usage row lands in the same transaction. Coin mutations lock the
// user row (SELECT ... FOR UPDATE) and append the ledger entry before
// committing, so balance_after always matches the running balance.

use crate::promotions::{
    coins::CoinTransaction,
    error::{PromotionError, PromotionResult},
    types::CoinTransactionKind,
};
use sqlx::PgPool;
use uuid::Uuid;

const COIN_TX_COLUMNS: &str =
    "id, user_id, kind, amount, balance_after, description, order_id, metadata, created_at";

pub struct PromotionLedger {
    pool: PgPool,
}

impl PromotionLedger {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Redeem a coupon: bump the global counter and append the usage row.
    ///
    /// The UPDATE is guarded on the usage limit; zero rows affected means
    /// the cap was reached (possibly by a concurrent checkout) and the
    /// whole transaction rolls back.
    pub async fn redeem_coupon(
        &self,
        coupon_id: i32,
        user_id: Option<i32>,
        order_id: Option<Uuid>,
    ) -> PromotionResult<()> {
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            "UPDATE coupons SET used = used + 1, updated_at = NOW() \
             WHERE id = $1 AND status = 'active' \
             AND (usage_limit IS NULL OR used < usage_limit)",
        )
        .bind(coupon_id)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            let limit: Option<(Option<i64>,)> =
                sqlx::query_as("SELECT usage_limit FROM coupons WHERE id = $1")
                    .bind(coupon_id)
                    .fetch_optional(&mut *tx)
                    .await?;
            return match limit {
                None => Err(PromotionError::NotFound(format!("Coupon {}", coupon_id))),
                Some((limit,)) => Err(PromotionError::LimitReached {
                    limit: limit.unwrap_or(0),
                }),
            };
        }

        sqlx::query("INSERT INTO coupon_usage (coupon_id, user_id, order_id) VALUES ($1, $2, $3)")
            .bind(coupon_id)
            .bind(user_id)
            .bind(order_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        tracing::info!(
            "Coupon {} redeemed by user {:?} for order {:?}",
            coupon_id,
            user_id,
            order_id
        );
        Ok(())
    }

    /// Redeem a store-wide discount: guarded global counter bump only
    /// (discounts carry no per-user ledger).
    pub async fn redeem_discount(&self, discount_id: i32) -> PromotionResult<()> {
        let result = sqlx::query(
            "UPDATE discounts SET used = used + 1, updated_at = NOW() \
             WHERE id = $1 AND status = 'active' \
             AND (usage_limit IS NULL OR used < usage_limit)",
        )
        .bind(discount_id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            let limit: Option<(Option<i64>,)> =
                sqlx::query_as("SELECT usage_limit FROM discounts WHERE id = $1")
                    .bind(discount_id)
                    .fetch_optional(&self.pool)
                    .await?;
            return match limit {
                None => Err(PromotionError::NotFound(format!("Discount {}", discount_id))),
                Some((limit,)) => Err(PromotionError::LimitReached {
                    limit: limit.unwrap_or(0),
                }),
            };
        }

        tracing::info!("Discount {} redeemed", discount_id);
        Ok(())
    }

    /// Debit coins from a user and append the `spent` ledger entry.
    /// Returns the new balance.
    pub async fn spend_coins(
        &self,
        user_id: i32,
        coins: i64,
        order_id: Option<Uuid>,
        description: &str,
    ) -> PromotionResult<i64> {
        if coins <= 0 {
            return Err(PromotionError::InvalidInput(
                "coin amount must be positive".to_string(),
            ));
        }

        let mut tx = self.pool.begin().await?;

        let balance = Self::lock_balance(&mut tx, user_id).await?;
        if balance < coins {
            return Err(PromotionError::InsufficientCoins {
                requested: coins,
                available: balance,
            });
        }
        let new_balance = balance - coins;

        sqlx::query("UPDATE users SET coins = $1 WHERE id = $2")
            .bind(new_balance)
            .bind(user_id)
            .execute(&mut *tx)
            .await?;

        Self::append_entry(
            &mut tx,
            user_id,
            CoinTransactionKind::Spent,
            coins,
            new_balance,
            description,
            order_id,
        )
        .await?;

        tx.commit().await?;

        tracing::info!(
            "User {} spent {} coins (balance {})",
            user_id,
            coins,
            new_balance
        );
        Ok(new_balance)
    }

    /// Credit coins to a user (`earned` or `refunded`) and append the
    /// ledger entry. Returns the new balance.
    pub async fn credit_coins(
        &self,
        user_id: i32,
        coins: i64,
        kind: CoinTransactionKind,
        order_id: Option<Uuid>,
        description: &str,
    ) -> PromotionResult<i64> {
        if coins <= 0 {
            return Err(PromotionError::InvalidInput(
                "coin amount must be positive".to_string(),
            ));
        }
        if !kind.is_credit() {
            return Err(PromotionError::InvalidInput(format!(
                "{} is not a credit entry",
                kind
            )));
        }

        let mut tx = self.pool.begin().await?;

        let balance = Self::lock_balance(&mut tx, user_id).await?;
        let new_balance = balance + coins;

        sqlx::query("UPDATE users SET coins = $1 WHERE id = $2")
            .bind(new_balance)
            .bind(user_id)
            .execute(&mut *tx)
            .await?;

        Self::append_entry(&mut tx, user_id, kind, coins, new_balance, description, order_id)
            .await?;

        tx.commit().await?;

        tracing::info!(
            "User {} credited {} coins as {} (balance {})",
            user_id,
            coins,
            kind,
            new_balance
        );
        Ok(new_balance)
    }

    /// Remove up to `coins` from a user as an `expired` entry, clamped so
    /// the balance never goes negative. Returns the amount actually
    /// removed (zero skips the ledger write entirely).
    pub async fn expire_coins(
        &self,
        user_id: i32,
        coins: i64,
        order_id: Option<Uuid>,
        description: &str,
    ) -> PromotionResult<i64> {
        if coins <= 0 {
            return Ok(0);
        }

        let mut tx = self.pool.begin().await?;

        let balance = Self::lock_balance(&mut tx, user_id).await?;
        let removed = coins.min(balance);
        if removed == 0 {
            return Ok(0);
        }
        let new_balance = balance - removed;

        sqlx::query("UPDATE users SET coins = $1 WHERE id = $2")
            .bind(new_balance)
            .bind(user_id)
            .execute(&mut *tx)
            .await?;

        Self::append_entry(
            &mut tx,
            user_id,
            CoinTransactionKind::Expired,
            removed,
            new_balance,
            description,
            order_id,
        )
        .await?;

        tx.commit().await?;
        Ok(removed)
    }

    /// Current coin balance
    pub async fn balance(&self, user_id: i32) -> PromotionResult<i64> {
        let row: Option<(i64,)> = sqlx::query_as("SELECT coins FROM users WHERE id = $1")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(|(coins,)| coins)
            .ok_or_else(|| PromotionError::NotFound(format!("User {}", user_id)))
    }

    /// Recent ledger entries, newest first
    pub async fn transactions(
        &self,
        user_id: i32,
        limit: i64,
    ) -> PromotionResult<Vec<CoinTransaction>> {
        let query = format!(
            "SELECT {} FROM coin_transactions WHERE user_id = $1 \
             ORDER BY created_at DESC, id DESC LIMIT $2",
            COIN_TX_COLUMNS
        );
        let entries = sqlx::query_as::<_, CoinTransaction>(&query)
            .bind(user_id)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;
        Ok(entries)
    }

    /// Net coins of `kind` recorded against an order, for returns
    pub async fn coins_on_order(
        &self,
        user_id: i32,
        order_id: Uuid,
        kind: CoinTransactionKind,
    ) -> PromotionResult<i64> {
        let (total,): (Option<i64>,) = sqlx::query_as(
            "SELECT SUM(amount) FROM coin_transactions \
             WHERE user_id = $1 AND order_id = $2 AND kind = $3",
        )
        .bind(user_id)
        .bind(order_id)
        .bind(kind)
        .fetch_one(&self.pool)
        .await?;
        Ok(total.unwrap_or(0))
    }

    async fn lock_balance(
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        user_id: i32,
    ) -> PromotionResult<i64> {
        let row: Option<(i64,)> =
            sqlx::query_as("SELECT coins FROM users WHERE id = $1 FOR UPDATE")
                .bind(user_id)
                .fetch_optional(&mut **tx)
                .await?;
        row.map(|(coins,)| coins)
            .ok_or_else(|| PromotionError::NotFound(format!("User {}", user_id)))
    }

    async fn append_entry(
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        user_id: i32,
        kind: CoinTransactionKind,
        amount: i64,
        balance_after: i64,
        description: &str,
        order_id: Option<Uuid>,
    ) -> PromotionResult<()> {
        sqlx::query(
            "INSERT INTO coin_transactions \
             (user_id, kind, amount, balance_after, description, order_id) \
             VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(user_id)
        .bind(kind)
        .bind(amount)
        .bind(balance_after)
        .bind(description)
        .bind(order_id)
        .execute(&mut **tx)
        .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    // Ledger behavior is exercised end to end in the integration suite;
    // the concurrency guarantees rest on the guarded UPDATE and the row
    // lock, both asserted there against a live database.
}
