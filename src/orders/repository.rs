use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::Product;
use crate::orders::{Order, OrderItem, OrderStatus, PaymentStatus};
use crate::orders::error::OrderError;

const ORDER_COLUMNS: &str = "id, user_id, status, payment_status, subtotal, discount_amount, \
     coin_discount, coins_redeemed, coupon_code, discount_code, total_price, created_at, updated_at";

const PRODUCT_COLUMNS: &str =
    "id, name, category, description, price, image_url, stock, specifications, created_at, updated_at";

/// Repository for product lookups during checkout
#[derive(Clone)]
pub struct ProductRepository {
    pool: PgPool,
}

impl ProductRepository {
    /// Create a new ProductRepository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Find a product by ID
    pub async fn find_by_id(&self, id: i32) -> Result<Option<Product>, OrderError> {
        let query = format!("SELECT {} FROM products WHERE id = $1", PRODUCT_COLUMNS);
        let product = sqlx::query_as::<_, Product>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(product)
    }

    /// Find multiple products by IDs
    pub async fn find_by_ids(&self, ids: &[i32]) -> Result<Vec<Product>, OrderError> {
        let query = format!("SELECT {} FROM products WHERE id = ANY($1)", PRODUCT_COLUMNS);
        let products = sqlx::query_as::<_, Product>(&query)
            .bind(ids)
            .fetch_all(&self.pool)
            .await?;

        Ok(products)
    }
}

/// Fields persisted for a new order
pub struct NewOrder {
    pub id: Uuid,
    pub user_id: i32,
    pub subtotal: Decimal,
    pub discount_amount: Decimal,
    pub coin_discount: Decimal,
    pub coins_redeemed: i64,
    pub coupon_code: Option<String>,
    pub discount_code: Option<String>,
    pub total_price: Decimal,
    /// (product_id, quantity, price_snapshot, subtotal)
    pub items: Vec<(i32, i32, Decimal, Decimal)>,
}

/// Repository for order operations
#[derive(Clone)]
pub struct OrdersRepository {
    pool: PgPool,
}

impl OrdersRepository {
    /// Create a new OrdersRepository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create an order with its items and decrement stock, all in one
    /// transaction. The stock UPDATE is guarded so concurrent checkouts
    /// cannot take the count below zero.
    pub async fn create(&self, new_order: NewOrder) -> Result<Order, OrderError> {
        let mut tx = self.pool.begin().await?;

        let query = format!(
            "INSERT INTO orders (id, user_id, status, payment_status, subtotal, discount_amount, \
             coin_discount, coins_redeemed, coupon_code, discount_code, total_price) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11) RETURNING {}",
            ORDER_COLUMNS
        );
        let order = sqlx::query_as::<_, Order>(&query)
            .bind(new_order.id)
            .bind(new_order.user_id)
            .bind(OrderStatus::Pending)
            .bind(PaymentStatus::Unpaid)
            .bind(new_order.subtotal)
            .bind(new_order.discount_amount)
            .bind(new_order.coin_discount)
            .bind(new_order.coins_redeemed)
            .bind(&new_order.coupon_code)
            .bind(&new_order.discount_code)
            .bind(new_order.total_price)
            .fetch_one(&mut *tx)
            .await?;

        for (product_id, quantity, price_snapshot, subtotal) in new_order.items {
            let result = sqlx::query(
                "UPDATE products SET stock = stock - $1, updated_at = NOW() \
                 WHERE id = $2 AND stock >= $1",
            )
            .bind(quantity)
            .bind(product_id)
            .execute(&mut *tx)
            .await?;

            if result.rows_affected() == 0 {
                let available: Option<(i32,)> =
                    sqlx::query_as("SELECT stock FROM products WHERE id = $1")
                        .bind(product_id)
                        .fetch_optional(&mut *tx)
                        .await?;
                return match available {
                    None => Err(OrderError::ProductNotFound(product_id)),
                    Some((stock,)) => Err(OrderError::OutOfStock {
                        product_id,
                        requested: quantity,
                        available: stock,
                    }),
                };
            }

            sqlx::query(
                "INSERT INTO order_items (order_id, product_id, quantity, price_snapshot, subtotal) \
                 VALUES ($1, $2, $3, $4, $5)",
            )
            .bind(order.id)
            .bind(product_id)
            .bind(quantity)
            .bind(price_snapshot)
            .bind(subtotal)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        Ok(order)
    }

    /// Find an order by ID
    pub async fn find_by_id(&self, order_id: Uuid) -> Result<Option<Order>, OrderError> {
        let query = format!("SELECT {} FROM orders WHERE id = $1", ORDER_COLUMNS);
        let order = sqlx::query_as::<_, Order>(&query)
            .bind(order_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(order)
    }

    /// Find orders by user ID with optional status filter
    pub async fn find_by_user_id(
        &self,
        user_id: i32,
        status: Option<OrderStatus>,
    ) -> Result<Vec<Order>, OrderError> {
        let orders = match status {
            Some(status_filter) => {
                let query = format!(
                    "SELECT {} FROM orders WHERE user_id = $1 AND status = $2 \
                     ORDER BY created_at DESC",
                    ORDER_COLUMNS
                );
                sqlx::query_as::<_, Order>(&query)
                    .bind(user_id)
                    .bind(status_filter)
                    .fetch_all(&self.pool)
                    .await?
            }
            None => {
                let query = format!(
                    "SELECT {} FROM orders WHERE user_id = $1 ORDER BY created_at DESC",
                    ORDER_COLUMNS
                );
                sqlx::query_as::<_, Order>(&query)
                    .bind(user_id)
                    .fetch_all(&self.pool)
                    .await?
            }
        };

        Ok(orders)
    }

    /// Update order status
    pub async fn update_status(
        &self,
        order_id: Uuid,
        new_status: OrderStatus,
    ) -> Result<Order, OrderError> {
        let query = format!(
            "UPDATE orders SET status = $1, updated_at = NOW() WHERE id = $2 RETURNING {}",
            ORDER_COLUMNS
        );
        let order = sqlx::query_as::<_, Order>(&query)
            .bind(new_status)
            .bind(order_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(OrderError::NotFound)?;

        Ok(order)
    }

    /// Update payment status
    pub async fn update_payment_status(
        &self,
        order_id: Uuid,
        new_payment_status: PaymentStatus,
    ) -> Result<Order, OrderError> {
        let query = format!(
            "UPDATE orders SET payment_status = $1, updated_at = NOW() WHERE id = $2 RETURNING {}",
            ORDER_COLUMNS
        );
        let order = sqlx::query_as::<_, Order>(&query)
            .bind(new_payment_status)
            .bind(order_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(OrderError::NotFound)?;

        Ok(order)
    }
}

/// Repository for order items operations
#[derive(Clone)]
pub struct OrderItemsRepository {
    pool: PgPool,
}

impl OrderItemsRepository {
    /// Create a new OrderItemsRepository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Find all items for a given order
    pub async fn find_by_order_id(&self, order_id: Uuid) -> Result<Vec<OrderItem>, OrderError> {
        let items = sqlx::query_as::<_, OrderItem>(
            "SELECT id, order_id, product_id, quantity, price_snapshot, subtotal \
             FROM order_items WHERE order_id = $1 ORDER BY id",
        )
        .bind(order_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(items)
    }
}
