use std::sync::Arc;

use crate::orders::{OrderStatus, OrdersRepository, PaymentStatus};
use crate::promotions::PromotionsEngine;
use crate::returns::{
    error::ReturnError,
    models::{CreateReturnRequest, ReturnRequest, ReturnStatus},
    refund_calculator::RefundCalculator,
    repository::ReturnsRepository,
};

/// Service for return request business logic
#[derive(Clone)]
pub struct ReturnService {
    returns_repo: ReturnsRepository,
    orders_repo: OrdersRepository,
    promotions: Arc<PromotionsEngine>,
}

impl ReturnService {
    /// Create a new ReturnService
    pub fn new(
        returns_repo: ReturnsRepository,
        orders_repo: OrdersRepository,
        promotions: Arc<PromotionsEngine>,
    ) -> Self {
        Self {
            returns_repo,
            orders_repo,
            promotions,
        }
    }

    /// Open a return for a delivered, paid order owned by the caller
    pub async fn request_return(
        &self,
        user_id: i32,
        request: CreateReturnRequest,
    ) -> Result<ReturnRequest, ReturnError> {
        let order = self
            .orders_repo
            .find_by_id(request.order_id)
            .await
            .map_err(|e| ReturnError::DatabaseError(e.to_string()))?
            .ok_or(ReturnError::OrderNotFound)?;

        if order.user_id != user_id {
            return Err(ReturnError::Forbidden(
                "You do not have permission to return this order".to_string(),
            ));
        }
        if order.status != OrderStatus::Delivered {
            return Err(ReturnError::NotReturnable(format!(
                "Only delivered orders can be returned (order is {})",
                order.status
            )));
        }
        if order.payment_status != PaymentStatus::Paid {
            return Err(ReturnError::NotReturnable(format!(
                "Only paid orders can be returned (payment is {})",
                order.payment_status
            )));
        }

        let created = self
            .returns_repo
            .create(order.id, user_id, &request.reason)
            .await?;

        tracing::info!(
            "Return {} requested for order {} by user {}",
            created.id,
            order.id,
            user_id
        );
        Ok(created)
    }

    /// Return requests for the calling user
    pub async fn get_user_returns(&self, user_id: i32) -> Result<Vec<ReturnRequest>, ReturnError> {
        self.returns_repo.find_by_user_id(user_id).await
    }

    /// All return requests, optionally filtered by status (admin)
    pub async fn list_returns(
        &self,
        status: Option<ReturnStatus>,
    ) -> Result<Vec<ReturnRequest>, ReturnError> {
        self.returns_repo.find_all(status).await
    }

    /// Resolve a pending return request (admin)
    ///
    /// Approval refunds the charged amount, flips the order's payment
    /// status to refunded, credits back coins spent on the order and
    /// reclaims coins it earned. Rejection only closes the request.
    pub async fn resolve_return(
        &self,
        return_id: i32,
        new_status: ReturnStatus,
    ) -> Result<ReturnRequest, ReturnError> {
        if new_status == ReturnStatus::Requested {
            return Err(ReturnError::ValidationError(
                "A return can only be resolved to approved or rejected".to_string(),
            ));
        }

        let request = self
            .returns_repo
            .find_by_id(return_id)
            .await?
            .ok_or(ReturnError::NotFound)?;

        if request.status != ReturnStatus::Requested {
            return Err(ReturnError::AlreadyResolved);
        }

        if new_status == ReturnStatus::Rejected {
            let resolved = self
                .returns_repo
                .resolve(return_id, ReturnStatus::Rejected, None, 0)
                .await?;
            tracing::info!("Return {} rejected", return_id);
            return Ok(resolved);
        }

        let order = self
            .orders_repo
            .find_by_id(request.order_id)
            .await
            .map_err(|e| ReturnError::DatabaseError(e.to_string()))?
            .ok_or(ReturnError::OrderNotFound)?;

        // Ledger sums, not the order row, are authoritative for coins
        let (coins_refunded, coins_reclaimed) = self
            .promotions
            .refund_order_coins(order.user_id, order.id)
            .await?;

        let breakdown = RefundCalculator::breakdown(&order, coins_refunded, coins_reclaimed);

        self.orders_repo
            .update_payment_status(order.id, PaymentStatus::Refunded)
            .await
            .map_err(|e| ReturnError::DatabaseError(e.to_string()))?;

        let resolved = self
            .returns_repo
            .resolve(
                return_id,
                ReturnStatus::Approved,
                Some(breakdown.refund_amount),
                breakdown.coins_to_refund,
            )
            .await?;

        tracing::info!(
            "Return {} approved: refunded {}, coins +{}/-{}",
            return_id,
            breakdown.refund_amount,
            coins_refunded,
            coins_reclaimed
        );
        Ok(resolved)
    }
}
