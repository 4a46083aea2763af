use crate::orders::OrderStatus;

/// Service for managing order status transitions
pub struct StatusMachine;

impl StatusMachine {
    /// Check if a status transition is valid
    ///
    /// # Valid Transitions
    /// - Pending → Confirmed, Cancelled
    /// - Confirmed → Shipped, Cancelled
    /// - Shipped → Delivered
    /// - Delivered → (terminal; refunds go through the returns flow)
    /// - Cancelled → (no transitions)
    /// - Any status → itself (idempotent)
    pub fn is_valid_transition(from: OrderStatus, to: OrderStatus) -> bool {
        if from == to {
            return true;
        }

        match (from, to) {
            (OrderStatus::Pending, OrderStatus::Confirmed) => true,
            (OrderStatus::Pending, OrderStatus::Cancelled) => true,

            (OrderStatus::Confirmed, OrderStatus::Shipped) => true,
            (OrderStatus::Confirmed, OrderStatus::Cancelled) => true,

            (OrderStatus::Shipped, OrderStatus::Delivered) => true,

            // Delivered and Cancelled are terminal
            _ => false,
        }
    }

    /// Attempt to transition from one status to another
    ///
    /// Returns `Ok(to)` if the transition is valid, `Err(message)` otherwise
    pub fn transition(from: OrderStatus, to: OrderStatus) -> Result<OrderStatus, String> {
        if Self::is_valid_transition(from, to) {
            Ok(to)
        } else {
            Err(format!("Invalid status transition from {} to {}", from, to))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pending_transitions() {
        assert!(StatusMachine::is_valid_transition(
            OrderStatus::Pending,
            OrderStatus::Confirmed
        ));
        assert!(StatusMachine::is_valid_transition(
            OrderStatus::Pending,
            OrderStatus::Cancelled
        ));
        assert!(!StatusMachine::is_valid_transition(
            OrderStatus::Pending,
            OrderStatus::Shipped
        ));
        assert!(!StatusMachine::is_valid_transition(
            OrderStatus::Pending,
            OrderStatus::Delivered
        ));
    }

    #[test]
    fn test_confirmed_transitions() {
        assert!(StatusMachine::is_valid_transition(
            OrderStatus::Confirmed,
            OrderStatus::Shipped
        ));
        assert!(StatusMachine::is_valid_transition(
            OrderStatus::Confirmed,
            OrderStatus::Cancelled
        ));
        assert!(!StatusMachine::is_valid_transition(
            OrderStatus::Confirmed,
            OrderStatus::Delivered
        ));
    }

    #[test]
    fn test_shipped_transitions() {
        assert!(StatusMachine::is_valid_transition(
            OrderStatus::Shipped,
            OrderStatus::Delivered
        ));
        // A shipped order can no longer be cancelled
        assert!(!StatusMachine::is_valid_transition(
            OrderStatus::Shipped,
            OrderStatus::Cancelled
        ));
    }

    #[test]
    fn test_terminal_states() {
        for to in [
            OrderStatus::Pending,
            OrderStatus::Confirmed,
            OrderStatus::Shipped,
            OrderStatus::Cancelled,
        ] {
            assert!(!StatusMachine::is_valid_transition(OrderStatus::Delivered, to));
        }
        for to in [
            OrderStatus::Pending,
            OrderStatus::Confirmed,
            OrderStatus::Shipped,
            OrderStatus::Delivered,
        ] {
            assert!(!StatusMachine::is_valid_transition(OrderStatus::Cancelled, to));
        }
    }

    #[test]
    fn test_same_status_is_idempotent() {
        for status in [
            OrderStatus::Pending,
            OrderStatus::Confirmed,
            OrderStatus::Shipped,
            OrderStatus::Delivered,
            OrderStatus::Cancelled,
        ] {
            assert!(StatusMachine::is_valid_transition(status, status));
        }
    }

    #[test]
    fn test_transition_error_message() {
        let err = StatusMachine::transition(OrderStatus::Delivered, OrderStatus::Pending)
            .unwrap_err();
        assert_eq!(err, "Invalid status transition from delivered to pending");
    }
}
