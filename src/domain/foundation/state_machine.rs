//! State machine trait for lifecycle status enums.
//!
//! Invoice, Payment and Refund statuses each declare an explicit transition
//! table through this trait. Aggregates route every status write through
//! [`StateMachine::transition_to`], so an illegal write (a replayed success
//! on a failed payment, say) is rejected instead of silently applied.

use super::ValidationError;

/// Trait for status enums that represent state machines.
///
/// # Example
///
/// ```ignore
/// impl StateMachine for PaymentStatus {
///     fn can_transition_to(&self, target: &Self) -> bool {
///         matches!(
///             (self, target),
///             (Pending, Completed) | (Pending, Failed) | (Completed, Refunded)
///         )
///     }
///
///     fn valid_transitions(&self) -> Vec<Self> {
///         match self {
///             Pending => vec![Completed, Failed],
///             // ...
///         }
///     }
/// }
///
/// let next = payment.status.transition_to(PaymentStatus::Completed)?;
/// ```
pub trait StateMachine: Sized + Copy + PartialEq + std::fmt::Debug {
    /// Returns true if transition from self to target is valid.
    fn can_transition_to(&self, target: &Self) -> bool;

    /// Returns all valid target states from current state.
    fn valid_transitions(&self) -> Vec<Self>;

    /// Performs transition with validation, returning error if invalid.
    fn transition_to(&self, target: Self) -> Result<Self, ValidationError> {
        if self.can_transition_to(&target) {
            Ok(target)
        } else {
            Err(ValidationError::invalid_transition(self, target))
        }
    }

    /// Checks if current state is terminal (no valid outgoing transitions).
    fn is_terminal(&self) -> bool {
        self.valid_transitions().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum Ticket {
        Reserved,
        Issued,
        Void,
    }

    impl StateMachine for Ticket {
        fn can_transition_to(&self, target: &Self) -> bool {
            use Ticket::*;
            matches!((self, target), (Reserved, Issued) | (Reserved, Void) | (Issued, Void))
        }

        fn valid_transitions(&self) -> Vec<Self> {
            use Ticket::*;
            match self {
                Reserved => vec![Issued, Void],
                Issued => vec![Void],
                Void => vec![],
            }
        }
    }

    #[test]
    fn transition_to_returns_target_when_allowed() {
        assert_eq!(Ticket::Reserved.transition_to(Ticket::Issued), Ok(Ticket::Issued));
    }

    #[test]
    fn transition_to_rejects_disallowed_target() {
        let err = Ticket::Void.transition_to(Ticket::Issued).unwrap_err();
        assert_eq!(
            err,
            ValidationError::InvalidTransition {
                from: "Void".into(),
                to: "Issued".into()
            }
        );
    }

    #[test]
    fn is_terminal_follows_valid_transitions() {
        assert!(!Ticket::Reserved.is_terminal());
        assert!(Ticket::Void.is_terminal());
    }

    #[test]
    fn valid_transitions_agree_with_can_transition_to() {
        for from in [Ticket::Reserved, Ticket::Issued, Ticket::Void] {
            for to in [Ticket::Reserved, Ticket::Issued, Ticket::Void] {
                assert_eq!(
                    from.can_transition_to(&to),
                    from.valid_transitions().contains(&to),
                    "{:?} -> {:?}",
                    from,
                    to
                );
            }
        }
    }
}
