//! Pending-order guard: single-flight gate for emitted actions.
//!
//! While an action is outstanding no new action may be emitted. The slot also
//! keeps the position as it was just before the action, so a rejected action
//! can be rolled back.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::{ActionRequest, PositionState};

/// Outcome reported by the action sink for an outstanding request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Settlement {
    Filled,
    Rejected,
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum GuardError {
    #[error("an action emitted at bar {bar_index} is still pending")]
    AlreadyPending { bar_index: usize },

    #[error("no action is pending")]
    NothingPending,
}

/// An in-flight request plus the position snapshot taken before it applied.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingAction {
    pub request: ActionRequest,
    pub snapshot: PositionState,
}

#[derive(Debug, Clone, Default)]
pub struct PendingOrderGuard {
    slot: Option<PendingAction>,
}

impl PendingOrderGuard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_pending(&self) -> bool {
        self.slot.is_some()
    }

    pub fn pending(&self) -> Option<&ActionRequest> {
        self.slot.as_ref().map(|p| &p.request)
    }

    /// Occupy the slot. Fails if an action is already outstanding.
    pub fn arm(&mut self, pending: PendingAction) -> Result<(), GuardError> {
        if let Some(current) = &self.slot {
            return Err(GuardError::AlreadyPending {
                bar_index: current.request.bar_index,
            });
        }
        self.slot = Some(pending);
        Ok(())
    }

    /// Clear the slot, returning what was pending.
    pub fn release(&mut self) -> Result<PendingAction, GuardError> {
        self.slot.take().ok_or(GuardError::NothingPending)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Reason;
    use chrono::NaiveDate;

    fn pending(bar_index: usize) -> PendingAction {
        let date = NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
        PendingAction {
            request: ActionRequest::buy(bar_index, date, "TEST", 10.0, Reason::MaTrend),
            snapshot: PositionState::flat(),
        }
    }

    #[test]
    fn arm_then_release() {
        let mut guard = PendingOrderGuard::new();
        assert!(!guard.is_pending());
        guard.arm(pending(3)).unwrap();
        assert!(guard.is_pending());
        assert_eq!(guard.pending().map(|r| r.bar_index), Some(3));
        let released = guard.release().unwrap();
        assert_eq!(released.request.bar_index, 3);
        assert!(!guard.is_pending());
    }

    #[test]
    fn second_arm_is_rejected() {
        let mut guard = PendingOrderGuard::new();
        guard.arm(pending(1)).unwrap();
        assert_eq!(
            guard.arm(pending(2)),
            Err(GuardError::AlreadyPending { bar_index: 1 })
        );
        assert_eq!(guard.pending().map(|r| r.bar_index), Some(1));
    }

    #[test]
    fn release_when_empty() {
        let mut guard = PendingOrderGuard::new();
        assert_eq!(guard.release(), Err(GuardError::NothingPending));
    }
}
