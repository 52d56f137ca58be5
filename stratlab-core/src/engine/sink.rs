//! Action sink: the execution collaborator that receives emitted actions and
//! reports when they settle.
//!
//! When an outstanding action counts as settled is the sink's decision, not
//! the engine's. The driver polls the sink before each bar while an action is
//! pending.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use super::guard::Settlement;
use crate::domain::ActionRequest;

pub trait ActionSink {
    /// Receive a newly emitted request.
    fn submit(&mut self, request: &ActionRequest);

    /// Settlement of `request` as observed before bar `bar_index`, if any.
    fn poll_settlement(&mut self, request: &ActionRequest, bar_index: usize) -> Option<Settlement>;
}

/// When a recorded request settles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SettlementPolicy {
    /// Settled at the start of the bar after emission.
    #[default]
    NextBar,
    /// Settled `n` bars after emission (`n` >= 1).
    AfterBars(usize),
}

impl SettlementPolicy {
    pub fn delay(self) -> usize {
        match self {
            SettlementPolicy::NextBar => 1,
            SettlementPolicy::AfterBars(n) => n.max(1),
        }
    }
}

/// Sink that records every submitted request and settles per policy.
///
/// Requests emitted on bars listed via [`RecordingSink::reject_at`] settle as
/// rejected; everything else fills.
#[derive(Debug, Clone, Default)]
pub struct RecordingSink {
    policy: SettlementPolicy,
    submitted: Vec<ActionRequest>,
    reject_bars: HashSet<usize>,
    filled: usize,
    rejected: usize,
}

impl RecordingSink {
    pub fn new(policy: SettlementPolicy) -> Self {
        Self {
            policy,
            ..Self::default()
        }
    }

    /// Reject whatever is emitted on `bar_index`.
    pub fn reject_at(mut self, bar_index: usize) -> Self {
        self.reject_bars.insert(bar_index);
        self
    }

    pub fn policy(&self) -> SettlementPolicy {
        self.policy
    }

    pub fn submitted(&self) -> &[ActionRequest] {
        &self.submitted
    }

    pub fn filled(&self) -> usize {
        self.filled
    }

    pub fn rejected(&self) -> usize {
        self.rejected
    }
}

impl ActionSink for RecordingSink {
    fn submit(&mut self, request: &ActionRequest) {
        self.submitted.push(request.clone());
    }

    fn poll_settlement(&mut self, request: &ActionRequest, bar_index: usize) -> Option<Settlement> {
        if bar_index < request.bar_index + self.policy.delay() {
            return None;
        }
        if self.reject_bars.contains(&request.bar_index) {
            self.rejected += 1;
            Some(Settlement::Rejected)
        } else {
            self.filled += 1;
            Some(Settlement::Filled)
        }
    }
}
