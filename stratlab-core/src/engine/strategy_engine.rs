//! Lifecycle driver shared by every strategy variant.
//!
//! Per bar, in order:
//! 1. Pending action outstanding → skip the bar entirely.
//! 2. Open → count the bar (`bars_held`).
//! 3. Open → maintain (trailing stop), then risk overlays in priority order,
//!    then the rule-based exit. The first that fires emits `close`.
//! 4. Flat → entry check; a `buy` opens at the bar's close.
//! 5. An emitted action arms the pending-order guard.
//!
//! Evaluation runs on a copy of the position. A failure inside a bar is
//! logged and the bar degrades to hold with that copy discarded.

use tracing::{debug, info, warn};

use crate::components::indicator::Indicator;
use crate::domain::{ActionRequest, Decision, PositionState};
use crate::strategy::config::{ConfigError, StrategyConfig};
use crate::strategy::overlay::first_triggered;
use crate::strategy::{build_rules, BarContext, EvalError, StrategyKind, StrategyRules};

use super::guard::{GuardError, PendingAction, PendingOrderGuard, Settlement};

/// One strategy instance bound to one symbol.
#[derive(Debug)]
pub struct StrategyEngine {
    symbol: String,
    config: StrategyConfig,
    rules: Box<dyn StrategyRules>,
    position: PositionState,
    guard: PendingOrderGuard,
    failed_bars: usize,
    skipped_bars: usize,
}

impl StrategyEngine {
    pub fn new(symbol: impl Into<String>, config: StrategyConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let rules = build_rules(&config.rules)?;
        Ok(Self {
            symbol: symbol.into(),
            config,
            rules,
            position: PositionState::flat(),
            guard: PendingOrderGuard::new(),
            failed_bars: 0,
            skipped_bars: 0,
        })
    }

    pub fn name(&self) -> &str {
        &self.config.name
    }

    pub fn kind(&self) -> StrategyKind {
        self.rules.kind()
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn config(&self) -> &StrategyConfig {
        &self.config
    }

    pub fn position(&self) -> &PositionState {
        &self.position
    }

    pub fn is_pending(&self) -> bool {
        self.guard.is_pending()
    }

    pub fn pending(&self) -> Option<&ActionRequest> {
        self.guard.pending()
    }

    /// Bars whose evaluation failed and degraded to hold.
    pub fn failed_bars(&self) -> usize {
        self.failed_bars
    }

    /// Bars skipped because an action was still pending.
    pub fn skipped_bars(&self) -> usize {
        self.skipped_bars
    }

    pub fn required_indicators(&self) -> Vec<Box<dyn Indicator>> {
        self.rules.required_indicators()
    }

    /// Evaluate one bar.
    pub fn step(&mut self, ctx: &BarContext<'_>) -> Decision {
        if let Some(pending) = self.guard.pending() {
            debug!(
                strategy = %self.config.name,
                bar = ctx.index(),
                pending_bar = pending.bar_index,
                "action pending, bar skipped"
            );
            self.skipped_bars += 1;
            return Decision::hold();
        }

        if self.position.is_open() {
            if let Err(err) = self.position.tick() {
                warn!(strategy = %self.config.name, bar = ctx.index(), error = %err, "tick failed");
            }
        }

        let mut working = self.position;
        let pending = match self.evaluate(ctx, &mut working) {
            Ok(pending) => pending,
            Err(err) => {
                self.failed_bars += 1;
                warn!(
                    strategy = %self.config.name,
                    bar = ctx.index(),
                    error = %err,
                    "bar evaluation failed, holding"
                );
                return Decision::hold();
            }
        };

        let Some(pending) = pending else {
            self.position = working;
            return Decision::hold();
        };

        let request = pending.request.clone();
        if let Err(err) = self.guard.arm(pending) {
            self.failed_bars += 1;
            warn!(strategy = %self.config.name, bar = ctx.index(), error = %err, "guard refused action");
            return Decision::hold();
        }
        self.position = working;

        if self.config.log_actions {
            info!(
                strategy = %self.config.name,
                symbol = %request.symbol,
                date = %request.date,
                action = %request.action,
                price = request.reference_price,
                reason = %request.reason,
                "action emitted"
            );
        }
        Decision::emit(request)
    }

    /// Settlement reported by the action sink. A rejected action restores the
    /// position as it was just before the action applied.
    pub fn settle(&mut self, settlement: Settlement) -> Result<ActionRequest, GuardError> {
        let PendingAction { request, snapshot } = self.guard.release()?;
        match settlement {
            Settlement::Filled => {
                debug!(strategy = %self.config.name, bar = request.bar_index, "action filled");
            }
            Settlement::Rejected => {
                self.position = snapshot;
                warn!(
                    strategy = %self.config.name,
                    bar = request.bar_index,
                    action = %request.action,
                    "action rejected, position restored"
                );
            }
        }
        Ok(request)
    }

    fn evaluate(
        &self,
        ctx: &BarContext<'_>,
        position: &mut PositionState,
    ) -> Result<Option<PendingAction>, EvalError> {
        let bar = ctx.bar()?;

        if position.is_open() {
            self.rules.maintain(ctx, position)?;
            let reason = match first_triggered(self.rules.risk_overlays(), bar.close, position) {
                Some(overlay) => Some(overlay.reason()),
                None => self.rules.exit(ctx, position)?,
            };
            let Some(reason) = reason else {
                return Ok(None);
            };
            let snapshot = *position;
            position.close()?;
            let request =
                ActionRequest::close(ctx.index(), bar.date, &self.symbol, bar.close, reason);
            return Ok(Some(PendingAction { request, snapshot }));
        }

        let Some(reason) = self.rules.entry(ctx)? else {
            return Ok(None);
        };
        let snapshot = *position;
        position.open(bar.close)?;
        self.rules.on_open(ctx, position)?;
        let request = ActionRequest::buy(ctx.index(), bar.date, &self.symbol, bar.close, reason);
        Ok(Some(PendingAction { request, snapshot }))
    }
}
