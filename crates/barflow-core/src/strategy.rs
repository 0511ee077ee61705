//! Inert placeholder surface for strategy/balance/commission (§1, §4.1's
//! `add_strategy`/`set_balance`/`set_commission`). None of this has any semantic effect on the
//! running pipeline yet — it is stored on the `PipelineSpec` for a future revision to use.

#[derive(Debug, Clone, Default)]
pub struct StrategySpec {
    pub name: Option<String>,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct BalanceSpec {
    pub initial: f64,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct CommissionSpec {
    pub per_trade: f64,
}
