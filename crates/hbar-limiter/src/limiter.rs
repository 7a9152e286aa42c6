use crate::{
    plan::{PlanRef, SpendingPlanTier, SpendingRecord},
    registry::{amount_spent_key, history_key},
    SpendingPlanRegistry,
};
use metrics::counter;
use parking_lot::Mutex;
use relay_cache::SharedCache;
use relay_primitives::RequestContext;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};
use strum::Display;
use tracing::{debug, info, warn};

const CALLER: &str = "hbar_limiter";

/// Pseudo plan id of the process-global budget all `BASIC` callers share.
const GLOBAL_PLAN_ID: &str = "global";

/// Bounded length of a plan's spending history.
const HISTORY_LIMIT: usize = 100;

/// What kind of consensus interaction is about to spend HBAR.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "UPPERCASE")]
pub enum ExecutionMode {
    /// A free-of-charge query answered from node state.
    Query,
    /// A charged consensus transaction.
    Transaction,
    /// A charged record query.
    Record,
}

/// Per-tier budget caps, in tinybar per window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LimiterBudget {
    /// Cap of an individual `BASIC` plan.
    pub basic: i64,
    /// Cap of an `EXTENDED` plan.
    pub extended: i64,
    /// Cap of a `PRIVILEGED` plan.
    pub privileged: i64,
    /// Cap of the process-global budget shared by all `BASIC` callers.
    pub global: i64,
}

impl Default for LimiterBudget {
    fn default() -> Self {
        // 11.2 / 56 / 112 HBAR per caller and 8000 HBAR per process and day
        Self {
            basic: 1_120_000_000,
            extended: 5_600_000_000,
            privileged: 11_200_000_000,
            global: 800_000_000_000,
        }
    }
}

impl LimiterBudget {
    const fn cap(&self, tier: SpendingPlanTier) -> i64 {
        match tier {
            SpendingPlanTier::Basic => self.basic,
            SpendingPlanTier::Extended => self.extended,
            SpendingPlanTier::Privileged => self.privileged,
        }
    }
}

/// The budget limiter consulted around every consensus submission.
///
/// `should_limit` gates before the spend, `add_expense` accounts after it;
/// the two calls bracket a submission and the pipeline must never call
/// `add_expense` for a submission `should_limit` rejected.
#[derive(Debug)]
pub struct HbarLimiter {
    cache: SharedCache,
    registry: SpendingPlanRegistry,
    budget: LimiterBudget,
    window: Duration,
    reset_deadline: Mutex<Instant>,
}

// === impl HbarLimiter ===

impl HbarLimiter {
    /// Creates a limiter over `cache` with the given per-window `budget`.
    pub fn new(
        cache: SharedCache,
        registry: SpendingPlanRegistry,
        budget: LimiterBudget,
        window: Duration,
    ) -> Self {
        Self { cache, registry, budget, window, reset_deadline: Mutex::new(Instant::now() + window) }
    }

    /// Returns whether the submission about to be made for `sender` must be
    /// rejected.
    pub fn should_limit(
        &self,
        mode: ExecutionMode,
        method: &str,
        tx_constructor: &str,
        sender: Option<&str>,
        ctx: &RequestContext,
    ) -> bool {
        self.maybe_reset();

        let plan = self.resolve_plan(sender, ctx);
        let tier = plan.as_ref().map(|p| p.tier).unwrap_or_default();

        if !mode_allowed(tier, mode) {
            warn!(target: "hbar_limiter", %ctx, %mode, %tier, %method, "execution mode not allowed for tier");
            counter!("relay_hbar_rate_limited_total", "reason" => "mode").increment(1);
            return true
        }

        if let Some(plan) = &plan {
            let spent = self.spent(&plan.plan_id);
            if spent >= self.budget.cap(plan.tier) {
                warn!(
                    target: "hbar_limiter",
                    %ctx, plan = %plan.plan_id, %tier, %spent, %method, %tx_constructor,
                    "spending plan exhausted"
                );
                counter!("relay_hbar_rate_limited_total", "reason" => "plan").increment(1);
                return true
            }
        }

        if tier == SpendingPlanTier::Basic && self.spent(GLOBAL_PLAN_ID) >= self.budget.global {
            warn!(target: "hbar_limiter", %ctx, %method, "global basic budget exhausted");
            counter!("relay_hbar_rate_limited_total", "reason" => "global").increment(1);
            return true
        }

        false
    }

    /// Records `amount` tinybar spent on behalf of `sender`.
    pub fn add_expense(
        &self,
        amount: i64,
        sender: Option<&str>,
        tx_constructor: &str,
        ctx: &RequestContext,
    ) {
        if amount <= 0 {
            return
        }
        self.maybe_reset();

        let plan = self.resolve_plan(sender, ctx);
        let tier = plan.as_ref().map(|p| p.tier).unwrap_or_default();

        if let Some(plan) = &plan {
            let total = self.cache.increment(&amount_spent_key(&plan.plan_id), amount, CALLER);
            self.append_history(&plan.plan_id, amount, tx_constructor);
            debug!(
                target: "hbar_limiter",
                %ctx, plan = %plan.plan_id, %amount, %total, %tx_constructor, "expense recorded"
            );
        }
        if tier == SpendingPlanTier::Basic {
            self.cache.increment(&amount_spent_key(GLOBAL_PLAN_ID), amount, CALLER);
        }

        counter!("relay_hbar_spent_tinybars_total").increment(amount as u64);
    }

    /// Tinybar spent so far against `plan_id` in the current window.
    pub fn spent(&self, plan_id: &str) -> i64 {
        self.cache
            .get(&amount_spent_key(plan_id), CALLER)
            .and_then(|v| v.parse().ok())
            .unwrap_or(0)
    }

    fn resolve_plan(&self, sender: Option<&str>, ctx: &RequestContext) -> Option<PlanRef> {
        if let Some(sender) = sender {
            if let Some(plan) = self.registry.lookup_by_evm_address(sender) {
                return Some(plan)
            }
        }
        let ip = ctx.client_ip?;
        self.registry.lookup_by_ip(&ip.to_string())
    }

    fn append_history(&self, plan_id: &str, amount: i64, tx_constructor: &str) {
        let key = history_key(plan_id);
        let mut history: Vec<SpendingRecord> = self
            .cache
            .get(&key, CALLER)
            .and_then(|json| serde_json::from_str(&json).ok())
            .unwrap_or_default();

        history.push(SpendingRecord {
            timestamp: SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_secs(),
            amount,
            tx_constructor: tx_constructor.to_owned(),
        });
        if history.len() > HISTORY_LIMIT {
            let excess = history.len() - HISTORY_LIMIT;
            history.drain(..excess);
        }
        if let Ok(json) = serde_json::to_string(&history) {
            self.cache.set(&key, json, CALLER, None);
        }
    }

    /// Resets every spent counter once the window deadline has passed.
    fn maybe_reset(&self) {
        let mut deadline = self.reset_deadline.lock();
        let now = Instant::now();
        if now < *deadline {
            return
        }
        while *deadline <= now {
            *deadline += self.window;
        }

        for key in self.cache.keys("hbarSpendingPlan:*:amountSpent", CALLER) {
            self.cache.delete(&key, CALLER);
        }
        info!(target: "hbar_limiter", "budget window reset");
        counter!("relay_hbar_budget_resets_total").increment(1);
    }
}

/// Whether `tier` may perform `mode` at all.
///
/// Record queries are paid by the operator at a fixed price, so they are
/// reserved for registered plans.
const fn mode_allowed(tier: SpendingPlanTier, mode: ExecutionMode) -> bool {
    match mode {
        ExecutionMode::Query | ExecutionMode::Transaction => true,
        ExecutionMode::Record => !matches!(tier, SpendingPlanTier::Basic),
    }
}
