use crate::plan::{PlanRef, SpendingPlanConfigEntry, SpendingPlanTier, StoredPlan};
use relay_cache::SharedCache;
use tracing::{debug, info, warn};

const CALLER: &str = "spending_plan_registry";

/// Cache key of the stored plan document.
fn plan_key(id: &str) -> String {
    format!("hbarSpendingPlan:{id}")
}

/// Cache key of a plan's spent counter.
pub(crate) fn amount_spent_key(id: &str) -> String {
    format!("hbarSpendingPlan:{id}:amountSpent")
}

/// Cache key of a plan's spending history.
pub(crate) fn history_key(id: &str) -> String {
    format!("hbarSpendingPlan:{id}:spendingHistory")
}

fn evm_association_key(address: &str) -> String {
    format!("ethAddressPlan:{}", address.to_lowercase())
}

fn ip_association_key(ip: &str) -> String {
    format!("ipAddressPlan:{ip}")
}

/// The registry of spending plans and their address associations.
///
/// All state lives in the shared cache; the registry itself is stateless and
/// may be instantiated freely.
#[derive(Debug, Clone)]
pub struct SpendingPlanRegistry {
    cache: SharedCache,
}

// === impl SpendingPlanRegistry ===

impl SpendingPlanRegistry {
    /// Creates a registry over `cache`.
    pub const fn new(cache: SharedCache) -> Self {
        Self { cache }
    }

    /// Reconciles the preconfigured plans against the cache.
    ///
    /// Idempotent: repeated runs from the same configuration converge to the
    /// same cache state.
    ///
    /// 1. Cached `EXTENDED`/`PRIVILEGED` plans absent from the configuration
    ///    are deleted together with their counters and associations.
    /// 2. Configured plans missing from the cache are created.
    /// 3. Associations are brought in line: entries pointing at a configured
    ///    plan but no longer declared are removed, declared ones are set.
    pub fn populate_preconfigured_plans(&self, plans: &[SpendingPlanConfigEntry]) -> usize {
        self.remove_obsolete_plans(plans);
        self.create_missing_plans(plans);
        self.reconcile_associations(plans);
        info!(target: "hbar_limiter", count = plans.len(), "spending plans reconciled");
        plans.len()
    }

    fn remove_obsolete_plans(&self, plans: &[SpendingPlanConfigEntry]) {
        for key in self.cache.keys("hbarSpendingPlan:*", CALLER) {
            // skip the :amountSpent / :spendingHistory sub-keys
            if key.matches(':').count() != 1 {
                continue
            }
            let Some(stored) = self.stored_plan_by_key(&key) else { continue };
            if stored.tier == SpendingPlanTier::Basic {
                continue
            }
            if plans.iter().any(|p| p.id == stored.id) {
                continue
            }

            warn!(target: "hbar_limiter", id = %stored.id, tier = %stored.tier, "removing obsolete spending plan");
            self.cache.delete(&key, CALLER);
            self.cache.delete(&amount_spent_key(&stored.id), CALLER);
            self.cache.delete(&history_key(&stored.id), CALLER);
            self.remove_associations_to(&stored.id);
        }
    }

    fn create_missing_plans(&self, plans: &[SpendingPlanConfigEntry]) {
        for plan in plans {
            let key = plan_key(&plan.id);
            if self.cache.get(&key, CALLER).is_some() {
                continue
            }
            let stored =
                StoredPlan { id: plan.id.clone(), name: plan.name.clone(), tier: plan.tier };
            debug!(target: "hbar_limiter", id = %plan.id, tier = %plan.tier, "creating spending plan");
            self.store_plan(&stored);
        }
    }

    fn reconcile_associations(&self, plans: &[SpendingPlanConfigEntry]) {
        // drop associations that point at a configured plan but are no longer declared
        for key in self.cache.keys("ethAddressPlan:*", CALLER) {
            let Some(plan_id) = self.cache.get(&key, CALLER) else { continue };
            let Some(plan) = plans.iter().find(|p| p.id == plan_id) else { continue };
            let address = key.trim_start_matches("ethAddressPlan:");
            if !plan.evm_addresses.iter().any(|a| a.eq_ignore_ascii_case(address)) {
                debug!(target: "hbar_limiter", %address, plan = %plan_id, "removing stale evm association");
                self.cache.delete(&key, CALLER);
            }
        }
        for key in self.cache.keys("ipAddressPlan:*", CALLER) {
            let Some(plan_id) = self.cache.get(&key, CALLER) else { continue };
            let Some(plan) = plans.iter().find(|p| p.id == plan_id) else { continue };
            let ip = key.trim_start_matches("ipAddressPlan:");
            if !plan.ip_addresses.iter().any(|a| a == ip) {
                debug!(target: "hbar_limiter", plan = %plan_id, "removing stale ip association");
                self.cache.delete(&key, CALLER);
            }
        }

        // declare the configured associations, overriding whatever they pointed at
        for plan in plans {
            for address in &plan.evm_addresses {
                self.cache.set(&evm_association_key(address), plan.id.clone(), CALLER, None);
            }
            for ip in &plan.ip_addresses {
                self.cache.set(&ip_association_key(ip), plan.id.clone(), CALLER, None);
            }
        }
    }

    fn remove_associations_to(&self, plan_id: &str) {
        for table in ["ethAddressPlan:*", "ipAddressPlan:*"] {
            for key in self.cache.keys(table, CALLER) {
                if self.cache.get(&key, CALLER).as_deref() == Some(plan_id) {
                    self.cache.delete(&key, CALLER);
                }
            }
        }
    }

    fn store_plan(&self, plan: &StoredPlan) {
        // the plan document is small and stable, serialization cannot fail
        let json = serde_json::to_string(plan).unwrap_or_default();
        self.cache.set(&plan_key(&plan.id), json, CALLER, None);
    }

    fn stored_plan_by_key(&self, key: &str) -> Option<StoredPlan> {
        let json = self.cache.get(key, CALLER)?;
        match serde_json::from_str(&json) {
            Ok(plan) => Some(plan),
            Err(err) => {
                warn!(target: "hbar_limiter", %key, %err, "undecodable spending plan in cache");
                None
            }
        }
    }

    /// Returns the stored plan document for `id`.
    pub fn plan(&self, id: &str) -> Option<StoredPlan> {
        self.stored_plan_by_key(&plan_key(id))
    }

    /// Resolves the plan billed for `address`.
    pub fn lookup_by_evm_address(&self, address: &str) -> Option<PlanRef> {
        let plan_id = self.cache.get(&evm_association_key(address), CALLER)?;
        let plan = self.plan(&plan_id)?;
        Some(PlanRef { plan_id, tier: plan.tier })
    }

    /// Resolves the plan billed for requests from `ip`.
    pub fn lookup_by_ip(&self, ip: &str) -> Option<PlanRef> {
        let plan_id = self.cache.get(&ip_association_key(ip), CALLER)?;
        let plan = self.plan(&plan_id)?;
        Some(PlanRef { plan_id, tier: plan.tier })
    }
}
