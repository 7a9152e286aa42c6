//! HBAR budget enforcement.
//!
//! Every consensus submission spends the operator's HBAR. The limiter bounds
//! that spend per caller through *spending plans*: named budget records with a
//! tier (`BASIC`, `EXTENDED`, `PRIVILEGED`) associated to EVM addresses and/or
//! client ips. Callers without a plan share the process-global `BASIC` budget.
//!
//! Plans and their counters live in the shared cache under
//! `hbarSpendingPlan:*`, `ethAddressPlan:*` and `ipAddressPlan:*` keys, so a
//! distributed cache gives fleet-wide enforcement for free.

#![warn(missing_docs, unreachable_pub)]
#![deny(unused_must_use, rust_2018_idioms)]
#![doc(test(
    no_crate_inject,
    attr(deny(warnings, rust_2018_idioms), allow(dead_code, unused_variables))
))]

mod limiter;
mod plan;
mod registry;

pub use limiter::{ExecutionMode, HbarLimiter, LimiterBudget};
pub use plan::{
    parse_plans, PlanConfigError, PlanRef, SpendingPlanConfigEntry, SpendingPlanTier,
    SpendingRecord, StoredPlan,
};
pub use registry::SpendingPlanRegistry;
