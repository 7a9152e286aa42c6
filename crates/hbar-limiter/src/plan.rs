use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Budget tier of a spending plan.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Default,
    Display,
    EnumString,
    Serialize,
    Deserialize,
)]
#[strum(serialize_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum SpendingPlanTier {
    /// The shared default tier of unregistered callers.
    #[default]
    Basic,
    /// A registered project with its own budget.
    Extended,
    /// A partner with a raised budget.
    Privileged,
}

/// One plan as declared in the preconfigured-plans document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpendingPlanConfigEntry {
    /// Stable plan id.
    pub id: String,
    /// Human-readable name.
    pub name: String,
    /// Budget tier.
    pub tier: SpendingPlanTier,
    /// EVM addresses billed to this plan.
    #[serde(default)]
    pub evm_addresses: Vec<String>,
    /// Client ips billed to this plan.
    #[serde(default)]
    pub ip_addresses: Vec<String>,
}

/// A plan as stored in the cache under `hbarSpendingPlan:{id}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredPlan {
    /// Stable plan id.
    pub id: String,
    /// Human-readable name.
    pub name: String,
    /// Budget tier.
    pub tier: SpendingPlanTier,
}

/// Resolved plan reference returned by registry lookups.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlanRef {
    /// The plan id.
    pub plan_id: String,
    /// The plan's tier.
    pub tier: SpendingPlanTier,
}

/// One spend recorded against a plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpendingRecord {
    /// Unix seconds of the spend.
    pub timestamp: u64,
    /// Amount in tinybar.
    pub amount: i64,
    /// The consensus transaction constructor that caused it.
    pub tx_constructor: String,
}

/// Errors produced while loading the preconfigured-plans document.
#[derive(Debug, thiserror::Error)]
pub enum PlanConfigError {
    /// The document is not valid JSON of the expected shape.
    #[error("failed to parse spending plan configuration: {0}")]
    Parse(#[from] serde_json::Error),
    /// The named file could not be read.
    #[error("failed to read spending plan configuration file {path}: {source}")]
    Io {
        /// The configured path.
        path: String,
        /// The underlying error.
        source: std::io::Error,
    },
    /// Two entries share an id.
    #[error("duplicate spending plan id {0}")]
    DuplicateId(String),
}

/// Parses the preconfigured-plans JSON document.
pub fn parse_plans(json: &str) -> Result<Vec<SpendingPlanConfigEntry>, PlanConfigError> {
    let plans: Vec<SpendingPlanConfigEntry> = serde_json::from_str(json)?;
    let mut seen = std::collections::HashSet::new();
    for plan in &plans {
        if !seen.insert(plan.id.clone()) {
            return Err(PlanConfigError::DuplicateId(plan.id.clone()))
        }
    }
    Ok(plans)
}
