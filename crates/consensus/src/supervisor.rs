use crate::ConsensusClient;
use metrics::counter;
use parking_lot::Mutex;
use std::{
    fmt,
    sync::Arc,
    time::{Duration, Instant},
};
use tracing::{info, warn};

/// Builds a fresh consensus client handle.
pub type ConsensusClientFactory = Box<dyn Fn() -> Arc<dyn ConsensusClient> + Send + Sync>;

/// Reinitialization thresholds of the supervisor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SupervisorConfig {
    /// Rebuild after this many handed-out clients; `0` disables the counter.
    pub transaction_reset: u64,
    /// Rebuild after this much wall time; zero disables the deadline.
    pub duration_reset: Duration,
    /// Status codes that trigger a rebuild when reported.
    pub error_reset: Vec<i32>,
}

impl SupervisorConfig {
    /// Reinit is disabled only when every threshold is unset; the handle then
    /// lives for the whole process.
    pub fn reinit_disabled(&self) -> bool {
        self.transaction_reset == 0 &&
            self.duration_reset.is_zero() &&
            self.error_reset.is_empty()
    }
}

struct SupervisorState {
    client: Arc<dyn ConsensusClient>,
    transactions_remaining: u64,
    reset_deadline: Option<Instant>,
    should_reset: bool,
    generation: u64,
}

/// Owns the process-wide consensus client handle.
///
/// Every submission path goes through [`ClientSupervisor::client`], which
/// applies the reset state machine: a latched `should_reset` rebuilds the
/// handle before it is handed out, the transaction counter and deadline latch
/// it, and [`ClientSupervisor::report_error`] latches it for configured status
/// codes. Callers work against the snapshot they received; in-flight requests
/// are never interrupted by a rebuild.
pub struct ClientSupervisor {
    factory: ConsensusClientFactory,
    config: SupervisorConfig,
    reinit_enabled: bool,
    state: Mutex<SupervisorState>,
}

impl fmt::Debug for ClientSupervisor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientSupervisor")
            .field("config", &self.config)
            .field("reinit_enabled", &self.reinit_enabled)
            .finish_non_exhaustive()
    }
}

// === impl ClientSupervisor ===

impl ClientSupervisor {
    /// Creates a supervisor, building the initial client immediately.
    pub fn new(factory: ConsensusClientFactory, config: SupervisorConfig) -> Self {
        let reinit_enabled = !config.reinit_disabled();
        if !reinit_enabled {
            info!(target: "hapi_client", "client reinitialization disabled");
        }
        let state = SupervisorState {
            client: factory(),
            transactions_remaining: config.transaction_reset,
            reset_deadline: deadline_from(&config),
            should_reset: false,
            generation: 0,
        };
        Self { factory, config, reinit_enabled, state: Mutex::new(state) }
    }

    /// Returns the client handle to use for the next submission.
    pub fn client(&self) -> Arc<dyn ConsensusClient> {
        let mut state = self.state.lock();
        if !self.reinit_enabled {
            return state.client.clone()
        }

        if state.should_reset {
            state.client = (self.factory)();
            state.transactions_remaining = self.config.transaction_reset;
            state.reset_deadline = deadline_from(&self.config);
            state.should_reset = false;
            state.generation += 1;
            counter!("relay_hapi_client_resets_total").increment(1);
            info!(target: "hapi_client", generation = state.generation, "consensus client reinitialized");
        }

        if self.config.transaction_reset > 0 {
            state.transactions_remaining = state.transactions_remaining.saturating_sub(1);
            if state.transactions_remaining == 0 {
                state.should_reset = true;
            }
        }
        if let Some(deadline) = state.reset_deadline {
            if Instant::now() > deadline {
                state.should_reset = true;
            }
        }

        state.client.clone()
    }

    /// Latches a reset when `status_code` is one of the configured triggers.
    pub fn report_error(&self, status_code: i32) {
        if !self.reinit_enabled || !self.config.error_reset.contains(&status_code) {
            return
        }
        warn!(target: "hapi_client", status_code, "error status triggers client reinitialization");
        self.state.lock().should_reset = true;
    }

    /// How many times the handle has been rebuilt.
    pub fn generation(&self) -> u64 {
        self.state.lock().generation
    }
}

fn deadline_from(config: &SupervisorConfig) -> Option<Instant> {
    (!config.duration_reset.is_zero()).then(|| Instant::now() + config.duration_reset)
}
