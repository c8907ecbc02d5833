//! The listening-time budget.
//!
//! Active location listening is power-expensive, so the provider meters it:
//! time spent listening passively earns a sliver of active credit, active
//! requests debit their full planned duration up front, and requests that
//! finish early refund the remainder. The planner prefers passive listening
//! whenever the last result is fresh enough to still be trusted.

/// Milliseconds of passive listening that buy one millisecond of active
/// listening.
pub const PASSIVE_TO_ACTIVE_RATIO: u64 = 90;

/// How long a known-location result stays fresh enough to avoid active
/// listening.
pub const LOCATION_KNOWN_AGE_THRESHOLD_MS: u64 = 15 * 60 * 1_000;

/// How long a location-not-known result suppresses another active attempt.
pub const LOCATION_NOT_KNOWN_AGE_THRESHOLD_MS: u64 = 60 * 1_000;

/// An active request shorter than this is not worth its fixed costs.
pub const MINIMUM_ACTIVE_LISTENING_DURATION_MS: u64 = 5 * 1_000;

/// The longest single active request.
pub const MAXIMUM_ACTIVE_LISTENING_DURATION_MS: u64 = 10 * 1_000;

/// Passive windows are never shorter than this.
pub const MINIMUM_PASSIVE_LISTENING_DURATION_MS: u64 = 2 * 60 * 1_000;

/// Accrued active credit is capped at a few maximum-length requests.
pub const MAX_ACTIVE_LISTENING_BUDGET_MS: u64 = 4 * MAXIMUM_ACTIVE_LISTENING_DURATION_MS;

/// What the last completed listening attempt learned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LocationKind {
    Known,
    NotKnown,
}

/// The last listening outcome and when it happened, in elapsed realtime.
#[derive(Debug, Clone, Copy)]
pub struct LocationOutcome {
    pub kind: LocationKind,
    pub at_elapsed_ms: u64,
}

/// The planner's decision for the next listening window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListenPlan {
    pub mode: crate::environment::ListenMode,
    pub duration_ms: u64,
}

/// Tracks and meters active-listening credit.
#[derive(Debug, Clone)]
pub struct ListeningBudget {
    balance_ms: u64,
}

impl Default for ListeningBudget {
    /// Starts with exactly one minimum active request's worth of credit so
    /// the very first plan after startup can listen actively.
    fn default() -> Self {
        ListeningBudget {
            balance_ms: MINIMUM_ACTIVE_LISTENING_DURATION_MS,
        }
    }
}

impl ListeningBudget {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn balance_ms(&self) -> u64 {
        self.balance_ms
    }

    fn credit(&mut self, amount_ms: u64) {
        self.balance_ms = self
            .balance_ms
            .saturating_add(amount_ms)
            .min(MAX_ACTIVE_LISTENING_BUDGET_MS);
    }

    /// Credits a completed passive window at the exchange ratio.
    pub fn accrue(&mut self, passive_duration_ms: u64) {
        self.credit(passive_duration_ms / PASSIVE_TO_ACTIVE_RATIO);
    }

    /// Refunds the unused tail of an active request that returned early.
    pub fn deposit(&mut self, unused_active_ms: u64) {
        self.credit(unused_active_ms);
    }

    /// Decides the next listening window and debits any active time it
    /// plans, up front.
    pub fn plan(&mut self, now_elapsed_ms: u64, last: Option<&LocationOutcome>) -> ListenPlan {
        use crate::environment::ListenMode;

        if let Some(last) = last {
            let age_ms = now_elapsed_ms.saturating_sub(last.at_elapsed_ms);
            let threshold_ms = match last.kind {
                LocationKind::Known => LOCATION_KNOWN_AGE_THRESHOLD_MS,
                LocationKind::NotKnown => LOCATION_NOT_KNOWN_AGE_THRESHOLD_MS,
            };
            if age_ms < threshold_ms {
                return ListenPlan {
                    mode: ListenMode::Passive,
                    duration_ms: MINIMUM_PASSIVE_LISTENING_DURATION_MS,
                };
            }
        }

        if self.balance_ms >= MINIMUM_ACTIVE_LISTENING_DURATION_MS {
            let duration_ms = self.balance_ms.min(MAXIMUM_ACTIVE_LISTENING_DURATION_MS);
            self.balance_ms -= duration_ms;
            return ListenPlan {
                mode: ListenMode::Active,
                duration_ms,
            };
        }

        ListenPlan {
            mode: ListenMode::Passive,
            duration_ms: MINIMUM_PASSIVE_LISTENING_DURATION_MS,
        }
    }
}
